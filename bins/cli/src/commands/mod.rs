//! CLI command handlers.

pub mod books;
pub mod parse;
pub mod read;
pub mod search;

pub use books::run_books;
pub use parse::run_parse;
pub use read::{ReadCommandInput, run_read};
pub use search::{SearchCommandInput, run_search};
