pub mod commands;
pub mod error;
pub mod output;
pub mod prompt;

pub use commands::*;
pub use error::*;
pub use prompt::Console;
