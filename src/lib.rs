pub mod ast;
pub mod builtins;
pub mod completion;
pub mod config;
pub mod executor;
pub mod fittings;
pub mod history;
pub mod launcher;
pub mod parser;
pub mod repl;
pub mod session;
pub mod signals;
pub mod tokenizer;
pub mod types;
pub mod utils;
pub mod wait;

pub use executor::{execute, run_one, Completion};
pub use session::Session;
pub use types::{ShellError, EXIT_SHELL};

#[cfg(test)]
mod tests;
