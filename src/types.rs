use nix::errno::Errno;
use thiserror::Error;

use crate::parser::ParseError;

/// Returned by `run_one` when the shell should stop reading commands.
/// Deliberately outside the 0-255 range a process can exit with.
pub const EXIT_SHELL: i32 = 256;

/// Exit code reported for a stage that did not exit normally (signaled or
/// dumped core).
pub const ABNORMAL_EXIT: i32 = 128;

/// Exit code of a command abandoned because an interrupt was pending.
pub const INTERRUPTED_EXIT: i32 = 130;

// Child exit codes for launch failures
pub const NOT_FOUND_EXIT: i32 = 127;
pub const NOT_EXECUTABLE_EXIT: i32 = 126;

#[derive(Debug, Error)]
pub enum ShellError {
    #[error("{context}: {source}")]
    IoError {
        context: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{1}: {0}")]
    NixError(Errno, String),
    #[error("{0}")]
    ParseError(#[from] ParseError),
    #[error("{0}: {1}")]
    Builtin(&'static str, String),
    #[error("{0}: argument contains a NUL byte")]
    NulArgument(String),
    #[error("internal shell error: {0}")]
    InternalError(String),
}

impl From<std::io::Error> for ShellError {
    fn from(err: std::io::Error) -> Self {
        ShellError::IoError {
            context: "I/O error".to_string(),
            source: err,
        }
    }
}

pub type ShellResult<T> = Result<T, ShellError>;

/// Attaches a short description of the failed operation to a `nix` or
/// `std::io` result.
pub trait Context<T> {
    fn context(self, what: &str) -> ShellResult<T>;
}

impl<T> Context<T> for nix::Result<T> {
    fn context(self, what: &str) -> ShellResult<T> {
        self.map_err(|errno| ShellError::NixError(errno, what.to_string()))
    }
}

impl<T> Context<T> for std::io::Result<T> {
    fn context(self, what: &str) -> ShellResult<T> {
        self.map_err(|source| ShellError::IoError {
            context: what.to_string(),
            source,
        })
    }
}
