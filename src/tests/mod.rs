use std::panic::{self, AssertUnwindSafe};

use nix::sys::wait::{waitpid, WaitStatus};
use nix::unistd::{fork, ForkResult};

use crate::config::ShellConfig;
use crate::executor::{execute, Completion};
use crate::parser::parse;
use crate::session::Session;

mod builtin_tests;
mod parser_tests;
mod redirection_tests;

pub(crate) fn session() -> Session {
    Session::new(ShellConfig::default())
}

pub(crate) fn run(session: &mut Session, line: &str) -> Result<Completion, String> {
    let pipeline = parse(line).map_err(|e| e.to_string())?;
    execute(session, &pipeline, false).map_err(|e| e.to_string())
}

/// Run `check` in a forked child, for checks that touch process-wide state
/// (working directory, descriptor table) other test threads would disturb.
pub(crate) fn in_child(check: impl FnOnce() -> bool) -> bool {
    // SAFETY: the child runs only `check` and then leaves through _exit.
    match unsafe { fork() }.unwrap() {
        ForkResult::Child => {
            let passed = panic::catch_unwind(AssertUnwindSafe(check)).unwrap_or(false);
            // SAFETY: skips the test harness's atexit and destructor work.
            unsafe { libc::_exit(if passed { 0 } else { 1 }) }
        }
        ForkResult::Parent { child } => {
            matches!(waitpid(child, None), Ok(WaitStatus::Exited(_, 0)))
        }
    }
}
