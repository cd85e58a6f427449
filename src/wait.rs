use nix::errno::Errno;
use nix::sys::wait::{waitpid, WaitStatus};
use tracing::{debug, warn};

use crate::launcher::ProcessHandles;
use crate::types::ABNORMAL_EXIT;

/// Where one command line got to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Dispatched,
    Aborted,
    Running,
    Collected,
}

/// Exit code of one stage: its own code on a normal exit, otherwise a fixed
/// non-zero sentinel.
pub fn exit_code(status: WaitStatus) -> i32 {
    match status {
        WaitStatus::Exited(_, code) => code,
        _ => ABNORMAL_EXIT,
    }
}

/// Wait for every child in stage order. The result is the first non-zero
/// stage code, or zero. Returns the code and how many children were reaped.
pub fn reap(handles: ProcessHandles) -> (i32, usize) {
    let mut pipeline_code = 0;
    let mut reaped = 0;

    for (stage, pid) in handles.into_inner() {
        let status = loop {
            match waitpid(pid, None) {
                Err(Errno::EINTR) => continue,
                other => break other,
            }
        };
        let code = match status {
            Ok(status) => {
                reaped += 1;
                debug!(stage, %pid, ?status, "reaped stage");
                exit_code(status)
            }
            Err(errno) => {
                warn!(stage, %pid, %errno, "wait failed");
                ABNORMAL_EXIT
            }
        };
        if pipeline_code == 0 {
            pipeline_code = code;
        }
    }
    (pipeline_code, reaped)
}
