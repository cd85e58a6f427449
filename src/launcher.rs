use std::convert::Infallible;
use std::ffi::{CStr, CString};
use std::os::fd::RawFd;

use nix::errno::Errno;
use nix::sys::signal::SigAction;
use nix::unistd::{execvp, fork, ForkResult, Pid};
use tracing::debug;

use crate::ast::Pipeline;
use crate::fittings::Fittings;
use crate::signals;
use crate::types::{
    Context, ShellError, ShellResult, NOT_EXECUTABLE_EXIT, NOT_FOUND_EXIT,
};

/// Child processes of one pipeline, in stage order.
#[derive(Debug, Default)]
pub struct ProcessHandles {
    handles: Vec<(usize, Pid)>,
}

impl ProcessHandles {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, stage: usize, pid: Pid) {
        self.handles.push((stage, pid));
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    pub fn pid(&self, stage: usize) -> Option<Pid> {
        self.handles.iter().find(|(s, _)| *s == stage).map(|(_, pid)| *pid)
    }

    pub(crate) fn into_inner(self) -> Vec<(usize, Pid)> {
        self.handles
    }
}

/// argv of every stage, converted before anything is forked.
#[derive(Debug)]
pub struct PreparedStages {
    argvs: Vec<Vec<CString>>,
}

pub fn prepare(pipeline: &Pipeline) -> ShellResult<PreparedStages> {
    let argvs = pipeline
        .stages
        .iter()
        .map(|stage| {
            if stage.argv.is_empty() {
                return Err(ShellError::InternalError("stage without a program".into()));
            }
            stage
                .argv
                .iter()
                .map(|arg| {
                    CString::new(arg.as_bytes())
                        .map_err(|_| ShellError::NulArgument(stage.program().to_string()))
                })
                .collect::<ShellResult<Vec<_>>>()
        })
        .collect::<ShellResult<Vec<_>>>()?;
    Ok(PreparedStages { argvs })
}

enum LaunchFailure {
    Prepare(Errno),
    Exec(Errno),
}

/// Fork and exec every stage from `start` on. Pids land in `handles` as soon
/// as they exist, so a fork failure halfway still leaves the earlier
/// children reapable.
pub fn launch(
    prepared: &PreparedStages,
    fittings: &Fittings,
    start: usize,
    default_interrupt: &SigAction,
    handles: &mut ProcessHandles,
) -> ShellResult<()> {
    for (stage, argv) in prepared.argvs.iter().enumerate().skip(start) {
        // SAFETY: the child only touches descriptors, the signal disposition
        // and exec before it either becomes the program or calls _exit.
        match unsafe { fork() }.context("fork")? {
            ForkResult::Parent { child } => {
                debug!(stage, pid = %child, program = ?argv[0], "forked stage");
                handles.push(stage, child);
            }
            ForkResult::Child => run_stage(stage, argv, fittings, default_interrupt),
        }
    }
    Ok(())
}

fn exec_stage(
    stage: usize,
    argv: &[CString],
    fittings: &Fittings,
    default_interrupt: &SigAction,
) -> Result<Infallible, LaunchFailure> {
    fittings.attach(stage).map_err(LaunchFailure::Prepare)?;
    signals::restore(default_interrupt).map_err(LaunchFailure::Prepare)?;
    execvp(&argv[0], argv).map_err(LaunchFailure::Exec)
}

fn run_stage(
    stage: usize,
    argv: &[CString],
    fittings: &Fittings,
    default_interrupt: &SigAction,
) -> ! {
    let (errno, code) = match exec_stage(stage, argv, fittings, default_interrupt) {
        Ok(never) => match never {},
        Err(LaunchFailure::Prepare(errno)) => (errno, 1),
        Err(LaunchFailure::Exec(errno @ Errno::ENOENT)) => (errno, NOT_FOUND_EXIT),
        Err(LaunchFailure::Exec(errno)) => (errno, NOT_EXECUTABLE_EXIT),
    };

    report(libc::STDERR_FILENO, &argv[0], errno);
    // SAFETY: _exit skips destructors and atexit handlers, which belong to
    // the parent.
    unsafe { libc::_exit(code) }
}

/// Write `program: description` to `fd` without allocating, so it is safe
/// between fork and exec. Straight to the descriptor: std's stderr handle
/// may be locked in the parent's copy of memory.
pub(crate) fn report(fd: RawFd, program: &CStr, errno: Errno) {
    for piece in [program.to_bytes(), &b": "[..], errno.desc().as_bytes(), &b"\n"[..]] {
        // SAFETY: the slice outlives the call. A short or failed write only
        // loses the diagnostic.
        unsafe { libc::write(fd, piece.as_ptr().cast(), piece.len()) };
    }
}
