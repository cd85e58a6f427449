use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use nix::sys::signal::{sigaction, SaFlags, SigAction, SigHandler, SigSet, Signal};
use tracing::debug;

use crate::types::{Context, ShellError, ShellResult};

/// Set when SIGINT arrives, cleared by the front-end loop. Cloning shares the
/// same flag.
#[derive(Debug, Clone, Default)]
pub struct InterruptFlag(Arc<AtomicBool>);

impl InterruptFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn raise(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_raised(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Clears the flag, returning whether it was set.
    pub fn take(&self) -> bool {
        self.0.swap(false, Ordering::SeqCst)
    }
}

pub fn default_disposition() -> SigAction {
    SigAction::new(SigHandler::SigDfl, SaFlags::empty(), SigSet::empty())
}

/// Route SIGINT to `flag` and return the disposition it replaced, which
/// children restore before exec. Can only succeed once per process.
pub fn install(flag: &InterruptFlag) -> ShellResult<SigAction> {
    // SAFETY: installs SIG_DFL only to read back what was there before; no
    // handler code is involved.
    let previous = unsafe { sigaction(Signal::SIGINT, &default_disposition()) }
        .context("read SIGINT disposition")?;

    let flag = flag.clone();
    ctrlc::set_handler(move || flag.raise())
        .map_err(|e| ShellError::InternalError(format!("install SIGINT handler: {}", e)))?;

    debug!(previous = ?previous.handler(), "installed interrupt handler");
    Ok(previous)
}

/// Child side, after fork: undo the shell's handler so the program can be
/// interrupted normally.
pub fn restore(disposition: &SigAction) -> nix::Result<()> {
    // SAFETY: the disposition was captured from this process earlier.
    unsafe { sigaction(Signal::SIGINT, disposition) }.map(|_| ())
}
