use nix::sys::signal::SigAction;
use tracing::debug;

use crate::config::{HistorySource, ShellConfig};
use crate::history::History;
use crate::signals::{self, InterruptFlag};
use crate::types::ShellResult;

/// Everything the engine needs that outlives a single command.
pub struct Session {
    pub config: ShellConfig,
    pub history: History,
    interrupt: InterruptFlag,
    default_interrupt: SigAction,
}

impl Session {
    pub fn new(config: ShellConfig) -> Self {
        let history = match &config.history {
            HistorySource::Disabled => History::disabled(),
            HistorySource::Memory => History::in_memory(config.history_capacity),
            HistorySource::File(path) => History::open_or_disabled(path, config.history_capacity),
        };
        debug!(available = history.is_available(), "session created");
        Self {
            config,
            history,
            interrupt: InterruptFlag::new(),
            default_interrupt: signals::default_disposition(),
        }
    }

    /// Catch SIGINT for the rest of the process's life. Whatever disposition
    /// was in place before is what children get back.
    pub fn install_interrupt_handler(&mut self) -> ShellResult<()> {
        self.default_interrupt = signals::install(&self.interrupt)?;
        Ok(())
    }

    pub fn interrupt(&self) -> &InterruptFlag {
        &self.interrupt
    }

    pub fn default_interrupt(&self) -> &SigAction {
        &self.default_interrupt
    }
}
