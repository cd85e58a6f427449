use std::path::PathBuf;

use crate::history::{self, HISTORY_FILE_NAME};

/// Overrides where the history file lives.
pub const HISTFILE_ENV: &str = "PIPEWORK_HISTFILE";

pub const DEFAULT_PROMPT: &str = "pipework$ ";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HistorySource {
    Disabled,
    /// Private ring, gone when the session ends.
    Memory,
    /// Shared mapping of this file.
    File(PathBuf),
}

#[derive(Debug, Clone)]
pub struct ShellConfig {
    pub debug: bool,
    pub prompt: String,
    pub history: HistorySource,
    pub history_capacity: usize,
    pub batch_file: Option<PathBuf>,
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            debug: false,
            prompt: DEFAULT_PROMPT.to_string(),
            history: HistorySource::Memory,
            history_capacity: history::DEFAULT_CAPACITY,
            batch_file: None,
        }
    }
}

impl ShellConfig {
    /// Configuration for the real shell: history file from the environment
    /// or next to the executable, one page of history.
    pub fn from_env() -> Self {
        let history = match std::env::var_os(HISTFILE_ENV) {
            Some(path) if !path.is_empty() => HistorySource::File(PathBuf::from(path)),
            _ => default_history_path().map_or(HistorySource::Disabled, HistorySource::File),
        };
        Self {
            history,
            history_capacity: history::page_size(),
            ..Self::default()
        }
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn with_history(mut self, history: HistorySource) -> Self {
        self.history = history;
        self
    }

    pub fn with_history_capacity(mut self, capacity: usize) -> Self {
        self.history_capacity = capacity;
        self
    }

    pub fn with_batch_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.batch_file = Some(path.into());
        self
    }
}

/// `pipework_history` in the directory holding the running executable.
pub fn default_history_path() -> Option<PathBuf> {
    let exe = std::env::current_exe().ok()?;
    Some(exe.parent()?.join(HISTORY_FILE_NAME))
}
