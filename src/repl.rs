use std::fs::File;
use std::io::{self, BufRead, BufReader, IsTerminal, Write};

use anyhow::{Context as _, Result};
use rustyline::error::ReadlineError;
use rustyline::history::DefaultHistory;
use rustyline::Editor;
use tracing::debug;

use crate::completion::Completer;
use crate::config::ShellConfig;
use crate::executor::run_one;
use crate::session::Session;
use crate::types::EXIT_SHELL;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Line {
    Command(String),
    Interrupted,
    Eof,
}

/// Where command lines come from.
pub enum LineSource {
    Editor(Box<Editor<Completer, DefaultHistory>>),
    Reader(Box<dyn BufRead>),
}

impl LineSource {
    /// A line editor when stdin is a terminal and no batch file was given,
    /// a plain reader otherwise.
    pub fn for_config(config: &ShellConfig) -> Result<Self> {
        if let Some(path) = &config.batch_file {
            let file = File::open(path)
                .with_context(|| format!("Unable to open batch file: {}", path.display()))?;
            return Ok(LineSource::Reader(Box::new(BufReader::new(file))));
        }
        if io::stdin().is_terminal() {
            let mut editor: Editor<Completer, DefaultHistory> =
                Editor::new().context("Failed to create line editor")?;
            editor.set_helper(Some(Completer::new()));
            return Ok(LineSource::Editor(Box::new(editor)));
        }
        Ok(LineSource::Reader(Box::new(io::stdin().lock())))
    }

    pub fn next_line(&mut self, prompt: &str) -> Result<Line> {
        match self {
            LineSource::Editor(editor) => match editor.readline(prompt) {
                Ok(line) => {
                    if !line.trim().is_empty() {
                        let _ = editor.add_history_entry(line.as_str());
                    }
                    Ok(Line::Command(line))
                }
                Err(ReadlineError::Interrupted) => Ok(Line::Interrupted),
                Err(ReadlineError::Eof) => Ok(Line::Eof),
                Err(err) => Err(err).context("Failed to read command line"),
            },
            // SIGINT does not surface here: the handler is installed with
            // SA_RESTART and read_line retries EINTR, so `run` looks at the
            // flag once the read returns.
            LineSource::Reader(reader) => {
                let mut line = String::new();
                match reader.read_line(&mut line) {
                    Ok(0) => Ok(Line::Eof),
                    Ok(_) => Ok(Line::Command(line)),
                    Err(e) => Err(e).context("Failed to read command line"),
                }
            }
        }
    }
}

/// Read-execute loop. Returns the code the process should exit with.
pub fn run(session: &mut Session, input: &mut LineSource) -> Result<i32> {
    let debug = session.config.debug;
    let prompt = session.config.prompt.clone();
    let mut last = 0;

    loop {
        if session.interrupt().take() {
            println!();
        }
        let _ = io::stdout().flush();

        let line = input.next_line(&prompt)?;
        // An interrupt that arrived while waiting for input cancels the wait,
        // not the line that ended it.
        if session.interrupt().take() {
            println!();
        }

        match line {
            Line::Command(line) => {
                if line.trim().is_empty() {
                    continue;
                }
                let code = run_one(session, &line, debug);
                if code == EXIT_SHELL {
                    debug!("leaving on exit builtin");
                    return Ok(0);
                }
                last = code;
            }
            Line::Interrupted => session.interrupt().raise(),
            Line::Eof => {
                debug!("end of input");
                return Ok(last & 0xff);
            }
        }
    }
}
