use std::fmt;
use std::fs::{File, OpenOptions};
use std::os::fd::{AsRawFd, FromRawFd, IntoRawFd, OwnedFd, RawFd};

use libc::{STDIN_FILENO, STDOUT_FILENO};
use nix::fcntl::OFlag;
use nix::unistd;
use tracing::debug;

use crate::ast::Pipeline;
use crate::types::{Context, ShellError, ShellResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Input,
    Output,
}

/// One descriptor slot of the table.
#[derive(Debug)]
pub enum Fitting {
    /// The shell's own stdin or stdout; never closed by the engine.
    Inherit(RawFd),
    /// A redirection file or pipe end the engine must close.
    Owned(OwnedFd),
}

impl Fitting {
    pub fn raw_fd(&self) -> RawFd {
        match self {
            Fitting::Inherit(fd) => *fd,
            Fitting::Owned(fd) => fd.as_raw_fd(),
        }
    }

    pub fn is_owned(&self) -> bool {
        matches!(self, Fitting::Owned(_))
    }
}

/// Descriptor table for one pipeline: two slots per stage, input then output.
/// Dropping the table closes whatever it still owns.
#[derive(Debug)]
pub struct Fittings {
    slots: Vec<Fitting>,
}

fn slot(stage: usize, direction: Direction) -> usize {
    match direction {
        Direction::Input => 2 * stage,
        Direction::Output => 2 * stage + 1,
    }
}

impl Fittings {
    pub fn stages(&self) -> usize {
        self.slots.len() / 2
    }

    pub fn get(&self, stage: usize, direction: Direction) -> &Fitting {
        &self.slots[slot(stage, direction)]
    }

    pub fn input(&self, stage: usize) -> &Fitting {
        self.get(stage, Direction::Input)
    }

    pub fn output(&self, stage: usize) -> &Fitting {
        self.get(stage, Direction::Output)
    }

    /// Number of descriptors the table still has to close.
    pub fn owned_count(&self) -> usize {
        self.slots.iter().filter(|f| f.is_owned()).count()
    }

    /// A writer onto a stage's output, for builtins. The writer holds its own
    /// duplicate so the slot itself is still closed by `close`.
    pub fn writer(&self, stage: usize) -> ShellResult<Box<dyn std::io::Write>> {
        match self.output(stage) {
            Fitting::Inherit(_) => Ok(Box::new(std::io::stdout())),
            Fitting::Owned(fd) => {
                let dup = fd.try_clone().context("duplicate builtin output")?;
                Ok(Box::new(File::from(dup)))
            }
        }
    }

    /// Child side: put this stage's fittings on stdin/stdout, then close every
    /// descriptor of the table. Only called between fork and exec.
    pub fn attach(&self, stage: usize) -> nix::Result<()> {
        let input = self.input(stage).raw_fd();
        let output = self.output(stage).raw_fd();

        if input != STDIN_FILENO {
            unistd::dup2(input, STDIN_FILENO)?;
        }
        if output != STDOUT_FILENO {
            unistd::dup2(output, STDOUT_FILENO)?;
        }

        // The parent still owns these, so close the raw numbers in place
        // instead of dropping anything.
        for fitting in &self.slots {
            if let Fitting::Owned(fd) = fitting {
                unistd::close(fd.as_raw_fd())?;
            }
        }
        Ok(())
    }

    /// Parent side: close every owned descriptor exactly once. All slots are
    /// attempted; the first failure is reported.
    pub fn close(self) -> ShellResult<()> {
        let mut first_err = None;
        for fitting in self.slots {
            if let Fitting::Owned(fd) = fitting {
                let raw = fd.into_raw_fd();
                if let Err(errno) = unistd::close(raw) {
                    debug!(fd = raw, %errno, "close failed");
                    first_err.get_or_insert(ShellError::NixError(errno, "close fitting".into()));
                }
            }
        }
        match first_err {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

impl fmt::Display for Fittings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fds: Vec<String> = self.slots.iter().map(|s| s.raw_fd().to_string()).collect();
        write!(f, "[{}]", fds.join(", "))
    }
}

fn open_redirect(path: &str, direction: Direction) -> ShellResult<Fitting> {
    let mut options = OpenOptions::new();
    match direction {
        Direction::Input => options.read(true),
        Direction::Output => options.write(true).create(true).truncate(true),
    };
    let file = options.open(path).map_err(|source| ShellError::IoError {
        context: path.to_string(),
        source,
    })?;
    Ok(Fitting::Owned(OwnedFd::from(file)))
}

/// Build the descriptor table for a pipeline. On failure every descriptor
/// opened so far is closed before the error is returned.
pub fn fit(pipeline: &Pipeline) -> ShellResult<Fittings> {
    let stages = &pipeline.stages;
    let last = match stages.len() {
        0 => return Err(ShellError::InternalError("cannot fit an empty pipeline".into())),
        n => n - 1,
    };

    let mut slots = Vec::with_capacity(2 * stages.len());

    slots.push(match &stages[0].input {
        Some(path) => open_redirect(path, Direction::Input)?,
        None => Fitting::Inherit(STDIN_FILENO),
    });

    for _ in 0..last {
        // process i -> [write end | read end] -> process i + 1
        let (read_end, write_end) = unistd::pipe2(OFlag::O_CLOEXEC).context("pipe")?;
        // SAFETY: pipe2 just handed us both descriptors and nothing else owns them.
        let (read_end, write_end) =
            unsafe { (OwnedFd::from_raw_fd(read_end), OwnedFd::from_raw_fd(write_end)) };
        slots.push(Fitting::Owned(write_end));
        slots.push(Fitting::Owned(read_end));
    }

    slots.push(match &stages[last].output {
        Some(path) => open_redirect(path, Direction::Output)?,
        None => Fitting::Inherit(STDOUT_FILENO),
    });

    let fittings = Fittings { slots };
    debug!(stages = stages.len(), owned = fittings.owned_count(), "fitted pipeline");
    Ok(fittings)
}
