use std::env;
use std::io::Write;
use std::path::PathBuf;

use tracing::debug;

use crate::ast::Stage;
use crate::history::History;
use crate::types::{ShellError, ShellResult};

pub const BUILTINS: [&str; 4] = ["cd", "exit", "history", "pid"];

/// What happened when the first stage was offered to the builtins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuiltinOutcome {
    Ran,
    NotBuiltin,
    ExitRequested,
}

pub const HISTORY_REFUSAL: &str =
    "history: the future has not been written yet, try again later\n";

pub fn is_builtin(name: &str) -> bool {
    BUILTINS.contains(&name)
}

pub fn try_builtin(
    stage: &Stage,
    out: &mut dyn Write,
    history: &mut History,
) -> ShellResult<BuiltinOutcome> {
    let args = stage.args();
    match stage.program() {
        "cd" => {
            change_dir(args)?;
            Ok(BuiltinOutcome::Ran)
        }
        "exit" => {
            debug!("exit requested");
            eprintln!("exiting...");
            Ok(BuiltinOutcome::ExitRequested)
        }
        "pid" => {
            writeln!(out, "{}", nix::unistd::getpid())
                .and_then(|_| out.flush())
                .map_err(|e| ShellError::Builtin("pid", e.to_string()))?;
            Ok(BuiltinOutcome::Ran)
        }
        "history" => {
            show_history(args, out, history)?;
            Ok(BuiltinOutcome::Ran)
        }
        _ => Ok(BuiltinOutcome::NotBuiltin),
    }
}

fn change_dir(args: &[String]) -> ShellResult<()> {
    let path = match args {
        [] => env::var("HOME")
            .map(PathBuf::from)
            .map_err(|_| ShellError::Builtin("cd", "HOME not set".to_string()))?,
        [dir] => PathBuf::from(dir),
        _ => return Err(ShellError::Builtin("cd", "too many arguments".to_string())),
    };

    env::set_current_dir(&path)
        .map_err(|e| ShellError::Builtin("cd", format!("{}: {}", path.display(), e)))?;
    debug!(dir = %path.display(), "changed directory");
    Ok(())
}

fn show_history(args: &[String], out: &mut dyn Write, history: &mut History) -> ShellResult<()> {
    let limit = match args {
        [] => None,
        [flag, count] if flag == "-n" => {
            let count: i64 = count
                .parse()
                .map_err(|_| ShellError::Builtin("history", format!("{}: not an integer", count)))?;
            if count < 0 {
                out.write_all(HISTORY_REFUSAL.as_bytes())
                    .and_then(|_| out.flush())
                    .map_err(|e| ShellError::Builtin("history", e.to_string()))?;
                return Ok(());
            }
            Some(usize::try_from(count).unwrap_or(usize::MAX))
        }
        _ => {
            return Err(ShellError::Builtin("history", "usage: history [-n COUNT]".to_string()));
        }
    };

    history
        .render(limit, out)
        .map_err(|e| ShellError::Builtin("history", e.to_string()))
}
