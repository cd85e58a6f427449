use tracing::{debug, warn};

use crate::ast::Pipeline;
use crate::builtins::{self, BuiltinOutcome};
use crate::fittings::{self, Fittings};
use crate::launcher::{self, ProcessHandles};
use crate::parser::{self, ParseError};
use crate::session::Session;
use crate::types::{ShellResult, EXIT_SHELL, INTERRUPTED_EXIT};
use crate::wait::{self, Phase};

/// Result of one pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Completion {
    pub code: i32,
    pub phase: Phase,
    pub reaped: usize,
    pub exit_requested: bool,
}

impl Completion {
    fn new(code: i32, phase: Phase) -> Self {
        Self {
            code,
            phase,
            reaped: 0,
            exit_requested: false,
        }
    }
}

/// Run one command line and return its exit code, or `EXIT_SHELL` when the
/// shell should stop.
pub fn run_one(session: &mut Session, line: &str, debug: bool) -> i32 {
    let line = line.trim_end_matches(['\n', '\r']);
    if line.trim().is_empty() {
        return 0;
    }
    if session.interrupt().is_raised() {
        debug!("interrupt pending, command dropped");
        return INTERRUPTED_EXIT;
    }

    let pipeline = match parser::parse(line) {
        Ok(pipeline) => pipeline,
        Err(ParseError::Empty) => return 0,
        Err(e) => {
            eprintln!("pipework: {}", e);
            return 1;
        }
    };

    let completion = match execute(session, &pipeline, debug) {
        Ok(completion) => completion,
        Err(e) => {
            eprintln!("pipework: {}", e);
            Completion::new(1, Phase::Dispatched)
        }
    };

    if completion.phase != Phase::Aborted && !completion.exit_requested {
        session.history.append(&pipeline.line);
    }

    if debug {
        eprintln!("exit code: {}", completion.code);
    }
    if completion.exit_requested {
        EXIT_SHELL
    } else {
        completion.code
    }
}

/// Run a parsed pipeline: fit, builtins, launch, reap. Setup failures come
/// back as errors with every descriptor already released.
pub fn execute(session: &mut Session, pipeline: &Pipeline, debug: bool) -> ShellResult<Completion> {
    if session.interrupt().is_raised() {
        return Ok(Completion::new(INTERRUPTED_EXIT, Phase::Aborted));
    }

    // Before anything is opened or run, so a bad argument aborts cleanly.
    let prepared = launcher::prepare(pipeline)?;
    let fittings = fittings::fit(pipeline)?;
    if debug {
        eprint!("{}", pipeline);
        eprintln!("fittings: {}", fittings);
    }

    let start = match run_builtin(session, pipeline, &fittings) {
        Ok(BuiltinOutcome::NotBuiltin) => 0,
        Ok(BuiltinOutcome::Ran) => {
            if debug {
                eprintln!("ran builtin \"{}\", pipeline now begins at stage 1", pipeline.stages[0].program());
            }
            1
        }
        Ok(BuiltinOutcome::ExitRequested) => {
            fittings.close()?;
            let mut completion = Completion::new(0, Phase::Dispatched);
            completion.exit_requested = true;
            return Ok(completion);
        }
        Err(e) => {
            eprintln!("pipework: {}", e);
            fittings.close()?;
            return Ok(Completion::new(1, Phase::Dispatched));
        }
    };

    // No partial forking: an interrupt that arrived during setup wins.
    if session.interrupt().is_raised() {
        fittings.close()?;
        return Ok(Completion::new(INTERRUPTED_EXIT, Phase::Aborted));
    }

    let mut handles = ProcessHandles::new();
    let launched = launcher::launch(&prepared, &fittings, start, session.default_interrupt(), &mut handles);

    // Children have their copies; ours must go or readers never see EOF.
    let closed = fittings.close();

    if handles.is_empty() {
        launched?;
        closed?;
        return Ok(Completion::new(0, Phase::Dispatched));
    }

    debug!(phase = ?Phase::Running, children = handles.len(), "waiting for pipeline");
    let (code, reaped) = wait::reap(handles);
    if let Err(e) = closed {
        warn!(error = %e, "failed to close pipeline descriptors");
    }
    // Whatever did start has been reaped; now the launch failure can surface.
    launched?;

    Ok(Completion {
        code,
        phase: Phase::Collected,
        reaped,
        exit_requested: false,
    })
}

fn run_builtin(
    session: &mut Session,
    pipeline: &Pipeline,
    fittings: &Fittings,
) -> ShellResult<BuiltinOutcome> {
    let first = &pipeline.stages[0];
    if !builtins::is_builtin(first.program()) {
        return Ok(BuiltinOutcome::NotBuiltin);
    }
    let mut out = fittings.writer(0)?;
    builtins::try_builtin(first, &mut *out, &mut session.history)
}
