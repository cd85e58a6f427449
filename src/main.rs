use std::env;
use std::process::ExitCode;

use anyhow::Result;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use pipework::config::ShellConfig;
use pipework::repl::{self, LineSource};
use pipework::Session;

fn main() -> ExitCode {
    // Respects RUST_LOG; stdout belongs to the commands.
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env())
        .init();

    match run() {
        Ok(code) => ExitCode::from(code as u8),
        Err(e) => {
            eprintln!("pipework: {e:?}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<i32> {
    let args: Vec<String> = env::args().collect();
    let mut config = ShellConfig::from_env();

    match args.get(1).map(|s| s.as_str()) {
        None => {}
        Some("-d" | "--debug") => config = config.with_debug(true),
        Some("-h" | "--help") => {
            print_help();
            return Ok(0);
        }
        Some("-V" | "--version") => {
            println!("pipework {}", env!("CARGO_PKG_VERSION"));
            return Ok(0);
        }
        Some(path) if !path.starts_with('-') => config = config.with_batch_file(path),
        Some(unknown) => {
            eprintln!("Unknown option: {unknown}");
            eprintln!("Run 'pipework --help' for usage.");
            return Ok(1);
        }
    }

    let mut input = LineSource::for_config(&config)?;
    let mut session = Session::new(config);
    if let Err(e) = session.install_interrupt_handler() {
        tracing::warn!(error = %e, "interrupt handler not installed, Ctrl-C will end the shell");
    }

    repl::run(&mut session, &mut input)
}

fn print_help() {
    println!(
        r#"pipework v{}

Usage:
  pipework                 Interactive shell
  pipework <batch-file>    Run commands from a file
  pipework -d, --debug     Interactive shell with pipeline diagnostics

Builtins:
  cd [DIR]                 Change directory (defaults to $HOME)
  pid                      Print the shell's process id
  history [-n COUNT]       Show shared history, optionally the last COUNT
  exit                     Leave the shell

Environment:
  PIPEWORK_HISTFILE        History file (default: next to the executable)
  RUST_LOG                 Log filter, e.g. RUST_LOG=pipework=debug
"#,
        env!("CARGO_PKG_VERSION")
    );
}
