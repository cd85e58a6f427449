use std::fs;
use tempfile::NamedTempFile;

use super::{in_child, run, session};
use crate::builtins::HISTORY_REFUSAL;
use crate::config::{HistorySource, ShellConfig};
use crate::executor::run_one;
use crate::session::Session;
use crate::types::EXIT_SHELL;
use crate::wait::Phase;

#[test]
fn test_pid_runs_in_shell() -> Result<(), String> {
    let mut session = session();
    let temp_file = NamedTempFile::new().unwrap();
    let path = temp_file.path().to_str().unwrap();

    let done = run(&mut session, &format!("pid > {}", path))?;
    assert_eq!(done.code, 0);
    assert_eq!(done.reaped, 0);
    assert_eq!(done.phase, Phase::Dispatched);
    assert_eq!(fs::read_to_string(path).unwrap(), format!("{}\n", std::process::id()));

    Ok(())
}

#[test]
fn test_builtin_feeds_rest_of_pipeline() -> Result<(), String> {
    let mut session = session();
    let temp_file = NamedTempFile::new().unwrap();
    let path = temp_file.path().to_str().unwrap();

    let done = run(&mut session, &format!("pid | cat > {}", path))?;
    assert_eq!(done.code, 0);
    assert_eq!(done.reaped, 1);
    assert_eq!(fs::read_to_string(path).unwrap(), format!("{}\n", std::process::id()));

    Ok(())
}

#[test]
fn test_builtins_only_match_first_stage() -> Result<(), String> {
    let mut session = session();
    // "pid" is not a program, so as a later stage it fails to launch
    let done = run(&mut session, "true | pid")?;
    assert_eq!(done.reaped, 2);
    assert_ne!(done.code, 0);
    Ok(())
}

#[test]
fn test_exit_requests_shutdown() {
    let mut session = session();
    assert_eq!(run_one(&mut session, "exit", false), EXIT_SHELL);

    // exit is not remembered
    let temp_file = NamedTempFile::new().unwrap();
    let path = temp_file.path().to_str().unwrap();
    run_one(&mut session, &format!("history > {}", path), false);
    assert_eq!(fs::read_to_string(path).unwrap(), "");
}

#[test]
fn test_cd() {
    let original = std::env::current_dir().unwrap();
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().canonicalize().unwrap();

    // The working directory is shared by every test thread.
    let moved = in_child(|| {
        let mut session = session();
        let done = run(&mut session, &format!("cd {}", target.display())).unwrap();
        done.code == 0 && done.reaped == 0 && std::env::current_dir().unwrap() == target
    });
    assert!(moved);

    // A bad directory is reported, not fatal
    let kept = in_child(|| {
        let mut session = session();
        run_one(&mut session, "cd /nonexistent/pipework", false) == 1
            && std::env::current_dir().unwrap() == original
            && run_one(&mut session, "true", false) == 0
    });
    assert!(kept);

    assert_eq!(std::env::current_dir().unwrap(), original);
}

#[test]
fn test_history_builtin() {
    let mut session = session();
    let temp_file = NamedTempFile::new().unwrap();
    let path = temp_file.path().to_str().unwrap();

    run_one(&mut session, "true", false);
    run_one(&mut session, "false", false);
    run_one(&mut session, "echo  'a b'", false);

    run_one(&mut session, &format!("history > {}", path), false);
    assert_eq!(fs::read_to_string(path).unwrap(), "true\nfalse\necho  'a b'\n");

    run_one(&mut session, &format!("history -n 2 > {}", path), false);
    assert_eq!(
        fs::read_to_string(path).unwrap(),
        format!("echo  'a b'\nhistory > {}\n", path)
    );

    run_one(&mut session, &format!("history -n 0 > {}", path), false);
    assert_eq!(fs::read_to_string(path).unwrap(), "");

    run_one(&mut session, &format!("history -n 100 > {}", path), false);
    assert!(fs::read_to_string(path).unwrap().starts_with("true\nfalse\n"));

    assert_eq!(run_one(&mut session, "history -n lots", false), 1);
    assert_eq!(run_one(&mut session, "history --all", false), 1);
}

#[test]
fn test_history_negative_count_is_refused() {
    let temp_file = NamedTempFile::new().unwrap();
    let path = temp_file.path().to_str().unwrap();

    for source in [HistorySource::Memory, HistorySource::Disabled] {
        let mut session = Session::new(ShellConfig::default().with_history(source));
        run_one(&mut session, "true", false);
        let code = run_one(&mut session, &format!("history -n -1 > {}", path), false);
        assert_eq!(code, 0);
        assert_eq!(fs::read_to_string(path).unwrap(), HISTORY_REFUSAL);
    }
}
