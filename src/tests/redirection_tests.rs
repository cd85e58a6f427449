use std::fs;
use tempfile::NamedTempFile;

use super::{run, session};
use crate::executor::run_one;

#[test]
fn test_basic_redirection() -> Result<(), String> {
    let mut session = session();
    let temp_file = NamedTempFile::new().unwrap();
    let path = temp_file.path().to_str().unwrap();

    let done = run(&mut session, &format!("echo hello > {}", path))?;
    assert_eq!(done.code, 0);
    assert_eq!(fs::read_to_string(path).unwrap(), "hello\n");

    // Output redirection truncates
    run(&mut session, &format!("echo hi > {}", path))?;
    assert_eq!(fs::read_to_string(path).unwrap(), "hi\n");

    Ok(())
}

#[test]
fn test_file_hands_bytes_to_next_command() -> Result<(), String> {
    let mut session = session();
    let first = NamedTempFile::new().unwrap();
    let second = NamedTempFile::new().unwrap();
    let first_path = first.path().to_str().unwrap();
    let second_path = second.path().to_str().unwrap();

    run(&mut session, &format!("head -c 8192 /dev/urandom > {}", first_path))?;
    run(&mut session, &format!("cat < {} > {}", first_path, second_path))?;

    let written = fs::read(first_path).unwrap();
    assert_eq!(written.len(), 8192);
    assert_eq!(written, fs::read(second_path).unwrap());

    Ok(())
}

#[test]
fn test_input_redirection_into_pipeline() -> Result<(), String> {
    let mut session = session();
    let input = NamedTempFile::new().unwrap();
    let output = NamedTempFile::new().unwrap();
    fs::write(input.path(), "b\na\nc\n").unwrap();

    let cmd = format!(
        "sort < {} | head -n 2 > {}",
        input.path().display(),
        output.path().display()
    );
    let done = run(&mut session, &cmd)?;
    assert_eq!(done.code, 0);
    assert_eq!(fs::read_to_string(output.path()).unwrap(), "a\nb\n");

    Ok(())
}

#[test]
fn test_redirection_errors() -> Result<(), String> {
    let mut session = session();

    // Nothing to read from: setup fails before anything runs
    let result = run(&mut session, "cat < /nonexistent/pipework/input");
    assert!(result.is_err());

    // Cannot create the output file
    let result = run(&mut session, "echo hello > /dev/null/file");
    assert!(result.is_err());

    // The session carries on afterwards
    assert_eq!(run_one(&mut session, "cat < /nonexistent/pipework/input", false), 1);
    assert_eq!(run_one(&mut session, "true", false), 0);

    Ok(())
}
