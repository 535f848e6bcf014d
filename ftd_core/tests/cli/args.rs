use super::execute_ftd;

#[test]
fn test_version() {
    let output = execute_ftd(&["--version"], &[]);
    assert!(output.success);
    assert!(output.stdout.starts_with("ftd "));
}

#[test]
fn test_help() {
    let output = execute_ftd(&["--help"], &[]);
    assert!(output.success);
    assert!(output.stdout.contains("--check"));
    assert!(output.stdout.contains("--config"));
}

#[test]
fn test_no_tasks_file() {
    let output = execute_ftd(&[], &[]);
    assert!(!output.success);
    assert!(output.stderr.contains("<TASKS_FILE>"));
}

#[test]
fn test_tasks_file_not_found() {
    let output = execute_ftd(&["/nonexistent/tasks.yml"], &[]);
    assert!(!output.success);
    assert!(output.stderr.contains("cannot read /nonexistent/tasks.yml"));
}
