use super::{UNREACHABLE_HOSTNAME, credentials_env, execute_ftd, write_file};

use tempfile::tempdir;

const LIST_NETWORKS: &str = r#"
- name: list networks
  ftd_configuration:
    operation: getNetworkObjectList
"#;

#[test]
fn test_unknown_module() {
    let dir = tempdir().unwrap();
    let tasks = write_file(&dir, "tasks.yml", "- command: ls\n");

    let output = execute_ftd(&[tasks.as_str()], &credentials_env());

    assert!(!output.success);
    assert!(output.stderr.contains("'command' is not valid in task"));
}

#[test]
fn test_missing_credentials() {
    let dir = tempdir().unwrap();
    let tasks = write_file(&dir, "tasks.yml", LIST_NETWORKS);

    let output = execute_ftd(&[tasks.as_str()], &[("FTD_HOSTNAME", UNREACHABLE_HOSTNAME)]);

    assert!(!output.success);
    assert!(
        output
            .stderr
            .contains("missing connection settings: username, password")
    );
}

#[test]
fn test_invalid_operation_fails_before_login() {
    let dir = tempdir().unwrap();
    let tasks = write_file(
        &dir,
        "tasks.yml",
        r#"
- name: list networks
  ftd_configuration:
    operation: getNetworkObjectList
- name: broken
  ftd_configuration:
    operation: fetchNetworkObject
"#,
    );

    let output = execute_ftd(&[tasks.as_str()], &credentials_env());

    assert!(!output.success);
    assert!(output.stderr.contains("task 'broken': invalid operation"));
    assert!(!output.stdout.contains("logged in"));
}

#[test]
fn test_unknown_model_fails_before_login() {
    let dir = tempdir().unwrap();
    let tasks = write_file(
        &dir,
        "tasks.yml",
        r#"
- ftd_configuration:
    operation: getSyslogServerList
"#,
    );

    let output = execute_ftd(&[tasks.as_str()], &credentials_env());

    assert!(!output.success);
    assert!(output.stderr.contains("unknown model 'SyslogServer'"));
}

#[test]
fn test_config_file_models() {
    let dir = tempdir().unwrap();
    let tasks = write_file(
        &dir,
        "tasks.yml",
        r#"
- ftd_configuration:
    operation: getSyslogServerList
"#,
    );
    let config = write_file(
        &dir,
        "ftd.yml",
        &format!(
            r#"
hostname: {UNREACHABLE_HOSTNAME}
username: admin
password: secret
timeout: 5
models:
  SyslogServer: /object/syslogalerts
"#
        ),
    );

    let output = execute_ftd(&["--config", config.as_str(), tasks.as_str()], &[]);

    // validation passes, then the login cannot reach the device
    assert!(!output.success);
    assert!(!output.stderr.contains("unknown model"));
    assert!(output.stderr.contains("[ERROR]"));
}

#[test]
fn test_config_file_unknown_field() {
    let dir = tempdir().unwrap();
    let tasks = write_file(&dir, "tasks.yml", LIST_NETWORKS);
    let config = write_file(&dir, "ftd.yml", "hostname: ftd.local\nport: 443\n");

    let output = execute_ftd(&["-c", config.as_str(), tasks.as_str()], &credentials_env());

    assert!(!output.success);
    assert!(output.stderr.contains("unknown field `port`"));
}
