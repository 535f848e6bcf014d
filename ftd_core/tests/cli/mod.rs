mod args;
mod tasks;

use std::path::Path;
use std::process::Command;

use tempfile::TempDir;

const FTD_ENV_VARS: [&str; 4] = ["FTD_HOSTNAME", "FTD_USERNAME", "FTD_PASSWORD", "FTD_LOG_LEVEL"];

/// Device address nothing listens on, so a login attempt fails fast.
pub const UNREACHABLE_HOSTNAME: &str = "https://127.0.0.1:1";

pub struct Output {
    pub stdout: String,
    pub stderr: String,
    pub success: bool,
}

pub fn execute_ftd(args: &[&str], envs: &[(&str, &str)]) -> Output {
    let bin_path = Path::new(env!("CARGO_BIN_EXE_ftd"));

    let mut cmd = Command::new(bin_path);
    for var in FTD_ENV_VARS {
        cmd.env_remove(var);
    }
    cmd.args(args).envs(envs.iter().copied());

    let output = cmd.output().unwrap();
    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();

    dbg!(&stdout);
    dbg!(&stderr);

    Output {
        stdout,
        stderr,
        success: output.status.success(),
    }
}

/// Writes `content` into `dir` and returns its path as a string.
pub fn write_file(dir: &TempDir, name: &str, content: &str) -> String {
    let path = dir.path().join(name);
    std::fs::write(&path, content).unwrap();
    path.to_str().unwrap().to_owned()
}

pub fn credentials_env() -> Vec<(&'static str, &'static str)> {
    vec![
        ("FTD_HOSTNAME", UNREACHABLE_HOSTNAME),
        ("FTD_USERNAME", "admin"),
        ("FTD_PASSWORD", "secret"),
    ]
}
