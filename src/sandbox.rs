//! Local fallback execution for assistant-produced analysis code. Used only
//! when enabled in configuration and the remote run returned code but no
//! rendered image. Each run gets a throwaway scratch directory holding the
//! script and the working dataset, wiped afterwards.

use crate::config::AppConfig;
use crate::error::AssistantError;
use crate::publisher::DATASET_FILENAME;
use crate::utils::ensure_dir;
use anyhow::{Context, Result};
use chrono::Utc;
use std::fs;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::time::Duration;
use wait_timeout::ChildExt;

/// Chart file the fallback picks up when the script saved one next to itself.
pub const CHART_FILENAME: &str = "chart.png";

#[derive(Debug)]
pub struct SandboxResult {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: Option<i32>,
    /// Raw bytes of `chart.png` when the script produced it.
    pub chart: Option<Vec<u8>>,
}

impl SandboxResult {
    pub fn is_success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

pub struct SandboxRunner {
    python_executable: String,
    timeout_secs: u64,
}

impl SandboxRunner {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            python_executable: config.python_executable.clone(),
            timeout_secs: config.sandbox_timeout_secs,
        }
    }

    /// Run `code` in a fresh scratch directory with the dataset present as
    /// `client_data.csv`. A run past the deadline is killed and reported as
    /// `LocalExecutionTimeout`; the scratch directory is removed either way.
    pub fn run(&self, code: &str, dataset_csv: &[u8]) -> Result<SandboxResult> {
        let scratch = self.create_scratch_dir()?;
        let result = self.run_in(&scratch, code, dataset_csv);
        let _ = fs::remove_dir_all(&scratch);
        result
    }

    fn create_scratch_dir(&self) -> Result<PathBuf> {
        let ts = Utc::now().format("%Y%m%d_%H%M%S_%f");
        let dir = std::env::temp_dir().join(format!("clientdash_sandbox_{ts}"));
        ensure_dir(&dir)?;
        Ok(dir)
    }

    fn run_in(&self, scratch: &PathBuf, code: &str, dataset_csv: &[u8]) -> Result<SandboxResult> {
        let script_path = scratch.join("analysis.py");
        fs::write(&script_path, code).context("Failed to write analysis script")?;
        fs::write(scratch.join(DATASET_FILENAME), dataset_csv)
            .context("Failed to write dataset into scratch directory")?;

        let mut process = Command::new(&self.python_executable)
            .arg("analysis.py")
            .current_dir(scratch)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .context("Failed to spawn python")?;

        let timeout = Duration::from_secs(self.timeout_secs);
        match process
            .wait_timeout(timeout)
            .context("Failed to wait for python process")?
        {
            Some(status) => {
                let stdout = read_pipe(process.stdout.take());
                let stderr = read_pipe(process.stderr.take());
                let chart = fs::read(scratch.join(CHART_FILENAME)).ok();
                Ok(SandboxResult {
                    stdout,
                    stderr,
                    exit_code: status.code(),
                    chart,
                })
            }
            None => {
                let _ = process.kill();
                let _ = process.wait();
                Err(AssistantError::LocalExecutionTimeout(self.timeout_secs).into())
            }
        }
    }
}

/// Helper to read a piped child stdio handle into a String.
fn read_pipe<R: std::io::Read>(pipe: Option<R>) -> String {
    match pipe {
        Some(mut r) => {
            let mut buf = Vec::new();
            let _ = std::io::Read::read_to_end(&mut r, &mut buf);
            String::from_utf8_lossy(&buf).to_string()
        }
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn runner(timeout_secs: u64) -> SandboxRunner {
        SandboxRunner {
            python_executable: "python3".to_string(),
            timeout_secs,
        }
    }

    #[test]
    fn test_captures_stdout_and_exit_code() {
        let result = runner(10).run("print('total: 42')", b"").unwrap();
        assert!(result.is_success());
        assert_eq!(result.stdout.trim(), "total: 42");
        assert!(result.chart.is_none());
    }

    #[test]
    fn test_dataset_is_visible_to_the_script() {
        let code = "print(open('client_data.csv').read(), end='')";
        let result = runner(10).run(code, b"client_id,country\nc1,DE\n").unwrap();
        assert!(result.is_success());
        assert_eq!(result.stdout, "client_id,country\nc1,DE\n");
    }

    #[test]
    fn test_chart_file_is_picked_up() {
        let code = "open('chart.png', 'wb').write(b'\\x89PNG fake')";
        let result = runner(10).run(code, b"").unwrap();
        assert_eq!(result.chart.as_deref(), Some(&b"\x89PNG fake"[..]));
    }

    #[test]
    fn test_script_error_is_reported_not_fatal() {
        let result = runner(10).run("raise SystemExit(3)", b"").unwrap();
        assert!(!result.is_success());
        assert_eq!(result.exit_code, Some(3));
    }

    #[test]
    fn test_runaway_script_is_killed_at_the_deadline() {
        let err = runner(1)
            .run("import time\ntime.sleep(30)", b"")
            .unwrap_err();
        let err = err.downcast::<AssistantError>().unwrap();
        assert!(matches!(err, AssistantError::LocalExecutionTimeout(1)));
    }
}
