use crate::utils::truncate_utf8;
use anyhow::Result;
use chrono::Local;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;

pub struct Logger {
    log_file: PathBuf,
}

#[derive(Debug, Default, Clone)]
pub struct SessionMetrics {
    pub turns_submitted: usize,
    pub completed_runs: usize,
    pub failed_runs: usize,
    pub api_errors: usize,
    pub attachment_failures: usize,
}

impl SessionMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn success_rate(&self) -> f64 {
        if self.turns_submitted == 0 {
            return 0.0;
        }
        (self.completed_runs as f64 / self.turns_submitted as f64) * 100.0
    }
}

impl Logger {
    pub fn new(log_dir: &str) -> Result<Self> {
        let dir = PathBuf::from(log_dir);
        if !dir.exists() {
            fs::create_dir_all(&dir)?;
        }

        let timestamp = Local::now().format("%Y%m%d_%H%M%S");
        let log_file = dir.join(format!("session_{}.log", timestamp));

        Ok(Self { log_file })
    }

    pub fn log(&self, message: &str) -> Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.log_file)?;

        let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S");
        writeln!(file, "[{}] {}", timestamp, message)?;
        Ok(())
    }

    pub fn log_turn(&self, session_id: &str, prompt: &str) -> Result<()> {
        self.log(&format!("TURN [{}]: {}", session_id, truncate_utf8(prompt, 200)))
    }

    pub fn log_run_outcome(&self, session_id: &str, status: &str, text: &str) -> Result<()> {
        self.log(&format!(
            "RUN [{}] {}: {}",
            session_id,
            status.to_uppercase(),
            truncate_utf8(text, 200)
        ))
    }

    pub fn log_error(&self, error: &str) -> Result<()> {
        self.log(&format!("ERROR: {}", error))
    }
}
