use crate::error::AssistantError;
use serde::Deserialize;
use std::fs;
use std::path::PathBuf;

/// Application configuration, loaded from `clientdash.toml`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub port: u16,
    pub api_base: String,
    pub request_timeout_secs: u64,
    pub dataset_ttl_secs: u64,
    pub sandbox_enabled: bool,
    pub sandbox_timeout_secs: u64,
    pub python_executable: String,
    pub log_dir: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: 8688,
            api_base: "https://api.openai.com/v1".to_string(),
            request_timeout_secs: 120,
            dataset_ttl_secs: 3600,
            sandbox_enabled: false,
            sandbox_timeout_secs: 10,
            python_executable: "python3".to_string(),
            log_dir: "logs".to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration with the chain: `./clientdash.toml` -> `~/clientdash.toml` -> defaults.
    pub fn load() -> Self {
        let candidates = Self::config_paths();
        for path in &candidates {
            if let Ok(contents) = fs::read_to_string(path) {
                match toml::from_str::<AppConfig>(&contents) {
                    Ok(cfg) => return cfg,
                    Err(e) => {
                        eprintln!("Warning: failed to parse {}: {}", path.display(), e);
                    }
                }
            }
        }
        Self::default()
    }

    fn config_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from("clientdash.toml")];
        if let Some(home) = dirs::home_dir() {
            paths.push(home.join("clientdash.toml"));
        }
        paths
    }
}

/// The three required secrets, read from the environment (populated from
/// `.env` by dotenvy in `main`). A missing secret halts startup before any
/// remote call is attempted.
#[derive(Debug, Clone)]
pub struct Secrets {
    pub api_key: String,
    pub assistant_id: String,
    pub sheet_url: String,
}

impl Secrets {
    pub fn from_env() -> Result<Self, AssistantError> {
        Ok(Self {
            api_key: require_var("OPENAI_API_KEY")?,
            assistant_id: require_var("OPENAI_ASSISTANT_ID")?,
            sheet_url: require_var("SHEET_URL")?,
        })
    }
}

fn require_var(name: &str) -> Result<String, AssistantError> {
    match std::env::var(name) {
        Ok(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(AssistantError::Configuration(format!(
            "{name} missing in .env / environment"
        ))),
    }
}
