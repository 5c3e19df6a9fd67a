use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_LOG_FILTER: &str = "info";
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5000;

/// Process configuration, read once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// `tracing` filter directive (`ERPD_LOG`).
    pub log_filter: String,
    /// Workspace opened before the first request (`ERPD_WORKSPACE`).
    pub workspace: Option<PathBuf>,
    /// How long a connection waits on a locked database (`ERPD_BUSY_TIMEOUT_MS`).
    pub busy_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_filter: DEFAULT_LOG_FILTER.to_string(),
            workspace: None,
            busy_timeout: Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();

        if let Some(v) = lookup("ERPD_LOG") {
            if !v.trim().is_empty() {
                cfg.log_filter = v.trim().to_string();
            }
        }
        if let Some(v) = lookup("ERPD_WORKSPACE") {
            if !v.trim().is_empty() {
                cfg.workspace = Some(PathBuf::from(v.trim()));
            }
        }
        if let Some(v) = lookup("ERPD_BUSY_TIMEOUT_MS") {
            match v.trim().parse::<u64>() {
                Ok(ms) => cfg.busy_timeout = Duration::from_millis(ms),
                // The subscriber is not installed yet; report through stderr directly.
                Err(_) => eprintln!(
                    "ignoring invalid ERPD_BUSY_TIMEOUT_MS={:?}, using {}",
                    v, DEFAULT_BUSY_TIMEOUT_MS
                ),
            }
        }

        cfg
    }
}
