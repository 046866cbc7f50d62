//! Request log configuration.

use std::path::PathBuf;

use serde::Deserialize;

/// Append-only log of incoming requests.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RequestLogConfig {
    /// Whether requests are written to the log file.
    pub enabled: bool,
    /// Application base directory the log file lives in.
    pub base_dir: PathBuf,
    /// File name of the log, relative to `base_dir`.
    pub file_name: String,
}

impl Default for RequestLogConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_dir: PathBuf::from("."),
            file_name: "requests.log".to_string(),
        }
    }
}

impl RequestLogConfig {
    /// Full path of the log file.
    pub fn path(&self) -> PathBuf {
        self.base_dir.join(&self.file_name)
    }
}
