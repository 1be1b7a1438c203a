//! Report output configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ReportConfig {
    /// File the report is written to at shutdown.
    #[serde(default = "default_path")]
    pub path: PathBuf,

    /// Also print the report on stdout.
    #[serde(default = "default_console")]
    pub console: bool,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            path: default_path(),
            console: default_console(),
        }
    }
}

fn default_path() -> PathBuf {
    PathBuf::from("timestamps.txt")
}

fn default_console() -> bool {
    true
}
