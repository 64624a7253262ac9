//! Configuration consumed by the capture core.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration for traffic capture.
///
/// The listen port, certificate directory, and process-wrapping behavior
/// belong to the hosting transport; the capture core only needs to know which
/// hosts to record and where the trace file lives.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureConfig {
    /// Hostnames whose traffic is captured, matched as substrings of the
    /// request `Host` header. All other traffic is forwarded unrecorded.
    #[serde(default = "default_watch_hosts")]
    pub watch_hosts: Vec<String>,

    /// Path of the JSON Lines trace file (parent directories are created on
    /// first use).
    #[serde(default = "default_output_file")]
    pub output_file: PathBuf,
}

fn default_watch_hosts() -> Vec<String> {
    vec![
        "api.githubcopilot.com".to_string(),
        "api.individual.githubcopilot.com".to_string(),
    ]
}

fn default_output_file() -> PathBuf {
    PathBuf::from("traces/llm-trace.jsonl")
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            watch_hosts: default_watch_hosts(),
            output_file: default_output_file(),
        }
    }
}

impl CaptureConfig {
    /// Whether traffic for `host` should be captured.
    pub fn is_watched_host(&self, host: &str) -> bool {
        self.watch_hosts.iter().any(|h| host.contains(h.as_str()))
    }
}
