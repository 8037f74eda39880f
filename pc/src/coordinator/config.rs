//! Coordinator configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::transport::Tag;

/// Coordinator configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoordinatorConfig {
    /// Minimum spacing between satellite sends in milliseconds
    #[serde(default = "default_minimum_interval_ms", rename = "minimum-interval-ms")]
    pub minimum_interval_ms: u64,

    /// Tag on satellite-to-root progress packets
    #[serde(default = "default_progress_tag", rename = "progress-tag")]
    pub progress_tag: Tag,

    /// Socket channel used to reach the client
    #[serde(default = "default_client_channel", rename = "client-channel")]
    pub client_channel: i32,

    /// Tag on root-to-client frames
    #[serde(default = "default_progress_tag", rename = "client-tag")]
    pub client_tag: Tag,
}

fn default_minimum_interval_ms() -> u64 {
    debug!("default_minimum_interval_ms: called");
    500
}

fn default_progress_tag() -> Tag {
    debug!("default_progress_tag: called");
    31415
}

fn default_client_channel() -> i32 {
    debug!("default_client_channel: called");
    1
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        debug!("CoordinatorConfig::default: called");
        Self {
            minimum_interval_ms: 500,
            progress_tag: 31415,
            client_channel: 1,
            client_tag: 31415,
        }
    }
}

impl CoordinatorConfig {
    /// Get the minimum send interval as a Duration
    pub fn minimum_interval(&self) -> Duration {
        debug!(minimum_interval_ms = %self.minimum_interval_ms, "CoordinatorConfig::minimum_interval: called");
        Duration::from_millis(self.minimum_interval_ms)
    }
}
