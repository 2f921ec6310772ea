use funcmon_client::{ClientConfig, DEFAULT_SERVER_ADDR};
use funcmon_common::{FuncMonError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::refresh::OverlapPolicy;

/// How often the dashboard polls the metrics feed.
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_millis(1000);

/// Dashboard settings, loadable from a JSON file. Missing fields take their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    pub server_addr: String,
    pub refresh_interval_ms: u64,
    /// Skip a tick while the previous one is still fetching.
    pub single_flight: bool,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            server_addr: DEFAULT_SERVER_ADDR.to_string(),
            refresh_interval_ms: DEFAULT_REFRESH_INTERVAL.as_millis() as u64,
            single_flight: false,
        }
    }
}

impl DashboardConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| FuncMonError::InvalidConfig(format!("cannot read {}: {}", path.display(), e)))?;
        let config: Self = serde_json::from_str(&text)
            .map_err(|e| FuncMonError::InvalidConfig(format!("cannot parse {}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.server_addr.trim().is_empty() {
            return Err(FuncMonError::InvalidConfig("server address must not be empty".to_string()));
        }
        if self.refresh_interval_ms == 0 {
            return Err(FuncMonError::InvalidConfig("refresh interval must be positive".to_string()));
        }
        Ok(())
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_millis(self.refresh_interval_ms)
    }

    pub fn overlap_policy(&self) -> OverlapPolicy {
        if self.single_flight {
            OverlapPolicy::SingleFlight
        } else {
            OverlapPolicy::Concurrent
        }
    }

    pub fn client_config(&self) -> ClientConfig {
        ClientConfig { server_addr: self.server_addr.clone() }
    }
}
