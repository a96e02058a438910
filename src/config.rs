use anyhow::Result;
use serde::{Deserialize, Serialize};

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";
const DEFAULT_NODE_TIMEOUT_SECONDS: u64 = 30;
const DEFAULT_RUN_TIMEOUT_SECONDS: u64 = 300; // 5 minutes
const MIN_TIMEOUT_SECONDS: u64 = 1;

/// Engine settings, read once at startup from the environment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineSettings {
    pub bind_addr: String,
    /// Budget for a single node execution (outbound HTTP included).
    pub node_timeout_seconds: u64,
    /// Budget for a whole flow run.
    pub run_timeout_seconds: u64,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            node_timeout_seconds: DEFAULT_NODE_TIMEOUT_SECONDS,
            run_timeout_seconds: DEFAULT_RUN_TIMEOUT_SECONDS,
        }
    }
}

impl EngineSettings {
    /// Load settings from LEADFLOW_* environment variables, falling back to
    /// defaults for anything unset or unparsable.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            bind_addr: std::env::var("LEADFLOW_BIND").unwrap_or(defaults.bind_addr),
            node_timeout_seconds: env_u64("LEADFLOW_NODE_TIMEOUT_SECS")
                .unwrap_or(defaults.node_timeout_seconds),
            run_timeout_seconds: env_u64("LEADFLOW_RUN_TIMEOUT_SECS")
                .unwrap_or(defaults.run_timeout_seconds),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.node_timeout_seconds < MIN_TIMEOUT_SECONDS {
            return Err(anyhow::anyhow!(
                "Node timeout must be at least {} second(s)",
                MIN_TIMEOUT_SECONDS
            ));
        }
        if self.run_timeout_seconds < self.node_timeout_seconds {
            return Err(anyhow::anyhow!(
                "Run timeout must not be shorter than the node timeout"
            ));
        }
        Ok(())
    }
}

fn env_u64(key: &str) -> Option<u64> {
    std::env::var(key).ok().and_then(|v| v.parse().ok())
}
