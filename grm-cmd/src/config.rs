//! TOML configuration shared by every subcommand.

use grm_collect::CollectConfig;
use grm_gee::GeeConfig;
use grm_server::ServeConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

const DEFAULT_CONFIG_PATH: &str = "grm.toml";

/// Top-level configuration file. Every section is optional; an absent
/// section keeps its defaults, and an absent file means all defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GrmConfig {
    pub gee: GeeConfig,
    pub collect: CollectConfig,
    pub serve: ServeConfig,
}

impl GrmConfig {
    /// Load from an explicit path, or from `grm.toml` in the working
    /// directory when present. An explicit path that is missing is an error;
    /// a missing default path is not.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let path = match path {
            Some(path) => path,
            None => {
                let default = Path::new(DEFAULT_CONFIG_PATH);
                if !default.exists() {
                    return Ok(GrmConfig::default());
                }
                default
            }
        };
        let raw = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("reading {}: {}", path.display(), e))?;
        let config = toml::from_str(&raw)
            .map_err(|e| anyhow::anyhow!("parsing {}: {}", path.display(), e))?;
        Ok(config)
    }
}
