//! Remote configuration.
//!
//! Supports loading from YAML files with environment variable overrides.
//! Adapter settings sit at the top level of the file next to `data_dir`:
//!
//! ```yaml
//! ip: 10.0.0.5
//! mac: "a8:23:fe:01:02:03"
//! connect_timeout_ms: 15000
//! data_dir: /var/lib/lgtv
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use lgtv_core::protocol_constants::DESCRIPTOR_CONFIG_KEY;
use lgtv_core::{AdapterConfig, ConfigStore, DeviceDescriptor};
use serde::Deserialize;

/// Remote configuration loaded from YAML with environment overrides.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    /// Adapter settings (addresses, timeouts, discovery tuning).
    /// Overrides: `LGTV_IP`, `LGTV_MAC` (via CLI), `LGTV_CONNECT_TIMEOUT_MS`,
    /// `LGTV_DISCOVERY_TIMEOUT_MS`, `LGTV_REPEAT_DELAY_MS`
    #[serde(flatten)]
    pub adapter: AdapterConfig,

    /// Directory holding the persisted descriptor and pairing key.
    /// Override: `LGTV_DATA_DIR` (via CLI)
    pub data_dir: Option<PathBuf>,
}

impl RemoteConfig {
    /// Loads configuration from a YAML file, then applies environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = if let Some(path) = path {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            Self::from_yaml(&content)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?
        } else {
            Self::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    fn from_yaml(content: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// Applies environment variable overrides to the configuration.
    fn apply_env_overrides(&mut self) {
        let overrides = [
            (
                "LGTV_CONNECT_TIMEOUT_MS",
                &mut self.adapter.connect_timeout_ms,
            ),
            (
                "LGTV_DISCOVERY_TIMEOUT_MS",
                &mut self.adapter.discovery_timeout_ms,
            ),
            ("LGTV_REPEAT_DELAY_MS", &mut self.adapter.repeat_delay_ms),
        ];
        for (name, field) in overrides {
            if let Ok(val) = std::env::var(name) {
                match val.parse() {
                    Ok(ms) => *field = ms,
                    Err(_) => log::warn!("Ignoring {}={:?}: not a number", name, val),
                }
            }
        }

        // Note: LGTV_IP, LGTV_MAC and LGTV_DATA_DIR are handled by clap via
        // #[arg(env = ...)] in main.rs
    }

    /// Fills addresses missing from the configuration with the descriptor a
    /// previous run saved to `store`.
    pub fn merge_saved_descriptor(&mut self, store: &dyn ConfigStore) {
        let Some(saved) = store.load(DESCRIPTOR_CONFIG_KEY) else {
            return;
        };
        let saved: DeviceDescriptor = match serde_json::from_value(saved) {
            Ok(saved) => saved,
            Err(e) => {
                log::warn!("Ignoring saved TV address: {}", e);
                return;
            }
        };

        // A saved MAC only belongs to the saved IP.
        if self.adapter.ip.is_none() {
            self.adapter.ip = saved.ip;
            if self.adapter.mac.is_none() {
                self.adapter.mac = saved.mac;
            }
        } else if self.adapter.ip == saved.ip && self.adapter.mac.is_none() {
            self.adapter.mac = saved.mac;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lgtv_core::MemoryStore;
    use serde_json::json;

    #[test]
    fn parses_flat_yaml() {
        let config = RemoteConfig::from_yaml(
            "ip: 10.0.0.5\nconnect_timeout_ms: 15000\ndata_dir: /var/lib/lgtv\n",
        )
        .unwrap();

        assert_eq!(config.adapter.ip.as_deref(), Some("10.0.0.5"));
        assert_eq!(config.adapter.connect_timeout_ms, 15_000);
        assert_eq!(config.adapter.control_port, 3000);
        assert_eq!(config.data_dir, Some(PathBuf::from("/var/lib/lgtv")));
    }

    #[test]
    fn load_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lgtv.yaml");
        std::fs::write(&path, "mac: \"a:b:2:33:4:5\"\n").unwrap();

        let config = RemoteConfig::load(Some(&path)).unwrap();
        assert_eq!(config.adapter.mac.as_deref(), Some("a:b:2:33:4:5"));
    }

    #[test]
    fn missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(RemoteConfig::load(Some(&dir.path().join("nope.yaml"))).is_err());
    }

    #[test]
    fn saved_descriptor_fills_missing_addresses() {
        let store = MemoryStore::new();
        store
            .save(
                DESCRIPTOR_CONFIG_KEY,
                json!({ "ip": "10.0.0.5", "mac": "0a:0b:02:33:04:05" }),
            )
            .unwrap();

        let mut config = RemoteConfig::default();
        config.merge_saved_descriptor(&store);
        assert_eq!(config.adapter.ip.as_deref(), Some("10.0.0.5"));
        assert_eq!(config.adapter.mac.as_deref(), Some("0a:0b:02:33:04:05"));
    }

    #[test]
    fn saved_mac_is_not_applied_to_another_ip() {
        let store = MemoryStore::new();
        store
            .save(
                DESCRIPTOR_CONFIG_KEY,
                json!({ "ip": "10.0.0.5", "mac": "0a:0b:02:33:04:05" }),
            )
            .unwrap();

        let mut config = RemoteConfig::default();
        config.adapter.ip = Some("10.0.0.9".into());
        config.merge_saved_descriptor(&store);
        assert_eq!(config.adapter.ip.as_deref(), Some("10.0.0.9"));
        assert_eq!(config.adapter.mac, None);
    }
}
