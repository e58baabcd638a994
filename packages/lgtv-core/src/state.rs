//! Adapter configuration and device descriptor types.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::protocol_constants::{
    CONNECT_TIMEOUT_MS, DISCOVERY_TIMEOUT_MS, MEDIA_RENDERER_SEARCH_TARGET, REPEAT_DELAY_MS,
    SSAP_PORT, WEBOS_SERVER_SIGNATURE,
};
use crate::utils::normalize_mac;

/// Address record identifying the target TV.
///
/// Starts from whatever the host configured and is completed during
/// discovery. This is also the shape persisted to the config store.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
pub struct DeviceDescriptor {
    /// IPv4 address of the TV.
    #[serde(default)]
    pub ip: Option<String>,
    /// Hardware address, always in normalized `aa:bb:cc:dd:ee:ff` form.
    #[serde(default)]
    pub mac: Option<String>,
}

impl DeviceDescriptor {
    /// Creates a descriptor, normalizing the hardware address if present.
    ///
    /// An unparseable hardware address is dropped so that discovery tries to
    /// resolve it again.
    pub fn new(ip: Option<String>, mac: Option<String>) -> Self {
        let ip = ip.filter(|s| !s.trim().is_empty());
        let mac = mac.as_deref().and_then(|raw| {
            let normalized = normalize_mac(raw);
            if normalized.is_none() {
                log::warn!("[Config] Ignoring malformed hardware address {:?}", raw);
            }
            normalized
        });
        Self { ip, mac }
    }

    /// Returns true when both addresses are known and discovery can be skipped.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.ip.is_some() && self.mac.is_some()
    }

    /// Returns the SSAP WebSocket URL for this TV, if the IP is known.
    #[must_use]
    pub fn control_url(&self, port: u16) -> Option<String> {
        self.ip.as_ref().map(|ip| format!("ws://{}:{}", ip, port))
    }
}

/// Configuration for the TV adapter.
///
/// All fields except the addresses have defaults matching webOS firmware
/// behavior. `ip` and `mac` come from the host and are usually the values
/// persisted by a previous run.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct AdapterConfig {
    /// Known IP of the TV (skips SSDP discovery when set).
    pub ip: Option<String>,

    /// Known hardware address of the TV (skips ARP resolution when set).
    pub mac: Option<String>,

    // Control channel
    /// SSAP WebSocket port.
    pub control_port: u16,

    /// Time allowed for the WebSocket connect + pairing handshake (milliseconds).
    pub connect_timeout_ms: u64,

    // Discovery
    /// Time allowed for SSDP discovery to find the TV (milliseconds).
    pub discovery_timeout_ms: u64,

    /// SSDP search target.
    pub search_target: String,

    /// Substring the SSDP `SERVER` header must contain.
    pub server_signature: String,

    /// Number of M-SEARCH packets to send during discovery.
    pub ssdp_send_count: u64,

    /// Delay between M-SEARCH packet retries (milliseconds).
    pub ssdp_retry_delay_ms: u64,

    /// MX value (max response delay in seconds).
    pub ssdp_mx: u64,

    // Pacing
    /// Delay after each request of a repeat action (milliseconds).
    pub repeat_delay_ms: u64,
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            ip: None,
            mac: None,
            control_port: SSAP_PORT,
            connect_timeout_ms: CONNECT_TIMEOUT_MS,
            discovery_timeout_ms: DISCOVERY_TIMEOUT_MS,
            search_target: MEDIA_RENDERER_SEARCH_TARGET.to_string(),
            server_signature: WEBOS_SERVER_SIGNATURE.to_string(),
            ssdp_send_count: 3,
            ssdp_retry_delay_ms: 800,
            ssdp_mx: 1,
            repeat_delay_ms: REPEAT_DELAY_MS,
        }
    }
}

impl AdapterConfig {
    /// Validates the configuration values.
    pub fn validate(&self) -> Result<(), String> {
        if self.control_port == 0 {
            return Err("control_port must be >= 1".to_string());
        }
        if self.connect_timeout_ms == 0 {
            return Err("connect_timeout_ms must be >= 1".to_string());
        }
        if self.discovery_timeout_ms == 0 {
            return Err("discovery_timeout_ms must be >= 1".to_string());
        }
        if self.ssdp_send_count == 0 {
            return Err("ssdp_send_count must be >= 1".to_string());
        }
        Ok(())
    }

    /// Returns the initial descriptor built from the configured addresses.
    #[must_use]
    pub fn descriptor(&self) -> DeviceDescriptor {
        DeviceDescriptor::new(self.ip.clone(), self.mac.clone())
    }

    #[must_use]
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    #[must_use]
    pub fn discovery_timeout(&self) -> Duration {
        Duration::from_millis(self.discovery_timeout_ms)
    }

    #[must_use]
    pub fn repeat_delay(&self) -> Duration {
        Duration::from_millis(self.repeat_delay_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_default_is_valid() {
        let config = AdapterConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.control_port, 3000);
        assert_eq!(config.connect_timeout(), Duration::from_secs(10));
        assert_eq!(config.discovery_timeout(), Duration::from_secs(5));
        assert_eq!(config.repeat_delay(), Duration::from_secs(1));
    }

    #[test]
    fn config_rejects_zero_values() {
        let config = AdapterConfig {
            connect_timeout_ms: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = AdapterConfig {
            ssdp_send_count: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn config_deserializes_partial_json() {
        let config: AdapterConfig = serde_json::from_str(r#"{"ip":"10.0.0.5"}"#).unwrap();
        assert_eq!(config.ip.as_deref(), Some("10.0.0.5"));
        assert_eq!(config.mac, None);
        assert_eq!(config.repeat_delay_ms, 1000);
    }

    #[test]
    fn descriptor_normalizes_configured_mac() {
        let descriptor = DeviceDescriptor::new(None, Some("A:B:2:33:4:5".into()));
        assert_eq!(descriptor.mac.as_deref(), Some("0a:0b:02:33:04:05"));
        assert!(!descriptor.is_complete());
    }

    #[test]
    fn descriptor_drops_malformed_mac_and_blank_ip() {
        let descriptor = DeviceDescriptor::new(Some("  ".into()), Some("garbage".into()));
        assert_eq!(descriptor, DeviceDescriptor::default());
    }

    #[test]
    fn control_url_uses_port() {
        let descriptor = DeviceDescriptor::new(Some("10.0.0.5".into()), None);
        assert_eq!(
            descriptor.control_url(3000).as_deref(),
            Some("ws://10.0.0.5:3000")
        );
        assert_eq!(DeviceDescriptor::default().control_url(3000), None);
    }
}
