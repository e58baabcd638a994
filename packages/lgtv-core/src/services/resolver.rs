//! Hardware address resolution and descriptor persistence.

use std::net::IpAddr;
use std::sync::Arc;

use crate::device::ArpLookup;
use crate::events::{AdapterEvent, EventEmitter};
use crate::protocol_constants::DESCRIPTOR_CONFIG_KEY;
use crate::state::DeviceDescriptor;
use crate::store::ConfigStore;
use crate::utils::{normalize_mac, now_millis};

/// Learns the TV's hardware address from the ARP table and saves the result.
pub struct AddressResolver {
    arp: Arc<dyn ArpLookup>,
    store: Arc<dyn ConfigStore>,
    emitter: Arc<dyn EventEmitter>,
}

impl AddressResolver {
    pub fn new(
        arp: Arc<dyn ArpLookup>,
        store: Arc<dyn ConfigStore>,
        emitter: Arc<dyn EventEmitter>,
    ) -> Self {
        Self {
            arp,
            store,
            emitter,
        }
    }

    /// Resolves the hardware address for `descriptor.ip` and persists the
    /// descriptor under the `lgtv` key.
    ///
    /// Never fails: when the lookup comes back empty or malformed the
    /// descriptor keeps whatever hardware address it had, is still persisted,
    /// and power-on stays inert until a later run resolves it. Returns the
    /// resolved address, if any.
    pub async fn resolve(&self, descriptor: &mut DeviceDescriptor) -> Option<String> {
        let Some(ip) = descriptor.ip.clone() else {
            log::warn!("[Arp] No IP to resolve a hardware address for");
            return None;
        };

        let mac = self.lookup(&ip).await;
        match &mac {
            Some(mac) => {
                log::info!("[Arp] IP {} resolved to hardware address {}", ip, mac);
                descriptor.mac = Some(mac.clone());
            }
            None => {
                log::warn!(
                    "[Arp] No hardware address found for {}; power on will not work",
                    ip
                );
            }
        }

        self.persist(descriptor);
        self.emitter.emit(AdapterEvent::AddressResolved {
            ip,
            mac: mac.clone(),
            timestamp: now_millis(),
        });
        mac
    }

    async fn lookup(&self, ip: &str) -> Option<String> {
        let addr = match ip.parse::<IpAddr>() {
            Ok(addr) => addr,
            Err(e) => {
                log::warn!("[Arp] Cannot look up {:?}: {}", ip, e);
                return None;
            }
        };

        match self.arp.lookup(addr).await {
            Ok(raw) => {
                let normalized = normalize_mac(&raw);
                if normalized.is_none() {
                    log::warn!("[Arp] Ignoring malformed hardware address {:?}", raw);
                }
                normalized
            }
            Err(e) => {
                log::debug!("[Arp] Lookup failed: {}", e);
                None
            }
        }
    }

    fn persist(&self, descriptor: &DeviceDescriptor) {
        let value = match serde_json::to_value(descriptor) {
            Ok(value) => value,
            Err(e) => {
                log::warn!("[Store] Failed to encode descriptor: {}", e);
                return;
            }
        };
        if let Err(e) = self.store.save(DESCRIPTOR_CONFIG_KEY, value) {
            log::warn!("[Store] Failed to save descriptor: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::RecordingEventEmitter;
    use crate::services::test_fixtures::FakeArp;
    use crate::store::MemoryStore;
    use serde_json::json;

    fn resolver(
        arp: FakeArp,
    ) -> (
        AddressResolver,
        Arc<FakeArp>,
        Arc<MemoryStore>,
        Arc<RecordingEventEmitter>,
    ) {
        let arp = Arc::new(arp);
        let store = Arc::new(MemoryStore::new());
        let emitter = Arc::new(RecordingEventEmitter::default());
        let resolver = AddressResolver::new(
            Arc::clone(&arp) as Arc<dyn ArpLookup>,
            Arc::clone(&store) as Arc<dyn ConfigStore>,
            Arc::clone(&emitter) as Arc<dyn EventEmitter>,
        );
        (resolver, arp, store, emitter)
    }

    #[tokio::test]
    async fn resolves_normalizes_and_persists() {
        let (resolver, arp, store, emitter) = resolver(FakeArp::answering("a:b:2:33:4:5"));
        let mut descriptor = DeviceDescriptor::new(Some("10.0.0.5".into()), None);

        let mac = resolver.resolve(&mut descriptor).await;

        assert_eq!(mac.as_deref(), Some("0a:0b:02:33:04:05"));
        assert_eq!(descriptor.mac.as_deref(), Some("0a:0b:02:33:04:05"));
        assert_eq!(arp.lookups(), vec!["10.0.0.5".parse::<IpAddr>().unwrap()]);
        assert_eq!(
            store.load(DESCRIPTOR_CONFIG_KEY),
            Some(json!({ "ip": "10.0.0.5", "mac": "0a:0b:02:33:04:05" }))
        );
        assert!(matches!(
            emitter.events.lock()[0],
            AdapterEvent::AddressResolved { mac: Some(_), .. }
        ));
    }

    #[tokio::test]
    async fn failed_lookup_still_persists_descriptor() {
        let (resolver, _, store, _) = resolver(FakeArp::empty());
        let mut descriptor = DeviceDescriptor::new(Some("10.0.0.5".into()), None);

        assert_eq!(resolver.resolve(&mut descriptor).await, None);
        assert_eq!(descriptor.mac, None);
        assert_eq!(
            store.load(DESCRIPTOR_CONFIG_KEY),
            Some(json!({ "ip": "10.0.0.5", "mac": null }))
        );
    }

    #[tokio::test]
    async fn malformed_arp_answer_is_discarded() {
        let (resolver, _, _, _) = resolver(FakeArp::answering("(incomplete)"));
        let mut descriptor = DeviceDescriptor::new(Some("10.0.0.5".into()), None);

        assert_eq!(resolver.resolve(&mut descriptor).await, None);
        assert_eq!(descriptor.mac, None);
    }

    #[tokio::test]
    async fn unparseable_ip_skips_lookup() {
        let (resolver, arp, _, _) = resolver(FakeArp::answering("a:b:2:33:4:5"));
        let mut descriptor = DeviceDescriptor::new(Some("lgtv.local".into()), None);

        assert_eq!(resolver.resolve(&mut descriptor).await, None);
        assert!(arp.lookups().is_empty());
    }
}
