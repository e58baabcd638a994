//! Locating the TV on the local network.
//!
//! A descriptor that already carries both addresses is used as-is. One with
//! only an IP goes straight to hardware address resolution. One without an IP
//! triggers an SSDP search: the first response whose `SERVER` header carries
//! the webOS signature wins and the search is stopped immediately.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{timeout_at, Instant};

use super::resolver::AddressResolver;
use crate::device::{DiscoveryError, DiscoveryResult, SsdpSearcher};
use crate::events::{AdapterEvent, EventEmitter};
use crate::state::{AdapterConfig, DeviceDescriptor};
use crate::utils::now_millis;

/// Completes a [`DeviceDescriptor`] using SSDP and ARP.
pub struct DeviceDiscovery {
    searcher: Arc<dyn SsdpSearcher>,
    resolver: AddressResolver,
    emitter: Arc<dyn EventEmitter>,
    search_target: String,
    server_signature: String,
    timeout: Duration,
}

impl DeviceDiscovery {
    pub fn new(
        searcher: Arc<dyn SsdpSearcher>,
        resolver: AddressResolver,
        emitter: Arc<dyn EventEmitter>,
        config: &AdapterConfig,
    ) -> Self {
        Self {
            searcher,
            resolver,
            emitter,
            search_target: config.search_target.clone(),
            server_signature: config.server_signature.clone(),
            timeout: config.discovery_timeout(),
        }
    }

    /// Fills in whatever `descriptor` is missing.
    ///
    /// Fails only when an SSDP search was needed and found nothing in time.
    /// A failed hardware address lookup is not an error.
    pub async fn locate(&self, descriptor: &mut DeviceDescriptor) -> DiscoveryResult<()> {
        if descriptor.is_complete() {
            log::debug!("[Discovery] Using configured TV address");
            return Ok(());
        }

        if descriptor.ip.is_none() {
            log::info!("[Discovery] Searching for TV");
            let ip = self.search().await?;
            descriptor.ip = Some(ip);
        }

        self.resolver.resolve(descriptor).await;
        Ok(())
    }

    /// Runs one SSDP search and returns the IP of the first webOS responder.
    async fn search(&self) -> DiscoveryResult<String> {
        let mut search = self.searcher.search(&self.search_target).await?;
        let deadline = Instant::now() + self.timeout;

        loop {
            let response = match timeout_at(deadline, search.next()).await {
                Ok(Some(response)) => response,
                Ok(None) => return Err(DiscoveryError::SearchEnded),
                Err(_) => {
                    search.stop();
                    log::warn!("[Discovery] TV not found within {:?}", self.timeout);
                    return Err(DiscoveryError::Timeout {
                        configured_ms: self.timeout.as_millis() as u64,
                    });
                }
            };

            let Some(server) = response.server() else {
                continue;
            };
            if !server.contains(&self.server_signature) {
                log::trace!(
                    "[Discovery] Ignoring {} from {}",
                    server,
                    response.source
                );
                continue;
            }

            search.stop();
            let ip = response.source.to_string();
            log::info!("[Discovery] Found TV at {} ({})", ip, server);
            self.emitter.emit(AdapterEvent::DeviceFound {
                ip: ip.clone(),
                server: server.to_string(),
                timestamp: now_millis(),
            });
            return Ok(ip);
        }
    }
}
