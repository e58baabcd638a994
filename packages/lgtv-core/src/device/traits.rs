//! Trait abstractions for the device-facing capabilities.
//!
//! The adapter core orchestrates these capabilities but never depends on a
//! concrete implementation, so every component can be tested with fakes.

use std::net::IpAddr;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use super::types::{
    ArpError, ChannelReply, ChannelResult, ChannelSignals, DiscoveryResult, SsdpSearch, WakeError,
};
use crate::services::connection::ConnectionError;

/// Resolves the hardware address of a host on the local network.
///
/// Used by `AddressResolver` to learn the TV's MAC for wake packets.
#[async_trait]
pub trait ArpLookup: Send + Sync {
    /// Returns the raw hardware address for `ip` as reported by the system.
    ///
    /// The result is not normalized; callers validate and normalize it.
    async fn lookup(&self, ip: IpAddr) -> Result<String, ArpError>;
}

/// Sends Wake-on-LAN packets.
#[async_trait]
pub trait WakeSender: Send + Sync {
    /// Sends a magic packet for the given normalized hardware address.
    async fn wake(&self, mac: &str) -> Result<(), WakeError>;
}

/// Starts SSDP searches.
///
/// Used by `DeviceDiscovery` when no TV address is configured.
#[async_trait]
pub trait SsdpSearcher: Send + Sync {
    /// Starts searching for devices advertising `search_target`.
    ///
    /// Responses stream through the returned [`SsdpSearch`] until it is
    /// stopped or dropped.
    async fn search(&self, search_target: &str) -> DiscoveryResult<SsdpSearch>;
}

/// An open control channel to the TV.
#[async_trait]
pub trait ControlChannel: Send + Sync {
    /// Sends a request for `uri` with an optional JSON payload and waits for
    /// the device's acknowledgement.
    ///
    /// There is no timeout: the call completes when the device answers or the
    /// channel closes.
    async fn request(&self, uri: &str, payload: Option<Value>) -> ChannelResult<ChannelReply>;

    /// Closes the channel. Pending requests fail with `ChannelError::Closed`.
    fn disconnect(&self);
}

/// Opens control channels.
#[async_trait]
pub trait ChannelConnector: Send + Sync {
    /// Starts opening a channel to `url`.
    ///
    /// Returns immediately with the channel handle and its lifecycle signals.
    /// The channel is only usable after a `ChannelSignal::Connected` arrives.
    /// Implementations must not reconnect on their own.
    async fn connect(
        &self,
        url: &str,
    ) -> Result<(Arc<dyn ControlChannel>, ChannelSignals), ConnectionError>;
}
