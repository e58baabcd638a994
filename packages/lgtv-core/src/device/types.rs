//! Shared types for the device-facing capabilities.

use std::collections::HashMap;
use std::net::IpAddr;

use serde_json::Value;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

// ─────────────────────────────────────────────────────────────────────────────
// Errors
// ─────────────────────────────────────────────────────────────────────────────

/// Errors that can occur during discovery.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// Failed to bind UDP socket for discovery.
    #[error("failed to bind UDP socket: {0}")]
    SocketBind(#[source] std::io::Error),

    /// No usable network interfaces found.
    #[error("no usable network interfaces found")]
    NoInterfaces,

    /// No matching device answered within the discovery window.
    #[error("TV not found within {configured_ms}ms")]
    Timeout {
        /// The configured timeout in milliseconds.
        configured_ms: u64,
    },

    /// The search stopped producing responses before a match arrived.
    #[error("search ended before a TV answered")]
    SearchEnded,
}

/// Convenient Result alias for discovery operations.
pub type DiscoveryResult<T> = Result<T, DiscoveryError>;

/// Errors reported by a control channel for a single request.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ChannelError {
    /// The channel closed before the request was acknowledged.
    #[error("channel closed")]
    Closed,

    /// Writing to or reading from the underlying socket failed.
    #[error("transport error: {0}")]
    Transport(String),

    /// The device acknowledged the request with an error.
    #[error("device error: {0}")]
    Device(String),
}

/// Convenient Result alias for control channel requests.
pub type ChannelResult<T> = Result<T, ChannelError>;

/// Errors that can occur while resolving a hardware address.
#[derive(Debug, Error)]
pub enum ArpError {
    /// Neither the ARP table nor the `arp` tool knew the address.
    #[error("no ARP entry for {0}")]
    NotFound(String),

    /// The ARP table could not be read.
    #[error("ARP lookup failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors that can occur while sending a wake packet.
#[derive(Debug, Error)]
pub enum WakeError {
    /// The hardware address could not be parsed.
    #[error("invalid hardware address: {0}")]
    InvalidMac(String),

    /// Binding or sending on the UDP socket failed.
    #[error("failed to send wake packet: {0}")]
    Send(#[from] std::io::Error),
}

// ─────────────────────────────────────────────────────────────────────────────
// Channel Lifecycle Signals
// ─────────────────────────────────────────────────────────────────────────────

/// Lifecycle signals reported by a control channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelSignal {
    /// Handshake completed; the channel accepts requests.
    Connected,
    /// A non-fatal error was reported (the channel may still connect).
    Error(String),
    /// The channel closed. No further signals follow.
    Closed,
}

/// Receiving half of a channel's lifecycle signals.
pub type ChannelSignals = mpsc::UnboundedReceiver<ChannelSignal>;

/// Outcome of a successful request: the reply payload (may be `Null`).
pub type ChannelReply = Value;

// ─────────────────────────────────────────────────────────────────────────────
// SSDP Search
// ─────────────────────────────────────────────────────────────────────────────

/// A single SSDP search response.
#[derive(Debug, Clone)]
pub struct SsdpResponse {
    /// Address the response was received from.
    pub source: IpAddr,
    /// Response headers keyed by upper-cased name.
    pub headers: HashMap<String, String>,
}

impl SsdpResponse {
    /// Creates a response, upper-casing header names.
    pub fn new<I, K, V>(source: IpAddr, headers: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        Self {
            source,
            headers: headers
                .into_iter()
                .map(|(k, v)| (k.as_ref().to_ascii_uppercase(), v.into()))
                .collect(),
        }
    }

    /// Returns a header value by name (case-insensitive).
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_uppercase())
            .map(String::as_str)
    }

    /// Returns the `SERVER` header, which carries the device family.
    #[must_use]
    pub fn server(&self) -> Option<&str> {
        self.header("SERVER")
    }
}

/// A running SSDP search.
///
/// Responses stream in until [`SsdpSearch::stop`] is called or the search is
/// dropped. Stopping cancels every socket task the searcher spawned.
pub struct SsdpSearch {
    responses: mpsc::Receiver<SsdpResponse>,
    cancel: CancellationToken,
}

impl SsdpSearch {
    /// Wraps a response channel and the token that stops its producers.
    pub fn new(responses: mpsc::Receiver<SsdpResponse>, cancel: CancellationToken) -> Self {
        Self { responses, cancel }
    }

    /// Waits for the next response. Returns `None` once the search has ended.
    pub async fn next(&mut self) -> Option<SsdpResponse> {
        if self.cancel.is_cancelled() {
            return None;
        }
        self.responses.recv().await
    }

    /// Stops searching. Responses still buffered are discarded.
    pub fn stop(&mut self) {
        self.cancel.cancel();
        self.responses.close();
    }

    /// Returns true once the search has been stopped.
    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

impl Drop for SsdpSearch {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    #[test]
    fn header_lookup_is_case_insensitive() {
        let response = SsdpResponse::new(
            IpAddr::V4(Ipv4Addr::new(10, 0, 0, 5)),
            [("Server", "WebOS/1.5 UPnP/1.0 LGE WebOS TV")],
        );
        assert_eq!(response.server(), Some("WebOS/1.5 UPnP/1.0 LGE WebOS TV"));
        assert_eq!(
            response.header("server"),
            Some("WebOS/1.5 UPnP/1.0 LGE WebOS TV")
        );
        assert_eq!(response.header("location"), None);
    }

    #[tokio::test]
    async fn stopped_search_yields_nothing() {
        let (tx, rx) = mpsc::channel(4);
        let token = CancellationToken::new();
        let mut search = SsdpSearch::new(rx, token.clone());

        tx.send(SsdpResponse::new(
            IpAddr::V4(Ipv4Addr::LOCALHOST),
            Vec::<(String, String)>::new(),
        ))
        .await
        .unwrap();
        search.stop();

        assert!(search.is_stopped());
        assert!(token.is_cancelled());
        assert!(search.next().await.is_none());
    }

    #[test]
    fn dropping_search_cancels_producers() {
        let (_tx, rx) = mpsc::channel(1);
        let token = CancellationToken::new();
        drop(SsdpSearch::new(rx, token.clone()));
        assert!(token.is_cancelled());
    }
}
