//! In-memory fakes for the device capabilities.
//!
//! Shared by the service test modules so each can drive discovery, pairing
//! and requests without touching the network.

use std::net::IpAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};
use tokio::sync::{mpsc, Notify};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::device::{
    ArpError, ArpLookup, ChannelConnector, ChannelError, ChannelReply, ChannelResult,
    ChannelSignal, ChannelSignals, ControlChannel, DiscoveryResult, SsdpResponse, SsdpSearch,
    SsdpSearcher, WakeError, WakeSender,
};
use crate::services::connection::ConnectionError;

// ─────────────────────────────────────────────────────────────────────────────
// Control channel
// ─────────────────────────────────────────────────────────────────────────────

/// A request seen by a [`FakeChannel`].
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub uri: String,
    pub payload: Option<Value>,
    pub at: Instant,
}

/// Channel that records requests and answers from a script.
#[derive(Default)]
pub struct FakeChannel {
    requests: Mutex<Vec<RecordedRequest>>,
    /// Replies keyed by URI; unscripted URIs answer `{"returnValue": true}`.
    replies: Mutex<Vec<(String, ChannelResult<ChannelReply>)>>,
    /// When set, every request waits for a permit before answering.
    gate: Option<Arc<Notify>>,
    disconnected: AtomicBool,
}

impl FakeChannel {
    pub fn gated(gate: Arc<Notify>) -> Self {
        Self {
            gate: Some(gate),
            ..Default::default()
        }
    }

    pub fn reply_with(&self, uri: &str, reply: ChannelResult<ChannelReply>) {
        self.replies.lock().push((uri.to_string(), reply));
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().clone()
    }

    pub fn uris(&self) -> Vec<String> {
        self.requests.lock().iter().map(|r| r.uri.clone()).collect()
    }

    pub fn is_disconnected(&self) -> bool {
        self.disconnected.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ControlChannel for FakeChannel {
    async fn request(&self, uri: &str, payload: Option<Value>) -> ChannelResult<ChannelReply> {
        if self.is_disconnected() {
            return Err(ChannelError::Closed);
        }
        self.requests.lock().push(RecordedRequest {
            uri: uri.to_string(),
            payload,
            at: Instant::now(),
        });
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        let scripted = self
            .replies
            .lock()
            .iter()
            .find(|(scripted_uri, _)| scripted_uri == uri)
            .map(|(_, reply)| reply.clone());
        scripted.unwrap_or_else(|| Ok(json!({ "returnValue": true })))
    }

    fn disconnect(&self) {
        self.disconnected.store(true, Ordering::SeqCst);
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Connector
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Clone, Copy)]
enum ConnectMode {
    /// Signal `Connected` as soon as the channel is created.
    Auto,
    /// Leave signalling to the test.
    Manual,
    /// Fail every connect with a transport error.
    Refuse,
}

struct Opened {
    url: String,
    channel: Arc<FakeChannel>,
    signals: mpsc::UnboundedSender<ChannelSignal>,
}

/// Connector handing out [`FakeChannel`]s.
pub struct FakeConnector {
    mode: ConnectMode,
    gate: Option<Arc<Notify>>,
    opened: Mutex<Vec<Opened>>,
}

impl FakeConnector {
    fn with_mode(mode: ConnectMode) -> Self {
        Self {
            mode,
            gate: None,
            opened: Mutex::new(Vec::new()),
        }
    }

    pub fn auto() -> Self {
        Self::with_mode(ConnectMode::Auto)
    }

    pub fn manual() -> Self {
        Self::with_mode(ConnectMode::Manual)
    }

    pub fn refusing() -> Self {
        Self::with_mode(ConnectMode::Refuse)
    }

    /// Auto-connecting connector whose channels hold replies until `gate`
    /// hands out a permit.
    pub fn gated(gate: Arc<Notify>) -> Self {
        Self {
            gate: Some(gate),
            ..Self::auto()
        }
    }

    pub fn connect_count(&self) -> usize {
        self.opened.lock().len()
    }

    pub fn urls(&self) -> Vec<String> {
        self.opened.lock().iter().map(|o| o.url.clone()).collect()
    }

    /// Returns the `n`th channel handed out.
    pub fn channel(&self, n: usize) -> Arc<FakeChannel> {
        Arc::clone(&self.opened.lock()[n].channel)
    }

    /// Delivers a lifecycle signal on the `n`th channel.
    pub fn signal(&self, n: usize, signal: ChannelSignal) {
        let _ = self.opened.lock()[n].signals.send(signal);
    }
}

#[async_trait]
impl ChannelConnector for FakeConnector {
    async fn connect(
        &self,
        url: &str,
    ) -> Result<(Arc<dyn ControlChannel>, ChannelSignals), ConnectionError> {
        if let ConnectMode::Refuse = self.mode {
            return Err(ConnectionError::Transport("connection refused".into()));
        }

        let channel = Arc::new(match &self.gate {
            Some(gate) => FakeChannel::gated(Arc::clone(gate)),
            None => FakeChannel::default(),
        });
        let (tx, rx) = mpsc::unbounded_channel();
        if let ConnectMode::Auto = self.mode {
            let _ = tx.send(ChannelSignal::Connected);
        }
        self.opened.lock().push(Opened {
            url: url.to_string(),
            channel: Arc::clone(&channel),
            signals: tx,
        });
        Ok((channel as Arc<dyn ControlChannel>, rx))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// ARP, WoL, SSDP
// ─────────────────────────────────────────────────────────────────────────────

/// ARP table that knows at most one answer.
pub struct FakeArp {
    answer: Option<String>,
    lookups: Mutex<Vec<IpAddr>>,
}

impl FakeArp {
    pub fn answering(mac: &str) -> Self {
        Self {
            answer: Some(mac.to_string()),
            lookups: Mutex::new(Vec::new()),
        }
    }

    pub fn empty() -> Self {
        Self {
            answer: None,
            lookups: Mutex::new(Vec::new()),
        }
    }

    pub fn lookups(&self) -> Vec<IpAddr> {
        self.lookups.lock().clone()
    }
}

#[async_trait]
impl ArpLookup for FakeArp {
    async fn lookup(&self, ip: IpAddr) -> Result<String, ArpError> {
        self.lookups.lock().push(ip);
        self.answer
            .clone()
            .ok_or_else(|| ArpError::NotFound(ip.to_string()))
    }
}

/// Wake sender that records the addresses it was asked to wake.
#[derive(Default)]
pub struct FakeWake {
    wakes: Mutex<Vec<String>>,
}

impl FakeWake {
    pub fn wakes(&self) -> Vec<String> {
        self.wakes.lock().clone()
    }
}

#[async_trait]
impl WakeSender for FakeWake {
    async fn wake(&self, mac: &str) -> Result<(), WakeError> {
        self.wakes.lock().push(mac.to_string());
        Ok(())
    }
}

/// Searcher fed by the test through [`FakeSearcher::responder`].
pub struct FakeSearcher {
    responses: Mutex<Option<mpsc::Receiver<SsdpResponse>>>,
    cancel: CancellationToken,
    targets: Mutex<Vec<String>>,
}

impl FakeSearcher {
    /// Returns the searcher and the sender the test uses to inject responses.
    pub fn new() -> (Self, mpsc::Sender<SsdpResponse>) {
        let (tx, rx) = mpsc::channel(16);
        let searcher = Self {
            responses: Mutex::new(Some(rx)),
            cancel: CancellationToken::new(),
            targets: Mutex::new(Vec::new()),
        };
        (searcher, tx)
    }

    /// Token cancelled when the search handed out is stopped.
    pub fn token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn targets(&self) -> Vec<String> {
        self.targets.lock().clone()
    }
}

#[async_trait]
impl SsdpSearcher for FakeSearcher {
    async fn search(&self, search_target: &str) -> DiscoveryResult<SsdpSearch> {
        self.targets.lock().push(search_target.to_string());
        let rx = self.responses.lock().take().unwrap_or_else(|| {
            let (_tx, rx) = mpsc::channel(1);
            rx
        });
        Ok(SsdpSearch::new(rx, self.cancel.clone()))
    }
}

/// Builds a search response with the given `SERVER` header.
pub fn ssdp_response(ip: [u8; 4], server: &str) -> SsdpResponse {
    SsdpResponse::new(IpAddr::from(ip), [("SERVER", server)])
}
