//! SSAP control channel over WebSocket.
//!
//! webOS TVs accept JSON messages on `ws://<ip>:3000`. A client first sends a
//! `register` message; the TV shows a pairing prompt (unless a previously
//! issued client key is presented) and answers with `registered`, carrying the
//! key to reuse next time. Requests are `{"type":"request","id":..,"uri":..}`
//! and are answered by a `response` or `error` message with the same id.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use futures::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::sync::{mpsc, oneshot};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;

use super::traits::{ChannelConnector, ControlChannel};
use super::types::{ChannelError, ChannelReply, ChannelResult, ChannelSignal, ChannelSignals};
use crate::protocol_constants::{CLIENT_KEY_CONFIG_KEY, REGISTER_MESSAGE_ID};
use crate::services::connection::ConnectionError;
use crate::store::ConfigStore;

/// Permissions requested during pairing.
const PERMISSIONS: &[&str] = &[
    "LAUNCH",
    "LAUNCH_WEBAPP",
    "APP_TO_APP",
    "CONTROL_AUDIO",
    "CONTROL_DISPLAY",
    "CONTROL_INPUT_TV",
    "CONTROL_INPUT_MEDIA_PLAYBACK",
    "CONTROL_POWER",
    "READ_INSTALLED_APPS",
    "READ_INPUT_DEVICE_LIST",
    "READ_TV_CHANNEL_LIST",
    "READ_CURRENT_CHANNEL",
    "READ_RUNNING_APPS",
    "WRITE_NOTIFICATION_TOAST",
];

type PendingRequests = DashMap<String, oneshot::Sender<ChannelResult<ChannelReply>>>;

/// Builds the registration handshake message.
fn register_message(client_key: Option<&str>) -> Value {
    let mut payload = json!({
        "forcePairing": false,
        "pairingType": "PROMPT",
        "manifest": {
            "manifestVersion": 1,
            "appVersion": "1.1",
            "permissions": PERMISSIONS,
        },
    });
    if let Some(key) = client_key {
        payload["client-key"] = Value::String(key.to_string());
    }
    json!({
        "type": "register",
        "id": REGISTER_MESSAGE_ID,
        "payload": payload,
    })
}

/// Builds a request message.
fn request_message(id: &str, uri: &str, payload: Option<Value>) -> Value {
    let mut msg = json!({
        "type": "request",
        "id": id,
        "uri": uri,
    });
    if let Some(payload) = payload {
        msg["payload"] = payload;
    }
    msg
}

/// [`ChannelConnector`] opening SSAP WebSocket channels.
///
/// When a store is given, the client key issued on first pairing is saved
/// under `lgtv-client-key` and presented on later connects so the TV does not
/// prompt again.
#[derive(Clone, Default)]
pub struct SsapConnector {
    store: Option<Arc<dyn ConfigStore>>,
}

impl SsapConnector {
    pub fn new(store: Option<Arc<dyn ConfigStore>>) -> Self {
        Self { store }
    }

    fn client_key(&self) -> Option<String> {
        self.store
            .as_ref()?
            .load(CLIENT_KEY_CONFIG_KEY)
            .and_then(|v| v.as_str().map(str::to_string))
    }
}

#[async_trait]
impl ChannelConnector for SsapConnector {
    async fn connect(
        &self,
        url: &str,
    ) -> Result<(Arc<dyn ControlChannel>, ChannelSignals), ConnectionError> {
        let (ws, _response) = connect_async(url)
            .await
            .map_err(|e| ConnectionError::Transport(e.to_string()))?;
        log::debug!("[SSAP] WebSocket open to {}", url);

        let (mut sink, mut stream) = ws.split();
        let (out_tx, mut out_rx) = mpsc::unbounded_channel::<String>();
        let (signal_tx, signal_rx) = mpsc::unbounded_channel();
        let pending: Arc<PendingRequests> = Arc::new(DashMap::new());
        let cancel = CancellationToken::new();

        // Writer: forwards queued messages to the socket in order.
        let writer_cancel = cancel.clone();
        let writer_signals = signal_tx.clone();
        let writer_pending = Arc::clone(&pending);
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = writer_cancel.cancelled() => {
                        let _ = sink.close().await;
                        break;
                    }
                    next = out_rx.recv() => {
                        let Some(text) = next else { break };
                        if let Err(e) = sink.send(Message::text(text)).await {
                            let _ = writer_signals.send(ChannelSignal::Error(e.to_string()));
                            writer_cancel.cancel();
                            let err = ChannelError::Transport(e.to_string());
                            fail_pending(&writer_pending, &err);
                            break;
                        }
                    }
                }
            }
        });

        // Reader: routes replies to pending requests and reports lifecycle.
        let reader_cancel = cancel.clone();
        let reader_pending = Arc::clone(&pending);
        let store = self.store.clone();
        tokio::spawn(async move {
            let mut failure = ChannelError::Closed;
            loop {
                tokio::select! {
                    _ = reader_cancel.cancelled() => break,
                    frame = stream.next() => match frame {
                        Some(Ok(msg)) if msg.is_text() => {
                            if let Ok(text) = msg.to_text() {
                                handle_message(text, &reader_pending, &signal_tx, store.as_deref());
                            }
                        }
                        Some(Ok(Message::Close(_))) | None => break,
                        Some(Ok(_)) => {}
                        Some(Err(e)) => {
                            let _ = signal_tx.send(ChannelSignal::Error(e.to_string()));
                            failure = ChannelError::Transport(e.to_string());
                            break;
                        }
                    }
                }
            }
            // Cancel before failing so a request racing the close either
            // sees the cancellation or has its entry failed.
            reader_cancel.cancel();
            fail_pending(&reader_pending, &failure);
            let _ = signal_tx.send(ChannelSignal::Closed);
            log::debug!("[SSAP] Channel closed");
        });

        let register = register_message(self.client_key().as_deref());
        out_tx
            .send(register.to_string())
            .map_err(|_| ConnectionError::Closed)?;

        let channel = SsapChannel {
            out_tx,
            pending,
            next_id: AtomicU64::new(1),
            cancel,
        };
        Ok((Arc::new(channel), signal_rx))
    }
}

/// Dispatches one inbound SSAP message.
fn handle_message(
    text: &str,
    pending: &PendingRequests,
    signals: &mpsc::UnboundedSender<ChannelSignal>,
    store: Option<&dyn ConfigStore>,
) {
    let msg: Value = match serde_json::from_str(text) {
        Ok(v) => v,
        Err(e) => {
            log::warn!("[SSAP] Ignoring unparseable message: {}", e);
            return;
        }
    };
    let kind = msg.get("type").and_then(Value::as_str).unwrap_or_default();
    let id = msg.get("id").and_then(Value::as_str).unwrap_or_default();
    let payload = msg.get("payload").cloned().unwrap_or(Value::Null);

    if id == REGISTER_MESSAGE_ID {
        match kind {
            "registered" => {
                if let (Some(store), Some(key)) = (
                    store,
                    payload.get("client-key").and_then(Value::as_str),
                ) {
                    if let Err(e) = store.save(CLIENT_KEY_CONFIG_KEY, Value::String(key.into())) {
                        log::warn!("[SSAP] Failed to save client key: {}", e);
                    }
                }
                let _ = signals.send(ChannelSignal::Connected);
            }
            "response" if payload.get("pairingType").and_then(Value::as_str) == Some("PROMPT") => {
                log::info!("[SSAP] Waiting for the pairing prompt to be accepted on the TV");
            }
            "error" => {
                let reason = msg
                    .get("error")
                    .and_then(Value::as_str)
                    .unwrap_or("registration failed");
                let _ = signals.send(ChannelSignal::Error(reason.to_string()));
            }
            _ => {}
        }
        return;
    }

    let Some((_, reply)) = pending.remove(id) else {
        log::trace!("[SSAP] Unsolicited {} message (id={:?})", kind, id);
        return;
    };
    let result = match kind {
        "error" => Err(ChannelError::Device(
            msg.get("error")
                .and_then(Value::as_str)
                .unwrap_or("unknown error")
                .to_string(),
        )),
        _ => Ok(payload),
    };
    let _ = reply.send(result);
}

/// Answers every outstanding request with `err`.
fn fail_pending(pending: &PendingRequests, err: &ChannelError) {
    let ids: Vec<String> = pending.iter().map(|entry| entry.key().clone()).collect();
    for id in ids {
        if let Some((_, reply)) = pending.remove(&id) {
            let _ = reply.send(Err(err.clone()));
        }
    }
}

/// An open SSAP channel.
struct SsapChannel {
    out_tx: mpsc::UnboundedSender<String>,
    pending: Arc<PendingRequests>,
    next_id: AtomicU64,
    cancel: CancellationToken,
}

#[async_trait]
impl ControlChannel for SsapChannel {
    async fn request(&self, uri: &str, payload: Option<Value>) -> ChannelResult<ChannelReply> {
        let id = format!("req_{}", self.next_id.fetch_add(1, Ordering::Relaxed));
        let (reply_tx, reply_rx) = oneshot::channel();
        self.pending.insert(id.clone(), reply_tx);

        // The reader clears pending entries on close; an entry inserted after
        // that would never be answered.
        if self.cancel.is_cancelled() {
            self.pending.remove(&id);
            return Err(ChannelError::Closed);
        }

        let msg = request_message(&id, uri, payload);
        log::debug!("[SSAP] -> {} ({})", uri, id);
        if self.out_tx.send(msg.to_string()).is_err() {
            self.pending.remove(&id);
            return Err(ChannelError::Closed);
        }

        reply_rx.await.map_err(|_| ChannelError::Closed)?
    }

    fn disconnect(&self) {
        self.cancel.cancel();
    }
}
