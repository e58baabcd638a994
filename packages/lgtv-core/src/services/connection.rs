//! Lazy, memoized control-channel connection.
//!
//! The manager owns a single state cell. The first caller of
//! [`ConnectionManager::channel`] starts a connect attempt and stores it as a
//! shared future; every caller arriving while it is in flight awaits that same
//! future, so at most one channel is ever being opened. The attempt resolves
//! on the `Connected` signal and is rejected by a `Closed` signal or by the
//! connect timeout. `Error` signals are logged and tolerated.
//!
//! A rejected attempt leaves the cell in `Failed`; the next caller starts a
//! fresh attempt. A connected channel stays memoized until it reports
//! `Closed`, which moves the cell back to `Unconnected`.

use std::sync::Arc;
use std::time::Duration;

use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use serde::Serialize;
use thiserror::Error;
use tokio::time::{timeout_at, Instant};

use crate::device::{ChannelConnector, ChannelSignal, ChannelSignals, ControlChannel};
use crate::events::{AdapterEvent, EventEmitter};
use crate::utils::now_millis;

/// Errors that can occur while establishing the control channel.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConnectionError {
    /// No `Connected` signal arrived before the connect timeout.
    #[error("connect timed out after {timeout_ms}ms")]
    Timeout {
        /// The configured timeout in milliseconds.
        timeout_ms: u64,
    },

    /// The channel closed before the handshake completed.
    #[error("channel closed before connecting")]
    Closed,

    /// The underlying transport could not be opened.
    #[error("transport error: {0}")]
    Transport(String),

    /// The TV's IP address is not known.
    #[error("TV address is unknown")]
    NoAddress,
}

/// Observable state of the control channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ConnectionState {
    /// No channel exists and no attempt is running.
    Unconnected,
    /// A connect attempt is in flight.
    Connecting,
    /// A channel is open and memoized.
    Connected,
    /// The last attempt failed; the next request starts a new one.
    Failed,
}

type ChannelOutcome = Result<Arc<dyn ControlChannel>, ConnectionError>;
type PendingChannel = Shared<BoxFuture<'static, ChannelOutcome>>;

enum Slot {
    Unconnected,
    Connecting {
        generation: u64,
        attempt: PendingChannel,
    },
    Connected {
        generation: u64,
        channel: Arc<dyn ControlChannel>,
    },
    Failed,
}

impl Slot {
    fn state(&self) -> ConnectionState {
        match self {
            Self::Unconnected => ConnectionState::Unconnected,
            Self::Connecting { .. } => ConnectionState::Connecting,
            Self::Connected { .. } => ConnectionState::Connected,
            Self::Failed => ConnectionState::Failed,
        }
    }

    fn generation(&self) -> Option<u64> {
        match self {
            Self::Connecting { generation, .. } | Self::Connected { generation, .. } => {
                Some(*generation)
            }
            Self::Unconnected | Self::Failed => None,
        }
    }
}

/// The state cell. Only the transition functions below write `slot`.
struct Cell {
    slot: Slot,
    /// Generation handed to the next attempt; stale attempts and watchers
    /// compare against it so they never overwrite a newer connection.
    next_generation: u64,
}

/// Owns the single control channel to the TV.
pub struct ConnectionManager {
    connector: Arc<dyn ChannelConnector>,
    url: Option<String>,
    connect_timeout: Duration,
    cell: Arc<Mutex<Cell>>,
    emitter: Arc<dyn EventEmitter>,
}

impl ConnectionManager {
    /// Creates a manager for the channel at `url` (`None` if the TV address is
    /// unknown, in which case every attempt fails with `NoAddress`).
    pub fn new(
        connector: Arc<dyn ChannelConnector>,
        url: Option<String>,
        connect_timeout: Duration,
        emitter: Arc<dyn EventEmitter>,
    ) -> Self {
        Self {
            connector,
            url,
            connect_timeout,
            cell: Arc::new(Mutex::new(Cell {
                slot: Slot::Unconnected,
                next_generation: 0,
            })),
            emitter,
        }
    }

    /// Returns the current connection state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.cell.lock().slot.state()
    }

    /// Returns the connected channel, connecting first if needed.
    ///
    /// Concurrent callers share one in-flight attempt and all observe its
    /// outcome, including a rejection.
    pub async fn channel(&self) -> ChannelOutcome {
        let (attempt, started) = {
            let mut cell = self.cell.lock();
            match &cell.slot {
                Slot::Connected { channel, .. } => return Ok(Arc::clone(channel)),
                Slot::Connecting { attempt, .. } => (attempt.clone(), false),
                Slot::Unconnected | Slot::Failed => {
                    let generation = cell.next_generation;
                    cell.next_generation += 1;
                    let attempt = self.start_attempt(generation);
                    cell.slot = Slot::Connecting {
                        generation,
                        attempt: attempt.clone(),
                    };
                    (attempt, true)
                }
            }
        };

        if started {
            emit_state(self.emitter.as_ref(), ConnectionState::Connecting, None);
        }
        attempt.await
    }

    fn start_attempt(&self, generation: u64) -> PendingChannel {
        let connector = Arc::clone(&self.connector);
        let url = self.url.clone();
        let connect_timeout = self.connect_timeout;
        let cell = Arc::clone(&self.cell);
        let emitter = Arc::clone(&self.emitter);

        async move {
            match establish(connector.as_ref(), url, connect_timeout).await {
                Ok((channel, signals)) => {
                    {
                        let mut cell = cell.lock();
                        if cell.slot.generation() == Some(generation) {
                            cell.slot = Slot::Connected {
                                generation,
                                channel: Arc::clone(&channel),
                            };
                        }
                    }
                    log::info!("[Connection] Connected");
                    emit_state(emitter.as_ref(), ConnectionState::Connected, None);
                    tokio::spawn(watch_channel(cell, generation, signals, emitter));
                    Ok(channel)
                }
                Err(e) => {
                    {
                        let mut cell = cell.lock();
                        if cell.slot.generation() == Some(generation) {
                            cell.slot = Slot::Failed;
                        }
                    }
                    log::warn!("[Connection] Error: {}", e);
                    emit_state(
                        emitter.as_ref(),
                        ConnectionState::Failed,
                        Some(e.to_string()),
                    );
                    Err(e)
                }
            }
        }
        .boxed()
        .shared()
    }
}

/// Opens a channel and waits for its handshake, bounded by `connect_timeout`.
///
/// On any failure after the channel object exists, the half-open channel is
/// disconnected before returning.
async fn establish(
    connector: &dyn ChannelConnector,
    url: Option<String>,
    connect_timeout: Duration,
) -> Result<(Arc<dyn ControlChannel>, ChannelSignals), ConnectionError> {
    let url = url.ok_or(ConnectionError::NoAddress)?;
    let timeout_ms = connect_timeout.as_millis() as u64;
    let deadline = Instant::now() + connect_timeout;

    log::info!("[Connection] Creating a new connection to the TV at {}", url);

    let (channel, mut signals) = match timeout_at(deadline, connector.connect(&url)).await {
        Ok(opened) => opened?,
        Err(_) => return Err(ConnectionError::Timeout { timeout_ms }),
    };

    loop {
        match timeout_at(deadline, signals.recv()).await {
            Ok(Some(ChannelSignal::Connected)) => return Ok((channel, signals)),
            Ok(Some(ChannelSignal::Error(e))) => {
                log::warn!("[Connection] Channel error while connecting: {}", e);
            }
            Ok(Some(ChannelSignal::Closed)) | Ok(None) => {
                channel.disconnect();
                return Err(ConnectionError::Closed);
            }
            Err(_) => {
                channel.disconnect();
                return Err(ConnectionError::Timeout { timeout_ms });
            }
        }
    }
}

/// Follows a connected channel's signals and drops the memo when it closes.
async fn watch_channel(
    cell: Arc<Mutex<Cell>>,
    generation: u64,
    mut signals: ChannelSignals,
    emitter: Arc<dyn EventEmitter>,
) {
    while let Some(signal) = signals.recv().await {
        match signal {
            ChannelSignal::Error(e) => log::warn!("[Connection] Error: {}", e),
            ChannelSignal::Connected => {}
            ChannelSignal::Closed => break,
        }
    }

    let reset = {
        let mut cell = cell.lock();
        let current = matches!(cell.slot, Slot::Connected { .. })
            && cell.slot.generation() == Some(generation);
        if current {
            cell.slot = Slot::Unconnected;
        }
        current
    };
    if reset {
        log::info!("[Connection] Channel closed; the next request reconnects");
        emit_state(emitter.as_ref(), ConnectionState::Unconnected, None);
    }
}

fn emit_state(emitter: &dyn EventEmitter, state: ConnectionState, reason: Option<String>) {
    emitter.emit(AdapterEvent::ConnectionChanged {
        state,
        reason,
        timestamp: now_millis(),
    });
}
