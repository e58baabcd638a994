//! Request sequencing over the shared control channel.
//!
//! `send` obtains the channel (connecting on demand), issues one request and
//! waits for the device's acknowledgement. Device-side errors are logged and
//! swallowed. `repeat` issues the same request several times, waiting the
//! repeat delay after each one, so button-press style actions are not
//! coalesced by the TV.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;

use super::connection::{ConnectionError, ConnectionManager};
use crate::device::ChannelReply;
use crate::events::{AdapterEvent, EventEmitter};
use crate::utils::now_millis;

/// Issues requests over the memoized channel.
pub struct RequestSequencer {
    connection: Arc<ConnectionManager>,
    repeat_delay: Duration,
    emitter: Arc<dyn EventEmitter>,
}

impl RequestSequencer {
    pub fn new(
        connection: Arc<ConnectionManager>,
        repeat_delay: Duration,
        emitter: Arc<dyn EventEmitter>,
    ) -> Self {
        Self {
            connection,
            repeat_delay,
            emitter,
        }
    }

    /// Sends one request and returns the device's reply payload.
    ///
    /// Fails only when no channel could be established. A request the device
    /// rejects (or that dies with the channel) is logged and resolves to
    /// `Value::Null`.
    pub async fn send(
        &self,
        service: &str,
        payload: Option<Value>,
    ) -> Result<ChannelReply, ConnectionError> {
        let channel = self.connection.channel().await?;

        match channel.request(service, payload).await {
            Ok(reply) => {
                log::debug!("[Sequencer] {} acknowledged", service);
                Ok(reply)
            }
            Err(e) => {
                log::warn!("[Sequencer] {} failed: {}", service, e);
                self.emitter.emit(AdapterEvent::RequestFailed {
                    service: service.to_string(),
                    reason: e.to_string(),
                    timestamp: now_millis(),
                });
                Ok(Value::Null)
            }
        }
    }

    /// Sends `service` (without payload) `count` times in sequence.
    ///
    /// Each request is acknowledged and followed by the repeat delay before
    /// the next one is issued. A count of zero is treated as one. Stops at the
    /// first connection failure.
    pub async fn repeat(&self, service: &str, count: usize) -> Result<(), ConnectionError> {
        let count = count.max(1);
        for i in 0..count {
            log::trace!("[Sequencer] {} ({}/{})", service, i + 1, count);
            self.send(service, None).await?;
            tokio::time::sleep(self.repeat_delay).await;
        }
        Ok(())
    }
}
