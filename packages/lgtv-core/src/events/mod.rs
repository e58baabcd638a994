//! Event system for observing the adapter.
//!
//! Components report what they did through an injected [`EventEmitter`]
//! instead of writing to a fixed sink. Hosts that only want log output use
//! [`LoggingEventEmitter`]; embedders can forward events anywhere.

mod emitter;

pub use emitter::{EventEmitter, LoggingEventEmitter, NoopEventEmitter};

#[cfg(test)]
pub(crate) use emitter::tests::RecordingEventEmitter;

use serde::Serialize;

use crate::services::connection::ConnectionState;

/// Domain events emitted by the adapter components.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum AdapterEvent {
    /// SSDP discovery found a matching TV.
    DeviceFound {
        /// Source address of the SSDP response.
        ip: String,
        /// Value of the `SERVER` header.
        server: String,
        /// Unix timestamp in milliseconds.
        timestamp: u64,
    },
    /// Hardware address resolution finished (successfully or not).
    AddressResolved {
        ip: String,
        /// `None` when the ARP lookup failed; power-on is inert until resolved.
        mac: Option<String>,
        /// Unix timestamp in milliseconds.
        timestamp: u64,
    },
    /// The control channel changed state.
    ConnectionChanged {
        state: ConnectionState,
        /// Failure reason for `Failed` transitions.
        #[serde(skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
        /// Unix timestamp in milliseconds.
        timestamp: u64,
    },
    /// A device request was acknowledged with an error.
    RequestFailed {
        /// SSAP service URI.
        service: String,
        reason: String,
        /// Unix timestamp in milliseconds.
        timestamp: u64,
    },
    /// A wake packet was sent.
    WakeSent {
        mac: String,
        /// Unix timestamp in milliseconds.
        timestamp: u64,
    },
    /// A command with an unknown verb was ignored.
    UnknownCommand {
        verb: String,
        /// Unix timestamp in milliseconds.
        timestamp: u64,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_serialize_with_type_tag() {
        let event = AdapterEvent::AddressResolved {
            ip: "10.0.0.5".into(),
            mac: Some("0a:0b:02:33:04:05".into()),
            timestamp: 1,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "addressResolved");
        assert_eq!(json["mac"], "0a:0b:02:33:04:05");
    }

    #[test]
    fn connection_event_omits_missing_reason() {
        let event = AdapterEvent::ConnectionChanged {
            state: ConnectionState::Connected,
            reason: None,
            timestamp: 1,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["state"], "connected");
        assert!(json.get("reason").is_none());
    }
}
