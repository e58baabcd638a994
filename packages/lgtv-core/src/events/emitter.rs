//! Event emitter abstraction for decoupling components from output sinks.

use super::AdapterEvent;

/// Trait for emitting adapter events without knowledge of where they go.
///
/// # Example
///
/// ```ignore
/// struct AddressResolver {
///     emitter: Arc<dyn EventEmitter>,
/// }
///
/// impl AddressResolver {
///     fn report(&self, ip: String, mac: Option<String>) {
///         self.emitter.emit(AdapterEvent::AddressResolved { ip, mac, timestamp: now_millis() });
///     }
/// }
/// ```
pub trait EventEmitter: Send + Sync {
    /// Emits an adapter event.
    fn emit(&self, event: AdapterEvent);
}

/// No-op emitter for embedding or testing.
///
/// Components still log through the `log` facade; only the structured
/// events are discarded.
pub struct NoopEventEmitter;

impl EventEmitter for NoopEventEmitter {
    fn emit(&self, _event: AdapterEvent) {}
}

/// Logging emitter for debugging and development.
///
/// Failures are logged at warn level, everything else at debug.
pub struct LoggingEventEmitter;

impl EventEmitter for LoggingEventEmitter {
    fn emit(&self, event: AdapterEvent) {
        match &event {
            AdapterEvent::RequestFailed { .. } => tracing::warn!(?event, "request_failed"),
            AdapterEvent::ConnectionChanged {
                reason: Some(_), ..
            } => tracing::warn!(?event, "connection_failed"),
            _ => tracing::debug!(?event, "adapter_event"),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use parking_lot::Mutex;

    /// Test emitter that records every event.
    #[derive(Default)]
    pub(crate) struct RecordingEventEmitter {
        pub(crate) events: Mutex<Vec<AdapterEvent>>,
    }

    impl EventEmitter for RecordingEventEmitter {
        fn emit(&self, event: AdapterEvent) {
            self.events.lock().push(event);
        }
    }

    #[test]
    fn recording_emitter_keeps_order() {
        let emitter = RecordingEventEmitter::default();
        emitter.emit(AdapterEvent::UnknownCommand {
            verb: "dance".into(),
            timestamp: 0,
        });
        emitter.emit(AdapterEvent::WakeSent {
            mac: "0a:0b:02:33:04:05".into(),
            timestamp: 0,
        });

        let events = emitter.events.lock();
        assert_eq!(events.len(), 2);
        assert!(matches!(events[0], AdapterEvent::UnknownCommand { .. }));
        assert!(matches!(events[1], AdapterEvent::WakeSent { .. }));
    }
}
