//! Adapter services.
//!
//! These orchestrate the device capabilities and hold the adapter's runtime
//! state. Leaf to root:
//!
//! - `resolver` - IP to hardware address, descriptor persistence
//! - `discovery` - SSDP search for the TV when no IP is configured
//! - `connection` - lazy, memoized control channel
//! - `sequencer` - single and paced repeat requests
//! - `dispatcher` - text command language

pub mod connection;
pub mod discovery;
pub mod dispatcher;
pub mod resolver;
pub mod sequencer;

#[cfg(test)]
pub(crate) mod test_fixtures;

pub use connection::{ConnectionError, ConnectionManager, ConnectionState};
pub use discovery::DeviceDiscovery;
pub use dispatcher::{Command, CommandDispatcher, CommandOutcome};
pub use resolver::AddressResolver;
pub use sequencer::RequestSequencer;
