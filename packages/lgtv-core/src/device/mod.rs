//! Device-facing capabilities.
//!
//! Everything that touches the network or the operating system lives here,
//! behind the traits in [`traits`]. The adapter services only see the traits.
//!
//! # Module Structure
//!
//! - `types` - Capability error types, channel signals, SSDP search handle
//! - `traits` - Trait abstractions for testability
//! - `services` - SSAP service URIs and payload shapes
//! - `arp` - Hardware address lookup via the system ARP table
//! - `wol` - Wake-on-LAN magic packets
//! - `ssdp` - SSDP M-SEARCH over UDP multicast
//! - `ssap` - SSAP control channel over WebSocket

pub mod arp;
pub mod services;
pub mod ssap;
pub mod ssdp;
pub mod traits;
pub mod types;
pub mod wol;

pub use arp::SystemArpTable;
pub use services::SsapService;
pub use ssap::SsapConnector;
pub use ssdp::{SsdpConfig, UdpSsdpSearcher};
pub use traits::{ArpLookup, ChannelConnector, ControlChannel, SsdpSearcher, WakeSender};
pub use types::{
    ArpError, ChannelError, ChannelReply, ChannelResult, ChannelSignal, ChannelSignals,
    DiscoveryError, DiscoveryResult, SsdpResponse, SsdpSearch, WakeError,
};
pub use wol::UdpWakeSender;
