//! LG TV Core - remote-control adapter for LG webOS TVs.
//!
//! This crate locates a webOS TV on the local network, keeps a single lazily
//! opened control channel to it, and translates a small text command
//! language (`power on`, `volumeUp 3`, `requestw <uri> {json}`, ...) into
//! device operations. It is used by the `lgtv-remote` command line tool and
//! can be embedded by any host that dispatches text commands.
//!
//! # Architecture
//!
//! - [`device`]: Network-facing capabilities (SSDP, ARP, Wake-on-LAN, SSAP)
//! - [`services`]: Discovery, connection lifecycle, request sequencing, commands
//! - [`bootstrap`]: Composition root and the [`LgTv`] facade
//! - [`store`]: Persisted key-value configuration
//! - [`events`]: Domain events for observing the adapter
//! - [`state`]: Adapter configuration and device descriptor
//! - [`error`]: Centralized error types
//!
//! # Abstraction Traits
//!
//! The services never touch the network directly. They go through:
//!
//! - [`ArpLookup`](device::ArpLookup), [`WakeSender`](device::WakeSender),
//!   [`SsdpSearcher`](device::SsdpSearcher),
//!   [`ChannelConnector`](device::ChannelConnector): device capabilities
//! - [`ConfigStore`](store::ConfigStore): persistence
//! - [`EventEmitter`](events::EventEmitter): observation
//!
//! [`Capabilities::system`] wires the real implementations.

#![warn(clippy::all)]

pub mod bootstrap;
pub mod device;
pub mod error;
pub mod events;
pub mod protocol_constants;
pub mod services;
pub mod state;
pub mod store;
pub mod utils;

pub use bootstrap::{Capabilities, LgTv};
pub use error::{ErrorCode, LgtvError, LgtvResult};
pub use events::{AdapterEvent, EventEmitter, LoggingEventEmitter, NoopEventEmitter};
pub use services::{Command, CommandOutcome, ConnectionError, ConnectionState};
pub use state::{AdapterConfig, DeviceDescriptor};
pub use store::{ConfigStore, JsonFileStore, MemoryStore, StoreError};
pub use utils::{normalize_mac, now_millis};
