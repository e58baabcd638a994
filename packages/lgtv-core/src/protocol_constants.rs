//! Fixed protocol constants that should NOT be changed.
//!
//! These values are defined by external specifications (SSDP, SSAP, Wake-on-LAN)
//! or by the TV firmware, and changing them would break interoperability.

// ─────────────────────────────────────────────────────────────────────────────
// SSDP Discovery
// ─────────────────────────────────────────────────────────────────────────────

/// Standard SSDP multicast address and port.
pub const SSDP_MULTICAST_ADDR: &str = "239.255.255.250:1900";

/// Search target advertised by webOS TVs.
pub const MEDIA_RENDERER_SEARCH_TARGET: &str = "urn:schemas-upnp-org:device:MediaRenderer:1";

/// Substring of the `SERVER` header that identifies a webOS TV.
pub const WEBOS_SERVER_SIGNATURE: &str = "LGE WebOS TV";

/// How long discovery waits for a matching response (milliseconds).
pub const DISCOVERY_TIMEOUT_MS: u64 = 5000;

// ─────────────────────────────────────────────────────────────────────────────
// SSAP Control Channel
// ─────────────────────────────────────────────────────────────────────────────

/// Port the TV listens on for unencrypted SSAP WebSocket connections.
pub const SSAP_PORT: u16 = 3000;

/// How long a connect attempt may take before it is abandoned (milliseconds).
///
/// Includes the pairing prompt on first use, so the user has this long to
/// accept the prompt on the TV.
pub const CONNECT_TIMEOUT_MS: u64 = 10_000;

/// Message id used for the registration handshake.
pub const REGISTER_MESSAGE_ID: &str = "register_0";

// ─────────────────────────────────────────────────────────────────────────────
// Pacing
// ─────────────────────────────────────────────────────────────────────────────

/// Delay after each request of a repeat action (milliseconds).
pub const REPEAT_DELAY_MS: u64 = 1000;

// ─────────────────────────────────────────────────────────────────────────────
// Wake-on-LAN
// ─────────────────────────────────────────────────────────────────────────────

/// Destination for magic packets (limited broadcast, discard port).
pub const WOL_BROADCAST_ADDR: &str = "255.255.255.255:9";

/// Number of times the hardware address is repeated in a magic packet.
pub const WOL_MAC_REPETITIONS: usize = 16;

// ─────────────────────────────────────────────────────────────────────────────
// Persistence
// ─────────────────────────────────────────────────────────────────────────────

/// Config store key holding the resolved `{ip, mac}` descriptor.
pub const DESCRIPTOR_CONFIG_KEY: &str = "lgtv";

/// Config store key holding the pairing key issued by the TV.
pub const CLIENT_KEY_CONFIG_KEY: &str = "lgtv-client-key";
