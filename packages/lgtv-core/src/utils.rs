//! General utilities shared across the library.

use std::time::{SystemTime, UNIX_EPOCH};

// ─────────────────────────────────────────────────────────────────────────────
// Time Utilities
// ─────────────────────────────────────────────────────────────────────────────

/// Returns the current Unix timestamp in milliseconds.
///
/// Returns 0 if the system clock is before the Unix epoch.
#[must_use]
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

// ─────────────────────────────────────────────────────────────────────────────
// Hardware Address Normalization
// ─────────────────────────────────────────────────────────────────────────────

/// Number of octets in an Ethernet hardware address.
const MAC_OCTETS: usize = 6;

/// Normalizes a hardware address to `aa:bb:cc:dd:ee:ff` form.
///
/// ARP tables on some platforms drop leading zeros (`a:b:2:33:4:5`), and
/// Windows uses dashes. Every octet is left-padded to two lowercase hex digits.
///
/// Returns `None` when the input is not a six-octet address: missing
/// separator, an empty octet, an octet longer than two characters, or a
/// non-hex character.
#[must_use]
pub fn normalize_mac(raw: &str) -> Option<String> {
    let raw = raw.trim();
    let separator = if raw.contains(':') {
        ':'
    } else if raw.contains('-') {
        '-'
    } else {
        return None;
    };

    let octets: Vec<&str> = raw.split(separator).collect();
    if octets.len() != MAC_OCTETS {
        return None;
    }

    let mut normalized = Vec::with_capacity(MAC_OCTETS);
    for octet in octets {
        if octet.is_empty() || octet.len() > 2 || !octet.bytes().all(|b| b.is_ascii_hexdigit()) {
            return None;
        }
        normalized.push(format!("{:0>2}", octet.to_ascii_lowercase()));
    }

    Some(normalized.join(":"))
}

/// Parses a normalized or raw hardware address into bytes.
#[must_use]
pub fn mac_to_bytes(mac: &str) -> Option<[u8; MAC_OCTETS]> {
    let normalized = normalize_mac(mac)?;
    let mut bytes = [0u8; MAC_OCTETS];
    for (slot, octet) in bytes.iter_mut().zip(normalized.split(':')) {
        *slot = u8::from_str_radix(octet, 16).ok()?;
    }
    Some(bytes)
}

// ─────────────────────────────────────────────────────────────────────────────
// Repeat Counts
// ─────────────────────────────────────────────────────────────────────────────

/// Parses a repeat count the way a lenient command line would.
///
/// Leading digits are honored (`"3x"` is 3). Missing, non-numeric, zero and
/// negative counts all become 1, so a repeat action always fires at least once.
#[must_use]
pub fn parse_repeat_count(raw: Option<&str>) -> usize {
    let Some(raw) = raw else { return 1 };
    let digits: String = raw
        .trim()
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse::<usize>().ok().filter(|&n| n > 0).unwrap_or(1)
}
