//! Wake-on-LAN magic packet transmission.

use async_trait::async_trait;
use tokio::net::UdpSocket;

use super::traits::WakeSender;
use super::types::WakeError;
use crate::protocol_constants::{WOL_BROADCAST_ADDR, WOL_MAC_REPETITIONS};
use crate::utils::mac_to_bytes;

/// Builds a magic packet: six `0xFF` bytes followed by the hardware address
/// repeated sixteen times.
fn build_magic_packet(mac: &[u8; 6]) -> Vec<u8> {
    let mut packet = Vec::with_capacity(6 + 6 * WOL_MAC_REPETITIONS);
    packet.extend_from_slice(&[0xFF; 6]);
    for _ in 0..WOL_MAC_REPETITIONS {
        packet.extend_from_slice(mac);
    }
    packet
}

/// [`WakeSender`] that broadcasts magic packets over UDP.
#[derive(Debug, Clone)]
pub struct UdpWakeSender {
    target: String,
}

impl UdpWakeSender {
    /// Creates a sender targeting the limited broadcast address on port 9.
    pub fn new() -> Self {
        Self::with_target(WOL_BROADCAST_ADDR)
    }

    /// Creates a sender targeting a specific `host:port` (e.g. a directed
    /// broadcast address for networks that drop limited broadcasts).
    pub fn with_target(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
        }
    }
}

impl Default for UdpWakeSender {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl WakeSender for UdpWakeSender {
    async fn wake(&self, mac: &str) -> Result<(), WakeError> {
        let bytes = mac_to_bytes(mac).ok_or_else(|| WakeError::InvalidMac(mac.to_string()))?;
        let packet = build_magic_packet(&bytes);

        let socket = UdpSocket::bind("0.0.0.0:0").await?;
        socket.set_broadcast(true)?;
        socket.send_to(&packet, &self.target).await?;

        log::debug!("[WoL] Sent magic packet for {} to {}", mac, self.target);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn magic_packet_layout() {
        let mac = [0x0a, 0x0b, 0x02, 0x33, 0x04, 0x05];
        let packet = build_magic_packet(&mac);

        assert_eq!(packet.len(), 102);
        assert_eq!(&packet[..6], &[0xFF; 6]);
        for chunk in packet[6..].chunks(6) {
            assert_eq!(chunk, &mac);
        }
    }

    #[tokio::test]
    async fn wake_rejects_invalid_mac() {
        let sender = UdpWakeSender::new();
        let err = sender.wake("not-a-mac").await.unwrap_err();
        assert!(matches!(err, WakeError::InvalidMac(_)));
    }

    #[tokio::test]
    async fn wake_sends_packet_to_target() {
        let receiver = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let target = receiver.local_addr().unwrap().to_string();

        let sender = UdpWakeSender::with_target(target);
        sender.wake("a:b:2:33:4:5").await.unwrap();

        let mut buf = [0u8; 256];
        let (len, _) = receiver.recv_from(&mut buf).await.unwrap();
        assert_eq!(len, 102);
        assert_eq!(&buf[6..12], &[0x0a, 0x0b, 0x02, 0x33, 0x04, 0x05]);
    }
}
