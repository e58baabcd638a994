//! SSDP M-SEARCH over UDP multicast.
//!
//! One socket is bound per usable IPv4 interface. Each socket sends the
//! M-SEARCH a few times and then streams every parseable response into the
//! shared [`SsdpSearch`] until the search is stopped. Devices reply unicast to
//! the sending socket, so the same socket is used for send and receive.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use local_ip_address::list_afinet_netifas;
use socket2::{Domain, Protocol, Socket, Type};
use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::traits::SsdpSearcher;
use super::types::{DiscoveryError, DiscoveryResult, SsdpResponse, SsdpSearch};
use crate::protocol_constants::SSDP_MULTICAST_ADDR;
use crate::state::AdapterConfig;

/// Capacity of the response channel shared by all interface sockets.
const RESPONSE_CHANNEL_CAPACITY: usize = 32;

/// Interface name prefixes belonging to containers, VPNs and hypervisors.
const VIRTUAL_INTERFACE_PREFIXES: &[&str] = &[
    "docker", "br-", "veth", "virbr", "vmnet", "vboxnet", "utun", "tun", "tap", "zt", "tailscale",
];

/// Configuration for SSDP searches.
#[derive(Debug, Clone)]
pub struct SsdpConfig {
    /// Number of M-SEARCH packets to send per interface.
    pub send_count: u64,
    /// Delay between M-SEARCH retries.
    pub retry_delay: Duration,
    /// MX value (max response delay in seconds).
    pub mx_value: u64,
}

impl Default for SsdpConfig {
    fn default() -> Self {
        Self {
            send_count: 3,
            retry_delay: Duration::from_millis(800),
            mx_value: 1,
        }
    }
}

impl From<&AdapterConfig> for SsdpConfig {
    fn from(config: &AdapterConfig) -> Self {
        Self {
            send_count: config.ssdp_send_count,
            retry_delay: Duration::from_millis(config.ssdp_retry_delay_ms),
            mx_value: config.ssdp_mx,
        }
    }
}

/// Build the M-SEARCH message.
fn build_msearch_message(search_target: &str, mx: u64) -> String {
    format!(
        "M-SEARCH * HTTP/1.1\r\n\
         HOST: {}\r\n\
         MAN: \"ssdp:discover\"\r\n\
         MX: {}\r\n\
         ST: {}\r\n\r\n",
        SSDP_MULTICAST_ADDR, mx, search_target
    )
}

/// Checks if `s` starts with `prefix` (ASCII case-insensitive, no allocation).
#[inline]
fn starts_with_ignore_ascii_case(s: &str, prefix: &str) -> bool {
    s.len() >= prefix.len() && s.as_bytes()[..prefix.len()].eq_ignore_ascii_case(prefix.as_bytes())
}

/// Parses an SSDP search response into its headers.
///
/// Only `HTTP/1.1 200` answers are accepted; `NOTIFY` and `M-SEARCH`
/// datagrams from other control points are ignored.
fn parse_ssdp_response(response: &str, source: IpAddr) -> Option<SsdpResponse> {
    let mut lines = response.lines();
    let status = lines.next()?;
    if !starts_with_ignore_ascii_case(status, "HTTP/1.1 200") {
        return None;
    }

    let headers = lines.filter_map(|line| {
        let (name, value) = line.split_once(':')?;
        let name = name.trim();
        if name.is_empty() {
            return None;
        }
        Some((name.to_string(), value.trim().to_string()))
    });

    Some(SsdpResponse::new(source, headers))
}

fn is_virtual_interface(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    VIRTUAL_INTERFACE_PREFIXES
        .iter()
        .any(|prefix| lower.starts_with(prefix))
}

/// Gets all usable IPv4 interface addresses for discovery.
fn get_interface_ips() -> Vec<(String, Ipv4Addr)> {
    list_afinet_netifas()
        .unwrap_or_else(|e| {
            log::warn!("[SSDP] Failed to list network interfaces: {}", e);
            Vec::new()
        })
        .into_iter()
        .filter_map(|(name, addr)| match addr {
            IpAddr::V4(ipv4) if !ipv4.is_loopback() && !is_virtual_interface(&name) => {
                Some((name, ipv4))
            }
            _ => None,
        })
        .collect()
}

/// Creates a UDP socket bound to a specific interface with SSDP options set.
fn create_socket(iface_ip: Ipv4Addr) -> Result<UdpSocket, DiscoveryError> {
    let bind_addr = SocketAddr::new(IpAddr::V4(iface_ip), 0);

    let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))
        .map_err(DiscoveryError::SocketBind)?;

    if let Err(e) = socket.set_reuse_address(true) {
        log::warn!("[SSDP] Failed to set SO_REUSEADDR on {}: {}", iface_ip, e);
    }

    // UPnP 1.0 recommends TTL of 4 for SSDP multicast
    if let Err(e) = socket.set_multicast_ttl_v4(4) {
        log::warn!("[SSDP] Failed to set multicast TTL on {}: {}", iface_ip, e);
    }

    socket
        .set_nonblocking(true)
        .map_err(DiscoveryError::SocketBind)?;
    socket
        .bind(&bind_addr.into())
        .map_err(DiscoveryError::SocketBind)?;

    let std_socket: std::net::UdpSocket = socket.into();
    UdpSocket::from_std(std_socket).map_err(DiscoveryError::SocketBind)
}

/// [`SsdpSearcher`] using UDP multicast on every non-virtual interface.
#[derive(Debug, Clone, Default)]
pub struct UdpSsdpSearcher {
    config: SsdpConfig,
}

impl UdpSsdpSearcher {
    pub fn new(config: SsdpConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl SsdpSearcher for UdpSsdpSearcher {
    async fn search(&self, search_target: &str) -> DiscoveryResult<SsdpSearch> {
        let interfaces = get_interface_ips();
        if interfaces.is_empty() {
            return Err(DiscoveryError::NoInterfaces);
        }

        let mut sockets = Vec::new();
        for (name, ip) in &interfaces {
            match create_socket(*ip) {
                Ok(socket) => sockets.push((name.clone(), Arc::new(socket))),
                Err(e) => log::warn!("[SSDP] Skipping {} ({}): {}", name, ip, e),
            }
        }
        if sockets.is_empty() {
            return Err(DiscoveryError::NoInterfaces);
        }

        log::debug!(
            "[SSDP] Searching for {} on {} interface(s)",
            search_target,
            sockets.len()
        );

        let (tx, rx) = mpsc::channel(RESPONSE_CHANNEL_CAPACITY);
        let cancel = CancellationToken::new();
        let msg = build_msearch_message(search_target, self.config.mx_value);

        for (iface_name, socket) in sockets {
            tokio::spawn(send_loop(
                Arc::clone(&socket),
                iface_name.clone(),
                msg.clone().into_bytes(),
                self.config.clone(),
                cancel.clone(),
            ));
            tokio::spawn(recv_loop(socket, iface_name, tx.clone(), cancel.clone()));
        }

        Ok(SsdpSearch::new(rx, cancel))
    }
}

/// Sends the M-SEARCH `send_count` times with `retry_delay` spacing.
async fn send_loop(
    socket: Arc<UdpSocket>,
    iface_name: String,
    msg: Vec<u8>,
    config: SsdpConfig,
    cancel: CancellationToken,
) {
    for attempt in 0..config.send_count {
        if attempt > 0 {
            tokio::select! {
                _ = cancel.cancelled() => return,
                _ = tokio::time::sleep(config.retry_delay) => {}
            }
        }
        if let Err(e) = socket.send_to(&msg, SSDP_MULTICAST_ADDR).await {
            log::warn!(
                "[SSDP] Failed to send M-SEARCH on {} (attempt {}): {}",
                iface_name,
                attempt + 1,
                e
            );
        }
    }
}

/// Forwards parsed responses until the search is cancelled or abandoned.
async fn recv_loop(
    socket: Arc<UdpSocket>,
    iface_name: String,
    tx: mpsc::Sender<SsdpResponse>,
    cancel: CancellationToken,
) {
    let mut buf = [0u8; 2048];
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            received = socket.recv_from(&mut buf) => match received {
                Ok((amt, src)) => {
                    let text = String::from_utf8_lossy(&buf[..amt]);
                    let Some(response) = parse_ssdp_response(&text, src.ip()) else {
                        continue;
                    };
                    log::trace!("[SSDP] Response from {} via {}", src.ip(), iface_name);
                    if tx.send(response).await.is_err() {
                        break;
                    }
                }
                Err(e) => {
                    log::warn!("[SSDP] Socket recv error on {}: {}", iface_name, e);
                    break;
                }
            }
        }
    }
    log::trace!("[SSDP] Recv loop finished on {}", iface_name);
}

#[cfg(test)]
mod tests {
    use super::*;

    const WEBOS_RESPONSE: &str = "HTTP/1.1 200 OK\r\n\
CACHE-CONTROL: max-age=1800\r\n\
LOCATION: http://10.0.0.5:1337/\r\n\
SERVER: WebOS/4.1.0 UPnP/1.0 LGE WebOS TV/1.0\r\n\
ST: urn:schemas-upnp-org:device:MediaRenderer:1\r\n\
USN: uuid:abcd-1234::urn:schemas-upnp-org:device:MediaRenderer:1\r\n\r\n";

    #[test]
    fn msearch_message_targets_multicast_group() {
        let msg = build_msearch_message("urn:schemas-upnp-org:device:MediaRenderer:1", 1);
        assert!(msg.starts_with("M-SEARCH * HTTP/1.1\r\n"));
        assert!(msg.contains("HOST: 239.255.255.250:1900"));
        assert!(msg.contains("MX: 1"));
        assert!(msg.contains("ST: urn:schemas-upnp-org:device:MediaRenderer:1"));
        assert!(msg.ends_with("\r\n\r\n"));
    }

    #[test]
    fn parses_search_response_headers() {
        let source = IpAddr::V4(Ipv4Addr::new(10, 0, 0, 5));
        let response = parse_ssdp_response(WEBOS_RESPONSE, source).unwrap();

        assert_eq!(response.source, source);
        assert_eq!(
            response.server(),
            Some("WebOS/4.1.0 UPnP/1.0 LGE WebOS TV/1.0")
        );
        // Colons inside values are preserved.
        assert_eq!(response.header("location"), Some("http://10.0.0.5:1337/"));
    }

    #[test]
    fn ignores_non_response_datagrams() {
        let notify = "NOTIFY * HTTP/1.1\r\nHOST: 239.255.255.250:1900\r\n\r\n";
        let source = IpAddr::V4(Ipv4Addr::new(10, 0, 0, 7));
        assert!(parse_ssdp_response(notify, source).is_none());
        assert!(parse_ssdp_response("", source).is_none());
    }

    #[test]
    fn lowercase_status_line_is_accepted() {
        let source = IpAddr::V4(Ipv4Addr::new(10, 0, 0, 5));
        let response = parse_ssdp_response("http/1.1 200 ok\r\nserver: x\r\n", source).unwrap();
        assert_eq!(response.server(), Some("x"));
    }

    #[test]
    fn virtual_interfaces_are_skipped() {
        assert!(is_virtual_interface("docker0"));
        assert!(is_virtual_interface("vEthernet"));
        assert!(!is_virtual_interface("eth0"));
        assert!(!is_virtual_interface("en0"));
    }

    #[test]
    fn config_follows_adapter_config() {
        let adapter = AdapterConfig {
            ssdp_send_count: 5,
            ssdp_retry_delay_ms: 100,
            ssdp_mx: 2,
            ..Default::default()
        };
        let config = SsdpConfig::from(&adapter);
        assert_eq!(config.send_count, 5);
        assert_eq!(config.retry_delay, Duration::from_millis(100));
        assert_eq!(config.mx_value, 2);
    }
}
