//! Hardware address lookup through the system ARP table.
//!
//! On Linux the kernel table at `/proc/net/arp` is read directly. Everywhere
//! else (and when the kernel table has no complete entry) the platform `arp`
//! tool is run and its output scanned for the address.

use std::net::IpAddr;

use async_trait::async_trait;
use tokio::process::Command;

use super::traits::ArpLookup;
use super::types::ArpError;
use crate::utils::normalize_mac;

const PROC_NET_ARP: &str = "/proc/net/arp";

/// ARP flags value for an incomplete entry.
const ATF_INCOMPLETE: &str = "0x0";

/// [`ArpLookup`] backed by the operating system's neighbor table.
#[derive(Debug, Clone, Default)]
pub struct SystemArpTable;

impl SystemArpTable {
    pub fn new() -> Self {
        Self
    }

    async fn lookup_proc(&self, ip: &str) -> Option<String> {
        let contents = tokio::fs::read_to_string(PROC_NET_ARP).await.ok()?;
        parse_proc_net_arp(&contents, ip)
    }

    async fn lookup_tool(&self, ip: &str) -> Result<String, ArpError> {
        let args: [&str; 2] = if cfg!(windows) { ["-a", ip] } else { ["-n", ip] };
        let output = Command::new("arp").args(args).output().await?;
        let stdout = String::from_utf8_lossy(&output.stdout);
        log::trace!("[Arp] arp {:?} -> {:?}", args, stdout);
        parse_arp_output(&stdout, ip).ok_or_else(|| ArpError::NotFound(ip.to_string()))
    }
}

#[async_trait]
impl ArpLookup for SystemArpTable {
    async fn lookup(&self, ip: IpAddr) -> Result<String, ArpError> {
        let ip = ip.to_string();

        if cfg!(target_os = "linux") {
            if let Some(mac) = self.lookup_proc(&ip).await {
                return Ok(mac);
            }
            log::debug!("[Arp] No complete kernel entry for {}, trying arp tool", ip);
        }

        self.lookup_tool(&ip).await
    }
}

/// Extracts the hardware address for `ip` from `/proc/net/arp` contents.
///
/// Incomplete entries (flags `0x0` or an all-zero address) are skipped.
fn parse_proc_net_arp(contents: &str, ip: &str) -> Option<String> {
    contents.lines().skip(1).find_map(|line| {
        let columns: Vec<&str> = line.split_whitespace().collect();
        match columns.as_slice() {
            [entry_ip, _hw_type, flags, hw_addr, ..]
                if *entry_ip == ip
                    && *flags != ATF_INCOMPLETE
                    && *hw_addr != "00:00:00:00:00:00" =>
            {
                Some((*hw_addr).to_string())
            }
            _ => None,
        }
    })
}

/// Extracts the hardware address for `ip` from `arp` tool output.
///
/// Handles the Linux (`10.0.0.5 ether aa:bb:...`), BSD/macOS
/// (`? (10.0.0.5) at a:b:2:33:4:5 on en0`) and Windows
/// (`10.0.0.5  aa-bb-cc-...  dynamic`) formats.
fn parse_arp_output(output: &str, ip: &str) -> Option<String> {
    output
        .lines()
        .filter(|line| {
            line.split_whitespace()
                .any(|token| token.trim_matches(|c| c == '(' || c == ')') == ip)
        })
        .flat_map(str::split_whitespace)
        .find(|token| normalize_mac(token).is_some())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PROC_SAMPLE: &str = "\
IP address       HW type     Flags       HW address            Mask     Device
10.0.0.1         0x1         0x2         11:22:33:44:55:66     *        eth0
10.0.0.5         0x1         0x2         ac:5a:f0:1b:2c:3d     *        eth0
10.0.0.9         0x1         0x0         00:00:00:00:00:00     *        eth0
";

    #[test]
    fn proc_table_returns_complete_entry() {
        assert_eq!(
            parse_proc_net_arp(PROC_SAMPLE, "10.0.0.5").as_deref(),
            Some("ac:5a:f0:1b:2c:3d")
        );
    }

    #[test]
    fn proc_table_skips_incomplete_and_missing_entries() {
        assert_eq!(parse_proc_net_arp(PROC_SAMPLE, "10.0.0.9"), None);
        assert_eq!(parse_proc_net_arp(PROC_SAMPLE, "10.0.0.77"), None);
        // Prefix of another address must not match.
        assert_eq!(parse_proc_net_arp(PROC_SAMPLE, "10.0.0."), None);
    }

    #[test]
    fn arp_output_linux_format() {
        let output = "\
Address                  HWtype  HWaddress           Flags Mask            Iface
10.0.0.5                 ether   ac:5a:f0:1b:2c:3d   C                     eth0
";
        assert_eq!(
            parse_arp_output(output, "10.0.0.5").as_deref(),
            Some("ac:5a:f0:1b:2c:3d")
        );
    }

    #[test]
    fn arp_output_macos_format_keeps_short_octets() {
        let output = "? (10.0.0.5) at a:b:2:33:4:5 on en0 ifscope [ethernet]\n";
        assert_eq!(
            parse_arp_output(output, "10.0.0.5").as_deref(),
            Some("a:b:2:33:4:5")
        );
    }

    #[test]
    fn arp_output_windows_format() {
        let output = "\
Interface: 10.0.0.2 --- 0x4
  Internet Address      Physical Address      Type
  10.0.0.5              ac-5a-f0-1b-2c-3d     dynamic
";
        assert_eq!(
            parse_arp_output(output, "10.0.0.5").as_deref(),
            Some("ac-5a-f0-1b-2c-3d")
        );
    }

    #[test]
    fn arp_output_without_entry() {
        let output = "10.0.0.5 (10.0.0.5) -- no entry\n";
        assert_eq!(parse_arp_output(output, "10.0.0.5"), None);
    }
}
