// Copyright (c) 2026 Hearthnet
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//     http://www.apache.org/licenses/LICENSE-2.0
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

//! IPv6 link-local UDP multicast transport.
//!
//! One socket serves every enrolled interface; datagrams are routed back to
//! their endpoint by the source scope id. Multicast loopback is disabled so
//! the engine never hears its own broadcasts.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::net::{Ipv6Addr, SocketAddr, SocketAddrV6};
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

use crate::transport::{SendOutcome, Transport, TransportError};

/// IPv6 + UDP header overhead subtracted from the interface MTU.
const IP_UDP_OVERHEAD: usize = 48;

/// Shared UDP socket bound to the protocol port.
#[derive(Clone)]
pub struct UdpTransport {
    socket: Arc<tokio::net::UdpSocket>,
    port: u16,
    group: Ipv6Addr,
    default_mtu: usize,
    ifindex_by_name: Arc<Mutex<BTreeMap<String, u32>>>,
}

impl UdpTransport {
    /// Bind the protocol socket on `port` with multicast loopback off.
    pub fn bind(port: u16, default_mtu: usize) -> io::Result<Self> {
        let std_socket = std::net::UdpSocket::bind(SocketAddrV6::new(
            Ipv6Addr::UNSPECIFIED,
            port,
            0,
            0,
        ))?;
        std_socket.set_nonblocking(true)?;
        std_socket.set_multicast_loop_v6(false)?;
        let socket = tokio::net::UdpSocket::from_std(std_socket)?;
        Ok(Self {
            socket: Arc::new(socket),
            port,
            // ff02::8808
            group: Ipv6Addr::new(0xff02, 0, 0, 0, 0, 0, 0, 0x8808),
            default_mtu,
            ifindex_by_name: Arc::new(Mutex::new(BTreeMap::new())),
        })
    }

    fn ifindex_of(&self, endpoint: &str) -> Option<u32> {
        if let Ok(map) = self.ifindex_by_name.lock() {
            if let Some(idx) = map.get(endpoint) {
                return Some(*idx);
            }
        }
        read_ifindex(endpoint)
    }

    /// Map a source scope id back to the enrolled interface it arrived on.
    pub fn endpoint_for_ifindex(&self, ifindex: u32) -> Option<String> {
        let map = self.ifindex_by_name.lock().ok()?;
        map.iter()
            .find(|(_, idx)| **idx == ifindex)
            .map(|(name, _)| name.clone())
    }

    /// Wait until the socket is readable.
    pub async fn readable(&self) -> io::Result<()> {
        self.socket.readable().await
    }

    /// Drain one datagram if available, resolving the receiving endpoint.
    /// Returns `None` when the socket would block or the datagram cannot be
    /// attributed to an enrolled interface.
    pub fn try_recv(&self, buf: &mut [u8]) -> Option<(String, SocketAddrV6, usize)> {
        match self.socket.try_recv_from(buf) {
            Ok((n, SocketAddr::V6(src))) => {
                let Some(endpoint) = self.endpoint_for_ifindex(src.scope_id()) else {
                    debug!(%src, "datagram from unenrolled interface");
                    return None;
                };
                Some((endpoint, src, n))
            }
            Ok((_, addr)) => {
                debug!(%addr, "ignoring non-IPv6 datagram");
                None
            }
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => None,
            Err(e) => {
                warn!(err = %e, "socket receive failed");
                None
            }
        }
    }
}

impl Transport for UdpTransport {
    fn send(
        &self,
        endpoint: &str,
        dst: Option<SocketAddrV6>,
        bytes: &[u8],
    ) -> Result<SendOutcome, TransportError> {
        let ifindex = self
            .ifindex_of(endpoint)
            .ok_or(TransportError::UnknownEndpoint)?;
        let target = match dst {
            Some(mut addr) => {
                if addr.scope_id() == 0 {
                    addr.set_scope_id(ifindex);
                }
                addr
            }
            None => SocketAddrV6::new(self.group, self.port, 0, ifindex),
        };
        match self.socket.try_send_to(bytes, SocketAddr::V6(target)) {
            Ok(n) if n == bytes.len() => Ok(SendOutcome::Sent),
            Ok(n) => Ok(SendOutcome::Short(n)),
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => Ok(SendOutcome::Short(0)),
            Err(_) => Err(TransportError::Io),
        }
    }

    fn join(&self, endpoint: &str) -> bool {
        let Some(ifindex) = read_ifindex(endpoint) else {
            warn!(endpoint, "no such interface");
            return false;
        };
        if let Err(e) = self.socket.join_multicast_v6(&self.group, ifindex) {
            warn!(endpoint, err = %e, "multicast join failed");
            return false;
        }
        if let Ok(mut map) = self.ifindex_by_name.lock() {
            map.insert(endpoint.to_string(), ifindex);
        }
        true
    }

    fn leave(&self, endpoint: &str) -> bool {
        let Some(ifindex) = self.ifindex_of(endpoint) else {
            return false;
        };
        if let Ok(mut map) = self.ifindex_by_name.lock() {
            map.remove(endpoint);
        }
        match self.socket.leave_multicast_v6(&self.group, ifindex) {
            Ok(()) => true,
            Err(e) => {
                warn!(endpoint, err = %e, "multicast leave failed");
                false
            }
        }
    }

    fn mtu(&self, endpoint: &str) -> usize {
        read_link_mtu(endpoint)
            .map(|m| m.saturating_sub(IP_UDP_OVERHEAD))
            .unwrap_or(self.default_mtu)
    }

    fn hardware_addresses(&self) -> Vec<[u8; 6]> {
        let Ok(entries) = fs::read_dir("/sys/class/net") else {
            return Vec::new();
        };
        let mut out = Vec::new();
        for entry in entries.flatten() {
            let path = entry.path().join("address");
            let Ok(raw) = fs::read_to_string(path) else {
                continue;
            };
            if let Some(mac) = parse_mac(raw.trim()) {
                if mac != [0u8; 6] {
                    out.push(mac);
                }
            }
        }
        out
    }
}

fn read_ifindex(endpoint: &str) -> Option<u32> {
    if endpoint.contains('/') || endpoint.contains("..") {
        return None;
    }
    let raw = fs::read_to_string(format!("/sys/class/net/{endpoint}/ifindex")).ok()?;
    raw.trim().parse().ok()
}

fn read_link_mtu(endpoint: &str) -> Option<usize> {
    if endpoint.contains('/') || endpoint.contains("..") {
        return None;
    }
    let raw = fs::read_to_string(format!("/sys/class/net/{endpoint}/mtu")).ok()?;
    raw.trim().parse().ok()
}

fn parse_mac(s: &str) -> Option<[u8; 6]> {
    let mut out = [0u8; 6];
    let mut parts = s.split(':');
    for byte in out.iter_mut() {
        *byte = u8::from_str_radix(parts.next()?, 16).ok()?;
    }
    if parts.next().is_some() {
        return None;
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mac_parsing() {
        assert_eq!(
            parse_mac("02:00:5e:10:00:01"),
            Some([0x02, 0x00, 0x5e, 0x10, 0x00, 0x01])
        );
        assert_eq!(parse_mac("02:00:5e:10:00"), None);
        assert_eq!(parse_mac("02:00:5e:10:00:01:02"), None);
        assert_eq!(parse_mac("zz:00:5e:10:00:01"), None);
    }

    #[test]
    fn interface_names_are_sanitized() {
        assert_eq!(read_ifindex("../etc/passwd"), None);
        assert_eq!(read_ifindex("eth0/.."), None);
    }
}
