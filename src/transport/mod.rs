#![forbid(unsafe_code)]
#![allow(missing_docs)]

//! Transport facade: what the core needs from the socket layer.

pub mod udp;

use std::net::SocketAddrV6;
use thiserror::Error;

/// Transport errors.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("io")]
    Io,
    #[error("unknown endpoint")]
    UnknownEndpoint,
}

/// Result of a non-blocking send.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SendOutcome {
    /// Whole datagram handed to the kernel.
    Sent,
    /// Partial write; the Trickle schedule retransmits later.
    Short(usize),
}

/// Socket-layer contract consumed by the protocol core.
///
/// Sends must not block; the core logs short writes and failures and moves
/// on. Receives are not part of this trait: the runtime drains the socket
/// itself and feeds datagrams to the core as events.
pub trait Transport {
    /// Send a datagram on `endpoint`. `dst` of `None` means the protocol
    /// multicast group.
    fn send(
        &self,
        endpoint: &str,
        dst: Option<SocketAddrV6>,
        bytes: &[u8],
    ) -> Result<SendOutcome, TransportError>;

    /// Join the multicast group on the named interface.
    fn join(&self, endpoint: &str) -> bool;

    /// Leave the multicast group on the named interface.
    fn leave(&self, endpoint: &str) -> bool;

    /// Largest useful datagram on this endpoint.
    fn mtu(&self, _endpoint: &str) -> usize {
        1280
    }

    /// Link-layer addresses of the host, used once at boot to seed the node
    /// identifier. May be empty.
    fn hardware_addresses(&self) -> Vec<[u8; 6]> {
        Vec::new()
    }
}
