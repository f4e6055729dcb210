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

//! Core protocol types: node identifiers, short hashes, and the fixed-layout
//! payloads carried inside TLVs. All multi-byte integers are network order.

use ring::rand::{SecureRandom, SystemRandom};
use std::fmt;
use thiserror::Error;

use crate::core::tlv::Tlv;

/// Length of a node identifier in bytes.
pub const NODE_ID_LEN: usize = 4;

/// Length of the short digests used for node data and network state.
pub const HASH_LEN: usize = 8;

/// UDP port the protocol speaks on.
pub const PROTOCOL_PORT: u16 = 8808;

/// Link-local multicast group for summary broadcasts.
pub const MULTICAST_GROUP: &str = "ff02::8808";

/// TLV type numbers. Types at or above `TRUST_VERDICT` are opaque to the core
/// and flow through untouched for application layers.
pub mod tlv_type {
    /// Sender identity, included in every outbound message.
    pub const LINK_ID: u16 = 1;
    /// Request for the current network hash; empty payload.
    pub const REQ_NET_HASH: u16 = 2;
    /// Request for one node's full TLV set; payload is the node identifier.
    pub const REQ_NODE_DATA: u16 = 3;
    /// Network-wide hash as computed by the sender.
    pub const NETWORK_HASH: u16 = 4;
    /// Per-node summary (identifier, update number, age, data hash).
    pub const NODE_STATE: u16 = 5;
    /// Full published attribute set of one node.
    pub const NODE_DATA: u16 = 6;
    /// Adjacency record published inside a node's own data.
    pub const NEIGHBOR: u16 = 8;
    /// Protocol version byte plus free-form user agent.
    pub const VERSION: u16 = 10;
    /// Application layer: trust verdicts.
    pub const TRUST_VERDICT: u16 = 20;
    /// Application layer: external connection container.
    pub const EXTERNAL_CONNECTION: u16 = 41;
    /// Application layer: delegated prefix container.
    pub const DELEGATED_PREFIX: u16 = 42;
    /// Application layer: assigned prefix container.
    pub const ASSIGNED_PREFIX: u16 = 43;
    /// Application layer: DHCP options.
    pub const DHCP_OPTIONS: u16 = 44;
    /// Application layer: DHCPv6 options.
    pub const DHCPV6_OPTIONS: u16 = 45;
    /// Application layer: router address.
    pub const ROUTER_ADDRESS: u16 = 46;
    /// Application layer: delegated DNS zone.
    pub const DNS_DELEGATED_ZONE: u16 = 50;
    /// Application layer: router name.
    pub const DNS_ROUTER_NAME: u16 = 51;
    /// Application layer: non-default domain name.
    pub const DNS_DOMAIN_NAME: u16 = 52;
    /// Application layer: routing protocol election.
    pub const ROUTING_PROTOCOL: u16 = 60;
    /// Advertises the sender's keep-alive period in milliseconds.
    pub const KEEPALIVE_INTERVAL: u16 = 123;
    /// Reserved; no behavior defined.
    pub const SIGNATURE: u16 = 0xFFFF;
}

/// Wire decoding error for fixed-layout payloads.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum WireError {
    #[error("payload too short")]
    Short,
}

/// Randomness failure (the system RNG refused to produce bytes).
#[derive(Debug, Error)]
#[error("rng")]
pub struct RngError;

/// Opaque fixed-length node identifier, compared lexicographically.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId([u8; NODE_ID_LEN]);

impl NodeId {
    /// Construct from raw bytes.
    pub fn from_bytes(b: [u8; NODE_ID_LEN]) -> Self {
        Self(b)
    }

    /// Return raw bytes.
    pub fn as_bytes(&self) -> &[u8; NODE_ID_LEN] {
        &self.0
    }

    /// Parse from a wire buffer prefix.
    pub fn parse(buf: &[u8]) -> Result<Self, WireError> {
        if buf.len() < NODE_ID_LEN {
            return Err(WireError::Short);
        }
        let mut out = [0u8; NODE_ID_LEN];
        out.copy_from_slice(&buf[..NODE_ID_LEN]);
        Ok(Self(out))
    }

    /// Generate a fresh random identifier.
    pub fn random(rng: &SystemRandom) -> Result<Self, RngError> {
        let mut out = [0u8; NODE_ID_LEN];
        rng.fill(&mut out).map_err(|_| RngError)?;
        Ok(Self(out))
    }

    /// Derive an identifier from link-layer addresses: the smallest and the
    /// largest address concatenated, digested down to the identifier length.
    /// Returns `None` when no addresses are available.
    pub fn from_hardware_addresses(addrs: &[[u8; 6]]) -> Option<Self> {
        let lo = addrs.iter().min()?;
        let hi = addrs.iter().max()?;
        let mut seed = [0u8; 12];
        seed[..6].copy_from_slice(lo);
        seed[6..].copy_from_slice(hi);
        let digest = ring::digest::digest(&ring::digest::SHA256, &seed);
        let mut out = [0u8; NODE_ID_LEN];
        out.copy_from_slice(&digest.as_ref()[..NODE_ID_LEN]);
        Some(Self(out))
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({})", hex::encode(self.0))
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

/// Truncated 64-bit digest used for node data and network state.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Hash64([u8; HASH_LEN]);

impl Hash64 {
    /// Construct from raw bytes.
    pub fn from_bytes(b: [u8; HASH_LEN]) -> Self {
        Self(b)
    }

    /// Return raw bytes.
    pub fn as_bytes(&self) -> &[u8; HASH_LEN] {
        &self.0
    }

    /// Parse from a wire buffer prefix.
    pub fn parse(buf: &[u8]) -> Result<Self, WireError> {
        if buf.len() < HASH_LEN {
            return Err(WireError::Short);
        }
        let mut out = [0u8; HASH_LEN];
        out.copy_from_slice(&buf[..HASH_LEN]);
        Ok(Self(out))
    }
}

impl fmt::Debug for Hash64 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hash64({})", hex::encode(self.0))
    }
}

impl fmt::Display for Hash64 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

/// LINK_ID payload: sender identity and the sender's local endpoint id.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LinkId {
    /// Sender's node identifier.
    pub node_id: NodeId,
    /// Sender's endpoint id on their side of the link.
    pub endpoint_id: u32,
}

impl LinkId {
    /// Parse from a TLV payload.
    pub fn parse(buf: &[u8]) -> Result<Self, WireError> {
        let node_id = NodeId::parse(buf)?;
        let endpoint_id = read_u32(buf, NODE_ID_LEN)?;
        Ok(Self {
            node_id,
            endpoint_id,
        })
    }

    /// Encode into a TLV.
    pub fn to_tlv(&self) -> Tlv {
        let mut out = Vec::with_capacity(NODE_ID_LEN + 4);
        out.extend_from_slice(self.node_id.as_bytes());
        out.extend_from_slice(&self.endpoint_id.to_be_bytes());
        Tlv::new(tlv_type::LINK_ID, out)
    }
}

/// NODE_STATE payload: per-node summary used for divergence detection.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NodeState {
    /// Subject node identifier.
    pub node_id: NodeId,
    /// Update sequence number of the subject's data.
    pub update_number: u32,
    /// Milliseconds since the subject's data was originated, at send time.
    pub ms_since_origination: u32,
    /// Digest of the subject's canonical TLV serialization.
    pub data_hash: Hash64,
}

impl NodeState {
    /// Parse from a TLV payload.
    pub fn parse(buf: &[u8]) -> Result<Self, WireError> {
        let node_id = NodeId::parse(buf)?;
        let update_number = read_u32(buf, NODE_ID_LEN)?;
        let ms_since_origination = read_u32(buf, NODE_ID_LEN + 4)?;
        if buf.len() < NODE_ID_LEN + 8 + HASH_LEN {
            return Err(WireError::Short);
        }
        let data_hash = Hash64::parse(&buf[NODE_ID_LEN + 8..])?;
        Ok(Self {
            node_id,
            update_number,
            ms_since_origination,
            data_hash,
        })
    }

    /// Encode into a TLV.
    pub fn to_tlv(&self) -> Tlv {
        let mut out = Vec::with_capacity(NODE_ID_LEN + 8 + HASH_LEN);
        out.extend_from_slice(self.node_id.as_bytes());
        out.extend_from_slice(&self.update_number.to_be_bytes());
        out.extend_from_slice(&self.ms_since_origination.to_be_bytes());
        out.extend_from_slice(self.data_hash.as_bytes());
        Tlv::new(tlv_type::NODE_STATE, out)
    }
}

/// NODE_DATA header, followed on the wire by the node's inner TLVs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NodeDataHeader {
    /// Subject node identifier.
    pub node_id: NodeId,
    /// Update sequence number this body corresponds to.
    pub update_number: u32,
}

/// Byte length of the NODE_DATA header prefix.
pub const NODE_DATA_HEADER_LEN: usize = NODE_ID_LEN + 4;

impl NodeDataHeader {
    /// Parse from the front of a NODE_DATA payload.
    pub fn parse(buf: &[u8]) -> Result<Self, WireError> {
        let node_id = NodeId::parse(buf)?;
        let update_number = read_u32(buf, NODE_ID_LEN)?;
        Ok(Self {
            node_id,
            update_number,
        })
    }

    /// Encode the header, then append `inner` (already TLV-encoded).
    pub fn to_tlv(&self, inner: &[u8]) -> Tlv {
        let mut out = Vec::with_capacity(NODE_DATA_HEADER_LEN + inner.len());
        out.extend_from_slice(self.node_id.as_bytes());
        out.extend_from_slice(&self.update_number.to_be_bytes());
        out.extend_from_slice(inner);
        Tlv::new(tlv_type::NODE_DATA, out)
    }
}

/// NEIGHBOR payload: an adjacency assertion published in own node data.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct Neighbor {
    /// The peer across the link.
    pub peer_node_id: NodeId,
    /// The peer's endpoint id on their side.
    pub peer_endpoint_id: u32,
    /// Our endpoint id on this side.
    pub local_endpoint_id: u32,
}

impl Neighbor {
    /// Parse from a TLV payload.
    pub fn parse(buf: &[u8]) -> Result<Self, WireError> {
        let peer_node_id = NodeId::parse(buf)?;
        let peer_endpoint_id = read_u32(buf, NODE_ID_LEN)?;
        let local_endpoint_id = read_u32(buf, NODE_ID_LEN + 4)?;
        Ok(Self {
            peer_node_id,
            peer_endpoint_id,
            local_endpoint_id,
        })
    }

    /// Encode into a TLV.
    pub fn to_tlv(&self) -> Tlv {
        let mut out = Vec::with_capacity(NODE_ID_LEN + 8);
        out.extend_from_slice(self.peer_node_id.as_bytes());
        out.extend_from_slice(&self.peer_endpoint_id.to_be_bytes());
        out.extend_from_slice(&self.local_endpoint_id.to_be_bytes());
        Tlv::new(tlv_type::NEIGHBOR, out)
    }
}

/// VERSION payload: schema version byte, three reserved bytes, user agent.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Version {
    /// Data schema version; nodes with differing versions reject each other's bodies.
    pub version: u8,
    /// Free-form user agent string.
    pub user_agent: String,
}

impl Version {
    /// Parse from a TLV payload.
    pub fn parse(buf: &[u8]) -> Result<Self, WireError> {
        if buf.len() < 4 {
            return Err(WireError::Short);
        }
        Ok(Self {
            version: buf[0],
            user_agent: String::from_utf8_lossy(&buf[4..]).into_owned(),
        })
    }

    /// Encode into a TLV.
    pub fn to_tlv(&self) -> Tlv {
        let mut out = Vec::with_capacity(4 + self.user_agent.len());
        out.push(self.version);
        out.extend_from_slice(&[0u8; 3]);
        out.extend_from_slice(self.user_agent.as_bytes());
        Tlv::new(tlv_type::VERSION, out)
    }
}

/// Build a KEEPALIVE_INTERVAL TLV advertising `interval_ms`.
pub fn keepalive_interval_tlv(interval_ms: u32) -> Tlv {
    Tlv::new(
        tlv_type::KEEPALIVE_INTERVAL,
        interval_ms.to_be_bytes().to_vec(),
    )
}

/// Parse a KEEPALIVE_INTERVAL payload.
pub fn parse_keepalive_interval(buf: &[u8]) -> Result<u32, WireError> {
    read_u32(buf, 0)
}

fn read_u32(buf: &[u8], at: usize) -> Result<u32, WireError> {
    if buf.len() < at + 4 {
        return Err(WireError::Short);
    }
    let mut b = [0u8; 4];
    b.copy_from_slice(&buf[at..at + 4]);
    Ok(u32::from_be_bytes(b))
}
