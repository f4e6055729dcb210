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

//! Local endpoints (interfaces enrolled in the protocol) and the peers last
//! heard on each. A peer is identified within an endpoint by the pair of its
//! node identifier and its endpoint id on its own side of the link.

use std::collections::BTreeMap;
use std::net::SocketAddrV6;

use crate::core::trickle::Trickle;
use crate::core::types::NodeId;

/// A peer ages out after this many keep-alive intervals (times two).
/// 5/2 intervals, fixed by the protocol and not configurable.
pub const LIVENESS_MULTIPLIER_X2: u64 = 5;

/// A remote endpoint heard on one of ours.
#[derive(Clone, Debug)]
pub struct Peer {
    /// Transport address the peer last spoke from.
    pub address: SocketAddrV6,
    /// Last time anything was heard from this peer.
    pub last_contact: u64,
    /// Keep-alive interval the peer advertised, overriding the default when
    /// judging its liveness.
    pub keepalive_ms: Option<u32>,
    /// Last time we sent this peer a unicast request; used to avoid
    /// re-requesting on every received summary.
    pub last_request: u64,
}

/// Result of recording a peer sighting.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PeerSighting {
    /// First contact; a NEIGHBOR attribute should be published.
    New,
    /// Known peer; contact time refreshed.
    Refreshed,
}

/// One enrolled local interface.
#[derive(Debug)]
pub struct Endpoint {
    /// Interface name.
    pub name: String,
    /// Local endpoint id carried in LINK_ID and NEIGHBOR attributes.
    /// Id zero is reserved.
    pub endpoint_id: u32,
    /// Whether the transport joined the multicast group for us.
    pub enabled: bool,
    /// Trickle timer governing summary broadcasts on this link.
    pub trickle: Trickle,
    /// Last time anything was multicast on this link.
    pub last_send: u64,
    peers: BTreeMap<(NodeId, u32), Peer>,
}

impl Endpoint {
    /// Create an endpoint record; `trickle` should be freshly reset.
    pub fn new(name: String, endpoint_id: u32, trickle: Trickle, now: u64) -> Self {
        Self {
            name,
            endpoint_id,
            enabled: true,
            trickle,
            last_send: now,
            peers: BTreeMap::new(),
        }
    }

    /// Record a peer sighting, inserting or refreshing its entry.
    pub fn note_peer(
        &mut self,
        peer_id: NodeId,
        peer_endpoint_id: u32,
        address: SocketAddrV6,
        now: u64,
    ) -> PeerSighting {
        match self.peers.entry((peer_id, peer_endpoint_id)) {
            std::collections::btree_map::Entry::Vacant(e) => {
                e.insert(Peer {
                    address,
                    last_contact: now,
                    keepalive_ms: None,
                    last_request: 0,
                });
                PeerSighting::New
            }
            std::collections::btree_map::Entry::Occupied(mut e) => {
                let p = e.get_mut();
                p.address = address;
                p.last_contact = now;
                PeerSighting::Refreshed
            }
        }
    }

    /// Look up a peer.
    pub fn peer(&self, peer_id: &NodeId, peer_endpoint_id: u32) -> Option<&Peer> {
        self.peers.get(&(*peer_id, peer_endpoint_id))
    }

    /// Mutable peer lookup.
    pub fn peer_mut(&mut self, peer_id: &NodeId, peer_endpoint_id: u32) -> Option<&mut Peer> {
        self.peers.get_mut(&(*peer_id, peer_endpoint_id))
    }

    /// Iterate peers with their identifying keys.
    pub fn peers(&self) -> impl Iterator<Item = (&(NodeId, u32), &Peer)> {
        self.peers.iter()
    }

    /// Number of peers currently tracked.
    pub fn peer_count(&self) -> usize {
        self.peers.len()
    }

    /// Drop peers silent for longer than 5/2 of their keep-alive interval.
    /// Returns the identifying keys of dropped peers.
    pub fn expire_peers(&mut self, now: u64, default_keepalive_ms: u32) -> Vec<(NodeId, u32)> {
        let mut dropped = Vec::new();
        self.peers.retain(|key, p| {
            let interval = u64::from(p.keepalive_ms.unwrap_or(default_keepalive_ms));
            let window = interval * LIVENESS_MULTIPLIER_X2 / 2;
            if now.saturating_sub(p.last_contact) > window {
                dropped.push(*key);
                false
            } else {
                true
            }
        });
        dropped
    }

    /// Earliest instant at which some peer could expire; drives the timer.
    pub fn next_peer_deadline(&self, default_keepalive_ms: u32) -> Option<u64> {
        self.peers
            .values()
            .map(|p| {
                let interval = u64::from(p.keepalive_ms.unwrap_or(default_keepalive_ms));
                p.last_contact + interval * LIVENESS_MULTIPLIER_X2 / 2
            })
            .min()
    }

    /// Drop every peer, returning their identifying keys.
    pub fn clear_peers(&mut self) -> Vec<(NodeId, u32)> {
        let keys: Vec<(NodeId, u32)> = self.peers.keys().copied().collect();
        self.peers.clear();
        keys
    }
}
