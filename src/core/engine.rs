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

//! Protocol state machine: ingests decoded messages, drives Trickle
//! consistency, requests missing node data, heals identifier collisions,
//! prunes unreachable nodes, and fans out subscriber notifications.
//!
//! The engine is single-threaded and sans-IO: it is driven by `(now, event)`
//! inputs, sends through the [`Transport`] facade without blocking, and
//! reports the single next deadline it wants to be woken at.

use ring::rand::SystemRandom;
use std::collections::BTreeMap;
use std::net::SocketAddrV6;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::core::config::ProtocolConfig;
use crate::core::endpoint::{Endpoint, PeerSighting};
use crate::core::hash;
use crate::core::store::{BodyOutcome, NodeStore, UpsertOutcome, VersionValidator};
use crate::core::subscriber::{PendingOp, PublishQueue, Subscriber};
use crate::core::tlv::{self, Tlv};
use crate::core::trickle::Trickle;
use crate::core::types::{
    tlv_type, Hash64, LinkId, Neighbor, NodeDataHeader, NodeId, NodeState, RngError,
    NODE_DATA_HEADER_LEN,
};
use crate::monitoring::metrics::Metrics;
use crate::transport::{SendOutcome, Transport};

/// Input to the engine, paired with a monotonic timestamp by the driver.
#[derive(Debug)]
pub enum Event {
    /// A datagram arrived on an enabled endpoint.
    Received {
        /// Endpoint it arrived on.
        endpoint: String,
        /// Link-local source address.
        src: SocketAddrV6,
        /// Raw datagram bytes.
        bytes: Vec<u8>,
    },
    /// The requested deadline elapsed.
    TimerFired,
    /// Application publish.
    Publish(Tlv),
    /// Application unpublish.
    Unpublish(Tlv),
    /// Enroll an interface.
    EnableEndpoint(String),
    /// Withdraw an interface.
    DisableEndpoint(String),
    /// Tear down: leave all groups and stop.
    Shutdown,
}

/// The protocol core.
pub struct Engine<T: Transport> {
    cfg: ProtocolConfig,
    transport: T,
    metrics: Arc<Metrics>,
    store: NodeStore,
    endpoints: BTreeMap<String, Endpoint>,
    subscribers: Vec<Box<dyn Subscriber>>,
    rng: SystemRandom,
    next_endpoint_id: u32,
    collisions_on_current_id: u32,
    last_prune: u64,
    prune_at: Option<u64>,
}

impl<T: Transport> Engine<T> {
    /// Create an engine, deriving the node identifier from the host's
    /// link-layer addresses, or randomly when none are available.
    pub fn new(
        cfg: ProtocolConfig,
        transport: T,
        metrics: Arc<Metrics>,
        now: u64,
    ) -> Result<Self, RngError> {
        let rng = SystemRandom::new();
        let id = match NodeId::from_hardware_addresses(&transport.hardware_addresses()) {
            Some(id) => id,
            None => {
                warn!("no link-layer addresses; using random node identifier");
                NodeId::random(&rng)?
            }
        };
        Ok(Self::with_parts(cfg, transport, metrics, id, rng, now))
    }

    /// Create an engine with an explicit node identifier.
    pub fn with_identifier(
        cfg: ProtocolConfig,
        transport: T,
        metrics: Arc<Metrics>,
        id: NodeId,
        now: u64,
    ) -> Self {
        Self::with_parts(cfg, transport, metrics, id, SystemRandom::new(), now)
    }

    fn with_parts(
        cfg: ProtocolConfig,
        transport: T,
        metrics: Arc<Metrics>,
        id: NodeId,
        rng: SystemRandom,
        now: u64,
    ) -> Self {
        info!(node = %id, "engine starting");
        Self {
            cfg,
            transport,
            metrics,
            store: NodeStore::new(id, now),
            endpoints: BTreeMap::new(),
            subscribers: Vec::new(),
            rng,
            next_endpoint_id: 1,
            collisions_on_current_id: 0,
            last_prune: now,
            prune_at: None,
        }
    }

    /// Local node identifier (may change after repeated collisions).
    pub fn node_id(&self) -> NodeId {
        self.store.own_id()
    }

    /// Current network hash.
    pub fn network_hash(&self) -> Hash64 {
        self.store.network_hash()
    }

    /// Read access to the node store.
    pub fn store(&self) -> &NodeStore {
        &self.store
    }

    /// Look up an endpoint record.
    pub fn endpoint(&self, name: &str) -> Option<&Endpoint> {
        self.endpoints.get(name)
    }

    /// Register a notification subscriber.
    pub fn subscribe(&mut self, sub: Box<dyn Subscriber>) {
        self.subscribers.push(sub);
    }

    /// Dispatch one queued input. Returns false on shutdown.
    pub fn handle_event(&mut self, now: u64, event: Event) -> bool {
        match event {
            Event::Received {
                endpoint,
                src,
                bytes,
            } => self.handle_datagram(now, &endpoint, src, &bytes),
            Event::TimerFired => {}
            Event::Publish(tlv) => {
                self.publish(tlv, now);
            }
            Event::Unpublish(tlv) => {
                self.unpublish(&tlv, now);
            }
            Event::EnableEndpoint(name) => {
                self.enable_endpoint(&name, now);
            }
            Event::DisableEndpoint(name) => {
                self.disable_endpoint(&name, now);
            }
            Event::Shutdown => {
                self.shutdown(now);
                return false;
            }
        }
        true
    }

    /// Enroll an interface: join the group and start its Trickle timer.
    /// Returns false when the transport refuses the join; the endpoint then
    /// stays disabled.
    pub fn enable_endpoint(&mut self, name: &str, now: u64) -> bool {
        if self.endpoints.get(name).is_some_and(|e| e.enabled) {
            return true;
        }
        if !self.transport.join(name) {
            warn!(endpoint = name, "multicast join refused; endpoint stays disabled");
            return false;
        }
        match self.endpoints.get_mut(name) {
            Some(ep) => {
                ep.enabled = true;
                ep.trickle.reset(now, &self.rng);
                ep.last_send = now;
            }
            None => {
                let id = self.next_endpoint_id;
                self.next_endpoint_id += 1;
                self.endpoints.insert(
                    name.to_string(),
                    Endpoint::new(
                        name.to_string(),
                        id,
                        Trickle::new(self.cfg.trickle, now, &self.rng),
                        now,
                    ),
                );
            }
        }
        info!(endpoint = name, "endpoint enabled");
        self.notify(now, |s, _q| s.link_address_changed(name, true));
        true
    }

    /// Withdraw an interface: leave the group, drop its peers and their
    /// NEIGHBOR attributes.
    pub fn disable_endpoint(&mut self, name: &str, now: u64) {
        let Some(ep) = self.endpoints.get_mut(name) else {
            return;
        };
        if !ep.enabled {
            return;
        }
        ep.enabled = false;
        let local_ep_id = ep.endpoint_id;
        let dropped = ep.clear_peers();
        if !self.transport.leave(name) {
            warn!(endpoint = name, "multicast leave failed");
        }
        for (peer_id, peer_ep_id) in dropped {
            let edge = Neighbor {
                peer_node_id: peer_id,
                peer_endpoint_id: peer_ep_id,
                local_endpoint_id: local_ep_id,
            };
            self.unpublish(&edge.to_tlv(), now);
        }
        self.request_prune(now);
        self.update_peer_gauge();
        info!(endpoint = name, "endpoint disabled");
        self.notify(now, |s, _q| s.link_address_changed(name, false));
    }

    /// Publish an attribute on the local node. Duplicates are idempotent
    /// no-ops. Returns whether anything changed.
    pub fn publish(&mut self, tlv: Tlv, now: u64) -> bool {
        if !self.store.publish(tlv.clone(), now) {
            return false;
        }
        debug!(typ = tlv.typ, len = tlv.payload.len(), "local attribute published");
        self.notify(now, |s, q| s.local_tlv_change(&tlv, true, q));
        self.refresh_network_state(now);
        true
    }

    /// Remove a local attribute; no-op when absent.
    pub fn unpublish(&mut self, tlv: &Tlv, now: u64) -> bool {
        if !self.store.unpublish(tlv, now) {
            return false;
        }
        debug!(typ = tlv.typ, "local attribute withdrawn");
        self.notify(now, |s, q| s.local_tlv_change(tlv, false, q));
        self.refresh_network_state(now);
        true
    }

    /// Leave every group and drop all peer state.
    pub fn shutdown(&mut self, now: u64) {
        let names: Vec<String> = self
            .endpoints
            .values()
            .filter(|e| e.enabled)
            .map(|e| e.name.clone())
            .collect();
        for name in names {
            self.disable_endpoint(&name, now);
        }
        info!("engine stopped");
    }

    /// Ingest one datagram received on `endpoint`.
    pub fn handle_datagram(&mut self, now: u64, endpoint: &str, src: SocketAddrV6, bytes: &[u8]) {
        self.metrics.datagrams_rx_total.inc();
        let tlvs = match tlv::decode_stream(bytes) {
            Ok(v) => v,
            Err(e) => {
                self.metrics.decode_errors_total.inc();
                debug!(endpoint, %src, err = %e, "dropping malformed datagram");
                return;
            }
        };
        let Some(link) = tlvs
            .iter()
            .find(|t| t.typ == tlv_type::LINK_ID)
            .and_then(|t| LinkId::parse(&t.payload).ok())
        else {
            debug!(endpoint, %src, "datagram without sender identity");
            return;
        };
        if !self.endpoints.get(endpoint).is_some_and(|e| e.enabled) {
            return;
        }

        // A datagram carrying our own identity is either multicast loopback
        // or a collider; either way it is not a peer.
        let self_echo = link.node_id == self.store.own_id();
        if !self_echo {
            self.note_sender(now, endpoint, &link, src, &tlvs);
        }

        for t in &tlvs {
            match t.typ {
                tlv_type::NETWORK_HASH if !self_echo => {
                    self.on_network_hash(now, endpoint, src, &link, &t.payload);
                }
                tlv_type::NODE_STATE => {
                    self.on_node_state(now, endpoint, src, &t.payload);
                }
                tlv_type::NODE_DATA => {
                    self.on_node_data(now, &t.payload);
                }
                tlv_type::REQ_NET_HASH => {
                    self.send_full_summary(endpoint, Some(src), now);
                }
                tlv_type::REQ_NODE_DATA => {
                    self.on_req_node_data(now, endpoint, src, &t.payload);
                }
                _ => {}
            }
        }
    }

    /// Advance timers: expire peers, prune when due, fire Trickle, and keep
    /// links alive. Returns the next absolute deadline in milliseconds.
    pub fn run(&mut self, now: u64) -> u64 {
        self.expire_peers(now);
        self.maybe_prune(now);
        self.drive_trickle(now);
        self.next_deadline(now)
    }

    fn expire_peers(&mut self, now: u64) {
        let mut dropped: Vec<(u32, NodeId, u32)> = Vec::new();
        let default_ka = self.cfg.keepalive_interval_ms;
        for ep in self.endpoints.values_mut().filter(|e| e.enabled) {
            for (peer_id, peer_ep_id) in ep.expire_peers(now, default_ka) {
                info!(peer = %peer_id, endpoint = %ep.name, "peer timed out");
                dropped.push((ep.endpoint_id, peer_id, peer_ep_id));
            }
        }
        if dropped.is_empty() {
            return;
        }
        for (local_ep_id, peer_id, peer_ep_id) in dropped {
            let edge = Neighbor {
                peer_node_id: peer_id,
                peer_endpoint_id: peer_ep_id,
                local_endpoint_id: local_ep_id,
            };
            self.unpublish(&edge.to_tlv(), now);
        }
        self.request_prune(now);
        self.update_peer_gauge();
    }

    fn maybe_prune(&mut self, now: u64) {
        let requested = self.prune_at.is_some_and(|at| at <= now);
        let periodic = now.saturating_sub(self.last_prune) >= self.cfg.grace_period_ms;
        if !(requested || periodic) {
            return;
        }
        if now.saturating_sub(self.last_prune) < self.cfg.prune_min_interval_ms {
            return;
        }
        self.last_prune = now;
        self.prune_at = None;
        let out = self.store.prune(now, self.cfg.grace_period_ms);
        for node in &out.deleted {
            let id = *node.id();
            for t in node.tlvs() {
                self.notify(now, |s, q| s.remote_tlv_change(&id, t, false, q));
            }
        }
        if out.changed {
            self.refresh_network_state(now);
        }
    }

    fn drive_trickle(&mut self, now: u64) {
        let names: Vec<String> = self
            .endpoints
            .values()
            .filter(|e| e.enabled)
            .map(|e| e.name.clone())
            .collect();
        let keepalive = u64::from(self.cfg.keepalive_interval_ms);
        for name in names {
            let due = {
                let Some(ep) = self.endpoints.get_mut(&name) else {
                    continue;
                };
                let fire = ep.trickle.poll(now, &self.rng);
                // Keep-alive overrides Trickle suppression on silent links.
                fire || now.saturating_sub(ep.last_send) >= keepalive
            };
            if due {
                self.multicast_summary(&name, now);
            }
        }
    }

    fn next_deadline(&self, now: u64) -> u64 {
        let keepalive = u64::from(self.cfg.keepalive_interval_ms);
        let mut deadline = self.last_prune + self.cfg.grace_period_ms;
        if let Some(at) = self.prune_at {
            deadline = deadline.min(at);
        }
        for ep in self.endpoints.values().filter(|e| e.enabled) {
            deadline = deadline
                .min(ep.trickle.next_deadline())
                .min(ep.last_send + keepalive);
            if let Some(at) = ep.next_peer_deadline(self.cfg.keepalive_interval_ms) {
                // One past the window boundary; expiry is strict.
                deadline = deadline.min(at + 1);
            }
        }
        // Sub-10ms wakeups are noise; round them up.
        deadline.max(now + 10)
    }

    fn note_sender(
        &mut self,
        now: u64,
        endpoint: &str,
        link: &LinkId,
        src: SocketAddrV6,
        tlvs: &[Tlv],
    ) {
        let keepalive = tlvs
            .iter()
            .filter(|t| t.typ == tlv_type::KEEPALIVE_INTERVAL)
            .find_map(|t| crate::core::types::parse_keepalive_interval(&t.payload).ok());
        let (new_peer, local_ep_id) = {
            let Some(ep) = self.endpoints.get_mut(endpoint) else {
                return;
            };
            let sighting = ep.note_peer(link.node_id, link.endpoint_id, src, now);
            if let Some(ms) = keepalive {
                if let Some(p) = ep.peer_mut(&link.node_id, link.endpoint_id) {
                    p.keepalive_ms = Some(ms);
                }
            }
            (sighting == PeerSighting::New, ep.endpoint_id)
        };
        if new_peer {
            info!(peer = %link.node_id, peer_endpoint = link.endpoint_id, endpoint, "peer added");
            let edge = Neighbor {
                peer_node_id: link.node_id,
                peer_endpoint_id: link.endpoint_id,
                local_endpoint_id: local_ep_id,
            };
            self.publish(edge.to_tlv(), now);
            self.request_prune(now);
            self.update_peer_gauge();
        }
    }

    fn on_network_hash(
        &mut self,
        now: u64,
        endpoint: &str,
        src: SocketAddrV6,
        link: &LinkId,
        payload: &[u8],
    ) {
        let Ok(h) = Hash64::parse(payload) else {
            return;
        };
        if h == self.store.network_hash() {
            if let Some(ep) = self.endpoints.get_mut(endpoint) {
                ep.trickle.note_consistent();
            }
            return;
        }
        let request = {
            let Some(ep) = self.endpoints.get_mut(endpoint) else {
                return;
            };
            ep.trickle.note_inconsistent(now, &self.rng);
            // At most one state request per peer per minimum interval.
            let imin = self.cfg.trickle.imin_ms;
            match ep.peer_mut(&link.node_id, link.endpoint_id) {
                Some(p) if p.last_request == 0 || now.saturating_sub(p.last_request) >= imin => {
                    p.last_request = now.max(1);
                    true
                }
                Some(_) => false,
                None => true,
            }
        };
        if request {
            debug!(endpoint, %src, theirs = %h, "network hash divergence; requesting state");
            let msg = [
                self.reply_link(endpoint),
                Tlv::new(tlv_type::REQ_NET_HASH, Vec::new()),
            ];
            self.send_tlvs(endpoint, Some(src), &msg);
        }
    }

    fn on_node_state(&mut self, now: u64, endpoint: &str, src: SocketAddrV6, payload: &[u8]) {
        let Ok(s) = NodeState::parse(payload) else {
            return;
        };
        if s.node_id == self.store.own_id() {
            self.check_own_collision(now, s.update_number, Some(s.data_hash));
            return;
        }
        let outcome = self.store.upsert_remote(&s, now);
        let needs_data = self
            .store
            .find(&s.node_id)
            .map_or(false, |n| n.needs_data());
        if outcome == UpsertOutcome::Inserted || needs_data {
            let msg = [
                self.reply_link(endpoint),
                Tlv::new(tlv_type::REQ_NODE_DATA, s.node_id.as_bytes().to_vec()),
            ];
            self.send_tlvs(endpoint, Some(src), &msg);
        }
    }

    fn on_node_data(&mut self, now: u64, payload: &[u8]) {
        let Ok(header) = NodeDataHeader::parse(payload) else {
            return;
        };
        let inner = match tlv::decode_stream(&payload[NODE_DATA_HEADER_LEN..]) {
            Ok(v) => v,
            Err(e) => {
                self.metrics.decode_errors_total.inc();
                debug!(node = %header.node_id, err = %e, "malformed node body");
                return;
            }
        };
        if header.node_id == self.store.own_id() {
            let mut canonical = inner;
            canonical.sort();
            canonical.dedup();
            let h = hash::node_data_hash(&canonical);
            self.check_own_collision(now, header.update_number, Some(h));
            return;
        }
        let validator = VersionValidator {
            own_version: self.cfg.version,
            require_version: self.cfg.require_version,
        };
        match self
            .store
            .replace_body(header.node_id, header.update_number, inner, &validator, now)
        {
            BodyOutcome::Installed { removed, added } => {
                let id = header.node_id;
                for t in &removed {
                    self.notify(now, |s, q| s.remote_tlv_change(&id, t, false, q));
                }
                for t in &added {
                    self.notify(now, |s, q| s.remote_tlv_change(&id, t, true, q));
                }
                self.signal_inconsistent(now);
                self.request_prune(now);
                self.refresh_network_state(now);
            }
            BodyOutcome::Rejected => {
                self.metrics.bodies_rejected_total.inc();
            }
            BodyOutcome::Stale => {}
        }
    }

    fn on_req_node_data(&mut self, now: u64, endpoint: &str, src: SocketAddrV6, payload: &[u8]) {
        let Ok(id) = NodeId::parse(payload) else {
            return;
        };
        let Some(n) = self.store.find(&id) else {
            return;
        };
        // State we no longer consider valid is only served for ourselves.
        if !n.reachable {
            return;
        }
        let inner = tlv::encode_stream(n.tlvs());
        let msg = [
            self.reply_link(endpoint),
            n.summary(now).to_tlv(),
            NodeDataHeader {
                node_id: id,
                update_number: n.update_number,
            }
            .to_tlv(&inner),
        ];
        self.send_tlvs(endpoint, Some(src), &msg);
    }

    /// Unicast the hash plus every reachable node's summary; replies to
    /// REQ_NET_HASH are never MTU-capped.
    fn send_full_summary(&self, endpoint: &str, dst: Option<SocketAddrV6>, now: u64) {
        let mut msg = vec![self.reply_link(endpoint), self.network_hash_tlv()];
        self.store
            .for_each_reachable(|n| msg.push(n.summary(now).to_tlv()));
        self.send_tlvs(endpoint, dst, &msg);
    }

    /// Multicast a summary, falling back to hash-only when the full form
    /// would exceed the link MTU.
    fn multicast_summary(&mut self, endpoint: &str, now: u64) {
        let mtu = self.transport.mtu(endpoint);
        let mut msg = vec![self.reply_link(endpoint), self.network_hash_tlv()];
        let mut states: Vec<Tlv> = Vec::new();
        self.store
            .for_each_reachable(|n| states.push(n.summary(now).to_tlv()));
        let full_len: usize = msg
            .iter()
            .chain(states.iter())
            .map(Tlv::encoded_len)
            .sum();
        if full_len <= mtu {
            msg.extend(states);
        }
        self.send_tlvs(endpoint, None, &msg);
        if let Some(ep) = self.endpoints.get_mut(endpoint) {
            ep.last_send = now;
        }
        self.metrics.trickle_sends_total.inc();
    }

    fn check_own_collision(&mut self, now: u64, observed_update: u32, observed_hash: Option<Hash64>) {
        let own = self.store.own();
        let colliding = observed_update > own.update_number
            || (observed_update == own.update_number
                && observed_hash.is_some_and(|h| h != own.data_hash));
        if !colliding {
            return;
        }
        self.metrics.collisions_total.inc();
        self.collisions_on_current_id += 1;
        if self.collisions_on_current_id == 1 {
            error!(
                node = %self.store.own_id(),
                observed = observed_update,
                "node identifier collision; overtaking update number"
            );
            self.store.bump_own_update_past(observed_update, now);
        } else {
            let Ok(fresh) = NodeId::random(&self.rng) else {
                error!("rng failure while healing identifier collision");
                return;
            };
            error!(
                old = %self.store.own_id(),
                new = %fresh,
                "repeated collision; changing node identifier"
            );
            self.store.replace_own_id(fresh, now);
            self.collisions_on_current_id = 0;
            self.rebuild_neighbors(now);
        }
        self.notify(now, |s, q| s.republish(q));
        self.refresh_network_state(now);
        // The update number moved even if the hash fold came out equal.
        self.signal_inconsistent(now);
    }

    /// Re-publish NEIGHBOR attributes for every tracked peer; used after the
    /// local identifier changes.
    fn rebuild_neighbors(&mut self, now: u64) {
        let edges: Vec<Neighbor> = self
            .endpoints
            .values()
            .filter(|e| e.enabled)
            .flat_map(|ep| {
                let local = ep.endpoint_id;
                ep.peers().map(move |((peer_id, peer_ep_id), _)| Neighbor {
                    peer_node_id: *peer_id,
                    peer_endpoint_id: *peer_ep_id,
                    local_endpoint_id: local,
                })
            })
            .collect();
        for edge in edges {
            self.publish(edge.to_tlv(), now);
        }
    }

    fn refresh_network_state(&mut self, now: u64) {
        if self.store.recompute_network_hash() {
            debug!(hash = %self.store.network_hash(), "network hash changed");
            self.signal_inconsistent(now);
        }
        self.metrics
            .nodes_reachable
            .set(self.store.reachable_count() as i64);
    }

    fn signal_inconsistent(&mut self, now: u64) {
        for ep in self.endpoints.values_mut().filter(|e| e.enabled) {
            ep.trickle.reset(now, &self.rng);
        }
    }

    fn request_prune(&mut self, now: u64) {
        let earliest = self.last_prune + self.cfg.prune_min_interval_ms;
        let at = now.max(earliest);
        self.prune_at = Some(self.prune_at.map_or(at, |p| p.min(at)));
    }

    fn reply_link(&self, endpoint: &str) -> Tlv {
        let endpoint_id = self.endpoints.get(endpoint).map_or(0, |e| e.endpoint_id);
        LinkId {
            node_id: self.store.own_id(),
            endpoint_id,
        }
        .to_tlv()
    }

    fn network_hash_tlv(&self) -> Tlv {
        Tlv::new(
            tlv_type::NETWORK_HASH,
            self.store.network_hash().as_bytes().to_vec(),
        )
    }

    fn send_tlvs(&self, endpoint: &str, dst: Option<SocketAddrV6>, tlvs: &[Tlv]) {
        let bytes = tlv::encode_stream(tlvs);
        match self.transport.send(endpoint, dst, &bytes) {
            Ok(SendOutcome::Sent) => {
                self.metrics.datagrams_tx_total.inc();
            }
            Ok(SendOutcome::Short(n)) => {
                warn!(endpoint, written = n, total = bytes.len(), "short transport write");
            }
            Err(e) => {
                warn!(endpoint, err = %e, "transport send failed");
            }
        }
    }

    fn update_peer_gauge(&self) {
        let total: usize = self.endpoints.values().map(Endpoint::peer_count).sum();
        self.metrics.peers.set(total as i64);
    }

    /// Run subscriber callbacks, then apply any mutations they queued.
    /// Queuing instead of recursing keeps re-entrant publishes well-ordered.
    fn notify<F>(&mut self, now: u64, mut f: F)
    where
        F: FnMut(&mut dyn Subscriber, &mut PublishQueue),
    {
        if self.subscribers.is_empty() {
            return;
        }
        let mut subs = std::mem::take(&mut self.subscribers);
        let mut queue = PublishQueue::default();
        for s in subs.iter_mut() {
            f(s.as_mut(), &mut queue);
        }
        self.subscribers = subs;
        for op in queue.drain() {
            match op {
                PendingOp::Publish(t) => {
                    self.publish(t, now);
                }
                PendingOp::Unpublish(t) => {
                    self.unpublish(&t, now);
                }
            }
        }
    }
}
