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

//! Node store: every known node keyed by identifier, the local node's
//! published attributes, and the derived network hash.
//!
//! Attribute lists are kept in canonical order (ascending type, then payload
//! bytes) so the per-node digest is deterministic across peers. Remote
//! headers and bodies arrive separately: a summary may advertise an update we
//! do not yet have the body for, in which case the node is flagged as
//! needing data until the matching body is installed.

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use tracing::{debug, info, warn};

use crate::core::hash;
use crate::core::tlv::Tlv;
use crate::core::types::{tlv_type, Hash64, Neighbor, NodeId, NodeState, Version};

/// Outcome of applying a received node summary.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// First time this node was heard of.
    Inserted,
    /// The summary advertised newer or different data.
    Updated,
    /// The summary matched what we already hold.
    Unchanged,
    /// The summary was older than installed data.
    Stale,
}

/// Profile validator verdict over a candidate node body.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BodyVerdict {
    /// Install the whole body.
    Accepted,
    /// Install only the first `n` attributes.
    AcceptedTruncated(usize),
    /// Do not install; the header sticks around so the node ages out of the
    /// reachable set.
    Rejected,
}

/// Outcome of a body replacement attempt.
#[derive(Debug, PartialEq, Eq)]
pub enum BodyOutcome {
    /// Body installed; attribute-level diff against the previous body.
    Installed {
        /// Attributes no longer present.
        removed: Vec<Tlv>,
        /// Attributes newly present.
        added: Vec<Tlv>,
    },
    /// Validator refused the body.
    Rejected,
    /// The body was not newer than installed data.
    Stale,
}

/// Hook inspecting candidate bodies before they are committed.
pub trait BodyValidator {
    /// Judge a canonicalized candidate attribute list for `node`.
    fn validate(&self, node: &NodeId, tlvs: &[Tlv]) -> BodyVerdict;
}

/// Default validator: rejects bodies whose VERSION attribute disagrees with
/// our own schema version. Bodies without a VERSION attribute pass unless
/// `require_version` is set.
#[derive(Clone, Debug)]
pub struct VersionValidator {
    /// Our schema version.
    pub own_version: u8,
    /// Reject unversioned bodies outright.
    pub require_version: bool,
}

impl BodyValidator for VersionValidator {
    fn validate(&self, node: &NodeId, tlvs: &[Tlv]) -> BodyVerdict {
        match extract_version(tlvs) {
            Some(v) if v.version == self.own_version => BodyVerdict::Accepted,
            Some(v) => {
                warn!(%node, version = v.version, agent = %v.user_agent,
                      own = self.own_version, "incompatible node");
                BodyVerdict::Rejected
            }
            None if self.require_version => {
                warn!(%node, "unversioned node body rejected");
                BodyVerdict::Rejected
            }
            None => BodyVerdict::Accepted,
        }
    }
}

/// Extract the VERSION attribute from a body, if present and well-formed.
pub fn extract_version(tlvs: &[Tlv]) -> Option<Version> {
    tlvs.iter()
        .find(|t| t.typ == tlv_type::VERSION)
        .and_then(|t| Version::parse(&t.payload).ok())
}

/// One known node: header, canonical attribute list, and derived state.
#[derive(Clone, Debug)]
pub struct Node {
    id: NodeId,
    /// Update sequence number of the installed body.
    pub update_number: u32,
    /// Local monotonic instant the installed data was originated.
    pub origination_time: u64,
    tlvs: Vec<Tlv>,
    /// Digest of the installed canonical body.
    pub data_hash: Hash64,
    advertised_update: u32,
    advertised_hash: Hash64,
    needs_data: bool,
    /// In the mutual-neighbor closure of the local node.
    pub reachable: bool,
    /// When the node fell out of the reachable set, if it has.
    pub unreachable_since: Option<u64>,
    /// Schema version last seen in this node's body (0 = unknown).
    pub version: u8,
}

impl Node {
    fn new_local(id: NodeId, now: u64) -> Self {
        let data_hash = hash::node_data_hash(&[]);
        Self {
            id,
            update_number: 0,
            origination_time: now,
            tlvs: Vec::new(),
            data_hash,
            advertised_update: 0,
            advertised_hash: data_hash,
            needs_data: false,
            reachable: true,
            unreachable_since: None,
            version: 0,
        }
    }

    fn new_remote_header(s: &NodeState, now: u64) -> Self {
        Self {
            id: s.node_id,
            update_number: s.update_number,
            origination_time: now.saturating_sub(u64::from(s.ms_since_origination)),
            tlvs: Vec::new(),
            data_hash: hash::node_data_hash(&[]),
            advertised_update: s.update_number,
            advertised_hash: s.data_hash,
            needs_data: true,
            reachable: false,
            unreachable_since: None,
            version: 0,
        }
    }

    /// Node identifier.
    pub fn id(&self) -> &NodeId {
        &self.id
    }

    /// Installed attributes in canonical order.
    pub fn tlvs(&self) -> &[Tlv] {
        &self.tlvs
    }

    /// True when a summary advertised data we have not installed yet.
    pub fn needs_data(&self) -> bool {
        self.needs_data
    }

    /// Summary of the installed state as of `now`.
    pub fn summary(&self, now: u64) -> NodeState {
        NodeState {
            node_id: self.id,
            update_number: self.update_number,
            ms_since_origination: now
                .saturating_sub(self.origination_time)
                .min(u64::from(u32::MAX)) as u32,
            data_hash: self.data_hash,
        }
    }

    /// Adjacencies published in this node's data (malformed records skipped).
    pub fn neighbors(&self) -> impl Iterator<Item = Neighbor> + '_ {
        self.tlvs
            .iter()
            .filter(|t| t.typ == tlv_type::NEIGHBOR)
            .filter_map(|t| Neighbor::parse(&t.payload).ok())
    }

    fn install_body(&mut self, update_number: u32, tlvs: Vec<Tlv>) {
        self.update_number = update_number;
        self.data_hash = hash::node_data_hash(&tlvs);
        self.tlvs = tlvs;
        self.needs_data = false;
        if update_number >= self.advertised_update {
            self.advertised_update = update_number;
            self.advertised_hash = self.data_hash;
        }
    }
}

/// Result of a prune pass.
#[derive(Debug, Default)]
pub struct PruneOutcome {
    /// The reachable set changed (flips or deletions).
    pub changed: bool,
    /// Nodes whose grace period expired, removed from the store.
    pub deleted: Vec<Node>,
}

/// The single mutable graph: all known nodes plus the derived network hash.
pub struct NodeStore {
    own_id: NodeId,
    nodes: BTreeMap<NodeId, Node>,
    network_hash: Hash64,
}

impl NodeStore {
    /// Create a store holding only the local node.
    pub fn new(own_id: NodeId, now: u64) -> Self {
        let mut nodes = BTreeMap::new();
        nodes.insert(own_id, Node::new_local(own_id, now));
        let mut s = Self {
            own_id,
            nodes,
            network_hash: Hash64::from_bytes([0; 8]),
        };
        s.recompute_network_hash();
        s
    }

    /// The local node identifier.
    pub fn own_id(&self) -> NodeId {
        self.own_id
    }

    /// The local node.
    pub fn own(&self) -> &Node {
        &self.nodes[&self.own_id]
    }

    fn own_mut(&mut self) -> &mut Node {
        let id = self.own_id;
        self.nodes.get_mut(&id).expect("own node present")
    }

    /// Look up a node.
    pub fn find(&self, id: &NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    /// All known nodes in ascending identifier order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    /// Number of known nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Always false; the local node is always present.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Visit every reachable node in ascending identifier order.
    pub fn for_each_reachable<F: FnMut(&Node)>(&self, mut f: F) {
        for n in self.nodes.values().filter(|n| n.reachable) {
            f(n);
        }
    }

    /// Count of reachable nodes.
    pub fn reachable_count(&self) -> usize {
        self.nodes.values().filter(|n| n.reachable).count()
    }

    /// Current network hash.
    pub fn network_hash(&self) -> Hash64 {
        self.network_hash
    }

    /// Refold the network hash over the reachable set. Returns true when the
    /// value changed.
    pub fn recompute_network_hash(&mut self) -> bool {
        let new = hash::network_hash(
            self.nodes
                .values()
                .filter(|n| n.reachable)
                .map(|n| (&n.id, n.update_number, &n.data_hash)),
        );
        if new != self.network_hash {
            self.network_hash = new;
            true
        } else {
            false
        }
    }

    /// Publish an attribute on the local node. Duplicate publishes are
    /// idempotent no-ops that do not bump the update number.
    pub fn publish(&mut self, tlv: Tlv, now: u64) -> bool {
        let own = self.own_mut();
        match own.tlvs.binary_search(&tlv) {
            Ok(_) => false,
            Err(at) => {
                own.tlvs.insert(at, tlv);
                Self::bump_local(own, now);
                true
            }
        }
    }

    /// Remove an attribute from the local node; no-op when absent.
    pub fn unpublish(&mut self, tlv: &Tlv, now: u64) -> bool {
        let own = self.own_mut();
        match own.tlvs.binary_search(tlv) {
            Ok(at) => {
                own.tlvs.remove(at);
                Self::bump_local(own, now);
                true
            }
            Err(_) => false,
        }
    }

    fn bump_local(own: &mut Node, now: u64) {
        own.update_number = own.update_number.wrapping_add(1);
        own.origination_time = now;
        own.data_hash = hash::node_data_hash(&own.tlvs);
        own.advertised_update = own.update_number;
        own.advertised_hash = own.data_hash;
    }

    /// Raise the local update number past an observed colliding value and
    /// re-originate.
    pub fn bump_own_update_past(&mut self, observed: u32, now: u64) {
        let own = self.own_mut();
        own.update_number = observed.max(own.update_number).wrapping_add(1);
        own.origination_time = now;
        own.advertised_update = own.update_number;
        own.advertised_hash = own.data_hash;
    }

    /// Replace the local identifier after repeated collisions. Published
    /// attributes carry over except NEIGHBOR records, which the caller
    /// rebuilds from its peer tables.
    pub fn replace_own_id(&mut self, new_id: NodeId, now: u64) {
        let old_id = self.own_id;
        let old = self.nodes.remove(&old_id).expect("own node present");
        let mut tlvs: Vec<Tlv> = old
            .tlvs
            .into_iter()
            .filter(|t| t.typ != tlv_type::NEIGHBOR)
            .collect();
        tlvs.sort();
        let mut fresh = Node::new_local(new_id, now);
        fresh.update_number = old.update_number.wrapping_add(1);
        fresh.data_hash = hash::node_data_hash(&tlvs);
        fresh.tlvs = tlvs;
        fresh.advertised_update = fresh.update_number;
        fresh.advertised_hash = fresh.data_hash;
        self.nodes.insert(new_id, fresh);
        self.own_id = new_id;
    }

    /// Apply a received node summary. The caller resolves collisions with the
    /// local identifier before calling this.
    pub fn upsert_remote(&mut self, s: &NodeState, now: u64) -> UpsertOutcome {
        debug_assert!(s.node_id != self.own_id);
        let n = match self.nodes.entry(s.node_id) {
            std::collections::btree_map::Entry::Vacant(e) => {
                e.insert(Node::new_remote_header(s, now));
                debug!(node = %s.node_id, update = s.update_number, "node learned");
                return UpsertOutcome::Inserted;
            }
            std::collections::btree_map::Entry::Occupied(e) => e.into_mut(),
        };
        if s.update_number < n.update_number {
            return UpsertOutcome::Stale;
        }
        if s.update_number > n.advertised_update {
            n.advertised_update = s.update_number;
            n.advertised_hash = s.data_hash;
            n.origination_time = now.saturating_sub(u64::from(s.ms_since_origination));
            n.needs_data = true;
            return UpsertOutcome::Updated;
        }
        if s.update_number == n.advertised_update {
            if s.data_hash != n.advertised_hash {
                n.advertised_hash = s.data_hash;
                n.needs_data = true;
                return UpsertOutcome::Updated;
            }
            if s.update_number == n.update_number && s.data_hash == n.data_hash {
                return UpsertOutcome::Unchanged;
            }
            // Header matches what was advertised but the body is still pending.
            return if n.needs_data {
                UpsertOutcome::Unchanged
            } else {
                UpsertOutcome::Updated
            };
        }
        UpsertOutcome::Stale
    }

    /// Install a node body. Accepted when strictly newer than the installed
    /// body, or when it matches a pending advertised header. The candidate
    /// list is canonicalized (sorted, exact duplicates dropped) before
    /// validation and hashing.
    pub fn replace_body(
        &mut self,
        id: NodeId,
        update_number: u32,
        mut tlvs: Vec<Tlv>,
        validator: &dyn BodyValidator,
        now: u64,
    ) -> BodyOutcome {
        debug_assert!(id != self.own_id);
        tlvs.sort();
        tlvs.dedup();

        if let Some(n) = self.nodes.get(&id) {
            if update_number < n.update_number
                || (update_number == n.update_number && !n.needs_data)
            {
                return BodyOutcome::Stale;
            }
        }

        let version = extract_version(&tlvs).map(|v| v.version).unwrap_or(0);
        let verdict = validator.validate(&id, &tlvs);

        let n = self.nodes.entry(id).or_insert_with(|| {
            let mut fresh = Node::new_local(id, now);
            fresh.reachable = false;
            fresh.unreachable_since = None;
            fresh
        });
        if n.version != version {
            if version != 0 {
                if let Some(v) = extract_version(&tlvs) {
                    info!(node = %id, agent = %v.user_agent, "node agent identified");
                }
            }
            n.version = version;
        }

        match verdict {
            BodyVerdict::Rejected => {
                // Keep the header so the node ages out of the reachable set,
                // but never serve or hash a body we refused.
                n.update_number = update_number;
                n.tlvs = Vec::new();
                n.data_hash = hash::node_data_hash(&[]);
                n.needs_data = false;
                BodyOutcome::Rejected
            }
            BodyVerdict::AcceptedTruncated(keep) => {
                tlvs.truncate(keep);
                let removed_added = diff_sorted(&n.tlvs, &tlvs);
                n.install_body(update_number, tlvs);
                BodyOutcome::Installed {
                    removed: removed_added.0,
                    added: removed_added.1,
                }
            }
            BodyVerdict::Accepted => {
                let removed_added = diff_sorted(&n.tlvs, &tlvs);
                n.install_body(update_number, tlvs);
                BodyOutcome::Installed {
                    removed: removed_added.0,
                    added: removed_added.1,
                }
            }
        }
    }

    /// Recompute reachability as the mutual-neighbor closure of the local
    /// node, and delete nodes unreachable for longer than `grace_ms`.
    pub fn prune(&mut self, now: u64, grace_ms: u64) -> PruneOutcome {
        let mut visited: BTreeSet<NodeId> = BTreeSet::new();
        let mut queue: VecDeque<NodeId> = VecDeque::new();
        visited.insert(self.own_id);
        queue.push_back(self.own_id);

        while let Some(id) = queue.pop_front() {
            let Some(node) = self.nodes.get(&id) else {
                continue;
            };
            let edges: Vec<Neighbor> = node.neighbors().collect();
            for edge in edges {
                if visited.contains(&edge.peer_node_id) {
                    continue;
                }
                let Some(peer) = self.nodes.get(&edge.peer_node_id) else {
                    continue;
                };
                let mutual = peer.neighbors().any(|back| {
                    back.peer_node_id == id
                        && back.peer_endpoint_id == edge.local_endpoint_id
                        && back.local_endpoint_id == edge.peer_endpoint_id
                });
                if mutual {
                    visited.insert(edge.peer_node_id);
                    queue.push_back(edge.peer_node_id);
                }
            }
        }

        let mut out = PruneOutcome::default();
        let mut expired: Vec<NodeId> = Vec::new();
        for (id, n) in self.nodes.iter_mut() {
            if visited.contains(id) {
                if !n.reachable {
                    n.reachable = true;
                    n.unreachable_since = None;
                    out.changed = true;
                }
            } else {
                if n.reachable {
                    n.reachable = false;
                    out.changed = true;
                    debug!(node = %id, "node unreachable");
                }
                match n.unreachable_since {
                    None => n.unreachable_since = Some(now),
                    Some(since) if now.saturating_sub(since) >= grace_ms => expired.push(*id),
                    Some(_) => {}
                }
            }
        }
        for id in expired {
            if let Some(n) = self.nodes.remove(&id) {
                info!(node = %id, "node expired");
                out.deleted.push(n);
                out.changed = true;
            }
        }
        out
    }
}

/// Diff two canonically ordered attribute lists into (removed, added).
fn diff_sorted(old: &[Tlv], new: &[Tlv]) -> (Vec<Tlv>, Vec<Tlv>) {
    let mut removed = Vec::new();
    let mut added = Vec::new();
    let (mut i, mut j) = (0usize, 0usize);
    while i < old.len() || j < new.len() {
        if i >= old.len() {
            added.push(new[j].clone());
            j += 1;
        } else if j >= new.len() {
            removed.push(old[i].clone());
            i += 1;
        } else {
            match old[i].cmp(&new[j]) {
                std::cmp::Ordering::Less => {
                    removed.push(old[i].clone());
                    i += 1;
                }
                std::cmp::Ordering::Greater => {
                    added.push(new[j].clone());
                    j += 1;
                }
                std::cmp::Ordering::Equal => {
                    i += 1;
                    j += 1;
                }
            }
        }
    }
    (removed, added)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn accept_all() -> VersionValidator {
        VersionValidator {
            own_version: 1,
            require_version: false,
        }
    }

    fn nid(b: u8) -> NodeId {
        NodeId::from_bytes([0, 0, 0, b])
    }

    #[test]
    fn duplicate_publish_is_idempotent() {
        let mut store = NodeStore::new(nid(1), 0);
        let t = Tlv::new(51, b"router1".to_vec());
        assert!(store.publish(t.clone(), 0));
        assert_eq!(store.own().update_number, 1);
        assert!(!store.publish(t, 0));
        assert_eq!(store.own().update_number, 1);
    }

    #[test]
    fn publish_then_unpublish_restores_hash() {
        let mut store = NodeStore::new(nid(1), 0);
        store.publish(Tlv::new(51, b"router1".to_vec()), 0);
        let before = store.own().data_hash;
        let extra = Tlv::new(52, b"lan".to_vec());
        store.publish(extra.clone(), 1);
        assert_ne!(store.own().data_hash, before);
        store.unpublish(&extra, 2);
        assert_eq!(store.own().data_hash, before);
        assert_eq!(store.own().update_number, 3);
    }

    #[test]
    fn stale_summary_ignored() {
        let mut store = NodeStore::new(nid(1), 0);
        let body = vec![Tlv::new(51, b"x".to_vec())];
        let h = hash::node_data_hash(&body);
        let s = NodeState {
            node_id: nid(2),
            update_number: 5,
            ms_since_origination: 0,
            data_hash: h,
        };
        assert_eq!(store.upsert_remote(&s, 0), UpsertOutcome::Inserted);
        assert_eq!(
            store.replace_body(nid(2), 5, body, &accept_all(), 0),
            BodyOutcome::Installed {
                removed: vec![],
                added: vec![Tlv::new(51, b"x".to_vec())]
            }
        );
        let old = NodeState {
            update_number: 4,
            ..s
        };
        assert_eq!(store.upsert_remote(&old, 1), UpsertOutcome::Stale);
        assert_eq!(store.upsert_remote(&s, 1), UpsertOutcome::Unchanged);
    }

    #[test]
    fn equal_update_body_accepted_only_while_pending() {
        let mut store = NodeStore::new(nid(1), 0);
        let body = vec![Tlv::new(51, b"x".to_vec())];
        let s = NodeState {
            node_id: nid(2),
            update_number: 3,
            ms_since_origination: 0,
            data_hash: hash::node_data_hash(&body),
        };
        store.upsert_remote(&s, 0);
        assert!(store.find(&nid(2)).unwrap().needs_data());
        assert!(matches!(
            store.replace_body(nid(2), 3, body.clone(), &accept_all(), 0),
            BodyOutcome::Installed { .. }
        ));
        assert!(!store.find(&nid(2)).unwrap().needs_data());
        // Replaying the same body is now stale.
        assert_eq!(
            store.replace_body(nid(2), 3, body, &accept_all(), 0),
            BodyOutcome::Stale
        );
    }

    #[test]
    fn version_mismatch_keeps_header_drops_body() {
        let mut store = NodeStore::new(nid(1), 0);
        let body = vec![
            Tlv::new(51, b"x".to_vec()),
            Version {
                version: 9,
                user_agent: "other/1".into(),
            }
            .to_tlv(),
        ];
        let validator = VersionValidator {
            own_version: 1,
            require_version: false,
        };
        let out = store.replace_body(nid(2), 2, body, &validator, 0);
        assert_eq!(out, BodyOutcome::Rejected);
        let n = store.find(&nid(2)).unwrap();
        assert_eq!(n.update_number, 2);
        assert!(n.tlvs().is_empty());
        assert_eq!(n.version, 9);
    }

    fn mutual_pair(store: &mut NodeStore, now: u64) {
        // Local node publishes an edge to node 2; node 2 publishes the
        // symmetric edge back.
        store.publish(
            Neighbor {
                peer_node_id: nid(2),
                peer_endpoint_id: 7,
                local_endpoint_id: 1,
            }
            .to_tlv(),
            now,
        );
        let body = vec![Neighbor {
            peer_node_id: store.own_id(),
            peer_endpoint_id: 1,
            local_endpoint_id: 7,
        }
        .to_tlv()];
        let s = NodeState {
            node_id: nid(2),
            update_number: 1,
            ms_since_origination: 0,
            data_hash: hash::node_data_hash(&body),
        };
        store.upsert_remote(&s, now);
        store.replace_body(nid(2), 1, body, &accept_all(), now);
    }

    #[test]
    fn prune_marks_mutual_neighbors_reachable() {
        let mut store = NodeStore::new(nid(1), 0);
        mutual_pair(&mut store, 0);
        let out = store.prune(0, 60_000);
        assert!(out.changed);
        assert!(store.find(&nid(2)).unwrap().reachable);
        assert_eq!(store.reachable_count(), 2);
    }

    #[test]
    fn one_way_edge_is_not_reachable() {
        let mut store = NodeStore::new(nid(1), 0);
        store.publish(
            Neighbor {
                peer_node_id: nid(2),
                peer_endpoint_id: 7,
                local_endpoint_id: 1,
            }
            .to_tlv(),
            0,
        );
        // Node 2 exists but claims a different endpoint pairing.
        let body = vec![Neighbor {
            peer_node_id: nid(1),
            peer_endpoint_id: 9,
            local_endpoint_id: 7,
        }
        .to_tlv()];
        let s = NodeState {
            node_id: nid(2),
            update_number: 1,
            ms_since_origination: 0,
            data_hash: hash::node_data_hash(&body),
        };
        store.upsert_remote(&s, 0);
        store.replace_body(nid(2), 1, body, &accept_all(), 0);
        store.prune(0, 60_000);
        assert!(!store.find(&nid(2)).unwrap().reachable);
    }

    #[test]
    fn unreachable_node_deleted_after_grace() {
        let mut store = NodeStore::new(nid(1), 0);
        mutual_pair(&mut store, 0);
        store.prune(0, 60_000);
        // Drop our edge; node 2 becomes unreachable, then expires.
        let edge = Neighbor {
            peer_node_id: nid(2),
            peer_endpoint_id: 7,
            local_endpoint_id: 1,
        }
        .to_tlv();
        store.unpublish(&edge, 1000);
        let out = store.prune(1000, 60_000);
        assert!(out.changed);
        assert!(!store.find(&nid(2)).unwrap().reachable);
        let out = store.prune(61_000, 60_000);
        assert_eq!(out.deleted.len(), 1);
        assert!(store.find(&nid(2)).is_none());
    }

    #[test]
    fn network_hash_tracks_reachable_set() {
        let mut store = NodeStore::new(nid(1), 0);
        store.recompute_network_hash();
        let own_only = store.network_hash();
        mutual_pair(&mut store, 0);
        store.prune(0, 60_000);
        assert!(store.recompute_network_hash());
        assert_ne!(store.network_hash(), own_only);
    }

    #[test]
    fn replace_own_id_drops_neighbor_attributes() {
        let mut store = NodeStore::new(nid(1), 0);
        store.publish(Tlv::new(51, b"router1".to_vec()), 0);
        mutual_pair(&mut store, 0);
        let old_update = store.own().update_number;
        store.replace_own_id(nid(9), 10);
        assert_eq!(store.own_id(), nid(9));
        assert_eq!(store.own().update_number, old_update.wrapping_add(1));
        assert!(store.own().neighbors().next().is_none());
        assert!(store
            .own()
            .tlvs()
            .iter()
            .any(|t| t.payload == b"router1".to_vec()));
    }
}
