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

use hearthnet::core::hash::{network_hash, node_data_hash};
use hearthnet::core::store::NodeStore;
use hearthnet::core::tlv::Tlv;
use hearthnet::core::types::NodeId;
use proptest::prelude::*;

fn arb_tlvs() -> impl Strategy<Value = Vec<Tlv>> {
    prop::collection::vec(
        (40u16..60, prop::collection::vec(any::<u8>(), 0..32))
            .prop_map(|(typ, payload)| Tlv::new(typ, payload)),
        1..16,
    )
}

proptest! {
    #[test]
    fn data_hash_matches_canonical_serialization(tlvs in arb_tlvs()) {
        let mut store = NodeStore::new(NodeId::from_bytes([1, 2, 3, 4]), 0);
        for t in &tlvs {
            store.publish(t.clone(), 0);
        }
        prop_assert_eq!(
            store.own().data_hash,
            node_data_hash(store.own().tlvs())
        );
    }

    #[test]
    fn data_hash_is_publication_order_independent(tlvs in arb_tlvs(), seed in any::<u64>()) {
        let mut a = NodeStore::new(NodeId::from_bytes([1, 2, 3, 4]), 0);
        let mut b = NodeStore::new(NodeId::from_bytes([5, 6, 7, 8]), 0);
        for t in &tlvs {
            a.publish(t.clone(), 0);
        }
        // Publish the same set in a shuffled order on the second store.
        let mut shuffled = tlvs.clone();
        let mut state = seed | 1;
        for i in (1..shuffled.len()).rev() {
            state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            shuffled.swap(i, (state % (i as u64 + 1)) as usize);
        }
        for t in &shuffled {
            b.publish(t.clone(), 0);
        }
        prop_assert_eq!(a.own().data_hash, b.own().data_hash);
    }

    #[test]
    fn publish_then_unpublish_restores_hash_and_bumps_twice(extra in arb_tlvs()) {
        let mut store = NodeStore::new(NodeId::from_bytes([1, 2, 3, 4]), 0);
        store.publish(Tlv::new(51, b"router1".to_vec()), 0);
        let hash_before = store.own().data_hash;
        let update_before = store.own().update_number;

        let probe = &extra[0];
        if !store.publish(probe.clone(), 1) {
            // Already present (duplicate of the router attribute cannot
            // happen with these types, but the generator may repeat).
            return Ok(());
        }
        store.unpublish(probe, 2);

        prop_assert_eq!(store.own().data_hash, hash_before);
        prop_assert_eq!(store.own().update_number, update_before + 2);
    }

    #[test]
    fn network_hash_folds_reachable_summaries(updates in prop::collection::vec(1u32..100, 1..8)) {
        // Build a star topology: every remote node is a mutual neighbor of
        // the local node, with an arbitrary update number.
        use hearthnet::core::store::VersionValidator;
        use hearthnet::core::types::{Neighbor, NodeState};

        let own = NodeId::from_bytes([0, 0, 0, 1]);
        let mut store = NodeStore::new(own, 0);
        let validator = VersionValidator { own_version: 1, require_version: false };

        for (i, update) in updates.iter().enumerate() {
            let id = NodeId::from_bytes([9, 9, 0, i as u8]);
            store.publish(
                Neighbor {
                    peer_node_id: id,
                    peer_endpoint_id: 1,
                    local_endpoint_id: 1,
                }
                .to_tlv(),
                0,
            );
            let body = vec![Neighbor {
                peer_node_id: own,
                peer_endpoint_id: 1,
                local_endpoint_id: 1,
            }
            .to_tlv()];
            let summary = NodeState {
                node_id: id,
                update_number: *update,
                ms_since_origination: 0,
                data_hash: node_data_hash(&body),
            };
            store.upsert_remote(&summary, 0);
            store.replace_body(id, *update, body, &validator, 0);
        }
        store.prune(0, 60_000);
        store.recompute_network_hash();

        // Independent fold in ascending identifier order.
        let mut summaries: Vec<(NodeId, u32, hearthnet::core::types::Hash64)> = Vec::new();
        store.for_each_reachable(|n| summaries.push((*n.id(), n.update_number, n.data_hash)));
        summaries.sort_by(|a, b| a.0.cmp(&b.0));
        let expected = network_hash(summaries.iter().map(|(id, u, h)| (id, *u, h)));

        prop_assert_eq!(store.network_hash(), expected);
        prop_assert_eq!(store.reachable_count(), updates.len() + 1);
    }

    #[test]
    fn replaying_updates_in_any_order_converges_to_latest(
        count in 2u32..8,
        seed in any::<u64>(),
    ) {
        use hearthnet::core::store::VersionValidator;
        use hearthnet::core::types::NodeState;

        let validator = VersionValidator { own_version: 1, require_version: false };
        let subject = NodeId::from_bytes([9, 9, 9, 9]);
        let body_for = |update: u32| vec![Tlv::new(51, format!("rev{update}").into_bytes())];

        // Shuffle the update sequence; the latest must win regardless.
        let mut order: Vec<u32> = (1..=count).collect();
        let mut state = seed | 1;
        for i in (1..order.len()).rev() {
            state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            order.swap(i, (state % (i as u64 + 1)) as usize);
        }

        let mut store = NodeStore::new(NodeId::from_bytes([0, 0, 0, 1]), 0);
        for update in order {
            let body = body_for(update);
            let summary = NodeState {
                node_id: subject,
                update_number: update,
                ms_since_origination: 0,
                data_hash: node_data_hash(&body),
            };
            store.upsert_remote(&summary, 0);
            store.replace_body(subject, update, body, &validator, 0);
        }

        let n = store.find(&subject).unwrap();
        prop_assert_eq!(n.update_number, count);
        let expected_body = body_for(count);
        prop_assert_eq!(n.tlvs(), expected_body.as_slice());
        prop_assert_eq!(n.data_hash, node_data_hash(&expected_body));
    }
}
