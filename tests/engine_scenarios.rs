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

//! Single-engine scenarios: boot emission, collision healing, MTU fallback,
//! version rejection, and subscriber dispatch.

use std::net::{Ipv6Addr, SocketAddrV6};
use std::sync::{Arc, Mutex};

use hearthnet::core::config::ProtocolConfig;
use hearthnet::core::engine::Engine;
use hearthnet::core::hash::{network_hash, node_data_hash};
use hearthnet::core::subscriber::{PublishQueue, Subscriber};
use hearthnet::core::tlv::{decode_stream, encode_stream, Tlv};
use hearthnet::core::types::{
    tlv_type, Hash64, LinkId, Neighbor, NodeDataHeader, NodeId, NodeState, Version,
};
use hearthnet::monitoring::metrics::Metrics;
use hearthnet::transport::{SendOutcome, Transport, TransportError};

type Sent = (String, Option<SocketAddrV6>, Vec<u8>);

#[derive(Clone)]
struct TestLink {
    sent: Arc<Mutex<Vec<Sent>>>,
    mtu: usize,
}

impl TestLink {
    fn new(mtu: usize) -> Self {
        Self {
            sent: Arc::new(Mutex::new(Vec::new())),
            mtu,
        }
    }

    fn drain(&self) -> Vec<Sent> {
        std::mem::take(&mut self.sent.lock().unwrap())
    }
}

impl Transport for TestLink {
    fn send(
        &self,
        endpoint: &str,
        dst: Option<SocketAddrV6>,
        bytes: &[u8],
    ) -> Result<SendOutcome, TransportError> {
        self.sent
            .lock()
            .unwrap()
            .push((endpoint.to_string(), dst, bytes.to_vec()));
        Ok(SendOutcome::Sent)
    }

    fn join(&self, _endpoint: &str) -> bool {
        true
    }

    fn leave(&self, _endpoint: &str) -> bool {
        true
    }

    fn mtu(&self, _endpoint: &str) -> usize {
        self.mtu
    }
}

fn lladdr(host: u16) -> SocketAddrV6 {
    SocketAddrV6::new(Ipv6Addr::new(0xfe80, 0, 0, 0, 0, 0, 0, host), 8808, 0, 1)
}

fn engine(link: &TestLink, id: [u8; 4]) -> Engine<TestLink> {
    Engine::with_identifier(
        ProtocolConfig::default(),
        link.clone(),
        Arc::new(Metrics::new().unwrap()),
        NodeId::from_bytes(id),
        0,
    )
}

#[test]
fn single_node_boot_emits_one_summary() {
    let link = TestLink::new(1280);
    let mut e = engine(&link, [0x01, 0x02, 0x03, 0x04]);
    assert!(e.enable_endpoint("eth0", 0));
    e.publish(Tlv::new(51, b"router1".to_vec()), 0);

    let own = e.store().own();
    assert_eq!(own.update_number, 1);
    assert_eq!(
        e.network_hash(),
        network_hash([(own.id(), 1, &own.data_hash)])
    );

    let mut sends = Vec::new();
    for step in 0..=20u64 {
        e.run(step * 10);
        sends.extend(link.drain());
    }
    assert_eq!(sends.len(), 1, "one Trickle emission within 200ms");
    let (ep, dst, bytes) = &sends[0];
    assert_eq!(ep, "eth0");
    assert!(dst.is_none(), "summary goes to the multicast group");

    let tlvs = decode_stream(bytes).unwrap();
    assert_eq!(tlvs[0].typ, tlv_type::LINK_ID);
    let nh = tlvs
        .iter()
        .find(|t| t.typ == tlv_type::NETWORK_HASH)
        .expect("network hash present");
    assert_eq!(nh.payload, e.network_hash().as_bytes().to_vec());
    let states: Vec<NodeState> = tlvs
        .iter()
        .filter(|t| t.typ == tlv_type::NODE_STATE)
        .map(|t| NodeState::parse(&t.payload).unwrap())
        .collect();
    assert_eq!(states.len(), 1);
    assert_eq!(states[0].node_id, NodeId::from_bytes([1, 2, 3, 4]));
    assert_eq!(states[0].update_number, 1);
}

#[test]
fn identifier_collision_heals_then_renames() {
    let link = TestLink::new(1280);
    let mut e = engine(&link, [0x01, 0x02, 0x03, 0x04]);
    assert!(e.enable_endpoint("eth0", 0));
    e.publish(Tlv::new(51, b"router1".to_vec()), 0);
    let original = e.node_id();

    // An impostor advertises our identifier with a higher update number.
    let collide = |update| {
        encode_stream(&[
            LinkId {
                node_id: original,
                endpoint_id: 9,
            }
            .to_tlv(),
            NodeState {
                node_id: original,
                update_number: update,
                ms_since_origination: 0,
                data_hash: Hash64::from_bytes([7; 8]),
            }
            .to_tlv(),
        ])
    };

    e.handle_datagram(100, "eth0", lladdr(2), &collide(5));
    assert_eq!(e.node_id(), original, "first collision keeps the identifier");
    assert_eq!(e.store().own().update_number, 6, "update number overtakes");

    e.handle_datagram(300, "eth0", lladdr(2), &collide(9));
    assert_ne!(e.node_id(), original, "second collision picks a fresh identifier");
    assert!(e.store().find(&original).is_none());
    // Published attributes survive the rename.
    assert!(e
        .store()
        .own()
        .tlvs()
        .iter()
        .any(|t| t.payload == b"router1"));
}

#[test]
fn oversized_summary_falls_back_to_hash_only() {
    // 40 bytes fits LINK_ID + NETWORK_HASH (24) but not one NODE_STATE more.
    let link = TestLink::new(40);
    let mut e = engine(&link, [0x01, 0x02, 0x03, 0x04]);
    assert!(e.enable_endpoint("eth0", 0));
    e.publish(Tlv::new(51, b"router1".to_vec()), 0);

    let mut sends = Vec::new();
    for step in 0..=20u64 {
        e.run(step * 10);
        sends.extend(link.drain());
    }
    assert_eq!(sends.len(), 1);
    let tlvs = decode_stream(&sends[0].2).unwrap();
    let types: Vec<u16> = tlvs.iter().map(|t| t.typ).collect();
    assert_eq!(types, vec![tlv_type::LINK_ID, tlv_type::NETWORK_HASH]);

    // A state request is still answered with the full unicast summary.
    let peer = NodeId::from_bytes([9, 9, 9, 9]);
    let req = encode_stream(&[
        LinkId {
            node_id: peer,
            endpoint_id: 4,
        }
        .to_tlv(),
        Tlv::new(tlv_type::REQ_NET_HASH, Vec::new()),
    ]);
    link.drain();
    e.handle_datagram(300, "eth0", lladdr(7), &req);
    let reply = link
        .drain()
        .into_iter()
        .find(|(_, dst, _)| *dst == Some(lladdr(7)))
        .expect("unicast reply");
    let tlvs = decode_stream(&reply.2).unwrap();
    assert!(tlvs.iter().any(|t| t.typ == tlv_type::NETWORK_HASH));
    assert!(tlvs.iter().any(|t| t.typ == tlv_type::NODE_STATE));
}

#[test]
fn version_mismatch_keeps_header_only() {
    let link = TestLink::new(1280);
    let mut e = engine(&link, [0x01, 0x02, 0x03, 0x04]);
    assert!(e.enable_endpoint("eth0", 0));
    let own = e.node_id();

    let stranger = NodeId::from_bytes([9, 9, 0, 1]);
    let body = vec![
        Neighbor {
            peer_node_id: own,
            peer_endpoint_id: 1,
            local_endpoint_id: 1,
        }
        .to_tlv(),
        Version {
            version: 9,
            user_agent: "otherd/2.0".into(),
        }
        .to_tlv(),
    ];

    let summary = encode_stream(&[
        LinkId {
            node_id: stranger,
            endpoint_id: 1,
        }
        .to_tlv(),
        NodeState {
            node_id: stranger,
            update_number: 1,
            ms_since_origination: 0,
            data_hash: node_data_hash(&body),
        }
        .to_tlv(),
    ]);
    e.handle_datagram(50, "eth0", lladdr(3), &summary);

    let data = encode_stream(&[
        LinkId {
            node_id: stranger,
            endpoint_id: 1,
        }
        .to_tlv(),
        NodeDataHeader {
            node_id: stranger,
            update_number: 1,
        }
        .to_tlv(&encode_stream(&body)),
    ]);
    e.handle_datagram(80, "eth0", lladdr(3), &data);

    let n = e.store().find(&stranger).expect("header persists");
    assert_eq!(n.update_number, 1);
    assert!(n.tlvs().is_empty(), "rejected body is not installed");
    assert_eq!(n.version, 9);

    // Even though we published a NEIGHBOR toward the stranger when it was
    // heard, its rejected body contributes no mutual edge.
    for step in 1..=10u64 {
        e.run(100 + step * 10);
    }
    assert!(!e.store().find(&stranger).unwrap().reachable);
    assert_eq!(e.store().reachable_count(), 1);
}

#[derive(Default)]
struct Recorder {
    local: Arc<Mutex<Vec<(u16, bool)>>>,
    remote: Arc<Mutex<Vec<(NodeId, u16, bool)>>>,
}

impl Subscriber for Recorder {
    fn local_tlv_change(&mut self, tlv: &Tlv, added: bool, queue: &mut PublishQueue) {
        self.local.lock().unwrap().push((tlv.typ, added));
        // Derive a shadow attribute from the router name, the way the
        // service-discovery layer derives zone records.
        if tlv.typ == 51 && added {
            queue.publish(Tlv::new(52, tlv.payload.clone()));
        }
    }

    fn remote_tlv_change(&mut self, node: &NodeId, tlv: &Tlv, added: bool, _q: &mut PublishQueue) {
        self.remote.lock().unwrap().push((*node, tlv.typ, added));
    }
}

#[test]
fn subscribers_observe_changes_and_may_publish() {
    let link = TestLink::new(1280);
    let mut e = engine(&link, [0x01, 0x02, 0x03, 0x04]);
    let rec = Recorder::default();
    let local = rec.local.clone();
    let remote = rec.remote.clone();
    e.subscribe(Box::new(rec));
    assert!(e.enable_endpoint("eth0", 0));

    e.publish(Tlv::new(51, b"router1".to_vec()), 0);
    // The queued derived attribute landed after the dispatch.
    assert!(e.store().own().tlvs().iter().any(|t| t.typ == 52));
    let seen = local.lock().unwrap().clone();
    assert_eq!(seen, vec![(51, true), (52, true)]);

    // A remote body install fans out per-attribute notifications.
    let stranger = NodeId::from_bytes([9, 9, 0, 2]);
    let body = vec![Tlv::new(51, b"guest".to_vec())];
    let data = encode_stream(&[
        LinkId {
            node_id: stranger,
            endpoint_id: 1,
        }
        .to_tlv(),
        NodeDataHeader {
            node_id: stranger,
            update_number: 1,
        }
        .to_tlv(&encode_stream(&body)),
    ]);
    e.handle_datagram(100, "eth0", lladdr(5), &data);
    let seen = remote.lock().unwrap().clone();
    assert_eq!(seen, vec![(stranger, 51, true)]);
}
