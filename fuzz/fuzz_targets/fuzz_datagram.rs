// Copyright (c) 2026 Hearthnet
// Licensed under the Apache-2.0 License.

#![no_main]
#![forbid(unsafe_code)]

use libfuzzer_sys::fuzz_target;
use std::net::{Ipv6Addr, SocketAddrV6};
use std::sync::Arc;

use hearthnet::core::config::ProtocolConfig;
use hearthnet::core::engine::Engine;
use hearthnet::core::types::NodeId;
use hearthnet::monitoring::metrics::Metrics;
use hearthnet::transport::{SendOutcome, Transport, TransportError};

struct NullLink;

impl Transport for NullLink {
    fn send(
        &self,
        _endpoint: &str,
        _dst: Option<SocketAddrV6>,
        _bytes: &[u8],
    ) -> Result<SendOutcome, TransportError> {
        Ok(SendOutcome::Sent)
    }

    fn join(&self, _endpoint: &str) -> bool {
        true
    }

    fn leave(&self, _endpoint: &str) -> bool {
        true
    }
}

fuzz_target!(|data: &[u8]| {
    // Hostile datagrams must never panic the state machine.
    let Ok(metrics) = Metrics::new() else { return };
    let mut engine = Engine::with_identifier(
        ProtocolConfig::default(),
        NullLink,
        Arc::new(metrics),
        NodeId::from_bytes([1, 2, 3, 4]),
        0,
    );
    engine.enable_endpoint("eth0", 0);
    let src = SocketAddrV6::new(Ipv6Addr::new(0xfe80, 0, 0, 0, 0, 0, 0, 2), 8808, 0, 1);
    engine.handle_datagram(1, "eth0", src, data);
    engine.run(2);
});
