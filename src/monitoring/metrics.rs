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

use prometheus::{IntCounter, IntGauge, Registry};
use thiserror::Error;

/// Metrics errors.
#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("prometheus")]
    Prom,
}

/// Metrics container.
#[derive(Clone)]
pub struct Metrics {
    /// Registry.
    pub registry: Registry,

    /// Reachable nodes gauge.
    pub nodes_reachable: IntGauge,
    /// Tracked peers gauge (across all endpoints).
    pub peers: IntGauge,

    /// Received datagrams.
    pub datagrams_rx_total: IntCounter,
    /// Sent datagrams.
    pub datagrams_tx_total: IntCounter,
    /// Datagrams dropped on decode errors.
    pub decode_errors_total: IntCounter,
    /// Trickle-scheduled multicast transmissions.
    pub trickle_sends_total: IntCounter,
    /// Node identifier collisions observed.
    pub collisions_total: IntCounter,
    /// Node bodies refused by the profile validator.
    pub bodies_rejected_total: IntCounter,
}

impl Metrics {
    /// Create and register metrics.
    pub fn new() -> Result<Self, MetricsError> {
        let registry = Registry::new();

        let nodes_reachable = IntGauge::new("hearthnet_nodes_reachable", "Reachable nodes")
            .map_err(|_| MetricsError::Prom)?;
        let peers = IntGauge::new("hearthnet_peers", "Tracked peers across endpoints")
            .map_err(|_| MetricsError::Prom)?;

        let datagrams_rx_total =
            IntCounter::new("hearthnet_datagrams_rx_total", "Received datagrams")
                .map_err(|_| MetricsError::Prom)?;
        let datagrams_tx_total = IntCounter::new("hearthnet_datagrams_tx_total", "Sent datagrams")
            .map_err(|_| MetricsError::Prom)?;
        let decode_errors_total = IntCounter::new(
            "hearthnet_decode_errors_total",
            "Datagrams dropped on decode errors",
        )
        .map_err(|_| MetricsError::Prom)?;
        let trickle_sends_total = IntCounter::new(
            "hearthnet_trickle_sends_total",
            "Trickle-scheduled multicast transmissions",
        )
        .map_err(|_| MetricsError::Prom)?;
        let collisions_total = IntCounter::new(
            "hearthnet_collisions_total",
            "Node identifier collisions observed",
        )
        .map_err(|_| MetricsError::Prom)?;
        let bodies_rejected_total = IntCounter::new(
            "hearthnet_bodies_rejected_total",
            "Node bodies refused by the profile validator",
        )
        .map_err(|_| MetricsError::Prom)?;

        registry
            .register(Box::new(nodes_reachable.clone()))
            .map_err(|_| MetricsError::Prom)?;
        registry
            .register(Box::new(peers.clone()))
            .map_err(|_| MetricsError::Prom)?;
        registry
            .register(Box::new(datagrams_rx_total.clone()))
            .map_err(|_| MetricsError::Prom)?;
        registry
            .register(Box::new(datagrams_tx_total.clone()))
            .map_err(|_| MetricsError::Prom)?;
        registry
            .register(Box::new(decode_errors_total.clone()))
            .map_err(|_| MetricsError::Prom)?;
        registry
            .register(Box::new(trickle_sends_total.clone()))
            .map_err(|_| MetricsError::Prom)?;
        registry
            .register(Box::new(collisions_total.clone()))
            .map_err(|_| MetricsError::Prom)?;
        registry
            .register(Box::new(bodies_rejected_total.clone()))
            .map_err(|_| MetricsError::Prom)?;

        Ok(Self {
            registry,
            nodes_reachable,
            peers,
            datagrams_rx_total,
            datagrams_tx_total,
            decode_errors_total,
            trickle_sends_total,
            collisions_total,
            bodies_rejected_total,
        })
    }
}
