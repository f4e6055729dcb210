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

//! Hearthnet - distributed home-network configuration state synchronization.
//!
//! This repository provides:
//! - A binary TLV codec with 4-byte alignment and nested containers
//! - A node store keyed by node identifier, with per-node and network-wide hashes
//! - A Trickle-governed (RFC 6206 style) multicast summary scheduler
//! - Peer liveness tracking, mutual-neighbor graph pruning, and collision healing
//! - A subscriber facade for application layers (service discovery, prefix assignment)
//! - Monitoring via Prometheus metrics and structured logging

/// Protocol core (TLV codec, node store, Trickle engine, state machine).
pub mod core;
/// Daemon wiring: the single-task event loop driving the engine.
pub mod daemon;
/// Observability (metrics, structured logging helpers).
pub mod monitoring;
/// Transport facade (UDP multicast sockets, hardware address discovery).
pub mod transport;
