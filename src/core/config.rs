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

//! Configuration for the protocol core and the daemon around it.

use serde::{Deserialize, Serialize};

use crate::core::trickle::TrickleParams;
use crate::core::types::PROTOCOL_PORT;

/// Tunables of the protocol core. Defaults match the deployed protocol
/// constants; changing them is for tests and simulations.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ProtocolConfig {
    /// Keep-alive interval we advertise and emit at, milliseconds.
    pub keepalive_interval_ms: u32,
    /// How long an unreachable node is kept before deletion, milliseconds.
    pub grace_period_ms: u64,
    /// Floor between consecutive prune passes, milliseconds.
    pub prune_min_interval_ms: u64,
    /// Trickle timer constants.
    pub trickle: TrickleParams,
    /// Data schema version; peers publishing a different version are kept as
    /// headers only.
    pub version: u8,
    /// User agent advertised in the VERSION attribute.
    pub user_agent: String,
    /// Reject bodies that carry no VERSION attribute at all.
    pub require_version: bool,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            keepalive_interval_ms: 24_000,
            grace_period_ms: 60_000,
            prune_min_interval_ms: 20,
            trickle: TrickleParams::default(),
            version: 1,
            user_agent: format!("hearthnet/{}", env!("CARGO_PKG_VERSION")),
            require_version: cfg!(feature = "production"),
        }
    }
}

/// Daemon configuration root, loadable from TOML.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    /// Node-level settings.
    pub node: NodeSettings,
    /// Network settings.
    pub net: NetConfig,
    /// Protocol tunables.
    pub protocol: ProtocolConfig,
}

/// Node settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeSettings {
    /// Human-readable name, published as the router name attribute when set.
    pub router_name: Option<String>,
}

impl Default for NodeSettings {
    fn default() -> Self {
        Self { router_name: None }
    }
}

/// Network settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct NetConfig {
    /// UDP port to bind.
    pub port: u16,
    /// Interfaces to enroll at startup.
    pub endpoints: Vec<String>,
    /// Multicast datagram budget per link; summaries above this fall back to
    /// hash-only broadcasts.
    pub mtu: usize,
}

impl Default for NetConfig {
    fn default() -> Self {
        Self {
            port: PROTOCOL_PORT,
            endpoints: Vec::new(),
            mtu: 1280,
        }
    }
}

/// Parse a TOML configuration document.
pub fn parse_node_config(raw: &str) -> Result<NodeConfig, toml::de::Error> {
    toml::from_str(raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_yields_defaults() {
        let cfg = parse_node_config("").unwrap();
        assert_eq!(cfg.net.port, 8808);
        assert_eq!(cfg.protocol.keepalive_interval_ms, 24_000);
        assert_eq!(cfg.protocol.trickle.imin_ms, 200);
        assert_eq!(cfg.protocol.trickle.imax_ms, 40_000);
    }

    #[test]
    fn partial_document_overrides() {
        let cfg = parse_node_config(
            r#"
[node]
router_name = "attic"

[net]
endpoints = ["eth0", "wlan0"]

[protocol]
keepalive_interval_ms = 4000
"#,
        )
        .unwrap();
        assert_eq!(cfg.node.router_name.as_deref(), Some("attic"));
        assert_eq!(cfg.net.endpoints, vec!["eth0", "wlan0"]);
        assert_eq!(cfg.protocol.keepalive_interval_ms, 4000);
        assert_eq!(cfg.protocol.grace_period_ms, 60_000);
    }
}
