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

//! Daemon wiring: a single tokio task owns the engine and multiplexes the
//! command channel, socket readiness, and the engine's requested deadline.
//! All protocol state lives on that one task; callers talk to it through
//! [`EngineHandle`].

use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::core::config::NodeConfig;
use crate::core::engine::{Engine, Event};
use crate::core::tlv::Tlv;
use crate::core::types::{keepalive_interval_tlv, tlv_type, RngError, Version};
use crate::monitoring::metrics::Metrics;
use crate::transport::udp::UdpTransport;

/// Instruction for the engine task.
#[derive(Debug)]
pub enum Command {
    /// Publish a local attribute.
    Publish(Tlv),
    /// Withdraw a local attribute.
    Unpublish(Tlv),
    /// Enroll an interface.
    EnableEndpoint(String),
    /// Withdraw an interface.
    DisableEndpoint(String),
    /// Leave all groups and stop the task.
    Shutdown,
}

impl From<Command> for Event {
    fn from(c: Command) -> Self {
        match c {
            Command::Publish(t) => Event::Publish(t),
            Command::Unpublish(t) => Event::Unpublish(t),
            Command::EnableEndpoint(n) => Event::EnableEndpoint(n),
            Command::DisableEndpoint(n) => Event::DisableEndpoint(n),
            Command::Shutdown => Event::Shutdown,
        }
    }
}

/// Handle to the engine task.
#[derive(Clone)]
pub struct EngineHandle {
    tx: mpsc::Sender<Command>,
}

impl EngineHandle {
    /// Queue a command; returns false when the task is gone.
    pub async fn send(&self, cmd: Command) -> bool {
        self.tx.send(cmd).await.is_ok()
    }
}

/// Build the engine and spawn its task. Endpoints from the configuration are
/// enrolled and the VERSION (plus optional router name and keep-alive)
/// attributes are published before the loop starts.
pub fn spawn_engine(
    cfg: NodeConfig,
    transport: UdpTransport,
    metrics: Arc<Metrics>,
) -> Result<(EngineHandle, tokio::task::JoinHandle<()>), RngError> {
    let start = Instant::now();
    let recv_socket = transport.clone();
    let mut engine = Engine::new(cfg.protocol.clone(), transport, metrics, 0)?;

    let (tx, mut rx) = mpsc::channel::<Command>(256);

    let join = tokio::spawn(async move {
        let now_ms = move || start.elapsed().as_millis() as u64;

        let boot = now_ms();
        engine.publish(
            Version {
                version: cfg.protocol.version,
                user_agent: cfg.protocol.user_agent.clone(),
            }
            .to_tlv(),
            boot,
        );
        if cfg.protocol.keepalive_interval_ms != 24_000 {
            engine.publish(keepalive_interval_tlv(cfg.protocol.keepalive_interval_ms), boot);
        }
        if let Some(name) = cfg.node.router_name.as_deref() {
            engine.publish(
                Tlv::new(tlv_type::DNS_ROUTER_NAME, name.as_bytes().to_vec()),
                boot,
            );
        }
        for ep in &cfg.net.endpoints {
            engine.enable_endpoint(ep, now_ms());
        }

        let mut buf = vec![0u8; 65536];
        let mut deadline = engine.run(now_ms());
        info!("engine loop started");

        loop {
            let sleep_for = Duration::from_millis(deadline.saturating_sub(now_ms()));
            tokio::select! {
                maybe_cmd = rx.recv() => {
                    let now = now_ms();
                    match maybe_cmd {
                        Some(cmd) => {
                            if !engine.handle_event(now, cmd.into()) {
                                break;
                            }
                        }
                        None => {
                            warn!("command channel closed; stopping engine task");
                            engine.shutdown(now);
                            break;
                        }
                    }
                    deadline = engine.run(now);
                }

                ready = recv_socket.readable() => {
                    if let Err(e) = ready {
                        warn!(err = %e, "socket wait failed");
                        continue;
                    }
                    let now = now_ms();
                    while let Some((endpoint, src, n)) = recv_socket.try_recv(&mut buf) {
                        engine.handle_datagram(now, &endpoint, src, &buf[..n]);
                    }
                    deadline = engine.run(now);
                }

                _ = tokio::time::sleep(sleep_for) => {
                    let now = now_ms();
                    engine.handle_event(now, Event::TimerFired);
                    deadline = engine.run(now);
                }
            }
        }
        info!("engine loop stopped");
    });

    Ok((EngineHandle { tx }, join))
}
