#![forbid(unsafe_code)]
#![warn(missing_docs)]

//! Hearthnet daemon entrypoint (systemd-friendly).
//! Binds the protocol socket, enrolls interfaces, and runs until SIGINT.

use std::sync::Arc;

use anyhow::Context;
use tracing::{info, warn};

use hearthnet::core::config::{parse_node_config, NodeConfig};
use hearthnet::daemon::{spawn_engine, Command};
use hearthnet::monitoring::metrics::Metrics;
use hearthnet::transport::udp::UdpTransport;

fn env(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn load_config() -> anyhow::Result<NodeConfig> {
    let mut cfg = match std::env::var("HEARTHNET_CONFIG") {
        Ok(path) => {
            let raw = std::fs::read_to_string(&path)
                .with_context(|| format!("read config {path}"))?;
            parse_node_config(&raw).with_context(|| format!("parse config {path}"))?
        }
        Err(_) => NodeConfig::default(),
    };

    // Environment overrides for containerized deployments.
    let ifaces = env("HEARTHNET_IFACES", "");
    if !ifaces.trim().is_empty() {
        cfg.net.endpoints = ifaces
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
    }
    if let Ok(port) = env("HEARTHNET_PORT", "").parse::<u16>() {
        cfg.net.port = port;
    }
    let router_name = env("HEARTHNET_ROUTER_NAME", "");
    if !router_name.trim().is_empty() {
        cfg.node.router_name = Some(router_name.trim().to_string());
    }
    Ok(cfg)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = tracing_subscriber::fmt()
        .with_target(false)
        .with_level(true)
        .compact()
        .try_init();

    let cfg = load_config()?;
    if cfg.net.endpoints.is_empty() {
        warn!("no endpoints configured; set HEARTHNET_IFACES or [net] endpoints");
    }

    let transport =
        UdpTransport::bind(cfg.net.port, cfg.net.mtu).context("bind protocol socket")?;
    let metrics = Arc::new(Metrics::new().context("metrics init")?);

    info!(
        port = cfg.net.port,
        endpoints = ?cfg.net.endpoints,
        "hearthnet starting"
    );

    let (handle, join) =
        spawn_engine(cfg, transport, metrics).context("engine init")?;

    tokio::signal::ctrl_c().await.context("wait for signal")?;
    info!("signal received; shutting down");
    let _ = handle.send(Command::Shutdown).await;
    let _ = join.await;
    Ok(())
}
