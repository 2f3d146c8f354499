//! airbridged: serial-over-radio burst relay daemon.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};

use airbridge_core::{AirbridgeConfig, RelayParams};
use airbridge_services::{
    ActivityIndicator, IndicatorOutput, LogIndicator, PeerFilter, ReceivePath, ReceiveReassembler,
    Relay, RelayStats, SharedReassembler,
};

mod led;
mod radio;
mod relay_loop;
mod serial;

use radio::UdpLink;
use relay_loop::RelayLoop;
use serial::SerialPortEndpoint;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    // Load config
    let config = match std::env::args().nth(1) {
        Some(path) => AirbridgeConfig::load_from(PathBuf::from(path))?,
        None => {
            if let Err(e) = AirbridgeConfig::write_default_if_missing() {
                tracing::warn!(error = %e, "failed to write default config");
            }
            AirbridgeConfig::load()?
        }
    };
    let params = RelayParams::from_config(&config).context("invalid configuration")?;
    tracing::info!(
        chunk_cap = params.chunk_cap,
        burst_cap = params.burst_cap,
        send_timeout_us = params.send_timeout.as_micros() as u64,
        recv_timeout_ms = params.recv_timeout.as_millis() as u64,
        "airbridged starting"
    );

    // Serial port
    let serial = SerialPortEndpoint::open(&config.serial)?;

    // Radio link
    let bind: SocketAddr = config
        .link
        .bind
        .parse()
        .with_context(|| format!("invalid link.bind {}", config.link.bind))?;
    let remote: SocketAddr = config
        .link
        .remote
        .parse()
        .with_context(|| format!("invalid link.remote {}", config.link.remote))?;
    let mut link = UdpLink::bind(bind, remote, config.link.local_address)
        .with_context(|| format!("failed to bind link socket on {}", bind))?;
    link.configure_peer(config.link.peer_address, config.link.channel)
        .context("failed to register link peer")?;
    tracing::info!(
        local = %config.link.local_address,
        peer = %config.link.peer_address,
        channel = config.link.channel,
        expected_sender = ?config.link.expected_sender.map(|a| a.to_string()),
        %remote,
        "radio link ready"
    );
    let link_socket = link.socket();
    let link = Arc::new(link);

    // Shared state
    let stats = RelayStats::new();
    let reassembler = SharedReassembler::new(ReceiveReassembler::new(&params));
    let receive_path = ReceivePath::new(
        PeerFilter::from_config(&config.link),
        reassembler.clone(),
        stats.clone(),
        params.chunk_cap,
    );

    // Indicator
    let output: Box<dyn IndicatorOutput> = match led::LedIndicator::from_config(&config.indicator) {
        Some(led) => {
            tracing::info!(path = %config.indicator.led_path.display(), "activity LED enabled");
            Box::new(led)
        }
        None => Box::new(LogIndicator),
    };
    let indicator = ActivityIndicator::from_config(output, &config.indicator);

    let relay = Relay::new(
        &params,
        config.link.peer_address,
        link,
        serial,
        reassembler,
        stats.clone(),
    )
    .with_indicator(indicator);

    // ── Shutdown channel ─────────────────────────────────────────────────────
    let (shutdown_tx, _) = tokio::sync::broadcast::channel::<()>(1);

    {
        let shutdown = shutdown_tx.clone();
        tokio::spawn(async move {
            tokio::signal::ctrl_c().await.ok();
            tracing::info!("shutdown signal received");
            let _ = shutdown.send(());
        });
    }

    // ── Spawn tasks ──────────────────────────────────────────────────────────

    let receive_task = tokio::spawn(radio::receive_loop(
        link_socket,
        receive_path,
        shutdown_tx.subscribe(),
    ));

    let mut relay_task = tokio::spawn(
        RelayLoop::new(
            relay,
            Duration::from_micros(config.relay.poll_interval_us),
            shutdown_tx.subscribe(),
        )
        .run(),
    );

    let stats_printer = {
        let stats = stats.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(10));
            loop {
                interval.tick().await;
                stats.print_stats();
            }
        })
    };

    // Status HTTP endpoint
    if config.api.enabled {
        let state = airbridge_api::ApiState {
            stats: stats.clone(),
            summary: airbridge_api::ConfigSummary::new(&config, &params),
        };
        let port = config.api.port;
        tokio::spawn(async move {
            if let Err(e) = airbridge_api::serve(state, port).await {
                tracing::error!(error = %e, "status server failed");
            }
        });
    }

    // ── Wait for exit ────────────────────────────────────────────────────────

    let mut shutdown_rx = shutdown_tx.subscribe();

    tokio::select! {
        biased;
        _ = shutdown_rx.recv() => {
            tracing::info!("shutting down");
            // Let the relay loop drain pending chunk and burst.
            match tokio::time::timeout(Duration::from_secs(2), &mut relay_task).await {
                Ok(Ok(Err(e))) => tracing::error!(error = %e, "relay loop failed during shutdown"),
                Err(_) => tracing::warn!("relay loop did not finish draining"),
                _ => {}
            }
        }
        r = &mut relay_task  => tracing::error!("relay loop exited: {:?}", r),
        r = receive_task     => tracing::error!("link receiver exited: {:?}", r),
        r = stats_printer    => tracing::error!("stats printer exited: {:?}", r),
    }

    stats.print_stats();
    Ok(())
}
