//! Relay status, peers and stats reset commands.

use anyhow::Result;
use serde::Deserialize;

use super::http::{base_url, get_json, post_json};

// ── Response types ────────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct StatusResponse {
    uptime_secs: u64,
    config: ConfigSummary,
    counters: Counters,
}

#[derive(Deserialize)]
struct ConfigSummary {
    serial_port: String,
    baud_rate: u32,
    local_address: String,
    peer_address: String,
    channel: u8,
    expected_sender: Option<String>,
    chunk_cap: usize,
    burst_cap: usize,
    send_timeout_us: u64,
    recv_timeout_ms: u64,
}

#[derive(Deserialize)]
struct Counters {
    serial_bytes_in: u64,
    chunks_full: u64,
    chunks_timeout: u64,
    sends_ok: u64,
    sends_failed: u64,
    datagrams_received: u64,
    datagrams_rejected: u64,
    datagrams_malformed: u64,
    bursts_flushed: u64,
    serial_bytes_out: u64,
    bytes_truncated: u64,
}

#[derive(Deserialize)]
struct PeersResponse {
    peers: Vec<PeerInfo>,
}

#[derive(Deserialize)]
struct PeerInfo {
    address: String,
    accepted: u64,
    rejected: u64,
    last_reason: Option<String>,
    last_seen_secs: u64,
}

#[derive(Deserialize)]
struct ResetResponse {
    previous: Counters,
}

// ── Commands ──────────────────────────────────────────────────────────────────

pub async fn cmd_status(port: u16) -> Result<()> {
    let resp: StatusResponse = get_json(&format!("{}/status", base_url(port))).await?;
    let c = &resp.config;

    println!("═══════════════════════════════════════");
    println!("  Airbridge Relay Status");
    println!("═══════════════════════════════════════");
    println!("  Uptime          : {}s", resp.uptime_secs);
    println!("  Serial          : {} @ {} baud", c.serial_port, c.baud_rate);
    println!("  Local address   : {}", c.local_address);
    println!("  Peer address    : {}", c.peer_address);
    println!("  Channel         : {}", c.channel);
    println!(
        "  Expected sender : {}",
        c.expected_sender.as_deref().unwrap_or("any")
    );
    println!("  Chunk cap       : {} bytes", c.chunk_cap);
    println!("  Burst cap       : {} bytes", c.burst_cap);
    println!("  Send timeout    : {}us", c.send_timeout_us);
    println!("  Recv timeout    : {}ms", c.recv_timeout_ms);

    println!("\n  Counters:");
    print_counters(&resp.counters);

    Ok(())
}

pub async fn cmd_peers(port: u16) -> Result<()> {
    let resp: PeersResponse = get_json(&format!("{}/peers", base_url(port))).await?;

    if resp.peers.is_empty() {
        println!("No datagrams received yet.");
        return Ok(());
    }

    println!("═══════════════════════════════════════");
    println!("  Heard From ({})", resp.peers.len());
    println!("═══════════════════════════════════════");

    for p in &resp.peers {
        println!("  ┌─ {}", p.address);
        println!("  │  accepted  : {}", p.accepted);
        println!("  │  rejected  : {}", p.rejected);
        if let Some(reason) = &p.last_reason {
            println!("  │  last drop : {}", reason);
        }
        println!("  └─ last seen : {}s ago", p.last_seen_secs);
    }

    Ok(())
}

pub async fn cmd_reset(port: u16) -> Result<()> {
    let resp: ResetResponse = post_json(&format!("{}/stats/reset", base_url(port))).await?;
    println!("Counters reset. Values before reset:");
    print_counters(&resp.previous);
    Ok(())
}

fn print_counters(c: &Counters) {
    println!("  ┌─ serial in     : {} bytes", c.serial_bytes_in);
    println!(
        "  │  chunks        : {} full, {} timeout",
        c.chunks_full, c.chunks_timeout
    );
    println!("  │  sends         : {} ok, {} failed", c.sends_ok, c.sends_failed);
    println!(
        "  │  datagrams     : {} received, {} rejected, {} malformed",
        c.datagrams_received, c.datagrams_rejected, c.datagrams_malformed
    );
    println!("  │  bursts        : {}", c.bursts_flushed);
    println!("  │  serial out    : {} bytes", c.serial_bytes_out);
    println!("  └─ truncated     : {} bytes", c.bytes_truncated);
}
