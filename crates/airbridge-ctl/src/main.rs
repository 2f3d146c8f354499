//! airbridge-ctl: command-line interface for the airbridge relay daemon.

mod cmd;

use anyhow::{Context, Result};

const DEFAULT_PORT: u16 = 9101;

fn print_usage() {
    println!("Usage: airbridge-ctl [--port <port>] <command>");
    println!();
    println!("Commands:");
    println!("  status        Show relay configuration and counters");
    println!("  peers         List link sources heard from");
    println!("  reset         Zero the relay counters");
    println!();
    println!("Options:");
    println!("  --port <port>   API port (default: {})", DEFAULT_PORT);
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();

    let mut port = DEFAULT_PORT;
    let mut remaining: Vec<&str> = Vec::new();
    let mut i = 0;
    while i < args.len() {
        if args[i] == "--port" {
            i += 1;
            port = args
                .get(i)
                .context("--port requires a value")?
                .parse()
                .context("--port must be a number")?;
        } else {
            remaining.push(&args[i]);
        }
        i += 1;
    }

    match remaining.as_slice() {
        ["status"] | [] => cmd::status::cmd_status(port).await,
        ["peers"] => cmd::status::cmd_peers(port).await,
        ["reset"] => cmd::status::cmd_reset(port).await,
        ["help"] | ["--help"] | ["-h"] => {
            print_usage();
            Ok(())
        }
        other => {
            eprintln!("Unknown command: {}", other.join(" "));
            print_usage();
            std::process::exit(1);
        }
    }
}
