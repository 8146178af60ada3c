//! echoback: a minimal sequential TCP echo-back server
//!
//! Picks a local interface address (interactively, automatically, or from
//! an explicit `--bind`), opens a listener on it (dual-stack for IPv6),
//! then serves clients strictly one at a time: read a bounded request,
//! send back a fixed banner, the request bytes, and a timestamp, close,
//! repeat until the process is terminated.

mod config;
mod iface;
mod listener;
mod protocol;
mod server;

use config::{Config, FamilyPref};
use iface::{AddrFamily, BindTarget, InterfaceAddress};
use server::Server;
use std::io::{self, BufRead, Write};
use std::net::IpAddr;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::load()?;

    // Initialize logging
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    info!(
        port = config.port,
        auto = config.auto,
        family = ?config.family,
        "Starting echoback server"
    );

    let target = resolve_bind_target(&config)?;
    info!(
        family = %target.family,
        address = target.address.as_deref().unwrap_or("*"),
        port = target.port,
        "Bind target selected"
    );

    let listener = listener::create_listener(&target)?;
    let server = Server::new(listener);
    info!(address = %server.local_addr()?, "Server listening");

    server.run();
    Ok(())
}

/// Turn the configuration into a bind target: explicit address, first
/// auto-selected candidate, or interactive per-candidate prompt.
fn resolve_bind_target(config: &Config) -> Result<BindTarget, Box<dyn std::error::Error>> {
    if let Some(bind) = &config.bind {
        let ip: IpAddr = bind.parse()?;
        return Ok(BindTarget::explicit(ip, config.port));
    }

    // Map config-level family preference to the selector's enum
    let preferred = config.family.map(|family| match family {
        FamilyPref::V4 => AddrFamily::V4,
        FamilyPref::V6 => AddrFamily::V6,
    });

    let target = if config.auto {
        iface::select_address(config.port, preferred, true, |_| false)?
    } else {
        iface::select_address(config.port, preferred, false, prompt_for_address)?
    };
    Ok(target)
}

/// Ask on stdin whether to use a candidate address. EOF or a read error
/// counts as "no", so a non-interactive run rejects every candidate and
/// lands on the dual-stack wildcard default.
fn prompt_for_address(candidate: &InterfaceAddress) -> bool {
    println!(
        "{}\t{}\t{}",
        candidate.name, candidate.family, candidate.address
    );

    let stdin = io::stdin();
    loop {
        print!("use this address? (Y or N): ");
        let _ = io::stdout().flush();

        let mut line = String::new();
        match stdin.lock().read_line(&mut line) {
            Ok(0) | Err(_) => return false,
            Ok(_) => {}
        }
        match line.trim().chars().next().map(|c| c.to_ascii_uppercase()) {
            Some('Y') => return true,
            Some('N') => return false,
            _ => continue,
        }
    }
}
