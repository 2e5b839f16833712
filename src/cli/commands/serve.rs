//! Web server command.

use std::net::SocketAddr;

use anyhow::Context;
use console::style;

use crate::config::{Settings, DEFAULT_PORT};
use crate::server::AppState;

/// Start the web server.
pub async fn cmd_serve(settings: &Settings, bind: Option<&str>) -> anyhow::Result<()> {
    let bind = bind.unwrap_or(&settings.server.bind);
    let (host, port) = parse_bind_address(bind)?;
    let addr = resolve(&host, port).await?;

    let state = AppState::from_settings(settings)?;

    println!(
        "{} Starting wikiscrape server at http://{}",
        style("→").cyan(),
        addr
    );
    println!(
        "  {} Browser mode: {}, navigation timeout: {}s",
        style("•").dim(),
        settings.browser.mode,
        settings.scrape.navigation_timeout
    );
    if settings.scrape.allowed_domains.is_empty() {
        println!("  {} Domain check disabled", style("!").yellow());
    } else {
        println!(
            "  {} Allowed domains: {}",
            style("•").dim(),
            settings.scrape.allowed_domains.join(", ")
        );
    }
    println!("  Press Ctrl+C to stop");

    crate::server::serve(state, addr).await
}

async fn resolve(host: &str, port: u16) -> anyhow::Result<SocketAddr> {
    let bare = host.trim_start_matches('[').trim_end_matches(']');
    tokio::net::lookup_host((bare, port))
        .await
        .with_context(|| format!("Cannot resolve bind host '{}'", host))?
        .next()
        .ok_or_else(|| anyhow::anyhow!("No address found for bind host '{}'", host))
}

/// Parse a bind address that can be:
/// - Just a port: "3030" -> 127.0.0.1:3030
/// - Just a host: "0.0.0.0" -> 0.0.0.0:3000
/// - Host and port: "0.0.0.0:3030" -> 0.0.0.0:3030
fn parse_bind_address(bind: &str) -> anyhow::Result<(String, u16)> {
    let bind = bind.trim();
    if bind.is_empty() {
        anyhow::bail!("Bind address is empty");
    }

    // Try parsing as just a port number
    if let Ok(port) = bind.parse::<u16>() {
        return Ok(("127.0.0.1".to_string(), port));
    }

    // Bare IPv6 literal
    if bind.matches(':').count() > 1 && !bind.starts_with('[') {
        return Ok((bind.to_string(), DEFAULT_PORT));
    }

    // Try parsing as host:port
    if let Some((host, port_str)) = bind.rsplit_once(':') {
        let port = port_str
            .parse::<u16>()
            .with_context(|| format!("Invalid port in bind address '{}'", bind))?;
        return Ok((host.to_string(), port));
    }

    // Must be just a host, use default port
    Ok((bind.to_string(), DEFAULT_PORT))
}
