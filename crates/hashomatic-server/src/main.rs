//! hashomatic server binary.

mod config;

use std::sync::Arc;

use clap::Parser;
use hashomatic::transport::{ServerConfig, serve};
use hashomatic::{HASHOMATIC_VERSION, HashService};
use tracing::info;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::CliArgs;

/// Level for the hashomatic targets from a `HASHOMATIC_LOG` value.
fn log_level(value: Option<&str>) -> LevelFilter {
    match value.map(str::to_ascii_lowercase).as_deref() {
        Some("warning") => LevelFilter::WARN,
        Some(other) => other.parse().unwrap_or(LevelFilter::INFO),
        None => LevelFilter::INFO,
    }
}

/// `RUST_LOG` wins; otherwise `HASHOMATIC_LOG` scopes a level to our crates.
fn log_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = log_level(std::env::var("HASHOMATIC_LOG").ok().as_deref());
        EnvFilter::new(format!("hashomatic={level},hashomatic_server={level}"))
    })
}

fn init_tracing() {
    let json = std::env::var("LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json"));
    let registry = tracing_subscriber::registry().with(log_filter());

    let installed = if json {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init()
    } else {
        registry
            .with(fmt::layer().with_writer(std::io::stderr))
            .try_init()
    };
    if let Err(e) = installed {
        eprintln!("hashomatic: logging already initialised: {e}");
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = CliArgs::parse();
    init_tracing();

    let version = args.version_info();
    let config = ServerConfig::from(args);

    info!(build = ?version.build, "hashomatic {}", HASHOMATIC_VERSION);
    info!(
        hash_delay = ?config.hash_delay,
        shutdown_grace = ?config.shutdown_grace,
        "Configuration loaded"
    );

    let service = Arc::new(
        HashService::new()
            .with_delay(config.hash_delay)
            .with_version(version),
    );

    // A listener that fails to close is fatal: the error exits non-zero.
    serve(config, service).await?;
    Ok(())
}
