use std::time::Duration;

use clap::Parser;
use hashomatic::VersionInfo;
use hashomatic::transport::ServerConfig;

/// Runtime configuration for the `hashomatic` binary.
///
/// Every setting can come from a flag or the matching environment variable.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "hashomatic",
    version,
    about = "Accepts passwords, hands out tickets, publishes SHA-512 digests later"
)]
pub struct CliArgs {
    /// Interface to listen on.
    #[arg(long, env = "HASHOMATIC_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port to listen on.
    #[arg(long, env = "PORT", default_value_t = 8080)]
    pub port: u16,

    /// Milliseconds to wait before a submitted password's digest is published.
    #[arg(long, env = "HASHOMATIC_HASH_DELAY_MS", default_value_t = 5_000)]
    pub hash_delay_ms: u64,

    /// Milliseconds open connections get to finish once shutdown starts.
    ///
    /// In-flight digests are always waited for regardless of this window.
    #[arg(long, env = "HASHOMATIC_SHUTDOWN_GRACE_MS", default_value_t = 5_000)]
    pub shutdown_grace_ms: u64,

    /// Build identifier reported by `/health-check`.
    #[arg(long, env = "HASHOMATIC_BUILD")]
    pub build: Option<String>,
}

impl CliArgs {
    /// Version reported by the service, including the build id when given.
    pub fn version_info(&self) -> VersionInfo {
        match &self.build {
            Some(build) => VersionInfo::new().with_build(build.clone()),
            None => VersionInfo::new(),
        }
    }
}

impl From<CliArgs> for ServerConfig {
    fn from(args: CliArgs) -> Self {
        Self {
            host: args.host,
            port: args.port,
            hash_delay: Duration::from_millis(args.hash_delay_ms),
            shutdown_grace: Duration::from_millis(args.shutdown_grace_ms),
        }
    }
}
