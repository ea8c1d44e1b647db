//! Server configuration from flags and environment.

use clap::Parser;
use slotkeeper_core::default_log_level;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(
    name = "slotkeeper-server",
    version,
    about = "HTTP API for creating calendar events without overlaps"
)]
pub struct ServerConfig {
    /// SQLite file holding the event table. Created when missing.
    #[arg(long, env = "SLOTKEEPER_DB_PATH", default_value = "slotkeeper.sqlite3")]
    pub db_path: PathBuf,

    #[arg(long, env = "SLOTKEEPER_HOST", default_value = "127.0.0.1")]
    pub host: IpAddr,

    #[arg(long, env = "SLOTKEEPER_PORT", default_value_t = 5000)]
    pub port: u16,

    /// trace|debug|info|warn|error. Defaults to debug in debug builds, info otherwise.
    #[arg(long, env = "SLOTKEEPER_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Absolute directory for rolling log files. Logs go to stderr when unset.
    #[arg(long, env = "SLOTKEEPER_LOG_DIR")]
    pub log_dir: Option<String>,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    pub fn log_level(&self) -> &str {
        self.log_level.as_deref().unwrap_or_else(|| default_log_level())
    }
}
