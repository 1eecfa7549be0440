//! Command-line argument parsing for the gateway.

use crate::config::Config;
use clap::Parser;
use std::path::PathBuf;

/// HTTP gateway that gives remote clients token-addressed MySQL sessions.
#[derive(Parser, Debug)]
#[command(name = "sql-gateway")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Config file path
    #[arg(long, value_name = "PATH", env = "GATEWAY_CONFIG")]
    pub config: Option<PathBuf>,

    /// Socket address to listen on (overrides config and GATEWAY_LISTEN)
    #[arg(short = 'l', long, value_name = "ADDR")]
    pub listen: Option<String>,

    /// Log filter directive, e.g. "debug" or "sql_gateway=trace"
    #[arg(long, value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Serve sessions from an in-memory scripted database instead of MySQL
    #[arg(long)]
    pub mock_db: bool,
}

impl Cli {
    /// Parses command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Returns the config file path to use.
    ///
    /// Uses the --config argument if provided, otherwise the default path.
    pub fn config_path(&self) -> PathBuf {
        self.config.clone().unwrap_or_else(Config::default_path)
    }

    /// Applies flags on top of file and environment settings.
    pub fn apply_overrides(&self, config: &mut Config) {
        if let Some(listen) = &self.listen {
            config.server.listen = listen.clone();
        }
        if let Some(level) = &self.log_level {
            config.logging.level = level.clone();
        }
    }
}
