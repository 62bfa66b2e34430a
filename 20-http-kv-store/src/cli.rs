use std::{net::SocketAddr, path::PathBuf, time::Duration};

use clap::Parser;

use crate::server::ServerConfig;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Socket address the HTTP server binds to. Use port 0 for an ephemeral port.
    #[arg(long, default_value = "127.0.0.1:8080")]
    pub listen: SocketAddr,

    /// Seconds between two status reports. Must be at least 1.
    #[arg(
        long,
        default_value_t = 5,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub report_interval_secs: u64,

    /// Seconds in-flight requests get to finish once shutdown starts.
    #[arg(long, default_value_t = 5)]
    pub shutdown_timeout_secs: u64,

    /// Directory served under `/public`.
    #[arg(long, default_value = "public")]
    pub public_dir: PathBuf,

    /// Directory holding `index.html`, `data.html` and `stats.html`.
    #[arg(long, default_value = "views")]
    pub views_dir: PathBuf,
}

impl Cli {
    pub fn server_config(&self) -> ServerConfig {
        ServerConfig {
            report_interval: Duration::from_secs(self.report_interval_secs),
            shutdown_timeout: Duration::from_secs(self.shutdown_timeout_secs),
            public_dir: self.public_dir.clone(),
            views_dir: self.views_dir.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_server_defaults() {
        let cli = Cli::parse_from(["http_kv_store"]);
        assert_eq!(cli.listen, "127.0.0.1:8080".parse::<SocketAddr>().unwrap());
        assert_eq!(cli.server_config(), ServerConfig::default());
    }

    #[test]
    fn zero_report_interval_is_rejected() {
        let result = Cli::try_parse_from(["http_kv_store", "--report-interval-secs", "0"]);
        assert!(result.is_err());
    }

    #[test]
    fn flags_override_defaults() {
        let cli = Cli::parse_from([
            "http_kv_store",
            "--listen",
            "0.0.0.0:0",
            "--report-interval-secs",
            "1",
            "--shutdown-timeout-secs",
            "2",
            "--views-dir",
            "/srv/views",
        ]);
        let config = cli.server_config();
        assert_eq!(cli.listen.port(), 0);
        assert_eq!(config.report_interval, Duration::from_secs(1));
        assert_eq!(config.shutdown_timeout, Duration::from_secs(2));
        assert_eq!(config.views_dir, PathBuf::from("/srv/views"));
        assert_eq!(config.public_dir, PathBuf::from("public"));
    }
}
