use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

/// Firewall process configuration.
#[derive(Debug, Clone, Parser)]
#[command(name = "voltwall")]
#[command(about = "Inline channel and HTLC firewall for LND")]
#[command(version)]
pub struct Config {
    /// LND gRPC address (host:port)
    #[arg(long, env = "VOLTWALL_HOST")]
    pub host: String,

    /// Path to LND's TLS certificate
    #[arg(long, env = "VOLTWALL_TLS_CERT_PATH")]
    pub tls_cert_path: PathBuf,

    /// Path to an admin macaroon
    #[arg(long, env = "VOLTWALL_MACAROON_PATH")]
    pub macaroon_path: PathBuf,

    /// Server name expected in LND's certificate
    #[arg(long, default_value = "localhost", env = "VOLTWALL_TLS_DOMAIN")]
    pub tls_domain: String,

    /// Path to firewall policy YAML file
    #[arg(long, default_value = "firewall.yaml", env = "VOLTWALL_POLICY_PATH")]
    pub policy_path: PathBuf,

    /// Directory holding ChannelAccept.lua and HtlcForward.lua
    #[arg(long, default_value = "rules", env = "VOLTWALL_RULES_DIR")]
    pub rules_dir: PathBuf,

    /// Policy reload check interval in seconds
    #[arg(long, default_value = "30", env = "VOLTWALL_POLICY_RELOAD_SECS")]
    pub policy_reload_secs: u64,

    /// Timeout for unary node lookups in seconds
    #[arg(long, default_value = "10", env = "VOLTWALL_RPC_TIMEOUT_SECS")]
    pub rpc_timeout_secs: u64,

    /// Delay before reconnecting after a session ends, in seconds
    #[arg(long, default_value = "5", env = "VOLTWALL_RECONNECT_DELAY_SECS")]
    pub reconnect_delay_secs: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", env = "VOLTWALL_LOG_LEVEL")]
    pub log_level: String,

    /// Emit logs as JSON lines
    #[arg(long, env = "VOLTWALL_LOG_JSON")]
    pub log_json: bool,

    /// Shorthand for --log-level debug
    #[arg(long, env = "VOLTWALL_DEBUG")]
    pub debug: bool,
}

impl Config {
    /// Get policy reload interval as Duration.
    pub fn policy_reload_interval(&self) -> Duration {
        Duration::from_secs(self.policy_reload_secs)
    }

    pub fn rpc_timeout(&self) -> Duration {
        Duration::from_secs(self.rpc_timeout_secs)
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_secs(self.reconnect_delay_secs)
    }

    /// `debug` when `--debug` is set, the configured level otherwise.
    pub fn effective_log_level(&self) -> &str {
        if self.debug {
            "debug"
        } else {
            &self.log_level
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            host: "127.0.0.1:10009".to_string(),
            tls_cert_path: PathBuf::from("tls.cert"),
            macaroon_path: PathBuf::from("admin.macaroon"),
            tls_domain: "localhost".to_string(),
            policy_path: PathBuf::from("firewall.yaml"),
            rules_dir: PathBuf::from("rules"),
            policy_reload_secs: 30,
            rpc_timeout_secs: 10,
            reconnect_delay_secs: 5,
            log_level: "info".to_string(),
            log_json: false,
            debug: false,
        }
    }
}
