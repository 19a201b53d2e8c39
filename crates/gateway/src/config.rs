//! Runtime configuration for the REST façade.
//!
//! Every setting can be given as a flag or through its environment variable;
//! unset values fall back to the defaults of the reference network
//! (`mychannel`, contract `asset`, port 8080).

use std::net::SocketAddr;
use std::num::ParseIntError;
use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, ValueEnum};

pub const DEFAULT_CHANNEL: &str = "mychannel";
pub const DEFAULT_CONTRACT: &str = "asset";
pub const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:8080";

#[derive(Parser, Debug, Clone)]
#[command(name = "asset-api", version, about = "REST API for the asset ledger contract")]
pub struct ApiConfig {
    /// Membership service provider id of the client identity
    #[arg(long, env = "MSP_ID", default_value = "Org1MSP")]
    pub msp_id: String,

    /// Client certificate (PEM)
    #[arg(long, env = "CERT_PATH")]
    pub cert_path: Option<PathBuf>,

    /// Client private key (PEM)
    #[arg(long, env = "KEY_PATH")]
    pub key_path: Option<PathBuf>,

    /// CA certificate used to verify the gateway peer
    #[arg(long, env = "TLS_CERT_PATH")]
    pub tls_cert_path: Option<PathBuf>,

    /// Gateway peer endpoint, host:port
    #[arg(long, env = "PEER_ENDPOINT", default_value = "localhost:7051")]
    pub peer_endpoint: String,

    /// TLS server name override for the gateway peer
    #[arg(long, env = "GATEWAY_PEER", default_value = "peer0.org1.example.com")]
    pub gateway_peer: String,

    #[arg(long, env = "CHANNEL_NAME", default_value = DEFAULT_CHANNEL)]
    pub channel: String,

    #[arg(long, env = "CHAINCODE_NAME", default_value = DEFAULT_CONTRACT)]
    pub contract: String,

    #[arg(long, env = "LISTEN_ADDR", default_value = DEFAULT_LISTEN_ADDR)]
    pub listen_addr: SocketAddr,

    #[arg(long, env = "LOG_FORMAT", value_enum, default_value_t = LogFormat::Pretty)]
    pub log_format: LogFormat,

    #[command(flatten)]
    pub timeouts: Timeouts,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Deadlines bounding each phase of a gateway call.
#[derive(Args, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    /// Seconds allowed for a read-only evaluation
    #[arg(
        long = "evaluate-timeout-secs",
        env = "EVALUATE_TIMEOUT_SECS",
        default_value = "5",
        value_parser = parse_secs,
    )]
    pub evaluate: Duration,

    /// Seconds allowed for collecting endorsements
    #[arg(
        long = "endorse-timeout-secs",
        env = "ENDORSE_TIMEOUT_SECS",
        default_value = "15",
        value_parser = parse_secs,
    )]
    pub endorse: Duration,

    /// Seconds allowed for handing the transaction to ordering
    #[arg(
        long = "submit-timeout-secs",
        env = "SUBMIT_TIMEOUT_SECS",
        default_value = "5",
        value_parser = parse_secs,
    )]
    pub submit: Duration,

    /// Seconds allowed for waiting on the commit status
    #[arg(
        long = "commit-status-timeout-secs",
        env = "COMMIT_STATUS_TIMEOUT_SECS",
        default_value = "60",
        value_parser = parse_secs,
    )]
    pub commit_status: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            evaluate: Duration::from_secs(5),
            endorse: Duration::from_secs(15),
            submit: Duration::from_secs(5),
            commit_status: Duration::from_secs(60),
        }
    }
}

fn parse_secs(raw: &str) -> Result<Duration, ParseIntError> {
    raw.trim().parse::<u64>().map(Duration::from_secs)
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            msp_id: "Org1MSP".to_string(),
            cert_path: None,
            key_path: None,
            tls_cert_path: None,
            peer_endpoint: "localhost:7051".to_string(),
            gateway_peer: "peer0.org1.example.com".to_string(),
            channel: DEFAULT_CHANNEL.to_string(),
            contract: DEFAULT_CONTRACT.to_string(),
            listen_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            log_format: LogFormat::Pretty,
            timeouts: Timeouts::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_reference_network() {
        let config = ApiConfig::default();
        assert_eq!(config.channel, "mychannel");
        assert_eq!(config.contract, "asset");
        assert_eq!(config.listen_addr.port(), 8080);
        assert_eq!(config.timeouts.evaluate, Duration::from_secs(5));
        assert_eq!(config.timeouts.endorse, Duration::from_secs(15));
        assert_eq!(config.timeouts.submit, Duration::from_secs(5));
        assert_eq!(config.timeouts.commit_status, Duration::from_secs(60));
    }

    #[test]
    fn test_parse_flags() {
        let config = ApiConfig::try_parse_from([
            "asset-api",
            "--msp-id",
            "Org2MSP",
            "--listen-addr",
            "127.0.0.1:9090",
            "--evaluate-timeout-secs",
            "2",
            "--commit-status-timeout-secs",
            "120",
            "--log-format",
            "json",
        ])
        .unwrap();
        assert_eq!(config.msp_id, "Org2MSP");
        assert_eq!(config.listen_addr, "127.0.0.1:9090".parse().unwrap());
        assert_eq!(config.timeouts.evaluate, Duration::from_secs(2));
        assert_eq!(config.timeouts.commit_status, Duration::from_secs(120));
        assert_eq!(config.log_format, LogFormat::Json);
    }

    #[test]
    fn test_rejects_non_numeric_timeout() {
        let result = ApiConfig::try_parse_from(["asset-api", "--submit-timeout-secs", "soon"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_secs() {
        assert_eq!(parse_secs(" 30 ").unwrap(), Duration::from_secs(30));
        assert!(parse_secs("-1").is_err());
    }
}
