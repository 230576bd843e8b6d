//! Session configuration, loaded from JSON.

use std::{
    fs,
    net::{Ipv4Addr, SocketAddr, SocketAddrV4, ToSocketAddrs},
    path::Path,
    time::Duration,
};

use serde::{de, Deserialize, Deserializer};
use smart_default::SmartDefault;

use ldn_proto::PASSPHRASE_SIZE;
use ldn_utils::Hidden;

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File could not be read.
    #[error(transparent)]
    Io(#[from] std::io::Error),
    /// File is not valid configuration JSON.
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    /// Passphrase does not fit its wire field.
    #[error("Passphrase is longer than {PASSPHRASE_SIZE} bytes")]
    PassphraseTooLong,
    /// Relay host could not be resolved.
    #[error("Cannot resolve relay server {0}")]
    InvalidServer(String),
}

/// Relay server location.
#[derive(PartialEq, Eq, Clone, Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct ServerConfig {
    /// Host name or address.
    #[default("127.0.0.1".to_owned())]
    pub host: String,
    /// UDP port.
    #[default(30456)]
    pub port: u16,
}

impl ServerConfig {
    /// Resolve to a socket address, the first IPv4 result wins.
    pub fn resolve(&self) -> Result<SocketAddr, ConfigError> {
        let addrs: Vec<SocketAddr> = (self.host.as_str(), self.port)
            .to_socket_addrs()
            .map_err(|_| ConfigError::InvalidServer(self.host.clone()))?
            .collect();
        addrs
            .iter()
            .find(|a| a.is_ipv4())
            .or_else(|| addrs.first())
            .copied()
            .ok_or_else(|| ConfigError::InvalidServer(self.host.clone()))
    }
}

/// Wait bounds of blocking operations, given in milliseconds.
#[derive(PartialEq, Eq, Clone, Copy, Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct Timeouts {
    /// Idle time after which the relay link is closed. Also bounds reject.
    #[default(Duration::from_millis(6000))]
    #[serde(rename = "inactive_ms", deserialize_with = "deserialize_millis")]
    pub inactive: Duration,
    /// Bound of connect, create and proxy handshakes.
    #[default(Duration::from_millis(4000))]
    #[serde(rename = "failure_ms", deserialize_with = "deserialize_millis")]
    pub failure: Duration,
    /// Bound of a scan.
    #[default(Duration::from_millis(1000))]
    #[serde(rename = "scan_ms", deserialize_with = "deserialize_millis")]
    pub scan: Duration,
    /// How long a joining peer may wait for its token.
    #[default(Duration::from_millis(1000))]
    #[serde(rename = "auth_wait_ms", deserialize_with = "deserialize_millis")]
    pub auth_wait: Duration,
}

/// Everything a session needs to know.
#[derive(PartialEq, Eq, Clone, Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct Config {
    /// Relay server.
    pub server: ServerConfig,
    /// Limits which networks are visible, empty for public ones.
    #[serde(deserialize_with = "deserialize_passphrase")]
    pub passphrase: Hidden<String>,
    /// Never host a peer to peer proxy, all traffic goes through the relay.
    pub disable_p2p: bool,
    /// Local address the session socket binds to.
    #[default(SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, 0)))]
    pub bind_address: SocketAddr,
    /// Wait bounds.
    pub timeouts: Timeouts,
}

impl Config {
    /// Load configuration from a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }
}

fn deserialize_millis<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let value: u64 = de::Deserialize::deserialize(deserializer)?;
    Ok(Duration::from_millis(value))
}

/// Check that `passphrase` fits the wire field of the relay protocol.
pub fn validate_passphrase(passphrase: &str) -> Result<(), ConfigError> {
    if passphrase.len() > PASSPHRASE_SIZE {
        return Err(ConfigError::PassphraseTooLong);
    }
    Ok(())
}

fn deserialize_passphrase<'de, D>(deserializer: D) -> Result<Hidden<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: String = de::Deserialize::deserialize(deserializer)?;
    validate_passphrase(&value).map_err(de::Error::custom)?;
    Ok(Hidden(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn empty_json_is_default() {
        let config: Config = serde_json::from_str("{}").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.server.port, 30456);
        assert_eq!(config.timeouts.inactive, Duration::from_millis(6000));
        assert_eq!(config.timeouts.failure, Duration::from_millis(4000));
        assert_eq!(config.timeouts.scan, Duration::from_millis(1000));
        assert_eq!(config.timeouts.auth_wait, Duration::from_millis(1000));
        assert!(!config.disable_p2p);
    }

    #[test]
    fn full_json() {
        let json = r#"{
            "server": { "host": "ldn.example.org", "port": 30457 },
            "passphrase": "Ryujinx-0badcafe",
            "disable_p2p": true,
            "bind_address": "0.0.0.0:40000",
            "timeouts": { "scan_ms": 250 }
        }"#;
        let expected = Config {
            server: ServerConfig {
                host: "ldn.example.org".to_owned(),
                port: 30457,
            },
            passphrase: Hidden("Ryujinx-0badcafe".to_owned()),
            disable_p2p: true,
            bind_address: "0.0.0.0:40000".parse().unwrap(),
            timeouts: Timeouts {
                scan: Duration::from_millis(250),
                ..Default::default()
            },
        };
        assert_eq!(serde_json::from_str::<Config>(json).unwrap(), expected);
    }

    #[test]
    fn long_passphrase_is_rejected() {
        let json = format!(r#"{{ "passphrase": "{}" }}"#, "a".repeat(PASSPHRASE_SIZE + 1));
        assert!(serde_json::from_str::<Config>(&json).is_err());
    }

    #[test]
    fn passphrase_limit_counts_bytes() {
        assert!(validate_passphrase(&"a".repeat(PASSPHRASE_SIZE)).is_ok());
        // 43 three byte characters are 129 bytes.
        assert!(matches!(
            validate_passphrase(&"\u{20ac}".repeat(43)),
            Err(ConfigError::PassphraseTooLong)
        ));
    }

    #[test]
    fn resolves_literal_address() {
        let server = ServerConfig::default();
        assert_eq!(
            server.resolve().unwrap(),
            "127.0.0.1:30456".parse::<SocketAddr>().unwrap()
        );
    }
}
