//! Environment-driven configuration for both binaries.
//!
//! Every loader has a `from_env` entry point and a `from_lookup` variant
//! taking an arbitrary variable source, which is what the tests use.

use log::{info, warn};
use secrecy::{ExposeSecret, SecretString};
use std::env;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::signer::{CurveType, LocalSigner, RemoteSigner, Signer, SignerError};
use crate::web3signer::{Web3SignerClient, Web3SignerConfig, Web3SignerError};

pub const DEFAULT_AGGREGATOR_PORT: u16 = 9010;
pub const DEFAULT_EXECUTOR_PORT: u16 = 9090;
pub const DEFAULT_TOKEN_EXPIRATION_SECS: u64 = 300;
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 2000;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable {0}")]
    Missing(String),

    #[error("Invalid value for {name}: {reason}")]
    Invalid { name: String, reason: String },

    #[error("Invalid signer configuration: {0}")]
    Signer(#[from] SignerError),

    #[error("Invalid remote signer configuration: {0}")]
    RemoteSigner(#[from] Web3SignerError),
}

/// Where a signer's key lives.
#[derive(Debug, Clone)]
pub enum SignerSource {
    Local { private_key: SecretString },
    Remote {
        config: Web3SignerConfig,
        public_key: String,
    },
}

/// Signer settings read from `<PREFIX>_SIGNER_*` and friends.
#[derive(Debug, Clone)]
pub struct SignerConfig {
    pub curve: CurveType,
    pub source: SignerSource,
}

impl SignerConfig {
    pub fn from_env(prefix: &str) -> Result<Self, ConfigError> {
        Self::from_lookup(prefix, |name| env::var(name).ok())
    }

    /// A private key selects a local signer; otherwise a remote signer URL
    /// and public key are required.
    pub fn from_lookup<F>(prefix: &str, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let curve_var = format!("{}_SIGNER_CURVE", prefix);
        let curve = match non_empty(&lookup, &curve_var) {
            Some(value) => value.parse::<CurveType>().map_err(|e| ConfigError::Invalid {
                name: curve_var,
                reason: e.to_string(),
            })?,
            None => CurveType::Ecdsa,
        };

        if let Some(private_key) = non_empty(&lookup, &format!("{}_PRIVATE_KEY", prefix)) {
            return Ok(Self {
                curve,
                source: SignerSource::Local {
                    private_key: SecretString::new(private_key),
                },
            });
        }

        let Some(config) = Web3SignerConfig::from_lookup(prefix, &lookup)? else {
            return Err(ConfigError::Missing(format!(
                "{}_PRIVATE_KEY or {}_REMOTE_SIGNER_URL",
                prefix, prefix
            )));
        };
        let public_key_var = format!("{}_REMOTE_SIGNER_PUBLIC_KEY", prefix);
        let public_key =
            non_empty(&lookup, &public_key_var).ok_or(ConfigError::Missing(public_key_var))?;

        Ok(Self {
            curve,
            source: SignerSource::Remote { config, public_key },
        })
    }

    pub fn is_remote(&self) -> bool {
        matches!(self.source, SignerSource::Remote { .. })
    }

    /// Construct the signer. No network I/O; call [`Signer::validate`] for that.
    pub fn build(&self) -> Result<Arc<dyn Signer>, ConfigError> {
        match &self.source {
            SignerSource::Local { private_key } => {
                let signer = LocalSigner::from_hex(self.curve, private_key.expose_secret())?;
                info!("Using local {} signer", self.curve);
                Ok(Arc::new(signer))
            }
            SignerSource::Remote { config, public_key } => {
                let client = Arc::new(Web3SignerClient::new(config)?);
                let signer = RemoteSigner::new(client, public_key, self.curve)?;
                info!("Using remote {} signer at {}", self.curve, config.base_url);
                Ok(Arc::new(signer))
            }
        }
    }
}

/// A chain the aggregator listens on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainEndpoint {
    pub chain_id: u64,
    pub rpc_url: String,
    pub inbox_address: String,
}

impl FromStr for ChainEndpoint {
    type Err = String;

    /// `chainId=rpcUrl=inboxAddress`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.trim().split('=').map(str::trim).collect();
        let [chain_id, rpc_url, inbox_address] = parts.as_slice() else {
            return Err(format!("expected chainId=rpcUrl=inboxAddress, got {:?}", s));
        };
        let chain_id = chain_id
            .parse()
            .map_err(|_| format!("invalid chain id {:?}", chain_id))?;
        if rpc_url.is_empty() || inbox_address.is_empty() {
            return Err(format!("empty rpc url or inbox address in {:?}", s));
        }
        Ok(Self {
            chain_id,
            rpc_url: rpc_url.to_string(),
            inbox_address: inbox_address.to_ascii_lowercase(),
        })
    }
}

#[derive(Debug, Clone)]
pub struct AggregatorConfig {
    pub port: u16,
    /// Identity allowed to call privileged methods.
    pub address: Option<String>,
    pub auth_enabled: bool,
    pub token_expiration: Duration,
    pub chains: Vec<ChainEndpoint>,
    pub poll_interval: Duration,
    pub aggregator_operator_set_id: u32,
    pub executor_operator_set_ids: Vec<u32>,
    /// Signer the verifier re-signs challenges with. Required with auth.
    pub signer: Option<SignerConfig>,
}

impl AggregatorConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let auth_enabled = parse_bool(&lookup, "AGGREGATOR_AUTH_ENABLED")?;
        let signer = if auth_enabled || has_signer(&lookup, "AGGREGATOR") {
            Some(SignerConfig::from_lookup("AGGREGATOR", &lookup)?)
        } else {
            None
        };

        let config = Self {
            port: parse_or(&lookup, "AGGREGATOR_PORT", DEFAULT_AGGREGATOR_PORT)?,
            address: non_empty(&lookup, "AGGREGATOR_ADDRESS"),
            auth_enabled,
            token_expiration: Duration::from_secs(parse_or(
                &lookup,
                "AGGREGATOR_TOKEN_EXPIRATION_SECS",
                DEFAULT_TOKEN_EXPIRATION_SECS,
            )?),
            chains: parse_list(&lookup, "AGGREGATOR_CHAINS")?,
            poll_interval: Duration::from_millis(parse_or(
                &lookup,
                "AGGREGATOR_POLL_INTERVAL_MS",
                DEFAULT_POLL_INTERVAL_MS,
            )?),
            aggregator_operator_set_id: parse_or(&lookup, "AGGREGATOR_OPERATOR_SET_ID", 0)?,
            executor_operator_set_ids: match non_empty(&lookup, "AGGREGATOR_EXECUTOR_OPERATOR_SET_IDS") {
                Some(_) => parse_list(&lookup, "AGGREGATOR_EXECUTOR_OPERATOR_SET_IDS")?,
                None => vec![1],
            },
            signer,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.auth_enabled && self.address.is_none() {
            return Err(ConfigError::Missing("AGGREGATOR_ADDRESS".to_string()));
        }
        if self.token_expiration.is_zero() {
            return Err(ConfigError::Invalid {
                name: "AGGREGATOR_TOKEN_EXPIRATION_SECS".to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.chains.is_empty() {
            warn!("AGGREGATOR_CHAINS is empty; registrations will be rejected");
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    pub port: u16,
    /// Defaults to the signer's address when unset.
    pub operator_address: Option<String>,
    pub auth_enabled: bool,
    pub token_expiration: Duration,
    /// `(avs_address, url)` pairs.
    pub performers: Vec<(String, String)>,
    pub signer: SignerConfig,
}

impl ExecutorConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let performers = match non_empty(&lookup, "EXECUTOR_PERFORMERS") {
            Some(raw) => raw
                .split(',')
                .filter(|entry| !entry.trim().is_empty())
                .map(|entry| {
                    let (avs, url) = entry.split_once('=').ok_or_else(|| ConfigError::Invalid {
                        name: "EXECUTOR_PERFORMERS".to_string(),
                        reason: format!("expected avsAddress=url, got {:?}", entry),
                    })?;
                    Ok((avs.trim().to_ascii_lowercase(), url.trim().to_string()))
                })
                .collect::<Result<Vec<_>, ConfigError>>()?,
            None => Vec::new(),
        };

        let config = Self {
            port: parse_or(&lookup, "EXECUTOR_PORT", DEFAULT_EXECUTOR_PORT)?,
            operator_address: non_empty(&lookup, "EXECUTOR_OPERATOR_ADDRESS"),
            auth_enabled: parse_bool(&lookup, "EXECUTOR_AUTH_ENABLED")?,
            token_expiration: Duration::from_secs(parse_or(
                &lookup,
                "EXECUTOR_TOKEN_EXPIRATION_SECS",
                DEFAULT_TOKEN_EXPIRATION_SECS,
            )?),
            performers,
            signer: SignerConfig::from_lookup("EXECUTOR", &lookup)?,
        };
        if config.token_expiration.is_zero() {
            return Err(ConfigError::Invalid {
                name: "EXECUTOR_TOKEN_EXPIRATION_SECS".to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }
        Ok(config)
    }
}

fn non_empty<F>(lookup: &F, name: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(name)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn has_signer<F>(lookup: &F, prefix: &str) -> bool
where
    F: Fn(&str) -> Option<String>,
{
    non_empty(lookup, &format!("{}_PRIVATE_KEY", prefix)).is_some()
        || non_empty(lookup, &format!("{}_REMOTE_SIGNER_URL", prefix)).is_some()
}

fn parse_or<F, T>(lookup: &F, name: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match non_empty(lookup, name) {
        Some(value) => value.parse().map_err(|e: T::Err| ConfigError::Invalid {
            name: name.to_string(),
            reason: e.to_string(),
        }),
        None => Ok(default),
    }
}

fn parse_bool<F>(lookup: &F, name: &str) -> Result<bool, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match non_empty(lookup, name).map(|v| v.to_ascii_lowercase()) {
        None => Ok(false),
        Some(v) if v == "true" || v == "1" => Ok(true),
        Some(v) if v == "false" || v == "0" => Ok(false),
        Some(v) => Err(ConfigError::Invalid {
            name: name.to_string(),
            reason: format!("expected true or false, got {:?}", v),
        }),
    }
}

/// Comma separated list; empty entries are skipped.
fn parse_list<F, T>(lookup: &F, name: &str) -> Result<Vec<T>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let Some(raw) = non_empty(lookup, name) else {
        return Ok(Vec::new());
    };
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            entry.parse().map_err(|e: T::Err| ConfigError::Invalid {
                name: name.to_string(),
                reason: e.to_string(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const KEY: &str = "0x59c6995e998f97a5a0044966f0945389dc9e86dae88c7a8412f4603b6b78690d";

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_aggregator_defaults() {
        let config = AggregatorConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.port, DEFAULT_AGGREGATOR_PORT);
        assert!(!config.auth_enabled);
        assert_eq!(config.token_expiration, Duration::from_secs(300));
        assert_eq!(config.poll_interval, Duration::from_millis(2000));
        assert!(config.chains.is_empty());
        assert_eq!(config.executor_operator_set_ids, vec![1]);
        assert!(config.signer.is_none());
    }

    #[test]
    fn test_aggregator_chains_and_auth() {
        let config = AggregatorConfig::from_lookup(lookup(&[
            ("AGGREGATOR_AUTH_ENABLED", "true"),
            ("AGGREGATOR_ADDRESS", "0x70997970C51812dc3A010C7d01b50e0d17dc79C8"),
            ("AGGREGATOR_PRIVATE_KEY", KEY),
            (
                "AGGREGATOR_CHAINS",
                "1=http://l1:8545=0xAA, 31337=http://anvil:8545=0xbb",
            ),
            ("AGGREGATOR_EXECUTOR_OPERATOR_SET_IDS", "2,3"),
        ]))
        .unwrap();

        assert!(config.auth_enabled);
        assert_eq!(config.chains.len(), 2);
        assert_eq!(config.chains[0].inbox_address, "0xaa");
        assert_eq!(config.chains[1].chain_id, 31337);
        assert_eq!(config.executor_operator_set_ids, vec![2, 3]);

        let signer = config.signer.unwrap().build().unwrap();
        assert_eq!(
            signer.from_address().unwrap(),
            "0x70997970c51812dc3a010c7d01b50e0d17dc79c8"
        );
    }

    #[test]
    fn test_auth_requires_address_and_signer() {
        assert!(matches!(
            AggregatorConfig::from_lookup(lookup(&[("AGGREGATOR_AUTH_ENABLED", "true")])),
            Err(ConfigError::Missing(_))
        ));
        assert!(matches!(
            AggregatorConfig::from_lookup(lookup(&[
                ("AGGREGATOR_AUTH_ENABLED", "true"),
                ("AGGREGATOR_PRIVATE_KEY", KEY),
            ])),
            Err(ConfigError::Missing(name)) if name == "AGGREGATOR_ADDRESS"
        ));
    }

    #[test]
    fn test_invalid_values() {
        assert!(matches!(
            AggregatorConfig::from_lookup(lookup(&[("AGGREGATOR_PORT", "http")])),
            Err(ConfigError::Invalid { .. })
        ));
        assert!(matches!(
            AggregatorConfig::from_lookup(lookup(&[("AGGREGATOR_AUTH_ENABLED", "yes please")])),
            Err(ConfigError::Invalid { .. })
        ));
        assert!(matches!(
            AggregatorConfig::from_lookup(lookup(&[("AGGREGATOR_CHAINS", "1=http://x")])),
            Err(ConfigError::Invalid { .. })
        ));
    }

    #[test]
    fn test_remote_signer_config() {
        let config = SignerConfig::from_lookup(
            "EXECUTOR",
            lookup(&[
                ("EXECUTOR_REMOTE_SIGNER_URL", "http://signer:9000"),
                ("EXECUTOR_REMOTE_SIGNER_PUBLIC_KEY", "0x04aa"),
                ("EXECUTOR_REMOTE_SIGNER_TIMEOUT_SECS", "5"),
            ]),
        )
        .unwrap();
        assert!(config.is_remote());
        match &config.source {
            SignerSource::Remote { config, public_key } => {
                assert_eq!(config.timeout, Duration::from_secs(5));
                assert_eq!(public_key, "0x04aa");
            }
            SignerSource::Local { .. } => panic!("expected remote signer"),
        }
    }

    #[test]
    fn test_remote_bn254_rejected_at_build() {
        let config = SignerConfig::from_lookup(
            "EXECUTOR",
            lookup(&[
                ("EXECUTOR_SIGNER_CURVE", "bn254"),
                ("EXECUTOR_REMOTE_SIGNER_URL", "http://signer:9000"),
                ("EXECUTOR_REMOTE_SIGNER_PUBLIC_KEY", "0x04aa"),
            ]),
        )
        .unwrap();
        assert!(matches!(
            config.build(),
            Err(ConfigError::Signer(SignerError::UnsupportedCurve { .. }))
        ));
    }

    #[test]
    fn test_half_configured_mtls_rejected() {
        let result = SignerConfig::from_lookup(
            "EXECUTOR",
            lookup(&[
                ("EXECUTOR_REMOTE_SIGNER_URL", "https://signer:9000"),
                ("EXECUTOR_REMOTE_SIGNER_PUBLIC_KEY", "0x04aa"),
                ("EXECUTOR_REMOTE_SIGNER_CLIENT_CERT", "/etc/client.pem"),
            ]),
        );
        assert!(matches!(result, Err(ConfigError::RemoteSigner(_))));
    }

    #[test]
    fn test_private_key_not_in_debug_output() {
        let config = SignerConfig::from_lookup("EXECUTOR", lookup(&[("EXECUTOR_PRIVATE_KEY", KEY)]))
            .unwrap();
        assert!(!format!("{:?}", config).contains("59c6995e"));
    }

    #[test]
    fn test_executor_performers() {
        let config = ExecutorConfig::from_lookup(lookup(&[
            ("EXECUTOR_PRIVATE_KEY", KEY),
            ("EXECUTOR_PERFORMERS", "0xAVS=http://performer:8080/task,"),
        ]))
        .unwrap();
        assert_eq!(config.port, DEFAULT_EXECUTOR_PORT);
        assert_eq!(
            config.performers,
            vec![("0xavs".to_string(), "http://performer:8080/task".to_string())]
        );

        assert!(matches!(
            ExecutorConfig::from_lookup(lookup(&[])),
            Err(ConfigError::Missing(_))
        ));
    }
}
