//! Connection settings for the remote signing service, including TLS.

use log::warn;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::web3signer::error::Web3SignerError;

/// Default HTTP client timeout for remote signing calls.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// TLS settings, only honoured for `https://` base URLs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TlsConfig {
    /// PEM bundle of additional trusted CA certificates.
    pub ca_cert_path: Option<PathBuf>,
    /// PEM client certificate for mutual TLS.
    pub client_cert_path: Option<PathBuf>,
    /// PKCS#8 PEM private key matching `client_cert_path`.
    pub client_key_path: Option<PathBuf>,
    /// Accept any server certificate. Opt-in only.
    pub insecure_skip_verify: bool,
}

impl TlsConfig {
    pub fn is_empty(&self) -> bool {
        self.ca_cert_path.is_none()
            && self.client_cert_path.is_none()
            && self.client_key_path.is_none()
            && !self.insecure_skip_verify
    }

    /// Reject a client certificate without its key, or the reverse.
    pub fn validate(&self) -> Result<(), Web3SignerError> {
        match (&self.client_cert_path, &self.client_key_path) {
            (Some(_), None) => Err(Web3SignerError::Config(
                "client certificate configured without a client key".to_string(),
            )),
            (None, Some(_)) => Err(Web3SignerError::Config(
                "client key configured without a client certificate".to_string(),
            )),
            _ => Ok(()),
        }
    }

    /// Load and check the configured PEM material.
    pub(crate) fn load(&self) -> Result<LoadedTls, Web3SignerError> {
        self.validate()?;

        let ca_certs = match &self.ca_cert_path {
            Some(path) => {
                let bytes = read_pem_file(path)?;
                check_pem_tag(&bytes, path, "CERTIFICATE")?;
                Some(bytes)
            }
            None => None,
        };

        let identity = match (&self.client_cert_path, &self.client_key_path) {
            (Some(cert_path), Some(key_path)) => {
                let cert = read_pem_file(cert_path)?;
                check_pem_tag(&cert, cert_path, "CERTIFICATE")?;
                let key = read_pem_file(key_path)?;
                check_pem_tag(&key, key_path, "PRIVATE KEY")?;
                Some((cert, key))
            }
            _ => None,
        };

        Ok(LoadedTls {
            ca_certs,
            identity,
            insecure_skip_verify: self.insecure_skip_verify,
        })
    }
}

/// PEM material read from disk.
pub(crate) struct LoadedTls {
    pub ca_certs: Option<Vec<u8>>,
    pub identity: Option<(Vec<u8>, Vec<u8>)>,
    pub insecure_skip_verify: bool,
}

fn read_pem_file(path: &PathBuf) -> Result<Vec<u8>, Web3SignerError> {
    std::fs::read(path).map_err(|e| {
        Web3SignerError::Config(format!("failed to read {}: {}", path.display(), e))
    })
}

fn check_pem_tag(bytes: &[u8], path: &PathBuf, tag: &str) -> Result<(), Web3SignerError> {
    let blocks = pem::parse_many(bytes).map_err(|e| {
        Web3SignerError::Config(format!("malformed PEM in {}: {}", path.display(), e))
    })?;
    if blocks.is_empty() {
        return Err(Web3SignerError::Config(format!(
            "no PEM blocks found in {}",
            path.display()
        )));
    }
    if let Some(block) = blocks.iter().find(|b| b.tag() != tag) {
        return Err(Web3SignerError::Config(format!(
            "expected {} in {}, found {}",
            tag,
            path.display(),
            block.tag()
        )));
    }
    Ok(())
}

/// Settings for one remote signing service endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Web3SignerConfig {
    pub base_url: String,
    pub timeout: Duration,
    pub tls: TlsConfig,
}

impl Web3SignerConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout: DEFAULT_TIMEOUT,
            tls: TlsConfig::default(),
        }
    }

    pub fn is_https(&self) -> bool {
        self.base_url.to_ascii_lowercase().starts_with("https://")
    }

    pub fn validate(&self) -> Result<(), Web3SignerError> {
        let lower = self.base_url.to_ascii_lowercase();
        if !lower.starts_with("http://") && !lower.starts_with("https://") {
            return Err(Web3SignerError::Config(format!(
                "base URL must be http:// or https://, got {:?}",
                self.base_url
            )));
        }
        if self.timeout.is_zero() {
            return Err(Web3SignerError::Config(
                "timeout must be greater than zero".to_string(),
            ));
        }
        self.tls.validate()?;
        if !self.is_https() && !self.tls.is_empty() {
            warn!(
                "TLS settings ignored for plain HTTP remote signer at {}",
                self.base_url
            );
        }
        Ok(())
    }

    /// Read `<PREFIX>_REMOTE_SIGNER_*` variables. Returns `None` when no URL is set.
    pub fn from_env(prefix: &str) -> Result<Option<Self>, Web3SignerError> {
        Self::from_lookup(prefix, |name| env::var(name).ok())
    }

    /// [`Web3SignerConfig::from_env`] over an arbitrary variable source.
    pub fn from_lookup<F>(prefix: &str, lookup: F) -> Result<Option<Self>, Web3SignerError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| {
            lookup(&format!("{}_REMOTE_SIGNER_{}", prefix, name)).filter(|v| !v.is_empty())
        };

        let Some(base_url) = var("URL") else {
            return Ok(None);
        };

        let timeout = match var("TIMEOUT_SECS") {
            Some(secs) => Duration::from_secs(secs.parse().map_err(|_| {
                Web3SignerError::Config(format!("invalid timeout seconds: {:?}", secs))
            })?),
            None => DEFAULT_TIMEOUT,
        };

        let config = Self {
            base_url,
            timeout,
            tls: TlsConfig {
                ca_cert_path: var("CA_CERT").map(PathBuf::from),
                client_cert_path: var("CLIENT_CERT").map(PathBuf::from),
                client_key_path: var("CLIENT_KEY").map(PathBuf::from),
                insecure_skip_verify: var("INSECURE_SKIP_VERIFY")
                    .map(|v| v.eq_ignore_ascii_case("true") || v == "1")
                    .unwrap_or(false),
            },
        };
        config.validate()?;
        Ok(Some(config))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_half_configured_identity_rejected() {
        let cert_only = TlsConfig {
            client_cert_path: Some(PathBuf::from("/tmp/client.pem")),
            ..Default::default()
        };
        let key_only = TlsConfig {
            client_key_path: Some(PathBuf::from("/tmp/client.key")),
            ..Default::default()
        };
        assert!(matches!(cert_only.validate(), Err(Web3SignerError::Config(_))));
        assert!(matches!(key_only.validate(), Err(Web3SignerError::Config(_))));
        assert!(TlsConfig::default().validate().is_ok());
    }

    #[test]
    fn test_base_url_validation() {
        assert!(Web3SignerConfig::new("http://localhost:9000").validate().is_ok());
        assert!(Web3SignerConfig::new("https://signer:9000").is_https());
        assert!(Web3SignerConfig::new("ftp://signer").validate().is_err());

        let mut zero_timeout = Web3SignerConfig::new("http://localhost:9000");
        zero_timeout.timeout = Duration::ZERO;
        assert!(zero_timeout.validate().is_err());
    }

    #[test]
    fn test_missing_pem_file_is_config_error() {
        let tls = TlsConfig {
            ca_cert_path: Some(PathBuf::from("/nonexistent/ca.pem")),
            ..Default::default()
        };
        assert!(matches!(tls.load(), Err(Web3SignerError::Config(_))));
    }

    #[test]
    fn test_wrong_pem_tag_rejected() {
        let dir = std::env::temp_dir().join(format!("hourglass-tls-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("ca.pem");
        let block = pem::Pem::new("PRIVATE KEY", vec![1u8, 2, 3]);
        std::fs::write(&path, pem::encode(&block)).unwrap();

        let tls = TlsConfig {
            ca_cert_path: Some(path),
            ..Default::default()
        };
        let err = tls.load().err().unwrap();
        assert!(err.to_string().contains("expected CERTIFICATE"));

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
