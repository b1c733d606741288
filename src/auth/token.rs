//! Single-use, expiring challenge tokens bound to one identity.

use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::auth::error::AuthError;

/// Default lifetime of an issued token.
pub const DEFAULT_TOKEN_EXPIRATION: Duration = Duration::from_secs(300);

/// Interval of the expired-token sweep.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

type TokenMap = Arc<Mutex<HashMap<String, ChallengeTokenEntry>>>;

/// An issued challenge token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChallengeTokenEntry {
    pub token: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub used: bool,
}

impl ChallengeTokenEntry {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }
}

/// Issues and consumes challenge tokens for a single authorized entity.
///
/// A background task removes expired entries every sweep interval. It holds
/// only a weak reference to the token map and stops when the manager drops.
pub struct ChallengeTokenManager {
    tokens: TokenMap,
    authorized_entity: String,
    expiration: chrono::Duration,
    sweeper: CancellationToken,
}

impl ChallengeTokenManager {
    pub fn new(authorized_entity: &str, expiration: Duration) -> Result<Self, AuthError> {
        Self::with_sweep_interval(authorized_entity, expiration, DEFAULT_SWEEP_INTERVAL)
    }

    pub fn with_sweep_interval(
        authorized_entity: &str,
        expiration: Duration,
        sweep_interval: Duration,
    ) -> Result<Self, AuthError> {
        let authorized_entity = normalize_entity(authorized_entity);
        if authorized_entity.is_empty() {
            return Err(AuthError::InvalidConfiguration(
                "authorized entity must not be empty".to_string(),
            ));
        }
        if expiration.is_zero() {
            return Err(AuthError::InvalidConfiguration(
                "token expiration must be greater than zero".to_string(),
            ));
        }
        let expiration = chrono::Duration::from_std(expiration)
            .map_err(|e| AuthError::InvalidConfiguration(format!("token expiration: {}", e)))?;

        let tokens: TokenMap = Arc::new(Mutex::new(HashMap::new()));
        let sweeper = CancellationToken::new();
        spawn_sweeper(Arc::downgrade(&tokens), sweep_interval, sweeper.clone());

        info!(
            "Challenge token manager bound to {} (expiration {}s)",
            authorized_entity,
            expiration.num_seconds()
        );

        Ok(Self {
            tokens,
            authorized_entity,
            expiration,
            sweeper,
        })
    }

    pub fn authorized_entity(&self) -> &str {
        &self.authorized_entity
    }

    /// Issue a fresh token for `entity`.
    pub async fn generate_challenge_token(
        &self,
        entity: &str,
    ) -> Result<ChallengeTokenEntry, AuthError> {
        let entity = normalize_entity(entity);
        if entity != self.authorized_entity {
            warn!("Challenge token requested for unauthorized entity {}", entity);
            return Err(AuthError::UnauthorizedEntity { entity });
        }

        let created_at = Utc::now();
        let mut tokens = self.tokens.lock().await;
        let token = loop {
            let candidate = new_token();
            if !tokens.contains_key(&candidate) {
                break candidate;
            }
        };
        let entry = ChallengeTokenEntry {
            token: token.clone(),
            created_at,
            expires_at: created_at + self.expiration,
            used: false,
        };
        tokens.insert(token, entry.clone());
        drop(tokens);

        debug!("Issued challenge token expiring at {}", entry.expires_at);
        Ok(entry)
    }

    /// Mark `token` as used. Succeeds at most once per token.
    pub async fn use_challenge_token(&self, token: &str) -> Result<(), AuthError> {
        let now = Utc::now();
        let mut tokens = self.tokens.lock().await;
        let entry = tokens.get_mut(token).ok_or(AuthError::TokenNotFound)?;
        if entry.used {
            return Err(AuthError::TokenAlreadyUsed);
        }
        if entry.is_expired_at(now) {
            return Err(AuthError::TokenExpired {
                expires_at: entry.expires_at,
            });
        }
        entry.used = true;
        Ok(())
    }

    /// Remove every expired entry, used or not. Returns how many were removed.
    pub async fn sweep_expired(&self) -> usize {
        remove_expired(&self.tokens, Utc::now()).await
    }

    pub async fn len(&self) -> usize {
        self.tokens.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl Drop for ChallengeTokenManager {
    fn drop(&mut self) {
        self.sweeper.cancel();
    }
}

impl std::fmt::Debug for ChallengeTokenManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChallengeTokenManager")
            .field("authorized_entity", &self.authorized_entity)
            .field("expiration", &self.expiration)
            .finish_non_exhaustive()
    }
}

pub(crate) fn normalize_entity(entity: &str) -> String {
    entity.trim().to_ascii_lowercase()
}

fn new_token() -> String {
    let id = Uuid::new_v4();
    hex::encode(Sha256::digest(id.as_bytes()))
}

async fn remove_expired(
    tokens: &Mutex<HashMap<String, ChallengeTokenEntry>>,
    now: DateTime<Utc>,
) -> usize {
    let mut tokens = tokens.lock().await;
    let before = tokens.len();
    tokens.retain(|_, entry| !entry.is_expired_at(now));
    before - tokens.len()
}

fn spawn_sweeper(
    tokens: Weak<Mutex<HashMap<String, ChallengeTokenEntry>>>,
    interval: Duration,
    cancel: CancellationToken,
) {
    let handle = match tokio::runtime::Handle::try_current() {
        Ok(handle) => handle,
        Err(_) => {
            warn!("No tokio runtime; expired challenge tokens will not be swept automatically");
            return;
        }
    };

    handle.spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        // First tick completes immediately.
        ticker.tick().await;
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    let Some(tokens) = tokens.upgrade() else { break };
                    let removed = remove_expired(&tokens, Utc::now()).await;
                    if removed > 0 {
                        debug!("Swept {} expired challenge tokens", removed);
                    }
                }
            }
        }
        debug!("Challenge token sweeper stopped");
    });
}
