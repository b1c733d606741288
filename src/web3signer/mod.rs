//! Client for an external Web3Signer-compatible signing service.
//!
//! ```text
//! ┌──────────────┐  JSON-RPC (eth_accounts, eth_sign, ...)  ┌──────────────┐
//! │ RemoteSigner │ ───────────────────────────────────────▶ │  Web3Signer  │
//! │              │  REST POST /api/v1/eth1/sign/{id}        │   service    │
//! └──────────────┘ ───────────────────────────────────────▶ └──────────────┘
//! ```
//!
//! Private keys never leave the service; this client only moves payloads and
//! signatures. HTTPS endpoints may use a custom CA bundle, a mutual-TLS client
//! identity, and an explicit opt-in to skip verification.

pub mod client;
pub mod error;
pub mod tls;
pub mod types;

pub use client::Web3SignerClient;
pub use error::Web3SignerError;
pub use tls::{TlsConfig, Web3SignerConfig, DEFAULT_TIMEOUT};
pub use types::{RawSignRequest, TransactionRequest};
