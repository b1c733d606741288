//! Core of an AVS aggregator and executor.
//!
//! ```text
//!        challenge token / signed request
//! client ───────────────────────────────▶ rpc ──▶ aggregator ──▶ registry ──▶ execution managers
//!                                           │                                      │
//!                                           └────▶ executor ──▶ performers         └─▶ chain listeners
//! ```
//!
//! - [`auth`]: single-use challenge tokens and signature verification
//! - [`signer`]: local BN254/ECDSA keys and the remote signer adapter
//! - [`web3signer`]: HTTP client for a Web3Signer-compatible service
//! - [`aggregator`]: AVS registry and per-AVS execution managers
//! - [`executor`]: task submission to performers and result signing
//! - [`chain`]: JSON-RPC chain client, inbox listener and contract lookups
//! - [`rpc`]: axum routes and reqwest clients for both services
//! - [`config`]: environment configuration for the binaries

pub mod aggregator;
pub mod auth;
pub mod chain;
pub mod config;
pub mod executor;
pub mod jsonrpc;
pub mod rpc;
pub(crate) mod serde_hex;
pub mod signer;
pub mod web3signer;
