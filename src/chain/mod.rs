//! Chain collaborators consumed by execution managers.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐     ┌──────────────────────┐     ┌──────────────────┐
//! │ ChainClient │────▶│ JsonRpcChainListener │────▶│ mpsc<InboxEvent> │
//! │ (JSON-RPC)  │     │   (ChainListener)    │     │  (bounded queue) │
//! └─────────────┘     └──────────────────────┘     └──────────────────┘
//!
//! ┌──────────────────────┐
//! │ StaticContractCaller │──▶ AvsConfig
//! │   (ContractCaller)   │
//! └──────────────────────┘
//! ```
//!
//! Listeners only need a start/cancel contract: they run until their
//! cancellation token fires.

pub mod caller;
pub mod client;
pub mod error;
pub mod listener;
pub mod types;

pub use caller::{ContractCaller, StaticContractCaller};
pub use client::ChainClient;
pub use error::ChainError;
pub use listener::{ChainListener, JsonRpcChainListener, DEFAULT_POLL_INTERVAL};
pub use types::{AvsConfig, InboxEvent};
