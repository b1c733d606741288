//! Error types for the executor.

use thiserror::Error;

use crate::signer::SignerError;

#[derive(Debug, Error)]
pub enum ExecutorError {
    #[error("No performer registered for AVS {0}")]
    PerformerNotFound(String),

    #[error("Invalid task: {0}")]
    InvalidTask(String),

    #[error("Performer at {endpoint} returned HTTP {status}: {body}")]
    PerformerHttp {
        endpoint: String,
        status: u16,
        body: String,
    },

    #[error("Performer request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Invalid performer response: {0}")]
    InvalidResponse(String),

    #[error("Failed to sign task result: {0}")]
    Signer(#[from] SignerError),
}
