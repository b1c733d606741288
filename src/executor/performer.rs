//! Task performers.

use async_trait::async_trait;
use log::debug;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::executor::error::ExecutorError;
use crate::rpc::types::SubmitTaskRequest;

/// Default timeout of a performer call.
pub const DEFAULT_PERFORMER_TIMEOUT: Duration = Duration::from_secs(30);

/// Runs tasks for one AVS.
#[async_trait]
pub trait Performer: Send + Sync {
    /// Where the performer lives, for listings and logs.
    fn endpoint(&self) -> &str;

    async fn perform(&self, task: &SubmitTaskRequest) -> Result<Vec<u8>, ExecutorError>;
}

/// Body returned by an HTTP performer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformResponse {
    #[serde(with = "crate::serde_hex")]
    pub output: Vec<u8>,
}

/// Performer reached over HTTP: the task is POSTed as JSON and the
/// response carries the hex encoded output.
#[derive(Debug, Clone)]
pub struct HttpPerformer {
    http: reqwest::Client,
    url: String,
}

impl HttpPerformer {
    pub fn new(url: &str) -> Result<Self, ExecutorError> {
        Self::with_timeout(url, DEFAULT_PERFORMER_TIMEOUT)
    }

    pub fn with_timeout(url: &str, timeout: Duration) -> Result<Self, ExecutorError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            url: url.to_string(),
        })
    }
}

#[async_trait]
impl Performer for HttpPerformer {
    fn endpoint(&self) -> &str {
        &self.url
    }

    async fn perform(&self, task: &SubmitTaskRequest) -> Result<Vec<u8>, ExecutorError> {
        debug!("Forwarding task {} to {}", task.task_id, self.url);
        let response = self.http.post(&self.url).json(task).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ExecutorError::PerformerHttp {
                endpoint: self.url.clone(),
                status: status.as_u16(),
                body,
            });
        }

        let body: PerformResponse = response
            .json()
            .await
            .map_err(|e| ExecutorError::InvalidResponse(e.to_string()))?;
        Ok(body.output)
    }
}
