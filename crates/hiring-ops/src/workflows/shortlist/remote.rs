use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use super::candidate::Candidate;
use super::scoring::{ScoredCandidate, SlateResponse};
use crate::config::ScoringApiConfig;

/// Failure talking to the scoring/selection API. The session is never touched when one of
/// these is returned, so the same action can simply be retried.
#[derive(Debug, thiserror::Error)]
pub enum RemoteCallError {
    #[error("request to scoring API failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("scoring API answered {status}: {message}")]
    Status { status: u16, message: String },
    #[error("scoring API response could not be decoded: {0}")]
    Decode(#[source] serde_json::Error),
    #[error("scoring API broke its response contract: {0}")]
    ContractViolation(String),
}

/// Remote per-role scoring of a candidate batch.
#[async_trait]
pub trait CandidateScorer: Send + Sync {
    /// Must answer one entry per candidate, in input order.
    async fn score(&self, candidates: &[Candidate]) -> Result<Vec<ScoredCandidate>, RemoteCallError>;
}

/// Remote team-of-five slate selection.
#[async_trait]
pub trait SlateSelector: Send + Sync {
    async fn select(&self, candidates: &[Candidate]) -> Result<SlateResponse, RemoteCallError>;
}

/// JSON-over-HTTP client for the scoring service (`POST /score`, `POST /select`).
#[derive(Clone)]
pub struct HttpCandidateApi {
    client: Client,
    base_url: String,
}

impl HttpCandidateApi {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, RemoteCallError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(config: &ScoringApiConfig) -> Result<Self, RemoteCallError> {
        Self::new(config.base_url.clone(), config.timeout)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn post_json<T: DeserializeOwned>(
        &self,
        path: &str,
        candidates: &[Candidate],
    ) -> Result<T, RemoteCallError> {
        let url = format!("{}/{}", self.base_url, path);
        debug!(%url, candidates = candidates.len(), "calling scoring API");

        let response = self.client.post(&url).json(candidates).send().await?;
        let status = response.status();
        let body = response.bytes().await?;

        if !status.is_success() {
            let message = String::from_utf8_lossy(&body).trim().to_string();
            warn!(%url, status = status.as_u16(), "scoring API returned an error status");
            return Err(RemoteCallError::Status {
                status: status.as_u16(),
                message,
            });
        }

        serde_json::from_slice(&body).map_err(RemoteCallError::Decode)
    }
}

#[async_trait]
impl CandidateScorer for HttpCandidateApi {
    async fn score(&self, candidates: &[Candidate]) -> Result<Vec<ScoredCandidate>, RemoteCallError> {
        self.post_json("score", candidates).await
    }
}

#[async_trait]
impl SlateSelector for HttpCandidateApi {
    async fn select(&self, candidates: &[Candidate]) -> Result<SlateResponse, RemoteCallError> {
        self.post_json("select", candidates).await
    }
}
