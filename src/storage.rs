//! Off-chain content staging
//!
//! Content is published in two phases. `stage_content` uploads the metadata
//! document and image and returns a staging handle; `resolve_uri` binds the
//! staged content to the item mint and returns the permanent URI that goes
//! into the on-chain metadata. The mint does not exist yet when
//! `resolve_uri` runs; only its address is needed.

use std::time::Duration;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use solana_sdk::pubkey::Pubkey;
use thiserror::Error;
use tracing::debug;

use crate::config::StorageConfig;
use crate::errors::MarketError;
use crate::metrics::metrics;
use crate::types::ImageAsset;

/// Metadata document stored next to the image
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OffChainMetadata {
    pub name: String,
    pub symbol: String,
    pub description: String,
    /// Filename of the image among `files`
    pub image: String,
}

/// A file accepted by the staging service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StagedFile {
    pub name: String,
    #[serde(rename = "type")]
    pub content_type: String,
}

/// Handle returned by the first phase
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StagedContent {
    pub staging_id: String,
    pub files: Vec<StagedFile>,
}

/// Storage service failure
#[derive(Error, Debug)]
pub enum StorageError {
    /// Connection, TLS or timeout failure
    #[error("transport error: {0}")]
    Transport(String),

    /// Service answered with a non-success status
    #[error("service returned {status}: {body}")]
    Status { status: u16, body: String },

    /// Response body did not match the expected shape
    #[error("malformed response: {0}")]
    Decode(String),
}

impl StorageError {
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(_) => true,
            Self::Status { status, .. } => *status >= 500 || *status == 429,
            Self::Decode(_) => false,
        }
    }

    pub fn category(&self) -> &'static str {
        match self {
            Self::Transport(_) => "transport",
            Self::Status { .. } => "status",
            Self::Decode(_) => "decode",
        }
    }

    /// Attach the failing phase and surface as a pipeline error
    ///
    /// Counted in `storage_failures_total` by phase and kind. Only transient
    /// failures stay retryable.
    pub fn at_stage(self, stage: &'static str) -> MarketError {
        let retryable = self.is_retryable();
        metrics()
            .storage_failures
            .with_label_values(&[stage, self.category()])
            .inc();
        tracing::warn!(stage, category = self.category(), retryable, error = %self, "content staging failed");
        MarketError::StorageUnavailable {
            stage,
            reason: self.to_string(),
            retryable,
        }
    }
}

/// Two-phase content publisher
#[async_trait]
pub trait ContentStager: Send + Sync {
    async fn stage_content(
        &self,
        metadata: &OffChainMetadata,
        image: &ImageAsset,
    ) -> Result<StagedContent, StorageError>;

    async fn resolve_uri(
        &self,
        staged: &StagedContent,
        target_mint: &Pubkey,
    ) -> Result<String, StorageError>;
}

#[derive(Serialize)]
struct StageRequest<'a> {
    metadata: &'a OffChainMetadata,
    image: EncodedImage<'a>,
}

#[derive(Serialize)]
struct EncodedImage<'a> {
    filename: &'a str,
    content_type: &'a str,
    /// base64
    data: String,
}

#[derive(Serialize)]
struct ResolveRequest<'a> {
    staging_id: &'a str,
    mint: String,
    files: &'a [StagedFile],
}

#[derive(Deserialize)]
struct ResolveResponse {
    uri: String,
}

/// [`ContentStager`] over a JSON HTTP service
///
/// `POST {base}/stage` takes the document and base64 image and answers a
/// [`StagedContent`]. `POST {base}/resolve` takes the staging id, the mint
/// and the staged files and answers `{"uri": ...}`.
#[derive(Clone)]
pub struct HttpContentStager {
    http: Client,
    base_url: String,
}

impl HttpContentStager {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, StorageError> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| StorageError::Transport(e.to_string()))?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(config: &StorageConfig) -> Result<Self, StorageError> {
        Self::new(
            config.base_url.clone(),
            Duration::from_secs(config.timeout_secs),
        )
    }

    async fn post<B: Serialize, R: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<R, StorageError> {
        let url = format!("{}/{}", self.base_url, path);
        debug!(url = %url, "storage request");

        let resp = self
            .http
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| StorageError::Transport(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(StorageError::Status {
                status: status.as_u16(),
                body,
            });
        }
        resp.json::<R>()
            .await
            .map_err(|e| StorageError::Decode(e.to_string()))
    }
}

#[async_trait]
impl ContentStager for HttpContentStager {
    async fn stage_content(
        &self,
        metadata: &OffChainMetadata,
        image: &ImageAsset,
    ) -> Result<StagedContent, StorageError> {
        let request = StageRequest {
            metadata,
            image: EncodedImage {
                filename: &image.filename,
                content_type: &image.content_type,
                data: STANDARD.encode(&image.bytes),
            },
        };
        let staged: StagedContent = self.post("stage", &request).await?;
        if staged.staging_id.is_empty() {
            return Err(StorageError::Decode("empty staging_id".into()));
        }
        Ok(staged)
    }

    async fn resolve_uri(
        &self,
        staged: &StagedContent,
        target_mint: &Pubkey,
    ) -> Result<String, StorageError> {
        let request = ResolveRequest {
            staging_id: &staged.staging_id,
            mint: target_mint.to_string(),
            files: &staged.files,
        };
        let resp: ResolveResponse = self.post("resolve", &request).await?;
        if resp.uri.is_empty() {
            return Err(StorageError::Decode("empty uri".into()));
        }
        Ok(resp.uri)
    }
}
