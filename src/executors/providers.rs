//! Capability interfaces the host implements for the AI and notification
//! node types.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::flow::config::NotificationChannel;

/// Error reported by a capability provider.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{message}")]
pub struct ProviderError {
    pub message: String,
    /// whether the node may be attempted again
    pub retryable: bool,
}

impl ProviderError {
    /// A failure worth retrying (rate limits, unavailable upstream).
    pub fn transient(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            retryable: true,
        }
    }

    pub fn permanent(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            retryable: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmRequest {
    pub prompt: String,
    pub system: Option<String>,
    pub model: Option<String>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Completion {
    pub text: String,
    /// model that answered, when the provider reports it
    pub model: Option<String>,
    /// sparks actually spent, when the provider meters them
    pub sparks: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageRequest {
    pub prompt: String,
    pub size: Option<String>,
    pub style: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoRequest {
    pub prompt: String,
    pub duration_secs: Option<u32>,
    pub aspect_ratio: Option<String>,
}

/// A generated image or video.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaAsset {
    pub url: String,
    pub sparks: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrandReview {
    pub content: String,
    pub guidelines: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrandVerdict {
    pub approved: bool,
    /// 0.0 (off brand) to 1.0 (on brand)
    pub score: f32,
    pub issues: Vec<String>,
    pub sparks: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub run_id: String,
    pub channel: NotificationChannel,
    pub recipient: Option<String>,
    pub subject: Option<String>,
    pub message: String,
}

#[async_trait]
pub trait LlmProvider: Send + Sync {
    async fn complete(
        &self,
        request: LlmRequest,
    ) -> Result<Completion, ProviderError>;
}

#[async_trait]
pub trait ImageProvider: Send + Sync {
    async fn generate_image(
        &self,
        request: ImageRequest,
    ) -> Result<MediaAsset, ProviderError>;
}

#[async_trait]
pub trait VideoProvider: Send + Sync {
    async fn generate_video(
        &self,
        request: VideoRequest,
    ) -> Result<MediaAsset, ProviderError>;
}

#[async_trait]
pub trait BrandGuardProvider: Send + Sync {
    async fn review(
        &self,
        review: BrandReview,
    ) -> Result<BrandVerdict, ProviderError>;
}

#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn send(
        &self,
        notification: Notification,
    ) -> Result<(), ProviderError>;
}
