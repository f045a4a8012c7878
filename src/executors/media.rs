//! `image` and `video` nodes.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;

use crate::{
    executors::{
        ExecutorInput, ExecutorOutput, NodeExecutor, NodeFailure, kind_mismatch,
        providers::{ImageProvider, ImageRequest, MediaAsset, VideoProvider, VideoRequest},
    },
    flow::{NodeKind, NodeType},
};

fn asset_output(
    asset: MediaAsset,
    prompt: String,
) -> ExecutorOutput {
    ExecutorOutput::new(json!({ "url": asset.url, "prompt": prompt })).with_sparks(asset.sparks)
}

fn require_prompt(
    input: &ExecutorInput,
    prompt: &str,
) -> Result<String, NodeFailure> {
    let prompt = input.resolve(prompt)?;
    if prompt.trim().is_empty() {
        return Err(NodeFailure::InvalidInput(format!("{} node '{}' resolved to an empty prompt", input.node.node_type(), input.node.id)));
    }
    Ok(prompt)
}

pub struct ImageExecutor {
    provider: Arc<dyn ImageProvider>,
}

impl ImageExecutor {
    pub fn new(provider: Arc<dyn ImageProvider>) -> Self {
        Self {
            provider,
        }
    }
}

#[async_trait]
impl NodeExecutor for ImageExecutor {
    fn node_type(&self) -> NodeType {
        NodeType::Image
    }

    async fn execute(
        &self,
        input: ExecutorInput,
    ) -> Result<ExecutorOutput, NodeFailure> {
        let NodeKind::Image(config) = &input.node.kind else {
            return Err(kind_mismatch(NodeType::Image, &input.node));
        };

        let prompt = require_prompt(&input, &config.prompt)?;
        let asset = self
            .provider
            .generate_image(ImageRequest {
                prompt: prompt.clone(),
                size: config.size.clone(),
                style: input.resolve_opt(config.style.as_deref())?,
            })
            .await?;
        Ok(asset_output(asset, prompt))
    }
}

pub struct VideoExecutor {
    provider: Arc<dyn VideoProvider>,
}

impl VideoExecutor {
    pub fn new(provider: Arc<dyn VideoProvider>) -> Self {
        Self {
            provider,
        }
    }
}

#[async_trait]
impl NodeExecutor for VideoExecutor {
    fn node_type(&self) -> NodeType {
        NodeType::Video
    }

    async fn execute(
        &self,
        input: ExecutorInput,
    ) -> Result<ExecutorOutput, NodeFailure> {
        let NodeKind::Video(config) = &input.node.kind else {
            return Err(kind_mismatch(NodeType::Video, &input.node));
        };

        let prompt = require_prompt(&input, &config.prompt)?;
        let asset = self
            .provider
            .generate_video(VideoRequest {
                prompt: prompt.clone(),
                duration_secs: config.duration_secs,
                aspect_ratio: config.aspect_ratio.clone(),
            })
            .await?;
        Ok(asset_output(asset, prompt))
    }
}
