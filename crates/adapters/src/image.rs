// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP adapter for an image-generation endpoint.

use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use mesh_core::TaskInput;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;

use crate::executor::{ExecutorError, TaskExecutor, TaskOutput};

#[derive(Deserialize)]
struct ImageResponse {
    /// Base64-encoded image bytes
    image: String,
}

/// Sends IMAGE_GENERATE prompts to a generation service over HTTP.
pub struct ImageExecutor {
    client: reqwest::Client,
    endpoint: String,
}

impl ImageExecutor {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(300))
                .build()
                .unwrap_or_default(),
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait]
impl TaskExecutor for ImageExecutor {
    async fn execute(
        &self,
        input: &TaskInput,
        cancel: &CancellationToken,
    ) -> Result<TaskOutput, ExecutorError> {
        let (prompt, width, height) = match input {
            TaskInput::ImageGenerate { prompt, width, height } => {
                (prompt, width.unwrap_or(512), height.unwrap_or(512))
            }
            other => return Err(ExecutorError::UnsupportedKind(other.kind())),
        };

        let request = self
            .client
            .post(format!("{}/api/images", self.endpoint))
            .json(&serde_json::json!({ "prompt": prompt, "width": width, "height": height }))
            .send();

        let response = tokio::select! {
            result = request => result.map_err(|e| ExecutorError::Backend(format!("image: {e}")))?,
            _ = cancel.cancelled() => return Err(ExecutorError::Cancelled),
        };
        if !response.status().is_success() {
            return Err(ExecutorError::Backend(format!("image: HTTP {}", response.status())));
        }
        let body: ImageResponse = response
            .json()
            .await
            .map_err(|e| ExecutorError::Backend(format!("image decode: {e}")))?;
        let bytes = STANDARD
            .decode(body.image.as_bytes())
            .map_err(|e| ExecutorError::Backend(format!("image payload: {e}")))?;
        Ok(TaskOutput { bytes, exit_code: None })
    }
}
