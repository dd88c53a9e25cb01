// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP adapter for a local LLM runtime (ollama-style generate API).

use std::time::Duration;

use async_trait::async_trait;
use mesh_core::TaskInput;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::executor::{ExecutorError, TaskExecutor, TaskOutput};

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

/// Sends LLM_GENERATE prompts to a local runtime over HTTP.
pub struct LlmExecutor {
    client: reqwest::Client,
    endpoint: String,
    default_model: String,
}

impl LlmExecutor {
    pub fn new(endpoint: impl Into<String>, default_model: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(120))
                .build()
                .unwrap_or_default(),
            endpoint: endpoint.into(),
            default_model: default_model.into(),
        }
    }
}

#[async_trait]
impl TaskExecutor for LlmExecutor {
    async fn execute(
        &self,
        input: &TaskInput,
        cancel: &CancellationToken,
    ) -> Result<TaskOutput, ExecutorError> {
        let (prompt, model) = match input {
            TaskInput::LlmGenerate { prompt, model } => {
                (prompt, model.clone().unwrap_or_else(|| self.default_model.clone()))
            }
            other => return Err(ExecutorError::UnsupportedKind(other.kind())),
        };

        debug!(%model, "dispatching generate request");
        let request = self
            .client
            .post(format!("{}/api/generate", self.endpoint))
            .json(&serde_json::json!({ "model": model, "prompt": prompt, "stream": false }))
            .send();

        let response = tokio::select! {
            result = request => result.map_err(|e| ExecutorError::Backend(format!("llm: {e}")))?,
            _ = cancel.cancelled() => return Err(ExecutorError::Cancelled),
        };
        if !response.status().is_success() {
            return Err(ExecutorError::Backend(format!("llm: HTTP {}", response.status())));
        }
        let body: GenerateResponse = response
            .json()
            .await
            .map_err(|e| ExecutorError::Backend(format!("llm decode: {e}")))?;
        Ok(TaskOutput::text(body.response))
    }
}
