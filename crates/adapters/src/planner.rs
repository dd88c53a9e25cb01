// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! External AI planner adapter.
//!
//! The engine's planner tries this adapter first and falls back to its
//! deterministic keyword planner on any failure.

use std::time::Duration;

use async_trait::async_trait;
use mesh_core::{Device, Plan};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PlannerError {
    #[error("planner unavailable: {0}")]
    Unavailable(String),

    #[error("planner returned an invalid plan: {0}")]
    InvalidPlan(String),
}

/// Turns a free-text request into a plan, given the current mesh view.
#[async_trait]
pub trait PlannerAdapter: Send + Sync {
    async fn plan(&self, text: &str, devices: &[Device]) -> Result<Plan, PlannerError>;
}

/// HTTP planner: posts the request and the device list, expects a plan back.
pub struct HttpPlanner {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpPlanner {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .unwrap_or_default(),
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait]
impl PlannerAdapter for HttpPlanner {
    async fn plan(&self, text: &str, devices: &[Device]) -> Result<Plan, PlannerError> {
        let response = self
            .client
            .post(format!("{}/api/plan", self.endpoint))
            .json(&serde_json::json!({ "request": text, "devices": devices }))
            .send()
            .await
            .map_err(|e| PlannerError::Unavailable(e.to_string()))?;
        if !response.status().is_success() {
            return Err(PlannerError::Unavailable(format!("HTTP {}", response.status())));
        }
        let mut plan: Plan = response
            .json()
            .await
            .map_err(|e| PlannerError::InvalidPlan(e.to_string()))?;
        plan.used_ai = true;
        Ok(plan)
    }
}
