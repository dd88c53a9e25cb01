// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Request planning.
//!
//! Structured plans pass through untouched. Free text goes to the external
//! AI planner when one is configured; any failure lands on the
//! deterministic keyword planner, which never fails.

use std::sync::Arc;

use mesh_adapters::PlannerAdapter;
use mesh_core::{Device, Group, Plan, Policy, Task, TaskInput};
use tracing::{debug, warn};

/// Planner with an optional AI adapter and a deterministic fallback.
#[derive(Default)]
pub struct Planner {
    adapter: Option<Arc<dyn PlannerAdapter>>,
}

impl Planner {
    pub fn new(adapter: Option<Arc<dyn PlannerAdapter>>) -> Self {
        Self { adapter }
    }

    /// Build a plan from free text. Never fails.
    pub async fn from_text(&self, text: &str, devices: &[Device]) -> Plan {
        if let Some(adapter) = &self.adapter {
            match adapter.plan(text, devices).await {
                Ok(mut plan) if !plan.groups.is_empty() => {
                    plan.used_ai = true;
                    if plan.notes.is_empty() {
                        plan.notes = "planned by external AI planner".to_string();
                    }
                    return plan;
                }
                Ok(_) => {
                    debug!("AI planner returned an empty plan; using fallback");
                }
                Err(e) => {
                    warn!(error = %e, "AI planner unavailable; using fallback");
                }
            }
        }
        deterministic_plan(text, devices)
    }
}

fn contains_any(text: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|k| text.contains(k))
}

/// The keyword fallback planner.
fn deterministic_plan(text: &str, devices: &[Device]) -> Plan {
    let lowered = text.to_lowercase();

    if contains_any(&lowered, &["summarize", "generate", "write", "explain"]) {
        let task = Task::new(TaskInput::LlmGenerate { prompt: text.to_string(), model: None })
            .with_policy(Policy::BestAvailable);
        let mut plan = Plan::new(vec![Group::new(vec![task])]);
        plan.notes = "fallback: text generation keyword, routed best-available".to_string();
        return plan;
    }

    if contains_any(&lowered, &["image", "picture", "draw"]) {
        let task = Task::new(TaskInput::ImageGenerate {
            prompt: text.to_string(),
            width: None,
            height: None,
        })
        .with_policy(Policy::BestAvailable);
        let mut plan = Plan::new(vec![Group::new(vec![task])]);
        plan.notes =
            "fallback: image keyword, routed best-available (prefers NPU/GPU)".to_string();
        return plan;
    }

    let notes = if contains_any(&lowered, &["status", "devices"]) {
        "fallback: status keyword, sysinfo fan-out across the mesh"
    } else {
        "fallback: no keyword match, sysinfo fan-out across the mesh"
    };

    let tasks: Vec<Task> = devices
        .iter()
        .map(|d| Task::new(TaskInput::Sysinfo).with_target(d.id))
        .collect();
    let mut plan = Plan::new(vec![Group::new(tasks)]);
    plan.notes = notes.to_string();
    plan
}

#[cfg(test)]
#[path = "planner_tests.rs"]
mod tests;
