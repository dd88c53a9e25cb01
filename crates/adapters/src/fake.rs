// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake adapters for other crates' tests.
//!
//! Gated behind `#[cfg(any(test, feature = "test-support"))]`.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use mesh_core::{Device, Plan, TaskInput};
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use crate::capture::{CaptureError, CaptureParams, FrameProducer};
use crate::executor::{ExecutorError, TaskExecutor, TaskOutput};
use crate::planner::{PlannerAdapter, PlannerError};

/// Scripted executor: returns queued outcomes in order, then echoes.
///
/// An optional delay makes timeout paths testable.
#[derive(Default)]
pub struct FakeExecutor {
    outcomes: Mutex<VecDeque<Result<TaskOutput, String>>>,
    delay: Option<Duration>,
    calls: Mutex<Vec<TaskInput>>,
}

impl FakeExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(delay: Duration) -> Self {
        Self { delay: Some(delay), ..Self::default() }
    }

    pub fn push_ok(&self, output: impl Into<String>) {
        self.outcomes.lock().push_back(Ok(TaskOutput::text(output.into())));
    }

    pub fn push_err(&self, error: impl Into<String>) {
        self.outcomes.lock().push_back(Err(error.into()));
    }

    pub fn calls(&self) -> Vec<TaskInput> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl TaskExecutor for FakeExecutor {
    async fn execute(
        &self,
        input: &TaskInput,
        cancel: &CancellationToken,
    ) -> Result<TaskOutput, ExecutorError> {
        self.calls.lock().push(input.clone());
        if let Some(delay) = self.delay {
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = cancel.cancelled() => return Err(ExecutorError::Cancelled),
            }
        }
        match self.outcomes.lock().pop_front() {
            Some(Ok(output)) => Ok(output),
            Some(Err(e)) => Err(ExecutorError::Backend(e)),
            None => match input {
                TaskInput::Echo { text } => Ok(TaskOutput::text(text.clone())),
                other => Ok(TaskOutput::text(other.kind().to_string())),
            },
        }
    }
}

/// Planner fake: either a canned plan or a scripted failure.
#[derive(Default)]
pub struct FakePlanner {
    plan: Mutex<Option<Plan>>,
    fail_with: Mutex<Option<String>>,
}

impl FakePlanner {
    pub fn returning(plan: Plan) -> Self {
        Self { plan: Mutex::new(Some(plan)), fail_with: Mutex::new(None) }
    }

    pub fn failing(message: impl Into<String>) -> Self {
        Self { plan: Mutex::new(None), fail_with: Mutex::new(Some(message.into())) }
    }
}

#[async_trait]
impl PlannerAdapter for FakePlanner {
    async fn plan(&self, _text: &str, _devices: &[Device]) -> Result<Plan, PlannerError> {
        if let Some(message) = self.fail_with.lock().clone() {
            return Err(PlannerError::Unavailable(message));
        }
        match self.plan.lock().clone() {
            Some(mut plan) => {
                plan.used_ai = true;
                Ok(plan)
            }
            None => Err(PlannerError::Unavailable("no plan scripted".into())),
        }
    }
}

/// Capture fake: records lifecycle calls and hands out canned SDP.
#[derive(Default)]
pub struct FakeProducer {
    pub offers: Mutex<Vec<(String, CaptureParams)>>,
    pub answers: Mutex<Vec<(String, String)>>,
    pub stopped: Mutex<Vec<String>>,
    refuse: bool,
}

impl FakeProducer {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn refusing() -> Arc<Self> {
        Arc::new(Self { refuse: true, ..Self::default() })
    }
}

#[async_trait]
impl FrameProducer for FakeProducer {
    async fn create_offer(
        &self,
        stream_id: &str,
        params: &CaptureParams,
    ) -> Result<String, CaptureError> {
        if self.refuse {
            return Err(CaptureError::NotSupported);
        }
        self.offers.lock().push((stream_id.to_string(), *params));
        Ok(format!("v=0\r\no=- 0 0 IN IP4 0.0.0.0\r\ns={stream_id}\r\n"))
    }

    async fn accept_answer(&self, stream_id: &str, answer_sdp: &str) -> Result<(), CaptureError> {
        if self.refuse {
            return Err(CaptureError::NotSupported);
        }
        self.answers.lock().push((stream_id.to_string(), answer_sdp.to_string()));
        Ok(())
    }

    async fn stop(&self, stream_id: &str) -> Result<(), CaptureError> {
        self.stopped.lock().push(stream_id.to_string());
        Ok(())
    }
}
