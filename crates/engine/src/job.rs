// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The job engine: a two-level scheduler.
//!
//! Groups run sequentially; tasks within a group run in parallel, each in
//! its own spawned unit with its own deadline. A failed task fails its
//! group, but the engine always waits for the group's in-flight siblings
//! to settle before stopping. Later groups are never dispatched after a
//! failure; their tasks are marked cancelled.
//!
//! Per-task errors are recorded in the job snapshot and never bubble out
//! of the driver; callers observe them via `get`.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use mesh_adapters::{ExecutorError, ExecutorRegistry};
use mesh_core::{
    Clock, DeviceId, GroupState, Job, JobId, JobState, Plan, Policy, Task, TaskResult, TaskState,
};
use parking_lot::Mutex;
use thiserror::Error;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::peer::PeerRpc;
use crate::reduce::reduce;
use crate::registry::DeviceRegistry;
use crate::router::{route, RouteError};

/// Errors returned synchronously from engine calls.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EngineError {
    #[error("job not found: {0}")]
    JobNotFound(JobId),
}

/// Engine tuning knobs.
#[derive(Debug, Clone)]
pub struct JobEngineConfig {
    /// Default per-task deadline when the task does not set a tighter one.
    pub group_timeout_ms: u64,
}

impl Default for JobEngineConfig {
    fn default() -> Self {
        Self { group_timeout_ms: 30_000 }
    }
}

struct JobHandle {
    job: Arc<Mutex<Job>>,
    cancel: CancellationToken,
}

/// Shared dependencies for job drivers.
struct DriverDeps<C: Clock> {
    registry: Arc<DeviceRegistry>,
    peers: Arc<dyn PeerRpc>,
    executors: Arc<ExecutorRegistry>,
    clock: C,
    config: JobEngineConfig,
}

/// The job engine. Owns all job records; hands out snapshots.
pub struct JobEngine<C: Clock + 'static> {
    jobs: Mutex<HashMap<JobId, JobHandle>>,
    registry: Arc<DeviceRegistry>,
    peers: Arc<dyn PeerRpc>,
    executors: Arc<ExecutorRegistry>,
    clock: C,
    config: JobEngineConfig,
}

impl<C: Clock + 'static> JobEngine<C> {
    pub fn new(
        registry: Arc<DeviceRegistry>,
        peers: Arc<dyn PeerRpc>,
        executors: Arc<ExecutorRegistry>,
        clock: C,
        config: JobEngineConfig,
    ) -> Self {
        Self { jobs: Mutex::new(HashMap::new()), registry, peers, executors, clock, config }
    }

    /// Allocate a queued job and spawn its driver.
    pub fn submit(&self, plan: Plan, max_workers: Option<usize>) -> JobId {
        let job_id = JobId::generate();
        let job = Arc::new(Mutex::new(Job::new(job_id, plan, self.clock.epoch_ms())));
        let cancel = CancellationToken::new();
        self.jobs
            .lock()
            .insert(job_id, JobHandle { job: Arc::clone(&job), cancel: cancel.clone() });

        let deps = DriverDeps {
            registry: Arc::clone(&self.registry),
            peers: Arc::clone(&self.peers),
            executors: Arc::clone(&self.executors),
            clock: self.clock.clone(),
            config: self.config.clone(),
        };
        info!(%job_id, "job submitted");
        tokio::spawn(drive(job, cancel, deps, max_workers));
        job_id
    }

    /// Snapshot of a job's current state.
    pub fn get(&self, job_id: &JobId) -> Result<Job, EngineError> {
        self.jobs
            .lock()
            .get(job_id)
            .map(|h| h.job.lock().clone())
            .ok_or(EngineError::JobNotFound(*job_id))
    }

    /// Cancel a job. Propagates to in-flight dispatches; completed results
    /// are preserved. A no-op once the job is terminal.
    pub fn cancel(&self, job_id: &JobId) -> Result<(), EngineError> {
        let jobs = self.jobs.lock();
        let handle = jobs.get(job_id).ok_or(EngineError::JobNotFound(*job_id))?;
        if !handle.job.lock().is_terminal() {
            info!(%job_id, "job cancelled");
            handle.cancel.cancel();
        }
        Ok(())
    }
}

/// Outcome of one dispatched task, applied back onto the snapshot.
struct TaskOutcome {
    task_idx: usize,
    state: TaskState,
    result: TaskResult,
    finished_ms: u64,
}

/// Drive a job to a terminal state. Never returns an error: everything the
/// caller needs lands in the job snapshot.
async fn drive<C: Clock + 'static>(
    job: Arc<Mutex<Job>>,
    cancel: CancellationToken,
    deps: DriverDeps<C>,
    max_workers: Option<usize>,
) {
    let group_count = job.lock().groups.len();
    let workers = max_workers.filter(|n| *n > 0).map(|n| Arc::new(Semaphore::new(n)));

    for group_idx in 0..group_count {
        if cancel.is_cancelled() {
            finish_cancelled(&job, group_idx);
            return;
        }

        {
            let mut j = job.lock();
            if j.state == JobState::Queued {
                j.state = JobState::Running;
            }
            j.groups[group_idx].state = GroupState::Running;
        }

        run_group(&job, group_idx, &cancel, &deps, workers.clone()).await;

        let group_ok = {
            let mut j = job.lock();
            let ok = j.groups[group_idx].tasks.iter().all(|t| t.state == TaskState::Succeeded);
            j.groups[group_idx].state = if cancel.is_cancelled() {
                GroupState::Cancelled
            } else if ok {
                GroupState::Succeeded
            } else {
                GroupState::Failed
            };
            ok
        };

        if cancel.is_cancelled() {
            finish_cancelled(&job, group_idx + 1);
            return;
        }
        if !group_ok {
            let mut j = job.lock();
            mark_groups_cancelled(&mut j, group_idx + 1);
            j.state = JobState::Failed;
            info!(job_id = %j.id, group = group_idx, "job failed");
            return;
        }
    }

    let mut j = job.lock();
    j.final_result = Some(reduce(&j));
    j.state = JobState::Done;
    info!(job_id = %j.id, "job done");
}

/// Dispatch every task in the group and wait for all of them to settle.
async fn run_group<C: Clock + 'static>(
    job: &Arc<Mutex<Job>>,
    group_idx: usize,
    cancel: &CancellationToken,
    deps: &DriverDeps<C>,
    workers: Option<Arc<Semaphore>>,
) {
    let snapshot = deps.registry.list();
    let self_id = deps.registry.self_id();
    let now_ms = deps.clock.epoch_ms();

    // Resolve targets up front; routing failures fail the task immediately
    // without dispatch.
    let mut dispatches: Vec<(usize, Task, u64)> = Vec::new();
    {
        let mut j = job.lock();
        let group = &mut j.groups[group_idx];
        for (task_idx, snapshot_task) in group.tasks.iter_mut().enumerate() {
            let task = &mut snapshot_task.task;
            let target = match task.target_device_id {
                Some(id) => Ok(id),
                None => {
                    let policy = task.policy.clone().unwrap_or(Policy::BestAvailable);
                    route(&policy, &snapshot, &self_id)
                }
            };
            match target {
                Ok(target_id) => {
                    task.target_device_id = Some(target_id);
                    snapshot_task.state = TaskState::Dispatched;
                    snapshot_task.started_ms = Some(now_ms);
                    let deadline = task.effective_timeout_ms(deps.config.group_timeout_ms);
                    dispatches.push((task_idx, task.clone(), deadline));
                }
                Err(e) => {
                    snapshot_task.state = TaskState::Failed;
                    snapshot_task.started_ms = Some(now_ms);
                    snapshot_task.finished_ms = Some(now_ms);
                    snapshot_task.result = Some(TaskResult {
                        output: Vec::new(),
                        exit_code: None,
                        elapsed_ms: 0,
                        error: Some(route_error_label(&e)),
                    });
                    warn!(task_idx, error = %e, "task routing failed");
                }
            }
        }
    }

    let mut join_set = tokio::task::JoinSet::new();
    for (task_idx, task, deadline_ms) in dispatches {
        let job = Arc::clone(job);
        let registry = Arc::clone(&deps.registry);
        let peers = Arc::clone(&deps.peers);
        let executors = Arc::clone(&deps.executors);
        let clock = deps.clock.clone();
        let child = cancel.child_token();
        let permit_source = workers.clone();
        join_set.spawn(async move {
            let _permit = match &permit_source {
                Some(semaphore) => semaphore.acquire().await.ok(),
                None => None,
            };
            dispatch_task(
                job, group_idx, task_idx, task, self_id, deadline_ms, child, registry, peers,
                executors, clock,
            )
            .await
        });
    }

    // Wait for every dispatched sibling, even after a failure.
    while let Some(joined) = join_set.join_next().await {
        match joined {
            Ok(outcome) => {
                let mut j = job.lock();
                let slot = &mut j.groups[group_idx].tasks[outcome.task_idx];
                slot.state = outcome.state;
                slot.finished_ms = Some(outcome.finished_ms);
                slot.result = Some(outcome.result);
            }
            Err(e) => warn!(error = %e, "task dispatch unit aborted"),
        }
    }
}

fn route_error_label(e: &RouteError) -> String {
    match e {
        RouteError::NoEligibleDevice => "NO_ELIGIBLE_DEVICE".to_string(),
        RouteError::UnknownDevice(id) => format!("UNKNOWN_DEVICE: {id}"),
    }
}

/// Execute one task against its resolved target, bounded by its deadline.
#[allow(clippy::too_many_arguments)]
async fn dispatch_task<C: Clock>(
    job: Arc<Mutex<Job>>,
    group_idx: usize,
    task_idx: usize,
    task: Task,
    self_id: DeviceId,
    deadline_ms: u64,
    cancel: CancellationToken,
    registry: Arc<DeviceRegistry>,
    peers: Arc<dyn PeerRpc>,
    executors: Arc<ExecutorRegistry>,
    clock: C,
) -> TaskOutcome {
    let started_ms = clock.epoch_ms();
    {
        let mut j = job.lock();
        let slot = &mut j.groups[group_idx].tasks[task_idx];
        slot.state = TaskState::Running;
        slot.started_ms = Some(started_ms);
    }

    // The target is resolved by the driver before dispatch.
    let target = task.target_device_id.unwrap_or(self_id);
    let execution = run_on_target(&task, target, self_id, &registry, &peers, &executors, &cancel);

    let (state, mut result) = tokio::select! {
        outcome = execution => outcome,
        _ = tokio::time::sleep(Duration::from_millis(deadline_ms)) => {
            cancel.cancel();
            debug!(task_id = %task.id, deadline_ms, "task deadline expired");
            (
                TaskState::TimedOut,
                TaskResult {
                    output: Vec::new(),
                    exit_code: None,
                    elapsed_ms: deadline_ms,
                    error: Some("DEADLINE_EXCEEDED".to_string()),
                },
            )
        }
        _ = cancel.cancelled() => {
            (
                TaskState::Cancelled,
                TaskResult {
                    output: Vec::new(),
                    exit_code: None,
                    elapsed_ms: clock.epoch_ms().saturating_sub(started_ms),
                    error: Some("cancelled".to_string()),
                },
            )
        }
    };

    let finished_ms = clock.epoch_ms();
    if result.elapsed_ms == 0 {
        result.elapsed_ms = finished_ms.saturating_sub(started_ms);
    }
    TaskOutcome { task_idx, state, result, finished_ms }
}

/// Run locally through the executor registry, or remotely over peer RPC.
async fn run_on_target(
    task: &Task,
    target: DeviceId,
    self_id: DeviceId,
    registry: &DeviceRegistry,
    peers: &Arc<dyn PeerRpc>,
    executors: &ExecutorRegistry,
    cancel: &CancellationToken,
) -> (TaskState, TaskResult) {
    if target == self_id {
        return match executors.execute(&task.input, cancel).await {
            Ok(output) => (
                TaskState::Succeeded,
                TaskResult {
                    output: output.bytes,
                    exit_code: output.exit_code,
                    elapsed_ms: 0,
                    error: None,
                },
            ),
            Err(ExecutorError::Cancelled) => (
                TaskState::Cancelled,
                TaskResult {
                    output: Vec::new(),
                    exit_code: None,
                    elapsed_ms: 0,
                    error: Some("cancelled".to_string()),
                },
            ),
            Err(e) => (
                TaskState::Failed,
                TaskResult {
                    output: Vec::new(),
                    exit_code: None,
                    elapsed_ms: 0,
                    error: Some(e.to_string()),
                },
            ),
        };
    }

    // A target that vanished from the registry is not failed eagerly; the
    // task rides out its deadline and reports TIMED_OUT.
    let Some(device) = registry.get(&target) else {
        std::future::pending::<()>().await;
        unreachable!("pending future resolved");
    };

    match peers.run_task(&device, task).await {
        Ok(result) => {
            let state =
                if result.error.is_some() { TaskState::Failed } else { TaskState::Succeeded };
            (state, result)
        }
        Err(e) => (
            TaskState::Failed,
            TaskResult {
                output: Vec::new(),
                exit_code: None,
                elapsed_ms: 0,
                error: Some(e.to_string()),
            },
        ),
    }
}

/// Mark everything from `from_group` on as cancelled and finish the job.
fn finish_cancelled(job: &Arc<Mutex<Job>>, from_group: usize) {
    let mut j = job.lock();
    mark_groups_cancelled(&mut j, from_group);
    j.state = JobState::Cancelled;
    info!(job_id = %j.id, "job cancelled");
}

fn mark_groups_cancelled(job: &mut Job, from_group: usize) {
    for group in job.groups.iter_mut().skip(from_group) {
        group.state = GroupState::Cancelled;
        for task in group.tasks.iter_mut() {
            if !task.state.is_terminal() {
                task.state = TaskState::Cancelled;
            }
        }
    }
}

#[cfg(test)]
#[path = "job_tests.rs"]
mod tests;
