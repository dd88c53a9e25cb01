// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::test_helpers::{echo_executors, registry_with_self, FakePeer};
use mesh_core::test_support::device;
use mesh_core::{Capability, Group, SystemClock, TaskInput};

fn echo(text: &str) -> Task {
    Task::new(TaskInput::Echo { text: text.into() })
}

fn engine_with(
    registry: Arc<DeviceRegistry>,
    peers: Arc<FakePeer>,
) -> JobEngine<SystemClock> {
    JobEngine::new(
        registry,
        peers,
        echo_executors(),
        SystemClock,
        JobEngineConfig::default(),
    )
}

async fn wait_terminal(engine: &JobEngine<SystemClock>, job_id: &JobId) -> Job {
    for _ in 0..200 {
        let job = engine.get(job_id).unwrap();
        if job.is_terminal() {
            return job;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("job did not reach a terminal state");
}

#[tokio::test]
async fn zero_group_job_goes_straight_to_done() {
    let engine = engine_with(registry_with_self(), FakePeer::new());
    let job_id = engine.submit(Plan::new(vec![]), None);
    let job = wait_terminal(&engine, &job_id).await;
    assert_eq!(job.state, JobState::Done);
    assert_eq!(job.final_result.as_deref(), Some(""));
}

#[tokio::test]
async fn empty_group_succeeds_trivially() {
    let engine = engine_with(registry_with_self(), FakePeer::new());
    let job_id = engine.submit(Plan::new(vec![Group::new(vec![])]), None);
    let job = wait_terminal(&engine, &job_id).await;
    assert_eq!(job.state, JobState::Done);
    assert_eq!(job.groups[0].state, GroupState::Succeeded);
}

#[tokio::test]
async fn local_tasks_run_through_the_executor_registry() {
    let registry = registry_with_self();
    let self_id = registry.self_id();
    let engine = engine_with(registry, FakePeer::new());

    let plan = Plan::new(vec![Group::new(vec![
        echo("one").with_target(self_id),
        echo("two").with_target(self_id),
    ])]);
    let job_id = engine.submit(plan, None);
    let job = wait_terminal(&engine, &job_id).await;

    assert_eq!(job.state, JobState::Done);
    assert_eq!(job.final_result.as_deref(), Some("one\ntwo"));
    assert!(job.task_snapshots().all(|t| t.state == TaskState::Succeeded));
}

#[tokio::test]
async fn remote_tasks_fan_out_over_peer_rpc() {
    let registry = registry_with_self();
    registry.register(device("dev-a", &[Capability::Cpu]), 1);
    registry.register(device("dev-b", &[Capability::Cpu]), 2);
    let peers = FakePeer::new();
    let engine = engine_with(registry, Arc::clone(&peers));

    let plan = Plan::new(vec![Group::new(vec![
        echo("x").with_target("dev-a".into()),
        echo("y").with_target("dev-b".into()),
    ])]);
    let job_id = engine.submit(plan, None);
    let job = wait_terminal(&engine, &job_id).await;

    assert_eq!(job.state, JobState::Done);
    // Reduction order follows task index, not completion order.
    assert_eq!(job.final_result.as_deref(), Some("a:x\nb:y"));
    assert_eq!(peers.run_calls.lock().len(), 2);
}

#[tokio::test]
async fn groups_run_strictly_in_sequence() {
    let registry = registry_with_self();
    let self_id = registry.self_id();
    let engine = engine_with(registry, FakePeer::new());

    let plan = Plan::new(vec![
        Group::new(vec![echo("x").with_target(self_id)]),
        Group::new(vec![echo("y").with_target(self_id)]),
    ]);
    let job_id = engine.submit(plan, None);
    let job = wait_terminal(&engine, &job_id).await;

    assert_eq!(job.state, JobState::Done);
    let g0_finished = job.groups[0].tasks[0].finished_ms.unwrap();
    let g1_started = job.groups[1].tasks[0].started_ms.unwrap();
    assert!(
        g1_started >= g0_finished,
        "group 1 started at {g1_started} before group 0 finished at {g0_finished}"
    );
}

#[tokio::test]
async fn partial_failure_fails_group_but_records_all_results() {
    let registry = registry_with_self();
    registry.register(device("dev-ok", &[Capability::Cpu]), 1);
    registry.register(device("dev-bad", &[Capability::Cpu]), 2);
    let peers = FakePeer::new();
    peers.fail_device("dev-bad", "command not found");
    let engine = engine_with(registry, Arc::clone(&peers));

    let plan = Plan::new(vec![
        Group::new(vec![
            echo("fine").with_target("dev-ok".into()),
            echo("broken").with_target("dev-bad".into()),
        ]),
        Group::new(vec![echo("never")]),
    ]);
    let job_id = engine.submit(plan, None);
    let job = wait_terminal(&engine, &job_id).await;

    assert_eq!(job.state, JobState::Failed);
    assert_eq!(job.groups[0].state, GroupState::Failed);
    // Both results recorded: the healthy sibling completed.
    assert_eq!(job.groups[0].tasks[0].state, TaskState::Succeeded);
    assert_eq!(job.groups[0].tasks[1].state, TaskState::Failed);
    assert!(job.groups[0].tasks[1].result.as_ref().unwrap().error.is_some());
    // The second group was never dispatched.
    assert_eq!(job.groups[1].state, GroupState::Cancelled);
    assert_eq!(job.groups[1].tasks[0].state, TaskState::Cancelled);
    assert_eq!(peers.run_calls.lock().len(), 2);
}

#[tokio::test]
async fn routing_failure_marks_task_failed_without_dispatch() {
    let engine = engine_with(registry_with_self(), FakePeer::new());
    let plan = Plan::new(vec![Group::new(vec![
        Task::new(TaskInput::Echo { text: "npu".into() }).with_policy(Policy::RequireNpu),
    ])]);
    let job_id = engine.submit(plan, None);
    let job = wait_terminal(&engine, &job_id).await;

    assert_eq!(job.state, JobState::Failed);
    let task = &job.groups[0].tasks[0];
    assert_eq!(task.state, TaskState::Failed);
    assert_eq!(task.result.as_ref().unwrap().error.as_deref(), Some("NO_ELIGIBLE_DEVICE"));
}

#[tokio::test]
async fn unset_target_resolves_via_best_available() {
    let registry = registry_with_self();
    registry.register(device("dev-npu", &[Capability::Npu]), 1);
    let peers = FakePeer::new();
    let engine = engine_with(registry, Arc::clone(&peers));

    let job_id = engine.submit(Plan::new(vec![Group::new(vec![echo("routed")])]), None);
    let job = wait_terminal(&engine, &job_id).await;

    assert_eq!(job.state, JobState::Done);
    let resolved = job.groups[0].tasks[0].task.target_device_id.unwrap();
    assert_eq!(resolved, "dev-npu");
}

#[tokio::test]
async fn slow_remote_task_times_out() {
    let registry = registry_with_self();
    registry.register(device("dev-slow", &[Capability::Cpu]), 1);
    let peers = FakePeer::with_delay(Duration::from_secs(30));
    let engine = JobEngine::new(
        registry,
        peers,
        echo_executors(),
        SystemClock,
        JobEngineConfig { group_timeout_ms: 50 },
    );

    let plan = Plan::new(vec![Group::new(vec![echo("slow").with_target("dev-slow".into())])]);
    let job_id = engine.submit(plan, None);
    let job = wait_terminal(&engine, &job_id).await;

    assert_eq!(job.state, JobState::Failed);
    let task = &job.groups[0].tasks[0];
    assert_eq!(task.state, TaskState::TimedOut);
    assert_eq!(task.result.as_ref().unwrap().error.as_deref(), Some("DEADLINE_EXCEEDED"));
}

#[tokio::test]
async fn vanished_target_times_out_at_its_deadline() {
    let registry = registry_with_self();
    let engine = JobEngine::new(
        registry,
        FakePeer::new(),
        echo_executors(),
        SystemClock,
        JobEngineConfig { group_timeout_ms: 50 },
    );

    // Target was never registered; the engine rides out the deadline.
    let plan = Plan::new(vec![Group::new(vec![echo("ghost").with_target("dev-gone".into())])]);
    let job_id = engine.submit(plan, None);
    let job = wait_terminal(&engine, &job_id).await;

    assert_eq!(job.groups[0].tasks[0].state, TaskState::TimedOut);
}

#[tokio::test]
async fn task_timeout_tighter_than_group_default_wins() {
    let registry = registry_with_self();
    registry.register(device("dev-slow", &[Capability::Cpu]), 1);
    let peers = FakePeer::with_delay(Duration::from_secs(30));
    let engine = engine_with(registry, peers);

    let plan = Plan::new(vec![Group::new(vec![
        echo("slow").with_target("dev-slow".into()).with_timeout_ms(50),
    ])]);
    let job_id = engine.submit(plan, None);
    let job = wait_terminal(&engine, &job_id).await;
    assert_eq!(job.groups[0].tasks[0].state, TaskState::TimedOut);
}

#[tokio::test]
async fn cancel_stops_in_flight_work_and_preserves_results() {
    let registry = registry_with_self();
    registry.register(device("dev-slow", &[Capability::Cpu]), 1);
    let peers = FakePeer::with_delay(Duration::from_secs(30));
    let engine = engine_with(registry, peers);

    let plan = Plan::new(vec![
        Group::new(vec![echo("inflight").with_target("dev-slow".into())]),
        Group::new(vec![echo("later")]),
    ]);
    let job_id = engine.submit(plan, None);

    // Let the first dispatch begin, then cancel.
    tokio::time::sleep(Duration::from_millis(50)).await;
    engine.cancel(&job_id).unwrap();

    let job = wait_terminal(&engine, &job_id).await;
    assert_eq!(job.state, JobState::Cancelled);
    assert_eq!(job.groups[0].tasks[0].state, TaskState::Cancelled);
    assert_eq!(job.groups[1].state, GroupState::Cancelled);
}

#[tokio::test]
async fn cancel_after_done_is_a_noop() {
    let registry = registry_with_self();
    let self_id = registry.self_id();
    let engine = engine_with(registry, FakePeer::new());
    let job_id = engine.submit(Plan::new(vec![Group::new(vec![echo("x").with_target(self_id)])]), None);
    let job = wait_terminal(&engine, &job_id).await;
    assert_eq!(job.state, JobState::Done);

    engine.cancel(&job_id).unwrap();
    assert_eq!(engine.get(&job_id).unwrap().state, JobState::Done);
}

#[tokio::test]
async fn unknown_job_is_an_error() {
    let engine = engine_with(registry_with_self(), FakePeer::new());
    let missing = JobId::from_string("job-missing");
    assert_eq!(engine.get(&missing).unwrap_err(), EngineError::JobNotFound(missing));
    assert_eq!(engine.cancel(&missing).unwrap_err(), EngineError::JobNotFound(missing));
}

#[tokio::test]
async fn max_workers_limits_parallelism_but_completes() {
    let registry = registry_with_self();
    let self_id = registry.self_id();
    let engine = engine_with(registry, FakePeer::new());

    let tasks: Vec<Task> = (0..6).map(|i| echo(&format!("t{i}")).with_target(self_id)).collect();
    let job_id = engine.submit(Plan::new(vec![Group::new(tasks)]), Some(2));
    let job = wait_terminal(&engine, &job_id).await;

    assert_eq!(job.state, JobState::Done);
    assert_eq!(job.final_result.as_deref(), Some("t0\nt1\nt2\nt3\nt4\nt5"));
}

#[tokio::test]
async fn unsupported_kind_fails_locally() {
    let registry = registry_with_self();
    let self_id = registry.self_id();
    let engine = engine_with(registry, FakePeer::new());

    let plan = Plan::new(vec![Group::new(vec![
        Task::new(TaskInput::Sysinfo).with_target(self_id),
    ])]);
    let job_id = engine.submit(plan, None);
    let job = wait_terminal(&engine, &job_id).await;

    assert_eq!(job.state, JobState::Failed);
    let error = job.groups[0].tasks[0].result.as_ref().unwrap().error.clone().unwrap();
    assert!(error.contains("no executor registered"), "unexpected error: {error}");
}
