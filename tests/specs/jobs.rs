// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job orchestration specs: routing, fan-out, sequencing, partial failure.

use mesh_core::{
    Group, GroupState, JobState, Plan, Policy, Task, TaskInput, TaskState,
};
use mesh_wire::{ErrorCode, Request, Response};

use super::prelude::*;

fn shell(cmd: &str) -> TaskInput {
    TaskInput::Shell { cmd: cmd.into(), args: vec![] }
}

#[tokio::test]
async fn sysinfo_fan_out_reduces_in_task_order() {
    let node_a = TestNode::spawn().await;
    let node_b = TestNode::spawn().await;

    // A learns about B through explicit registration (discovery does the
    // same thing on a real LAN).
    let device_b = node_b.self_device().await;
    node_a.call(Request::RegisterDevice { device: device_b.clone() }).await;

    let id_a = node_a.device_id().await;
    let plan = Plan::new(vec![Group::new(vec![
        Task::new(TaskInput::Sysinfo).with_target(id_a),
        Task::new(TaskInput::Sysinfo).with_target(device_b.id),
    ])]);

    let job_id = match node_a
        .call(Request::SubmitJob { text: None, plan: Some(plan), max_workers: None })
        .await
    {
        Response::JobSubmitted { job_id, used_ai, .. } => {
            assert!(!used_ai);
            job_id
        }
        other => panic!("unexpected response: {other:?}"),
    };

    let job = wait_job_terminal(&node_a, job_id).await;
    assert_eq!(job.state, JobState::Done);

    // Both samples present, newline separated, task-index order.
    let result = job.final_result.expect("final result");
    let parts: Vec<&str> = result.split('\n').collect();
    assert_eq!(parts.len(), 2);
    for part in parts {
        let sample: serde_json::Value = serde_json::from_str(part).expect("sysinfo is JSON");
        assert!(sample["arch"].is_string());
    }

    node_a.daemon.shutdown().await;
    node_b.daemon.shutdown().await;
}

#[tokio::test]
async fn sequential_groups_respect_ordering() {
    let node = TestNode::spawn().await;
    let id = node.device_id().await;

    let plan = Plan::new(vec![
        Group::new(vec![Task::new(TaskInput::Echo { text: "x".into() }).with_target(id)]),
        Group::new(vec![Task::new(TaskInput::Echo { text: "y".into() }).with_target(id)]),
    ]);
    let job_id = match node
        .call(Request::SubmitJob { text: None, plan: Some(plan), max_workers: None })
        .await
    {
        Response::JobSubmitted { job_id, .. } => job_id,
        other => panic!("unexpected response: {other:?}"),
    };

    let job = wait_job_terminal(&node, job_id).await;
    assert_eq!(job.state, JobState::Done);
    assert_eq!(job.final_result.as_deref(), Some("x\ny"));

    let g0_finished = job.groups[0].tasks[0].finished_ms.expect("g0 finished");
    let g1_started = job.groups[1].tasks[0].started_ms.expect("g1 started");
    assert!(g1_started >= g0_finished);

    node.daemon.shutdown().await;
}

#[tokio::test]
async fn partial_failure_records_both_results_and_cancels_later_groups() {
    let node_a = TestNode::spawn().await;
    let node_b = TestNode::spawn().await;
    let device_b = node_b.self_device().await;
    node_a.call(Request::RegisterDevice { device: device_b.clone() }).await;
    let id_a = node_a.device_id().await;

    let plan = Plan::new(vec![
        Group::new(vec![
            Task::new(shell("true")).with_target(id_a),
            // Not in the allowlist: fails on the worker, in-band.
            Task::new(shell("nonexistent-cmd")).with_target(device_b.id),
        ]),
        Group::new(vec![Task::new(TaskInput::Echo { text: "never".into() }).with_target(id_a)]),
    ]);
    let job_id = match node_a
        .call(Request::SubmitJob { text: None, plan: Some(plan), max_workers: None })
        .await
    {
        Response::JobSubmitted { job_id, .. } => job_id,
        other => panic!("unexpected response: {other:?}"),
    };

    let job = wait_job_terminal(&node_a, job_id).await;
    assert_eq!(job.state, JobState::Failed);
    assert_eq!(job.groups[0].state, GroupState::Failed);
    assert_eq!(job.groups[0].tasks[0].state, TaskState::Succeeded);
    assert_eq!(job.groups[0].tasks[1].state, TaskState::Failed);
    let error = job.groups[0].tasks[1]
        .result
        .as_ref()
        .and_then(|r| r.error.clone())
        .expect("failure recorded");
    assert!(error.contains("DISALLOWED_COMMAND"), "unexpected error: {error}");
    assert_eq!(job.groups[1].state, GroupState::Cancelled);
    assert_eq!(job.groups[1].tasks[0].state, TaskState::Cancelled);

    node_a.daemon.shutdown().await;
    node_b.daemon.shutdown().await;
}

#[tokio::test]
async fn routed_command_requiring_npu_fails_on_cpu_mesh() {
    let node = TestNode::spawn().await;
    let response = node
        .call(Request::ExecuteRoutedCommand {
            cmd: "pwd".into(),
            args: vec![],
            policy: Policy::RequireNpu,
        })
        .await;
    match response {
        Response::Error { code, .. } => assert_eq!(code, ErrorCode::NoEligibleDevice),
        other => panic!("unexpected response: {other:?}"),
    }
    node.daemon.shutdown().await;
}

#[tokio::test]
async fn routed_command_runs_locally_on_single_node() {
    let node = TestNode::spawn().await;
    match node
        .call(Request::ExecuteRoutedCommand {
            cmd: "echo".into(),
            args: vec!["routed".into()],
            policy: Policy::BestAvailable,
        })
        .await
    {
        Response::RoutedCommand { executed_locally, exit_code, stdout, .. } => {
            assert!(executed_locally);
            assert_eq!(exit_code, 0);
            assert_eq!(stdout, "routed\n");
        }
        other => panic!("unexpected response: {other:?}"),
    }
    node.daemon.shutdown().await;
}

#[tokio::test]
async fn preview_plan_round_trips_through_submit_and_get() {
    let node = TestNode::spawn().await;

    let plan = match node.call(Request::PreviewPlan { text: "show status".into() }).await {
        Response::Plan { plan } => plan,
        other => panic!("unexpected response: {other:?}"),
    };
    assert!(!plan.used_ai);
    assert_eq!(plan.task_count(), 1); // one sysinfo task per registered device

    let (job_id, submitted) = match node
        .call(Request::SubmitJob { text: None, plan: Some(plan.clone()), max_workers: None })
        .await
    {
        Response::JobSubmitted { job_id, plan, .. } => (job_id, plan),
        other => panic!("unexpected response: {other:?}"),
    };
    assert_eq!(submitted, plan);

    let job = wait_job_terminal(&node, job_id).await;
    assert_eq!(job.plan, plan);

    node.daemon.shutdown().await;
}

#[tokio::test]
async fn preview_plan_cost_recommends_a_device() {
    let node = TestNode::spawn().await;
    let plan = Plan::new(vec![Group::new(vec![Task::new(TaskInput::LlmGenerate {
        prompt: "p".into(),
        model: None,
    })])]);
    match node.call(Request::PreviewPlanCost { plan }).await {
        Response::PlanCost { cost } => {
            assert_eq!(cost.device_costs.len(), 1);
            assert!(cost.recommended_device_id.is_some());
            assert!(cost.total_predicted_ms > 0);
        }
        other => panic!("unexpected response: {other:?}"),
    }
    node.daemon.shutdown().await;
}

#[tokio::test]
async fn cancel_is_a_noop_on_finished_jobs_and_fails_on_unknown_ids() {
    let node = TestNode::spawn().await;
    let id = node.device_id().await;
    let plan = Plan::new(vec![Group::new(vec![
        Task::new(TaskInput::Echo { text: "quick".into() }).with_target(id),
    ])]);
    let job_id = match node
        .call(Request::SubmitJob { text: None, plan: Some(plan), max_workers: None })
        .await
    {
        Response::JobSubmitted { job_id, .. } => job_id,
        other => panic!("unexpected response: {other:?}"),
    };
    let job = wait_job_terminal(&node, job_id).await;
    assert_eq!(job.state, JobState::Done);

    // Cancelling a done job acknowledges without changing state.
    assert!(matches!(node.call(Request::CancelJob { job_id }).await, Response::Ok));
    let job = wait_job_terminal(&node, job_id).await;
    assert_eq!(job.state, JobState::Done);

    match node.call(Request::CancelJob { job_id: "job-missing".into() }).await {
        Response::Error { code, .. } => assert_eq!(code, ErrorCode::JobNotFound),
        other => panic!("unexpected response: {other:?}"),
    }
    node.daemon.shutdown().await;
}

#[tokio::test]
async fn get_unknown_job_fails() {
    let node = TestNode::spawn().await;
    match node.call(Request::GetJob { job_id: "job-missing".into() }).await {
        Response::Error { code, .. } => assert_eq!(code, ErrorCode::JobNotFound),
        other => panic!("unexpected response: {other:?}"),
    }
    node.daemon.shutdown().await;
}

#[tokio::test]
async fn submit_without_text_or_plan_is_invalid() {
    let node = TestNode::spawn().await;
    match node.call(Request::SubmitJob { text: None, plan: None, max_workers: None }).await {
        Response::Error { code, .. } => assert_eq!(code, ErrorCode::InvalidArgument),
        other => panic!("unexpected response: {other:?}"),
    }
    node.daemon.shutdown().await;
}

#[tokio::test]
async fn run_task_primitive_enforces_the_allowlist() {
    let node = TestNode::spawn().await;
    let task = Task::new(shell("rm"));
    match node.call(Request::RunTask { task }).await {
        Response::TaskDone { ok, error, .. } => {
            assert!(!ok);
            assert!(error.unwrap().contains("DISALLOWED_COMMAND"));
        }
        other => panic!("unexpected response: {other:?}"),
    }

    let task = Task::new(TaskInput::Echo { text: "direct".into() });
    match node.call(Request::RunTask { task }).await {
        Response::TaskDone { ok, output, error, .. } => {
            assert!(ok, "echo task failed: {error:?}");
            assert_eq!(output, b"direct");
        }
        other => panic!("unexpected response: {other:?}"),
    }
    node.daemon.shutdown().await;
}
