// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[yare::parameterized(
    shell = { TaskInput::Shell { cmd: "pwd".into(), args: vec![] }, TaskKind::Shell },
    sysinfo = { TaskInput::Sysinfo, TaskKind::Sysinfo },
    echo = { TaskInput::Echo { text: "hi".into() }, TaskKind::Echo },
    llm = { TaskInput::LlmGenerate { prompt: "p".into(), model: None }, TaskKind::LlmGenerate },
    image = { TaskInput::ImageGenerate { prompt: "p".into(), width: None, height: None }, TaskKind::ImageGenerate },
)]
fn input_kind(input: TaskInput, expected: TaskKind) {
    assert_eq!(input.kind(), expected);
}

#[test]
fn task_input_is_kind_tagged_json() {
    let task = Task::new(TaskInput::Echo { text: "x".into() });
    let json = serde_json::to_value(&task).unwrap();
    assert_eq!(json["kind"], "echo");
    assert_eq!(json["text"], "x");
}

#[yare::parameterized(
    unset_uses_default = { None, 30_000, 30_000 },
    zero_uses_default = { Some(0), 30_000, 30_000 },
    tighter_task_wins = { Some(5_000), 30_000, 5_000 },
    tighter_group_wins = { Some(60_000), 30_000, 30_000 },
)]
fn effective_timeout(task_ms: Option<u64>, group_ms: u64, expected: u64) {
    let mut task = Task::new(TaskInput::Sysinfo);
    task.timeout_ms = task_ms;
    assert_eq!(task.effective_timeout_ms(group_ms), expected);
}

#[test]
fn plan_task_count_and_order() {
    let plan = Plan::new(vec![
        Group::new(vec![
            Task::new(TaskInput::Echo { text: "a".into() }),
            Task::new(TaskInput::Echo { text: "b".into() }),
        ]),
        Group::new(vec![Task::new(TaskInput::Echo { text: "c".into() })]),
    ]);
    assert_eq!(plan.task_count(), 3);
    let texts: Vec<_> = plan
        .tasks()
        .map(|t| match &t.input {
            TaskInput::Echo { text } => text.clone(),
            _ => unreachable!(),
        })
        .collect();
    assert_eq!(texts, ["a", "b", "c"]);
}

#[test]
fn plan_serde_roundtrip() {
    let plan = Plan::new(vec![Group::new(vec![Task::new(TaskInput::Shell {
        cmd: "ls".into(),
        args: vec!["-l".into()],
    })
    .with_target(DeviceId::from_string("dev-a"))
    .with_timeout_ms(1000)])])
    .with_notes("test plan");

    let json = serde_json::to_string(&plan).unwrap();
    let parsed: Plan = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, plan);
}

#[test]
fn empty_plan_roundtrips() {
    let plan = Plan::new(vec![]);
    let json = serde_json::to_string(&plan).unwrap();
    let parsed: Plan = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, plan);
    assert_eq!(parsed.task_count(), 0);
}

#[test]
fn reduce_default_is_concat() {
    assert_eq!(ReduceOp::default(), ReduceOp::Concat);
    assert_eq!(ReduceOp::Concat.to_string(), "concat");
}
