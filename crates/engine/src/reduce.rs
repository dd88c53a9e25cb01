// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Result reduction.

use mesh_core::{Job, ReduceOp};

/// Fold per-task outputs into the job's final result.
///
/// CONCAT joins each task's textual output in plan order (group index,
/// then task index), separated by a newline. Non-UTF-8 output is
/// base64-encoded first, so the result is always valid text.
pub fn reduce(job: &Job) -> String {
    match job.plan.reduce {
        ReduceOp::Concat => job
            .task_snapshots()
            .filter_map(|t| t.result.as_ref())
            .map(|r| r.output_text())
            .collect::<Vec<_>>()
            .join("\n"),
    }
}

#[cfg(test)]
#[path = "reduce_tests.rs"]
mod tests;
