// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job handlers.

use mesh_core::{JobId, Plan};
use mesh_engine::{estimate_plan, EngineError};
use mesh_wire::{ErrorCode, Response};

use super::ListenCtx;

/// Submit from a structured plan or free text. The plan wins when both
/// are present; the text goes through the planner otherwise.
pub(super) async fn submit(
    ctx: &ListenCtx,
    text: Option<String>,
    plan: Option<Plan>,
    max_workers: Option<usize>,
) -> Response {
    let plan = match (plan, text) {
        (Some(plan), _) => plan,
        (None, Some(text)) => ctx.planner.from_text(&text, &ctx.registry.list()).await,
        (None, None) => {
            return Response::error(ErrorCode::InvalidArgument, "need either text or plan")
        }
    };
    let used_ai = plan.used_ai;
    let job_id = ctx.engine.submit(plan.clone(), max_workers);
    Response::JobSubmitted { job_id, plan, used_ai }
}

pub(super) fn get(ctx: &ListenCtx, job_id: &JobId) -> Response {
    match ctx.engine.get(job_id) {
        Ok(job) => Response::Job { job },
        Err(EngineError::JobNotFound(id)) => {
            Response::error(ErrorCode::JobNotFound, id.as_str())
        }
    }
}

pub(super) fn cancel(ctx: &ListenCtx, job_id: &JobId) -> Response {
    match ctx.engine.cancel(job_id) {
        Ok(()) => Response::Ok,
        Err(EngineError::JobNotFound(id)) => {
            Response::error(ErrorCode::JobNotFound, id.as_str())
        }
    }
}

pub(super) async fn preview(ctx: &ListenCtx, text: &str) -> Response {
    let plan = ctx.planner.from_text(text, &ctx.registry.list()).await;
    Response::Plan { plan }
}

pub(super) fn preview_cost(ctx: &ListenCtx, plan: &Plan) -> Response {
    Response::PlanCost { cost: estimate_plan(plan, &ctx.registry.list()) }
}
