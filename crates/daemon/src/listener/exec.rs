// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Execution handlers: local commands, policy-routed commands, and the
//! worker-side `RunTask` primitive.

use mesh_adapters::ExecutorError;
use mesh_core::{Clock, Policy, Task};
use mesh_wire::{ErrorCode, Request, Response};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::ListenCtx;
use crate::peer_client::map_peer_error;
use mesh_engine::{route, RouteError};

/// Run an allowlisted command on this node.
pub(super) async fn execute(ctx: &ListenCtx, cmd: &str, args: &[String]) -> Response {
    let start = ctx.clock.epoch_ms();
    match ctx.shell.run_command(cmd, args).await {
        Ok(output) => Response::CommandOutput {
            exit_code: output.exit_code,
            stdout: output.stdout,
            stderr: output.stderr,
            time_ms: ctx.clock.epoch_ms().saturating_sub(start),
        },
        Err(ExecutorError::DisallowedCommand(cmd)) => {
            Response::error(ErrorCode::DisallowedCommand, cmd)
        }
        Err(e) => Response::error(ErrorCode::Internal, e.to_string()),
    }
}

/// Route a command by policy, then run it here or on the selected peer.
pub(super) async fn execute_routed(
    ctx: &ListenCtx,
    cmd: &str,
    args: &[String],
    policy: &Policy,
) -> Response {
    let start = ctx.clock.epoch_ms();
    let snapshot = ctx.registry.list();
    let selected = match route(policy, &snapshot, &ctx.registry.self_id()) {
        Ok(id) => id,
        Err(RouteError::NoEligibleDevice) => {
            return Response::error(ErrorCode::NoEligibleDevice, policy.to_string())
        }
        Err(RouteError::UnknownDevice(id)) => {
            return Response::error(ErrorCode::UnknownDevice, id.as_str())
        }
    };
    // Present in the snapshot we just routed over.
    let Some(device) = ctx.registry.get(&selected) else {
        return Response::error(ErrorCode::UnknownDevice, selected.as_str());
    };
    let executed_locally = ctx.registry.is_self(&selected);
    debug!(device = %selected, executed_locally, %cmd, "routed command");

    let (exit_code, stdout, stderr) = if executed_locally {
        match ctx.shell.run_command(cmd, args).await {
            Ok(output) => (output.exit_code, output.stdout, output.stderr),
            Err(ExecutorError::DisallowedCommand(cmd)) => {
                return Response::error(ErrorCode::DisallowedCommand, cmd)
            }
            Err(e) => return Response::error(ErrorCode::Internal, e.to_string()),
        }
    } else {
        let request =
            Request::ExecuteCommand { cmd: cmd.to_string(), args: args.to_vec() };
        match ctx.peers.call(&device.grpc_addr, request).await {
            Ok(Response::CommandOutput { exit_code, stdout, stderr, .. }) => {
                (exit_code, stdout, stderr)
            }
            Ok(other) => {
                return Response::error(
                    ErrorCode::Internal,
                    format!("unexpected peer response: {other:?}"),
                )
            }
            Err(e) => return map_peer_error(e),
        }
    };

    Response::RoutedCommand {
        selected_device_id: selected,
        selected_device_name: device.name,
        executed_locally,
        total_time_ms: ctx.clock.epoch_ms().saturating_sub(start),
        exit_code,
        stdout,
        stderr,
    }
}

/// Worker-side primitive: execute one task through the local executor
/// registry. Failures are reported in-band so the calling engine records
/// them as task results, not RPC faults.
pub(super) async fn run_task(ctx: &ListenCtx, task: Task) -> Response {
    let start = ctx.clock.epoch_ms();
    let cancel = CancellationToken::new();
    let (ok, output, error) = match ctx.executors.execute(&task.input, &cancel).await {
        Ok(output) => (true, output.bytes, None),
        Err(ExecutorError::DisallowedCommand(cmd)) => {
            (false, Vec::new(), Some(format!("DISALLOWED_COMMAND: {cmd}")))
        }
        Err(ExecutorError::UnsupportedKind(kind)) => {
            (false, Vec::new(), Some(format!("UNSUPPORTED_KIND: {kind}")))
        }
        Err(e) => (false, Vec::new(), Some(e.to_string())),
    };
    Response::TaskDone {
        task_id: task.id,
        ok,
        output,
        error,
        time_ms: ctx.clock.epoch_ms().saturating_sub(start),
    }
}
