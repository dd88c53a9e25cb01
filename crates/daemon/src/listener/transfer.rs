// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! File-transfer handlers.
//!
//! `CreateDownloadTicket` mints the one-shot token for the out-of-band
//! bulk channel; `ReadFile` serves bounded windows directly for small
//! inspection reads. Both enforce the shared-root containment check.

use mesh_engine::{resolve_shared_path, TicketError};
use mesh_wire::{ErrorCode, ReadMode, Response};
use tokio::io::{AsyncReadExt, AsyncSeekExt};

use super::ListenCtx;

/// Default window for head/tail/range reads when no length is given.
const DEFAULT_WINDOW: u64 = 64 * 1024;

pub(super) fn create_ticket(ctx: &ListenCtx, path: &str) -> Response {
    match ctx.vault.mint(path) {
        Ok(ticket) => Response::Ticket {
            http_url: format!("http://{}/download/{}", ctx.bulk_http_addr, ticket.token),
            token: ticket.token,
            expires_ms: ticket.expires_ms,
        },
        Err(TicketError::DisallowedPath(path)) => {
            Response::error(ErrorCode::DisallowedPath, path)
        }
        Err(e) => Response::error(ErrorCode::Internal, e.to_string()),
    }
}

pub(super) async fn read_file(
    ctx: &ListenCtx,
    path: &str,
    mode: ReadMode,
    offset: Option<u64>,
    length: Option<u64>,
) -> Response {
    let resolved = match resolve_shared_path(ctx.vault.shared_root(), path) {
        Ok(p) => p,
        Err(TicketError::DisallowedPath(p)) => {
            return Response::error(ErrorCode::DisallowedPath, p)
        }
        Err(e) => return Response::error(ErrorCode::Internal, e.to_string()),
    };

    let mut file = match tokio::fs::File::open(&resolved).await {
        Ok(f) => f,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Response::error(ErrorCode::InvalidArgument, format!("no such file: {path}"))
        }
        Err(e) => return Response::error(ErrorCode::Internal, e.to_string()),
    };
    let file_len = match file.metadata().await {
        Ok(meta) => meta.len(),
        Err(e) => return Response::error(ErrorCode::Internal, e.to_string()),
    };

    let window = length.unwrap_or(DEFAULT_WINDOW);
    let (start, take) = match mode {
        ReadMode::Full => (0, file_len),
        ReadMode::Head => (0, window.min(file_len)),
        ReadMode::Tail => {
            let take = window.min(file_len);
            (file_len - take, take)
        }
        ReadMode::Range => {
            let start = offset.unwrap_or(0).min(file_len);
            (start, window.min(file_len - start))
        }
    };

    if start > 0 {
        if let Err(e) = file.seek(std::io::SeekFrom::Start(start)).await {
            return Response::error(ErrorCode::Internal, e.to_string());
        }
    }
    let mut data = vec![0u8; take as usize];
    if let Err(e) = file.read_exact(&mut data).await {
        return Response::error(ErrorCode::Internal, e.to_string());
    }
    Response::FileData { data }
}
