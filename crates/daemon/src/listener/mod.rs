// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! TCP listener for the RPC plane.
//!
//! Accepts connections and handles each in a spawned task. Every request
//! frame carries the shared secret; validation happens here, before any
//! handler runs. A client disconnect cancels the in-flight handler, but
//! never work that already left it (a submitted job keeps running).

mod exec;
mod jobs;
mod media;
mod registry;
mod session;
mod transfer;

use std::sync::Arc;

use mesh_adapters::{ExecutorRegistry, FrameProducer, ShellExecutor};
use mesh_core::SystemClock;
use mesh_engine::{
    DeviceRegistry, DownloadTicketVault, JobEngine, MediaSessionManager, Planner,
};
use mesh_wire::{read_envelope, write_response, ErrorCode, Request, Response};
use tokio::io::AsyncReadExt;
use tokio::net::{TcpListener, TcpStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::env::ipc_timeout;
use crate::peer_client::PeerClient;
use crate::sessions::SessionTable;

/// Shared daemon context for all request handlers.
pub struct ListenCtx {
    pub registry: Arc<DeviceRegistry>,
    pub engine: Arc<JobEngine<SystemClock>>,
    pub media: Arc<MediaSessionManager<SystemClock>>,
    pub vault: Arc<DownloadTicketVault<SystemClock>>,
    pub planner: Arc<Planner>,
    pub executors: Arc<ExecutorRegistry>,
    pub shell: Arc<ShellExecutor>,
    pub sessions: Arc<SessionTable<SystemClock>>,
    pub peers: Arc<PeerClient>,
    pub local_producer: Option<Arc<dyn FrameProducer>>,
    /// Shared auth secret (`DEV_KEY`); validated on every call.
    pub dev_key: String,
    /// Advertised bulk-transfer address, baked into ticket URLs.
    pub bulk_http_addr: String,
    pub clock: SystemClock,
}

/// Listener task accepting RPC connections.
pub struct Listener {
    tcp: TcpListener,
    ctx: Arc<ListenCtx>,
}

impl Listener {
    pub fn new(tcp: TcpListener, ctx: Arc<ListenCtx>) -> Self {
        Self { tcp, ctx }
    }

    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.tcp.local_addr()
    }

    /// Accept loop. Runs until `shutdown` fires; never exits on a bad peer.
    pub async fn run(self, shutdown: CancellationToken) {
        info!(addr = ?self.tcp.local_addr().ok(), "RPC listener running");
        loop {
            let accepted = tokio::select! {
                result = self.tcp.accept() => result,
                _ = shutdown.cancelled() => break,
            };
            match accepted {
                Ok((stream, addr)) => {
                    let ctx = Arc::clone(&self.ctx);
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(stream, addr, &ctx).await {
                            log_connection_error(e);
                        }
                    });
                }
                Err(e) => error!(error = %e, "accept error"),
            }
        }
        info!("RPC listener stopped");
    }
}

fn log_connection_error(e: mesh_wire::ProtocolError) {
    match e {
        mesh_wire::ProtocolError::ConnectionClosed => debug!("client disconnected"),
        mesh_wire::ProtocolError::Timeout => warn!("connection timeout"),
        other => error!(error = %other, "connection error"),
    }
}

/// Handle a single client connection: one request, one response.
async fn handle_connection(
    mut stream: TcpStream,
    peer_addr: std::net::SocketAddr,
    ctx: &ListenCtx,
) -> Result<(), mesh_wire::ProtocolError> {
    let envelope = read_envelope(&mut stream, ipc_timeout()).await?;

    // Auth rides on every call, not a handshake.
    if envelope.token != ctx.dev_key {
        let response = Response::error(ErrorCode::Unauthenticated, "bad or missing auth token");
        write_response(&mut stream, &response, ipc_timeout()).await?;
        return Ok(());
    }

    debug!(request = ?envelope.request, %peer_addr, "received request");

    // Race the handler against client disconnect. Work that already left
    // the handler (a submitted job, a spawned driver) is unaffected; only
    // the response is abandoned.
    let (mut reader, mut writer) = stream.into_split();
    let response = tokio::select! {
        response = handle_request(envelope.request, peer_addr, ctx) => response,
        _ = detect_client_disconnect(&mut reader) => {
            debug!("client disconnected, dropping handler");
            return Ok(());
        }
    };

    write_response(&mut writer, &response, ipc_timeout()).await?;
    Ok(())
}

/// In this strict request/response protocol the client sends nothing after
/// its request; a read completing means EOF (or a protocol violation).
async fn detect_client_disconnect<R: AsyncReadExt + Unpin>(reader: &mut R) {
    let mut buf = [0u8; 1];
    let _ = reader.read(&mut buf).await;
}

/// Dispatch one authenticated request.
async fn handle_request(
    request: Request,
    peer_addr: std::net::SocketAddr,
    ctx: &ListenCtx,
) -> Response {
    match request {
        // ── Session ─────────────────────────────────────────────────────
        Request::CreateSession => session::create(ctx),
        Request::Heartbeat { session_id } => session::heartbeat(ctx, &session_id),
        Request::HealthCheck => session::health(ctx),

        // ── Registry ────────────────────────────────────────────────────
        Request::RegisterDevice { device } => registry::register(ctx, device),
        Request::ListDevices => registry::list(ctx),
        Request::GetDeviceStatus { device_id } => registry::status(ctx, device_id).await,

        // ── Execution ───────────────────────────────────────────────────
        Request::ExecuteCommand { cmd, args } => exec::execute(ctx, &cmd, &args).await,
        Request::ExecuteRoutedCommand { cmd, args, policy } => {
            exec::execute_routed(ctx, &cmd, &args, &policy).await
        }
        Request::RunTask { task } => exec::run_task(ctx, task).await,

        // ── Jobs ────────────────────────────────────────────────────────
        Request::SubmitJob { text, plan, max_workers } => {
            jobs::submit(ctx, text, plan, max_workers).await
        }
        Request::GetJob { job_id } => jobs::get(ctx, &job_id),
        Request::CancelJob { job_id } => jobs::cancel(ctx, &job_id),
        Request::PreviewPlan { text } => jobs::preview(ctx, &text).await,
        Request::PreviewPlanCost { plan } => jobs::preview_cost(ctx, &plan),

        // ── Media ───────────────────────────────────────────────────────
        Request::StartMediaSession { policy, fps, quality, monitor_index } => {
            media::start(ctx, &policy, fps, quality, monitor_index, &peer_addr.to_string()).await
        }
        Request::CompleteMediaSession { stream_id, answer_sdp } => {
            media::complete(ctx, &stream_id, &answer_sdp).await
        }
        Request::StopMediaSession { stream_id } => media::stop(ctx, &stream_id).await,
        Request::CreateCaptureOffer { stream_id, fps, quality, monitor_index } => {
            media::create_offer(ctx, &stream_id, fps, quality, monitor_index).await
        }
        Request::AcceptCaptureAnswer { stream_id, answer_sdp } => {
            media::accept_answer(ctx, &stream_id, &answer_sdp).await
        }
        Request::StopCapture { stream_id } => media::stop_capture(ctx, &stream_id).await,

        // ── Transfer ────────────────────────────────────────────────────
        Request::CreateDownloadTicket { path } => transfer::create_ticket(ctx, &path),
        Request::ReadFile { path, mode, offset, length } => {
            transfer::read_file(ctx, &path, mode, offset, length).await
        }
    }
}
