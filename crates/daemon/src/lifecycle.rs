// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon startup and shutdown.
//!
//! Startup order matters: identity first (fatal on failure), then local
//! backends, then the bound RPC listener, and discovery last so we never
//! announce an address we cannot serve.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use mesh_adapters::{
    default_allowlist, EchoExecutor, ExecutorRegistry, HttpPlanner, ImageExecutor, LlmExecutor,
    ShellExecutor, SysinfoExecutor,
};
use mesh_core::{Clock, SystemClock, TaskKind};
use mesh_engine::{
    registry::spawn_purge_task, tickets::spawn_sweep_task, DeviceRegistry, DownloadTicketVault,
    JobEngine, JobEngineConfig, MediaSessionManager, Planner,
};
use thiserror::Error;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::discovery::{DiscoveryAgent, DiscoveryConfig};
use crate::env;
use crate::identity;
use crate::listener::{ListenCtx, Listener};
use crate::peer_client::PeerClient;
use crate::sessions::{SessionTable, SESSION_STALE};

/// Interval for the client-session sweep.
const SESSION_SWEEP_INTERVAL: Duration = Duration::from_secs(30);

/// Errors that abort startup.
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("cannot determine a data directory (set MESH_DATA_DIR)")]
    NoDataDir,

    #[error("device identity at {0}: {1}")]
    Identity(PathBuf, std::io::Error),

    #[error("failed to bind {0}: {1}")]
    Bind(String, std::io::Error),

    #[error("discovery socket: {0}")]
    Discovery(std::io::Error),
}

/// Resolved daemon configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub grpc_addr: String,
    pub dev_key: String,
    pub bulk_http_addr: String,
    pub bulk_ttl: Duration,
    pub shared_dir: PathBuf,
    pub p2p_discovery: bool,
    pub discovery_port: u16,
    /// LAN broadcast toggle; seed unicast still runs when this is off.
    pub discovery_broadcast: bool,
    pub seed_peers: Vec<String>,
    pub media_idle_timeout: Duration,
    pub data_dir: PathBuf,
    pub llm_endpoint: Option<String>,
    pub llm_model: String,
    pub image_endpoint: Option<String>,
    pub planner_endpoint: Option<String>,
    pub extra_capabilities: Vec<String>,
}

impl Config {
    pub fn from_env() -> Result<Self, LifecycleError> {
        Ok(Self {
            grpc_addr: env::grpc_addr(),
            dev_key: env::dev_key(),
            bulk_http_addr: env::bulk_http_addr(),
            bulk_ttl: env::bulk_ttl(),
            shared_dir: env::shared_dir(),
            p2p_discovery: env::p2p_discovery(),
            discovery_port: env::discovery_port(),
            discovery_broadcast: true,
            seed_peers: env::seed_peers(),
            media_idle_timeout: env::media_idle_timeout(),
            data_dir: env::data_dir()?,
            llm_endpoint: env::llm_endpoint(),
            llm_model: env::llm_model(),
            image_endpoint: env::image_endpoint(),
            planner_endpoint: env::planner_endpoint(),
            extra_capabilities: env::extra_capabilities(),
        })
    }
}

/// A running daemon and the handles needed to stop it.
pub struct Daemon {
    pub registry: Arc<DeviceRegistry>,
    rpc_addr: std::net::SocketAddr,
    discovery: Option<DiscoveryAgent>,
    shutdown: CancellationToken,
}

impl Daemon {
    /// Address the RPC listener actually bound.
    pub fn rpc_addr(&self) -> std::net::SocketAddr {
        self.rpc_addr
    }

    /// Port the discovery socket actually bound, when discovery runs.
    pub fn discovery_port(&self) -> Option<u16> {
        self.discovery.as_ref().and_then(|d| d.local_port().ok())
    }

    /// Add a unicast discovery seed for a peer learned after startup.
    pub fn add_discovery_seed(&self, addr: String) {
        if let Some(discovery) = &self.discovery {
            discovery.add_seed_peer(addr);
        }
    }

    /// Graceful shutdown: LEAVE the mesh, then stop all tasks. Jobs are
    /// in-memory by design; anything unfinished dies with the process.
    pub async fn shutdown(self) {
        if let Some(discovery) = &self.discovery {
            discovery.stop(&SystemClock).await;
        }
        self.shutdown.cancel();
        info!("daemon stopped");
    }
}

/// Start a daemon from resolved configuration.
pub async fn start(config: Config) -> Result<Daemon, LifecycleError> {
    let clock = SystemClock;
    let shutdown = CancellationToken::new();

    // 1. Identity. Failure here is fatal: a node without a stable ID
    //    would fork its registry entry on every restart.
    let device_id = identity::load_or_create_device_id(&config.data_dir)?;

    // 2. Local task backends: what this host can actually run.
    let shell = Arc::new(ShellExecutor::new(default_allowlist()));
    let mut executors = ExecutorRegistry::new();
    executors.register(TaskKind::Shell, Arc::new(ShellExecutor::new(default_allowlist())));
    executors.register(TaskKind::Sysinfo, Arc::new(SysinfoExecutor));
    executors.register(TaskKind::Echo, Arc::new(EchoExecutor));
    if let Some(endpoint) = &config.llm_endpoint {
        executors
            .register(TaskKind::LlmGenerate, Arc::new(LlmExecutor::new(endpoint, &config.llm_model)));
    }
    if let Some(endpoint) = &config.image_endpoint {
        executors.register(TaskKind::ImageGenerate, Arc::new(ImageExecutor::new(endpoint)));
    }
    let executors = Arc::new(executors);

    // 3. Bind the RPC listener before advertising anything.
    let tcp = TcpListener::bind(&config.grpc_addr)
        .await
        .map_err(|e| LifecycleError::Bind(config.grpc_addr.clone(), e))?;
    let rpc_addr = tcp.local_addr().map_err(|e| LifecycleError::Bind(config.grpc_addr.clone(), e))?;
    let advertised_grpc = format!("0.0.0.0:{}", rpc_addr.port());

    // 4. Self-registration.
    let self_device = identity::build_self_device(
        device_id,
        &advertised_grpc,
        &config.bulk_http_addr,
        &executors,
        false,
        &config.extra_capabilities,
        config.llm_endpoint.as_ref().map(|_| config.llm_model.clone()),
        clock.epoch_ms(),
    );
    info!(device_id = %device_id, name = %self_device.name, "self-registered");
    let registry = Arc::new(DeviceRegistry::new(self_device));

    // 5. Orchestration core.
    let peers = Arc::new(PeerClient::new(config.dev_key.clone(), env::ipc_timeout()));
    let engine = Arc::new(JobEngine::new(
        Arc::clone(&registry),
        peers.clone(),
        Arc::clone(&executors),
        clock.clone(),
        JobEngineConfig::default(),
    ));
    let media = Arc::new(MediaSessionManager::new(
        Arc::clone(&registry),
        peers.clone(),
        None,
        clock.clone(),
        config.media_idle_timeout,
    ));
    let vault = Arc::new(DownloadTicketVault::new(
        config.shared_dir.clone(),
        config.bulk_ttl,
        clock.clone(),
    ));
    let planner = Arc::new(Planner::new(
        config
            .planner_endpoint
            .as_ref()
            .map(|e| Arc::new(HttpPlanner::new(e)) as Arc<dyn mesh_adapters::PlannerAdapter>),
    ));
    let sessions = Arc::new(SessionTable::new(clock.clone()));

    // 6. RPC listener.
    let ctx = Arc::new(ListenCtx {
        registry: Arc::clone(&registry),
        engine,
        media,
        vault: Arc::clone(&vault),
        planner,
        executors,
        shell,
        sessions: Arc::clone(&sessions),
        peers,
        local_producer: None,
        dev_key: config.dev_key.clone(),
        bulk_http_addr: config.bulk_http_addr.clone(),
        clock: clock.clone(),
    });
    let listener = Listener::new(tcp, ctx);
    tokio::spawn(listener.run(shutdown.clone()));

    // 7. Background tickers.
    spawn_purge_task(Arc::clone(&registry), clock.clone(), shutdown.clone());
    spawn_sweep_task(vault, shutdown.clone());
    spawn_session_sweep(sessions, shutdown.clone());

    // 8. Discovery last: only announce what we can serve.
    let discovery = if config.p2p_discovery {
        let mut discovery_config =
            DiscoveryConfig::new(config.discovery_port, config.seed_peers.clone());
        discovery_config.broadcast = config.discovery_broadcast;
        let agent = DiscoveryAgent::bind(discovery_config, Arc::clone(&registry))
            .await
            .map_err(LifecycleError::Discovery)?;
        agent.start(clock);
        Some(agent)
    } else {
        None
    };

    info!(%rpc_addr, "daemon started");
    Ok(Daemon { registry, rpc_addr, discovery, shutdown })
}

fn spawn_session_sweep(
    sessions: Arc<SessionTable<SystemClock>>,
    shutdown: CancellationToken,
) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(SESSION_SWEEP_INTERVAL);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    sessions.sweep(SESSION_STALE);
                }
                _ = shutdown.cancelled() => break,
            }
        }
    });
}
