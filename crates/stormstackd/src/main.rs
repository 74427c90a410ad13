//! stormstackd — the StormStack Thunder control plane daemon.
//!
//! Single binary assembling every control-plane component (spec.md §1):
//! node registry (C1), match registry (C2), module catalog (C3),
//! scheduler (C4), match coordinator (C5), token issuer (C6), autoscaler
//! (C7), and proxy router (C8), served behind the axum REST/WS API.
//!
//! # Usage
//!
//! ```text
//! stormstackd serve --port 8443 --data-dir /var/lib/stormstack
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tokio::sync::watch;
use tracing::info;

use stormstack_api::{build_router, ApiState};
use stormstack_autoscale::Autoscaler;
use stormstack_coordinator::{EngineNode, HttpEngineNode, MatchCoordinator};
use stormstack_core::config::StormConfig;
use stormstack_matches::MatchRegistry;
use stormstack_modules::{FilesystemBlobStore, ModuleBlobStore, ModuleCatalog};
use stormstack_proxy::ProxyRouter;
use stormstack_registry::NodeRegistry;
use stormstack_scheduler::Scheduler;
use stormstack_state::StateStore;
use stormstack_tokens::{HttpIdentityService, IdentityService, NoopIdentityService, TokenIssuer};

#[derive(Parser)]
#[command(name = "stormstackd", about = "StormStack Thunder control plane daemon")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the control plane.
    Serve {
        /// Port to listen on.
        #[arg(long, default_value = "8443")]
        port: u16,

        /// Data directory for persistent state and uploaded modules.
        #[arg(long, default_value = "/var/lib/stormstack")]
        data_dir: PathBuf,

        /// Path to a `stormstack.toml` config file; defaults are used if absent.
        #[arg(long)]
        config_file: Option<PathBuf>,

        /// HMAC signing key for match tokens. Falls back to the
        /// `STORMSTACK_SIGNING_KEY` env var; refuses to start with neither.
        #[arg(long, env = "STORMSTACK_SIGNING_KEY")]
        signing_key: Option<String>,

        /// Base URL of the external `IdentityService`. When unset, the
        /// control plane runs with `NoopIdentityService`, denying every
        /// scope check unless `--insecure-allow-all` is also given.
        #[arg(long)]
        identity_service_url: Option<String>,

        /// Makes `NoopIdentityService` grant every scope. Only meant for
        /// local development without an identity service.
        #[arg(long)]
        insecure_allow_all: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,stormstackd=debug,stormstack=debug".parse().unwrap()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Serve {
            port,
            data_dir,
            config_file,
            signing_key,
            identity_service_url,
            insecure_allow_all,
        } => {
            serve(
                port,
                data_dir,
                config_file,
                signing_key,
                identity_service_url,
                insecure_allow_all,
            )
            .await
        }
    }
}

async fn serve(
    port: u16,
    data_dir: PathBuf,
    config_file: Option<PathBuf>,
    signing_key: Option<String>,
    identity_service_url: Option<String>,
    insecure_allow_all: bool,
) -> anyhow::Result<()> {
    info!("stormstackd starting");

    let signing_key = signing_key
        .ok_or_else(|| anyhow::anyhow!("a signing key is required: pass --signing-key or set STORMSTACK_SIGNING_KEY"))?;

    std::fs::create_dir_all(&data_dir)?;
    let config = match &config_file {
        Some(path) => StormConfig::from_file(path)?,
        None => StormConfig::default(),
    };

    // ── State store ────────────────────────────────────────────────
    let db_path = data_dir.join("stormstack.redb");
    let state = StateStore::open(&db_path)?;
    info!(path = ?db_path, "state store opened");

    // ── Components (C1-C8) ───────────────────────────────────────────
    let registry = Arc::new(NodeRegistry::new(
        state.clone(),
        config.node.ttl_secs,
        config.node.grace_secs(),
    ));

    let matches = Arc::new(MatchRegistry::new(state.clone(), 3600));

    let module_dir = data_dir.join(&config.module_storage.directory);
    std::fs::create_dir_all(&module_dir)?;
    let blobs: Arc<dyn ModuleBlobStore> = Arc::new(FilesystemBlobStore::new(&module_dir));
    let modules = Arc::new(ModuleCatalog::new(state.clone(), blobs, config.module_storage.max_file_size));

    let scheduler = Arc::new(Scheduler::new(state.clone()));

    let tokens = Arc::new(TokenIssuer::new(
        signing_key,
        config.token.expiry_secs,
        config.token.rotation_grace_secs,
    ));

    let engine: Arc<dyn EngineNode> = Arc::new(HttpEngineNode::new(Duration::from_secs(30)));
    let coordinator = Arc::new(MatchCoordinator::new(
        registry.clone(),
        matches.clone(),
        scheduler,
        engine,
        tokens.clone(),
        config.scheduler.retries,
    ));

    let autoscaler = Arc::new(Autoscaler::new(
        state.clone(),
        config.autoscaler.scale_up_threshold,
        config.autoscaler.scale_down_threshold,
        config.autoscaler.min_nodes,
        config.autoscaler.max_nodes,
        config.autoscaler.cooldown_secs,
    ));

    let proxy = Arc::new(ProxyRouter::new(
        matches.as_ref().clone(),
        config.proxy.enabled,
        Duration::from_secs(config.proxy.timeout_secs),
    ));

    let identity: Arc<dyn IdentityService> = match identity_service_url {
        Some(url) => {
            info!(%url, "identity service configured");
            Arc::new(HttpIdentityService::new(url))
        }
        None => {
            if insecure_allow_all {
                tracing::warn!("no identity service configured; running with --insecure-allow-all");
            } else {
                tracing::warn!("no identity service configured; every scope check will be denied");
            }
            Arc::new(NoopIdentityService::new(insecure_allow_all))
        }
    };

    let api_state = ApiState {
        registry: registry.clone(),
        matches: matches.clone(),
        modules,
        coordinator,
        tokens,
        autoscaler: autoscaler.clone(),
        proxy,
        identity,
    };

    // ── Background tasks ─────────────────────────────────────────────
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let sweeper_matches = matches.clone();
    let sweeper_handle = tokio::spawn(stormstack_registry::sweeper::run(
        registry,
        Duration::from_secs(config.node.sweep_interval_secs),
        shutdown_rx.clone(),
        move |node_id| {
            if let Err(e) = sweeper_matches.delete_for_node(node_id) {
                tracing::error!(error = %e, %node_id, "failed to delete matches for removed node");
            }
        },
    ));

    let retention_registry = matches.clone();
    let mut retention_shutdown = shutdown_rx.clone();
    let retention_handle = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(60));
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(e) = retention_registry.sweep_retention() {
                        tracing::error!(error = %e, "match retention sweep failed");
                    }
                }
                _ = retention_shutdown.changed() => break,
            }
        }
    });

    let autoscale_handle = if config.autoscaler.enabled {
        let autoscale_shutdown = shutdown_rx.clone();
        Some(tokio::spawn(async move {
            autoscaler.run(Duration::from_secs(config.autoscaler.poll_interval_secs), autoscale_shutdown).await;
        }))
    } else {
        None
    };

    // ── API server ─────────────────────────────────────────────────
    let router = build_router(api_state);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!(%addr, "API server starting");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    let server = axum::serve(listener, router).with_graceful_shutdown(async move {
        tokio::signal::ctrl_c().await.expect("failed to install CTRL+C handler");
        info!("shutdown signal received");
        let _ = shutdown_tx.send(true);
    });

    server.await?;

    sweeper_handle.abort();
    retention_handle.abort();
    if let Some(handle) = autoscale_handle {
        handle.abort();
    }

    info!("stormstackd stopped");
    Ok(())
}
