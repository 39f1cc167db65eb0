//! # Node entrypoint
//!
//! Wires a config file, a peers file, and a key file into a running
//! gossip node: binds the sync listener, starts the gossip/commit/intake
//! loops and the reference application, then waits for `ctrl_c` or a
//! fatal integrity failure before draining everything with a bounded
//! shutdown window.

use clap::Parser;
use node::{commit, config, default_app, fatal, gossip, handler, intake, keys, peers, state};
use node_core::Core;
use poset::{Poset, PosetConfig};
use shared_types::{NodeError, NodeState, Participant};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use store::adapters::rocksdb::{RocksDbConfig, RocksDbStore};
use store::Store;
use sync::{SyncClient, SyncServer};
use tracing::{error, info, warn};

const SHUTDOWN_DRAIN: Duration = Duration::from_secs(3);
const CHANNEL_BUFFER: usize = 256;

#[derive(Parser, Debug)]
#[command(about = "Gossip node for the poset consensus engine")]
struct Cli {
    /// Directory holding config.toml, peers.json, key.pem, and the store.
    #[arg(long, default_value = "./data")]
    datadir: PathBuf,
    /// Overrides this node's listen address instead of using the peers
    /// file entry matching its own public key.
    #[arg(long)]
    listen: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let subscriber = tracing_subscriber::FmtSubscriber::builder()
        .with_max_level(tracing::Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting global tracing subscriber");

    let cli = Cli::parse();
    if let Err(err) = run(cli).await {
        error!(error = %err, "node exited with an error");
        return Err(err.into());
    }
    Ok(())
}

async fn run(cli: Cli) -> Result<(), NodeError> {
    std::fs::create_dir_all(&cli.datadir)
        .map_err(|err| NodeError::Startup(format!("creating data directory: {err}")))?;

    let config = config::NodeConfig::load(&cli.datadir.join("config.toml"))?;
    let keypair = keys::load_or_generate(&cli.datadir.join("key.pem"))?;
    let participants = peers::load(&cli.datadir.join("peers.json"))?;

    let self_id = Participant::derive_id(keypair.public_key().as_bytes());
    let self_participant = participants
        .get(self_id)
        .ok_or_else(|| NodeError::Startup("this node's key is not listed in the peers file".to_string()))?
        .clone();
    let listen_addr = cli.listen.clone().unwrap_or_else(|| self_participant.net_addr.clone());

    info!(self_id, %listen_addr, peers = participants.len(), "starting node");

    let store: Arc<dyn Store> = Arc::new(
        RocksDbStore::open(RocksDbConfig {
            path: cli.datadir.join("store").to_string_lossy().to_string(),
            event_cache_size: config.store.event_cache_size,
            ..RocksDbConfig::default()
        })
        .map_err(NodeError::Integrity)?,
    );

    let needs_bootstrap = store.need_bootstrap().map_err(NodeError::Integrity)?;
    let (poset, commit_rx) = if needs_bootstrap {
        Poset::new(store.clone(), participants.clone(), PosetConfig::default())
    } else {
        info!("resuming from existing datadir, replaying persisted events");
        Poset::rebuild(store.clone(), participants.clone(), PosetConfig::default())
            .map_err(|err| NodeError::Startup(format!("replaying persisted events: {err}")))?
    };
    let poset = Arc::new(poset);
    let core = Arc::new(Core::new(store.clone(), poset.clone(), participants.clone(), keypair)?);

    let (proxy, app_handle, proxy_driver) = proxy::Proxy::new(CHANNEL_BUFFER);
    let proxy = Arc::new(proxy);

    let handler = Arc::new(handler::CoreSyncHandler::new(core.clone(), store.clone()));
    let sync_server = SyncServer::bind_with_limit(&listen_addr, handler, config.node.sync_limit)
        .await
        .map_err(|err| NodeError::Startup(format!("binding sync listener on {listen_addr}: {err}")))?;

    let client = SyncClient::new(Duration::from_millis(config.node.rpc_timeout_ms));
    let (fatal_handle, mut fatal_rx) = fatal::channel();
    let node_state = state::NodeStateHandle::new(NodeState::Babbling);
    let gossip_driver = gossip::GossipDriver::new(
        core.clone(),
        poset.clone(),
        store.clone(),
        participants.clone(),
        self_id,
        client,
        node_state.clone(),
        fatal_handle,
        Duration::from_millis(config.node.gossip_tick_ms),
    );

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);

    let mut tasks = Vec::new();
    tasks.push(tokio::spawn(sync_server.serve(shutdown_rx.clone())));
    tasks.push(tokio::spawn(gossip_driver.run(shutdown_rx.clone())));
    tasks.push(tokio::spawn(commit::run(commit_rx, proxy.clone(), core.clone(), shutdown_rx.clone())));
    tasks.push(tokio::spawn(intake::run(proxy.clone(), core.clone(), shutdown_rx.clone())));
    tasks.push(tokio::spawn(proxy_driver.run()));
    tasks.push(tokio::spawn(default_app::run(app_handle)));

    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            if let Err(err) = result {
                warn!(error = %err, "failed to listen for ctrl_c, shutting down anyway");
            } else {
                info!("received shutdown signal");
            }
        }
        reason = fatal_rx.recv() => {
            error!(reason = ?reason, "fatal error reported, shutting down");
        }
    }

    node_state.set(NodeState::Shutdown);
    let _ = shutdown_tx.send(true);
    drop(proxy);

    let drain = tokio::time::timeout(SHUTDOWN_DRAIN, futures_join_all(tasks)).await;
    if drain.is_err() {
        warn!("shutdown drain window elapsed before all tasks finished");
    }
    Ok(())
}

async fn futures_join_all(tasks: Vec<tokio::task::JoinHandle<()>>) {
    for task in tasks {
        let _ = task.await;
    }
}
