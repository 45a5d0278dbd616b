mod flags;

use std::path::Path;

use agora::activity_pub::repo::ActorCache;
use agora::activity_pub::{Actor, ActorStore, Inbox};
use agora::config::{Config, RuntimeConfig};
use agora::supervisor::Supervisor;
use anyhow::{Context, Result};
use ractor::Actor as _;
use serde_json::Value;
use tokio::signal::unix::{SignalKind, signal};
use tokio::task::block_in_place;
use tracing::info;

use crate::flags::{AddUser, AgoraCmd, Receive};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let flags = flags::Agora::from_env_or_exit();
    let init = match &flags.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    let keyspace = fjall::Config::new(&init.server.data_dir)
        .open()
        .with_context(|| format!("unable to open keyspace in {}", init.server.data_dir.display()))?;
    let config = RuntimeConfig { init, keyspace };

    match flags.subcommand {
        AgoraCmd::Serve(_) => serve(config).await,
        AgoraCmd::Receive(cmd) => receive(config, cmd).await,
        AgoraCmd::AddUser(cmd) => add_user(config, cmd),
    }
}

async fn serve(config: RuntimeConfig) -> Result<()> {
    let (supervisor, actor_handle) =
        Supervisor::spawn(Some("supervisor".into()), Supervisor, config).await?;

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    loop {
        tokio::select! {
            _ = sigterm.recv() => {
                info!("Received the terminate signal; stopping");
                break;
            }
            _ = sigint.recv() => {
                info!("Received the interrupt signal; stopping");
                break;
            }
        }
    }

    supervisor.stop(None);
    actor_handle.await?;

    Ok(())
}

async fn receive(config: RuntimeConfig, cmd: Receive) -> Result<()> {
    let raw = read_document(&cmd.file).await?;
    let graph = block_in_place(|| -> Result<_> {
        let inbox = Inbox::open(&config)?;
        Ok(inbox.receive(&raw, &cmd.origin)?)
    })?;
    let root = graph.root();
    info!(id = root.id(), kind = %root.activity_type(), nodes = graph.len(), "received");
    Ok(())
}

fn add_user(config: RuntimeConfig, cmd: AddUser) -> Result<()> {
    let apub = &config.init.activity_pub;
    let actors = ActorCache::new(config.keyspace.clone(), apub.base_url.clone())?;
    let actor = Actor::local(apub, &cmd.uid);
    actors.upsert(actor.clone())?;
    println!("{}", serde_json::to_string_pretty(&actor.to_value())?);
    Ok(())
}

async fn read_document(path: &Path) -> Result<Value> {
    let text = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("unable to read {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("{} is not JSON", path.display()))
}
