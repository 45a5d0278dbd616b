use std::thread;
use std::time::Duration;

use anyhow::Result;
use fjall::Keyspace;
use ractor::{Actor, ActorProcessingErr, ActorRef, SupervisionEvent};
use ractor_cluster::RactorMessage;
use tracing::{info, warn};

use crate::activity_pub::delivery::{DeliveryWorker, DeliveryWorkerInit, DeliveryWorkerMsg};
use crate::activity_pub::outbox::OutboxQueue;
use crate::activity_pub::repo::NoteRepo;
use crate::config::RuntimeConfig;

pub struct Supervisor;

#[derive(RactorMessage)]
pub enum SupervisorMsg {
    KeyspaceMaint,
}

pub struct SupervisorState {
    config: RuntimeConfig,
    myself: ActorRef<SupervisorMsg>,
}

impl Actor for Supervisor {
    type Msg = SupervisorMsg;
    type State = SupervisorState;
    type Arguments = RuntimeConfig;

    async fn pre_start(
        &self,
        myself: ActorRef<Self::Msg>,
        config: Self::Arguments,
    ) -> Result<Self::State, ActorProcessingErr> {
        Ok(SupervisorState { config, myself })
    }

    async fn post_start(
        &self,
        myself: ActorRef<Self::Msg>,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        info!(target: "lifecycle", "started");

        state.spawn_delivery_worker().await?;

        myself.send_interval(Duration::from_secs(24 * 60 * 60), || {
            SupervisorMsg::KeyspaceMaint
        });
        state.gc_keyspace();

        Ok(())
    }

    async fn handle(
        &self,
        _myself: ActorRef<Self::Msg>,
        message: Self::Msg,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        match message {
            SupervisorMsg::KeyspaceMaint => state.gc_keyspace(),
        }
        Ok(())
    }

    async fn handle_supervisor_evt(
        &self,
        _myself: ActorRef<Self::Msg>,
        message: SupervisionEvent,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        if let SupervisionEvent::ActorFailed(actor_cell, error) = message {
            if actor_cell
                .is_message_type_of::<DeliveryWorkerMsg>()
                .is_some_and(|x| x)
            {
                info!(target: "supervision", error, "delivery worker crashed, restarting...");
                state.spawn_delivery_worker().await?;
            }
        }
        Ok(())
    }
}

impl SupervisorState {
    fn gc_keyspace(&self) {
        let keyspace = self.config.keyspace.clone();
        thread::spawn(move || {
            if let Err(error) = collect_garbage(&keyspace) {
                warn!(target: "supervision", %error, "garbage collection failed");
            }
        });
    }

    async fn spawn_delivery_worker(&self) -> Result<()> {
        Actor::spawn_linked(
            Some("delivery_worker".into()),
            DeliveryWorker,
            DeliveryWorkerInit {
                config: self.config.clone(),
            },
            self.myself.get_cell(),
        )
        .await?;
        Ok(())
    }
}

/// Blob garbage collection over the partitions opened with KV separation.
fn collect_garbage(keyspace: &Keyspace) -> Result<()> {
    OutboxQueue::new(keyspace.clone())?.gc()?;
    NoteRepo::new(keyspace.clone())?.gc()?;
    Ok(())
}
