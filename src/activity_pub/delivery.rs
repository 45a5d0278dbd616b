use anyhow::Result;
use ractor::{Actor, ActorProcessingErr, ActorRef};
use ractor_cluster::RactorMessage;
use tokio::task::{block_in_place, spawn_blocking};
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::{DeliveryConfig, RuntimeConfig};

use super::mailman::Mailman;
use super::outbox::{OutboxQueue, ReceiveResult};

/// Drains the outbox, one message per loop iteration.
pub(crate) struct DeliveryWorker;

#[derive(RactorMessage)]
pub(crate) enum DeliveryWorkerMsg {
    RunLoop,
}

pub(crate) struct DeliveryWorkerInit {
    pub(crate) config: RuntimeConfig,
}

pub(crate) struct DeliveryWorkerState {
    queue: OutboxQueue,
    mailman: Mailman,
    delivery: DeliveryConfig,
}

impl Actor for DeliveryWorker {
    type Msg = DeliveryWorkerMsg;
    type State = DeliveryWorkerState;
    type Arguments = DeliveryWorkerInit;

    async fn pre_start(
        &self,
        _myself: ActorRef<Self::Msg>,
        args: Self::Arguments,
    ) -> Result<Self::State, ActorProcessingErr> {
        let DeliveryWorkerInit { config } = args;
        let delivery = config.init.delivery.clone();
        block_in_place(|| {
            let queue = OutboxQueue::new(config.keyspace.clone())?;
            let mailman = Mailman::new(delivery.request_timeout())?;
            Ok(DeliveryWorkerState {
                queue,
                mailman,
                delivery,
            })
        })
    }

    async fn post_start(
        &self,
        myself: ActorRef<Self::Msg>,
        _state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        info!(target: "lifecycle", "delivery worker started");
        ractor::cast!(myself, DeliveryWorkerMsg::RunLoop)?;
        Ok(())
    }

    async fn handle(
        &self,
        myself: ActorRef<Self::Msg>,
        message: Self::Msg,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        match message {
            DeliveryWorkerMsg::RunLoop => {
                let retry = state.delivery.retry_interval();
                match state.handle_delivery().await {
                    Ok(true) => {
                        // There might be more work to do, immediately schedule next loop
                        ractor::cast!(myself, DeliveryWorkerMsg::RunLoop)?;
                    }
                    Ok(false) => {
                        myself.send_after(retry, || DeliveryWorkerMsg::RunLoop);
                    }
                    Err(error) => {
                        warn!(target: "delivery", %error, "delivery loop failed");
                        myself.send_after(retry, || DeliveryWorkerMsg::RunLoop);
                    }
                }
            }
        }
        Ok(())
    }
}

impl DeliveryWorkerState {
    /// Returns whether a message was taken off the queue.
    async fn handle_delivery(&mut self) -> Result<bool> {
        let receipt_handle = Uuid::now_v7().into_bytes();
        let visibility_timeout = self.delivery.visibility_timeout_secs;
        let max_receive_count = self.delivery.max_receive_count;
        let queue = self.queue.clone();
        let received = spawn_blocking(move || {
            queue.receive_message(
                receipt_handle,
                OutboxQueue::now(),
                visibility_timeout,
                max_receive_count,
            )
        })
        .await??;
        let Some(ReceiveResult { key, message }) = received else {
            return Ok(false);
        };

        let inbox = message.path.url().to_string();
        if let Err(error) = self.mailman.post(&inbox, &message.body).await {
            // Left in place, it becomes visible again after the timeout until
            // `max_receive_count` attempts were made.
            warn!(
                target: "delivery",
                %inbox,
                attempts = message.approximate_receive_count,
                %error,
                "post failed"
            );
            return Ok(true);
        }
        info!(target: "delivery", %inbox, "delivered");

        let queue = self.queue.clone();
        let acked = spawn_blocking(move || queue.delete_message(&key, receipt_handle)).await??;
        if !acked {
            warn!(target: "delivery", %inbox, "receipt handle expired before ack");
        }
        Ok(true)
    }
}
