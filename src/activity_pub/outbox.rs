//! Persisted outbound delivery queue.
//!
//! Messages are keyed by priority rank followed by a time ordered UUID, so a
//! plain key scan drains TOP before HIGH before LOW and FIFO within a tier.

use std::sync::{Arc, Mutex};

use anyhow::{Context, anyhow};
use fjall::{
    GarbageCollection, Keyspace, KvSeparationOptions, PartitionCreateOptions, PartitionHandle,
    PersistMode, UserKey,
};
use jiff::Timestamp;
use minicbor::{Decode, Encode};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{Error, Result};

use super::instance_path::InstancePath;
use super::model::NodeRef;

pub(crate) type Bytes = [u8; 16];

/// Hands outbound activities to the transport.
pub trait OutboundDelivery: Send + Sync {
    /// Succeeds once every path has been accepted for delivery.
    fn send(&self, activity: NodeRef<'_>, paths: &[InstancePath]) -> Result<()>;
}

#[derive(Debug, Encode, Decode)]
pub(crate) struct QueueMessage {
    #[n(0)]
    pub(crate) body: String,
    #[n(1)]
    pub(crate) path: InstancePath,
    #[n(2)]
    pub(crate) receipt_handle: Bytes,
    #[n(3)]
    pub(crate) approximate_receive_count: u64,
}

#[derive(Debug)]
pub(crate) struct ReceiveResult {
    pub(crate) key: UserKey,
    pub(crate) message: QueueMessage,
}

#[derive(Clone)]
pub struct OutboxQueue {
    keyspace: Keyspace,
    messages: PartitionHandle,
    visibility: PartitionHandle,
    receive_lock: Arc<Mutex<()>>,
}

impl OutboxQueue {
    pub fn new(keyspace: Keyspace) -> anyhow::Result<OutboxQueue> {
        let messages = keyspace.open_partition(
            "outbox_messages",
            PartitionCreateOptions::default().with_kv_separation(KvSeparationOptions::default()),
        )?;
        let visibility =
            keyspace.open_partition("outbox_visibility", PartitionCreateOptions::default())?;
        Ok(OutboxQueue {
            keyspace,
            messages,
            visibility,
            receive_lock: Arc::new(Mutex::new(())),
        })
    }

    pub(crate) fn now() -> u64 {
        Timestamp::now().as_second().max(0) as u64
    }

    /// Reclaims blob space left behind by delivered messages.
    pub(crate) fn gc(&self) -> anyhow::Result<()> {
        self.messages.gc_with_staleness_threshold(0.5)?;
        Ok(())
    }

    pub fn is_empty(&self) -> anyhow::Result<bool> {
        self.messages
            .is_empty()
            .context("unable to read from outbox messages")
    }

    pub fn len(&self) -> anyhow::Result<usize> {
        let mut count = 0;
        for item in self.messages.iter() {
            item?;
            count += 1;
        }
        Ok(count)
    }

    /// Enqueue one message per path in a single batch.
    pub(crate) fn send_messages(&self, body: &str, paths: &[InstancePath]) -> anyhow::Result<()> {
        let mut batch = self.keyspace.batch();
        for path in paths {
            let id = Uuid::now_v7().into_bytes();
            let message = QueueMessage {
                body: body.to_string(),
                path: path.clone(),
                receipt_handle: id,
                approximate_receive_count: 0,
            };
            debug!(target: "delivery", inbox = path.url(), priority = ?path.priority(), "enqueue message");
            let bytes = minicbor::to_vec(&message)?;
            batch.insert(&self.messages, queue_key(path, id), bytes);
        }
        batch.commit()?;
        self.keyspace.persist(PersistMode::SyncAll)?;
        Ok(())
    }

    // Visibility is tracked with the caller supplied `now` so it stays
    // consistent across restarts. Messages already received
    // `max_receive_count` times are dropped instead of handed out again.
    pub(crate) fn receive_message(
        &self,
        new_receipt_handle: Bytes,
        now: u64,
        visibility_timeout: u64,
        max_receive_count: u64,
    ) -> anyhow::Result<Option<ReceiveResult>> {
        let _guard = self
            .receive_lock
            .lock()
            .map_err(|_| anyhow!("outbox receive lock poisoned"))?;
        for item in self.messages.iter() {
            let (key, value_bytes) = item?;

            if let Some(visible_at) = self.visibility.get(&key)? {
                let visible_at = u64::from_le_bytes(visible_at.as_ref().try_into()?);
                if visible_at > now {
                    continue;
                }
            }

            let mut message: QueueMessage = minicbor::decode(&value_bytes)?;
            if message.approximate_receive_count >= max_receive_count {
                warn!(
                    target: "delivery",
                    inbox = message.path.url(),
                    attempts = message.approximate_receive_count,
                    "giving up on message"
                );
                let mut batch = self.keyspace.batch();
                batch.remove(&self.messages, key.clone());
                batch.remove(&self.visibility, key);
                batch.commit()?;
                self.keyspace.persist(PersistMode::SyncAll)?;
                continue;
            }

            let new_visible_at = now + visibility_timeout;

            let mut batch = self.keyspace.batch();
            batch.insert(&self.visibility, key.clone(), new_visible_at.to_le_bytes());

            message.receipt_handle = new_receipt_handle;
            message.approximate_receive_count += 1;
            let bytes = minicbor::to_vec(&message)?;
            batch.insert(&self.messages, key.clone(), bytes);

            batch.commit()?;
            self.keyspace.persist(PersistMode::SyncAll)?;

            debug!(
                target: "delivery",
                inbox = message.path.url(),
                receive_count = message.approximate_receive_count,
                "received message"
            );

            return Ok(Some(ReceiveResult { key, message }));
        }

        Ok(None)
    }

    /// Removes a message, unless it has been received again since.
    pub(crate) fn delete_message(&self, key: &UserKey, receipt_handle: Bytes) -> anyhow::Result<bool> {
        let mut batch = self.keyspace.batch();

        if let Some(message) = self.messages.get(key)? {
            let message: QueueMessage = minicbor::decode(&message)?;
            if message.receipt_handle != receipt_handle {
                return Ok(false);
            }
            debug!(target: "delivery", inbox = message.path.url(), "delete message");
            batch.remove(&self.messages, key.clone());
            batch.remove(&self.visibility, key.clone());
        }

        batch.commit()?;
        self.keyspace.persist(PersistMode::SyncAll)?;
        Ok(true)
    }
}

impl OutboundDelivery for OutboxQueue {
    fn send(&self, activity: NodeRef<'_>, paths: &[InstancePath]) -> Result<()> {
        let body = serde_json::to_string(&activity.to_value())
            .context("unable to serialize outbound activity")
            .map_err(Error::Delivery)?;
        self.send_messages(&body, paths).map_err(Error::Delivery)
    }
}

fn queue_key(path: &InstancePath, id: Bytes) -> UserKey {
    let mut key = Vec::with_capacity(1 + id.len());
    key.push(path.priority().rank());
    key.extend_from_slice(&id);
    key.into()
}
