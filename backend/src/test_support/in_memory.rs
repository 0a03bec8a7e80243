//! In-memory adapters for the persistence, storage, and queue ports.

use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;

use crate::domain::ports::{
    ChatRepository, ChatRepositoryError, FulfillmentJob, ImageStore, ImageStoreError, JobId,
    JobQueue, JobQueueError, JobSource, OrderRepository, OrderRepositoryError, QueuedJob,
};
use crate::domain::{
    Chat, ChatId, NewOrder, ObjectKey, Order, OrderId, OrderStatus, Style,
};

use super::lock;

/// Chat repository keyed by chat id.
#[derive(Default)]
pub struct InMemoryChatRepository {
    chats: Mutex<HashMap<ChatId, Chat>>,
}

impl InMemoryChatRepository {
    pub fn len(&self) -> usize {
        lock(&self.chats).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ChatRepository for InMemoryChatRepository {
    async fn insert_if_absent(&self, chat: &Chat) -> Result<(), ChatRepositoryError> {
        lock(&self.chats)
            .entry(chat.id)
            .or_insert_with(|| chat.clone());
        Ok(())
    }

    async fn find(&self, id: ChatId) -> Result<Option<Chat>, ChatRepositoryError> {
        Ok(lock(&self.chats).get(&id).cloned())
    }
}

struct OrderTable {
    next_id: i64,
    rows: BTreeMap<OrderId, Order>,
}

/// Order repository applying the same state-machine guards as the SQL
/// adapter.
pub struct InMemoryOrderRepository {
    table: Mutex<OrderTable>,
}

impl Default for InMemoryOrderRepository {
    fn default() -> Self {
        Self {
            table: Mutex::new(OrderTable {
                next_id: 1,
                rows: BTreeMap::new(),
            }),
        }
    }
}

impl InMemoryOrderRepository {
    /// Insert or replace a row verbatim.
    pub fn insert(&self, order: Order) {
        let mut table = lock(&self.table);
        table.next_id = table.next_id.max(order.id.as_i64() + 1);
        table.rows.insert(order.id, order);
    }

    pub fn get(&self, id: OrderId) -> Option<Order> {
        lock(&self.table).rows.get(&id).cloned()
    }

    pub fn all(&self) -> Vec<Order> {
        lock(&self.table).rows.values().cloned().collect()
    }

    fn update<T>(&self, id: OrderId, apply: impl FnOnce(&mut Order) -> T) -> Option<T> {
        lock(&self.table).rows.get_mut(&id).map(apply)
    }

    fn guarded(&self, id: OrderId, next: OrderStatus, apply: impl FnOnce(&mut Order)) -> bool {
        self.update(id, |order| {
            if order.status.can_transition_to(next) {
                order.status = next;
                apply(order);
                true
            } else {
                false
            }
        })
        .unwrap_or(false)
    }
}

#[async_trait]
impl OrderRepository for InMemoryOrderRepository {
    async fn create(&self, order: NewOrder) -> Result<Order, OrderRepositoryError> {
        let mut table = lock(&self.table);
        let id = OrderId::new(table.next_id);
        table.next_id += 1;
        let row = Order::pending(id, order.chat_id, order.input_image_path, Utc::now());
        table.rows.insert(id, row.clone());
        Ok(row)
    }

    async fn find(&self, id: OrderId) -> Result<Option<Order>, OrderRepositoryError> {
        Ok(self.get(id))
    }

    async fn set_style(
        &self,
        id: OrderId,
        style: Style,
    ) -> Result<Option<Order>, OrderRepositoryError> {
        Ok(self.update(id, |order| {
            order.style = Some(style);
            order.clone()
        }))
    }

    async fn mark_paid(
        &self,
        id: OrderId,
        payment_charge_id: Option<String>,
    ) -> Result<Option<Order>, OrderRepositoryError> {
        Ok(self
            .update(id, |order| {
                if !order.status.can_transition_to(OrderStatus::Processing) {
                    return None;
                }
                order.status = OrderStatus::Processing;
                if order.payment_charge_id.is_none() {
                    order.payment_charge_id = payment_charge_id;
                }
                Some(order.clone())
            })
            .flatten())
    }

    async fn transition(
        &self,
        id: OrderId,
        next: OrderStatus,
    ) -> Result<bool, OrderRepositoryError> {
        Ok(self.guarded(id, next, |_| {}))
    }

    async fn complete_generation(
        &self,
        id: OrderId,
        output_image_path: ObjectKey,
    ) -> Result<bool, OrderRepositoryError> {
        Ok(self.guarded(id, OrderStatus::Processed, |order| {
            order.output_image_path = Some(output_image_path);
        }))
    }

    async fn record_error(&self, id: OrderId, error: String) -> Result<(), OrderRepositoryError> {
        self.update(id, |order| order.error = Some(error));
        Ok(())
    }

    async fn mark_failed(&self, id: OrderId, error: String) -> Result<bool, OrderRepositoryError> {
        Ok(self.guarded(id, OrderStatus::Failed, |order| {
            order.error = Some(error);
        }))
    }
}

/// Object store backed by a hash map.
#[derive(Default)]
pub struct InMemoryImageStore {
    objects: Mutex<HashMap<ObjectKey, Vec<u8>>>,
}

impl InMemoryImageStore {
    pub fn insert(&self, key: ObjectKey, bytes: Vec<u8>) {
        lock(&self.objects).insert(key, bytes);
    }

    pub fn bytes(&self, key: &str) -> Option<Vec<u8>> {
        lock(&self.objects)
            .iter()
            .find(|(stored, _)| stored.as_str() == key)
            .map(|(_, bytes)| bytes.clone())
    }

    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = lock(&self.objects)
            .keys()
            .map(|key| key.as_str().to_owned())
            .collect();
        keys.sort();
        keys
    }
}

#[async_trait]
impl ImageStore for InMemoryImageStore {
    async fn put(&self, key: &ObjectKey, bytes: Vec<u8>) -> Result<(), ImageStoreError> {
        lock(&self.objects).insert(key.clone(), bytes);
        Ok(())
    }

    async fn get(&self, key: &ObjectKey) -> Result<Option<Vec<u8>>, ImageStoreError> {
        Ok(lock(&self.objects).get(key).cloned())
    }
}

struct QueueEntry {
    id: JobId,
    job: FulfillmentJob,
    attempts: u32,
    claimed: bool,
}

/// Queue implementing both producer and consumer ports.
///
/// Release delays are ignored; released jobs are immediately claimable.
#[derive(Default)]
pub struct InMemoryJobQueue {
    entries: Mutex<Vec<QueueEntry>>,
    next_id: Mutex<i64>,
    released: Mutex<Vec<(JobId, Duration)>>,
}

impl InMemoryJobQueue {
    /// Jobs not yet acknowledged, in enqueue order.
    pub fn jobs(&self) -> Vec<FulfillmentJob> {
        lock(&self.entries)
            .iter()
            .map(|entry| entry.job.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        lock(&self.entries).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every `release` call observed so far.
    pub fn releases(&self) -> Vec<(JobId, Duration)> {
        lock(&self.released).clone()
    }
}

#[async_trait]
impl JobQueue for InMemoryJobQueue {
    async fn enqueue(&self, job: &FulfillmentJob) -> Result<(), JobQueueError> {
        let id = {
            let mut next = lock(&self.next_id);
            *next += 1;
            JobId::new(*next)
        };
        lock(&self.entries).push(QueueEntry {
            id,
            job: job.clone(),
            attempts: 0,
            claimed: false,
        });
        Ok(())
    }
}

#[async_trait]
impl JobSource for InMemoryJobQueue {
    async fn claim_batch(&self, max: usize) -> Result<Vec<QueuedJob>, JobQueueError> {
        let mut entries = lock(&self.entries);
        Ok(entries
            .iter_mut()
            .filter(|entry| !entry.claimed)
            .take(max)
            .map(|entry| {
                entry.claimed = true;
                entry.attempts += 1;
                QueuedJob {
                    id: entry.id,
                    attempts: entry.attempts,
                    job: entry.job.clone(),
                }
            })
            .collect())
    }

    async fn acknowledge(&self, id: JobId) -> Result<(), JobQueueError> {
        lock(&self.entries).retain(|entry| entry.id != id);
        Ok(())
    }

    async fn release(&self, id: JobId, delay: Duration) -> Result<(), JobQueueError> {
        lock(&self.released).push((id, delay));
        if let Some(entry) = lock(&self.entries).iter_mut().find(|entry| entry.id == id) {
            entry.claimed = false;
        }
        Ok(())
    }
}
