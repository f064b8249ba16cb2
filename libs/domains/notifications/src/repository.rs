use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{NotificationError, NotificationResult};
use crate::models::Notification;

/// Persistence for notification records.
///
/// Records are never deleted. `update` writes only status, metadata and
/// `updated_at`, and refuses a status change the state machine forbids.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait NotificationRepository: Send + Sync {
    async fn create(&self, notification: Notification) -> NotificationResult<Notification>;

    /// `NotFound` when no record has this id
    async fn get_by_id(&self, id: Uuid) -> NotificationResult<Notification>;

    /// Newest first
    async fn get_by_user_id(
        &self,
        user_id: Uuid,
        limit: u64,
        offset: u64,
    ) -> NotificationResult<Vec<Notification>>;

    async fn update(&self, notification: &Notification) -> NotificationResult<Notification>;

    /// Sets `read_at` once. `NotFound` for an unknown id and for an already-read record.
    async fn mark_as_read(&self, id: Uuid) -> NotificationResult<()>;

    async fn count_unread_by_user_id(&self, user_id: Uuid) -> NotificationResult<u64>;
}

pub(crate) fn ensure_id(id: Uuid) -> NotificationResult<()> {
    if id.is_nil() {
        Err(NotificationError::InvalidNotificationId)
    } else {
        Ok(())
    }
}

pub(crate) fn ensure_user_id(user_id: Uuid) -> NotificationResult<()> {
    if user_id.is_nil() {
        Err(NotificationError::InvalidUserId)
    } else {
        Ok(())
    }
}

/// In-memory implementation for tests and local runs
#[derive(Clone, Default)]
pub struct InMemoryNotificationRepository {
    notifications: Arc<RwLock<HashMap<Uuid, Notification>>>,
}

impl InMemoryNotificationRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.notifications.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub async fn all(&self) -> Vec<Notification> {
        let mut all: Vec<_> = self.notifications.read().await.values().cloned().collect();
        all.sort_by_key(|n| n.created_at);
        all
    }
}

#[async_trait]
impl NotificationRepository for InMemoryNotificationRepository {
    async fn create(&self, notification: Notification) -> NotificationResult<Notification> {
        ensure_id(notification.id)?;
        ensure_user_id(notification.user_id)?;

        let mut notifications = self.notifications.write().await;
        if notifications.contains_key(&notification.id) {
            return Err(NotificationError::Database(format!(
                "duplicate notification id {}",
                notification.id
            )));
        }
        notifications.insert(notification.id, notification.clone());
        Ok(notification)
    }

    async fn get_by_id(&self, id: Uuid) -> NotificationResult<Notification> {
        ensure_id(id)?;
        self.notifications
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or(NotificationError::NotFound(id))
    }

    async fn get_by_user_id(
        &self,
        user_id: Uuid,
        limit: u64,
        offset: u64,
    ) -> NotificationResult<Vec<Notification>> {
        ensure_user_id(user_id)?;

        let notifications = self.notifications.read().await;
        let mut matching: Vec<_> = notifications
            .values()
            .filter(|n| n.user_id == user_id)
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        Ok(matching
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect())
    }

    async fn update(&self, notification: &Notification) -> NotificationResult<Notification> {
        ensure_id(notification.id)?;

        let mut notifications = self.notifications.write().await;
        let stored = notifications
            .get_mut(&notification.id)
            .ok_or(NotificationError::NotFound(notification.id))?;

        if !stored.status.can_transition_to(notification.status) {
            return Err(NotificationError::InvalidStatusTransition {
                from: stored.status,
                to: notification.status,
            });
        }

        stored.status = notification.status;
        stored.metadata = notification.metadata.clone();
        stored.updated_at = Utc::now();
        Ok(stored.clone())
    }

    async fn mark_as_read(&self, id: Uuid) -> NotificationResult<()> {
        ensure_id(id)?;

        let mut notifications = self.notifications.write().await;
        match notifications.get_mut(&id) {
            Some(n) if n.read_at.is_none() => {
                let now = Utc::now();
                n.read_at = Some(now);
                n.updated_at = now;
                Ok(())
            }
            _ => Err(NotificationError::NotFound(id)),
        }
    }

    async fn count_unread_by_user_id(&self, user_id: Uuid) -> NotificationResult<u64> {
        ensure_user_id(user_id)?;

        Ok(self
            .notifications
            .read()
            .await
            .values()
            .filter(|n| n.user_id == user_id && n.read_at.is_none())
            .count() as u64)
    }
}
