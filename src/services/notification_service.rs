//! Notification service - Per-account feed and admin messaging.
//!
//! Event notifications raised by other services go through [`deliver`] and
//! [`deliver_many`], which log failures instead of returning them: a
//! notification never undoes the change that triggered it.

use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::domain::{
    Actor, NewNotification, Notification, NotificationFilter, NotificationStats, Role,
};
use crate::errors::{AppError, AppResult, OptionExt};
use crate::infra::{NotificationRepository, UnitOfWork};
use crate::types::{Paginated, PaginationParams};

/// One page of the caller's feed plus their unread total
#[derive(Debug)]
pub struct NotificationPage {
    pub page: Paginated<Notification>,
    pub unread_count: u64,
}

/// Result of a broadcast
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BroadcastReceipt {
    pub recipients: u64,
}

/// Notification service trait for dependency injection.
#[async_trait]
pub trait NotificationService: Send + Sync {
    async fn list(
        &self,
        actor: &Actor,
        filter: NotificationFilter,
        page: PaginationParams,
    ) -> AppResult<NotificationPage>;

    async fn unread_count(&self, actor: &Actor) -> AppResult<u64>;

    /// Fetch one of the caller's notifications and mark it read
    async fn get(&self, actor: &Actor, id: Uuid) -> AppResult<Notification>;

    async fn set_read(&self, actor: &Actor, id: Uuid, read: bool) -> AppResult<Notification>;

    /// Returns how many were marked
    async fn mark_all_read(&self, actor: &Actor) -> AppResult<u64>;

    async fn delete(&self, actor: &Actor, id: Uuid) -> AppResult<()>;

    /// Returns how many were removed
    async fn clear_read(&self, actor: &Actor) -> AppResult<u64>;

    /// Admin: targeted notification to one account
    async fn create(&self, actor: &Actor, notification: NewNotification)
        -> AppResult<Notification>;

    /// Admin: copy of `template` to every active account, or every active
    /// account with `target_role`
    async fn broadcast(
        &self,
        actor: &Actor,
        template: NewNotification,
        target_role: Option<Role>,
    ) -> AppResult<BroadcastReceipt>;

    async fn stats(&self, actor: &Actor) -> AppResult<NotificationStats>;
}

/// Best-effort single delivery.
pub(crate) async fn deliver(repo: &dyn NotificationRepository, notification: NewNotification) {
    let account_id = notification.account_id;
    let kind = notification.kind;
    if let Err(e) = repo.create(notification).await {
        tracing::warn!(
            account_id = %account_id,
            kind = kind.as_str(),
            error = %e,
            "Failed to deliver notification"
        );
    }
}

/// Best-effort fan-out.
pub(crate) async fn deliver_many(
    repo: &dyn NotificationRepository,
    notifications: Vec<NewNotification>,
) {
    if notifications.is_empty() {
        return;
    }
    let count = notifications.len();
    if let Err(e) = repo.create_many(notifications).await {
        tracing::warn!(count, error = %e, "Failed to deliver notifications");
    }
}

/// Concrete implementation of NotificationService using Unit of Work.
pub struct NotificationCenter<U: UnitOfWork> {
    uow: Arc<U>,
}

impl<U: UnitOfWork> NotificationCenter<U> {
    pub fn new(uow: Arc<U>) -> Self {
        Self { uow }
    }
}

#[async_trait]
impl<U: UnitOfWork + 'static> NotificationService for NotificationCenter<U> {
    async fn list(
        &self,
        actor: &Actor,
        filter: NotificationFilter,
        page: PaginationParams,
    ) -> AppResult<NotificationPage> {
        let repo = self.uow.notifications();
        let ((items, total), unread_count) = futures::try_join!(
            repo.list(actor.id, filter, page),
            repo.unread_count(actor.id)
        )?;

        Ok(NotificationPage {
            page: Paginated::new(items, page, total),
            unread_count,
        })
    }

    async fn unread_count(&self, actor: &Actor) -> AppResult<u64> {
        self.uow.notifications().unread_count(actor.id).await
    }

    async fn get(&self, actor: &Actor, id: Uuid) -> AppResult<Notification> {
        let repo = self.uow.notifications();
        let notification = repo
            .find_for(id, actor.id)
            .await?
            .ok_or_not_found("Notification")?;

        if notification.read {
            return Ok(notification);
        }
        repo.set_read(id, actor.id, true)
            .await?
            .ok_or_not_found("Notification")
    }

    async fn set_read(&self, actor: &Actor, id: Uuid, read: bool) -> AppResult<Notification> {
        self.uow
            .notifications()
            .set_read(id, actor.id, read)
            .await?
            .ok_or_not_found("Notification")
    }

    async fn mark_all_read(&self, actor: &Actor) -> AppResult<u64> {
        let count = self.uow.notifications().mark_all_read(actor.id).await?;
        tracing::debug!(account_id = %actor.id, count, "Marked notifications read");
        Ok(count)
    }

    async fn delete(&self, actor: &Actor, id: Uuid) -> AppResult<()> {
        if self.uow.notifications().delete(id, actor.id).await? {
            Ok(())
        } else {
            Err(AppError::NotFound("Notification"))
        }
    }

    async fn clear_read(&self, actor: &Actor) -> AppResult<u64> {
        self.uow.notifications().clear_read(actor.id).await
    }

    async fn create(
        &self,
        actor: &Actor,
        notification: NewNotification,
    ) -> AppResult<Notification> {
        actor.require_admin()?;
        notification.validate()?;
        self.uow
            .accounts()
            .find_by_id(notification.account_id)
            .await?
            .ok_or_not_found("User")?;

        let created = self.uow.notifications().create(notification).await?;
        tracing::info!(
            notification_id = %created.id,
            account_id = %created.account_id,
            by = %actor.id,
            "Notification created"
        );
        Ok(created)
    }

    async fn broadcast(
        &self,
        actor: &Actor,
        template: NewNotification,
        target_role: Option<Role>,
    ) -> AppResult<BroadcastReceipt> {
        actor.require_admin()?;
        template.validate()?;

        let recipients = self.uow.accounts().active_ids(target_role).await?;
        let batch: Vec<NewNotification> = recipients
            .into_iter()
            .map(|id| template.for_account(id))
            .collect();

        let written = if batch.is_empty() {
            0
        } else {
            self.uow.notifications().create_many(batch).await?
        };

        tracing::info!(
            recipients = written,
            target_role = ?target_role,
            by = %actor.id,
            "Notification broadcast"
        );
        Ok(BroadcastReceipt {
            recipients: written,
        })
    }

    async fn stats(&self, actor: &Actor) -> AppResult<NotificationStats> {
        actor.require_admin()?;
        self.uow.notifications().stats().await
    }
}
