//! Notification repository.
//!
//! Reads and writes are scoped to the recipient account (stats aside);
//! expired notifications are invisible to reads but still removable.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, Value,
};
use uuid::Uuid;

use super::entities::notification::{self, ActiveModel, Entity as NotificationEntity};
use crate::domain::notification::LabelCount;
use crate::domain::{NewNotification, Notification, NotificationFilter, NotificationStats};
use crate::errors::{AppError, AppResult};
use crate::types::PaginationParams;

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

/// Notification repository trait for dependency injection.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait NotificationRepository: Send + Sync {
    async fn create(&self, notification: NewNotification) -> AppResult<Notification>;

    /// Insert many at once, returns the number written
    async fn create_many(&self, notifications: Vec<NewNotification>) -> AppResult<u64>;

    /// Notification owned by `account_id`, unexpired
    async fn find_for(&self, id: Uuid, account_id: Uuid) -> AppResult<Option<Notification>>;

    /// Newest first
    async fn list(
        &self,
        account_id: Uuid,
        filter: NotificationFilter,
        page: PaginationParams,
    ) -> AppResult<(Vec<Notification>, u64)>;

    async fn unread_count(&self, account_id: Uuid) -> AppResult<u64>;

    /// Set the read flag; `None` when not found for this account
    async fn set_read(
        &self,
        id: Uuid,
        account_id: Uuid,
        read: bool,
    ) -> AppResult<Option<Notification>>;

    /// Mark every unread notification read, returns how many changed
    async fn mark_all_read(&self, account_id: Uuid) -> AppResult<u64>;

    async fn delete(&self, id: Uuid, account_id: Uuid) -> AppResult<bool>;

    /// Delete every read notification, returns how many were removed
    async fn clear_read(&self, account_id: Uuid) -> AppResult<u64>;

    /// System-wide totals across every account
    async fn stats(&self) -> AppResult<NotificationStats>;
}

/// Concrete implementation of NotificationRepository
pub struct NotificationStore {
    db: DatabaseConnection,
}

impl NotificationStore {
    /// Create new repository instance
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Counts grouped by one column, largest group first
    async fn count_by(&self, column: notification::Column) -> AppResult<Vec<LabelCount>> {
        let rows = NotificationEntity::find()
            .select_only()
            .column(column)
            .column_as(notification::Column::Id.count(), "count")
            .filter(unexpired(Utc::now()))
            .group_by(column)
            .into_tuple::<(String, i64)>()
            .all(&self.db)
            .await
            .map_err(AppError::from)?;

        let mut counts: Vec<LabelCount> = rows
            .into_iter()
            .map(|(label, count)| LabelCount {
                label,
                count: count.max(0) as u64,
            })
            .collect();
        counts.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.label.cmp(&b.label)));
        Ok(counts)
    }
}

fn unexpired(now: DateTime<Utc>) -> Condition {
    Condition::any()
        .add(notification::Column::ExpiresAt.is_null())
        .add(notification::Column::ExpiresAt.gt(now))
}

/// Owned by `account_id` and not yet expired at `now`
fn visible_to(account_id: Uuid, now: DateTime<Utc>) -> Condition {
    Condition::all()
        .add(notification::Column::AccountId.eq(account_id))
        .add(unexpired(now))
}

fn active_model(notification: NewNotification, now: DateTime<Utc>) -> ActiveModel {
    ActiveModel {
        id: Set(Uuid::new_v4()),
        account_id: Set(notification.account_id),
        title: Set(notification.title),
        message: Set(notification.message),
        kind: Set(notification.kind.as_str().to_string()),
        category: Set(notification.category.as_str().to_string()),
        priority: Set(notification.priority.as_str().to_string()),
        read: Set(false),
        read_at: Set(None),
        action_url: Set(notification.action_url),
        action_text: Set(notification.action_text),
        related_model: Set(notification.related_model.map(|m| m.as_str().to_string())),
        related_id: Set(notification.related_id),
        expires_at: Set(notification.expires_at),
        created_at: Set(now),
        updated_at: Set(now),
    }
}

#[async_trait]
impl NotificationRepository for NotificationStore {
    async fn create(&self, notification: NewNotification) -> AppResult<Notification> {
        let model = active_model(notification, Utc::now())
            .insert(&self.db)
            .await
            .map_err(AppError::from)?;

        Notification::try_from(model)
    }

    async fn create_many(&self, notifications: Vec<NewNotification>) -> AppResult<u64> {
        if notifications.is_empty() {
            return Ok(0);
        }

        let now = Utc::now();
        let count = notifications.len() as u64;
        let models: Vec<ActiveModel> = notifications
            .into_iter()
            .map(|n| active_model(n, now))
            .collect();

        NotificationEntity::insert_many(models)
            .exec_without_returning(&self.db)
            .await
            .map_err(AppError::from)?;

        Ok(count)
    }

    async fn find_for(&self, id: Uuid, account_id: Uuid) -> AppResult<Option<Notification>> {
        NotificationEntity::find()
            .filter(notification::Column::Id.eq(id))
            .filter(visible_to(account_id, Utc::now()))
            .one(&self.db)
            .await
            .map_err(AppError::from)?
            .map(Notification::try_from)
            .transpose()
    }

    async fn list(
        &self,
        account_id: Uuid,
        filter: NotificationFilter,
        page: PaginationParams,
    ) -> AppResult<(Vec<Notification>, u64)> {
        let mut condition = visible_to(account_id, Utc::now());
        if let Some(read) = filter.read {
            condition = condition.add(notification::Column::Read.eq(read));
        }
        if let Some(kind) = filter.kind {
            condition = condition.add(notification::Column::Kind.eq(kind.as_str()));
        }

        let paginator = NotificationEntity::find()
            .filter(condition)
            .order_by_desc(notification::Column::CreatedAt)
            .paginate(&self.db, page.limit());

        let total = paginator.num_items().await?;
        let models = paginator.fetch_page(page.page() - 1).await?;

        let notifications = models
            .into_iter()
            .map(Notification::try_from)
            .collect::<AppResult<Vec<_>>>()?;

        Ok((notifications, total))
    }

    async fn unread_count(&self, account_id: Uuid) -> AppResult<u64> {
        NotificationEntity::find()
            .filter(visible_to(account_id, Utc::now()))
            .filter(notification::Column::Read.eq(false))
            .count(&self.db)
            .await
            .map_err(AppError::from)
    }

    async fn set_read(
        &self,
        id: Uuid,
        account_id: Uuid,
        read: bool,
    ) -> AppResult<Option<Notification>> {
        let now = Utc::now();
        let read_at = if read {
            Value::from(now)
        } else {
            Value::ChronoDateTimeUtc(None)
        };

        let result = NotificationEntity::update_many()
            .col_expr(notification::Column::Read, Expr::value(read))
            .col_expr(notification::Column::ReadAt, Expr::value(read_at))
            .col_expr(notification::Column::UpdatedAt, Expr::value(now))
            .filter(notification::Column::Id.eq(id))
            .filter(visible_to(account_id, now))
            .exec(&self.db)
            .await
            .map_err(AppError::from)?;

        if result.rows_affected == 0 {
            return Ok(None);
        }
        self.find_for(id, account_id).await
    }

    async fn mark_all_read(&self, account_id: Uuid) -> AppResult<u64> {
        let now = Utc::now();
        let result = NotificationEntity::update_many()
            .col_expr(notification::Column::Read, Expr::value(true))
            .col_expr(notification::Column::ReadAt, Expr::value(now))
            .col_expr(notification::Column::UpdatedAt, Expr::value(now))
            .filter(notification::Column::AccountId.eq(account_id))
            .filter(notification::Column::Read.eq(false))
            .exec(&self.db)
            .await
            .map_err(AppError::from)?;

        Ok(result.rows_affected)
    }

    async fn delete(&self, id: Uuid, account_id: Uuid) -> AppResult<bool> {
        let result = NotificationEntity::delete_many()
            .filter(notification::Column::Id.eq(id))
            .filter(notification::Column::AccountId.eq(account_id))
            .exec(&self.db)
            .await
            .map_err(AppError::from)?;

        Ok(result.rows_affected > 0)
    }

    async fn clear_read(&self, account_id: Uuid) -> AppResult<u64> {
        let result = NotificationEntity::delete_many()
            .filter(notification::Column::AccountId.eq(account_id))
            .filter(notification::Column::Read.eq(true))
            .exec(&self.db)
            .await
            .map_err(AppError::from)?;

        Ok(result.rows_affected)
    }

    async fn stats(&self) -> AppResult<NotificationStats> {
        let visible = || NotificationEntity::find().filter(unexpired(Utc::now()));

        let total = visible().count(&self.db).await.map_err(AppError::from)?;
        let unread = visible()
            .filter(notification::Column::Read.eq(false))
            .count(&self.db)
            .await
            .map_err(AppError::from)?;

        Ok(NotificationStats {
            total,
            read: total.saturating_sub(unread),
            unread,
            by_type: self.count_by(notification::Column::Kind).await?,
            by_category: self.count_by(notification::Column::Category).await?,
            by_priority: self.count_by(notification::Column::Priority).await?,
        })
    }
}
