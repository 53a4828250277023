//! Notification feed handlers.

use axum::{
    extract::{Path, Query, State},
    response::Json,
    routing::{delete, get, post, put},
    Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::api::extractors::ValidatedJson;
use crate::api::middleware::CurrentUser;
use crate::api::AppState;
use crate::config::DEFAULT_NOTIFICATION_PAGE_SIZE;
use crate::domain::{
    NewNotification, Notification, NotificationCategory, NotificationFilter, NotificationStats,
    NotificationType, Priority, Role,
};
use crate::errors::AppResult;
use crate::services::BroadcastReceipt;
use crate::types::{ApiResponse, Created, Paginated, PaginationMeta, PaginationParams};

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct NotificationQuery {
    pub page: Option<u64>,
    /// Defaults to 20
    pub limit: Option<u64>,
    pub read: Option<bool>,
    #[serde(rename = "type")]
    pub kind: Option<NotificationType>,
}

/// Feed page with the caller's unread total
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NotificationFeed {
    pub data: Vec<Notification>,
    pub meta: PaginationMeta,
    pub unread_count: u64,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UnreadCount {
    pub unread_count: u64,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AffectedCount {
    pub count: u64,
}

/// Content shared by targeted and broadcast notifications
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NotificationContent {
    #[validate(length(
        min = 1,
        max = 100,
        message = "Title is required and cannot exceed 100 characters"
    ))]
    pub title: String,
    #[validate(length(
        min = 1,
        max = 500,
        message = "Message is required and cannot exceed 500 characters"
    ))]
    pub message: String,
    #[serde(rename = "type")]
    pub kind: Option<NotificationType>,
    pub category: Option<NotificationCategory>,
    pub priority: Option<Priority>,
    pub action_url: Option<String>,
    #[validate(length(max = 50, message = "Action text cannot exceed 50 characters"))]
    pub action_text: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl NotificationContent {
    fn into_notification(
        self,
        account_id: Uuid,
        default_category: NotificationCategory,
    ) -> NewNotification {
        let mut notification = NewNotification::new(
            account_id,
            self.title,
            self.message,
            self.kind.unwrap_or(NotificationType::Info),
            self.category.unwrap_or(default_category),
        );
        notification.priority = self.priority.unwrap_or(Priority::Medium);
        notification.action_url = self.action_url;
        notification.action_text = self.action_text;
        notification.expires_at = self.expires_at;
        notification
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateNotificationRequest {
    pub user_id: Uuid,
    #[serde(flatten)]
    #[validate(nested)]
    pub content: NotificationContent,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BroadcastRequest {
    /// Every active account when absent
    pub target_role: Option<Role>,
    #[serde(flatten)]
    #[validate(nested)]
    pub content: NotificationContent,
}

/// `/notifications` routes, mounted behind the auth middleware
pub fn notification_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_notifications))
        .route("/unread-count", get(unread_count))
        .route("/mark-all-read", put(mark_all_read))
        .route("/clear-read", delete(clear_read))
        .route("/create", post(create_notification))
        .route("/broadcast", post(broadcast))
        .route("/stats/overview", get(notification_stats))
        .route("/:id", get(get_notification).delete(delete_notification))
        .route("/:id/read", put(mark_read))
        .route("/:id/unread", put(mark_unread))
}

#[utoipa::path(
    get,
    path = "/api/notifications",
    tag = "Notifications",
    security(("bearer_auth" = [])),
    params(NotificationQuery),
    responses((status = 200, description = "Caller's feed, newest first", body = NotificationFeed))
)]
pub async fn list_notifications(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(query): Query<NotificationQuery>,
) -> AppResult<Json<NotificationFeed>> {
    let page =
        PaginationParams::from_query(query.page, query.limit, DEFAULT_NOTIFICATION_PAGE_SIZE);
    let filter = NotificationFilter {
        read: query.read,
        kind: query.kind,
    };

    let feed = state
        .services
        .notifications()
        .list(&user.actor(), filter, page)
        .await?;
    let Paginated { data, meta } = feed.page;

    Ok(Json(NotificationFeed {
        data,
        meta,
        unread_count: feed.unread_count,
    }))
}

#[utoipa::path(
    get,
    path = "/api/notifications/unread-count",
    tag = "Notifications",
    security(("bearer_auth" = [])),
    responses((status = 200, description = "Unread total", body = UnreadCount))
)]
pub async fn unread_count(
    State(state): State<AppState>,
    user: CurrentUser,
) -> AppResult<Json<ApiResponse<UnreadCount>>> {
    let unread_count = state
        .services
        .notifications()
        .unread_count(&user.actor())
        .await?;

    Ok(Json(ApiResponse::success(UnreadCount { unread_count })))
}

#[utoipa::path(
    get,
    path = "/api/notifications/{id}",
    tag = "Notifications",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Notification id")),
    responses(
        (status = 200, description = "Notification, now marked read", body = Notification),
        (status = 404, description = "Notification not found")
    )
)]
pub async fn get_notification(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Notification>>> {
    let notification = state
        .services
        .notifications()
        .get(&user.actor(), id)
        .await?;

    Ok(Json(ApiResponse::success(notification)))
}

#[utoipa::path(
    put,
    path = "/api/notifications/{id}/read",
    tag = "Notifications",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Notification id")),
    responses((status = 200, description = "Marked read", body = Notification))
)]
pub async fn mark_read(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Notification>>> {
    let notification = state
        .services
        .notifications()
        .set_read(&user.actor(), id, true)
        .await?;

    Ok(Json(ApiResponse::with_message(
        notification,
        "Notification marked as read",
    )))
}

#[utoipa::path(
    put,
    path = "/api/notifications/{id}/unread",
    tag = "Notifications",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Notification id")),
    responses((status = 200, description = "Marked unread", body = Notification))
)]
pub async fn mark_unread(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Notification>>> {
    let notification = state
        .services
        .notifications()
        .set_read(&user.actor(), id, false)
        .await?;

    Ok(Json(ApiResponse::with_message(
        notification,
        "Notification marked as unread",
    )))
}

#[utoipa::path(
    put,
    path = "/api/notifications/mark-all-read",
    tag = "Notifications",
    security(("bearer_auth" = [])),
    responses((status = 200, description = "Number marked read", body = AffectedCount))
)]
pub async fn mark_all_read(
    State(state): State<AppState>,
    user: CurrentUser,
) -> AppResult<Json<ApiResponse<AffectedCount>>> {
    let count = state
        .services
        .notifications()
        .mark_all_read(&user.actor())
        .await?;

    Ok(Json(ApiResponse::with_message(
        AffectedCount { count },
        format!("{} notifications marked as read", count),
    )))
}

#[utoipa::path(
    delete,
    path = "/api/notifications/{id}",
    tag = "Notifications",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Notification id")),
    responses(
        (status = 200, description = "Notification deleted"),
        (status = 404, description = "Notification not found")
    )
)]
pub async fn delete_notification(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<()>>> {
    state
        .services
        .notifications()
        .delete(&user.actor(), id)
        .await?;

    Ok(Json(ApiResponse::message("Notification deleted successfully")))
}

#[utoipa::path(
    delete,
    path = "/api/notifications/clear-read",
    tag = "Notifications",
    security(("bearer_auth" = [])),
    responses((status = 200, description = "Number removed", body = AffectedCount))
)]
pub async fn clear_read(
    State(state): State<AppState>,
    user: CurrentUser,
) -> AppResult<Json<ApiResponse<AffectedCount>>> {
    let count = state
        .services
        .notifications()
        .clear_read(&user.actor())
        .await?;

    Ok(Json(ApiResponse::with_message(
        AffectedCount { count },
        format!("{} read notifications cleared", count),
    )))
}

#[utoipa::path(
    post,
    path = "/api/notifications/create",
    tag = "Notifications",
    security(("bearer_auth" = [])),
    request_body = CreateNotificationRequest,
    responses(
        (status = 201, description = "Notification created", body = Notification),
        (status = 404, description = "Target account not found")
    )
)]
pub async fn create_notification(
    State(state): State<AppState>,
    user: CurrentUser,
    ValidatedJson(payload): ValidatedJson<CreateNotificationRequest>,
) -> AppResult<Created<Notification>> {
    let notification = payload
        .content
        .into_notification(payload.user_id, NotificationCategory::Other);

    let created = state
        .services
        .notifications()
        .create(&user.actor(), notification)
        .await?;

    Ok(Created(created))
}

#[utoipa::path(
    post,
    path = "/api/notifications/broadcast",
    tag = "Notifications",
    security(("bearer_auth" = [])),
    request_body = BroadcastRequest,
    responses((status = 200, description = "Number of recipients", body = BroadcastReceipt))
)]
pub async fn broadcast(
    State(state): State<AppState>,
    user: CurrentUser,
    ValidatedJson(payload): ValidatedJson<BroadcastRequest>,
) -> AppResult<Json<ApiResponse<BroadcastReceipt>>> {
    let template = payload
        .content
        .into_notification(Uuid::nil(), NotificationCategory::SystemUpdate);

    let receipt = state
        .services
        .notifications()
        .broadcast(&user.actor(), template, payload.target_role)
        .await?;

    Ok(Json(ApiResponse::with_message(
        receipt,
        format!("Notification broadcast to {} users", receipt.recipients),
    )))
}

#[utoipa::path(
    get,
    path = "/api/notifications/stats/overview",
    tag = "Notifications",
    security(("bearer_auth" = [])),
    responses((status = 200, description = "Feed statistics", body = NotificationStats))
)]
pub async fn notification_stats(
    State(state): State<AppState>,
    user: CurrentUser,
) -> AppResult<Json<ApiResponse<NotificationStats>>> {
    let stats = state
        .services
        .notifications()
        .stats(&user.actor())
        .await?;

    Ok(Json(ApiResponse::success(stats)))
}
