use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::Json;
use tower_cookies::Cookies;

use crate::{
    error::AppResult,
    middleware::{current_user, require_admin},
    models::{NotificationLog, NotificationLogFilter},
    AppState,
};

/// Audit trail of dispatch attempts, newest first.
pub async fn list_logs(
    State(state): State<AppState>,
    headers: HeaderMap,
    cookies: Cookies,
    Query(filter): Query<NotificationLogFilter>,
) -> AppResult<Json<Vec<NotificationLog>>> {
    let user = current_user(&state, &headers, &cookies).await?;
    require_admin(&user)?;

    let limit = filter.limit.filter(|l| *l > 0);

    let logs = sqlx::query_as::<_, NotificationLog>(
        r#"
        SELECT * FROM notification_log
        WHERE ($1::text IS NULL OR event = $1)
          AND ($2::text IS NULL OR status = $2)
        ORDER BY created_at DESC
        LIMIT $3
        "#,
    )
    .bind(filter.event)
    .bind(filter.status)
    .bind(limit)
    .fetch_all(&state.db)
    .await?;

    Ok(Json(logs))
}
