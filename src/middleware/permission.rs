use axum::http::{header, HeaderMap};
use serde::Serialize;
use tower_cookies::Cookies;
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{user::ROLE_ADMIN, User},
    utils::verify_token,
    AppState,
};

#[derive(Debug, Clone, Serialize)]
pub struct CurrentUser {
    pub id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role: String,
}

impl CurrentUser {
    pub fn is_admin(&self) -> bool {
        self.role == ROLE_ADMIN
    }
}

impl From<User> for CurrentUser {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            role: user.role,
        }
    }
}

/// Accepts the JWT from the Authorization header or the auth_token cookie.
fn extract_token(headers: &HeaderMap, cookies: &Cookies) -> Option<String> {
    if let Some(token) = bearer_token(headers) {
        return Some(token);
    }
    cookies.get("auth_token").map(|c| c.value().to_string())
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ")?;
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

pub async fn current_user(
    state: &AppState,
    headers: &HeaderMap,
    cookies: &Cookies,
) -> AppResult<CurrentUser> {
    let token = extract_token(headers, cookies).ok_or(AppError::Unauthorized)?;

    let claims = verify_token(&token, &state.config.jwt_secret).map_err(|_| AppError::Unauthorized)?;
    let user_id = Uuid::parse_str(&claims.sub).map_err(|_| AppError::Unauthorized)?;

    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1 AND is_active = TRUE")
        .bind(user_id)
        .fetch_optional(&state.db)
        .await?
        .ok_or(AppError::Unauthorized)?;

    Ok(CurrentUser::from(user))
}

pub fn require_admin(user: &CurrentUser) -> AppResult<()> {
    if user.is_admin() {
        Ok(())
    } else {
        Err(AppError::Forbidden)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn bearer_token_extraction() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc.def.ghi"));
        assert_eq!(bearer_token(&headers).as_deref(), Some("abc.def.ghi"));
    }

    #[test]
    fn bearer_token_rejects_other_schemes_and_empty() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic dXNlcg=="));
        assert!(bearer_token(&headers).is_none());

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer "));
        assert!(bearer_token(&headers).is_none());

        assert!(bearer_token(&HeaderMap::new()).is_none());
    }

    #[test]
    fn admin_gate() {
        let user = CurrentUser {
            id: Uuid::new_v4(),
            email: "a@b.c".into(),
            first_name: "A".into(),
            last_name: "B".into(),
            role: "cashier".into(),
        };
        assert!(require_admin(&user).is_err());

        let admin = CurrentUser { role: "admin".into(), ..user };
        assert!(require_admin(&admin).is_ok());
    }
}
