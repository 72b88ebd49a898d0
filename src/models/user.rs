use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

pub const ROLE_ADMIN: &str = "admin";
pub const ROLE_CASHIER: &str = "cashier";

#[derive(Debug, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub role: String,
    pub is_active: bool,
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateUser {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(default = "default_role")]
    pub role: String,
}

fn default_role() -> String {
    ROLE_CASHIER.to_string()
}

impl CreateUser {
    pub fn validate(&self) -> Result<(), String> {
        if self.email.trim().is_empty() || !self.email.contains('@') {
            return Err("A valid email is required.".to_string());
        }
        if self.password.len() < 8 {
            return Err("Password must be at least 8 characters.".to_string());
        }
        if self.role != ROLE_ADMIN && self.role != ROLE_CASHIER {
            return Err(format!("Unknown role: {}", self.role));
        }
        Ok(())
    }
}

/// Admin edit of an existing account. Password and role only change when
/// provided; a cleared `is_active` locks the account out on the next request.
#[derive(Debug, Deserialize)]
pub struct UpdateUser {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub password: Option<String>,
    pub role: Option<String>,
    pub is_active: Option<bool>,
}

impl UpdateUser {
    pub fn validate(&self) -> Result<(), String> {
        if self.email.trim().is_empty() || !self.email.contains('@') {
            return Err("A valid email is required.".to_string());
        }
        if let Some(password) = &self.password {
            if password.len() < 8 {
                return Err("Password must be at least 8 characters.".to_string());
            }
        }
        if let Some(role) = &self.role {
            if role != ROLE_ADMIN && role != ROLE_CASHIER {
                return Err(format!("Unknown role: {role}"));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub full_name: String,
    pub role: String,
    pub is_active: bool,
    pub last_login: Option<DateTime<Utc>>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            full_name: format!("{} {}", user.first_name, user.last_name),
            id: user.id,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            role: user.role,
            is_active: user.is_active,
            last_login: user.last_login,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload() -> CreateUser {
        CreateUser {
            email: "new@example.com".into(),
            password: "long-enough".into(),
            first_name: "New".into(),
            last_name: "User".into(),
            role: ROLE_CASHIER.into(),
        }
    }

    #[test]
    fn accepts_valid_payload() {
        assert!(payload().validate().is_ok());
    }

    #[test]
    fn rejects_bad_email_and_short_password() {
        let mut p = payload();
        p.email = "nope".into();
        assert!(p.validate().is_err());

        let mut p = payload();
        p.password = "short".into();
        assert!(p.validate().is_err());
    }

    #[test]
    fn rejects_unknown_role() {
        let mut p = payload();
        p.role = "manager".into();
        assert!(p.validate().is_err());
    }

    fn update() -> UpdateUser {
        UpdateUser {
            email: "existing@example.com".into(),
            first_name: "Existing".into(),
            last_name: "User".into(),
            password: None,
            role: None,
            is_active: None,
        }
    }

    #[test]
    fn update_accepts_omitted_password_and_role() {
        assert!(update().validate().is_ok());
    }

    #[test]
    fn update_validates_provided_password_and_role() {
        let mut p = update();
        p.password = Some("short".into());
        assert!(p.validate().is_err());

        let mut p = update();
        p.password = Some("long-enough".into());
        p.role = Some(ROLE_ADMIN.into());
        assert!(p.validate().is_ok());

        let mut p = update();
        p.role = Some("manager".into());
        assert!(p.validate().is_err());
    }

    #[test]
    fn update_rejects_bad_email() {
        let mut p = update();
        p.email = "nope".into();
        assert!(p.validate().is_err());
    }
}
