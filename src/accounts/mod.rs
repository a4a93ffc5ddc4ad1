//! Registration, login and bearer sessions

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use crate::core::auth::{PasswordHasher, SessionRegistry};
use crate::core::entity::{ROLE_ADMIN, User};
use crate::core::error::ShopError;
use crate::core::service::{AccountStore, ShopStore};

/// Body of `POST /auth/register`
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 3, max = 50, message = "must be between 3 and 50 characters"))]
    pub username: String,

    #[validate(email(message = "must be a valid email address"))]
    pub email: String,

    #[validate(length(min = 6, max = 128, message = "must be between 6 and 128 characters"))]
    pub password: String,
}

/// Body of `POST /auth/login`
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, message = "is required"))]
    pub username: String,

    #[validate(length(min = 1, message = "is required"))]
    pub password: String,
}

/// A freshly issued bearer token and the account it belongs to
#[derive(Debug, Clone, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: User,
}

pub struct AccountService {
    store: Arc<dyn ShopStore>,
    sessions: Arc<SessionRegistry>,
    hasher: PasswordHasher,
    admin_usernames: Vec<String>,
}

impl AccountService {
    pub fn new(store: Arc<dyn ShopStore>, sessions: Arc<SessionRegistry>) -> Self {
        Self {
            store,
            sessions,
            hasher: PasswordHasher::new(),
            admin_usernames: Vec::new(),
        }
    }

    /// Usernames that receive the admin role on registration
    pub fn with_admin_usernames(mut self, usernames: Vec<String>) -> Self {
        self.admin_usernames = usernames;
        self
    }

    pub async fn register(&self, request: RegisterRequest) -> Result<AuthResponse, ShopError> {
        let username = request.username.trim();
        let email = request.email.trim().to_lowercase();

        let mut user = User::new(username, email, self.hasher.hash(&request.password)?);
        if self
            .admin_usernames
            .iter()
            .any(|admin| admin.eq_ignore_ascii_case(username))
        {
            user.roles.push(ROLE_ADMIN.to_string());
        }

        let user = self.store.create_user(user).await?;
        let token = self.sessions.issue(&user)?;
        tracing::info!(user_id = %user.id, username = %user.username, "account registered");

        Ok(AuthResponse { token, user })
    }

    pub async fn login(&self, request: LoginRequest) -> Result<AuthResponse, ShopError> {
        let user = self
            .store
            .find_user_by_username(request.username.trim())
            .await?
            .filter(|user| self.hasher.verify(&request.password, &user.password_hash))
            .ok_or_else(|| ShopError::Unauthorized {
                message: "invalid username or password".to_string(),
            })?;

        let token = self.sessions.issue(&user)?;
        tracing::info!(user_id = %user.id, "login succeeded");

        Ok(AuthResponse { token, user })
    }

    pub fn logout(&self, token: &str) {
        self.sessions.revoke(token);
    }

    pub async fn profile(&self, user_id: Uuid) -> Result<User, ShopError> {
        self.store
            .get_user(&user_id)
            .await?
            .ok_or_else(|| ShopError::Unauthorized {
                message: "account no longer exists".to_string(),
            })
    }
}
