//! Authentication and authorization for storefront requests
//!
//! Provides:
//! - [`AuthContext`]: who is calling, resolved from a bearer token
//! - [`AuthPolicy`]: what a route requires of the caller
//! - [`PasswordHasher`]: Argon2id hashing of account passwords
//! - [`SessionRegistry`]: opaque bearer tokens mapped to sessions
//!
//! Tokens are random 32-byte values encoded as base64url. They carry no
//! claims; everything about the caller lives server-side in the registry.

use argon2::Argon2;
use argon2::password_hash::{
    PasswordHash, PasswordHasher as _, PasswordVerifier, SaltString,
};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Duration, Utc};
use rand::RngCore;
use std::collections::HashMap;
use std::sync::RwLock;
use uuid::Uuid;

use crate::core::entity::{ROLE_ADMIN, User};
use crate::core::error::ShopError;

/// Authorization context extracted from a request
#[derive(Debug, Clone, PartialEq)]
pub enum AuthContext {
    /// Authenticated user
    User {
        user_id: Uuid,
        username: String,
        roles: Vec<String>,
    },

    /// No authentication (public access)
    Anonymous,
}

impl AuthContext {
    pub fn for_user(user: &User) -> Self {
        AuthContext::User {
            user_id: user.id,
            username: user.username.clone(),
            roles: user.roles.clone(),
        }
    }

    /// Get user_id if available
    pub fn user_id(&self) -> Option<Uuid> {
        match self {
            AuthContext::User { user_id, .. } => Some(*user_id),
            AuthContext::Anonymous => None,
        }
    }

    pub fn has_role(&self, role: &str) -> bool {
        match self {
            AuthContext::User { roles, .. } => roles.iter().any(|r| r == role),
            AuthContext::Anonymous => false,
        }
    }

    /// Check if context represents an admin
    pub fn is_admin(&self) -> bool {
        self.has_role(ROLE_ADMIN)
    }
}

/// Authorization policy for an operation
#[derive(Debug, Clone)]
pub enum AuthPolicy {
    /// Public access (no auth required)
    Public,

    /// Any authenticated user
    Authenticated,

    /// User must have one of these roles
    HasRole(Vec<String>),

    /// Admin only
    AdminOnly,
}

impl AuthPolicy {
    /// Check if auth context satisfies this policy
    pub fn check(&self, context: &AuthContext) -> bool {
        match self {
            AuthPolicy::Public => true,
            AuthPolicy::Authenticated => !matches!(context, AuthContext::Anonymous),
            AuthPolicy::HasRole(required_roles) => {
                required_roles.iter().any(|r| context.has_role(r))
            }
            AuthPolicy::AdminOnly => context.is_admin(),
        }
    }

    /// Like [`check`](Self::check), but as a `Result` suitable for `?`
    pub fn enforce(&self, context: &AuthContext) -> Result<(), ShopError> {
        if self.check(context) {
            return Ok(());
        }
        match context {
            AuthContext::Anonymous => Err(ShopError::Unauthorized {
                message: "authentication required".to_string(),
            }),
            AuthContext::User { .. } => Err(ShopError::Forbidden {
                message: "insufficient permissions".to_string(),
            }),
        }
    }
}

// =============================================================================
// Passwords
// =============================================================================

/// Argon2id password hashing in PHC string format
#[derive(Default)]
pub struct PasswordHasher {
    argon2: Argon2<'static>,
}

impl PasswordHasher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn hash(&self, password: &str) -> Result<String, ShopError> {
        let mut salt = [0u8; 16];
        rand::thread_rng().fill_bytes(&mut salt);
        let salt = SaltString::encode_b64(&salt)
            .map_err(|e| ShopError::Internal(format!("salt encoding failed: {}", e)))?;

        self.argon2
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| ShopError::Internal(format!("password hashing failed: {}", e)))
    }

    /// Returns false for a wrong password or an unparseable hash
    pub fn verify(&self, password: &str, hash: &str) -> bool {
        match PasswordHash::new(hash) {
            Ok(parsed) => self
                .argon2
                .verify_password(password.as_bytes(), &parsed)
                .is_ok(),
            Err(_) => false,
        }
    }
}

// =============================================================================
// Sessions
// =============================================================================

#[derive(Debug, Clone)]
struct Session {
    context: AuthContext,
    expires_at: DateTime<Utc>,
}

/// Bearer token registry
///
/// Sessions live in process memory and expire after the configured TTL.
pub struct SessionRegistry {
    ttl: Duration,
    sessions: RwLock<HashMap<String, Session>>,
}

impl SessionRegistry {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Issue a token for `user`
    pub fn issue(&self, user: &User) -> Result<String, ShopError> {
        let mut bytes = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut bytes);
        let token = URL_SAFE_NO_PAD.encode(bytes);

        let now = Utc::now();
        let mut sessions = self
            .sessions
            .write()
            .map_err(|e| ShopError::Internal(format!("session lock poisoned: {}", e)))?;
        sessions.retain(|_, session| session.expires_at > now);
        sessions.insert(
            token.clone(),
            Session {
                context: AuthContext::for_user(user),
                expires_at: now + self.ttl,
            },
        );

        Ok(token)
    }

    /// Resolve a token to its context; unknown or expired tokens are rejected
    pub fn resolve(&self, token: &str) -> Result<AuthContext, ShopError> {
        let sessions = self
            .sessions
            .read()
            .map_err(|e| ShopError::Internal(format!("session lock poisoned: {}", e)))?;

        match sessions.get(token) {
            Some(session) if session.expires_at > Utc::now() => Ok(session.context.clone()),
            Some(_) => Err(ShopError::Unauthorized {
                message: "session expired".to_string(),
            }),
            None => Err(ShopError::Unauthorized {
                message: "invalid token".to_string(),
            }),
        }
    }

    pub fn revoke(&self, token: &str) {
        if let Ok(mut sessions) = self.sessions.write() {
            sessions.remove(token);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shopper() -> User {
        User::new("deniz", "deniz@example.com", "unused")
    }

    #[test]
    fn test_policy_check() {
        let user = shopper();
        let context = AuthContext::for_user(&user);

        assert!(AuthPolicy::Public.check(&AuthContext::Anonymous));
        assert!(AuthPolicy::Authenticated.check(&context));
        assert!(!AuthPolicy::Authenticated.check(&AuthContext::Anonymous));
        assert!(AuthPolicy::HasRole(vec!["customer".into()]).check(&context));
        assert!(!AuthPolicy::AdminOnly.check(&context));
    }

    #[test]
    fn test_enforce_distinguishes_401_and_403() {
        let context = AuthContext::for_user(&shopper());

        assert!(matches!(
            AuthPolicy::AdminOnly.enforce(&AuthContext::Anonymous),
            Err(ShopError::Unauthorized { .. })
        ));
        assert!(matches!(
            AuthPolicy::AdminOnly.enforce(&context),
            Err(ShopError::Forbidden { .. })
        ));
    }

    #[test]
    fn test_password_roundtrip() {
        let hasher = PasswordHasher::new();
        let hash = hasher.hash("correct horse").unwrap();

        assert!(hash.starts_with("$argon2"));
        assert!(hasher.verify("correct horse", &hash));
        assert!(!hasher.verify("wrong horse", &hash));
        assert!(!hasher.verify("correct horse", "not-a-phc-string"));
    }

    #[test]
    fn test_session_issue_and_resolve() {
        let registry = SessionRegistry::new(Duration::minutes(5));
        let user = shopper();
        let token = registry.issue(&user).unwrap();

        let context = registry.resolve(&token).unwrap();
        assert_eq!(context.user_id(), Some(user.id));

        registry.revoke(&token);
        assert!(registry.resolve(&token).is_err());
    }

    #[test]
    fn test_expired_session_is_rejected() {
        let registry = SessionRegistry::new(Duration::seconds(-1));
        let token = registry.issue(&shopper()).unwrap();

        match registry.resolve(&token) {
            Err(ShopError::Unauthorized { message }) => assert_eq!(message, "session expired"),
            other => panic!("expected expiry, got {:?}", other),
        }
    }
}
