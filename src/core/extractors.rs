//! Axum extractors for authenticated callers and validated bodies

use axum::Json;
use axum::extract::{FromRef, FromRequest, FromRequestParts, Request};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use crate::core::auth::{AuthContext, SessionRegistry};
use crate::core::error::ShopError;

/// Extract the token from an `Authorization: Bearer <token>` header value
pub fn bearer_token(header: &str) -> Option<&str> {
    let (scheme, token) = header.trim().split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

/// The authenticated caller
///
/// Rejects with 401 when the bearer token is missing, unknown or expired.
///
/// ```rust,ignore
/// async fn get_cart(user: CurrentUser, State(host): State<ServerHost>) -> ... {
///     host.cart.summary(user.user_id).await
/// }
/// ```
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub user_id: Uuid,
    pub token: String,
    pub context: AuthContext,
}

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
    Arc<SessionRegistry>: FromRef<S>,
{
    type Rejection = ShopError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(bearer_token)
            .ok_or_else(|| ShopError::Unauthorized {
                message: "missing bearer token".to_string(),
            })?;

        let sessions = Arc::<SessionRegistry>::from_ref(state);
        let context = sessions.resolve(token)?;
        let user_id = context.user_id().ok_or_else(|| ShopError::Unauthorized {
            message: "invalid token".to_string(),
        })?;

        Ok(Self {
            user_id,
            token: token.to_string(),
            context,
        })
    }
}

/// JSON body that has passed `validator` checks
///
/// Malformed JSON and failed validation both reject with a 400
/// `VALIDATION_ERROR` body.
pub struct ValidatedJson<T>(pub T);

impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate,
{
    type Rejection = ShopError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(payload) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| ShopError::invalid("body", rejection.body_text()))?;
        payload.validate()?;
        Ok(ValidatedJson(payload))
    }
}
