//! Registration, login and profile

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;

use crate::accounts::{AuthResponse, LoginRequest, RegisterRequest};
use crate::core::entity::User;
use crate::core::error::ShopError;
use crate::core::extractors::{CurrentUser, ValidatedJson};
use crate::server::host::ServerHost;

pub async fn register(
    State(host): State<ServerHost>,
    ValidatedJson(request): ValidatedJson<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), ShopError> {
    let response = host.accounts.register(request).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

pub async fn login(
    State(host): State<ServerHost>,
    ValidatedJson(request): ValidatedJson<LoginRequest>,
) -> Result<Json<AuthResponse>, ShopError> {
    Ok(Json(host.accounts.login(request).await?))
}

pub async fn logout(State(host): State<ServerHost>, user: CurrentUser) -> StatusCode {
    host.accounts.logout(&user.token);
    StatusCode::NO_CONTENT
}

pub async fn profile(
    State(host): State<ServerHost>,
    user: CurrentUser,
) -> Result<Json<User>, ShopError> {
    Ok(Json(host.accounts.profile(user.user_id).await?))
}
