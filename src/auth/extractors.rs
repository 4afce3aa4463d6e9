use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use tracing::warn;

use super::{
    claims::TokenKind,
    cookies::{bearer_token, cookie_value, ACCESS_TOKEN_COOKIE},
};
use crate::{error::ApiError, state::AppState, users::PublicUser};

/// Authenticated caller, loaded fresh from the store on every request.
/// Takes the access token from the `accessToken` cookie or a bearer header.
pub struct CurrentUser(pub PublicUser);

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = cookie_value(&parts.headers, ACCESS_TOKEN_COOKIE)
            .or_else(|| bearer_token(&parts.headers))
            .ok_or_else(|| ApiError::unauthorized("Unauthorized request"))?;

        let claims = state.jwt.verify(token, TokenKind::Access).map_err(|e| {
            warn!(error = %e, "access token rejected");
            ApiError::unauthorized("Invalid access token")
        })?;

        let user = state
            .users
            .find_by_id(claims.sub)
            .await?
            .ok_or_else(|| {
                warn!(user_id = %claims.sub, "access token for missing user");
                ApiError::unauthorized("Invalid access token")
            })?;

        Ok(CurrentUser(user.into()))
    }
}
