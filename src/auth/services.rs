use serde::Serialize;
use tracing::{error, info};
use uuid::Uuid;

use crate::{error::ApiError, state::AppState};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

const ROTATION_FAILED: &str = "Something went wrong while generating refresh and access token";

/// Issues a fresh access/refresh pair for `user_id` and stores the refresh
/// token on the user, replacing whatever was there. Concurrent rotations for
/// the same user are not serialized: the last write wins.
pub async fn rotate_refresh_token(state: &AppState, user_id: Uuid) -> Result<TokenPair, ApiError> {
    let user = match state.users.find_by_id(user_id).await {
        Ok(Some(u)) => u,
        Ok(None) => {
            error!(%user_id, "token rotation for missing user");
            return Err(ApiError::Internal(ROTATION_FAILED.into()));
        }
        Err(e) => {
            error!(error = ?e, %user_id, "token rotation lookup failed");
            return Err(ApiError::Internal(ROTATION_FAILED.into()));
        }
    };

    let access_token = state.jwt.sign_access(&user).map_err(|e| {
        error!(error = %e, "jwt sign access failed");
        ApiError::Internal(ROTATION_FAILED.into())
    })?;
    let refresh_token = state.jwt.sign_refresh(&user).map_err(|e| {
        error!(error = %e, "jwt sign refresh failed");
        ApiError::Internal(ROTATION_FAILED.into())
    })?;

    if let Err(e) = state
        .users
        .set_refresh_token(user.id, Some(&refresh_token))
        .await
    {
        error!(error = ?e, user_id = %user.id, "persist refresh token failed");
        return Err(ApiError::Internal(ROTATION_FAILED.into()));
    }

    info!(user_id = %user.id, "token pair issued");
    Ok(TokenPair {
        access_token,
        refresh_token,
    })
}
