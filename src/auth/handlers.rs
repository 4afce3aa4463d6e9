use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, State},
    http::HeaderMap,
    routing::post,
    Router,
};
use tracing::{error, info, instrument, warn};

use super::{
    claims::TokenKind,
    cookies::{cleared_session_cookies, cookie_value, session_cookies, CookieHeaders, REFRESH_TOKEN_COOKIE},
    dto::{LoginRequest, LoginResponse, RefreshRequest, RegisterFields},
    extractors::CurrentUser,
    jwt::TokenError,
    password::hash_password,
    services::{rotate_refresh_token, TokenPair},
};
use crate::{
    error::{ApiError, ApiJson, ApiMultipart, ApiResult},
    media::{read_upload_form, upload_on_media_host, MediaFolder},
    response::ApiResponse,
    state::AppState,
    users::{
        services::{ensure_identity_free, is_valid_email, normalize_identity, normalized_opt},
        NewUser, PublicUser,
    },
};

const UPLOAD_LIMIT: usize = 10 * 1024 * 1024;

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/register",
            post(register).layer(DefaultBodyLimit::max(UPLOAD_LIMIT)),
        )
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/refresh-token", post(refresh_access_token))
}

#[instrument(skip(state, mp))]
pub async fn register(
    State(state): State<AppState>,
    ApiMultipart(mp): ApiMultipart,
) -> ApiResult<ApiResponse<PublicUser>> {
    let mut form = read_upload_form(mp, &state.config.media.upload_tmp_dir).await?;
    let fields = RegisterFields::from_form(&form).map_err(|e| {
        warn!(error = %e, "registration with blank fields");
        e
    })?;

    let email = normalize_identity(&fields.email);
    let username = normalize_identity(&fields.username);
    if !is_valid_email(&email) {
        warn!(%email, "invalid email");
        return Err(ApiError::validation("Invalid email"));
    }

    if let Err(e) =
        ensure_identity_free(state.users.as_ref(), Some(&username), Some(&email), None).await
    {
        warn!(%username, %email, "username or email already registered");
        return Err(e);
    }

    let avatar_file = form
        .take_file("avatar")
        .ok_or_else(|| ApiError::validation("Avatar image is required"))?;
    let cover_file = form.take_file("coverImage");

    let avatar = upload_on_media_host(state.storage.as_ref(), avatar_file, MediaFolder::Avatars)
        .await
        .map_err(|_| ApiError::validation("Avatar image is required"))?;

    let cover_image = match cover_file {
        Some(file) => {
            match upload_on_media_host(state.storage.as_ref(), file, MediaFolder::CoverImages).await {
                Ok(url) => Some(url),
                Err(_) => {
                    warn!(%username, "cover image upload failed; registering without it");
                    None
                }
            }
        }
        None => None,
    };

    let password_hash = hash_password(&fields.password)?;

    let created = match state
        .users
        .create(NewUser {
            username: username.clone(),
            email: email.clone(),
            fullname: fields.fullname,
            avatar,
            cover_image,
            password_hash,
        })
        .await
    {
        Ok(u) => u,
        Err(e) => {
            // a concurrent registration may have taken the identity in the meantime
            ensure_identity_free(state.users.as_ref(), Some(&username), Some(&email), None)
                .await?;
            error!(error = ?e, "create user failed");
            return Err(e.into());
        }
    };

    let user = state
        .users
        .find_by_id(created.id)
        .await?
        .ok_or_else(|| ApiError::Internal("Something went wrong while registering the user".into()))?;

    info!(user_id = %user.id, username = %user.username, "user registered");
    Ok(ApiResponse::created(
        PublicUser::from(user),
        "User registered successfully",
    ))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<LoginRequest>,
) -> ApiResult<(CookieHeaders, ApiResponse<LoginResponse>)> {
    let username = normalized_opt(payload.username.as_deref());
    let email = normalized_opt(payload.email.as_deref());

    if username.is_none() && email.is_none() {
        return Err(ApiError::validation("username or email is required"));
    }
    if payload.password.is_empty() {
        return Err(ApiError::validation("password is required"));
    }

    let user = state
        .users
        .find_by_username_or_email(username.as_deref(), email.as_deref())
        .await?
        .ok_or_else(|| {
            warn!(?username, ?email, "login for unknown user");
            ApiError::NotFound("User does not exist".into())
        })?;

    if !user.is_password_correct(&payload.password)? {
        warn!(user_id = %user.id, "login invalid password");
        return Err(ApiError::unauthorized("Invalid user credentials"));
    }

    let tokens = rotate_refresh_token(&state, user.id).await?;
    let cookies = session_cookies(&tokens, &state.jwt);

    info!(user_id = %user.id, "user logged in");
    Ok((
        cookies,
        ApiResponse::ok(
            LoginResponse {
                user: user.into(),
                tokens,
            },
            "User logged in successfully",
        ),
    ))
}

#[instrument(skip(state, user))]
pub async fn logout(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> ApiResult<(CookieHeaders, ApiResponse<serde_json::Value>)> {
    state.users.set_refresh_token(user.id, None).await?;

    info!(user_id = %user.id, "user logged out");
    Ok((
        cleared_session_cookies(),
        ApiResponse::ok(serde_json::json!({}), "User logged out"),
    ))
}

#[instrument(skip(state, headers, body))]
pub async fn refresh_access_token(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<(CookieHeaders, ApiResponse<TokenPair>)> {
    let from_body = || {
        serde_json::from_slice::<RefreshRequest>(&body)
            .unwrap_or_default()
            .refresh_token
            .filter(|t| !t.trim().is_empty())
    };
    let incoming = cookie_value(&headers, REFRESH_TOKEN_COOKIE)
        .map(str::to_string)
        .or_else(from_body)
        .ok_or_else(|| ApiError::unauthorized("Unauthorized request"))?;

    let claims = state
        .jwt
        .verify(&incoming, TokenKind::Refresh)
        .map_err(|e| {
            warn!(error = %e, "refresh token rejected");
            match e {
                TokenError::Expired => ApiError::unauthorized("Refresh token expired"),
                _ => ApiError::unauthorized("Invalid refresh token"),
            }
        })?;

    let user = state
        .users
        .find_by_id(claims.sub)
        .await?
        .ok_or_else(|| ApiError::unauthorized("Invalid refresh token"))?;

    if user.refresh_token.as_deref() != Some(incoming.as_str()) {
        warn!(user_id = %user.id, "stale refresh token presented");
        return Err(ApiError::unauthorized("Refresh token is expired or used"));
    }

    let tokens = rotate_refresh_token(&state, user.id).await?;
    let cookies = session_cookies(&tokens, &state.jwt);

    info!(user_id = %user.id, "access token refreshed");
    Ok((
        cookies,
        ApiResponse::ok(tokens, "Access token refreshed successfully"),
    ))
}
