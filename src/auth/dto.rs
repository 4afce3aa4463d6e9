use serde::{Deserialize, Serialize};

use super::services::TokenPair;
use crate::{error::ApiError, media::UploadForm, users::PublicUser};

/// Text part of the registration form, owned so the form can give up its files.
#[derive(Debug)]
pub struct RegisterFields {
    pub fullname: String,
    pub email: String,
    pub username: String,
    pub password: String,
}

impl RegisterFields {
    const REQUIRED: [&'static str; 4] = ["fullname", "email", "username", "password"];

    pub fn from_form(form: &UploadForm) -> Result<Self, ApiError> {
        let missing: Vec<String> = Self::REQUIRED
            .iter()
            .filter(|name| form.text(name).is_none())
            .map(|name| name.to_string())
            .collect();

        match (
            form.text("fullname"),
            form.text("email"),
            form.text("username"),
            form.raw("password"),
        ) {
            (Some(fullname), Some(email), Some(username), Some(password)) if missing.is_empty() => {
                Ok(Self {
                    fullname: fullname.to_string(),
                    email: email.to_string(),
                    username: username.to_string(),
                    password: password.to_string(),
                })
            }
            _ => Err(ApiError::Validation {
                message: "fullname, email, username and password are required to register".into(),
                errors: missing,
            }),
        }
    }
}

/// Request body for login. At least one identifier must be present.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: String,
}

/// Optional body of the refresh endpoint; the cookie takes precedence.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    #[serde(default)]
    pub refresh_token: Option<String>,
}

/// Returned after login.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub user: PublicUser,
    #[serde(flatten)]
    pub tokens: TokenPair,
}
