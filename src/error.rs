use axum::{
    async_trait,
    extract::{
        multipart::MultipartRejection, rejection::JsonRejection, FromRequest, Multipart, Request,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{error, warn};

/// Every failure a handler can surface. Rendered as
/// `{success: false, message, errors, data: null}` with the matching status.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{message}")]
    Validation { message: String, errors: Vec<String> },

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    MethodNotAllowed(String),

    /// Failure whose message is safe to show to the client.
    #[error("{0}")]
    Internal(String),

    /// Anything else bubbling up from the store or the media host.
    #[error(transparent)]
    Unexpected(#[from] anyhow::Error),
}

pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            errors: Vec::new(),
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized(message.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation { .. } => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            ApiError::Internal(_) | ApiError::Unexpected(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    success: bool,
    message: String,
    errors: Vec<String>,
    data: Option<serde_json::Value>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let (message, errors) = match self {
            ApiError::Validation { message, errors } => (message, errors),
            ApiError::Internal(msg) => {
                error!(error = %msg, "internal error");
                (msg, Vec::new())
            }
            ApiError::Unexpected(e) => {
                error!(error = ?e, "unexpected error");
                ("Internal server error".to_string(), Vec::new())
            }
            other => (other.to_string(), Vec::new()),
        };

        let body = ErrorBody {
            success: false,
            message,
            errors,
            data: None,
        };
        (status, Json(body)).into_response()
    }
}

pub async fn route_not_found() -> ApiError {
    ApiError::NotFound("Route not found".into())
}

pub async fn method_not_allowed() -> ApiError {
    ApiError::MethodNotAllowed("Method not allowed".into())
}

/// `Json` extractor whose rejection is rendered through [`ApiError`].
pub struct ApiJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(ApiJson(value)),
            Err(rejection) => {
                warn!(error = %rejection.body_text(), "json body rejected");
                Err(json_rejection(rejection))
            }
        }
    }
}

/// `Multipart` extractor whose rejection (wrong content type, missing
/// boundary) is rendered through [`ApiError`].
pub struct ApiMultipart(pub Multipart);

#[async_trait]
impl<S> FromRequest<S> for ApiMultipart
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Multipart::from_request(req, state).await {
            Ok(mp) => Ok(ApiMultipart(mp)),
            Err(rejection) => {
                warn!(error = %rejection.body_text(), "multipart body rejected");
                Err(multipart_rejection(rejection))
            }
        }
    }
}

fn multipart_rejection(rejection: MultipartRejection) -> ApiError {
    ApiError::Validation {
        message: "Invalid multipart body".into(),
        errors: vec![rejection.body_text()],
    }
}

fn json_rejection(rejection: JsonRejection) -> ApiError {
    ApiError::Validation {
        message: "Invalid request body".into(),
        errors: vec![rejection.body_text()],
    }
}
