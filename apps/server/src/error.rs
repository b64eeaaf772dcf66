use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use matchsync_core::errors::{DatabaseError, Error as CoreError};
use matchsync_game_api::GameApiError;
use matchsync_ingest::SyncError;
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    Core(#[from] CoreError),
    #[error("{0}")]
    GameApi(#[from] GameApiError),
    #[error("{0}")]
    Sync(#[from] SyncError),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    Internal(String),
    #[error("{0}")]
    Anyhow(#[from] anyhow::Error),
}

#[derive(Serialize)]
struct ErrorBody {
    code: u16,
    message: String,
}

fn game_api_status(err: &GameApiError) -> StatusCode {
    match err {
        GameApiError::NotFound(_) => StatusCode::NOT_FOUND,
        GameApiError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
        GameApiError::Timeout => StatusCode::GATEWAY_TIMEOUT,
        GameApiError::Cancelled => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::BAD_GATEWAY,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::Core(e) => match e {
                CoreError::Validation(_) => StatusCode::BAD_REQUEST,
                CoreError::Database(DatabaseError::NotFound(_)) => StatusCode::NOT_FOUND,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::GameApi(e) => game_api_status(e),
            ApiError::Sync(e) => match e {
                SyncError::AccountNotFound(_) => StatusCode::NOT_FOUND,
                SyncError::Api(api) => game_api_status(api),
                SyncError::AlreadyRunning(_) => StatusCode::CONFLICT,
                SyncError::Cancelled => StatusCode::SERVICE_UNAVAILABLE,
                SyncError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Internal(_) | ApiError::Anyhow(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = Json(ErrorBody {
            code: status.as_u16(),
            message: self.to_string(),
        });
        (status, body).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
