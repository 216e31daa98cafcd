use crate::datasource::DataSourceError;
use crate::db::StoreError;
use crate::orchestration::TradeError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

/// Every handler error, rendered as `{"error": <reason>, "code": <CODE>}`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{message}")]
    BadRequest { message: String, code: &'static str },
    /// Well-formed request the account cannot satisfy.
    #[error("{message}")]
    Unprocessable { message: String, code: &'static str },
    #[error("Not authenticated")]
    NotAuthenticated,
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("Account store unavailable: {0}")]
    StoreUnavailable(String),
    #[error("Market data unavailable: {0}")]
    AdapterUnavailable(String),
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        AppError::BadRequest {
            message: message.into(),
            code: "INVALID_INPUT",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            AppError::Unprocessable { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::NotAuthenticated => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::StoreUnavailable(_) | AppError::AdapterUnavailable(_) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            AppError::BadRequest { code, .. } | AppError::Unprocessable { code, .. } => *code,
            AppError::NotAuthenticated => "NOT_AUTHENTICATED",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Conflict(_) => "CONFLICT",
            AppError::StoreUnavailable(_) => "STORE_UNAVAILABLE",
            AppError::AdapterUnavailable(_) => "ADAPTER_UNAVAILABLE",
            AppError::Internal(_) => "INTERNAL",
        }
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Unavailable(msg) => AppError::StoreUnavailable(msg),
            StoreError::Conflict { .. } => AppError::Conflict(err.to_string()),
            StoreError::Corrupt { .. } => AppError::Internal(err.to_string()),
        }
    }
}

impl From<DataSourceError> for AppError {
    fn from(err: DataSourceError) -> Self {
        match err {
            DataSourceError::NoData(msg) => AppError::NotFound(msg),
            DataSourceError::HttpError { status: 404, .. } => AppError::NotFound(err.to_string()),
            other => AppError::AdapterUnavailable(other.to_string()),
        }
    }
}

impl From<TradeError> for AppError {
    fn from(err: TradeError) -> Self {
        match err {
            TradeError::Ledger(e) if e.is_invalid_input() => AppError::BadRequest {
                message: e.to_string(),
                code: e.code(),
            },
            TradeError::Ledger(e) => AppError::Unprocessable {
                message: e.to_string(),
                code: e.code(),
            },
            TradeError::Store(e) => e.into(),
            TradeError::Conflict { .. } => AppError::Conflict(err.to_string()),
            TradeError::Adapter(e) => e.into(),
            TradeError::Valuation(e) => AppError::Unprocessable {
                message: e.to_string(),
                code: "VALUE_OVERFLOW",
            },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(code = self.code(), "{}", self);
        } else if status == StatusCode::CONFLICT {
            warn!("{}", self);
        }

        let body = Json(json!({
            "error": self.to_string(),
            "code": self.code(),
        }));

        (status, body).into_response()
    }
}
