//! 错误到 HTTP 响应的映射

use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::Serialize;

use mc_core::MindCareError;

/// 错误响应体
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    pub code: &'static str,
}

/// 接口层错误
#[derive(Debug)]
pub struct ApiError(pub MindCareError);

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            MindCareError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            MindCareError::SessionNotFound(_) => StatusCode::NOT_FOUND,
            MindCareError::SessionClosed(_) => StatusCode::CONFLICT,
            e if e.is_upstream() => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn code(&self) -> &'static str {
        match &self.0 {
            MindCareError::InvalidInput(_) => "INVALID_INPUT",
            MindCareError::SessionNotFound(_) => "SESSION_NOT_FOUND",
            MindCareError::SessionClosed(_) => "SESSION_CLOSED",
            e if e.is_upstream() => "UPSTREAM_ERROR",
            _ => "INTERNAL_ERROR",
        }
    }
}

impl From<MindCareError> for ApiError {
    fn from(e: MindCareError) -> Self {
        Self(e)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self(MindCareError::InvalidInput(rejection.body_text()))
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        Self(MindCareError::InvalidInput(rejection.body_text()))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self.0, "request failed");
        }
        let body = ErrorBody {
            error: self.0.to_string(),
            code: self.code(),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (MindCareError::InvalidInput("x".into()), StatusCode::BAD_REQUEST),
            (MindCareError::SessionNotFound("x".into()), StatusCode::NOT_FOUND),
            (MindCareError::SessionClosed("x".into()), StatusCode::CONFLICT),
            (MindCareError::LlmProvider("x".into()), StatusCode::BAD_GATEWAY),
            (MindCareError::Database("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError(err).status(), status);
        }
    }
}
