//! Gateway error taxonomy and its HTTP mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use token_authz_sdk::TokenAuthzError;

use crate::index::IndexError;
use crate::problem::Problem;

pub type ApiResult<T> = Result<T, ApiError>;

/// Request outcome errors.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("unauthorized")]
    Unauthorized,

    #[error("internal error: {0}")]
    Internal(String),

    #[error("record index failure: {0}")]
    Backend(#[from] IndexError),
}

impl ApiError {
    #[must_use]
    pub fn bad_request(detail: impl Into<String>) -> Self {
        Self::BadRequest(detail.into())
    }
}

impl From<TokenAuthzError> for ApiError {
    fn from(e: TokenAuthzError) -> Self {
        match e {
            TokenAuthzError::Unauthorized => Self::Unauthorized,
            TokenAuthzError::Internal(msg) => Self::Internal(msg),
        }
    }
}

impl From<ApiError> for Problem {
    fn from(e: ApiError) -> Self {
        match e {
            ApiError::BadRequest(detail) => {
                Problem::new(StatusCode::BAD_REQUEST, "Bad Request", detail)
            }
            // Access denials answer 403; callers never learn why.
            ApiError::Unauthorized => {
                Problem::new(StatusCode::FORBIDDEN, "Unauthorized", "Unauthorized")
            }
            ApiError::Internal(msg) => {
                tracing::error!(error = %msg, "request failed after authorization");
                Problem::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal Server Error",
                    msg,
                )
            }
            ApiError::Backend(err) => {
                tracing::error!(error = %err, "record index call failed");
                Problem::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal Server Error",
                    "Search backend unavailable",
                )
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        Problem::from(self).into_response()
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn outcomes_map_to_status_codes() {
        let cases = [
            (ApiError::bad_request("x"), StatusCode::BAD_REQUEST),
            (ApiError::Unauthorized, StatusCode::FORBIDDEN),
            (
                ApiError::Internal("links".to_owned()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                ApiError::Backend(IndexError::Unavailable("down".to_owned())),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, status) in cases {
            assert_eq!(Problem::from(err).status_code(), status);
        }
    }

    #[test]
    fn backend_detail_is_not_leaked() {
        let problem = Problem::from(ApiError::Backend(IndexError::Unavailable(
            "connection refused to 10.0.0.7".to_owned(),
        )));
        assert!(!problem.detail.contains("10.0.0.7"));
    }
}
