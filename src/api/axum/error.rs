use axum::Json;
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};

use crate::AuthError;
use crate::api::ErrorResponse;

/// converts `AuthError` into appropriate HTTP responses
#[derive(Debug)]
pub struct AppError(pub AuthError);

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        Self(err)
    }
}

pub(crate) fn status_for(err: &AuthError) -> StatusCode {
    match err {
        AuthError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        AuthError::TokenInvalid | AuthError::TokenExpired => StatusCode::UNAUTHORIZED,
        AuthError::Forbidden => StatusCode::FORBIDDEN,
        AuthError::InvalidCredentials | AuthError::UserNotFound | AuthError::NotFound => {
            StatusCode::NOT_FOUND
        }
        AuthError::UserAlreadyExists => StatusCode::CONFLICT,
        AuthError::TooManyRequests { .. } => StatusCode::TOO_MANY_REQUESTS,
        AuthError::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        AuthError::DatabaseError(_)
        | AuthError::ConfigurationError(_)
        | AuthError::PasswordHashError
        | AuthError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = status_for(&self.0);
        if status.is_server_error() {
            log::error!(target: "turnstile_auth", "msg=\"request failed\", error=\"{}\"", self.0);
        }

        let retry_after = match &self.0 {
            AuthError::TooManyRequests { retry_after } => Some(*retry_after),
            _ => None,
        };

        let mut response = (status, Json(ErrorResponse::from(self.0))).into_response();
        if let Some(secs) = retry_after {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(secs));
        }
        response
    }
}
