//! Unified error handling for the back-office.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use cardapio_client::ApiError;
use thiserror::Error;

/// Marker placed on responses whose backend call was refused for the
/// current token. The session guard middleware logs the user out when it
/// sees it.
#[derive(Debug, Clone, Copy)]
pub struct SessionExpired;

/// Application-level error type for the back-office.
#[derive(Debug, Error)]
pub enum AppError {
    /// Backend API call failed.
    #[error("Backend error: {0}")]
    Api(#[from] ApiError),

    /// Session store read or write failed.
    #[error("Session error: {0}")]
    Session(#[from] tower_sessions::session::Error),

    /// Template rendering failed.
    #[error("Template error: {0}")]
    Template(#[from] askama::Error),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// User lacks permission.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Whether the backend rejected the session token itself.
    #[must_use]
    pub const fn is_auth_failure(&self) -> bool {
        matches!(self, Self::Api(err) if err.is_auth_failure())
    }

    fn is_server_error(&self) -> bool {
        match self {
            Self::Api(err) => !matches!(
                err,
                ApiError::Unauthorized(_)
                    | ApiError::Forbidden(_)
                    | ApiError::NotFound(_)
                    | ApiError::RateLimited(_)
                    | ApiError::Api { status: 400..=499, .. }
            ),
            Self::Session(_) | Self::Template(_) | Self::Internal(_) => true,
            Self::NotFound(_) | Self::Forbidden(_) | Self::BadRequest(_) => false,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.is_auth_failure() {
            tracing::info!(error = %self, "Backend refused session token, logging out");
            let mut response = Redirect::to("/login").into_response();
            response.extensions_mut().insert(SessionExpired);
            return response;
        }

        // Log server errors with Sentry
        if self.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Back-office request error"
            );
        }

        let status = match &self {
            Self::Api(err) => match err {
                ApiError::NotFound(_) => StatusCode::NOT_FOUND,
                ApiError::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
                ApiError::Api { status: 400..=499, .. } => StatusCode::UNPROCESSABLE_ENTITY,
                _ => StatusCode::BAD_GATEWAY,
            },
            Self::Session(_) | Self::Template(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
        };

        // Don't expose internal error details to clients
        let message = match &self {
            Self::Api(_) if status == StatusCode::BAD_GATEWAY => {
                "Não foi possível falar com o servidor. Tente novamente.".to_string()
            }
            Self::Api(err) => err.user_message(),
            Self::Session(_) | Self::Template(_) | Self::Internal(_) => {
                "Erro interno. Tente novamente.".to_string()
            }
            Self::NotFound(what) => format!("Não encontrado: {what}"),
            Self::Forbidden(msg) | Self::BadRequest(msg) => msg.clone(),
        };

        (status, message).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context for the logged-in staff member.
pub fn set_sentry_user(user_id: i32, email: &str) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: Some(email.to_string()),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn get_status(err: AppError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn test_app_error_display() {
        let err = AppError::NotFound("produto 12".to_string());
        assert_eq!(err.to_string(), "Not found: produto 12");

        let err = AppError::Forbidden("somente gerentes".to_string());
        assert_eq!(err.to_string(), "Forbidden: somente gerentes");
    }

    #[test]
    fn test_app_error_status_codes() {
        assert_eq!(
            get_status(AppError::NotFound("test".to_string())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(AppError::Forbidden("test".to_string())),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            get_status(AppError::BadRequest("test".to_string())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(AppError::Internal("test".to_string())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            get_status(AppError::Api(ApiError::Api {
                status: 409,
                message: "Caixa já aberto".to_string(),
            })),
            StatusCode::UNPROCESSABLE_ENTITY
        );
    }

    #[test]
    fn test_backend_auth_failure_redirects_and_marks_session() {
        for err in [
            ApiError::Unauthorized("token expirado".to_string()),
            ApiError::Forbidden(String::new()),
        ] {
            let response = AppError::Api(err).into_response();
            assert_eq!(response.status(), StatusCode::SEE_OTHER);
            assert_eq!(response.headers().get("location").unwrap(), "/login");
            assert!(response.extensions().get::<SessionExpired>().is_some());
        }
    }
}
