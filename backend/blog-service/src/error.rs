/// Error types for the blog service
///
/// Handlers return `Result<HttpResponse>`; every variant maps to a page or a redirect
/// through `ResponseError`.
use crate::templates::{NotFoundTemplate, ServerErrorTemplate};
use actix_web::{error::ResponseError, http::header, http::StatusCode, HttpResponse};
use askama::Template;
use thiserror::Error;

/// Result type for blog-service operations
pub type Result<T> = std::result::Result<T, AppError>;

/// Application error types
#[derive(Debug, Error)]
pub enum AppError {
    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Anonymous access to a page that needs a session
    #[error("Login required for {next}")]
    LoginRequired { next: String },

    /// Input failed validation outside a form round-trip
    #[error("Validation error: {0}")]
    Validation(String),

    /// Malformed request payload
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Unique constraint hit (duplicate username, slug, ...)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Database operation failed
    #[error("Database error: {0}")]
    Database(String),

    /// Cache backend failed
    #[error("Cache error: {0}")]
    Cache(String),

    /// Template rendering failed
    #[error("Template error: {0}")]
    Template(String),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Login page URL carrying the originally requested path.
pub fn login_url(next: &str) -> String {
    // Slashes stay readable in `next`, as in `/auth/login/?next=/create/`.
    let encoded = urlencoding::encode(next).replace("%2F", "/");
    format!("/auth/login/?next={}", encoded)
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::LoginRequired { .. } => StatusCode::FOUND,
            AppError::Validation(_) | AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Database(_)
            | AppError::Cache(_)
            | AppError::Template(_)
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();

        if let AppError::LoginRequired { next } = self {
            return HttpResponse::Found()
                .insert_header((header::LOCATION, login_url(next)))
                .finish();
        }

        let rendered = match self {
            AppError::NotFound(path) => NotFoundTemplate::new(path.clone()).render(),
            AppError::Validation(msg) | AppError::BadRequest(msg) | AppError::Conflict(msg) => {
                ServerErrorTemplate::new(status.as_u16(), msg.clone()).render()
            }
            _ => {
                tracing::error!(error = %self, "request failed");
                ServerErrorTemplate::new(status.as_u16(), "Ошибка сервера".to_string()).render()
            }
        };

        match rendered {
            Ok(body) => HttpResponse::build(status)
                .content_type("text/html; charset=utf-8")
                .body(body),
            Err(e) => {
                tracing::error!(error = %e, "error page rendering failed");
                HttpResponse::build(status).body(self.to_string())
            }
        }
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => AppError::NotFound("row".to_string()),
            other => AppError::Database(other.to_string()),
        }
    }
}

impl From<askama::Error> for AppError {
    fn from(err: askama::Error) -> Self {
        AppError::Template(err.to_string())
    }
}

impl From<page_cache::CacheError> for AppError {
    fn from(err: page_cache::CacheError) -> Self {
        AppError::Cache(err.to_string())
    }
}

impl From<actix_multipart::MultipartError> for AppError {
    fn from(err: actix_multipart::MultipartError) -> Self {
        AppError::BadRequest(format!("Multipart error: {}", err))
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_url_keeps_slashes() {
        assert_eq!(login_url("/create/"), "/auth/login/?next=/create/");
        assert_eq!(
            login_url("/follow/?page=2"),
            "/auth/login/?next=/follow/%3Fpage%3D2"
        );
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(
            AppError::NotFound("x".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::LoginRequired { next: "/".into() }.status_code(),
            StatusCode::FOUND
        );
        assert_eq!(
            AppError::Database("boom".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_login_required_response_redirects() {
        let resp = AppError::LoginRequired {
            next: "/create/".into(),
        }
        .error_response();
        assert_eq!(resp.status(), StatusCode::FOUND);
        assert_eq!(
            resp.headers().get(header::LOCATION).unwrap(),
            "/auth/login/?next=/create/"
        );
    }
}
