use axum::http::StatusCode;
use serde::Serialize;

use crate::error::AppError;

pub const RATE_LIMIT_MESSAGE: &str = "Provider rate limit reached. Please retry later.";

/// Result of rendering one dashboard section.
///
/// Sections fail independently: a failed price chart never hides the
/// fundamentals table.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", content = "data", rename_all = "snake_case")]
pub enum SectionOutcome<T> {
    Ready(T),
    /// User-correctable condition; nothing rendered
    Warning(String),
    Failed(String),
    /// Provider throttled; memoized fetches were cleared
    RateLimited(String),
}

impl<T> SectionOutcome<T> {
    pub fn from_result(result: Result<T, AppError>) -> Self {
        match result {
            Ok(data) => SectionOutcome::Ready(data),
            Err(e) if e.is_rate_limit() => SectionOutcome::RateLimited(RATE_LIMIT_MESSAGE.to_string()),
            Err(e) => SectionOutcome::Failed(e.to_string()),
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, SectionOutcome::Ready(_))
    }

    pub fn ready(&self) -> Option<&T> {
        match self {
            SectionOutcome::Ready(data) => Some(data),
            _ => None,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            SectionOutcome::Ready(_) | SectionOutcome::Warning(_) => StatusCode::OK,
            SectionOutcome::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
            SectionOutcome::Failed(_) => StatusCode::BAD_GATEWAY,
        }
    }

    /// Message for non-ready outcomes
    pub fn message(&self) -> Option<&str> {
        match self {
            SectionOutcome::Ready(_) => None,
            SectionOutcome::Warning(m) | SectionOutcome::Failed(m) | SectionOutcome::RateLimited(m) => {
                Some(m)
            }
        }
    }
}
