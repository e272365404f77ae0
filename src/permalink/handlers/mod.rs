//! Route handlers.
//!
//! Handlers only parse inputs and map results; every slug and redirect rule
//! lives in [`SlugService`](crate::service::SlugService).

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use uuid::Uuid;

use crate::error::{ErrorBody, ErrorDetail, SlugError};

pub mod health;
pub use self::health::health;

pub mod slugs;
pub use self::slugs::{check_slug, resolve_redirect};

pub mod records;
pub use self::records::{create_record, get_record, regenerate_slug};

pub mod redirects;
pub use self::redirects::{create_redirect, delete_redirect, list_redirects};

pub mod types;


/// 400 for a missing or malformed JSON body.
fn invalid_payload() -> Response {
    let body = ErrorBody {
        error: ErrorDetail {
            code: "VALIDATION_ERROR".to_string(),
            message: "Missing or malformed JSON body.".to_string(),
            reason: Some("INVALID_BODY".to_string()),
            conflict: None,
        },
    };
    (StatusCode::BAD_REQUEST, Json(body)).into_response()
}

/// Path ids that are not UUIDs cannot name an existing resource.
fn parse_id(raw: &str, resource: &'static str) -> Result<Uuid, SlugError> {
    Uuid::parse_str(raw).map_err(|_| SlugError::NotFound(resource))
}
