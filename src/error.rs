//! Error taxonomy for slug and redirect operations and its HTTP mapping.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;
use utoipa::ToSchema;

use crate::{
    slug::SlugViolation,
    store::{ContentRecord, StoreError},
};

#[derive(Debug, Error)]
pub enum SlugError {
    #[error("invalid slug: {0}")]
    Validation(SlugViolation),
    #[error("title is required")]
    MissingTitle,
    #[error("slug `{slug}` is already in use")]
    SlugExists {
        slug: String,
        conflict: Option<Box<ContentRecord>>,
    },
    #[error("renaming `{old_slug}` to `{new_slug}` would create a redirect cycle ({hops} hops)")]
    RedirectCycle {
        old_slug: String,
        new_slug: String,
        hops: usize,
    },
    #[error("redirect chain starting at `{new_slug}` is longer than {depth} hops")]
    ChainTooDeep {
        old_slug: String,
        new_slug: String,
        depth: usize,
    },
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<SlugViolation> for SlugError {
    fn from(violation: SlugViolation) -> Self {
        Self::Validation(violation)
    }
}

impl SlugError {
    /// Stable error code returned to API clients.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) | Self::MissingTitle => "VALIDATION_ERROR",
            Self::SlugExists { .. } => "SLUG_EXISTS",
            Self::RedirectCycle { .. } | Self::ChainTooDeep { .. } => "REDIRECT_CYCLE",
            Self::NotFound(_) => "NOT_FOUND",
            Self::Store(err) if err.is_transient() => "STORE_UNAVAILABLE",
            Self::Store(_) => "STORE_ERROR",
        }
    }

    /// Finer-grained reason for validation failures and cycle variants.
    #[must_use]
    pub fn reason(&self) -> Option<&'static str> {
        match self {
            Self::Validation(violation) => Some(violation.code()),
            Self::MissingTitle => Some("EMPTY_TITLE"),
            Self::ChainTooDeep { .. } => Some("CHAIN_TOO_DEEP"),
            _ => None,
        }
    }

    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::MissingTitle => StatusCode::BAD_REQUEST,
            Self::SlugExists { .. } | Self::RedirectCycle { .. } | Self::ChainTooDeep { .. } => {
                StatusCode::CONFLICT
            }
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Store(err) if err.is_transient() => StatusCode::SERVICE_UNAVAILABLE,
            Self::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// `true` for both cycle variants; callers must not retry with the same input.
    #[must_use]
    pub fn is_cycle(&self) -> bool {
        matches!(self, Self::RedirectCycle { .. } | Self::ChainTooDeep { .. })
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conflict: Option<ConflictRecord>,
}

/// Record that already holds a requested slug.
#[derive(Debug, Serialize, ToSchema)]
pub struct ConflictRecord {
    pub id: String,
    pub title: String,
    pub slug: String,
}

impl From<&ContentRecord> for ConflictRecord {
    fn from(record: &ContentRecord) -> Self {
        Self {
            id: record.id.to_string(),
            title: record.title.clone(),
            slug: record.slug.clone(),
        }
    }
}

impl IntoResponse for SlugError {
    /// Store failures are logged here and surfaced without internal details.
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            Self::Store(err) => {
                error!("Store error: {err}");
                "Storage backend error.".to_string()
            }
            other => other.to_string(),
        };
        let conflict = match &self {
            Self::SlugExists {
                conflict: Some(record),
                ..
            } => Some(ConflictRecord::from(record.as_ref())),
            _ => None,
        };
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code().to_string(),
                message,
                reason: self.reason().map(str::to_string),
                conflict,
            },
        };
        (status, Json(body)).into_response()
    }
}
