//! Request and response bodies. Field names are camelCase on the wire.

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::{
    error::ConflictRecord,
    service::{Availability, SlugChange},
    store::{ContentRecord, RedirectEdge},
};

#[derive(ToSchema, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct CheckSlugRequest {
    pub candidate: String,
    #[serde(default)]
    pub exclude_record_id: Option<Uuid>,
}

#[derive(ToSchema, Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct CheckSlugResponse {
    pub normalized_slug: String,
    pub available: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conflict: Option<ConflictRecord>,
}

impl From<Availability> for CheckSlugResponse {
    fn from(availability: Availability) -> Self {
        Self {
            conflict: availability.conflict.as_ref().map(ConflictRecord::from),
            normalized_slug: availability.normalized_slug,
            available: availability.available,
        }
    }
}

#[derive(ToSchema, Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ResolveResponse {
    pub new_slug: String,
}

#[derive(ToSchema, Deserialize, Debug)]
pub struct CreateRecordRequest {
    pub title: String,
    #[serde(default)]
    pub slug: Option<String>,
}

#[derive(ToSchema, Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct RecordResponse {
    pub id: String,
    pub title: String,
    pub slug: String,
    pub created_at: String,
    pub updated_at: String,
}

impl From<ContentRecord> for RecordResponse {
    fn from(record: ContentRecord) -> Self {
        Self {
            id: record.id.to_string(),
            title: record.title,
            slug: record.slug,
            created_at: record.created_at.to_rfc3339(),
            updated_at: record.updated_at.to_rfc3339(),
        }
    }
}

#[derive(ToSchema, Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct RegenerateSlugRequest {
    pub title: Option<String>,
    pub manual_slug: Option<String>,
}

#[derive(ToSchema, Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct RegenerateSlugResponse {
    pub old_slug: String,
    pub new_slug: String,
    pub changed: bool,
}

impl From<SlugChange> for RegenerateSlugResponse {
    fn from(change: SlugChange) -> Self {
        Self {
            old_slug: change.old_slug,
            new_slug: change.new_slug,
            changed: change.changed,
        }
    }
}

#[derive(IntoParams, Deserialize, Debug, Default)]
#[into_params(parameter_in = Query)]
#[serde(rename_all = "camelCase")]
pub struct RedirectQuery {
    /// Only list redirects owned by this record.
    pub record_id: Option<Uuid>,
}

#[derive(ToSchema, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct CreateRedirectRequest {
    pub old_slug: String,
    pub new_slug: String,
    #[serde(default)]
    pub note: Option<String>,
}

#[derive(ToSchema, Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct RedirectResponse {
    pub id: String,
    pub old_slug: String,
    pub new_slug: String,
    pub record_id: Option<String>,
    pub note: Option<String>,
    pub created_at: String,
}

impl From<RedirectEdge> for RedirectResponse {
    fn from(edge: RedirectEdge) -> Self {
        Self {
            id: edge.id.to_string(),
            old_slug: edge.old_slug,
            new_slug: edge.new_slug,
            record_id: edge.record_id.map(|id| id.to_string()),
            note: edge.note,
            created_at: edge.created_at.to_rfc3339(),
        }
    }
}
