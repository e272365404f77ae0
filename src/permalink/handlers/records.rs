//! Content record endpoints, including slug regeneration.

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use tracing::instrument;

use super::{
    invalid_payload, parse_id,
    types::{CreateRecordRequest, RecordResponse, RegenerateSlugRequest, RegenerateSlugResponse},
};
use crate::{error::ErrorBody, service::SlugService};

#[utoipa::path(
    post,
    path = "/v1/records",
    request_body = CreateRecordRequest,
    responses(
        (status = 201, description = "Record created.", body = RecordResponse),
        (status = 400, description = "Missing title or invalid slug.", body = ErrorBody),
        (status = 409, description = "Slug taken by a concurrent writer.", body = ErrorBody),
    ),
    tag = "records"
)]
/// Creates a record. The slug comes from `slug` when given, else from `title`,
/// and takes a numeric suffix if the base is already claimed.
#[instrument(skip(service))]
pub async fn create_record(
    Extension(service): Extension<SlugService>,
    payload: Option<Json<CreateRecordRequest>>,
) -> impl IntoResponse {
    let Some(Json(request)) = payload else {
        return invalid_payload();
    };

    match service
        .create_record(&request.title, request.slug.as_deref())
        .await
    {
        Ok(record) => (StatusCode::CREATED, Json(RecordResponse::from(record))).into_response(),
        Err(err) => err.into_response(),
    }
}

#[utoipa::path(
    get,
    path = "/v1/records/{id}",
    params(
        ("id" = String, Path, description = "Record id")
    ),
    responses(
        (status = 200, description = "Record.", body = RecordResponse),
        (status = 404, description = "Unknown record.", body = ErrorBody),
    ),
    tag = "records"
)]
#[instrument(skip(service))]
pub async fn get_record(
    Extension(service): Extension<SlugService>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let id = match parse_id(&id, "record") {
        Ok(id) => id,
        Err(err) => return err.into_response(),
    };

    match service.record(id).await {
        Ok(record) => (StatusCode::OK, Json(RecordResponse::from(record))).into_response(),
        Err(err) => err.into_response(),
    }
}

#[utoipa::path(
    post,
    path = "/v1/records/{id}/slug",
    params(
        ("id" = String, Path, description = "Record id")
    ),
    request_body = RegenerateSlugRequest,
    responses(
        (status = 200, description = "Previous and current slug.", body = RegenerateSlugResponse),
        (status = 400, description = "Slug does not validate.", body = ErrorBody),
        (status = 404, description = "Unknown record.", body = ErrorBody),
        (status = 409, description = "Slug taken, or the rename would create a redirect cycle.", body = ErrorBody),
        (status = 503, description = "Store unavailable, retry the whole rename.", body = ErrorBody),
    ),
    tag = "records"
)]
/// Regenerates a record's slug from `manualSlug`, `title`, or the stored title.
/// On change the old slug keeps resolving through the redirect table.
/// A rejected rename leaves the record and every redirect unchanged.
#[instrument(skip(service))]
pub async fn regenerate_slug(
    Extension(service): Extension<SlugService>,
    Path(id): Path<String>,
    payload: Option<Json<RegenerateSlugRequest>>,
) -> impl IntoResponse {
    let id = match parse_id(&id, "record") {
        Ok(id) => id,
        Err(err) => return err.into_response(),
    };
    // An empty body regenerates from the stored title.
    let request = payload.map(|Json(request)| request).unwrap_or_default();

    match service
        .regenerate_slug(id, request.title.as_deref(), request.manual_slug.as_deref())
        .await
    {
        Ok(change) => (StatusCode::OK, Json(RegenerateSlugResponse::from(change))).into_response(),
        Err(err) => err.into_response(),
    }
}
