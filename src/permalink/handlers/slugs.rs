//! Slug availability and redirect resolution.

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use tracing::instrument;

use super::{
    invalid_payload,
    types::{CheckSlugRequest, CheckSlugResponse, ResolveResponse},
};
use crate::{
    error::{ErrorBody, SlugError},
    service::SlugService,
};

#[utoipa::path(
    post,
    path = "/v1/slugs/check",
    request_body = CheckSlugRequest,
    responses(
        (status = 200, description = "Normalized slug and whether it is free.", body = CheckSlugResponse),
        (status = 400, description = "Candidate does not normalize to a valid slug.", body = ErrorBody),
        (status = 503, description = "Store unavailable, safe to retry.", body = ErrorBody),
    ),
    tag = "slugs"
)]
/// Normalizes a candidate slug and reports whether another record holds it.
/// `excludeRecordId` lets an editor check the record's own slug without a false conflict.
#[instrument(skip(service))]
pub async fn check_slug(
    Extension(service): Extension<SlugService>,
    payload: Option<Json<CheckSlugRequest>>,
) -> impl IntoResponse {
    let Some(Json(request)) = payload else {
        return invalid_payload();
    };

    match service
        .check_availability(&request.candidate, request.exclude_record_id)
        .await
    {
        Ok(availability) => {
            (StatusCode::OK, Json(CheckSlugResponse::from(availability))).into_response()
        }
        Err(err) => err.into_response(),
    }
}

#[utoipa::path(
    get,
    path = "/v1/resolve/{slug}",
    params(
        ("slug" = String, Path, description = "Slug that may have been vacated by a rename")
    ),
    responses(
        (status = 200, description = "Live slug the old one redirects to.", body = ResolveResponse),
        (status = 404, description = "No redirect for this slug.", body = ErrorBody),
    ),
    tag = "slugs"
)]
/// Looks up where an old slug now lives. Always a single hop.
#[instrument(skip(service))]
pub async fn resolve_redirect(
    Extension(service): Extension<SlugService>,
    Path(slug): Path<String>,
) -> impl IntoResponse {
    match service.resolve_redirect(&slug).await {
        Ok(Some(new_slug)) => (StatusCode::OK, Json(ResolveResponse { new_slug })).into_response(),
        Ok(None) => SlugError::NotFound("redirect").into_response(),
        Err(err) => err.into_response(),
    }
}
