//! Redirect administration.

use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use tracing::instrument;

use super::{
    invalid_payload, parse_id,
    types::{CreateRedirectRequest, RedirectQuery, RedirectResponse},
};
use crate::{error::ErrorBody, service::SlugService};

#[utoipa::path(
    get,
    path = "/v1/redirects",
    params(RedirectQuery),
    responses(
        (status = 200, description = "Redirects, newest first.", body = [RedirectResponse]),
    ),
    tag = "redirects"
)]
#[instrument(skip(service))]
pub async fn list_redirects(
    Extension(service): Extension<SlugService>,
    Query(query): Query<RedirectQuery>,
) -> impl IntoResponse {
    match service.list_redirects(query.record_id).await {
        Ok(edges) => {
            let body: Vec<RedirectResponse> = edges.into_iter().map(RedirectResponse::from).collect();
            (StatusCode::OK, Json(body)).into_response()
        }
        Err(err) => err.into_response(),
    }
}

#[utoipa::path(
    post,
    path = "/v1/redirects",
    request_body = CreateRedirectRequest,
    responses(
        (status = 201, description = "Redirect created.", body = RedirectResponse),
        (status = 400, description = "A slug does not validate.", body = ErrorBody),
        (status = 409, description = "Old slug in use, or the redirect would loop.", body = ErrorBody),
    ),
    tag = "redirects"
)]
/// Adds a manual redirect. The target is followed to its live slug so the
/// stored edge is always a single hop.
#[instrument(skip(service))]
pub async fn create_redirect(
    Extension(service): Extension<SlugService>,
    payload: Option<Json<CreateRedirectRequest>>,
) -> impl IntoResponse {
    let Some(Json(request)) = payload else {
        return invalid_payload();
    };

    match service
        .create_redirect(&request.old_slug, &request.new_slug, request.note.as_deref())
        .await
    {
        Ok(edge) => (StatusCode::CREATED, Json(RedirectResponse::from(edge))).into_response(),
        Err(err) => err.into_response(),
    }
}

#[utoipa::path(
    delete,
    path = "/v1/redirects/{id}",
    params(
        ("id" = String, Path, description = "Redirect id")
    ),
    responses(
        (status = 204, description = "Redirect deleted."),
        (status = 404, description = "Unknown redirect.", body = ErrorBody),
    ),
    tag = "redirects"
)]
#[instrument(skip(service))]
pub async fn delete_redirect(
    Extension(service): Extension<SlugService>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let id = match parse_id(&id, "redirect") {
        Ok(id) => id,
        Err(err) => return err.into_response(),
    };

    match service.delete_redirect(id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => err.into_response(),
    }
}
