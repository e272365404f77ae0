use utoipa::OpenApi;

use super::handlers::{health, records, redirects, slugs, types};
use crate::{
    error::{ConflictRecord, ErrorBody, ErrorDetail},
    slug::SlugViolation,
};

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health,
        slugs::check_slug,
        slugs::resolve_redirect,
        records::create_record,
        records::get_record,
        records::regenerate_slug,
        redirects::list_redirects,
        redirects::create_redirect,
        redirects::delete_redirect,
    ),
    components(
        schemas(
            health::Health,
            types::CheckSlugRequest,
            types::CheckSlugResponse,
            types::ResolveResponse,
            types::CreateRecordRequest,
            types::RecordResponse,
            types::RegenerateSlugRequest,
            types::RegenerateSlugResponse,
            types::CreateRedirectRequest,
            types::RedirectResponse,
            ConflictRecord,
            ErrorBody,
            ErrorDetail,
            SlugViolation,
        )
    ),
    tags(
        (name = "slugs", description = "Slug availability and resolution"),
        (name = "records", description = "Content records and slug regeneration"),
        (name = "redirects", description = "Redirect history"),
        (name = "health", description = "Service health"),
    )
)]
struct ApiDoc;

#[must_use]
pub fn openapi() -> utoipa::openapi::OpenApi {
    ApiDoc::openapi()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn documents_every_route() {
        let doc = openapi();
        let paths: Vec<&str> = doc.paths.paths.keys().map(String::as_str).collect();
        for path in [
            "/health",
            "/v1/slugs/check",
            "/v1/resolve/{slug}",
            "/v1/records",
            "/v1/records/{id}",
            "/v1/records/{id}/slug",
            "/v1/redirects",
            "/v1/redirects/{id}",
        ] {
            assert!(paths.contains(&path), "missing {path} in {paths:?}");
        }
    }
}
