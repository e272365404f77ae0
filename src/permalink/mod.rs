//! HTTP surface: router, middleware and server loop.

use anyhow::{Context, Result};
use axum::{
    body::Body,
    http::{header::CONTENT_TYPE, HeaderName, HeaderValue, Method, Request},
    routing::{delete, get, post},
    Extension, Router,
};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    cors::CorsLayer,
    request_id::PropagateRequestIdLayer,
    set_header::SetRequestHeaderLayer,
    trace::TraceLayer,
};
use tracing::{debug_span, info, Span};
use ulid::Ulid;
use url::Url;
use utoipa_swagger_ui::SwaggerUi;

use crate::service::SlugService;

pub mod handlers;
mod openapi;

pub use openapi::openapi;

pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

/// Builds the application router around `service`.
#[must_use]
pub fn router(service: SlugService) -> Router {
    Router::new()
        .route("/v1/slugs/check", post(handlers::check_slug))
        .route("/v1/records", post(handlers::create_record))
        .route("/v1/records/:id", get(handlers::get_record))
        .route("/v1/records/:id/slug", post(handlers::regenerate_slug))
        .route("/v1/resolve/:slug", get(handlers::resolve_redirect))
        .route(
            "/v1/redirects",
            get(handlers::list_redirects).post(handlers::create_redirect),
        )
        .route("/v1/redirects/:id", delete(handlers::delete_redirect))
        .route("/health", get(handlers::health).options(handlers::health))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", openapi()))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestHeaderLayer::if_not_present(
                    HeaderName::from_static("x-request-id"),
                    |_req: &_| HeaderValue::from_str(Ulid::new().to_string().as_str()).ok(),
                ))
                .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                    "x-request-id",
                )))
                .layer(TraceLayer::new_for_http().make_span_with(make_span))
                .layer(Extension(service)),
        )
}

/// CORS for a single frontend origin; `None` when no frontend is configured.
///
/// # Errors
/// Returns an error if `frontend_url` is not an absolute URL.
pub fn cors_layer(frontend_url: Option<&str>) -> Result<Option<CorsLayer>> {
    let Some(frontend_url) = frontend_url else {
        return Ok(None);
    };

    let url = Url::parse(frontend_url).context("invalid frontend url")?;
    let origin = HeaderValue::from_str(&url.origin().ascii_serialization())
        .context("frontend url has no usable origin")?;

    Ok(Some(
        CorsLayer::new()
            .allow_methods([Method::GET, Method::POST, Method::DELETE])
            .allow_headers([CONTENT_TYPE])
            .allow_origin(origin),
    ))
}

/// Serves the API until ctrl-c.
/// # Errors
/// Returns an error if the listener cannot bind or the server fails.
pub async fn new(port: u16, service: SlugService, frontend_url: Option<&str>) -> Result<()> {
    let mut app = router(service);
    if let Some(cors) = cors_layer(frontend_url)? {
        app = app.layer(cors);
    }

    let listener = TcpListener::bind(format!("::0:{port}")).await?;

    info!("Listening on [::]:{}", port);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Gracefully shutdown");
        })
        .await?;

    Ok(())
}

// span
fn make_span(request: &Request<Body>) -> Span {
    let headers = request.headers();
    let path = request.uri().path();
    let request_id = headers
        .get("x-request-id")
        .and_then(|val| val.to_str().ok())
        .unwrap_or("none");

    debug_span!("http-request", path, method = %request.method(), request_id)
}
