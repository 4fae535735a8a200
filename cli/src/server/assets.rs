//! Static file server for the overlay pages.
//!
//! `/` serves the loot overlay, `/<name>.html` serves any page from
//! `templates/`, and `/static/<path>` serves scripts, styles and images.

use axum::{
    Router,
    extract::{Path as UrlPath, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

pub const TEMPLATES_DIR: &str = "templates";
pub const STATIC_DIR: &str = "static";
pub const DEFAULT_PAGE: &str = "overlay_loot.html";

/// Pages listed at startup: (label, file)
pub const OVERLAY_PAGES: &[(&str, &str)] = &[
    ("Loot", "overlay_loot.html"),
    ("Spells", "overlay_spells.html"),
    ("Buffs", "overlay_buffs.html"),
    ("Header", "overlay_header.html"),
];

#[derive(Clone)]
struct AssetRoot(Arc<PathBuf>);

pub fn router(asset_dir: PathBuf) -> Router {
    Router::new()
        .route("/", get(serve_index))
        .route("/static/{*path}", get(serve_static))
        .route("/{page}", get(serve_page))
        .with_state(AssetRoot(Arc::new(asset_dir)))
}

pub async fn run(listener: TcpListener, asset_dir: PathBuf, cancel: CancellationToken) {
    let app = router(asset_dir);
    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(cancel.cancelled_owned())
        .await
    {
        tracing::error!(error = %e, "HTTP server failed");
    }
    tracing::debug!("HTTP server stopped");
}

async fn serve_index(State(root): State<AssetRoot>) -> Response {
    serve_file(&root.0.join(TEMPLATES_DIR), DEFAULT_PAGE).await
}

async fn serve_page(State(root): State<AssetRoot>, UrlPath(page): UrlPath<String>) -> Response {
    if !page.ends_with(".html") {
        return not_found();
    }
    serve_file(&root.0.join(TEMPLATES_DIR), &page).await
}

async fn serve_static(State(root): State<AssetRoot>, UrlPath(path): UrlPath<String>) -> Response {
    serve_file(&root.0.join(STATIC_DIR), &path).await
}

/// Join `request` onto `base`, refusing anything that could leave it.
pub fn resolve_asset(base: &Path, request: &str) -> Option<PathBuf> {
    let relative = Path::new(request.trim_start_matches('/'));
    let safe = relative
        .components()
        .all(|c| matches!(c, Component::Normal(_)));
    (safe && !request.trim_start_matches('/').is_empty()).then(|| base.join(relative))
}

async fn serve_file(base: &Path, request: &str) -> Response {
    let Some(path) = resolve_asset(base, request) else {
        tracing::debug!(request, "Rejected asset path");
        return not_found();
    };

    match tokio::fs::read(&path).await {
        Ok(bytes) => {
            let mime = mime_guess::from_path(&path).first_or_octet_stream().to_string();
            ([(header::CONTENT_TYPE, mime)], bytes).into_response()
        }
        Err(e) => {
            tracing::debug!(path = %path.display(), error = %e, "Asset not found");
            not_found()
        }
    }
}

fn not_found() -> Response {
    (StatusCode::NOT_FOUND, "Not found").into_response()
}
