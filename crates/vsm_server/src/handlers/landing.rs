use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};

use crate::assets;

/// Serve the upload form.
pub async fn landing() -> Response {
    match assets::landing_page() {
        Some(page) => Html(page).into_response(),
        None => (StatusCode::NOT_FOUND, "Landing page not found").into_response(),
    }
}
