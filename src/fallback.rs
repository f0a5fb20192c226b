//! Fallback responder — the availability backstop.
//!
//! The provider is configured to hit this endpoint whenever the primary
//! webhook fails, so this path must have no failure modes of its own: the
//! document is a pre-rendered constant, the catch-all handler does no I/O,
//! no dispatch, and no external calls.

use axum::{
    Json, Router,
    http::header,
    response::{IntoResponse, Response},
    routing::get,
};

/// Spoken by the fallback document.
pub const FALLBACK_TEXT: &str = "We are sorry, the tournament tracker voice line is \
temporarily unavailable. Please call back in a few minutes. Goodbye.";

/// The fixed document served for every request. Kept as a literal; tests
/// check it against the renderer.
pub const FALLBACK_DOC: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\
     <Response>\
     <Say voice=\"alice\">We are sorry, the tournament tracker voice line is \
temporarily unavailable. Please call back in a few minutes. Goodbye.</Say>\
     <Hangup/>\
     </Response>";

/// Build the fallback router: `/health` plus a catch-all for everything
/// else, any method, any path, any body.
pub fn fallback_routes() -> Router {
    Router::new()
        .route("/health", get(health))
        .fallback(fixed_document)
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "voiceline-fallback"
    }))
}

async fn fixed_document() -> Response {
    ([(header::CONTENT_TYPE, "text/xml")], FALLBACK_DOC).into_response()
}
