//! HTTP surface: upload forms, submission endpoints and health probes.
//!
//! | Route | Method | Response |
//! |-------|--------|----------|
//! | `/` | GET | landing page selected by `APPLICATION_PATH` |
//! | `/service`, `/labs` | GET | fixed pages |
//! | `/validate` | POST | HTML validation report |
//! | `/report` | POST | PDF report |
//! | `/convert/xrechnung` | POST | HTML page with the UBL XML |
//! | `/convert/xrechnung/download` | POST | UBL XML attachment |
//! | `/health/liveness`, `/health/readiness` | GET | probes |

mod error;
mod handlers;
pub mod pages;

use std::sync::Arc;

use axum::Router;
use axum::extract::{DefaultBodyLimit, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};
use axum::routing::{get, post};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use crate::context::AppContext;

pub use error::AppError;

/// Multipart framing on top of the file itself.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Assemble the router. The context is shared read-only by every handler.
pub fn app(ctx: Arc<AppContext>) -> Router {
    let body_limit = ctx.max_upload_bytes.saturating_add(MULTIPART_OVERHEAD);

    let submissions = Router::new()
        .route("/validate", post(handlers::validate))
        .route("/report", post(handlers::report))
        .route("/convert/xrechnung", post(handlers::convert))
        .route("/convert/xrechnung/download", post(handlers::download))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(body_limit));

    Router::new()
        .route("/", get(handlers::landing))
        .route("/service", get(handlers::service))
        .route("/labs", get(handlers::labs))
        .route("/health/liveness", get(liveness))
        .route("/health/readiness", get(readiness))
        .merge(submissions)
        .layer(TraceLayer::new_for_http())
        .with_state(ctx)
}

async fn liveness() -> &'static str {
    "ok"
}

/// Resource status as JSON. A missing template or rule set only degrades
/// the service, so the probe still answers 200.
async fn readiness(State(ctx): State<Arc<AppContext>>) -> impl IntoResponse {
    let status = if ctx.fully_available() { "ready" } else { "degraded" };
    (
        StatusCode::OK,
        Json(serde_json::json!({
            "status": status,
            "resources": ctx.resource_status(),
        })),
    )
}
