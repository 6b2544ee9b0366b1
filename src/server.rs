//! status server: the display frame for headless hosts.
//!
//!     GET /     last frame as plain text
//!     GET /api  {"frame": {"lines": [...], "rendered_at": n} | null}
//!
//! reads a snapshot only; the scheduler remains the single writer.

use anyhow::Result;
use axum::{extract::State, response::Json, routing::get, Router};
use tower_http::cors::CorsLayer;

use crate::display::{Frame, SharedFrame};

pub fn router(frame: SharedFrame) -> Router {
    Router::new()
        .route("/", get(frame_handler))
        .route("/api", get(api_handler))
        .layer(CorsLayer::permissive())
        .with_state(frame)
}

pub async fn serve(frame: SharedFrame, port: u16) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
    axum::serve(listener, router(frame)).await?;
    Ok(())
}

async fn frame_handler(State(frame): State<SharedFrame>) -> String {
    frame
        .latest()
        .map(|f| f.text())
        .unwrap_or_else(|| "(no frame rendered yet)".to_string())
}

#[derive(serde::Serialize)]
struct StatusResponse {
    frame: Option<Frame>,
}

async fn api_handler(State(frame): State<SharedFrame>) -> Json<StatusResponse> {
    Json(StatusResponse { frame: frame.latest() })
}
