//! Open tracking. Mail clients fetch the pixel without credentials, so this
//! route is public and never answers with an error.

use axum::{
    Router,
    extract::{Path, State},
    http::header,
    response::IntoResponse,
    routing::get,
};
use deployment::Deployment;
use tracing::warn;
use uuid::Uuid;

use crate::DeploymentImpl;

/// 1x1 transparent GIF
pub static PIXEL_GIF: [u8; 43] = [
    0x47, 0x49, 0x46, 0x38, 0x39, 0x61, 0x01, 0x00, 0x01, 0x00, 0x80, 0x00, 0x00, 0x00, 0x00,
    0x00, 0xff, 0xff, 0xff, 0x21, 0xf9, 0x04, 0x01, 0x00, 0x00, 0x00, 0x00, 0x2c, 0x00, 0x00,
    0x00, 0x00, 0x01, 0x00, 0x01, 0x00, 0x00, 0x02, 0x02, 0x44, 0x01, 0x00, 0x3b,
];

/// GET /api/track/open/{id}
pub async fn track_open(
    State(deployment): State<DeploymentImpl>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    match Uuid::parse_str(&id) {
        Ok(id) => {
            if let Err(e) = deployment.followups().mark_opened(id).await {
                warn!(followup_id = %id, error = %e, "Failed to record open");
            }
        }
        Err(_) => warn!(id = %id, "Open pixel requested with malformed id"),
    }

    (
        [
            (header::CONTENT_TYPE, "image/gif"),
            (header::CACHE_CONTROL, "no-store, max-age=0"),
        ],
        &PIXEL_GIF[..],
    )
}

pub fn router(_deployment: &DeploymentImpl) -> Router<DeploymentImpl> {
    Router::new().route("/track/open/{id}", get(track_open))
}
