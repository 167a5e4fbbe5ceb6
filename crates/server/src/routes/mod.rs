use axum::Router;
use tower_http::trace::TraceLayer;

use crate::DeploymentImpl;

pub mod analytics;
pub mod clients;
pub mod emails;
pub mod followups;
pub mod health;
pub mod profile;
pub mod tracking;

pub fn router(deployment: DeploymentImpl) -> Router {
    let base_routes = Router::new()
        .merge(health::router(&deployment))
        .merge(clients::router(&deployment))
        .merge(followups::router(&deployment))
        .merge(emails::router(&deployment))
        .merge(analytics::router(&deployment))
        .merge(profile::router(&deployment))
        .merge(tracking::router(&deployment))
        .with_state(deployment);

    Router::new()
        .nest("/api", base_routes)
        .layer(TraceLayer::new_for_http())
}
