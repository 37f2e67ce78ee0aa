//! Router and shared state.
use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post, put};
use axum::Router;
use tokio::sync::RwLock;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;

use super::handlers;
use crate::gemini::ImageGenerator;
use crate::workflow::WorkflowController;

/// Largest accepted request body; uploads are read fully into memory.
pub const MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

/// The one session this service hosts. The lock is held for the whole of a
/// generation action, so a second action arriving meanwhile is refused.
pub struct AppState<C> {
    pub session: RwLock<WorkflowController<C>>,
}

impl<C: ImageGenerator> AppState<C> {
    pub fn new(controller: WorkflowController<C>) -> Self {
        AppState { session: RwLock::new(controller) }
    }
}

pub fn router<C: ImageGenerator + 'static>(state: Arc<AppState<C>>) -> Router {
    Router::new()
        .route("/", get(handlers::root))
        .route("/session", get(handlers::session::<C>))
        .route("/settings", put(handlers::update_settings::<C>))
        .route("/upload", post(handlers::upload::<C>))
        .route("/consent", post(handlers::consent::<C>))
        .route("/generate/base", post(handlers::generate_base::<C>))
        .route("/generate/confirm", post(handlers::confirm_base::<C>))
        .route("/generate/reroll", post(handlers::reroll_variants::<C>))
        .route("/generate/custom", post(handlers::custom_variants::<C>))
        .route("/export/metadata", get(handlers::export_metadata::<C>))
        .route("/export/base", get(handlers::export_base::<C>))
        .route("/export/variants/:id", get(handlers::export_variant::<C>))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(MAX_UPLOAD_BYTES))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
