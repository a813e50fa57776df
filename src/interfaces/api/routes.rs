use axum::{
    middleware,
    routing::{get, post, put},
    Json, Router,
};
use serde_json::json;
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};

use crate::common::di::AppState;
use crate::interfaces::api::handlers::{item_handler, trash_handler};
use crate::interfaces::middleware::auth::auth_middleware;

/// Rutas de `/api/items`, todas detrás del middleware de autenticación
pub fn create_item_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(item_handler::list_items))
        .route("/generate-upload-url", post(item_handler::generate_upload_url))
        .route("/metadata", post(item_handler::save_metadata))
        .route(
            "/batch/generate-upload-urls",
            post(item_handler::generate_upload_urls),
        )
        .route("/batch/metadata", post(item_handler::save_batch_metadata))
        .route("/recent", get(item_handler::list_recent))
        .route("/starred", get(item_handler::list_starred))
        .route(
            "/trash",
            get(trash_handler::get_trash_items).delete(trash_handler::empty_trash),
        )
        .route(
            "/{id}",
            get(item_handler::get_item).delete(trash_handler::delete_permanently),
        )
        .route("/{id}/download", get(item_handler::download_item))
        .route("/{id}/rename", put(item_handler::rename_item))
        .route("/{id}/trash", put(trash_handler::move_to_trash))
        .route("/{id}/restore", put(trash_handler::restore_from_trash))
        .route("/{id}/star", put(item_handler::toggle_star))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// Router completo de la aplicación
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { Json(json!({ "status": "ok" })) }))
        .nest("/api/items", create_item_routes(state.clone()))
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
