use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::{debug, info, instrument};

use crate::common::di::AppState;
use crate::interfaces::middleware::auth::CurrentUser;

/// Obtiene los elementos de primer nivel de la papelera del usuario actual
#[instrument(skip(state))]
pub async fn get_trash_items(State(state): State<AppState>, user: CurrentUser) -> Response {
    match state.trash_service.get_trash_items(&user.id).await {
        Ok(items) => {
            debug!("Encontrados {} elementos en la papelera", items.len());
            (StatusCode::OK, Json(items)).into_response()
        }
        Err(e) => e.into_response(),
    }
}

/// Mueve un elemento (archivo o carpeta) a la papelera
#[instrument(skip(state))]
pub async fn move_to_trash(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> Response {
    match state.trash_service.move_to_trash(&id, &user.id).await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({ "message": "Item moved to bin successfully" })),
        )
            .into_response(),
        Err(e) => e.into_response(),
    }
}

/// Restaura un elemento desde la papelera
#[instrument(skip(state))]
pub async fn restore_from_trash(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> Response {
    match state.trash_service.restore_item(&id, &user.id).await {
        Ok(result) => (
            StatusCode::OK,
            Json(json!({
                "message": result.message(),
                "movedToRoot": result.moved_to_root,
                "item": result.item
            })),
        )
            .into_response(),
        Err(e) => e.into_response(),
    }
}

/// Elimina un elemento de la papelera de forma permanente
#[instrument(skip(state))]
pub async fn delete_permanently(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> Response {
    match state.trash_service.delete_permanently(&id, &user.id).await {
        Ok(report) => (
            StatusCode::OK,
            Json(json!({
                "message": "Item permanently deleted",
                "itemsRemoved": report.items_removed,
                "blobsReleased": report.blobs_released,
                "blobFailures": report.blob_failures
            })),
        )
            .into_response(),
        Err(e) => e.into_response(),
    }
}

/// Vacía la papelera del usuario actual
#[instrument(skip(state))]
pub async fn empty_trash(State(state): State<AppState>, user: CurrentUser) -> Response {
    match state.trash_service.empty_trash(&user.id).await {
        Ok(report) => {
            info!("Papelera vaciada: {} elementos", report.items_removed);
            (
                StatusCode::OK,
                Json(json!({
                    "message": "Trash emptied successfully",
                    "itemsRemoved": report.items_removed,
                    "blobsReleased": report.blobs_released,
                    "blobFailures": report.blob_failures
                })),
            )
                .into_response()
        }
        Err(e) => e.into_response(),
    }
}
