use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::{debug, instrument};

use crate::application::dtos::item_dto::{
    BatchCreateItemsDto, BatchUploadRequestDto, CreateItemDto, ListItemsParams, RenameItemDto,
    UploadRequestDto,
};
use crate::common::di::AppState;
use crate::interfaces::api::extractors::ApiJson;
use crate::interfaces::middleware::auth::CurrentUser;

/// Genera una URL firmada para subir un archivo
#[instrument(skip(state, dto))]
pub async fn generate_upload_url(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiJson(dto): ApiJson<UploadRequestDto>,
) -> Response {
    match state.item_service.request_upload(dto, &user.id).await {
        Ok(ticket) => (StatusCode::OK, Json(ticket)).into_response(),
        Err(e) => e.into_response(),
    }
}

#[instrument(skip(state, dto))]
pub async fn generate_upload_urls(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiJson(dto): ApiJson<BatchUploadRequestDto>,
) -> Response {
    match state.item_service.request_upload_batch(dto, &user.id).await {
        Ok(tickets) => {
            debug!("{} URLs de subida generadas", tickets.len());
            (StatusCode::OK, Json(tickets)).into_response()
        }
        Err(e) => e.into_response(),
    }
}

/// Guarda los metadatos de un archivo subido o crea una carpeta
#[instrument(skip(state, dto))]
pub async fn save_metadata(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiJson(dto): ApiJson<CreateItemDto>,
) -> Response {
    match state.item_service.create_item(dto, &user.id).await {
        Ok(item) => (
            StatusCode::CREATED,
            Json(json!({
                "message": "Metadata saved successfully",
                "item": item
            })),
        )
            .into_response(),
        Err(e) => e.into_response(),
    }
}

#[instrument(skip(state, dto))]
pub async fn save_batch_metadata(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiJson(dto): ApiJson<BatchCreateItemsDto>,
) -> Response {
    match state.item_service.create_items(dto, &user.id).await {
        Ok(items) => (
            StatusCode::CREATED,
            Json(json!({
                "message": "Batch metadata saved",
                "count": items.len(),
                "items": items
            })),
        )
            .into_response(),
        Err(e) => e.into_response(),
    }
}

/// Lista una carpeta, la raíz (`parentFolderId=null`) o la papelera de una carpeta
#[instrument(skip(state))]
pub async fn list_items(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(params): Query<ListItemsParams>,
) -> Response {
    let trashed = params.trash.as_deref() == Some("true");

    match state
        .item_service
        .list_items(params.parent_folder_id.as_deref(), trashed, &user.id)
        .await
    {
        Ok(items) => (StatusCode::OK, Json(items)).into_response(),
        Err(e) => e.into_response(),
    }
}

#[instrument(skip(state))]
pub async fn list_recent(State(state): State<AppState>, user: CurrentUser) -> Response {
    match state.item_service.list_recent(&user.id).await {
        Ok(items) => (StatusCode::OK, Json(items)).into_response(),
        Err(e) => e.into_response(),
    }
}

#[instrument(skip(state))]
pub async fn list_starred(State(state): State<AppState>, user: CurrentUser) -> Response {
    match state.item_service.list_starred(&user.id).await {
        Ok(items) => (StatusCode::OK, Json(items)).into_response(),
        Err(e) => e.into_response(),
    }
}

#[instrument(skip(state))]
pub async fn get_item(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> Response {
    match state.item_service.get_item(&id, &user.id).await {
        Ok(item) => (StatusCode::OK, Json(item)).into_response(),
        Err(e) => e.into_response(),
    }
}

#[instrument(skip(state, dto))]
pub async fn rename_item(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
    ApiJson(dto): ApiJson<RenameItemDto>,
) -> Response {
    match state.item_service.rename_item(&id, dto, &user.id).await {
        Ok(item) => (
            StatusCode::OK,
            Json(json!({
                "message": "Item renamed successfully",
                "item": item
            })),
        )
            .into_response(),
        Err(e) => e.into_response(),
    }
}

#[instrument(skip(state))]
pub async fn toggle_star(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> Response {
    match state.item_service.toggle_star(&id, &user.id).await {
        Ok(item) => {
            let message = if item.is_starred { "Item starred" } else { "Item unstarred" };
            (
                StatusCode::OK,
                Json(json!({
                    "message": message,
                    "isStarred": item.is_starred,
                    "item": item
                })),
            )
                .into_response()
        }
        Err(e) => e.into_response(),
    }
}

/// Genera una URL firmada de descarga para un archivo
#[instrument(skip(state))]
pub async fn download_item(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> Response {
    match state.item_service.download_handle(&id, &user.id).await {
        Ok(ticket) => (StatusCode::OK, Json(ticket)).into_response(),
        Err(e) => e.into_response(),
    }
}
