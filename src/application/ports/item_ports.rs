use async_trait::async_trait;
use uuid::Uuid;

use crate::application::dtos::item_dto::{
    BatchCreateItemsDto, BatchUploadRequestDto, BatchUploadTicketDto, CreateItemDto,
    DownloadTicketDto, ItemDto, RenameItemDto, UploadRequestDto, UploadTicketDto,
};
use crate::common::errors::Result;

/// Port for the everyday item use cases: uploads, metadata, listings
#[async_trait]
pub trait ItemUseCase: Send + Sync + 'static {
    /// Issues an upload URL and the blob key the metadata must reference
    async fn request_upload(&self, dto: UploadRequestDto, owner_id: &Uuid) -> Result<UploadTicketDto>;

    /// Same as `request_upload` for several files at once
    async fn request_upload_batch(
        &self,
        dto: BatchUploadRequestDto,
        owner_id: &Uuid,
    ) -> Result<Vec<BatchUploadTicketDto>>;

    /// Saves the metadata of an uploaded file or creates a folder
    async fn create_item(&self, dto: CreateItemDto, owner_id: &Uuid) -> Result<ItemDto>;

    /// Saves several items, all or nothing
    async fn create_items(&self, dto: BatchCreateItemsDto, owner_id: &Uuid) -> Result<Vec<ItemDto>>;

    /// Lists a folder (or the root when `parent_id` is None)
    async fn list_items(
        &self,
        parent_id: Option<&str>,
        trashed: bool,
        owner_id: &Uuid,
    ) -> Result<Vec<ItemDto>>;

    async fn list_recent(&self, owner_id: &Uuid) -> Result<Vec<ItemDto>>;

    async fn list_starred(&self, owner_id: &Uuid) -> Result<Vec<ItemDto>>;

    async fn get_item(&self, item_id: &str, owner_id: &Uuid) -> Result<ItemDto>;

    async fn rename_item(&self, item_id: &str, dto: RenameItemDto, owner_id: &Uuid) -> Result<ItemDto>;

    async fn toggle_star(&self, item_id: &str, owner_id: &Uuid) -> Result<ItemDto>;

    /// Issues a download URL for a file
    async fn download_handle(&self, item_id: &str, owner_id: &Uuid) -> Result<DownloadTicketDto>;
}
