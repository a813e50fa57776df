use async_trait::async_trait;
use uuid::Uuid;

use crate::application::dtos::item_dto::ItemDto;
use crate::application::dtos::trash_dto::{PurgeReportDto, RestoreResultDto};
use crate::common::errors::Result;

/// Port for trash-related use cases
#[async_trait]
pub trait TrashUseCase: Send + Sync + 'static {
    /// Move an item, and everything below it, to the bin
    async fn move_to_trash(&self, item_id: &str, owner_id: &Uuid) -> Result<()>;

    /// Bring an item, and everything below it, back from the bin
    async fn restore_item(&self, item_id: &str, owner_id: &Uuid) -> Result<RestoreResultDto>;

    /// Permanently delete a trashed item and its subtree, releasing blobs
    async fn delete_permanently(&self, item_id: &str, owner_id: &Uuid) -> Result<PurgeReportDto>;

    /// Top-level view of the bin: trashed items whose parent is not also trashed
    async fn get_trash_items(&self, owner_id: &Uuid) -> Result<Vec<ItemDto>>;

    /// Empty the bin of one owner
    async fn empty_trash(&self, owner_id: &Uuid) -> Result<PurgeReportDto>;
}
