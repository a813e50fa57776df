use serde::Serialize;

use crate::application::dtos::item_dto::ItemDto;

/// Result of restoring an item from the bin
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RestoreResultDto {
    pub item: ItemDto,
    /// True when the parent was still in the bin and the item went to the root
    pub moved_to_root: bool,
}

impl RestoreResultDto {
    pub fn message(&self) -> &'static str {
        if self.moved_to_root {
            "Item restored to My Drive (parent folder was in trash)"
        } else {
            "Item restored successfully"
        }
    }
}

/// What a permanent deletion did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PurgeReportDto {
    /// Metadata records removed
    pub items_removed: usize,
    /// Blob deletions the store acknowledged
    pub blobs_released: usize,
    /// Blob deletions that failed or timed out; their records are gone anyway
    pub blob_failures: usize,
}

impl PurgeReportDto {
    pub fn absorb(&mut self, other: PurgeReportDto) {
        self.items_removed += other.items_removed;
        self.blobs_released += other.blobs_released;
        self.blob_failures += other.blob_failures;
    }
}
