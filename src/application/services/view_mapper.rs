use uuid::Uuid;

use crate::application::dtos::item_dto::{ItemDto, MutationState};
use crate::domain::entities::item::Item;
use crate::domain::services::classification_service::classify;

const OWNER_SELF: &str = "me";
const OWNER_OTHER: &str = "Shared";

/// Builds the display model of an item as seen by `requester_id`.
///
/// Pure: the item is only read.
pub fn to_view(item: &Item, requester_id: &Uuid) -> ItemDto {
    let is_owner = item.is_owned_by(requester_id);
    let category = classify(item.kind(), item.mime_hint(), !is_owner);

    let mutation_state = if item.is_trashed() {
        MutationState::Trashed
    } else if item.is_starred() {
        MutationState::Starred
    } else {
        MutationState::Nothing
    };

    let updated_at = item.updated_at();

    ItemDto {
        id: item.id(),
        name: item.name().to_string(),
        kind: item.kind(),
        category,
        category_code: category.code(),
        owner: if is_owner { OWNER_SELF } else { OWNER_OTHER }.to_string(),
        is_owner,
        is_starred: item.is_starred(),
        is_trashed: item.is_trashed(),
        modified_date: updated_at.format("%-d %b %Y").to_string(),
        modified_time: updated_at.format("%H:%M").to_string(),
        size: format_size(item.size_bytes()),
        source: source_label(item, is_owner).to_string(),
        deleted_date: item.trashed_at(),
        mutation_state,
        mutation_code: mutation_state.code(),
        parent_id: item.parent_id(),
        updated_at,
        file_type: item.mime_hint().map(str::to_string),
    }
}

pub fn to_views(items: &[Item], requester_id: &Uuid) -> Vec<ItemDto> {
    items.iter().map(|item| to_view(item, requester_id)).collect()
}

/// Whole kilobytes, "--" when unknown or empty
fn format_size(size_bytes: Option<u64>) -> String {
    match size_bytes {
        Some(bytes) if bytes > 0 => format!("{} KB", (bytes as f64 / 1024.0).round() as u64),
        _ => "--".to_string(),
    }
}

fn source_label(item: &Item, is_owner: bool) -> &'static str {
    if !is_owner {
        "Shared with me"
    } else if item.parent_id().is_some() {
        "Folder"
    } else {
        "My Drive"
    }
}
