use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::entities::item::ItemKind;
use crate::domain::services::classification_service::Category;

/// Lifecycle marker shown next to an item. Trashed wins over starred.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MutationState {
    Nothing,
    Starred,
    Trashed,
}

impl MutationState {
    /// Numeric code understood by the front end
    pub fn code(&self) -> u8 {
        match self {
            MutationState::Nothing => 0,
            MutationState::Starred => 1,
            MutationState::Trashed => 2,
        }
    }
}

/// DTO for item responses, already shaped for display
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemDto {
    pub id: Uuid,
    pub name: String,
    pub kind: ItemKind,
    pub category: Category,
    pub category_code: u8,
    /// "me" or "Shared"
    pub owner: String,
    pub is_owner: bool,
    pub is_starred: bool,
    pub is_trashed: bool,
    pub modified_date: String,
    pub modified_time: String,
    pub size: String,
    pub source: String,
    pub deleted_date: Option<DateTime<Utc>>,
    pub mutation_state: MutationState,
    pub mutation_code: u8,
    pub parent_id: Option<Uuid>,
    pub updated_at: DateTime<Utc>,
    pub file_type: Option<String>,
}

/// DTO for metadata creation requests (after an upload or for a new folder)
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateItemDto {
    #[serde(default)]
    pub name: Option<String>,

    /// "file" or "folder"
    #[serde(default, rename = "type")]
    pub kind: Option<String>,

    /// Blob key returned by the upload handle; required for files
    #[serde(default)]
    pub file_key: Option<String>,

    /// MIME type reported by the client
    #[serde(default)]
    pub file_type: Option<String>,

    #[serde(default)]
    pub size: Option<u64>,

    /// Parent folder ID (None for root level)
    #[serde(default)]
    pub parent_folder_id: Option<Uuid>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BatchCreateItemsDto {
    #[serde(default)]
    pub items: Option<Vec<CreateItemDto>>,
}

/// DTO for rename requests
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RenameItemDto {
    #[serde(default)]
    pub name: Option<String>,
}

/// Query string of the folder listing
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListItemsParams {
    /// Folder id, or absent / "null" for the root
    #[serde(default)]
    pub parent_folder_id: Option<String>,

    /// "true" lists the trashed children instead
    #[serde(default)]
    pub trash: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadRequestDto {
    #[serde(default)]
    pub file_name: Option<String>,
    #[serde(default)]
    pub file_type: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchUploadFileDto {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, rename = "type")]
    pub content_type: Option<String>,
    /// Opaque id the client uses to match answers to its own rows
    #[serde(default)]
    pub temp_id: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BatchUploadRequestDto {
    #[serde(default)]
    pub files: Option<Vec<BatchUploadFileDto>>,
}

/// Where to PUT the bytes, and the key to send back with the metadata
#[derive(Debug, Clone, Serialize)]
pub struct UploadTicketDto {
    #[serde(rename = "uploadURL")]
    pub upload_url: String,
    #[serde(rename = "fileKey")]
    pub file_key: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchUploadTicketDto {
    #[serde(rename = "tempId")]
    pub temp_id: Option<String>,
    pub name: String,
    #[serde(rename = "uploadURL")]
    pub upload_url: String,
    #[serde(rename = "fileKey")]
    pub file_key: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct DownloadTicketDto {
    #[serde(rename = "downloadURL")]
    pub download_url: String,
    #[serde(rename = "fileName")]
    pub file_name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_item_accepts_wire_names() {
        let parent = Uuid::new_v4();
        let body = serde_json::json!({
            "name": "report.pdf",
            "type": "file",
            "fileKey": "uploads/1-report.pdf",
            "fileType": "application/pdf",
            "size": 1024,
            "parentFolderId": parent,
        });

        let dto: CreateItemDto = serde_json::from_value(body).unwrap();
        assert_eq!(dto.kind.as_deref(), Some("file"));
        assert_eq!(dto.file_key.as_deref(), Some("uploads/1-report.pdf"));
        assert_eq!(dto.parent_folder_id, Some(parent));
    }

    #[test]
    fn test_ticket_uses_wire_names() {
        let ticket = UploadTicketDto {
            upload_url: "https://blob/put".to_string(),
            file_key: "uploads/1-a".to_string(),
        };
        let value = serde_json::to_value(&ticket).unwrap();
        assert_eq!(value["uploadURL"], "https://blob/put");
        assert_eq!(value["fileKey"], "uploads/1-a");
    }
}
