use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use futures::future::try_join_all;
use rand::distributions::Alphanumeric;
use rand::Rng;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::application::dtos::item_dto::{
    BatchCreateItemsDto, BatchUploadRequestDto, BatchUploadTicketDto, CreateItemDto,
    DownloadTicketDto, ItemDto, RenameItemDto, UploadRequestDto, UploadTicketDto,
};
use crate::application::ports::blob_ports::BlobStorePort;
use crate::application::ports::item_ports::ItemUseCase;
use crate::application::services::trash_service::parse_item_id;
use crate::application::services::view_mapper;
use crate::common::errors::{DomainError, Result};
use crate::domain::entities::item::{validate_name, FileContent, Item, ItemError, ItemKind};
use crate::domain::repositories::item_repository::{
    ItemOrder, ItemQuery, ItemRepository, TrashFilter,
};

/// Blob keys live under this prefix
const UPLOAD_PREFIX: &str = "uploads";

/// Length of the random segment that keeps batch keys apart
const BATCH_KEY_SEGMENT_LEN: usize = 7;

/// Replaces every run of whitespace with a single underscore
fn key_safe_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut in_run = false;
    for c in name.chars() {
        if c.is_whitespace() {
            if !in_run {
                out.push('_');
            }
            in_run = true;
        } else {
            out.push(c);
            in_run = false;
        }
    }
    out
}

/// `uploads/{millis}-{name}` or, with a segment, `uploads/{millis}-{segment}-{name}`
fn compose_blob_key(file_name: &str, segment: Option<&str>) -> String {
    let millis = Utc::now().timestamp_millis();
    match segment {
        Some(segment) => format!(
            "{}/{}-{}-{}",
            UPLOAD_PREFIX,
            millis,
            segment,
            key_safe_name(file_name)
        ),
        None => format!("{}/{}-{}", UPLOAD_PREFIX, millis, key_safe_name(file_name)),
    }
}

fn random_segment() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(BATCH_KEY_SEGMENT_LEN)
        .map(char::from)
        .collect::<String>()
        .to_ascii_lowercase()
}

/// Non-blank trimmed value of an optional field
fn required(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Builds the entity described by a creation request, without touching storage
fn item_from_dto(dto: &CreateItemDto, owner_id: &Uuid) -> Result<Item> {
    let name = required(&dto.name).ok_or(ItemError::EmptyName)?;

    let kind = required(&dto.kind)
        .and_then(ItemKind::parse)
        .ok_or_else(|| DomainError::validation_error("Item", "Type must be 'file' or 'folder'"))?;

    let item = match kind {
        ItemKind::Folder => Item::new_folder(*owner_id, name, dto.parent_folder_id)?,
        ItemKind::File => {
            let blob_key = required(&dto.file_key).ok_or(ItemError::MissingBlobKey)?;
            // Fall back to the extension when the client did not say
            let mime_hint = required(&dto.file_type).map(str::to_string).or_else(|| {
                mime_guess::from_path(name)
                    .first()
                    .map(|mime| mime.essence_str().to_string())
            });
            let content = FileContent::new(blob_key.to_string(), mime_hint, dto.size)?;
            Item::new_file(*owner_id, name, content, dto.parent_folder_id)?
        }
    };

    Ok(item)
}

/// Servicio de aplicación para los items: subidas, metadatos y listados
pub struct ItemService {
    item_repository: Arc<dyn ItemRepository>,
    blob_store: Arc<dyn BlobStorePort>,
    recent_limit: usize,
    max_batch_size: usize,
    blob_timeout: Duration,
}

impl ItemService {
    pub fn new(
        item_repository: Arc<dyn ItemRepository>,
        blob_store: Arc<dyn BlobStorePort>,
        recent_limit: usize,
        max_batch_size: usize,
        blob_timeout: Duration,
    ) -> Self {
        Self {
            item_repository,
            blob_store,
            recent_limit,
            max_batch_size,
            blob_timeout,
        }
    }

    /// Runs a blob store call under the configured timeout
    async fn bounded<T, F>(&self, operation: &str, call: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        match tokio::time::timeout(self.blob_timeout, call).await {
            Ok(result) => result,
            Err(_) => {
                warn!("Tiempo agotado en el almacén de blobs: {}", operation);
                Err(DomainError::timeout(
                    "BlobStore",
                    format!("Blob store did not answer in time ({})", operation),
                ))
            }
        }
    }

    /// The parent of a new item must be an active folder of the same owner
    async fn check_parent(&self, parent_id: &Uuid, owner_id: &Uuid) -> Result<()> {
        let parent = self
            .item_repository
            .find_by_id(parent_id, owner_id, TrashFilter::Exclude)
            .await?
            .ok_or_else(|| {
                DomainError::not_found("Item", parent_id.to_string())
            })?;

        if !parent.is_folder() {
            return Err(DomainError::validation_error("Item", "Parent must be a folder")
                .with_id(parent_id.to_string()));
        }
        Ok(())
    }

    async fn list(&self, query: ItemQuery, owner_id: &Uuid) -> Result<Vec<ItemDto>> {
        let items = self.item_repository.find_by_owner(&query).await?;
        Ok(view_mapper::to_views(&items, owner_id))
    }
}

#[async_trait]
impl ItemUseCase for ItemService {
    #[instrument(skip(self, dto))]
    async fn request_upload(&self, dto: UploadRequestDto, owner_id: &Uuid) -> Result<UploadTicketDto> {
        let (file_name, file_type) = match (required(&dto.file_name), required(&dto.file_type)) {
            (Some(name), Some(content_type)) => (name, content_type),
            _ => {
                return Err(DomainError::validation_error(
                    "Upload",
                    "File name and type are required",
                ))
            }
        };

        let file_key = compose_blob_key(file_name, None);
        let upload_url = self
            .bounded("upload handle", self.blob_store.issue_upload_handle(&file_key, file_type))
            .await?;

        debug!("URL de subida emitida para {}", file_key);
        Ok(UploadTicketDto {
            upload_url,
            file_key,
        })
    }

    #[instrument(skip(self, dto))]
    async fn request_upload_batch(
        &self,
        dto: BatchUploadRequestDto,
        owner_id: &Uuid,
    ) -> Result<Vec<BatchUploadTicketDto>> {
        let files = dto.files.unwrap_or_default();
        if files.is_empty() {
            return Err(DomainError::validation_error("Upload", "Files array is required"));
        }
        if files.len() > self.max_batch_size {
            return Err(DomainError::validation_error(
                "Upload",
                format!("Maximum {} files per batch", self.max_batch_size),
            ));
        }

        // Validate every entry before issuing anything
        let mut pending = Vec::with_capacity(files.len());
        for file in &files {
            match (required(&file.name), required(&file.content_type)) {
                (Some(name), Some(content_type)) => pending.push((
                    file.temp_id.clone(),
                    name.to_string(),
                    content_type.to_string(),
                    compose_blob_key(name, Some(&random_segment())),
                )),
                _ => {
                    return Err(DomainError::validation_error(
                        "Upload",
                        "Each file needs a name and a type",
                    ))
                }
            }
        }

        let tickets = try_join_all(pending.into_iter().map(
            move |(temp_id, name, content_type, file_key)| async move {
                let upload_url = self
                    .bounded(
                        "upload handle",
                        self.blob_store.issue_upload_handle(&file_key, &content_type),
                    )
                    .await?;
                Ok::<_, DomainError>(BatchUploadTicketDto {
                    temp_id,
                    name,
                    upload_url,
                    file_key,
                })
            },
        ))
        .await?;

        info!("{} URLs de subida emitidas", tickets.len());
        Ok(tickets)
    }

    #[instrument(skip(self, dto))]
    async fn create_item(&self, dto: CreateItemDto, owner_id: &Uuid) -> Result<ItemDto> {
        let item = item_from_dto(&dto, owner_id)?;

        if let Some(parent_id) = item.parent_id() {
            self.check_parent(&parent_id, owner_id).await?;
        }

        self.item_repository.create(&item).await?;

        info!("Item creado: {} ({}) id={}", item.name(), item.kind().as_str(), item.id());
        Ok(view_mapper::to_view(&item, owner_id))
    }

    #[instrument(skip(self, dto))]
    async fn create_items(&self, dto: BatchCreateItemsDto, owner_id: &Uuid) -> Result<Vec<ItemDto>> {
        let entries = dto.items.unwrap_or_default();
        if entries.is_empty() {
            return Err(DomainError::validation_error("Item", "Items array is required"));
        }
        if entries.len() > self.max_batch_size {
            return Err(DomainError::validation_error(
                "Item",
                format!("Maximum {} items per batch", self.max_batch_size),
            ));
        }

        let items = entries
            .iter()
            .map(|entry| item_from_dto(entry, owner_id))
            .collect::<Result<Vec<_>>>()?;

        let parents: HashSet<Uuid> = items.iter().filter_map(Item::parent_id).collect();
        for parent_id in &parents {
            self.check_parent(parent_id, owner_id).await?;
        }

        self.item_repository.create_many(&items).await?;

        info!("{} items creados en lote", items.len());
        Ok(view_mapper::to_views(&items, owner_id))
    }

    #[instrument(skip(self))]
    async fn list_items(
        &self,
        parent_id: Option<&str>,
        trashed: bool,
        owner_id: &Uuid,
    ) -> Result<Vec<ItemDto>> {
        // The front end sends the literal "null" for the root
        let parent = match parent_id.map(str::trim) {
            None | Some("") | Some("null") => None,
            Some(raw) => Some(parse_item_id(raw)?),
        };
        let trash = if trashed {
            TrashFilter::Only
        } else {
            TrashFilter::Exclude
        };

        let query = ItemQuery::for_owner(*owner_id).in_parent(parent).trash(trash);
        self.list(query, owner_id).await
    }

    #[instrument(skip(self))]
    async fn list_recent(&self, owner_id: &Uuid) -> Result<Vec<ItemDto>> {
        let query = ItemQuery::for_owner(*owner_id)
            .kind(ItemKind::File)
            .order_by(ItemOrder::UpdatedDesc)
            .limit(self.recent_limit);
        self.list(query, owner_id).await
    }

    #[instrument(skip(self))]
    async fn list_starred(&self, owner_id: &Uuid) -> Result<Vec<ItemDto>> {
        let query = ItemQuery::for_owner(*owner_id)
            .starred(true)
            .order_by(ItemOrder::UpdatedDesc);
        self.list(query, owner_id).await
    }

    #[instrument(skip(self))]
    async fn get_item(&self, item_id: &str, owner_id: &Uuid) -> Result<ItemDto> {
        let id = parse_item_id(item_id)?;
        let item = self
            .item_repository
            .find_by_id(&id, owner_id, TrashFilter::Exclude)
            .await?
            .ok_or_else(|| DomainError::not_found("Item", item_id))?;

        Ok(view_mapper::to_view(&item, owner_id))
    }

    #[instrument(skip(self, dto))]
    async fn rename_item(&self, item_id: &str, dto: RenameItemDto, owner_id: &Uuid) -> Result<ItemDto> {
        let id = parse_item_id(item_id)?;
        let new_name = validate_name(&dto.name.unwrap_or_default())?;

        // Trashed items may be renamed too
        let renamed = self
            .item_repository
            .rename(&id, owner_id, &new_name)
            .await?
            .ok_or_else(|| DomainError::not_found("Item", item_id))?;

        info!("Item {} renombrado a {}", item_id, renamed.name());
        Ok(view_mapper::to_view(&renamed, owner_id))
    }

    #[instrument(skip(self))]
    async fn toggle_star(&self, item_id: &str, owner_id: &Uuid) -> Result<ItemDto> {
        let id = parse_item_id(item_id)?;
        let toggled = self
            .item_repository
            .toggle_star(&id, owner_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Item", item_id))?;

        debug!("Item {} destacado={}", item_id, toggled.is_starred());
        Ok(view_mapper::to_view(&toggled, owner_id))
    }

    #[instrument(skip(self))]
    async fn download_handle(&self, item_id: &str, owner_id: &Uuid) -> Result<DownloadTicketDto> {
        let id = parse_item_id(item_id)?;
        let item = self
            .item_repository
            .find_by_id(&id, owner_id, TrashFilter::Exclude)
            .await?
            .ok_or_else(|| DomainError::not_found("Item", item_id))?;

        let blob_key = item.blob_key().ok_or_else(|| {
            DomainError::validation_error("Item", "Cannot download a folder directly")
                .with_id(item_id)
        })?;

        let download_url = self
            .bounded(
                "download handle",
                self.blob_store.issue_download_handle(blob_key, item.name()),
            )
            .await?;

        Ok(DownloadTicketDto {
            download_url,
            file_name: item.name().to_string(),
        })
    }
}
