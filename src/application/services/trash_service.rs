use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::application::dtos::item_dto::ItemDto;
use crate::application::dtos::trash_dto::{PurgeReportDto, RestoreResultDto};
use crate::application::ports::blob_ports::BlobStorePort;
use crate::application::ports::trash_ports::TrashUseCase;
use crate::application::services::view_mapper;
use crate::common::errors::{DomainError, ErrorKind, Result};
use crate::domain::entities::item::Item;
use crate::domain::repositories::item_repository::{
    ItemOrder, ItemQuery, ItemRepository, TrashFilter,
};

/// Parses an item id coming from the outside world
pub(crate) fn parse_item_id(item_id: &str) -> Result<Uuid> {
    Uuid::parse_str(item_id).map_err(|e| {
        DomainError::validation_error("Item", format!("Invalid item ID: {}", e)).with_id(item_id)
    })
}

fn not_found_in_bin(id: &Uuid) -> DomainError {
    DomainError::new(ErrorKind::NotFound, "Item", "Item not found in bin").with_id(id.to_string())
}

/// Servicio de aplicación para operaciones de papelera.
///
/// Owns the three cascades of the item tree (trash, restore, permanent
/// delete) and the top-level view of the bin. Every cascade walks the tree
/// with an explicit stack, remembers what it has visited and stops at
/// `max_depth`; a corrupted tree aborts with an integrity error.
pub struct TrashService {
    item_repository: Arc<dyn ItemRepository>,
    blob_store: Arc<dyn BlobStorePort>,
    max_depth: usize,
    blob_timeout: Duration,
}

impl TrashService {
    pub fn new(
        item_repository: Arc<dyn ItemRepository>,
        blob_store: Arc<dyn BlobStorePort>,
        max_depth: usize,
        blob_timeout: Duration,
    ) -> Self {
        Self {
            item_repository,
            blob_store,
            max_depth,
            blob_timeout,
        }
    }

    /// Marca un item como eliminado y propaga a todo su subárbol activo.
    /// Returns how many records changed state.
    #[instrument(skip(self))]
    pub async fn trash_tree(&self, id: &Uuid, owner_id: &Uuid) -> Result<usize> {
        let at = Utc::now();

        let root = self
            .item_repository
            .mark_trashed(id, owner_id, at)
            .await?
            .ok_or_else(|| DomainError::not_found("Item", id.to_string()))?;

        let mut changed = 1;
        if !root.is_folder() {
            return Ok(changed);
        }

        let mut visited = HashSet::from([root.id()]);
        let mut stack = vec![(root.id(), 0usize)];

        while let Some((folder_id, depth)) = stack.pop() {
            let children = self
                .item_repository
                .find_children(&folder_id, owner_id, TrashFilter::Exclude)
                .await?;

            for child in children {
                self.visit(&mut visited, &child, depth + 1)?;

                match self.item_repository.mark_trashed(&child.id(), owner_id, at).await? {
                    Some(trashed) => {
                        debug!("Item {} movido a papelera (cascada)", trashed.id());
                        changed += 1;
                        if trashed.is_folder() {
                            stack.push((trashed.id(), depth + 1));
                        }
                    }
                    // Someone else got there first
                    None => debug!("Item {} ya no estaba activo, se omite", child.id()),
                }
            }
        }

        Ok(changed)
    }

    /// Restaura un item y su subárbol. Returns the restored top-level item and
    /// whether it was moved to the root because its parent is still trashed.
    #[instrument(skip(self))]
    pub async fn restore_tree(&self, id: &Uuid, owner_id: &Uuid) -> Result<(Item, bool)> {
        let item = self
            .item_repository
            .find_by_id(id, owner_id, TrashFilter::Only)
            .await?
            .ok_or_else(|| not_found_in_bin(id))?;

        let detach = match item.parent_id() {
            Some(parent_id) => self
                .item_repository
                .find_by_id(&parent_id, owner_id, TrashFilter::Any)
                .await?
                // A vanished parent would leave a dangling pointer
                .map_or(true, |parent| parent.is_trashed()),
            None => false,
        };

        let root = self
            .item_repository
            .mark_restored(id, owner_id, detach)
            .await?
            .ok_or_else(|| not_found_in_bin(id))?;

        if root.is_folder() {
            let mut visited = HashSet::from([root.id()]);
            let mut stack = vec![(root.id(), 0usize)];

            while let Some((folder_id, depth)) = stack.pop() {
                let children = self
                    .item_repository
                    .find_children(&folder_id, owner_id, TrashFilter::Only)
                    .await?;

                for child in children {
                    self.visit(&mut visited, &child, depth + 1)?;

                    // Descendants keep their parent pointers
                    match self.item_repository.mark_restored(&child.id(), owner_id, false).await? {
                        Some(restored) => {
                            debug!("Item {} restaurado (cascada)", restored.id());
                            if restored.is_folder() {
                                stack.push((restored.id(), depth + 1));
                            }
                        }
                        None => debug!("Item {} ya no estaba en la papelera, se omite", child.id()),
                    }
                }
            }
        }

        Ok((root, detach))
    }

    /// Elimina permanentemente un item de la papelera y todo su subárbol
    /// eliminado, liberando los blobs de los archivos.
    ///
    /// Children go before their parents. Blob failures are logged and counted,
    /// never fatal.
    #[instrument(skip(self))]
    pub async fn purge_tree(&self, id: &Uuid, owner_id: &Uuid) -> Result<PurgeReportDto> {
        let root = self
            .item_repository
            .find_by_id(id, owner_id, TrashFilter::Only)
            .await?
            .ok_or_else(|| not_found_in_bin(id))?;

        // Pre-order collection; walking it backwards yields a post-order purge
        let mut doomed = vec![root.clone()];
        if root.is_folder() {
            let mut visited = HashSet::from([root.id()]);
            let mut stack = vec![(root.id(), 0usize)];

            while let Some((folder_id, depth)) = stack.pop() {
                let children = self
                    .item_repository
                    .find_children(&folder_id, owner_id, TrashFilter::Only)
                    .await?;

                for child in children {
                    self.visit(&mut visited, &child, depth + 1)?;
                    if child.is_folder() {
                        stack.push((child.id(), depth + 1));
                    }
                    doomed.push(child);
                }
            }
        }

        let mut report = PurgeReportDto::default();
        for item in doomed.iter().rev() {
            let removed = self
                .item_repository
                .delete_by_id(&item.id(), owner_id, TrashFilter::Only)
                .await?;

            if !removed {
                // Restored or purged concurrently; its blob is not ours to release
                debug!("Item {} ya no estaba en la papelera, se omite", item.id());
                continue;
            }
            report.items_removed += 1;

            if let Some(blob_key) = item.blob_key() {
                if self.release_blob(blob_key).await {
                    report.blobs_released += 1;
                } else {
                    report.blob_failures += 1;
                }
            }
        }

        Ok(report)
    }

    /// Items en la papelera cuyo padre no está también en la papelera,
    /// most recently trashed first
    #[instrument(skip(self))]
    pub async fn root_trash(&self, owner_id: &Uuid) -> Result<Vec<Item>> {
        let query = ItemQuery::for_owner(*owner_id)
            .trash(TrashFilter::Only)
            .order_by(ItemOrder::TrashedDesc);
        let trashed = self.item_repository.find_by_owner(&query).await?;

        let trashed_ids: HashSet<Uuid> = trashed.iter().map(Item::id).collect();

        Ok(trashed
            .into_iter()
            .filter(|item| {
                item.parent_id()
                    .map_or(true, |parent_id| !trashed_ids.contains(&parent_id))
            })
            .collect())
    }

    /// Purges every root of the owner's bin, carrying on past failures
    #[instrument(skip(self))]
    pub async fn purge_all(&self, owner_id: &Uuid) -> Result<PurgeReportDto> {
        let roots = self.root_trash(owner_id).await?;

        let mut total = PurgeReportDto::default();
        for root in roots {
            match self.purge_tree(&root.id(), owner_id).await {
                Ok(report) => total.absorb(report),
                Err(e) => error!("Error al eliminar permanentemente {}: {}", root.id(), e),
            }
        }

        Ok(total)
    }

    /// Records a step of a cascade, failing on revisits and runaway depth
    fn visit(&self, visited: &mut HashSet<Uuid>, item: &Item, depth: usize) -> Result<()> {
        if depth > self.max_depth {
            error!("Profundidad máxima ({}) superada en {}", self.max_depth, item.id());
            return Err(DomainError::integrity_violation(
                "Item",
                format!("Tree deeper than {} levels below item", self.max_depth),
            )
            .with_id(item.id().to_string()));
        }

        if !visited.insert(item.id()) {
            error!("Ciclo detectado en el árbol de items: {}", item.id());
            return Err(DomainError::integrity_violation("Item", "Cycle detected in item tree")
                .with_id(item.id().to_string()));
        }

        Ok(())
    }

    /// Best effort: true when the store acknowledged the deletion in time
    async fn release_blob(&self, blob_key: &str) -> bool {
        match tokio::time::timeout(self.blob_timeout, self.blob_store.delete_object(blob_key)).await
        {
            Ok(Ok(())) => {
                debug!("Blob eliminado: {}", blob_key);
                true
            }
            Ok(Err(e)) => {
                warn!("No se pudo eliminar el blob {}: {}", blob_key, e);
                false
            }
            Err(_) => {
                warn!(
                    "Tiempo agotado eliminando el blob {} ({:?})",
                    blob_key, self.blob_timeout
                );
                false
            }
        }
    }
}

#[async_trait]
impl TrashUseCase for TrashService {
    #[instrument(skip(self))]
    async fn move_to_trash(&self, item_id: &str, owner_id: &Uuid) -> Result<()> {
        info!("Moviendo a papelera: id={}, usuario={}", item_id, owner_id);

        let id = parse_item_id(item_id)?;
        let changed = self.trash_tree(&id, owner_id).await?;

        info!("Item {} en papelera ({} registros)", item_id, changed);
        Ok(())
    }

    #[instrument(skip(self))]
    async fn restore_item(&self, item_id: &str, owner_id: &Uuid) -> Result<RestoreResultDto> {
        info!("Restaurando elemento {} para usuario {}", item_id, owner_id);

        let id = parse_item_id(item_id)?;
        let (item, moved_to_root) = self.restore_tree(&id, owner_id).await?;

        if moved_to_root {
            info!("Item {} restaurado en la raíz (padre en papelera)", item_id);
        }

        Ok(RestoreResultDto {
            item: view_mapper::to_view(&item, owner_id),
            moved_to_root,
        })
    }

    #[instrument(skip(self))]
    async fn delete_permanently(&self, item_id: &str, owner_id: &Uuid) -> Result<PurgeReportDto> {
        info!("Eliminando permanentemente elemento {} para usuario {}", item_id, owner_id);

        let id = parse_item_id(item_id)?;
        let report = self.purge_tree(&id, owner_id).await?;

        info!(
            "Eliminados {} registros, {} blobs liberados, {} fallos",
            report.items_removed, report.blobs_released, report.blob_failures
        );
        Ok(report)
    }

    #[instrument(skip(self))]
    async fn get_trash_items(&self, owner_id: &Uuid) -> Result<Vec<ItemDto>> {
        debug!("Obteniendo elementos en papelera para usuario: {}", owner_id);

        let roots = self.root_trash(owner_id).await?;
        Ok(view_mapper::to_views(&roots, owner_id))
    }

    #[instrument(skip(self))]
    async fn empty_trash(&self, owner_id: &Uuid) -> Result<PurgeReportDto> {
        info!("Vaciando papelera para usuario {}", owner_id);

        let report = self.purge_all(owner_id).await?;

        info!("Papelera vaciada para usuario {}: {} registros", owner_id, report.items_removed);
        Ok(report)
    }
}
