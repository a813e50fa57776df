use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::entities::item::Item;
use crate::domain::repositories::item_repository::{
    ItemQuery, ItemRepository, ItemRepositoryError, ItemRepositoryResult, TrashFilter,
};

/// Repositorio de items en memoria.
///
/// Used when no database is configured and by the tests. Every transition
/// runs under a single write-lock acquisition, so check-and-set is atomic.
#[derive(Default)]
pub struct ItemMemoryRepository {
    items: RwLock<HashMap<Uuid, Item>>,
}

impl ItemMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Número total de registros, de todos los propietarios
    pub async fn len(&self) -> usize {
        self.items.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.items.read().await.is_empty()
    }
}

fn owned_by<'a>(item: Option<&'a Item>, owner_id: &Uuid) -> Option<&'a Item> {
    item.filter(|item| item.is_owned_by(owner_id))
}

#[async_trait]
impl ItemRepository for ItemMemoryRepository {
    async fn create(&self, item: &Item) -> ItemRepositoryResult<()> {
        let mut items = self.items.write().await;
        if items.contains_key(&item.id()) {
            return Err(ItemRepositoryError::AlreadyExists(item.id().to_string()));
        }
        items.insert(item.id(), item.clone());
        Ok(())
    }

    async fn create_many(&self, new_items: &[Item]) -> ItemRepositoryResult<()> {
        let mut items = self.items.write().await;

        // Check everything first so a conflict leaves the map untouched
        for item in new_items {
            if items.contains_key(&item.id()) {
                return Err(ItemRepositoryError::AlreadyExists(item.id().to_string()));
            }
        }
        for item in new_items {
            items.insert(item.id(), item.clone());
        }
        Ok(())
    }

    async fn find_by_id(
        &self,
        id: &Uuid,
        owner_id: &Uuid,
        trash: TrashFilter,
    ) -> ItemRepositoryResult<Option<Item>> {
        let items = self.items.read().await;
        Ok(owned_by(items.get(id), owner_id)
            .filter(|item| trash.admits(item))
            .cloned())
    }

    async fn find_by_owner(&self, query: &ItemQuery) -> ItemRepositoryResult<Vec<Item>> {
        let items = self.items.read().await;

        let mut found: Vec<Item> = items
            .values()
            .filter(|item| query.matches(item))
            .cloned()
            .collect();
        found.sort_by(|a, b| query.order.compare(a, b));

        if let Some(limit) = query.limit {
            found.truncate(limit);
        }
        Ok(found)
    }

    async fn rename(
        &self,
        id: &Uuid,
        owner_id: &Uuid,
        name: &str,
    ) -> ItemRepositoryResult<Option<Item>> {
        let mut items = self.items.write().await;

        let updated = match owned_by(items.get(id), owner_id) {
            Some(item) => item.renamed(name.to_string(), Utc::now()),
            None => return Ok(None),
        };
        items.insert(*id, updated.clone());
        Ok(Some(updated))
    }

    async fn toggle_star(&self, id: &Uuid, owner_id: &Uuid) -> ItemRepositoryResult<Option<Item>> {
        let mut items = self.items.write().await;

        let updated = match owned_by(items.get(id), owner_id) {
            Some(item) => item.with_star_toggled(Utc::now()),
            None => return Ok(None),
        };
        items.insert(*id, updated.clone());
        Ok(Some(updated))
    }

    async fn mark_trashed(
        &self,
        id: &Uuid,
        owner_id: &Uuid,
        at: DateTime<Utc>,
    ) -> ItemRepositoryResult<Option<Item>> {
        let mut items = self.items.write().await;

        let updated = match owned_by(items.get(id), owner_id) {
            Some(item) if !item.is_trashed() => item.trashed(at),
            _ => return Ok(None),
        };
        items.insert(*id, updated.clone());
        Ok(Some(updated))
    }

    async fn mark_restored(
        &self,
        id: &Uuid,
        owner_id: &Uuid,
        detach: bool,
    ) -> ItemRepositoryResult<Option<Item>> {
        let mut items = self.items.write().await;

        let updated = match owned_by(items.get(id), owner_id) {
            Some(item) if item.is_trashed() => item.restored(detach, Utc::now()),
            _ => return Ok(None),
        };
        items.insert(*id, updated.clone());
        Ok(Some(updated))
    }

    async fn delete_by_id(
        &self,
        id: &Uuid,
        owner_id: &Uuid,
        trash: TrashFilter,
    ) -> ItemRepositoryResult<bool> {
        let mut items = self.items.write().await;

        let removable = owned_by(items.get(id), owner_id).map_or(false, |item| trash.admits(item));
        if removable {
            items.remove(id);
        }
        Ok(removable)
    }

    async fn find_trashed_before(&self, cutoff: DateTime<Utc>) -> ItemRepositoryResult<Vec<Item>> {
        let items = self.items.read().await;
        Ok(items
            .values()
            .filter(|item| item.trashed_at().map_or(false, |at| at <= cutoff))
            .cloned()
            .collect())
    }
}
