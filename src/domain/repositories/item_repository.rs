use std::cmp::Ordering;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::common::errors::DomainError;
use crate::domain::entities::item::{Item, ItemKind};

/// Error types for item repository operations
#[derive(Debug, thiserror::Error)]
pub enum ItemRepositoryError {
    #[error("Item already exists: {0}")]
    AlreadyExists(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Corrupted record: {0}")]
    CorruptedRecord(String),
}

/// Result type for item repository operations
pub type ItemRepositoryResult<T> = Result<T, ItemRepositoryError>;

impl From<ItemRepositoryError> for DomainError {
    fn from(err: ItemRepositoryError) -> Self {
        match err {
            ItemRepositoryError::AlreadyExists(msg) => {
                DomainError::validation_error("Item", format!("Item already exists: {}", msg))
            }
            ItemRepositoryError::DatabaseError(msg) => DomainError::internal_error("Database", msg),
            ItemRepositoryError::CorruptedRecord(msg) => {
                DomainError::integrity_violation("Item", msg)
            }
        }
    }
}

/// Which items a query may see according to their trash state.
///
/// Every repository call takes one of these explicitly. The default hides
/// trashed items, so normal listings cannot leak the bin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrashFilter {
    #[default]
    Exclude,
    Only,
    Any,
}

impl TrashFilter {
    pub fn admits(&self, item: &Item) -> bool {
        match self {
            TrashFilter::Exclude => !item.is_trashed(),
            TrashFilter::Only => item.is_trashed(),
            TrashFilter::Any => true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParentFilter {
    #[default]
    Any,
    Root,
    Folder(Uuid),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ItemOrder {
    /// Folders first, then by name
    #[default]
    KindThenName,
    UpdatedDesc,
    TrashedDesc,
}

impl ItemOrder {
    pub fn compare(&self, a: &Item, b: &Item) -> Ordering {
        match self {
            ItemOrder::KindThenName => b
                .is_folder()
                .cmp(&a.is_folder())
                .then_with(|| a.name().cmp(b.name())),
            ItemOrder::UpdatedDesc => b
                .updated_at()
                .cmp(&a.updated_at())
                .then_with(|| a.id().cmp(&b.id())),
            ItemOrder::TrashedDesc => b
                .trashed_at()
                .cmp(&a.trashed_at())
                .then_with(|| a.id().cmp(&b.id())),
        }
    }
}

/// Owner-scoped listing query.
///
/// Built with `ItemQuery::for_owner(..)` and refined with the builder methods;
/// anything not set keeps its default, including the trash filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemQuery {
    pub owner_id: Uuid,
    pub parent: ParentFilter,
    pub trash: TrashFilter,
    pub starred: Option<bool>,
    pub kind: Option<ItemKind>,
    pub order: ItemOrder,
    pub limit: Option<usize>,
}

impl ItemQuery {
    pub fn for_owner(owner_id: Uuid) -> Self {
        Self {
            owner_id,
            parent: ParentFilter::default(),
            trash: TrashFilter::default(),
            starred: None,
            kind: None,
            order: ItemOrder::default(),
            limit: None,
        }
    }

    /// `None` selects the root
    pub fn in_parent(mut self, parent_id: Option<Uuid>) -> Self {
        self.parent = match parent_id {
            Some(id) => ParentFilter::Folder(id),
            None => ParentFilter::Root,
        };
        self
    }

    pub fn trash(mut self, filter: TrashFilter) -> Self {
        self.trash = filter;
        self
    }

    pub fn starred(mut self, starred: bool) -> Self {
        self.starred = Some(starred);
        self
    }

    pub fn kind(mut self, kind: ItemKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn order_by(mut self, order: ItemOrder) -> Self {
        self.order = order;
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Single place where every filter of the query is evaluated against an item
    pub fn matches(&self, item: &Item) -> bool {
        if !item.is_owned_by(&self.owner_id) || !self.trash.admits(item) {
            return false;
        }

        let parent_ok = match self.parent {
            ParentFilter::Any => true,
            ParentFilter::Root => item.parent_id().is_none(),
            ParentFilter::Folder(id) => item.parent_id() == Some(id),
        };

        parent_ok
            && self.starred.map_or(true, |starred| item.is_starred() == starred)
            && self.kind.map_or(true, |kind| item.kind() == kind)
    }
}

/// Repository interface for drive items (primary port).
///
/// Every read and write is scoped by owner: an item owned by someone else is
/// reported exactly like a missing one.
#[async_trait]
pub trait ItemRepository: Send + Sync + 'static {
    /// Persists a new item
    async fn create(&self, item: &Item) -> ItemRepositoryResult<()>;

    /// Persists several items, all or nothing where the backend allows it
    async fn create_many(&self, items: &[Item]) -> ItemRepositoryResult<()> {
        for item in items {
            self.create(item).await?;
        }
        Ok(())
    }

    async fn find_by_id(
        &self,
        id: &Uuid,
        owner_id: &Uuid,
        trash: TrashFilter,
    ) -> ItemRepositoryResult<Option<Item>>;

    /// Direct children of a folder
    async fn find_children(
        &self,
        parent_id: &Uuid,
        owner_id: &Uuid,
        trash: TrashFilter,
    ) -> ItemRepositoryResult<Vec<Item>> {
        let query = ItemQuery::for_owner(*owner_id)
            .in_parent(Some(*parent_id))
            .trash(trash);
        self.find_by_owner(&query).await
    }

    async fn find_by_owner(&self, query: &ItemQuery) -> ItemRepositoryResult<Vec<Item>>;

    /// Sets the name in one step, whatever the trash state. The name must
    /// already be validated. None when the item is gone.
    async fn rename(
        &self,
        id: &Uuid,
        owner_id: &Uuid,
        name: &str,
    ) -> ItemRepositoryResult<Option<Item>>;

    /// Flips the star flag against the stored value in one step
    async fn toggle_star(&self, id: &Uuid, owner_id: &Uuid) -> ItemRepositoryResult<Option<Item>>;

    /// Atomically trashes the item if it is currently active
    async fn mark_trashed(
        &self,
        id: &Uuid,
        owner_id: &Uuid,
        at: DateTime<Utc>,
    ) -> ItemRepositoryResult<Option<Item>>;

    /// Atomically restores the item if it is currently trashed, moving it to
    /// the root in the same step when `detach` is set
    async fn mark_restored(
        &self,
        id: &Uuid,
        owner_id: &Uuid,
        detach: bool,
    ) -> ItemRepositoryResult<Option<Item>>;

    /// Removes the record if it still passes `trash`. Returns whether a row was removed.
    async fn delete_by_id(
        &self,
        id: &Uuid,
        owner_id: &Uuid,
        trash: TrashFilter,
    ) -> ItemRepositoryResult<bool>;

    /// Trashed items of every owner trashed at or before `cutoff`
    async fn find_trashed_before(&self, cutoff: DateTime<Utc>) -> ItemRepositoryResult<Vec<Item>>;
}
