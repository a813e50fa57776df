use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mockall::mock;
use uuid::Uuid;

use crate::application::ports::blob_ports::BlobStorePort;
use crate::application::services::trash_service::TrashService;
use crate::common::errors::DomainError;
use crate::domain::entities::item::{FileContent, Item, ItemContent};
use crate::domain::repositories::item_repository::{
    ItemQuery, ItemRepository, ItemRepositoryResult, TrashFilter,
};
use crate::infrastructure::repositories::item_memory_repository::ItemMemoryRepository;

// Mock blob store for testing
mock! {
    BlobStore {}

    #[async_trait]
    impl BlobStorePort for BlobStore {
        async fn issue_upload_handle(&self, key: &str, content_type: &str) -> Result<String, DomainError>;
        async fn issue_download_handle(&self, key: &str, file_name: &str) -> Result<String, DomainError>;
        async fn delete_object(&self, key: &str) -> Result<(), DomainError>;
    }
}

/// Blob store whose deletions never answer in time
struct StalledBlobStore;

#[async_trait]
impl BlobStorePort for StalledBlobStore {
    async fn issue_upload_handle(&self, _key: &str, _content_type: &str) -> Result<String, DomainError> {
        Ok(String::new())
    }

    async fn issue_download_handle(&self, _key: &str, _file_name: &str) -> Result<String, DomainError> {
        Ok(String::new())
    }

    async fn delete_object(&self, _key: &str) -> Result<(), DomainError> {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Ok(())
    }
}

/// Blob store mock that only expects no deletions
fn idle_blob_store() -> MockBlobStore {
    let mut blob_store = MockBlobStore::new();
    blob_store.expect_delete_object().never();
    blob_store
}

/// Blob store mock that accepts `times` deletions and records their keys
fn recording_blob_store(times: usize, deleted: Arc<Mutex<Vec<String>>>) -> MockBlobStore {
    let mut blob_store = MockBlobStore::new();
    blob_store
        .expect_delete_object()
        .times(times)
        .returning(move |key| {
            deleted.lock().unwrap().push(key.to_string());
            Ok(())
        });
    blob_store
}

fn service_with(
    repo: Arc<ItemMemoryRepository>,
    blob_store: Arc<dyn BlobStorePort>,
    max_depth: usize,
) -> TrashService {
    TrashService::new(repo, blob_store, max_depth, Duration::from_millis(200))
}

fn service(repo: Arc<ItemMemoryRepository>, blob_store: MockBlobStore) -> TrashService {
    service_with(repo, Arc::new(blob_store), 256)
}

async fn add_folder(
    repo: &ItemMemoryRepository,
    owner: Uuid,
    name: &str,
    parent: Option<Uuid>,
) -> Item {
    let folder = Item::new_folder(owner, name, parent).unwrap();
    repo.create(&folder).await.unwrap();
    folder
}

async fn add_file(
    repo: &ItemMemoryRepository,
    owner: Uuid,
    name: &str,
    parent: Option<Uuid>,
) -> Item {
    let content = FileContent::new(
        format!("uploads/1-{}", name),
        Some("text/plain".to_string()),
        Some(100),
    )
    .unwrap();
    let file = Item::new_file(owner, name, content, parent).unwrap();
    repo.create(&file).await.unwrap();
    file
}

async fn stored(repo: &ItemMemoryRepository, item: &Item) -> Option<Item> {
    repo.find_by_id(&item.id(), &item.owner_id(), TrashFilter::Any)
        .await
        .unwrap()
}

/// A (root) > B > C.txt, the tree most tests work on
async fn abc_tree(repo: &ItemMemoryRepository, owner: Uuid) -> (Item, Item, Item) {
    let a = add_folder(repo, owner, "A", None).await;
    let b = add_folder(repo, owner, "B", Some(a.id())).await;
    let c = add_file(repo, owner, "C.txt", Some(b.id())).await;
    (a, b, c)
}

/// What a concurrent request does to the target between a listing and the
/// cascade reaching it
#[derive(Clone, Copy)]
enum Interleaved {
    Trash(DateTime<Utc>),
    Restore,
}

/// Memory repository that lets another writer flip `target` right after
/// the first listing that returns it. The listing itself is left stale.
struct RacingRepository {
    inner: Arc<ItemMemoryRepository>,
    target: Uuid,
    action: Interleaved,
    fired: AtomicBool,
}

impl RacingRepository {
    fn new(inner: Arc<ItemMemoryRepository>, target: &Item, action: Interleaved) -> Self {
        Self {
            inner,
            target: target.id(),
            action,
            fired: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl ItemRepository for RacingRepository {
    async fn create(&self, item: &Item) -> ItemRepositoryResult<()> {
        self.inner.create(item).await
    }

    async fn find_by_id(
        &self,
        id: &Uuid,
        owner_id: &Uuid,
        trash: TrashFilter,
    ) -> ItemRepositoryResult<Option<Item>> {
        self.inner.find_by_id(id, owner_id, trash).await
    }

    async fn find_by_owner(&self, query: &ItemQuery) -> ItemRepositoryResult<Vec<Item>> {
        let found = self.inner.find_by_owner(query).await?;

        let listed = found.iter().any(|item| item.id() == self.target);
        if listed && !self.fired.swap(true, Ordering::SeqCst) {
            match self.action {
                Interleaved::Trash(at) => {
                    self.inner.mark_trashed(&self.target, &query.owner_id, at).await?;
                }
                Interleaved::Restore => {
                    self.inner.mark_restored(&self.target, &query.owner_id, false).await?;
                }
            }
        }
        Ok(found)
    }

    async fn rename(
        &self,
        id: &Uuid,
        owner_id: &Uuid,
        name: &str,
    ) -> ItemRepositoryResult<Option<Item>> {
        self.inner.rename(id, owner_id, name).await
    }

    async fn toggle_star(&self, id: &Uuid, owner_id: &Uuid) -> ItemRepositoryResult<Option<Item>> {
        self.inner.toggle_star(id, owner_id).await
    }

    async fn mark_trashed(
        &self,
        id: &Uuid,
        owner_id: &Uuid,
        at: DateTime<Utc>,
    ) -> ItemRepositoryResult<Option<Item>> {
        self.inner.mark_trashed(id, owner_id, at).await
    }

    async fn mark_restored(
        &self,
        id: &Uuid,
        owner_id: &Uuid,
        detach: bool,
    ) -> ItemRepositoryResult<Option<Item>> {
        self.inner.mark_restored(id, owner_id, detach).await
    }

    async fn delete_by_id(
        &self,
        id: &Uuid,
        owner_id: &Uuid,
        trash: TrashFilter,
    ) -> ItemRepositoryResult<bool> {
        self.inner.delete_by_id(id, owner_id, trash).await
    }

    async fn find_trashed_before(&self, cutoff: DateTime<Utc>) -> ItemRepositoryResult<Vec<Item>> {
        self.inner.find_trashed_before(cutoff).await
    }
}

fn racing_service(repo: RacingRepository) -> TrashService {
    TrashService::new(
        Arc::new(repo),
        Arc::new(idle_blob_store()),
        256,
        Duration::from_millis(200),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::trash_ports::TrashUseCase;
    use crate::common::errors::ErrorKind;

    #[tokio::test]
    async fn test_trash_cascades_to_subtree() {
        let repo = Arc::new(ItemMemoryRepository::new());
        let owner = Uuid::new_v4();
        let (a, b, c) = abc_tree(&repo, owner).await;
        let sibling = add_file(&repo, owner, "outside.txt", None).await;

        let service = service(repo.clone(), idle_blob_store());
        let result = service.move_to_trash(&a.id().to_string(), &owner).await;
        assert!(result.is_ok(), "Moving folder to trash failed: {:?}", result);

        let a = stored(&repo, &a).await.unwrap();
        let b = stored(&repo, &b).await.unwrap();
        let c = stored(&repo, &c).await.unwrap();
        assert!(a.is_trashed() && b.is_trashed() && c.is_trashed());

        // One timestamp for the whole cascade
        assert!(a.trashed_at().is_some());
        assert_eq!(a.trashed_at(), b.trashed_at());
        assert_eq!(b.trashed_at(), c.trashed_at());

        let sibling = stored(&repo, &sibling).await.unwrap();
        assert!(!sibling.is_trashed(), "Items outside the subtree must stay active");
    }

    #[tokio::test]
    async fn test_restore_child_of_trashed_folder_moves_to_root() {
        let repo = Arc::new(ItemMemoryRepository::new());
        let owner = Uuid::new_v4();
        let (a, b, c) = abc_tree(&repo, owner).await;

        let service = service(repo.clone(), idle_blob_store());
        service.move_to_trash(&a.id().to_string(), &owner).await.unwrap();

        let result = service.restore_item(&b.id().to_string(), &owner).await.unwrap();
        assert!(result.moved_to_root);
        assert!(result.item.parent_id.is_none());
        assert_eq!(
            result.message(),
            "Item restored to My Drive (parent folder was in trash)"
        );

        let a = stored(&repo, &a).await.unwrap();
        let b = stored(&repo, &b).await.unwrap();
        let c = stored(&repo, &c).await.unwrap();
        assert!(a.is_trashed(), "A stays in the bin");
        assert!(!b.is_trashed());
        assert!(b.parent_id().is_none(), "B is detached to the root");
        assert!(!c.is_trashed());
        assert!(c.trashed_at().is_none());
        assert_eq!(c.parent_id(), Some(b.id()), "C keeps its parent");
    }

    #[tokio::test]
    async fn test_restore_under_active_parent_keeps_placement() {
        let repo = Arc::new(ItemMemoryRepository::new());
        let owner = Uuid::new_v4();
        let (a, b, c) = abc_tree(&repo, owner).await;

        let service = service(repo.clone(), idle_blob_store());
        service.move_to_trash(&b.id().to_string(), &owner).await.unwrap();
        assert!(stored(&repo, &c).await.unwrap().is_trashed());

        let result = service.restore_item(&b.id().to_string(), &owner).await.unwrap();
        assert!(!result.moved_to_root);
        assert_eq!(result.message(), "Item restored successfully");

        let b = stored(&repo, &b).await.unwrap();
        assert_eq!(b.parent_id(), Some(a.id()));
        assert!(!stored(&repo, &c).await.unwrap().is_trashed());
    }

    #[tokio::test]
    async fn test_restore_then_trash_matches_original_state() {
        let repo = Arc::new(ItemMemoryRepository::new());
        let owner = Uuid::new_v4();
        let (_a, b, _c) = abc_tree(&repo, owner).await;
        let before = stored(&repo, &b).await.unwrap();

        let service = service(repo.clone(), idle_blob_store());
        service.move_to_trash(&b.id().to_string(), &owner).await.unwrap();
        service.restore_item(&b.id().to_string(), &owner).await.unwrap();

        let after = stored(&repo, &b).await.unwrap();
        assert_eq!(after.name(), before.name());
        assert_eq!(after.parent_id(), before.parent_id());
        assert_eq!(after.is_starred(), before.is_starred());
        assert_eq!(after.is_trashed(), before.is_trashed());
        assert_eq!(after.content(), before.content());
    }

    #[tokio::test]
    async fn test_state_preconditions_report_not_found() {
        let repo = Arc::new(ItemMemoryRepository::new());
        let owner = Uuid::new_v4();
        let active = add_folder(&repo, owner, "active", None).await;
        let binned = add_folder(&repo, owner, "binned", None).await;

        let service = service(repo.clone(), idle_blob_store());
        service.move_to_trash(&binned.id().to_string(), &owner).await.unwrap();

        let err = service.restore_item(&active.id().to_string(), &owner).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);
        assert_eq!(err.message, "Item not found in bin");

        let err = service.delete_permanently(&active.id().to_string(), &owner).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);

        let err = service.move_to_trash(&binned.id().to_string(), &owner).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);

        let err = service.move_to_trash(&Uuid::new_v4().to_string(), &owner).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);

        let err = service.move_to_trash("not-a-uuid", &owner).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidInput);
    }

    #[tokio::test]
    async fn test_other_owners_cannot_touch_items() {
        let repo = Arc::new(ItemMemoryRepository::new());
        let owner = Uuid::new_v4();
        let stranger = Uuid::new_v4();
        let active = add_file(&repo, owner, "mine.txt", None).await;
        let binned = add_file(&repo, owner, "old.txt", None).await;

        let service = service(repo.clone(), idle_blob_store());
        service.move_to_trash(&binned.id().to_string(), &owner).await.unwrap();

        let err = service.move_to_trash(&active.id().to_string(), &stranger).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);
        let err = service.restore_item(&binned.id().to_string(), &stranger).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);
        let err = service.delete_permanently(&binned.id().to_string(), &stranger).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);

        assert!(service.get_trash_items(&stranger).await.unwrap().is_empty());
        assert!(!stored(&repo, &active).await.unwrap().is_trashed());
        assert!(stored(&repo, &binned).await.is_some());
    }

    #[tokio::test]
    async fn test_root_trash_view_hides_nested_items() {
        let repo = Arc::new(ItemMemoryRepository::new());
        let owner = Uuid::new_v4();
        let (a, _b, _c) = abc_tree(&repo, owner).await;
        let loose = add_file(&repo, owner, "loose.txt", None).await;

        let service = service(repo.clone(), idle_blob_store());
        service.move_to_trash(&a.id().to_string(), &owner).await.unwrap();
        tokio::time::sleep(Duration::from_millis(5)).await;
        service.move_to_trash(&loose.id().to_string(), &owner).await.unwrap();

        let roots = service.get_trash_items(&owner).await.unwrap();
        let ids: Vec<Uuid> = roots.iter().map(|item| item.id).collect();
        assert_eq!(ids, vec![loose.id(), a.id()], "Newest first, descendants hidden");
        assert!(roots.iter().all(|item| item.mutation_code == 2));
    }

    #[tokio::test]
    async fn test_root_trash_view_includes_items_under_active_parent() {
        let repo = Arc::new(ItemMemoryRepository::new());
        let owner = Uuid::new_v4();
        let (a, b, _c) = abc_tree(&repo, owner).await;

        let service = service(repo.clone(), idle_blob_store());
        service.move_to_trash(&b.id().to_string(), &owner).await.unwrap();

        let roots = service.root_trash(&owner).await.unwrap();
        assert_eq!(roots.len(), 1);
        assert_eq!(roots[0].id(), b.id());
        assert_eq!(roots[0].parent_id(), Some(a.id()));
    }

    #[tokio::test]
    async fn test_delete_permanently_releases_each_blob_once() {
        let repo = Arc::new(ItemMemoryRepository::new());
        let owner = Uuid::new_v4();
        let (a, _b, c) = abc_tree(&repo, owner).await;
        let d = add_file(&repo, owner, "D.txt", Some(a.id())).await;
        let keeper = add_file(&repo, owner, "keep.txt", None).await;

        let deleted = Arc::new(Mutex::new(Vec::new()));
        let service = service(repo.clone(), recording_blob_store(2, deleted.clone()));

        service.move_to_trash(&a.id().to_string(), &owner).await.unwrap();
        let report = service.delete_permanently(&a.id().to_string(), &owner).await.unwrap();

        assert_eq!(report.items_removed, 4);
        assert_eq!(report.blobs_released, 2);
        assert_eq!(report.blob_failures, 0);

        let mut keys = deleted.lock().unwrap().clone();
        keys.sort();
        let mut expected = vec![
            c.blob_key().unwrap().to_string(),
            d.blob_key().unwrap().to_string(),
        ];
        expected.sort();
        assert_eq!(keys, expected);

        assert_eq!(repo.len().await, 1, "Only the untouched file remains");
        assert!(stored(&repo, &keeper).await.is_some());
    }

    #[tokio::test]
    async fn test_blob_failures_do_not_block_purge() {
        let repo = Arc::new(ItemMemoryRepository::new());
        let owner = Uuid::new_v4();
        let folder = add_folder(&repo, owner, "photos", None).await;
        add_file(&repo, owner, "one.png", Some(folder.id())).await;
        add_file(&repo, owner, "two.png", Some(folder.id())).await;

        let mut blob_store = MockBlobStore::new();
        blob_store
            .expect_delete_object()
            .times(2)
            .returning(|key| {
                if key.ends_with("one.png") {
                    Err(DomainError::dependency_failure("BlobStore", "bucket unavailable"))
                } else {
                    Ok(())
                }
            });

        let service = service(repo.clone(), blob_store);
        service.move_to_trash(&folder.id().to_string(), &owner).await.unwrap();
        let report = service.delete_permanently(&folder.id().to_string(), &owner).await.unwrap();

        assert_eq!(report.items_removed, 3);
        assert_eq!(report.blobs_released, 1);
        assert_eq!(report.blob_failures, 1);
        assert!(repo.is_empty().await, "Records are purged even when a blob is not");
    }

    #[tokio::test]
    async fn test_stalled_blob_store_times_out() {
        let repo = Arc::new(ItemMemoryRepository::new());
        let owner = Uuid::new_v4();
        let file = add_file(&repo, owner, "big.iso", None).await;

        let service = service_with(repo.clone(), Arc::new(StalledBlobStore), 256);
        service.move_to_trash(&file.id().to_string(), &owner).await.unwrap();
        let report = service.delete_permanently(&file.id().to_string(), &owner).await.unwrap();

        assert_eq!(report.items_removed, 1);
        assert_eq!(report.blob_failures, 1);
        assert!(repo.is_empty().await);
    }

    #[tokio::test]
    async fn test_cycle_is_an_integrity_error() {
        let repo = Arc::new(ItemMemoryRepository::new());
        let owner = Uuid::new_v4();
        let now = Utc::now();
        let a_id = Uuid::new_v4();
        let b_id = Uuid::new_v4();

        // Two trashed folders that claim each other as parent
        for (id, name, parent) in [(a_id, "A", b_id), (b_id, "B", a_id)] {
            let item = Item::from_record(
                id,
                name.to_string(),
                ItemContent::Folder,
                Some(parent),
                owner,
                false,
                true,
                Some(now),
                now,
                now,
            );
            repo.create(&item).await.unwrap();
        }

        let service = service(repo.clone(), idle_blob_store());
        let err = service.delete_permanently(&a_id.to_string(), &owner).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::IntegrityViolation);

        // Nothing was purged because the walk failed before any deletion
        assert_eq!(repo.len().await, 2);
    }

    #[tokio::test]
    async fn test_runaway_depth_is_an_integrity_error() {
        let repo = Arc::new(ItemMemoryRepository::new());
        let owner = Uuid::new_v4();

        let root = add_folder(&repo, owner, "level-0", None).await;
        let mut parent = root.id();
        for level in 1..=5 {
            parent = add_folder(&repo, owner, &format!("level-{}", level), Some(parent))
                .await
                .id();
        }

        let service = service_with(repo.clone(), Arc::new(idle_blob_store()), 3);
        let err = service.move_to_trash(&root.id().to_string(), &owner).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::IntegrityViolation);
    }

    #[tokio::test]
    async fn test_empty_trash() {
        let repo = Arc::new(ItemMemoryRepository::new());
        let owner = Uuid::new_v4();
        let other_owner = Uuid::new_v4();

        let (a, _b, _c) = abc_tree(&repo, owner).await;
        let loose = add_file(&repo, owner, "loose.txt", None).await;
        let kept = add_file(&repo, owner, "kept.txt", None).await;
        let foreign = add_file(&repo, other_owner, "theirs.txt", None).await;

        let deleted = Arc::new(Mutex::new(Vec::new()));
        let service = service(repo.clone(), recording_blob_store(2, deleted.clone()));

        service.move_to_trash(&a.id().to_string(), &owner).await.unwrap();
        service.move_to_trash(&loose.id().to_string(), &owner).await.unwrap();
        service.move_to_trash(&foreign.id().to_string(), &other_owner).await.unwrap();

        let report = service.empty_trash(&owner).await.unwrap();
        assert_eq!(report.items_removed, 4);
        assert_eq!(deleted.lock().unwrap().len(), 2);

        assert!(service.get_trash_items(&owner).await.unwrap().is_empty());
        assert!(stored(&repo, &kept).await.is_some(), "Active items survive");
        let foreign = stored(&repo, &foreign).await.unwrap();
        assert!(foreign.is_trashed(), "Other owners' bins are untouched");
    }

    #[tokio::test]
    async fn test_trash_cascade_skips_child_trashed_concurrently() {
        let inner = Arc::new(ItemMemoryRepository::new());
        let owner = Uuid::new_v4();
        let a = add_folder(&inner, owner, "A", None).await;
        let b = add_folder(&inner, owner, "B", Some(a.id())).await;
        let c = add_file(&inner, owner, "C.txt", Some(a.id())).await;

        let earlier = Utc::now() - chrono::Duration::minutes(5);
        let service = racing_service(RacingRepository::new(
            inner.clone(),
            &b,
            Interleaved::Trash(earlier),
        ));

        let changed = service.trash_tree(&a.id(), &owner).await.unwrap();
        assert_eq!(changed, 2, "B was trashed by the other request, not by us");

        let b = stored(&inner, &b).await.unwrap();
        assert!(b.is_trashed());
        assert_eq!(b.trashed_at(), Some(earlier), "B keeps its own timestamp");

        let a = stored(&inner, &a).await.unwrap();
        let c = stored(&inner, &c).await.unwrap();
        assert!(c.is_trashed());
        assert_eq!(a.trashed_at(), c.trashed_at());
    }

    #[tokio::test]
    async fn test_restore_cascade_skips_child_restored_concurrently() {
        let inner = Arc::new(ItemMemoryRepository::new());
        let owner = Uuid::new_v4();
        let a = add_folder(&inner, owner, "A", None).await;
        let b = add_folder(&inner, owner, "B", Some(a.id())).await;
        let c = add_file(&inner, owner, "C.txt", Some(a.id())).await;
        service(inner.clone(), idle_blob_store())
            .trash_tree(&a.id(), &owner)
            .await
            .unwrap();

        let service = racing_service(RacingRepository::new(inner.clone(), &b, Interleaved::Restore));

        let (root, moved_to_root) = service.restore_tree(&a.id(), &owner).await.unwrap();
        assert_eq!(root.id(), a.id());
        assert!(!moved_to_root);

        let b = stored(&inner, &b).await.unwrap();
        assert!(!b.is_trashed());
        assert_eq!(b.parent_id(), Some(a.id()));
        assert!(!stored(&inner, &c).await.unwrap().is_trashed());
        assert!(!stored(&inner, &a).await.unwrap().is_trashed());
    }
}
