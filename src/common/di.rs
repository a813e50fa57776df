use std::sync::Arc;

use crate::application::ports::blob_ports::BlobStorePort;
use crate::application::ports::item_ports::ItemUseCase;
use crate::application::ports::trash_ports::TrashUseCase;
use crate::application::services::item_service::ItemService;
use crate::application::services::trash_service::TrashService;
use crate::common::config::AppConfig;
use crate::domain::repositories::item_repository::ItemRepository;
use crate::domain::services::auth_service::AuthService;
use crate::infrastructure::services::trash_cleanup_service::TrashCleanupService;

/// Estado compartido por todos los handlers
#[derive(Clone)]
pub struct AppState {
    pub item_service: Arc<dyn ItemUseCase>,
    pub trash_service: Arc<dyn TrashUseCase>,
    pub auth_service: Arc<AuthService>,
}

/// Fábrica para los diferentes componentes de la aplicación
pub struct AppServiceFactory {
    config: AppConfig,
    item_repository: Arc<dyn ItemRepository>,
    blob_store: Arc<dyn BlobStorePort>,
}

impl AppServiceFactory {
    pub fn new(
        config: AppConfig,
        item_repository: Arc<dyn ItemRepository>,
        blob_store: Arc<dyn BlobStorePort>,
    ) -> Self {
        Self {
            config,
            item_repository,
            blob_store,
        }
    }

    pub fn create_trash_service(&self) -> Arc<TrashService> {
        Arc::new(TrashService::new(
            self.item_repository.clone(),
            self.blob_store.clone(),
            self.config.trash.max_cascade_depth,
            self.config.timeouts.blob_timeout(),
        ))
    }

    pub fn create_item_service(&self) -> Arc<ItemService> {
        Arc::new(ItemService::new(
            self.item_repository.clone(),
            self.blob_store.clone(),
            self.config.listing.recent_limit,
            self.config.listing.max_batch_size,
            self.config.timeouts.blob_timeout(),
        ))
    }

    pub fn create_cleanup_service(&self, trash_service: Arc<TrashService>) -> Arc<TrashCleanupService> {
        Arc::new(TrashCleanupService::new(
            trash_service,
            self.item_repository.clone(),
            self.config.trash.retention_days,
            self.config.trash.cleanup_interval_hours,
        ))
    }

    /// Wires the services and returns the handler state together with the
    /// cleanup job, which the caller decides whether to start
    pub fn build(&self) -> (AppState, Arc<TrashCleanupService>) {
        let trash_service = self.create_trash_service();
        let cleanup_service = self.create_cleanup_service(trash_service.clone());

        let state = AppState {
            item_service: self.create_item_service(),
            trash_service,
            auth_service: Arc::new(AuthService::new(self.config.auth.jwt_secret.clone())),
        };

        (state, cleanup_service)
    }
}
