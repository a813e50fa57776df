// Exportar los módulos principales del proyecto
pub mod common;
pub mod domain;
pub mod application;
pub mod infrastructure;
pub mod interfaces;

// Re-exportaciones públicas comunes
pub use application::services::item_service::ItemService;
pub use application::services::trash_service::TrashService;
pub use common::config::AppConfig;
pub use interfaces::create_router;
