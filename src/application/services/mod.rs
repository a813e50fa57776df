pub mod item_service;
pub mod trash_service;
pub mod view_mapper;

#[cfg(test)]
mod trash_service_test;

// Re-exportar para facilitar acceso
pub use item_service::ItemService;
pub use trash_service::TrashService;
