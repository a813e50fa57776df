pub mod dtos;
pub mod ports;
pub mod services;

// Re-exportaciones para facilitar el acceso a los principales puertos
pub use ports::blob_ports::BlobStorePort;
pub use ports::item_ports::ItemUseCase;
pub use ports::trash_ports::TrashUseCase;
