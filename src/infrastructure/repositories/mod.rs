pub mod item_memory_repository;

// Repositorios PostgreSQL
pub mod pg;

pub use item_memory_repository::ItemMemoryRepository;
pub use pg::ItemPgRepository;
