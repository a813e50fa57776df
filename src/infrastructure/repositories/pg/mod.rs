pub mod item_pg_repository;

pub use item_pg_repository::ItemPgRepository;
