pub mod item_repository;
