pub mod item_dto;
pub mod trash_dto;
