pub mod item_handler;
pub mod trash_handler;
