pub mod blob_ports;
pub mod item_ports;
pub mod trash_ports;
