pub mod auth_service;
pub mod classification_service;
