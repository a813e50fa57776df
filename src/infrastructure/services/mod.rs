pub mod s3_blob_store;
pub mod trash_cleanup_service;
