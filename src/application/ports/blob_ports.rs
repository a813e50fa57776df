use async_trait::async_trait;

use crate::common::errors::DomainError;

/// Puerto secundario hacia el almacén de blobs.
///
/// The bytes never pass through this service: callers get time-limited URLs
/// and talk to the store directly. Implementations report failures as
/// `DependencyFailure` errors.
#[async_trait]
pub trait BlobStorePort: Send + Sync + 'static {
    /// URL to PUT the bytes of `key` with the given content type
    async fn issue_upload_handle(&self, key: &str, content_type: &str) -> Result<String, DomainError>;

    /// URL to GET `key`, served as an attachment named `file_name`
    async fn issue_download_handle(&self, key: &str, file_name: &str) -> Result<String, DomainError>;

    /// Removes the blob. Removing a key that does not exist is not an error.
    async fn delete_object(&self, key: &str) -> Result<(), DomainError>;
}
