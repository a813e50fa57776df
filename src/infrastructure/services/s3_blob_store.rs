use std::time::Duration;

use async_trait::async_trait;
use aws_sdk_s3::config::Region;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::Client;
use tracing::{debug, info, instrument};

use crate::application::ports::blob_ports::BlobStorePort;
use crate::common::config::BlobStoreConfig;
use crate::common::errors::DomainError;

/// `Content-Disposition` for a download, with quotes stripped from the name
fn attachment_disposition(file_name: &str) -> String {
    let safe: String = file_name.chars().filter(|c| *c != '"').collect();
    format!("attachment; filename=\"{}\"", safe)
}

fn blob_error(action: &str, key: &str, detail: impl std::fmt::Display) -> DomainError {
    DomainError::dependency_failure("BlobStore", format!("Could not {} {}: {}", action, key, detail))
        .with_id(key)
}

/// Almacén de blobs sobre S3 (o cualquier servicio compatible).
///
/// Uploads and downloads are handed out as presigned URLs; only deletions
/// are performed from this process.
pub struct S3BlobStore {
    client: Client,
    bucket: String,
    url_ttl: Duration,
}

impl S3BlobStore {
    pub fn new(client: Client, bucket: String, url_ttl: Duration) -> Self {
        Self {
            client,
            bucket,
            url_ttl,
        }
    }

    /// Builds the client from the ambient AWS credentials and the configured
    /// region. A custom endpoint switches to path-style addressing.
    pub async fn from_config(config: &BlobStoreConfig) -> Self {
        let shared = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(Region::new(config.region.clone()))
            .load()
            .await;

        let mut builder = aws_sdk_s3::config::Builder::from(&shared);
        if let Some(endpoint) = &config.endpoint {
            info!("Usando endpoint S3 alternativo: {}", endpoint);
            builder = builder.endpoint_url(endpoint).force_path_style(true);
        }

        info!(
            "Almacén de blobs S3 inicializado: bucket={}, región={}",
            config.bucket, config.region
        );
        Self::new(
            Client::from_conf(builder.build()),
            config.bucket.clone(),
            config.url_ttl(),
        )
    }

    fn presigning(&self, key: &str) -> Result<PresigningConfig, DomainError> {
        PresigningConfig::expires_in(self.url_ttl).map_err(|e| blob_error("presign", key, e))
    }
}

#[async_trait]
impl BlobStorePort for S3BlobStore {
    #[instrument(skip(self))]
    async fn issue_upload_handle(&self, key: &str, content_type: &str) -> Result<String, DomainError> {
        let request = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .presigned(self.presigning(key)?)
            .await
            .map_err(|e| blob_error("presign upload for", key, DisplayErrorContext(&e)))?;

        debug!("URL de subida firmada para {}", key);
        Ok(request.uri().to_string())
    }

    #[instrument(skip(self))]
    async fn issue_download_handle(&self, key: &str, file_name: &str) -> Result<String, DomainError> {
        let request = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .response_content_disposition(attachment_disposition(file_name))
            .presigned(self.presigning(key)?)
            .await
            .map_err(|e| blob_error("presign download for", key, DisplayErrorContext(&e)))?;

        debug!("URL de descarga firmada para {}", key);
        Ok(request.uri().to_string())
    }

    #[instrument(skip(self))]
    async fn delete_object(&self, key: &str) -> Result<(), DomainError> {
        // S3 answers 204 for missing keys as well
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| blob_error("delete", key, DisplayErrorContext(&e)))?;

        debug!("Blob eliminado de S3: {}", key);
        Ok(())
    }
}
