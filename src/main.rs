//! OxiDrive - servicio de metadatos de elementos de un drive
//!
//! Files live in an S3-compatible blob store and are uploaded and downloaded
//! through presigned URLs; this process keeps the item tree (folders, file
//! metadata, stars and the bin) in PostgreSQL or, without `DATABASE_URL`,
//! in memory.
//!
//! The layout follows a hexagonal architecture:
//!
//! - Domain Layer: the item entity, repository contract, classification
//! - Application Layer: item and trash use cases, view mapping
//! - Infrastructure Layer: PostgreSQL/memory repositories, S3 adapter, cleanup job
//! - Interface Layer: axum handlers and the JWT middleware

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use oxidrive::application::ports::blob_ports::BlobStorePort;
use oxidrive::common::config::AppConfig;
use oxidrive::common::db::create_database_pool;
use oxidrive::common::di::AppServiceFactory;
use oxidrive::domain::repositories::item_repository::ItemRepository;
use oxidrive::infrastructure::repositories::{ItemMemoryRepository, ItemPgRepository};
use oxidrive::infrastructure::services::s3_blob_store::S3BlobStore;
use oxidrive::interfaces::create_router;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration from environment variables
    let config = AppConfig::from_env();

    let item_repository: Arc<dyn ItemRepository> = match &config.database.connection_string {
        Some(url) => {
            let pool = create_database_pool(&config.database, url).await?;
            tracing::info!("Usando repositorio PostgreSQL para los elementos");
            Arc::new(ItemPgRepository::new(Arc::new(pool)))
        }
        None => {
            tracing::warn!("DATABASE_URL no definida, los elementos se guardan solo en memoria");
            Arc::new(ItemMemoryRepository::new())
        }
    };

    let blob_store: Arc<dyn BlobStorePort> = Arc::new(S3BlobStore::from_config(&config.blob_store).await);

    let factory = AppServiceFactory::new(config.clone(), item_repository, blob_store);
    let (state, cleanup_service) = factory.build();
    cleanup_service.start_cleanup_job();

    let app = create_router(state);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .with_context(|| format!("Dirección de servidor inválida: {}:{}", config.server.host, config.server.port))?;
    tracing::info!("Starting OxiDrive server on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("No se pudo escuchar en {}", addr))?;
    axum::serve(listener, app).await.context("Error del servidor HTTP")?;

    Ok(())
}
