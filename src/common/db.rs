use std::time::Duration;

use anyhow::{Context, Result};
use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::common::config::DatabaseConfig;

const MAX_ATTEMPTS: usize = 3;

/// Idempotent bootstrap of the item table, one statement at a time
const SCHEMA: &[&str] = &[
    "CREATE SCHEMA IF NOT EXISTS drive",
    r#"
    CREATE TABLE IF NOT EXISTS drive.items (
        id UUID PRIMARY KEY,
        owner_id UUID NOT NULL,
        parent_id UUID NULL,
        name VARCHAR(255) NOT NULL,
        kind VARCHAR(16) NOT NULL CHECK (kind IN ('file', 'folder')),
        blob_key TEXT NULL,
        mime_hint TEXT NULL,
        size_bytes BIGINT NULL,
        is_starred BOOLEAN NOT NULL DEFAULT FALSE,
        is_trashed BOOLEAN NOT NULL DEFAULT FALSE,
        trashed_at TIMESTAMPTZ NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        CONSTRAINT items_file_has_blob CHECK (kind <> 'file' OR blob_key IS NOT NULL),
        CONSTRAINT items_trashed_at_matches CHECK (is_trashed = (trashed_at IS NOT NULL))
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_items_owner_parent ON drive.items(owner_id, parent_id)",
    "CREATE INDEX IF NOT EXISTS idx_items_owner_trashed ON drive.items(owner_id, is_trashed, trashed_at)",
    "CREATE INDEX IF NOT EXISTS idx_items_owner_updated ON drive.items(owner_id, updated_at DESC)",
];

/// Hides the credentials of a connection string for logging
fn redact(url: &str) -> String {
    match (url.find("://"), url.rfind('@')) {
        (Some(scheme_end), Some(at)) if at > scheme_end => {
            format!("{}[user]:[pass]{}", &url[..scheme_end + 3], &url[at..])
        }
        _ => url.to_string(),
    }
}

pub async fn create_database_pool(config: &DatabaseConfig, url: &str) -> Result<PgPool> {
    tracing::info!("Inicializando conexión a PostgreSQL con URL: {}", redact(url));

    let mut attempt = 0;
    loop {
        attempt += 1;
        tracing::info!("Intento de conexión a PostgreSQL #{}", attempt);

        let connected = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(config.connect_timeout_secs))
            .idle_timeout(Duration::from_secs(config.idle_timeout_secs))
            .max_lifetime(Duration::from_secs(config.max_lifetime_secs))
            .connect(url)
            .await;

        match connected {
            Ok(pool) => {
                ensure_schema(&pool).await?;
                tracing::info!("Conexión a PostgreSQL establecida correctamente");
                return Ok(pool);
            }
            Err(e) if attempt < MAX_ATTEMPTS => {
                tracing::error!("Error al conectar a PostgreSQL: {}", e);
                tokio::time::sleep(Duration::from_secs(1)).await;
            }
            Err(e) => {
                return Err(anyhow::anyhow!(
                    "No se pudo establecer la conexión a PostgreSQL después de {} intentos: {}",
                    MAX_ATTEMPTS,
                    e
                ));
            }
        }
    }
}

/// Creates the schema objects that do not exist yet
pub async fn ensure_schema(pool: &PgPool) -> Result<()> {
    for statement in SCHEMA {
        sqlx::query(statement)
            .execute(pool)
            .await
            .with_context(|| format!("Error al crear el esquema: {}", statement.trim()))?;
    }
    tracing::debug!("Esquema drive.items verificado");
    Ok(())
}
