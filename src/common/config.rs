use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Configuración del servidor HTTP
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8085,
        }
    }
}

/// Configuración de la base de datos PostgreSQL
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// None keeps everything in memory
    pub connection_string: Option<String>,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connect_timeout_secs: u64,
    pub idle_timeout_secs: u64,
    pub max_lifetime_secs: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            connection_string: None,
            max_connections: 20,
            min_connections: 2,
            connect_timeout_secs: 10,
            idle_timeout_secs: 300,
            max_lifetime_secs: 1800,
        }
    }
}

/// Configuración del almacén de blobs (S3 o compatible)
#[derive(Debug, Clone)]
pub struct BlobStoreConfig {
    pub bucket: String,
    pub region: String,
    /// Endpoint alternativo (MinIO, R2...). Activa path-style addressing.
    pub endpoint: Option<String>,
    /// Validez de las URLs prefirmadas (segundos)
    pub url_ttl_secs: u64,
}

impl Default for BlobStoreConfig {
    fn default() -> Self {
        Self {
            bucket: "oxidrive".to_string(),
            region: "us-east-1".to_string(),
            endpoint: None,
            url_ttl_secs: 3600, // 1 hora
        }
    }
}

impl BlobStoreConfig {
    pub fn url_ttl(&self) -> Duration {
        Duration::from_secs(self.url_ttl_secs)
    }
}

/// Configuración de timeouts para diferentes operaciones
#[derive(Debug, Clone)]
pub struct TimeoutConfig {
    /// Timeout para llamadas al almacén de blobs (ms)
    pub blob_operation_ms: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            blob_operation_ms: 15000, // 15 segundos
        }
    }
}

impl TimeoutConfig {
    /// Obtiene un Duration para operaciones contra el almacén de blobs
    pub fn blob_timeout(&self) -> Duration {
        Duration::from_millis(self.blob_operation_ms)
    }
}

/// Configuración de la papelera
#[derive(Debug, Clone)]
pub struct TrashConfig {
    /// Profundidad máxima que recorre una cascada antes de abortar
    pub max_cascade_depth: usize,
    /// Días que un elemento permanece en la papelera (0 = sin purga automática)
    pub retention_days: u32,
    /// Intervalo entre ejecuciones de la limpieza automática
    pub cleanup_interval_hours: u64,
}

impl Default for TrashConfig {
    fn default() -> Self {
        Self {
            max_cascade_depth: 256,
            retention_days: 0,
            cleanup_interval_hours: 24,
        }
    }
}

/// Límites para listados y operaciones por lotes
#[derive(Debug, Clone)]
pub struct ListingConfig {
    pub recent_limit: usize,
    pub max_batch_size: usize,
}

impl Default for ListingConfig {
    fn default() -> Self {
        Self {
            recent_limit: 20,
            max_batch_size: 100,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// HS256 secret shared with the identity service that issues tokens
    pub jwt_secret: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "oxidrive-development-secret".to_string(),
        }
    }
}

/// Configuración global de la aplicación
#[derive(Debug, Clone, Default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub blob_store: BlobStoreConfig,
    pub timeouts: TimeoutConfig,
    pub trash: TrashConfig,
    pub listing: ListingConfig,
    pub auth: AuthConfig,
}

impl AppConfig {
    /// Carga la configuración desde variables de entorno, usando los valores
    /// por defecto para las que no estén definidas o no sean válidas
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(host) = env::var("DRIVE_SERVER_HOST") {
            config.server.host = host;
        }
        config.server.port = env_or("DRIVE_SERVER_PORT", config.server.port);

        config.database.connection_string = env::var("DATABASE_URL")
            .ok()
            .filter(|url| !url.trim().is_empty());
        config.database.max_connections =
            env_or("DRIVE_DB_MAX_CONNECTIONS", config.database.max_connections);
        config.database.min_connections =
            env_or("DRIVE_DB_MIN_CONNECTIONS", config.database.min_connections);

        if let Ok(bucket) = env::var("DRIVE_BLOB_BUCKET") {
            config.blob_store.bucket = bucket;
        }
        if let Ok(region) = env::var("DRIVE_BLOB_REGION") {
            config.blob_store.region = region;
        }
        config.blob_store.endpoint = env::var("DRIVE_BLOB_ENDPOINT")
            .ok()
            .filter(|endpoint| !endpoint.trim().is_empty());
        config.blob_store.url_ttl_secs =
            env_or("DRIVE_BLOB_URL_TTL_SECS", config.blob_store.url_ttl_secs);

        config.timeouts.blob_operation_ms =
            env_or("DRIVE_BLOB_TIMEOUT_MS", config.timeouts.blob_operation_ms);

        config.trash.max_cascade_depth =
            env_or("DRIVE_TRASH_MAX_DEPTH", config.trash.max_cascade_depth);
        config.trash.retention_days =
            env_or("DRIVE_TRASH_RETENTION_DAYS", config.trash.retention_days);
        config.trash.cleanup_interval_hours =
            env_or("DRIVE_TRASH_CLEANUP_HOURS", config.trash.cleanup_interval_hours);

        config.listing.recent_limit =
            env_or("DRIVE_RECENT_LIMIT", config.listing.recent_limit);
        config.listing.max_batch_size =
            env_or("DRIVE_MAX_BATCH_SIZE", config.listing.max_batch_size);

        if let Ok(secret) = env::var("DRIVE_JWT_SECRET") {
            config.auth.jwt_secret = secret;
        } else {
            tracing::warn!("DRIVE_JWT_SECRET not set, using the development secret");
        }

        config
    }
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!("Invalid value for {}: {:?}, keeping default", key, raw);
            default
        }),
        Err(_) => default,
    }
}
