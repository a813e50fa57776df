use std::fmt::{Display, Formatter, Result as FmtResult};
use std::error::Error as StdError;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

/// Tipos de errores comunes en toda la aplicación
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Entidad no encontrada (o no pertenece al usuario)
    NotFound,
    /// Entrada inválida o validación fallida
    InvalidInput,
    /// Error de acceso o permisos
    AccessDenied,
    /// Tiempo de espera agotado
    Timeout,
    /// A collaborator outside the process (blob store) failed
    DependencyFailure,
    /// The stored tree is inconsistent (cycle, runaway depth)
    IntegrityViolation,
    /// Error interno del sistema
    InternalError,
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            ErrorKind::NotFound => write!(f, "Not Found"),
            ErrorKind::InvalidInput => write!(f, "Invalid Input"),
            ErrorKind::AccessDenied => write!(f, "Access Denied"),
            ErrorKind::Timeout => write!(f, "Timeout"),
            ErrorKind::DependencyFailure => write!(f, "Dependency Failure"),
            ErrorKind::IntegrityViolation => write!(f, "Integrity Violation"),
            ErrorKind::InternalError => write!(f, "Internal Error"),
        }
    }
}

impl ErrorKind {
    /// HTTP status used when the error reaches the API boundary
    pub fn status_code(&self) -> StatusCode {
        match self {
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::InvalidInput => StatusCode::BAD_REQUEST,
            ErrorKind::AccessDenied => StatusCode::UNAUTHORIZED,
            ErrorKind::Timeout => StatusCode::GATEWAY_TIMEOUT,
            ErrorKind::DependencyFailure => StatusCode::BAD_GATEWAY,
            ErrorKind::IntegrityViolation | ErrorKind::InternalError => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

/// Error base de dominio que proporciona contexto detallado
#[derive(Error, Debug)]
#[error("{kind}: {message}")]
pub struct DomainError {
    /// Tipo de error
    pub kind: ErrorKind,
    /// Tipo de entidad afectada (ej: "Item", "BlobStore")
    pub entity_type: &'static str,
    /// Identificador de la entidad si está disponible
    pub entity_id: Option<String>,
    /// Mensaje descriptivo del error
    pub message: String,
    /// Error fuente (opcional)
    #[source]
    pub source: Option<Box<dyn StdError + Send + Sync>>,
}

pub type Result<T, E = DomainError> = std::result::Result<T, E>;

impl DomainError {
    /// Crea un nuevo error de dominio
    pub fn new<S: Into<String>>(
        kind: ErrorKind,
        entity_type: &'static str,
        message: S,
    ) -> Self {
        Self {
            kind,
            entity_type,
            entity_id: None,
            message: message.into(),
            source: None,
        }
    }

    /// Crea un error de entidad no encontrada
    pub fn not_found<S: Into<String>>(entity_type: &'static str, entity_id: S) -> Self {
        let id = entity_id.into();
        Self {
            kind: ErrorKind::NotFound,
            entity_type,
            entity_id: Some(id.clone()),
            message: format!("{} not found: {}", entity_type, id),
            source: None,
        }
    }

    /// Crea un error de tiempo agotado
    pub fn timeout<S: Into<String>>(entity_type: &'static str, message: S) -> Self {
        Self::new(ErrorKind::Timeout, entity_type, message)
    }

    /// Crea un error interno
    pub fn internal_error<S: Into<String>>(entity_type: &'static str, message: S) -> Self {
        Self::new(ErrorKind::InternalError, entity_type, message)
    }

    /// Crea un error de acceso denegado
    pub fn access_denied<S: Into<String>>(entity_type: &'static str, message: S) -> Self {
        Self::new(ErrorKind::AccessDenied, entity_type, message)
    }

    /// Crea un error de validación
    pub fn validation_error<S: Into<String>>(entity_type: &'static str, message: S) -> Self {
        Self::new(ErrorKind::InvalidInput, entity_type, message)
    }

    pub fn dependency_failure<S: Into<String>>(entity_type: &'static str, message: S) -> Self {
        Self::new(ErrorKind::DependencyFailure, entity_type, message)
    }

    pub fn integrity_violation<S: Into<String>>(entity_type: &'static str, message: S) -> Self {
        Self::new(ErrorKind::IntegrityViolation, entity_type, message)
    }

    /// Establece el ID de la entidad
    pub fn with_id<S: Into<String>>(mut self, entity_id: S) -> Self {
        self.entity_id = Some(entity_id.into());
        self
    }

    /// Establece el error fuente
    pub fn with_source<E: StdError + Send + Sync + 'static>(mut self, source: E) -> Self {
        self.source = Some(Box::new(source));
        self
    }
}

impl IntoResponse for DomainError {
    fn into_response(self) -> Response {
        let status = self.kind.status_code();

        if status.is_server_error() {
            tracing::error!("{} error: {:?}", self.entity_type, self);
        }

        // Internal details never leave the process
        let message = match self.kind {
            ErrorKind::IntegrityViolation | ErrorKind::InternalError => {
                "Internal server error".to_string()
            }
            _ => self.message,
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_carries_entity_id() {
        let err = DomainError::not_found("Item", "abc");
        assert_eq!(err.kind, ErrorKind::NotFound);
        assert_eq!(err.entity_id.as_deref(), Some("abc"));
        assert_eq!(err.to_string(), "Not Found: Item not found: abc");
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(ErrorKind::InvalidInput.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(ErrorKind::NotFound.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(ErrorKind::DependencyFailure.status_code(), StatusCode::BAD_GATEWAY);
        assert_eq!(
            ErrorKind::IntegrityViolation.status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
