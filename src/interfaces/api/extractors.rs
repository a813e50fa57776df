use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequest, Request};
use axum::Json;

use crate::common::errors::DomainError;

/// JSON body extractor whose rejections use the API's `{"error": ...}` shape.
///
/// A malformed body, a wrong content type or a field of the wrong type all
/// come back as a 400 validation error.
pub struct ApiJson<T>(pub T);

impl<S, T> FromRequest<S> for ApiJson<T>
where
    S: Send + Sync,
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
{
    type Rejection = DomainError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await.map_err(|rejection| {
            DomainError::validation_error("Request", format!("Invalid JSON: {}", rejection.body_text()))
        })?;

        Ok(ApiJson(value))
    }
}
