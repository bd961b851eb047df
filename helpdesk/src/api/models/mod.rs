//! API request and response data models.
//!
//! Request bodies implementing [`Validate`] are extracted with [`ValidJson`], so malformed
//! input is rejected before a handler body runs.

pub mod github;
pub mod mailboxes;
pub mod stats;
pub mod users;

use crate::errors::Result;
use axum::{
    Json,
    extract::{FromRequest, Request},
    response::{IntoResponse, Response},
};
use serde::de::DeserializeOwned;

/// Input checks that go beyond what deserialization enforces.
pub trait Validate {
    fn validate(&self) -> Result<()>;
}

/// JSON body extractor that runs [`Validate::validate`] after deserializing.
#[derive(Debug, Clone)]
pub struct ValidJson<T>(pub T);

impl<T, S> FromRequest<S> for ValidJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request(req: Request, state: &S) -> std::result::Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await.map_err(IntoResponse::into_response)?;
        value.validate().map_err(IntoResponse::into_response)?;
        Ok(Self(value))
    }
}
