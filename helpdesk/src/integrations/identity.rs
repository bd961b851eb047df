//! Identity provider: creates the accounts that sessions are issued for.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::PgPool;
use tracing::instrument;
use url::Url;

use super::{ProviderError, Result, check_status, endpoint, http_client};
use crate::{config::IdentityConfig, db::errors::DbError, types::UserId};

const PROVIDER: &str = "identity";

/// Create an identity provider from configuration
pub fn create_provider(config: &IdentityConfig, db: PgPool) -> Result<Box<dyn IdentityProvider>> {
    match config {
        IdentityConfig::Database => Ok(Box::new(DatabaseIdentityProvider::new(db))),
        IdentityConfig::Http { url, service_role_key } => Ok(Box::new(HttpIdentityProvider::new(url.clone(), service_role_key.clone())?)),
    }
}

/// Account as reported back by the identity provider
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProviderUser {
    pub id: UserId,
    #[serde(default)]
    pub email: Option<String>,
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Create a confirmed account for `email`.
    ///
    /// Fails with [`ProviderError::MissingUser`] when the provider answers without a user.
    async fn create_user(&self, email: &str, user_metadata: serde_json::Value) -> Result<ProviderUser>;
}

/// Admin API of a GoTrue-compatible auth service
pub struct HttpIdentityProvider {
    client: reqwest::Client,
    base_url: Url,
    service_role_key: String,
}

impl HttpIdentityProvider {
    pub fn new(base_url: Url, service_role_key: String) -> Result<Self> {
        Ok(Self {
            client: http_client()?,
            base_url,
            service_role_key,
        })
    }
}

/// Pull the user out of an admin response. Older services return the user object itself,
/// newer ones wrap it as `{ "user": {...} }`.
fn extract_user(body: serde_json::Value) -> Option<ProviderUser> {
    let candidate = match body.get("user") {
        Some(user) => user.clone(),
        None => body,
    };
    serde_json::from_value(candidate).ok()
}

#[async_trait]
impl IdentityProvider for HttpIdentityProvider {
    #[instrument(skip(self, user_metadata), err)]
    async fn create_user(&self, email: &str, user_metadata: serde_json::Value) -> Result<ProviderUser> {
        let response = self
            .client
            .post(endpoint(PROVIDER, &self.base_url, "admin/users")?)
            .header("apikey", &self.service_role_key)
            .bearer_auth(&self.service_role_key)
            .json(&json!({
                "email": email,
                "email_confirm": true,
                "user_metadata": user_metadata,
            }))
            .send()
            .await
            .map_err(ProviderError::transport(PROVIDER))?;

        let body: serde_json::Value = check_status(PROVIDER, response)
            .await?
            .json()
            .await
            .map_err(ProviderError::transport(PROVIDER))?;

        extract_user(body).ok_or(ProviderError::MissingUser { provider: PROVIDER })
    }
}

/// Creates accounts directly in `auth.users`, for deployments without a separate auth service
pub struct DatabaseIdentityProvider {
    db: PgPool,
}

impl DatabaseIdentityProvider {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl IdentityProvider for DatabaseIdentityProvider {
    #[instrument(skip(self, user_metadata), err)]
    async fn create_user(&self, email: &str, user_metadata: serde_json::Value) -> Result<ProviderUser> {
        let user = sqlx::query_as::<_, (UserId, Option<String>)>(
            r#"
            INSERT INTO auth.users (email, raw_user_meta_data)
            VALUES ($1, $2)
            RETURNING id, email
            "#,
        )
        .bind(email)
        .bind(user_metadata)
        .fetch_one(&self.db)
        .await
        .map_err(DbError::from)?;

        Ok(ProviderUser { id: user.0, email: user.1 })
    }
}
