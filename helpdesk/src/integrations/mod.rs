//! Third-party provider abstraction layer
//!
//! Each provider is a trait with an HTTP implementation talking to the real service and an
//! in-process implementation for self-hosting, development and tests:
//!
//! - [`identity::IdentityProvider`]: creates accounts (`auth.users`)
//! - [`github::GitHubClient`]: lists repositories of a GitHub App installation
//! - [`slack::SlackClient`]: looks up Slack users
//!
//! The `create_*` factories are the single point where configuration becomes provider
//! instances.

use crate::db::errors::DbError;
use reqwest::Response;

pub mod github;
pub mod identity;
pub mod slack;

/// Result type for provider operations
pub type Result<T> = std::result::Result<T, ProviderError>;

/// Errors that can occur when talking to an external provider
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("{provider} API error ({status}): {message}")]
    Api {
        provider: &'static str,
        status: u16,
        message: String,
    },

    #[error("{provider} request failed: {source}")]
    Transport {
        provider: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("{provider} returned no user")]
    MissingUser { provider: &'static str },

    #[error("Invalid {provider} configuration: {message}")]
    InvalidConfig { provider: &'static str, message: String },

    #[error(transparent)]
    Database(#[from] DbError),
}

impl ProviderError {
    pub fn provider(&self) -> &'static str {
        match self {
            ProviderError::Api { provider, .. }
            | ProviderError::Transport { provider, .. }
            | ProviderError::MissingUser { provider }
            | ProviderError::InvalidConfig { provider, .. } => provider,
            ProviderError::Database(_) => "database",
        }
    }

    pub(crate) fn transport(provider: &'static str) -> impl FnOnce(reqwest::Error) -> Self {
        move |source| ProviderError::Transport { provider, source }
    }
}

/// Turn a non-success response into [`ProviderError::Api`], keeping the body as the message.
pub(crate) async fn check_status(provider: &'static str, response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = response.text().await.unwrap_or_default();
    Err(ProviderError::Api {
        provider,
        status: status.as_u16(),
        message,
    })
}

/// Shared HTTP client for provider calls
pub(crate) fn http_client() -> Result<reqwest::Client> {
    // reqwest is built without a bundled crypto provider. Already installed when started via main.
    let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();

    reqwest::Client::builder()
        .user_agent(concat!("helpdesk/", env!("CARGO_PKG_VERSION")))
        .timeout(std::time::Duration::from_secs(30))
        .build()
        .map_err(ProviderError::transport("http"))
}

/// Join `path` onto a configured base URL, treating the base as a directory.
pub(crate) fn endpoint(provider: &'static str, base: &url::Url, path: &str) -> Result<url::Url> {
    let mut base = base.clone();
    if !base.path().ends_with('/') {
        base.set_path(&format!("{}/", base.path()));
    }
    base.join(path).map_err(|e| ProviderError::InvalidConfig {
        provider,
        message: e.to_string(),
    })
}
