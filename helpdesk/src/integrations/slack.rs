//! Slack Web API client used to map Slack users onto accounts.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::instrument;
use url::Url;

use super::{ProviderError, Result, check_status, endpoint, http_client};
use crate::config::SlackConfig;

const PROVIDER: &str = "slack";

/// Create a Slack client from configuration
pub fn create_client(config: &SlackConfig) -> Result<Box<dyn SlackClient>> {
    match config {
        SlackConfig::Disabled => Ok(Box::new(DisabledSlackClient)),
        SlackConfig::Http { api_url } => Ok(Box::new(HttpSlackClient::new(api_url.clone())?)),
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct SlackUser {
    pub id: String,
    #[serde(default)]
    pub profile: SlackProfile,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct SlackProfile {
    pub email: Option<String>,
    pub real_name: Option<String>,
}

#[async_trait]
pub trait SlackClient: Send + Sync {
    /// Look up a Slack user with the workspace bot token. `Ok(None)` when Slack has no such user.
    async fn get_user(&self, token: &str, slack_user_id: &str) -> Result<Option<SlackUser>>;
}

pub struct HttpSlackClient {
    client: reqwest::Client,
    api_url: Url,
}

impl HttpSlackClient {
    pub fn new(api_url: Url) -> Result<Self> {
        Ok(Self {
            client: http_client()?,
            api_url,
        })
    }
}

#[derive(Debug, Deserialize)]
struct UsersInfoResponse {
    ok: bool,
    #[serde(default)]
    user: Option<SlackUser>,
    #[serde(default)]
    error: Option<String>,
}

#[async_trait]
impl SlackClient for HttpSlackClient {
    #[instrument(skip(self, token), err)]
    async fn get_user(&self, token: &str, slack_user_id: &str) -> Result<Option<SlackUser>> {
        let url = endpoint(PROVIDER, &self.api_url, "users.info")?;

        let response = self
            .client
            .get(url)
            .bearer_auth(token)
            .query(&[("user", slack_user_id)])
            .send()
            .await
            .map_err(ProviderError::transport(PROVIDER))?;

        // Slack reports most failures as 200 with `ok: false`
        let body: UsersInfoResponse = check_status(PROVIDER, response)
            .await?
            .json()
            .await
            .map_err(ProviderError::transport(PROVIDER))?;

        match body {
            UsersInfoResponse { ok: true, user, .. } => Ok(user),
            UsersInfoResponse { error, .. } if error.as_deref() == Some("user_not_found") => Ok(None),
            UsersInfoResponse { error, .. } => Err(ProviderError::Api {
                provider: PROVIDER,
                status: 200,
                message: error.unwrap_or_else(|| "unknown error".to_string()),
            }),
        }
    }
}

/// Used when no Slack app is configured
pub struct DisabledSlackClient;

#[async_trait]
impl SlackClient for DisabledSlackClient {
    async fn get_user(&self, _token: &str, _slack_user_id: &str) -> Result<Option<SlackUser>> {
        Err(ProviderError::InvalidConfig {
            provider: PROVIDER,
            message: "Slack integration is not configured".to_string(),
        })
    }
}
