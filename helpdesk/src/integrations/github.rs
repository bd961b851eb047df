//! GitHub App client.
//!
//! Requests are made as an app installation: a short-lived RS256 JWT signed with the app's
//! private key is exchanged for an installation access token, which then authorizes the
//! installation-scoped endpoints.

use async_trait::async_trait;
use chrono::Utc;
use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};
use url::Url;

use super::{ProviderError, Result, check_status, endpoint, http_client};
use crate::config::GitHubConfig;

const PROVIDER: &str = "github";
const PAGE_SIZE: usize = 100;

/// Create a GitHub client from configuration
pub fn create_client(config: &GitHubConfig) -> Result<Box<dyn GitHubClient>> {
    match config {
        GitHubConfig::Disabled => Ok(Box::new(DisabledGitHubClient)),
        GitHubConfig::Http {
            api_url,
            app_id,
            private_key,
        } => Ok(Box::new(HttpGitHubClient::new(api_url.clone(), app_id.clone(), private_key)?)),
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Repository {
    pub id: i64,
    pub name: String,
    pub full_name: String,
    #[serde(default)]
    pub private: bool,
}

#[async_trait]
pub trait GitHubClient: Send + Sync {
    /// All repositories the installation has been granted access to
    async fn list_installation_repositories(&self, installation_id: &str) -> Result<Vec<Repository>>;
}

/// JWT claims identifying the GitHub App itself
#[derive(Debug, Serialize, Deserialize)]
struct AppClaims {
    iat: i64,
    exp: i64,
    iss: String,
}

#[derive(Debug, Deserialize)]
struct InstallationToken {
    token: String,
}

#[derive(Debug, Deserialize)]
struct RepositoriesPage {
    total_count: usize,
    repositories: Vec<Repository>,
}

pub struct HttpGitHubClient {
    client: reqwest::Client,
    api_url: Url,
    app_id: String,
    encoding_key: EncodingKey,
}

impl HttpGitHubClient {
    pub fn new(api_url: Url, app_id: String, private_key_pem: &str) -> Result<Self> {
        let encoding_key = EncodingKey::from_rsa_pem(private_key_pem.as_bytes()).map_err(|e| ProviderError::InvalidConfig {
            provider: PROVIDER,
            message: format!("private key: {e}"),
        })?;

        Ok(Self {
            client: http_client()?,
            api_url,
            app_id,
            encoding_key,
        })
    }

    /// Sign an app JWT. Issued 60 seconds in the past to tolerate clock drift, valid for
    /// GitHub's maximum of 10 minutes from issue.
    fn app_jwt(&self) -> Result<String> {
        let now = Utc::now().timestamp();
        let claims = AppClaims {
            iat: now - 60,
            exp: now + 540,
            iss: self.app_id.clone(),
        };
        encode(&Header::new(Algorithm::RS256), &claims, &self.encoding_key).map_err(|e| ProviderError::InvalidConfig {
            provider: PROVIDER,
            message: format!("sign app JWT: {e}"),
        })
    }

    fn github_request(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        request
            .header(reqwest::header::ACCEPT, "application/vnd.github+json")
            .header("X-GitHub-Api-Version", "2022-11-28")
    }

    #[instrument(skip(self), err)]
    async fn installation_token(&self, installation_id: &str) -> Result<String> {
        if installation_id.is_empty() || !installation_id.chars().all(|c| c.is_ascii_digit()) {
            return Err(ProviderError::Api {
                provider: PROVIDER,
                status: 400,
                message: format!("invalid installation id '{installation_id}'"),
            });
        }

        let url = endpoint(PROVIDER, &self.api_url, &format!("app/installations/{installation_id}/access_tokens"))?;
        let response = self
            .github_request(self.client.post(url))
            .bearer_auth(self.app_jwt()?)
            .send()
            .await
            .map_err(ProviderError::transport(PROVIDER))?;

        let token: InstallationToken = check_status(PROVIDER, response)
            .await?
            .json()
            .await
            .map_err(ProviderError::transport(PROVIDER))?;
        Ok(token.token)
    }
}

#[async_trait]
impl GitHubClient for HttpGitHubClient {
    #[instrument(skip(self), err)]
    async fn list_installation_repositories(&self, installation_id: &str) -> Result<Vec<Repository>> {
        let token = self.installation_token(installation_id).await?;
        let url = endpoint(PROVIDER, &self.api_url, "installation/repositories")?;

        let mut repositories = Vec::new();
        let mut page = 1;
        loop {
            let response = self
                .github_request(self.client.get(url.clone()))
                .bearer_auth(&token)
                .query(&[("per_page", PAGE_SIZE.to_string()), ("page", page.to_string())])
                .send()
                .await
                .map_err(ProviderError::transport(PROVIDER))?;

            let body: RepositoriesPage = check_status(PROVIDER, response)
                .await?
                .json()
                .await
                .map_err(ProviderError::transport(PROVIDER))?;

            let fetched = body.repositories.len();
            repositories.extend(body.repositories);
            if fetched < PAGE_SIZE || repositories.len() >= body.total_count {
                break;
            }
            page += 1;
        }

        debug!("Installation {} has {} repositories", installation_id, repositories.len());
        Ok(repositories)
    }
}

/// Used when no GitHub App is configured
pub struct DisabledGitHubClient;

#[async_trait]
impl GitHubClient for DisabledGitHubClient {
    async fn list_installation_repositories(&self, _installation_id: &str) -> Result<Vec<Repository>> {
        Err(ProviderError::InvalidConfig {
            provider: PROVIDER,
            message: "GitHub integration is not configured".to_string(),
        })
    }
}
