//! Test utilities: configuration, fixtures and in-process provider fakes.

use crate::{
    AppState,
    api::models::users::{CurrentUser, Permissions},
    auth::session::create_session_token,
    config::{Config, IdentityConfig, PoolSettings},
    db::{
        handlers::Mailboxes,
        models::{mailboxes::MailboxCreateDBRequest, mailboxes::MailboxDBResponse, users::AuthUser},
    },
    integrations::{
        ProviderError,
        github::{GitHubClient, Repository},
        identity::DatabaseIdentityProvider,
        slack::{SlackClient, SlackUser},
    },
    types::{MailboxId, UserId},
};
use async_trait::async_trait;
use axum_test::TestServer;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use std::sync::{
    Arc, Mutex,
    atomic::{AtomicUsize, Ordering},
};

pub fn create_test_config() -> Config {
    Config {
        host: "127.0.0.1".to_string(),
        port: 0,
        base_url: "http://localhost:3000".to_string(),
        database: crate::config::DatabaseConfig {
            // Will get overriden by the test pool
            url: "Something".to_string(),
            pool: PoolSettings {
                max_connections: 1,
                min_connections: 0,
                ..Default::default()
            },
        },
        secret_key: Some("test-secret-key-for-testing-only".to_string()),
        identity: IdentityConfig::Database,
        ..Default::default()
    }
}

/// Build a test server with no repositories visible to any GitHub installation
pub fn create_test_app(pool: PgPool) -> TestServer {
    create_test_app_with_github(pool, StaticGitHubClient::default())
}

pub fn create_test_app_with_github(pool: PgPool, github: impl GitHubClient + 'static) -> TestServer {
    let state = create_test_state(pool, Arc::new(github));
    let router = crate::build_router(state).expect("Failed to build router");
    TestServer::new(router).expect("Failed to create test server")
}

pub fn create_test_state(pool: PgPool, github: Arc<dyn GitHubClient>) -> AppState {
    AppState::builder()
        .identity(Arc::new(DatabaseIdentityProvider::new(pool.clone())))
        .db(pool)
        .config(create_test_config())
        .github(github)
        .slack(Arc::new(StaticSlackClient::default()))
        .build()
}

/// Insert an account directly. The profile row is created by the database trigger.
pub async fn create_test_user(pool: &PgPool, email: &str) -> AuthUser {
    let id: UserId = sqlx::query_scalar("INSERT INTO auth.users (email) VALUES ($1) RETURNING id")
        .bind(email)
        .fetch_one(pool)
        .await
        .expect("Failed to create test user");

    let mut conn = pool.acquire().await.expect("Failed to acquire connection");
    crate::db::handlers::Users::new(&mut conn)
        .get_user_by_id(id)
        .await
        .expect("Failed to load test user")
        .expect("Test user missing")
}

pub async fn create_test_user_with_profile(pool: &PgPool, email: &str, display_name: Option<&str>) -> AuthUser {
    let user = create_test_user(pool, email).await;
    sqlx::query("UPDATE user_profiles SET display_name = $2 WHERE id = $1")
        .bind(user.id)
        .bind(display_name)
        .execute(pool)
        .await
        .expect("Failed to set display name");
    user
}

pub async fn create_test_admin_user(pool: &PgPool, email: &str) -> AuthUser {
    let user = create_test_user_with_profile(pool, email, Some("Test Admin User")).await;
    sqlx::query("UPDATE user_profiles SET permissions = $2 WHERE id = $1")
        .bind(user.id)
        .bind(Permissions::Admin)
        .execute(pool)
        .await
        .expect("Failed to grant admin");
    user
}

pub async fn set_last_mailbox_slug(pool: &PgPool, user_id: UserId, slug: &str) {
    let mut conn = pool.acquire().await.expect("Failed to acquire connection");
    crate::db::handlers::Users::new(&mut conn)
        .set_last_mailbox_slug(user_id, slug)
        .await
        .expect("Failed to set last mailbox slug");
}

pub async fn create_test_mailbox(pool: &PgPool, slug: &str) -> MailboxDBResponse {
    let mut conn = pool.acquire().await.expect("Failed to acquire connection");
    Mailboxes::new(&mut conn)
        .create(&MailboxCreateDBRequest {
            name: format!("Mailbox {slug}"),
            slug: slug.to_string(),
        })
        .await
        .expect("Failed to create test mailbox")
}

async fn add_message(pool: &PgPool, mailbox_id: MailboxId, user_id: UserId, role: &str, created_at: DateTime<Utc>) {
    let conversation_id: i64 = sqlx::query_scalar("INSERT INTO conversations (mailbox_id, subject) VALUES ($1, 'Test') RETURNING id")
        .bind(mailbox_id)
        .fetch_one(pool)
        .await
        .expect("Failed to create conversation");

    sqlx::query(
        "INSERT INTO conversation_messages (conversation_id, role, user_id, body, created_at) VALUES ($1, $2::message_role, $3, 'Hello', $4)",
    )
    .bind(conversation_id)
    .bind(role)
    .bind(user_id)
    .bind(created_at)
    .execute(pool)
    .await
    .expect("Failed to create message");
}

/// A reply written by `user_id` in a new conversation of the mailbox
pub async fn add_staff_message(pool: &PgPool, mailbox_id: MailboxId, user_id: UserId, created_at: DateTime<Utc>) {
    add_message(pool, mailbox_id, user_id, "staff", created_at).await;
}

pub async fn add_user_message(pool: &PgPool, mailbox_id: MailboxId, user_id: UserId, created_at: DateTime<Utc>) {
    add_message(pool, mailbox_id, user_id, "user", created_at).await;
}

/// Session cookie header for `user`, signed with the test secret
pub fn auth_cookie(user: &AuthUser) -> (String, String) {
    let config = create_test_config();
    let token = create_session_token(
        &CurrentUser {
            id: user.id,
            email: user.email.clone(),
        },
        &config,
    )
    .expect("Failed to create session token");
    ("cookie".to_string(), format!("{}={}", config.auth.session.cookie_name, token))
}

/// Slack fake answering from a fixed user list
#[derive(Default)]
pub struct StaticSlackClient {
    users: Vec<SlackUser>,
    failure: Option<String>,
    calls: Arc<AtomicUsize>,
}

impl StaticSlackClient {
    pub fn with_users(users: Vec<SlackUser>) -> Self {
        Self {
            users,
            ..Default::default()
        }
    }

    /// Every lookup fails with a Slack API error carrying `message`
    pub fn failing(message: &str) -> Self {
        Self {
            failure: Some(message.to_string()),
            ..Default::default()
        }
    }

    pub fn calls(&self) -> Arc<AtomicUsize> {
        self.calls.clone()
    }
}

#[async_trait]
impl SlackClient for StaticSlackClient {
    async fn get_user(&self, _token: &str, slack_user_id: &str) -> Result<Option<SlackUser>, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(message) = &self.failure {
            return Err(ProviderError::Api {
                provider: "slack",
                status: 200,
                message: message.clone(),
            });
        }
        Ok(self.users.iter().find(|u| u.id == slack_user_id).cloned())
    }
}

/// GitHub fake returning a fixed repository list, recording the installation ids it was asked for
#[derive(Default, Clone)]
pub struct StaticGitHubClient {
    repositories: Vec<Repository>,
    failure: Option<String>,
    requested: Arc<Mutex<Vec<String>>>,
}

impl StaticGitHubClient {
    pub fn with_repositories(repositories: Vec<Repository>) -> Self {
        Self {
            repositories,
            ..Default::default()
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            failure: Some(message.to_string()),
            ..Default::default()
        }
    }

    pub fn requested(&self) -> Vec<String> {
        self.requested.lock().expect("lock poisoned").clone()
    }
}

#[async_trait]
impl GitHubClient for StaticGitHubClient {
    async fn list_installation_repositories(&self, installation_id: &str) -> Result<Vec<Repository>, ProviderError> {
        self.requested.lock().expect("lock poisoned").push(installation_id.to_string());
        if let Some(message) = &self.failure {
            return Err(ProviderError::Api {
                provider: "github",
                status: 502,
                message: message.clone(),
            });
        }
        Ok(self.repositories.clone())
    }
}

pub fn test_repository(id: i64) -> Repository {
    Repository {
        id,
        name: format!("repo-{id}"),
        full_name: format!("acme/repo-{id}"),
        private: false,
    }
}
