//! Typed client for the procedure API, and the last-visited mailbox hook.
//!
//! [`LatestMailboxSlugSaver`] is fed the current mailbox slug every time the client's view
//! changes. It persists each distinct new slug exactly once, in the background, so the next
//! visit can reopen the same mailbox.

use crate::{
    api::models::users::{AddMemberRequest, MemberResponse, UpdateLastMailboxSlugRequest},
    integrations::{ProviderError, Result, check_status, endpoint, http_client},
};
use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use tokio::{sync::oneshot, task::JoinHandle};
use tracing::{debug, instrument, warn};
use url::Url;

const PROVIDER: &str = "helpdesk";

/// Procedure client authenticated with a session token
pub struct RpcClient {
    client: reqwest::Client,
    base_url: Url,
    cookie: String,
}

impl RpcClient {
    pub fn new(base_url: Url, cookie_name: &str, session_token: &str) -> Result<Self> {
        Ok(Self {
            client: http_client()?,
            base_url,
            cookie: format!("{cookie_name}={session_token}"),
        })
    }

    fn procedure(&self, name: &str) -> Result<Url> {
        endpoint(PROVIDER, &self.base_url, &format!("api/rpc/{name}"))
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<reqwest::Response> {
        let response = request
            .header(reqwest::header::COOKIE, &self.cookie)
            .send()
            .await
            .map_err(ProviderError::transport(PROVIDER))?;
        check_status(PROVIDER, response).await
    }

    #[instrument(skip(self), err)]
    pub async fn get_members(&self) -> Result<Vec<MemberResponse>> {
        let url = self.procedure("organization.getMembers")?;
        self.send(self.client.get(url))
            .await?
            .json()
            .await
            .map_err(ProviderError::transport(PROVIDER))
    }

    #[instrument(skip(self, request), err)]
    pub async fn add_member(&self, request: &AddMemberRequest) -> Result<()> {
        let url = self.procedure("organization.addMember")?;
        self.send(self.client.post(url).json(request)).await?;
        Ok(())
    }

    #[instrument(skip(self), err)]
    pub async fn update_last_mailbox_slug(&self, slug: &str) -> Result<()> {
        let url = self.procedure("user.updateLastMailboxSlug")?;
        let body = UpdateLastMailboxSlugRequest { slug: slug.to_string() };
        self.send(self.client.post(url).json(&body)).await?;
        Ok(())
    }
}

/// Where the last visited mailbox slug is persisted
#[async_trait]
pub trait LastMailboxSlugStore: Send + Sync + 'static {
    async fn save(&self, slug: &str) -> Result<()>;
}

#[async_trait]
impl LastMailboxSlugStore for RpcClient {
    async fn save(&self, slug: &str) -> Result<()> {
        self.update_last_mailbox_slug(slug).await
    }
}

#[derive(Default)]
struct SaverState {
    last_slug: Option<String>,
    /// Completes when the most recently spawned save has finished
    previous: Option<oneshot::Receiver<()>>,
}

/// Persists each distinct new mailbox slug once, fire-and-forget.
///
/// Saves run on the tokio runtime in the order the slugs were observed.
pub struct LatestMailboxSlugSaver<S: LastMailboxSlugStore> {
    store: Arc<S>,
    state: Mutex<SaverState>,
}

impl<S: LastMailboxSlugStore> LatestMailboxSlugSaver<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            state: Mutex::new(SaverState::default()),
        }
    }

    /// Record the slug currently shown. Returns the background save, if one was started.
    ///
    /// Must be called from within a tokio runtime.
    pub fn observe(&self, slug: Option<&str>) -> Option<JoinHandle<()>> {
        let slug = slug.filter(|s| !s.is_empty())?;

        let (previous, done) = {
            let mut state = self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            if state.last_slug.as_deref() == Some(slug) {
                return None;
            }
            state.last_slug = Some(slug.to_string());

            let (done_tx, done_rx) = oneshot::channel();
            (state.previous.replace(done_rx), done_tx)
        };

        let store = self.store.clone();
        let slug = slug.to_string();
        Some(tokio::spawn(async move {
            if let Some(previous) = previous {
                // A dropped sender means the earlier save panicked; carry on regardless
                let _ = previous.await;
            }
            match store.save(&slug).await {
                Ok(()) => debug!("Saved last mailbox slug '{}'", slug),
                Err(e) => warn!("Failed to save last mailbox slug '{}': {}", slug, e),
            }
            let _ = done.send(());
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::models::users::Permissions;
    use serde_json::json;
    use std::time::Duration;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[derive(Default)]
    struct RecordingStore {
        saved: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl LastMailboxSlugStore for RecordingStore {
        async fn save(&self, slug: &str) -> Result<()> {
            // The first save is slow so that out-of-order execution would show up
            let first = self.saved.lock().unwrap().is_empty();
            if first {
                tokio::time::sleep(Duration::from_millis(50)).await;
            }
            self.saved.lock().unwrap().push(slug.to_string());
            Ok(())
        }
    }

    async fn wait(handle: Option<JoinHandle<()>>) {
        if let Some(handle) = handle {
            handle.await.unwrap();
        }
    }

    #[tokio::test]
    async fn test_same_slug_saved_once() {
        let store = Arc::new(RecordingStore::default());
        let saver = LatestMailboxSlugSaver::new(store.clone());

        let first = saver.observe(Some("support"));
        let second = saver.observe(Some("support"));
        assert!(first.is_some());
        assert!(second.is_none());

        wait(first).await;
        assert_eq!(*store.saved.lock().unwrap(), vec!["support".to_string()]);
    }

    #[tokio::test]
    async fn test_distinct_slugs_saved_in_order() {
        let store = Arc::new(RecordingStore::default());
        let saver = LatestMailboxSlugSaver::new(store.clone());

        let first = saver.observe(Some("support"));
        let second = saver.observe(Some("sales"));
        wait(second).await;
        wait(first).await;

        assert_eq!(*store.saved.lock().unwrap(), vec!["support".to_string(), "sales".to_string()]);
    }

    #[tokio::test]
    async fn test_none_never_saves() {
        let store = Arc::new(RecordingStore::default());
        let saver = LatestMailboxSlugSaver::new(store.clone());

        assert!(saver.observe(None).is_none());
        assert!(saver.observe(Some("")).is_none());
        wait(saver.observe(Some("support"))).await;
        assert!(saver.observe(None).is_none());
        // Returning to the same mailbox after no mailbox is not a change
        assert!(saver.observe(Some("support")).is_none());

        assert_eq!(store.saved.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_switching_back_saves_again() {
        let store = Arc::new(RecordingStore::default());
        let saver = LatestMailboxSlugSaver::new(store.clone());

        let handles = vec![
            saver.observe(Some("support")),
            saver.observe(Some("sales")),
            saver.observe(Some("support")),
        ];
        for handle in handles {
            wait(handle).await;
        }

        assert_eq!(
            *store.saved.lock().unwrap(),
            vec!["support".to_string(), "sales".to_string(), "support".to_string()]
        );
    }

    fn client_for(server: &MockServer) -> RpcClient {
        RpcClient::new(server.uri().parse().unwrap(), "sb-access-token", "jwt").unwrap()
    }

    #[tokio::test]
    async fn test_get_members() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/rpc/organization.getMembers"))
            .and(header("cookie", "sb-access-token=jwt"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                { "id": "550e8400-e29b-41d4-a716-446655440000", "displayName": "Test User", "email": "root@example.com" }
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let members = client_for(&server).get_members().await.unwrap();
        assert_eq!(members.len(), 1);
        assert_eq!(members[0].display_name, "Test User");
    }

    #[tokio::test]
    async fn test_add_member() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/rpc/organization.addMember"))
            .and(body_json(json!({ "email": "new@example.com", "displayName": "New", "permissions": "admin" })))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        client_for(&server)
            .add_member(&AddMemberRequest {
                email: "new@example.com".to_string(),
                display_name: "New".to_string(),
                permissions: Some(Permissions::Admin),
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_rpc_client_as_slug_store() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/rpc/user.updateLastMailboxSlug"))
            .and(body_json(json!({ "slug": "support" })))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let saver = LatestMailboxSlugSaver::new(Arc::new(client_for(&server)));
        wait(saver.observe(Some("support"))).await;
        assert!(saver.observe(Some("support")).is_none());
    }

    #[tokio::test]
    async fn test_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/rpc/organization.getMembers"))
            .respond_with(ResponseTemplate::new(401).set_body_string("Authentication required"))
            .mount(&server)
            .await;

        let err = client_for(&server).get_members().await.unwrap_err();
        assert!(matches!(err, ProviderError::Api { status: 401, ref message, .. } if message == "Authentication required"));
    }
}
