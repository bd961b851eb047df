//! Request-scoped memoization of profile and identity lookups.
//!
//! A handler and its extractors often need the same profile several times while serving one
//! request. [`RequestContext`] caches those reads for the lifetime of the request only, so a
//! write in one request is always visible to the next. The context is stored in the request
//! extensions, and every extractor of the same request shares one instance.

use crate::{
    AppState,
    db::{
        errors::Result,
        handlers::users::{self, Users},
        models::users::{AuthUser, EnhancedUser, UserProfile},
    },
    integrations::slack::SlackClient,
    types::{UserId, abbrev_uuid},
};
use axum::{extract::FromRequestParts, http::request::Parts};
use dashmap::DashMap;
use sqlx::PgPool;
use std::{convert::Infallible, sync::Arc};
use tracing::trace;

#[derive(Clone)]
pub struct RequestContext {
    inner: Arc<Inner>,
}

struct Inner {
    db: PgPool,
    slack: Arc<dyn SlackClient>,
    profiles: DashMap<UserId, Option<UserProfile>>,
    enhanced_users: DashMap<UserId, Option<EnhancedUser>>,
    slack_users: DashMap<(String, String), Option<AuthUser>>,
}

impl RequestContext {
    pub fn new(db: PgPool, slack: Arc<dyn SlackClient>) -> Self {
        Self {
            inner: Arc::new(Inner {
                db,
                slack,
                profiles: DashMap::new(),
                enhanced_users: DashMap::new(),
                slack_users: DashMap::new(),
            }),
        }
    }

    pub async fn profile(&self, user_id: UserId) -> Result<Option<UserProfile>> {
        if let Some(cached) = self.inner.profiles.get(&user_id) {
            trace!("Profile cache hit for {}", abbrev_uuid(&user_id));
            return Ok(cached.clone());
        }

        let mut conn = self.inner.db.acquire().await?;
        let profile = Users::new(&mut conn).get_profile(user_id).await?;
        self.inner.profiles.insert(user_id, profile.clone());
        Ok(profile)
    }

    pub async fn enhanced_user(&self, user_id: UserId) -> Result<Option<EnhancedUser>> {
        if let Some(cached) = self.inner.enhanced_users.get(&user_id) {
            trace!("Enhanced user cache hit for {}", abbrev_uuid(&user_id));
            return Ok(cached.clone());
        }

        let mut conn = self.inner.db.acquire().await?;
        let user = Users::new(&mut conn).get_enhanced_user(user_id).await?;
        self.inner.enhanced_users.insert(user_id, user.clone());
        Ok(user)
    }

    pub async fn find_user_via_slack(&self, token: &str, slack_user_id: &str) -> Result<Option<AuthUser>> {
        let key = (token.to_string(), slack_user_id.to_string());
        if let Some(cached) = self.inner.slack_users.get(&key) {
            return Ok(cached.clone());
        }

        let mut conn = self.inner.db.acquire().await?;
        let user = users::find_user_via_slack(self.inner.slack.as_ref(), &mut conn, token, slack_user_id).await?;
        self.inner.slack_users.insert(key, user.clone());
        Ok(user)
    }

    /// Drop cached reads for a user after writing to their profile.
    pub fn invalidate(&self, user_id: UserId) {
        self.inner.profiles.remove(&user_id);
        self.inner.enhanced_users.remove(&user_id);
    }
}

impl FromRequestParts<AppState> for RequestContext {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> std::result::Result<Self, Self::Rejection> {
        if let Some(context) = parts.extensions.get::<RequestContext>() {
            return Ok(context.clone());
        }

        let context = RequestContext::new(state.db.clone(), state.slack.clone());
        parts.extensions.insert(context.clone());
        Ok(context)
    }
}
