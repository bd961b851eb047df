//! Database repository for accounts and profiles, plus the member operations built on it.

use crate::{
    api::models::users::{MailboxAccess, Permissions, UserRole, UserWithMailboxAccess},
    db::{
        errors::Result,
        models::users::{AuthUser, EnhancedUser, Identity, InvitedProfileDBRequest, MailboxDataUpdateDBRequest, UserProfile},
    },
    errors::Error,
    integrations::{identity::IdentityProvider, slack::SlackClient},
    types::{UserId, abbrev_uuid},
};
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgConnection, types::Json};
use tracing::{debug, instrument, warn};

// Database entity models
#[derive(Debug, Clone, FromRow)]
struct AuthUserRow {
    id: UserId,
    email: Option<String>,
    raw_user_meta_data: Option<serde_json::Value>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
struct ProfileRow {
    id: UserId,
    display_name: Option<String>,
    permissions: Permissions,
    access: Option<Json<MailboxAccess>>,
    last_mailbox_slug: Option<String>,
    inviter_user_id: Option<UserId>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
struct EnhancedUserRow {
    id: UserId,
    email: Option<String>,
    display_name: Option<String>,
    permissions: Option<Permissions>,
    access: Option<Json<MailboxAccess>>,
}

#[derive(Debug, Clone, FromRow)]
struct IdentityRow {
    id: uuid::Uuid,
    user_id: UserId,
    provider: String,
    provider_id: String,
}

impl From<AuthUserRow> for AuthUser {
    fn from(row: AuthUserRow) -> Self {
        Self {
            id: row.id,
            email: row.email,
            user_metadata: row.raw_user_meta_data,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

impl From<ProfileRow> for UserProfile {
    fn from(row: ProfileRow) -> Self {
        Self {
            id: row.id,
            display_name: row.display_name,
            permissions: row.permissions,
            access: row.access.map(|Json(access)| access),
            last_mailbox_slug: row.last_mailbox_slug,
            inviter_user_id: row.inviter_user_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

impl From<EnhancedUserRow> for EnhancedUser {
    fn from(row: EnhancedUserRow) -> Self {
        Self {
            id: row.id,
            email: row.email,
            display_name: row.display_name,
            permissions: row.permissions,
            access: row.access.map(|Json(access)| access),
        }
    }
}

impl From<IdentityRow> for Identity {
    fn from(row: IdentityRow) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            provider: row.provider,
            provider_id: row.provider_id,
        }
    }
}

const PROFILE_COLUMNS: &str = "id, display_name, permissions, access, last_mailbox_slug, inviter_user_id, created_at, updated_at";

pub struct Users<'c> {
    db: &'c mut PgConnection,
}

impl<'c> Users<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    #[instrument(skip(self), fields(user_id = %abbrev_uuid(&id)), err)]
    pub async fn get_user_by_id(&mut self, id: UserId) -> Result<Option<AuthUser>> {
        let user = sqlx::query_as::<_, AuthUserRow>(
            "SELECT id, email, raw_user_meta_data, created_at, updated_at FROM auth.users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&mut *self.db)
        .await?;

        Ok(user.map(AuthUser::from))
    }

    #[instrument(skip(self, email), err)]
    pub async fn get_user_by_email(&mut self, email: &str) -> Result<Option<AuthUser>> {
        let user = sqlx::query_as::<_, AuthUserRow>(
            "SELECT id, email, raw_user_meta_data, created_at, updated_at FROM auth.users WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&mut *self.db)
        .await?;

        Ok(user.map(AuthUser::from))
    }

    #[instrument(skip(self), fields(user_id = %abbrev_uuid(&id)), err)]
    pub async fn get_profile(&mut self, id: UserId) -> Result<Option<UserProfile>> {
        let profile = sqlx::query_as::<_, ProfileRow>(&format!("SELECT {PROFILE_COLUMNS} FROM user_profiles WHERE id = $1"))
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(profile.map(UserProfile::from))
    }

    /// Account plus profile fields. `None` when the account does not exist.
    #[instrument(skip(self), fields(user_id = %abbrev_uuid(&id)), err)]
    pub async fn get_enhanced_user(&mut self, id: UserId) -> Result<Option<EnhancedUser>> {
        let user = sqlx::query_as::<_, EnhancedUserRow>(
            r#"
            SELECT u.id, u.email, p.display_name, p.permissions, p.access
            FROM auth.users u
            LEFT JOIN user_profiles p ON p.id = u.id
            WHERE u.id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *self.db)
        .await?;

        Ok(user.map(EnhancedUser::from))
    }

    /// Every account with its profile, oldest account first (ties by id)
    #[instrument(skip(self), err)]
    pub async fn list_members(&mut self) -> Result<Vec<EnhancedUser>> {
        let users = sqlx::query_as::<_, EnhancedUserRow>(
            r#"
            SELECT u.id, u.email, p.display_name, p.permissions, p.access
            FROM auth.users u
            LEFT JOIN user_profiles p ON p.id = u.id
            ORDER BY u.created_at, u.id
            "#,
        )
        .fetch_all(&mut *self.db)
        .await?;

        Ok(users.into_iter().map(EnhancedUser::from).collect())
    }

    #[instrument(skip(self), fields(user_id = %abbrev_uuid(&user_id)), err)]
    pub async fn identities_for_user(&mut self, user_id: UserId) -> Result<Vec<Identity>> {
        let identities = sqlx::query_as::<_, IdentityRow>(
            "SELECT id, user_id, provider, provider_id FROM auth.identities WHERE user_id = $1 ORDER BY provider, provider_id",
        )
        .bind(user_id)
        .fetch_all(&mut *self.db)
        .await?;

        Ok(identities.into_iter().map(Identity::from).collect())
    }

    /// Write the invitation fields in a single statement, creating the profile if needed.
    #[instrument(skip(self, request), fields(user_id = %abbrev_uuid(&user_id)), err)]
    pub async fn save_invited_profile(&mut self, user_id: UserId, request: &InvitedProfileDBRequest) -> Result<UserProfile> {
        let profile = sqlx::query_as::<_, ProfileRow>(&format!(
            r#"
            INSERT INTO user_profiles (id, display_name, inviter_user_id, permissions)
            VALUES ($1, $2, $3, COALESCE($4, 'member'::user_permissions))
            ON CONFLICT (id) DO UPDATE SET
                display_name = EXCLUDED.display_name,
                inviter_user_id = EXCLUDED.inviter_user_id,
                permissions = COALESCE($4, user_profiles.permissions),
                updated_at = NOW()
            RETURNING {PROFILE_COLUMNS}
            "#
        ))
        .bind(user_id)
        .bind(&request.display_name)
        .bind(request.inviter_user_id)
        .bind(request.permissions)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(profile.into())
    }

    /// Apply a mailbox member update. Fields left as `None` keep their stored value.
    #[instrument(skip(self, request), fields(user_id = %abbrev_uuid(&user_id)), err)]
    pub async fn update_mailbox_data(&mut self, user_id: UserId, request: &MailboxDataUpdateDBRequest) -> Result<UserProfile> {
        let profile = sqlx::query_as::<_, ProfileRow>(&format!(
            r#"
            INSERT INTO user_profiles (id, display_name, access)
            VALUES ($1, $2, $3)
            ON CONFLICT (id) DO UPDATE SET
                display_name = COALESCE($2, user_profiles.display_name),
                access = COALESCE($3, user_profiles.access),
                updated_at = NOW()
            RETURNING {PROFILE_COLUMNS}
            "#
        ))
        .bind(user_id)
        .bind(request.display_name.as_deref())
        .bind(request.access.as_ref().map(Json))
        .fetch_one(&mut *self.db)
        .await?;

        Ok(profile.into())
    }

    #[instrument(skip(self, slug), fields(user_id = %abbrev_uuid(&user_id)), err)]
    pub async fn set_last_mailbox_slug(&mut self, user_id: UserId, slug: &str) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO user_profiles (id, last_mailbox_slug)
            VALUES ($1, $2)
            ON CONFLICT (id) DO UPDATE SET
                last_mailbox_slug = EXCLUDED.last_mailbox_slug,
                updated_at = NOW()
            "#,
        )
        .bind(user_id)
        .bind(slug)
        .execute(&mut *self.db)
        .await?;

        Ok(())
    }
}

/// Field changes accepted by [`update_user_mailbox_data`]
#[derive(Debug, Clone, Default)]
pub struct MailboxDataUpdate {
    pub display_name: Option<String>,
    pub role: Option<UserRole>,
    pub keywords: Option<Vec<String>>,
}

/// Create an account with the identity provider and record who invited it.
///
/// Permissions are only written when they differ from the default.
#[instrument(skip(identity, db, email, display_name), fields(inviter = %abbrev_uuid(&inviter)), err)]
pub async fn add_user(
    identity: &dyn IdentityProvider,
    db: &mut PgConnection,
    inviter: UserId,
    email: &str,
    display_name: &str,
    permissions: Option<Permissions>,
) -> crate::errors::Result<UserProfile> {
    let created = identity.create_user(email, serde_json::json!({})).await?;
    debug!("Created account {} for invited member", abbrev_uuid(&created.id));

    let request = InvitedProfileDBRequest {
        display_name: display_name.to_string(),
        inviter_user_id: inviter,
        permissions: permissions.filter(|p| *p != Permissions::Member),
    };
    Ok(Users::new(db).save_invited_profile(created.id, &request).await?)
}

/// All accounts with their mailbox access, defaults filled in.
#[instrument(skip(db), err)]
pub async fn get_users_with_mailbox_access(db: &mut PgConnection) -> Result<Vec<UserWithMailboxAccess>> {
    let members = Users::new(db).list_members().await?;

    Ok(members
        .into_iter()
        .map(|user| {
            let access = user.access.unwrap_or_default();
            UserWithMailboxAccess {
                id: user.id,
                display_name: user.display_name.unwrap_or_default(),
                email: user.email,
                role: access.role,
                keywords: access.keywords,
                permissions: user.permissions.unwrap_or_default(),
            }
        })
        .collect())
}

/// Update a member's display name and/or mailbox access.
///
/// Access is only rewritten (and its `updatedAt` stamped) when a role or keywords are given.
#[instrument(skip(db, updates), fields(user_id = %abbrev_uuid(&user_id)), err)]
pub async fn update_user_mailbox_data(
    db: &mut PgConnection,
    user_id: UserId,
    updates: MailboxDataUpdate,
) -> crate::errors::Result<UserWithMailboxAccess> {
    let mut repo = Users::new(db);
    let user = repo.get_enhanced_user(user_id).await?.ok_or_else(|| Error::NotFound {
        resource: "User".to_string(),
        id: user_id.to_string(),
    })?;

    let access = MailboxAccess::merged(user.access.as_ref(), updates.role, updates.keywords, Utc::now());
    let request = MailboxDataUpdateDBRequest {
        display_name: updates.display_name,
        access,
    };
    let profile = repo.update_mailbox_data(user_id, &request).await?;

    let access = profile.access.unwrap_or_default();
    Ok(UserWithMailboxAccess {
        id: user.id,
        display_name: profile.display_name.unwrap_or_default(),
        email: user.email,
        role: access.role,
        keywords: access.keywords,
        permissions: profile.permissions,
    })
}

/// Resolve a Slack user to an account by email.
///
/// Slack failures and unmatched users yield `None`; database errors propagate.
#[instrument(skip(slack, db, token), err)]
pub async fn find_user_via_slack(
    slack: &dyn SlackClient,
    db: &mut PgConnection,
    token: &str,
    slack_user_id: &str,
) -> Result<Option<AuthUser>> {
    let slack_user = match slack.get_user(token, slack_user_id).await {
        Ok(Some(user)) => user,
        Ok(None) => return Ok(None),
        Err(e) => {
            warn!("Slack user lookup failed: {}", e);
            return Ok(None);
        }
    };

    let Some(email) = slack_user.profile.email.filter(|e| !e.is_empty()) else {
        return Ok(None);
    };

    Users::new(db).get_user_by_email(&email).await
}
