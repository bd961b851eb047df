//! Database models for accounts and profiles.

use crate::api::models::users::{MailboxAccess, Permissions};
use crate::types::UserId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An identity provider account (`auth.users`)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: UserId,
    pub email: Option<String>,
    pub user_metadata: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Linked third-party login (`auth.identities`)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Identity {
    pub id: uuid::Uuid,
    pub user_id: UserId,
    pub provider: String,
    pub provider_id: String,
}

/// Per-user extension record (`user_profiles`)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: UserId,
    pub display_name: Option<String>,
    pub permissions: Permissions,
    pub access: Option<MailboxAccess>,
    pub last_mailbox_slug: Option<String>,
    pub inviter_user_id: Option<UserId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Account joined with its (possibly missing) profile
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EnhancedUser {
    pub id: UserId,
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub permissions: Option<Permissions>,
    pub access: Option<MailboxAccess>,
}

/// Profile fields written when a member is invited
#[derive(Debug, Clone)]
pub struct InvitedProfileDBRequest {
    pub display_name: String,
    pub inviter_user_id: UserId,
    /// Only written when present; the column default covers `member`
    pub permissions: Option<Permissions>,
}

/// Profile fields written by a mailbox member update. `None` leaves the column unchanged.
#[derive(Debug, Clone, Default)]
pub struct MailboxDataUpdateDBRequest {
    pub display_name: Option<String>,
    pub access: Option<MailboxAccess>,
}
