//! API request/response models for users and organization members.

use super::Validate;
use crate::errors::{Error, Result};
use crate::types::UserId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Coarse per-user permission stored on the profile.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, ToSchema)]
#[sqlx(type_name = "user_permissions", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Permissions {
    Admin,
    #[default]
    Member,
}

/// Mailbox access classification of a member.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub enum UserRole {
    Core,
    NonCore,
    #[default]
    Afk,
}

/// Contents of the `user_profiles.access` JSON column.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, ToSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct MailboxAccess {
    pub role: UserRole,
    pub keywords: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl MailboxAccess {
    /// Merge a partial update into the stored access.
    ///
    /// Returns `None` when neither field is supplied, meaning access must be left untouched.
    /// Supplied values win, then the stored value, then the defaults.
    pub fn merged(current: Option<&MailboxAccess>, role: Option<UserRole>, keywords: Option<Vec<String>>, now: DateTime<Utc>) -> Option<Self> {
        if role.is_none() && keywords.is_none() {
            return None;
        }

        Some(Self {
            role: role.or_else(|| current.map(|a| a.role)).unwrap_or_default(),
            keywords: keywords.or_else(|| current.map(|a| a.keywords.clone())).unwrap_or_default(),
            updated_at: Some(now),
        })
    }
}

/// The authenticated caller, as established by the session token.
#[derive(Debug, Clone, PartialEq)]
pub struct CurrentUser {
    pub id: UserId,
    pub email: Option<String>,
}

/// Member entry returned by `organization.getMembers`
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MemberResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: UserId,
    pub display_name: String,
    pub email: Option<String>,
}

/// Body of `organization.addMember`
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AddMemberRequest {
    pub email: String,
    pub display_name: String,
    pub permissions: Option<Permissions>,
}

impl Validate for AddMemberRequest {
    fn validate(&self) -> Result<()> {
        self.email.parse::<lettre::Address>().map_err(|e| Error::BadRequest {
            message: format!("Invalid email address: {e}"),
        })?;
        Ok(())
    }
}

/// Body of `user.updateLastMailboxSlug`
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UpdateLastMailboxSlugRequest {
    pub slug: String,
}

impl Validate for UpdateLastMailboxSlugRequest {
    fn validate(&self) -> Result<()> {
        if self.slug.trim().is_empty() {
            return Err(Error::BadRequest {
                message: "Mailbox slug must not be empty".to_string(),
            });
        }
        Ok(())
    }
}

/// A member together with their mailbox access settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserWithMailboxAccess {
    #[schema(value_type = String, format = "uuid")]
    pub id: UserId,
    pub display_name: String,
    pub email: Option<String>,
    pub role: UserRole,
    pub keywords: Vec<String>,
    pub permissions: Permissions,
}

/// Response for `user.current`
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CurrentUserResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: UserId,
    pub email: Option<String>,
    pub display_name: String,
    pub first_name: String,
    pub has_display_name: bool,
    pub is_admin: bool,
}
