//! API request/response models for mailbox member procedures.

use super::Validate;
use crate::api::models::users::UserRole;
use crate::errors::{Error, Result};
use crate::types::UserId;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

/// Query string shared by the mailbox member procedures
#[derive(Debug, Clone, Deserialize, IntoParams, ToSchema)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query, rename_all = "camelCase")]
pub struct MailboxSlugQuery {
    pub mailbox_slug: String,
}

/// Body of `mailbox.members.update`
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MailboxMemberUpdate {
    pub mailbox_slug: String,
    #[schema(value_type = String, format = "uuid")]
    pub user_id: UserId,
    pub display_name: Option<String>,
    pub role: Option<UserRole>,
    pub keywords: Option<Vec<String>>,
}

impl Validate for MailboxMemberUpdate {
    fn validate(&self) -> Result<()> {
        if let Some(keywords) = &self.keywords
            && keywords.iter().any(|k| k.trim().is_empty())
        {
            return Err(Error::BadRequest {
                message: "Keywords must not be empty".to_string(),
            });
        }
        Ok(())
    }
}
