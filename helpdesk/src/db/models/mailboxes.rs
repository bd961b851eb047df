//! Database models for mailboxes.

use crate::types::MailboxId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone)]
pub struct MailboxCreateDBRequest {
    pub name: String,
    pub slug: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MailboxDBResponse {
    pub id: MailboxId,
    pub name: String,
    pub slug: String,
    pub github_installation_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
