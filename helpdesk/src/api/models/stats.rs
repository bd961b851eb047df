//! API models for member reply statistics.

use crate::api::models::users::UserRole;
use crate::errors::{Error, Result};
use crate::types::UserId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

/// Inclusive time window for counting replies. Either bound may be open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateRange {
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
}

/// Query string for `mailbox.members.stats`
#[derive(Debug, Clone, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query, rename_all = "camelCase")]
pub struct MemberStatsQuery {
    pub mailbox_slug: String,
    /// Only count replies at or after this instant
    pub start_date: Option<DateTime<Utc>>,
    /// Only count replies at or before this instant
    pub end_date: Option<DateTime<Utc>>,
}

impl MemberStatsQuery {
    /// The requested window, or `None` when neither bound was given.
    pub fn date_range(&self) -> Result<Option<DateRange>> {
        if let (Some(start), Some(end)) = (self.start_date, self.end_date)
            && start > end
        {
            return Err(Error::BadRequest {
                message: "startDate must not be after endDate".to_string(),
            });
        }
        if self.start_date.is_none() && self.end_date.is_none() {
            return Ok(None);
        }
        Ok(Some(DateRange {
            start_date: self.start_date,
            end_date: self.end_date,
        }))
    }
}

/// Per-member reply count within a mailbox
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MemberStats {
    #[schema(value_type = String, format = "uuid")]
    pub id: UserId,
    pub email: Option<String>,
    pub display_name: String,
    pub reply_count: i64,
    pub role: UserRole,
}
