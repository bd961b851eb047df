//! Reply statistics per mailbox member.
//!
//! Members and reply counts are fetched with two independent queries and joined in memory,
//! so a member created between the two reads simply shows a zero count.

use crate::{
    api::models::stats::{DateRange, MemberStats},
    auth::utils::display_name_from_enhanced,
    db::{errors::Result, handlers::users::Users, models::mailboxes::MailboxDBResponse, models::users::EnhancedUser},
    types::UserId,
};
use sqlx::{FromRow, PgConnection};
use std::collections::HashMap;
use tracing::instrument;

#[derive(Debug, FromRow)]
struct ReplyCount {
    user_id: UserId,
    reply_count: i64,
}

/// Count staff replies per member in `mailbox`, optionally within an inclusive date range.
#[instrument(skip(db, mailbox), fields(mailbox_id = mailbox.id), err)]
pub async fn get_member_stats(
    db: &mut PgConnection,
    mailbox: &MailboxDBResponse,
    date_range: Option<DateRange>,
) -> Result<Vec<MemberStats>> {
    let members = Users::new(&mut *db).list_members().await?;
    if members.is_empty() {
        return Ok(Vec::new());
    }

    let member_ids: Vec<UserId> = members.iter().map(|m| m.id).collect();
    let range = date_range.unwrap_or_default();

    let counts = sqlx::query_as::<_, ReplyCount>(
        r#"
        SELECT m.user_id AS user_id, COUNT(*)::bigint AS reply_count
        FROM conversation_messages m
        JOIN conversations c ON c.id = m.conversation_id
        WHERE c.mailbox_id = $1
          AND m.role = 'staff'
          AND m.user_id = ANY($2)
          AND ($3::timestamptz IS NULL OR m.created_at >= $3)
          AND ($4::timestamptz IS NULL OR m.created_at <= $4)
        GROUP BY m.user_id
        "#,
    )
    .bind(mailbox.id)
    .bind(&member_ids)
    .bind(range.start_date)
    .bind(range.end_date)
    .fetch_all(&mut *db)
    .await?;

    let counts = counts.into_iter().map(|row| (row.user_id, row.reply_count)).collect();
    Ok(merge_member_stats(members, &counts))
}

/// Busiest members first; equal counts ordered by id.
fn merge_member_stats(members: Vec<EnhancedUser>, counts: &HashMap<UserId, i64>) -> Vec<MemberStats> {
    let mut stats: Vec<MemberStats> = members
        .into_iter()
        .map(|member| MemberStats {
            id: member.id,
            display_name: display_name_from_enhanced(&member),
            reply_count: counts.get(&member.id).copied().unwrap_or(0),
            role: member.access.map(|a| a.role).unwrap_or_default(),
            email: member.email,
        })
        .collect();

    stats.sort_by(|a, b| b.reply_count.cmp(&a.reply_count).then_with(|| a.id.cmp(&b.id)));
    stats
}
