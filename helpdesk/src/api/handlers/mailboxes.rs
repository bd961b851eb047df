use crate::{
    AppState,
    api::models::{
        ValidJson,
        mailboxes::{MailboxMemberUpdate, MailboxSlugQuery},
        stats::{MemberStats, MemberStatsQuery},
        users::{CurrentUser, UserWithMailboxAccess},
    },
    auth::utils::is_admin_user,
    context::RequestContext,
    db::{
        handlers::{
            Mailboxes, stats,
            users::{self, MailboxDataUpdate},
        },
        models::mailboxes::MailboxDBResponse,
    },
    errors::{Error, Result},
    types::{Operation, Permission, Resource},
};
use axum::{
    Json,
    extract::{Query, State},
};
use sqlx::PgConnection;

async fn mailbox_by_slug(conn: &mut PgConnection, slug: &str) -> Result<MailboxDBResponse> {
    Mailboxes::new(conn).get_by_slug(slug).await?.ok_or_else(|| Error::NotFound {
        resource: "Mailbox".to_string(),
        id: slug.to_string(),
    })
}

#[utoipa::path(
    get,
    path = "/api/rpc/mailbox.members.list",
    tag = "mailbox",
    summary = "List members with their mailbox access",
    params(MailboxSlugQuery),
    responses(
        (status = 200, description = "Members with role and keywords", body = Vec<UserWithMailboxAccess>),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Mailbox not found"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("BearerAuth" = []),
        ("CookieAuth" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn list_members(
    State(state): State<AppState>,
    _user: CurrentUser,
    Query(query): Query<MailboxSlugQuery>,
) -> Result<Json<Vec<UserWithMailboxAccess>>> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    mailbox_by_slug(&mut conn, &query.mailbox_slug).await?;

    Ok(Json(users::get_users_with_mailbox_access(&mut conn).await?))
}

#[utoipa::path(
    post,
    path = "/api/rpc/mailbox.members.update",
    tag = "mailbox",
    summary = "Update a member's display name or mailbox access",
    description = "Admins may update any member; other members only themselves. Omitted fields keep their stored value.",
    request_body = MailboxMemberUpdate,
    responses(
        (status = 200, description = "The member after the update", body = UserWithMailboxAccess),
        (status = 400, description = "Invalid keywords"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Not allowed to update this member"),
        (status = 404, description = "Mailbox or user not found"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("BearerAuth" = []),
        ("CookieAuth" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn update_member(
    State(state): State<AppState>,
    current_user: CurrentUser,
    context: RequestContext,
    ValidJson(request): ValidJson<MailboxMemberUpdate>,
) -> Result<Json<UserWithMailboxAccess>> {
    if request.user_id != current_user.id {
        let caller = context.enhanced_user(current_user.id).await?;
        if !is_admin_user(caller.as_ref()) {
            return Err(Error::InsufficientPermissions {
                required: Permission::Any(vec![
                    Permission::Allow(Resource::Members, Operation::UpdateAll),
                    Permission::Allow(Resource::Members, Operation::UpdateOwn),
                ]),
                action: Operation::UpdateAll,
                resource: Resource::Members,
            });
        }
    }

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    mailbox_by_slug(&mut conn, &request.mailbox_slug).await?;

    let updated = users::update_user_mailbox_data(
        &mut conn,
        request.user_id,
        MailboxDataUpdate {
            display_name: request.display_name,
            role: request.role,
            keywords: request.keywords,
        },
    )
    .await?;
    context.invalidate(request.user_id);

    Ok(Json(updated))
}

#[utoipa::path(
    get,
    path = "/api/rpc/mailbox.members.stats",
    tag = "mailbox",
    summary = "Staff reply counts per member",
    description = "Counts staff replies in the mailbox, busiest member first. Both date bounds are inclusive and optional.",
    params(MemberStatsQuery),
    responses(
        (status = 200, description = "Reply counts", body = Vec<MemberStats>),
        (status = 400, description = "startDate is after endDate"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Mailbox not found"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("BearerAuth" = []),
        ("CookieAuth" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn member_stats(
    State(state): State<AppState>,
    _user: CurrentUser,
    Query(query): Query<MemberStatsQuery>,
) -> Result<Json<Vec<MemberStats>>> {
    let date_range = query.date_range()?;

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mailbox = mailbox_by_slug(&mut conn, &query.mailbox_slug).await?;

    Ok(Json(stats::get_member_stats(&mut conn, &mailbox, date_range).await?))
}
