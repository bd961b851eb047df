use crate::{
    AppState,
    api::models::{
        ValidJson,
        users::{AddMemberRequest, CurrentUser, MemberResponse},
    },
    auth::utils::display_name_from_enhanced,
    db::handlers::{Users, users},
    errors::{Error, Result},
};
use axum::{Json, extract::State, http::StatusCode};

#[utoipa::path(
    get,
    path = "/api/rpc/organization.getMembers",
    tag = "organization",
    summary = "List organization members",
    description = "All members in account creation order. The display name falls back to the email, then the id.",
    responses(
        (status = 200, description = "Members of the organization", body = Vec<MemberResponse>),
        (status = 401, description = "Unauthorized"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("BearerAuth" = []),
        ("CookieAuth" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn get_members(State(state): State<AppState>, _user: CurrentUser) -> Result<Json<Vec<MemberResponse>>> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let members = Users::new(&mut conn).list_members().await?;

    Ok(Json(
        members
            .iter()
            .map(|member| MemberResponse {
                id: member.id,
                display_name: display_name_from_enhanced(member),
                email: member.email.clone(),
            })
            .collect(),
    ))
}

#[utoipa::path(
    post,
    path = "/api/rpc/organization.addMember",
    tag = "organization",
    summary = "Invite a member",
    description = "Creates an account with the identity provider and records the display name, inviter and permissions.",
    request_body = AddMemberRequest,
    responses(
        (status = 204, description = "Member added"),
        (status = 400, description = "Invalid email address"),
        (status = 401, description = "Unauthorized"),
        (status = 409, description = "An account with this email already exists"),
        (status = 422, description = "Malformed request body"),
        (status = 502, description = "Identity provider error"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("BearerAuth" = []),
        ("CookieAuth" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn add_member(
    State(state): State<AppState>,
    current_user: CurrentUser,
    ValidJson(request): ValidJson<AddMemberRequest>,
) -> Result<StatusCode> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    users::add_user(
        state.identity.as_ref(),
        &mut conn,
        current_user.id,
        &request.email,
        &request.display_name,
        request.permissions,
    )
    .await?;

    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use crate::api::models::users::{MemberResponse, Permissions};
    use crate::db::handlers::Users;
    use crate::test_utils::{auth_cookie, create_test_app, create_test_user, create_test_user_with_profile};
    use axum::http::StatusCode;
    use serde_json::json;
    use sqlx::PgPool;

    #[sqlx::test]
    #[test_log::test]
    async fn test_get_members_single_user(pool: PgPool) {
        let app = create_test_app(pool.clone());
        let user = create_test_user_with_profile(&pool, "root@example.com", Some("Test User")).await;

        let (name, value) = auth_cookie(&user);
        let response = app.get("/api/rpc/organization.getMembers").add_header(name, value).await;

        response.assert_status_ok();
        let members: Vec<MemberResponse> = response.json();
        assert_eq!(members.len(), 1);
        assert_eq!(members[0].id, user.id);
        assert_eq!(members[0].display_name, "Test User");
        assert_eq!(members[0].email.as_deref(), Some("root@example.com"));
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_get_members_order_and_fallbacks(pool: PgPool) {
        let app = create_test_app(pool.clone());
        let named = create_test_user_with_profile(&pool, "named@example.com", Some("  Named  ")).await;
        let unnamed = create_test_user_with_profile(&pool, "unnamed@example.com", Some("   ")).await;
        let anonymous_id: uuid::Uuid = sqlx::query_scalar("INSERT INTO auth.users (email) VALUES (NULL) RETURNING id")
            .fetch_one(&pool)
            .await
            .unwrap();

        let (name, value) = auth_cookie(&named);
        let members: Vec<MemberResponse> = app.get("/api/rpc/organization.getMembers").add_header(name, value).await.json();

        let names: Vec<_> = members.iter().map(|m| (m.id, m.display_name.clone())).collect();
        assert_eq!(
            names,
            vec![
                (named.id, "Named".to_string()),
                (unnamed.id, "unnamed@example.com".to_string()),
                (anonymous_id, anonymous_id.to_string()),
            ]
        );
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_get_members_requires_authentication(pool: PgPool) {
        let app = create_test_app(pool);
        app.get("/api/rpc/organization.getMembers")
            .await
            .assert_status(StatusCode::UNAUTHORIZED);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_add_member(pool: PgPool) {
        let app = create_test_app(pool.clone());
        let inviter = create_test_user(&pool, "owner@example.com").await;

        let (name, value) = auth_cookie(&inviter);
        let response = app
            .post("/api/rpc/organization.addMember")
            .add_header(name, value)
            .json(&json!({ "email": "new@example.com", "displayName": "New Member", "permissions": "admin" }))
            .await;
        response.assert_status(StatusCode::NO_CONTENT);

        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Users::new(&mut conn);
        let created = repo.get_user_by_email("new@example.com").await.unwrap().unwrap();
        let profile = repo.get_profile(created.id).await.unwrap().unwrap();
        assert_eq!(profile.display_name.as_deref(), Some("New Member"));
        assert_eq!(profile.inviter_user_id, Some(inviter.id));
        assert_eq!(profile.permissions, Permissions::Admin);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_add_member_rejects_invalid_input(pool: PgPool) {
        let app = create_test_app(pool.clone());
        let inviter = create_test_user(&pool, "owner@example.com").await;
        let (name, value) = auth_cookie(&inviter);

        app.post("/api/rpc/organization.addMember")
            .add_header(name.clone(), value.clone())
            .json(&json!({ "email": "not-an-email", "displayName": "Someone" }))
            .await
            .assert_status(StatusCode::BAD_REQUEST);

        app.post("/api/rpc/organization.addMember")
            .add_header(name.clone(), value.clone())
            .json(&json!({ "email": "someone@example.com" }))
            .await
            .assert_status(StatusCode::UNPROCESSABLE_ENTITY);

        app.post("/api/rpc/organization.addMember")
            .add_header(name, value)
            .json(&json!({ "email": "someone@example.com", "displayName": "Someone", "permissions": "owner" }))
            .await
            .assert_status(StatusCode::UNPROCESSABLE_ENTITY);

        let mut conn = pool.acquire().await.unwrap();
        assert!(
            Users::new(&mut conn)
                .get_user_by_email("someone@example.com")
                .await
                .unwrap()
                .is_none()
        );
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_add_member_duplicate_email(pool: PgPool) {
        let app = create_test_app(pool.clone());
        let inviter = create_test_user(&pool, "owner@example.com").await;

        let (name, value) = auth_cookie(&inviter);
        app.post("/api/rpc/organization.addMember")
            .add_header(name, value)
            .json(&json!({ "email": "owner@example.com", "displayName": "Again" }))
            .await
            .assert_status(StatusCode::CONFLICT);
    }
}
