use crate::{
    AppState,
    api::models::{
        ValidJson,
        users::{CurrentUser, CurrentUserResponse, UpdateLastMailboxSlugRequest},
    },
    auth::utils::{first_name, full_name, has_display_name, is_admin},
    context::RequestContext,
    db::handlers::Users,
    errors::{Error, Result},
    types::abbrev_uuid,
};
use axum::{Json, extract::State, http::StatusCode};
use tracing::debug;

#[utoipa::path(
    get,
    path = "/api/rpc/user.current",
    tag = "user",
    summary = "Get the current user",
    responses(
        (status = 200, description = "The authenticated user", body = CurrentUserResponse),
        (status = 401, description = "Unauthorized"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("BearerAuth" = []),
        ("CookieAuth" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn current_user(current_user: CurrentUser, context: RequestContext) -> Result<Json<CurrentUserResponse>> {
    let profile = context.profile(current_user.id).await?;

    Ok(Json(CurrentUserResponse {
        id: current_user.id,
        display_name: full_name(&current_user, profile.as_ref()),
        first_name: first_name(&current_user, profile.as_ref()),
        has_display_name: has_display_name(profile.as_ref()),
        is_admin: is_admin(profile.as_ref()),
        email: current_user.email,
    }))
}

#[utoipa::path(
    post,
    path = "/api/rpc/user.updateLastMailboxSlug",
    tag = "user",
    summary = "Remember the last visited mailbox",
    request_body = UpdateLastMailboxSlugRequest,
    responses(
        (status = 204, description = "Slug saved"),
        (status = 400, description = "Empty slug"),
        (status = 401, description = "Unauthorized"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("BearerAuth" = []),
        ("CookieAuth" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn update_last_mailbox_slug(
    State(state): State<AppState>,
    current_user: CurrentUser,
    context: RequestContext,
    ValidJson(request): ValidJson<UpdateLastMailboxSlugRequest>,
) -> Result<StatusCode> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    Users::new(&mut conn).set_last_mailbox_slug(current_user.id, &request.slug).await?;
    context.invalidate(current_user.id);

    debug!("Saved last mailbox '{}' for {}", request.slug, abbrev_uuid(&current_user.id));
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use crate::api::models::users::CurrentUserResponse;
    use crate::db::handlers::Users;
    use crate::test_utils::{auth_cookie, create_test_admin_user, create_test_app, create_test_user, create_test_user_with_profile};
    use axum::http::StatusCode;
    use serde_json::json;
    use sqlx::PgPool;

    #[sqlx::test]
    #[test_log::test]
    async fn test_update_last_mailbox_slug(pool: PgPool) {
        let app = create_test_app(pool.clone());
        let user = create_test_user(&pool, "agent@example.com").await;

        let (name, value) = auth_cookie(&user);
        app.post("/api/rpc/user.updateLastMailboxSlug")
            .add_header(name, value)
            .json(&json!({ "slug": "support" }))
            .await
            .assert_status(StatusCode::NO_CONTENT);

        let mut conn = pool.acquire().await.unwrap();
        let profile = Users::new(&mut conn).get_profile(user.id).await.unwrap().unwrap();
        assert_eq!(profile.last_mailbox_slug.as_deref(), Some("support"));
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_update_last_mailbox_slug_rejects_empty(pool: PgPool) {
        let app = create_test_app(pool.clone());
        let user = create_test_user(&pool, "agent@example.com").await;

        let (name, value) = auth_cookie(&user);
        app.post("/api/rpc/user.updateLastMailboxSlug")
            .add_header(name, value)
            .json(&json!({ "slug": "  " }))
            .await
            .assert_status(StatusCode::BAD_REQUEST);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_update_last_mailbox_slug_requires_authentication(pool: PgPool) {
        let app = create_test_app(pool);
        app.post("/api/rpc/user.updateLastMailboxSlug")
            .json(&json!({ "slug": "support" }))
            .await
            .assert_status(StatusCode::UNAUTHORIZED);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_current_user(pool: PgPool) {
        let app = create_test_app(pool.clone());
        let user = create_test_user_with_profile(&pool, "jane@example.com", Some("Jane Doe")).await;

        let (name, value) = auth_cookie(&user);
        let response: CurrentUserResponse = app.get("/api/rpc/user.current").add_header(name, value).await.json();
        assert_eq!(response.id, user.id);
        assert_eq!(response.display_name, "Jane Doe");
        assert_eq!(response.first_name, "Jane");
        assert!(response.has_display_name);
        assert!(!response.is_admin);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_current_user_admin_without_name(pool: PgPool) {
        let app = create_test_app(pool.clone());
        let admin = create_test_admin_user(&pool, "boss@example.com").await;
        sqlx::query("UPDATE user_profiles SET display_name = NULL WHERE id = $1")
            .bind(admin.id)
            .execute(&pool)
            .await
            .unwrap();

        let (name, value) = auth_cookie(&admin);
        let response: CurrentUserResponse = app.get("/api/rpc/user.current").add_header(name, value).await.json();
        assert_eq!(response.display_name, "boss@example.com");
        assert!(!response.has_display_name);
        assert!(response.is_admin);
    }
}
