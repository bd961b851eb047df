//! OpenAPI documentation for the procedure API and the integration callbacks.
//!
//! Served as JSON at `/api-docs/openapi.json` and rendered at `/docs`.

use utoipa::{
    Modify, OpenApi,
    openapi::security::{ApiKey, ApiKeyValue, HttpAuthScheme, HttpBuilder, SecurityScheme},
};

use crate::api;

/// Session authentication: the identity provider's JWT, as a cookie or a bearer token.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.security_schemes.insert(
                "BearerAuth".to_string(),
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .description(Some("Session token in the `Authorization` header"))
                        .build(),
                ),
            );
            components.security_schemes.insert(
                "CookieAuth".to_string(),
                SecurityScheme::ApiKey(ApiKey::Cookie(ApiKeyValue::with_description(
                    "sb-access-token",
                    "Session token cookie set by the identity provider",
                ))),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    modifiers(&SecurityAddon),
    paths(
        api::handlers::organization::get_members,
        api::handlers::organization::add_member,
        api::handlers::users::current_user,
        api::handlers::users::update_last_mailbox_slug,
        api::handlers::mailboxes::list_members,
        api::handlers::mailboxes::update_member,
        api::handlers::mailboxes::member_stats,
        api::handlers::github::callback,
    ),
    components(schemas(
        api::models::users::Permissions,
        api::models::users::UserRole,
        api::models::users::MailboxAccess,
        api::models::users::MemberResponse,
        api::models::users::AddMemberRequest,
        api::models::users::UpdateLastMailboxSlugRequest,
        api::models::users::UserWithMailboxAccess,
        api::models::users::CurrentUserResponse,
        api::models::mailboxes::MailboxMemberUpdate,
        api::models::stats::MemberStats,
    )),
    tags(
        (name = "organization", description = "Organization members and invitations"),
        (name = "user", description = "The signed-in user's own profile"),
        (name = "mailbox", description = "Mailbox member access and reply statistics"),
        (name = "integrations", description = "Third-party account linking"),
    ),
    info(
        title = "Helpdesk API",
        version = "1.0.0",
        description = "Procedures for the support mailbox web client.

Queries are `GET /api/rpc/{procedure}` with parameters in the query string; mutations are
`POST /api/rpc/{procedure}` with a JSON body. All procedures require a session.",
    ),
)]
pub struct ApiDoc;
