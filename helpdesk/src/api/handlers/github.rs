//! GitHub App installation callback.
//!
//! GitHub redirects the browser here after the app is installed. The installation is attached
//! to the mailbox the user last visited, and the user is sent back to that mailbox's
//! integrations page with `githubConnectResult` set.

use crate::{
    AppState,
    api::models::{
        github::{ConnectResult, GitHubCallbackQuery},
        users::CurrentUser,
    },
    context::RequestContext,
    db::handlers::Mailboxes,
    errors::{Error, Result, capture_exception},
    types::abbrev_uuid,
};
use axum::{
    extract::{Query, State},
    response::Redirect,
};
use tracing::{debug, info};

fn integrations_redirect(base_url: &str, slug: &str, result: ConnectResult) -> Redirect {
    Redirect::temporary(&format!(
        "{base_url}/mailboxes/{slug}/settings/integrations?githubConnectResult={}",
        result.as_str()
    ))
}

#[utoipa::path(
    get,
    path = "/api/connect/github/callback",
    tag = "integrations",
    summary = "GitHub App installation callback",
    params(GitHubCallbackQuery),
    responses(
        (status = 307, description = "Redirect to the login page, the mailbox list, or the mailbox integrations page"),
        (status = 500, description = "Internal server error")
    ),
    security(
        (),
        ("CookieAuth" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn callback(
    State(state): State<AppState>,
    current_user: Option<CurrentUser>,
    context: RequestContext,
    Query(query): Query<GitHubCallbackQuery>,
) -> Result<Redirect> {
    let base_url = state.config.base_url();

    let Some(current_user) = current_user else {
        return Ok(Redirect::temporary(&format!("{base_url}/login")));
    };

    let profile = context.profile(current_user.id).await?;
    let Some(slug) = profile.and_then(|p| p.last_mailbox_slug) else {
        debug!("No last mailbox for {}", abbrev_uuid(&current_user.id));
        return Ok(Redirect::temporary(&format!("{base_url}/mailboxes")));
    };

    // Released before GitHub is called
    let mailbox = {
        let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
        Mailboxes::new(&mut conn).get_by_slug(&slug).await?
    };
    let Some(mailbox) = mailbox else {
        debug!("Last mailbox '{}' no longer exists", slug);
        return Ok(Redirect::temporary(&format!("{base_url}/mailboxes")));
    };

    let Some(installation_id) = query.installation_id.filter(|id| !id.is_empty()) else {
        return Ok(integrations_redirect(base_url, &mailbox.slug, ConnectResult::Error));
    };
    debug!(
        "GitHub installation {} for mailbox '{}' (setup_action: {:?})",
        installation_id, mailbox.slug, query.setup_action
    );

    let repositories = match state.github.list_installation_repositories(&installation_id).await {
        Ok(repositories) => repositories,
        Err(e) => {
            capture_exception(&e, "github.callback: list installation repositories");
            return Ok(integrations_redirect(base_url, &mailbox.slug, ConnectResult::Error));
        }
    };
    if repositories.is_empty() {
        info!("GitHub installation {} grants no repositories", installation_id);
        return Ok(integrations_redirect(base_url, &mailbox.slug, ConnectResult::Error));
    }

    let saved = match state.db.acquire().await {
        Ok(mut conn) => Mailboxes::new(&mut conn)
            .set_github_installation_id(mailbox.id, &installation_id)
            .await
            .map(|_| ()),
        Err(e) => Err(e.into()),
    };
    if let Err(e) = saved {
        capture_exception(&e, "github.callback: save installation id");
        return Ok(integrations_redirect(base_url, &mailbox.slug, ConnectResult::Error));
    }

    info!(
        "Linked GitHub installation {} ({} repositories) to mailbox '{}'",
        installation_id,
        repositories.len(),
        mailbox.slug
    );
    Ok(integrations_redirect(base_url, &mailbox.slug, ConnectResult::Success))
}
