use crate::{
    AppState,
    api::models::users::CurrentUser,
    auth::session,
    config::Config,
    errors::{Error, Result},
};
use axum::{
    extract::{FromRequestParts, OptionalFromRequestParts},
    http::request::Parts,
};
use tracing::{debug, instrument, trace};

/// Extract user from the session cookie if present and valid
/// Returns:
/// - None: No session cookie present, or none of them verified
/// - Some(Ok(user)): Valid JWT found and verified
/// - Some(Err(error)): Cookie header present but unreadable
#[instrument(skip(parts, config))]
fn try_session_cookie_auth(parts: &Parts, config: &Config) -> Option<Result<CurrentUser>> {
    let cookie_header = parts.headers.get(axum::http::header::COOKIE)?;

    let cookie_str = match cookie_header.to_str() {
        Ok(s) => s,
        Err(e) => {
            return Some(Err(Error::BadRequest {
                message: format!("Invalid cookie header: {e}"),
            }));
        }
    };
    let cookie_name = &config.auth.session.cookie_name;

    for cookie in cookie_str.split(';') {
        if let Some((name, value)) = cookie.trim().split_once('=')
            && name == cookie_name
        {
            match session::verify_session_token(value, config) {
                Ok(user) => return Some(Ok(user)),
                // Expired or foreign tokens are expected; keep looking
                Err(_) => continue,
            }
        }
    }
    None
}

/// Extract user from an `Authorization: Bearer <jwt>` header
/// Returns:
/// - None: No Authorization header or not a Bearer token
/// - Some(Ok(user)): Valid JWT
/// - Some(Err(error)): Bearer token present but invalid
#[instrument(skip(parts, config))]
fn try_bearer_auth(parts: &Parts, config: &Config) -> Option<Result<CurrentUser>> {
    let auth_header = parts.headers.get(axum::http::header::AUTHORIZATION)?;

    let auth_str = match auth_header.to_str() {
        Ok(s) => s,
        Err(e) => {
            return Some(Err(Error::BadRequest {
                message: format!("Invalid authorization header: {e}"),
            }));
        }
    };

    let token = auth_str.strip_prefix("Bearer ")?;
    Some(session::verify_session_token(token, config))
}

fn authenticate(parts: &Parts, config: &Config) -> Result<Option<CurrentUser>> {
    let mut auth_errors = Vec::new();

    for (method, attempt) in [
        ("Bearer token", try_bearer_auth(parts, config)),
        ("Session cookie", try_session_cookie_auth(parts, config)),
    ] {
        match attempt {
            Some(Ok(user)) => {
                debug!("Found {} authenticated user: {}", method, user.id);
                return Ok(Some(user));
            }
            Some(Err(e @ Error::Internal { .. })) => return Err(e),
            Some(Err(e)) => {
                trace!("{} authentication failed: {:?}", method, e);
                auth_errors.push((method, e));
            }
            None => trace!("No {} authentication attempted", method),
        }
    }

    if !auth_errors.is_empty() {
        trace!("All authentication attempts failed ({}): {:?}", auth_errors.len(), auth_errors);
    }
    Ok(None)
}

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = Error;

    #[instrument(skip(parts, state))]
    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self> {
        authenticate(parts, &state.config)?.ok_or(Error::Unauthenticated { message: None })
    }
}

impl OptionalFromRequestParts<AppState> for CurrentUser {
    type Rejection = Error;

    #[instrument(skip(parts, state))]
    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Option<Self>> {
        authenticate(parts, &state.config)
    }
}
