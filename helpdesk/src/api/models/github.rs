//! API models for the GitHub App installation callback.

use serde::Deserialize;
use utoipa::IntoParams;

/// Query string GitHub appends when redirecting back after an app installation
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct GitHubCallbackQuery {
    pub installation_id: Option<String>,
    pub setup_action: Option<String>,
}

/// Outcome reported back to the integrations page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectResult {
    Success,
    Error,
}

impl ConnectResult {
    pub fn as_str(self) -> &'static str {
        match self {
            ConnectResult::Success => "success",
            ConnectResult::Error => "error",
        }
    }
}
