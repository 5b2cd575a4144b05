//! Which model runs a request, and whose key pays for it.

use crate::errors::StudioError;
use crate::llm::{Credential, catalog};

use super::models::UserSettings;

const NEEDS_USER_KEY: &str =
    "Please configure your OpenRouter API key in Settings or use a free model";
const NO_KEY: &str = "API key not configured";

/// Requested model, else the user's selection, else the server default.
pub fn resolve_model(
    requested: Option<&str>,
    settings: Option<&UserSettings>,
    default_model: &str,
) -> String {
    requested
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .or_else(|| {
            settings
                .and_then(|s| s.selected_model.as_deref())
                .map(str::trim)
                .filter(|m| !m.is_empty())
        })
        .unwrap_or(default_model)
        .to_string()
}

fn user_key(settings: Option<&UserSettings>) -> Option<Credential> {
    Credential::from_optional(settings.and_then(|s| s.openrouter_api_key.as_deref()))
}

/// Key for a fresh generation. A paid model needs the user's own key.
pub fn creation_credential(
    model: &str,
    settings: Option<&UserSettings>,
    server_key: Option<&Credential>,
) -> Result<Credential, StudioError> {
    let user = user_key(settings);
    if !catalog::is_free(model) && user.is_none() {
        return Err(StudioError::BadRequest(NEEDS_USER_KEY.to_string()));
    }
    user.or_else(|| server_key.cloned())
        .ok_or_else(|| StudioError::BadRequest(NO_KEY.to_string()))
}

/// Key for a fix, edit or other revision call.
pub fn revision_credential(
    model: &str,
    settings: Option<&UserSettings>,
    server_key: Option<&Credential>,
    free_mode: bool,
) -> Result<Credential, StudioError> {
    let key = if free_mode || catalog::is_free(model) {
        server_key.cloned()
    } else {
        user_key(settings).or_else(|| server_key.cloned())
    };
    key.ok_or_else(|| StudioError::BadRequest(NO_KEY.to_string()))
}
