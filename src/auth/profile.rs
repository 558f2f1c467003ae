//! Authenticated user profile

use serde::{Deserialize, Serialize};

use super::provider::ExchangeError;

/// A user authenticated by the identity provider
///
/// Stored as the session's `user` value for the lifetime of the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticatedProfile {
    /// Provider user id
    pub id: String,
    pub display_name: String,
    /// Provider handle (e.g. the Twitter screen name)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// Avatar URLs, best first
    #[serde(default)]
    pub photos: Vec<String>,
}

impl AuthenticatedProfile {
    /// First usable avatar URL
    pub fn avatar(&self) -> Option<&str> {
        self.photos
            .iter()
            .map(String::as_str)
            .find(|url| !url.trim().is_empty())
    }
}

/// User record as returned by the provider, before validation
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProviderProfile {
    pub id: String,
    pub name: Option<String>,
    pub username: Option<String>,
    pub profile_image_url: Option<String>,
}

/// Turn a provider profile into an [`AuthenticatedProfile`]
///
/// Pure; no lookups. Rejects records without an id or any usable name.
/// The display name falls back to the handle when the provider sends none.
pub fn verify_profile(
    access_token: &str,
    profile: ProviderProfile,
) -> Result<AuthenticatedProfile, ExchangeError> {
    if access_token.trim().is_empty() {
        return Err(ExchangeError::Invalid("empty access token".to_string()));
    }

    let id = profile.id.trim().to_string();
    if id.is_empty() {
        return Err(ExchangeError::Invalid("profile has no id".to_string()));
    }

    let username = non_blank(profile.username);
    let display_name = non_blank(profile.name)
        .or_else(|| username.clone())
        .ok_or_else(|| ExchangeError::Invalid("profile has no display name".to_string()))?;

    Ok(AuthenticatedProfile {
        id,
        display_name,
        username,
        photos: non_blank(profile.profile_image_url).into_iter().collect(),
    })
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
