//! Identity provider contract
//!
//! A provider hands out an authorization URL and later exchanges the
//! authorization code it issued for a verified profile.

use axum::async_trait;
use serde::Deserialize;
use thiserror::Error;
use url::Url;

use super::profile::AuthenticatedProfile;

/// Why a provider round trip failed
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExchangeError {
    /// The user declined authorization
    #[error("authorization denied: {0}")]
    Denied(String),

    /// The response was malformed, forged, or did not match the pending login
    #[error("invalid provider response: {0}")]
    Invalid(String),

    /// Network failure or the provider is down
    #[error("provider unavailable: {0}")]
    Unavailable(String),
}

impl ExchangeError {
    /// Short label for logs and metrics
    pub fn reason(&self) -> &'static str {
        match self {
            ExchangeError::Denied(_) => "denied",
            ExchangeError::Invalid(_) => "invalid",
            ExchangeError::Unavailable(_) => "unavailable",
        }
    }
}

/// Correlation data for a login in flight
///
/// Lives only in a short-lived signed cookie between the redirect to the
/// provider and the callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingAuthorization {
    /// CSRF state echoed back by the provider
    pub state: String,
    /// PKCE code verifier
    pub code_verifier: String,
}

impl PendingAuthorization {
    /// Encode as `state.verifier`; both halves are URL-safe base64
    pub fn to_cookie_value(&self) -> String {
        format!("{}.{}", self.state, self.code_verifier)
    }

    pub fn from_cookie_value(value: &str) -> Option<Self> {
        let (state, code_verifier) = value.split_once('.')?;
        if state.is_empty() || code_verifier.is_empty() {
            return None;
        }
        Some(Self {
            state: state.to_string(),
            code_verifier: code_verifier.to_string(),
        })
    }
}

/// Where to send the user agent, and what to remember meanwhile
#[derive(Debug, Clone)]
pub struct AuthorizationRequest {
    pub url: Url,
    pub pending: PendingAuthorization,
}

/// Query parameters the provider appends to the callback URL
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

/// Third-party identity provider
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Build the authorization URL for a new login
    fn authorization_request(&self) -> Result<AuthorizationRequest, ExchangeError>;

    /// Exchange an authorization code for a verified profile
    async fn exchange(
        &self,
        pending: &PendingAuthorization,
        code: &str,
    ) -> Result<AuthenticatedProfile, ExchangeError>;
}
