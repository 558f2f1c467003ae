//! Twitter OAuth 2.0 client
//!
//! Authorization code flow with PKCE (S256):
//! 1. Redirect to the authorize endpoint with state + code challenge
//! 2. Exchange the returned code at the token endpoint (client credentials
//!    via HTTP Basic, plus the code verifier)
//! 3. Fetch `users/me` with the access token

use axum::async_trait;
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::RngCore;
use reqwest::StatusCode;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use url::Url;

use super::profile::{AuthenticatedProfile, ProviderProfile, verify_profile};
use super::provider::{AuthorizationRequest, ExchangeError, IdentityProvider, PendingAuthorization};
use crate::config::TwitterOAuthConfig;
use crate::error::AppError;

/// Twitter token endpoint response
#[derive(Debug, Deserialize)]
struct TwitterTokenResponse {
    access_token: String,
    token_type: String,
}

/// `GET /2/users/me` response envelope
#[derive(Debug, Deserialize)]
struct TwitterUserResponse {
    data: Option<ProviderProfile>,
}

/// Identity provider backed by Twitter
pub struct TwitterProvider {
    http: reqwest::Client,
    config: TwitterOAuthConfig,
    authorize_url: Url,
    redirect_uri: String,
}

impl TwitterProvider {
    /// Create a client
    ///
    /// # Arguments
    /// * `config` - Client credentials and endpoints
    /// * `redirect_uri` - Absolute callback URL registered with Twitter
    ///
    /// # Errors
    /// Returns a config error if an endpoint URL does not parse
    pub fn new(config: TwitterOAuthConfig, redirect_uri: String) -> Result<Self, AppError> {
        let authorize_url = Url::parse(&config.authorize_url)
            .map_err(|e| AppError::Config(format!("twitter.authorize_url: {e}")))?;
        for (key, value) in [
            ("twitter.token_url", &config.token_url),
            ("twitter.userinfo_url", &config.userinfo_url),
        ] {
            Url::parse(value).map_err(|e| AppError::Config(format!("{key}: {e}")))?;
        }

        let http = reqwest::Client::builder()
            .user_agent("Storefront/0.1.0")
            .timeout(std::time::Duration::from_secs(
                config.request_timeout_seconds,
            ))
            .build()?;

        Ok(Self {
            http,
            config,
            authorize_url,
            redirect_uri,
        })
    }

    async fn request_token(
        &self,
        pending: &PendingAuthorization,
        code: &str,
    ) -> Result<TwitterTokenResponse, ExchangeError> {
        let response = self
            .http
            .post(&self.config.token_url)
            .basic_auth(&self.config.client_id, Some(&self.config.client_secret))
            .form(&[
                ("grant_type", "authorization_code"),
                ("code", code),
                ("redirect_uri", self.redirect_uri.as_str()),
                ("code_verifier", pending.code_verifier.as_str()),
                ("client_id", self.config.client_id.as_str()),
            ])
            .send()
            .await
            .map_err(transport_error)?;

        let response = check_status("token", response).await?;
        let token: TwitterTokenResponse = response
            .json()
            .await
            .map_err(|e| ExchangeError::Invalid(format!("token response: {e}")))?;

        if !token.token_type.eq_ignore_ascii_case("bearer") {
            return Err(ExchangeError::Invalid(format!(
                "unexpected token type {}",
                token.token_type
            )));
        }

        Ok(token)
    }

    async fn fetch_profile(&self, access_token: &str) -> Result<ProviderProfile, ExchangeError> {
        let response = self
            .http
            .get(&self.config.userinfo_url)
            .bearer_auth(access_token)
            .query(&[("user.fields", "profile_image_url")])
            .send()
            .await
            .map_err(transport_error)?;

        let response = check_status("userinfo", response).await?;
        let body: TwitterUserResponse = response
            .json()
            .await
            .map_err(|e| ExchangeError::Invalid(format!("userinfo response: {e}")))?;

        body.data
            .ok_or_else(|| ExchangeError::Invalid("userinfo response has no data".to_string()))
    }
}

#[async_trait]
impl IdentityProvider for TwitterProvider {
    fn authorization_request(&self) -> Result<AuthorizationRequest, ExchangeError> {
        let pending = PendingAuthorization {
            state: generate_token(),
            code_verifier: generate_token(),
        };
        let scope = self.config.scopes.join(" ");

        let mut url = self.authorize_url.clone();
        url.query_pairs_mut()
            .append_pair("response_type", "code")
            .append_pair("client_id", &self.config.client_id)
            .append_pair("redirect_uri", &self.redirect_uri)
            .append_pair("scope", &scope)
            .append_pair("state", &pending.state)
            .append_pair("code_challenge", &pkce_challenge(&pending.code_verifier))
            .append_pair("code_challenge_method", "S256");

        Ok(AuthorizationRequest { url, pending })
    }

    async fn exchange(
        &self,
        pending: &PendingAuthorization,
        code: &str,
    ) -> Result<AuthenticatedProfile, ExchangeError> {
        let token = self.request_token(pending, code).await?;
        let profile = self.fetch_profile(&token.access_token).await?;
        verify_profile(&token.access_token, profile)
    }
}

/// Map a non-success status: provider-side trouble is `Unavailable`,
/// anything the provider rejected is `Invalid`.
async fn check_status(
    endpoint: &str,
    response: reqwest::Response,
) -> Result<reqwest::Response, ExchangeError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = format!("{endpoint} endpoint returned {status}: {body}");
    if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
        Err(ExchangeError::Unavailable(message))
    } else {
        Err(ExchangeError::Invalid(message))
    }
}

fn transport_error(error: reqwest::Error) -> ExchangeError {
    ExchangeError::Unavailable(error.to_string())
}

/// 32 random bytes, URL-safe base64 (43 chars; valid PKCE verifier length)
fn generate_token() -> String {
    let mut bytes = [0_u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// S256 code challenge: base64url(sha256(verifier))
fn pkce_challenge(verifier: &str) -> String {
    URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()))
}
