//! Common test utilities for E2E tests

#![allow(dead_code)]

use axum::async_trait;
use std::sync::Arc;
use storefront::api::ApiMounts;
use storefront::auth::{
    AuthenticatedProfile, AuthorizationRequest, ExchangeError, IdentityProvider,
    PendingAuthorization,
};
use storefront::session::MemorySessionStore;
use storefront::{AppState, config};
use tokio::net::TcpListener;
use url::Url;

pub const FAKE_STATE: &str = "fake-state";
pub const ALICE_AVATAR: &str = "http://x/a.png";
pub const DEFAULT_AVATAR: &str = "/img/default-avatar.png";

/// Identity provider answering by authorization code
///
/// - `good` → Alice, with a photo
/// - `nophoto` → Bob, without one
/// - `denied` / `invalid` / `unavailable` → the matching failure
pub struct FakeProvider;

#[async_trait]
impl IdentityProvider for FakeProvider {
    fn authorization_request(&self) -> Result<AuthorizationRequest, ExchangeError> {
        let url = Url::parse(&format!(
            "https://twitter.test/i/oauth2/authorize?response_type=code&state={FAKE_STATE}"
        ))
        .map_err(|e| ExchangeError::Invalid(e.to_string()))?;

        Ok(AuthorizationRequest {
            url,
            pending: PendingAuthorization {
                state: FAKE_STATE.to_string(),
                code_verifier: "fake-verifier".to_string(),
            },
        })
    }

    async fn exchange(
        &self,
        _pending: &PendingAuthorization,
        code: &str,
    ) -> Result<AuthenticatedProfile, ExchangeError> {
        match code {
            "good" => Ok(AuthenticatedProfile {
                id: "42".to_string(),
                display_name: "Alice".to_string(),
                username: Some("alice".to_string()),
                photos: vec![ALICE_AVATAR.to_string()],
            }),
            "nophoto" => Ok(AuthenticatedProfile {
                id: "7".to_string(),
                display_name: "Bob".to_string(),
                username: Some("bob".to_string()),
                photos: vec![],
            }),
            "denied" => Err(ExchangeError::Denied("user refused".to_string())),
            "unavailable" => Err(ExchangeError::Unavailable("provider down".to_string())),
            _ => Err(ExchangeError::Invalid(format!("unknown code {code}"))),
        }
    }
}

/// Test server instance
pub struct TestServer {
    pub addr: String,
    pub state: AppState,
    /// Keeps cookies, never follows redirects
    pub client: reqwest::Client,
}

impl TestServer {
    /// Create a new test server instance
    pub async fn new() -> Self {
        Self::start(600, ApiMounts::default()).await
    }

    /// Server whose sessions expire after `max_age_seconds` of inactivity
    pub async fn with_max_age(max_age_seconds: i64) -> Self {
        Self::start(max_age_seconds, ApiMounts::default()).await
    }

    pub async fn with_mounts(mounts: ApiMounts) -> Self {
        Self::start(600, mounts).await
    }

    async fn start(max_age_seconds: i64, mounts: ApiMounts) -> Self {
        storefront::metrics::init_metrics();

        let config = test_config(max_age_seconds);
        let ttl = std::time::Duration::from_secs(max_age_seconds as u64);
        let state = AppState::with_components(
            config,
            Arc::new(MemorySessionStore::new(ttl)),
            Arc::new(FakeProvider),
        );

        // Bind to random port
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let addr_str = format!("http://{}", addr);

        let app = storefront::build_router(state.clone(), mounts);

        // Spawn server in background
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        // Wait a bit for server to start
        tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;

        Self {
            addr: addr_str,
            state,
            client: browser_client(),
        }
    }

    /// Get base URL for requests
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.addr, path)
    }

    /// Run the login round trip, answering the callback with `code`
    ///
    /// Returns the callback response (a redirect).
    pub async fn login_with(&self, code: &str) -> reqwest::Response {
        let redirect = self
            .client
            .get(self.url("/auth/twitter"))
            .send()
            .await
            .unwrap();
        assert!(redirect.status().is_redirection());

        let location = location(&redirect);
        let authorize = Url::parse(&location).unwrap();
        let state = authorize
            .query_pairs()
            .find(|(key, _)| key == "state")
            .map(|(_, value)| value.into_owned())
            .unwrap();

        self.client
            .get(self.url(&format!(
                "/auth/twitter/callback?code={code}&state={state}"
            )))
            .send()
            .await
            .unwrap()
    }

    /// Body of the home page as seen by this server's client
    pub async fn home(&self) -> String {
        let response = self.client.get(self.url("/")).send().await.unwrap();
        assert_eq!(response.status(), 200);
        response.text().await.unwrap()
    }
}

/// Client that keeps cookies but never follows redirects
pub fn browser_client() -> reqwest::Client {
    reqwest::Client::builder()
        .cookie_store(true)
        .redirect(reqwest::redirect::Policy::none())
        .timeout(std::time::Duration::from_secs(10))
        .build()
        .unwrap()
}

/// Client without a cookie store, for replaying cookies by hand
pub fn bare_client() -> reqwest::Client {
    reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .timeout(std::time::Duration::from_secs(10))
        .build()
        .unwrap()
}

pub fn location(response: &reqwest::Response) -> String {
    response
        .headers()
        .get("location")
        .and_then(|v| v.to_str().ok())
        .expect("location header")
        .to_string()
}

/// `name=value` pair of the session cookie set by `response`
pub fn session_cookie(response: &reqwest::Response) -> Option<String> {
    response
        .headers()
        .get_all("set-cookie")
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find(|v| v.starts_with("sid="))
        .and_then(|v| v.split(';').next())
        .map(ToString::to_string)
}

fn test_config(max_age_seconds: i64) -> config::AppConfig {
    config::AppConfig {
        server: config::ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0, // Let OS assign port
            domain: "127.0.0.1".to_string(),
            protocol: "http".to_string(),
        },
        session: config::SessionConfig {
            store: config::SessionStoreKind::Memory,
            store_url: String::new(),
            secret: "test-secret-key-that-is-at-least-32-bytes".to_string(),
            max_age_seconds,
            cookie_name: "sid".to_string(),
            reap_interval_seconds: 300,
        },
        twitter: config::TwitterOAuthConfig {
            client_id: "test-client-id".to_string(),
            client_secret: "test-client-secret".to_string(),
            callback_path: "/auth/twitter/callback".to_string(),
            scopes: vec!["tweet.read".to_string(), "users.read".to_string()],
            authorize_url: "https://twitter.test/i/oauth2/authorize".to_string(),
            token_url: "https://twitter.test/2/oauth2/token".to_string(),
            userinfo_url: "https://twitter.test/2/users/me".to_string(),
            request_timeout_seconds: 5,
        },
        pages: config::PagesConfig {
            site_title: "Test Storefront".to_string(),
            home: "/".to_string(),
            failure: "/failLogin".to_string(),
            logout_landing: "/api/usuario".to_string(),
            default_avatar: DEFAULT_AVATAR.to_string(),
        },
        logging: config::LoggingConfig {
            level: "info".to_string(),
            format: "pretty".to_string(),
        },
    }
}
