//! Configuration management
//!
//! Loads configuration from:
//! 1. Default values
//! 2. Configuration file (config/local.toml)
//! 3. Environment variables (override)

use serde::Deserialize;
use std::net::IpAddr;

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub session: SessionConfig,
    pub twitter: TwitterOAuthConfig,
    pub pages: PagesConfig,
    pub logging: LoggingConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0")
    pub host: String,
    /// Port number (e.g., 3028)
    pub port: u16,
    /// Public domain (e.g., "shop.example.com")
    pub domain: String,
    /// Protocol ("http" or "https")
    pub protocol: String,
}

impl ServerConfig {
    /// Get the base URL for the storefront
    ///
    /// # Returns
    /// Full URL like "https://shop.example.com"
    pub fn base_url(&self) -> String {
        format!("{}://{}", self.protocol, self.domain)
    }
}

/// Session store backend selector
#[derive(Debug, Clone, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SessionStoreKind {
    #[default]
    Sqlite,
    Memory,
}

/// Session configuration
#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    /// Which store backs the sessions
    #[serde(default)]
    pub store: SessionStoreKind,
    /// sqlx connection string for the sqlite store
    pub store_url: String,
    /// Cookie signing secret (32+ bytes)
    pub secret: String,
    /// Inactivity TTL in seconds (default: 600 = 10 minutes)
    pub max_age_seconds: i64,
    /// Session cookie name
    pub cookie_name: String,
    /// How often expired records are purged
    pub reap_interval_seconds: u64,
}

impl SessionConfig {
    pub fn max_age(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.max_age_seconds)
    }
}

/// Twitter OAuth 2.0 configuration
#[derive(Debug, Clone, Deserialize)]
pub struct TwitterOAuthConfig {
    pub client_id: String,
    pub client_secret: String,
    /// Path the provider redirects back to
    pub callback_path: String,
    pub scopes: Vec<String>,
    pub authorize_url: String,
    pub token_url: String,
    pub userinfo_url: String,
    pub request_timeout_seconds: u64,
}

/// Redirect targets and page settings
#[derive(Debug, Clone, Deserialize)]
pub struct PagesConfig {
    pub site_title: String,
    /// Where a successful login lands
    pub home: String,
    /// Where a failed login lands
    pub failure: String,
    /// Where logout lands
    pub logout_landing: String,
    /// Avatar shown for profiles without a photo
    pub default_avatar: String,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    pub level: String,
    /// Log format: "pretty" or "json"
    pub format: String,
}

impl LoggingConfig {
    /// Filter used when `RUST_LOG` is not set
    pub fn default_filter(&self) -> String {
        format!("storefront={},tower_http=debug", self.level.trim().to_ascii_lowercase())
    }

    pub fn is_json(&self) -> bool {
        self.format.trim().eq_ignore_ascii_case("json")
    }
}

/// Bare environment names from earlier deployments, mapped onto config keys.
const LEGACY_ENV_OVERRIDES: [(&str, &str); 4] = [
    ("TWITTER_ID", "twitter.client_id"),
    ("TWITTER_SECRET", "twitter.client_secret"),
    ("MONGO_URI", "session.store_url"),
    ("SECRET", "session.secret"),
];

impl AppConfig {
    /// Load configuration from file and environment
    ///
    /// # Loading Order
    /// 1. Default values
    /// 2. config/default.toml (if exists)
    /// 3. config/local.toml (if exists)
    /// 4. Environment variables (STOREFRONT_*)
    /// 5. Legacy variables (TWITTER_ID, TWITTER_SECRET, MONGO_URI, SECRET)
    ///
    /// # Errors
    /// Returns error if configuration is invalid
    pub fn load() -> Result<Self, crate::error::AppError> {
        use config::{Config, Environment, File};

        let mut builder = Config::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 3028)?
            .set_default("server.domain", "localhost")?
            .set_default("server.protocol", "http")?
            .set_default("session.store", "sqlite")?
            .set_default("session.store_url", "sqlite:data/sessions.db?mode=rwc")?
            .set_default("session.max_age_seconds", 600)?
            .set_default("session.cookie_name", "sid")?
            .set_default("session.reap_interval_seconds", 300)?
            .set_default("twitter.callback_path", "/auth/twitter/callback")?
            .set_default("twitter.scopes", vec!["tweet.read", "users.read"])?
            .set_default("twitter.authorize_url", "https://twitter.com/i/oauth2/authorize")?
            .set_default("twitter.token_url", "https://api.twitter.com/2/oauth2/token")?
            .set_default("twitter.userinfo_url", "https://api.twitter.com/2/users/me")?
            .set_default("twitter.request_timeout_seconds", 10)?
            .set_default("pages.site_title", "Storefront")?
            .set_default("pages.home", "/")?
            .set_default("pages.failure", "/failLogin")?
            .set_default("pages.logout_landing", "/api/usuario")?
            .set_default("pages.default_avatar", "/img/default-avatar.png")?
            .set_default("logging.level", "info")?
            .set_default("logging.format", "pretty")?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            .add_source(
                Environment::with_prefix("STOREFRONT")
                    .separator("__")
                    .list_separator(" ")
                    .with_list_parse_key("twitter.scopes")
                    .try_parsing(true),
            );

        for (variable, key) in LEGACY_ENV_OVERRIDES {
            builder = builder.set_override_option(key, std::env::var(variable).ok())?;
        }

        let config = builder
            .build()
            .map_err(|e| crate::error::AppError::Config(e.to_string()))?;

        let app_config: Self = config
            .try_deserialize()
            .map_err(|e| crate::error::AppError::Config(e.to_string()))?;
        app_config.validate()?;
        Ok(app_config)
    }

    pub fn should_use_secure_cookies(&self) -> bool {
        self.server.protocol.eq_ignore_ascii_case("https")
            || !is_local_server_domain(&self.server.domain)
    }

    /// Absolute redirect URI registered with the identity provider.
    pub fn twitter_redirect_uri(&self) -> String {
        format!("{}{}", self.public_origin(), self.twitter.callback_path)
    }

    fn public_origin(&self) -> String {
        if is_local_server_domain(&self.server.domain) && !self.server.domain.contains(':') {
            format!("{}:{}", self.server.base_url(), self.server.port)
        } else {
            self.server.base_url()
        }
    }

    pub(crate) fn validate(&self) -> Result<(), crate::error::AppError> {
        const MIN_SESSION_SECRET_BYTES: usize = 32;

        if self.session.secret.as_bytes().len() < MIN_SESSION_SECRET_BYTES {
            return Err(crate::error::AppError::Config(format!(
                "session.secret must be at least {} bytes",
                MIN_SESSION_SECRET_BYTES
            )));
        }

        if self.session.max_age_seconds <= 0 {
            return Err(crate::error::AppError::Config(
                "session.max_age_seconds must be greater than 0".to_string(),
            ));
        }

        if self.twitter.client_id.trim().is_empty() || self.twitter.client_secret.trim().is_empty()
        {
            return Err(crate::error::AppError::Config(
                "twitter.client_id and twitter.client_secret are required".to_string(),
            ));
        }

        for (key, path) in [
            ("twitter.callback_path", &self.twitter.callback_path),
            ("pages.home", &self.pages.home),
            ("pages.failure", &self.pages.failure),
            ("pages.logout_landing", &self.pages.logout_landing),
        ] {
            if !path.starts_with('/') {
                return Err(crate::error::AppError::Config(format!(
                    "{key} must be an absolute path"
                )));
            }
        }

        if !matches!(
            self.logging.level.trim().to_ascii_lowercase().as_str(),
            "trace" | "debug" | "info" | "warn" | "error"
        ) {
            return Err(crate::error::AppError::Config(format!(
                "logging.level must be one of trace, debug, info, warn, error (got {})",
                self.logging.level
            )));
        }

        if !self.logging.is_json() && !self.logging.format.trim().eq_ignore_ascii_case("pretty") {
            return Err(crate::error::AppError::Config(format!(
                "logging.format must be pretty or json (got {})",
                self.logging.format
            )));
        }

        if !self.should_use_secure_cookies() {
            let host = normalized_server_host(&self.server.domain);
            tracing::warn!(
                host = %host,
                protocol = %self.server.protocol,
                "Using insecure session cookies for local development"
            );
        } else if !self.server.protocol.eq_ignore_ascii_case("https") {
            return Err(crate::error::AppError::Config(
                "server.protocol must be https for non-local server domains".to_string(),
            ));
        }

        Ok(())
    }
}

fn normalized_server_host(domain: &str) -> String {
    let trimmed = domain.trim();
    let parsed_host = url::Url::parse(&format!("http://{trimmed}"))
        .ok()
        .and_then(|url| url.host_str().map(|host| host.to_string()));
    let host = parsed_host.unwrap_or_else(|| trimmed.to_string());
    host.trim_start_matches('[')
        .trim_end_matches(']')
        .trim_end_matches('.')
        .to_ascii_lowercase()
}

fn is_local_server_domain(domain: &str) -> bool {
    let host = normalized_server_host(domain);
    if host == "localhost" || host.ends_with(".localhost") {
        return true;
    }

    if let Ok(ip) = host.parse::<IpAddr>() {
        return ip.is_loopback() || ip.is_unspecified();
    }

    false
}
