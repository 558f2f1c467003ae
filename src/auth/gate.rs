//! Authentication gate
//!
//! Drives a session through the login lifecycle:
//!
//! ```text
//! Anonymous --begin_login--> (pending cookie) --handle_callback ok--> Authenticated
//!                                            \--handle_callback err--> unchanged
//! Authenticated --logout--> Anonymous
//! ```
//!
//! Every outcome is a redirect target; nothing here produces an HTTP error.

use std::sync::Arc;

use super::profile::AuthenticatedProfile;
use super::provider::{
    AuthorizationRequest, CallbackParams, ExchangeError, IdentityProvider, PendingAuthorization,
};
use crate::config::PagesConfig;
use crate::metrics::LOGIN_ATTEMPTS_TOTAL;
use crate::session::SessionHandle;

/// Redirect targets used by the gate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthRedirects {
    pub success: String,
    pub failure: String,
    pub logout: String,
}

impl From<&PagesConfig> for AuthRedirects {
    fn from(pages: &PagesConfig) -> Self {
        Self {
            success: pages.home.clone(),
            failure: pages.failure.clone(),
            logout: pages.logout_landing.clone(),
        }
    }
}

pub struct AuthGate {
    provider: Arc<dyn IdentityProvider>,
    redirects: AuthRedirects,
}

impl AuthGate {
    pub fn new(provider: Arc<dyn IdentityProvider>, redirects: AuthRedirects) -> Self {
        Self {
            provider,
            redirects,
        }
    }

    /// Start a login
    ///
    /// # Returns
    /// The provider authorization request, or the failure path if the
    /// provider could not build one.
    pub fn begin_login(&self) -> Result<AuthorizationRequest, &str> {
        self.provider.authorization_request().map_err(|error| {
            tracing::warn!(reason = error.reason(), %error, "Could not start login");
            self.redirects.failure.as_str()
        })
    }

    /// Finish a login
    ///
    /// On success the profile is bound to the session and the session id is
    /// rotated. On failure the session is left untouched.
    ///
    /// # Returns
    /// Path to redirect to
    pub async fn handle_callback(
        &self,
        session: &SessionHandle,
        pending: Option<PendingAuthorization>,
        params: &CallbackParams,
    ) -> &str {
        let profile = match self.authenticate(pending, params).await {
            Ok(profile) => profile,
            Err(error) => return self.reject_callback(&error),
        };

        if let Err(error) = session.bind_user(&profile).await {
            tracing::error!(%error, "Could not bind profile to session");
            return &self.redirects.failure;
        }
        session.rotate_id().await;

        LOGIN_ATTEMPTS_TOTAL.with_label_values(&["success"]).inc();
        tracing::info!(user_id = %profile.id, "User logged in");
        &self.redirects.success
    }

    /// Record a failed callback without touching the session
    ///
    /// # Returns
    /// The failure path
    pub fn reject_callback(&self, error: &ExchangeError) -> &str {
        LOGIN_ATTEMPTS_TOTAL
            .with_label_values(&[error.reason()])
            .inc();
        tracing::warn!(reason = error.reason(), %error, "Login callback failed");
        &self.redirects.failure
    }

    async fn authenticate(
        &self,
        pending: Option<PendingAuthorization>,
        params: &CallbackParams,
    ) -> Result<AuthenticatedProfile, ExchangeError> {
        if let Some(error) = params.error.as_deref() {
            let description = params
                .error_description
                .clone()
                .unwrap_or_else(|| error.to_string());
            return Err(if error == "access_denied" {
                ExchangeError::Denied(description)
            } else {
                ExchangeError::Invalid(description)
            });
        }

        let pending = pending
            .ok_or_else(|| ExchangeError::Invalid("no login in progress".to_string()))?;

        match params.state.as_deref() {
            Some(state) if state == pending.state => {}
            Some(_) => return Err(ExchangeError::Invalid("state mismatch".to_string())),
            None => return Err(ExchangeError::Invalid("missing state".to_string())),
        }

        let code = params
            .code
            .as_deref()
            .filter(|code| !code.is_empty())
            .ok_or_else(|| ExchangeError::Invalid("missing authorization code".to_string()))?;

        self.provider.exchange(&pending, code).await
    }

    /// The profile bound to the session, if any
    pub async fn current_user(&self, session: &SessionHandle) -> Option<AuthenticatedProfile> {
        session.user().await
    }

    /// Drop the bound profile; the session record itself survives
    ///
    /// # Returns
    /// Path to redirect to
    pub async fn logout(&self, session: &SessionHandle) -> &str {
        if let Some(user) = session.user().await {
            tracing::info!(user_id = %user.id, "User logged out");
        }
        session.clear_user().await;
        &self.redirects.logout
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::provider::MockIdentityProvider;
    use crate::session::Session;
    use url::Url;

    fn redirects() -> AuthRedirects {
        AuthRedirects {
            success: "/".to_string(),
            failure: "/failLogin".to_string(),
            logout: "/api/usuario".to_string(),
        }
    }

    fn alice() -> AuthenticatedProfile {
        AuthenticatedProfile {
            id: "42".to_string(),
            display_name: "Alice".to_string(),
            username: Some("alice".to_string()),
            photos: vec!["http://x/a.png".to_string()],
        }
    }

    fn bob() -> AuthenticatedProfile {
        AuthenticatedProfile {
            id: "7".to_string(),
            display_name: "Bob".to_string(),
            username: None,
            photos: vec![],
        }
    }

    fn pending() -> PendingAuthorization {
        PendingAuthorization {
            state: "state-1".to_string(),
            code_verifier: "verifier-1".to_string(),
        }
    }

    fn callback(code: &str) -> CallbackParams {
        CallbackParams {
            code: Some(code.to_string()),
            state: Some("state-1".to_string()),
            ..CallbackParams::default()
        }
    }

    fn anonymous_session() -> SessionHandle {
        SessionHandle::new(Session::new(chrono::Duration::minutes(10)))
    }

    fn gate_returning(result: Result<AuthenticatedProfile, ExchangeError>) -> AuthGate {
        let mut provider = MockIdentityProvider::new();
        provider
            .expect_exchange()
            .returning(move |_, _| result.clone());
        AuthGate::new(Arc::new(provider), redirects())
    }

    fn gate_never_exchanging() -> AuthGate {
        let mut provider = MockIdentityProvider::new();
        provider.expect_exchange().never();
        AuthGate::new(Arc::new(provider), redirects())
    }

    #[tokio::test]
    async fn successful_callback_binds_profile_and_rotates_id() {
        let gate = gate_returning(Ok(alice()));
        let session = anonymous_session();
        let original_id = session.id().await;

        assert_eq!(gate.current_user(&session).await, None);

        let target = gate
            .handle_callback(&session, Some(pending()), &callback("good"))
            .await;

        assert_eq!(target, "/");
        assert_eq!(gate.current_user(&session).await, Some(alice()));
        assert_ne!(session.id().await, original_id);
    }

    #[tokio::test]
    async fn exchange_failures_redirect_and_leave_session_unchanged() {
        for error in [
            ExchangeError::Denied("no".to_string()),
            ExchangeError::Invalid("forged".to_string()),
            ExchangeError::Unavailable("timeout".to_string()),
        ] {
            let gate = gate_returning(Err(error));

            let anonymous = anonymous_session();
            let before = anonymous.snapshot().await;
            let target = gate
                .handle_callback(&anonymous, Some(pending()), &callback("code"))
                .await;
            assert_eq!(target, "/failLogin");
            assert_eq!(anonymous.snapshot().await, before);

            let signed_in = anonymous_session();
            signed_in.bind_user(&bob()).await.unwrap();
            let before = signed_in.snapshot().await;
            let target = gate
                .handle_callback(&signed_in, Some(pending()), &callback("code"))
                .await;
            assert_eq!(target, "/failLogin");
            assert_eq!(signed_in.snapshot().await, before);
            assert_eq!(gate.current_user(&signed_in).await, Some(bob()));
        }
    }

    #[tokio::test]
    async fn provider_error_parameter_short_circuits() {
        let gate = gate_never_exchanging();
        let session = anonymous_session();

        let params = CallbackParams {
            error: Some("access_denied".to_string()),
            state: Some("state-1".to_string()),
            ..CallbackParams::default()
        };
        let target = gate.handle_callback(&session, Some(pending()), &params).await;

        assert_eq!(target, "/failLogin");
        assert_eq!(gate.current_user(&session).await, None);
    }

    #[tokio::test]
    async fn mismatched_or_missing_correlation_is_rejected() {
        let gate = gate_never_exchanging();
        let session = anonymous_session();

        let wrong_state = CallbackParams {
            code: Some("good".to_string()),
            state: Some("someone-else".to_string()),
            ..CallbackParams::default()
        };
        assert_eq!(
            gate.handle_callback(&session, Some(pending()), &wrong_state)
                .await,
            "/failLogin"
        );
        assert_eq!(
            gate.handle_callback(&session, None, &callback("good")).await,
            "/failLogin"
        );
        assert_eq!(
            gate.handle_callback(&session, Some(pending()), &callback(""))
                .await,
            "/failLogin"
        );
        assert_eq!(gate.current_user(&session).await, None);
    }

    #[tokio::test]
    async fn logout_returns_session_to_anonymous() {
        let gate = gate_returning(Ok(alice()));
        let session = anonymous_session();
        gate.handle_callback(&session, Some(pending()), &callback("good"))
            .await;
        assert!(gate.current_user(&session).await.is_some());

        let target = gate.logout(&session).await;

        assert_eq!(target, "/api/usuario");
        assert_eq!(gate.current_user(&session).await, None);
    }

    #[test]
    fn rejected_callback_is_counted_as_invalid() {
        crate::metrics::init_metrics();
        let gate = gate_never_exchanging();
        let before = LOGIN_ATTEMPTS_TOTAL.with_label_values(&["invalid"]).get();

        let target = gate.reject_callback(&ExchangeError::Invalid("duplicate field".to_string()));

        assert_eq!(target, "/failLogin");
        assert!(LOGIN_ATTEMPTS_TOTAL.with_label_values(&["invalid"]).get() > before);
    }

    #[test]
    fn begin_login_maps_provider_failure_to_failure_path() {
        let mut provider = MockIdentityProvider::new();
        provider
            .expect_authorization_request()
            .returning(|| Err(ExchangeError::Unavailable("down".to_string())));
        let gate = AuthGate::new(Arc::new(provider), redirects());

        assert_eq!(gate.begin_login().unwrap_err(), "/failLogin");
    }

    #[test]
    fn begin_login_passes_through_authorization_request() {
        let mut provider = MockIdentityProvider::new();
        provider.expect_authorization_request().returning(|| {
            Ok(AuthorizationRequest {
                url: Url::parse("https://provider.test/authorize?state=state-1").unwrap(),
                pending: pending(),
            })
        });
        let gate = AuthGate::new(Arc::new(provider), redirects());

        let request = gate.begin_login().unwrap();
        assert_eq!(request.pending, pending());
        assert_eq!(request.url.host_str(), Some("provider.test"));
    }

    #[test]
    fn redirects_follow_page_config() {
        let pages = PagesConfig {
            site_title: "Storefront".to_string(),
            home: "/shop".to_string(),
            failure: "/oops".to_string(),
            logout_landing: "/bye".to_string(),
            default_avatar: "/img/default-avatar.png".to_string(),
        };

        assert_eq!(
            AuthRedirects::from(&pages),
            AuthRedirects {
                success: "/shop".to_string(),
                failure: "/oops".to_string(),
                logout: "/bye".to_string(),
            }
        );
    }
}
