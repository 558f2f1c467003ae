//! Twitter login endpoints
//!
//! Thin HTTP wrappers around [`AuthGate`](super::AuthGate).

use axum::{
    Router,
    extract::{Query, State, rejection::QueryRejection},
    response::{Html, IntoResponse, Redirect},
    routing::get,
};
use axum_extra::extract::SignedCookieJar;
use axum_extra::extract::cookie::{Cookie, SameSite};

use super::provider::{CallbackParams, ExchangeError, PendingAuthorization};
use crate::AppState;
use crate::config::AppConfig;
use crate::error::AppError;
use crate::render::{RenderContext, pages};
use crate::session::CurrentSession;

/// Cookie carrying the in-flight login's state and PKCE verifier
const PENDING_COOKIE: &str = "oauth_pending";
const PENDING_MAX_AGE_SECONDS: i64 = 600;

/// Create authentication router
///
/// Routes:
/// - GET / - Home page
/// - GET /tw-login - Login page
/// - GET /auth/twitter - Redirect to Twitter
/// - GET /auth/twitter/callback - OAuth callback
/// - GET /failLogin - Login failure page
/// - GET /tw-logout - Logout
///
/// The home, failure and callback paths come from configuration.
pub fn auth_router(config: &AppConfig) -> Router<AppState> {
    Router::new()
        .route(&config.pages.home, get(home))
        .route("/tw-login", get(login_page))
        .route("/auth/twitter", get(twitter_redirect))
        .route(&config.twitter.callback_path, get(twitter_callback))
        .route(&config.pages.failure, get(fail_login_page))
        .route("/tw-logout", get(logout))
}

// =============================================================================
// Pages
// =============================================================================

/// GET /
///
/// Renders the home page for the current session.
async fn home(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
) -> Result<Html<String>, AppError> {
    let user = state.gate.current_user(&session).await;
    let context = RenderContext::for_user(user.as_ref(), &state.config.pages.default_avatar);
    Ok(Html(state.renderer.render(pages::HOME, &context)?))
}

/// GET /tw-login
async fn login_page(State(state): State<AppState>) -> Result<Html<String>, AppError> {
    Ok(Html(
        state
            .renderer
            .render(pages::LOGIN, &RenderContext::anonymous())?,
    ))
}

/// GET /failLogin
async fn fail_login_page(State(state): State<AppState>) -> Result<Html<String>, AppError> {
    Ok(Html(
        state
            .renderer
            .render(pages::FAIL_LOGIN, &RenderContext::anonymous())?,
    ))
}

// =============================================================================
// Twitter OAuth
// =============================================================================

/// GET /auth/twitter
///
/// Redirects user to Twitter authorization page.
///
/// # Steps
/// 1. Ask the gate for an authorization request (state + PKCE)
/// 2. Store state and verifier in a signed, short-lived cookie
/// 3. Redirect to Twitter
async fn twitter_redirect(State(state): State<AppState>, jar: SignedCookieJar) -> impl IntoResponse {
    match state.gate.begin_login() {
        Ok(request) => {
            let cookie = build_pending_cookie(
                &request.pending,
                &state.config.twitter.callback_path,
                state.config.should_use_secure_cookies(),
            );
            (jar.add(cookie), Redirect::to(request.url.as_str())).into_response()
        }
        Err(failure) => Redirect::to(failure).into_response(),
    }
}

/// GET /auth/twitter/callback
///
/// Handles OAuth callback from Twitter.
///
/// # Steps
/// 1. Take the pending login from its cookie (and clear the cookie)
/// 2. Let the gate verify state, exchange the code and bind the profile;
///    an unparseable query counts as an invalid provider response
/// 3. Redirect to home on success, to the failure page otherwise
async fn twitter_callback(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
    jar: SignedCookieJar,
    query: Result<Query<CallbackParams>, QueryRejection>,
) -> impl IntoResponse {
    let pending = jar
        .get(PENDING_COOKIE)
        .and_then(|cookie| PendingAuthorization::from_cookie_value(cookie.value()));

    let target = match query {
        Ok(Query(params)) => state.gate.handle_callback(&session, pending, &params).await,
        Err(rejection) => state.gate.reject_callback(&ExchangeError::Invalid(format!(
            "malformed callback query: {}",
            rejection.body_text()
        ))),
    };

    let jar = jar.remove(clear_pending_cookie(&state.config.twitter.callback_path));
    (jar, Redirect::to(target))
}

// =============================================================================
// Logout
// =============================================================================

/// GET /tw-logout
///
/// Unbinds the user from the session and redirects to the user area.
async fn logout(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
) -> impl IntoResponse {
    Redirect::to(state.gate.logout(&session).await)
}

// =============================================================================
// Helpers
// =============================================================================

fn build_pending_cookie(
    pending: &PendingAuthorization,
    callback_path: &str,
    secure: bool,
) -> Cookie<'static> {
    Cookie::build((PENDING_COOKIE, pending.to_cookie_value()))
        .path(callback_path.to_string())
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::seconds(PENDING_MAX_AGE_SECONDS))
        .build()
}

fn clear_pending_cookie(callback_path: &str) -> Cookie<'static> {
    let mut cookie = Cookie::build((PENDING_COOKIE, ""))
        .path(callback_path.to_string())
        .http_only(true)
        .build();
    cookie.make_removal();
    cookie
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pending_cookie_is_scoped_to_callback() {
        let pending = PendingAuthorization {
            state: "s".to_string(),
            code_verifier: "v".to_string(),
        };

        let cookie = build_pending_cookie(&pending, "/auth/twitter/callback", false);
        assert_eq!(cookie.value(), "s.v");
        assert_eq!(cookie.path(), Some("/auth/twitter/callback"));
        assert_eq!(cookie.same_site(), Some(SameSite::Lax));

        let removal = clear_pending_cookie("/auth/twitter/callback");
        assert_eq!(removal.path(), Some("/auth/twitter/callback"));
        assert_eq!(removal.max_age(), Some(time::Duration::ZERO));
    }
}
