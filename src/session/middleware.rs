//! Session middleware
//!
//! Attaches a session to every request and persists it afterwards.

use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::extract::SignedCookieJar;
use axum_extra::extract::cookie::{Cookie, SameSite};
use chrono::Duration;
use std::sync::Arc;
use tokio::sync::Mutex;

use super::{Session, SessionStore, StoreError, generate_session_id};
use crate::AppState;
use crate::auth::AuthenticatedProfile;
use crate::config::SessionConfig;
use crate::error::AppError;
use crate::metrics::{SESSION_STORE_ERRORS_TOTAL, SESSIONS_CREATED_TOTAL};

struct HandleState {
    session: Session,
    /// Id the session had before a rotation; its record must be destroyed
    retired_id: Option<String>,
}

/// The current request's session
///
/// Cloned into request extensions by [`session_layer`]; all clones share
/// one record, which the middleware persists once the handler returns.
#[derive(Clone)]
pub struct SessionHandle {
    inner: Arc<Mutex<HandleState>>,
}

impl SessionHandle {
    pub fn new(session: Session) -> Self {
        Self {
            inner: Arc::new(Mutex::new(HandleState {
                session,
                retired_id: None,
            })),
        }
    }

    pub async fn id(&self) -> String {
        self.inner.lock().await.session.id.clone()
    }

    pub async fn user(&self) -> Option<AuthenticatedProfile> {
        self.inner.lock().await.session.user()
    }

    pub async fn bind_user(&self, profile: &AuthenticatedProfile) -> Result<(), StoreError> {
        self.inner.lock().await.session.bind_user(profile)
    }

    pub async fn clear_user(&self) {
        self.inner.lock().await.session.clear_user();
    }

    /// Give the session a new id, keeping its data
    pub async fn rotate_id(&self) {
        let mut state = self.inner.lock().await;
        let old_id = std::mem::replace(&mut state.session.id, generate_session_id());
        if state.retired_id.is_none() {
            state.retired_id = Some(old_id);
        }
    }

    pub async fn snapshot(&self) -> Session {
        self.inner.lock().await.session.clone()
    }

    async fn finish(&self) -> (Session, Option<String>) {
        let mut state = self.inner.lock().await;
        (state.session.clone(), state.retired_id.take())
    }
}

/// Middleware attaching a [`SessionHandle`] to each request
///
/// # Steps
/// 1. Read the signed session cookie and load the record
/// 2. Fall back to a fresh session on miss, expiry or store failure
/// 3. Run the handler
/// 4. Destroy a rotated-away record, refresh the TTL and save
/// 5. (Re)issue the cookie with the full max age
///
/// # Usage
/// ```ignore
/// let app = Router::new()
///     .route("/", get(home))
///     .layer(middleware::from_fn_with_state(state.clone(), session_layer));
/// ```
pub async fn session_layer(
    State(state): State<AppState>,
    jar: SignedCookieJar,
    mut request: Request,
    next: Next,
) -> Response {
    let settings = &state.config.session;
    let ttl = settings.max_age();

    let cookie_id = jar
        .get(&settings.cookie_name)
        .map(|cookie| cookie.value().to_owned());
    let session = resume_session(state.sessions.as_ref(), cookie_id, ttl).await;

    let handle = SessionHandle::new(session);
    request.extensions_mut().insert(handle.clone());

    let response = next.run(request).await;

    let (mut session, retired_id) = handle.finish().await;
    if let Some(retired_id) = retired_id {
        if let Err(error) = state.sessions.destroy(&retired_id).await {
            SESSION_STORE_ERRORS_TOTAL
                .with_label_values(&["destroy"])
                .inc();
            tracing::warn!(%error, "Failed to destroy rotated session");
        }
    }

    if let Err(error) = state.sessions.touch(&mut session, ttl).await {
        SESSION_STORE_ERRORS_TOTAL.with_label_values(&["save"]).inc();
        tracing::warn!(%error, "Failed to persist session");
    }

    let cookie = build_session_cookie(settings, session.id, state.config.should_use_secure_cookies());
    (jar.add(cookie), response).into_response()
}

/// Load the session named by the cookie, or start a new one
///
/// A store failure yields a fresh, anonymous session rather than an error.
async fn resume_session(
    store: &dyn SessionStore,
    cookie_id: Option<String>,
    ttl: Duration,
) -> Session {
    if let Some(id) = cookie_id {
        match store.load(&id).await {
            Ok(Some(session)) => return session,
            Ok(None) => tracing::debug!("Session missing or expired; starting a new one"),
            Err(error) => {
                SESSION_STORE_ERRORS_TOTAL.with_label_values(&["load"]).inc();
                tracing::warn!(%error, "Session store unavailable; treating request as anonymous");
            }
        }
    }

    SESSIONS_CREATED_TOTAL.inc();
    Session::new(ttl)
}

fn build_session_cookie(settings: &SessionConfig, id: String, secure: bool) -> Cookie<'static> {
    Cookie::build((settings.cookie_name.clone(), id))
        .path("/")
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::seconds(settings.max_age_seconds))
        .build()
}

/// Extractor for the current request's session
///
/// # Usage
/// ```ignore
/// async fn handler(CurrentSession(session): CurrentSession) -> impl IntoResponse {
///     format!("session {}", session.id().await)
/// }
/// ```
#[derive(Clone)]
pub struct CurrentSession(pub SessionHandle);

#[async_trait]
impl<S> FromRequestParts<S> for CurrentSession
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<SessionHandle>()
            .cloned()
            .map(CurrentSession)
            .ok_or_else(|| AppError::Internal(anyhow::anyhow!("session middleware not installed")))
    }
}
