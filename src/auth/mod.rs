//! Twitter OAuth authentication
//!
//! Handles:
//! - The identity provider contract and its Twitter client
//! - Profile verification at the provider boundary
//! - The login/callback/logout lifecycle (the gate)
//! - Login HTTP endpoints

mod gate;
mod oauth;
mod profile;
mod provider;
mod twitter;

pub use gate::{AuthGate, AuthRedirects};
pub use oauth::auth_router;
pub use profile::{AuthenticatedProfile, ProviderProfile, verify_profile};
pub use provider::{
    AuthorizationRequest, CallbackParams, ExchangeError, IdentityProvider, PendingAuthorization,
};
pub use twitter::TwitterProvider;
