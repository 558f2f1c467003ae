//! Data handed to page templates

use super::TemplateError;
use crate::auth::AuthenticatedProfile;

/// Template context
///
/// `tw_user_name` and `avatar` are present (and non-empty) exactly when
/// `status` is true. Fields are private so the constructors can hold that.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderContext {
    status: bool,
    tw_user_name: Option<String>,
    avatar: Option<String>,
}

impl RenderContext {
    pub fn anonymous() -> Self {
        Self {
            status: false,
            tw_user_name: None,
            avatar: None,
        }
    }

    pub fn authenticated(
        tw_user_name: impl Into<String>,
        avatar: impl Into<String>,
    ) -> Result<Self, TemplateError> {
        let context = Self {
            status: true,
            tw_user_name: Some(tw_user_name.into()),
            avatar: Some(avatar.into()),
        };
        context.validate()?;
        Ok(context)
    }

    /// Context for the current user, if any
    ///
    /// Profiles without a photo get `default_avatar`. A profile that still
    /// cannot satisfy the invariant renders as anonymous.
    pub fn for_user(user: Option<&AuthenticatedProfile>, default_avatar: &str) -> Self {
        let Some(user) = user else {
            return Self::anonymous();
        };

        let avatar = user.avatar().unwrap_or(default_avatar);
        Self::authenticated(user.display_name.as_str(), avatar).unwrap_or_else(|error| {
            tracing::warn!(user_id = %user.id, %error, "Rendering user as anonymous");
            Self::anonymous()
        })
    }

    pub fn validate(&self) -> Result<(), TemplateError> {
        let named = is_present(&self.tw_user_name);
        let pictured = is_present(&self.avatar);

        match (self.status, named, pictured) {
            (true, true, true) | (false, false, false) => Ok(()),
            (true, _, _) => Err(TemplateError::InvalidContext(
                "authenticated context needs a user name and avatar".to_string(),
            )),
            (false, _, _) => Err(TemplateError::InvalidContext(
                "anonymous context must not carry user details".to_string(),
            )),
        }
    }

    pub fn status(&self) -> bool {
        self.status
    }

    pub fn tw_user_name(&self) -> Option<&str> {
        self.tw_user_name.as_deref()
    }

    pub fn avatar(&self) -> Option<&str> {
        self.avatar.as_deref()
    }
}

fn is_present(value: &Option<String>) -> bool {
    value.as_deref().is_some_and(|value| !value.trim().is_empty())
}
