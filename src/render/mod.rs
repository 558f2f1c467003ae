//! Server-side page rendering
//!
//! Pages are registered by name and rendered inside a shared layout.
//! Every interpolated value is HTML-escaped.

mod context;
pub mod pages;

pub use context::RenderContext;

use std::collections::HashMap;
use thiserror::Error;

/// Rendering failures
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TemplateError {
    #[error("unknown template: {0}")]
    UnknownTemplate(String),

    /// Context violates the authenticated-iff-named invariant
    #[error("invalid render context: {0}")]
    InvalidContext(String),
}

/// Produces the body of a page from its context
pub type PageTemplate = fn(&RenderContext) -> String;

/// Renders named pages
pub struct PageRenderer {
    site_title: String,
    templates: HashMap<&'static str, PageTemplate>,
}

impl PageRenderer {
    /// Create a renderer with the built-in pages registered
    pub fn new(site_title: impl Into<String>) -> Self {
        let mut templates: HashMap<&'static str, PageTemplate> = HashMap::new();
        templates.insert(pages::HOME, pages::home);
        templates.insert(pages::LOGIN, pages::login);
        templates.insert(pages::FAIL_LOGIN, pages::fail_login);

        Self {
            site_title: site_title.into(),
            templates,
        }
    }

    /// Render `name` with `context`
    ///
    /// # Errors
    /// Unknown template names and contexts breaking the invariant are
    /// rejected before any HTML is produced.
    pub fn render(&self, name: &str, context: &RenderContext) -> Result<String, TemplateError> {
        let template = self
            .templates
            .get(name)
            .ok_or_else(|| TemplateError::UnknownTemplate(name.to_string()))?;
        context.validate()?;

        Ok(pages::layout(&self.site_title, &template(context)))
    }
}
