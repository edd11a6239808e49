//! Pull request body renderer.

use handlebars::{no_escape, Handlebars};
use serde_json::json;

use super::TemplateError;

const BACKPORT_PR_BODY: &str = include_str!("backport-pr-body.hbs");
const BACKPORT_CE_PR_BODY: &str = include_str!("backport-ce-pr-body.hbs");
const COPY_PR_BODY: &str = include_str!("copy-pr-body.hbs");

/// Which embedded body template to render.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrBodyTemplate {
    /// Backport onto an enterprise branch.
    Backport,
    /// Backport onto a community branch, with excluded files removed.
    BackportCe,
    /// Copy of a community pull request onto an enterprise branch.
    Copy,
}

impl PrBodyTemplate {
    fn source(self) -> &'static str {
        match self {
            Self::Backport => BACKPORT_PR_BODY,
            Self::BackportCe => BACKPORT_CE_PR_BODY,
            Self::Copy => COPY_PR_BODY,
        }
    }
}

/// Data available to the body templates.
#[derive(Debug, Clone)]
pub struct PrBodyData<'a> {
    pub origin_url: &'a str,
    pub origin_number: u64,
    pub origin_title: &'a str,
    pub target_ref: &'a str,
    /// The transfer error when the branch carries a placeholder commit.
    pub error: Option<&'a str>,
}

/// Renderer for the embedded pull request body templates.
///
/// The registry is configured with no HTML escaping (output is markdown)
/// and strict mode so missing variables fail loudly.
pub struct TemplateRenderer {
    handlebars: Handlebars<'static>,
}

impl Default for TemplateRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl TemplateRenderer {
    /// Creates a new renderer.
    #[must_use]
    pub fn new() -> Self {
        let mut hbs = Handlebars::new();
        hbs.register_escape_fn(no_escape);
        hbs.set_strict_mode(true);
        Self { handlebars: hbs }
    }

    /// Renders a pull request body.
    ///
    /// # Errors
    ///
    /// Returns an error if template rendering fails.
    pub fn render_pr_body(
        &self,
        template: PrBodyTemplate,
        data: &PrBodyData<'_>,
    ) -> Result<String, TemplateError> {
        let data = json!({
            "origin_url": data.origin_url,
            "origin_number": data.origin_number,
            "origin_title": data.origin_title,
            "target_ref": data.target_ref,
            "error": data.error.unwrap_or(""),
        });
        Ok(self.handlebars.render_template(template.source(), &data)?)
    }
}
