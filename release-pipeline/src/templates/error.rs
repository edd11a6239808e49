//! Template rendering error type.

/// A pull request body template failed to render.
///
/// The templates are embedded and render in one shot, so rendering is the
/// only thing that can fail.
#[derive(Debug, thiserror::Error)]
#[error("rendering pull request body: {0}")]
pub struct TemplateError(#[from] handlebars::RenderError);
