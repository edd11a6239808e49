//! Pull request body rendering using Handlebars.
//!
//! The backport and copy workflows open pull requests whose bodies come
//! from embedded templates: one for enterprise backports, one for community
//! backports (which note the removal of enterprise-only files) and one for
//! copies.

mod error;
mod renderer;

pub use error::TemplateError;
pub use renderer::{PrBodyData, PrBodyTemplate, TemplateRenderer};
