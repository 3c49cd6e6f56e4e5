//! Service-specific error types
//!
//! Authentication failures never reach this type: the controller turns them
//! into an inline page message. What remains is failing to produce the page.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("template registration failed: {0}")]
    Template(#[from] Box<handlebars::TemplateError>),

    #[error("page rendering failed: {0}")]
    Render(#[from] handlebars::RenderError),
}

/// Result alias using service Error
pub type Result<T> = std::result::Result<T, Error>;
