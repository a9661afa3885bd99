//! Markdown to HTML preview rendering.
//!
//! Every piece of user text is HTML-escaped on the way out; the only markup in
//! the output is the fixed tag set emitted by this module.

mod escape;
mod inline;
pub mod markdown;

use thiserror::Error;

pub use markdown::render;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("failed to render document: {0}")]
pub struct RenderError(pub String);

/// Turns raw document text into preview HTML
pub trait Renderer: Send + Sync {
    fn render(&self, source: &str) -> Result<String, RenderError>;
}

/// The production renderer. Total: it never returns an error.
#[derive(Clone, Copy, Debug, Default)]
pub struct MarkdownRenderer;

impl Renderer for MarkdownRenderer {
    fn render(&self, source: &str) -> Result<String, RenderError> {
        Ok(markdown::render(source))
    }
}
