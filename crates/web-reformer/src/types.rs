//! Core data types for extracted views and their errors.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::fields::FormFields;

/// Reserved tag record key holding the element name.
pub const TAG_NAME_KEY: &str = "tagName";
/// Reserved tag record key holding the serialized children.
pub const INNER_HTML_KEY: &str = "innerHTML";
/// Reserved tag record key holding the serialized element itself.
pub const OUTER_HTML_KEY: &str = "outerHTML";
/// Reserved tag record key holding the concatenated descendant text.
pub const INNER_TEXT_KEY: &str = "innerText";

/// One markup element: the four reserved keys overlaid by every attribute.
///
/// An attribute whose name collides with a reserved key replaces the
/// computed value.
pub type TagRecord = BTreeMap<String, String>;

/// Structured view of one `<form>` element.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormRecord {
    pub id: String,
    pub name: String,
    pub method: String,
    pub action: String,
    pub fields: FormFields,
}

impl FormRecord {
    /// Resolve the form action against the URL of the page it came from.
    ///
    /// An empty action submits back to the page itself.
    pub fn resolve_action(&self, page_url: &Url) -> Result<Url, url::ParseError> {
        let action = self.action.trim();
        if action.is_empty() {
            return Ok(page_url.clone());
        }
        page_url.join(action)
    }
}

/// The markup parser could not build a document from the buffered body.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("Unable to load document from response body: {message}")]
pub struct ParseError {
    message: String,
}

impl ParseError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// The underlying parser message.
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Errors surfaced by the strict accessors of a response view.
#[derive(thiserror::Error, Debug)]
pub enum ViewError {
    /// Reading the response stream failed. Passed through from the transport.
    #[error("Transport error: {0}")]
    Transport(#[from] std::io::Error),

    #[error(transparent)]
    Parse(#[from] ParseError),
}

/// Convenience result type.
pub type ViewResult<T> = Result<T, ViewError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn form_with_action(action: &str) -> FormRecord {
        FormRecord {
            action: action.to_string(),
            ..FormRecord::default()
        }
    }

    #[test]
    fn test_resolve_relative_action() {
        let page = Url::parse("https://example.com/account/login").unwrap();
        let resolved = form_with_action("session/new").resolve_action(&page).unwrap();
        assert_eq!(resolved.as_str(), "https://example.com/account/session/new");
    }

    #[test]
    fn test_resolve_absolute_action() {
        let page = Url::parse("https://example.com/").unwrap();
        let resolved = form_with_action("https://auth.example.org/login")
            .resolve_action(&page)
            .unwrap();
        assert_eq!(resolved.as_str(), "https://auth.example.org/login");
    }

    #[test]
    fn test_resolve_empty_action_targets_page() {
        let page = Url::parse("https://example.com/login?next=%2F").unwrap();
        let resolved = form_with_action("  ").resolve_action(&page).unwrap();
        assert_eq!(resolved, page);
    }

    #[test]
    fn test_parse_error_message() {
        let err = ViewError::from(ParseError::new("bad bytes"));
        assert!(err.to_string().contains("bad bytes"));
        assert!(matches!(err, ViewError::Parse(ref p) if p.message() == "bad bytes"));
    }
}
