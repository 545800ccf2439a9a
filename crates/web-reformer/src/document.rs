//! Turning buffered response bytes into a navigable element tree.
//!
//! The tree itself comes from `scraper` (html5ever underneath). Its tree
//! builder closes a `<form>` met in table context at once and ignores a
//! `<form>` nested in another, so forms are read from the token stream
//! instead unless [`ParserOptions::auto_close_forms`] asks for the tree's
//! view.

use std::borrow::Cow;
use std::sync::{Arc, OnceLock};

use scraper::{ElementRef, Html};

use crate::forms::{extract_forms, scan_forms};
use crate::types::{FormRecord, ParseError};

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Builds a document tree from raw bytes.
pub trait MarkupParser: Send + Sync {
    fn parse(&self, bytes: &[u8]) -> Result<Html, ParseError>;

    /// Every form in the markup with its inputs.
    fn parse_forms(&self, bytes: &[u8]) -> Result<Vec<FormRecord>, ParseError> {
        Ok(extract_forms(&self.parse(bytes)?))
    }
}

/// How [`HtmlParser`] treats questionable input.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParserOptions {
    /// Replace invalid UTF-8 sequences instead of failing.
    pub lossy_utf8: bool,
    /// Fail when the tree builder reports any markup error.
    pub reject_malformed: bool,
    /// Take forms from the built tree, where a form opened inside a table
    /// is closed immediately and a nested form is dropped. By default a form
    /// stays open until its end tag.
    pub auto_close_forms: bool,
}

/// The default markup parser.
#[derive(Debug, Clone, Default)]
pub struct HtmlParser {
    options: ParserOptions,
}

impl HtmlParser {
    pub fn new(options: ParserOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> ParserOptions {
        self.options
    }

    fn decode<'a>(&self, bytes: &'a [u8]) -> Result<Cow<'a, str>, ParseError> {
        let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
        if self.options.lossy_utf8 {
            return Ok(String::from_utf8_lossy(bytes));
        }
        std::str::from_utf8(bytes)
            .map(Cow::Borrowed)
            .map_err(|e| ParseError::new(format!("body is not valid UTF-8: {e}")))
    }
}

impl MarkupParser for HtmlParser {
    fn parse(&self, bytes: &[u8]) -> Result<Html, ParseError> {
        let text = self.decode(bytes)?;
        let document = Html::parse_document(&text);

        if self.options.reject_malformed {
            if let Some(first) = document.errors.first() {
                return Err(ParseError::new(format!(
                    "{} markup error(s), first: {first}",
                    document.errors.len()
                )));
            }
        }
        Ok(document)
    }

    fn parse_forms(&self, bytes: &[u8]) -> Result<Vec<FormRecord>, ParseError> {
        if self.options.auto_close_forms {
            return Ok(extract_forms(&self.parse(bytes)?));
        }
        Ok(scan_forms(&self.decode(bytes)?))
    }
}

static DEFAULT_PARSER: OnceLock<Arc<HtmlParser>> = OnceLock::new();

/// Configure the process-wide default parser.
///
/// Only the first configuration takes effect, and only if it happens before
/// the first parse. Returns `false` when the default was already fixed.
pub fn configure_default_parser(options: ParserOptions) -> bool {
    let mut installed = false;
    DEFAULT_PARSER.get_or_init(|| {
        installed = true;
        Arc::new(HtmlParser::new(options))
    });
    if installed {
        tracing::debug!("default markup parser configured: {options:?}");
    }
    installed
}

/// The process-wide default parser, initialized on first use.
pub fn default_parser() -> Arc<dyn MarkupParser> {
    let parser = DEFAULT_PARSER.get_or_init(|| {
        tracing::debug!("default markup parser initialized with default options");
        Arc::new(HtmlParser::default())
    });
    Arc::clone(parser) as Arc<dyn MarkupParser>
}

/// Every element of the document in document order.
pub(crate) fn elements(document: &Html) -> impl Iterator<Item = ElementRef<'_>> {
    document.tree.root().descendants().filter_map(ElementRef::wrap)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_document() {
        let doc = HtmlParser::default()
            .parse(b"<html><body><p>one</p><p>two</p></body></html>")
            .unwrap();
        let names: Vec<_> = elements(&doc).map(|e| e.value().name().to_string()).collect();
        assert_eq!(names, vec!["html", "head", "body", "p", "p"]);
    }

    #[test]
    fn test_invalid_utf8_is_parse_error() {
        let err = HtmlParser::default().parse(b"<p>\xFF\xFE</p>").unwrap_err();
        assert!(err.message().contains("UTF-8"));
    }

    #[test]
    fn test_lossy_utf8_recovers() {
        let parser = HtmlParser::new(ParserOptions {
            lossy_utf8: true,
            ..ParserOptions::default()
        });
        let doc = parser.parse(b"<p>ok\xFF</p>").unwrap();
        assert_eq!(elements(&doc).filter(|e| e.value().name() == "p").count(), 1);
    }

    #[test]
    fn test_bom_is_stripped() {
        let doc = HtmlParser::default()
            .parse(b"\xEF\xBB\xBF<!DOCTYPE html><title>t</title>")
            .unwrap();
        assert!(elements(&doc).any(|e| e.value().name() == "title"));
    }

    #[test]
    fn test_reject_malformed() {
        let parser = HtmlParser::new(ParserOptions {
            reject_malformed: true,
            ..ParserOptions::default()
        });
        assert!(parser.parse(b"<!DOCTYPE html><p>fine</p>").is_ok());
        assert!(parser.parse(b"<!DOCTYPE html><p></div></p>").is_err());
    }

    #[test]
    fn test_form_contains_its_inputs() {
        let doc = HtmlParser::default()
            .parse(b"<form id=f><div><input name=a></div><input name=b></form><input name=c>")
            .unwrap();
        let form = elements(&doc).find(|e| e.value().name() == "form").unwrap();
        let nested = form
            .descendants()
            .filter_map(ElementRef::wrap)
            .filter(|e| e.value().name() == "input")
            .count();
        assert_eq!(nested, 2);
    }

    #[test]
    fn test_forms_stay_open_in_tables() {
        let markup = b"<table><form id=f><tr><td><input name=a></td></tr></form></table>";
        let open = HtmlParser::default().parse_forms(markup).unwrap();
        assert_eq!(open[0].fields.len(), 1);

        let closed = HtmlParser::new(ParserOptions {
            auto_close_forms: true,
            ..ParserOptions::default()
        })
        .parse_forms(markup)
        .unwrap();
        assert!(closed[0].fields.is_empty());
    }

    #[test]
    fn test_parse_forms_rejects_invalid_utf8() {
        assert!(HtmlParser::default().parse_forms(b"<form>\xFF</form>").is_err());
    }

    #[test]
    fn test_default_parser_is_shared() {
        let a = default_parser();
        let b = default_parser();
        assert!(Arc::ptr_eq(&a, &b));
        assert!(!configure_default_parser(ParserOptions::default()));
    }
}
