//! Extracts `<form>` elements into [`FormRecord`]s.
//!
//! Identity attributes (`id`, `name`, `method`, `action`) take the first
//! attribute of that name, or the empty string. Every `<input>` inside the
//! form, at any depth, contributes one field entry in document order.
//!
//! Two strategies exist. [`scan_forms`] works on the token stream and keeps a
//! form open until its `</form>` (or the end of input), so forms wrapped in
//! tables and forms nested in forms keep their inputs. [`extract_forms`]
//! reads the built tree, where the tree builder closes an in-table form
//! immediately and drops a nested one.

use html5ever::tendril::StrTendril;
use html5ever::tokenizer::states::RawKind;
use html5ever::tokenizer::{
    BufferQueue, Tag, TagKind, Token, TokenSink, TokenSinkResult, Tokenizer, TokenizerOpts,
};
use scraper::{ElementRef, Html};

use crate::document::elements;
use crate::fields::FormFields;
use crate::types::FormRecord;

/// Extract every form in document order.
pub fn extract_forms(document: &Html) -> Vec<FormRecord> {
    elements(document)
        .filter(|el| el.value().name() == "form")
        .map(form_record)
        .collect()
}

fn form_record(form: ElementRef<'_>) -> FormRecord {
    let mut fields = FormFields::new();
    for input in form
        .descendants()
        .skip(1)
        .filter_map(ElementRef::wrap)
        .filter(|el| el.value().name() == "input")
    {
        // Attribute values are entity-decoded by the tokenizer. Decoding
        // again would turn a literal `&amp;lt;` into `<`.
        fields.add(first_attr(input, "name"), first_attr(input, "value"));
    }

    FormRecord {
        id: first_attr(form, "id"),
        name: first_attr(form, "name"),
        method: first_attr(form, "method"),
        action: first_attr(form, "action"),
        fields,
    }
}

/// Extract every form from decoded markup, following `<form>` start and end
/// tags rather than the tree builder's containment rules.
///
/// An `<input>` belongs to every form open at that point, so the inputs of a
/// nested form are listed under the outer form as well.
pub fn scan_forms(markup: &str) -> Vec<FormRecord> {
    let mut tokenizer = Tokenizer::new(FormScanner::default(), TokenizerOpts::default());
    let mut input = BufferQueue::default();
    input.push_back(StrTendril::from_slice(markup));
    let _ = tokenizer.feed(&mut input);
    tokenizer.end();

    let scanner = tokenizer.sink;
    if !scanner.open.is_empty() {
        tracing::debug!("{} form(s) left open at end of input", scanner.open.len());
    }
    scanner.forms
}

#[derive(Default)]
struct FormScanner {
    forms: Vec<FormRecord>,
    /// Indices into `forms`, innermost last.
    open: Vec<usize>,
}

impl FormScanner {
    fn start_tag(&mut self, tag: &Tag) -> TokenSinkResult<()> {
        match &*tag.name {
            "form" => {
                self.open.push(self.forms.len());
                self.forms.push(FormRecord {
                    id: tag_attr(tag, "id"),
                    name: tag_attr(tag, "name"),
                    method: tag_attr(tag, "method"),
                    action: tag_attr(tag, "action"),
                    ..FormRecord::default()
                });
            }
            "input" => {
                let name = tag_attr(tag, "name");
                let value = tag_attr(tag, "value");
                for &index in &self.open {
                    self.forms[index].fields.add(name.as_str(), value.as_str());
                }
            }
            // Text content of these elements is not markup.
            "script" => return TokenSinkResult::RawData(RawKind::ScriptData),
            "style" | "xmp" | "iframe" | "noembed" | "noframes" | "noscript" => {
                return TokenSinkResult::RawData(RawKind::Rawtext)
            }
            "title" | "textarea" => return TokenSinkResult::RawData(RawKind::Rcdata),
            "plaintext" => return TokenSinkResult::Plaintext,
            _ => {}
        }
        TokenSinkResult::Continue
    }
}

impl TokenSink for FormScanner {
    type Handle = ();

    fn process_token(&mut self, token: Token, _line_number: u64) -> TokenSinkResult<()> {
        match token {
            Token::TagToken(tag) => match tag.kind {
                TagKind::StartTag => self.start_tag(&tag),
                TagKind::EndTag => {
                    if &*tag.name == "form" {
                        self.open.pop();
                    }
                    TokenSinkResult::Continue
                }
            },
            _ => TokenSinkResult::Continue,
        }
    }
}

// The tokenizer already drops repeated attributes, keeping the first.
fn tag_attr(tag: &Tag, name: &str) -> String {
    tag.attrs
        .iter()
        .find(|attr| &*attr.name.local == name)
        .map(|attr| attr.value.to_string())
        .unwrap_or_default()
}

fn first_attr(el: ElementRef<'_>, name: &str) -> String {
    el.value()
        .attrs()
        .find(|(attr, _)| *attr == name)
        .map(|(_, value)| value.to_string())
        .unwrap_or_default()
}
