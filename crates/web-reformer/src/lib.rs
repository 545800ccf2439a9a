//! Web Reformer: memoized document, form, link and image views over completed HTTP responses.

pub mod cache;
pub mod document;
pub mod fields;
pub mod forms;
pub mod handle;
pub mod request;
pub mod tags;
pub mod types;
pub mod view;

pub use cache::{ArtifactKind, ResponseCache};
pub use document::{configure_default_parser, default_parser, HtmlParser, MarkupParser, ParserOptions};
pub use fields::{FormField, FormFields};
pub use forms::{extract_forms, scan_forms};
pub use handle::{BufferedResponse, ResponseHandle};
pub use request::{write_body, OutgoingRequest, PreparedRequest};
pub use tags::collect_tags;
pub use types::*;
pub use view::{best_effort, ResponseView, SharedForms, ViewConfig};
