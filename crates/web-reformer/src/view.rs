//! [`ResponseView`]: a response handle plus the memoized views of its body.
//!
//! Two families of accessors exist:
//!
//! * **strict**: [`ResponseView::document`], [`ResponseView::try_tags`] and
//!   [`ResponseView::try_forms`] return a [`ViewResult`] and surface
//!   transport and parse failures.
//! * **best-effort**: [`ResponseView::tags`], [`ResponseView::links`],
//!   [`ResponseView::images`] and [`ResponseView::forms`] never fail. A
//!   failure is logged and turned into an empty collection, which is not
//!   cached. An empty result is therefore ambiguous between "nothing there"
//!   and "could not extract".
//!
//! The parsed tree is not `Send`, so a view stays on the thread that made it.

use std::cell::{Ref, RefCell};
use std::io;
use std::rc::Rc;
use std::sync::Arc;

use scraper::Html;

use crate::cache::{ArtifactKind, ResponseCache};
use crate::document::{default_parser, MarkupParser};
use crate::handle::ResponseHandle;
use crate::tags::collect_tags;
use crate::types::{FormRecord, TagRecord, ViewResult};

/// Forms of a response, shared with the cache so edits to `fields` are seen
/// by every later call.
pub type SharedForms = Rc<RefCell<Vec<FormRecord>>>;

/// Per-view settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewConfig {
    /// Store derived artifacts. The body is buffered either way.
    pub caching: bool,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self { caching: true }
    }
}

/// Memoized document, form and tag views over one response.
pub struct ResponseView<H> {
    handle: RefCell<H>,
    cache: ResponseCache,
    parser: Arc<dyn MarkupParser>,
    config: ViewConfig,
}

impl<H: ResponseHandle> ResponseView<H> {
    pub fn new(handle: H) -> Self {
        Self::with_config(handle, ViewConfig::default())
    }

    pub fn with_config(handle: H, config: ViewConfig) -> Self {
        Self::with_parser(handle, config, default_parser())
    }

    pub fn with_parser(handle: H, config: ViewConfig, parser: Arc<dyn MarkupParser>) -> Self {
        Self {
            handle: RefCell::new(handle),
            cache: ResponseCache::new(config.caching),
            parser,
            config,
        }
    }

    pub fn config(&self) -> ViewConfig {
        self.config
    }

    /// Borrow the underlying handle.
    ///
    /// The first extraction reads the body through the same handle. While
    /// this guard is alive that read fails, and best-effort accessors come
    /// back empty.
    pub fn handle(&self) -> Ref<'_, H> {
        self.handle.borrow()
    }

    pub fn cache(&self) -> &ResponseCache {
        &self.cache
    }

    pub fn into_handle(self) -> H {
        self.handle.into_inner()
    }

    /// The buffered response body.
    pub fn body(&self) -> ViewResult<Rc<[u8]>> {
        if let Some(bytes) = self.cache.buffered() {
            return Ok(bytes);
        }
        let mut handle = self
            .handle
            .try_borrow_mut()
            .map_err(|_| io::Error::other("response handle is borrowed elsewhere"))?;
        Ok(self.cache.buffered_bytes(&mut *handle)?)
    }

    /// The parsed document. The only accessor whose parse failures reach
    /// the caller without a `try_` prefix.
    pub fn document(&self) -> ViewResult<Rc<Html>> {
        self.cache.get_or_compute(ArtifactKind::Document, || {
            let bytes = self.body()?;
            Ok(self.parser.parse(&bytes)?)
        })
    }

    /// Every element named `tag_name`, failing if the document is unavailable.
    pub fn try_tags(&self, tag_name: &str) -> ViewResult<Rc<Vec<TagRecord>>> {
        self.cache
            .get_or_compute(ArtifactKind::Tags(tag_name.to_string()), || {
                let document = self.document()?;
                Ok(collect_tags(&document, tag_name))
            })
    }

    /// Best-effort [`try_tags`](Self::try_tags).
    pub fn tags(&self, tag_name: &str) -> Rc<Vec<TagRecord>> {
        best_effort(tag_name, self.try_tags(tag_name))
    }

    /// Best-effort listing of `<img>` elements.
    pub fn images(&self) -> Rc<Vec<TagRecord>> {
        self.tags("img")
    }

    /// Best-effort listing of `<a>` elements.
    pub fn links(&self) -> Rc<Vec<TagRecord>> {
        self.tags("a")
    }

    /// Every form, failing if the document is unavailable.
    pub fn try_forms(&self) -> ViewResult<SharedForms> {
        self.cache.get_or_compute(ArtifactKind::Forms, || {
            // Parse failures surface through the document first.
            self.document()?;
            let bytes = self.body()?;
            Ok(RefCell::new(self.parser.parse_forms(&bytes)?))
        })
    }

    /// Best-effort [`try_forms`](Self::try_forms).
    pub fn forms(&self) -> SharedForms {
        best_effort("form", self.try_forms())
    }

    /// Snapshot of the first form with the given `id`.
    pub fn form_by_id(&self, id: &str) -> Option<FormRecord> {
        self.forms().borrow().iter().find(|f| f.id == id).cloned()
    }

    /// Forget every derived artifact. The buffered body is kept.
    pub fn clear_cache(&self) {
        self.cache.clear();
    }
}

/// Best-effort extraction: a failure becomes `T::default()` and is logged.
///
/// Nothing is cached on failure, so the next call tries again.
pub fn best_effort<T: Default>(what: &str, result: ViewResult<Rc<T>>) -> Rc<T> {
    result.unwrap_or_else(|e| {
        tracing::warn!("{what} extraction failed, returning empty result: {e}");
        Rc::new(T::default())
    })
}
