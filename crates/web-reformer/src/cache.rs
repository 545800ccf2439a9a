//! Per-response memoization of the buffered body and every derived artifact.
//!
//! ## Policy
//!
//! The body is read from the transport exactly once and kept for the life of
//! the cache, whether or not caching is enabled. Derived artifacts go through
//! [`ResponseCache::get_or_compute`]: a hit returns the stored `Rc`, a miss
//! runs the computation and stores the result only when it succeeded and
//! caching is enabled. Failures are never stored, so the next call retries.

use std::any::Any;
use std::cell::{OnceCell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::io::{self, Read};
use std::rc::Rc;

use crate::handle::ResponseHandle;

/// The slot a derived artifact is stored under.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ArtifactKind {
    Document,
    Forms,
    /// Listing of every element with this exact tag name.
    Tags(String),
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArtifactKind::Document => f.write_str("document"),
            ArtifactKind::Forms => f.write_str("forms"),
            ArtifactKind::Tags(name) => write!(f, "tags<{name}>"),
        }
    }
}

/// Memoization slots for one response.
pub struct ResponseCache {
    enabled: bool,
    bytes: OnceCell<Rc<[u8]>>,
    artifacts: RefCell<HashMap<ArtifactKind, Rc<dyn Any>>>,
}

impl ResponseCache {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            bytes: OnceCell::new(),
            artifacts: RefCell::new(HashMap::new()),
        }
    }

    /// Whether derived artifacts are stored.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// The body, if it has been buffered already.
    pub fn buffered(&self) -> Option<Rc<[u8]>> {
        self.bytes.get().cloned()
    }

    /// The response body, read to completion on first call.
    pub fn buffered_bytes<H: ResponseHandle + ?Sized>(&self, handle: &mut H) -> io::Result<Rc<[u8]>> {
        if let Some(bytes) = self.bytes.get() {
            return Ok(Rc::clone(bytes));
        }

        let mut buf = Vec::new();
        handle.open_stream()?.read_to_end(&mut buf)?;
        tracing::debug!("buffered {} response bytes", buf.len());

        Ok(Rc::clone(self.bytes.get_or_init(|| Rc::from(buf))))
    }

    /// Return the artifact stored under `kind`, computing it on a miss.
    pub fn get_or_compute<T, E, F>(&self, kind: ArtifactKind, compute: F) -> Result<Rc<T>, E>
    where
        T: 'static,
        F: FnOnce() -> Result<T, E>,
    {
        if self.enabled {
            if let Some(hit) = self.lookup::<T>(&kind) {
                tracing::debug!("cache hit: {kind}");
                return Ok(hit);
            }
        }

        // No borrow is held here; computations may populate other slots.
        let value = Rc::new(compute()?);

        if self.enabled {
            tracing::debug!("cache store: {kind}");
            let erased: Rc<dyn Any> = value.clone();
            self.artifacts.borrow_mut().insert(kind, erased);
        }
        Ok(value)
    }

    /// Whether an artifact is currently stored under `kind`.
    pub fn is_cached(&self, kind: &ArtifactKind) -> bool {
        self.artifacts.borrow().contains_key(kind)
    }

    /// Number of stored artifacts, not counting the body buffer.
    pub fn len(&self) -> usize {
        self.artifacts.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.artifacts.borrow().is_empty()
    }

    /// Drop every derived artifact. The body buffer stays.
    pub fn clear(&self) {
        self.artifacts.borrow_mut().clear();
    }

    fn lookup<T: 'static>(&self, kind: &ArtifactKind) -> Option<Rc<T>> {
        let slot = self.artifacts.borrow().get(kind).cloned()?;
        match slot.downcast::<T>() {
            Ok(hit) => Some(hit),
            Err(_) => {
                tracing::warn!("cache slot {kind} holds an unexpected type, recomputing");
                None
            }
        }
    }
}

impl fmt::Debug for ResponseCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResponseCache")
            .field("enabled", &self.enabled)
            .field("buffered", &self.bytes.get().map(|b| b.len()))
            .field("artifacts", &self.artifacts.borrow().keys().collect::<Vec<_>>())
            .finish()
    }
}
