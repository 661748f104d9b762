//! Copy-on-write drafts over immutable state.
//!
//! [`produce`] hands a mutator a [`Draft`] of the current value. The draft
//! reads through to the original until the first mutable access, at which
//! point it takes a shallow copy and all edits land on the copy. The original
//! is never touched.
//!
//! Structural sharing comes from storing substructures behind [`Arc`]: a
//! shallow copy clones the `Arc`s, not the data, and nested edits go through
//! [`Arc::make_mut`], which copies only the node being written. Everything
//! the mutator does not touch stays pointer-equal to the input.
//!
//! # Example
//!
//! ```
//! use revux_core::draft::produce;
//! use std::collections::BTreeMap;
//! use std::sync::Arc;
//!
//! #[derive(Clone, Default)]
//! struct Todos {
//!     list: Arc<BTreeMap<u32, String>>,
//!     archived: Arc<Vec<String>>,
//!     selected: Option<u32>,
//! }
//!
//! let current = Arc::new(Todos::default());
//! let next = produce(&current, |draft| {
//!     Arc::make_mut(&mut draft.list).insert(1, "Buy milk".to_string());
//!     draft.selected = Some(1);
//! });
//!
//! assert!(current.list.is_empty());
//! assert_eq!(next.list.len(), 1);
//! assert!(Arc::ptr_eq(&current.archived, &next.archived));
//! ```

use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;

/// A mutable view over an immutable value
///
/// Dereferencing reads the original; the first mutable dereference clones it
/// (shallowly) and every later access sees the copy.
pub struct Draft<'a, T> {
    base: &'a T,
    copy: Option<T>,
}

impl<'a, T> Draft<'a, T> {
    /// Create a draft over `base`
    #[must_use]
    pub const fn new(base: &'a T) -> Self {
        Self { base, copy: None }
    }

    /// Whether the draft has been written to
    #[must_use]
    pub const fn is_modified(&self) -> bool {
        self.copy.is_some()
    }

    /// The value the draft was created from, ignoring any edits
    #[must_use]
    pub const fn original(&self) -> &T {
        self.base
    }

    /// Consume the draft, returning the edited copy if any write happened
    #[must_use]
    pub fn finish(self) -> Option<T> {
        self.copy
    }
}

impl<T> Deref for Draft<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        match &self.copy {
            Some(copy) => copy,
            None => self.base,
        }
    }
}

impl<T: Clone> DerefMut for Draft<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        let base = self.base;
        self.copy.get_or_insert_with(|| base.clone())
    }
}

impl<T: fmt::Debug> fmt::Debug for Draft<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Draft")
            .field("value", &**self)
            .field("modified", &self.is_modified())
            .finish()
    }
}

/// Apply `mutator` to a draft of `current` and return the resulting value
///
/// `current` is never mutated. If the mutator performs no write the returned
/// `Arc` is pointer-equal to `current`.
pub fn produce<T, F>(current: &Arc<T>, mutator: F) -> Arc<T>
where
    T: Clone,
    F: FnOnce(&mut Draft<'_, T>),
{
    let mut draft = Draft::new(current.as_ref());
    mutator(&mut draft);
    draft.finish().map_or_else(|| Arc::clone(current), Arc::new)
}

/// Fallible variant of [`produce`]
///
/// # Errors
///
/// Returns the mutator's error unchanged; the partially edited draft is
/// discarded and `current` is untouched.
pub fn try_produce<T, E, F>(current: &Arc<T>, mutator: F) -> Result<Arc<T>, E>
where
    T: Clone,
    F: FnOnce(&mut Draft<'_, T>) -> Result<(), E>,
{
    let mut draft = Draft::new(current.as_ref());
    mutator(&mut draft)?;
    Ok(draft.finish().map_or_else(|| Arc::clone(current), Arc::new))
}
