//! Lifetime scopes built from nested registries
//!
//! A scope is a child registry whose parent is the registry it was created
//! from. Lookups that miss in the child fall through to the parent, so values
//! registered higher up behave like singletons while values constructed in
//! the child live as long as the child does.

use crate::registry::Registry;
use std::sync::{Arc, PoisonError, Weak};

/// How long instances constructed through a registry are cached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Lifetime {
	/// Root registry; constructed instances live as long as the registry
	Singleton,
	/// One instance per type per child registry
	Scoped,
	/// A new instance on every construction request, never cached
	Transient,
	/// A single child shared by all callers until the last handle drops
	Pooled,
}

impl Lifetime {
	/// Whether `resolve_or_construct` reuses and stores instances.
	pub fn caches_constructed(self) -> bool {
		!matches!(self, Self::Transient)
	}

	pub(crate) fn label(self) -> &'static str {
		match self {
			Self::Singleton => "singleton",
			Self::Scoped => "scoped",
			Self::Transient => "transient",
			Self::Pooled => "pooled",
		}
	}
}

impl Registry {
	/// Creates a child whose construction requests always build a new instance.
	///
	/// # Examples
	///
	/// ```
	/// use reinhardt_di::Registry;
	/// use std::sync::Arc;
	///
	/// struct Request;
	///
	/// let root = Arc::new(Registry::new());
	/// let transient = Registry::transient(&root);
	///
	/// let a = transient.resolve_or_construct(|_| Request);
	/// let b = transient.resolve_or_construct(|_| Request);
	/// assert!(!Arc::ptr_eq(&a, &b));
	/// ```
	pub fn transient(parent: &Arc<Registry>) -> Arc<Registry> {
		Arc::new(Registry::child(parent, Lifetime::Transient))
	}

	/// Creates a child that caches one constructed instance per type.
	///
	/// # Examples
	///
	/// ```
	/// use reinhardt_di::Registry;
	/// use std::sync::Arc;
	///
	/// struct Session;
	///
	/// let root = Arc::new(Registry::new());
	/// let first = Registry::scoped(&root);
	///
	/// let a = first.resolve_or_construct(|_| Session);
	/// let b = first.resolve_or_construct(|_| Session);
	/// assert!(Arc::ptr_eq(&a, &b));
	///
	/// let second = Registry::scoped(&root);
	/// let c = second.resolve_or_construct(|_| Session);
	/// assert!(!Arc::ptr_eq(&a, &c));
	/// ```
	pub fn scoped(parent: &Arc<Registry>) -> Arc<Registry> {
		Arc::new(Registry::child(parent, Lifetime::Scoped))
	}

	/// Returns the pooled child of `parent`, creating it on first use.
	///
	/// Every call made while a previously returned handle is alive yields the
	/// same registry. Dropping the last handle detaches the child from
	/// `parent`, and the next call starts a fresh one.
	///
	/// # Examples
	///
	/// ```
	/// use reinhardt_di::Registry;
	/// use std::sync::Arc;
	///
	/// let root = Arc::new(Registry::new());
	///
	/// let first = Registry::pooled(&root);
	/// let again = Registry::pooled(&root);
	/// assert!(Arc::ptr_eq(&first, &again));
	///
	/// drop(first);
	/// drop(again);
	/// assert!(!root.has_live_pool());
	/// ```
	pub fn pooled(parent: &Arc<Registry>) -> Arc<Registry> {
		let mut slot = parent.pool.lock().unwrap_or_else(PoisonError::into_inner);
		if let Some(existing) = slot.upgrade() {
			return existing;
		}

		let fresh = Arc::new(Registry::child(parent, Lifetime::Pooled));
		*slot = Arc::downgrade(&fresh);
		tracing::debug!(
			registry = %parent.config.name(),
			pool = %fresh.config.name(),
			"pooled registry created"
		);
		fresh
	}

	/// Whether a pooled child of this registry is currently alive.
	pub fn has_live_pool(&self) -> bool {
		self.pool
			.lock()
			.unwrap_or_else(PoisonError::into_inner)
			.strong_count()
			> 0
	}
}

impl Drop for Registry {
	fn drop(&mut self) {
		if self.lifetime != Lifetime::Pooled {
			return;
		}
		let Some(parent) = self.parent.as_ref() else {
			return;
		};

		let mut slot = parent.pool.lock().unwrap_or_else(PoisonError::into_inner);
		// A newer pool may already occupy the slot.
		if std::ptr::eq(slot.as_ptr(), &*self) {
			*slot = Weak::new();
			tracing::debug!(
				registry = %parent.config.name(),
				pool = %self.config.name(),
				"pooled registry released"
			);
		}
	}
}
