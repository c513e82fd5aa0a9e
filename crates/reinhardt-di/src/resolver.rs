//! Dependency resolution
//!
//! A lookup for `T` runs in three phases:
//!
//! 1. the exact-type bucket of `T`,
//! 2. the capability index, for instances that declared `T` at registration,
//! 3. the parent chain, repeating phases 1 and 2 on each ancestor.
//!
//! The local phases of a registry run under its read lock. The lock is
//! released before moving to the parent, so no lock is ever held across the
//! walk. The chain itself is acyclic because parents are fixed when a child
//! is created.

use crate::error::{DiError, DiResult};
use crate::key::TypeKey;
use crate::registry::Registry;
use std::convert::Infallible;
use std::sync::Arc;

impl Registry {
	/// Looks `T` up in this registry only.
	pub(crate) fn lookup_local<T: ?Sized + 'static>(&self) -> Option<Arc<T>> {
		let key = TypeKey::of::<T>();
		let store = self.read();

		let exact = store.exact(&key).iter().find_map(|entry| entry.view::<T>());
		if exact.is_some() || !self.config.capability_fallback() {
			return exact;
		}
		store
			.providers(&key)
			.iter()
			.find_map(|entry| entry.view::<T>())
	}

	/// Resolves an instance satisfying `T` from this registry or its parents.
	///
	/// `T` is either a concrete registered type or a capability declared
	/// through [`Registration::provides`](crate::Registration::provides). The
	/// first match wins; exact-type entries take precedence over capability
	/// providers, and local entries over inherited ones.
	///
	/// # Errors
	///
	/// Returns [`DiError::NotFound`] when nothing in the chain satisfies `T`.
	///
	/// # Examples
	///
	/// ```
	/// use reinhardt_di::Registry;
	/// use std::sync::Arc;
	///
	/// let root = Arc::new(Registry::new());
	/// root.add("shared".to_string());
	///
	/// let scope = Registry::scoped(&root);
	/// assert_eq!(*scope.resolve::<String>().unwrap(), "shared");
	/// assert!(scope.resolve::<u8>().is_err());
	/// ```
	pub fn resolve<T: ?Sized + 'static>(&self) -> DiResult<Arc<T>> {
		let max_hops = self.config.max_delegation_depth();
		let mut current = self;
		let mut hops = 0usize;

		loop {
			if let Some(found) = current.lookup_local::<T>() {
				tracing::trace!(
					registry = %self.config.name(),
					type_name = std::any::type_name::<T>(),
					hops,
					"dependency resolved"
				);
				return Ok(found);
			}
			let Some(parent) = current.parent.as_deref() else {
				break;
			};
			if max_hops.is_some_and(|max| hops >= max) {
				break;
			}
			current = parent;
			hops += 1;
		}

		tracing::trace!(
			registry = %self.config.name(),
			type_name = std::any::type_name::<T>(),
			hops,
			"dependency not found"
		);
		Err(DiError::not_found::<T>())
	}

	/// Resolves `T`, panicking when it is missing.
	///
	/// Use this where a missing dependency is a programming error.
	///
	/// # Panics
	///
	/// Panics with `dependency not found: <type>` when `T` cannot be resolved.
	pub fn resolve_or_panic<T: ?Sized + 'static>(&self) -> Arc<T> {
		match self.resolve::<T>() {
			Ok(found) => found,
			Err(err) => panic!("{err}"),
		}
	}

	/// Resolves `T`, or builds it with `constructor` and caches the result.
	///
	/// The constructor receives this registry so it can resolve its own
	/// dependencies. The new instance is registered here, not in the parent
	/// that may have been consulted during the lookup.
	///
	/// A [`Lifetime::Transient`](crate::Lifetime::Transient) registry skips
	/// both the lookup and the caching, so every call constructs.
	///
	/// The lookup, the construction and the registration are not one atomic
	/// step. Concurrent callers racing on a missing type may each construct an
	/// instance; all of them are registered and later lookups return the
	/// first one added.
	///
	/// # Examples
	///
	/// ```
	/// use reinhardt_di::Registry;
	/// use std::sync::Arc;
	///
	/// struct Service {
	/// 	name: Arc<String>,
	/// }
	///
	/// let root = Arc::new(Registry::new());
	/// root.add("config".to_string());
	///
	/// let first = root.resolve_or_construct(|registry| Service {
	/// 	name: registry.resolve_or_panic::<String>(),
	/// });
	/// let second = root.resolve_or_construct(|_| -> Service { unreachable!() });
	///
	/// assert!(Arc::ptr_eq(&first, &second));
	/// assert_eq!(*first.name, "config");
	/// ```
	pub fn resolve_or_construct<T, F>(&self, constructor: F) -> Arc<T>
	where
		T: Send + Sync + 'static,
		F: FnOnce(&Registry) -> T,
	{
		match self.get_or_build::<T, Infallible>(|registry| Ok(constructor(registry))) {
			Ok(instance) => instance,
			Err(never) => match never {},
		}
	}

	/// Fallible variant of [`Registry::resolve_or_construct`].
	///
	/// # Errors
	///
	/// Returns the constructor's error unchanged; nothing is registered in
	/// that case.
	pub fn try_resolve_or_construct<T, F>(&self, constructor: F) -> DiResult<Arc<T>>
	where
		T: Send + Sync + 'static,
		F: FnOnce(&Registry) -> DiResult<T>,
	{
		self.get_or_build(constructor)
	}

	fn get_or_build<T, E>(
		&self,
		constructor: impl FnOnce(&Registry) -> Result<T, E>,
	) -> Result<Arc<T>, E>
	where
		T: Send + Sync + 'static,
	{
		let caches = self.lifetime.caches_constructed();
		if caches {
			if let Ok(found) = self.resolve::<T>() {
				return Ok(found);
			}
		}

		let instance = Arc::new(constructor(self)?);
		tracing::debug!(
			registry = %self.config.name(),
			type_name = std::any::type_name::<T>(),
			lifetime = ?self.lifetime,
			"dependency constructed"
		);
		if caches {
			self.add_shared(Arc::clone(&instance));
		}
		Ok(instance)
	}
}

/// Resolves `T` from an optional registry.
///
/// An absent registry behaves like an empty one and yields
/// [`DiError::NotFound`].
///
/// # Examples
///
/// ```
/// use reinhardt_di::{Registry, resolve};
///
/// assert!(resolve::<u32>(None).unwrap_err().is_not_found());
///
/// let registry = Registry::new();
/// registry.add(7u32);
/// assert_eq!(*resolve::<u32>(Some(&registry)).unwrap(), 7);
/// ```
pub fn resolve<T: ?Sized + 'static>(registry: Option<&Registry>) -> DiResult<Arc<T>> {
	match registry {
		Some(registry) => registry.resolve::<T>(),
		None => Err(DiError::not_found::<T>()),
	}
}

/// Moves `value` behind a shared pointer.
///
/// Handy for adapting a value to APIs that take `Arc<T>`, such as
/// [`Registry::add_shared`].
pub fn shared<T>(value: T) -> Arc<T> {
	Arc::new(value)
}
