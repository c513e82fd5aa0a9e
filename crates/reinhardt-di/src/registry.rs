//! Type-indexed store of registered instances

use crate::config::RegistryConfig;
use crate::key::TypeKey;
use crate::lifetime::Lifetime;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard, Weak};

type Erased = dyn Any + Send + Sync;

/// How an entry decides whether another entry holds the same instance.
#[derive(Clone, Copy)]
enum Equality {
	/// `PartialEq` on the stored values
	Value(fn(&Erased, &Erased) -> bool),
	/// Same `Arc` allocation
	Identity,
}

fn value_eq<T: PartialEq + 'static>(left: &Erased, right: &Erased) -> bool {
	match (left.downcast_ref::<T>(), right.downcast_ref::<T>()) {
		(Some(left), Some(right)) => left == right,
		_ => false,
	}
}

fn same_allocation(left: &Arc<Erased>, right: &Arc<Erased>) -> bool {
	std::ptr::addr_eq(Arc::as_ptr(left), Arc::as_ptr(right))
}

/// A registered instance with every view it can be resolved as.
pub(crate) struct Entry {
	key: TypeKey,
	value: Arc<Erased>,
	/// `TypeId::of::<U>()` to a boxed `Arc<U>`, including the concrete type itself
	views: HashMap<TypeId, Box<Erased>>,
	/// Capability types in declaration order, excluding the concrete type
	capabilities: Vec<TypeKey>,
	equality: Equality,
}

impl Entry {
	pub(crate) fn view<T: ?Sized + 'static>(&self) -> Option<Arc<T>> {
		self.views
			.get(&TypeId::of::<T>())
			.and_then(|view| view.downcast_ref::<Arc<T>>())
			.cloned()
	}

	fn same_instance(&self, other: &Entry) -> bool {
		match self.equality {
			Equality::Value(eq) => eq(&*self.value, &*other.value),
			Equality::Identity => same_allocation(&self.value, &other.value),
		}
	}
}

/// Bucketed storage guarded by the registry lock.
///
/// Every entry of `buckets` and `capabilities` is also in `wildcard`.
#[derive(Default)]
pub(crate) struct Store {
	buckets: HashMap<TypeKey, Vec<Arc<Entry>>>,
	capabilities: HashMap<TypeKey, Vec<Arc<Entry>>>,
	wildcard: Vec<Arc<Entry>>,
}

impl Store {
	/// Entries registered under exactly `key`, in insertion order.
	pub(crate) fn exact(&self, key: &TypeKey) -> &[Arc<Entry>] {
		self.buckets.get(key).map(Vec::as_slice).unwrap_or_default()
	}

	/// Entries that declared `key` as a capability, in insertion order.
	pub(crate) fn providers(&self, key: &TypeKey) -> &[Arc<Entry>] {
		self.capabilities
			.get(key)
			.map(Vec::as_slice)
			.unwrap_or_default()
	}

	/// Stores `entry`, handing it back when an equal instance is already present.
	fn insert(&mut self, entry: Entry) -> Option<Entry> {
		let bucket = self.buckets.entry(entry.key).or_default();
		if bucket.iter().any(|existing| entry.same_instance(existing)) {
			return Some(entry);
		}
		let entry = Arc::new(entry);
		bucket.push(Arc::clone(&entry));
		for capability in &entry.capabilities {
			self.capabilities
				.entry(*capability)
				.or_default()
				.push(Arc::clone(&entry));
		}
		self.wildcard.push(entry);
		None
	}

	/// Detaches matching entries and returns them, so the caller can drop
	/// them after releasing the lock.
	fn remove_where(
		&mut self,
		key: &TypeKey,
		mut matches: impl FnMut(&Entry) -> bool,
	) -> Vec<Arc<Entry>> {
		let Some(bucket) = self.buckets.get_mut(key) else {
			return Vec::new();
		};
		let mut removed = Vec::new();
		bucket.retain(|entry| {
			if matches(entry) {
				removed.push(Arc::clone(entry));
				false
			} else {
				true
			}
		});
		if bucket.is_empty() {
			self.buckets.remove(key);
		}

		for entry in &removed {
			for capability in &entry.capabilities {
				if let Some(providers) = self.capabilities.get_mut(capability) {
					providers.retain(|provider| !Arc::ptr_eq(provider, entry));
					if providers.is_empty() {
						self.capabilities.remove(capability);
					}
				}
			}
		}
		self.wildcard
			.retain(|entry| !removed.iter().any(|gone| Arc::ptr_eq(gone, entry)));
		removed
	}
}

/// Runtime registry of heterogeneous instances.
///
/// Instances are stored by their concrete type and, optionally, by the
/// capabilities (usually trait objects) they declare at registration. A
/// registry may have a parent; lookups that fail locally continue up the
/// parent chain.
///
/// Registries are shared behind `Arc` so that children created through
/// [`Registry::scoped`], [`Registry::transient`] and [`Registry::pooled`]
/// can keep their parent alive.
///
/// # Examples
///
/// ```
/// use reinhardt_di::Registry;
/// use std::sync::Arc;
///
/// #[derive(Debug, PartialEq)]
/// struct Config {
/// 	value: String,
/// }
///
/// let registry = Arc::new(Registry::new());
/// registry.add(Config { value: "v".to_string() });
///
/// let config = registry.resolve::<Config>().unwrap();
/// assert_eq!(config.value, "v");
/// ```
pub struct Registry {
	pub(crate) config: RegistryConfig,
	pub(crate) lifetime: Lifetime,
	pub(crate) parent: Option<Arc<Registry>>,
	store: RwLock<Store>,
	/// Weak slot for the pooled child handed out by [`Registry::pooled`]
	pub(crate) pool: Mutex<Weak<Registry>>,
}

impl Registry {
	/// Creates an empty root registry with the default configuration.
	pub fn new() -> Self {
		Self::with_config(RegistryConfig::default())
	}

	/// Creates an empty root registry.
	///
	/// The configuration is used as given. Only
	/// [`RegistryConfig::from_toml_str`] validates; call
	/// [`RegistryConfig::validate`] first for configurations built in code.
	pub fn with_config(config: RegistryConfig) -> Self {
		Self {
			config,
			lifetime: Lifetime::Singleton,
			parent: None,
			store: RwLock::new(Store::default()),
			pool: Mutex::new(Weak::new()),
		}
	}

	/// Creates an empty child of `parent` with the given lifetime.
	pub(crate) fn child(parent: &Arc<Registry>, lifetime: Lifetime) -> Self {
		Self {
			config: parent.config.child(lifetime.label()),
			lifetime,
			parent: Some(Arc::clone(parent)),
			store: RwLock::new(Store::default()),
			pool: Mutex::new(Weak::new()),
		}
	}

	pub(crate) fn read(&self) -> RwLockReadGuard<'_, Store> {
		self.store.read().unwrap_or_else(PoisonError::into_inner)
	}

	fn write(&self) -> RwLockWriteGuard<'_, Store> {
		self.store.write().unwrap_or_else(PoisonError::into_inner)
	}

	/// Registers `instance` under its concrete type.
	///
	/// Adding a value equal to one already registered is a no-op.
	///
	/// # Examples
	///
	/// ```
	/// use reinhardt_di::Registry;
	///
	/// let registry = Registry::new();
	/// registry.add(42u32);
	/// registry.add(42u32);
	///
	/// assert_eq!(registry.len(), 1);
	/// ```
	pub fn add<T>(&self, instance: T)
	where
		T: PartialEq + Send + Sync + 'static,
	{
		self.register(instance).add();
	}

	/// Registers an already shared instance under its concrete type.
	///
	/// Instances added this way are compared by identity: adding the same
	/// `Arc` twice is a no-op, while two distinct allocations are both kept.
	pub fn add_shared<T>(&self, instance: Arc<T>)
	where
		T: Send + Sync + 'static,
	{
		self.register_shared(instance).add();
	}

	/// Starts a registration that can declare capabilities for `instance`.
	///
	/// # Examples
	///
	/// ```
	/// use reinhardt_di::Registry;
	/// use std::sync::Arc;
	///
	/// trait Greeter: Send + Sync {
	/// 	fn greet(&self) -> String;
	/// }
	///
	/// #[derive(PartialEq)]
	/// struct English;
	///
	/// impl Greeter for English {
	/// 	fn greet(&self) -> String {
	/// 		"hello".to_string()
	/// 	}
	/// }
	///
	/// let registry = Registry::new();
	/// registry
	/// 	.register(English)
	/// 	.provides::<dyn Greeter>(|english| english as Arc<dyn Greeter>)
	/// 	.add();
	///
	/// let greeter = registry.resolve::<dyn Greeter>().unwrap();
	/// assert_eq!(greeter.greet(), "hello");
	/// ```
	pub fn register<T>(&self, instance: T) -> Registration<'_, T>
	where
		T: PartialEq + Send + Sync + 'static,
	{
		Registration::new(self, Arc::new(instance), Equality::Value(value_eq::<T>))
	}

	/// Starts a registration for an already shared instance, compared by identity.
	pub fn register_shared<T>(&self, instance: Arc<T>) -> Registration<'_, T>
	where
		T: Send + Sync + 'static,
	{
		Registration::new(self, instance, Equality::Identity)
	}

	fn insert(&self, entry: Entry) {
		let key = entry.key;
		// Instance destructors may call back into this registry.
		let rejected = {
			let mut store = self.write();
			store.insert(entry)
		};
		if rejected.is_none() {
			tracing::debug!(
				registry = %self.config.name(),
				type_name = key.name(),
				"dependency added"
			);
		}
	}

	/// Removes every instance equal to `instance` from its type bucket, the
	/// capability index and the wildcard bucket.
	///
	/// Removing an instance that is not registered is a no-op.
	pub fn remove<T>(&self, instance: &T)
	where
		T: PartialEq + Send + Sync + 'static,
	{
		let key = TypeKey::of::<T>();
		let removed = {
			let mut store = self.write();
			store.remove_where(&key, |entry| {
				entry
					.value
					.downcast_ref::<T>()
					.is_some_and(|stored| stored == instance)
			})
		};
		self.log_removed(key, removed.len());
	}

	/// Removes the entry holding exactly this `Arc` allocation.
	pub fn remove_shared<T>(&self, instance: &Arc<T>)
	where
		T: Send + Sync + 'static,
	{
		let key = TypeKey::of::<T>();
		let target: Arc<Erased> = Arc::clone(instance) as Arc<Erased>;
		let removed = {
			let mut store = self.write();
			store.remove_where(&key, |entry| same_allocation(&entry.value, &target))
		};
		self.log_removed(key, removed.len());
	}

	fn log_removed(&self, key: TypeKey, removed: usize) {
		if removed > 0 {
			tracing::debug!(
				registry = %self.config.name(),
				type_name = key.name(),
				removed,
				"dependency removed"
			);
		}
	}

	/// Number of instances registered locally (parents excluded).
	pub fn len(&self) -> usize {
		self.read().wildcard.len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	/// Returns `true` when `T` resolves from this registry without consulting
	/// its parents.
	pub fn contains<T: ?Sized + 'static>(&self) -> bool {
		self.lookup_local::<T>().is_some()
	}

	/// Names of the concrete types registered locally, in first-registration order.
	pub fn type_names(&self) -> Vec<&'static str> {
		let store = self.read();
		let mut names: Vec<&'static str> = Vec::new();
		for entry in &store.wildcard {
			if !names.contains(&entry.key.name()) {
				names.push(entry.key.name());
			}
		}
		names
	}

	pub fn name(&self) -> &str {
		self.config.name()
	}

	pub fn config(&self) -> &RegistryConfig {
		&self.config
	}

	pub fn lifetime(&self) -> Lifetime {
		self.lifetime
	}

	/// The registry this one delegates failed lookups to.
	pub fn parent(&self) -> Option<&Arc<Registry>> {
		self.parent.as_ref()
	}
}

impl Default for Registry {
	fn default() -> Self {
		Self::new()
	}
}

impl fmt::Debug for Registry {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Registry")
			.field("name", &self.config.name())
			.field("lifetime", &self.lifetime)
			.field("len", &self.len())
			.field("parent", &self.parent.as_ref().map(|parent| parent.name()))
			.finish()
	}
}

/// Pending registration returned by [`Registry::register`].
///
/// Nothing is stored until [`Registration::add`] is called.
#[must_use = "a registration does nothing until `add` is called"]
pub struct Registration<'a, T> {
	registry: &'a Registry,
	instance: Arc<T>,
	views: HashMap<TypeId, Box<Erased>>,
	capabilities: Vec<TypeKey>,
	equality: Equality,
}

impl<'a, T> Registration<'a, T>
where
	T: Send + Sync + 'static,
{
	fn new(registry: &'a Registry, instance: Arc<T>, equality: Equality) -> Self {
		let mut views: HashMap<TypeId, Box<Erased>> = HashMap::new();
		views.insert(TypeId::of::<T>(), Box::new(Arc::clone(&instance)));
		Self {
			registry,
			instance,
			views,
			capabilities: Vec::new(),
			equality,
		}
	}

	/// Declares that the instance can also be resolved as `U`.
	///
	/// `cast` converts the shared instance into the capability view, which is
	/// usually an unsizing coercion such as `|this| this as Arc<dyn Trait>`.
	/// Declaring the same capability twice keeps the first view.
	pub fn provides<U>(mut self, cast: impl FnOnce(Arc<T>) -> Arc<U>) -> Self
	where
		U: ?Sized + Send + Sync + 'static,
	{
		let key = TypeKey::of::<U>();
		if self.views.contains_key(&key.id()) {
			return self;
		}
		let view: Arc<U> = cast(Arc::clone(&self.instance));
		self.views.insert(key.id(), Box::new(view));
		self.capabilities.push(key);
		self
	}

	/// Stores the instance with every declared capability.
	pub fn add(self) {
		let entry = Entry {
			key: TypeKey::of::<T>(),
			value: self.instance as Arc<Erased>,
			views: self.views,
			capabilities: self.capabilities,
			equality: self.equality,
		};
		self.registry.insert(entry);
	}
}
