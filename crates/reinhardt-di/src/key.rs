//! Type identity used as the registry bucket key

use std::any::TypeId;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Runtime identity of a registered or requested type.
///
/// Equality and hashing use only the [`TypeId`]; the name is carried for
/// log output and error messages.
///
/// # Examples
///
/// ```
/// use reinhardt_di::TypeKey;
///
/// let key = TypeKey::of::<String>();
/// assert_eq!(key, TypeKey::of::<String>());
/// assert_ne!(key, TypeKey::of::<&'static str>());
/// assert_eq!(key.name(), "alloc::string::String");
/// ```
#[derive(Debug, Clone, Copy)]
pub struct TypeKey {
	id: TypeId,
	name: &'static str,
}

impl TypeKey {
	/// Returns the key of `T`. `T` may be a trait object.
	pub fn of<T: ?Sized + 'static>() -> Self {
		Self {
			id: TypeId::of::<T>(),
			name: std::any::type_name::<T>(),
		}
	}

	pub fn id(&self) -> TypeId {
		self.id
	}

	pub fn name(&self) -> &'static str {
		self.name
	}
}

impl PartialEq for TypeKey {
	fn eq(&self, other: &Self) -> bool {
		self.id == other.id
	}
}

impl Eq for TypeKey {}

impl Hash for TypeKey {
	fn hash<H: Hasher>(&self, state: &mut H) {
		self.id.hash(state);
	}
}

impl fmt::Display for TypeKey {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.name)
	}
}
