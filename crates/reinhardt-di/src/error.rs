//! Error types for registry lookups and configuration

use thiserror::Error;

/// Result alias used throughout the registry.
pub type DiResult<T> = Result<T, DiError>;

/// Errors returned by dependency resolution.
///
/// Resolution has exactly one failure mode: nothing in the registry, its
/// capability index, or its parent chain satisfies the requested type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DiError {
	/// No registered instance satisfies the requested type.
	#[error("dependency not found: {type_name}")]
	NotFound {
		/// Name of the requested type, as reported by `std::any::type_name`
		type_name: &'static str,
	},
}

impl DiError {
	/// Builds a `NotFound` error for `T`.
	pub fn not_found<T: ?Sized + 'static>() -> Self {
		Self::NotFound {
			type_name: std::any::type_name::<T>(),
		}
	}

	/// Returns `true` for the `NotFound` variant.
	pub fn is_not_found(&self) -> bool {
		matches!(self, Self::NotFound { .. })
	}
}

/// Errors raised while loading a [`RegistryConfig`](crate::RegistryConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
	/// The TOML source could not be parsed into a configuration.
	#[error("invalid registry configuration: {0}")]
	Parse(#[from] toml::de::Error),
	/// The configuration parsed but holds an unusable value.
	#[error("invalid registry configuration: {0}")]
	Invalid(String),
}
