//! Registry configuration
//!
//! Settings are plain data loaded from TOML. Child registries inherit the
//! configuration of their parent and extend its name with their lifetime.

use crate::error::ConfigError;
use serde::Deserialize;

/// Default name of a root registry
const DEFAULT_NAME: &str = "root";

/// Configuration for a [`Registry`](crate::Registry).
///
/// # Examples
///
/// ```
/// use reinhardt_di::RegistryConfig;
///
/// let config = RegistryConfig::from_toml_str(
/// 	r#"
/// 	name = "app"
/// 	max_delegation_depth = 4
/// 	"#,
/// )
/// .unwrap();
///
/// assert_eq!(config.name(), "app");
/// assert!(config.capability_fallback());
/// assert_eq!(config.max_delegation_depth(), Some(4));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RegistryConfig {
	name: String,
	capability_fallback: bool,
	max_delegation_depth: Option<usize>,
}

impl RegistryConfig {
	/// Creates the default configuration.
	pub fn new() -> Self {
		Self::default()
	}

	/// Parses and validates a configuration from a TOML document.
	pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
		let config: Self = toml::from_str(source)?;
		config.validate()?;
		Ok(config)
	}

	/// Checks invariants that deserialization alone cannot express.
	pub fn validate(&self) -> Result<(), ConfigError> {
		if self.name.trim().is_empty() {
			return Err(ConfigError::Invalid(
				"registry name must not be empty".to_string(),
			));
		}
		Ok(())
	}

	/// Sets the registry name used in log output.
	pub fn with_name(mut self, name: impl Into<String>) -> Self {
		self.name = name.into();
		self
	}

	/// Enables or disables matching requested capabilities against the
	/// capability index when no exact-type entry exists.
	pub fn with_capability_fallback(mut self, enabled: bool) -> Self {
		self.capability_fallback = enabled;
		self
	}

	/// Caps how many parents a failed local lookup may visit.
	pub fn with_max_delegation_depth(mut self, depth: usize) -> Self {
		self.max_delegation_depth = Some(depth);
		self
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	pub fn capability_fallback(&self) -> bool {
		self.capability_fallback
	}

	pub fn max_delegation_depth(&self) -> Option<usize> {
		self.max_delegation_depth
	}

	/// Derives the configuration of a child registry.
	pub(crate) fn child(&self, label: &str) -> Self {
		Self {
			name: format!("{}/{}", self.name, label),
			..self.clone()
		}
	}
}

impl Default for RegistryConfig {
	fn default() -> Self {
		Self {
			name: DEFAULT_NAME.to_string(),
			capability_fallback: true,
			max_delegation_depth: None,
		}
	}
}
