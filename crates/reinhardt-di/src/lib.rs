//! # Reinhardt Dependency Registry
//!
//! Runtime registry that hands out dependencies by type instead of having
//! callers construct or import them.
//!
//! ## Features
//!
//! - **Type-indexed**: Instances are stored and found by their concrete type
//! - **Capabilities**: An instance can declare trait objects it satisfies and
//!   be resolved through them
//! - **Delegation**: Lookups that miss locally continue up the parent chain
//! - **Lifetimes**: Singleton, scoped, transient and pooled scopes are plain
//!   child registries
//! - **Thread-safe**: Registration and lookup are guarded by a reader/writer lock
//!
//! ## Example
//!
//! ```rust
//! use reinhardt_di::Registry;
//! use std::sync::Arc;
//!
//! trait Store: Send + Sync {
//! 	fn get(&self, key: &str) -> Option<String>;
//! }
//!
//! #[derive(PartialEq)]
//! struct MemoryStore;
//!
//! impl Store for MemoryStore {
//! 	fn get(&self, key: &str) -> Option<String> {
//! 		Some(format!("value of {key}"))
//! 	}
//! }
//!
//! struct UserService {
//! 	store: Arc<dyn Store>,
//! }
//!
//! let root = Arc::new(Registry::new());
//! root.register(MemoryStore)
//! 	.provides::<dyn Store>(|store| store as Arc<dyn Store>)
//! 	.add();
//!
//! // One service per request scope
//! let request = Registry::scoped(&root);
//! let service = request.resolve_or_construct(|registry| UserService {
//! 	store: registry.resolve_or_panic::<dyn Store>(),
//! });
//!
//! assert_eq!(service.store.get("a").as_deref(), Some("value of a"));
//! ```
//!
//! ## Lifetimes
//!
//! | Constructor            | `resolve_or_construct` behaviour                     |
//! |------------------------|------------------------------------------------------|
//! | `Registry::new()`      | constructed once, cached for the registry lifetime   |
//! | `Registry::scoped`     | constructed once per child registry                  |
//! | `Registry::transient`  | constructed on every call, never cached              |
//! | `Registry::pooled`     | one shared child, rebuilt after its last handle drops |

pub mod config;
pub mod error;
pub mod key;
pub mod lifetime;
pub mod registry;
pub mod resolver;

pub use config::RegistryConfig;
pub use error::{ConfigError, DiError, DiResult};
pub use key::TypeKey;
pub use lifetime::Lifetime;
pub use registry::{Registration, Registry};
pub use resolver::{resolve, shared};
