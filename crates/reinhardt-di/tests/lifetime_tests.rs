//! Lifetime scope tests
//!
//! These tests verify:
//! 1. Scoped children cache one instance per type and start empty
//! 2. Transient children never reuse constructed instances
//! 3. Pooled children are shared while alive and rebuilt once released

use reinhardt_di::{Lifetime, Registry};
use rstest::*;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Debug, PartialEq)]
struct Config {
	value: String,
}

struct Service {
	config: Arc<Config>,
}

fn new_service(registry: &Registry) -> Service {
	Service {
		config: registry.resolve_or_panic::<Config>(),
	}
}

#[fixture]
fn root() -> Arc<Registry> {
	let root = Arc::new(Registry::new());
	root.add(Config {
		value: "v".to_string(),
	});
	root
}

#[rstest]
#[case::scoped(Registry::scoped, Lifetime::Scoped)]
#[case::transient(Registry::transient, Lifetime::Transient)]
#[case::pooled(Registry::pooled, Lifetime::Pooled)]
fn children_start_empty_with_parent(
	root: Arc<Registry>,
	#[case] create: fn(&Arc<Registry>) -> Arc<Registry>,
	#[case] lifetime: Lifetime,
) {
	// Act
	let child = create(&root);

	// Assert
	assert_eq!(child.lifetime(), lifetime);
	assert!(child.is_empty());
	assert!(Arc::ptr_eq(child.parent().unwrap(), &root));
	assert_eq!(child.resolve::<Config>().unwrap().value, "v");
}

#[rstest]
fn root_is_a_singleton_scope(root: Arc<Registry>) {
	// Act
	let first = root.resolve_or_construct(new_service);
	let second = root.resolve_or_construct(new_service);

	// Assert
	assert_eq!(root.lifetime(), Lifetime::Singleton);
	assert!(Arc::ptr_eq(&first, &second));
	assert_eq!(first.config.value, "v");
}

#[rstest]
fn scoped_child_reuses_instance_within_scope(root: Arc<Registry>) {
	// Arrange
	let scope = Registry::scoped(&root);

	// Act
	let first = scope.resolve_or_construct(new_service);
	let second = scope.resolve_or_construct(new_service);

	// Assert
	assert!(Arc::ptr_eq(&first, &second));
	assert_eq!(scope.len(), 1);
}

#[rstest]
fn separate_scopes_get_separate_instances(root: Arc<Registry>) {
	// Arrange
	let first_scope = Registry::scoped(&root);
	let second_scope = Registry::scoped(&root);

	// Act
	let first = first_scope.resolve_or_construct(new_service);
	let second = second_scope.resolve_or_construct(new_service);

	// Assert
	assert!(!Arc::ptr_eq(&first, &second));
	assert!(!root.contains::<Service>());
}

#[rstest]
fn transient_child_constructs_every_time(root: Arc<Registry>) {
	// Arrange
	let transient = Registry::transient(&root);

	// Act
	let a = transient.resolve_or_construct(new_service);
	let b = transient.resolve_or_construct(new_service);

	// Assert
	assert!(!Arc::ptr_eq(&a, &b));
	assert!(Arc::ptr_eq(&a.config, &b.config));
	assert_eq!(b.config.value, "v");
	assert!(transient.is_empty());
}

#[rstest]
fn transient_child_ignores_cached_parent_instance(root: Arc<Registry>) {
	// Arrange
	let cached = root.resolve_or_construct(new_service);
	let transient = Registry::transient(&root);

	// Act
	let fresh = transient.resolve_or_construct(new_service);

	// Assert
	assert!(!Arc::ptr_eq(&cached, &fresh));
	assert!(Arc::ptr_eq(&transient.resolve::<Service>().unwrap(), &cached));
}

#[rstest]
fn scope_under_transient_caches_again(root: Arc<Registry>) {
	// Arrange
	let transient = Registry::transient(&root);
	let scope = Registry::scoped(&transient);

	// Act
	let first = scope.resolve_or_construct(new_service);
	let second = scope.resolve_or_construct(new_service);

	// Assert
	assert!(Arc::ptr_eq(&first, &second));
}

#[rstest]
fn pooled_child_is_shared_while_alive(root: Arc<Registry>) {
	// Arrange
	let first = Registry::pooled(&root);

	// Act
	let second = Registry::pooled(&root);
	let a = first.resolve_or_construct(new_service);
	let b = second.resolve_or_construct(new_service);

	// Assert
	assert!(Arc::ptr_eq(&first, &second));
	assert!(Arc::ptr_eq(&a, &b));
	assert!(root.has_live_pool());
}

#[rstest]
fn pooled_child_is_rebuilt_after_release(root: Arc<Registry>) {
	// Arrange
	let built = AtomicUsize::new(0);
	let build = |registry: &Registry| {
		built.fetch_add(1, Ordering::SeqCst);
		new_service(registry)
	};
	let pool = Registry::pooled(&root);
	pool.resolve_or_construct(build);

	// Act
	drop(pool);
	let released = !root.has_live_pool();
	let rebuilt = Registry::pooled(&root);
	rebuilt.resolve_or_construct(build);

	// Assert
	assert!(released);
	assert_eq!(built.load(Ordering::SeqCst), 2);
	assert_eq!(rebuilt.len(), 1);
}

#[rstest]
fn released_pool_is_not_revived(root: Arc<Registry>) {
	// Arrange
	let pool = Registry::pooled(&root);
	let weak = Arc::downgrade(&pool);
	drop(pool);

	// Act
	let newer = Registry::pooled(&root);

	// Assert
	assert!(weak.upgrade().is_none());
	assert!(root.has_live_pool());
	assert!(Arc::ptr_eq(&Registry::pooled(&root), &newer));
}

#[rstest]
fn pools_are_per_parent(root: Arc<Registry>) {
	// Arrange
	let scope = Registry::scoped(&root);

	// Act
	let root_pool = Registry::pooled(&root);
	let scope_pool = Registry::pooled(&scope);

	// Assert
	assert!(!Arc::ptr_eq(&root_pool, &scope_pool));
	assert_eq!(scope_pool.name(), "root/scoped/pooled");
	assert_eq!(scope_pool.resolve::<Config>().unwrap().value, "v");
}

#[rstest]
fn lifetime_caching_flags() {
	// Assert
	assert!(Lifetime::Singleton.caches_constructed());
	assert!(Lifetime::Scoped.caches_constructed());
	assert!(Lifetime::Pooled.caches_constructed());
	assert!(!Lifetime::Transient.caches_constructed());
}
