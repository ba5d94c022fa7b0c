use std::cell::RefCell;
use std::fmt::Debug;

use crate::tag::Revision;
use crate::tracker::{self, Dependencies};

/// A memoized computation.
///
/// The wrapped function runs on the first `execute` and again only after one
/// of the tags it read has been dirtied. Between runs the cached value is
/// returned and the recorded dependencies are forwarded to the enclosing
/// computation, so caches compose.
pub struct Cache<A, T> {
	name: &'static str,
	func: Box<dyn Fn(A) -> T>,
	state: RefCell<CacheState<T>>,
}

struct CacheState<T> {
	value: Option<T>,
	// `None` until the first run.
	settled: Option<Revision>,
	dependencies: Dependencies,
}

impl<T> CacheState<T> {
	fn is_valid(&self) -> bool {
		self.settled == Some(self.dependencies.max_revision())
	}
}

impl<A, T> Cache<A, T>
where
	A: 'static,
	T: Clone + 'static,
{
	pub fn new(func: impl Fn(A) -> T + 'static) -> Self {
		Self::new_with_name("<unnamed>", func)
	}

	pub fn new_with_name(name: &'static str, func: impl Fn(A) -> T + 'static) -> Self {
		Cache {
			name,
			func: Box::new(func),
			state: RefCell::new(CacheState {
				value: None,
				settled: None,
				dependencies: Dependencies::new(),
			}),
		}
	}

	/// Returns the cached value, running the function first if any tag it
	/// read last time has been dirtied since.
	pub fn execute(&self, args: A) -> T {
		{
			let state = self.state.borrow();
			if state.is_valid() {
				if let Some(value) = &state.value {
					tracker::propagate(&state.dependencies);
					return value.clone();
				}
			}
		}

		// No borrow is held while `func` runs, it may read other caches
		// or even this one.
		let (value, dependencies) = tracker::track(|| (self.func)(args));
		let settled = dependencies.max_revision();
		tracing::trace!(
			name = self.name,
			%settled,
			dependencies = dependencies.len(),
			"cache recomputed"
		);

		let mut state = self.state.borrow_mut();
		state.settled = Some(settled);
		state.dependencies = dependencies;
		state.value = Some(value.clone());
		value
	}

	/// Wraps `func` in a cache owned by the returned closure.
	pub fn memoize(func: impl Fn(A) -> T + 'static) -> impl Fn(A) -> T {
		let cache = Cache::new(func);
		move |args| cache.execute(args)
	}
}

impl<A, T> Cache<A, T> {
	pub fn name(&self) -> &'static str {
		self.name
	}

	/// Highest revision among the tags read by the last run.
	pub fn revision(&self) -> Revision {
		self.state.borrow().dependencies.max_revision()
	}

	/// Whether the next `execute` would return the cached value.
	pub fn is_valid(&self) -> bool {
		self.state.borrow().is_valid()
	}

	pub fn dependency_count(&self) -> usize {
		self.state.borrow().dependencies.len()
	}
}

impl<T> Cache<(), T>
where
	T: Clone + 'static,
{
	#[inline]
	pub fn value(&self) -> T {
		self.execute(())
	}
}

impl<A, T> Debug for Cache<A, T> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let state = self.state.borrow();
		f.debug_struct("Cache")
			.field("name", &self.name)
			.field("settled", &state.settled)
			.field("dependencies", &state.dependencies.len())
			.finish()
	}
}

/// Wraps `func` so it is memoized by the tracking system.
pub fn memoize<A, T>(func: impl Fn(A) -> T + 'static) -> impl Fn(A) -> T
where
	A: 'static,
	T: Clone + 'static,
{
	Cache::memoize(func)
}
