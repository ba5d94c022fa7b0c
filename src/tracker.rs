use std::cell::RefCell;

use fxhash::FxHashSet;

use crate::tag::{Revision, Tag};

thread_local! {
	// `None` frames are untracked regions pushed by `untracked`.
	static FRAMES: RefCell<Vec<Option<Dependencies>>> = const { RefCell::new(Vec::new()) };
}

/// The set of tags read by one computation.
#[derive(Clone, Default)]
pub struct Dependencies {
	tags: FxHashSet<Tag>,
}

impl Dependencies {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn insert(&mut self, tag: Tag) -> bool {
		self.tags.insert(tag)
	}

	pub fn contains(&self, tag: &Tag) -> bool {
		self.tags.contains(tag)
	}

	pub fn extend(&mut self, other: &Dependencies) {
		self.tags.extend(other.tags.iter().cloned());
	}

	/// Highest revision among the tags, `Revision::ZERO` when empty.
	pub fn max_revision(&self) -> Revision {
		self.tags
			.iter()
			.map(Tag::revision)
			.max()
			.unwrap_or(Revision::ZERO)
	}

	pub fn len(&self) -> usize {
		self.tags.len()
	}

	pub fn is_empty(&self) -> bool {
		self.tags.is_empty()
	}

	pub fn iter(&self) -> impl Iterator<Item = &Tag> {
		self.tags.iter()
	}
}

impl std::fmt::Debug for Dependencies {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Dependencies")
			.field("len", &self.len())
			.field("max_revision", &self.max_revision())
			.finish()
	}
}

/// Pops its frame when dropped, so a panicking computation cannot leave a
/// stale frame on the stack.
struct Frame {
	depth: usize,
	popped: bool,
}

impl Frame {
	fn push(frame: Option<Dependencies>) -> Self {
		let depth = FRAMES.with(|f| {
			let mut frames = f.borrow_mut();
			frames.push(frame);
			frames.len()
		});

		Frame {
			depth,
			popped: false,
		}
	}

	fn pop(mut self) -> Option<Dependencies> {
		self.popped = true;
		FRAMES.with(|f| {
			let mut frames = f.borrow_mut();
			debug_assert_eq!(frames.len(), self.depth, "tracking frames out of balance");
			frames.pop().flatten()
		})
	}
}

impl Drop for Frame {
	fn drop(&mut self) {
		if !self.popped {
			FRAMES.with(|f| {
				f.borrow_mut().truncate(self.depth - 1);
			});
		}
	}
}

/// Runs `func` as a new computation and returns what it produced together
/// with every tag it read, directly or through nested computations.
///
/// The captured tags are also merged into the enclosing computation.
pub fn track<R>(func: impl FnOnce() -> R) -> (R, Dependencies) {
	let frame = Frame::push(Some(Dependencies::new()));
	let result = func();
	let dependencies = frame.pop().unwrap_or_default();
	propagate(&dependencies);
	(result, dependencies)
}

/// Runs `func` with tracking suspended. Reads inside are not attributed to
/// any computation and dirtying is never reentrant.
pub fn untracked<R>(func: impl FnOnce() -> R) -> R {
	let frame = Frame::push(None);
	let result = func();
	frame.pop();
	result
}

pub fn is_tracking() -> bool {
	FRAMES.with(|f| matches!(f.borrow().last(), Some(Some(_))))
}

pub(crate) fn consume(tag: &Tag) {
	FRAMES.with(|f| {
		if let Some(Some(current)) = f.borrow_mut().last_mut() {
			current.insert(tag.clone());
		}
	});
}

pub(crate) fn is_consumed(tag: &Tag) -> bool {
	FRAMES.with(|f| match f.borrow().last() {
		Some(Some(current)) => current.contains(tag),
		_ => false,
	})
}

/// Forwards `dependencies` to the running computation, if any.
pub(crate) fn propagate(dependencies: &Dependencies) {
	if dependencies.is_empty() {
		return;
	}

	FRAMES.with(|f| {
		if let Some(Some(current)) = f.borrow_mut().last_mut() {
			current.extend(dependencies);
		}
	});
}
