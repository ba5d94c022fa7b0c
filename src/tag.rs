use std::cell::{Cell, RefCell};
use std::fmt::{self, Debug, Display};
use std::hash::{Hash, Hasher};
use std::rc::Rc;

use crate::error::{Error, Result};
use crate::tracker;

thread_local! {
	static CLOCK: Cell<u64> = const { Cell::new(0) };
	static ON_TAG_DIRTIED: RefCell<Option<Rc<dyn Fn() -> Result<()>>>> = const { RefCell::new(None) };
}

/// A value of the revision clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Revision(u64);

impl Revision {
	pub const ZERO: Revision = Revision(0);

	pub fn get(self) -> u64 {
		self.0
	}
}

impl Display for Revision {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		Display::fmt(&self.0, f)
	}
}

/// The revision the clock is currently at.
pub fn current_revision() -> Revision {
	Revision(CLOCK.with(|c| c.get()))
}

fn advance_clock() -> Revision {
	CLOCK.with(|c| {
		let next = c.get() + 1;
		c.set(next);
		Revision(next)
	})
}

/// Replaces the function called after every successful dirty.
///
/// There is a single slot: setting a new hook drops the previous one. An
/// error from the hook is returned by the `dirty` that triggered it; the tag
/// has already advanced by then.
pub fn set_on_tag_dirtied(hook: impl Fn() -> Result<()> + 'static) {
	ON_TAG_DIRTIED.with(|h| *h.borrow_mut() = Some(Rc::new(hook)));
}

pub fn clear_on_tag_dirtied() {
	ON_TAG_DIRTIED.with(|h| *h.borrow_mut() = None);
}

fn notify_dirtied() -> Result<()> {
	// Cloned out so the hook may replace itself or dirty other tags.
	let hook = ON_TAG_DIRTIED.with(|h| h.borrow().clone());
	match hook {
		Some(hook) => hook(),
		None => Ok(()),
	}
}

/// The smallest trackable unit: a cell remembering the revision at which it
/// was created or last dirtied.
///
/// Clones refer to the same tag; equality and hashing go by identity.
#[derive(Clone)]
pub struct Tag {
	revision: Rc<Cell<Revision>>,
}

impl Tag {
	pub fn new() -> Self {
		Tag {
			revision: Rc::new(Cell::new(current_revision())),
		}
	}

	pub fn revision(&self) -> Revision {
		self.revision.get()
	}

	/// Registers a read of this tag with the running computation, if any.
	pub fn consume(&self) {
		tracker::consume(self)
	}

	/// Advances the clock and stamps this tag with the new revision.
	///
	/// Fails when the running computation has already consumed this tag, or
	/// with whatever the on-dirtied hook reports.
	pub fn dirty(&self) -> Result<()> {
		self.check_mutable()?;

		let revision = advance_clock();
		self.revision.set(revision);
		tracing::trace!(%revision, "tag dirtied");

		notify_dirtied()
	}

	pub(crate) fn check_mutable(&self) -> Result<()> {
		if tracker::is_consumed(self) {
			return Err(Error::ReentrantMutation {
				revision: self.revision(),
			});
		}
		Ok(())
	}
}

impl Default for Tag {
	fn default() -> Self {
		Tag::new()
	}
}

impl PartialEq for Tag {
	fn eq(&self, other: &Self) -> bool {
		Rc::ptr_eq(&self.revision, &other.revision)
	}
}

impl Eq for Tag {}

impl Hash for Tag {
	fn hash<H: Hasher>(&self, state: &mut H) {
		std::ptr::hash(Rc::as_ptr(&self.revision), state)
	}
}

impl Debug for Tag {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Tag")
			.field("revision", &self.revision())
			.finish()
	}
}

pub fn create_tag() -> Tag {
	Tag::new()
}

pub fn dirty_tag(tag: &Tag) -> Result<()> {
	tag.dirty()
}

pub fn consume_tag(tag: &Tag) {
	tag.consume()
}
