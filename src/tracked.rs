use std::any::Any;
use std::cell::{Cell, OnceCell, Ref, RefCell};
use std::fmt::Debug;
use std::rc::Rc;

use crate::error::Result;
use crate::tag::{Revision, Tag};

type Initializer<T> = Box<dyn FnOnce() -> T>;

const REENTRANT_INIT: &str = "tracked initializer read the cell it initializes";

/// A declared but inert tracked value.
///
/// It owns no tag and is invisible to computations until it is activated.
pub struct TrackedProperty<T> {
	initializer: Initializer<T>,
}

impl<T: 'static> TrackedProperty<T> {
	pub fn activate(self) -> Tracked<T> {
		Tracked::with_initializer(self.initializer)
	}
}

impl<T> Debug for TrackedProperty<T> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str("TrackedProperty(<inert>)")
	}
}

pub fn tracked<T: 'static>(value: T) -> TrackedProperty<T> {
	tracked_with(move || value)
}

/// Like [`tracked`], the initializer runs on first access of the activated
/// cell.
pub fn tracked_with<T: 'static>(initializer: impl FnOnce() -> T + 'static) -> TrackedProperty<T> {
	TrackedProperty {
		initializer: Box::new(initializer),
	}
}

/// A live tracked value.
///
/// Reads consume the backing tag, writes dirty it. Both the value and the tag
/// are created on first access. Clones share the same cell.
///
/// Reading a cell from inside its own initializer panics.
pub struct Tracked<T> {
	body: Rc<TrackedBody<T>>,
}

pub(crate) struct TrackedBody<T> {
	value: RefCell<Option<T>>,
	initializer: Cell<Option<Initializer<T>>>,
	tag: OnceCell<Tag>,
}

impl<T> Clone for Tracked<T> {
	fn clone(&self) -> Self {
		Self {
			body: self.body.clone(),
		}
	}
}

impl<T: 'static> From<Tracked<T>> for Rc<dyn Any> {
	fn from(tracked: Tracked<T>) -> Self {
		tracked.body
	}
}

impl<T: 'static> TryFrom<Rc<dyn Any>> for Tracked<T> {
	type Error = Rc<dyn Any>;
	fn try_from(value: Rc<dyn Any>) -> Result<Self, Self::Error> {
		Rc::downcast::<TrackedBody<T>>(value).map(|body| Tracked { body })
	}
}

impl<T> Default for Tracked<T>
where
	T: Default + 'static,
{
	fn default() -> Self {
		Tracked::with_initializer(T::default)
	}
}

pub trait Toggle {
	fn toggle(&mut self);
}

impl Toggle for bool {
	fn toggle(&mut self) {
		*self = !*self
	}
}

impl<T> Tracked<T>
where
	T: 'static,
{
	pub fn new(value: T) -> Self {
		Tracked {
			body: Rc::new(TrackedBody {
				value: RefCell::new(Some(value)),
				initializer: Cell::new(None),
				tag: OnceCell::new(),
			}),
		}
	}

	pub fn with_initializer(initializer: impl FnOnce() -> T + 'static) -> Self {
		Tracked {
			body: Rc::new(TrackedBody {
				value: RefCell::new(None),
				initializer: Cell::new(Some(Box::new(initializer))),
				tag: OnceCell::new(),
			}),
		}
	}

	#[inline]
	pub fn get(&self) -> T
	where
		T: Clone,
	{
		self.body.read().clone()
	}

	/// Borrows the value and consumes the tag.
	///
	/// Writing to the cell while the guard is alive panics.
	#[inline]
	pub fn borrow(&self) -> Ref<'_, T> {
		self.body.read()
	}

	#[inline]
	pub fn with<R>(&self, func: impl FnOnce(&T) -> R) -> R {
		func(&self.body.read())
	}

	#[inline]
	pub fn get_untracked(&self) -> T
	where
		T: Clone,
	{
		self.body.read_untracked().clone()
	}

	/// Stores `value` and dirties the tag, unless it equals the current value.
	#[inline]
	pub fn set(&self, value: T) -> Result<()>
	where
		T: PartialEq,
	{
		self.body.set(value)
	}

	#[inline]
	pub fn replace(&self, value: T) -> Result<T>
	where
		T: PartialEq,
	{
		self.body.replace(value)
	}

	/// Mutates the value in place. Always dirties.
	#[inline]
	pub fn update(&self, func: impl FnOnce(&mut T)) -> Result<()> {
		self.body.update(func)
	}

	#[inline]
	pub fn toggle(&self) -> Result<()>
	where
		T: Toggle,
	{
		self.update(T::toggle)
	}

	pub fn tag(&self) -> &Tag {
		self.body.tag()
	}

	pub fn revision(&self) -> Revision {
		self.tag().revision()
	}

	pub fn consume(&self) {
		self.tag().consume()
	}

	/// Dirties the tag without touching the value.
	pub fn dirty(&self) -> Result<()> {
		self.tag().dirty()
	}
}

impl<T> TrackedBody<T> {
	fn tag(&self) -> &Tag {
		self.tag.get_or_init(Tag::new)
	}

	fn materialize(&self) {
		if self.value.borrow().is_some() {
			return;
		}

		// The borrow is released first: the initializer may read other cells.
		if let Some(initializer) = self.initializer.take() {
			let value = initializer();
			*self.value.borrow_mut() = Some(value);
		}
	}

	fn read_untracked(&self) -> Ref<'_, T> {
		self.materialize();
		Ref::map(self.value.borrow(), |v| {
			v.as_ref().expect(REENTRANT_INIT)
		})
	}

	fn read(&self) -> Ref<'_, T> {
		let value = self.read_untracked();
		self.tag().consume();
		value
	}

	fn set(&self, value: T) -> Result<()>
	where
		T: PartialEq,
	{
		if matches!(&*self.value.borrow(), Some(current) if *current == value) {
			return Ok(());
		}

		let tag = self.tag();
		tag.check_mutable()?;

		// A pending initializer is superseded by the write.
		self.initializer.take();
		*self.value.borrow_mut() = Some(value);
		tag.dirty()
	}

	fn replace(&self, value: T) -> Result<T>
	where
		T: PartialEq,
	{
		self.materialize();
		let unchanged = matches!(&*self.value.borrow(), Some(current) if *current == value);
		let tag = self.tag();
		if !unchanged {
			tag.check_mutable()?;
		}

		let old = {
			let mut current = self.value.borrow_mut();
			std::mem::replace(current.as_mut().expect(REENTRANT_INIT), value)
		};

		if !unchanged {
			tag.dirty()?;
		}
		Ok(old)
	}

	fn update(&self, func: impl FnOnce(&mut T)) -> Result<()> {
		self.materialize();
		let tag = self.tag();
		tag.check_mutable()?;

		func(self.value.borrow_mut().as_mut().expect(REENTRANT_INIT));
		tag.dirty()
	}
}

impl<T> Debug for Tracked<T>
where
	T: 'static + Debug,
{
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		self.body.read_untracked().fmt(f)
	}
}
