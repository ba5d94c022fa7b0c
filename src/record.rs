use std::any::{type_name, Any};
use std::cell::RefCell;
use std::rc::Rc;

use fxhash::FxHashMap;

use crate::error::{Error, Result};
use crate::tracked::{Tracked, TrackedProperty};

/// Name-keyed tracked properties.
///
/// Built from (name, placeholder) pairs; each placeholder becomes a live
/// [`Tracked`] cell the first time its name is activated. Further cells can
/// be created on demand with [`TrackedRecord::tracked_or_insert_with`].
#[derive(Default)]
pub struct TrackedRecord {
	properties: RefCell<FxHashMap<String, Rc<dyn Any>>>,
}

pub struct TrackedRecordBuilder {
	record: TrackedRecord,
}

impl TrackedRecordBuilder {
	pub fn property<T: 'static>(self, name: impl Into<String>, property: TrackedProperty<T>) -> Self {
		self.record.activate(name, property);
		self
	}

	pub fn build(self) -> TrackedRecord {
		self.record
	}
}

impl TrackedRecord {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn builder() -> TrackedRecordBuilder {
		TrackedRecordBuilder {
			record: TrackedRecord::new(),
		}
	}

	/// Turns `property` into a live cell under `name`.
	///
	/// Returns `false` and leaves the existing cell alone when `name` is
	/// already live.
	pub fn activate<T: 'static>(&self, name: impl Into<String>, property: TrackedProperty<T>) -> bool {
		let mut properties = self.properties.borrow_mut();
		let name = name.into();
		if properties.contains_key(&name) {
			return false;
		}

		properties.insert(name, property.activate().into());
		true
	}

	/// The shared cell behind `name`.
	pub fn tracked<T: 'static>(&self, name: &str) -> Result<Tracked<T>> {
		let any = self
			.properties
			.borrow()
			.get(name)
			.cloned()
			.ok_or_else(|| Error::UnknownProperty(name.to_owned()))?;

		Tracked::try_from(any).map_err(|_| Error::PropertyType {
			name: name.to_owned(),
			expected: type_name::<T>(),
		})
	}

	/// The cell behind `name`, created from `initializer` if there is none.
	pub fn tracked_or_insert_with<T: 'static>(
		&self,
		name: &str,
		initializer: impl FnOnce() -> T + 'static,
	) -> Result<Tracked<T>> {
		if !self.contains(name) {
			self.properties.borrow_mut().insert(
				name.to_owned(),
				Tracked::with_initializer(initializer).into(),
			);
		}
		self.tracked(name)
	}

	pub fn get<T: Clone + 'static>(&self, name: &str) -> Result<T> {
		Ok(self.tracked::<T>(name)?.get())
	}

	pub fn set<T: PartialEq + 'static>(&self, name: &str, value: T) -> Result<()> {
		self.tracked::<T>(name)?.set(value)
	}

	pub fn contains(&self, name: &str) -> bool {
		self.properties.borrow().contains_key(name)
	}

	pub fn len(&self) -> usize {
		self.properties.borrow().len()
	}

	pub fn is_empty(&self) -> bool {
		self.properties.borrow().is_empty()
	}
}

impl std::fmt::Debug for TrackedRecord {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let properties = self.properties.borrow();
		let mut names: Vec<_> = properties.keys().collect();
		names.sort();
		f.debug_struct("TrackedRecord")
			.field("properties", &names)
			.finish()
	}
}

/// Builds a [`TrackedRecord`] from (name, placeholder) pairs of one type.
pub fn activate_tracking<T, N, I>(properties: I) -> TrackedRecord
where
	T: 'static,
	N: Into<String>,
	I: IntoIterator<Item = (N, TrackedProperty<T>)>,
{
	let record = TrackedRecord::new();
	for (name, property) in properties {
		record.activate(name, property);
	}
	record
}
