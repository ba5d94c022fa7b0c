use std::cell::Cell;
use std::rc::{Rc, Weak};

use crate::cache::Cache;
use crate::error::{Error, Result};
use crate::microtask::Microtasks;
use crate::tag::set_on_tag_dirtied;

/// An owner with its own list of memoized render operations.
///
/// Unlike [`Renderer`](crate::Renderer), which flushes a shared registry,
/// each `Renderable` schedules and runs only its own operations, in order.
#[derive(Clone)]
pub struct Renderable {
	body: Rc<RenderableBody>,
}

struct RenderableBody {
	name: &'static str,
	operations: Option<Vec<Cache<(), ()>>>,
	scheduled: Cell<bool>,
	rendering: Cell<bool>,
	renders: Cell<u64>,
	microtasks: Rc<dyn Microtasks>,
	this: Weak<RenderableBody>,
}

/// Clears both flags when the render pass ends, including by panic.
struct RenderPass<'a>(&'a RenderableBody);

impl Drop for RenderPass<'_> {
	fn drop(&mut self) {
		self.0.scheduled.set(false);
		self.0.rendering.set(false);
	}
}

impl Renderable {
	/// An owner with no render operations. Rendering it fails.
	pub fn new(microtasks: Rc<dyn Microtasks>) -> Self {
		Self::build("<unnamed>", None, microtasks)
	}

	pub fn with_operations<I, F>(microtasks: Rc<dyn Microtasks>, operations: I) -> Self
	where
		I: IntoIterator<Item = F>,
		F: Fn() + 'static,
	{
		Self::with_name("<unnamed>", microtasks, operations)
	}

	pub fn with_name<I, F>(name: &'static str, microtasks: Rc<dyn Microtasks>, operations: I) -> Self
	where
		I: IntoIterator<Item = F>,
		F: Fn() + 'static,
	{
		let operations: Vec<_> = operations
			.into_iter()
			.map(|op| Cache::new_with_name(name, move |()| op()))
			.collect();
		Self::build(name, Some(operations), microtasks)
	}

	fn build(
		name: &'static str,
		operations: Option<Vec<Cache<(), ()>>>,
		microtasks: Rc<dyn Microtasks>,
	) -> Self {
		Renderable {
			body: Rc::new_cyclic(|this| RenderableBody {
				name,
				operations,
				scheduled: Cell::new(false),
				rendering: Cell::new(false),
				renders: Cell::new(0),
				microtasks,
				this: this.clone(),
			}),
		}
	}

	/// Schedules a render of this owner on the next microtask.
	///
	/// Repeated calls before it runs are coalesced.
	pub fn render(&self) -> Result<()> {
		self.body.render()
	}

	/// Routes every tag dirty on this thread to [`Renderable::render`].
	///
	/// Replaces any hook installed before. The owner is held weakly. A dirty
	/// made while this owner is rendering fails with
	/// [`Error::RenderInProgress`], since no further render could pick it up.
	pub fn install(&self) {
		let this = Rc::downgrade(&self.body);
		set_on_tag_dirtied(move || match this.upgrade() {
			Some(body) => body.render(),
			None => Ok(()),
		});
	}

	pub fn is_renderable(&self) -> bool {
		self.body.operations.is_some()
	}

	pub fn is_scheduled(&self) -> bool {
		self.body.scheduled.get()
	}

	pub fn is_rendering(&self) -> bool {
		self.body.rendering.get()
	}

	/// How many render passes have run.
	pub fn render_count(&self) -> u64 {
		self.body.renders.get()
	}
}

impl RenderableBody {
	fn render(&self) -> Result<()> {
		if self.operations.is_none() {
			return Err(Error::NotRenderable);
		}
		if self.rendering.get() {
			return Err(Error::RenderInProgress);
		}
		if self.scheduled.replace(true) {
			return Ok(());
		}

		let this = self.this.clone();
		self.microtasks.queue(Box::new(move || {
			if let Some(body) = this.upgrade() {
				body.run();
			}
		}));
		Ok(())
	}

	fn run(&self) {
		let Some(operations) = &self.operations else {
			return;
		};

		self.rendering.set(true);
		let _pass = RenderPass(self);
		self.renders.set(self.renders.get() + 1);
		tracing::debug!(renderable = self.name, operations = operations.len(), "rendering");

		for operation in operations {
			operation.value();
		}
	}
}

impl std::fmt::Debug for Renderable {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Renderable")
			.field("name", &self.body.name)
			.field("renderable", &self.is_renderable())
			.field("scheduled", &self.is_scheduled())
			.field("rendering", &self.is_rendering())
			.finish()
	}
}
