use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use fxhash::FxHashMap;
use smallvec::SmallVec;

use crate::cache::Cache;
use crate::error::Result;
use crate::microtask::Microtasks;
use crate::tag::set_on_tag_dirtied;

/// One unit of work run on every flush.
pub trait RenderOperation {
	fn render(&self) -> Result<()>;
}

impl<F> RenderOperation for F
where
	F: Fn() -> Result<()>,
{
	fn render(&self) -> Result<()> {
		self()
	}
}

impl RenderOperation for Cache<(), ()> {
	fn render(&self) -> Result<()> {
		self.value();
		Ok(())
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RendererId(u64);

/// What a flush does when an operation fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorPolicy {
	/// Log the failure and run the remaining operations.
	#[default]
	Continue,
	/// Log the failure and end the flush.
	Abort,
}

#[derive(Debug, Clone)]
pub struct RendererConfig {
	pub name: &'static str,
	pub on_error: ErrorPolicy,
}

impl Default for RendererConfig {
	fn default() -> Self {
		RendererConfig {
			name: "<unnamed>",
			on_error: ErrorPolicy::Continue,
		}
	}
}

/// The render scheduler.
///
/// Holds a registry of render operations and coalesces every
/// `schedule_render` made in one synchronous turn into a single flush on the
/// next microtask.
#[derive(Clone)]
pub struct Renderer {
	body: Rc<RendererBody>,
}

struct RendererBody {
	config: RendererConfig,
	scheduled: Cell<bool>,
	next_id: Cell<u64>,
	flushes: Cell<u64>,
	operations: RefCell<FxHashMap<RendererId, Rc<dyn RenderOperation>>>,
	microtasks: Rc<dyn Microtasks>,
	this: Weak<RendererBody>,
}

impl Renderer {
	pub fn new(microtasks: Rc<dyn Microtasks>) -> Self {
		Self::with_config(microtasks, RendererConfig::default())
	}

	pub fn with_config(microtasks: Rc<dyn Microtasks>, config: RendererConfig) -> Self {
		Renderer {
			body: Rc::new_cyclic(|this| RendererBody {
				config,
				scheduled: Cell::new(false),
				next_id: Cell::new(0),
				flushes: Cell::new(0),
				operations: RefCell::new(FxHashMap::default()),
				microtasks,
				this: this.clone(),
			}),
		}
	}

	pub fn register(&self, operation: impl RenderOperation + 'static) -> RendererId {
		self.register_rc(Rc::new(operation))
	}

	pub fn register_fn(&self, operation: impl Fn() -> Result<()> + 'static) -> RendererId {
		self.register_rc(Rc::new(operation))
	}

	/// Registering the same `Rc` again returns the id it already has.
	pub fn register_rc(&self, operation: Rc<dyn RenderOperation>) -> RendererId {
		let existing = self
			.body
			.operations
			.borrow()
			.iter()
			.find(|(_, registered)| same_operation(registered, &operation))
			.map(|(id, _)| *id);
		if let Some(id) = existing {
			return id;
		}

		let id = RendererId(self.body.next_id.get());
		self.body.next_id.set(id.0 + 1);
		self.body.operations.borrow_mut().insert(id, operation);
		id
	}

	/// Registers a memoized operation: it re-runs on a flush only when a tag
	/// it read has been dirtied.
	pub fn register_cache(&self, cache: Rc<Cache<(), ()>>) -> RendererId {
		self.register_rc(cache)
	}

	/// Returns `false` if `id` was not registered.
	pub fn unregister(&self, id: RendererId) -> bool {
		self.body.operations.borrow_mut().remove(&id).is_some()
	}

	pub fn schedule_render(&self) {
		self.body.schedule_render()
	}

	/// Routes every tag dirty on this thread to this renderer.
	///
	/// Replaces any hook installed before. The renderer is held weakly.
	pub fn install(&self) {
		let this = Rc::downgrade(&self.body);
		set_on_tag_dirtied(move || {
			if let Some(body) = this.upgrade() {
				body.schedule_render();
			}
			Ok(())
		});
	}

	pub fn is_scheduled(&self) -> bool {
		self.body.scheduled.get()
	}

	pub fn len(&self) -> usize {
		self.body.operations.borrow().len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	/// How many flushes have run.
	pub fn flush_count(&self) -> u64 {
		self.body.flushes.get()
	}

	pub fn name(&self) -> &'static str {
		self.body.config.name
	}
}

fn same_operation(a: &Rc<dyn RenderOperation>, b: &Rc<dyn RenderOperation>) -> bool {
	// Data pointers only; vtable pointers may differ across codegen units.
	std::ptr::eq(Rc::as_ptr(a) as *const (), Rc::as_ptr(b) as *const ())
}

impl RendererBody {
	fn schedule_render(&self) {
		if self.scheduled.replace(true) {
			return;
		}

		let this = self.this.clone();
		self.microtasks.queue(Box::new(move || {
			if let Some(body) = this.upgrade() {
				body.flush();
			}
		}));
	}

	fn flush(&self) {
		// Reset first: schedules made by the operations below start a new
		// batch, and a panicking operation cannot leave us scheduled.
		self.scheduled.set(false);
		self.flushes.set(self.flushes.get() + 1);

		let operations: SmallVec<[(RendererId, Rc<dyn RenderOperation>); 8]> = self
			.operations
			.borrow()
			.iter()
			.map(|(id, op)| (*id, op.clone()))
			.collect();

		tracing::debug!(
			renderer = self.config.name,
			operations = operations.len(),
			"flushing render operations"
		);

		for (id, operation) in operations {
			// Unregistered by an earlier operation of this flush.
			if !self.operations.borrow().contains_key(&id) {
				continue;
			}

			if let Err(error) = operation.render() {
				tracing::error!(
					renderer = self.config.name,
					operation = id.0,
					%error,
					"render operation failed"
				);
				if self.config.on_error == ErrorPolicy::Abort {
					break;
				}
			}
		}
	}
}

impl std::fmt::Debug for Renderer {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Renderer")
			.field("name", &self.name())
			.field("operations", &self.len())
			.field("scheduled", &self.is_scheduled())
			.finish()
	}
}
