use std::cell::RefCell;
use std::collections::VecDeque;

pub type Task = Box<dyn FnOnce()>;

/// Somewhere to defer work until the current synchronous turn has finished.
pub trait Microtasks {
	fn queue(&self, task: Task);
}

/// A microtask queue drained by the host.
///
/// `checkpoint` plays the role of the event loop's microtask checkpoint:
/// tasks queued while draining run in the same checkpoint.
#[derive(Default)]
pub struct LocalMicrotasks {
	tasks: RefCell<VecDeque<Task>>,
}

impl LocalMicrotasks {
	pub fn new() -> Self {
		Self::default()
	}

	/// Runs queued tasks until the queue is empty and returns how many ran.
	pub fn checkpoint(&self) -> usize {
		let mut ran = 0;
		loop {
			let task = self.tasks.borrow_mut().pop_front();
			match task {
				Some(task) => {
					task();
					ran += 1;
				}
				None => break,
			}
		}
		ran
	}

	pub fn pending(&self) -> usize {
		self.tasks.borrow().len()
	}
}

impl Microtasks for LocalMicrotasks {
	fn queue(&self, task: Task) {
		self.tasks.borrow_mut().push_back(task);
	}
}

#[cfg(target_arch = "wasm32")]
mod browser {
	use wasm_bindgen::prelude::*;

	use super::{Microtasks, Task};

	#[wasm_bindgen]
	extern "C" {
		#[wasm_bindgen(js_name = queueMicrotask)]
		fn queue_microtask(closure: &JsValue);
	}

	/// The host's `queueMicrotask`.
	#[derive(Default, Clone, Copy)]
	pub struct BrowserMicrotasks;

	impl Microtasks for BrowserMicrotasks {
		fn queue(&self, task: Task) {
			queue_microtask(&Closure::once_into_js(move || task()));
		}
	}
}

#[cfg(target_arch = "wasm32")]
pub use browser::BrowserMicrotasks;
