//! Revision-stamped auto-tracking with microtask-batched rendering.
//!
//! Every [`Tag`] remembers the revision of the clock at which it last
//! changed. Computations wrapped in a [`Cache`] record which tags they read
//! and only run again once one of those tags has been dirtied. A [`Renderer`]
//! turns any number of dirties within one turn into a single flush of its
//! registered operations on the next microtask.
//!
//! All state lives on the current thread; none of the types are `Send`.

pub mod macros;

mod cache;
mod error;
mod microtask;
mod record;
mod renderable;
mod renderer;
mod tag;
mod tracked;
mod tracker;

pub use cache::{memoize, Cache};
pub use error::{Error, Result};
#[cfg(target_arch = "wasm32")]
pub use microtask::BrowserMicrotasks;
pub use microtask::{LocalMicrotasks, Microtasks, Task};
pub use record::{activate_tracking, TrackedRecord, TrackedRecordBuilder};
pub use renderable::Renderable;
pub use renderer::{ErrorPolicy, RenderOperation, Renderer, RendererConfig, RendererId};
pub use tag::{
	clear_on_tag_dirtied, consume_tag, create_tag, current_revision, dirty_tag, set_on_tag_dirtied,
	Revision, Tag,
};
pub use tracked::{tracked, tracked_with, Toggle, Tracked, TrackedProperty};
pub use tracker::{is_tracking, track, untracked, Dependencies};
