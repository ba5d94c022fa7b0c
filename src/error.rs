use crate::tag::Revision;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
	/// A tag was dirtied by the computation that already consumed it.
	#[error("cannot dirty a tag during a computation that consumed it (revision {revision})")]
	ReentrantMutation { revision: Revision },

	#[error("object is not renderable")]
	NotRenderable,

	#[error("scheduling a render while currently rendering is not supported")]
	RenderInProgress,

	#[error("no tracked property named `{0}`")]
	UnknownProperty(String),

	#[error("tracked property `{name}` does not hold a `{expected}`")]
	PropertyType { name: String, expected: &'static str },

	/// Failure reported by a render operation.
	#[error("render operation failed: {0}")]
	Render(String),
}

impl Error {
	pub fn render(message: impl Into<String>) -> Self {
		Error::Render(message.into())
	}
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
