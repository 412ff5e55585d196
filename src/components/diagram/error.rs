use thiserror::Error;
use wasm_bindgen::JsValue;

use super::types::NodeId;

/// Failures raised by the diagram editor. None of them are fatal; every one
/// can be recovered from by retrying the user action that caused it.
#[derive(Debug, Error)]
pub enum DiagramError {
	#[error("a connection needs two distinct nodes")]
	InvalidConnection,
	#[error("those nodes are already connected")]
	DuplicateConnection,
	#[error("unknown node `{0}`")]
	UnknownNode(NodeId),
	#[error("a node with id `{0}` already exists")]
	DuplicateNodeId(NodeId),
	#[error("node labels cannot be empty")]
	EmptyLabel,
	#[error("could not save relationship: {0}")]
	Persistence(String),
	#[error("invalid diagram snapshot: {0}")]
	Snapshot(#[from] serde_json::Error),
	#[error(transparent)]
	Export(#[from] ExportError),
}

impl DiagramError {
	/// Rejections that are treated as no-ops and never shown to the user.
	pub fn is_silent(&self) -> bool {
		matches!(self, Self::InvalidConnection | Self::DuplicateConnection)
	}
}

/// Failures while rasterizing or handing off an exported image.
#[derive(Debug, Error)]
pub enum ExportError {
	#[error("no browser window available")]
	NoWindow,
	#[error("2d canvas context unavailable")]
	ContextUnavailable,
	#[error("clipboard image writes are not supported by this browser")]
	ClipboardUnsupported,
	#[error("could not encode image: {0}")]
	Encode(String),
	#[error("browser call failed: {0}")]
	Js(String),
}

impl From<JsValue> for ExportError {
	fn from(value: JsValue) -> Self {
		let message = value
			.as_string()
			.or_else(|| {
				js_sys::Reflect::get(&value, &JsValue::from_str("message"))
					.ok()
					.and_then(|m| m.as_string())
			})
			.unwrap_or_else(|| format!("{value:?}"));
		Self::Js(message)
	}
}
