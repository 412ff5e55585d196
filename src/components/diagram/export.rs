//! PNG export of the current view.
//!
//! The frame is redrawn onto an offscreen canvas at a fixed pixel ratio with
//! an opaque background and without selection or gesture overlays, so the
//! live canvas and the interaction state are never touched.

use js_sys::{Array, Function, Promise, Reflect, Uint8Array};
use log::info;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::JsFuture;
use web_sys::{Blob, BlobPropertyBag, CanvasRenderingContext2d, HtmlAnchorElement, HtmlCanvasElement, Url};

use super::coords::ViewTransform;
use super::error::ExportError;
use super::render::{DrawSurface, Scene, render};

const PNG_MIME: &str = "image/png";

/// Output size of an export: CSS size times the pixel ratio.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ExportSize {
	pub css_width: f64,
	pub css_height: f64,
	pub pixel_ratio: f64,
}

impl ExportSize {
	pub fn pixels(&self) -> (u32, u32) {
		(
			(self.css_width * self.pixel_ratio).round().max(1.0) as u32,
			(self.css_height * self.pixel_ratio).round().max(1.0) as u32,
		)
	}
}

/// An encoded PNG.
#[derive(Clone, Debug)]
pub struct PngImage {
	pub width: u32,
	pub height: u32,
	pub bytes: Vec<u8>,
}

/// `prefix-2026-10-16T12-57-03.png` from an ISO-8601 timestamp.
pub fn export_filename(prefix: &str, iso_timestamp: &str) -> String {
	let stamp: String = iso_timestamp
		.chars()
		.take(19)
		.map(|c| if c == ':' { '-' } else { c })
		.collect();
	format!("{prefix}-{stamp}.png")
}

/// Draws `scene` for export: scaled by the pixel ratio, overlays stripped,
/// background forced to `background`.
pub fn render_for_export(scene: Scene<'_>, background: &str, pixel_ratio: f64, surface: &mut impl DrawSurface) {
	let scene = Scene {
		background,
		..scene.without_overlays()
	};
	surface.save();
	surface.transform(ViewTransform {
		x: 0.0,
		y: 0.0,
		k: pixel_ratio,
	});
	render(&scene, surface);
	surface.restore();
}

/// Resolves after `ms` milliseconds, letting closing overlays finish.
pub async fn settle(ms: i32) -> Result<(), ExportError> {
	let window = web_sys::window().ok_or(ExportError::NoWindow)?;
	let promise = Promise::new(&mut |resolve, _reject| {
		let _ = window.set_timeout_with_callback_and_timeout_and_arguments_0(&resolve, ms);
	});
	JsFuture::from(promise).await?;
	Ok(())
}

/// Renders the scene onto a fresh offscreen canvas.
pub fn rasterize(scene: Scene<'_>, background: &str, pixel_ratio: f64) -> Result<HtmlCanvasElement, ExportError> {
	let document = web_sys::window()
		.and_then(|w| w.document())
		.ok_or(ExportError::NoWindow)?;
	let size = ExportSize {
		css_width: scene.width,
		css_height: scene.height,
		pixel_ratio,
	};
	let (w, h) = size.pixels();
	let canvas: HtmlCanvasElement = document
		.create_element("canvas")?
		.dyn_into()
		.map_err(|_| ExportError::Js("could not create canvas".into()))?;
	canvas.set_width(w);
	canvas.set_height(h);
	let mut ctx: CanvasRenderingContext2d = canvas
		.get_context("2d")?
		.ok_or(ExportError::ContextUnavailable)?
		.dyn_into()
		.map_err(|_| ExportError::ContextUnavailable)?;
	render_for_export(scene, background, pixel_ratio, &mut ctx);
	Ok(canvas)
}

/// Encodes a canvas as PNG bytes.
pub async fn encode_png(canvas: &HtmlCanvasElement) -> Result<PngImage, ExportError> {
	let (width, height) = (canvas.width(), canvas.height());
	let mut failed: Option<ExportError> = None;
	let promise = Promise::new(&mut |resolve, _reject| {
		let callback = Closure::once_into_js(move |blob: JsValue| {
			let _ = resolve.call1(&JsValue::NULL, &blob);
		});
		if let Err(err) = canvas.to_blob_with_type(callback.unchecked_ref(), PNG_MIME) {
			failed = Some(err.into());
		}
	});
	if let Some(err) = failed {
		return Err(err);
	}
	let blob = JsFuture::from(promise).await?;
	if blob.is_null() || blob.is_undefined() {
		return Err(ExportError::Encode("canvas produced no image".into()));
	}
	let blob: Blob = blob.dyn_into()?;
	let buffer = JsFuture::from(blob.array_buffer()).await?;
	let bytes = Uint8Array::new(&buffer).to_vec();
	info!("exported {width}x{height} png ({} bytes)", bytes.len());
	Ok(PngImage {
		width,
		height,
		bytes,
	})
}

fn png_blob(image: &PngImage) -> Result<Blob, ExportError> {
	let parts = Array::of1(&Uint8Array::from(image.bytes.as_slice()));
	let options = BlobPropertyBag::new();
	options.set_type(PNG_MIME);
	Ok(Blob::new_with_u8_array_sequence_and_options(&parts, &options)?)
}

/// Saves the image through a temporary download link.
pub fn download(image: &PngImage, filename: &str) -> Result<(), ExportError> {
	let document = web_sys::window()
		.and_then(|w| w.document())
		.ok_or(ExportError::NoWindow)?;
	let url = Url::create_object_url_with_blob(&png_blob(image)?)?;
	let anchor: HtmlAnchorElement = document
		.create_element("a")?
		.dyn_into()
		.map_err(|_| ExportError::Js("could not create download link".into()))?;
	anchor.set_href(&url);
	anchor.set_download(filename);
	anchor.click();
	Url::revoke_object_url(&url)?;
	info!("downloaded {filename}");
	Ok(())
}

/// Writes the image to the system clipboard.
pub async fn copy_to_clipboard(image: &PngImage) -> Result<(), ExportError> {
	let window = web_sys::window().ok_or(ExportError::NoWindow)?;
	let clipboard = Reflect::get(&window.navigator(), &JsValue::from_str("clipboard"))?;
	let item_ctor = Reflect::get(&window, &JsValue::from_str("ClipboardItem"))?;
	if clipboard.is_undefined() || item_ctor.is_undefined() {
		return Err(ExportError::ClipboardUnsupported);
	}
	let write: Function = Reflect::get(&clipboard, &JsValue::from_str("write"))?
		.dyn_into()
		.map_err(|_| ExportError::ClipboardUnsupported)?;

	let record = js_sys::Object::new();
	Reflect::set(&record, &JsValue::from_str(PNG_MIME), &JsValue::from(png_blob(image)?))?;
	let item = Reflect::construct(item_ctor.unchecked_ref::<Function>(), &Array::of1(&record))?;
	let pending: Promise = write.call1(&clipboard, &Array::of1(&item))?.dyn_into()?;
	JsFuture::from(pending).await?;
	info!("copied {}x{} png to clipboard", image.width, image.height);
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::components::diagram::config::{DiagramConfig, RenderOptions};
	use crate::components::diagram::model::Diagram;
	use crate::components::diagram::render::tests::{DrawCommand, RecordingSurface};
	use crate::components::diagram::types::{Node, NodeKind, Point};

	#[test]
	fn pixel_ratio_two_doubles_dimensions() {
		let size = ExportSize {
			css_width: 640.0,
			css_height: 480.0,
			pixel_ratio: 2.0,
		};
		assert_eq!(size.pixels(), (1280, 960));
	}

	#[test]
	fn filename_is_timestamped_and_filesystem_safe() {
		assert_eq!(
			export_filename("story-graph", "2026-10-16T12:57:03.123Z"),
			"story-graph-2026-10-16T12-57-03.png"
		);
	}

	#[test]
	fn export_frame_is_scaled_opaque_and_overlay_free() {
		let diagram = Diagram::with_root(
			Node::new("center", NodeKind::Idea, "Center", Point::new(400.0, 300.0)).unwrap(),
		);
		let config = DiagramConfig::mind_map();
		let scene = Scene {
			diagram: &diagram,
			config: &config,
			options: RenderOptions::default(),
			transform: ViewTransform::IDENTITY,
			width: 800.0,
			height: 600.0,
			background: "transparent",
			selected: Some("center"),
			rubber_band: Some((Point::new(400.0, 300.0), Point::new(10.0, 10.0))),
		};
		let mut surface = RecordingSurface::default();
		render_for_export(scene, "#ffffff", 2.0, &mut surface);

		assert_eq!(surface.commands[0], DrawCommand::Save);
		assert_eq!(surface.commands[1], DrawCommand::Scale(2.0));
		assert_eq!(
			surface.commands[2],
			DrawCommand::Rect {
				w: 800.0,
				h: 600.0,
				color: "#ffffff".into()
			}
		);
		assert!(surface.lines().is_empty());
		assert!(!surface.commands.iter().any(|c| matches!(
			c,
			DrawCommand::Circle { fill: None, .. }
		)));
	}
}
