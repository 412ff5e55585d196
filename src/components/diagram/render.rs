use std::collections::HashMap;
use std::f64::consts::PI;

use wasm_bindgen::JsValue;
use web_sys::CanvasRenderingContext2d;

use super::config::{DiagramConfig, RenderOptions};
use super::coords::ViewTransform;
use super::model::Diagram;
use super::types::{Edge, Node, Point};

const DASH: [f64; 2] = [8.0, 4.0];
const RUBBER_BAND_DASH: [f64; 2] = [6.0, 4.0];
const PARALLEL_SPACING: f64 = 6.0;
const SELECTION_COLOR: &str = "#facc15";
const RUBBER_BAND_COLOR: &str = "#64748b";

/// The drawing primitives the renderer needs. Implemented for the browser's
/// 2d context; tests record the calls instead.
pub trait DrawSurface {
	fn save(&mut self);
	fn restore(&mut self);
	fn transform(&mut self, t: ViewTransform);
	fn fill_rect(&mut self, x: f64, y: f64, w: f64, h: f64, color: &str);
	fn line(&mut self, from: Point, to: Point, color: &str, width: f64, dash: &[f64]);
	fn circle(&mut self, center: Point, radius: f64, fill: Option<&str>, stroke: Option<(&str, f64)>);
	fn polygon(&mut self, points: &[Point], color: &str);
	/// Draws text centered horizontally on `at`, baseline middle.
	fn text(&mut self, text: &str, at: Point, font_px: f64, color: &str);
	fn measure_text(&mut self, text: &str, font_px: f64) -> f64;
}

impl DrawSurface for CanvasRenderingContext2d {
	fn save(&mut self) {
		CanvasRenderingContext2d::save(self);
	}

	fn restore(&mut self) {
		CanvasRenderingContext2d::restore(self);
	}

	fn transform(&mut self, t: ViewTransform) {
		let _ = self.translate(t.x, t.y);
		let _ = self.scale(t.k, t.k);
	}

	fn fill_rect(&mut self, x: f64, y: f64, w: f64, h: f64, color: &str) {
		self.set_fill_style_str(color);
		CanvasRenderingContext2d::fill_rect(self, x, y, w, h);
	}

	fn line(&mut self, from: Point, to: Point, color: &str, width: f64, dash: &[f64]) {
		self.set_stroke_style_str(color);
		self.set_line_width(width);
		let segments = js_sys::Array::new();
		for d in dash {
			segments.push(&JsValue::from_f64(*d));
		}
		let _ = self.set_line_dash(&segments);
		self.begin_path();
		self.move_to(from.x, from.y);
		self.line_to(to.x, to.y);
		self.stroke();
		let _ = self.set_line_dash(&js_sys::Array::new());
	}

	fn circle(&mut self, center: Point, radius: f64, fill: Option<&str>, stroke: Option<(&str, f64)>) {
		self.begin_path();
		let _ = self.arc(center.x, center.y, radius, 0.0, 2.0 * PI);
		if let Some(color) = fill {
			self.set_fill_style_str(color);
			self.fill();
		}
		if let Some((color, width)) = stroke {
			self.set_stroke_style_str(color);
			self.set_line_width(width);
			self.stroke();
		}
	}

	fn polygon(&mut self, points: &[Point], color: &str) {
		let Some((first, rest)) = points.split_first() else {
			return;
		};
		self.set_fill_style_str(color);
		self.begin_path();
		self.move_to(first.x, first.y);
		for p in rest {
			self.line_to(p.x, p.y);
		}
		self.close_path();
		self.fill();
	}

	fn text(&mut self, text: &str, at: Point, font_px: f64, color: &str) {
		self.set_font(&format!("{font_px}px sans-serif"));
		self.set_text_align("center");
		self.set_text_baseline("middle");
		self.set_fill_style_str(color);
		let _ = self.fill_text(text, at.x, at.y);
	}

	fn measure_text(&mut self, text: &str, font_px: f64) -> f64 {
		self.set_font(&format!("{font_px}px sans-serif"));
		CanvasRenderingContext2d::measure_text(self, text)
			.map(|m| m.width())
			.unwrap_or(text.chars().count() as f64 * font_px * 0.6)
	}
}

/// Everything needed to draw one frame.
pub struct Scene<'a> {
	pub diagram: &'a Diagram,
	pub config: &'a DiagramConfig,
	pub options: RenderOptions,
	pub transform: ViewTransform,
	pub width: f64,
	pub height: f64,
	pub background: &'a str,
	pub selected: Option<&'a str>,
	/// Source node center and live pointer, both in diagram space.
	pub rubber_band: Option<(Point, Point)>,
}

impl<'a> Scene<'a> {
	/// The same frame without selection or in-progress gestures.
	pub fn without_overlays(self) -> Self {
		Self {
			selected: None,
			rubber_band: None,
			..self
		}
	}

	fn labels_visible(&self) -> bool {
		self.options.show_labels || self.transform.k >= self.config.label_zoom_threshold
	}

	fn font_px(&self) -> f64 {
		self.config.label_font_px / self.transform.k
	}

	pub fn node_radius(&self, node: &Node) -> f64 {
		self.config.sizing.radius(node.weight) * self.options.node_scale
	}
}

/// `max(1, sqrt(strength))`, scaled by the node-size multiplier.
pub fn edge_width(strength: f64, node_scale: f64) -> f64 {
	strength.sqrt().max(1.0) * node_scale
}

pub fn render(scene: &Scene<'_>, surface: &mut impl DrawSurface) {
	surface.fill_rect(0.0, 0.0, scene.width, scene.height, scene.background);
	surface.save();
	surface.transform(scene.transform);
	draw_edges(scene, surface);
	draw_rubber_band(scene, surface);
	draw_nodes(scene, surface);
	surface.restore();
}

fn draw_edges(scene: &Scene<'_>, surface: &mut impl DrawSurface) {
	let nodes: HashMap<&str, &Node> = scene
		.diagram
		.nodes()
		.iter()
		.map(|n| (n.id.as_str(), n))
		.collect();

	// Parallel edges between the same pair are fanned out so each one shows.
	let mut bundles: HashMap<(&str, &str), Vec<&Edge>> = HashMap::new();
	for edge in scene.diagram.edges() {
		let key = if edge.source_id <= edge.target_id {
			(edge.source_id.as_str(), edge.target_id.as_str())
		} else {
			(edge.target_id.as_str(), edge.source_id.as_str())
		};
		bundles.entry(key).or_default().push(edge);
	}

	let labels = scene.labels_visible();
	for edge in scene.diagram.edges() {
		let (Some(source), Some(target)) = (
			nodes.get(edge.source_id.as_str()),
			nodes.get(edge.target_id.as_str()),
		) else {
			continue;
		};
		let (p1, p2) = (source.position, target.position);
		let (dx, dy) = (p2.x - p1.x, p2.y - p1.y);
		let dist = (dx * dx + dy * dy).sqrt();
		if dist < 0.001 {
			continue;
		}
		let (ux, uy) = (dx / dist, dy / dist);

		let key = if edge.source_id <= edge.target_id {
			(edge.source_id.as_str(), edge.target_id.as_str())
		} else {
			(edge.target_id.as_str(), edge.source_id.as_str())
		};
		let bundle = &bundles[&key];
		let slot = bundle.iter().position(|e| e.id == edge.id).unwrap_or(0) as f64;
		let spread = (slot - (bundle.len() as f64 - 1.0) / 2.0) * PARALLEL_SPACING;
		// Normal of the canonical direction, so reversed edges fan out consistently.
		let sign = if edge.source_id <= edge.target_id { 1.0 } else { -1.0 };
		let (ox, oy) = (-uy * spread * sign, ux * spread * sign);

		let (r1, r2) = (scene.node_radius(source), scene.node_radius(target));
		let width = edge_width(edge.strength, scene.options.node_scale);
		let arrow = if edge.relation_type.is_directed() {
			4.0 + 2.0 * width
		} else {
			0.0
		};
		let start = Point::new(p1.x + ux * r1 + ox, p1.y + uy * r1 + oy);
		let end = Point::new(
			p2.x - ux * (r2 + arrow) + ox,
			p2.y - uy * (r2 + arrow) + oy,
		);
		let dash: &[f64] = if scene.config.dashed_relation == Some(edge.relation_type) {
			&DASH
		} else {
			&[]
		};
		surface.line(start, end, edge.color(), width, dash);

		if arrow > 0.0 {
			let tip = Point::new(p2.x - ux * r2 + ox, p2.y - uy * r2 + oy);
			let back = Point::new(tip.x - ux * arrow, tip.y - uy * arrow);
			let (px, py) = (-uy * arrow * 0.5, ux * arrow * 0.5);
			surface.polygon(
				&[
					tip,
					Point::new(back.x + px, back.y + py),
					Point::new(back.x - px, back.y - py),
				],
				edge.color(),
			);
		}

		if labels {
			if let Some(label) = &edge.label {
				let font = scene.font_px();
				let mid = Point::new((start.x + end.x) / 2.0, (start.y + end.y) / 2.0);
				let text_w = surface.measure_text(label, font);
				let pad = font * 0.3;
				surface.fill_rect(
					mid.x - text_w / 2.0 - pad,
					mid.y - font / 2.0 - pad,
					text_w + 2.0 * pad,
					font + 2.0 * pad,
					"#ffffff",
				);
				surface.text(label, mid, font, "#334155");
			}
		}
	}
}

fn draw_rubber_band(scene: &Scene<'_>, surface: &mut impl DrawSurface) {
	if let Some((from, to)) = scene.rubber_band {
		surface.line(
			from,
			to,
			RUBBER_BAND_COLOR,
			1.5 / scene.transform.k,
			&RUBBER_BAND_DASH,
		);
	}
}

fn draw_nodes(scene: &Scene<'_>, surface: &mut impl DrawSurface) {
	let k = scene.transform.k;
	let labels = scene.labels_visible();
	let font = scene.font_px();

	for node in scene.diagram.nodes() {
		let (p, r) = (node.position, scene.node_radius(node));

		if scene.selected == Some(node.id.as_str()) {
			surface.circle(p, r + 4.0 / k, None, Some((SELECTION_COLOR, 3.0 / k)));
		}
		surface.circle(p, r, Some(node.kind.color()), Some(("#ffffff", 2.0 / k)));
		surface.text(node.kind.icon(), p, r, "#ffffff");

		if scene.config.connection_handles {
			surface.circle(
				Point::new(p.x + r, p.y),
				scene.config.handle_radius,
				Some("#ffffff"),
				Some((node.kind.color(), 2.0 / k)),
			);
		}

		if labels {
			surface.text(
				&node.label,
				Point::new(p.x, p.y + r + font),
				font,
				"#1e293b",
			);
		}
	}
}

#[cfg(test)]
pub(crate) mod tests {
	use super::*;
	use crate::components::diagram::types::{NodeKind, RelationType};

	#[derive(Clone, Debug, PartialEq)]
	pub(crate) enum DrawCommand {
		Save,
		Restore,
		Scale(f64),
		Transform(ViewTransform),
		Rect { w: f64, h: f64, color: String },
		Line { from: Point, to: Point, color: String, width: f64, dashed: bool },
		Circle { center: Point, radius: f64, fill: Option<String>, stroke: Option<String> },
		Polygon { color: String },
		Text { text: String, at: Point, font_px: f64 },
	}

	#[derive(Default)]
	pub(crate) struct RecordingSurface {
		pub(crate) commands: Vec<DrawCommand>,
	}

	impl RecordingSurface {
		pub(crate) fn texts(&self) -> Vec<&str> {
			self.commands
				.iter()
				.filter_map(|c| match c {
					DrawCommand::Text { text, .. } => Some(text.as_str()),
					_ => None,
				})
				.collect()
		}

		pub(crate) fn lines(&self) -> Vec<&DrawCommand> {
			self.commands
				.iter()
				.filter(|c| matches!(c, DrawCommand::Line { .. }))
				.collect()
		}
	}

	impl DrawSurface for RecordingSurface {
		fn save(&mut self) {
			self.commands.push(DrawCommand::Save);
		}

		fn restore(&mut self) {
			self.commands.push(DrawCommand::Restore);
		}

		fn transform(&mut self, t: ViewTransform) {
			if t.x == 0.0 && t.y == 0.0 {
				self.commands.push(DrawCommand::Scale(t.k));
			} else {
				self.commands.push(DrawCommand::Transform(t));
			}
		}

		fn fill_rect(&mut self, _x: f64, _y: f64, w: f64, h: f64, color: &str) {
			self.commands.push(DrawCommand::Rect {
				w,
				h,
				color: color.into(),
			});
		}

		fn line(&mut self, from: Point, to: Point, color: &str, width: f64, dash: &[f64]) {
			self.commands.push(DrawCommand::Line {
				from,
				to,
				color: color.into(),
				width,
				dashed: !dash.is_empty(),
			});
		}

		fn circle(&mut self, center: Point, radius: f64, fill: Option<&str>, stroke: Option<(&str, f64)>) {
			self.commands.push(DrawCommand::Circle {
				center,
				radius,
				fill: fill.map(Into::into),
				stroke: stroke.map(|(c, _)| c.into()),
			});
		}

		fn polygon(&mut self, _points: &[Point], color: &str) {
			self.commands.push(DrawCommand::Polygon {
				color: color.into(),
			});
		}

		fn text(&mut self, text: &str, at: Point, font_px: f64, _color: &str) {
			self.commands.push(DrawCommand::Text {
				text: text.into(),
				at,
				font_px,
			});
		}

		fn measure_text(&mut self, text: &str, font_px: f64) -> f64 {
			text.chars().count() as f64 * font_px * 0.5
		}
	}

	fn diagram() -> Diagram {
		let mut d = Diagram::new();
		let mut hero = Node::new("hero", NodeKind::Character, "Hero", Point::new(0.0, 0.0)).unwrap();
		hero.weight = 4;
		d.insert_node(hero).unwrap();
		d.insert_node(Node::new("foe", NodeKind::Character, "Foe", Point::new(200.0, 0.0)).unwrap())
			.unwrap();
		d.push_edge(Edge::new("e1", "hero", "foe", RelationType::Ally).with_strength(9.0))
			.unwrap();
		d.push_edge(Edge::new("e2", "foe", "hero", RelationType::Rival))
			.unwrap();
		d
	}

	fn scene<'a>(d: &'a Diagram, config: &'a DiagramConfig) -> Scene<'a> {
		Scene {
			diagram: d,
			config,
			options: RenderOptions::default(),
			transform: ViewTransform::IDENTITY,
			width: 400.0,
			height: 300.0,
			background: "#000000",
			selected: None,
			rubber_band: None,
		}
	}

	#[test]
	fn edge_width_follows_strength() {
		assert_eq!(edge_width(0.25, 1.0), 1.0);
		assert_eq!(edge_width(9.0, 1.0), 3.0);
		assert_eq!(edge_width(9.0, 2.0), 6.0);
	}

	#[test]
	fn frame_starts_with_background_and_draws_both_parallel_edges() {
		let d = diagram();
		let config = DiagramConfig::relationship_graph();
		let mut surface = RecordingSurface::default();
		render(&scene(&d, &config), &mut surface);

		assert_eq!(
			surface.commands[0],
			DrawCommand::Rect {
				w: 400.0,
				h: 300.0,
				color: "#000000".into()
			}
		);
		let lines = surface.lines();
		assert_eq!(lines.len(), 2);
		let (DrawCommand::Line { from: a, width: wa, dashed: da, .. }, DrawCommand::Line { from: b, dashed: db, .. }) =
			(lines[0], lines[1])
		else {
			unreachable!()
		};
		assert_ne!(a, b);
		assert_eq!(*wa, 3.0);
		assert!(!da && *db, "rival edges are dashed");
	}

	#[test]
	fn node_radius_tracks_weight_and_labels_follow_toggle() {
		let d = diagram();
		let config = DiagramConfig::relationship_graph();
		let mut surface = RecordingSurface::default();
		let mut s = scene(&d, &config);
		s.options.show_labels = false;
		render(&s, &mut surface);

		let hero = surface.commands.iter().find_map(|c| match c {
			DrawCommand::Circle { center, radius, fill: Some(_), .. } if *center == Point::new(0.0, 0.0) => {
				Some(*radius)
			}
			_ => None,
		});
		assert_eq!(hero, Some(14.0));
		assert!(!surface.texts().contains(&"Hero"));
		assert!(!surface.texts().contains(&"ally"));

		let mut zoomed = scene(&d, &config);
		zoomed.options.show_labels = false;
		zoomed.transform.k = 2.0;
		let mut surface = RecordingSurface::default();
		render(&zoomed, &mut surface);
		let label = surface.commands.iter().find_map(|c| match c {
			DrawCommand::Text { text, font_px, .. } if text == "Hero" => Some(*font_px),
			_ => None,
		});
		assert_eq!(label, Some(6.0));
	}

	#[test]
	fn edge_labels_sit_on_white_backing() {
		let d = diagram();
		let config = DiagramConfig::relationship_graph();
		let mut surface = RecordingSurface::default();
		render(&scene(&d, &config), &mut surface);
		let idx = surface
			.commands
			.iter()
			.position(|c| matches!(c, DrawCommand::Text { text, .. } if text == "ally"))
			.unwrap();
		assert!(matches!(
			&surface.commands[idx - 1],
			DrawCommand::Rect { color, w, .. } if color == "#ffffff" && *w > 12.0 * 2.0
		));
	}

	#[test]
	fn selection_ring_and_rubber_band_are_overlays() {
		let d = diagram();
		let config = DiagramConfig::mind_map();
		let mut s = scene(&d, &config);
		s.selected = Some("hero");
		s.rubber_band = Some((Point::new(0.0, 0.0), Point::new(50.0, 80.0)));

		let mut surface = RecordingSurface::default();
		render(&s, &mut surface);
		let ring = |c: &DrawCommand| {
			matches!(c, DrawCommand::Circle { stroke: Some(color), fill: None, .. } if color == SELECTION_COLOR)
		};
		assert!(surface.commands.iter().any(ring));
		assert!(surface.lines().iter().any(|c| matches!(
			c,
			DrawCommand::Line { to, dashed: true, .. } if *to == Point::new(50.0, 80.0)
		)));

		let mut surface = RecordingSurface::default();
		render(&s.without_overlays(), &mut surface);
		assert!(!surface.commands.iter().any(ring));
		assert_eq!(surface.lines().len(), 2);
	}

	#[test]
	fn directed_edges_get_arrowheads() {
		let mut d = diagram();
		d.push_edge(Edge::new("e3", "hero", "foe", RelationType::Mentor))
			.unwrap();
		let config = DiagramConfig::relationship_graph();
		let mut surface = RecordingSurface::default();
		render(&scene(&d, &config), &mut surface);
		let arrows = surface
			.commands
			.iter()
			.filter(|c| matches!(c, DrawCommand::Polygon { .. }))
			.count();
		assert_eq!(arrows, 1);
	}
}
