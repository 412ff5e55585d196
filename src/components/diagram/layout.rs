use std::collections::{HashMap, HashSet};
use std::f64::consts::PI;

use force_graph::{DefaultNodeIdx, EdgeData, ForceGraph, NodeData};
use log::debug;

use super::config::{NodeSizing, PhysicsConfig};
use super::coords::{ViewTransform, fit_transform};
use super::model::Diagram;
use super::types::{NodeId, Point};

/// How node positions change over time. Both strategies work on the same
/// [`Diagram`]; the diagram's positions are always the source of truth for
/// drawing and hit testing.
pub trait LayoutStrategy {
	/// Picks up structural changes (nodes or edges added or removed).
	fn sync(&mut self, diagram: &Diagram);

	/// Advances one animation frame. Returns true while nodes are moving.
	fn step(&mut self, diagram: &mut Diagram, dt: f32) -> bool;

	/// Follows the pointer while a node is being dragged.
	fn drag_to(&mut self, diagram: &mut Diagram, id: &str, to: Point);

	/// Ends a drag, returning where the node actually landed.
	fn commit(&mut self, diagram: &mut Diagram, id: &str, to: Point) -> Option<Point>;

	fn resize(&mut self, width: f64, height: f64);

	fn is_settled(&self) -> bool;

	/// A free spot for a newly added node of the given radius.
	fn placement(&self, diagram: &Diagram, radius: f64) -> Point;

	/// The drawn node size changed; radii are now `sizing.radius(w) * scale`.
	fn rescale(&mut self, _diagram: &mut Diagram, _scale: f64) {}

	/// Pan and zoom showing every node, if this layout supports a viewport.
	fn center_and_fit(&self, _diagram: &Diagram, _sizing: &NodeSizing) -> Option<ViewTransform> {
		None
	}

	/// Zoom 1 centered on the origin, if this layout supports a viewport.
	fn reset_zoom(&self) -> Option<ViewTransform> {
		None
	}
}

/// Positions come only from explicit drags and are kept inside the container.
pub struct ManualLayout {
	width: f64,
	height: f64,
	sizing: NodeSizing,
	scale: f64,
}

impl ManualLayout {
	pub fn new(width: f64, height: f64, sizing: NodeSizing) -> Self {
		Self {
			width,
			height,
			sizing,
			scale: 1.0,
		}
	}

	fn radius(&self, weight: u32) -> f64 {
		self.sizing.radius(weight) * self.scale
	}

	/// Clamps a center into `[r, W - r] x [r, H - r]`.
	pub fn clamp(&self, p: Point, radius: f64) -> Point {
		Point::new(
			p.x.clamp(radius, (self.width - radius).max(radius)),
			p.y.clamp(radius, (self.height - radius).max(radius)),
		)
	}

	fn place(&self, diagram: &mut Diagram, id: &str, to: Point) -> Option<Point> {
		let radius = self.radius(diagram.node(id)?.weight);
		let clamped = self.clamp(to, radius);
		diagram.set_position(id, clamped);
		Some(clamped)
	}
}

impl LayoutStrategy for ManualLayout {
	fn sync(&mut self, _diagram: &Diagram) {}

	fn step(&mut self, _diagram: &mut Diagram, _dt: f32) -> bool {
		false
	}

	fn drag_to(&mut self, diagram: &mut Diagram, id: &str, to: Point) {
		self.place(diagram, id, to);
	}

	fn commit(&mut self, diagram: &mut Diagram, id: &str, to: Point) -> Option<Point> {
		self.place(diagram, id, to)
	}

	fn resize(&mut self, width: f64, height: f64) {
		self.width = width;
		self.height = height;
	}

	fn is_settled(&self) -> bool {
		true
	}

	fn placement(&self, diagram: &Diagram, radius: f64) -> Point {
		let center = Point::new(self.width / 2.0, self.height / 2.0);
		self.clamp(free_slot(diagram, center, radius * 5.0, radius), radius)
	}

	/// Larger nodes may now poke out of the container; pull them back in.
	fn rescale(&mut self, diagram: &mut Diagram, scale: f64) {
		self.scale = scale;
		let moved: Vec<(NodeId, Point)> = diagram
			.nodes()
			.iter()
			.map(|n| (n.id.clone(), self.clamp(n.position, self.radius(n.weight))))
			.collect();
		for (id, p) in moved {
			diagram.set_position(&id, p);
		}
	}
}

/// First ring slot around `center` that keeps clear of every node.
fn free_slot(diagram: &Diagram, center: Point, spacing: f64, radius: f64) -> Point {
	let clear = |p: Point| {
		diagram
			.nodes()
			.iter()
			.all(|n| n.position.distance(p) > radius * 2.5)
	};
	if clear(center) {
		return center;
	}
	for ring in 1..=8 {
		let slots = 6 * ring;
		for slot in 0..slots {
			let angle = slot as f64 * 2.0 * PI / slots as f64;
			let dist = spacing * ring as f64;
			let p = Point::new(center.x + dist * angle.cos(), center.y + dist * angle.sin());
			if clear(p) {
				return p;
			}
		}
	}
	Point::new(center.x + spacing, center.y)
}

/// Force-directed layout on top of `force_graph`: pairwise repulsion, edge
/// springs and damping, stepped once per frame until the cooldown runs out.
pub struct PhysicsLayout {
	graph: ForceGraph<NodeId, ()>,
	index: HashMap<NodeId, DefaultNodeIdx>,
	pinned: HashSet<NodeId>,
	config: PhysicsConfig,
	width: f64,
	height: f64,
	fit_margin: f64,
	max_zoom: f64,
	ticks: u32,
	running: bool,
	synced: Option<u64>,
}

impl PhysicsLayout {
	pub fn new(config: PhysicsConfig, width: f64, height: f64) -> Self {
		Self {
			graph: ForceGraph::new(config.parameters()),
			index: HashMap::new(),
			pinned: HashSet::new(),
			config,
			width,
			height,
			fit_margin: 40.0,
			max_zoom: 4.0,
			ticks: 0,
			running: false,
			synced: None,
		}
	}

	pub fn with_fit(mut self, margin: f64, max_zoom: f64) -> Self {
		self.fit_margin = margin;
		self.max_zoom = max_zoom;
		self
	}

	/// Restarts the cooldown.
	pub fn start(&mut self) {
		self.ticks = 0;
		self.running = true;
	}

	pub fn is_pinned(&self, id: &str) -> bool {
		self.pinned.contains(id)
	}

	fn rebuild(&mut self, diagram: &Diagram) {
		self.graph = ForceGraph::new(self.config.parameters());
		self.index.clear();
		self.pinned.retain(|id| diagram.contains(id));

		let count = diagram.nodes().len().max(1);
		let mut seen = HashSet::new();
		for (i, node) in diagram.nodes().iter().enumerate() {
			let mut p = node.position;
			// Coincident nodes (typically freshly loaded ones) go on a circle.
			if !seen.insert((p.x.to_bits(), p.y.to_bits())) {
				let angle = i as f64 * 2.0 * PI / count as f64;
				p = Point::new(100.0 * angle.cos(), 100.0 * angle.sin());
			}
			let idx = self.graph.add_node(NodeData {
				x: p.x as f32,
				y: p.y as f32,
				mass: self.config.node_mass,
				is_anchor: self.pinned.contains(&node.id),
				user_data: node.id.clone(),
			});
			self.index.insert(node.id.clone(), idx);
		}
		for edge in diagram.edges() {
			if let (Some(&src), Some(&tgt)) =
				(self.index.get(&edge.source_id), self.index.get(&edge.target_id))
			{
				self.graph.add_edge(src, tgt, EdgeData::default());
			}
		}
		self.synced = Some(diagram.revision());
		debug!(
			"physics layout rebuilt: {} nodes, {} edges",
			diagram.nodes().len(),
			diagram.edges().len()
		);
	}

	fn pin(&mut self, diagram: &mut Diagram, id: &str, to: Point) {
		let Some(&idx) = self.index.get(id) else {
			return;
		};
		self.graph.visit_nodes_mut(|node| {
			if node.index() == idx {
				node.data.x = to.x as f32;
				node.data.y = to.y as f32;
				node.data.is_anchor = true;
			}
		});
		self.pinned.insert(id.to_string());
		diagram.set_position(id, to);
		self.start();
	}
}

impl LayoutStrategy for PhysicsLayout {
	fn sync(&mut self, diagram: &Diagram) {
		if self.synced != Some(diagram.revision()) {
			self.rebuild(diagram);
			self.start();
		}
	}

	fn step(&mut self, diagram: &mut Diagram, dt: f32) -> bool {
		if !self.running {
			return false;
		}
		self.graph.update(dt);
		self.graph.visit_nodes(|node| {
			diagram.set_position(
				&node.data.user_data,
				Point::new(node.x() as f64, node.y() as f64),
			);
		});
		self.ticks += 1;
		if self.ticks >= self.config.cooldown_ticks {
			debug!("physics layout settled after {} ticks", self.ticks);
			self.running = false;
		}
		true
	}

	fn drag_to(&mut self, diagram: &mut Diagram, id: &str, to: Point) {
		self.pin(diagram, id, to);
	}

	fn commit(&mut self, diagram: &mut Diagram, id: &str, to: Point) -> Option<Point> {
		if !self.index.contains_key(id) {
			return None;
		}
		self.pin(diagram, id, to);
		Some(to)
	}

	fn resize(&mut self, width: f64, height: f64) {
		self.width = width;
		self.height = height;
	}

	fn is_settled(&self) -> bool {
		!self.running
	}

	fn placement(&self, diagram: &Diagram, radius: f64) -> Point {
		free_slot(diagram, Point::default(), radius * 6.0, radius)
	}

	fn center_and_fit(&self, diagram: &Diagram, sizing: &NodeSizing) -> Option<ViewTransform> {
		fit_transform(
			diagram
				.nodes()
				.iter()
				.map(|n| (n.position, sizing.radius(n.weight))),
			self.width,
			self.height,
			self.fit_margin,
			self.max_zoom,
		)
	}

	fn reset_zoom(&self) -> Option<ViewTransform> {
		Some(ViewTransform::centered(self.width, self.height))
	}
}
