use std::rc::Rc;

use log::{debug, info, warn};

use super::broker::{ConnectionBroker, ConnectionRequest};
use super::config::{ConnectionRoute, DiagramConfig, LayoutMode, RenderOptions};
use super::coords::{ContainerRect, CoordinateMapper, ViewTransform};
use super::error::DiagramError;
use super::interaction::{Effect, Gesture, InteractionMachine, PointerSample, PointerTarget};
use super::layout::{LayoutStrategy, ManualLayout, PhysicsLayout};
use super::listeners::GlobalListeners;
use super::model::Diagram;
use super::render::Scene;
use super::types::{DiagramData, Edge, EdgeId, Node, NodeId, NodeKind, Point, RelationType};

/// What happened to a confirmed connection.
#[derive(Clone, Debug, PartialEq)]
pub enum ConnectOutcome {
	/// Added to the in-memory diagram.
	Created(EdgeId),
	/// Valid, but must go through the relationship store first.
	Remote(ConnectionRequest),
	/// Nothing pending, a self-loop, or an already existing pair.
	Ignored,
}

/// The whole editor: diagram, viewport, layout, and gesture state.
pub struct DiagramState {
	diagram: Diagram,
	config: DiagramConfig,
	options: RenderOptions,
	root: Option<(NodeKind, String)>,
	mapper: CoordinateMapper,
	layout: Box<dyn LayoutStrategy>,
	interaction: InteractionMachine,
	broker: ConnectionBroker,
}

impl DiagramState {
	pub fn new(config: DiagramConfig, container: ContainerRect, listeners: Rc<dyn GlobalListeners>) -> Self {
		let (w, h) = (container.width, container.height);
		let (layout, transform): (Box<dyn LayoutStrategy>, ViewTransform) = match config.layout {
			LayoutMode::Manual => (
				Box::new(ManualLayout::new(w, h, config.sizing)),
				ViewTransform::IDENTITY,
			),
			LayoutMode::Physics => (
				Box::new(
					PhysicsLayout::new(config.physics, w, h).with_fit(config.fit_margin, config.max_zoom),
				),
				ViewTransform::centered(w, h),
			),
		};
		Self {
			diagram: Diagram::new(),
			options: RenderOptions::default(),
			root: None,
			mapper: CoordinateMapper::new(container, transform),
			layout,
			interaction: InteractionMachine::new(listeners, config.drag_threshold),
			broker: ConnectionBroker::new(config.pair_policy),
			config,
		}
	}

	/// Seeds a single root node in the middle of the container. Loading an
	/// empty snapshot later seeds it again.
	pub fn with_root(mut self, kind: NodeKind, label: &str) -> Result<Self, DiagramError> {
		self.diagram = Diagram::with_root(self.root_node(kind, label)?);
		self.root = Some((kind, label.to_string()));
		self.layout.sync(&self.diagram);
		Ok(self)
	}

	fn root_node(&self, kind: NodeKind, label: &str) -> Result<Node, DiagramError> {
		let container = self.mapper.container();
		let center = self
			.mapper
			.transform()
			.invert(Point::new(container.width / 2.0, container.height / 2.0));
		Node::new("center", kind, label, center)
	}

	pub fn diagram(&self) -> &Diagram {
		&self.diagram
	}

	pub fn config(&self) -> &DiagramConfig {
		&self.config
	}

	pub fn interaction(&self) -> &InteractionMachine {
		&self.interaction
	}

	pub fn transform(&self) -> ViewTransform {
		self.mapper.transform()
	}

	pub fn container(&self) -> ContainerRect {
		self.mapper.container()
	}

	/// Replaces the diagram wholesale and abandons any gesture in progress.
	pub fn load(&mut self, data: DiagramData) {
		self.interaction.reset();
		self.diagram.load(data);
		if self.diagram.nodes().is_empty() {
			if let Some((kind, label)) = &self.root {
				match self.root_node(*kind, label) {
					Ok(root) => self.diagram = Diagram::with_root(root),
					Err(err) => warn!("could not seed root: {err}"),
				}
			}
		}
		self.layout.sync(&self.diagram);
		info!(
			"diagram loaded: {} nodes, {} edges",
			self.diagram.nodes().len(),
			self.diagram.edges().len()
		);
	}

	pub fn snapshot(&self) -> DiagramData {
		self.diagram.to_data()
	}

	pub fn resize(&mut self, container: ContainerRect) {
		self.mapper.set_container(container);
		self.layout.resize(container.width, container.height);
	}

	pub fn options(&self) -> RenderOptions {
		self.options
	}

	/// Applies display options. The manual layout keeps rescaled nodes inside
	/// the container.
	pub fn set_options(&mut self, options: RenderOptions) {
		self.options = options;
		self.layout.rescale(&mut self.diagram, options.node_scale);
	}

	fn radius(&self, node: &Node) -> f64 {
		self.config.sizing.radius(node.weight) * self.options.node_scale
	}

	/// Topmost node, or its connection handle, under a diagram-space point.
	pub fn target_at(&self, p: Point) -> PointerTarget {
		let slop = self.config.hit_slop;
		for node in self.diagram.nodes().iter().rev() {
			let r = self.radius(node);
			if self.config.connection_handles {
				let handle = Point::new(node.position.x + r, node.position.y);
				if handle.distance(p) <= self.config.handle_radius + slop {
					return PointerTarget::Handle {
						id: node.id.clone(),
					};
				}
			}
			if node.position.distance(p) <= r + slop {
				return PointerTarget::Node {
					id: node.id.clone(),
					center: node.position,
				};
			}
		}
		PointerTarget::Canvas
	}

	fn sample(&self, client_x: f64, client_y: f64) -> PointerSample {
		PointerSample {
			screen: self.mapper.to_local(client_x, client_y),
			diagram: self.mapper.to_diagram(client_x, client_y),
		}
	}

	pub fn pointer_down(&mut self, client_x: f64, client_y: f64) -> Effect {
		let at = self.sample(client_x, client_y);
		let target = self.target_at(at.diagram);
		let effect = self.interaction.pointer_down(target, at, self.config.pannable);
		self.apply(effect)
	}

	pub fn pointer_move(&mut self, client_x: f64, client_y: f64) -> Effect {
		let at = self.sample(client_x, client_y);
		let effect = self.interaction.pointer_move(at);
		self.apply(effect)
	}

	pub fn pointer_up(&mut self, client_x: f64, client_y: f64) -> Effect {
		let at = self.sample(client_x, client_y);
		let target = self.target_at(at.diagram);
		let effect = self.interaction.pointer_up(target, at);
		self.apply(effect)
	}

	fn apply(&mut self, effect: Effect) -> Effect {
		match &effect {
			Effect::MoveNode { id, to } => self.layout.drag_to(&mut self.diagram, id, *to),
			Effect::CommitNode { id, to } => {
				if let Some(landed) = self.layout.commit(&mut self.diagram, id, *to) {
					debug!("`{id}` dropped at ({:.1}, {:.1})", landed.x, landed.y);
				}
			}
			Effect::Pan { dx, dy } => {
				let t = self.mapper.transform_mut();
				t.x += dx;
				t.y += dy;
			}
			Effect::None | Effect::Select(_) | Effect::ChooseRelation { .. } | Effect::Cancelled => {}
		}
		effect
	}

	/// Zooms about the pointer. Ignored when the view is fixed.
	pub fn wheel(&mut self, client_x: f64, client_y: f64, delta_y: f64) {
		if !self.config.pannable {
			return;
		}
		let anchor = self.mapper.to_local(client_x, client_y);
		let factor = if delta_y > 0.0 { 0.9 } else { 1.1 };
		let (min_k, max_k) = (self.config.min_zoom, self.config.max_zoom);
		self.mapper
			.transform_mut()
			.zoom_about(anchor, factor, min_k, max_k);
	}

	pub fn key_down(&mut self, key: &str) -> Effect {
		match key {
			"Escape" => self.interaction.cancel(),
			"Delete" | "Backspace" if self.config.layout == LayoutMode::Manual => {
				match self.remove_selected() {
					Some(node) => {
						info!("node `{}` deleted from the keyboard", node.id);
						Effect::Select(None)
					}
					None => Effect::None,
				}
			}
			_ => Effect::None,
		}
	}

	pub fn edit_mode(&self) -> bool {
		self.interaction.edit_mode()
	}

	pub fn set_edit_mode(&mut self, on: bool) {
		self.interaction.set_edit_mode(on);
	}

	/// Resolves a pending `AwaitingConfirm` with the chosen type and routes
	/// the resulting request.
	pub fn confirm_connection(&mut self, relation_type: RelationType) -> Result<ConnectOutcome, DiagramError> {
		let Some((source_id, target_id)) = self.interaction.confirm() else {
			return Ok(ConnectOutcome::Ignored);
		};
		let request = ConnectionRequest {
			source_id,
			target_id,
			relation_type,
			strength: self.config.default_strength,
		};
		let result = match self.config.route {
			ConnectionRoute::Local => self
				.broker
				.connect_local(&mut self.diagram, request)
				.map(ConnectOutcome::Created),
			ConnectionRoute::Remote => self
				.broker
				.validate(&self.diagram, &request)
				.map(|()| ConnectOutcome::Remote(request)),
		};
		match result {
			Err(err) if err.is_silent() => {
				debug!("connection ignored: {err}");
				Ok(ConnectOutcome::Ignored)
			}
			other => other,
		}
	}

	pub fn cancel_connection(&mut self) -> Effect {
		self.interaction.cancel()
	}

	/// Adds an edge returned by the relationship store.
	pub fn accept_remote_edge(&mut self, edge: Edge) -> Result<(), DiagramError> {
		self.broker.accept_remote(&mut self.diagram, edge)
	}

	/// Adds a node at a free spot near the middle of the view.
	pub fn add_node(&mut self, kind: NodeKind, label: &str) -> Result<NodeId, DiagramError> {
		let id = self.diagram.next_node_id();
		let mut node = Node::new(id.clone(), kind, label, Point::default())?;
		node.position = self.layout.placement(&self.diagram, self.radius(&node));
		self.diagram.insert_node(node)?;
		self.layout.sync(&self.diagram);
		info!("node `{id}` added");
		Ok(id)
	}

	/// Removes a node and every edge touching it.
	pub fn remove_node(&mut self, id: &str) -> Result<Node, DiagramError> {
		let node = self.diagram.remove_node(id)?;
		self.interaction.forget_node(id);
		self.layout.sync(&self.diagram);
		Ok(node)
	}

	pub fn remove_selected(&mut self) -> Option<Node> {
		let id = self.interaction.selected()?.to_string();
		match self.remove_node(&id) {
			Ok(node) => Some(node),
			Err(err) => {
				warn!("could not remove selection: {err}");
				None
			}
		}
	}

	pub fn rename_node(&mut self, id: &str, label: &str) -> Result<(), DiagramError> {
		self.diagram.rename_node(id, label)
	}

	/// One animation frame of layout work. Returns true while nodes move.
	pub fn tick(&mut self) -> bool {
		self.layout.sync(&self.diagram);
		self.layout.step(&mut self.diagram, self.config.physics.dt)
	}

	pub fn is_settled(&self) -> bool {
		self.layout.is_settled()
	}

	pub fn center_and_fit(&mut self) -> bool {
		match self.layout.center_and_fit(&self.diagram, &self.config.sizing) {
			Some(t) => {
				self.mapper.set_transform(t);
				true
			}
			None => false,
		}
	}

	pub fn reset_zoom(&mut self) -> bool {
		match self.layout.reset_zoom() {
			Some(t) => {
				self.mapper.set_transform(t);
				true
			}
			None => false,
		}
	}

	/// Cursor to show for a pointer at the given client position.
	pub fn cursor(&self, client_x: f64, client_y: f64) -> &'static str {
		match self.interaction.gesture() {
			Gesture::Dragging { .. } | Gesture::Panning { .. } => return "grabbing",
			Gesture::Connecting { .. } => return "crosshair",
			Gesture::Idle | Gesture::AwaitingConfirm { .. } => {}
		}
		match self.target_at(self.mapper.to_diagram(client_x, client_y)) {
			PointerTarget::Handle { .. } => "crosshair",
			PointerTarget::Node { .. } if self.interaction.edit_mode() => "crosshair",
			PointerTarget::Node { .. } => "grab",
			PointerTarget::Canvas if self.config.pannable => "move",
			PointerTarget::Canvas => "default",
		}
	}

	pub fn scene(&self) -> Scene<'_> {
		let rubber_band = self
			.interaction
			.pending_connection()
			.and_then(|(source, pointer)| self.diagram.node(source).map(|n| (n.position, pointer)));
		let container = self.mapper.container();
		Scene {
			diagram: &self.diagram,
			config: &self.config,
			options: self.options,
			transform: self.mapper.transform(),
			width: container.width,
			height: container.height,
			background: &self.config.background,
			selected: self.interaction.selected(),
			rubber_band,
		}
	}

	/// Abandons any gesture, releasing global listeners.
	pub fn teardown(&mut self) {
		self.interaction.reset();
	}
}

#[cfg(test)]
mod tests {
	use std::cell::Cell;

	use super::*;
	use crate::components::diagram::listeners::CountingListeners;

	fn mind_map() -> (DiagramState, Rc<Cell<usize>>) {
		let listeners = CountingListeners::default();
		let active = listeners.active.clone();
		let state = DiagramState::new(
			DiagramConfig::mind_map(),
			ContainerRect::new(0.0, 0.0, 800.0, 600.0),
			Rc::new(listeners),
		)
		.with_root(NodeKind::Idea, "center")
		.unwrap();
		(state, active)
	}

	fn position(state: &DiagramState, id: &str) -> Point {
		state.diagram().node(id).unwrap().position
	}

	#[test]
	fn connect_center_to_new_node() {
		let (mut state, active) = mind_map();
		assert_eq!(position(&state, "center"), Point::new(400.0, 300.0));
		let b = state.add_node(NodeKind::Idea, "B").unwrap();
		let pb = position(&state, &b);

		// Press on the root's connection handle, drag out, click B.
		state.pointer_down(424.0, 300.0);
		assert!(state.interaction().pending_connection().is_some());
		state.pointer_move(470.0, 340.0);
		assert_eq!(
			state.scene().rubber_band,
			Some((Point::new(400.0, 300.0), Point::new(470.0, 340.0)))
		);
		let effect = state.pointer_down(pb.x, pb.y);
		assert_eq!(
			effect,
			Effect::ChooseRelation {
				source: "center".into(),
				target: b.clone()
			}
		);
		state.pointer_up(pb.x, pb.y);

		let outcome = state.confirm_connection(RelationType::RelatesTo).unwrap();
		assert!(matches!(outcome, ConnectOutcome::Created(_)));
		let edges = state.diagram().edges();
		assert_eq!(edges.len(), 1);
		assert_eq!(edges[0].source_id, "center");
		assert_eq!(edges[0].target_id, b);
		assert_eq!(edges[0].relation_type, RelationType::RelatesTo);
		assert!(state.interaction().pending_connection().is_none());
		assert!(state.interaction().is_idle());
		assert_eq!(active.get(), 0);
	}

	#[test]
	fn reverse_connection_is_a_silent_no_op() {
		let (mut state, _) = mind_map();
		let b = state.add_node(NodeKind::Plot, "B").unwrap();
		let pb = position(&state, &b);
		let rb = state.radius(state.diagram().node(&b).unwrap());

		state.pointer_down(424.0, 300.0);
		state.pointer_down(pb.x, pb.y);
		state.confirm_connection(RelationType::RelatesTo).unwrap();

		state.pointer_down(pb.x + rb, pb.y);
		state.pointer_down(400.0, 300.0);
		let outcome = state.confirm_connection(RelationType::LeadsTo).unwrap();
		assert_eq!(outcome, ConnectOutcome::Ignored);
		assert_eq!(state.diagram().edges().len(), 1);
	}

	#[test]
	fn self_connection_creates_nothing() {
		let (mut state, active) = mind_map();
		state.pointer_down(424.0, 300.0);
		state.pointer_up(424.0, 300.0);
		assert_eq!(state.pointer_down(400.0, 300.0), Effect::Cancelled);
		assert!(state.interaction().is_idle());
		assert!(state.diagram().edges().is_empty());
		assert_eq!(active.get(), 0);
	}

	#[test]
	fn deleting_a_node_removes_its_edges() {
		let (mut state, _) = mind_map();
		let b = state.add_node(NodeKind::Idea, "B").unwrap();
		let c = state.add_node(NodeKind::Idea, "C").unwrap();
		for (source, target) in [("center", b.as_str()), (c.as_str(), b.as_str())] {
			state
				.broker
				.connect_local(
					&mut state.diagram,
					ConnectionRequest {
						source_id: source.into(),
						target_id: target.into(),
						relation_type: RelationType::RelatesTo,
						strength: 1.0,
					},
				)
				.unwrap();
		}
		assert_eq!(state.diagram().edges().len(), 2);

		let pb = position(&state, &b);
		state.pointer_down(pb.x, pb.y);
		state.pointer_up(pb.x, pb.y);
		assert_eq!(state.interaction().selected(), Some(b.as_str()));
		state.key_down("Delete");
		assert!(!state.diagram().contains(&b));
		assert!(state.diagram().edges().iter().all(|e| !e.touches(&b)));
		assert_eq!(state.interaction().selected(), None);
	}

	#[test]
	fn small_press_selects_large_drag_moves() {
		let (mut state, _) = mind_map();
		state.pointer_down(395.0, 300.0);
		state.pointer_move(396.0, 301.0);
		state.pointer_up(396.0, 301.0);
		assert_eq!(state.interaction().selected(), Some("center"));
		assert_eq!(position(&state, "center"), Point::new(400.0, 300.0));

		let b = state.add_node(NodeKind::Idea, "B").unwrap();
		let pb = position(&state, &b);
		state.pointer_down(pb.x, pb.y);
		state.pointer_move(pb.x, pb.y + 40.0);
		state.pointer_up(pb.x, pb.y + 60.0);
		assert_eq!(position(&state, &b), Point::new(pb.x, pb.y + 60.0));
		assert_eq!(state.interaction().selected(), Some("center"));
	}

	#[test]
	fn drag_outside_container_is_clamped() {
		let (mut state, _) = mind_map();
		state.pointer_down(400.0, 300.0);
		state.pointer_move(900.0, -200.0);
		state.pointer_up(1200.0, -400.0);
		assert_eq!(position(&state, "center"), Point::new(776.0, 24.0));
	}

	#[test]
	fn teardown_mid_gesture_releases_listeners() {
		let (mut state, active) = mind_map();
		state.pointer_down(400.0, 300.0);
		assert_eq!(active.get(), 1);
		state.teardown();
		assert_eq!(active.get(), 0);

		state.pointer_down(424.0, 300.0);
		assert_eq!(active.get(), 1);
		drop(state);
		assert_eq!(active.get(), 0);
	}

	#[test]
	fn escape_cancels_pending_confirm() {
		let (mut state, _) = mind_map();
		let b = state.add_node(NodeKind::Idea, "B").unwrap();
		let pb = position(&state, &b);
		state.pointer_down(424.0, 300.0);
		state.pointer_down(pb.x, pb.y);
		assert!(state.interaction().awaiting_confirm().is_some());
		assert_eq!(state.key_down("Escape"), Effect::Cancelled);
		assert_eq!(
			state.confirm_connection(RelationType::RelatesTo).unwrap(),
			ConnectOutcome::Ignored
		);
		assert!(state.diagram().edges().is_empty());
	}

	#[test]
	fn exporting_keeps_a_pending_confirm() {
		use crate::components::diagram::export::render_for_export;
		use crate::components::diagram::render::tests::RecordingSurface;

		let (mut state, _) = mind_map();
		let b = state.add_node(NodeKind::Idea, "B").unwrap();
		let pb = position(&state, &b);
		state.pointer_down(424.0, 300.0);
		state.pointer_down(pb.x, pb.y);
		state.pointer_up(pb.x, pb.y);

		let mut surface = RecordingSurface::default();
		render_for_export(state.scene(), "#ffffff", 1.0, &mut surface);
		assert!(!surface.commands.is_empty());
		assert!(state.interaction().awaiting_confirm().is_some());
		assert!(matches!(
			state.confirm_connection(RelationType::RelatesTo),
			Ok(ConnectOutcome::Created(_))
		));
	}

	fn story() -> DiagramData {
		DiagramData::from_json(
			r#"{
				"nodes": [
					{"id": "ann", "kind": "character", "label": "Ann", "weight": 3},
					{"id": "bo", "kind": "character", "label": "Bo", "weight": 1},
					{"id": "keep", "kind": "location", "label": "The Keep"}
				],
				"edges": [
					{"id": "r1", "sourceId": "ann", "targetId": "bo", "relationType": "ally"},
					{"id": "r2", "sourceId": "ann", "targetId": "bo", "relationType": "rival"},
					{"id": "r3", "sourceId": "bo", "targetId": "keep", "relationType": "lives_in"}
				]
			}"#,
		)
		.unwrap()
	}

	fn graph() -> (DiagramState, Rc<Cell<usize>>) {
		let listeners = CountingListeners::default();
		let active = listeners.active.clone();
		let mut config = DiagramConfig::relationship_graph();
		config.physics.cooldown_ticks = 30;
		let mut state = DiagramState::new(
			config,
			ContainerRect::new(20.0, 10.0, 800.0, 600.0),
			Rc::new(listeners),
		);
		state.load(story());
		state.tick();
		(state, active)
	}

	#[test]
	fn physics_graph_settles_and_fits() {
		let (mut state, _) = graph();
		assert_eq!(state.diagram().edges().len(), 3);
		let mut frames = 0;
		while state.tick() {
			frames += 1;
			assert!(frames < 30);
		}
		assert!(state.is_settled());

		assert!(state.center_and_fit());
		let t = state.transform();
		for node in state.diagram().nodes() {
			let s = t.apply(node.position);
			assert!((0.0..=800.0).contains(&s.x) && (0.0..=600.0).contains(&s.y));
		}
		assert!(state.reset_zoom());
		assert_eq!(state.transform(), ViewTransform::centered(800.0, 600.0));
	}

	#[test]
	fn edit_mode_click_routes_to_store() {
		let (mut state, _) = graph();
		state.set_edit_mode(true);
		let t = state.transform();
		let client = |p: Point| {
			let s = t.apply(p);
			(s.x + 20.0, s.y + 10.0)
		};
		let (ax, ay) = client(position(&state, "ann"));
		let (kx, ky) = client(position(&state, "keep"));

		state.pointer_down(ax, ay);
		state.pointer_up(ax, ay);
		assert!(matches!(state.pointer_down(kx, ky), Effect::ChooseRelation { .. }));
		let outcome = state.confirm_connection(RelationType::Enemy).unwrap();
		let ConnectOutcome::Remote(request) = outcome else {
			panic!("expected a remote request, got {outcome:?}");
		};
		assert_eq!(request.strength, 5.0);
		assert_eq!(state.diagram().edges().len(), 3);

		let edge = Edge::new("srv-9", request.source_id, request.target_id, request.relation_type);
		state.accept_remote_edge(edge).unwrap();
		assert_eq!(state.diagram().edges().len(), 4);
	}

	#[test]
	fn dragging_in_physics_pins_node() {
		let (mut state, active) = graph();
		let t = state.transform();
		let p = position(&state, "keep");
		let s = t.apply(p);
		state.pointer_down(s.x + 20.0, s.y + 10.0);
		state.pointer_move(s.x + 120.0, s.y + 10.0);
		state.pointer_up(s.x + 120.0, s.y + 10.0);
		assert_eq!(active.get(), 0);
		let dropped = position(&state, "keep");
		for _ in 0..10 {
			state.tick();
		}
		let after = position(&state, "keep");
		assert!((after.x - dropped.x).abs() < 1e-3 && (after.y - dropped.y).abs() < 1e-3);
		assert!((dropped.x - (p.x + 100.0)).abs() < 1e-6);
	}

	#[test]
	fn wheel_and_pan_only_in_pannable_views() {
		let (mut state, _) = graph();
		state.wheel(420.0, 310.0, -1.0);
		assert!((state.transform().k - 1.1).abs() < 1e-9);

		let before = state.transform();
		state.pointer_down(25.0, 15.0);
		state.pointer_move(45.0, 35.0);
		state.pointer_up(45.0, 35.0);
		assert_eq!(state.transform().x, before.x + 20.0);
		assert_eq!(state.transform().y, before.y + 20.0);

		let (mut manual, _) = mind_map();
		manual.wheel(400.0, 300.0, -1.0);
		assert_eq!(manual.transform(), ViewTransform::IDENTITY);
	}

	#[test]
	fn larger_nodes_stay_inside_the_container() {
		let (mut state, _) = mind_map();
		state.set_options(RenderOptions {
			node_scale: 2.0,
			..state.options()
		});
		state.pointer_down(400.0, 300.0);
		state.pointer_move(1200.0, -400.0);
		state.pointer_up(1200.0, -400.0);
		assert_eq!(position(&state, "center"), Point::new(752.0, 48.0));

		let b = state.add_node(NodeKind::Idea, "B").unwrap();
		let pb = position(&state, &b);
		assert!(pb.x >= 48.0 && pb.x <= 752.0);
		assert!(pb.y >= 48.0 && pb.y <= 552.0);
	}

	#[test]
	fn empty_reload_keeps_the_mind_map_root() {
		let (mut state, _) = mind_map();
		state.add_node(NodeKind::Idea, "B").unwrap();
		state.load(DiagramData::default());
		assert_eq!(state.diagram().nodes().len(), 1);
		assert_eq!(position(&state, "center"), Point::new(400.0, 300.0));
		assert_eq!(state.diagram().node("center").unwrap().label, "center");
	}

	#[test]
	fn load_replaces_everything_and_resets_gestures() {
		let (mut state, active) = graph();
		state.pointer_down(25.0, 15.0);
		assert_eq!(active.get(), 1);
		state.load(DiagramData::default());
		assert_eq!(active.get(), 0);
		assert!(state.diagram().nodes().is_empty());
		assert!(!state.center_and_fit());
	}
}
