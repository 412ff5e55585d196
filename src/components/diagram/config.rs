use force_graph::SimulationParameters;

use super::types::RelationType;

/// Which layout strategy positions the nodes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LayoutMode {
	/// Nodes stay where the user dropped them, inside the container.
	Manual,
	/// Nodes are placed by a force simulation on an unbounded, pannable plane.
	Physics,
}

/// Whether two nodes may be joined by more than one edge.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PairPolicy {
	/// At most one edge per unordered pair.
	Unique,
	/// Parallel edges are kept, e.g. "ally" and "rival" between the same two people.
	AllowParallel,
}

/// Where confirmed connections go.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnectionRoute {
	/// Straight into the in-memory diagram.
	Local,
	/// Through an external create-relationship call first.
	Remote,
}

/// Node radius as a function of weight: `base + per_weight * weight`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NodeSizing {
	pub base: f64,
	pub per_weight: f64,
}

impl NodeSizing {
	pub fn radius(&self, weight: u32) -> f64 {
		self.base + self.per_weight * weight as f64
	}
}

/// Force simulation tuning, handed to `force_graph`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PhysicsConfig {
	pub force_charge: f32,
	pub force_spring: f32,
	pub force_max: f32,
	pub node_speed: f32,
	pub damping_factor: f32,
	pub node_mass: f32,
	/// Steps after which the simulation is considered settled.
	pub cooldown_ticks: u32,
	/// Seconds advanced per animation frame.
	pub dt: f32,
}

impl Default for PhysicsConfig {
	fn default() -> Self {
		Self {
			force_charge: 150.0,
			force_spring: 0.05,
			force_max: 100.0,
			node_speed: 3000.0,
			damping_factor: 0.9,
			node_mass: 10.0,
			cooldown_ticks: 300,
			dt: 0.016,
		}
	}
}

impl PhysicsConfig {
	pub fn parameters(&self) -> SimulationParameters {
		SimulationParameters {
			force_charge: self.force_charge,
			force_spring: self.force_spring,
			force_max: self.force_max,
			node_speed: self.node_speed,
			damping_factor: self.damping_factor,
		}
	}
}

#[derive(Clone, Debug, PartialEq)]
pub struct ExportConfig {
	pub pixel_ratio: f64,
	/// Wait before capture so overlays can finish closing.
	pub settle_delay_ms: i32,
	pub background: String,
	pub filename_prefix: String,
}

impl Default for ExportConfig {
	fn default() -> Self {
		Self {
			pixel_ratio: 2.0,
			settle_delay_ms: 300,
			background: "#ffffff".into(),
			filename_prefix: "story-graph".into(),
		}
	}
}

/// Everything that differs between the mind-map canvas and the
/// relationship graph.
#[derive(Clone, Debug, PartialEq)]
pub struct DiagramConfig {
	pub layout: LayoutMode,
	pub pair_policy: PairPolicy,
	pub route: ConnectionRoute,
	pub sizing: NodeSizing,
	/// Nodes show a connection handle on their right edge.
	pub connection_handles: bool,
	pub handle_radius: f64,
	/// Extra hit-test radius around nodes, in diagram units.
	pub hit_slop: f64,
	/// Pointer travel (CSS px) that turns a press into a drag.
	pub drag_threshold: f64,
	/// Pressing empty canvas pans; the wheel zooms.
	pub pannable: bool,
	pub min_zoom: f64,
	pub max_zoom: f64,
	pub fit_margin: f64,
	/// Labels are drawn regardless of the toggle once zoomed in this far.
	pub label_zoom_threshold: f64,
	pub label_font_px: f64,
	pub dashed_relation: Option<RelationType>,
	pub relation_types: &'static [RelationType],
	pub default_strength: f64,
	pub background: String,
	pub export: ExportConfig,
	pub physics: PhysicsConfig,
}

impl Default for DiagramConfig {
	fn default() -> Self {
		Self::mind_map()
	}
}

impl DiagramConfig {
	pub fn mind_map() -> Self {
		Self {
			layout: LayoutMode::Manual,
			pair_policy: PairPolicy::Unique,
			route: ConnectionRoute::Local,
			sizing: NodeSizing {
				base: 24.0,
				per_weight: 0.0,
			},
			connection_handles: true,
			handle_radius: 7.0,
			hit_slop: 2.0,
			drag_threshold: 3.0,
			pannable: false,
			min_zoom: 1.0,
			max_zoom: 1.0,
			fit_margin: 40.0,
			label_zoom_threshold: 1.5,
			label_font_px: 12.0,
			dashed_relation: Some(RelationType::Contrasts),
			relation_types: RelationType::MIND_MAP,
			default_strength: 1.0,
			background: "#f8fafc".into(),
			export: ExportConfig::default(),
			physics: PhysicsConfig::default(),
		}
	}

	pub fn relationship_graph() -> Self {
		Self {
			layout: LayoutMode::Physics,
			pair_policy: PairPolicy::AllowParallel,
			route: ConnectionRoute::Remote,
			sizing: NodeSizing {
				base: 8.0,
				per_weight: 1.5,
			},
			connection_handles: false,
			pannable: true,
			min_zoom: 0.1,
			max_zoom: 10.0,
			dashed_relation: Some(RelationType::Rival),
			relation_types: RelationType::STORY,
			default_strength: 5.0,
			background: "#1a1a2e".into(),
			export: ExportConfig {
				background: "#1a1a2e".into(),
				..ExportConfig::default()
			},
			..Self::mind_map()
		}
	}
}

/// Toggles the user flips at runtime.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RenderOptions {
	pub node_scale: f64,
	pub show_labels: bool,
}

impl Default for RenderOptions {
	fn default() -> Self {
		Self {
			node_scale: 1.0,
			show_labels: true,
		}
	}
}
