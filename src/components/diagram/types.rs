use std::ops::{Add, Sub};

use serde::{Deserialize, Serialize};

use super::error::DiagramError;

pub type NodeId = String;
pub type EdgeId = String;

/// A position in diagram space (or screen space, depending on the caller).
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
	pub x: f64,
	pub y: f64,
}

impl Point {
	pub const fn new(x: f64, y: f64) -> Self {
		Self { x, y }
	}

	pub fn distance(self, other: Point) -> f64 {
		let (dx, dy) = (other.x - self.x, other.y - self.y);
		(dx * dx + dy * dy).sqrt()
	}
}

impl Add for Point {
	type Output = Point;

	fn add(self, rhs: Point) -> Point {
		Point::new(self.x + rhs.x, self.y + rhs.y)
	}
}

impl Sub for Point {
	type Output = Point;

	fn sub(self, rhs: Point) -> Point {
		Point::new(self.x - rhs.x, self.y - rhs.y)
	}
}

/// What a node stands for in the story. Drives its default color and glyph.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
	Character,
	Plot,
	Location,
	Theme,
	Conflict,
	Idea,
}

impl NodeKind {
	pub const ALL: [NodeKind; 6] = [
		NodeKind::Character,
		NodeKind::Plot,
		NodeKind::Location,
		NodeKind::Theme,
		NodeKind::Conflict,
		NodeKind::Idea,
	];

	pub fn label(self) -> &'static str {
		match self {
			NodeKind::Character => "Character",
			NodeKind::Plot => "Plot",
			NodeKind::Location => "Location",
			NodeKind::Theme => "Theme",
			NodeKind::Conflict => "Conflict",
			NodeKind::Idea => "Idea",
		}
	}

	pub fn color(self) -> &'static str {
		match self {
			NodeKind::Character => "#3b82f6",
			NodeKind::Plot => "#8b5cf6",
			NodeKind::Location => "#10b981",
			NodeKind::Theme => "#f59e0b",
			NodeKind::Conflict => "#ef4444",
			NodeKind::Idea => "#ec4899",
		}
	}

	pub fn icon(self) -> &'static str {
		match self {
			NodeKind::Character => "👤",
			NodeKind::Plot => "📖",
			NodeKind::Location => "📍",
			NodeKind::Theme => "💡",
			NodeKind::Conflict => "⚔",
			NodeKind::Idea => "✨",
		}
	}
}

/// The type of a link between two nodes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationType {
	RelatesTo,
	LeadsTo,
	DependsOn,
	Contrasts,
	Family,
	Friend,
	Ally,
	Rival,
	Enemy,
	Romantic,
	Mentor,
	LivesIn,
}

impl RelationType {
	/// Connection types offered on the free-form mind-map canvas.
	pub const MIND_MAP: &'static [RelationType] = &[
		RelationType::RelatesTo,
		RelationType::LeadsTo,
		RelationType::DependsOn,
		RelationType::Contrasts,
	];

	/// Relationship types offered between story entities.
	pub const STORY: &'static [RelationType] = &[
		RelationType::Family,
		RelationType::Friend,
		RelationType::Ally,
		RelationType::Rival,
		RelationType::Enemy,
		RelationType::Romantic,
		RelationType::Mentor,
		RelationType::LivesIn,
	];

	pub fn label(self) -> &'static str {
		match self {
			RelationType::RelatesTo => "relates to",
			RelationType::LeadsTo => "leads to",
			RelationType::DependsOn => "depends on",
			RelationType::Contrasts => "contrasts",
			RelationType::Family => "family",
			RelationType::Friend => "friend",
			RelationType::Ally => "ally",
			RelationType::Rival => "rival",
			RelationType::Enemy => "enemy",
			RelationType::Romantic => "romantic",
			RelationType::Mentor => "mentor of",
			RelationType::LivesIn => "lives in",
		}
	}

	pub fn color(self) -> &'static str {
		match self {
			RelationType::RelatesTo => "#94a3b8",
			RelationType::LeadsTo => "#6366f1",
			RelationType::DependsOn => "#14b8a6",
			RelationType::Contrasts => "#f97316",
			RelationType::Family => "#22c55e",
			RelationType::Friend => "#38bdf8",
			RelationType::Ally => "#3b82f6",
			RelationType::Rival => "#f59e0b",
			RelationType::Enemy => "#ef4444",
			RelationType::Romantic => "#ec4899",
			RelationType::Mentor => "#a855f7",
			RelationType::LivesIn => "#10b981",
		}
	}

	/// Directed types get an arrowhead at the target end.
	pub fn is_directed(self) -> bool {
		matches!(
			self,
			RelationType::LeadsTo
				| RelationType::DependsOn
				| RelationType::Mentor
				| RelationType::LivesIn
		)
	}
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
	pub id: NodeId,
	pub kind: NodeKind,
	pub label: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub description: Option<String>,
	#[serde(default)]
	pub position: Point,
	/// Appearance count or similar, supplied by whoever loads the diagram.
	#[serde(default)]
	pub weight: u32,
}

impl Node {
	/// Builds a node, trimming the label and rejecting an empty one.
	pub fn new(
		id: impl Into<NodeId>,
		kind: NodeKind,
		label: &str,
		position: Point,
	) -> Result<Self, DiagramError> {
		Ok(Self {
			id: id.into(),
			kind,
			label: clean_label(label)?,
			description: None,
			position,
			weight: 0,
		})
	}
}

pub(crate) fn clean_label(label: &str) -> Result<String, DiagramError> {
	let trimmed = label.trim();
	if trimmed.is_empty() {
		return Err(DiagramError::EmptyLabel);
	}
	Ok(trimmed.to_string())
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Edge {
	pub id: EdgeId,
	pub source_id: NodeId,
	pub target_id: NodeId,
	pub relation_type: RelationType,
	#[serde(default = "default_strength")]
	pub strength: f64,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub label: Option<String>,
	/// Overrides the relation type's color.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub color: Option<String>,
}

fn default_strength() -> f64 {
	1.0
}

impl Edge {
	pub fn new(
		id: impl Into<EdgeId>,
		source_id: impl Into<NodeId>,
		target_id: impl Into<NodeId>,
		relation_type: RelationType,
	) -> Self {
		Self {
			id: id.into(),
			source_id: source_id.into(),
			target_id: target_id.into(),
			relation_type,
			strength: default_strength(),
			label: Some(relation_type.label().to_string()),
			color: None,
		}
	}

	/// Non-positive or non-finite strengths fall back to 1.
	pub fn with_strength(mut self, strength: f64) -> Self {
		self.strength = if strength.is_finite() && strength > 0.0 {
			strength
		} else {
			default_strength()
		};
		self
	}

	pub fn touches(&self, id: &str) -> bool {
		self.source_id == id || self.target_id == id
	}

	/// True when this edge joins `a` and `b` in either direction.
	pub fn joins(&self, a: &str, b: &str) -> bool {
		(self.source_id == a && self.target_id == b) || (self.source_id == b && self.target_id == a)
	}

	pub fn color(&self) -> &str {
		self.color.as_deref().unwrap_or(self.relation_type.color())
	}
}

/// The whole `{nodes, edges}` snapshot handed to and from the host page.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DiagramData {
	pub nodes: Vec<Node>,
	#[serde(default)]
	pub edges: Vec<Edge>,
}

impl DiagramData {
	pub fn from_json(json: &str) -> Result<Self, DiagramError> {
		Ok(serde_json::from_str(json)?)
	}

	pub fn to_json(&self) -> Result<String, DiagramError> {
		Ok(serde_json::to_string_pretty(self)?)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn node_labels_are_trimmed_and_required() {
		let node = Node::new("a", NodeKind::Idea, "  Big idea ", Point::default()).unwrap();
		assert_eq!(node.label, "Big idea");
		assert!(matches!(
			Node::new("b", NodeKind::Idea, "   ", Point::default()),
			Err(DiagramError::EmptyLabel)
		));
	}

	#[test]
	fn edge_strength_must_be_positive() {
		let edge = Edge::new("e", "a", "b", RelationType::Ally).with_strength(-3.0);
		assert_eq!(edge.strength, 1.0);
		let edge = edge.with_strength(9.0);
		assert_eq!(edge.strength, 9.0);
	}

	#[test]
	fn edge_joins_either_direction() {
		let edge = Edge::new("e", "a", "b", RelationType::RelatesTo);
		assert!(edge.joins("a", "b"));
		assert!(edge.joins("b", "a"));
		assert!(!edge.joins("a", "c"));
	}

	#[test]
	fn snapshot_uses_camel_case_and_snake_case_types() {
		let json = r#"{
			"nodes": [
				{"id": "hero", "kind": "character", "label": "Hero", "weight": 4},
				{"id": "town", "kind": "location", "label": "Town"}
			],
			"edges": [
				{"id": "e1", "sourceId": "hero", "targetId": "town", "relationType": "lives_in", "strength": 4}
			]
		}"#;
		let data = DiagramData::from_json(json).unwrap();
		assert_eq!(data.nodes[0].weight, 4);
		assert_eq!(data.nodes[1].position, Point::default());
		assert_eq!(data.edges[0].relation_type, RelationType::LivesIn);
		assert!(data.to_json().unwrap().contains("\"relationType\": \"lives_in\""));
	}

	#[test]
	fn malformed_snapshot_is_reported() {
		assert!(matches!(
			DiagramData::from_json("{\"nodes\": 3}"),
			Err(DiagramError::Snapshot(_))
		));
	}
}
