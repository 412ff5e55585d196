use log::warn;

use super::error::DiagramError;
use super::types::{DiagramData, Edge, EdgeId, Node, NodeId, Point, clean_label};

/// The graph being edited: nodes, the edges between them, and a revision
/// counter bumped on every structural change so layouts know to resync.
#[derive(Clone, Debug, Default)]
pub struct Diagram {
	nodes: Vec<Node>,
	edges: Vec<Edge>,
	next_id: u64,
	revision: u64,
}

impl Diagram {
	pub fn new() -> Self {
		Self::default()
	}

	/// A diagram holding a single root node, the mind-map starting point.
	pub fn with_root(root: Node) -> Self {
		let mut diagram = Self::new();
		diagram.nodes.push(root);
		diagram
	}

	/// Replaces the whole diagram. Entries that would break the model (blank
	/// labels, repeated ids, dangling or self-referencing edges) are dropped
	/// with a warning.
	pub fn load(&mut self, data: DiagramData) {
		self.nodes.clear();
		self.edges.clear();
		for mut node in data.nodes {
			match clean_label(&node.label) {
				Ok(label) => node.label = label,
				Err(_) => {
					warn!("dropping node `{}` with an empty label", node.id);
					continue;
				}
			}
			if let Err(err) = self.insert_node(node) {
				warn!("dropping node: {err}");
			}
		}
		for edge in data.edges {
			if self.edges.iter().any(|e| e.id == edge.id) {
				warn!("dropping edge `{}`: id already used", edge.id);
				continue;
			}
			if let Err(err) = self.push_edge(edge) {
				warn!("dropping edge: {err}");
			}
		}
		self.revision += 1;
	}

	pub fn to_data(&self) -> DiagramData {
		DiagramData {
			nodes: self.nodes.clone(),
			edges: self.edges.clone(),
		}
	}

	pub fn nodes(&self) -> &[Node] {
		&self.nodes
	}

	pub fn edges(&self) -> &[Edge] {
		&self.edges
	}

	pub fn node(&self, id: &str) -> Option<&Node> {
		self.nodes.iter().find(|n| n.id == id)
	}

	pub fn contains(&self, id: &str) -> bool {
		self.node(id).is_some()
	}

	pub fn revision(&self) -> u64 {
		self.revision
	}

	pub fn insert_node(&mut self, node: Node) -> Result<(), DiagramError> {
		if self.contains(&node.id) {
			return Err(DiagramError::DuplicateNodeId(node.id));
		}
		self.nodes.push(node);
		self.revision += 1;
		Ok(())
	}

	/// Removes a node together with every edge that references it.
	pub fn remove_node(&mut self, id: &str) -> Result<Node, DiagramError> {
		let idx = self
			.nodes
			.iter()
			.position(|n| n.id == id)
			.ok_or_else(|| DiagramError::UnknownNode(id.to_string()))?;
		let node = self.nodes.remove(idx);
		self.edges.retain(|e| !e.touches(id));
		self.revision += 1;
		Ok(node)
	}

	pub fn rename_node(&mut self, id: &str, label: &str) -> Result<(), DiagramError> {
		let label = clean_label(label)?;
		let node = self
			.nodes
			.iter_mut()
			.find(|n| n.id == id)
			.ok_or_else(|| DiagramError::UnknownNode(id.to_string()))?;
		node.label = label;
		Ok(())
	}

	/// Moves a node. Returns false if the node does not exist.
	pub fn set_position(&mut self, id: &str, position: Point) -> bool {
		match self.nodes.iter_mut().find(|n| n.id == id) {
			Some(node) => {
				node.position = position;
				true
			}
			None => false,
		}
	}

	/// Whether any edge joins `a` and `b`, ignoring direction.
	pub fn has_pair(&self, a: &str, b: &str) -> bool {
		self.edges.iter().any(|e| e.joins(a, b))
	}

	/// Appends an edge whose endpoints exist and differ. Pair uniqueness is
	/// a policy of the caller, not of the model.
	pub fn push_edge(&mut self, edge: Edge) -> Result<(), DiagramError> {
		if edge.source_id == edge.target_id {
			return Err(DiagramError::InvalidConnection);
		}
		for id in [&edge.source_id, &edge.target_id] {
			if !self.contains(id) {
				return Err(DiagramError::UnknownNode(id.clone()));
			}
		}
		self.edges.push(edge);
		self.revision += 1;
		Ok(())
	}

	pub fn next_node_id(&mut self) -> NodeId {
		loop {
			self.next_id += 1;
			let id = format!("node-{}", self.next_id);
			if !self.contains(&id) {
				return id;
			}
		}
	}

	pub fn next_edge_id(&mut self) -> EdgeId {
		loop {
			self.next_id += 1;
			let id = format!("edge-{}", self.next_id);
			if !self.edges.iter().any(|e| e.id == id) {
				return id;
			}
		}
	}
}
