use std::future::Future;
use std::pin::Pin;

use log::{info, warn};

use super::config::PairPolicy;
use super::error::DiagramError;
use super::model::Diagram;
use super::types::{Edge, EdgeId, NodeId, RelationType};

/// A request to join two nodes.
#[derive(Clone, Debug, PartialEq)]
pub struct ConnectionRequest {
	pub source_id: NodeId,
	pub target_id: NodeId,
	pub relation_type: RelationType,
	pub strength: f64,
}

pub type LocalBoxFuture<T> = Pin<Box<dyn Future<Output = T>>>;

/// The backend that persists relationships. Implemented by the host page.
pub trait RelationshipStore {
	/// Creates the relationship and returns it with its server-assigned id.
	fn create_relationship(&self, request: ConnectionRequest) -> LocalBoxFuture<Result<Edge, DiagramError>>;
}

/// Validates connection requests and turns them into edges.
#[derive(Clone, Copy, Debug)]
pub struct ConnectionBroker {
	policy: PairPolicy,
}

impl ConnectionBroker {
	pub fn new(policy: PairPolicy) -> Self {
		Self { policy }
	}

	/// Checks, in order: self-loop, unknown endpoints, duplicate pair (only
	/// under [`PairPolicy::Unique`]).
	pub fn validate(&self, diagram: &Diagram, request: &ConnectionRequest) -> Result<(), DiagramError> {
		if request.source_id == request.target_id {
			return Err(DiagramError::InvalidConnection);
		}
		for id in [&request.source_id, &request.target_id] {
			if !diagram.contains(id) {
				return Err(DiagramError::UnknownNode(id.clone()));
			}
		}
		if self.policy == PairPolicy::Unique && diagram.has_pair(&request.source_id, &request.target_id) {
			return Err(DiagramError::DuplicateConnection);
		}
		Ok(())
	}

	/// Validates and appends directly to the in-memory diagram.
	pub fn connect_local(&self, diagram: &mut Diagram, request: ConnectionRequest) -> Result<EdgeId, DiagramError> {
		self.validate(diagram, &request)?;
		let id = diagram.next_edge_id();
		let edge = Edge::new(
			id.clone(),
			request.source_id,
			request.target_id,
			request.relation_type,
		)
		.with_strength(request.strength);
		diagram.push_edge(edge)?;
		info!("connection `{id}` created");
		Ok(id)
	}

	/// Appends an edge returned by the store. The diagram may have changed
	/// while the call was in flight, so the request is validated again.
	pub fn accept_remote(&self, diagram: &mut Diagram, edge: Edge) -> Result<(), DiagramError> {
		let request = ConnectionRequest {
			source_id: edge.source_id.clone(),
			target_id: edge.target_id.clone(),
			relation_type: edge.relation_type,
			strength: edge.strength,
		};
		if let Err(err) = self.validate(diagram, &request) {
			warn!("dropping relationship `{}` from store: {err}", edge.id);
			return Err(err);
		}
		if diagram.edges().iter().any(|e| e.id == edge.id) {
			warn!("relationship `{}` already present", edge.id);
			return Err(DiagramError::DuplicateConnection);
		}
		info!("relationship `{}` stored", edge.id);
		diagram.push_edge(edge)
	}
}

/// Calls the store, mapping any failure to [`DiagramError::Persistence`].
/// Nothing is inserted locally until this resolves.
pub async fn create_remote(
	store: &dyn RelationshipStore,
	request: ConnectionRequest,
) -> Result<Edge, DiagramError> {
	store
		.create_relationship(request)
		.await
		.map_err(|err| match err {
			DiagramError::Persistence(_) => err,
			other => DiagramError::Persistence(other.to_string()),
		})
}
