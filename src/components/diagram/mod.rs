//! Node-link diagram editing on an HTML canvas.

mod broker;
mod component;
pub mod config;
pub mod coords;
mod error;
pub mod export;
pub mod interaction;
pub mod layout;
pub mod listeners;
mod model;
pub mod render;
mod state;
mod types;

pub use broker::{ConnectionBroker, ConnectionRequest, LocalBoxFuture, RelationshipStore, create_remote};
pub use component::{DiagramCanvas, MindMapCanvas, RelationshipGraphCanvas};
pub use config::DiagramConfig;
pub use error::{DiagramError, ExportError};
pub use model::Diagram;
pub use state::{ConnectOutcome, DiagramState};
pub use types::{DiagramData, Edge, EdgeId, Node, NodeId, NodeKind, Point, RelationType};
