use std::cell::Cell;
use std::rc::Rc;

use leptos::prelude::*;
use log::{error, info};

use crate::components::diagram::{
	ConnectionRequest, DiagramData, DiagramError, Edge, LocalBoxFuture, RelationshipGraphCanvas,
	RelationshipStore,
};

const SAMPLE_STORY: &str = r#"{
	"nodes": [
		{"id": "elara", "kind": "character", "label": "Elara", "weight": 12},
		{"id": "doran", "kind": "character", "label": "Doran", "weight": 8},
		{"id": "mira", "kind": "character", "label": "Mira", "weight": 5},
		{"id": "vos", "kind": "character", "label": "Lord Vos", "weight": 6},
		{"id": "tamsin", "kind": "character", "label": "Tamsin", "weight": 2},
		{"id": "harbor", "kind": "location", "label": "Greywater Harbor", "weight": 4},
		{"id": "citadel", "kind": "location", "label": "The Citadel", "weight": 3}
	],
	"edges": [
		{"id": "r1", "sourceId": "elara", "targetId": "doran", "relationType": "ally", "strength": 8},
		{"id": "r2", "sourceId": "elara", "targetId": "doran", "relationType": "rival", "strength": 3},
		{"id": "r3", "sourceId": "elara", "targetId": "mira", "relationType": "family", "strength": 9},
		{"id": "r4", "sourceId": "vos", "targetId": "elara", "relationType": "enemy", "strength": 7},
		{"id": "r5", "sourceId": "tamsin", "targetId": "doran", "relationType": "mentor", "strength": 4},
		{"id": "r6", "sourceId": "mira", "targetId": "harbor", "relationType": "lives_in"},
		{"id": "r7", "sourceId": "vos", "targetId": "citadel", "relationType": "lives_in"},
		{"id": "r8", "sourceId": "doran", "targetId": "mira", "relationType": "romantic", "strength": 6}
	]
}"#;

/// Hands out ids the way a backend would. Nothing leaves the page.
#[derive(Default)]
struct InMemoryStore {
	next: Cell<u32>,
}

impl RelationshipStore for InMemoryStore {
	fn create_relationship(&self, request: ConnectionRequest) -> LocalBoxFuture<Result<Edge, DiagramError>> {
		self.next.set(self.next.get() + 1);
		let id = format!("rel-{}", self.next.get());
		Box::pin(async move {
			info!("storing {:?} {} -> {}", request.relation_type, request.source_id, request.target_id);
			Ok(Edge::new(id, request.source_id, request.target_id, request.relation_type)
				.with_strength(request.strength))
		})
	}
}

/// Character relationship graph over sample story data.
#[component]
pub fn Relationships() -> impl IntoView {
	let data = Signal::derive(move || {
		DiagramData::from_json(SAMPLE_STORY).unwrap_or_else(|err| {
			error!("sample story is invalid: {err}");
			DiagramData::default()
		})
	});
	let store: Rc<dyn RelationshipStore> = Rc::new(InMemoryStore::default());

	view! {
		<div class="fullscreen-graph">
			<RelationshipGraphCanvas data=data fullscreen=true store=Some(store) />
			<div class="graph-overlay">
				<h1>"Story Relationships"</h1>
				<p class="subtitle">
					"Drag characters to pin them. Scroll to zoom. Turn on Connect and click two characters to relate them."
				</p>
				<a href="/">"Mind map"</a>
			</div>
		</div>
	}
}
