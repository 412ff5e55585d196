use leptos::prelude::*;
use log::info;

use crate::components::diagram::{DiagramData, MindMapCanvas};

/// Story brainstorming board.
#[component]
pub fn MindMap() -> impl IntoView {
	let data = RwSignal::new(DiagramData::default());
	let saved = RwSignal::new(Option::<String>::None);
	let last_error = RwSignal::new(Option::<String>::None);

	let on_save = Callback::new(move |snapshot: DiagramData| {
		match snapshot.to_json() {
			Ok(json) => {
				info!("mind map saved ({} bytes)", json.len());
				saved.set(Some(json));
			}
			Err(err) => last_error.set(Some(err.to_string())),
		}
	});
	let on_error = Callback::new(move |msg: String| last_error.set(Some(msg)));

	view! {
		<div class="page mind-map-page">
			<header>
				<h1>"Mind Map"</h1>
				<p class="subtitle">
					"Drag nodes to arrange them. Drag from a node's handle to another node to connect."
				</p>
				<nav>
					<a href="/relationships">"Relationship graph"</a>
				</nav>
			</header>
			<MindMapCanvas data=data width=Some(960.0) height=Some(640.0) on_save=Some(on_save) on_error=Some(on_error) />
			{move || last_error.get().map(|e| view! { <p class="error">{e}</p> })}
			{move || saved.get().map(|json| view! { <pre class="saved-snapshot">{json}</pre> })}
		</div>
	}
}
