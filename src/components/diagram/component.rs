use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::{Rc, Weak};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use leptos::prelude::*;
use leptos::task::spawn_local;
use log::{debug, error, info, warn};
use wasm_bindgen::prelude::*;
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement, KeyboardEvent, MouseEvent, WheelEvent, Window};

use super::broker::{RelationshipStore, create_remote};
use super::config::{ConnectionRoute, DiagramConfig, RenderOptions};
use super::coords::ContainerRect;
use super::error::{DiagramError, ExportError};
use super::export::{copy_to_clipboard, download, encode_png, export_filename, rasterize, settle};
use super::interaction::Effect as GestureEffect;
use super::listeners::{GlobalListeners, PointerPhase, WindowPointerListeners};
use super::render;
use super::state::{ConnectOutcome, DiagramState};
use super::types::{DiagramData, NodeKind, RelationType};

type SharedState = Rc<RefCell<Option<DiagramState>>>;
type FrameClosure = Rc<RefCell<Option<Closure<dyn FnMut()>>>>;

/// Source and target labels of the connection waiting for a type.
type Choosing = RwSignal<Option<(String, String)>>;

#[derive(Clone, Copy, Debug)]
enum ExportTarget {
	Download,
	Clipboard,
}

thread_local! {
	static TEARDOWNS: RefCell<HashMap<u64, Box<dyn FnOnce()>>> = RefCell::new(HashMap::new());
}

static NEXT_TEARDOWN: AtomicU64 = AtomicU64::new(0);

/// Parks a browser-side cleanup under a plain id that `on_cleanup` can carry.
fn register_teardown(f: impl FnOnce() + 'static) -> u64 {
	let id = NEXT_TEARDOWN.fetch_add(1, Ordering::Relaxed);
	TEARDOWNS.with(|t| t.borrow_mut().insert(id, Box::new(f)));
	id
}

/// Runs the cleanup parked under `id`, at most once.
fn run_teardown(id: u64) {
	let f = TEARDOWNS.with(|t| t.borrow_mut().remove(&id));
	if let Some(f) = f {
		f();
	}
}

fn with_state<R>(state: &SharedState, f: impl FnOnce(&mut DiagramState) -> R) -> Option<R> {
	let mut slot = state.try_borrow_mut().ok()?;
	slot.as_mut().map(f)
}

fn canvas_size(canvas: &HtmlCanvasElement, window: &Window, fullscreen: bool, width: Option<f64>, height: Option<f64>) -> (f64, f64) {
	let dim = |v: Result<JsValue, JsValue>, fallback: f64| v.ok().and_then(|v| v.as_f64()).unwrap_or(fallback);
	if fullscreen {
		return (dim(window.inner_width(), 800.0), dim(window.inner_height(), 600.0));
	}
	let parent = canvas.parent_element();
	(
		width.unwrap_or_else(|| parent.as_ref().map(|p| p.client_width() as f64).unwrap_or(800.0)),
		height.unwrap_or_else(|| parent.as_ref().map(|p| p.client_height() as f64).unwrap_or(600.0)),
	)
}

/// Picks up scrolling and layout shifts since the last event.
fn sync_container(s: &mut DiagramState, canvas: &HtmlCanvasElement) {
	let rect = ContainerRect::from_dom(&canvas.get_bounding_client_rect());
	if rect != s.container() && rect.width > 0.0 && rect.height > 0.0 {
		s.resize(rect);
	}
}

fn announce(effect: &GestureEffect, s: &DiagramState, choosing: Choosing) {
	match effect {
		GestureEffect::ChooseRelation { source, target } => {
			let label = |id: &str| {
				s.diagram()
					.node(id)
					.map_or_else(|| id.to_string(), |n| n.label.clone())
			};
			choosing.set(Some((label(source), label(target))));
		}
		GestureEffect::Cancelled => choosing.set(None),
		_ => {}
	}
}

async fn run_export(state: Weak<RefCell<Option<DiagramState>>>, target: ExportTarget) -> Result<(), ExportError> {
	let Some(export) = state
		.upgrade()
		.and_then(|s| with_state(&s, |s| s.config().export.clone()))
	else {
		return Ok(());
	};
	settle(export.settle_delay_ms).await?;

	let canvas = {
		let Some(state) = state.upgrade() else {
			return Ok(());
		};
		let slot = state.borrow();
		let Some(s) = slot.as_ref() else {
			return Ok(());
		};
		rasterize(s.scene(), &export.background, export.pixel_ratio)?
	};
	let image = encode_png(&canvas).await?;
	match target {
		ExportTarget::Download => {
			let stamp = String::from(js_sys::Date::new_0().to_iso_string());
			download(&image, &export_filename(&export.filename_prefix, &stamp))
		}
		ExportTarget::Clipboard => copy_to_clipboard(&image).await,
	}
}

/// Interactive node-link editor drawn on a canvas. The two public wrappers
/// below fix the configuration.
#[component]
pub fn DiagramCanvas(
	#[prop(into)] data: Signal<DiagramData>,
	config: DiagramConfig,
	#[prop(default = false)] fullscreen: bool,
	#[prop(default = None)] width: Option<f64>,
	#[prop(default = None)] height: Option<f64>,
	/// Seeds a root node when the initial data is empty.
	#[prop(default = None)]
	root_label: Option<String>,
	#[prop(default = None)] on_save: Option<Callback<DiagramData>>,
	#[prop(default = None)] on_error: Option<Callback<String>>,
	#[prop(default = None)] store: Option<Rc<dyn RelationshipStore>>,
) -> impl IntoView {
	let canvas_ref = NodeRef::<leptos::html::Canvas>::new();
	let state: SharedState = Rc::new(RefCell::new(None));
	let animate: FrameClosure = Rc::new(RefCell::new(None));
	let resize_cb: FrameClosure = Rc::new(RefCell::new(None));
	let alive = Arc::new(AtomicBool::new(true));

	let edit_mode = RwSignal::new(false);
	let show_labels = RwSignal::new(true);
	let node_scale = RwSignal::new(1.0_f64);
	let choosing: Choosing = RwSignal::new(None);
	let exporting = RwSignal::new(false);
	let creating = RwSignal::new(false);
	let message = RwSignal::new(Option::<String>::None);
	let new_label = RwSignal::new(String::new());
	let new_kind = RwSignal::new(NodeKind::Idea);

	let report = move |err: DiagramError| {
		if err.is_silent() {
			debug!("{err}");
			return;
		}
		error!("{err}");
		message.set(Some(err.to_string()));
		if let Some(cb) = on_error {
			cb.run(err.to_string());
		}
	};

	{
		let (state, resize_cb) = (state.clone(), resize_cb.clone());
		let teardown = register_teardown(move || {
			// Dropping the state releases any gesture's window listeners.
			if let Ok(mut slot) = state.try_borrow_mut() {
				slot.take();
			}
			if let (Some(win), Some(cb)) = (web_sys::window(), resize_cb.borrow_mut().take()) {
				let _ = win.remove_event_listener_with_callback("resize", cb.as_ref().unchecked_ref());
			}
		});
		let alive = alive.clone();
		on_cleanup(move || {
			alive.store(false, Ordering::Relaxed);
			run_teardown(teardown);
		});
	}

	let (state_init, animate_init, resize_init, config_init) =
		(state.clone(), animate.clone(), resize_cb.clone(), config.clone());
	Effect::new(move |_| {
		let Some(canvas) = canvas_ref.get() else {
			return;
		};
		let snapshot = data.get();
		if let Some(s) = state_init.borrow_mut().as_mut() {
			s.load(snapshot);
			return;
		}
		let Some(window) = web_sys::window() else {
			error!("diagram canvas needs a browser window");
			return;
		};

		let (w, h) = canvas_size(&canvas, &window, fullscreen, width, height);
		canvas.set_width(w as u32);
		canvas.set_height(h as u32);
		let Some(mut ctx) = canvas
			.get_context("2d")
			.ok()
			.flatten()
			.and_then(|c| c.dyn_into::<CanvasRenderingContext2d>().ok())
		else {
			error!("canvas 2d context unavailable");
			return;
		};

		let (weak, canvas_ptr, alive_ptr) = (Rc::downgrade(&state_init), canvas.clone(), alive.clone());
		let listeners = Rc::new(WindowPointerListeners::new(move |phase, ev: MouseEvent| {
			if !alive_ptr.load(Ordering::Relaxed) {
				return;
			}
			let Some(state) = weak.upgrade() else {
				return;
			};
			with_state(&state, |s| {
				sync_container(s, &canvas_ptr);
				let (x, y) = (ev.client_x() as f64, ev.client_y() as f64);
				let effect = match phase {
					PointerPhase::Move => s.pointer_move(x, y),
					PointerPhase::Up => s.pointer_up(x, y),
				};
				announce(&effect, s, choosing);
			});
		}));

		let rect = canvas.get_bounding_client_rect();
		let container = ContainerRect::new(rect.left(), rect.top(), w, h);
		let seed = snapshot.nodes.is_empty().then_some(root_label.as_deref()).flatten();
		let mut s = DiagramState::new(
			config_init.clone(),
			container,
			listeners.clone() as Rc<dyn GlobalListeners>,
		);
		if let Some(label) = seed {
			s = match s.with_root(NodeKind::Idea, label) {
				Ok(s) => s,
				Err(err) => {
					report(err);
					return;
				}
			};
		} else {
			s.load(snapshot);
		}
		s.set_options(RenderOptions {
			node_scale: node_scale.get_untracked(),
			show_labels: show_labels.get_untracked(),
		});
		s.set_edit_mode(edit_mode.get_untracked());
		*state_init.borrow_mut() = Some(s);
		info!("diagram canvas mounted at {w}x{h}");

		let (state_resize, canvas_resize) = (state_init.clone(), canvas.clone());
		*resize_init.borrow_mut() = Some(Closure::new(move || {
			let Some(win) = web_sys::window() else {
				return;
			};
			let (nw, nh) = canvas_size(&canvas_resize, &win, fullscreen, width, height);
			canvas_resize.set_width(nw as u32);
			canvas_resize.set_height(nh as u32);
			let rect = canvas_resize.get_bounding_client_rect();
			with_state(&state_resize, |s| {
				s.resize(ContainerRect::new(rect.left(), rect.top(), nw, nh))
			});
		}));
		if let Some(ref cb) = *resize_init.borrow() {
			let _ = window.add_event_listener_with_callback("resize", cb.as_ref().unchecked_ref());
		}

		let (state_anim, animate_inner, resize_anim, alive) = (
			state_init.clone(),
			animate_init.clone(),
			resize_init.clone(),
			alive.clone(),
		);
		*animate_init.borrow_mut() = Some(Closure::new(move || {
			let Some(win) = web_sys::window() else {
				return;
			};
			if !alive.load(Ordering::Relaxed) {
				// Normally already done by the cleanup.
				state_anim.borrow_mut().take();
				if let Some(cb) = resize_anim.borrow_mut().take() {
					let _ =
						win.remove_event_listener_with_callback("resize", cb.as_ref().unchecked_ref());
				}
				// This closure is running; free it on a later task.
				let frame = animate_inner.borrow_mut().take();
				let free = Closure::once_into_js(move || drop(frame));
				let _ = win.set_timeout_with_callback(free.unchecked_ref());
				debug!("diagram canvas torn down");
				return;
			}
			with_state(&state_anim, |s| {
				s.tick();
				render::render(&s.scene(), &mut ctx);
			});
			listeners.collect_retired();
			if let Some(ref cb) = *animate_inner.borrow() {
				let _ = win.request_animation_frame(cb.as_ref().unchecked_ref());
			}
		}));
		if let Some(ref cb) = *animate_init.borrow() {
			let _ = window.request_animation_frame(cb.as_ref().unchecked_ref());
		}
	});

	let state_opts = state.clone();
	Effect::new(move |_| {
		let options = RenderOptions {
			node_scale: node_scale.get(),
			show_labels: show_labels.get(),
		};
		let editing = edit_mode.get();
		with_state(&state_opts, |s| {
			s.set_options(options);
			if s.edit_mode() != editing {
				s.set_edit_mode(editing);
				choosing.set(None);
			}
		});
	});

	let state_md = state.clone();
	let on_mousedown = move |ev: MouseEvent| {
		if ev.button() != 0 {
			return;
		}
		let Some(canvas) = canvas_ref.get_untracked() else {
			return;
		};
		ev.prevent_default();
		let _ = canvas.focus();
		with_state(&state_md, |s| {
			sync_container(s, &canvas);
			let effect = s.pointer_down(ev.client_x() as f64, ev.client_y() as f64);
			announce(&effect, s, choosing);
		});
	};

	let state_mm = state.clone();
	let on_mousemove = move |ev: MouseEvent| {
		let Some(canvas) = canvas_ref.get_untracked() else {
			return;
		};
		let cursor = with_state(&state_mm, |s| {
			sync_container(s, &canvas);
			s.cursor(ev.client_x() as f64, ev.client_y() as f64)
		});
		if let Some(cursor) = cursor {
			let _ = web_sys::HtmlElement::style(&canvas).set_property("cursor", cursor);
		}
	};

	let state_wh = state.clone();
	let on_wheel = move |ev: WheelEvent| {
		ev.prevent_default();
		let Some(canvas) = canvas_ref.get_untracked() else {
			return;
		};
		with_state(&state_wh, |s| {
			sync_container(s, &canvas);
			s.wheel(ev.client_x() as f64, ev.client_y() as f64, ev.delta_y());
		});
	};

	let state_kd = state.clone();
	let on_keydown = move |ev: KeyboardEvent| {
		let key = ev.key();
		let handled = with_state(&state_kd, |s| {
			let effect = s.key_down(&key);
			announce(&effect, s, choosing);
			effect != GestureEffect::None
		});
		if handled == Some(true) {
			ev.prevent_default();
		}
	};

	let state_confirm = state.clone();
	let confirm = Rc::new(move |relation: RelationType| {
		choosing.set(None);
		let outcome = with_state(&state_confirm, |s| s.confirm_connection(relation));
		let request = match outcome {
			Some(Ok(ConnectOutcome::Remote(request))) => request,
			Some(Ok(ConnectOutcome::Created(id))) => {
				debug!("edge `{id}` added");
				return;
			}
			Some(Err(err)) => {
				report(err);
				return;
			}
			Some(Ok(ConnectOutcome::Ignored)) | None => return,
		};
		let Some(store) = store.clone() else {
			warn!("no relationship store; connection not saved");
			report(DiagramError::Persistence("no relationship store configured".into()));
			return;
		};
		let weak = Rc::downgrade(&state_confirm);
		creating.set(true);
		spawn_local(async move {
			let result = create_remote(store.as_ref(), request).await;
			creating.set(false);
			let Some(state) = weak.upgrade() else {
				debug!("relationship stored after the canvas was closed");
				return;
			};
			let outcome = match result {
				Ok(edge) => with_state(&state, |s| s.accept_remote_edge(edge)),
				Err(err) => Some(Err(err)),
			};
			if let Some(Err(err)) = outcome {
				report(err);
			}
		});
	});

	let state_cancel = state.clone();
	let on_cancel = move |_: MouseEvent| {
		choosing.set(None);
		with_state(&state_cancel, |s| s.cancel_connection());
	};

	let state_export = state.clone();
	let export = Rc::new(move |target: ExportTarget| {
		if exporting.get_untracked() {
			return;
		}
		exporting.set(true);
		let weak = Rc::downgrade(&state_export);
		spawn_local(async move {
			let result = run_export(weak, target).await;
			exporting.set(false);
			if let Err(err) = result {
				report(err.into());
			}
		});
	});
	let export_copy = export.clone();

	let state_save = state.clone();
	let on_save_click = move |_: MouseEvent| {
		let Some(cb) = on_save else {
			return;
		};
		if let Some(snapshot) = with_state(&state_save, |s| s.snapshot()) {
			info!("saving diagram: {} nodes", snapshot.nodes.len());
			cb.run(snapshot);
		}
	};

	let (state_fit, state_reset) = (state.clone(), state.clone());
	let view_buttons = config.pannable.then(move || {
		view! {
			<button title="Center and fit" on:click=move |_| {
				with_state(&state_fit, |s| s.center_and_fit());
			}>"Fit"</button>
			<button title="Reset zoom" on:click=move |_| {
				with_state(&state_reset, |s| s.reset_zoom());
			}>"1:1"</button>
		}
	});

	let (state_add, state_rename, state_delete) = (state.clone(), state.clone(), state.clone());
	let editing_tools = (config.route == ConnectionRoute::Local).then(move || {
		view! {
			<div class="diagram-node-tools">
				<select on:change=move |ev| {
					let value = event_target_value(&ev);
					if let Some(kind) = NodeKind::ALL.into_iter().find(|k| k.label() == value) {
						new_kind.set(kind);
					}
				}>
					{NodeKind::ALL
						.into_iter()
						.map(|k| {
							view! {
								<option value=k.label() selected={k == NodeKind::Idea}>
									{k.icon()}
									" "
									{k.label()}
								</option>
							}
						})
						.collect_view()}
				</select>
				<input
					type="text"
					placeholder="Label"
					prop:value=move || new_label.get()
					on:input=move |ev| new_label.set(event_target_value(&ev))
				/>
				<button on:click=move |_| {
					let label = new_label.get_untracked();
					match with_state(&state_add, |s| s.add_node(new_kind.get_untracked(), &label)) {
						Some(Ok(_)) => new_label.set(String::new()),
						Some(Err(err)) => report(err),
						None => {}
					}
				}>"Add"</button>
				<button title="Rename the selected node" on:click=move |_| {
					let label = new_label.get_untracked();
					let result = with_state(&state_rename, |s| {
						let id = s.interaction().selected()?.to_string();
						Some(s.rename_node(&id, &label))
					});
					match result.flatten() {
						Some(Ok(())) => new_label.set(String::new()),
						Some(Err(err)) => report(err),
						None => {}
					}
				}>"Rename"</button>
				<button title="Delete the selected node" on:click=move |_| {
					with_state(&state_delete, |s| s.remove_selected());
				}>"Delete"</button>
			</div>
		}
	});

	let relation_buttons = config
		.relation_types
		.iter()
		.map(|&rel| {
			let confirm = confirm.clone();
			view! {
				<button
					class="relation-option"
					style:border-color=rel.color()
					on:click=move |_| confirm(rel)
				>
					{rel.label()}
				</button>
			}
		})
		.collect_view();

	let legend = NodeKind::ALL
		.into_iter()
		.map(|k| {
			view! {
				<li>
					<span class="legend-swatch" style:background-color=k.color()></span>
					{k.label()}
				</li>
			}
		})
		.collect_view();

	view! {
		<div class="diagram-canvas" class:fullscreen=fullscreen style="position: relative;">
			<canvas
				node_ref=canvas_ref
				tabindex="0"
				on:mousedown=on_mousedown
				on:mousemove=on_mousemove
				on:wheel=on_wheel
				on:keydown=on_keydown
				style="display: block; outline: none;"
			/>

			<div class="diagram-toolbar">
				<button
					class:active=move || edit_mode.get()
					title="Click two nodes to connect them"
					on:click=move |_| edit_mode.update(|on| *on = !*on)
				>
					{move || { if edit_mode.get() { "Connecting" } else { "Connect" } }}
				</button>
				<label>
					<input
						type="checkbox"
						prop:checked=move || show_labels.get()
						on:change=move |ev| show_labels.set(event_target_checked(&ev))
					/>
					"Labels"
				</label>
				<label>
					"Size"
					<input
						type="range"
						min="0.5"
						max="2"
						step="0.1"
						prop:value=move || node_scale.get().to_string()
						on:input=move |ev| {
							if let Ok(v) = event_target_value(&ev).parse::<f64>() {
								node_scale.set(v);
							}
						}
					/>
				</label>
				{view_buttons}
				<button
					disabled=move || exporting.get()
					on:click=move |_| export(ExportTarget::Download)
				>
					"Download PNG"
				</button>
				<button
					disabled=move || exporting.get()
					on:click=move |_| export_copy(ExportTarget::Clipboard)
				>
					"Copy PNG"
				</button>
				{on_save.is_some().then(|| view! { <button on:click=on_save_click>"Save"</button> })}
			</div>

			{editing_tools}

			<div
				class="relation-chooser"
				style:display=move || { if choosing.get().is_some() { "flex" } else { "none" } }
			>
				<p>
					{move || {
						choosing.get().map(|(source, target)| format!("{source} \u{2192} {target}"))
					}}
				</p>
				{relation_buttons}
				<button on:click=on_cancel>"Cancel"</button>
			</div>

			<ul class="diagram-legend">{legend}</ul>

			<Show when=move || creating.get()>
				<div class="diagram-status">"Saving relationship\u{2026}"</div>
			</Show>

			{move || {
				message
					.get()
					.map(|m| {
						view! {
							<div class="diagram-error" on:click=move |_| message.set(None)>
								{m}
							</div>
						}
					})
			}}
		</div>
	}
}

/// Free-form mind map: manual layout, connection handles, local edges.
#[component]
pub fn MindMapCanvas(
	#[prop(into)] data: Signal<DiagramData>,
	#[prop(default = None)] width: Option<f64>,
	#[prop(default = None)] height: Option<f64>,
	#[prop(default = None)] on_save: Option<Callback<DiagramData>>,
	#[prop(default = None)] on_error: Option<Callback<String>>,
) -> impl IntoView {
	view! {
		<DiagramCanvas
			data=data
			config=DiagramConfig::mind_map()
			width=width
			height=height
			root_label=Some("Central idea".to_string())
			on_save=on_save
			on_error=on_error
		/>
	}
}

/// Force-directed story relationship graph. New relationships are created
/// through `store` before they appear.
#[component]
pub fn RelationshipGraphCanvas(
	#[prop(into)] data: Signal<DiagramData>,
	#[prop(default = false)] fullscreen: bool,
	#[prop(default = None)] width: Option<f64>,
	#[prop(default = None)] height: Option<f64>,
	#[prop(default = None)] store: Option<Rc<dyn RelationshipStore>>,
	#[prop(default = None)] on_error: Option<Callback<String>>,
) -> impl IntoView {
	view! {
		<DiagramCanvas
			data=data
			config=DiagramConfig::relationship_graph()
			fullscreen=fullscreen
			width=width
			height=height
			store=store
			on_error=on_error
		/>
	}
}

#[cfg(test)]
mod tests {
	use std::cell::Cell;

	use super::*;

	#[test]
	fn teardown_runs_once_and_only_its_own() {
		let hits = Rc::new(Cell::new(0));
		let (a, b) = (hits.clone(), hits.clone());
		let first = register_teardown(move || a.set(a.get() + 1));
		let second = register_teardown(move || b.set(b.get() + 10));
		assert_ne!(first, second);

		run_teardown(first);
		run_teardown(first);
		assert_eq!(hits.get(), 1);
		run_teardown(second);
		assert_eq!(hits.get(), 11);
	}

	#[test]
	fn teardown_drops_the_state_it_was_given() {
		let state: SharedState = Rc::new(RefCell::new(None));
		let weak = Rc::downgrade(&state);
		let id = register_teardown(move || drop(state));
		assert!(weak.upgrade().is_some());
		run_teardown(id);
		assert!(weak.upgrade().is_none());
	}
}
