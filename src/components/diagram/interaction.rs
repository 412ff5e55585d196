//! Pointer gesture resolution.
//!
//! A press on a node is ambiguous until the pointer moves or is released:
//! it may become a drag, a selection, or (in edit mode) the start of a
//! connection. [`InteractionMachine`] owns that decision. It never touches
//! the diagram itself; every transition returns an [`Effect`] for the
//! caller to apply.

use std::rc::Rc;

use log::debug;

use super::listeners::{GlobalListeners, ListenerGuard};
use super::types::{NodeId, Point};

/// What is under the pointer.
#[derive(Clone, Debug, PartialEq)]
pub enum PointerTarget {
	Canvas,
	Node { id: NodeId, center: Point },
	/// The connection handle drawn on a node's edge.
	Handle { id: NodeId },
}

/// One pointer position in both coordinate spaces.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PointerSample {
	/// Container-local CSS pixels.
	pub screen: Point,
	pub diagram: Point,
}

/// The gesture in progress. The listener guard lives inside the variants
/// that need window-level events, so leaving them releases the listeners.
#[derive(Debug, Default)]
pub enum Gesture {
	#[default]
	Idle,
	Dragging {
		node: NodeId,
		grab_offset: Point,
		press: Point,
		moved: bool,
		_listeners: ListenerGuard,
	},
	Panning {
		press: Point,
		last: Point,
		moved: bool,
		_listeners: ListenerGuard,
	},
	Connecting {
		source: NodeId,
		pointer: Point,
		_listeners: ListenerGuard,
	},
	AwaitingConfirm {
		source: NodeId,
		target: NodeId,
	},
}

/// What the caller should do after a transition.
#[derive(Clone, Debug, PartialEq)]
pub enum Effect {
	None,
	Select(Option<NodeId>),
	MoveNode { id: NodeId, to: Point },
	CommitNode { id: NodeId, to: Point },
	Pan { dx: f64, dy: f64 },
	/// A source and target are chosen; ask for the relationship type.
	ChooseRelation { source: NodeId, target: NodeId },
	Cancelled,
}

pub struct InteractionMachine {
	gesture: Gesture,
	selected: Option<NodeId>,
	edit_mode: bool,
	drag_threshold: f64,
	listeners: Rc<dyn GlobalListeners>,
}

impl InteractionMachine {
	pub fn new(listeners: Rc<dyn GlobalListeners>, drag_threshold: f64) -> Self {
		Self {
			gesture: Gesture::Idle,
			selected: None,
			edit_mode: false,
			drag_threshold,
			listeners,
		}
	}

	pub fn gesture(&self) -> &Gesture {
		&self.gesture
	}

	pub fn is_idle(&self) -> bool {
		matches!(self.gesture, Gesture::Idle)
	}

	pub fn selected(&self) -> Option<&str> {
		self.selected.as_deref()
	}

	pub fn edit_mode(&self) -> bool {
		self.edit_mode
	}

	/// In edit mode a click on a node starts a connection instead of a drag.
	pub fn set_edit_mode(&mut self, on: bool) {
		if self.edit_mode != on {
			self.cancel();
			self.edit_mode = on;
		}
	}

	/// Source node and live pointer position while a connection is being drawn.
	pub fn pending_connection(&self) -> Option<(&str, Point)> {
		match &self.gesture {
			Gesture::Connecting {
				source, pointer, ..
			} => Some((source, *pointer)),
			_ => None,
		}
	}

	/// The chosen endpoints while waiting for a relationship type.
	pub fn awaiting_confirm(&self) -> Option<(&str, &str)> {
		match &self.gesture {
			Gesture::AwaitingConfirm { source, target } => Some((source, target)),
			_ => None,
		}
	}

	pub fn pointer_down(&mut self, target: PointerTarget, at: PointerSample, pannable: bool) -> Effect {
		match std::mem::take(&mut self.gesture) {
			Gesture::Idle => self.press_idle(target, at, pannable),
			// The release of the previous gesture never arrived; start over.
			Gesture::Dragging { .. } | Gesture::Panning { .. } => {
				debug!("pointer down during a gesture; resetting");
				self.press_idle(target, at, pannable)
			}
			Gesture::Connecting { source, .. } => match target {
				PointerTarget::Node { id, .. } | PointerTarget::Handle { id } if id != source => {
					self.await_confirm(source, id)
				}
				PointerTarget::Canvas | PointerTarget::Node { .. } | PointerTarget::Handle { .. } => {
					debug!("connection from `{source}` cancelled");
					Effect::Cancelled
				}
			},
			Gesture::AwaitingConfirm { source, target } => {
				debug!("pending connection `{source}` -> `{target}` dismissed");
				Effect::Cancelled
			}
		}
	}

	fn press_idle(&mut self, target: PointerTarget, at: PointerSample, pannable: bool) -> Effect {
		match target {
			PointerTarget::Handle { id } => self.start_connecting(id, at.diagram),
			PointerTarget::Node { id, .. } if self.edit_mode => self.start_connecting(id, at.diagram),
			PointerTarget::Node { id, center } => {
				debug!("press on `{id}`");
				self.gesture = Gesture::Dragging {
					node: id,
					grab_offset: center - at.diagram,
					press: at.screen,
					moved: false,
					_listeners: self.listeners.acquire(),
				};
				Effect::None
			}
			PointerTarget::Canvas if pannable => {
				self.gesture = Gesture::Panning {
					press: at.screen,
					last: at.screen,
					moved: false,
					_listeners: self.listeners.acquire(),
				};
				Effect::None
			}
			PointerTarget::Canvas => {
				self.selected = None;
				Effect::Select(None)
			}
		}
	}

	fn start_connecting(&mut self, source: NodeId, pointer: Point) -> Effect {
		debug!("connecting from `{source}`");
		self.gesture = Gesture::Connecting {
			source,
			pointer,
			_listeners: self.listeners.acquire(),
		};
		Effect::None
	}

	fn await_confirm(&mut self, source: NodeId, target: NodeId) -> Effect {
		debug!("connection `{source}` -> `{target}` awaiting a type");
		self.gesture = Gesture::AwaitingConfirm {
			source: source.clone(),
			target: target.clone(),
		};
		Effect::ChooseRelation { source, target }
	}

	pub fn pointer_move(&mut self, at: PointerSample) -> Effect {
		let threshold = self.drag_threshold;
		match &mut self.gesture {
			Gesture::Dragging {
				node,
				grab_offset,
				press,
				moved,
				..
			} => {
				if !*moved && at.screen.distance(*press) > threshold {
					*moved = true;
				}
				if *moved {
					Effect::MoveNode {
						id: node.clone(),
						to: at.diagram + *grab_offset,
					}
				} else {
					Effect::None
				}
			}
			Gesture::Panning {
				press, last, moved, ..
			} => {
				let (dx, dy) = (at.screen.x - last.x, at.screen.y - last.y);
				*last = at.screen;
				if !*moved && at.screen.distance(*press) > threshold {
					*moved = true;
				}
				Effect::Pan { dx, dy }
			}
			Gesture::Connecting { pointer, .. } => {
				*pointer = at.diagram;
				Effect::None
			}
			Gesture::Idle | Gesture::AwaitingConfirm { .. } => Effect::None,
		}
	}

	pub fn pointer_up(&mut self, target: PointerTarget, at: PointerSample) -> Effect {
		match std::mem::take(&mut self.gesture) {
			Gesture::Dragging {
				node,
				grab_offset,
				press,
				moved,
				_listeners,
			} => {
				if moved || at.screen.distance(press) > self.drag_threshold {
					debug!("drag of `{node}` committed");
					Effect::CommitNode {
						id: node,
						to: at.diagram + grab_offset,
					}
				} else {
					debug!("`{node}` selected");
					self.selected = Some(node.clone());
					Effect::Select(Some(node))
				}
			}
			Gesture::Panning { moved, .. } => {
				if moved {
					Effect::None
				} else {
					self.selected = None;
					Effect::Select(None)
				}
			}
			Gesture::Connecting {
				source,
				pointer,
				_listeners,
			} => match target {
				// Drag-to-connect: released over another node.
				PointerTarget::Node { id, .. } | PointerTarget::Handle { id } if id != source => {
					self.await_confirm(source, id)
				}
				// Released over the source itself; keep waiting for a target click.
				PointerTarget::Node { .. } | PointerTarget::Handle { .. } => {
					self.gesture = Gesture::Connecting {
						source,
						pointer,
						_listeners,
					};
					Effect::None
				}
				PointerTarget::Canvas => {
					debug!("connection from `{source}` dropped on empty canvas");
					Effect::Cancelled
				}
			},
			other => {
				self.gesture = other;
				Effect::None
			}
		}
	}

	/// Leaves `AwaitingConfirm`, handing back the chosen endpoints.
	pub fn confirm(&mut self) -> Option<(NodeId, NodeId)> {
		match std::mem::take(&mut self.gesture) {
			Gesture::AwaitingConfirm { source, target } => Some((source, target)),
			other => {
				self.gesture = other;
				None
			}
		}
	}

	/// Abandons whatever gesture is in progress without touching the diagram.
	pub fn cancel(&mut self) -> Effect {
		match std::mem::take(&mut self.gesture) {
			Gesture::Idle => Effect::None,
			gesture => {
				debug!("gesture cancelled: {gesture:?}");
				Effect::Cancelled
			}
		}
	}

	/// Drops selection and gestures referring to a node that no longer exists.
	pub fn forget_node(&mut self, id: &str) {
		if self.selected.as_deref() == Some(id) {
			self.selected = None;
		}
		let involved = match &self.gesture {
			Gesture::Dragging { node, .. } => node == id,
			Gesture::Connecting { source, .. } => source == id,
			Gesture::AwaitingConfirm { source, target } => source == id || target == id,
			Gesture::Idle | Gesture::Panning { .. } => false,
		};
		if involved {
			self.cancel();
		}
	}

	/// Resets everything, e.g. when a new diagram is loaded.
	pub fn reset(&mut self) {
		self.cancel();
		self.selected = None;
	}
}
