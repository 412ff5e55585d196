use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use log::{debug, warn};
use wasm_bindgen::prelude::*;
use web_sys::MouseEvent;

/// Something that can subscribe to pointer events outside the canvas for
/// the duration of a gesture.
pub trait GlobalListeners {
	/// Registers the listeners. They stay registered until the returned
	/// guard is dropped.
	fn acquire(&self) -> ListenerGuard;
}

/// Releases its listeners when dropped, on every exit path.
pub struct ListenerGuard {
	release: Option<Box<dyn FnOnce()>>,
}

impl ListenerGuard {
	pub fn new(release: impl FnOnce() + 'static) -> Self {
		Self {
			release: Some(Box::new(release)),
		}
	}

	/// A guard holding nothing, used when no window is available.
	pub fn empty() -> Self {
		Self { release: None }
	}
}

impl Drop for ListenerGuard {
	fn drop(&mut self) {
		if let Some(release) = self.release.take() {
			release();
		}
	}
}

impl fmt::Debug for ListenerGuard {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ListenerGuard")
			.field("held", &self.release.is_some())
			.finish()
	}
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PointerPhase {
	Move,
	Up,
}

type PointerClosure = Closure<dyn FnMut(MouseEvent)>;

/// Window-level `mousemove` / `mouseup` listeners, so a drag keeps tracking
/// when the pointer leaves the canvas.
pub struct WindowPointerListeners {
	handler: Rc<dyn Fn(PointerPhase, MouseEvent)>,
	// Closures removed while one of them may still be running; dropped later.
	retired: Rc<RefCell<Vec<PointerClosure>>>,
}

impl WindowPointerListeners {
	pub fn new(handler: impl Fn(PointerPhase, MouseEvent) + 'static) -> Self {
		Self {
			handler: Rc::new(handler),
			retired: Rc::default(),
		}
	}

	/// Frees closures of released gestures. Must not be called from inside
	/// one of those closures.
	pub fn collect_retired(&self) {
		self.retired.borrow_mut().clear();
	}
}

impl GlobalListeners for WindowPointerListeners {
	fn acquire(&self) -> ListenerGuard {
		let Some(window) = web_sys::window() else {
			warn!("no window; gesture will only see canvas events");
			return ListenerGuard::empty();
		};
		self.collect_retired();

		let handler = self.handler.clone();
		let on_move: PointerClosure =
			Closure::new(move |ev: MouseEvent| handler(PointerPhase::Move, ev));
		let handler = self.handler.clone();
		let on_up: PointerClosure = Closure::new(move |ev: MouseEvent| handler(PointerPhase::Up, ev));
		let _ = window.add_event_listener_with_callback("mousemove", on_move.as_ref().unchecked_ref());
		let _ = window.add_event_listener_with_callback("mouseup", on_up.as_ref().unchecked_ref());
		debug!("window pointer listeners registered");

		let retired = self.retired.clone();
		ListenerGuard::new(move || {
			let _ = window
				.remove_event_listener_with_callback("mousemove", on_move.as_ref().unchecked_ref());
			let _ =
				window.remove_event_listener_with_callback("mouseup", on_up.as_ref().unchecked_ref());
			debug!("window pointer listeners released");
			retired.borrow_mut().extend([on_move, on_up]);
		})
	}
}

/// Counts live acquisitions instead of touching the DOM.
#[cfg(test)]
#[derive(Default)]
pub(crate) struct CountingListeners {
	pub(crate) active: Rc<std::cell::Cell<usize>>,
}

#[cfg(test)]
impl GlobalListeners for CountingListeners {
	fn acquire(&self) -> ListenerGuard {
		self.active.set(self.active.get() + 1);
		let active = self.active.clone();
		ListenerGuard::new(move || active.set(active.get() - 1))
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn guard_releases_once_on_drop() {
		let listeners = CountingListeners::default();
		let guard = listeners.acquire();
		let second = listeners.acquire();
		assert_eq!(listeners.active.get(), 2);
		drop(guard);
		assert_eq!(listeners.active.get(), 1);
		drop(second);
		assert_eq!(listeners.active.get(), 0);
	}

	#[test]
	fn empty_guard_is_inert() {
		let guard = ListenerGuard::empty();
		assert!(format!("{guard:?}").contains("false"));
	}
}
