use web_sys::DomRect;

use super::types::Point;

/// Pan and zoom applied when drawing: `screen = diagram * k + (x, y)`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ViewTransform {
	pub x: f64,
	pub y: f64,
	pub k: f64,
}

impl Default for ViewTransform {
	fn default() -> Self {
		Self::IDENTITY
	}
}

impl ViewTransform {
	pub const IDENTITY: ViewTransform = ViewTransform {
		x: 0.0,
		y: 0.0,
		k: 1.0,
	};

	/// Zoom 1 with the diagram origin in the middle of the viewport.
	pub fn centered(width: f64, height: f64) -> Self {
		Self {
			x: width / 2.0,
			y: height / 2.0,
			k: 1.0,
		}
	}

	pub fn apply(&self, p: Point) -> Point {
		Point::new(p.x * self.k + self.x, p.y * self.k + self.y)
	}

	pub fn invert(&self, p: Point) -> Point {
		Point::new((p.x - self.x) / self.k, (p.y - self.y) / self.k)
	}

	/// Scales by `factor` while keeping the diagram point under `anchor` fixed.
	pub fn zoom_about(&mut self, anchor: Point, factor: f64, min_k: f64, max_k: f64) {
		let new_k = (self.k * factor).clamp(min_k, max_k);
		let ratio = new_k / self.k;
		self.x = anchor.x - (anchor.x - self.x) * ratio;
		self.y = anchor.y - (anchor.y - self.y) * ratio;
		self.k = new_k;
	}
}

/// The container's bounding rectangle in client (page) coordinates.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ContainerRect {
	pub left: f64,
	pub top: f64,
	pub width: f64,
	pub height: f64,
}

impl ContainerRect {
	pub fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
		Self {
			left,
			top,
			width,
			height,
		}
	}

	pub fn from_dom(rect: &DomRect) -> Self {
		Self::new(rect.left(), rect.top(), rect.width(), rect.height())
	}
}

/// Turns raw pointer coordinates into diagram coordinates.
#[derive(Clone, Debug, Default)]
pub struct CoordinateMapper {
	container: ContainerRect,
	transform: ViewTransform,
}

impl CoordinateMapper {
	pub fn new(container: ContainerRect, transform: ViewTransform) -> Self {
		Self {
			container,
			transform,
		}
	}

	pub fn container(&self) -> ContainerRect {
		self.container
	}

	/// Must be called whenever the container moves or resizes.
	pub fn set_container(&mut self, container: ContainerRect) {
		self.container = container;
	}

	pub fn transform(&self) -> ViewTransform {
		self.transform
	}

	pub fn set_transform(&mut self, transform: ViewTransform) {
		self.transform = transform;
	}

	pub fn transform_mut(&mut self) -> &mut ViewTransform {
		&mut self.transform
	}

	/// Client coordinates relative to the container's top-left corner.
	pub fn to_local(&self, client_x: f64, client_y: f64) -> Point {
		Point::new(client_x - self.container.left, client_y - self.container.top)
	}

	pub fn to_diagram(&self, client_x: f64, client_y: f64) -> Point {
		self.transform.invert(self.to_local(client_x, client_y))
	}

	/// Diagram coordinates to container-local screen coordinates.
	pub fn to_screen(&self, p: Point) -> Point {
		self.transform.apply(p)
	}
}

/// Chooses pan and zoom so every circle `(center, radius)` fits inside a
/// `width` x `height` viewport with `margin` to spare on each side.
pub fn fit_transform(
	circles: impl IntoIterator<Item = (Point, f64)>,
	width: f64,
	height: f64,
	margin: f64,
	max_k: f64,
) -> Option<ViewTransform> {
	let (mut min_x, mut min_y) = (f64::INFINITY, f64::INFINITY);
	let (mut max_x, mut max_y) = (f64::NEG_INFINITY, f64::NEG_INFINITY);
	for (p, r) in circles {
		min_x = min_x.min(p.x - r);
		min_y = min_y.min(p.y - r);
		max_x = max_x.max(p.x + r);
		max_y = max_y.max(p.y + r);
	}
	if !min_x.is_finite() || !min_y.is_finite() {
		return None;
	}

	let (bw, bh) = ((max_x - min_x).max(1.0), (max_y - min_y).max(1.0));
	let (avail_w, avail_h) = (
		(width - 2.0 * margin).max(1.0),
		(height - 2.0 * margin).max(1.0),
	);
	let k = (avail_w / bw).min(avail_h / bh).min(max_k);
	let (cx, cy) = ((min_x + max_x) / 2.0, (min_y + max_y) / 2.0);
	Some(ViewTransform {
		x: width / 2.0 - cx * k,
		y: height / 2.0 - cy * k,
		k,
	})
}

#[cfg(test)]
mod tests {
	use proptest::prelude::*;

	use super::*;

	#[test]
	fn pointer_maps_through_offset_and_transform() {
		let mapper = CoordinateMapper::new(
			ContainerRect::new(10.0, 20.0, 800.0, 600.0),
			ViewTransform {
				x: 100.0,
				y: 50.0,
				k: 2.0,
			},
		);
		assert_eq!(mapper.to_local(110.0, 70.0), Point::new(100.0, 50.0));
		assert_eq!(mapper.to_diagram(110.0, 70.0), Point::new(0.0, 0.0));
		assert_eq!(mapper.to_diagram(130.0, 90.0), Point::new(10.0, 10.0));
		assert_eq!(mapper.to_screen(Point::new(10.0, 10.0)), Point::new(120.0, 70.0));
	}

	#[test]
	fn resize_moves_the_origin() {
		let mut mapper = CoordinateMapper::default();
		assert_eq!(mapper.to_diagram(5.0, 5.0), Point::new(5.0, 5.0));
		mapper.set_container(ContainerRect::new(5.0, 5.0, 10.0, 10.0));
		assert_eq!(mapper.to_diagram(5.0, 5.0), Point::new(0.0, 0.0));
	}

	#[test]
	fn zoom_keeps_anchor_fixed() {
		let mut t = ViewTransform::centered(400.0, 300.0);
		let anchor = Point::new(250.0, 120.0);
		let before = t.invert(anchor);
		t.zoom_about(anchor, 1.1, 0.1, 10.0);
		let after = t.invert(anchor);
		assert!((before.x - after.x).abs() < 1e-9);
		assert!((before.y - after.y).abs() < 1e-9);
		assert!((t.k - 1.1).abs() < 1e-9);
	}

	#[test]
	fn zoom_is_clamped() {
		let mut t = ViewTransform::IDENTITY;
		t.zoom_about(Point::default(), 100.0, 0.1, 10.0);
		assert_eq!(t.k, 10.0);
	}

	#[test]
	fn fit_of_nothing_is_none() {
		assert!(fit_transform(Vec::new(), 800.0, 600.0, 20.0, 4.0).is_none());
	}

	proptest! {
		#[test]
		fn fit_shows_every_node(
			points in prop::collection::vec((-2000.0f64..2000.0, -2000.0f64..2000.0), 1..40),
			width in 100.0f64..2000.0,
			height in 100.0f64..2000.0,
		) {
			let circles: Vec<_> = points.iter().map(|&(x, y)| (Point::new(x, y), 8.0)).collect();
			let t = fit_transform(circles.iter().copied(), width, height, 20.0, 4.0).unwrap();
			for (p, _) in circles {
				let s = t.apply(p);
				prop_assert!(s.x >= -1e-6 && s.x <= width + 1e-6);
				prop_assert!(s.y >= -1e-6 && s.y <= height + 1e-6);
			}
		}
	}
}
