//! Coordinate transforms between pointer, display and native PDF space.
//!
//! Three spaces are involved:
//! - screen space: raw pointer coordinates, the page element sits at
//!   `ScreenRect` and is drawn at the current zoom `scale`;
//! - display space: page-relative pixels at scale = 1, origin top-left;
//!   annotations store their position and size here;
//! - native space: PDF user units, origin bottom-left.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn offset(&self, delta: Point) -> Self {
        Self::new(self.x + delta.x, self.y + delta.y)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }
}

/// Bounding rectangle of the rendered page element in screen space.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ScreenRect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl ScreenRect {
    pub fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    pub fn right(&self) -> f64 {
        self.left + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.top + self.height
    }

    /// Edges count as inside.
    pub fn contains(&self, sample: PointerSample) -> bool {
        sample.x >= self.left
            && sample.x <= self.right()
            && sample.y >= self.top
            && sample.y <= self.bottom()
    }

    /// Size of the page at scale = 1, the space annotation bounds are clamped to.
    pub fn display_bounds(&self, scale: f64) -> Option<Size> {
        if scale <= 0.0 {
            return None;
        }
        Some(Size::new(self.width / scale, self.height / scale))
    }
}

/// A pointer position with mouse and touch input already unified.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PointerSample {
    pub x: f64,
    pub y: f64,
}

impl PointerSample {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// The first active touch drives the gesture; extra fingers are ignored.
    pub fn from_touches(touches: &[(f64, f64)]) -> Option<Self> {
        touches.first().map(|&(x, y)| Self::new(x, y))
    }
}

/// Axis-aligned rectangle in display space.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DisplayRect {
    pub origin: Point,
    pub size: Size,
}

impl DisplayRect {
    pub fn new(origin: Point, size: Size) -> Self {
        Self { origin, size }
    }

    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.origin.x
            && point.x <= self.origin.x + self.size.width
            && point.y >= self.origin.y
            && point.y <= self.origin.y + self.size.height
    }

    /// True when the whole rectangle lies inside `[0, bounds.width] × [0, bounds.height]`.
    pub fn within(&self, bounds: Size) -> bool {
        self.origin.x >= 0.0
            && self.origin.y >= 0.0
            && self.origin.x + self.size.width <= bounds.width
            && self.origin.y + self.size.height <= bounds.height
    }
}

/// Map a pointer sample onto the page at scale = 1.
///
/// Returns `None` when the pointer falls outside the page element.
pub fn pointer_to_document(
    sample: PointerSample,
    page_rect: ScreenRect,
    scale: f64,
) -> Option<Point> {
    if scale <= 0.0 || !page_rect.contains(sample) {
        return None;
    }
    Some(Point::new(
        (sample.x - page_rect.left) / scale,
        (sample.y - page_rect.top) / scale,
    ))
}

/// Keep an annotation of `size` fully inside `bounds`.
///
/// The upper limit is applied first, so a box larger than the page pins to 0.
pub fn clamp_position(position: Point, size: Size, bounds: Size) -> Point {
    let max_x = bounds.width - size.width;
    let max_y = bounds.height - size.height;
    Point::new(position.x.min(max_x).max(0.0), position.y.min(max_y).max(0.0))
}

/// Screen-space offset of the pointer from an annotation's top-left corner.
pub fn grab_offset(
    sample: PointerSample,
    page_rect: ScreenRect,
    scale: f64,
    position: Point,
) -> Point {
    Point::new(
        sample.x - (page_rect.left + position.x * scale),
        sample.y - (page_rect.top + position.y * scale),
    )
}

/// New top-left for a dragged annotation, already clamped to the page.
pub fn drag_position(
    sample: PointerSample,
    grab: Point,
    page_rect: ScreenRect,
    scale: f64,
    size: Size,
) -> Option<Point> {
    let bounds = page_rect.display_bounds(scale)?;
    let x = (sample.x - page_rect.left - grab.x) / scale;
    let y = (sample.y - page_rect.top - grab.y) / scale;
    Some(clamp_position(Point::new(x, y), size, bounds))
}

/// Captured at the start of a resize gesture.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResizeStart {
    pub pointer: PointerSample,
    pub size: Size,
    pub ratio: f64,
}

impl ResizeStart {
    pub fn new(pointer: PointerSample, size: Size) -> Self {
        let ratio = if size.height > 0.0 {
            size.width / size.height
        } else {
            1.0
        };
        Self {
            pointer,
            size,
            ratio,
        }
    }

    /// Aspect-preserving size for the current pointer; only horizontal travel counts.
    pub fn resized(&self, sample: PointerSample, scale: f64, min_width: f64) -> Size {
        let delta_x = if scale > 0.0 {
            (sample.x - self.pointer.x) / scale
        } else {
            0.0
        };
        let width = (self.size.width + delta_x).max(min_width);
        Size::new(width, width / self.ratio)
    }
}

/// Native rectangle with a bottom-left origin, as expected by PDF image drawing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NativeRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Linear map from display space to one page's native space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NativeMapping {
    pub display: Size,
    pub native: Size,
}

impl NativeMapping {
    pub fn new(display: Size, native: Size) -> Self {
        Self { display, native }
    }

    fn sx(&self) -> f64 {
        self.native.width / self.display.width
    }

    fn sy(&self) -> f64 {
        self.native.height / self.display.height
    }

    /// Top edge of the result lines up with the on-screen top edge.
    pub fn map_box(&self, position: Point, size: Size) -> NativeRect {
        let width = size.width * self.sx();
        let height = size.height * self.sy();
        NativeRect {
            x: position.x * self.sx(),
            y: self.native.height - position.y * self.sy() - height,
            width,
            height,
        }
    }

    /// Baseline anchor for text, no height subtraction.
    pub fn map_baseline(&self, position: Point) -> Point {
        Point::new(
            position.x * self.sx(),
            self.native.height - position.y * self.sy(),
        )
    }

    pub fn map_font_size(&self, font_size: f64) -> f64 {
        font_size * self.sy()
    }
}

/// `(cos, sin)` of a clockwise quarter-turn rotation expressed in PDF's
/// counter-clockwise convention, exact for the four quantized angles.
pub fn quarter_turn_terms(degrees: u16) -> (f64, f64) {
    match degrees % 360 {
        90 => (0.0, -1.0),
        180 => (-1.0, 0.0),
        270 => (0.0, 1.0),
        _ => (1.0, 0.0),
    }
}

/// `cm` operands drawing the unit square into `rect`, rotated about its centre.
pub fn image_matrix(rect: NativeRect, degrees: u16) -> [f64; 6] {
    let (cos, sin) = quarter_turn_terms(degrees);
    let (w, h) = (rect.width, rect.height);
    let cx = rect.x + w / 2.0;
    let cy = rect.y + h / 2.0;
    [
        w * cos,
        w * sin,
        -h * sin,
        h * cos,
        cx - w * cos / 2.0 + h * sin / 2.0,
        cy - w * sin / 2.0 - h * cos / 2.0,
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    #[test]
    fn pointer_inside_page_maps_by_scale() {
        let rect = ScreenRect::new(40.0, 10.0, 1200.0, 1600.0);
        let doc = pointer_to_document(PointerSample::new(240.0, 210.0), rect, 2.0).unwrap();
        assert!((doc.x - 100.0).abs() < EPS);
        assert!((doc.y - 100.0).abs() < EPS);
    }

    #[test]
    fn pointer_outside_page_is_rejected() {
        let rect = ScreenRect::new(0.0, 0.0, 600.0, 800.0);
        assert!(pointer_to_document(PointerSample::new(601.0, 10.0), rect, 1.0).is_none());
        assert!(pointer_to_document(PointerSample::new(10.0, -1.0), rect, 1.0).is_none());
        assert!(pointer_to_document(PointerSample::new(600.0, 800.0), rect, 1.0).is_some());
    }

    #[test]
    fn zero_scale_maps_nothing() {
        let rect = ScreenRect::new(0.0, 0.0, 600.0, 800.0);
        assert!(pointer_to_document(PointerSample::new(1.0, 1.0), rect, 0.0).is_none());
        assert!(rect.display_bounds(0.0).is_none());
    }

    #[test]
    fn clamp_keeps_box_on_page() {
        let bounds = Size::new(600.0, 800.0);
        let size = Size::new(150.0, 50.0);
        assert_eq!(clamp_position(Point::new(-20.0, 900.0), size, bounds), Point::new(0.0, 750.0));
        assert_eq!(clamp_position(Point::new(500.0, 10.0), size, bounds), Point::new(450.0, 10.0));
    }

    #[test]
    fn clamp_is_idempotent_in_bounds() {
        let bounds = Size::new(600.0, 800.0);
        let size = Size::new(150.0, 50.0);
        let p = Point::new(12.5, 700.0);
        assert_eq!(clamp_position(p, size, bounds), p);
    }

    #[test]
    fn oversized_box_pins_to_origin() {
        let p = clamp_position(
            Point::new(30.0, 30.0),
            Size::new(700.0, 900.0),
            Size::new(600.0, 800.0),
        );
        assert_eq!(p, Point::new(0.0, 0.0));
    }

    #[test]
    fn drag_subtracts_grab_offset() {
        let rect = ScreenRect::new(100.0, 50.0, 600.0, 800.0);
        let position = Point::new(200.0, 300.0);
        let grab = grab_offset(PointerSample::new(310.0, 360.0), rect, 1.0, position);
        assert_eq!(grab, Point::new(10.0, 10.0));

        let moved = drag_position(
            PointerSample::new(330.0, 380.0),
            grab,
            rect,
            1.0,
            Size::new(150.0, 50.0),
        )
        .unwrap();
        assert_eq!(moved, Point::new(220.0, 320.0));
    }

    #[test]
    fn resize_preserves_ratio_and_minimum() {
        let start = ResizeStart::new(PointerSample::new(500.0, 500.0), Size::new(150.0, 50.0));
        let grown = start.resized(PointerSample::new(560.0, 520.0), 1.0, 50.0);
        assert!((grown.width - 210.0).abs() < EPS);
        assert!((grown.height - 70.0).abs() < EPS);

        let shrunk = start.resized(PointerSample::new(100.0, 500.0), 1.0, 50.0);
        assert!((shrunk.width - 50.0).abs() < EPS);
        assert!((shrunk.height - 50.0 / 3.0).abs() < EPS);
    }

    #[test]
    fn resize_delta_is_measured_at_unit_scale() {
        let start = ResizeStart::new(PointerSample::new(0.0, 0.0), Size::new(150.0, 50.0));
        let grown = start.resized(PointerSample::new(120.0, 0.0), 2.0, 50.0);
        assert!((grown.width - 210.0).abs() < EPS);
    }

    #[test]
    fn native_box_flips_vertical_axis() {
        let mapping = NativeMapping::new(Size::new(600.0, 800.0), Size::new(612.0, 792.0));
        let rect = mapping.map_box(Point::new(100.0, 100.0), Size::new(150.0, 50.0));
        assert!((rect.x - 102.0).abs() < EPS);
        assert!((rect.width - 153.0).abs() < EPS);
        assert!((rect.height - 49.5).abs() < EPS);
        assert!((rect.y - (792.0 - 99.0 - 49.5)).abs() < EPS);
    }

    #[test]
    fn native_baseline_has_no_height_subtraction() {
        let mapping = NativeMapping::new(Size::new(600.0, 800.0), Size::new(612.0, 792.0));
        let p = mapping.map_baseline(Point::new(0.0, 400.0));
        assert!((p.y - 396.0).abs() < EPS);
        assert!((mapping.map_font_size(12.0) - 11.88).abs() < EPS);
    }

    #[test]
    fn unrotated_matrix_is_plain_scale_and_translate() {
        let rect = NativeRect { x: 10.0, y: 20.0, width: 150.0, height: 50.0 };
        assert_eq!(image_matrix(rect, 0), [150.0, 0.0, 0.0, 50.0, 10.0, 20.0]);
    }

    #[test]
    fn half_turn_keeps_centre() {
        let rect = NativeRect { x: 10.0, y: 20.0, width: 150.0, height: 50.0 };
        let m = image_matrix(rect, 180);
        // unit square centre (0.5, 0.5) maps to the box centre
        let cx = m[0] * 0.5 + m[2] * 0.5 + m[4];
        let cy = m[1] * 0.5 + m[3] * 0.5 + m[5];
        assert!((cx - 85.0).abs() < EPS);
        assert!((cy - 45.0).abs() < EPS);
    }

    #[test]
    fn first_touch_wins() {
        assert_eq!(
            PointerSample::from_touches(&[(3.0, 4.0), (9.0, 9.0)]),
            Some(PointerSample::new(3.0, 4.0))
        );
        assert_eq!(PointerSample::from_touches(&[]), None);
    }
}
