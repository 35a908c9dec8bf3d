//! Geometric types shared by selection capture and composition
//!
//! Two coordinate spaces meet here:
//!
//! - **Screen space**: origin at the top-left of the rendered page, Y grows
//!   downward. Selections are captured in container pixels and stored as
//!   [`NormalizedRect`] fractions of the page.
//! - **PDF space**: origin at the bottom-left of the page box, Y grows upward,
//!   units are points.
//!
//! [`to_pdf_rect`] is the only place that flips between the two.

use serde::{Deserialize, Serialize};

/// A point in 2D space
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    /// X coordinate
    pub x: f64,
    /// Y coordinate
    pub y: f64,
}

impl Point {
    /// Create a new point
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Origin point (0, 0)
    pub fn origin() -> Self {
        Self { x: 0.0, y: 0.0 }
    }
}

/// A rectangle in PDF space defined by two points
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rectangle {
    /// Lower-left corner
    pub lower_left: Point,
    /// Upper-right corner
    pub upper_right: Point,
}

impl Rectangle {
    /// Create a new rectangle from two points
    pub fn new(lower_left: Point, upper_right: Point) -> Self {
        Self {
            lower_left,
            upper_right,
        }
    }

    /// Create a rectangle from position and size
    pub fn from_position_and_size(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            lower_left: Point::new(x, y),
            upper_right: Point::new(x + width, y + height),
        }
    }

    pub fn x(&self) -> f64 {
        self.lower_left.x
    }

    pub fn y(&self) -> f64 {
        self.lower_left.y
    }

    /// Get the width
    pub fn width(&self) -> f64 {
        self.upper_right.x - self.lower_left.x
    }

    /// Get the height
    pub fn height(&self) -> f64 {
        self.upper_right.y - self.lower_left.y
    }

    /// Get the center point
    pub fn center(&self) -> Point {
        Point::new(
            (self.lower_left.x + self.upper_right.x) / 2.0,
            (self.lower_left.y + self.upper_right.y) / 2.0,
        )
    }
}

/// The visible box of one page in PDF points, read from `/MediaBox`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageBox {
    /// Lower-left corner of the box (usually the origin)
    pub origin: Point,
    pub width: f64,
    pub height: f64,
}

impl PageBox {
    /// US Letter, used when a page carries no usable `/MediaBox`.
    pub const LETTER: PageBox = PageBox {
        origin: Point { x: 0.0, y: 0.0 },
        width: 612.0,
        height: 792.0,
    };

    pub fn new(width: f64, height: f64) -> Self {
        Self {
            origin: Point::origin(),
            width,
            height,
        }
    }

    /// Build from a `[llx lly urx ury]` box. Corners given in any order are
    /// normalized.
    pub fn from_corners(llx: f64, lly: f64, urx: f64, ury: f64) -> Self {
        Self {
            origin: Point::new(llx.min(urx), lly.min(ury)),
            width: (urx - llx).abs(),
            height: (ury - lly).abs(),
        }
    }
}

/// A rectangle expressed as fractions of a page, measured from the page's
/// visual top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NormalizedRect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl NormalizedRect {
    pub fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    /// Normalize a drag between two container-pixel corners, in either
    /// direction, against a container of `container_width` x `container_height`.
    pub fn from_corners(a: Point, b: Point, container_width: f64, container_height: f64) -> Self {
        let left = a.x.min(b.x) / container_width;
        let top = a.y.min(b.y) / container_height;
        let right = a.x.max(b.x) / container_width;
        let bottom = a.y.max(b.y) / container_height;

        Self {
            left,
            top,
            width: right - left,
            height: bottom - top,
        }
    }

    /// A rectangle of the given size centered on `(x, y)`, shifted back inside
    /// the unit square where it would overhang. Returns `None` if any input is
    /// not finite.
    pub fn centered_at(x: f64, y: f64, width: f64, height: f64) -> Option<Self> {
        if !(x.is_finite() && y.is_finite() && width.is_finite() && height.is_finite()) {
            return None;
        }
        let width = width.clamp(0.0, 1.0);
        let height = height.clamp(0.0, 1.0);
        let left = (x - width / 2.0).clamp(0.0, 1.0 - width);
        let top = (y - height / 2.0).clamp(0.0, 1.0 - height);

        Some(Self {
            left,
            top,
            width,
            height,
        })
    }

    pub fn right(&self) -> f64 {
        self.left + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.top + self.height
    }

    pub fn is_finite(&self) -> bool {
        self.left.is_finite()
            && self.top.is_finite()
            && self.width.is_finite()
            && self.height.is_finite()
    }

    /// True when the whole rectangle lies inside the page.
    pub fn is_within_page(&self) -> bool {
        self.left >= 0.0 && self.top >= 0.0 && self.right() <= 1.0 && self.bottom() <= 1.0
    }

    /// Intersect with the unit square. Returns `None` when nothing with
    /// positive area is left.
    pub fn clamp_to_page(&self) -> Option<Self> {
        let left = self.left.clamp(0.0, 1.0);
        let top = self.top.clamp(0.0, 1.0);
        let right = self.right().clamp(0.0, 1.0);
        let bottom = self.bottom().clamp(0.0, 1.0);

        if right <= left || bottom <= top {
            return None;
        }

        Some(Self {
            left,
            top,
            width: right - left,
            height: bottom - top,
        })
    }
}

/// Convert a normalized screen-space rectangle to a PDF-space rectangle on
/// `page`.
///
/// `top` is measured from the visual top of the page while PDF drawing
/// coordinates start at the bottom, so the lower-left Y is
/// `H - top*H - height*H`.
pub fn to_pdf_rect(rect: &NormalizedRect, page: &PageBox) -> Rectangle {
    let width = rect.width * page.width;
    let height = rect.height * page.height;
    let x = page.origin.x + rect.left * page.width;
    let y = page.origin.y + page.height - rect.top * page.height - height;

    Rectangle::from_position_and_size(x, y, width, height)
}
