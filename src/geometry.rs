//! Rectangles in the two coordinate spaces the overlay deals with.
//!
//! The OS reports window bounds in physical pixels on the virtual desktop.
//! The overlay lays out its cut-out in logical (DPI-independent) units
//! relative to its own top-left corner.

/// A rectangle in logical units, relative to the overlay's origin.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub const ZERO: Rect = Rect {
        x: 0.0,
        y: 0.0,
        width: 0.0,
        height: 0.0,
    };

    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// True when the rectangle is too small (or not finite) to be a reveal target.
    pub fn is_degenerate(&self) -> bool {
        !(self.width >= 1.0 && self.height >= 1.0)
            || !self.x.is_finite()
            || !self.y.is_finite()
            || !self.width.is_finite()
            || !self.height.is_finite()
    }

    /// Moves every field a `factor` fraction of the way toward `target`.
    pub fn approach(&self, target: &Rect, factor: f64) -> Rect {
        Rect {
            x: self.x + (target.x - self.x) * factor,
            y: self.y + (target.y - self.y) * factor,
            width: self.width + (target.width - self.width) * factor,
            height: self.height + (target.height - self.height) * factor,
        }
    }
}

/// Window bounds as reported by the OS: physical pixels, left/top/right/bottom.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PhysicalRect {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl PhysicalRect {
    pub const fn new(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    /// Builds from an origin and a size, the way most fixtures are written.
    pub const fn from_xywh(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self::new(x, y, x + width, y + height)
    }
}

/// Device scale and the overlay's own screen origin (in logical units).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DisplayTransform {
    pub scale_x: f64,
    pub scale_y: f64,
    pub origin_x: f64,
    pub origin_y: f64,
}

impl DisplayTransform {
    pub const IDENTITY: DisplayTransform = DisplayTransform {
        scale_x: 1.0,
        scale_y: 1.0,
        origin_x: 0.0,
        origin_y: 0.0,
    };

    /// Returns `None` when either scale is zero, negative or not finite; a
    /// transform like that would turn every mapped rect into NaN or infinity.
    pub fn new(scale_x: f64, scale_y: f64, origin_x: f64, origin_y: f64) -> Option<Self> {
        let valid = |s: f64| s.is_finite() && s > 0.0;
        if !valid(scale_x) || !valid(scale_y) || !origin_x.is_finite() || !origin_y.is_finite() {
            return None;
        }
        Some(Self {
            scale_x,
            scale_y,
            origin_x,
            origin_y,
        })
    }
}

/// Maps physical window bounds into the overlay's logical coordinate space.
pub fn to_overlay_logical(physical: &PhysicalRect, transform: &DisplayTransform) -> Rect {
    let left = f64::from(physical.left);
    let top = f64::from(physical.top);
    let right = f64::from(physical.right);
    let bottom = f64::from(physical.bottom);

    Rect {
        x: left / transform.scale_x - transform.origin_x,
        y: top / transform.scale_y - transform.origin_y,
        width: (right - left) / transform.scale_x,
        height: (bottom - top) / transform.scale_y,
    }
}
