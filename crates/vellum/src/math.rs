//! Math types and glam re-exports.
//!
//! We re-export [glam](https://docs.rs/glam) types so users don't need to
//! depend on it directly. [`Aabb`] is the axis-aligned box used for bounds and
//! collision tests.

pub use glam::Vec2;

/// An axis-aligned box: top-left corner plus size.
///
/// Sizes are expected to be non-negative.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Aabb {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Aabb {
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Build from min/max corners.
    pub fn from_corners(min: Vec2, max: Vec2) -> Self {
        Self::new(min.x, min.y, max.x - min.x, max.y - min.y)
    }

    pub fn min(&self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }

    pub fn max(&self) -> Vec2 {
        Vec2::new(self.x + self.width, self.y + self.height)
    }

    /// Returns `true` if the boxes share interior area.
    ///
    /// Boxes whose edges exactly touch do not overlap.
    pub fn overlaps(&self, other: &Aabb) -> bool {
        other.x < self.x + self.width
            && other.x + other.width > self.x
            && other.y < self.y + self.height
            && other.y + other.height > self.y
    }

    /// Returns `true` if the point lies inside or on the edge of the box.
    pub fn contains(&self, point: Vec2) -> bool {
        point.x >= self.x
            && point.x <= self.x + self.width
            && point.y >= self.y
            && point.y <= self.y + self.height
    }

    /// Smallest box containing both.
    pub fn union(&self, other: &Aabb) -> Aabb {
        Aabb::from_corners(self.min().min(other.min()), self.max().max(other.max()))
    }
}
