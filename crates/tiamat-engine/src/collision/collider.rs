use crate::coords::Vec2;

/// Axis-aligned bounding box (world space).
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Aabb {
    pub min: Vec2,
    pub max: Vec2,
}

impl Aabb {
    /// Builds the tightest box around `points`. Empty input yields a
    /// degenerate box at the origin.
    pub fn from_points(points: &[Vec2]) -> Aabb {
        let Some(first) = points.first().copied() else {
            return Aabb { min: Vec2::zero(), max: Vec2::zero() };
        };
        let mut min = first;
        let mut max = first;
        for &p in &points[1..] {
            min = min.min(p);
            max = max.max(p);
        }
        Aabb { min, max }
    }

    #[inline]
    pub fn center(self) -> Vec2 {
        (self.min + self.max) * 0.5
    }

    #[inline]
    pub fn contains(self, p: Vec2) -> bool {
        p.x >= self.min.x && p.x <= self.max.x && p.y >= self.min.y && p.y <= self.max.y
    }

    #[inline]
    pub fn overlaps(self, other: Aabb) -> bool {
        self.min.x <= other.max.x
            && other.min.x <= self.max.x
            && self.min.y <= other.max.y
            && other.min.y <= self.max.y
    }

    /// Point in the box closest to `p` (equals `p` when inside).
    #[inline]
    pub fn closest_point(self, p: Vec2) -> Vec2 {
        Vec2::new(p.x.clamp(self.min.x, self.max.x), p.y.clamp(self.min.y, self.max.y))
    }

    pub fn corners(self) -> [Vec2; 4] {
        [
            self.min,
            Vec2::new(self.max.x, self.min.y),
            self.max,
            Vec2::new(self.min.x, self.max.y),
        ]
    }
}

/// Oriented box: center plus two half-extent edge vectors.
///
/// The axes are the node's rotated/scaled half-width and half-height
/// vectors; they are not required to be unit length or perpendicular after
/// non-uniform scale.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Obb {
    pub center: Vec2,
    pub axes: [Vec2; 2],
}

impl Obb {
    pub fn corners(self) -> [Vec2; 4] {
        let [u, v] = self.axes;
        [
            self.center - u - v,
            self.center + u - v,
            self.center + u + v,
            self.center - u + v,
        ]
    }
}

/// Circle: world-space center plus radius.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Circle {
    pub center: Vec2,
    pub radius: f32,
}

/// Convex polygon with world-space points.
#[derive(Debug, Clone, PartialEq)]
pub struct ConvexPolygon {
    pub points: Vec<Vec2>,
}

/// Shape-specific narrow-phase geometry.
#[derive(Debug, Clone, PartialEq)]
pub enum ColliderShape {
    /// The AABB alone is the shape (unrotated rects).
    Aabb,
    Obb(Obb),
    Circle(Circle),
    Polygon(ConvexPolygon),
}

/// Cached collision geometry for one node: the broad-phase AABB plus the
/// narrow-phase shape.
#[derive(Debug, Clone, PartialEq)]
pub struct Collider {
    pub aabb: Aabb,
    pub shape: ColliderShape,
}

impl Collider {
    pub fn aabb_only(aabb: Aabb) -> Collider {
        Collider { aabb, shape: ColliderShape::Aabb }
    }

    pub fn obb(obb: Obb) -> Collider {
        Collider {
            aabb: Aabb::from_points(&obb.corners()),
            shape: ColliderShape::Obb(obb),
        }
    }

    pub fn circle(circle: Circle) -> Collider {
        let r = Vec2::splat(circle.radius.abs());
        Collider {
            aabb: Aabb { min: circle.center - r, max: circle.center + r },
            shape: ColliderShape::Circle(circle),
        }
    }

    pub fn polygon(points: Vec<Vec2>) -> Collider {
        Collider {
            aabb: Aabb::from_points(&points),
            shape: ColliderShape::Polygon(ConvexPolygon { points }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aabb_from_points_is_tight() {
        let b = Aabb::from_points(&[Vec2::new(3.0, -1.0), Vec2::new(-2.0, 4.0), Vec2::new(0.0, 0.0)]);
        assert_eq!(b.min, Vec2::new(-2.0, -1.0));
        assert_eq!(b.max, Vec2::new(3.0, 4.0));
    }

    #[test]
    fn aabb_overlap_is_inclusive() {
        let a = Aabb { min: Vec2::zero(), max: Vec2::new(1.0, 1.0) };
        let b = Aabb { min: Vec2::new(1.0, 0.0), max: Vec2::new(2.0, 1.0) };
        assert!(a.overlaps(b));
    }

    #[test]
    fn obb_collider_aabb_covers_rotated_corners() {
        // 45°-rotated unit-ish box.
        let h = std::f32::consts::FRAC_1_SQRT_2;
        let obb = Obb {
            center: Vec2::zero(),
            axes: [Vec2::new(h, h), Vec2::new(-h, h)],
        };
        let c = Collider::obb(obb);
        assert!((c.aabb.max.x - 2.0 * h).abs() < 1e-5);
        assert!((c.aabb.min.y + 2.0 * h).abs() < 1e-5);
    }
}
