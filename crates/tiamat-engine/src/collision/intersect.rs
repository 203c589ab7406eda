use crate::coords::Vec2;

use super::collider::{Aabb, Circle, Collider, ColliderShape, Obb, ConvexPolygon};

/// Tests two colliders for intersection.
///
/// The AABB broad phase runs first; only overlapping boxes reach the
/// shape-pair narrow phase. The test is symmetric: `collides(a, b) ==
/// collides(b, a)`.
pub fn collides(a: &Collider, b: &Collider) -> bool {
    if !a.aabb.overlaps(b.aabb) {
        return false;
    }

    use ColliderShape::*;
    match (&a.shape, &b.shape) {
        // Both narrow phases are their AABBs; the broad phase already decided.
        (Aabb, Aabb) => true,

        (Circle(ca), Circle(cb)) => circle_circle(*ca, *cb),

        (Circle(c), Aabb) => circle_aabb(*c, b.aabb),
        (Aabb, Circle(c)) => circle_aabb(*c, a.aabb),

        (Circle(c), Obb(o)) => circle_points(*c, &o.corners()),
        (Obb(o), Circle(c)) => circle_points(*c, &o.corners()),

        (Circle(c), Polygon(p)) => circle_points(*c, &p.points),
        (Polygon(p), Circle(c)) => circle_points(*c, &p.points),

        (Obb(oa), Obb(ob)) => sat(&oa.corners(), &ob.corners()),

        (Obb(o), Aabb) => sat(&o.corners(), &b.aabb.corners()),
        (Aabb, Obb(o)) => sat(&o.corners(), &a.aabb.corners()),

        (Obb(o), Polygon(p)) => sat(&o.corners(), &p.points),
        (Polygon(p), Obb(o)) => sat(&o.corners(), &p.points),

        (Polygon(pa), Polygon(pb)) => sat(&pa.points, &pb.points),

        (Polygon(p), Aabb) => sat(&p.points, &b.aabb.corners()),
        (Aabb, Polygon(p)) => sat(&p.points, &a.aabb.corners()),
    }
}

/// Point-in-collider test used for hit testing.
pub fn contains(c: &Collider, p: Vec2) -> bool {
    if !c.aabb.contains(p) {
        return false;
    }
    match &c.shape {
        ColliderShape::Aabb => true,
        ColliderShape::Obb(o) => point_in_convex(&o.corners(), p),
        ColliderShape::Circle(circle) => {
            (p - circle.center).length_sq() <= circle.radius * circle.radius
        }
        ColliderShape::Polygon(poly) => point_in_convex(&poly.points, p),
    }
}

// ── narrow phases ─────────────────────────────────────────────────────────

#[inline]
fn circle_circle(a: Circle, b: Circle) -> bool {
    let r = a.radius + b.radius;
    // Inclusive: centers exactly r1+r2 apart still collide.
    (b.center - a.center).length_sq() <= r * r
}

#[inline]
fn circle_aabb(c: Circle, b: Aabb) -> bool {
    let closest = b.closest_point(c.center);
    (closest - c.center).length_sq() <= c.radius * c.radius
}

/// Circle vs convex point set: inside test, then closest distance to edges.
fn circle_points(c: Circle, points: &[Vec2]) -> bool {
    if points.is_empty() {
        return false;
    }
    if point_in_convex(points, c.center) {
        return true;
    }

    let r2 = c.radius * c.radius;
    let n = points.len();
    for i in 0..n {
        let a = points[i];
        let b = points[(i + 1) % n];
        if segment_distance_sq(a, b, c.center) <= r2 {
            return true;
        }
    }
    false
}

/// Separating-axis test for two convex point sets. Touching projections
/// count as overlap (inclusive boundaries).
fn sat(a: &[Vec2], b: &[Vec2]) -> bool {
    if a.is_empty() || b.is_empty() {
        return false;
    }
    !has_separating_axis(a, b) && !has_separating_axis(b, a)
}

fn has_separating_axis(edges_of: &[Vec2], other: &[Vec2]) -> bool {
    let n = edges_of.len();
    for i in 0..n {
        let edge = edges_of[(i + 1) % n] - edges_of[i];
        let axis = edge.perp();
        // Degenerate edge (repeated point): no axis to test.
        if axis.length_sq() <= f32::EPSILON {
            continue;
        }

        let (min_a, max_a) = project(edges_of, axis);
        let (min_b, max_b) = project(other, axis);
        if min_a > max_b || min_b > max_a {
            return true;
        }
    }
    false
}

fn project(points: &[Vec2], axis: Vec2) -> (f32, f32) {
    let mut min = f32::INFINITY;
    let mut max = f32::NEG_INFINITY;
    for &p in points {
        let d = p.dot(axis);
        min = min.min(d);
        max = max.max(d);
    }
    (min, max)
}

/// Convex containment: `p` must lie on one consistent side of every edge
/// (either winding), edges themselves included.
fn point_in_convex(points: &[Vec2], p: Vec2) -> bool {
    let n = points.len();
    if n < 3 {
        return false;
    }

    let mut sign = 0.0f32;
    for i in 0..n {
        let a = points[i];
        let b = points[(i + 1) % n];
        let cross = (b - a).cross(p - a);
        if cross.abs() <= f32::EPSILON {
            continue;
        }
        if sign == 0.0 {
            sign = cross.signum();
        } else if cross.signum() != sign {
            return false;
        }
    }
    true
}

fn segment_distance_sq(a: Vec2, b: Vec2, p: Vec2) -> f32 {
    let ab = b - a;
    let len2 = ab.length_sq();
    if len2 <= f32::EPSILON {
        return (p - a).length_sq();
    }
    let t = ((p - a).dot(ab) / len2).clamp(0.0, 1.0);
    (p - (a + ab * t)).length_sq()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collision::Collider;

    fn aabb(x0: f32, y0: f32, x1: f32, y1: f32) -> Collider {
        Collider::aabb_only(Aabb { min: Vec2::new(x0, y0), max: Vec2::new(x1, y1) })
    }

    fn circle(x: f32, y: f32, r: f32) -> Collider {
        Collider::circle(Circle { center: Vec2::new(x, y), radius: r })
    }

    // ── aabb ──────────────────────────────────────────────────────────────

    #[test]
    fn aabb_aabb_symmetric() {
        let a = aabb(0.0, 0.0, 10.0, 10.0);
        let b = aabb(5.0, 5.0, 15.0, 15.0);
        let c = aabb(20.0, 20.0, 30.0, 30.0);
        assert_eq!(collides(&a, &b), collides(&b, &a));
        assert!(collides(&a, &b));
        assert_eq!(collides(&a, &c), collides(&c, &a));
        assert!(!collides(&a, &c));
    }

    // ── circle ────────────────────────────────────────────────────────────

    #[test]
    fn circle_inside_aabb_collides() {
        let b = aabb(0.0, 0.0, 100.0, 100.0);
        let c = circle(50.0, 50.0, 5.0);
        assert!(collides(&b, &c));
        assert!(collides(&c, &b));
    }

    #[test]
    fn circles_at_exact_sum_of_radii_collide() {
        let a = circle(0.0, 0.0, 3.0);
        let b = circle(7.0, 0.0, 4.0);
        assert!(collides(&a, &b));
        let c = circle(7.1, 0.0, 4.0);
        assert!(!collides(&a, &c));
    }

    #[test]
    fn circle_near_aabb_corner() {
        let b = aabb(0.0, 0.0, 10.0, 10.0);
        // Diagonal distance from (12, 12) to corner (10, 10) is ~2.83.
        assert!(!collides(&b, &circle(12.0, 12.0, 2.5)));
        assert!(collides(&b, &circle(12.0, 12.0, 3.0)));
    }

    // ── obb / polygon ─────────────────────────────────────────────────────

    fn rotated_box(cx: f32, cy: f32, half: f32, deg: f32) -> Collider {
        let r = deg.to_radians();
        let (s, c) = r.sin_cos();
        Collider::obb(Obb {
            center: Vec2::new(cx, cy),
            axes: [Vec2::new(c * half, s * half), Vec2::new(-s * half, c * half)],
        })
    }

    #[test]
    fn rotated_boxes_overlap_and_separate() {
        let a = rotated_box(0.0, 0.0, 5.0, 45.0);
        let b = rotated_box(6.0, 0.0, 5.0, 0.0);
        assert!(collides(&a, &b));
        assert!(collides(&b, &a));

        let far = rotated_box(20.0, 0.0, 5.0, 30.0);
        assert!(!collides(&a, &far));
    }

    #[test]
    fn diamond_misses_box_in_aabb_overlap_region() {
        // A diamond whose AABB overlaps the box but whose shape does not:
        // the broad phase passes, the SAT narrow phase must reject.
        let diamond = Collider::polygon(vec![
            Vec2::new(10.0, 0.0),
            Vec2::new(20.0, 10.0),
            Vec2::new(10.0, 20.0),
            Vec2::new(0.0, 10.0),
        ]);
        let corner_box = Collider::polygon(vec![
            Vec2::new(0.0, 0.0),
            Vec2::new(3.0, 0.0),
            Vec2::new(3.0, 3.0),
            Vec2::new(0.0, 3.0),
        ]);
        assert!(diamond.aabb.overlaps(corner_box.aabb));
        assert!(!collides(&diamond, &corner_box));
    }

    #[test]
    fn polygon_contains_point() {
        let tri = Collider::polygon(vec![
            Vec2::new(0.0, 0.0),
            Vec2::new(10.0, 0.0),
            Vec2::new(0.0, 10.0),
        ]);
        assert!(contains(&tri, Vec2::new(2.0, 2.0)));
        assert!(contains(&tri, Vec2::new(5.0, 0.0))); // on an edge
        assert!(!contains(&tri, Vec2::new(8.0, 8.0)));
    }

    #[test]
    fn circle_polygon_edge_contact() {
        let tri = Collider::polygon(vec![
            Vec2::new(0.0, 0.0),
            Vec2::new(10.0, 0.0),
            Vec2::new(0.0, 10.0),
        ]);
        assert!(collides(&tri, &circle(5.0, -2.0, 2.0)));
        assert!(!collides(&tri, &circle(5.0, -2.0, 1.5)));
    }
}
