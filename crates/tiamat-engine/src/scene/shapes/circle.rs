use crate::collision::{Circle, Collider};
use crate::coords::{Mat4, Vec2};
use crate::render::MeshBuffers;

use super::super::node::{Node, NodeRef};
use super::{Shape, write_baked_position};

/// Default ring tessellation.
pub const DEFAULT_SEGMENTS: usize = 32;

/// Filled circle (ellipse under non-uniform size) inscribed in the node's
/// local rect.
pub struct CircleShape {
    segments: usize,
}

impl CircleShape {
    pub fn new(segments: usize) -> CircleShape {
        // A ring needs at least a triangle.
        CircleShape { segments: segments.max(3) }
    }

    pub fn segments(&self) -> usize {
        self.segments
    }

    pub(crate) fn counts(&self) -> (usize, usize) {
        (self.segments, self.segments)
    }

    pub(crate) fn write_vertices(
        &self,
        mesh: &mut MeshBuffers,
        v0: usize,
        i0: usize,
        size: Vec2,
        bake: Option<&Mat4>,
    ) {
        let n = self.segments;
        let center = size * 0.5;
        let radius = size * 0.5;

        for k in 0..n {
            let angle = (k as f32) * core::f32::consts::TAU / (n as f32);
            let p = center + Vec2::new(angle.cos() * radius.x, angle.sin() * radius.y);
            write_baked_position(mesh, v0 + k, p, bake);
        }

        // Zigzag the ring into a strip: 0, 1, n-1, 2, n-2, … — convex, so
        // every triangle is interior.
        let mut lo = 1usize;
        let mut hi = n - 1;
        let mut from_lo = true;
        mesh.write_index(i0, v0 as u16);
        for k in 1..n {
            let ring = if from_lo {
                let v = lo;
                lo += 1;
                v
            } else {
                let v = hi;
                hi -= 1;
                v
            };
            from_lo = !from_lo;
            mesh.write_index(i0 + k, (v0 + ring) as u16);
        }
    }

    pub(crate) fn build_collider(&self, world: &Mat4, size: Vec2) -> Collider {
        let center = world.transform_point(size * 0.5);
        // Non-uniform world scale turns the circle into an ellipse; the
        // collider keeps the larger world-space semi-axis.
        let rx = world.transform_vector(Vec2::new(size.x * 0.5, 0.0)).length();
        let ry = world.transform_vector(Vec2::new(0.0, size.y * 0.5)).length();
        Collider::circle(Circle { center, radius: rx.max(ry) })
    }
}

impl Node {
    /// Creates a circle node with the default tessellation.
    pub fn new_circle(name: impl Into<String>, diameter: f32) -> NodeRef {
        let node = Node::with_shape(name, Shape::Circle(CircleShape::new(DEFAULT_SEGMENTS)));
        node.borrow_mut().set_size(Vec2::splat(diameter));
        node
    }

    /// Creates a circle node with explicit tessellation.
    pub fn new_circle_with_segments(
        name: impl Into<String>,
        diameter: f32,
        segments: usize,
    ) -> NodeRef {
        let node = Node::with_shape(name, Shape::Circle(CircleShape::new(segments)));
        node.borrow_mut().set_size(Vec2::splat(diameter));
        node
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::DirtyMask;

    #[test]
    fn ring_points_lie_on_the_circle() {
        let node = Node::new_circle_with_segments("dot", 10.0, 8);
        let mut n = node.borrow_mut();
        n.update_frame(0.0, None, DirtyMask::CLEAN);

        let center = Vec2::new(5.0, 5.0);
        for p in n.mesh().positions() {
            let d = (Vec2::new(p[0], p[1]) - center).length();
            assert!((d - 5.0).abs() < 1e-4, "point {p:?} not on radius");
        }
    }

    #[test]
    fn zigzag_strip_covers_the_ring() {
        let node = Node::new_circle_with_segments("dot", 10.0, 6);
        let mut n = node.borrow_mut();
        n.update_frame(0.0, None, DirtyMask::CLEAN);
        assert_eq!(n.mesh().indices(), &[0, 1, 5, 2, 4, 3]);
    }

    #[test]
    fn collider_is_a_circle_at_world_center() {
        let node = Node::new_circle("dot", 10.0);
        let mut n = node.borrow_mut();
        n.set_position(Vec2::new(100.0, 100.0));
        n.set_anchor(Vec2::new(0.5, 0.5));
        n.update_frame(0.0, None, DirtyMask::CLEAN);

        let collider = n.collider().clone();
        assert!(crate::collision::contains(&collider, Vec2::new(100.0, 104.9)));
        assert!(!crate::collision::contains(&collider, Vec2::new(100.0, 105.1)));
    }
}
