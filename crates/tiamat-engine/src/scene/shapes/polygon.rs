use crate::collision::{Aabb, Collider};
use crate::coords::{Mat4, Vec2};
use crate::render::MeshBuffers;

use super::super::node::{Node, NodeRef};
use super::{Shape, write_baked_position};

/// Arbitrary polygon leaf.
///
/// Points are consumed in triangle-strip order. The authored points define
/// the shape's proportions only: the bounding box of the raw points is
/// derived from their min/max, and the runtime `size` rescales that box —
/// authored shape and runtime size stay decoupled.
pub struct Polygon {
    points: Vec<Vec2>,
    bounds_min: Vec2,
    bounds_extent: Vec2,
}

impl Polygon {
    pub fn new(points: Vec<Vec2>) -> Polygon {
        let bounds = Aabb::from_points(&points);
        Polygon {
            bounds_min: bounds.min,
            bounds_extent: bounds.max - bounds.min,
            points,
        }
    }

    /// Size of the raw-point bounding box (factory default for node size).
    pub fn raw_size(&self) -> Vec2 {
        self.bounds_extent
    }

    /// The authored points, unscaled.
    pub fn points(&self) -> &[Vec2] {
        &self.points
    }

    pub(crate) fn counts(&self) -> (usize, usize) {
        (self.points.len(), self.points.len())
    }

    /// Authored point normalized into the unit box, then scaled to `size`.
    fn local_point(&self, k: usize, size: Vec2) -> Vec2 {
        let p = self.points[k] - self.bounds_min;
        let nx = if self.bounds_extent.x > 0.0 { p.x / self.bounds_extent.x } else { 0.0 };
        let ny = if self.bounds_extent.y > 0.0 { p.y / self.bounds_extent.y } else { 0.0 };
        Vec2::new(nx * size.x, ny * size.y)
    }

    pub(crate) fn write_vertices(
        &self,
        mesh: &mut MeshBuffers,
        v0: usize,
        i0: usize,
        size: Vec2,
        bake: Option<&Mat4>,
    ) {
        for k in 0..self.points.len() {
            write_baked_position(mesh, v0 + k, self.local_point(k, size), bake);
            mesh.write_index(i0 + k, (v0 + k) as u16);
        }
    }

    pub(crate) fn build_collider(&self, world: &Mat4, size: Vec2) -> Collider {
        let points = (0..self.points.len())
            .map(|k| world.transform_point(self.local_point(k, size)))
            .collect();
        Collider::polygon(points)
    }
}

impl Node {
    /// Creates a polygon node; node size defaults to the raw-point bounds.
    pub fn new_polygon(name: impl Into<String>, points: Vec<Vec2>) -> NodeRef {
        let polygon = Polygon::new(points);
        let size = polygon.raw_size();
        let node = Node::with_shape(name, Shape::Polygon(polygon));
        node.borrow_mut().set_size(size);
        node
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::DirtyMask;

    #[test]
    fn raw_points_rescale_to_node_size() {
        // Authored at 2×2, rendered at 10×20.
        let node = Node::new_polygon(
            "tri",
            vec![Vec2::new(0.0, 0.0), Vec2::new(2.0, 0.0), Vec2::new(0.0, 2.0)],
        );
        let mut n = node.borrow_mut();
        n.set_size(Vec2::new(10.0, 20.0));
        n.update_frame(0.0, None, DirtyMask::CLEAN);

        assert_eq!(n.mesh().positions(), &[[0.0, 0.0], [10.0, 0.0], [0.0, 20.0]]);
        assert_eq!(n.mesh().indices(), &[0, 1, 2]);
    }

    #[test]
    fn factory_defaults_size_to_raw_bounds() {
        let node = Node::new_polygon(
            "quad",
            vec![
                Vec2::new(-1.0, -1.0),
                Vec2::new(3.0, -1.0),
                Vec2::new(-1.0, 5.0),
                Vec2::new(3.0, 5.0),
            ],
        );
        assert_eq!(node.borrow().size(), Vec2::new(4.0, 6.0));
    }
}
