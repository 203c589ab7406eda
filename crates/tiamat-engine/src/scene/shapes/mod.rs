//! Leaf geometry generators.
//!
//! The entity hierarchy is a closed set of geometry kinds behind one enum;
//! each kind lives in its own file and implements the same contract:
//! - `counts`: declared vertex/index counts
//! - `write_vertices`: positions + triangle-strip indices at the given
//!   cursors, local-space or pre-multiplied by an accumulated matrix when a
//!   group bakes its subtree into one buffer
//! - `write_tex_coords`: atlas-window mapping, honoring the texture's
//!   vertical-flip orientation
//! - `build_collider`: shape-specific collision geometry from the current
//!   world matrix
//!
//! Node factories for each kind live beside the kind (`impl Node` blocks in
//! the shape files).

mod circle;
mod polygon;
mod rect;
mod sheet;
mod slice9;
mod sprite;

pub use circle::CircleShape;
pub use polygon::Polygon;
pub use rect::RectShape;
pub use sheet::{PlayMode, Sheet};
pub use slice9::Slice9;
pub use sprite::Sprite;

use crate::collision::{Collider, Obb};
use crate::coords::{Mat4, Vec2};
use crate::render::MeshBuffers;

use super::group::Group;

/// Geometry kind of a node.
pub enum Shape {
    Group(Group),
    Polygon(Polygon),
    Rect(RectShape),
    Circle(CircleShape),
    Sprite(Sprite),
    Slice9(Slice9),
    Sheet(Sheet),
}

impl Shape {
    /// Declared `(vertex, index)` counts. Groups own no geometry of their
    /// own unless baked, which is handled by the bake pass.
    pub fn counts(&self) -> (usize, usize) {
        match self {
            Shape::Group(_) => (0, 0),
            Shape::Polygon(p) => p.counts(),
            Shape::Rect(_) | Shape::Sprite(_) | Shape::Sheet(_) => (4, 4),
            Shape::Circle(c) => c.counts(),
            Shape::Slice9(_) => slice9::counts(),
        }
    }

    /// Writes positions at vertex cursor `v0` and strip indices at index
    /// cursor `i0`. Index values are offset by `v0` so stitched nodes can
    /// share one buffer. `bake` pre-multiplies positions by the accumulated
    /// matrix.
    ///
    /// Precondition: the mesh counts cover `v0`/`i0` plus this shape's
    /// counts (callers recompute counts before rebinding).
    pub(crate) fn write_vertices(
        &self,
        mesh: &mut MeshBuffers,
        v0: usize,
        i0: usize,
        size: Vec2,
        bake: Option<&Mat4>,
    ) {
        match self {
            Shape::Group(_) => {}
            Shape::Polygon(p) => p.write_vertices(mesh, v0, i0, size, bake),
            Shape::Rect(_) | Shape::Sprite(_) | Shape::Sheet(_) => {
                write_quad(mesh, v0, i0, size, bake)
            }
            Shape::Circle(c) => c.write_vertices(mesh, v0, i0, size, bake),
            Shape::Slice9(s) => s.write_vertices(mesh, v0, i0, size, bake),
        }
    }

    /// Writes this node's texture-coordinate layout at vertex cursor `v0`.
    pub(crate) fn write_tex_coords(&self, mesh: &mut MeshBuffers, v0: usize) {
        match self {
            Shape::Sprite(s) => s.write_tex_coords(mesh, v0),
            Shape::Slice9(s) => s.write_tex_coords(mesh, v0),
            Shape::Sheet(s) => s.write_tex_coords(mesh, v0),
            _ => {}
        }
    }

    /// Builds the collision geometry for the current world transform.
    pub(crate) fn build_collider(&self, world: &Mat4, size: Vec2) -> Collider {
        match self {
            Shape::Circle(c) => c.build_collider(world, size),
            Shape::Polygon(p) => p.build_collider(world, size),
            // Groups and every rect-shaped leaf share the oriented-box
            // collider over the local rect.
            _ => rect_collider(world, size),
        }
    }

    #[inline]
    pub fn is_group(&self) -> bool {
        matches!(self, Shape::Group(_))
    }

    pub fn as_group(&self) -> Option<&Group> {
        match self {
            Shape::Group(g) => Some(g),
            _ => None,
        }
    }

    pub fn as_group_mut(&mut self) -> Option<&mut Group> {
        match self {
            Shape::Group(g) => Some(g),
            _ => None,
        }
    }
}

// ── shared helpers ────────────────────────────────────────────────────────

/// Writes one position, optionally baked through `bake`.
#[inline]
pub(crate) fn write_baked_position(
    mesh: &mut MeshBuffers,
    i: usize,
    p: Vec2,
    bake: Option<&Mat4>,
) {
    let p = match bake {
        Some(m) => m.transform_point(p),
        None => p,
    };
    mesh.write_position(i, p);
}

/// Quad in strip order: top-left, bottom-left, top-right, bottom-right.
/// Texcoord layouts must use the same order.
pub(crate) fn write_quad(
    mesh: &mut MeshBuffers,
    v0: usize,
    i0: usize,
    size: Vec2,
    bake: Option<&Mat4>,
) {
    let corners = [
        Vec2::new(0.0, 0.0),
        Vec2::new(0.0, size.y),
        Vec2::new(size.x, 0.0),
        Vec2::new(size.x, size.y),
    ];
    for (k, &c) in corners.iter().enumerate() {
        write_baked_position(mesh, v0 + k, c, bake);
        mesh.write_index(i0 + k, (v0 + k) as u16);
    }
}

/// Quad texcoords matching [`write_quad`] order, for a `[u0, u1] × [v_top,
/// v_bot]` window.
pub(crate) fn write_quad_uv(
    mesh: &mut MeshBuffers,
    set: usize,
    v0: usize,
    u: [f32; 2],
    v: [f32; 2],
) {
    mesh.write_tex_coord(set, v0, [u[0], v[0]]);
    mesh.write_tex_coord(set, v0 + 1, [u[0], v[1]]);
    mesh.write_tex_coord(set, v0 + 2, [u[1], v[0]]);
    mesh.write_tex_coord(set, v0 + 3, [u[1], v[1]]);
}

/// Writes the degenerate pair that stitches a new strip onto the previous
/// one: repeat the previous strip's last index, then the new strip's first.
/// Advances the index cursor.
pub(crate) fn write_strip_bridge(mesh: &mut MeshBuffers, i: &mut usize, last: u16, first: u16) {
    mesh.write_index(*i, last);
    mesh.write_index(*i + 1, first);
    *i += 2;
}

/// Oriented-box collider for the node's local rect under `world`.
pub(crate) fn rect_collider(world: &Mat4, size: Vec2) -> Collider {
    let c0 = world.transform_point(Vec2::new(0.0, 0.0));
    let c1 = world.transform_point(Vec2::new(size.x, 0.0));
    let c3 = world.transform_point(Vec2::new(0.0, size.y));
    let center = world.transform_point(size * 0.5);
    Collider::obb(Obb {
        center,
        axes: [(c1 - c0) * 0.5, (c3 - c0) * 0.5],
    })
}

/// Normalizes a texel window to `[u0, u1]` / `[v_top, v_bot]`, compensating
/// for textures stored bottom-up.
pub(crate) fn window_uv(
    window: crate::coords::Rect,
    tex_w: f32,
    tex_h: f32,
    flipped: bool,
) -> ([f32; 2], [f32; 2]) {
    let u0 = window.origin.x / tex_w;
    let u1 = (window.origin.x + window.size.x) / tex_w;
    let mut vt = window.origin.y / tex_h;
    let mut vb = (window.origin.y + window.size.y) / tex_h;
    if flipped {
        vt = 1.0 - vt;
        vb = 1.0 - vb;
    }
    ([u0, u1], [vt, vb])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strip_bridge_repeats_last_then_first() {
        let mut mesh = MeshBuffers::new();
        mesh.set_vertices_num(8);
        mesh.set_indices_num(10);

        // First quad at cursor 0, second at vertex 4 / index 6.
        write_quad(&mut mesh, 0, 0, Vec2::new(1.0, 1.0), None);
        let mut cursor = 4;
        write_strip_bridge(&mut mesh, &mut cursor, 3, 4);
        write_quad(&mut mesh, 4, cursor, Vec2::new(1.0, 1.0), None);

        assert_eq!(mesh.indices(), &[0, 1, 2, 3, 3, 4, 4, 5, 6, 7]);
    }

    #[test]
    fn quad_uses_offset_index_values() {
        let mut mesh = MeshBuffers::new();
        mesh.set_vertices_num(9);
        mesh.set_indices_num(9);
        write_quad(&mut mesh, 5, 5, Vec2::new(2.0, 2.0), None);
        assert_eq!(&mesh.indices()[5..], &[5, 6, 7, 8]);
        assert_eq!(mesh.positions()[8], [2.0, 2.0]);
    }

    #[test]
    fn baked_quad_applies_the_matrix() {
        let mut mesh = MeshBuffers::new();
        mesh.set_vertices_num(4);
        mesh.set_indices_num(4);
        let m = Mat4::translation(Vec2::new(10.0, 20.0));
        write_quad(&mut mesh, 0, 0, Vec2::new(2.0, 2.0), Some(&m));
        assert_eq!(mesh.positions()[0], [10.0, 20.0]);
        assert_eq!(mesh.positions()[3], [12.0, 22.0]);
    }

    #[test]
    fn window_uv_flips_vertically() {
        let w = crate::coords::Rect::new(0.0, 0.0, 16.0, 16.0);
        let (u, v) = window_uv(w, 32.0, 32.0, false);
        assert_eq!(u, [0.0, 0.5]);
        assert_eq!(v, [0.0, 0.5]);

        let (_, v) = window_uv(w, 32.0, 32.0, true);
        assert_eq!(v, [1.0, 0.5]);
    }
}
