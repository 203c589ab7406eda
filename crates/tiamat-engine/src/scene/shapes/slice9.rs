use crate::coords::{Mat4, Rect, Vec2};
use crate::render::MeshBuffers;
use crate::texture::TextureRef;

use super::super::node::{Node, NodeRef};
use super::{Shape, write_baked_position, write_strip_bridge};

/// Nine-patch sprite: a 4×4 vertex grid over the node's local rect.
///
/// The texel window splits into a 3×3 cell grid around the declared center
/// rect. Corners keep their texel size (in logical pixels), edges stretch
/// along one axis, the center stretches both. Interior seams land exactly on
/// the center-rect boundaries in both position and texture space — any
/// mismatch between the two bleeds neighboring texels across the seam.
pub struct Slice9 {
    /// Center rect in texels, relative to the window origin.
    center: Rect,
    /// Texel sub-rect into the texture; `None` is the whole texture.
    window: Option<Rect>,
}

/// 4×4 grid; 3 strip bands of 8 indices joined by 2 degenerate bridges.
pub(crate) fn counts() -> (usize, usize) {
    (16, 28)
}

impl Slice9 {
    pub fn new(center: Rect) -> Slice9 {
        Slice9 { center, window: None }
    }

    pub(crate) fn set_window(&mut self, window: Option<Rect>) {
        self.window = window;
    }

    pub(crate) fn center(&self) -> Rect {
        self.center
    }

    pub(crate) fn window(&self) -> Option<Rect> {
        self.window
    }

    /// The effective texel window: explicit, else the whole texture, else
    /// (textureless) the center rect with symmetric margins.
    fn effective_window(&self, mesh: &MeshBuffers) -> Rect {
        if let Some(w) = self.window {
            return w;
        }
        match mesh.texture(0) {
            Some(t) => Rect::new(0.0, 0.0, t.width() as f32, t.height() as f32),
            None => Rect::new(
                0.0,
                0.0,
                self.center.origin.x * 2.0 + self.center.size.x,
                self.center.origin.y * 2.0 + self.center.size.y,
            ),
        }
    }

    /// Margins `(leading, trailing)` in texels along one axis, clamped so a
    /// malformed center rect degrades to safe values.
    fn margins(window_extent: f32, center_origin: f32, center_extent: f32) -> (f32, f32) {
        let leading = center_origin.max(0.0);
        let trailing = (window_extent - center_origin - center_extent).max(0.0);
        (leading, trailing)
    }

    /// Seam coordinates along one axis of the final rect: `[0, l, ext - t,
    /// ext]`, shrunk proportionally when the rect is smaller than the two
    /// fixed margins combined.
    fn seams(extent: f32, leading: f32, trailing: f32) -> [f32; 4] {
        let (mut l, mut t) = (leading, trailing);
        let fixed = l + t;
        if fixed > extent && fixed > 0.0 {
            let shrink = extent / fixed;
            l *= shrink;
            t *= shrink;
        }
        [0.0, l, extent - t, extent]
    }

    pub(crate) fn write_vertices(
        &self,
        mesh: &mut MeshBuffers,
        v0: usize,
        i0: usize,
        size: Vec2,
        bake: Option<&Mat4>,
    ) {
        let window = self.effective_window(mesh);
        let density = mesh.texture(0).map(|t| t.density()).unwrap_or(1.0).max(f32::EPSILON);

        let (ml, mr) = Self::margins(window.size.x, self.center.origin.x, self.center.size.x);
        let (mt, mb) = Self::margins(window.size.y, self.center.origin.y, self.center.size.y);

        // Margins are fixed-size on screen: texels to logical pixels.
        let xs = Self::seams(size.x, ml / density, mr / density);
        let ys = Self::seams(size.y, mt / density, mb / density);

        for row in 0..4 {
            for col in 0..4 {
                write_baked_position(
                    mesh,
                    v0 + row * 4 + col,
                    Vec2::new(xs[col], ys[row]),
                    bake,
                );
            }
        }

        // Three horizontal bands, each an 8-index strip alternating between
        // its upper and lower vertex rows, bridged by degenerate pairs.
        let grid = |row: usize, col: usize| (v0 + row * 4 + col) as u16;
        let mut cursor = i0;
        for row in 0..3 {
            if row > 0 {
                write_strip_bridge(mesh, &mut cursor, grid(row, 3), grid(row, 0));
            }
            for col in 0..4 {
                mesh.write_index(cursor, grid(row, col));
                mesh.write_index(cursor + 1, grid(row + 1, col));
                cursor += 2;
            }
        }
    }

    pub(crate) fn write_tex_coords(&self, mesh: &mut MeshBuffers, v0: usize) {
        let Some(tex) = mesh.texture(0) else { return };
        let (tw, th, flipped) = (tex.width() as f32, tex.height() as f32, tex.flipped());
        if tw <= 0.0 || th <= 0.0 {
            return;
        }

        let window = self.effective_window(mesh);
        let (ml, mr) = Self::margins(window.size.x, self.center.origin.x, self.center.size.x);
        let (mt, mb) = Self::margins(window.size.y, self.center.origin.y, self.center.size.y);

        let us = [
            window.origin.x / tw,
            (window.origin.x + ml) / tw,
            (window.origin.x + window.size.x - mr) / tw,
            (window.origin.x + window.size.x) / tw,
        ];
        let mut vs = [
            window.origin.y / th,
            (window.origin.y + mt) / th,
            (window.origin.y + window.size.y - mb) / th,
            (window.origin.y + window.size.y) / th,
        ];
        if flipped {
            for v in vs.iter_mut() {
                *v = 1.0 - *v;
            }
        }

        for row in 0..4 {
            for col in 0..4 {
                mesh.write_tex_coord(0, v0 + row * 4 + col, [us[col], vs[row]]);
            }
        }
    }
}

impl Node {
    /// Creates a nine-patch node. `center` is the stretchable rect in
    /// texels, relative to the texture (or window) origin. Node size
    /// defaults to the texture size in logical pixels.
    pub fn new_slice9(
        name: impl Into<String>,
        texture: Option<TextureRef>,
        center: Rect,
    ) -> NodeRef {
        let size = texture
            .as_ref()
            .map(|t| Vec2::new(t.width() as f32 / t.density(), t.height() as f32 / t.density()))
            .unwrap_or(Vec2::zero());

        let node = Node::with_shape(name, Shape::Slice9(Slice9::new(center)));
        {
            let mut n = node.borrow_mut();
            n.set_size(size);
            n.mesh_mut().enable_tex_coords(0);
            n.mesh_mut().set_texture(0, texture);
        }
        node
    }

    /// Restricts a nine-patch to a texel window (atlas frame). No-op on
    /// other node kinds.
    pub fn set_slice9_window(&mut self, window: Option<Rect>) {
        match self.shape_mut() {
            Shape::Slice9(s) => s.set_window(window),
            _ => {
                log::warn!("set_slice9_window on a non-nine-patch node");
                return;
            }
        }
        self.mark_vertex_dirty();
        self.mark_tex_coords_dirty();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::DirtyMask;
    use crate::texture::Texture;
    use std::rc::Rc;

    fn panel_node(size: Vec2) -> NodeRef {
        // 30×30 texture with a 10×10 center rect at (10, 10).
        let tex = Rc::new(Texture::new("panel.png", 30, 30));
        let node = Node::new_slice9("panel", Some(tex), Rect::new(10.0, 10.0, 10.0, 10.0));
        node.borrow_mut().set_size(size);
        node
    }

    #[test]
    fn interior_seams_sit_on_the_center_rect_boundaries() {
        let node = panel_node(Vec2::new(60.0, 60.0));
        let mut n = node.borrow_mut();
        n.update_frame(0.0, None, DirtyMask::CLEAN);

        // Corners stay 10 px; seams at exactly 10 and 50 on both axes.
        let p = n.mesh().positions();
        for row in 0..4 {
            assert_eq!(p[row * 4], [0.0, [0.0f32, 10.0, 50.0, 60.0][row]]);
            assert_eq!(p[row * 4 + 1][0], 10.0);
            assert_eq!(p[row * 4 + 2][0], 50.0);
            assert_eq!(p[row * 4 + 3][0], 60.0);
        }
    }

    #[test]
    fn seam_texcoords_land_on_center_texel_boundaries() {
        let node = panel_node(Vec2::new(60.0, 60.0));
        let mut n = node.borrow_mut();
        n.update_frame(0.0, None, DirtyMask::CLEAN);

        let uv = n.mesh().tex_coords(0);
        let expected = [0.0, 10.0 / 30.0, 20.0 / 30.0, 1.0];
        for row in 0..4 {
            for col in 0..4 {
                let got = uv[row * 4 + col];
                assert!((got[0] - expected[col]).abs() < 1e-6);
                assert!((got[1] - expected[row]).abs() < 1e-6);
            }
        }
    }

    #[test]
    fn strip_bands_bridge_with_degenerate_pairs() {
        let node = panel_node(Vec2::new(60.0, 60.0));
        let mut n = node.borrow_mut();
        n.update_frame(0.0, None, DirtyMask::CLEAN);

        let idx = n.mesh().indices();
        assert_eq!(idx.len(), 28);
        // Band 0: rows 0/1 interleaved.
        assert_eq!(&idx[..8], &[0, 4, 1, 5, 2, 6, 3, 7]);
        // Bridge: repeat 7, then band 1's first index 4.
        assert_eq!(&idx[8..10], &[7, 4]);
        assert_eq!(&idx[10..18], &[4, 8, 5, 9, 6, 10, 7, 11]);
        assert_eq!(&idx[18..20], &[11, 8]);
    }

    #[test]
    fn undersized_rect_shrinks_margins_proportionally() {
        // 10+10 fixed margins into a 10 px extent: each margin becomes 5.
        let node = panel_node(Vec2::new(10.0, 60.0));
        let mut n = node.borrow_mut();
        n.update_frame(0.0, None, DirtyMask::CLEAN);

        let p = n.mesh().positions();
        assert_eq!(p[1][0], 5.0);
        assert_eq!(p[2][0], 5.0);
        assert_eq!(p[3][0], 10.0);
    }
}
