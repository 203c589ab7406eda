use crate::coords::{Rect, Vec2};
use crate::render::MeshBuffers;
use crate::texture::TextureRef;

use super::super::node::{Node, NodeRef};
use super::{Shape, window_uv, write_quad_uv};

/// Textured quad.
///
/// The sprite maps a texel window of the bound texture (defaulting to the
/// whole texture) onto the node's local rect. A secondary texture, when
/// bound, is sampled with mirrored coordinates and modulates the primary —
/// the multi-texture path used for masks and overlays.
pub struct Sprite {
    /// Texel sub-rect into the texture; `None` maps the whole texture.
    window: Option<Rect>,
}

impl Sprite {
    pub fn new() -> Sprite {
        Sprite { window: None }
    }

    pub(crate) fn set_window(&mut self, window: Option<Rect>) {
        self.window = window;
    }

    pub(crate) fn window(&self) -> Option<Rect> {
        self.window
    }

    pub(crate) fn write_tex_coords(&self, mesh: &mut MeshBuffers, v0: usize) {
        let Some(tex) = mesh.texture(0) else { return };
        let (tw, th, flipped) = (tex.width() as f32, tex.height() as f32, tex.flipped());
        if tw <= 0.0 || th <= 0.0 {
            return;
        }

        let window = self.window.unwrap_or(Rect::new(0.0, 0.0, tw, th));
        let (u, v) = window_uv(window, tw, th, flipped);
        write_quad_uv(mesh, 0, v0, u, v);

        if let Some(secondary) = mesh.texture(1) {
            let flip1 = secondary.flipped();
            let v1 = if flip1 != flipped { [1.0 - v[0], 1.0 - v[1]] } else { v };
            write_quad_uv(mesh, 1, v0, u, v1);
        }
    }
}

impl Default for Sprite {
    fn default() -> Self {
        Self::new()
    }
}

impl Node {
    /// Creates a sprite node. Node size defaults to the texture size in
    /// logical pixels (texels / density).
    pub fn new_sprite(name: impl Into<String>, texture: Option<TextureRef>) -> NodeRef {
        let size = texture
            .as_ref()
            .map(|t| Vec2::new(t.width() as f32 / t.density(), t.height() as f32 / t.density()))
            .unwrap_or(Vec2::zero());

        let node = Node::with_shape(name, Shape::Sprite(Sprite::new()));
        {
            let mut n = node.borrow_mut();
            n.set_size(size);
            n.mesh_mut().enable_tex_coords(0);
            n.mesh_mut().enable_tex_coords(1);
            n.mesh_mut().set_texture(0, texture);
        }
        node
    }

    /// Restricts the sprite to a texel window of its texture (atlas frame).
    /// No-op on non-sprite nodes.
    pub fn set_sprite_window(&mut self, window: Option<Rect>) {
        match self.shape_mut() {
            Shape::Sprite(s) => s.set_window(window),
            _ => {
                log::warn!("set_sprite_window on a non-sprite node");
                return;
            }
        }
        self.mark_tex_coords_dirty();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::DirtyMask;
    use crate::texture::Texture;
    use std::rc::Rc;

    fn tex(w: u32, h: u32, flipped: bool) -> TextureRef {
        Rc::new(Texture::new("atlas.png", w, h).with_flipped(flipped))
    }

    #[test]
    fn whole_texture_maps_to_unit_uv() {
        let node = Node::new_sprite("s", Some(tex(64, 64, false)));
        let mut n = node.borrow_mut();
        n.update_frame(0.0, None, DirtyMask::CLEAN);

        assert_eq!(n.mesh().tex_coords(0)[0], [0.0, 0.0]);
        assert_eq!(n.mesh().tex_coords(0)[3], [1.0, 1.0]);
        assert_eq!(n.size(), Vec2::new(64.0, 64.0));
    }

    #[test]
    fn atlas_window_maps_the_sub_rect() {
        let node = Node::new_sprite("s", Some(tex(64, 64, false)));
        let mut n = node.borrow_mut();
        n.set_sprite_window(Some(Rect::new(16.0, 32.0, 16.0, 16.0)));
        n.update_frame(0.0, None, DirtyMask::CLEAN);

        assert_eq!(n.mesh().tex_coords(0)[0], [0.25, 0.5]);
        assert_eq!(n.mesh().tex_coords(0)[3], [0.5, 0.75]);
    }

    #[test]
    fn flipped_texture_inverts_v() {
        let node = Node::new_sprite("s", Some(tex(64, 64, true)));
        let mut n = node.borrow_mut();
        n.update_frame(0.0, None, DirtyMask::CLEAN);

        assert_eq!(n.mesh().tex_coords(0)[0], [0.0, 1.0]);
        assert_eq!(n.mesh().tex_coords(0)[3], [1.0, 0.0]);
    }

    #[test]
    fn density_scales_default_node_size() {
        let t = Rc::new(Texture::new("hud@2x.png", 128, 64).with_density(2.0));
        let node = Node::new_sprite("s", Some(t));
        assert_eq!(node.borrow().size(), Vec2::new(64.0, 32.0));
    }
}
