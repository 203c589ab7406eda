use crate::coords::{Mat4, Vec2};
use crate::paint::Color;

/// Offset of the RGBA tuple inside the world buffer.
pub const WORLD_COLOR_OFFSET: usize = 16;

/// Per-node 2D affine state and its composed world buffer.
///
/// The world buffer is 20 floats: the row-major 4×4 world matrix followed by
/// the RGBA color. Packing them together means matrix and color share one
/// "dirty or not" decision per consumer — the renderer uploads the whole
/// block as the node uniform.
///
/// Recomputation is a pure function of the fields plus the optional parent
/// matrix; there is no hidden state. A `Transform` belongs to exactly one
/// node and is never shared.
#[derive(Debug, Clone)]
pub struct Transform {
    /// Pivot in unit space: (0,0) is the top-left corner of the local rect,
    /// (1,1) the bottom-right. Rotation and scale pivot around it, and it is
    /// the point placed at `position` in parent space.
    anchor: Vec2,
    position: Vec2,
    scale: Vec2,
    /// Degrees, counter-clockwise.
    rotation: f32,
    size: Vec2,
    color: Color,

    world: [f32; 20],
}

impl Transform {
    pub fn new() -> Transform {
        let mut t = Transform {
            anchor: Vec2::zero(),
            position: Vec2::zero(),
            scale: Vec2::splat(1.0),
            rotation: 0.0,
            size: Vec2::zero(),
            color: Color::WHITE,
            world: [0.0; 20],
        };
        t.update_matrix(None);
        t.update_color();
        t
    }

    // ── field access ──────────────────────────────────────────────────────

    #[inline]
    pub fn anchor(&self) -> Vec2 {
        self.anchor
    }

    #[inline]
    pub fn position(&self) -> Vec2 {
        self.position
    }

    #[inline]
    pub fn scale(&self) -> Vec2 {
        self.scale
    }

    #[inline]
    pub fn rotation(&self) -> f32 {
        self.rotation
    }

    #[inline]
    pub fn size(&self) -> Vec2 {
        self.size
    }

    #[inline]
    pub fn color(&self) -> Color {
        self.color
    }

    #[inline]
    pub fn set_anchor(&mut self, anchor: Vec2) {
        self.anchor = anchor;
    }

    #[inline]
    pub fn set_position(&mut self, position: Vec2) {
        self.position = position;
    }

    #[inline]
    pub fn set_scale(&mut self, scale: Vec2) {
        self.scale = scale;
    }

    #[inline]
    pub fn set_rotation(&mut self, degrees: f32) {
        self.rotation = degrees;
    }

    #[inline]
    pub fn set_size(&mut self, size: Vec2) {
        self.size = size;
    }

    #[inline]
    pub fn set_color(&mut self, color: Color) {
        self.color = color;
    }

    // ── composition ───────────────────────────────────────────────────────

    /// The node's matrix in parent space: translate to `position`, rotate,
    /// scale, with the anchor point as pivot.
    pub fn local_matrix(&self) -> Mat4 {
        let anchor_px = self.anchor * self.size;
        Mat4::translation(self.position)
            .mul(&Mat4::rotation_degrees(self.rotation))
            .mul(&Mat4::scaling(self.scale))
            .mul(&Mat4::translation(Vec2::zero() - anchor_px))
    }

    /// Recomputes `world[0..16]` from the fields and the parent matrix.
    ///
    /// Guarantee: the anchor point of the local rect lands exactly on
    /// `position` in parent space, for every rotation and scale.
    pub fn update_matrix(&mut self, parent: Option<&Mat4>) {
        let local = self.local_matrix();
        let world = match parent {
            Some(p) => p.mul(&local),
            None => local,
        };
        self.world[..16].copy_from_slice(&world.0);
    }

    /// Writes the RGBA tuple into `world[16..20]`.
    pub fn update_color(&mut self) {
        self.world[WORLD_COLOR_OFFSET..].copy_from_slice(&self.color.to_array());
    }

    /// The composed world matrix, as last written by [`update_matrix`].
    pub fn world_matrix(&self) -> Mat4 {
        let mut m = [0.0f32; 16];
        m.copy_from_slice(&self.world[..16]);
        Mat4(m)
    }

    /// The full 20-float world buffer (matrix + color) for uniform upload.
    #[inline]
    pub fn world_data(&self) -> &[f32; 20] {
        &self.world
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_vec_eq(a: Vec2, b: Vec2) {
        assert!((a.x - b.x).abs() < 1e-3 && (a.y - b.y).abs() < 1e-3, "{a:?} != {b:?}");
    }

    /// For any (position, anchor, scale, rotation, size), the world matrix
    /// must map the anchor point of the local rect exactly to `position`.
    #[test]
    fn anchor_lands_on_position_for_all_rotations_and_scales() {
        let cases = [
            (Vec2::new(0.5, 0.5), 0.0, Vec2::new(1.0, 1.0)),
            (Vec2::new(0.0, 0.0), 37.0, Vec2::new(2.0, 0.5)),
            (Vec2::new(1.0, 1.0), -120.0, Vec2::new(0.25, 3.0)),
            (Vec2::new(0.3, 0.8), 275.0, Vec2::new(1.5, 1.5)),
        ];

        for (anchor, rotation, scale) in cases {
            let mut t = Transform::new();
            t.set_position(Vec2::new(40.0, -17.0));
            t.set_anchor(anchor);
            t.set_rotation(rotation);
            t.set_scale(scale);
            t.set_size(Vec2::new(64.0, 32.0));
            t.update_matrix(None);

            let anchor_px = anchor * Vec2::new(64.0, 32.0);
            assert_vec_eq(t.world_matrix().transform_point(anchor_px), Vec2::new(40.0, -17.0));
        }
    }

    #[test]
    fn parent_matrix_composes_on_the_left() {
        let mut parent = Transform::new();
        parent.set_position(Vec2::new(100.0, 50.0));
        parent.update_matrix(None);

        let mut child = Transform::new();
        child.set_position(Vec2::new(10.0, 5.0));
        child.update_matrix(Some(&parent.world_matrix()));

        assert_vec_eq(child.world_matrix().transform_point(Vec2::zero()), Vec2::new(110.0, 55.0));
    }

    #[test]
    fn rotation_pivots_around_anchor() {
        let mut t = Transform::new();
        t.set_size(Vec2::new(10.0, 10.0));
        t.set_anchor(Vec2::new(0.5, 0.5));
        t.set_position(Vec2::new(0.0, 0.0));
        t.set_rotation(180.0);
        t.update_matrix(None);

        // The corner opposite the center lands mirrored through it.
        assert_vec_eq(t.world_matrix().transform_point(Vec2::new(0.0, 0.0)), Vec2::new(5.0, 5.0));
        assert_vec_eq(t.world_matrix().transform_point(Vec2::new(10.0, 10.0)), Vec2::new(-5.0, -5.0));
    }

    #[test]
    fn color_occupies_the_tail_of_the_world_buffer() {
        let mut t = Transform::new();
        t.set_color(Color::new(0.1, 0.2, 0.3, 0.4));
        t.update_color();
        assert_eq!(&t.world_data()[16..], &[0.1, 0.2, 0.3, 0.4]);
    }
}
