use super::Vec2;

/// Row-major 4×4 matrix, used as a 2D-affine transform.
///
/// The scene graph only ever produces the affine subset (rotation, scale,
/// translation in the XY plane), but the full 4×4 layout is kept because the
/// node uniform uploads the matrix verbatim and the shader multiplies with a
/// row vector, which reads row-major bytes correctly without a transpose.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Mat4(pub [f32; 16]);

impl Mat4 {
    pub const IDENTITY: Mat4 = Mat4([
        1.0, 0.0, 0.0, 0.0, //
        0.0, 1.0, 0.0, 0.0, //
        0.0, 0.0, 1.0, 0.0, //
        0.0, 0.0, 0.0, 1.0,
    ]);

    /// Translation by `v` in the XY plane.
    #[inline]
    pub const fn translation(v: Vec2) -> Mat4 {
        Mat4([
            1.0, 0.0, 0.0, v.x, //
            0.0, 1.0, 0.0, v.y, //
            0.0, 0.0, 1.0, 0.0, //
            0.0, 0.0, 0.0, 1.0,
        ])
    }

    /// Counter-clockwise rotation around Z, in degrees.
    #[inline]
    pub fn rotation_degrees(deg: f32) -> Mat4 {
        let r = deg.to_radians();
        let (s, c) = r.sin_cos();
        Mat4([
            c, -s, 0.0, 0.0, //
            s, c, 0.0, 0.0, //
            0.0, 0.0, 1.0, 0.0, //
            0.0, 0.0, 0.0, 1.0,
        ])
    }

    /// Non-uniform scale in the XY plane.
    #[inline]
    pub const fn scaling(s: Vec2) -> Mat4 {
        Mat4([
            s.x, 0.0, 0.0, 0.0, //
            0.0, s.y, 0.0, 0.0, //
            0.0, 0.0, 1.0, 0.0, //
            0.0, 0.0, 0.0, 1.0,
        ])
    }

    /// Matrix product `self × rhs` (apply `rhs` first, then `self`).
    pub fn mul(&self, rhs: &Mat4) -> Mat4 {
        let a = &self.0;
        let b = &rhs.0;
        let mut out = [0.0f32; 16];
        for row in 0..4 {
            for col in 0..4 {
                let mut acc = 0.0;
                for k in 0..4 {
                    acc += a[row * 4 + k] * b[k * 4 + col];
                }
                out[row * 4 + col] = acc;
            }
        }
        Mat4(out)
    }

    /// Transforms a point (w = 1) and returns the XY components.
    #[inline]
    pub fn transform_point(&self, p: Vec2) -> Vec2 {
        let m = &self.0;
        Vec2::new(
            m[0] * p.x + m[1] * p.y + m[3],
            m[4] * p.x + m[5] * p.y + m[7],
        )
    }

    /// Transforms a direction (w = 0): rotation and scale only.
    #[inline]
    pub fn transform_vector(&self, v: Vec2) -> Vec2 {
        let m = &self.0;
        Vec2::new(m[0] * v.x + m[1] * v.y, m[4] * v.x + m[5] * v.y)
    }
}

impl Default for Mat4 {
    fn default() -> Self {
        Self::IDENTITY
    }
}
