use crate::coords::Vec2;
use crate::texture::TextureRef;

use super::renderer::GpuMesh;

/// Number of texture-coordinate sets (and texture bindings) per node.
pub const MAX_TEXTURE_SETS: usize = 2;

/// Pending GPU upload for one attribute array.
///
/// `Full` re-uploads the whole array; `Sub` writes an element range into the
/// existing buffer. Consecutive sub-marks widen into one range rather than
/// accumulating a list — per-frame changes to a single node are almost
/// always contiguous, and one widened write beats many small ones.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub enum Upload {
    #[default]
    None,
    Full,
    Sub {
        offset: usize,
        len: usize,
    },
}

impl Upload {
    #[inline]
    pub fn mark_full(&mut self) {
        *self = Upload::Full;
    }

    pub fn mark_sub(&mut self, offset: usize, len: usize) {
        if len == 0 {
            return;
        }
        *self = match *self {
            Upload::None => Upload::Sub { offset, len },
            Upload::Full => Upload::Full,
            Upload::Sub { offset: o, len: l } => {
                let start = o.min(offset);
                let end = (o + l).max(offset + len);
                Upload::Sub { offset: start, len: end - start }
            }
        };
    }

    #[inline]
    pub fn is_none(self) -> bool {
        self == Upload::None
    }
}

/// Per-attribute upload decisions carried from the update phase to the draw
/// phase.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct UploadPlan {
    pub positions: Upload,
    pub indices: Upload,
    pub colors: Upload,
    pub tex_coords: [Upload; MAX_TEXTURE_SETS],
    pub uniform: bool,
}

impl UploadPlan {
    pub fn clear(&mut self) {
        *self = UploadPlan::default();
    }

    pub fn is_empty(&self) -> bool {
        *self == UploadPlan::default()
    }
}

/// CPU-side vertex data for one node, plus the bookkeeping that decides how
/// it reaches the GPU.
///
/// Invariants:
/// - array lengths always match the declared vertex/index counts; a count
///   change reallocates (never partially resizes) and bumps `generation`,
///   which forces GPU buffer re-creation and a full re-upload
/// - value-only writes leave `generation` alone and record `Sub` uploads, so
///   an animated position or color never re-specifies a buffer
///
/// Index data is a triangle strip. The backing `Vec<u16>` is kept padded to
/// an even length (GPU copies are 4-byte aligned); the pad slot mirrors the
/// last real index, which adds only a degenerate triangle.
pub struct MeshBuffers {
    positions: Vec<[f32; 2]>,
    indices: Vec<u16>,
    index_count: usize,
    colors: Vec<[f32; 4]>,
    has_colors: bool,
    tex_coords: [Vec<[f32; 2]>; MAX_TEXTURE_SETS],
    has_tex_coords: [bool; MAX_TEXTURE_SETS],
    textures: [Option<TextureRef>; MAX_TEXTURE_SETS],
    textures_changed: bool,

    generation: u64,
    plan: UploadPlan,

    pub(crate) gpu: Option<GpuMesh>,
}

impl MeshBuffers {
    pub fn new() -> MeshBuffers {
        MeshBuffers {
            positions: Vec::new(),
            indices: Vec::new(),
            index_count: 0,
            colors: Vec::new(),
            has_colors: false,
            tex_coords: [Vec::new(), Vec::new()],
            has_tex_coords: [false; MAX_TEXTURE_SETS],
            textures: [None, None],
            textures_changed: false,
            generation: 0,
            plan: UploadPlan::default(),
            gpu: None,
        }
    }

    // ── counts ────────────────────────────────────────────────────────────

    #[inline]
    pub fn vertices_num(&self) -> usize {
        self.positions.len()
    }

    #[inline]
    pub fn indices_num(&self) -> usize {
        self.index_count
    }

    /// Declares the vertex count. Returns whether it changed; a change
    /// reallocates every per-vertex array and schedules full re-uploads.
    pub fn set_vertices_num(&mut self, n: usize) -> bool {
        if n == self.positions.len() {
            return false;
        }
        self.positions.resize(n, [0.0; 2]);
        if self.has_colors {
            self.colors.resize(n, [0.0; 4]);
            self.plan.colors.mark_full();
        }
        for set in 0..MAX_TEXTURE_SETS {
            if self.has_tex_coords[set] {
                self.tex_coords[set].resize(n, [0.0; 2]);
                self.plan.tex_coords[set].mark_full();
            }
        }
        self.generation += 1;
        self.plan.positions.mark_full();
        true
    }

    /// Declares the index count. Returns whether it changed.
    pub fn set_indices_num(&mut self, n: usize) -> bool {
        if n == self.index_count {
            return false;
        }
        self.index_count = n;
        self.indices.resize(n + (n & 1), 0);
        self.generation += 1;
        self.plan.indices.mark_full();
        true
    }

    // ── attribute enablement ──────────────────────────────────────────────

    /// Enables the per-vertex color array (used by baked subtrees).
    pub fn enable_vertex_colors(&mut self) {
        if self.has_colors {
            return;
        }
        self.has_colors = true;
        self.colors.resize(self.positions.len(), [0.0; 4]);
        self.generation += 1;
        self.plan.colors.mark_full();
    }

    pub fn enable_tex_coords(&mut self, set: usize) {
        debug_assert!(set < MAX_TEXTURE_SETS);
        if self.has_tex_coords[set] {
            return;
        }
        self.has_tex_coords[set] = true;
        self.tex_coords[set].resize(self.positions.len(), [0.0; 2]);
        self.generation += 1;
        self.plan.tex_coords[set].mark_full();
    }

    #[inline]
    pub fn has_vertex_colors(&self) -> bool {
        self.has_colors
    }

    #[inline]
    pub fn has_tex_coords(&self, set: usize) -> bool {
        self.has_tex_coords[set]
    }

    // ── textures ──────────────────────────────────────────────────────────

    pub fn set_texture(&mut self, set: usize, texture: Option<TextureRef>) {
        debug_assert!(set < MAX_TEXTURE_SETS);
        self.textures[set] = texture;
        self.textures_changed = true;
    }

    #[inline]
    pub fn texture(&self, set: usize) -> Option<&TextureRef> {
        self.textures[set].as_ref()
    }

    pub(crate) fn take_textures_changed(&mut self) -> bool {
        std::mem::replace(&mut self.textures_changed, false)
    }

    // ── element writes ────────────────────────────────────────────────────
    //
    // Writes touch CPU arrays only; callers pair them with a bind mark.
    // Cursors must be recomputed after any count change — writing through a
    // stale cursor is a programming error, caught by the debug assertions.

    #[inline]
    pub fn write_position(&mut self, i: usize, p: Vec2) {
        debug_assert!(i < self.positions.len(), "stale vertex cursor");
        self.positions[i] = [p.x, p.y];
    }

    #[inline]
    pub fn write_index(&mut self, i: usize, v: u16) {
        debug_assert!(i < self.index_count, "stale index cursor");
        self.indices[i] = v;
    }

    #[inline]
    pub fn write_color(&mut self, i: usize, rgba: [f32; 4]) {
        debug_assert!(i < self.colors.len(), "stale color cursor");
        self.colors[i] = rgba;
    }

    #[inline]
    pub fn write_tex_coord(&mut self, set: usize, i: usize, uv: [f32; 2]) {
        debug_assert!(i < self.tex_coords[set].len(), "stale texcoord cursor");
        self.tex_coords[set][i] = uv;
    }

    // ── bind marks (full re-upload) ───────────────────────────────────────

    /// Schedules a full re-upload of positions and indices, used after a
    /// topology change.
    pub fn bind_vertices(&mut self) {
        self.plan.positions.mark_full();
        self.plan.indices.mark_full();
    }

    pub fn bind_vertex_colors(&mut self) {
        self.plan.colors.mark_full();
    }

    pub fn bind_tex_coords(&mut self, set: usize) {
        self.plan.tex_coords[set].mark_full();
    }

    // ── bind marks (partial re-upload) ────────────────────────────────────

    /// Schedules a sub-range position upload: value changes within a
    /// stable-size buffer.
    pub fn bind_vertices_sub(&mut self, offset: usize, len: usize) {
        self.plan.positions.mark_sub(offset, len);
    }

    pub fn bind_vertex_colors_sub(&mut self, offset: usize, len: usize) {
        self.plan.colors.mark_sub(offset, len);
    }

    pub fn bind_tex_coords_sub(&mut self, set: usize, offset: usize, len: usize) {
        self.plan.tex_coords[set].mark_sub(offset, len);
    }

    /// Schedules re-upload of the node uniform (world matrix + color).
    pub fn mark_uniform(&mut self) {
        self.plan.uniform = true;
    }

    // ── plan / data access ────────────────────────────────────────────────

    #[inline]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    #[inline]
    pub fn plan(&self) -> &UploadPlan {
        &self.plan
    }

    pub(crate) fn clear_plan(&mut self) {
        self.plan.clear();
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty() || self.index_count == 0
    }

    #[inline]
    pub fn positions(&self) -> &[[f32; 2]] {
        &self.positions
    }

    /// Logical index data (without the alignment pad).
    #[inline]
    pub fn indices(&self) -> &[u16] {
        &self.indices[..self.index_count]
    }

    #[inline]
    pub fn colors(&self) -> &[[f32; 4]] {
        &self.colors
    }

    #[inline]
    pub fn tex_coords(&self, set: usize) -> &[[f32; 2]] {
        &self.tex_coords[set]
    }

    /// Index data including the alignment pad, with the pad slot refreshed.
    pub(crate) fn padded_indices(&mut self) -> &[u16] {
        if self.indices.len() > self.index_count && self.index_count > 0 {
            self.indices[self.index_count] = self.indices[self.index_count - 1];
        }
        &self.indices
    }
}

impl Default for MeshBuffers {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn count_change_reallocates_and_bumps_generation() {
        let mut mesh = MeshBuffers::new();
        let g0 = mesh.generation();

        assert!(mesh.set_vertices_num(4));
        assert!(mesh.set_indices_num(4));
        assert!(mesh.generation() > g0);

        // Same counts again: no change, no bump.
        let g1 = mesh.generation();
        assert!(!mesh.set_vertices_num(4));
        assert!(!mesh.set_indices_num(4));
        assert_eq!(mesh.generation(), g1);
    }

    #[test]
    fn value_only_change_records_sub_upload() {
        let mut mesh = MeshBuffers::new();
        mesh.set_vertices_num(4);
        mesh.set_indices_num(4);
        mesh.clear_plan();
        let g = mesh.generation();

        mesh.write_position(1, Vec2::new(3.0, 4.0));
        mesh.bind_vertices_sub(1, 1);

        assert_eq!(mesh.generation(), g, "value change must not reallocate");
        assert_eq!(mesh.plan().positions, Upload::Sub { offset: 1, len: 1 });
    }

    #[test]
    fn sub_marks_widen_into_one_range() {
        let mut mesh = MeshBuffers::new();
        mesh.set_vertices_num(8);
        mesh.clear_plan();

        mesh.bind_vertices_sub(1, 2);
        mesh.bind_vertices_sub(5, 2);
        assert_eq!(mesh.plan().positions, Upload::Sub { offset: 1, len: 6 });

        // A full mark wins over any sub range.
        mesh.bind_vertices();
        assert_eq!(mesh.plan().positions, Upload::Full);
    }

    #[test]
    fn vertex_resize_carries_enabled_attributes() {
        let mut mesh = MeshBuffers::new();
        mesh.set_vertices_num(4);
        mesh.enable_vertex_colors();
        mesh.enable_tex_coords(0);

        mesh.set_vertices_num(6);
        assert_eq!(mesh.colors().len(), 6);
        assert_eq!(mesh.tex_coords(0).len(), 6);
        assert!(mesh.tex_coords(1).is_empty());
    }

    #[test]
    fn odd_index_count_pads_to_even() {
        let mut mesh = MeshBuffers::new();
        mesh.set_vertices_num(5);
        mesh.set_indices_num(5);
        for i in 0..5 {
            mesh.write_index(i, i as u16);
        }
        let padded = mesh.padded_indices();
        assert_eq!(padded.len(), 6);
        assert_eq!(padded[5], 4, "pad mirrors the last real index");
        assert_eq!(mesh.indices(), &[0, 1, 2, 3, 4]);
    }
}
