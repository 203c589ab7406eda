use crate::coords::{Rect, Vec2};
use crate::render::MeshBuffers;
use crate::texture::TextureRef;

use super::super::node::{Node, NodeRef};
use super::{Shape, window_uv, write_quad_uv};

/// Loop behavior of a sheet animation.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PlayMode {
    /// Play the range once, stop at the end frame.
    None,
    /// Wrap to the start frame at the end.
    Loop,
    /// Reverse direction at each end.
    PingPong,
}

/// Running animation state (`Playing`; `Stopped` is the absence of this).
struct Anim {
    start: usize,
    end: usize,
    mode: PlayMode,
    /// Remaining wraps (`Loop`) or direction reversals (`PingPong`). When
    /// exhausted, the next end terminates the animation. `None` runs until
    /// stopped.
    loops_left: Option<u32>,
    time_per_frame: f32,
    elapsed: f32,
    forward: bool,
}

/// Animated sprite sheet: a quad whose texture window steps through a frame
/// table.
///
/// The state machine is `Stopped → Playing` via [`Node::start_animation`];
/// on the terminal condition it fires the completion callback once and
/// returns to `Stopped`, leaving the last frame visible. Frame changes touch
/// only texture coordinates — geometry and transform stay clean.
pub struct Sheet {
    /// Frame windows in texels.
    frames: Vec<Rect>,
    /// Per-frame duration overrides; same length as `frames` when set.
    durations: Option<Vec<f32>>,
    current: usize,
    anim: Option<Anim>,
    on_complete: Option<Box<dyn FnMut()>>,
}

impl Sheet {
    pub fn new(frames: Vec<Rect>) -> Sheet {
        Sheet {
            frames,
            durations: None,
            current: 0,
            anim: None,
            on_complete: None,
        }
    }

    /// Builds the frame table by slicing a texture into a row-major grid of
    /// `frame_size` texel cells.
    pub fn from_grid(texture: &TextureRef, frame_size: Vec2) -> Sheet {
        let mut frames = Vec::new();
        if frame_size.x > 0.0 && frame_size.y > 0.0 {
            let cols = (texture.width() as f32 / frame_size.x).floor() as usize;
            let rows = (texture.height() as f32 / frame_size.y).floor() as usize;
            for row in 0..rows {
                for col in 0..cols {
                    frames.push(Rect::from_origin_size(
                        Vec2::new(col as f32 * frame_size.x, row as f32 * frame_size.y),
                        frame_size,
                    ));
                }
            }
        }
        Sheet::new(frames)
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    /// The frame windows in texels.
    pub fn frames(&self) -> &[Rect] {
        &self.frames
    }

    pub(crate) fn durations(&self) -> Option<&[f32]> {
        self.durations.as_deref()
    }

    pub fn current_frame(&self) -> usize {
        self.current
    }

    pub fn is_playing(&self) -> bool {
        self.anim.is_some()
    }

    pub(crate) fn set_frame(&mut self, frame: usize) -> bool {
        let frame = frame.min(self.frames.len().saturating_sub(1));
        if frame == self.current {
            return false;
        }
        self.current = frame;
        true
    }

    /// Installs per-frame durations. Rejected (logged, ignored) unless the
    /// table matches the frame count with strictly positive entries.
    pub(crate) fn set_frame_durations(&mut self, durations: Vec<f32>) {
        if durations.len() != self.frames.len() || durations.iter().any(|d| *d <= 0.0) {
            log::warn!(
                "frame duration table rejected ({} entries for {} frames)",
                durations.len(),
                self.frames.len()
            );
            return;
        }
        self.durations = Some(durations);
    }

    /// Enters `Playing` over `[start, end]`. Malformed ranges (`end <=
    /// start`, out-of-table frames after clamping, non-positive frame time,
    /// empty table) are silent no-ops.
    pub(crate) fn start(
        &mut self,
        start: usize,
        end: usize,
        mode: PlayMode,
        loop_count: Option<u32>,
        time_per_frame: f32,
    ) -> bool {
        if self.frames.is_empty() || time_per_frame <= 0.0 {
            return false;
        }
        let end = end.min(self.frames.len() - 1);
        if end <= start {
            return false;
        }

        self.anim = Some(Anim {
            start,
            end,
            mode,
            loops_left: loop_count,
            time_per_frame,
            elapsed: 0.0,
            forward: true,
        });
        let changed = self.current != start;
        self.current = start;
        changed
    }

    /// Leaves `Playing` without firing the completion callback.
    pub(crate) fn stop(&mut self) {
        self.anim = None;
    }

    pub(crate) fn set_on_complete(&mut self, f: Option<Box<dyn FnMut()>>) {
        self.on_complete = f;
    }

    /// Advances the animation by `dt` seconds; returns whether the selected
    /// frame changed (the caller marks texcoords dirty).
    pub(crate) fn step(&mut self, dt: f32) -> bool {
        let Some(anim) = self.anim.as_mut() else { return false };

        anim.elapsed += dt;
        let mut changed = false;
        let mut terminal = false;

        loop {
            let d = self.durations
                .as_ref()
                .and_then(|t| t.get(self.current).copied())
                .unwrap_or(anim.time_per_frame);
            if anim.elapsed < d {
                break;
            }
            anim.elapsed -= d;

            let at_boundary =
                (anim.forward && self.current >= anim.end) || (!anim.forward && self.current <= anim.start);

            if at_boundary {
                match anim.mode {
                    PlayMode::None => {
                        terminal = true;
                        break;
                    }
                    PlayMode::Loop => match anim.loops_left {
                        Some(0) => {
                            terminal = true;
                            break;
                        }
                        remaining => {
                            if let Some(n) = remaining {
                                anim.loops_left = Some(n - 1);
                            }
                            self.current = anim.start;
                            changed = true;
                        }
                    },
                    PlayMode::PingPong => match anim.loops_left {
                        Some(0) => {
                            terminal = true;
                            break;
                        }
                        remaining => {
                            if let Some(n) = remaining {
                                anim.loops_left = Some(n - 1);
                            }
                            anim.forward = !anim.forward;
                            self.current = if anim.forward { self.current + 1 } else { self.current - 1 };
                            changed = true;
                        }
                    },
                }
            } else {
                self.current = if anim.forward { self.current + 1 } else { self.current - 1 };
                changed = true;
            }
        }

        if terminal {
            self.anim = None;
            if let Some(callback) = self.on_complete.as_mut() {
                callback();
            }
        }

        changed
    }

    pub(crate) fn write_tex_coords(&self, mesh: &mut MeshBuffers, v0: usize) {
        let Some(tex) = mesh.texture(0) else { return };
        let (tw, th, flipped) = (tex.width() as f32, tex.height() as f32, tex.flipped());
        let Some(window) = self.frames.get(self.current).copied() else { return };
        if tw <= 0.0 || th <= 0.0 {
            return;
        }

        let (u, v) = window_uv(window, tw, th, flipped);
        write_quad_uv(mesh, 0, v0, u, v);
    }
}

impl Node {
    /// Creates a sprite-sheet node over a row-major grid of `frame_size`
    /// texel cells. Node size defaults to one frame in logical pixels.
    pub fn new_sheet(
        name: impl Into<String>,
        texture: Option<TextureRef>,
        frame_size: Vec2,
    ) -> NodeRef {
        let sheet = match texture.as_ref() {
            Some(t) => Sheet::from_grid(t, frame_size),
            None => Sheet::new(Vec::new()),
        };
        let density = texture.as_ref().map(|t| t.density()).unwrap_or(1.0).max(f32::EPSILON);

        let node = Node::with_shape(name, Shape::Sheet(sheet));
        {
            let mut n = node.borrow_mut();
            n.set_size(frame_size / density);
            n.mesh_mut().enable_tex_coords(0);
            n.mesh_mut().set_texture(0, texture);
        }
        node
    }

    /// Creates a sprite-sheet node from an explicit frame table (atlas
    /// frames that do not form a regular grid).
    pub fn new_sheet_with_frames(
        name: impl Into<String>,
        texture: Option<TextureRef>,
        frames: Vec<Rect>,
    ) -> NodeRef {
        let density = texture.as_ref().map(|t| t.density()).unwrap_or(1.0).max(f32::EPSILON);
        let size = frames.first().map(|f| f.size / density).unwrap_or(Vec2::zero());

        let node = Node::with_shape(name, Shape::Sheet(Sheet::new(frames)));
        {
            let mut n = node.borrow_mut();
            n.set_size(size);
            n.mesh_mut().enable_tex_coords(0);
            n.mesh_mut().set_texture(0, texture);
        }
        node
    }

    /// Starts a sheet animation over `[start, end]`. Silent no-op for
    /// malformed ranges or on non-sheet nodes.
    pub fn start_animation(
        &mut self,
        start: usize,
        end: usize,
        mode: PlayMode,
        loop_count: Option<u32>,
        time_per_frame: f32,
    ) {
        let changed = match self.shape_mut() {
            Shape::Sheet(s) => s.start(start, end, mode, loop_count, time_per_frame),
            _ => {
                log::warn!("start_animation on a non-sheet node");
                return;
            }
        };
        if changed {
            self.mark_tex_coords_dirty();
        }
    }

    /// Stops a running sheet animation without firing its completion
    /// callback.
    pub fn stop_animation(&mut self) {
        if let Shape::Sheet(s) = self.shape_mut() {
            s.stop();
        }
    }

    /// Jumps to a frame while stopped (or on top of a running animation).
    pub fn set_sheet_frame(&mut self, frame: usize) {
        let changed = match self.shape_mut() {
            Shape::Sheet(s) => s.set_frame(frame),
            _ => return,
        };
        if changed {
            self.mark_tex_coords_dirty();
        }
    }

    /// Installs per-frame durations for sheet playback.
    pub fn set_frame_durations(&mut self, durations: Vec<f32>) {
        if let Shape::Sheet(s) = self.shape_mut() {
            s.set_frame_durations(durations);
        }
    }

    /// Callback fired each time a sheet animation reaches its terminal
    /// condition.
    pub fn set_animation_complete(&mut self, f: impl FnMut() + 'static) {
        if let Shape::Sheet(s) = self.shape_mut() {
            s.set_on_complete(Some(Box::new(f)));
        }
    }

    /// Currently selected sheet frame (0 for other node kinds).
    pub fn current_frame(&self) -> usize {
        match self.shape() {
            Shape::Sheet(s) => s.current_frame(),
            _ => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    fn four_frame_sheet() -> Sheet {
        Sheet::new(vec![
            Rect::new(0.0, 0.0, 8.0, 8.0),
            Rect::new(8.0, 0.0, 8.0, 8.0),
            Rect::new(16.0, 0.0, 8.0, 8.0),
            Rect::new(24.0, 0.0, 8.0, 8.0),
        ])
    }

    /// Ticks in `step` increments of `dt`, recording the frame after each.
    fn run(sheet: &mut Sheet, ticks: usize, dt: f32) -> Vec<usize> {
        let mut seen = Vec::new();
        for _ in 0..ticks {
            sheet.step(dt);
            seen.push(sheet.current_frame());
        }
        seen
    }

    #[test]
    fn ping_pong_reverses_at_each_end() {
        let fired = Rc::new(Cell::new(0u32));
        let observed = fired.clone();

        let mut sheet = four_frame_sheet();
        sheet.set_on_complete(Some(Box::new(move || observed.set(observed.get() + 1))));
        assert!(sheet.start(0, 3, PlayMode::PingPong, Some(2), 0.1) || sheet.current_frame() == 0);

        // 0.75s of 50ms ticks: frames at each 0.1s step are
        // 0,1,2,3,2,1,0,1 — direction reverses at each end.
        let seen = run(&mut sheet, 15, 0.05);
        let at_steps: Vec<usize> = seen.iter().copied().step_by(2).collect();
        assert_eq!(at_steps, vec![0, 1, 2, 3, 2, 1, 0, 1]);
        assert_eq!(fired.get(), 0, "not terminal yet");

        // Both reversals are spent; the next end is terminal.
        run(&mut sheet, 5, 0.05);
        assert_eq!(fired.get(), 1, "completion fires exactly once");
        assert!(!sheet.is_playing());
        assert_eq!(sheet.current_frame(), 3, "terminal leaves the last frame visible");

        run(&mut sheet, 5, 0.05);
        assert_eq!(fired.get(), 1);
    }

    #[test]
    fn play_once_stops_at_the_end_frame() {
        let fired = Rc::new(Cell::new(0u32));
        let observed = fired.clone();

        let mut sheet = four_frame_sheet();
        sheet.set_on_complete(Some(Box::new(move || observed.set(observed.get() + 1))));
        sheet.start(0, 3, PlayMode::None, None, 0.1);

        let seen = run(&mut sheet, 10, 0.1);
        assert_eq!(&seen[..4], &[1, 2, 3, 3]);
        assert_eq!(fired.get(), 1);
        assert!(!sheet.is_playing());
    }

    #[test]
    fn loop_wraps_to_the_start_frame() {
        let mut sheet = four_frame_sheet();
        sheet.start(0, 3, PlayMode::Loop, None, 0.1);

        let seen = run(&mut sheet, 8, 0.1);
        assert_eq!(seen, vec![1, 2, 3, 0, 1, 2, 3, 0]);
        assert!(sheet.is_playing(), "unbounded loop runs until stopped");
    }

    #[test]
    fn malformed_range_is_a_silent_no_op() {
        let mut sheet = four_frame_sheet();

        assert!(!sheet.start(2, 2, PlayMode::Loop, None, 0.1));
        assert!(!sheet.start(3, 1, PlayMode::None, None, 0.1));
        assert!(!sheet.start(0, 3, PlayMode::None, None, 0.0));
        assert!(!sheet.is_playing());

        let mut empty = Sheet::new(Vec::new());
        assert!(!empty.start(0, 3, PlayMode::Loop, None, 0.1));
    }

    #[test]
    fn per_frame_duration_table_drives_advancement() {
        let mut sheet = four_frame_sheet();
        sheet.set_frame_durations(vec![0.1, 0.3, 0.1, 0.1]);
        sheet.start(0, 3, PlayMode::None, None, 0.1);

        sheet.step(0.1);
        assert_eq!(sheet.current_frame(), 1);
        // Frame 1 holds for 0.3s.
        sheet.step(0.2);
        assert_eq!(sheet.current_frame(), 1);
        sheet.step(0.1);
        assert_eq!(sheet.current_frame(), 2);
    }

    #[test]
    fn bad_duration_tables_are_rejected() {
        let mut sheet = four_frame_sheet();
        sheet.set_frame_durations(vec![0.1, 0.2]); // wrong length
        assert!(sheet.durations.is_none());
        sheet.set_frame_durations(vec![0.1, 0.0, 0.1, 0.1]); // non-positive
        assert!(sheet.durations.is_none());
    }

    #[test]
    fn grid_slicing_is_row_major() {
        let tex: TextureRef = Rc::new(crate::texture::Texture::new("run.png", 32, 16));
        let sheet = Sheet::from_grid(&tex, Vec2::new(16.0, 16.0));
        assert_eq!(sheet.frame_count(), 2);
        assert_eq!(sheet.frames[1].origin, Vec2::new(16.0, 0.0));
    }
}
