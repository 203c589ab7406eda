use std::collections::BTreeMap;

use crate::coords::Vec2;
use crate::paint::Color;

/// Easing functions for smooth interpolation.
///
/// These transform a linear `t` in `[0, 1]` into acceleration/deceleration
/// curves.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Easing {
    /// Constant speed.
    Linear,
    /// Starts slow, accelerates (quadratic).
    QuadIn,
    /// Starts fast, decelerates (quadratic).
    QuadOut,
    /// Slow start and end (quadratic).
    QuadInOut,
    /// Starts slow, accelerates (cubic).
    CubicIn,
    /// Starts fast, decelerates (cubic).
    CubicOut,
    /// Slow start and end (cubic).
    CubicInOut,
}

impl Easing {
    pub fn apply(self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Easing::Linear => t,
            Easing::QuadIn => t * t,
            Easing::QuadOut => t * (2.0 - t),
            Easing::QuadInOut => {
                if t < 0.5 {
                    2.0 * t * t
                } else {
                    let u = t - 1.0;
                    1.0 - 2.0 * u * u
                }
            }
            Easing::CubicIn => t * t * t,
            Easing::CubicOut => {
                let u = t - 1.0;
                1.0 + u * u * u
            }
            Easing::CubicInOut => {
                if t < 0.5 {
                    4.0 * t * t * t
                } else {
                    let u = t - 1.0;
                    1.0 + 4.0 * u * u * u
                }
            }
        }
    }
}

/// Behavior when a tween reaches either end.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum LoopMode {
    /// Play once and complete.
    Once,
    /// Restart from the beginning when finished.
    Loop,
    /// Reverse direction when reaching either end.
    PingPong,
}

/// Interpolated property and its endpoints.
#[derive(Debug, Clone, Copy)]
enum Channel {
    Position { from: Vec2, to: Vec2 },
    Scale { from: Vec2, to: Vec2 },
    Size { from: Vec2, to: Vec2 },
    Rotation { from: f32, to: f32 },
    Color { from: Color, to: Color },
}

/// Interpolated value produced by one tween step, applied to the node's
/// transform by the caller.
#[derive(Debug, Clone, Copy)]
pub(crate) enum TweenValue {
    Position(Vec2),
    Scale(Vec2),
    Size(Vec2),
    Rotation(f32),
    Color(Color),
}

/// A time-driven value interpolation attached to a node.
///
/// Built with one of the property constructors plus the builder methods;
/// stepped once per frame by the owning node.
pub struct Tween {
    channel: Channel,
    /// Duration of one sweep in seconds.
    duration: f32,
    easing: Easing,
    loop_mode: LoopMode,

    time: f32,
    forward: bool,
    done: bool,
    on_complete: Option<Box<dyn FnOnce()>>,
}

impl Tween {
    fn new(channel: Channel, duration: f32) -> Tween {
        Tween {
            channel,
            duration,
            easing: Easing::Linear,
            loop_mode: LoopMode::Once,
            time: 0.0,
            forward: true,
            done: false,
            on_complete: None,
        }
    }

    pub fn position(from: Vec2, to: Vec2, duration: f32) -> Tween {
        Tween::new(Channel::Position { from, to }, duration)
    }

    pub fn scale(from: Vec2, to: Vec2, duration: f32) -> Tween {
        Tween::new(Channel::Scale { from, to }, duration)
    }

    pub fn size(from: Vec2, to: Vec2, duration: f32) -> Tween {
        Tween::new(Channel::Size { from, to }, duration)
    }

    pub fn rotation(from: f32, to: f32, duration: f32) -> Tween {
        Tween::new(Channel::Rotation { from, to }, duration)
    }

    pub fn color(from: Color, to: Color, duration: f32) -> Tween {
        Tween::new(Channel::Color { from, to }, duration)
    }

    pub fn with_easing(mut self, easing: Easing) -> Tween {
        self.easing = easing;
        self
    }

    pub fn with_loop_mode(mut self, loop_mode: LoopMode) -> Tween {
        self.loop_mode = loop_mode;
        self
    }

    /// Starts at the `to` end and plays toward `from`.
    pub fn with_backwards(mut self) -> Tween {
        self.time = self.duration;
        self.forward = false;
        self
    }

    /// Callback invoked once when the tween completes (never for `Loop` and
    /// `PingPong`, which run until cancelled).
    pub fn with_on_complete(mut self, f: impl FnOnce() + 'static) -> Tween {
        self.on_complete = Some(Box::new(f));
        self
    }

    fn is_done(&self) -> bool {
        self.done
    }

    fn take_on_complete(&mut self) -> Option<Box<dyn FnOnce()>> {
        self.on_complete.take()
    }

    /// Advances by `dt` seconds and returns the value to apply.
    fn step(&mut self, dt: f32) -> Option<TweenValue> {
        if self.done {
            return None;
        }

        // Degenerate duration: snap to the far end and complete.
        if self.duration <= 0.0 {
            self.done = true;
            return Some(self.sample(if self.forward { 1.0 } else { 0.0 }));
        }

        self.time += if self.forward { dt } else { -dt };

        match self.loop_mode {
            LoopMode::Once => {
                if self.forward && self.time >= self.duration {
                    self.time = self.duration;
                    self.done = true;
                } else if !self.forward && self.time <= 0.0 {
                    self.time = 0.0;
                    self.done = true;
                }
            }
            LoopMode::Loop => {
                if self.time >= self.duration {
                    self.time %= self.duration;
                } else if self.time < 0.0 {
                    self.time = self.duration + self.time % self.duration;
                }
            }
            LoopMode::PingPong => {
                // Reflect off either end; large dt may bounce repeatedly.
                loop {
                    if self.time > self.duration {
                        self.time = 2.0 * self.duration - self.time;
                        self.forward = !self.forward;
                    } else if self.time < 0.0 {
                        self.time = -self.time;
                        self.forward = !self.forward;
                    } else {
                        break;
                    }
                }
            }
        }

        let t = self.easing.apply(self.time / self.duration);
        Some(self.sample(t))
    }

    fn sample(&self, t: f32) -> TweenValue {
        match self.channel {
            Channel::Position { from, to } => TweenValue::Position(from + (to - from) * t),
            Channel::Scale { from, to } => TweenValue::Scale(from + (to - from) * t),
            Channel::Size { from, to } => TweenValue::Size(from + (to - from) * t),
            Channel::Rotation { from, to } => TweenValue::Rotation(from + (to - from) * t),
            Channel::Color { from, to } => TweenValue::Color(from.lerp(to, t)),
        }
    }
}

/// Identifier of a running tween, handed out by [`TweenSet::run`].
pub type TweenId = u64;

/// The tween map of one node.
///
/// Completed tweens are queued for removal and drained only after the step
/// iteration finishes — completion callbacks run from the drain, never
/// mid-iteration, so the map is never mutated while being walked.
#[derive(Default)]
pub(crate) struct TweenSet {
    map: BTreeMap<TweenId, Tween>,
    next_id: TweenId,
}

impl TweenSet {
    pub fn run(&mut self, tween: Tween) -> TweenId {
        let id = self.next_id;
        self.next_id += 1;
        self.map.insert(id, tween);
        id
    }

    pub fn cancel(&mut self, id: TweenId) -> bool {
        self.map.remove(&id).is_some()
    }

    pub fn cancel_all(&mut self) {
        self.map.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Steps every tween, feeding values to `apply`, then drains the
    /// completion queue.
    pub fn step(&mut self, dt: f32, mut apply: impl FnMut(TweenValue)) {
        let mut finished: Vec<TweenId> = Vec::new();

        for (id, tween) in self.map.iter_mut() {
            if let Some(value) = tween.step(dt) {
                apply(value);
            }
            if tween.is_done() {
                finished.push(*id);
            }
        }

        for id in finished {
            if let Some(mut tween) = self.map.remove(&id) {
                if let Some(callback) = tween.take_on_complete() {
                    callback();
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    fn position_of(v: TweenValue) -> Vec2 {
        match v {
            TweenValue::Position(p) => p,
            other => panic!("expected position, got {other:?}"),
        }
    }

    #[test]
    fn linear_position_endpoints() {
        let mut set = TweenSet::default();
        set.run(Tween::position(Vec2::zero(), Vec2::new(10.0, 0.0), 1.0));

        let mut last = Vec2::zero();
        set.step(0.5, |v| last = position_of(v));
        assert!((last.x - 5.0).abs() < 1e-5);

        set.step(0.5, |v| last = position_of(v));
        assert!((last.x - 10.0).abs() < 1e-5);
        assert!(set.is_empty(), "completed tween removed after iteration");
    }

    #[test]
    fn quad_out_front_loads_motion() {
        assert!(Easing::QuadOut.apply(0.5) > 0.5);
        assert!(Easing::QuadIn.apply(0.5) < 0.5);
        assert_eq!(Easing::CubicInOut.apply(0.0), 0.0);
        assert_eq!(Easing::CubicInOut.apply(1.0), 1.0);
    }

    #[test]
    fn ping_pong_reflects_at_both_ends() {
        let mut set = TweenSet::default();
        set.run(
            Tween::position(Vec2::zero(), Vec2::new(10.0, 0.0), 1.0)
                .with_loop_mode(LoopMode::PingPong),
        );

        let mut last = Vec2::zero();
        // 1.5s into a 1s sweep: reflected back to the midpoint.
        set.step(1.5, |v| last = position_of(v));
        assert!((last.x - 5.0).abs() < 1e-4);
        assert!(!set.is_empty(), "ping-pong runs until cancelled");
    }

    #[test]
    fn completion_callback_fires_exactly_once() {
        let fired = Rc::new(Cell::new(0));
        let observed = fired.clone();

        let mut set = TweenSet::default();
        set.run(
            Tween::rotation(0.0, 90.0, 0.2)
                .with_on_complete(move || observed.set(observed.get() + 1)),
        );

        set.step(0.1, |_| {});
        assert_eq!(fired.get(), 0);
        set.step(0.2, |_| {});
        assert_eq!(fired.get(), 1);
        set.step(0.1, |_| {});
        assert_eq!(fired.get(), 1);
    }

    #[test]
    fn cancel_removes_by_id() {
        let mut set = TweenSet::default();
        let a = set.run(Tween::rotation(0.0, 90.0, 1.0));
        let _b = set.run(Tween::rotation(0.0, -90.0, 1.0));

        assert!(set.cancel(a));
        assert!(!set.cancel(a), "second cancel is a no-op");

        set.cancel_all();
        assert!(set.is_empty());
    }

    #[test]
    fn backwards_starts_at_the_to_end() {
        let mut set = TweenSet::default();
        set.run(Tween::position(Vec2::zero(), Vec2::new(10.0, 0.0), 1.0).with_backwards());

        let mut last = Vec2::zero();
        set.step(0.25, |v| last = position_of(v));
        assert!((last.x - 7.5).abs() < 1e-4);
    }
}
