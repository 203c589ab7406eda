//! Tiamat engine crate.
//!
//! A retained-mode 2D scene graph: a tree of drawable nodes mutated by
//! application code and traversed once per frame to recompute world
//! transforms and emit minimal GPU draw calls.
//!
//! Layering (leaves first):
//! - `coords` / `paint`: plain value types
//! - `render`: per-node CPU vertex arrays + partial GPU upload + draw emission
//! - `texture`: texture contract and the process-wide weak cache
//! - `collision`: collider shapes and intersection dispatch
//! - `scene`: nodes, containers, dirty propagation, tweens, touch, the `Scene` root
//!
//! Platform windowing and the frame-loop driver live outside this crate
//! (see `tiamat-studio`).

pub mod logging;

pub mod coords;
pub mod paint;
pub mod time;

pub mod collision;
pub mod render;
pub mod texture;

pub mod scene;
