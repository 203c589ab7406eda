//! Renderer / vertex-buffer layer.
//!
//! Responsibilities:
//! - own per-node CPU attribute arrays and the full-vs-partial upload plan
//!   (`mesh`)
//! - turn prepared meshes into GPU buffers and indexed strip draw calls
//!   (`renderer`)
//! - expose the draw-call counter used for profiling (`stats`)

mod ctx;
mod mesh;
mod renderer;
pub mod stats;

pub use ctx::{RenderCtx, RenderTarget};
pub use mesh::{MAX_TEXTURE_SETS, MeshBuffers, Upload, UploadPlan};
pub use renderer::{DrawEntry, MeshRenderer};
