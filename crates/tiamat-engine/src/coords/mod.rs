//! Plain geometry value types (logical pixels, top-left origin).

mod matrix;
mod rect;
mod vec2;
mod viewport;

pub use matrix::Mat4;
pub use rect::Rect;
pub use vec2::Vec2;
pub use viewport::Viewport;
