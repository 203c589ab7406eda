//! Collider shapes and intersection tests.
//!
//! Colliders are built from a node's current world transform and are
//! immutable for the duration of a query; a new query rebuilds them. Every
//! collider carries an AABB, used as the broad phase before any
//! shape-specific narrow phase. All boundary comparisons are inclusive:
//! touching shapes collide.

mod collider;
mod intersect;

pub use collider::{Aabb, Circle, Collider, ColliderShape, Obb, ConvexPolygon};
pub use intersect::{collides, contains};
