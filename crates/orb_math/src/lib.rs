//! Math for the orb renderer: re-exported `glam` plus the pinhole camera.

// Re-export glam for convenience
pub use glam::*;

mod camera;
mod frustum;

pub use camera::{Camera, Orientation, PITCH_LIMIT};
pub use frustum::{look_direction, viewport_height, Frustum, WORLD_UP};

/// Host-side vector type. Immutable value semantics; every operation returns a new vector.
pub type Vector3 = DVec3;
