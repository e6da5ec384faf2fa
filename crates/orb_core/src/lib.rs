//! Orb Core - scene data model for the sphere renderer.
//!
//! This crate provides:
//!
//! - **Primitives**: `Sphere` with its uniform `MaterialKind` record
//! - **Scene**: the active camera plus an ordered sphere list
//! - **Controls**: camera movement commands as pure transitions
//!
//! # Example
//!
//! ```ignore
//! use orb_core::{CameraCommand, ControlSettings, Scene, Sphere};
//! use orb_math::{Camera, DVec3};
//!
//! let camera = Camera::look_at(DVec3::new(13.0, 2.0, 3.0), DVec3::ZERO, 20.0, 16.0 / 9.0, 1.0);
//! let mut scene = Scene::new(camera);
//! scene.add_sphere(Sphere::dielectric(DVec3::new(0.0, 1.0, 0.0), 1.0, 1.5));
//! scene.apply(CameraCommand::YawLeft, &ControlSettings::default());
//! ```

pub mod controls;
pub mod scene;
pub mod sphere;

// Re-export commonly used types
pub use controls::{CameraCommand, ControlError, ControlSettings};
pub use scene::{random_scene, Scene, SceneDescription};
pub use sphere::{MaterialKind, Sphere};
