//! Pinhole viewing frustum.
//!
//! The frustum is reduced to a rectangular viewport plane sitting
//! `focal_length` in front of the origin, described by its lower-left
//! corner and the two span vectors across it. Rays leave the origin and
//! pass through `lower_left_corner + s * horizontal + t * vertical`.

use glam::DVec3;

/// Fixed world up axis. The camera basis never rolls around it.
pub const WORLD_UP: DVec3 = DVec3::Y;

/// Derived viewport geometry of a camera.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frustum {
    pub origin: DVec3,
    pub look_direction: DVec3,
    pub right: DVec3,
    pub up: DVec3,
    pub horizontal: DVec3,
    pub vertical: DVec3,
    pub lower_left_corner: DVec3,
}

impl Frustum {
    /// Build the viewport from an orthonormal basis.
    pub fn from_basis(
        origin: DVec3,
        look_direction: DVec3,
        right: DVec3,
        up: DVec3,
        viewport_height: f64,
        aspect_ratio: f64,
        focal_length: f64,
    ) -> Self {
        let viewport_width = viewport_height * aspect_ratio;
        let horizontal = right * viewport_width;
        let vertical = up * viewport_height;

        // Viewport center is one focal length down the look direction
        let lower_left_corner =
            origin + look_direction * focal_length - horizontal * 0.5 - vertical * 0.5;

        Self {
            origin,
            look_direction,
            right,
            up,
            horizontal,
            vertical,
            lower_left_corner,
        }
    }

    /// Build the viewport for a yaw/pitch orientation (degrees).
    ///
    /// `right = look × world_up` and `up = right × look`, which keeps the
    /// basis right-handed with no roll. Pitch must stay away from ±90° or
    /// the cross product collapses.
    pub fn from_yaw_pitch(
        origin: DVec3,
        yaw: f64,
        pitch: f64,
        viewport_height: f64,
        aspect_ratio: f64,
        focal_length: f64,
    ) -> Self {
        let look_direction = look_direction(yaw, pitch);
        let right = look_direction.cross(WORLD_UP).normalize();
        let up = right.cross(look_direction).normalize();

        Self::from_basis(
            origin,
            look_direction,
            right,
            up,
            viewport_height,
            aspect_ratio,
            focal_length,
        )
    }

    /// Build the viewport for a camera fixed to look down -Z.
    pub fn axis_aligned(
        origin: DVec3,
        viewport_height: f64,
        aspect_ratio: f64,
        focal_length: f64,
    ) -> Self {
        Self::from_basis(
            origin,
            DVec3::NEG_Z,
            DVec3::X,
            DVec3::Y,
            viewport_height,
            aspect_ratio,
            focal_length,
        )
    }
}

/// Unit look direction for yaw (azimuth about Y) and pitch (elevation), in degrees.
pub fn look_direction(yaw: f64, pitch: f64) -> DVec3 {
    let yaw = yaw.to_radians();
    let pitch = pitch.to_radians();

    DVec3::new(
        pitch.cos() * yaw.cos(),
        pitch.sin(),
        pitch.cos() * yaw.sin(),
    )
    .normalize()
}

/// Viewport height for a vertical field of view (degrees) at `focal_length`.
pub fn viewport_height(vertical_fov: f64, focal_length: f64) -> f64 {
    let h = (vertical_fov.to_radians() / 2.0).tan();
    2.0 * h * focal_length
}
