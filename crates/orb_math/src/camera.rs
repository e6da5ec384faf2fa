use glam::DVec3;

use crate::frustum::{viewport_height, Frustum};

/// Pitch is clamped to this many degrees either side of the horizon.
pub const PITCH_LIMIT: f64 = 89.0;

/// How the camera basis is parameterized.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Orientation {
    /// Azimuth and elevation in degrees about the world up axis.
    YawPitch { yaw: f64, pitch: f64 },
    /// Fixed basis looking down -Z. Only translation is supported.
    AxisAligned,
}

/// Pinhole camera.
///
/// A camera is an immutable value: `rotate` and `move_by` return a new
/// camera whose frustum is already re-derived, so a held camera never
/// exposes stale derived vectors.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    origin: DVec3,
    orientation: Orientation,
    viewport_height: f64,
    aspect_ratio: f64,
    focal_length: f64,
    frustum: Frustum,
}

impl Camera {
    /// Create a yaw/pitch camera at `origin` initially aimed at `look_at`.
    ///
    /// `vertical_fov` is in degrees. The initial pitch is clamped like any
    /// later rotation.
    pub fn look_at(
        origin: DVec3,
        look_at: DVec3,
        vertical_fov: f64,
        aspect_ratio: f64,
        focal_length: f64,
    ) -> Self {
        let direction = (look_at - origin).normalize();
        let pitch = direction.y.asin().to_degrees();
        let yaw = direction.z.atan2(direction.x).to_degrees();

        Self::from_yaw_pitch(origin, yaw, pitch, vertical_fov, aspect_ratio, focal_length)
    }

    /// Create a yaw/pitch camera from explicit angles (degrees).
    pub fn from_yaw_pitch(
        origin: DVec3,
        yaw: f64,
        pitch: f64,
        vertical_fov: f64,
        aspect_ratio: f64,
        focal_length: f64,
    ) -> Self {
        Self::derive(
            origin,
            Orientation::YawPitch {
                yaw,
                pitch: clamp_pitch(pitch),
            },
            viewport_height(vertical_fov, focal_length),
            aspect_ratio,
            focal_length,
        )
    }

    /// Create a fixed camera looking down -Z with an explicit viewport height.
    pub fn axis_aligned(
        origin: DVec3,
        viewport_height: f64,
        aspect_ratio: f64,
        focal_length: f64,
    ) -> Self {
        Self::derive(
            origin,
            Orientation::AxisAligned,
            viewport_height,
            aspect_ratio,
            focal_length,
        )
    }

    fn derive(
        origin: DVec3,
        orientation: Orientation,
        viewport_height: f64,
        aspect_ratio: f64,
        focal_length: f64,
    ) -> Self {
        let frustum = match orientation {
            Orientation::YawPitch { yaw, pitch } => Frustum::from_yaw_pitch(
                origin,
                yaw,
                pitch,
                viewport_height,
                aspect_ratio,
                focal_length,
            ),
            Orientation::AxisAligned => {
                Frustum::axis_aligned(origin, viewport_height, aspect_ratio, focal_length)
            }
        };

        Self {
            origin,
            orientation,
            viewport_height,
            aspect_ratio,
            focal_length,
            frustum,
        }
    }

    /// Turn the camera by yaw/pitch deltas in degrees.
    ///
    /// Pitch saturates at ±[`PITCH_LIMIT`]; yaw is left unwrapped. An
    /// axis-aligned camera is returned unchanged.
    #[must_use]
    pub fn rotate(self, yaw_delta: f64, pitch_delta: f64) -> Self {
        match self.orientation {
            Orientation::YawPitch { yaw, pitch } => Self::derive(
                self.origin,
                Orientation::YawPitch {
                    yaw: yaw + yaw_delta,
                    pitch: clamp_pitch(pitch + pitch_delta),
                },
                self.viewport_height,
                self.aspect_ratio,
                self.focal_length,
            ),
            Orientation::AxisAligned => self,
        }
    }

    /// Translate the camera. Orientation is unaffected.
    #[must_use]
    pub fn move_by(self, delta: DVec3) -> Self {
        Self::derive(
            self.origin + delta,
            self.orientation,
            self.viewport_height,
            self.aspect_ratio,
            self.focal_length,
        )
    }

    /// Same camera with a new aspect ratio (e.g. after a resize).
    #[must_use]
    pub fn with_aspect_ratio(self, aspect_ratio: f64) -> Self {
        Self::derive(
            self.origin,
            self.orientation,
            self.viewport_height,
            aspect_ratio,
            self.focal_length,
        )
    }

    pub fn origin(&self) -> DVec3 {
        self.origin
    }

    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    /// Yaw in degrees, `None` for an axis-aligned camera.
    pub fn yaw(&self) -> Option<f64> {
        match self.orientation {
            Orientation::YawPitch { yaw, .. } => Some(yaw),
            Orientation::AxisAligned => None,
        }
    }

    /// Pitch in degrees, `None` for an axis-aligned camera.
    pub fn pitch(&self) -> Option<f64> {
        match self.orientation {
            Orientation::YawPitch { pitch, .. } => Some(pitch),
            Orientation::AxisAligned => None,
        }
    }

    pub fn viewport_height(&self) -> f64 {
        self.viewport_height
    }

    pub fn aspect_ratio(&self) -> f64 {
        self.aspect_ratio
    }

    pub fn focal_length(&self) -> f64 {
        self.focal_length
    }

    /// Vertical field of view in degrees implied by the viewport height.
    pub fn vertical_fov(&self) -> f64 {
        (2.0 * (self.viewport_height / (2.0 * self.focal_length)).atan()).to_degrees()
    }

    pub fn frustum(&self) -> &Frustum {
        &self.frustum
    }

    pub fn look_direction(&self) -> DVec3 {
        self.frustum.look_direction
    }

    pub fn right(&self) -> DVec3 {
        self.frustum.right
    }

    pub fn up(&self) -> DVec3 {
        self.frustum.up
    }

    pub fn horizontal(&self) -> DVec3 {
        self.frustum.horizontal
    }

    pub fn vertical(&self) -> DVec3 {
        self.frustum.vertical
    }

    pub fn lower_left_corner(&self) -> DVec3 {
        self.frustum.lower_left_corner
    }
}

fn clamp_pitch(pitch: f64) -> f64 {
    pitch.clamp(-PITCH_LIMIT, PITCH_LIMIT)
}
