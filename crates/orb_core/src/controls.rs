//! Camera movement commands.
//!
//! Each command is a pure `Camera -> Camera` transition, so a host can
//! replay a command list or map key presses onto it.

use std::fmt;
use std::str::FromStr;

use orb_math::{Camera, DVec3};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error returned when a command name is not recognized.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ControlError {
    #[error("Unknown camera command: {0}")]
    UnknownCommand(String),
}

/// Step sizes for camera commands.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlSettings {
    /// World units per translation step
    pub move_speed: f64,
    /// Degrees per rotation step
    pub rotation_speed: f64,
}

impl Default for ControlSettings {
    fn default() -> Self {
        Self {
            move_speed: 0.1,
            rotation_speed: 2.0,
        }
    }
}

/// A single camera movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum CameraCommand {
    Forward,
    Back,
    StrafeLeft,
    StrafeRight,
    Up,
    Down,
    PitchUp,
    PitchDown,
    YawLeft,
    YawRight,
}

impl CameraCommand {
    pub const ALL: [CameraCommand; 10] = [
        CameraCommand::Forward,
        CameraCommand::Back,
        CameraCommand::StrafeLeft,
        CameraCommand::StrafeRight,
        CameraCommand::Up,
        CameraCommand::Down,
        CameraCommand::PitchUp,
        CameraCommand::PitchDown,
        CameraCommand::YawLeft,
        CameraCommand::YawRight,
    ];

    /// Apply the command to `camera`.
    ///
    /// Forward and back travel along the look direction flattened onto the
    /// ground plane, so looking up or down never changes altitude.
    pub fn apply(self, camera: Camera, settings: &ControlSettings) -> Camera {
        let speed = settings.move_speed;
        let turn = settings.rotation_speed;

        match self {
            CameraCommand::Forward => camera.move_by(flat_forward(&camera) * speed),
            CameraCommand::Back => camera.move_by(flat_forward(&camera) * -speed),
            CameraCommand::StrafeLeft => camera.move_by(camera.right() * -speed),
            CameraCommand::StrafeRight => camera.move_by(camera.right() * speed),
            CameraCommand::Up => camera.move_by(DVec3::new(0.0, speed, 0.0)),
            CameraCommand::Down => camera.move_by(DVec3::new(0.0, -speed, 0.0)),
            CameraCommand::PitchUp => camera.rotate(0.0, turn),
            CameraCommand::PitchDown => camera.rotate(0.0, -turn),
            CameraCommand::YawLeft => camera.rotate(-turn, 0.0),
            CameraCommand::YawRight => camera.rotate(turn, 0.0),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            CameraCommand::Forward => "forward",
            CameraCommand::Back => "back",
            CameraCommand::StrafeLeft => "left",
            CameraCommand::StrafeRight => "right",
            CameraCommand::Up => "up",
            CameraCommand::Down => "down",
            CameraCommand::PitchUp => "pitch-up",
            CameraCommand::PitchDown => "pitch-down",
            CameraCommand::YawLeft => "yaw-left",
            CameraCommand::YawRight => "yaw-right",
        }
    }
}

fn flat_forward(camera: &Camera) -> DVec3 {
    let look = camera.look_direction();
    DVec3::new(look.x, 0.0, look.z).normalize()
}

impl FromStr for CameraCommand {
    type Err = ControlError;

    /// Accepts the long names plus the WASD-style keys (`w a s d space shift`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let command = match s.trim().to_ascii_lowercase().as_str() {
            "forward" | "w" => CameraCommand::Forward,
            "back" | "s" => CameraCommand::Back,
            "left" | "a" => CameraCommand::StrafeLeft,
            "right" | "d" => CameraCommand::StrafeRight,
            "up" | "space" => CameraCommand::Up,
            "down" | "shift" => CameraCommand::Down,
            "pitch-up" => CameraCommand::PitchUp,
            "pitch-down" => CameraCommand::PitchDown,
            "yaw-left" => CameraCommand::YawLeft,
            "yaw-right" => CameraCommand::YawRight,
            _ => return Err(ControlError::UnknownCommand(s.to_string())),
        };
        Ok(command)
    }
}

impl TryFrom<String> for CameraCommand {
    type Error = ControlError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<CameraCommand> for String {
    fn from(command: CameraCommand) -> Self {
        command.name().to_string()
    }
}

impl fmt::Display for CameraCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
