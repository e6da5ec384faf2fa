//! Run configuration, read from a JSON file.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use orb_core::{CameraCommand, ControlSettings};
use orb_math::{Camera, DVec3};
use orb_render::{KernelAbi, RenderSettings};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub origin: DVec3,
    pub look_at: DVec3,
    /// Vertical field of view in degrees
    pub vertical_fov: f64,
    pub focal_length: f64,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            origin: DVec3::new(13.0, 2.0, 3.0),
            look_at: DVec3::ZERO,
            vertical_fov: 20.0,
            focal_length: 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KernelConfig {
    pub path: PathBuf,
    pub entry_point: String,
    pub abi: KernelAbi,
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("kernels/raytracer.wgsl"),
            entry_point: "raytrace".to_string(),
            abi: KernelAbi::Extended,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Image width in pixels; height follows from the aspect ratio
    pub width: u32,
    pub aspect_ratio: f64,
    pub camera: CameraConfig,
    pub render: RenderSettings,
    pub kernel: KernelConfig,
    /// Scene file with a sphere list. The random scene is used when absent.
    pub scene: Option<PathBuf>,
    pub seed: u64,
    pub output_dir: PathBuf,
    pub controls: ControlSettings,
    /// Resize the output to this size before replaying commands
    pub resize: Option<(u32, u32)>,
    /// Camera commands to replay, one frame written after each
    pub commands: Vec<CameraCommand>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            width: 1200,
            aspect_ratio: 16.0 / 9.0,
            camera: CameraConfig::default(),
            render: RenderSettings {
                samples_per_pixel: 500,
                max_depth: 50,
                debug: false,
            },
            kernel: KernelConfig::default(),
            scene: None,
            seed: 42,
            output_dir: PathBuf::from("renders"),
            controls: ControlSettings::default(),
            resize: None,
            commands: Vec::new(),
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {:?}", path))?;
        let config: Config = serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse config {:?}", path))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.width == 0 {
            anyhow::bail!("width must be positive");
        }
        if !(self.aspect_ratio.is_finite() && self.aspect_ratio > 0.0) {
            anyhow::bail!("aspect_ratio must be a positive number");
        }
        if let Some((w, h)) = self.resize {
            if w == 0 || h == 0 {
                anyhow::bail!("resize dimensions must be positive, got {}x{}", w, h);
            }
        }
        Ok(())
    }

    pub fn height(&self) -> u32 {
        ((self.width as f64 / self.aspect_ratio) as u32).max(1)
    }

    /// Initial camera aimed at the configured look-at point.
    pub fn camera(&self) -> Camera {
        Camera::look_at(
            self.camera.origin,
            self.camera.look_at,
            self.camera.vertical_fov,
            self.aspect_ratio,
            self.camera.focal_length,
        )
    }
}
