//! Orb Render - compute dispatch for the sphere renderer.
//!
//! This crate provides:
//!
//! - **Kernel contract**: `KernelAbi`, the ordered argument schema shared with the kernel
//! - **Marshaling**: camera frustum packing and sphere structure-of-arrays transpose
//! - **Device seam**: the `ComputeDevice` trait and the long-lived `DeviceContext`
//! - **Renderer**: one blocking dispatch per `render` call
//! - **GPU backend**: `WgpuDevice`, a headless wgpu compute device
//!
//! # Example
//!
//! ```ignore
//! use orb_render::{KernelAbi, KernelSource, RenderSettings, Renderer};
//!
//! let source = KernelSource::load("kernels/raytracer.wgsl", "raytrace")?;
//! let mut renderer = Renderer::with_wgpu(&source, KernelAbi::Extended, RenderSettings::default(), 400, 225)?;
//! let image = renderer.render(&scene)?;
//! ```

pub mod abi;
pub mod device;
pub mod error;
pub mod gpu;
pub mod marshal;
pub mod pixels;
pub mod renderer;

#[cfg(test)]
mod fake;

// Re-export commonly used types
pub use abi::{ArgKind, ArgSource, KernelAbi, SphereField};
pub use device::{ComputeDevice, DeviceContext, KernelArg};
pub use error::{RenderError, RenderResult};
pub use gpu::{KernelSource, WgpuDevice};
pub use marshal::{placeholder_sphere, CameraArgs, SphereArrays};
pub use pixels::PixelBuffer;
pub use renderer::{RenderSettings, Renderer};
