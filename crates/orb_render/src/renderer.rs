//! Render pass orchestration.
//!
//! One call to [`Renderer::render`]:
//! - Packs the camera frustum into four-lane vectors
//! - Transposes the sphere list into per-field device buffers
//! - Binds every argument in contract order and dispatches `width x height`
//! - Blocks on readback of the output buffer
//!
//! Per-call sphere buffers are released before `render` returns, on the
//! error path as well.

use std::time::Instant;

use orb_core::Scene;
use serde::{Deserialize, Serialize};

use crate::abi::{ArgKind, ArgSource, KernelAbi, SphereField};
use crate::device::{ComputeDevice, DeviceContext, KernelArg};
use crate::error::{RenderError, RenderResult};
use crate::marshal::{CameraArgs, SphereArrays};
use crate::pixels::PixelBuffer;

/// Quality parameters passed through to the kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderSettings {
    /// Samples per pixel for anti-aliasing
    pub samples_per_pixel: u32,
    /// Maximum ray bounce depth
    pub max_depth: u32,
    /// Ask the kernel for its debug output
    pub debug: bool,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            samples_per_pixel: 50,
            max_depth: 10,
            debug: false,
        }
    }
}

/// Sphere buffers that live for one render call.
struct TransientBuffers<'d, D: ComputeDevice> {
    device: &'d mut D,
    buffers: Vec<(SphereField, D::Buffer)>,
}

impl<'d, D: ComputeDevice> TransientBuffers<'d, D> {
    fn new(device: &'d mut D) -> Self {
        Self {
            device,
            buffers: Vec::new(),
        }
    }

    fn upload(&mut self, field: SphereField, contents: &[u8]) -> RenderResult<()> {
        let buffer = self.device.create_input_buffer(field.name(), contents)?;
        self.buffers.push((field, buffer));
        Ok(())
    }

    /// Run `f` with the device and the uploaded buffers borrowed together.
    fn run<T>(&mut self, f: impl FnOnce(&mut D, &[(SphereField, D::Buffer)]) -> T) -> T {
        f(&mut *self.device, &self.buffers)
    }
}

impl<D: ComputeDevice> Drop for TransientBuffers<'_, D> {
    fn drop(&mut self) {
        for (_, buffer) in self.buffers.drain(..) {
            self.device.release_buffer(buffer);
        }
    }
}

/// Dispatches scenes to a compute device and holds the resulting image.
///
/// Not reentrant: `render` and `update_image_size` must be driven from one
/// thread, one call at a time.
pub struct Renderer<D: ComputeDevice> {
    context: DeviceContext<D>,
    abi: KernelAbi,
    settings: RenderSettings,
    image: PixelBuffer,
}

impl<D: ComputeDevice> Renderer<D> {
    /// Check the device's kernel against `abi` and allocate the output image.
    pub fn new(
        device: D,
        abi: KernelAbi,
        settings: RenderSettings,
        width: u32,
        height: u32,
    ) -> RenderResult<Self> {
        abi.check_signature(&device.signature())?;
        let context = DeviceContext::new(device, width, height)?;

        log::info!(
            "Renderer ready: {}x{}, {} contract ({} arguments)",
            width,
            height,
            abi,
            abi.slots().len()
        );

        Ok(Self {
            context,
            abi,
            settings,
            image: PixelBuffer::new(width, height),
        })
    }

    /// Render `scene` and return the image, blocking until it is on the host.
    pub fn render(&mut self, scene: &Scene) -> RenderResult<&PixelBuffer> {
        let start = Instant::now();

        let abi = self.abi;
        let settings = self.settings;
        let width = self.context.width();
        let height = self.context.height();

        let camera = CameraArgs::from_camera(scene.camera());
        let spheres = SphereArrays::from_spheres(scene.spheres());
        let sphere_count = to_i32(spheres.len());

        let image = &mut self.image;
        let (device, output) = self.context.device_and_output()?;

        let mut transient = TransientBuffers::new(device);
        for field in abi.sphere_fields() {
            transient.upload(field, &spheres.field_bytes(field, abi))?;
        }

        transient.run(|device, buffers| -> RenderResult<()> {
            let mut args = Vec::with_capacity(abi.slots().len());
            for source in abi.slots() {
                let arg = match *source {
                    ArgSource::PixelBuffer => KernelArg::Output(output),
                    ArgSource::Width => KernelArg::Int(to_i32(width as usize)),
                    ArgSource::Height => KernelArg::Int(to_i32(height as usize)),
                    ArgSource::CameraOrigin => KernelArg::Float4(camera.origin),
                    ArgSource::LowerLeftCorner => KernelArg::Float4(camera.lower_left_corner),
                    ArgSource::Horizontal => KernelArg::Float4(camera.horizontal),
                    ArgSource::Vertical => KernelArg::Float4(camera.vertical),
                    ArgSource::Sphere(field) => {
                        let buffer = buffers
                            .iter()
                            .find(|(f, _)| *f == field)
                            .map(|(_, b)| b)
                            .ok_or_else(|| {
                                RenderError::Dispatch(format!("{} was not uploaded", field.name()))
                            })?;
                        match field.kind() {
                            ArgKind::IntArray => KernelArg::IntArray(buffer),
                            _ => KernelArg::FloatArray(buffer),
                        }
                    }
                    ArgSource::SphereCount => KernelArg::Int(sphere_count),
                    ArgSource::DebugFlag => KernelArg::Int(settings.debug as i32),
                    ArgSource::SamplesPerPixel => {
                        KernelArg::Int(to_i32(settings.samples_per_pixel as usize))
                    }
                    ArgSource::MaxDepth => KernelArg::Int(to_i32(settings.max_depth as usize)),
                };
                args.push(arg);
            }

            device.dispatch(&args, width, height)?;
            device.read_output(output, image.pixels_mut())
        })?;
        drop(transient);

        log::debug!(
            "Rendered {} spheres at {}x{} in {:.2?}",
            sphere_count,
            width,
            height,
            start.elapsed()
        );

        Ok(&self.image)
    }

    /// Reallocate the output for a new size. Does not re-render.
    pub fn update_image_size(&mut self, width: u32, height: u32) -> RenderResult<()> {
        if let Err(err) = self.context.recreate_pixel_buffer(width, height) {
            self.image.resize(0, 0);
            return Err(err);
        }
        self.image.resize(width, height);
        log::info!("Resized output to {}x{}", width, height);
        Ok(())
    }

    pub fn image(&self) -> &PixelBuffer {
        &self.image
    }

    pub fn abi(&self) -> KernelAbi {
        self.abi
    }

    pub fn settings(&self) -> RenderSettings {
        self.settings
    }

    pub fn set_settings(&mut self, settings: RenderSettings) {
        self.settings = settings;
    }

    pub fn set_debug(&mut self, debug: bool) {
        self.settings.debug = debug;
    }

    pub fn set_samples_per_pixel(&mut self, samples: u32) {
        self.settings.samples_per_pixel = samples;
    }

    pub fn set_max_depth(&mut self, depth: u32) {
        self.settings.max_depth = depth;
    }

    pub fn context(&self) -> &DeviceContext<D> {
        &self.context
    }

    pub fn context_mut(&mut self) -> &mut DeviceContext<D> {
        &mut self.context
    }

    /// Release all device resources. Later renders fail with `Released`.
    pub fn release(&mut self) {
        self.context.release();
    }
}

fn to_i32(value: usize) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}
