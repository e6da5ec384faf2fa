//! Compute device seam and the long-lived device context.

use crate::abi::ArgKind;
use crate::error::{RenderError, RenderResult};

/// One bound kernel argument.
#[derive(Debug)]
pub enum KernelArg<'a, B> {
    Output(&'a B),
    Int(i32),
    Float4([f32; 4]),
    FloatArray(&'a B),
    IntArray(&'a B),
}

impl<'a, B> KernelArg<'a, B> {
    pub fn kind(&self) -> ArgKind {
        match self {
            KernelArg::Output(_) => ArgKind::OutputPixels,
            KernelArg::Int(_) => ArgKind::Int,
            KernelArg::Float4(_) => ArgKind::Float4,
            KernelArg::FloatArray(_) => ArgKind::FloatArray,
            KernelArg::IntArray(_) => ArgKind::IntArray,
        }
    }

    /// The device buffer behind a buffer argument.
    pub fn buffer(&self) -> Option<&'a B> {
        match self {
            KernelArg::Output(b) | KernelArg::FloatArray(b) | KernelArg::IntArray(b) => Some(b),
            KernelArg::Int(_) | KernelArg::Float4(_) => None,
        }
    }
}

/// A compute device able to run the per-pixel kernel.
///
/// Implementations own the device handle, queue and compiled kernel.
/// Buffers are plain handles; the caller decides when to release them.
pub trait ComputeDevice {
    type Buffer;

    /// Argument kinds the compiled kernel declares, in slot order.
    fn signature(&self) -> Vec<ArgKind>;

    /// Allocate a write-only output buffer of `cells` 32-bit cells.
    fn create_output_buffer(&mut self, cells: usize) -> RenderResult<Self::Buffer>;

    /// Allocate a read-only input buffer initialized from `contents`.
    fn create_input_buffer(&mut self, label: &str, contents: &[u8]) -> RenderResult<Self::Buffer>;

    fn release_buffer(&mut self, buffer: Self::Buffer);

    /// Bind `args` to the kernel slots in order and run it over a
    /// `width x height` domain, one invocation per pixel.
    fn dispatch(
        &mut self,
        args: &[KernelArg<'_, Self::Buffer>],
        width: u32,
        height: u32,
    ) -> RenderResult<()>;

    /// Blocking copy of an output buffer into `dst`.
    fn read_output(&mut self, buffer: &Self::Buffer, dst: &mut [u32]) -> RenderResult<()>;

    /// Tear down kernel, queue and device, in that order.
    fn release(&mut self);
}

/// Device plus the output pixel buffer sized to the current image.
///
/// At most one output buffer exists at a time. Dropping the context
/// releases everything it owns.
pub struct DeviceContext<D: ComputeDevice> {
    device: D,
    pixel_buffer: Option<D::Buffer>,
    width: u32,
    height: u32,
    released: bool,
}

impl<D: ComputeDevice> DeviceContext<D> {
    /// Take ownership of `device` and allocate the initial output buffer.
    pub fn new(device: D, width: u32, height: u32) -> RenderResult<Self> {
        let mut context = Self {
            device,
            pixel_buffer: None,
            width: 0,
            height: 0,
            released: false,
        };
        context.recreate_pixel_buffer(width, height)?;
        Ok(context)
    }

    /// Replace the output buffer with one sized `width * height`.
    ///
    /// The old buffer is released before the new one is allocated. If the
    /// allocation fails the context is left without an output buffer.
    pub fn recreate_pixel_buffer(&mut self, width: u32, height: u32) -> RenderResult<()> {
        if self.released {
            return Err(RenderError::Released);
        }
        if width == 0 || height == 0 {
            return Err(RenderError::InvalidDimensions { width, height });
        }

        if let Some(old) = self.pixel_buffer.take() {
            self.device.release_buffer(old);
        }
        self.width = 0;
        self.height = 0;

        let cells = width as usize * height as usize;
        let buffer = self.device.create_output_buffer(cells)?;
        self.pixel_buffer = Some(buffer);
        self.width = width;
        self.height = height;

        log::debug!("Allocated {}x{} pixel buffer ({} cells)", width, height, cells);
        Ok(())
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn cell_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    pub fn is_released(&self) -> bool {
        self.released
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    pub fn device_mut(&mut self) -> &mut D {
        &mut self.device
    }

    pub fn pixel_buffer(&self) -> Option<&D::Buffer> {
        self.pixel_buffer.as_ref()
    }

    /// Borrow the device mutably alongside the output buffer.
    pub fn device_and_output(&mut self) -> RenderResult<(&mut D, &D::Buffer)> {
        if self.released {
            return Err(RenderError::Released);
        }
        match self.pixel_buffer.as_ref() {
            Some(buffer) => Ok((&mut self.device, buffer)),
            None => Err(RenderError::NoPixelBuffer),
        }
    }

    /// Release the output buffer, then the device. Safe to call twice.
    pub fn release(&mut self) {
        if self.released {
            return;
        }
        if let Some(buffer) = self.pixel_buffer.take() {
            self.device.release_buffer(buffer);
        }
        self.device.release();
        self.released = true;
        log::debug!("Device context released");
    }
}

impl<D: ComputeDevice> Drop for DeviceContext<D> {
    fn drop(&mut self) {
        self.release();
    }
}
