//! Errors raised while setting up the device or running a render pass.

use std::path::PathBuf;

use thiserror::Error;

use crate::abi::ArgKind;

/// Errors that can occur during device setup or rendering.
#[derive(Error, Debug)]
pub enum RenderError {
    #[error("No suitable compute adapter found")]
    NoAdapter,

    #[error("Device request failed: {0}")]
    RequestDevice(#[from] wgpu::RequestDeviceError),

    #[error("Device does not support the kernel contract: {0}")]
    UnsupportedDevice(String),

    #[error("Failed to read kernel source {path}: {source}")]
    KernelSource {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Kernel compilation failed: {0}")]
    KernelCompile(String),

    #[error("Contract declares {expected} arguments, kernel expects {found}")]
    AbiArity { expected: usize, found: usize },

    #[error("Kernel argument {slot} is {found:?}, contract expects {expected:?}")]
    AbiMismatch {
        slot: usize,
        expected: ArgKind,
        found: ArgKind,
    },

    #[error("Invalid image dimensions {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },

    #[error("Buffer allocation failed: {0}")]
    BufferAllocation(String),

    #[error("No pixel buffer is allocated")]
    NoPixelBuffer,

    #[error("Dispatch failed: {0}")]
    Dispatch(String),

    #[error("Readback failed: {0}")]
    Readback(String),

    #[error("Device has been released")]
    Released,
}

/// Result type for render operations.
pub type RenderResult<T> = Result<T, RenderError>;
