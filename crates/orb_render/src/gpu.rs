//! wgpu-backed compute device.
//!
//! Each kernel slot maps to `@group(0) @binding(slot)`. The output is a
//! read-write storage buffer, sphere arrays are read-only storage buffers
//! and scalar or four-lane values are 16-byte uniform buffers created for
//! the dispatch that uses them.

use std::path::{Path, PathBuf};
use std::sync::mpsc;

use wgpu::util::DeviceExt;

use crate::abi::{ArgKind, KernelAbi};
use crate::device::{ComputeDevice, KernelArg};
use crate::error::{RenderError, RenderResult};
use crate::renderer::{RenderSettings, Renderer};

/// Threads per workgroup along x and y. Must match `@workgroup_size` in the kernel.
pub const WORKGROUP_SIZE: u32 = 8;

/// WGSL source of the compute kernel and the entry point to run.
#[derive(Debug, Clone)]
pub struct KernelSource {
    pub path: Option<PathBuf>,
    pub code: String,
    pub entry_point: String,
}

impl KernelSource {
    /// Read kernel source from disk.
    pub fn load(path: impl AsRef<Path>, entry_point: &str) -> RenderResult<Self> {
        let path = path.as_ref();
        let code = std::fs::read_to_string(path).map_err(|source| RenderError::KernelSource {
            path: path.to_path_buf(),
            source,
        })?;

        log::info!("Loaded kernel source from {:?}", path);

        Ok(Self {
            path: Some(path.to_path_buf()),
            code,
            entry_point: entry_point.to_string(),
        })
    }

    pub fn from_wgsl(code: impl Into<String>, entry_point: &str) -> Self {
        Self {
            path: None,
            code: code.into(),
            entry_point: entry_point.to_string(),
        }
    }
}

struct GpuState {
    device: wgpu::Device,
    queue: wgpu::Queue,
    layout: wgpu::BindGroupLayout,
    pipeline: wgpu::ComputePipeline,
}

/// Headless GPU device running one compiled kernel.
pub struct WgpuDevice {
    state: Option<GpuState>,
    abi: KernelAbi,
    adapter_info: wgpu::AdapterInfo,
}

impl WgpuDevice {
    /// Pick an adapter, compile `source` and validate it against `abi`.
    pub async fn new(source: &KernelSource, abi: KernelAbi) -> RenderResult<Self> {
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..Default::default()
        });

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .ok_or(RenderError::NoAdapter)?;

        let adapter_info = adapter.get_info();
        log::info!(
            "Using adapter: {} ({:?})",
            adapter_info.name,
            adapter_info.backend
        );

        let downlevel = adapter.get_downlevel_capabilities();
        if !downlevel
            .flags
            .contains(wgpu::DownlevelFlags::COMPUTE_SHADERS)
        {
            return Err(RenderError::UnsupportedDevice(
                "compute shaders are not available".to_string(),
            ));
        }

        let required_limits = required_limits(abi, &adapter.limits())?;

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("Orb Device"),
                    required_features: wgpu::Features::empty(),
                    required_limits,
                    memory_hints: Default::default(),
                },
                None,
            )
            .await?;

        let entries: Vec<wgpu::BindGroupLayoutEntry> = abi
            .slots()
            .iter()
            .enumerate()
            .map(|(slot, source)| layout_entry(slot as u32, source.kind()))
            .collect();

        // Binding or entry point mismatches surface as validation errors here
        device.push_error_scope(wgpu::ErrorFilter::Validation);

        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Kernel Argument Layout"),
            entries: &entries,
        });

        let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Orb Kernel"),
            source: wgpu::ShaderSource::Wgsl(source.code.as_str().into()),
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Kernel Pipeline Layout"),
            bind_group_layouts: &[&layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some("Kernel Pipeline"),
            layout: Some(&pipeline_layout),
            module: &module,
            entry_point: &source.entry_point,
            compilation_options: Default::default(),
            cache: None,
        });

        if let Some(err) = device.pop_error_scope().await {
            return Err(RenderError::KernelCompile(err.to_string()));
        }

        log::info!(
            "Compiled kernel entry point '{}' against the {} contract",
            source.entry_point,
            abi
        );

        Ok(Self {
            state: Some(GpuState {
                device,
                queue,
                layout,
                pipeline,
            }),
            abi,
            adapter_info,
        })
    }

    pub fn adapter_info(&self) -> &wgpu::AdapterInfo {
        &self.adapter_info
    }

    fn state(&self) -> RenderResult<&GpuState> {
        self.state.as_ref().ok_or(RenderError::Released)
    }
}

impl Drop for WgpuDevice {
    fn drop(&mut self) {
        self.release();
    }
}

/// Limits needed to bind every slot of `abi`, checked against the adapter.
fn required_limits(abi: KernelAbi, supported: &wgpu::Limits) -> RenderResult<wgpu::Limits> {
    let storage = abi.slots().iter().filter(|s| s.kind().is_buffer()).count() as u32;
    let uniform = abi.slots().len() as u32 - storage;

    if supported.max_storage_buffers_per_shader_stage < storage {
        return Err(RenderError::UnsupportedDevice(format!(
            "{} storage buffers needed, adapter supports {}",
            storage, supported.max_storage_buffers_per_shader_stage
        )));
    }
    if supported.max_uniform_buffers_per_shader_stage < uniform {
        return Err(RenderError::UnsupportedDevice(format!(
            "{} uniform buffers needed, adapter supports {}",
            uniform, supported.max_uniform_buffers_per_shader_stage
        )));
    }

    let defaults = wgpu::Limits::default();
    Ok(wgpu::Limits {
        max_storage_buffers_per_shader_stage: storage
            .max(defaults.max_storage_buffers_per_shader_stage),
        max_uniform_buffers_per_shader_stage: uniform
            .max(defaults.max_uniform_buffers_per_shader_stage),
        ..defaults
    })
}

fn binding_type(kind: ArgKind) -> wgpu::BufferBindingType {
    match kind {
        ArgKind::OutputPixels => wgpu::BufferBindingType::Storage { read_only: false },
        ArgKind::FloatArray | ArgKind::IntArray => {
            wgpu::BufferBindingType::Storage { read_only: true }
        }
        ArgKind::Int | ArgKind::Float4 => wgpu::BufferBindingType::Uniform,
    }
}

fn layout_entry(binding: u32, kind: ArgKind) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::COMPUTE,
        ty: wgpu::BindingType::Buffer {
            ty: binding_type(kind),
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

/// 16-byte uniform contents for a value argument.
/// Backing for one bind group entry.
#[derive(Debug, PartialEq)]
enum Binding<'a, B> {
    Buffer(&'a B),
    Uniform([u8; 16]),
}

fn binding<'a, B>(arg: &KernelArg<'a, B>) -> Binding<'a, B> {
    let mut bytes = [0u8; 16];
    match *arg {
        KernelArg::Output(b) | KernelArg::FloatArray(b) | KernelArg::IntArray(b) => {
            return Binding::Buffer(b)
        }
        KernelArg::Int(v) => bytes[..4].copy_from_slice(&v.to_le_bytes()),
        KernelArg::Float4(v) => bytes.copy_from_slice(bytemuck::cast_slice(&v[..])),
    }
    Binding::Uniform(bytes)
}

impl ComputeDevice for WgpuDevice {
    type Buffer = wgpu::Buffer;

    fn signature(&self) -> Vec<ArgKind> {
        self.abi.kinds()
    }

    fn create_output_buffer(&mut self, cells: usize) -> RenderResult<wgpu::Buffer> {
        let state = self.state()?;
        let size = (cells * 4) as u64;

        let limit = state.device.limits().max_storage_buffer_binding_size as u64;
        if size > limit {
            return Err(RenderError::BufferAllocation(format!(
                "{} byte pixel buffer exceeds the {} byte binding limit",
                size, limit
            )));
        }

        state.device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
        let buffer = state.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Pixel Buffer"),
            size,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC,
            mapped_at_creation: false,
        });
        if let Some(err) = pollster::block_on(state.device.pop_error_scope()) {
            return Err(RenderError::BufferAllocation(err.to_string()));
        }

        Ok(buffer)
    }

    fn create_input_buffer(&mut self, label: &str, contents: &[u8]) -> RenderResult<wgpu::Buffer> {
        let state = self.state()?;

        state.device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
        let buffer = state
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(label),
                contents,
                usage: wgpu::BufferUsages::STORAGE,
            });
        if let Some(err) = pollster::block_on(state.device.pop_error_scope()) {
            return Err(RenderError::BufferAllocation(format!("{}: {}", label, err)));
        }

        Ok(buffer)
    }

    fn release_buffer(&mut self, buffer: wgpu::Buffer) {
        buffer.destroy();
    }

    fn dispatch(
        &mut self,
        args: &[KernelArg<'_, wgpu::Buffer>],
        width: u32,
        height: u32,
    ) -> RenderResult<()> {
        let state = self.state()?;
        let device = &state.device;

        let bindings: Vec<Binding<'_, wgpu::Buffer>> = args.iter().map(binding).collect();

        device.push_error_scope(wgpu::ErrorFilter::Validation);

        let uniforms: Vec<Option<wgpu::Buffer>> = bindings
            .iter()
            .map(|b| match b {
                Binding::Buffer(_) => None,
                Binding::Uniform(bytes) => {
                    Some(device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                        label: Some("Kernel Uniform"),
                        contents: bytes,
                        usage: wgpu::BufferUsages::UNIFORM,
                    }))
                }
            })
            .collect();

        let entries: Vec<wgpu::BindGroupEntry> = bindings
            .iter()
            .zip(&uniforms)
            .enumerate()
            .filter_map(|(slot, (b, uniform))| {
                let buffer = match b {
                    Binding::Buffer(buffer) => Some(*buffer),
                    Binding::Uniform(_) => uniform.as_ref(),
                }?;
                Some(wgpu::BindGroupEntry {
                    binding: slot as u32,
                    resource: buffer.as_entire_binding(),
                })
            })
            .collect();

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Kernel Arguments"),
            layout: &state.layout,
            entries: &entries,
        });

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Render Encoder"),
        });
        {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("Render Pass"),
                timestamp_writes: None,
            });
            pass.set_pipeline(&state.pipeline);
            pass.set_bind_group(0, &bind_group, &[]);
            pass.dispatch_workgroups(
                width.div_ceil(WORKGROUP_SIZE),
                height.div_ceil(WORKGROUP_SIZE),
                1,
            );
        }
        state.queue.submit(Some(encoder.finish()));

        if let Some(err) = pollster::block_on(device.pop_error_scope()) {
            return Err(RenderError::Dispatch(err.to_string()));
        }

        Ok(())
    }

    fn read_output(&mut self, buffer: &wgpu::Buffer, dst: &mut [u32]) -> RenderResult<()> {
        let state = self.state()?;
        let device = &state.device;
        let size = buffer.size();

        if (dst.len() * 4) as u64 > size {
            return Err(RenderError::Readback(format!(
                "{} cells requested from a {} byte buffer",
                dst.len(),
                size
            )));
        }

        device.push_error_scope(wgpu::ErrorFilter::Validation);

        let staging = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Readback Buffer"),
            size,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Readback Encoder"),
        });
        encoder.copy_buffer_to_buffer(buffer, 0, &staging, 0, size);
        state.queue.submit(Some(encoder.finish()));

        if let Some(err) = pollster::block_on(device.pop_error_scope()) {
            return Err(RenderError::Readback(err.to_string()));
        }

        let slice = staging.slice(..);
        let (tx, rx) = mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });
        device.poll(wgpu::Maintain::Wait);

        rx.recv()
            .map_err(|e| RenderError::Readback(e.to_string()))?
            .map_err(|e| RenderError::Readback(e.to_string()))?;

        {
            let data = slice.get_mapped_range();
            for (out, c) in dst.iter_mut().zip(data.chunks_exact(4)) {
                *out = u32::from_le_bytes([c[0], c[1], c[2], c[3]]);
            }
        }
        staging.unmap();
        staging.destroy();

        Ok(())
    }

    fn release(&mut self) {
        if let Some(state) = self.state.take() {
            let GpuState {
                device,
                queue,
                layout,
                pipeline,
            } = state;
            drop(pipeline);
            drop(layout);
            drop(queue);
            device.destroy();
            log::debug!("Released device on {}", self.adapter_info.name);
        }
    }
}

impl Renderer<WgpuDevice> {
    /// Create a GPU renderer for `source`, blocking on device setup.
    pub fn with_wgpu(
        source: &KernelSource,
        abi: KernelAbi,
        settings: RenderSettings,
        width: u32,
        height: u32,
    ) -> RenderResult<Self> {
        let device = pollster::block_on(WgpuDevice::new(source, abi))?;
        Renderer::new(device, abi, settings, width, height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_missing_kernel() {
        let err = KernelSource::load("does/not/exist.wgsl", "raytrace").unwrap_err();
        match err {
            RenderError::KernelSource { path, .. } => {
                assert_eq!(path, PathBuf::from("does/not/exist.wgsl"));
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_bundled_kernel_declares_every_binding() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../kernels/raytracer.wgsl");
        let source = KernelSource::load(&path, "raytrace").unwrap();

        for slot in 0..KernelAbi::Extended.slots().len() {
            let decl = format!("@group(0) @binding({})", slot);
            assert!(source.code.contains(&decl), "missing {}", decl);
        }
        assert!(source.code.contains("@workgroup_size(8, 8, 1)"));
        assert!(source.code.contains("fn raytrace("));

        let inline = KernelSource::from_wgsl(source.code.clone(), "raytrace");
        assert_eq!(inline.path, None);
        assert_eq!(inline.code, source.code);
        assert_eq!(inline.entry_point, source.entry_point);
    }

    #[test]
    fn test_binding_types() {
        assert_eq!(
            binding_type(ArgKind::OutputPixels),
            wgpu::BufferBindingType::Storage { read_only: false }
        );
        assert_eq!(
            binding_type(ArgKind::IntArray),
            wgpu::BufferBindingType::Storage { read_only: true }
        );
        assert_eq!(binding_type(ArgKind::Float4), wgpu::BufferBindingType::Uniform);
    }

    #[test]
    fn test_uniform_padding() {
        let int: KernelArg<'_, ()> = KernelArg::Int(-2);
        let Binding::Uniform(bytes) = binding(&int) else {
            panic!("int argument should be a uniform");
        };
        assert_eq!(&bytes[..4], &(-2i32).to_le_bytes());
        assert!(bytes[4..].iter().all(|b| *b == 0));

        let vec: KernelArg<'_, ()> = KernelArg::Float4([1.0, 2.0, 3.0, 0.0]);
        let Binding::Uniform(bytes) = binding(&vec) else {
            panic!("float4 argument should be a uniform");
        };
        assert_eq!(&bytes[4..8], &2.0f32.to_le_bytes());
        assert_eq!(&bytes[12..], &0.0f32.to_le_bytes());
    }

    #[test]
    fn test_every_argument_has_a_binding() {
        let output = 7u32;
        let spheres = 9u32;
        let args: Vec<KernelArg<'_, u32>> = vec![
            KernelArg::Output(&output),
            KernelArg::Int(3),
            KernelArg::Float4([0.0; 4]),
            KernelArg::FloatArray(&spheres),
            KernelArg::IntArray(&spheres),
        ];
        let bindings: Vec<_> = args.iter().map(binding).collect();

        assert_eq!(bindings.len(), args.len());
        assert_eq!(bindings[0], Binding::Buffer(&output));
        assert!(matches!(bindings[1], Binding::Uniform(_)));
        assert!(matches!(bindings[2], Binding::Uniform(_)));
        assert_eq!(bindings[3], Binding::Buffer(&spheres));
        assert_eq!(bindings[4], Binding::Buffer(&spheres));
    }

    #[test]
    fn test_required_limits() {
        let mut supported = wgpu::Limits::default();
        supported.max_storage_buffers_per_shader_stage = 16;

        let limits = required_limits(KernelAbi::Extended, &supported).unwrap();
        assert_eq!(limits.max_storage_buffers_per_shader_stage, 11);

        let limits = required_limits(KernelAbi::Simple, &supported).unwrap();
        assert_eq!(limits.max_storage_buffers_per_shader_stage, 8);

        supported.max_storage_buffers_per_shader_stage = 8;
        assert!(matches!(
            required_limits(KernelAbi::Extended, &supported),
            Err(RenderError::UnsupportedDevice(_))
        ));
    }
}
