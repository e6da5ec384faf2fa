//! In-memory compute device for tests.
//!
//! Records every allocation, release and dispatch into a shared log and
//! runs a CPU closure in place of the kernel.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::abi::{ArgKind, KernelAbi};
use crate::device::{ComputeDevice, KernelArg};
use crate::error::{RenderError, RenderResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferId(pub u32);

/// Owned copy of one argument as the fake kernel saw it.
#[derive(Debug, Clone, PartialEq)]
pub enum Captured {
    Output(BufferId),
    Int(i32),
    Float4([f32; 4]),
    FloatArray(Vec<f32>),
    IntArray(Vec<i32>),
}

impl Captured {
    pub fn as_int(&self) -> Option<i32> {
        match self {
            Captured::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_float4(&self) -> Option<[f32; 4]> {
        match self {
            Captured::Float4(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_floats(&self) -> Option<&[f32]> {
        match self {
            Captured::FloatArray(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_ints(&self) -> Option<&[i32]> {
        match self {
            Captured::IntArray(v) => Some(v),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Created { id: BufferId, bytes: usize },
    Released(BufferId),
    Dispatched { width: u32, height: u32 },
    Read(BufferId),
    DeviceReleased,
}

#[derive(Debug, Default)]
pub struct DeviceLog {
    events: Vec<Event>,
    sizes: HashMap<BufferId, usize>,
    dispatches: Vec<Vec<Captured>>,
}

impl DeviceLog {
    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn position(&self, event: &Event) -> Option<usize> {
        self.events.iter().position(|e| e == event)
    }

    pub fn count(&self, event: &Event) -> usize {
        self.events.iter().filter(|e| *e == event).count()
    }

    pub fn is_live(&self, id: BufferId) -> bool {
        self.sizes.contains_key(&id)
    }

    pub fn live_buffers(&self) -> usize {
        self.sizes.len()
    }

    pub fn size_of(&self, id: BufferId) -> Option<usize> {
        self.sizes.get(&id).copied()
    }

    /// Arguments of the most recent dispatch.
    pub fn last_dispatch(&self) -> Option<&[Captured]> {
        self.dispatches.last().map(|d| d.as_slice())
    }
}

type Kernel = Box<dyn Fn(&[Captured], u32, u32) -> Vec<u32>>;

pub struct FakeDevice {
    pub signature: Vec<ArgKind>,
    pub fail_output_allocation: bool,
    /// Fail the input allocation with this zero-based index, counted over
    /// the device's lifetime.
    pub fail_input_allocation_at: Option<usize>,
    pub fail_dispatch: bool,
    pub fail_readback: bool,
    kernel: Kernel,
    log: Rc<RefCell<DeviceLog>>,
    contents: HashMap<BufferId, Vec<u8>>,
    next_id: u32,
    inputs_created: usize,
}

impl FakeDevice {
    /// Device whose kernel declares `abi`, writing `y * width + x` per pixel.
    pub fn new(abi: KernelAbi) -> Self {
        Self {
            signature: abi.kinds(),
            fail_output_allocation: false,
            fail_input_allocation_at: None,
            fail_dispatch: false,
            fail_readback: false,
            kernel: Box::new(|_, width, height| (0..width * height).collect()),
            log: Rc::new(RefCell::new(DeviceLog::default())),
            contents: HashMap::new(),
            next_id: 0,
            inputs_created: 0,
        }
    }

    pub fn with_kernel(
        mut self,
        kernel: impl Fn(&[Captured], u32, u32) -> Vec<u32> + 'static,
    ) -> Self {
        self.kernel = Box::new(kernel);
        self
    }

    pub fn log(&self) -> Rc<RefCell<DeviceLog>> {
        Rc::clone(&self.log)
    }

    fn allocate(&mut self, contents: Vec<u8>) -> BufferId {
        let id = BufferId(self.next_id);
        self.next_id += 1;

        let mut log = self.log.borrow_mut();
        log.events.push(Event::Created {
            id,
            bytes: contents.len(),
        });
        log.sizes.insert(id, contents.len());
        self.contents.insert(id, contents);
        id
    }

    fn bytes(&self, id: BufferId) -> RenderResult<&[u8]> {
        self.contents
            .get(&id)
            .map(|b| b.as_slice())
            .ok_or_else(|| RenderError::Dispatch(format!("buffer {:?} is not live", id)))
    }

    fn capture(&self, arg: &KernelArg<'_, BufferId>) -> RenderResult<Captured> {
        Ok(match arg {
            KernelArg::Output(id) => {
                self.bytes(**id)?;
                Captured::Output(**id)
            }
            KernelArg::Int(v) => Captured::Int(*v),
            KernelArg::Float4(v) => Captured::Float4(*v),
            KernelArg::FloatArray(id) => Captured::FloatArray(
                self.bytes(**id)?
                    .chunks_exact(4)
                    .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
                    .collect(),
            ),
            KernelArg::IntArray(id) => Captured::IntArray(
                self.bytes(**id)?
                    .chunks_exact(4)
                    .map(|c| i32::from_le_bytes([c[0], c[1], c[2], c[3]]))
                    .collect(),
            ),
        })
    }
}

impl ComputeDevice for FakeDevice {
    type Buffer = BufferId;

    fn signature(&self) -> Vec<ArgKind> {
        self.signature.clone()
    }

    fn create_output_buffer(&mut self, cells: usize) -> RenderResult<BufferId> {
        if self.fail_output_allocation {
            return Err(RenderError::BufferAllocation("output".to_string()));
        }
        Ok(self.allocate(vec![0; cells * 4]))
    }

    fn create_input_buffer(&mut self, label: &str, contents: &[u8]) -> RenderResult<BufferId> {
        let index = self.inputs_created;
        self.inputs_created += 1;
        if self.fail_input_allocation_at == Some(index) {
            return Err(RenderError::BufferAllocation(label.to_string()));
        }
        Ok(self.allocate(contents.to_vec()))
    }

    fn release_buffer(&mut self, buffer: BufferId) {
        self.contents.remove(&buffer);
        let mut log = self.log.borrow_mut();
        log.sizes.remove(&buffer);
        log.events.push(Event::Released(buffer));
    }

    fn dispatch(
        &mut self,
        args: &[KernelArg<'_, BufferId>],
        width: u32,
        height: u32,
    ) -> RenderResult<()> {
        if self.fail_dispatch {
            return Err(RenderError::Dispatch("injected failure".to_string()));
        }

        let kinds: Vec<ArgKind> = args.iter().map(|a| a.kind()).collect();
        if kinds != self.signature {
            return Err(RenderError::Dispatch("argument kinds do not match kernel".to_string()));
        }

        let captured = args
            .iter()
            .map(|a| self.capture(a))
            .collect::<RenderResult<Vec<_>>>()?;

        let output = args
            .iter()
            .find_map(|a| match a {
                KernelArg::Output(id) => Some(**id),
                _ => None,
            })
            .ok_or_else(|| RenderError::Dispatch("no output argument".to_string()))?;

        let pixels = (self.kernel)(&captured, width, height);
        let dst = self
            .contents
            .get_mut(&output)
            .ok_or_else(|| RenderError::Dispatch("output buffer is not live".to_string()))?;
        for (cell, value) in dst.chunks_exact_mut(4).zip(pixels) {
            cell.copy_from_slice(&value.to_le_bytes());
        }

        let mut log = self.log.borrow_mut();
        log.events.push(Event::Dispatched { width, height });
        log.dispatches.push(captured);
        Ok(())
    }

    fn read_output(&mut self, buffer: &BufferId, dst: &mut [u32]) -> RenderResult<()> {
        if self.fail_readback {
            return Err(RenderError::Readback("injected failure".to_string()));
        }
        let bytes = self
            .contents
            .get(buffer)
            .ok_or_else(|| RenderError::Readback(format!("buffer {:?} is not live", buffer)))?;

        for (out, c) in dst.iter_mut().zip(bytes.chunks_exact(4)) {
            *out = u32::from_le_bytes([c[0], c[1], c[2], c[3]]);
        }
        self.log.borrow_mut().events.push(Event::Read(*buffer));
        Ok(())
    }

    fn release(&mut self) {
        self.log.borrow_mut().events.push(Event::DeviceReleased);
    }
}
