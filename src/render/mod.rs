mod camera;
pub mod gizmo;
pub mod gpu;
#[cfg(test)]
pub mod recording;

pub use camera::{CameraController, CameraGestures, CameraSettings};

use glam::Mat4;
use std::sync::mpsc::{self, TryRecvError};

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("failed to create drawing surface: {0}")]
    SurfaceCreateFailed(String),
    #[error("no compatible GPU adapter found")]
    AdapterUnavailable,
    #[error("failed to create GPU device: {0}")]
    DeviceRequestFailed(String),
    #[error("render device was dropped before it became ready")]
    DeviceLost,
    #[error("unknown mesh handle {0:?}")]
    UnknownMesh(MeshHandle),
    #[error("mesh data is invalid: {0}")]
    InvalidMesh(&'static str),
}

/// Opaque reference to a mesh uploaded to a [`RenderDevice`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MeshHandle(u32);

impl MeshHandle {
    pub fn new(index: u32) -> Self {
        Self(index)
    }

    pub fn index(self) -> u32 {
        self.0
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct MeshVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshData {
    pub vertices: Vec<MeshVertex>,
    pub indices: Vec<u32>,
}

impl MeshData {
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty() || self.indices.is_empty()
    }

    pub fn validate(&self) -> Result<(), RenderError> {
        if self.is_empty() {
            return Err(RenderError::InvalidMesh("no triangles"));
        }
        if self.indices.len() % 3 != 0 {
            return Err(RenderError::InvalidMesh("index count is not a multiple of 3"));
        }
        let vertex_count = self.vertices.len() as u32;
        if self.indices.iter().any(|index| *index >= vertex_count) {
            return Err(RenderError::InvalidMesh("index out of range"));
        }
        Ok(())
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct LineVertex {
    pub position: [f32; 3],
    pub color: [f32; 4],
}

/// One mesh draw: world/view/projection plus the flat material tint.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeshDraw {
    pub mesh: MeshHandle,
    pub world: Mat4,
    pub view: Mat4,
    pub projection: Mat4,
    pub tint: [f32; 4],
    pub highlighted: bool,
}

/// Everything the scene needs from a graphics backend.
///
/// Calls between `begin_frame` and `end_frame` are drawn in call order.
pub trait RenderDevice {
    fn upload_mesh(&mut self, mesh: &MeshData) -> Result<MeshHandle, RenderError>;

    fn resize(&mut self, width: u32, height: u32);

    /// Returns `false` when nothing can be drawn this frame (surface lost,
    /// minimized window); the caller skips the frame's draws.
    fn begin_frame(&mut self, clear_color: [f32; 4]) -> bool;

    fn draw_lines(&mut self, lines: &[LineVertex], view: Mat4, projection: Mat4);

    fn draw_mesh(&mut self, draw: &MeshDraw) -> Result<(), RenderError>;

    fn draw_overlay_text(&mut self, _text: &str) {}

    fn end_frame(&mut self);

    /// Frees GPU resources. Must be safe to call more than once.
    fn release(&mut self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SurfaceSize {
    pub width: u32,
    pub height: u32,
}

impl SurfaceSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// Sending half of a device readiness channel, handed to whoever builds the device.
pub struct DeviceNotifier<D> {
    tx: mpsc::Sender<Result<D, RenderError>>,
}

impl<D> DeviceNotifier<D> {
    pub fn ready(self, device: D) {
        // The receiver is gone when the runtime shut down first.
        let _ = self.tx.send(Ok(device));
    }

    pub fn failed(self, error: RenderError) {
        let _ = self.tx.send(Err(error));
    }
}

/// Receiving half of a device readiness channel. Checking never blocks.
pub struct PendingDevice<D> {
    rx: mpsc::Receiver<Result<D, RenderError>>,
}

pub enum Readiness<D> {
    Waiting,
    Ready(D),
    Failed(RenderError),
}

impl<D> PendingDevice<D> {
    pub fn poll(&self) -> Readiness<D> {
        match self.rx.try_recv() {
            Ok(Ok(device)) => Readiness::Ready(device),
            Ok(Err(error)) => Readiness::Failed(error),
            Err(TryRecvError::Empty) => Readiness::Waiting,
            Err(TryRecvError::Disconnected) => Readiness::Failed(RenderError::DeviceLost),
        }
    }
}

pub fn device_channel<D>() -> (DeviceNotifier<D>, PendingDevice<D>) {
    let (tx, rx) = mpsc::channel();
    (DeviceNotifier { tx }, PendingDevice { rx })
}

/// How a device reaches the runtime at start: already built, or still being built.
pub enum DeviceSource<D> {
    Ready(D),
    Pending(PendingDevice<D>),
}
