//! Headless device that records calls, for tests.

use super::{LineVertex, MeshData, MeshDraw, MeshHandle, RenderDevice, RenderError};
use glam::Mat4;
use std::cell::Cell;
use std::rc::Rc;

#[derive(Debug, Clone, PartialEq)]
pub enum DeviceCall {
    Upload(MeshHandle),
    Resize(u32, u32),
    BeginFrame,
    Lines(usize),
    Mesh(MeshDraw),
    Overlay(String),
    EndFrame,
    Release,
}

#[derive(Debug, Default)]
pub struct RecordingDevice {
    pub calls: Vec<DeviceCall>,
    pub failing_mesh: Option<MeshHandle>,
    /// Shared so a test can still read it after the device was dropped.
    pub releases: Rc<Cell<u32>>,
    uploads: Vec<MeshData>,
}

impl RecordingDevice {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mesh_draws(&self) -> Vec<MeshDraw> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                DeviceCall::Mesh(draw) => Some(*draw),
                _ => None,
            })
            .collect()
    }

    pub fn upload_count(&self) -> usize {
        self.uploads.len()
    }

    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }
}

impl RenderDevice for RecordingDevice {
    fn upload_mesh(&mut self, mesh: &MeshData) -> Result<MeshHandle, RenderError> {
        mesh.validate()?;
        let handle = MeshHandle::new(self.uploads.len() as u32);
        self.uploads.push(mesh.clone());
        self.calls.push(DeviceCall::Upload(handle));
        Ok(handle)
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.calls.push(DeviceCall::Resize(width, height));
    }

    fn begin_frame(&mut self, _clear_color: [f32; 4]) -> bool {
        self.calls.push(DeviceCall::BeginFrame);
        true
    }

    fn draw_lines(&mut self, lines: &[LineVertex], _view: Mat4, _projection: Mat4) {
        self.calls.push(DeviceCall::Lines(lines.len()));
    }

    fn draw_mesh(&mut self, draw: &MeshDraw) -> Result<(), RenderError> {
        if self.failing_mesh == Some(draw.mesh) {
            return Err(RenderError::UnknownMesh(draw.mesh));
        }
        self.calls.push(DeviceCall::Mesh(*draw));
        Ok(())
    }

    fn draw_overlay_text(&mut self, text: &str) {
        self.calls.push(DeviceCall::Overlay(text.to_string()));
    }

    fn end_frame(&mut self) {
        self.calls.push(DeviceCall::EndFrame);
    }

    fn release(&mut self) {
        self.releases.set(self.releases.get() + 1);
        self.calls.push(DeviceCall::Release);
    }
}
