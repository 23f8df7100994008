mod input;
mod timing;

use crate::config::EditorConfig;
use crate::render::gpu::GpuDevice;
use crate::render::{device_channel, DeviceSource, RenderError, SurfaceSize};
use crate::runtime::SceneRuntime;
use input::Shortcut;
use timing::FrameTiming;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Window, WindowAttributes, WindowId};

const APP_TITLE: &str = "Level Editor";
const DOCUMENT_EXTENSION: &str = "level";

pub struct App {
    window: Option<Arc<Window>>,
    runtime: SceneRuntime<GpuDevice>,
    document: Option<PathBuf>,
    timing: FrameTiming,
    target_frame_duration: Duration,
    next_frame_time: Instant,
}

fn document_title(document: Option<&Path>) -> String {
    let name = document
        .and_then(|path| path.file_name())
        .and_then(|name| name.to_str())
        .unwrap_or("untitled");
    format!("{APP_TITLE} - {name}")
}

impl App {
    fn new(config: EditorConfig) -> Self {
        let mut runtime = SceneRuntime::with_asset_library(config);
        runtime.on_entity_selected(|entity| log::info!("Selected '{}'", entity.name()));
        runtime.on_inspector_refresh(|entity| {
            let p = entity.position();
            log::debug!("'{}' at ({:.2}, {:.2}, {:.2})", entity.name(), p.x, p.y, p.z);
        });
        Self {
            window: None,
            runtime,
            document: None,
            timing: FrameTiming::new(document_title(None)),
            target_frame_duration: Duration::from_millis(16),
            next_frame_time: Instant::now(),
        }
    }

    /// Creates the surface here and builds the device on a worker thread; the
    /// runtime picks it up on a later tick.
    fn start_renderer(&mut self, window: &Arc<Window>) {
        let size = window.inner_size();
        let surface_size = SurfaceSize::new(size.width, size.height);
        let (notifier, pending) = device_channel();

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor::default());
        match instance.create_surface(window.clone()) {
            Ok(surface) => {
                let window = window.clone();
                let spawned = std::thread::Builder::new()
                    .name("gpu-init".to_string())
                    .spawn(move || {
                        match GpuDevice::create(&instance, surface, window, surface_size) {
                            Ok(device) => notifier.ready(device),
                            Err(err) => notifier.failed(err),
                        }
                    });
                if let Err(err) = spawned {
                    log::error!("Failed to spawn GPU init thread: {err}");
                }
            }
            Err(err) => notifier.failed(RenderError::SurfaceCreateFailed(err.to_string())),
        }

        self.runtime
            .start(surface_size, DeviceSource::Pending(pending));
    }

    fn update_target_frame_duration(&mut self, window: &Window) {
        let mut target = Duration::from_millis(16);
        if let Some(monitor) = window.current_monitor() {
            if let Some(millihz) = monitor.refresh_rate_millihertz() {
                let hz = millihz as f32 / 1000.0;
                if hz > 1.0 {
                    target = Duration::from_secs_f32(1.0 / hz);
                }
            }
        }
        self.target_frame_duration = target;
        self.next_frame_time = Instant::now() + self.target_frame_duration;
    }

    fn frame(&mut self, event_loop: &ActiveEventLoop) {
        self.timing.update(self.window.as_deref(), Instant::now());
        self.runtime.tick(self.timing.frame_dt);
        if let Some(shortcut) = input::shortcut(self.runtime.input()) {
            self.handle_shortcut(event_loop, shortcut);
        }
        if let Some(overlay) = self
            .runtime
            .device_mut()
            .and_then(|device| device.take_overlay())
        {
            self.timing.set_overlay(Some(overlay));
        }
    }

    fn set_document(&mut self, document: Option<PathBuf>) {
        self.timing
            .set_base_title(document_title(document.as_deref()), self.window.as_deref());
        self.document = document;
    }

    fn handle_shortcut(&mut self, event_loop: &ActiveEventLoop, shortcut: Shortcut) {
        match shortcut {
            Shortcut::Quit => {
                self.runtime.shutdown();
                event_loop.exit();
            }
            Shortcut::NewScene => {
                self.runtime.new_scene();
                self.set_document(None);
            }
            Shortcut::Open => self.handle_open_action(),
            Shortcut::Save => self.handle_save_action(false),
            Shortcut::SaveAs => self.handle_save_action(true),
            Shortcut::AddEntity => {
                let target = self.runtime.camera().target();
                self.runtime.add_default_entity(target);
            }
            Shortcut::DeleteSelected => {
                if let Some(entity) = self.runtime.remove_selected() {
                    log::info!("Deleted '{}'", entity.name());
                }
            }
        }
    }

    fn handle_open_action(&mut self) {
        let Some(path) = rfd::FileDialog::new()
            .add_filter("Level", &[DOCUMENT_EXTENSION])
            .pick_file()
        else {
            return;
        };
        match self.runtime.load(&path) {
            Ok(()) => self.set_document(Some(path)),
            Err(err) => {
                log::warn!("Failed to load level {}: {}", path.display(), err);
                show_error("Open failed", &format!("{}\n\n{}", path.display(), err));
            }
        }
    }

    fn handle_save_action(&mut self, save_as: bool) {
        let path = match (&self.document, save_as) {
            (Some(path), false) => path.clone(),
            _ => {
                let file_name = format!("{}.{}", self.runtime.level().name(), DOCUMENT_EXTENSION);
                let Some(path) = rfd::FileDialog::new()
                    .add_filter("Level", &[DOCUMENT_EXTENSION])
                    .set_file_name(file_name)
                    .save_file()
                else {
                    return;
                };
                path
            }
        };
        match self.runtime.save(&path) {
            Ok(()) => self.set_document(Some(path)),
            Err(err) => {
                log::warn!("Failed to save level {}: {}", path.display(), err);
                show_error("Save failed", &format!("{}\n\n{}", path.display(), err));
            }
        }
    }
}

fn show_error(title: &str, description: &str) {
    rfd::MessageDialog::new()
        .set_level(rfd::MessageLevel::Error)
        .set_title(title)
        .set_description(description)
        .set_buttons(rfd::MessageButtons::Ok)
        .show();
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let window_attrs = WindowAttributes::default()
            .with_title(document_title(None))
            .with_inner_size(PhysicalSize::new(1280u32, 720u32))
            .with_resizable(true);

        let window = Arc::new(
            event_loop
                .create_window(window_attrs)
                .expect("Failed to create window"),
        );
        log::info!("Window created");

        self.start_renderer(&window);
        self.update_target_frame_duration(&window);
        self.window = Some(window);
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        input::forward_event(self.runtime.input_mut(), &event);

        match event {
            WindowEvent::CloseRequested => {
                self.runtime.shutdown();
                event_loop.exit();
            }
            WindowEvent::Resized(new_size) => {
                self.runtime.resize(new_size.width, new_size.height);
                if let Some(window) = self.window.clone() {
                    self.update_target_frame_duration(&window);
                }
            }
            WindowEvent::Moved(_) => {
                if let Some(window) = self.window.clone() {
                    self.update_target_frame_duration(&window);
                }
            }
            WindowEvent::RedrawRequested => {
                self.frame(event_loop);
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        let now = Instant::now();
        if now >= self.next_frame_time {
            if let Some(window) = &self.window {
                window.request_redraw();
            }
            self.next_frame_time = now + self.target_frame_duration;
        }
        event_loop.set_control_flow(ControlFlow::WaitUntil(self.next_frame_time));
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        self.runtime.shutdown();
    }
}

pub fn run() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    log::info!("{APP_TITLE}");
    log::info!("   Right drag: orbit, middle drag: pan, wheel: zoom");
    log::info!("   Ctrl+N/O/S: new/open/save, Insert/Delete: add/remove, Esc: quit");

    let config = EditorConfig::from_env();
    let event_loop = EventLoop::new().expect("Failed to create event loop");
    event_loop.set_control_flow(ControlFlow::Wait);

    let mut app = App::new(config);
    event_loop.run_app(&mut app).expect("Event loop error");

    log::info!("Goodbye");
}
