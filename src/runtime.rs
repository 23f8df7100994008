//! The per-frame scene driver the host window pumps.
//!
//! `SceneRuntime` owns the active level, the camera and the input sampler.
//! The host forwards raw input into [`SceneRuntime::input_mut`], calls
//! [`SceneRuntime::tick`] from its idle callback and routes menu actions to
//! `new_scene` / `save` / `load`. Nothing in here blocks.

use crate::assets::{AssetLibrary, AssetResolver};
use crate::config::EditorConfig;
use crate::input::{InputSampler, PointerButton};
use crate::render::gizmo;
use crate::render::{
    CameraController, CameraGestures, DeviceSource, PendingDevice, Readiness, RenderDevice,
    SurfaceSize,
};
use crate::scene::serialization::{self, SerializationError};
use crate::scene::{ChangeNotifier, Entity, EntityId, Level, SubscriptionId, Transform};
use glam::Vec3;
use std::cell::Cell;
use std::path::Path;
use std::rc::Rc;

enum DeviceState<D> {
    Detached,
    Pending(PendingDevice<D>),
    Ready(D),
    Failed,
    Shutdown,
}

struct Selection {
    id: EntityId,
    subscription: SubscriptionId,
}

pub struct SceneRuntime<D: RenderDevice> {
    config: EditorConfig,
    level: Level,
    camera: CameraController,
    input: InputSampler,
    assets: Box<dyn AssetResolver>,
    device: DeviceState<D>,
    surface: Option<SurfaceSize>,
    selection: Option<Selection>,
    // The level was created here rather than loaded from a document.
    fresh_level: bool,
    // Set by the selected entity's change listener, cleared once per tick.
    selection_dirty: Rc<Cell<bool>>,
    elapsed: f32,
    entity_selected: ChangeNotifier<Entity>,
    inspector_refresh: ChangeNotifier<Entity>,
}

impl<D: RenderDevice> SceneRuntime<D> {
    pub fn new(config: EditorConfig, assets: Box<dyn AssetResolver>) -> Self {
        let camera = CameraController::new(config.camera, 1.0);
        let level = Level::new(config.default_level_name.clone());
        Self {
            config,
            level,
            camera,
            input: InputSampler::new(),
            assets,
            device: DeviceState::Detached,
            surface: None,
            selection: None,
            fresh_level: true,
            selection_dirty: Rc::new(Cell::new(false)),
            elapsed: 0.0,
            entity_selected: ChangeNotifier::new(),
            inspector_refresh: ChangeNotifier::new(),
        }
    }

    /// Uses an [`AssetLibrary`] rooted at the configured asset directory.
    pub fn with_asset_library(config: EditorConfig) -> Self {
        let assets = AssetLibrary::new(config.asset_root.clone());
        Self::new(config, Box::new(assets))
    }

    /// Brings up rendering. Content loads as soon as the device is ready,
    /// either right away or on a later tick. Calling it again does nothing.
    pub fn start(&mut self, size: SurfaceSize, source: DeviceSource<D>) {
        if !matches!(self.device, DeviceState::Detached) {
            log::debug!("Scene runtime already started");
            return;
        }
        self.surface = Some(size);
        self.camera.update_aspect_ratio(size.width, size.height);
        match source {
            DeviceSource::Ready(device) => self.attach(device),
            DeviceSource::Pending(pending) => {
                log::info!("Waiting for render device");
                self.device = DeviceState::Pending(pending);
                self.poll_device();
            }
        }
    }

    #[allow(dead_code)]
    pub fn is_started(&self) -> bool {
        !matches!(self.device, DeviceState::Detached)
    }

    #[allow(dead_code)]
    pub fn is_device_ready(&self) -> bool {
        matches!(self.device, DeviceState::Ready(_))
    }

    /// One frame: input, camera, entity motion, selection, then drawing.
    pub fn tick(&mut self, frame_dt: f32) {
        let frame_dt = if frame_dt.is_finite() && frame_dt > 0.0 {
            frame_dt
        } else {
            0.0
        };
        self.poll_device();
        self.elapsed += frame_dt;

        self.input.update();
        let gestures = CameraGestures::from_input(&self.input);
        self.camera.update(&gestures, frame_dt);
        self.level
            .advance(frame_dt, self.elapsed, self.config.spin_mode);

        if self.input.is_down(PointerButton::Left) {
            let picked = self.pick_at_pointer();
            if picked.is_some() {
                self.select(picked);
            }
        }
        if self.selection_dirty.replace(false) {
            let selected = self.selected();
            if let Some(entity) = selected.and_then(|id| self.level.get(id)) {
                log::debug!("Refreshing inspector for '{}'", entity.name());
                self.inspector_refresh.emit(entity);
            }
        }

        self.draw();
    }

    /// Safe at any time. Ignored until `start`, and for zero-sized surfaces.
    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        match &mut self.device {
            DeviceState::Detached | DeviceState::Failed | DeviceState::Shutdown => {}
            DeviceState::Pending(_) => {
                self.surface = Some(SurfaceSize::new(width, height));
            }
            DeviceState::Ready(device) => {
                log::debug!("Resize to {width}x{height}");
                self.surface = Some(SurfaceSize::new(width, height));
                device.resize(width, height);
                self.camera.update_aspect_ratio(width, height);
            }
        }
    }

    /// Replaces the level with an empty one. The camera keeps its view.
    pub fn new_scene(&mut self) {
        self.clear_selection();
        self.level = Level::new(self.config.default_level_name.clone());
        self.fresh_level = true;
        log::info!("New scene '{}'", self.level.name());
    }

    pub fn save(&self, path: &Path) -> Result<(), SerializationError> {
        serialization::save_level_to_file(&self.level, path)?;
        log::info!(
            "Saved level '{}' ({} entities) to {}",
            self.level.name(),
            self.level.len(),
            path.display()
        );
        Ok(())
    }

    /// Replaces the level only if the file loads; otherwise the current level
    /// is left as it was.
    pub fn load(&mut self, path: &Path) -> Result<(), SerializationError> {
        let level = serialization::load_level_from_file(path)?;
        self.clear_selection();
        self.level = level;
        self.fresh_level = false;
        self.assets.forget_failures();
        self.resolve_all();
        log::info!(
            "Loaded level '{}' ({} entities) from {}",
            self.level.name(),
            self.level.len(),
            path.display()
        );
        Ok(())
    }

    /// Appends an entity and resolves its mesh if the device is up.
    pub fn add_entity(&mut self, mut entity: Entity) -> EntityId {
        if let DeviceState::Ready(device) = &mut self.device {
            resolve_entity(self.assets.as_mut(), device, &mut entity);
        }
        self.level.add(entity)
    }

    /// Adds the configured default model at `position`.
    pub fn add_default_entity(&mut self, position: Vec3) -> EntityId {
        let model = self.config.default_model.clone();
        let name = format!("{} {}", model, self.level.len() + 1);
        self.add_entity(Entity::new(name, model).with_transform(Transform::from_position(position)))
    }

    pub fn remove_entity(&mut self, id: EntityId) -> Option<Entity> {
        if self.selected() == Some(id) {
            self.clear_selection();
        }
        let removed = self.level.remove(id)?;
        log::debug!("Removed entity '{}'", removed.name());
        Some(removed)
    }

    pub fn remove_selected(&mut self) -> Option<Entity> {
        let id = self.selected()?;
        self.remove_entity(id)
    }

    /// Selection placeholder: always the first entity, no ray test.
    pub fn pick_at_pointer(&self) -> Option<EntityId> {
        self.level.first().map(Entity::id)
    }

    /// Changes the selected entity. Observers hear about it only when the
    /// selection actually changes to an entity.
    pub fn select(&mut self, id: Option<EntityId>) -> bool {
        if self.selected() == id {
            return false;
        }
        let Some(id) = id else {
            self.clear_selection();
            return true;
        };
        if self.level.get(id).is_none() {
            return false;
        }
        self.clear_selection();
        let Some(entity) = self.level.get_mut(id) else {
            return false;
        };
        let dirty = self.selection_dirty.clone();
        let subscription = entity.subscribe(move |_| dirty.set(true));
        entity.set_selected(true);
        self.selection = Some(Selection { id, subscription });
        log::debug!("Selected '{}'", entity.name());
        self.entity_selected.emit(entity);
        true
    }

    pub fn selected(&self) -> Option<EntityId> {
        self.selection.as_ref().map(|selection| selection.id)
    }

    #[allow(dead_code)]
    pub fn selected_entity(&self) -> Option<&Entity> {
        self.level.get(self.selected()?)
    }

    pub fn on_entity_selected<F>(&mut self, listener: F) -> SubscriptionId
    where
        F: FnMut(&Entity) + 'static,
    {
        self.entity_selected.subscribe(listener)
    }

    /// Fires after a tick in which the selected entity changed.
    pub fn on_inspector_refresh<F>(&mut self, listener: F) -> SubscriptionId
    where
        F: FnMut(&Entity) + 'static,
    {
        self.inspector_refresh.subscribe(listener)
    }

    pub fn level(&self) -> &Level {
        &self.level
    }

    #[allow(dead_code)]
    pub fn entity_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.level.get_mut(id)
    }

    pub fn camera(&self) -> &CameraController {
        &self.camera
    }

    pub fn input(&self) -> &InputSampler {
        &self.input
    }

    pub fn input_mut(&mut self) -> &mut InputSampler {
        &mut self.input
    }

    #[allow(dead_code)]
    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    #[allow(dead_code)]
    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    #[allow(dead_code)]
    pub fn device(&self) -> Option<&D> {
        match &self.device {
            DeviceState::Ready(device) => Some(device),
            _ => None,
        }
    }

    pub fn device_mut(&mut self) -> Option<&mut D> {
        match &mut self.device {
            DeviceState::Ready(device) => Some(device),
            _ => None,
        }
    }

    /// Releases and drops the device. Only the first call does anything.
    pub fn shutdown(&mut self) {
        let state = std::mem::replace(&mut self.device, DeviceState::Shutdown);
        if let DeviceState::Ready(mut device) = state {
            device.release();
            log::info!("Scene runtime shut down");
        }
    }

    fn poll_device(&mut self) {
        let DeviceState::Pending(pending) = &self.device else {
            return;
        };
        match pending.poll() {
            Readiness::Waiting => {}
            Readiness::Ready(device) => self.attach(device),
            Readiness::Failed(err) => {
                log::error!("Render device unavailable: {err}");
                self.device = DeviceState::Failed;
            }
        }
    }

    fn attach(&mut self, mut device: D) {
        if let Some(size) = self.surface {
            device.resize(size.width, size.height);
            self.camera.update_aspect_ratio(size.width, size.height);
        }
        self.assets.forget_uploads();
        self.device = DeviceState::Ready(device);
        log::info!("Render device attached");

        if self.fresh_level && self.level.is_empty() && self.config.spawn_default_entity {
            self.add_default_entity(Vec3::ZERO);
        }
        self.resolve_all();
    }

    fn resolve_all(&mut self) {
        let DeviceState::Ready(device) = &mut self.device else {
            return;
        };
        for entity in self.level.entities_mut() {
            resolve_entity(self.assets.as_mut(), device, entity);
        }
    }

    fn clear_selection(&mut self) {
        if let Some(selection) = self.selection.take() {
            if let Some(entity) = self.level.get_mut(selection.id) {
                entity.unsubscribe(selection.subscription);
                entity.set_selected(false);
            }
        }
        self.selection_dirty.set(false);
    }

    fn draw(&mut self) {
        let DeviceState::Ready(device) = &mut self.device else {
            return;
        };
        if !device.begin_frame(self.config.clear_color) {
            return;
        }
        let view = self.camera.view();
        let projection = self.camera.projection();
        device.draw_lines(&gizmo::axis_lines(self.config.gizmo_length), view, projection);
        self.level.draw(device, &self.camera);
        if self.config.debug_overlay {
            device.draw_overlay_text(&self.camera.debug_summary());
        }
        device.end_frame();
    }
}

impl<D: RenderDevice> Drop for SceneRuntime<D> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn resolve_entity(
    assets: &mut dyn AssetResolver,
    device: &mut dyn RenderDevice,
    entity: &mut Entity,
) {
    match assets.resolve(device, entity.model_reference()) {
        Ok(handle) => entity.attach_mesh(Some(handle)),
        Err(err) => {
            log::debug!("Entity '{}' has no mesh: {err}", entity.name());
            entity.attach_mesh(None);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::SceneRuntime;
    use crate::assets::{primitives, AssetError, AssetResolver};
    use crate::config::EditorConfig;
    use crate::input::PointerButton;
    use crate::render::recording::{DeviceCall, RecordingDevice};
    use crate::render::{device_channel, DeviceSource, MeshHandle, RenderDevice, SurfaceSize};
    use crate::scene::{Behavior, Entity};
    use glam::Vec3;
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    const DT: f32 = 1.0 / 60.0;

    fn config() -> EditorConfig {
        EditorConfig {
            asset_root: std::env::temp_dir().join("leveledit_no_assets_here"),
            spawn_default_entity: false,
            ..EditorConfig::default()
        }
    }

    fn runtime() -> SceneRuntime<RecordingDevice> {
        SceneRuntime::with_asset_library(config())
    }

    fn started() -> SceneRuntime<RecordingDevice> {
        let mut runtime = runtime();
        runtime.start(
            SurfaceSize::new(800, 600),
            DeviceSource::Ready(RecordingDevice::new()),
        );
        runtime
    }

    fn temp_path(label: &str) -> std::path::PathBuf {
        let mut path = std::env::temp_dir();
        let nonce = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        path.push(format!(
            "leveledit_{label}_{}_{}.level",
            std::process::id(),
            nonce
        ));
        path
    }

    /// Built-ins only, counting how often failures are forgotten.
    struct BuiltinAssets {
        failures_forgotten: Rc<Cell<u32>>,
    }

    impl AssetResolver for BuiltinAssets {
        fn resolve(
            &mut self,
            device: &mut dyn RenderDevice,
            reference: &str,
        ) -> Result<MeshHandle, AssetError> {
            let mesh = primitives::builtin(reference).ok_or_else(|| AssetError::NotFound {
                reference: reference.to_string(),
            })?;
            Ok(device.upload_mesh(&mesh)?)
        }

        fn forget_uploads(&mut self) {}

        fn forget_failures(&mut self) {
            self.failures_forgotten.set(self.failures_forgotten.get() + 1);
        }
    }

    fn counter() -> (Rc<Cell<u32>>, impl FnMut(&Entity) + 'static) {
        let count = Rc::new(Cell::new(0));
        let sink = count.clone();
        (count, move |_: &Entity| sink.set(sink.get() + 1))
    }

    #[test]
    fn start_is_idempotent() {
        let mut runtime = started();
        runtime.start(
            SurfaceSize::new(1, 1),
            DeviceSource::Ready(RecordingDevice::new()),
        );
        let device = runtime.device().unwrap();
        assert_eq!(device.calls, vec![DeviceCall::Resize(800, 600)]);
        assert!((runtime.camera().aspect_ratio() - 800.0 / 600.0).abs() < 1e-6);
    }

    #[test]
    fn pending_device_loads_content_once_ready() {
        let mut runtime = SceneRuntime::with_asset_library(EditorConfig {
            spawn_default_entity: true,
            ..config()
        });
        let (notifier, pending) = device_channel();
        runtime.start(SurfaceSize::new(640, 480), DeviceSource::Pending(pending));
        runtime.tick(DT);
        assert!(runtime.is_started());
        assert!(!runtime.is_device_ready());
        assert!(runtime.level().is_empty());

        runtime.resize(1024, 768);
        notifier.ready(RecordingDevice::new());
        runtime.tick(DT);

        assert!(runtime.is_device_ready());
        assert_eq!(runtime.level().len(), 1);
        assert!(runtime.level().entities()[0].mesh().is_some());
        let device = runtime.device().unwrap();
        assert_eq!(device.calls[0], DeviceCall::Resize(1024, 768));
        assert_eq!(device.mesh_draws().len(), 1);
    }

    #[test]
    fn failed_device_leaves_runtime_idle() {
        let mut runtime = runtime();
        let (notifier, pending) = device_channel::<RecordingDevice>();
        runtime.start(SurfaceSize::new(640, 480), DeviceSource::Pending(pending));
        drop(notifier);
        runtime.tick(DT);
        runtime.tick(DT);
        assert!(!runtime.is_device_ready());
        assert!(runtime.device().is_none());
    }

    #[test]
    fn resize_before_start_is_ignored() {
        let mut runtime = runtime();
        let aspect = runtime.camera().aspect_ratio();
        runtime.resize(1920, 1080);
        runtime.resize(0, 0);
        assert_eq!(runtime.camera().aspect_ratio(), aspect);

        runtime.start(
            SurfaceSize::new(800, 600),
            DeviceSource::Ready(RecordingDevice::new()),
        );
        runtime.resize(1000, 0);
        runtime.resize(1000, 500);
        assert_eq!(
            runtime.device().unwrap().calls,
            vec![DeviceCall::Resize(800, 600), DeviceCall::Resize(1000, 500)]
        );
        assert!((runtime.camera().aspect_ratio() - 2.0).abs() < 1e-6);
    }

    #[test]
    fn new_scene_empties_level_and_keeps_camera() {
        let mut runtime = started();
        runtime.add_default_entity(Vec3::ZERO);
        runtime.input_mut().update();
        runtime.input_mut().button_changed(PointerButton::Right, true);
        runtime.input_mut().pointer_moved(40.0, 0.0);
        runtime.tick(DT);
        let yaw = runtime.camera().yaw();
        assert_ne!(yaw, runtime.config().camera.default_yaw);

        runtime.new_scene();

        assert_eq!(runtime.level().name(), "Untitled");
        assert!(runtime.level().is_empty());
        assert_eq!(runtime.selected(), None);
        assert_eq!(runtime.camera().yaw(), yaw);
    }

    #[test]
    fn failed_load_keeps_current_level() {
        let mut runtime = started();
        runtime.add_default_entity(Vec3::new(1.0, 0.0, 0.0));
        let before = runtime.level().clone();

        let path = temp_path("runtime_bad");
        std::fs::write(&path, "{ \"name\": 3 }").unwrap();
        let result = runtime.load(&path);
        let _ = std::fs::remove_file(&path);

        assert!(result.is_err());
        assert_eq!(*runtime.level(), before);
        assert!(runtime.load(&temp_path("runtime_missing")).is_err());
        assert_eq!(*runtime.level(), before);
    }

    #[test]
    fn save_then_load_restores_level_and_meshes() {
        let mut runtime = started();
        runtime.add_default_entity(Vec3::new(1.0, 2.0, 3.0));
        runtime.add_entity(Entity::new("Ball", "Sphere"));
        let saved = runtime.level().clone();

        let path = temp_path("runtime_roundtrip");
        runtime.save(&path).unwrap();
        runtime.new_scene();
        let result = runtime.load(&path);
        let _ = std::fs::remove_file(&path);

        result.unwrap();
        assert_eq!(*runtime.level(), saved);
        assert!(runtime.level().entities().iter().all(|e| e.mesh().is_some()));
    }

    #[test]
    fn load_retries_models_that_failed_before() {
        let forgotten = Rc::new(Cell::new(0));
        let assets = BuiltinAssets {
            failures_forgotten: forgotten.clone(),
        };
        let mut runtime = SceneRuntime::new(config(), Box::new(assets));
        runtime.start(
            SurfaceSize::new(800, 600),
            DeviceSource::Ready(RecordingDevice::new()),
        );
        runtime.add_entity(Entity::new("Ball", "Sphere"));

        let path = temp_path("runtime_retry");
        runtime.save(&path).unwrap();
        let result = runtime.load(&path);
        let _ = std::fs::remove_file(&path);

        result.unwrap();
        assert_eq!(forgotten.get(), 1);
        assert!(runtime.level().entities()[0].mesh().is_some());
    }

    #[test]
    fn loaded_empty_level_gets_no_default_entity() {
        let mut runtime = SceneRuntime::with_asset_library(EditorConfig {
            spawn_default_entity: true,
            ..config()
        });
        let path = temp_path("runtime_empty");
        runtime.save(&path).unwrap();

        let (notifier, pending) = device_channel();
        runtime.start(SurfaceSize::new(640, 480), DeviceSource::Pending(pending));
        let result = runtime.load(&path);
        let _ = std::fs::remove_file(&path);
        result.unwrap();
        notifier.ready(RecordingDevice::new());
        runtime.tick(DT);

        assert!(runtime.is_device_ready());
        assert!(runtime.level().is_empty());
    }

    #[test]
    fn holding_left_button_selects_first_entity_once() {
        let mut runtime = started();
        let first = runtime.add_default_entity(Vec3::ZERO);
        runtime.add_default_entity(Vec3::X);
        let (selected, listener) = counter();
        runtime.on_entity_selected(listener);

        runtime.input_mut().button_changed(PointerButton::Left, true);
        for _ in 0..5 {
            runtime.tick(DT);
        }

        assert_eq!(selected.get(), 1);
        assert_eq!(runtime.selected(), Some(first));
        assert!(runtime.selected_entity().unwrap().is_selected());
        let highlighted: Vec<_> = runtime
            .device()
            .unwrap()
            .mesh_draws()
            .iter()
            .map(|draw| draw.highlighted)
            .collect();
        assert_eq!(highlighted.len(), 10);
        assert!(highlighted[8] && !highlighted[9]);
    }

    #[test]
    fn left_button_on_empty_level_selects_nothing() {
        let mut runtime = started();
        let (selected, listener) = counter();
        runtime.on_entity_selected(listener);
        runtime.input_mut().button_changed(PointerButton::Left, true);
        runtime.tick(DT);
        assert_eq!(selected.get(), 0);
        assert_eq!(runtime.selected(), None);
    }

    #[test]
    fn inspector_refresh_fires_once_per_dirty_tick() {
        let mut runtime = started();
        let id = runtime.add_default_entity(Vec3::ZERO);
        let (refreshed, listener) = counter();
        runtime.on_inspector_refresh(listener);

        runtime.select(Some(id));
        runtime.tick(DT);
        assert_eq!(refreshed.get(), 1);
        runtime.tick(DT);
        assert_eq!(refreshed.get(), 1);

        let entity = runtime.entity_mut(id).unwrap();
        entity.set_position(Vec3::new(0.0, 5.0, 0.0));
        entity.set_uniform_scale(3.0);
        runtime.tick(DT);
        assert_eq!(refreshed.get(), 2);

        runtime.select(None);
        runtime.entity_mut(id).unwrap().set_position(Vec3::ZERO);
        runtime.tick(DT);
        assert_eq!(refreshed.get(), 2);
    }

    #[test]
    fn frame_draws_gizmo_then_entities_then_overlay() {
        let mut runtime = started();
        runtime.add_default_entity(Vec3::ZERO);
        runtime.add_entity(Entity::new("Ball", "Sphere"));
        runtime.device_mut().unwrap().clear_calls();

        runtime.tick(DT);

        let calls = &runtime.device().unwrap().calls;
        assert_eq!(calls.len(), 6, "{calls:?}");
        assert_eq!(calls[0], DeviceCall::BeginFrame);
        assert_eq!(calls[1], DeviceCall::Lines(6));
        assert!(matches!(calls[2], DeviceCall::Mesh(_)));
        assert!(matches!(calls[3], DeviceCall::Mesh(_)));
        assert!(matches!(&calls[4], DeviceCall::Overlay(text) if text.starts_with("camera")));
        assert_eq!(calls[5], DeviceCall::EndFrame);
    }

    #[test]
    fn failing_entity_does_not_stop_the_frame() {
        let mut runtime = started();
        runtime.add_default_entity(Vec3::ZERO);
        let ball = runtime.add_entity(Entity::new("Ball", "Sphere"));
        let cube_mesh = runtime.level().entities()[0].mesh();
        runtime.device_mut().unwrap().failing_mesh = cube_mesh;

        runtime.tick(DT);

        let draws = runtime.device().unwrap().mesh_draws();
        assert_eq!(draws.len(), 1);
        assert_eq!(Some(draws[0].mesh), runtime.level().get(ball).unwrap().mesh());
        assert_eq!(
            runtime.device().unwrap().calls.last(),
            Some(&DeviceCall::EndFrame)
        );
    }

    #[test]
    fn missing_model_is_not_fatal() {
        let mut runtime = started();
        let id = runtime.add_entity(Entity::new("Teapot", "teapot-that-is-not-there"));
        runtime.tick(DT);
        runtime.tick(DT);
        assert!(runtime.level().get(id).unwrap().mesh().is_none());
        assert!(runtime.device().unwrap().mesh_draws().is_empty());
    }

    #[test]
    fn shutdown_releases_and_drops_the_device_once() {
        let device = RecordingDevice::new();
        let releases = device.releases.clone();
        let mut runtime = runtime();
        runtime.start(SurfaceSize::new(800, 600), DeviceSource::Ready(device));

        runtime.shutdown();
        runtime.shutdown();
        runtime.tick(DT);
        runtime.start(
            SurfaceSize::new(10, 10),
            DeviceSource::Ready(RecordingDevice::new()),
        );

        assert_eq!(releases.get(), 1);
        assert_eq!(Rc::strong_count(&releases), 1);
        assert!(runtime.device().is_none());
        assert!(!runtime.is_device_ready());
        drop(runtime);
        assert_eq!(releases.get(), 1);
    }

    #[test]
    fn removing_selected_entity_clears_selection_and_keeps_order() {
        let mut runtime = started();
        let a = runtime.add_default_entity(Vec3::ZERO);
        let b = runtime.add_default_entity(Vec3::X);
        let c = runtime.add_default_entity(Vec3::Y);
        runtime.select(Some(b));

        let removed = runtime.remove_selected().unwrap();

        assert_eq!(removed.id(), b);
        assert_eq!(runtime.selected(), None);
        let ids: Vec<_> = runtime.level().entities().iter().map(|e| e.id()).collect();
        assert_eq!(ids, [a, c]);
        assert!(runtime.remove_selected().is_none());
    }

    #[test]
    fn entities_with_behavior_advance_each_tick() {
        let mut runtime = started();
        let id = runtime.add_entity(Entity::new("Fan", "Cube").with_behavior(Behavior {
            self_rotate_speed: 1.0,
            ..Behavior::default()
        }));
        let log = Rc::new(RefCell::new(Vec::new()));
        let sink = log.clone();
        runtime
            .entity_mut(id)
            .unwrap()
            .subscribe(move |change| sink.borrow_mut().push(*change));

        runtime.tick(0.5);
        runtime.tick(0.5);

        assert!((runtime.level().get(id).unwrap().rotation().y - 1.0).abs() < 1e-6);
        assert_eq!(log.borrow().len(), 2);
        assert!((runtime.elapsed() - 1.0).abs() < 1e-6);
    }
}
