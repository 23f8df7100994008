use super::notify::{ChangeNotifier, SubscriptionId};
use super::transform::{xyz, Transform};
use crate::render::{CameraController, MeshDraw, MeshHandle, RenderDevice, RenderError};
use glam::{Mat4, Vec3};
use serde::{Deserialize, Serialize};

/// Runtime identity assigned by the owning [`Level`](super::Level). Not persisted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(u64);

impl EntityId {
    pub(crate) fn new(value: u64) -> Self {
        Self(value)
    }
}

/// Material selector. Only used to pick a flat shading tint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MaterialKey {
    #[default]
    Plain,
    Metal,
    Grass,
    HeightMap,
    Sand,
    Water,
}

impl MaterialKey {
    pub fn tint(self) -> [f32; 4] {
        match self {
            MaterialKey::Plain => [0.80, 0.80, 0.80, 1.0],
            MaterialKey::Metal => [0.62, 0.64, 0.68, 1.0],
            MaterialKey::Grass => [0.30, 0.62, 0.25, 1.0],
            MaterialKey::HeightMap => [0.55, 0.45, 0.33, 1.0],
            MaterialKey::Sand => [0.86, 0.78, 0.55, 1.0],
            MaterialKey::Water => [0.20, 0.45, 0.80, 1.0],
        }
    }
}

/// How `selfRotateSpeed` is interpreted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpinMode {
    /// Radians per second, scaled by frame time.
    #[default]
    PerSecond,
    /// Radians per tick regardless of frame time (frame-rate dependent).
    PerTick,
}

/// Optional time-driven motion. All zero means a static entity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Behavior {
    #[serde(default, skip_serializing_if = "is_zero")]
    pub self_rotate_speed: f32,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub orbit_speed: f32,
    #[serde(default, with = "xyz", skip_serializing_if = "is_origin")]
    pub orbit_center: Vec3,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub orbit_radius: f32,
}

impl Behavior {
    pub fn spins(&self) -> bool {
        self.self_rotate_speed != 0.0
    }

    pub fn orbits(&self) -> bool {
        self.orbit_speed != 0.0 && self.orbit_radius > 0.0
    }
}

fn is_zero(value: &f32) -> bool {
    *value == 0.0
}

fn is_origin(value: &Vec3) -> bool {
    *value == Vec3::ZERO
}

/// Which observable field of an entity changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityChange {
    Name,
    ModelReference,
    Position,
    Rotation,
    Scale,
    Material,
    Selected,
}

/// A placed mesh instance.
///
/// Every setter is equality-gated: it notifies subscribers once when the value
/// actually changes and does nothing otherwise.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entity {
    #[serde(skip)]
    id: EntityId,
    #[serde(default)]
    name: String,
    model_reference: String,
    #[serde(flatten)]
    transform: Transform,
    #[serde(default)]
    material: MaterialKey,
    #[serde(flatten)]
    behavior: Behavior,
    #[serde(skip)]
    selected: bool,
    #[serde(skip)]
    mesh: Option<MeshHandle>,
    #[serde(skip)]
    changes: ChangeNotifier<EntityChange>,
}

impl Entity {
    pub fn new(name: impl Into<String>, model_reference: impl Into<String>) -> Self {
        Self {
            id: EntityId::default(),
            name: name.into(),
            model_reference: model_reference.into(),
            transform: Transform::default(),
            material: MaterialKey::default(),
            behavior: Behavior::default(),
            selected: false,
            mesh: None,
            changes: ChangeNotifier::new(),
        }
    }

    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }

    #[allow(dead_code)]
    pub fn with_material(mut self, material: MaterialKey) -> Self {
        self.material = material;
        self
    }

    #[allow(dead_code)]
    pub fn with_behavior(mut self, behavior: Behavior) -> Self {
        self.behavior = behavior;
        self
    }

    pub fn id(&self) -> EntityId {
        self.id
    }

    pub(crate) fn set_id(&mut self, id: EntityId) {
        self.id = id;
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    #[allow(dead_code)]
    pub fn set_name(&mut self, name: impl Into<String>) -> bool {
        let name = name.into();
        if self.name == name {
            return false;
        }
        self.name = name;
        self.notify(EntityChange::Name)
    }

    pub fn model_reference(&self) -> &str {
        &self.model_reference
    }

    /// Changing the reference detaches the current mesh; the owner re-resolves it.
    #[allow(dead_code)]
    pub fn set_model_reference(&mut self, reference: impl Into<String>) -> bool {
        let reference = reference.into();
        if self.model_reference == reference {
            return false;
        }
        self.model_reference = reference;
        self.mesh = None;
        self.notify(EntityChange::ModelReference)
    }

    #[allow(dead_code)]
    pub fn transform(&self) -> &Transform {
        &self.transform
    }

    pub fn position(&self) -> Vec3 {
        self.transform.position
    }

    pub fn rotation(&self) -> Vec3 {
        self.transform.rotation
    }

    pub fn scale(&self) -> Vec3 {
        self.transform.scale
    }

    pub fn set_position(&mut self, position: Vec3) -> bool {
        if self.transform.position == position {
            return false;
        }
        self.transform.position = position;
        self.notify(EntityChange::Position)
    }

    pub fn set_rotation(&mut self, rotation: Vec3) -> bool {
        if self.transform.rotation == rotation {
            return false;
        }
        self.transform.rotation = rotation;
        self.notify(EntityChange::Rotation)
    }

    pub fn set_scale(&mut self, scale: Vec3) -> bool {
        if self.transform.scale == scale {
            return false;
        }
        self.transform.scale = scale;
        self.notify(EntityChange::Scale)
    }

    #[allow(dead_code)]
    pub fn set_uniform_scale(&mut self, scale: f32) -> bool {
        self.set_scale(Vec3::splat(scale))
    }

    #[allow(dead_code)]
    pub fn material(&self) -> MaterialKey {
        self.material
    }

    #[allow(dead_code)]
    pub fn set_material(&mut self, material: MaterialKey) -> bool {
        if self.material == material {
            return false;
        }
        self.material = material;
        self.notify(EntityChange::Material)
    }

    #[allow(dead_code)]
    pub fn is_selected(&self) -> bool {
        self.selected
    }

    pub fn set_selected(&mut self, selected: bool) -> bool {
        if self.selected == selected {
            return false;
        }
        self.selected = selected;
        self.notify(EntityChange::Selected)
    }

    pub fn behavior(&self) -> &Behavior {
        &self.behavior
    }

    #[allow(dead_code)]
    pub fn mesh(&self) -> Option<MeshHandle> {
        self.mesh
    }

    pub fn attach_mesh(&mut self, mesh: Option<MeshHandle>) {
        self.mesh = mesh;
    }

    pub fn subscribe<F>(&mut self, listener: F) -> SubscriptionId
    where
        F: FnMut(&EntityChange) + 'static,
    {
        self.changes.subscribe(listener)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.changes.unsubscribe(id)
    }

    pub fn world_matrix(&self) -> Mat4 {
        self.transform.world_matrix()
    }

    /// Runs the entity's own motion for one tick. Orbiting overrides any
    /// position set independently for this tick.
    pub fn advance(&mut self, frame_dt: f32, elapsed: f32, spin: SpinMode) {
        let behavior = self.behavior;
        if behavior.spins() {
            let step = match spin {
                SpinMode::PerSecond => behavior.self_rotate_speed * frame_dt,
                SpinMode::PerTick => behavior.self_rotate_speed,
            };
            let mut rotation = self.transform.rotation;
            rotation.y += step;
            if rotation.is_finite() {
                self.set_rotation(rotation);
            }
        }
        if behavior.orbits() {
            let angle = elapsed * behavior.orbit_speed;
            let offset = Vec3::new(angle.cos(), 0.0, angle.sin()) * behavior.orbit_radius;
            let position = behavior.orbit_center + offset;
            // Overflowing motion leaves the entity where it was.
            if position.is_finite() {
                self.set_position(position);
            }
        }
    }

    /// Issues this entity's draw. Without a resolved mesh this does nothing.
    pub fn draw(
        &self,
        device: &mut dyn RenderDevice,
        camera: &CameraController,
    ) -> Result<(), RenderError> {
        let Some(mesh) = self.mesh else {
            return Ok(());
        };
        device.draw_mesh(&MeshDraw {
            mesh,
            world: self.world_matrix(),
            view: camera.view(),
            projection: camera.projection(),
            tint: self.material.tint(),
            highlighted: self.selected,
        })
    }

    fn notify(&mut self, change: EntityChange) -> bool {
        self.changes.emit(&change);
        true
    }
}

impl Default for Entity {
    fn default() -> Self {
        Self::new(String::new(), String::new())
    }
}

/// Compares persisted fields only.
impl PartialEq for Entity {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.model_reference == other.model_reference
            && self.transform == other.transform
            && self.material == other.material
            && self.behavior == other.behavior
    }
}
