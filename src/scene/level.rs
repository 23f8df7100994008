use super::entity::{Entity, EntityId, SpinMode};
use crate::render::{CameraController, RenderDevice};
use serde::{Deserialize, Serialize};

/// The edited document: a name and an ordered list of entities.
///
/// Insertion order is draw order. Ids are handed out here on `add` and on
/// load; they only live as long as the level does.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "LevelDocument")]
pub struct Level {
    name: String,
    entities: Vec<Entity>,
    #[serde(skip)]
    next_id: u64,
}

#[derive(Deserialize)]
struct LevelDocument {
    #[serde(default)]
    name: String,
    #[serde(default)]
    entities: Vec<Entity>,
}

impl From<LevelDocument> for Level {
    fn from(document: LevelDocument) -> Self {
        let mut level = Level::new(document.name);
        for entity in document.entities {
            level.add(entity);
        }
        level
    }
}

impl Level {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entities: Vec::new(),
            next_id: 1,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Appends `entity` and returns the id it now carries.
    pub fn add(&mut self, mut entity: Entity) -> EntityId {
        let id = EntityId::new(self.next_id);
        self.next_id += 1;
        entity.set_id(id);
        self.entities.push(entity);
        id
    }

    /// Removes one entity, keeping the order of the rest.
    pub fn remove(&mut self, id: EntityId) -> Option<Entity> {
        let index = self.position(id)?;
        Some(self.entities.remove(index))
    }

    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    pub(crate) fn entities_mut(&mut self) -> &mut [Entity] {
        &mut self.entities
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn first(&self) -> Option<&Entity> {
        self.entities.first()
    }

    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.entities.iter().find(|entity| entity.id() == id)
    }

    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities.iter_mut().find(|entity| entity.id() == id)
    }

    pub fn position(&self, id: EntityId) -> Option<usize> {
        self.entities.iter().position(|entity| entity.id() == id)
    }

    pub fn advance(&mut self, frame_dt: f32, elapsed: f32, spin: SpinMode) {
        for entity in &mut self.entities {
            entity.advance(frame_dt, elapsed, spin);
        }
    }

    /// Draws every entity in order. A failing entity is logged and skipped;
    /// the number of failures is returned.
    pub fn draw(&self, device: &mut dyn RenderDevice, camera: &CameraController) -> usize {
        let mut failures = 0;
        for entity in &self.entities {
            if let Err(err) = entity.draw(device, camera) {
                log::warn!(
                    "Failed to draw entity '{}' ({}): {err}",
                    entity.name(),
                    entity.model_reference()
                );
                failures += 1;
            }
        }
        failures
    }
}

impl Default for Level {
    fn default() -> Self {
        Self::new(String::new())
    }
}

impl PartialEq for Level {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.entities == other.entities
    }
}
