use crate::scene::Level;
use std::path::Path;

#[derive(Debug, thiserror::Error)]
pub enum SerializationError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("entity {index} has no model reference")]
    MissingModelReference { index: usize },
    #[error("entity {index} has a non-finite {field}")]
    NonFinite { index: usize, field: &'static str },
}

pub type Result<T> = std::result::Result<T, SerializationError>;

/// JSON has no NaN or infinity; such values would be written as `null` and
/// the file could not be read back.
fn check_document(level: &Level) -> Result<()> {
    for (index, entity) in level.entities().iter().enumerate() {
        if entity.model_reference().trim().is_empty() {
            return Err(SerializationError::MissingModelReference { index });
        }
        let behavior = entity.behavior();
        let fields = [
            ("position", entity.position().is_finite()),
            ("rotation", entity.rotation().is_finite()),
            ("scale", entity.scale().is_finite()),
            ("selfRotateSpeed", behavior.self_rotate_speed.is_finite()),
            ("orbitSpeed", behavior.orbit_speed.is_finite()),
            ("orbitCenter", behavior.orbit_center.is_finite()),
            ("orbitRadius", behavior.orbit_radius.is_finite()),
        ];
        if let Some((field, _)) = fields.iter().find(|(_, finite)| !finite) {
            return Err(SerializationError::NonFinite { index, field });
        }
    }
    Ok(())
}

pub fn level_to_string(level: &Level) -> Result<String> {
    check_document(level)?;
    Ok(serde_json::to_string_pretty(level)?)
}

pub fn level_from_str(json: &str) -> Result<Level> {
    let level: Level = serde_json::from_str(json)?;
    check_document(&level)?;
    Ok(level)
}

pub fn save_level_to_file(level: &Level, path: &Path) -> Result<()> {
    let json = level_to_string(level)?;
    std::fs::write(path, json)?;
    Ok(())
}

pub fn load_level_from_file(path: &Path) -> Result<Level> {
    let json = std::fs::read_to_string(path)?;
    level_from_str(&json)
}

#[cfg(test)]
mod tests {
    use super::{level_from_str, level_to_string, SerializationError};
    use crate::scene::{Behavior, Entity, Level, MaterialKey, Transform};
    use glam::Vec3;

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

    fn sample_level(count: usize) -> Level {
        let mut level = Level::new("Sample");
        for index in 0..count {
            let i = index as f32;
            let entity = Entity::new(format!("Entity {index}"), ["Cube", "Sphere", "Plane"][index % 3])
                .with_transform(Transform {
                    position: Vec3::new(i, -i, 2.0 * i),
                    rotation: Vec3::new(0.1 * i, 0.2 * i, 0.3 * i),
                    scale: Vec3::new(1.0 + i, 1.0, 0.5),
                })
                .with_material(MaterialKey::Sand);
            level.add(entity);
        }
        level
    }

    #[test]
    fn test_roundtrip_zero_one_and_many_entities() {
        for count in [0, 1, 7] {
            let level = sample_level(count);
            let json = level_to_string(&level).unwrap();
            let loaded = level_from_str(&json).unwrap();
            assert_eq!(loaded, level, "count {count}");
        }
    }

    #[test]
    fn test_teapot_keeps_transform_and_reference() {
        let mut level = Level::new("Kitchen");
        level.add(Entity::new("Teapot", "models/teapot.glb"));

        let path = temp_path("teapot");
        super::save_level_to_file(&level, &path).unwrap();
        let loaded = super::load_level_from_file(&path).unwrap();
        let _ = std::fs::remove_file(&path);

        let teapot = &loaded.entities()[0];
        assert_eq!(teapot.name(), "Teapot");
        assert_eq!(teapot.model_reference(), "models/teapot.glb");
        assert_eq!(teapot.position(), Vec3::ZERO);
        assert_eq!(teapot.rotation(), Vec3::ZERO);
        assert_eq!(teapot.scale(), Vec3::ONE);
    }

    #[test]
    fn test_missing_optional_fields_default_like_new_entity() {
        let json = r#"{ "name": "Sparse", "entities": [ { "modelReference": "Cube" } ] }"#;
        let loaded = level_from_str(json).unwrap();
        assert_eq!(loaded.entities()[0], Entity::new("", "Cube"));
        assert_eq!(*loaded.entities()[0].behavior(), Behavior::default());
    }

    #[test]
    fn test_unknown_fields_are_ignored() {
        let json = r#"{
            "name": "Extra",
            "camera": { "yaw": 1.0 },
            "entities": [ { "modelReference": "Cube", "texture": "grass.png", "position": { "x": 1, "y": 2, "z": 3, "w": 4 } } ]
        }"#;
        let loaded = level_from_str(json).unwrap();
        assert_eq!(loaded.entities()[0].position(), Vec3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn test_scalar_scale_is_uniform() {
        let json = r#"{ "name": "S", "entities": [ { "modelReference": "Cube", "scale": 2.5 } ] }"#;
        let loaded = level_from_str(json).unwrap();
        assert_eq!(loaded.entities()[0].scale(), Vec3::splat(2.5));
        assert!(level_to_string(&loaded).unwrap().contains("\"scale\": {"));
    }

    #[test]
    fn test_behavior_fields_roundtrip_and_are_omitted_when_zero() {
        let mut level = Level::new("Orbits");
        level.add(Entity::new("Moon", "Sphere").with_behavior(Behavior {
            self_rotate_speed: 0.5,
            orbit_speed: 0.25,
            orbit_center: Vec3::new(0.0, 1.0, 0.0),
            orbit_radius: 3.0,
        }));
        level.add(Entity::new("Rock", "Cube"));

        let json = level_to_string(&level).unwrap();
        assert!(json.contains("\"selfRotateSpeed\""));
        assert!(json.contains("\"orbitCenter\""));
        assert_eq!(json.matches("orbitRadius").count(), 1);
        assert_eq!(level_from_str(&json).unwrap(), level);
    }

    #[test]
    fn test_runtime_fields_are_not_serialized() {
        let mut level = sample_level(2);
        level.entities_mut()[0].set_selected(true);
        let json = level_to_string(&level).unwrap();
        assert!(!json.contains("selected"));
        assert!(!json.contains("mesh"));
        assert!(!json.contains("\"id\""));
        assert!(!json.contains("yaw"));
        assert!(!json.contains("distance"));
    }

    #[test]
    fn test_empty_model_reference_is_rejected() {
        let mut level = sample_level(2);
        level.add(Entity::new("Broken", ""));
        assert!(matches!(
            level_to_string(&level),
            Err(SerializationError::MissingModelReference { index: 2 })
        ));

        let json = r#"{ "name": "L", "entities": [ { "modelReference": " " } ] }"#;
        assert!(matches!(
            level_from_str(json),
            Err(SerializationError::MissingModelReference { index: 0 })
        ));

        let json = r#"{ "name": "L", "entities": [ { "name": "NoRef" } ] }"#;
        assert!(matches!(level_from_str(json), Err(SerializationError::Json(_))));
    }

    #[test]
    fn test_non_finite_values_are_rejected_on_save() {
        let mut level = sample_level(2);
        level.entities_mut()[1].set_position(Vec3::new(f32::NAN, 0.0, 0.0));
        assert!(matches!(
            level_to_string(&level),
            Err(SerializationError::NonFinite {
                index: 1,
                field: "position"
            })
        ));

        let mut level = sample_level(1);
        level.add(Entity::new("Comet", "Sphere").with_behavior(Behavior {
            orbit_speed: f32::INFINITY,
            orbit_radius: 1.0,
            ..Behavior::default()
        }));
        let path = temp_path("non_finite");
        let result = super::save_level_to_file(&level, &path);
        assert!(matches!(
            result,
            Err(SerializationError::NonFinite {
                index: 1,
                field: "orbitSpeed"
            })
        ));
        assert!(!path.exists());
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let path = temp_path("malformed");
        std::fs::write(&path, "{ not json").unwrap();
        let result = super::load_level_from_file(&path);
        let _ = std::fs::remove_file(&path);
        assert!(matches!(result, Err(SerializationError::Json(_))));

        let missing = temp_path("missing");
        assert!(matches!(
            super::load_level_from_file(&missing),
            Err(SerializationError::Io(_))
        ));
    }

    #[test]
    fn test_save_load_stress_loop_via_file() {
        let mut level = sample_level(3);
        let path = temp_path("stress");

        for _ in 0..50 {
            super::save_level_to_file(&level, &path).unwrap();
            level = super::load_level_from_file(&path).unwrap();
            assert_eq!(level.len(), 3);
            assert_eq!(level.entities()[1].model_reference(), "Sphere");
        }

        let _ = std::fs::remove_file(path);
    }
}
