use glam::{EulerRot, Mat4, Quat, Vec3};
use serde::{Deserialize, Serialize};

/// Placement of one entity: scaled, then rotated about its origin, then
/// moved to `position`.
///
/// `rotation` holds yaw/pitch/roll in radians as `y`/`x`/`z` respectively.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    #[serde(default, with = "xyz")]
    pub position: Vec3,
    #[serde(default, with = "xyz")]
    pub rotation: Vec3,
    #[serde(default = "unit_scale", with = "scale")]
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Vec3::ZERO,
            scale: Vec3::ONE,
        }
    }
}

impl Transform {
    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Self::default()
        }
    }

    pub fn yaw(&self) -> f32 {
        self.rotation.y
    }

    pub fn pitch(&self) -> f32 {
        self.rotation.x
    }

    pub fn roll(&self) -> f32 {
        self.rotation.z
    }

    /// Yaw about +Y, then pitch about +X, then roll about +Z, applied to the
    /// object in reverse (roll first).
    pub fn orientation(&self) -> Quat {
        Quat::from_euler(EulerRot::YXZ, self.yaw(), self.pitch(), self.roll())
    }

    /// `Scale * RotationYawPitchRoll * Translation` in row-vector terms,
    /// i.e. `T * R * S` for column vectors.
    pub fn world_matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.orientation(), self.position)
    }
}

fn unit_scale() -> Vec3 {
    Vec3::ONE
}

/// `{ "x": .., "y": .., "z": .. }` encoding for [`Vec3`] fields.
pub(crate) mod xyz {
    use glam::Vec3;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    #[derive(Serialize, Deserialize)]
    pub(super) struct Xyz {
        #[serde(default)]
        pub x: f32,
        #[serde(default)]
        pub y: f32,
        #[serde(default)]
        pub z: f32,
    }

    impl From<Xyz> for Vec3 {
        fn from(value: Xyz) -> Self {
            Vec3::new(value.x, value.y, value.z)
        }
    }

    pub fn serialize<S: Serializer>(value: &Vec3, serializer: S) -> Result<S::Ok, S::Error> {
        Xyz {
            x: value.x,
            y: value.y,
            z: value.z,
        }
        .serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec3, D::Error> {
        Xyz::deserialize(deserializer).map(Vec3::from)
    }
}

/// Scale is written as `{x,y,z}` but a bare number is accepted as uniform scale.
mod scale {
    use super::xyz::{self, Xyz};
    use glam::Vec3;
    use serde::{Deserialize, Deserializer, Serializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum ScaleRepr {
        Uniform(f32),
        Axes(Xyz),
    }

    pub fn serialize<S: Serializer>(value: &Vec3, serializer: S) -> Result<S::Ok, S::Error> {
        xyz::serialize(value, serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec3, D::Error> {
        Ok(match ScaleRepr::deserialize(deserializer)? {
            ScaleRepr::Uniform(value) => Vec3::splat(value),
            ScaleRepr::Axes(axes) => axes.into(),
        })
    }
}
