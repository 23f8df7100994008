use crate::input::{InputSampler, Key, PointerButton};
use glam::{EulerRot, Mat4, Quat, Vec2, Vec3};
use serde::{Deserialize, Serialize};
use std::f32::consts::FRAC_PI_2;

/// Tuning for the orbit camera. Speeds are per pointer pixel / per wheel unit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraSettings {
    pub rotation_speed: f32,
    pub pan_speed: f32,
    pub zoom_speed: f32,
    pub zoom_scale: f32,
    /// Radians per second while an arrow key is held.
    pub key_orbit_speed: f32,
    pub min_distance: f32,
    pub max_distance: f32,
    pub default_distance: f32,
    pub default_yaw: f32,
    pub default_pitch: f32,
    pub fov_y_deg: f32,
    pub near: f32,
    pub far: f32,
    pub pitch_margin: f32,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            rotation_speed: 0.005,
            pan_speed: 0.02,
            zoom_speed: 0.5,
            zoom_scale: 0.01,
            key_orbit_speed: 1.8,
            min_distance: 2.0,
            max_distance: 500.0,
            default_distance: 10.0,
            default_yaw: 0.0,
            default_pitch: -0.4,
            fov_y_deg: 45.0,
            near: 0.1,
            far: 1000.0,
            pitch_margin: 0.1,
        }
    }
}

impl CameraSettings {
    /// Checks the bounds the controller clamps against.
    pub fn validate(&self) -> Result<(), String> {
        let values = [
            ("rotation_speed", self.rotation_speed),
            ("pan_speed", self.pan_speed),
            ("zoom_speed", self.zoom_speed),
            ("zoom_scale", self.zoom_scale),
            ("key_orbit_speed", self.key_orbit_speed),
            ("min_distance", self.min_distance),
            ("max_distance", self.max_distance),
            ("default_distance", self.default_distance),
            ("default_yaw", self.default_yaw),
            ("default_pitch", self.default_pitch),
            ("fov_y_deg", self.fov_y_deg),
            ("near", self.near),
            ("far", self.far),
            ("pitch_margin", self.pitch_margin),
        ];
        if let Some((name, _)) = values.iter().find(|(_, value)| !value.is_finite()) {
            return Err(format!("camera.{name} must be finite"));
        }
        if self.min_distance <= 0.0 || self.min_distance > self.max_distance {
            return Err(format!(
                "camera distance range {}..{} is empty or not positive",
                self.min_distance, self.max_distance
            ));
        }
        if self.pitch_margin <= 0.0 || self.pitch_margin >= FRAC_PI_2 {
            return Err(format!(
                "camera.pitch_margin {} must lie strictly between 0 and pi/2",
                self.pitch_margin
            ));
        }
        if self.near <= 0.0 || self.far <= self.near {
            return Err(format!(
                "camera clip range {}..{} is invalid",
                self.near, self.far
            ));
        }
        if self.fov_y_deg <= 0.0 || self.fov_y_deg >= 180.0 {
            return Err(format!("camera.fov_y_deg {} is out of range", self.fov_y_deg));
        }
        Ok(())
    }
}

/// One frame of navigation input, already reduced to what the camera reads.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CameraGestures {
    pub pointer_delta: Vec2,
    pub orbit: bool,
    pub pan: bool,
    pub scroll_delta: f32,
    /// Arrow-key orbit direction, each axis in -1..=1.
    pub key_orbit: Vec2,
}

impl CameraGestures {
    pub fn from_input(input: &InputSampler) -> Self {
        let axis = |negative: Key, positive: Key| -> f32 {
            let mut value = 0.0;
            if input.is_key_down(negative) {
                value -= 1.0;
            }
            if input.is_key_down(positive) {
                value += 1.0;
            }
            value
        };
        Self {
            pointer_delta: input.pointer_delta(),
            orbit: input.is_down(PointerButton::Right),
            pan: input.is_down(PointerButton::Middle),
            scroll_delta: input.scroll_delta(),
            key_orbit: Vec2::new(
                axis(Key::ArrowLeft, Key::ArrowRight),
                axis(Key::ArrowDown, Key::ArrowUp),
            ),
        }
    }
}

/// Orbit/pan/zoom camera looking at `target` from `distance` away.
#[derive(Debug, Clone, Copy)]
pub struct CameraController {
    settings: CameraSettings,
    target: Vec3,
    yaw: f32,
    pitch: f32,
    distance: f32,
    aspect_ratio: f32,
    position: Vec3,
    view: Mat4,
    projection: Mat4,
}

impl CameraController {
    pub fn new(settings: CameraSettings, aspect_ratio: f32) -> Self {
        let mut camera = Self {
            settings,
            target: Vec3::ZERO,
            yaw: 0.0,
            pitch: 0.0,
            distance: settings.default_distance,
            aspect_ratio: if aspect_ratio.is_finite() && aspect_ratio > 0.0 {
                aspect_ratio
            } else {
                1.0
            },
            position: Vec3::ZERO,
            view: Mat4::IDENTITY,
            projection: Mat4::IDENTITY,
        };
        camera.reset();
        camera
    }

    /// Restores default yaw, pitch, distance and target.
    pub fn reset(&mut self) {
        self.yaw = self.settings.default_yaw;
        self.pitch = self.clamp_pitch(self.settings.default_pitch);
        self.distance = self.clamp_distance(self.settings.default_distance);
        self.target = Vec3::ZERO;
        self.update_view();
        self.update_projection();
    }

    /// Applies this frame's gestures and recomputes position and view.
    /// Returns whether any gesture moved the camera.
    pub fn update(&mut self, gestures: &CameraGestures, frame_dt: f32) -> bool {
        let mut changed = false;
        let delta = if gestures.pointer_delta.is_finite() {
            gestures.pointer_delta
        } else {
            Vec2::ZERO
        };

        if gestures.orbit && delta != Vec2::ZERO {
            self.yaw -= delta.x * self.settings.rotation_speed;
            self.pitch = self.clamp_pitch(self.pitch - delta.y * self.settings.rotation_speed);
            changed = true;
        }

        if gestures.key_orbit != Vec2::ZERO && frame_dt.is_finite() && frame_dt > 0.0 {
            let step = self.settings.key_orbit_speed * frame_dt;
            self.yaw += gestures.key_orbit.x * step;
            self.pitch = self.clamp_pitch(self.pitch + gestures.key_orbit.y * step);
            changed = true;
        }

        if gestures.scroll_delta != 0.0 && !gestures.scroll_delta.is_nan() {
            let zoom = gestures.scroll_delta * self.settings.zoom_speed * self.settings.zoom_scale;
            self.distance = self.clamp_distance(self.distance - zoom);
            changed = true;
        }

        if gestures.pan && delta != Vec2::ZERO {
            let right = Quat::from_rotation_y(self.yaw) * Vec3::X;
            let up = Quat::from_rotation_x(self.pitch) * Vec3::Y;
            self.target += (right * -delta.x + up * delta.y) * self.settings.pan_speed;
            changed = true;
        }

        self.update_view();
        changed
    }

    /// Recomputes the projection for a new surface size. A zero height is ignored.
    pub fn update_aspect_ratio(&mut self, width: u32, height: u32) -> bool {
        if width == 0 || height == 0 {
            return false;
        }
        self.aspect_ratio = width as f32 / height as f32;
        self.update_projection();
        true
    }

    pub fn target(&self) -> Vec3 {
        self.target
    }

    #[allow(dead_code)]
    pub fn yaw(&self) -> f32 {
        self.yaw
    }

    #[allow(dead_code)]
    pub fn pitch(&self) -> f32 {
        self.pitch
    }

    #[allow(dead_code)]
    pub fn distance(&self) -> f32 {
        self.distance
    }

    #[allow(dead_code)]
    pub fn aspect_ratio(&self) -> f32 {
        self.aspect_ratio
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn view(&self) -> Mat4 {
        self.view
    }

    pub fn projection(&self) -> Mat4 {
        self.projection
    }

    #[allow(dead_code)]
    pub fn settings(&self) -> &CameraSettings {
        &self.settings
    }

    pub fn pitch_limit(&self) -> f32 {
        FRAC_PI_2 - self.settings.pitch_margin
    }

    pub fn debug_summary(&self) -> String {
        format!(
            "camera ({:.2}, {:.2}, {:.2}) dist {:.2}",
            self.position.x, self.position.y, self.position.z, self.distance
        )
    }

    fn clamp_pitch(&self, pitch: f32) -> f32 {
        // Inverted bounds must not panic.
        let limit = self.pitch_limit().max(0.0);
        pitch.max(-limit).min(limit)
    }

    fn clamp_distance(&self, distance: f32) -> f32 {
        distance
            .max(self.settings.min_distance)
            .min(self.settings.max_distance)
    }

    fn update_view(&mut self) {
        let rotation = Quat::from_euler(EulerRot::YXZ, self.yaw, self.pitch, 0.0);
        self.position = self.target + rotation * Vec3::Z * self.distance;
        self.view = Mat4::look_at_rh(self.position, self.target, Vec3::Y);
    }

    fn update_projection(&mut self) {
        self.projection = Mat4::perspective_rh(
            self.settings.fov_y_deg.to_radians(),
            self.aspect_ratio,
            self.settings.near,
            self.settings.far,
        );
    }
}
