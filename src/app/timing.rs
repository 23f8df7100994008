use std::time::{Duration, Instant};
use winit::window::Window;

/// Longest step handed to the scene, so a blocking dialog does not turn into
/// one huge jump.
const MAX_FRAME_DT: f32 = 0.25;
const TITLE_INTERVAL: f32 = 0.5;

pub struct FrameTiming {
    last_frame_time: Option<Instant>,
    last_fps_time: Instant,
    frame_count: u32,
    pub frame_dt: f32,
    fps: f32,
    base_title: String,
    overlay: Option<String>,
}

impl FrameTiming {
    pub fn new(base_title: String) -> Self {
        Self {
            last_frame_time: None,
            last_fps_time: Instant::now(),
            frame_count: 0,
            frame_dt: 1.0 / 60.0,
            fps: 0.0,
            base_title,
            overlay: None,
        }
    }

    pub fn set_base_title(&mut self, base_title: String, window: Option<&Window>) {
        self.base_title = base_title;
        if let Some(window) = window {
            window.set_title(&self.title());
        }
    }

    pub fn set_overlay(&mut self, overlay: Option<String>) {
        self.overlay = overlay;
    }

    pub fn title(&self) -> String {
        match &self.overlay {
            Some(overlay) => format!("{} - {:.1} fps - {}", self.base_title, self.fps, overlay),
            None => format!("{} - {:.1} fps", self.base_title, self.fps),
        }
    }

    pub fn update(&mut self, window: Option<&Window>, now: Instant) {
        let dt_duration = if let Some(last) = self.last_frame_time {
            now.saturating_duration_since(last)
        } else {
            Duration::from_millis(16)
        };
        self.last_frame_time = Some(now);
        self.frame_dt = dt_duration.as_secs_f32().clamp(0.0, MAX_FRAME_DT);

        self.frame_count = self.frame_count.saturating_add(1);
        let elapsed = now.saturating_duration_since(self.last_fps_time);
        if elapsed.as_secs_f32() >= TITLE_INTERVAL {
            self.fps = self.frame_count as f32 / elapsed.as_secs_f32();
            log::debug!("{:.1} fps", self.fps);
            if let Some(window) = window {
                window.set_title(&self.title());
            }
            self.frame_count = 0;
            self.last_fps_time = now;
        }
    }
}
