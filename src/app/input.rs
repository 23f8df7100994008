use crate::input::{InputSampler, Key, PointerButton};
use winit::event::{ElementState, MouseButton, MouseScrollDelta, WindowEvent};
use winit::keyboard::{KeyCode, PhysicalKey};

/// Wheel units per notch.
pub const WHEEL_NOTCH: f32 = 120.0;
/// Touchpad pixels treated as one notch.
const PIXELS_PER_NOTCH: f32 = 40.0;

pub fn map_key(key: PhysicalKey) -> Option<Key> {
    let PhysicalKey::Code(code) = key else {
        return None;
    };
    Some(match code {
        KeyCode::Escape => Key::Escape,
        KeyCode::Delete => Key::Delete,
        KeyCode::Insert => Key::Insert,
        KeyCode::ArrowLeft => Key::ArrowLeft,
        KeyCode::ArrowRight => Key::ArrowRight,
        KeyCode::ArrowUp => Key::ArrowUp,
        KeyCode::ArrowDown => Key::ArrowDown,
        KeyCode::KeyN => Key::N,
        KeyCode::KeyO => Key::O,
        KeyCode::KeyS => Key::S,
        _ => return None,
    })
}

pub fn map_button(button: MouseButton) -> Option<PointerButton> {
    match button {
        MouseButton::Left => Some(PointerButton::Left),
        MouseButton::Right => Some(PointerButton::Right),
        MouseButton::Middle => Some(PointerButton::Middle),
        _ => None,
    }
}

pub fn scroll_units(delta: MouseScrollDelta) -> f32 {
    match delta {
        MouseScrollDelta::LineDelta(_, y) => y * WHEEL_NOTCH,
        MouseScrollDelta::PixelDelta(position) => {
            position.y as f32 / PIXELS_PER_NOTCH * WHEEL_NOTCH
        }
    }
}

/// Editor commands bound to keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shortcut {
    Quit,
    NewScene,
    Open,
    Save,
    SaveAs,
    AddEntity,
    DeleteSelected,
}

/// Reads this frame's key edges. Ctrl (or Cmd) selects the document commands.
pub fn shortcut(input: &InputSampler) -> Option<Shortcut> {
    let pressed = |key| input.key_pressed_this_frame(key);
    if pressed(Key::Escape) {
        return Some(Shortcut::Quit);
    }
    if input.is_key_down(Key::Control) {
        if pressed(Key::N) {
            Some(Shortcut::NewScene)
        } else if pressed(Key::O) {
            Some(Shortcut::Open)
        } else if pressed(Key::S) && input.is_key_down(Key::Shift) {
            Some(Shortcut::SaveAs)
        } else if pressed(Key::S) {
            Some(Shortcut::Save)
        } else {
            None
        }
    } else if pressed(Key::Insert) {
        Some(Shortcut::AddEntity)
    } else if pressed(Key::Delete) {
        Some(Shortcut::DeleteSelected)
    } else {
        None
    }
}

/// Feeds one window event into the sampler. Returns `false` for events the
/// sampler does not care about.
pub fn forward_event(input: &mut InputSampler, event: &WindowEvent) -> bool {
    match event {
        WindowEvent::CursorMoved { position, .. } => {
            input.pointer_moved(position.x as f32, position.y as f32);
        }
        WindowEvent::MouseInput { state, button, .. } => {
            if let Some(button) = map_button(*button) {
                input.button_changed(button, *state == ElementState::Pressed);
            }
        }
        WindowEvent::MouseWheel { delta, .. } => input.scrolled(scroll_units(*delta)),
        WindowEvent::KeyboardInput { event, .. } => {
            if let Some(key) = map_key(event.physical_key) {
                input.key_changed(key, event.state == ElementState::Pressed);
            }
        }
        WindowEvent::ModifiersChanged(modifiers) => {
            let state = modifiers.state();
            input.key_changed(Key::Control, state.control_key() || state.super_key());
            input.key_changed(Key::Shift, state.shift_key());
        }
        WindowEvent::Focused(false) => input.release_all(),
        _ => return false,
    }
    true
}
