//! Input sampler with action-based mapping
//!
//! Raw winit events buffer into the sampler at any time; the controller calls
//! [`InputSampler::sample`] once per tick and everything downstream works off
//! that snapshot. Pointer look only accumulates while the pointer is captured.

use std::collections::{HashMap, HashSet};
use std::f32::consts::{PI, TAU};

use serde::{Deserialize, Serialize};
use tracing::debug;
use winit::event::{DeviceEvent, ElementState, MouseButton, MouseScrollDelta, WindowEvent};
use winit::keyboard::{KeyCode, PhysicalKey};

/// Actions the movement core understands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InputAction {
    /// Move forward (W / Up by default)
    MoveForward,
    /// Move backward (S / Down by default)
    MoveBackward,
    /// Move left (A / Left by default)
    MoveLeft,
    /// Move right (D / Right by default)
    MoveRight,
    /// Jump (Space by default)
    Jump,
    /// Sprint modifier (either Shift by default)
    Sprint,
    /// Crouch, or slide when moving fast (C / Left Ctrl by default)
    Crouch,
    /// Enter pointer capture (left mouse button by default)
    CapturePointer,
    /// Leave pointer capture (Escape by default)
    ReleasePointer,
}

/// Binding of a physical key or button to an action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputBinding {
    /// Keyboard key
    Key(KeyCode),
    /// Mouse button
    Mouse(u32), // 0 = left, 1 = right, 2 = middle
}

impl From<KeyCode> for InputBinding {
    fn from(key: KeyCode) -> Self {
        Self::Key(key)
    }
}

/// Maps physical inputs to actions. Several bindings may share one action.
#[derive(Debug, Clone)]
pub struct InputBindings {
    bindings: HashMap<InputBinding, InputAction>,
    reverse: HashMap<InputAction, Vec<InputBinding>>,
}

impl Default for InputBindings {
    fn default() -> Self {
        let mut bindings = Self::empty();

        bindings.bind(KeyCode::KeyW, InputAction::MoveForward);
        bindings.bind(KeyCode::KeyS, InputAction::MoveBackward);
        bindings.bind(KeyCode::KeyA, InputAction::MoveLeft);
        bindings.bind(KeyCode::KeyD, InputAction::MoveRight);

        // Arrow keys as alternative
        bindings.bind(KeyCode::ArrowUp, InputAction::MoveForward);
        bindings.bind(KeyCode::ArrowDown, InputAction::MoveBackward);
        bindings.bind(KeyCode::ArrowLeft, InputAction::MoveLeft);
        bindings.bind(KeyCode::ArrowRight, InputAction::MoveRight);

        bindings.bind(KeyCode::Space, InputAction::Jump);
        bindings.bind(KeyCode::ShiftLeft, InputAction::Sprint);
        bindings.bind(KeyCode::ShiftRight, InputAction::Sprint);
        bindings.bind(KeyCode::KeyC, InputAction::Crouch);
        bindings.bind(KeyCode::ControlLeft, InputAction::Crouch);
        bindings.bind(KeyCode::Escape, InputAction::ReleasePointer);
        bindings.bind_mouse(0, InputAction::CapturePointer);

        bindings
    }
}

impl InputBindings {
    /// Bindings with nothing mapped
    pub fn empty() -> Self {
        Self {
            bindings: HashMap::new(),
            reverse: HashMap::new(),
        }
    }

    /// Bind a key to an action, replacing whatever the key did before
    pub fn bind(&mut self, key: KeyCode, action: InputAction) {
        self.insert(InputBinding::Key(key), action);
    }

    /// Bind a mouse button to an action
    pub fn bind_mouse(&mut self, button: u32, action: InputAction) {
        self.insert(InputBinding::Mouse(button), action);
    }

    fn insert(&mut self, binding: InputBinding, action: InputAction) {
        if let Some(previous) = self.bindings.insert(binding, action) {
            if let Some(list) = self.reverse.get_mut(&previous) {
                list.retain(|b| *b != binding);
            }
        }
        self.reverse.entry(action).or_default().push(binding);
    }

    /// Unbind a key or button
    pub fn unbind(&mut self, binding: InputBinding) {
        if let Some(action) = self.bindings.remove(&binding) {
            if let Some(list) = self.reverse.get_mut(&action) {
                list.retain(|b| *b != binding);
            }
        }
    }

    /// Get the action for a binding, if any
    pub fn get_action(&self, binding: &InputBinding) -> Option<InputAction> {
        self.bindings.get(binding).copied()
    }

    /// Get the action for a key, if any
    pub fn get_key_action(&self, key: KeyCode) -> Option<InputAction> {
        self.get_action(&InputBinding::Key(key))
    }

    /// All bindings for an action
    pub fn bindings_for(&self, action: InputAction) -> &[InputBinding] {
        self.reverse.get(&action).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Camera look angles in radians
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LookAngles {
    pub pitch: f32,
    pub yaw: f32,
}

/// How pointer deltas become look angles
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LookSettings {
    /// Radians per pixel
    pub sensitivity: f32,
    pub invert_y: bool,
    /// Lowest pitch (radians)
    pub pitch_min: f32,
    /// Highest pitch (radians)
    pub pitch_max: f32,
}

impl Default for LookSettings {
    fn default() -> Self {
        Self {
            sensitivity: 0.003,
            invert_y: false,
            pitch_min: -80f32.to_radians(),
            pitch_max: 80f32.to_radians(),
        }
    }
}

impl LookSettings {
    fn clamp_pitch(&self, pitch: f32) -> f32 {
        pitch.clamp(self.pitch_min, self.pitch_max.max(self.pitch_min))
    }
}

/// One tick's input snapshot
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InputState {
    pub forward: bool,
    pub backward: bool,
    pub left: bool,
    pub right: bool,
    pub jump: bool,
    pub sprint: bool,
    pub crouch: bool,
    /// Accumulated look angles
    pub look: LookAngles,
    /// Jump state of the previous snapshot, for edge detection
    pub previous_jump: bool,
    /// Scroll notches since the previous snapshot (positive = zoom in)
    pub zoom: f32,
    /// Whether the pointer is captured
    pub captured: bool,
}

impl InputState {
    /// Jump went from released to held this tick
    pub fn jump_pressed(&self) -> bool {
        self.jump && !self.previous_jump
    }

    /// Any movement key held
    pub fn has_movement(&self) -> bool {
        self.forward || self.backward || self.left || self.right
    }
}

/// Pointer capture transitions the host must mirror on the real cursor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureNotice {
    Captured,
    Released,
}

/// Buffers raw events and produces per-tick [`InputState`] snapshots
#[derive(Debug)]
pub struct InputSampler {
    bindings: InputBindings,
    settings: LookSettings,
    held: HashSet<InputAction>,
    look: LookAngles,
    scroll: f32,
    previous_jump: bool,
    active: bool,
    captured: bool,
    capture_available: bool,
    notices: Vec<CaptureNotice>,
}

impl Default for InputSampler {
    fn default() -> Self {
        Self::new(LookSettings::default())
    }
}

impl InputSampler {
    /// Create an inactive sampler with default bindings
    pub fn new(settings: LookSettings) -> Self {
        Self {
            bindings: InputBindings::default(),
            settings,
            held: HashSet::new(),
            look: LookAngles::default(),
            scroll: 0.0,
            previous_jump: false,
            active: false,
            captured: false,
            capture_available: true,
            notices: Vec::new(),
        }
    }

    pub fn bindings(&self) -> &InputBindings {
        &self.bindings
    }

    /// Rebind keys
    pub fn bindings_mut(&mut self) -> &mut InputBindings {
        &mut self.bindings
    }

    pub fn look_settings(&self) -> &LookSettings {
        &self.settings
    }

    /// Replace look settings; the current pitch is re-clamped to the new limits
    pub fn set_look_settings(&mut self, settings: LookSettings) {
        self.settings = settings;
        self.look.pitch = self.settings.clamp_pitch(self.look.pitch);
    }

    /// Current look angles
    pub fn look(&self) -> LookAngles {
        self.look
    }

    /// Set look angles directly (spawn orientation, scripted cameras)
    pub fn set_look(&mut self, look: LookAngles) {
        self.look = LookAngles {
            pitch: self.settings.clamp_pitch(look.pitch),
            yaw: wrap_angle(look.yaw),
        };
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Only an active sampler reacts to device events.
    /// Deactivating releases capture and drops held actions.
    pub fn set_active(&mut self, active: bool) {
        if self.active == active {
            return;
        }
        self.active = active;
        if !active {
            self.release_capture();
            self.held.clear();
            self.scroll = 0.0;
        }
    }

    pub fn is_captured(&self) -> bool {
        self.captured
    }

    /// Whether the host can grant exclusive pointer capture
    pub fn set_capture_available(&mut self, available: bool) {
        self.capture_available = available;
        if !available {
            self.release_capture();
        }
    }

    fn request_capture(&mut self) {
        if self.captured {
            return;
        }
        if !self.capture_available {
            debug!("Pointer capture unavailable, look input disabled");
            return;
        }
        self.captured = true;
        self.notices.push(CaptureNotice::Captured);
    }

    fn release_capture(&mut self) {
        if self.captured {
            self.captured = false;
            self.notices.push(CaptureNotice::Released);
        }
    }

    /// Capture transitions since the last drain
    pub fn drain_notices(&mut self) -> Vec<CaptureNotice> {
        std::mem::take(&mut self.notices)
    }

    /// Press an action programmatically (scripted input, tests)
    pub fn press(&mut self, action: InputAction) {
        match action {
            InputAction::CapturePointer => {
                if self.active {
                    self.request_capture();
                }
            }
            InputAction::ReleasePointer => self.release_capture(),
            _ => {
                self.held.insert(action);
            }
        }
    }

    /// Release an action programmatically
    pub fn release(&mut self, action: InputAction) {
        self.held.remove(&action);
    }

    pub fn is_held(&self, action: InputAction) -> bool {
        self.held.contains(&action)
    }

    fn handle_binding(&mut self, binding: InputBinding, state: ElementState) {
        let Some(action) = self.bindings.get_action(&binding) else {
            return;
        };
        match state {
            ElementState::Pressed => self.press(action),
            ElementState::Released => self.release(action),
        }
    }

    /// Handle a keyboard event
    pub fn handle_keyboard(&mut self, physical_key: PhysicalKey, state: ElementState) {
        if !self.active {
            return;
        }
        if let PhysicalKey::Code(key_code) = physical_key {
            self.handle_binding(InputBinding::Key(key_code), state);
        }
    }

    /// Handle a mouse button event
    pub fn handle_mouse_button(&mut self, button: MouseButton, state: ElementState) {
        if !self.active {
            return;
        }
        let button_id = match button {
            MouseButton::Left => 0,
            MouseButton::Right => 1,
            MouseButton::Middle => 2,
            MouseButton::Back => 3,
            MouseButton::Forward => 4,
            MouseButton::Other(id) => id as u32,
        };
        self.handle_binding(InputBinding::Mouse(button_id), state);
    }

    /// Handle raw pointer motion. Ignored unless captured.
    pub fn handle_mouse_motion(&mut self, delta: (f64, f64)) {
        if !self.active || !self.captured {
            return;
        }
        let (dx, dy) = (delta.0 as f32, delta.1 as f32);
        if !dx.is_finite() || !dy.is_finite() {
            return;
        }

        let y_mult = if self.settings.invert_y { -1.0 } else { 1.0 };
        self.look.yaw = wrap_angle(self.look.yaw - dx * self.settings.sensitivity);
        self.look.pitch = self
            .settings
            .clamp_pitch(self.look.pitch - dy * self.settings.sensitivity * y_mult);
    }

    /// Handle scroll wheel
    pub fn handle_scroll(&mut self, delta: MouseScrollDelta) {
        if !self.active {
            return;
        }
        let scroll = match delta {
            MouseScrollDelta::LineDelta(_, y) => y,
            MouseScrollDelta::PixelDelta(pos) => pos.y as f32 / 120.0,
        };
        self.scroll += scroll;
    }

    /// Window focus changed. Losing focus releases capture and held keys.
    pub fn handle_focus(&mut self, focused: bool) {
        if !focused {
            self.release_capture();
            self.held.clear();
        }
    }

    /// Forward a winit window event
    pub fn handle_window_event(&mut self, event: &WindowEvent) {
        match event {
            WindowEvent::KeyboardInput { event, .. } => {
                if !event.repeat {
                    self.handle_keyboard(event.physical_key, event.state);
                }
            }
            WindowEvent::MouseInput { state, button, .. } => {
                self.handle_mouse_button(*button, *state);
            }
            WindowEvent::MouseWheel { delta, .. } => self.handle_scroll(*delta),
            WindowEvent::Focused(focused) => self.handle_focus(*focused),
            _ => {}
        }
    }

    /// Forward a winit device event (raw pointer motion)
    pub fn handle_device_event(&mut self, event: &DeviceEvent) {
        if let DeviceEvent::MouseMotion { delta } = event {
            self.handle_mouse_motion(*delta);
        }
    }

    /// Snapshot for this tick
    pub fn sample(&mut self) -> InputState {
        let jump = self.is_held(InputAction::Jump);
        let state = InputState {
            forward: self.is_held(InputAction::MoveForward),
            backward: self.is_held(InputAction::MoveBackward),
            left: self.is_held(InputAction::MoveLeft),
            right: self.is_held(InputAction::MoveRight),
            jump,
            sprint: self.is_held(InputAction::Sprint),
            crouch: self.is_held(InputAction::Crouch),
            look: self.look,
            previous_jump: self.previous_jump,
            zoom: std::mem::take(&mut self.scroll),
            captured: self.captured,
        };
        self.previous_jump = jump;
        state
    }
}

/// Wrap an angle into (-PI, PI]
pub(crate) fn wrap_angle(angle: f32) -> f32 {
    if !angle.is_finite() {
        return 0.0;
    }
    let wrapped = (angle + PI).rem_euclid(TAU) - PI;
    if wrapped <= -PI {
        wrapped + TAU
    } else {
        wrapped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn active_sampler() -> InputSampler {
        let mut sampler = InputSampler::default();
        sampler.set_active(true);
        sampler
    }

    fn key(sampler: &mut InputSampler, code: KeyCode, state: ElementState) {
        sampler.handle_keyboard(PhysicalKey::Code(code), state);
    }

    #[test]
    fn test_default_bindings() {
        let bindings = InputBindings::default();
        assert_eq!(bindings.get_key_action(KeyCode::KeyW), Some(InputAction::MoveForward));
        assert_eq!(bindings.get_key_action(KeyCode::ArrowUp), Some(InputAction::MoveForward));
        assert_eq!(bindings.bindings_for(InputAction::Sprint).len(), 2);
    }

    #[test]
    fn test_rebind_moves_key() {
        let mut bindings = InputBindings::default();
        bindings.bind(KeyCode::KeyW, InputAction::Jump);
        assert_eq!(bindings.get_key_action(KeyCode::KeyW), Some(InputAction::Jump));
        assert_eq!(bindings.bindings_for(InputAction::MoveForward).len(), 1);

        bindings.unbind(InputBinding::Key(KeyCode::KeyW));
        assert_eq!(bindings.get_key_action(KeyCode::KeyW), None);
    }

    #[test]
    fn test_two_bindings_one_action() {
        let mut sampler = active_sampler();
        key(&mut sampler, KeyCode::KeyW, ElementState::Pressed);
        key(&mut sampler, KeyCode::ArrowUp, ElementState::Pressed);
        assert!(sampler.sample().forward);

        key(&mut sampler, KeyCode::ArrowUp, ElementState::Released);
        assert!(!sampler.sample().forward);
    }

    #[test]
    fn test_jump_edge() {
        let mut sampler = active_sampler();
        key(&mut sampler, KeyCode::Space, ElementState::Pressed);
        assert!(sampler.sample().jump_pressed());
        assert!(!sampler.sample().jump_pressed());

        key(&mut sampler, KeyCode::Space, ElementState::Released);
        assert!(!sampler.sample().jump);
        key(&mut sampler, KeyCode::Space, ElementState::Pressed);
        assert!(sampler.sample().jump_pressed());
    }

    #[test]
    fn test_look_requires_capture() {
        let mut sampler = active_sampler();
        sampler.handle_mouse_motion((100.0, 0.0));
        assert_eq!(sampler.look(), LookAngles::default());

        sampler.handle_mouse_button(MouseButton::Left, ElementState::Pressed);
        assert!(sampler.is_captured());
        sampler.handle_mouse_motion((100.0, 0.0));
        assert!((sampler.look().yaw + 0.3).abs() < 1e-5);
        assert_eq!(sampler.drain_notices(), vec![CaptureNotice::Captured]);
    }

    #[test]
    fn test_pitch_clamped_for_any_delta() {
        let mut sampler = active_sampler();
        sampler.press(InputAction::CapturePointer);
        let limits = *sampler.look_settings();

        for delta in [1e6, -1e6, 350.0, -12.5, 0.0, 1e-3, -7e4] {
            sampler.handle_mouse_motion((delta, delta));
            let pitch = sampler.look().pitch;
            assert!(pitch >= limits.pitch_min && pitch <= limits.pitch_max);
        }
    }

    #[test]
    fn test_yaw_wraps() {
        let mut sampler = active_sampler();
        sampler.press(InputAction::CapturePointer);
        for _ in 0..50 {
            sampler.handle_mouse_motion((500.0, 0.0));
            let yaw = sampler.look().yaw;
            assert!(yaw > -PI && yaw <= PI);
        }
    }

    #[test]
    fn test_escape_and_focus_release_capture() {
        let mut sampler = active_sampler();
        sampler.press(InputAction::CapturePointer);
        key(&mut sampler, KeyCode::Escape, ElementState::Pressed);
        assert!(!sampler.is_captured());

        sampler.press(InputAction::CapturePointer);
        key(&mut sampler, KeyCode::KeyD, ElementState::Pressed);
        sampler.handle_focus(false);
        assert!(!sampler.is_captured());
        assert!(!sampler.sample().right);

        assert_eq!(
            sampler.drain_notices(),
            vec![
                CaptureNotice::Captured,
                CaptureNotice::Released,
                CaptureNotice::Captured,
                CaptureNotice::Released,
            ]
        );
    }

    #[test]
    fn test_capture_unavailable_keeps_movement() {
        let mut sampler = active_sampler();
        sampler.set_capture_available(false);
        sampler.press(InputAction::CapturePointer);
        sampler.handle_mouse_motion((50.0, 50.0));
        key(&mut sampler, KeyCode::KeyW, ElementState::Pressed);

        let state = sampler.sample();
        assert!(!state.captured);
        assert!(state.forward);
        assert_eq!(state.look, LookAngles::default());
        assert!(sampler.drain_notices().is_empty());
    }

    #[test]
    fn test_inactive_sampler_ignores_devices() {
        let mut sampler = InputSampler::default();
        key(&mut sampler, KeyCode::KeyW, ElementState::Pressed);
        sampler.handle_mouse_button(MouseButton::Left, ElementState::Pressed);
        assert!(!sampler.sample().forward);
        assert!(!sampler.is_captured());
    }

    #[test]
    fn test_deactivate_releases_capture() {
        let mut sampler = active_sampler();
        sampler.press(InputAction::CapturePointer);
        sampler.press(InputAction::Sprint);
        sampler.set_active(false);
        sampler.set_active(false);

        assert!(!sampler.is_captured());
        assert!(!sampler.sample().sprint);
        assert_eq!(
            sampler.drain_notices(),
            vec![CaptureNotice::Captured, CaptureNotice::Released]
        );
    }

    #[test]
    fn test_scroll_consumed_per_sample() {
        let mut sampler = active_sampler();
        sampler.handle_scroll(MouseScrollDelta::LineDelta(0.0, 2.0));
        assert_eq!(sampler.sample().zoom, 2.0);
        assert_eq!(sampler.sample().zoom, 0.0);
    }

    #[test]
    fn test_tighter_limits_reclamp_pitch() {
        let mut sampler = active_sampler();
        sampler.set_look(LookAngles { pitch: 1.2, yaw: 0.0 });
        sampler.set_look_settings(LookSettings {
            pitch_max: 0.5,
            ..LookSettings::default()
        });
        assert_eq!(sampler.look().pitch, 0.5);
    }

    #[test]
    fn test_wrap_angle() {
        assert!((wrap_angle(2.5 * PI) - 0.5 * PI).abs() < 1e-4);
        assert!((wrap_angle(-PI) - PI).abs() < 1e-5);
        assert_eq!(wrap_angle(f32::NAN), 0.0);
    }
}
