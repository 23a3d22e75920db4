//! Shared value types: vectors, hand samples, frames, and the input/output
//! vocabulary the engine speaks with its collaborators.

use serde::{Deserialize, Serialize};

// ════════════════════════════════════════════════════════════════════════════
// Vectors
// ════════════════════════════════════════════════════════════════════════════

/// A point or offset in the sensor frame (millimetres) or an Euler triple
/// (degrees), depending on context.
///
/// Sensor frame convention: `x` to the right, `y` up, `z` forward (depth,
/// away from the eye).
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const ZERO: Vec3 = Vec3 { x: 0.0, y: 0.0, z: 0.0 };

    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Vec3 { x, y, z }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

impl std::ops::Add for Vec3 {
    type Output = Vec3;
    fn add(self, o: Vec3) -> Vec3 {
        Vec3::new(self.x + o.x, self.y + o.y, self.z + o.z)
    }
}

/// A 2D value: screen-space angles (degrees), pixel offsets, or per-axis
/// scale factors.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    pub const fn new(x: f32, y: f32) -> Self {
        Vec2 { x, y }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Hands
// ════════════════════════════════════════════════════════════════════════════

/// Which hand.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Left,
    Right,
}

impl Side {
    pub fn other(self) -> Side {
        match self {
            Side::Left  => Side::Right,
            Side::Right => Side::Left,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Side::Left  => "left",
            Side::Right => "right",
        }
    }
}

/// One hand's tracked state for the current frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HandSample {
    pub side:       Side,
    /// False when the sensor does not see this hand this frame.
    pub active:     bool,
    /// Index knuckle position in the sensor frame (mm).
    pub position:   Vec3,
    /// Continuous position/rotation proxy used by the scroll gesture (degrees
    /// or millimetres; only differences matter).
    pub drag_angle: f32,
}

impl HandSample {
    pub fn tracked(side: Side, position: Vec3, drag_angle: f32) -> Self {
        HandSample { side, active: true, position, drag_angle }
    }

    pub fn absent(side: Side) -> Self {
        HandSample { side, active: false, position: Vec3::ZERO, drag_angle: 0.0 }
    }
}

/// Both hand candidates for one sensor frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HandFrame {
    pub left:  HandSample,
    pub right: HandSample,
}

impl HandFrame {
    pub fn empty() -> Self {
        HandFrame {
            left:  HandSample::absent(Side::Left),
            right: HandSample::absent(Side::Right),
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Ring + window inputs
// ════════════════════════════════════════════════════════════════════════════

/// Physical ring identity (its Bluetooth address).
pub type RingId = u64;

/// One BLE notification from a ring.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RingTelemetry {
    pub ring_id: RingId,
    pub bytes:   Vec<u8>,
}

/// Outer window rectangle of the target application, in screen pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WindowGeometry {
    pub x:      i32,
    pub y:      i32,
    pub width:  u32,
    pub height: u32,
}

// ════════════════════════════════════════════════════════════════════════════
// Outputs
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MouseSide {
    Left,
    Right,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Transition {
    Down,
    Up,
}

/// Non-authoritative notifications for a status display.
#[derive(Clone, Debug, PartialEq)]
pub enum StatusUpdate {
    RingConnected { ring_id: RingId, side: Side },
    RingLost      { ring_id: RingId },
    Battery       { ring_id: RingId, percent: u8 },
    ActiveHand(Option<Side>),
    Profile(String),
}

/// Everything the core asks its cursor driver to do.
#[derive(Clone, Debug, PartialEq)]
pub enum OutputAction {
    /// Absolute screen coordinates, already clamped to the screen.
    MoveCursor { x: i32, y: i32 },
    MouseButton { button: MouseSide, transition: Transition },
    /// Signed wheel delta.
    ScrollTick(i32),
    SetEnabled(bool),
    Status(StatusUpdate),
}

impl OutputAction {
    /// True for actions that reach the OS pointer (as opposed to status).
    pub fn is_pointer(&self) -> bool {
        matches!(
            self,
            OutputAction::MoveCursor { .. }
                | OutputAction::MouseButton { .. }
                | OutputAction::ScrollTick(_)
        )
    }
}

/// The external collaborator that injects pointer events.
///
/// Calls are fire-and-forget: implementations must not block the caller and
/// own any retry/recovery themselves.
pub trait CursorDriver {
    fn dispatch(&mut self, action: OutputAction);
}

/// Collects actions in memory; handy for tests and replay.
#[derive(Debug, Default)]
pub struct RecordingDriver {
    pub actions: Vec<OutputAction>,
}

impl CursorDriver for RecordingDriver {
    fn dispatch(&mut self, action: OutputAction) {
        self.actions.push(action);
    }
}
