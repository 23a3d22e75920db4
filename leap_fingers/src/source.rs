//! Hand tracking sources: LeapMotion hardware and mouse simulation.
//!
//! Every source pushes [`InputEvent::Frame`]s into the engine's channel.
//! Consumers don't need to know whether frames came from real hardware or
//! the simulation window.

use std::sync::mpsc::{Receiver, Sender};
use std::thread::{self, JoinHandle};

use log::{debug, info};

use fingers_core::config::ProfileSelect;
use fingers_core::{HandFrame, HandSample, InputEvent, RingTelemetry, Side, Vec3, WindowGeometry};

// ════════════════════════════════════════════════════════════════════════════
// HandSource trait: unified interface for hw and sim
// ════════════════════════════════════════════════════════════════════════════

/// Anything that can deliver hand frames (and possibly other inputs) over a
/// channel.
pub trait HandSource: Send + 'static {
    fn run(self: Box<Self>, tx: Sender<InputEvent>);
}

/// Spawn a source on its own thread, feeding `tx`.
pub fn spawn_source<S: HandSource>(source: S, tx: Sender<InputEvent>) -> JoinHandle<()> {
    thread::spawn(move || Box::new(source).run(tx))
}

// ════════════════════════════════════════════════════════════════════════════
// Sensor conventions
// ════════════════════════════════════════════════════════════════════════════

/// Map a raw LeapC position (head-mounted, HMD-optimised) into the sensor
/// frame the core expects: `x` right, `y` up, `z` away from the eye.
///
/// In HMD mode LeapC reports `x` mirrored, `y` as depth and `z` growing
/// downwards.
pub fn leap_to_sensor_frame(p: [f32; 3]) -> Vec3 {
    Vec3::new(-p[0], -p[2], p[1])
}

/// Scroll-drag proxy from a raw LeapC knuckle position. The sensor's own
/// rotation estimate is too noisy, so sliding the hand either forwards or
/// sideways works as the "turn".
pub fn drag_proxy(p: [f32; 3]) -> f32 {
    p[2] + p[0]
}

/// Which hand LeapC says this is. A sensor mounted facing the user sees
/// the hands mirrored; `swap_sides` corrects for that.
pub fn side_from_leap(is_left: bool, swap_sides: bool) -> Side {
    match (is_left, swap_sides) {
        (true,  false) | (false, true)  => Side::Left,
        (false, false) | (true,  true)  => Side::Right,
    }
}

// ════════════════════════════════════════════════════════════════════════════
// LeapSource: real hardware (feature = "leap")
// ════════════════════════════════════════════════════════════════════════════

/// Hand source backed by a real LeapMotion controller.
///
/// Requires the `leap` feature flag and the LeapC shared library installed.
/// Each tracking frame reports the index-finger knuckle of each visible hand.
#[cfg(feature = "leap")]
pub struct LeapSource {
    pub swap_sides: bool,
}

#[cfg(feature = "leap")]
impl HandSource for LeapSource {
    fn run(self: Box<Self>, tx: Sender<InputEvent>) {
        use leaprs::*;

        let mut connection = match Connection::create(ConnectionConfig::default()) {
            Ok(c)  => c,
            Err(e) => {
                log::error!("cannot create LeapC connection: {:?}", e);
                return;
            }
        };
        if let Err(e) = connection.open() {
            log::error!("cannot open LeapMotion device: {:?}", e);
            return;
        }
        info!("LeapMotion connection open");

        loop {
            let msg = match connection.poll(100) {
                Ok(m)  => m,
                Err(_) => continue,
            };

            if let Event::Tracking(frame) = msg.event() {
                let mut out = HandFrame::empty();
                for hand in frame.hands() {
                    let Some(index) = hand.digits().nth(1) else { continue };
                    let k = index.metacarpal().next_joint();
                    let raw = [k.x, k.y, k.z];
                    let side = side_from_leap(hand.hand_type() == HandType::Left, self.swap_sides);
                    let sample = HandSample::tracked(side, leap_to_sensor_frame(raw), drag_proxy(raw));
                    match side {
                        Side::Left  => out.left  = sample,
                        Side::Right => out.right = sample,
                    }
                }
                if tx.send(InputEvent::Frame(out)).is_err() {
                    return;
                }
            }
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// SimSource: mouse/keyboard simulation (always available)
// ════════════════════════════════════════════════════════════════════════════

/// Ring id used for the keyboard-simulated ring.
pub const SIM_RING: u64 = 0x5137_0000_0001;

/// Distance of the simulated hands in front of the sensor (mm).
const SIM_DEPTH:     f32 = 160.0;
/// Sensor-frame reach covered by the whole window, per axis (mm).
const SIM_REACH_X:   f32 = 260.0;
const SIM_REACH_Y:   f32 = 170.0;
/// Where the idle second hand rests.
const SIM_IDLE_HAND: Vec3 = Vec3::new(-150.0, -110.0, SIM_DEPTH);

/// Raw input from the simulation window.
#[derive(Clone, Debug, PartialEq)]
pub enum SimInput {
    /// Mouse position, normalised to `-1.0..=1.0` across the window.
    Pointer { x: f32, y: f32 },
    /// Turn the simulated hand by this many degrees.
    Drag(f32),
    /// Show or hide a hand.
    ToggleHand(Side),
    /// Swap which hand follows the mouse.
    SwapMouseHand,
    /// Full button bitmask of the simulated ring.
    RingButtons(u8),
    RingBattery(u8),
    RingLost,
    SwapRings,
    SelectProfile(String),
    Window(WindowGeometry),
    Quit,
}

/// Hand source driven by [`SimInput`] events from the visualizer's window.
///
/// With `hands` off only the ring/profile inputs are forwarded, so the
/// window can simulate a ring next to real hardware tracking.
pub struct SimSource {
    pub rx:    Receiver<SimInput>,
    pub hands: bool,
}

/// Simulated tracking state.
#[derive(Clone, Debug)]
pub struct SimHands {
    pub mouse_hand: Side,
    pub visible:    [bool; 2],
    pub pointer:    (f32, f32),
    pub drag:       f32,
}

impl Default for SimHands {
    fn default() -> Self {
        SimHands {
            mouse_hand: Side::Right,
            visible:    [false, true],
            pointer:    (0.0, 0.0),
            drag:       0.0,
        }
    }
}

fn slot(side: Side) -> usize {
    match side {
        Side::Left  => 0,
        Side::Right => 1,
    }
}

impl SimHands {
    /// The frame the sensor would report right now.
    pub fn frame(&self) -> HandFrame {
        let mut frame = HandFrame::empty();
        for side in [Side::Left, Side::Right] {
            if !self.visible[slot(side)] {
                continue;
            }
            let sample = if side == self.mouse_hand {
                let pos = Vec3::new(self.pointer.0 * SIM_REACH_X, -self.pointer.1 * SIM_REACH_Y, SIM_DEPTH);
                HandSample::tracked(side, pos, self.drag)
            } else {
                let mut idle = SIM_IDLE_HAND;
                if side == Side::Right {
                    idle.x = -idle.x;
                }
                HandSample::tracked(side, idle, 0.0)
            };
            match side {
                Side::Left  => frame.left  = sample,
                Side::Right => frame.right = sample,
            }
        }
        frame
    }

    /// Apply one input; `None` for inputs that end the simulation.
    pub fn translate(&mut self, input: SimInput, hands: bool) -> Option<Vec<InputEvent>> {
        let frame_changed = match &input {
            SimInput::Pointer { x, y } => {
                self.pointer = (x.clamp(-1.0, 1.0), y.clamp(-1.0, 1.0));
                true
            }
            SimInput::Drag(d) => {
                self.drag += d;
                true
            }
            SimInput::ToggleHand(side) => {
                let v = &mut self.visible[slot(*side)];
                *v = !*v;
                debug!("sim {} hand {}", side.as_str(), if *v { "shown" } else { "hidden" });
                true
            }
            SimInput::SwapMouseHand => {
                self.mouse_hand = self.mouse_hand.other();
                true
            }
            _ => false,
        };

        let event = match input {
            SimInput::Quit => return None,
            SimInput::RingButtons(mask) => Some(InputEvent::Ring(RingTelemetry {
                ring_id: SIM_RING,
                bytes:   vec![0, 0, 0, 0, mask],
            })),
            SimInput::RingBattery(p) => Some(InputEvent::RingBattery(RingTelemetry {
                ring_id: SIM_RING,
                bytes:   vec![p],
            })),
            SimInput::RingLost            => Some(InputEvent::RingLost(SIM_RING)),
            SimInput::SwapRings           => Some(InputEvent::SwapRings),
            SimInput::SelectProfile(name) => Some(InputEvent::SelectProfile(ProfileSelect::Named(name))),
            SimInput::Window(geom)        => Some(InputEvent::Window(geom)),
            _ => None,
        };

        let mut out = Vec::new();
        if frame_changed && hands {
            out.push(InputEvent::Frame(self.frame()));
        }
        out.extend(event);
        Some(out)
    }
}

impl HandSource for SimSource {
    fn run(self: Box<Self>, tx: Sender<InputEvent>) {
        let mut sim = SimHands::default();
        for input in self.rx {
            let Some(events) = sim.translate(input, self.hands) else {
                info!("simulation closed");
                let _ = tx.send(InputEvent::Shutdown);
                return;
            };
            for event in events {
                if tx.send(event).is_err() { return; }
            }
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
