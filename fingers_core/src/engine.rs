//! The engine: every stateful component behind one `step` function, plus the
//! single-consumer thread that feeds it.
//!
//! Sensor, ring and window callbacks arrive on whatever thread their library
//! uses. They only ever `send` an [`InputEvent`]; the engine thread owns all
//! state and is the only thing that mutates it.

use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::{self, JoinHandle};
use std::time::Instant;

use log::{debug, info, warn};

use crate::arbitration::{ArbitrationState, HandArbitrator};
use crate::buttons::{parse_battery, parse_state, ButtonEdgeDetector};
use crate::config::{Config, ConfigError, MountProfile, ProfileSelect, MIN_WINDOW_HEIGHT};
use crate::gesture::{GestureMachine, GestureState};
use crate::rings::{Registration, RingRegistry};
use crate::types::{
    CursorDriver, HandFrame, OutputAction, RingId, RingTelemetry, Side, StatusUpdate, Vec2,
    WindowGeometry,
};

// ════════════════════════════════════════════════════════════════════════════
// InputEvent
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Debug, PartialEq)]
pub enum InputEvent {
    /// One sensor frame.
    Frame(HandFrame),
    /// Button-state notification from a ring.
    Ring(RingTelemetry),
    /// Battery-level read from a ring.
    RingBattery(RingTelemetry),
    RingLost(RingId),
    /// Exchange which hand each ring is on.
    SwapRings,
    SelectProfile(ProfileSelect),
    /// The target application's window moved or resized.
    Window(WindowGeometry),
    /// Stop the event loop.
    Shutdown,
}

// ════════════════════════════════════════════════════════════════════════════
// Engine
// ════════════════════════════════════════════════════════════════════════════

pub struct Engine {
    config:       Config,
    profile:      MountProfile,
    profile_name: String,
    window:       Option<WindowGeometry>,
    arbitrator:   HandArbitrator,
    detector:     ButtonEdgeDetector,
    rings:        RingRegistry,
    gesture:      GestureMachine,
    last_hand:    Option<Side>,
}

impl Engine {
    /// Validate `config` and build an engine on its startup profile.
    pub fn new(config: Config) -> Result<Engine, ConfigError> {
        config.validate()?;
        let profile = config.resolve_profile(&config.mount.profile)?;
        let gesture = GestureMachine::new(
            config.gesture,
            config.buttons,
            config.screen,
            config.smoothing.0,
        );
        info!("engine ready, mount profile {}", config.mount.profile);
        Ok(Engine {
            profile,
            profile_name: config.mount.profile.clone(),
            window:       None,
            arbitrator:   HandArbitrator::new(config.arbitration),
            detector:     ButtonEdgeDetector::new(),
            rings:        RingRegistry::new(),
            gesture,
            last_hand:    None,
            config,
        })
    }

    pub fn config(&self)        -> &Config              { &self.config }
    pub fn profile(&self)       -> &MountProfile        { &self.profile }
    pub fn profile_name(&self)  -> &str                 { &self.profile_name }
    pub fn gesture_state(&self) -> GestureState         { self.gesture.state() }
    pub fn arbitration(&self)   -> ArbitrationState     { self.arbitrator.state() }
    pub fn rings(&self)         -> &RingRegistry        { &self.rings }
    pub fn window(&self)        -> Option<WindowGeometry> { self.window }

    /// Apply one input and return the actions it produced, in order.
    pub fn step(&mut self, event: InputEvent, now_ms: u64) -> Vec<OutputAction> {
        let mut out = Vec::new();

        match event {
            InputEvent::Frame(frame)        => self.on_frame(&frame, now_ms, &mut out),
            InputEvent::Ring(t)             => self.on_ring(t, now_ms, &mut out),
            InputEvent::RingBattery(t)      => self.on_battery(&t, &mut out),
            InputEvent::RingLost(ring_id)   => self.on_ring_lost(ring_id, now_ms, &mut out),
            InputEvent::SwapRings           => self.on_swap(&mut out),
            InputEvent::SelectProfile(sel)  => self.on_select_profile(sel, &mut out),
            InputEvent::Window(geom)        => self.on_window(geom),
            InputEvent::Shutdown            => {}
        }

        // the hand that armed a scroll keeps control until it ends
        self.arbitrator.set_dragging(self.gesture.is_scrolling());
        out
    }

    fn on_frame(&mut self, frame: &HandFrame, now_ms: u64, out: &mut Vec<OutputAction>) {
        let active = self.arbitrator.select(frame, &self.profile);
        let side = active.map(|h| h.side);
        if side != self.last_hand {
            self.last_hand = side;
            out.push(OutputAction::Status(StatusUpdate::ActiveHand(side)));
        }
        out.extend(self.gesture.on_hand(active, &self.profile, now_ms));
    }

    fn on_ring(&mut self, t: RingTelemetry, now_ms: u64, out: &mut Vec<OutputAction>) {
        if parse_state(&t.bytes).is_none() {
            debug!("ring {:X}: dropping {}-byte packet", t.ring_id, t.bytes.len());
            return;
        }
        let side = match self.rings.register(t.ring_id) {
            Registration::Known(side) => side,
            Registration::New(side) => {
                out.push(OutputAction::Status(StatusUpdate::RingConnected { ring_id: t.ring_id, side }));
                side
            }
            Registration::Full => return,
        };
        for event in self.detector.update_packet(t.ring_id, &t.bytes) {
            out.extend(self.gesture.on_button(event, side, now_ms));
        }
    }

    fn on_battery(&mut self, t: &RingTelemetry, out: &mut Vec<OutputAction>) {
        match parse_battery(&t.bytes) {
            Some(percent) => {
                debug!("ring {:X} battery {}%", t.ring_id, percent);
                out.push(OutputAction::Status(StatusUpdate::Battery { ring_id: t.ring_id, percent }));
            }
            None => debug!("ring {:X}: bad battery read {:?}", t.ring_id, t.bytes),
        }
    }

    fn on_ring_lost(&mut self, ring_id: RingId, now_ms: u64, out: &mut Vec<OutputAction>) {
        let held = self.detector.remove_ring(ring_id);
        if !held.is_empty() {
            debug!("ring {:X} lost with {} button(s) held", ring_id, held.len());
        }
        if let Some(side) = self.rings.remove(ring_id) {
            info!("ring {:X} ({} hand) disconnected", ring_id, side.as_str());
            out.push(OutputAction::Status(StatusUpdate::RingLost { ring_id }));
        }
        out.extend(self.gesture.on_ring_lost(ring_id, now_ms));
    }

    fn on_swap(&mut self, out: &mut Vec<OutputAction>) {
        self.rings.swap();
        for side in [Side::Left, Side::Right] {
            if let Some(ring_id) = self.rings.ring_on(side) {
                out.push(OutputAction::Status(StatusUpdate::RingConnected { ring_id, side }));
            }
        }
    }

    fn on_select_profile(&mut self, sel: ProfileSelect, out: &mut Vec<OutputAction>) {
        let (name, profile) = match sel {
            ProfileSelect::Named(name) => match self.config.resolve_profile(&name) {
                Ok(mut p) => {
                    if let Some(w) = self.window {
                        p = p.rescaled_for_window(&w);
                    }
                    (name, p)
                }
                Err(e) => {
                    warn!("profile not applied: {}", e);
                    return;
                }
            },
            ProfileSelect::Custom { name, rotation_offset_deg, position_offset_mm } => {
                if !(rotation_offset_deg.is_finite() && position_offset_mm.is_finite()) {
                    warn!("profile {} not applied: offsets must be finite", name);
                    return;
                }
                let p = MountProfile {
                    rotation_offset_deg,
                    position_offset_mm,
                    angle_to_pixel_scale: self.profile.angle_to_pixel_scale,
                };
                (name, p)
            }
        };
        info!("mount profile {} applied", name);
        self.profile = profile;
        self.profile_name = name.clone();
        out.push(OutputAction::Status(StatusUpdate::Profile(name)));
    }

    fn on_window(&mut self, geom: WindowGeometry) {
        if geom.height <= MIN_WINDOW_HEIGHT || geom.width == 0 {
            debug!("ignoring {}x{} window", geom.width, geom.height);
            return;
        }
        if self.window == Some(geom) {
            return;
        }
        self.window  = Some(geom);
        self.profile = self.profile.rescaled_for_window(&geom);
        let center = Vec2::new(
            geom.x as f32 + geom.width  as f32 / 2.0,
            geom.y as f32 + geom.height as f32 / 2.0,
        );
        self.gesture.set_center(center);
        info!(
            "window {}x{} at ({}, {}): {:.2}x{:.2} px/deg",
            geom.width, geom.height, geom.x, geom.y,
            self.profile.angle_to_pixel_scale.x, self.profile.angle_to_pixel_scale.y,
        );
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Event loop
// ════════════════════════════════════════════════════════════════════════════

/// Drain `rx` into `engine` until [`InputEvent::Shutdown`] or until every
/// sender is gone, dispatching actions to `driver` as they are produced.
/// Timestamps are milliseconds since the loop started.
pub fn run_event_loop<D: CursorDriver>(engine: &mut Engine, rx: Receiver<InputEvent>, driver: &mut D) {
    let start = Instant::now();
    for event in rx.iter() {
        if matches!(event, InputEvent::Shutdown) {
            info!("event loop shutting down");
            break;
        }
        let now_ms = start.elapsed().as_millis() as u64;
        for action in engine.step(event, now_ms) {
            driver.dispatch(action);
        }
    }
}

/// Handle to the engine thread.
pub struct EngineHandle<D> {
    pub input_tx: Sender<InputEvent>,
    join:         JoinHandle<(Engine, D)>,
}

impl<D: CursorDriver + Send + 'static> EngineHandle<D> {
    /// Move `engine` and `driver` onto their own thread.
    pub fn spawn(mut engine: Engine, mut driver: D) -> Self {
        let (input_tx, input_rx) = mpsc::channel::<InputEvent>();
        let join = thread::spawn(move || {
            run_event_loop(&mut engine, input_rx, &mut driver);
            (engine, driver)
        });
        EngineHandle { input_tx, join }
    }

    /// A sender for another producer thread.
    pub fn sender(&self) -> Sender<InputEvent> {
        self.input_tx.clone()
    }

    /// Ask the loop to stop and wait for it; hands back the engine and
    /// driver. Returns `None` if the engine thread panicked.
    pub fn shutdown(self) -> Option<(Engine, D)> {
        let _ = self.input_tx.send(InputEvent::Shutdown);
        self.join.join().ok()
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buttons::ButtonId;
    use crate::config::Preset;
    use crate::types::{HandSample, Vec3};

    fn engine() -> Engine {
        Engine::new(Config::default()).unwrap()
    }

    fn ring(ring_id: RingId, mask: u8) -> InputEvent {
        InputEvent::Ring(RingTelemetry { ring_id, bytes: vec![0, 0, 0, 0, mask] })
    }

    fn statuses(out: &[OutputAction]) -> Vec<StatusUpdate> {
        out.iter().filter_map(|a| match a {
            OutputAction::Status(s) => Some(s.clone()),
            _ => None,
        }).collect()
    }

    #[test]
    fn rejects_invalid_config() {
        let mut cfg = Config::default();
        cfg.mount.profile = "Nowhere".into();
        assert!(Engine::new(cfg).is_err());
    }

    #[test]
    fn first_packet_registers_ring() {
        let mut e = engine();
        let out = e.step(ring(0xAA, 0), 0);
        assert_eq!(statuses(&out), vec![StatusUpdate::RingConnected { ring_id: 0xAA, side: Side::Left }]);
        assert!(e.step(ring(0xAA, 0), 1).is_empty());
    }

    #[test]
    fn malformed_packet_does_not_register() {
        let mut e = engine();
        assert!(e.step(InputEvent::Ring(RingTelemetry { ring_id: 1, bytes: vec![1, 2] }), 0).is_empty());
        assert_eq!(e.rings().side_of(1), None);
    }

    #[test]
    fn third_ring_is_ignored() {
        let mut e = engine();
        e.step(ring(1, 0), 0);
        e.step(ring(2, 0), 0);
        assert!(e.step(ring(3, ButtonId::Fwd as u8), 0).is_empty());
    }

    #[test]
    fn battery_becomes_status() {
        let mut e = engine();
        let out = e.step(InputEvent::RingBattery(RingTelemetry { ring_id: 5, bytes: vec![64] }), 0);
        assert_eq!(statuses(&out), vec![StatusUpdate::Battery { ring_id: 5, percent: 64 }]);
        assert!(e.step(InputEvent::RingBattery(RingTelemetry { ring_id: 5, bytes: vec![] }), 0).is_empty());
    }

    #[test]
    fn swap_reports_new_sides() {
        let mut e = engine();
        e.step(ring(1, 0), 0);
        let out = e.step(InputEvent::SwapRings, 0);
        assert_eq!(statuses(&out), vec![StatusUpdate::RingConnected { ring_id: 1, side: Side::Right }]);
    }

    #[test]
    fn select_named_profile() {
        let mut e = engine();
        let out = e.step(InputEvent::SelectProfile(ProfileSelect::Named("Pimax".into())), 0);
        assert_eq!(statuses(&out), vec![StatusUpdate::Profile("Pimax".into())]);
        assert_eq!(*e.profile(), Preset::Pimax.profile());
        assert_eq!(e.profile_name(), "Pimax");
    }

    #[test]
    fn unknown_profile_keeps_current() {
        let mut e = engine();
        assert!(e.step(InputEvent::SelectProfile(ProfileSelect::Named("Quest".into())), 0).is_empty());
        assert_eq!(*e.profile(), Preset::Generic.profile());
    }

    #[test]
    fn window_rescales_and_survives_profile_change() {
        let mut e = engine();
        let w = WindowGeometry { x: 100, y: 50, width: 2000, height: 1250 };
        e.step(InputEvent::Window(w), 0);
        assert!((e.profile().angle_to_pixel_scale.x - 20.0).abs() < 1e-4);
        e.step(InputEvent::SelectProfile(ProfileSelect::Named("Joculus".into())), 0);
        assert!((e.profile().angle_to_pixel_scale.y - 20.0).abs() < 1e-4);
        e.step(InputEvent::SelectProfile(ProfileSelect::Custom {
            name:                "bench".into(),
            rotation_offset_deg: Vec3::ZERO,
            position_offset_mm:  Vec3::ZERO,
        }), 0);
        assert!((e.profile().angle_to_pixel_scale.x - 20.0).abs() < 1e-4);
        assert_eq!(e.profile_name(), "bench");
    }

    #[test]
    fn small_and_repeated_windows_are_ignored() {
        let mut e = engine();
        e.step(InputEvent::Window(WindowGeometry { x: 0, y: 0, width: 800, height: 600 }), 0);
        assert_eq!(e.window(), None);
        assert_eq!(*e.profile(), Preset::Generic.profile());
    }

    #[test]
    fn zero_width_window_is_ignored() {
        let mut e = engine();
        e.step(InputEvent::Window(WindowGeometry { x: 0, y: 0, width: 0, height: 1200 }), 0);
        assert_eq!(e.window(), None);
        assert_eq!(*e.profile(), Preset::Generic.profile());
    }

    #[test]
    fn window_moves_projection_center() {
        let mut cfg = Config::default();
        cfg.mount.profile = "bench".into();
        cfg.mount.custom.push(crate::config::NamedProfile {
            name:                 "bench".into(),
            rotation_offset_deg:  Vec3::ZERO,
            position_offset_mm:   Vec3::ZERO,
            angle_to_pixel_scale: None,
        });
        let mut e = Engine::new(cfg).unwrap();
        e.step(InputEvent::Window(WindowGeometry { x: 100, y: 40, width: 1000, height: 800 }), 0);
        let frame = HandFrame {
            left:  HandSample::tracked(Side::Left, Vec3::new(0.0, 0.0, 200.0), 0.0),
            right: HandSample::absent(Side::Right),
        };
        let out = e.step(InputEvent::Frame(frame), 0);
        assert!(out.contains(&OutputAction::MoveCursor { x: 600, y: 440 }));
    }

    #[test]
    fn event_loop_stops_on_shutdown() {
        let (tx, rx) = mpsc::channel();
        tx.send(ring(1, ButtonId::Fwd as u8)).unwrap();
        tx.send(InputEvent::Shutdown).unwrap();
        tx.send(ring(1, 0)).unwrap();
        let mut e = engine();
        let mut driver = crate::types::RecordingDriver::default();
        run_event_loop(&mut e, rx, &mut driver);
        // connect + left ring's Fwd is the secondary click; the release never ran
        assert_eq!(driver.actions.len(), 2);
    }
}
