//! Top-level application wiring.
//!
//! The engine runs on its own thread behind an [`EngineHandle`]; every input
//! source (simulation window, LeapMotion, UDP ring bridge) holds a sender into
//! it. Actions come back over a [`ChannelDriver`] to this thread, which keeps
//! a [`StatusBoard`] for display and forwards each action to the real sink
//! (OS pointer with `inject`, the log otherwise).

use std::net::SocketAddr;
use std::sync::mpsc::{self, Receiver};

use anyhow::{bail, Context, Result};
use log::{info, warn};

use fingers_core::{
    Config, CursorDriver, Engine, EngineHandle, MouseSide, OutputAction, RingId, Side,
    StatusUpdate, Transition,
};

use crate::driver::{button_name, ChannelDriver};
use crate::ring_bridge::UdpRingBridge;
use crate::source::{spawn_source, SimInput, SimSource};
use crate::visualizer::Visualizer;

// ════════════════════════════════════════════════════════════════════════════
// AppConfig
// ════════════════════════════════════════════════════════════════════════════

/// Configuration for the full application.
#[derive(Clone, Debug, Default)]
pub struct AppConfig {
    pub config:     Config,
    /// No window: hardware and/or UDP ring only.
    pub headless:   bool,
    /// Listen for ring telemetry datagrams here.
    pub udp_ring:   Option<SocketAddr>,
    /// Correct for a sensor that reports hands mirrored.
    pub swap_hands: bool,
}

// ════════════════════════════════════════════════════════════════════════════
// StatusBoard
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RingStatus {
    pub ring_id: RingId,
    pub battery: Option<u8>,
}

/// What the status window shows; rebuilt purely from the action stream.
#[derive(Clone, Debug)]
pub struct StatusBoard {
    pub screen:       (u32, u32),
    /// Where the cursor parks when tracking is switched off.
    pub reset_point:  (i32, i32),
    pub cursor:       Option<(i32, i32)>,
    pub enabled:      bool,
    pub active_hand:  Option<Side>,
    /// Indexed left, right.
    pub rings:        [Option<RingStatus>; 2],
    pub profile:      String,
    pub profiles:     Vec<String>,
    /// Mouse buttons held, left and right.
    pub mouse_down:   [bool; 2],
    pub scroll_total: i64,
    pub last_event:   String,
}

fn side_slot(side: Side) -> usize {
    match side {
        Side::Left  => 0,
        Side::Right => 1,
    }
}

impl StatusBoard {
    pub fn new(config: &Config) -> Self {
        StatusBoard {
            screen:       (config.screen.width, config.screen.height),
            reset_point:  {
                let p = config.screen.reset_point();
                (p.x as i32, p.y as i32)
            },
            cursor:       None,
            enabled:      true,
            active_hand:  None,
            rings:        [None, None],
            profile:      config.mount.profile.clone(),
            profiles:     config.profile_names(),
            mouse_down:   [false, false],
            scroll_total: 0,
            last_event:   "Ready".to_string(),
        }
    }

    pub fn ring_on(&self, side: Side) -> Option<RingStatus> {
        self.rings[side_slot(side)]
    }

    pub fn apply(&mut self, action: &OutputAction) {
        match action {
            OutputAction::MoveCursor { x, y } => {
                self.cursor = Some((*x, *y));
            }
            OutputAction::MouseButton { button, transition } => {
                let i = if *button == MouseSide::Left { 0 } else { 1 };
                self.mouse_down[i] = *transition == Transition::Down;
                self.last_event = format!("click {}", button_name(*button, *transition));
            }
            OutputAction::ScrollTick(n) => {
                self.scroll_total += *n as i64;
                self.last_event = format!("scroll {:+}", n);
            }
            OutputAction::SetEnabled(on) => {
                self.enabled = *on;
                self.last_event = if *on { "tracking on" } else { "tracking off" }.to_string();
            }
            OutputAction::Status(s) => self.apply_status(s),
        }
    }

    fn apply_status(&mut self, status: &StatusUpdate) {
        match status {
            StatusUpdate::RingConnected { ring_id, side } => {
                let battery = self.rings.iter().flatten()
                    .find(|r| r.ring_id == *ring_id)
                    .and_then(|r| r.battery);
                for slot in self.rings.iter_mut() {
                    if slot.map_or(false, |r| r.ring_id == *ring_id) {
                        *slot = None;
                    }
                }
                self.rings[side_slot(*side)] = Some(RingStatus { ring_id: *ring_id, battery });
                self.last_event = format!("ring {:X} on {} hand", ring_id, side.as_str());
            }
            StatusUpdate::RingLost { ring_id } => {
                for slot in self.rings.iter_mut() {
                    if slot.map_or(false, |r| r.ring_id == *ring_id) {
                        *slot = None;
                    }
                }
                self.last_event = format!("ring {:X} lost", ring_id);
            }
            StatusUpdate::Battery { ring_id, percent } => {
                for r in self.rings.iter_mut().flatten() {
                    if r.ring_id == *ring_id {
                        r.battery = Some(*percent);
                    }
                }
            }
            StatusUpdate::ActiveHand(side) => self.active_hand = *side,
            StatusUpdate::Profile(name) => {
                self.profile = name.clone();
                self.last_event = format!("profile {}", name);
            }
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// run(): the main application loop
// ════════════════════════════════════════════════════════════════════════════

#[cfg(feature = "inject")]
fn make_sink() -> Result<Box<dyn CursorDriver>> {
    Ok(Box::new(crate::driver::EnigoDriver::new()?))
}

#[cfg(not(feature = "inject"))]
fn make_sink() -> Result<Box<dyn CursorDriver>> {
    Ok(Box::new(crate::driver::LogDriver))
}

fn drain(rx: &Receiver<OutputAction>, board: &mut StatusBoard, sink: &mut dyn CursorDriver) {
    for action in rx.try_iter() {
        board.apply(&action);
        sink.dispatch(action);
    }
}

/// Run the full application.
///
/// This is the entry point called from `main.rs`. It starts the engine and
/// the input sources, then either drives the status window at ~60 fps or,
/// headless, forwards actions until the engine stops.
pub fn run(cfg: AppConfig) -> Result<()> {
    if cfg.headless && cfg.udp_ring.is_none() && !cfg!(feature = "leap") {
        bail!("headless mode needs --udp-ring or the leap feature; nothing would drive the pointer");
    }

    let engine = Engine::new(cfg.config.clone()).context("invalid configuration")?;
    let (driver, action_rx) = ChannelDriver::new();
    let handle = EngineHandle::spawn(engine, driver);
    let mut sink = make_sink()?;
    let mut board = StatusBoard::new(&cfg.config);

    // ── Input sources ─────────────────────────────────────────────────────
    if let Some(addr) = cfg.udp_ring {
        UdpRingBridge::bind(addr)?.spawn(handle.sender());
    }

    #[cfg(feature = "leap")]
    spawn_source(crate::source::LeapSource { swap_sides: cfg.swap_hands }, handle.sender());
    if cfg.swap_hands && !cfg!(feature = "leap") {
        warn!("--swap-hands has no effect without the leap feature");
    }

    if cfg.headless {
        info!("running headless");
        for action in action_rx.iter() {
            board.apply(&action);
            sink.dispatch(action);
        }
        return Ok(());
    }

    // ── Simulation window ─────────────────────────────────────────────────
    let (sim_tx, sim_rx) = mpsc::channel::<SimInput>();
    spawn_source(SimSource { rx: sim_rx, hands: !cfg!(feature = "leap") }, handle.sender());
    let mut vis = Visualizer::new(sim_tx, board.profiles.clone(), board.screen)?;

    while vis.is_open() {
        if !vis.poll_input() { break; }
        drain(&action_rx, &mut board, sink.as_mut());
        vis.render(&board);
    }

    match handle.shutdown() {
        Some((engine, _)) => info!("stopped on profile {}", engine.profile_name()),
        None => warn!("engine thread panicked"),
    }
    drain(&action_rx, &mut board, sink.as_mut());
    Ok(())
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
