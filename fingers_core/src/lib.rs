//! # fingers_core
//!
//! Hands-free pointer control for cockpit simulators: a head-mounted hand
//! tracker steers the cursor, a Bluetooth ring on a finger supplies the
//! buttons.
//!
//! ## Pipeline
//!
//! ```text
//!  sensor frame ──▶ geometry (per hand) ──▶ arbitration ──▶ gesture ──▶ OutputAction
//!  ring packet  ──▶ ring registry ──▶ button edges ──────────▲
//! ```
//!
//! Everything is driven through [`Engine::step`], one [`InputEvent`] at a
//! time, and is deterministic given the event sequence and its timestamps.
//! [`EngineHandle`] runs the same thing on its own thread behind an
//! `mpsc` channel.
//!
//! ## Default ring buttons
//!
//! | Button | Role |
//! |---|---|
//! | Center | Hold + rotate hand to scroll, tap for one tick |
//! | Up     | Enable / disable tracking |
//! | Down   | One tick down |
//! | Fwd    | Primary click (secondary on a left-hand ring) |
//! | Back   | Secondary click (primary on a left-hand ring) |

pub mod types;
pub mod config;
pub mod geometry;
pub mod buttons;
pub mod rings;
pub mod arbitration;
pub mod gesture;
pub mod engine;

pub use config::{Config, ConfigError, MountProfile, Preset, ProfileSelect};
pub use engine::{run_event_loop, Engine, EngineHandle, InputEvent};
pub use types::{
    CursorDriver, HandFrame, HandSample, MouseSide, OutputAction, RecordingDriver, RingId,
    RingTelemetry, Side, StatusUpdate, Transition, Vec2, Vec3, WindowGeometry,
};
