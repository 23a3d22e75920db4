//! # leap_fingers
//!
//! Drives the OS pointer from a head-mounted LeapMotion and a Bluetooth ring,
//! so a cockpit simulator can be flown in VR without reaching for the mouse.
//! The decision logic lives in `fingers_core`; this crate supplies the
//! inputs, the cursor driver and a status window.
//!
//! ## Feature flags
//!
//! * (default): **Simulation mode**: the status window's mouse and keys
//!   drive a simulated hand and ring; actions are logged.
//! * `leap`: **Hardware mode**: polls a real LeapMotion controller via LeapC.
//! * `inject`: moves the real OS pointer through `enigo`.
//!
//! ### Simulation controls
//!
//! | Input | Effect |
//! |---|---|
//! | Mouse over window | Move the simulated hand |
//! | Wheel / `Up` / `Down` | Turn the hand (drag-to-scroll) |
//! | `Z` / `X` | Show/hide left / right hand |
//! | `Tab` | Mouse drives the other hand |
//! | `1`–`5` | Ring buttons: center, up, down, fwd, back |
//! | `B` | Report a battery level |
//! | `Backspace` | Ring disconnects |
//! | `R` | Swap rings between hands |
//! | `P` | Next mount profile |
//! | `W` | Report a simulator window |
//! | `Q` / `Esc` | Quit |
//!
//! ## Ring bridge
//!
//! `--udp-ring ADDR` accepts ring notifications from an external BLE helper;
//! see [`ring_bridge`] for the datagram format.

pub mod source;
pub mod ring_bridge;
pub mod driver;
pub mod visualizer;
pub mod app;
