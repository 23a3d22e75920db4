//! Ring button telemetry → press/release edges.
//!
//! The ring reports its whole button state on every notification; this
//! module diffs successive states per ring so that each physical press or
//! release is reported exactly once.

use std::collections::HashMap;

use log::debug;

use crate::types::RingId;

/// Index of the button-state byte inside a ring notification.
pub const STATE_BYTE: usize = 4;
/// Shortest well-formed notification.
pub const MIN_PACKET_LEN: usize = STATE_BYTE + 1;

/// The five buttons on the ring, with their bit in the state byte.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ButtonId {
    Center = 0x01,
    Up     = 0x02,
    Down   = 0x04,
    Fwd    = 0x08,
    Back   = 0x10,
}

pub const BUTTON_COUNT: usize = 5;

impl ButtonId {
    pub const ALL: [ButtonId; BUTTON_COUNT] = [
        ButtonId::Center,
        ButtonId::Up,
        ButtonId::Down,
        ButtonId::Fwd,
        ButtonId::Back,
    ];

    pub fn bit(self) -> u32 { self as u32 }

    /// Position in a per-ring state table.
    pub fn index(self) -> usize {
        (self as u8).trailing_zeros() as usize
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ButtonId::Center => "center",
            ButtonId::Up     => "up",
            ButtonId::Down   => "down",
            ButtonId::Fwd    => "fwd",
            ButtonId::Back   => "back",
        }
    }
}

/// One edge on one ring.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ButtonEdge {
    Pressed(ButtonId),
    Released(ButtonId),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ButtonEvent {
    pub ring_id: RingId,
    pub edge:    ButtonEdge,
}

impl ButtonEvent {
    pub fn button(&self) -> ButtonId {
        match self.edge {
            ButtonEdge::Pressed(b) | ButtonEdge::Released(b) => b,
        }
    }

    pub fn is_press(&self) -> bool {
        matches!(self.edge, ButtonEdge::Pressed(_))
    }
}

/// Extract the button bitmask from a raw notification, or `None` if the
/// packet is too short to carry one.
pub fn parse_state(bytes: &[u8]) -> Option<u32> {
    if bytes.len() < MIN_PACKET_LEN {
        return None;
    }
    Some(bytes[STATE_BYTE] as u32)
}

/// Battery-level characteristic: one byte, percent.
pub fn parse_battery(bytes: &[u8]) -> Option<u8> {
    match bytes.first() {
        Some(&p) if p <= 100 => Some(p),
        _ => None,
    }
}

/// Per-ring button state and edge detection.
#[derive(Debug, Default)]
pub struct ButtonEdgeDetector {
    rings: HashMap<RingId, [bool; BUTTON_COUNT]>,
}

impl ButtonEdgeDetector {
    pub fn new() -> Self { Self::default() }

    /// Diff `bitmask` against the ring's previous state. A ring seen for the
    /// first time starts with every button released. Bits outside the five
    /// known buttons are ignored.
    pub fn update(&mut self, ring_id: RingId, bitmask: u32) -> Vec<ButtonEvent> {
        let state = self.rings.entry(ring_id).or_insert([false; BUTTON_COUNT]);
        let mut events = Vec::new();

        for button in ButtonId::ALL {
            let now  = bitmask & button.bit() != 0;
            let prev = &mut state[button.index()];
            if now == *prev {
                continue;
            }
            *prev = now;
            let edge = if now { ButtonEdge::Pressed(button) } else { ButtonEdge::Released(button) };
            events.push(ButtonEvent { ring_id, edge });
        }

        events
    }

    /// Decode and diff a raw notification. Malformed packets produce no
    /// events and leave every ring untouched.
    pub fn update_packet(&mut self, ring_id: RingId, bytes: &[u8]) -> Vec<ButtonEvent> {
        match parse_state(bytes) {
            Some(mask) => self.update(ring_id, mask),
            None => {
                debug!("ring {:X}: dropping {}-byte packet", ring_id, bytes.len());
                Vec::new()
            }
        }
    }

    /// Forget a disconnected ring. Returns the buttons it still had held.
    pub fn remove_ring(&mut self, ring_id: RingId) -> Vec<ButtonId> {
        match self.rings.remove(&ring_id) {
            Some(state) => ButtonId::ALL
                .into_iter()
                .filter(|b| state[b.index()])
                .collect(),
            None => Vec::new(),
        }
    }

    pub fn is_pressed(&self, ring_id: RingId, button: ButtonId) -> bool {
        self.rings
            .get(&ring_id)
            .map(|s| s[button.index()])
            .unwrap_or(false)
    }

    pub fn knows(&self, ring_id: RingId) -> bool {
        self.rings.contains_key(&ring_id)
    }
}
