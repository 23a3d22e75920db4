//! Cursor drivers: where [`OutputAction`]s end up.

use std::sync::mpsc::{self, Receiver, Sender};

use log::{debug, info};

use fingers_core::{CursorDriver, MouseSide, OutputAction, Transition};

// ════════════════════════════════════════════════════════════════════════════
// LogDriver
// ════════════════════════════════════════════════════════════════════════════

/// Writes every action to the log instead of touching the OS pointer.
#[derive(Debug, Default)]
pub struct LogDriver;

impl CursorDriver for LogDriver {
    fn dispatch(&mut self, action: OutputAction) {
        match action {
            OutputAction::MoveCursor { x, y }              => debug!("move ({}, {})", x, y),
            OutputAction::MouseButton { button, transition } => info!("{:?} button {:?}", button, transition),
            OutputAction::ScrollTick(n)                    => info!("scroll {:+}", n),
            OutputAction::SetEnabled(on)                   => info!("tracking {}", if on { "on" } else { "off" }),
            OutputAction::Status(s)                        => debug!("status {:?}", s),
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// ChannelDriver
// ════════════════════════════════════════════════════════════════════════════

/// Forwards actions to another thread. Never blocks; actions sent after the
/// receiver is gone are dropped.
#[derive(Debug, Clone)]
pub struct ChannelDriver {
    tx: Sender<OutputAction>,
}

impl ChannelDriver {
    pub fn new() -> (Self, Receiver<OutputAction>) {
        let (tx, rx) = mpsc::channel();
        (ChannelDriver { tx }, rx)
    }
}

impl CursorDriver for ChannelDriver {
    fn dispatch(&mut self, action: OutputAction) {
        let _ = self.tx.send(action);
    }
}

// ════════════════════════════════════════════════════════════════════════════
// EnigoDriver: real pointer (feature = "inject")
// ════════════════════════════════════════════════════════════════════════════

/// Moves the OS pointer through `enigo`.
///
/// Wheel ticks are sent as one notch each, whatever their magnitude.
#[cfg(feature = "inject")]
pub struct EnigoDriver {
    enigo: enigo::Enigo,
}

#[cfg(feature = "inject")]
impl EnigoDriver {
    pub fn new() -> anyhow::Result<Self> {
        let enigo = enigo::Enigo::new(&enigo::Settings::default())
            .map_err(|e| anyhow::anyhow!("cannot initialise pointer injection: {:?}", e))?;
        Ok(EnigoDriver { enigo })
    }
}

#[cfg(feature = "inject")]
impl CursorDriver for EnigoDriver {
    fn dispatch(&mut self, action: OutputAction) {
        use enigo::{Axis, Button, Coordinate, Direction, Mouse};

        let result = match action {
            OutputAction::MoveCursor { x, y } => self.enigo.move_mouse(x, y, Coordinate::Abs),
            OutputAction::MouseButton { button, transition } => {
                let button = match button {
                    MouseSide::Left  => Button::Left,
                    MouseSide::Right => Button::Right,
                };
                let direction = match transition {
                    Transition::Down => Direction::Press,
                    Transition::Up   => Direction::Release,
                };
                self.enigo.button(button, direction)
            }
            // enigo scrolls down for positive lengths
            OutputAction::ScrollTick(n) => self.enigo.scroll(-n.signum(), Axis::Vertical),
            OutputAction::SetEnabled(_) | OutputAction::Status(_) => Ok(()),
        };
        if let Err(e) = result {
            log::warn!("pointer injection failed: {:?}", e);
        }
    }
}

/// Name of a mouse button for status text.
pub fn button_name(button: MouseSide, transition: Transition) -> &'static str {
    match (button, transition) {
        (MouseSide::Left,  Transition::Down) => "left down",
        (MouseSide::Left,  Transition::Up)   => "left up",
        (MouseSide::Right, Transition::Down) => "right down",
        (MouseSide::Right, Transition::Up)   => "right up",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_driver_forwards_in_order() {
        let (mut d, rx) = ChannelDriver::new();
        d.dispatch(OutputAction::ScrollTick(100));
        d.dispatch(OutputAction::SetEnabled(false));
        let got: Vec<_> = rx.try_iter().collect();
        assert_eq!(got, vec![OutputAction::ScrollTick(100), OutputAction::SetEnabled(false)]);
    }

    #[test]
    fn channel_driver_survives_closed_receiver() {
        let (mut d, rx) = ChannelDriver::new();
        drop(rx);
        d.dispatch(OutputAction::ScrollTick(1));
    }

    #[test]
    fn button_names() {
        assert_eq!(button_name(MouseSide::Right, Transition::Down), "right down");
    }
}
