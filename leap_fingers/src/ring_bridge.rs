//! UDP bridge for ring telemetry.
//!
//! The BLE side lives in a small helper process (the platform Bluetooth
//! stacks are easiest to reach from their native tooling); it forwards each
//! notification to us as one datagram:
//!
//! ```text
//!  [ring id: u64 LE][payload ...]
//!
//!  payload empty          → ring disconnected
//!  payload = BA pp        → battery read, pp = percent
//!  anything else          → raw button-state notification
//! ```

use std::io::ErrorKind;
use std::net::{SocketAddr, UdpSocket};
use std::sync::mpsc::Sender;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use anyhow::{Context, Result};
use log::{debug, info, warn};

use fingers_core::{InputEvent, RingTelemetry};

const ID_LEN:         usize = 8;
/// First payload byte of a battery datagram.
pub const BATTERY_MARKER: u8 = 0xBA;

/// Decode one datagram; `None` if it is too short to carry a ring id.
pub fn parse_datagram(buf: &[u8]) -> Option<InputEvent> {
    if buf.len() < ID_LEN {
        return None;
    }
    let (id, payload) = buf.split_at(ID_LEN);
    let ring_id = u64::from_le_bytes(id.try_into().ok()?);

    let event = match payload {
        [] => InputEvent::RingLost(ring_id),
        [BATTERY_MARKER, rest @ ..] => InputEvent::RingBattery(RingTelemetry { ring_id, bytes: rest.to_vec() }),
        bytes => InputEvent::Ring(RingTelemetry { ring_id, bytes: bytes.to_vec() }),
    };
    Some(event)
}

pub struct UdpRingBridge {
    socket: UdpSocket,
}

impl UdpRingBridge {
    pub fn bind(addr: SocketAddr) -> Result<Self> {
        let socket = UdpSocket::bind(addr)
            .with_context(|| format!("binding ring bridge on {}", addr))?;
        socket
            .set_read_timeout(Some(Duration::from_millis(250)))
            .context("setting ring bridge read timeout")?;
        info!("ring bridge listening on {}", addr);
        Ok(UdpRingBridge { socket })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }

    /// Forward datagrams into `tx` on a new thread until the receiver is
    /// gone.
    pub fn spawn(self, tx: Sender<InputEvent>) -> JoinHandle<()> {
        thread::spawn(move || self.run(tx))
    }

    fn run(self, tx: Sender<InputEvent>) {
        let mut buf = [0u8; 64];
        loop {
            let (n, from) = match self.socket.recv_from(&mut buf) {
                Ok(r) => r,
                Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => continue,
                Err(e) => {
                    warn!("ring bridge receive failed: {}", e);
                    return;
                }
            };
            match parse_datagram(&buf[..n]) {
                Some(event) => {
                    if tx.send(event).is_err() {
                        return;
                    }
                }
                None => debug!("short datagram ({} bytes) from {}", n, from),
            }
        }
    }
}
