//! Which hand each ring is worn on.
//!
//! Rings are assigned in order of first appearance: the first one is taken to
//! be on the left hand, the second on the right. The user can swap the
//! assignment at runtime when they put the rings on the other way round.

use log::{info, warn};

use crate::types::{RingId, Side};

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RingRegistry {
    left:  Option<RingId>,
    right: Option<RingId>,
}

/// Outcome of [`RingRegistry::register`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registration {
    Known(Side),
    New(Side),
    /// Both hands already have a ring.
    Full,
}

impl RingRegistry {
    pub fn new() -> Self { Self::default() }

    pub fn side_of(&self, ring_id: RingId) -> Option<Side> {
        if self.left == Some(ring_id) {
            Some(Side::Left)
        } else if self.right == Some(ring_id) {
            Some(Side::Right)
        } else {
            None
        }
    }

    pub fn ring_on(&self, side: Side) -> Option<RingId> {
        match side {
            Side::Left  => self.left,
            Side::Right => self.right,
        }
    }

    /// Find or assign a side for `ring_id`.
    pub fn register(&mut self, ring_id: RingId) -> Registration {
        if let Some(side) = self.side_of(ring_id) {
            return Registration::Known(side);
        }
        let side = if self.left.is_none() {
            self.left = Some(ring_id);
            Side::Left
        } else if self.right.is_none() {
            self.right = Some(ring_id);
            Side::Right
        } else {
            warn!("ring {:X}: both hands already have a ring, ignoring", ring_id);
            return Registration::Full;
        };
        info!("ring {:X} assigned to {} hand", ring_id, side.as_str());
        Registration::New(side)
    }

    /// Forget a ring; returns the side it was on.
    pub fn remove(&mut self, ring_id: RingId) -> Option<Side> {
        let side = self.side_of(ring_id)?;
        match side {
            Side::Left  => self.left  = None,
            Side::Right => self.right = None,
        }
        Some(side)
    }

    pub fn swap(&mut self) {
        std::mem::swap(&mut self.left, &mut self.right);
        info!("rings swapped: left={:?} right={:?}", self.left, self.right);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assigns_in_order_of_appearance() {
        let mut r = RingRegistry::new();
        assert_eq!(r.register(1), Registration::New(Side::Left));
        assert_eq!(r.register(2), Registration::New(Side::Right));
        assert_eq!(r.register(1), Registration::Known(Side::Left));
        assert_eq!(r.register(3), Registration::Full);
        assert_eq!(r.side_of(3), None);
    }

    #[test]
    fn remove_frees_the_slot() {
        let mut r = RingRegistry::new();
        r.register(1);
        r.register(2);
        assert_eq!(r.remove(1), Some(Side::Left));
        assert_eq!(r.remove(1), None);
        assert_eq!(r.register(3), Registration::New(Side::Left));
    }

    #[test]
    fn swap_exchanges_sides() {
        let mut r = RingRegistry::new();
        r.register(1);
        r.swap();
        assert_eq!(r.side_of(1), Some(Side::Right));
        assert_eq!(r.ring_on(Side::Left), None);
        assert_eq!(r.register(2), Registration::New(Side::Left));
    }
}
