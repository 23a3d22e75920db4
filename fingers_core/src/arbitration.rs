//! Picks the one hand that drives the pointer each frame.
//!
//! # Policy
//!
//! Evaluated in order:
//!
//! 1. **Continuity lock**: while a drag/scroll is in progress the hand that
//!    started it keeps control for as long as it stays visible. If it
//!    disappears the lock is dropped and nobody is selected for that frame,
//!    which lets the gesture machine disengage cleanly.
//! 2. **Single hand**: if only one hand is visible, it wins.
//! 3. **Both hands**: the hand closer to screen center (smaller absolute
//!    horizontal view angle) wins. Under [`SelectionStrategy::Hysteresis`]
//!    the other hand's angle is penalised by `overlap_deg` so two hands near
//!    the midline do not make the pointer flicker between them.
//! 4. **No hands**: nothing is selected.
//!
//! The selected side is written back to [`ArbitrationState::current_hand`]
//! as the last step, and only there.

use log::debug;

use crate::config::{ArbitrationConfig, MountProfile, SelectionStrategy};
use crate::geometry::project_angles;
use crate::types::{HandFrame, HandSample, Side};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ArbitrationState {
    pub current_hand: Option<Side>,
    /// A continuity-requiring gesture is in progress on `current_hand`.
    pub is_dragging:  bool,
}

/// Absolute horizontal view angle of a hand, in degrees.
pub fn center_offset_deg(hand: &HandSample, profile: &MountProfile) -> f32 {
    project_angles(hand.position, profile).x.abs()
}

/// Select the active hand for this frame and update `state`.
pub fn select(
    left:    &HandSample,
    right:   &HandSample,
    state:   &mut ArbitrationState,
    profile: &MountProfile,
    cfg:     &ArbitrationConfig,
) -> Option<HandSample> {
    let winner = choose(left, right, state, profile, cfg);

    let side = winner.map(|h| h.side);
    if side != state.current_hand {
        debug!(
            "active hand: {} -> {}",
            state.current_hand.map_or("none", Side::as_str),
            side.map_or("none", Side::as_str),
        );
    }
    state.current_hand = side;
    winner
}

fn choose(
    left:    &HandSample,
    right:   &HandSample,
    state:   &mut ArbitrationState,
    profile: &MountProfile,
    cfg:     &ArbitrationConfig,
) -> Option<HandSample> {
    let by_side = |s: Side| if s == Side::Left { left } else { right };

    // ── 1. continuity lock ────────────────────────────────────────────────
    if cfg.drag_continuity && state.is_dragging {
        if let Some(locked) = state.current_hand {
            let hand = by_side(locked);
            if hand.active {
                return Some(*hand);
            }
            debug!("locked {} hand lost, releasing drag lock", locked.as_str());
            state.is_dragging = false;
            return None;
        }
    }

    // ── 2./4. zero or one hand ───────────────────────────────────────────
    match (left.active, right.active) {
        (false, false) => return None,
        (true,  false) => return Some(*left),
        (false, true)  => return Some(*right),
        (true,  true)  => {}
    }

    // ── 3. both hands ────────────────────────────────────────────────────
    let overlap = match cfg.strategy {
        SelectionStrategy::Preferred(side) => return Some(*by_side(side)),
        SelectionStrategy::Nearest         => 0.0,
        SelectionStrategy::Hysteresis      => cfg.overlap_deg,
    };

    let mut l = center_offset_deg(left,  profile);
    let mut r = center_offset_deg(right, profile);
    match state.current_hand {
        Some(Side::Left)  => r += overlap,
        Some(Side::Right) => l += overlap,
        None => {}
    }

    let side = if l < r {
        Side::Left
    } else if r < l {
        Side::Right
    } else {
        state.current_hand.unwrap_or(Side::Left)
    };
    Some(*by_side(side))
}

/// [`select`] bundled with the state and policy it needs.
#[derive(Clone, Debug)]
pub struct HandArbitrator {
    config: ArbitrationConfig,
    state:  ArbitrationState,
}

impl HandArbitrator {
    pub fn new(config: ArbitrationConfig) -> Self {
        HandArbitrator { config, state: ArbitrationState::default() }
    }

    pub fn select(&mut self, frame: &HandFrame, profile: &MountProfile) -> Option<HandSample> {
        select(&frame.left, &frame.right, &mut self.state, profile, &self.config)
    }

    /// Engage or release the continuity lock on the current hand.
    pub fn set_dragging(&mut self, dragging: bool) {
        self.state.is_dragging = dragging && self.state.current_hand.is_some();
    }

    pub fn state(&self) -> ArbitrationState { self.state }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_SCALE;
    use crate::types::Vec3;

    fn flat() -> MountProfile {
        MountProfile {
            rotation_offset_deg:  Vec3::ZERO,
            position_offset_mm:   Vec3::ZERO,
            angle_to_pixel_scale: DEFAULT_SCALE,
        }
    }

    /// A hand at horizontal view angle `deg` (depth 100 mm).
    fn at(side: Side, deg: f32) -> HandSample {
        let x = 100.0 * deg.to_radians().tan();
        HandSample::tracked(side, Vec3::new(x, 0.0, 100.0), 0.0)
    }

    fn cfg(strategy: SelectionStrategy) -> ArbitrationConfig {
        ArbitrationConfig { strategy, overlap_deg: 3.0, drag_continuity: true }
    }

    fn run(l: &HandSample, r: &HandSample, st: &mut ArbitrationState) -> Option<Side> {
        select(l, r, st, &flat(), &cfg(SelectionStrategy::Hysteresis)).map(|h| h.side)
    }

    #[test]
    fn no_hands_selects_nothing_and_clears() {
        let mut st = ArbitrationState { current_hand: Some(Side::Left), is_dragging: false };
        assert_eq!(run(&HandSample::absent(Side::Left), &HandSample::absent(Side::Right), &mut st), None);
        assert_eq!(st.current_hand, None);
    }

    #[test]
    fn single_hand_always_wins() {
        for deg in [-60.0, -1.0, 0.0, 35.0, 80.0] {
            let mut st = ArbitrationState::default();
            assert_eq!(run(&at(Side::Left, deg), &HandSample::absent(Side::Right), &mut st), Some(Side::Left));
            let mut st = ArbitrationState { current_hand: Some(Side::Left), is_dragging: false };
            assert_eq!(run(&HandSample::absent(Side::Left), &at(Side::Right, deg), &mut st), Some(Side::Right));
        }
    }

    #[test]
    fn nearest_to_center_wins_without_history() {
        let mut st = ArbitrationState::default();
        assert_eq!(run(&at(Side::Left, -5.0), &at(Side::Right, 20.0), &mut st), Some(Side::Left));
        let mut st = ArbitrationState::default();
        assert_eq!(run(&at(Side::Left, -20.0), &at(Side::Right, 5.0), &mut st), Some(Side::Right));
    }

    #[test]
    fn hysteresis_keeps_tracked_hand_within_overlap() {
        let mut st = ArbitrationState::default();
        assert_eq!(run(&at(Side::Left, -10.0), &at(Side::Right, 12.0), &mut st), Some(Side::Left));
        // right is now marginally closer, but inside the 3° margin
        assert_eq!(run(&at(Side::Left, -10.0), &at(Side::Right, 8.0), &mut st), Some(Side::Left));
        // clearly closer: switch
        assert_eq!(run(&at(Side::Left, -10.0), &at(Side::Right, 6.0), &mut st), Some(Side::Right));
        // and now right holds its own margin
        assert_eq!(run(&at(Side::Left, -5.0), &at(Side::Right, 6.0), &mut st), Some(Side::Right));
    }

    #[test]
    fn nearest_strategy_has_no_margin() {
        let c = cfg(SelectionStrategy::Nearest);
        let mut st = ArbitrationState { current_hand: Some(Side::Left), is_dragging: false };
        let w = select(&at(Side::Left, -10.0), &at(Side::Right, 9.0), &mut st, &flat(), &c);
        assert_eq!(w.map(|h| h.side), Some(Side::Right));
    }

    #[test]
    fn preferred_strategy_ignores_distance() {
        let c = cfg(SelectionStrategy::Preferred(Side::Right));
        let mut st = ArbitrationState::default();
        let w = select(&at(Side::Left, 0.0), &at(Side::Right, 40.0), &mut st, &flat(), &c);
        assert_eq!(w.map(|h| h.side), Some(Side::Right));
        // falls back to the other hand when the preferred one is gone
        let w = select(&at(Side::Left, 0.0), &HandSample::absent(Side::Right), &mut st, &flat(), &c);
        assert_eq!(w.map(|h| h.side), Some(Side::Left));
    }

    #[test]
    fn drag_lock_holds_far_hand() {
        let mut st = ArbitrationState { current_hand: Some(Side::Right), is_dragging: true };
        assert_eq!(run(&at(Side::Left, 0.0), &at(Side::Right, 45.0), &mut st), Some(Side::Right));
        assert!(st.is_dragging);
    }

    #[test]
    fn drag_lock_released_when_locked_hand_vanishes() {
        let mut st = ArbitrationState { current_hand: Some(Side::Right), is_dragging: true };
        assert_eq!(run(&at(Side::Left, 0.0), &HandSample::absent(Side::Right), &mut st), None);
        assert!(!st.is_dragging);
        assert_eq!(st.current_hand, None);
        // next frame selects normally
        assert_eq!(run(&at(Side::Left, 0.0), &HandSample::absent(Side::Right), &mut st), Some(Side::Left));
    }

    #[test]
    fn continuity_off_ignores_lock() {
        let mut c = cfg(SelectionStrategy::Nearest);
        c.drag_continuity = false;
        let mut st = ArbitrationState { current_hand: Some(Side::Right), is_dragging: true };
        let w = select(&at(Side::Left, 0.0), &at(Side::Right, 45.0), &mut st, &flat(), &c);
        assert_eq!(w.map(|h| h.side), Some(Side::Left));
    }

    #[test]
    fn arbitrator_set_dragging_needs_a_hand() {
        let mut a = HandArbitrator::new(ArbitrationConfig::default());
        a.set_dragging(true);
        assert!(!a.state().is_dragging);
        let frame = HandFrame { left: at(Side::Left, 0.0), right: HandSample::absent(Side::Right) };
        a.select(&frame, &flat());
        a.set_dragging(true);
        assert!(a.state().is_dragging);
    }
}
