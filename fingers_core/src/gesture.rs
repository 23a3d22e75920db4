//! Gesture state machine: active hand + ring edges → pointer actions.
//!
//! ```text
//!            toggle                      gesture-start press (hand visible)
//!  Disabled ───────▶ Idle ◀──────▶ Pointing ─────────────────────────▶ Scrolling
//!     ▲               ▲   hand seen/lost  ▲                               │
//!     │ toggle        │                   └── gesture-start release ──────┤
//!     └───────────────┴──── hand lost (disengage, no tick) ───────────────┘
//! ```
//!
//! * **Pointing**: the cursor follows the active hand.
//! * **Scrolling**: the cursor is frozen; every `detent_degrees` of drag
//!   travel emits one wheel tick. A short tap with no travel emits one tick in
//!   the default direction instead.
//! * **Disabled**: nothing reaches the pointer; the next press re-enables.
//!
//! Click buttons bypass the states entirely: press → button down, release →
//! button up. Cursor moves are held back for `debounce_ms` after either edge
//! so the click lands where the user aimed.

use log::{debug, info, trace};

use crate::buttons::{ButtonEvent, ButtonId};
use crate::config::{ButtonMap, ButtonRole, GestureConfig, MountProfile, ScreenConfig};
use crate::geometry::{angles_to_pixels, place_on_screen, project_angles, AngleFilter};
use crate::types::{HandSample, MouseSide, OutputAction, RingId, Side, Transition, Vec2};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GestureState {
    Idle,
    Pointing,
    Scrolling,
    Disabled,
}

/// An armed drag-to-scroll gesture.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScrollState {
    pub init_time_ms: u64,
    /// Drag angle at the last emitted detent.
    pub last_angle:   f32,
    pub ticked_any:   bool,
    /// Hand that armed the gesture.
    pub side:         Side,
    /// Ring whose button is holding it.
    pub ring_id:      RingId,
}

/// Largest drag travel, in detents, accepted from one frame to the next.
pub const MAX_DETENTS_PER_FRAME: f32 = 36.0;

/// A mouse button currently held down on behalf of a ring button.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct HeldClick {
    ring_id: RingId,
    button:  ButtonId,
    mouse:   MouseSide,
}

pub struct GestureMachine {
    gesture: GestureConfig,
    buttons: ButtonMap,
    screen:  ScreenConfig,

    state:   GestureState,
    scroll:  Option<ScrollState>,
    active:  Option<HandSample>,
    filter:  AngleFilter,
    center:  Vec2,
    held:    Vec<HeldClick>,
    last_click_ms: Option<u64>,
}

impl GestureMachine {
    pub fn new(gesture: GestureConfig, buttons: ButtonMap, screen: ScreenConfig, smoothing: f32) -> Self {
        GestureMachine {
            gesture,
            buttons,
            screen,
            state:  GestureState::Idle,
            scroll: None,
            active: None,
            filter: AngleFilter::new(smoothing),
            center: screen.center(),
            held:   Vec::new(),
            last_click_ms: None,
        }
    }

    // ── accessors ─────────────────────────────────────────────────────────

    pub fn state(&self)        -> GestureState        { self.state }
    pub fn scroll(&self)       -> Option<&ScrollState> { self.scroll.as_ref() }
    pub fn is_enabled(&self)   -> bool                { self.state != GestureState::Disabled }
    pub fn is_scrolling(&self) -> bool                { self.state == GestureState::Scrolling }
    pub fn center(&self)       -> Vec2                { self.center }

    /// Move the projection center (e.g. to the middle of the game window).
    pub fn set_center(&mut self, center: Vec2) {
        self.center = center;
    }

    // ── hands ─────────────────────────────────────────────────────────────

    /// Feed the arbitrator's choice for this frame.
    pub fn on_hand(
        &mut self,
        active:  Option<HandSample>,
        profile: &MountProfile,
        now_ms:  u64,
    ) -> Vec<OutputAction> {
        let mut out = Vec::new();

        let hand = match active {
            Some(h) => h,
            None => {
                self.active = None;
                self.filter.reset();
                match self.state {
                    GestureState::Scrolling => self.disengage("active hand lost"),
                    GestureState::Pointing  => self.state = GestureState::Idle,
                    _ => {}
                }
                return out;
            }
        };
        self.active = Some(hand);

        match self.state {
            GestureState::Disabled => {}

            GestureState::Scrolling => {
                let armed_side = self.scroll.as_ref().map(|s| s.side);
                if armed_side != Some(hand.side) {
                    self.disengage("active hand changed");
                    return out;
                }
                self.sweep(hand.drag_angle, &mut out);
            }

            GestureState::Idle | GestureState::Pointing => {
                self.state = GestureState::Pointing;
                let raw = project_angles(hand.position, profile);
                if !raw.is_finite() {
                    debug!("{} hand sample is not a number, cursor held", hand.side.as_str());
                    return out;
                }
                let angles = self.filter.apply(raw);
                if self.debouncing(now_ms) {
                    trace!("cursor move suppressed, click settling");
                    return out;
                }
                let offset = angles_to_pixels(angles, profile.angle_to_pixel_scale);
                let Some((x, y)) = place_on_screen(offset, self.center, self.screen.width, self.screen.height) else {
                    return out;
                };
                trace!("{} hand at {:.1}°/{:.1}° -> ({}, {})", hand.side.as_str(), angles.x, angles.y, x, y);
                out.push(OutputAction::MoveCursor { x, y });
            }
        }

        out
    }

    /// Emit one tick per full detent between the last detent and `angle`.
    ///
    /// A jump of more than [`MAX_DETENTS_PER_FRAME`] is a tracking glitch:
    /// the gesture re-anchors at `angle` and emits nothing.
    fn sweep(&mut self, angle: f32, out: &mut Vec<OutputAction>) {
        let step   = self.gesture.detent_degrees;
        let amount = self.gesture.detent_amount;
        let Some(s) = self.scroll.as_mut() else { return };

        if !angle.is_finite() {
            trace!("drag angle is not a number, frame skipped");
            return;
        }
        let detents = ((angle - s.last_angle) / step).trunc();
        if detents == 0.0 {
            return;
        }
        if detents.abs() > MAX_DETENTS_PER_FRAME {
            debug!("drag jumped {:.0} detents, re-anchoring", detents);
            s.last_angle = angle;
            return;
        }

        let tick = if detents > 0.0 { amount } else { -amount };
        for _ in 0..detents.abs() as u32 {
            out.push(OutputAction::ScrollTick(tick));
        }
        s.last_angle += detents * step;
        s.ticked_any = true;
    }

    fn disengage(&mut self, why: &str) {
        debug!("scroll disengaged: {}", why);
        self.scroll = None;
        self.state  = GestureState::Idle;
    }

    fn debouncing(&self, now_ms: u64) -> bool {
        self.last_click_ms
            .map_or(false, |t| now_ms < t.saturating_add(self.gesture.debounce_ms))
    }

    // ── buttons ───────────────────────────────────────────────────────────

    /// Feed one ring edge. `worn_on` is the hand the ring is on.
    pub fn on_button(&mut self, event: ButtonEvent, worn_on: Side, now_ms: u64) -> Vec<OutputAction> {
        let mut out = Vec::new();
        let button  = event.button();
        let role    = self.buttons.role(button, worn_on);
        let pressed = event.is_press();

        debug!("ring {:X} {} {} ({:?})", event.ring_id, button.as_str(),
               if pressed { "pressed" } else { "released" }, role);

        if self.state == GestureState::Disabled {
            if pressed && (role == ButtonRole::Toggle || self.gesture.any_button_wakes) {
                self.enable(&mut out);
            } else if !pressed {
                // a click held across the toggle still gets its button up
                self.release_click(event.ring_id, button, now_ms, &mut out);
            }
            return out;
        }

        match role {
            ButtonRole::Toggle => {
                if pressed {
                    self.disable(&mut out);
                }
            }

            ButtonRole::ScrollGesture => {
                if pressed {
                    self.arm_scroll(event.ring_id, now_ms);
                } else {
                    self.release_scroll(event.ring_id, now_ms, &mut out);
                }
            }

            ButtonRole::PrimaryClick | ButtonRole::SecondaryClick => {
                let mouse = if role == ButtonRole::PrimaryClick { MouseSide::Left } else { MouseSide::Right };
                if pressed {
                    self.held.push(HeldClick { ring_id: event.ring_id, button, mouse });
                    self.last_click_ms = Some(now_ms);
                    out.push(OutputAction::MouseButton { button: mouse, transition: Transition::Down });
                } else {
                    self.release_click(event.ring_id, button, now_ms, &mut out);
                }
            }

            ButtonRole::ScrollUp | ButtonRole::ScrollDown => {
                if pressed {
                    let sign = if role == ButtonRole::ScrollUp { 1 } else { -1 };
                    out.push(OutputAction::ScrollTick(sign * self.gesture.detent_amount));
                }
            }

            ButtonRole::Ignore => {}
        }

        out
    }

    fn arm_scroll(&mut self, ring_id: RingId, now_ms: u64) {
        if self.state == GestureState::Scrolling {
            return;
        }
        let Some(hand) = self.active else {
            debug!("scroll press ignored: no active hand");
            return;
        };
        if !hand.drag_angle.is_finite() {
            debug!("scroll press ignored: drag angle is not a number");
            return;
        }
        self.scroll = Some(ScrollState {
            init_time_ms: now_ms,
            last_angle:   hand.drag_angle,
            ticked_any:   false,
            side:         hand.side,
            ring_id,
        });
        self.state = GestureState::Scrolling;
        debug!("scroll armed on {} hand at {:.1}", hand.side.as_str(), hand.drag_angle);
    }

    fn release_scroll(&mut self, ring_id: RingId, now_ms: u64, out: &mut Vec<OutputAction>) {
        let Some(s) = self.scroll else { return };
        if s.ring_id != ring_id {
            return;
        }
        let held = now_ms.saturating_sub(s.init_time_ms);
        if held <= self.gesture.click_time_ms && !s.ticked_any {
            debug!("scroll tap after {}ms", held);
            out.push(OutputAction::ScrollTick(self.gesture.tap_direction.sign() * self.gesture.detent_amount));
        }
        self.scroll = None;
        self.state  = if self.active.is_some() { GestureState::Pointing } else { GestureState::Idle };
    }

    fn release_click(&mut self, ring_id: RingId, button: ButtonId, now_ms: u64, out: &mut Vec<OutputAction>) {
        if let Some(i) = self.held.iter().position(|h| h.ring_id == ring_id && h.button == button) {
            let h = self.held.remove(i);
            self.last_click_ms = Some(now_ms);
            out.push(OutputAction::MouseButton { button: h.mouse, transition: Transition::Up });
        }
    }

    fn disable(&mut self, out: &mut Vec<OutputAction>) {
        info!("cursor tracking disabled");
        self.scroll = None;
        self.state  = GestureState::Disabled;
        self.filter.reset();
        out.push(OutputAction::SetEnabled(false));
        if self.screen.recenter_on_disable {
            if let Some((x, y)) = place_on_screen(Vec2::ZERO, self.screen.reset_point(), self.screen.width, self.screen.height) {
                out.push(OutputAction::MoveCursor { x, y });
            }
        }
    }

    fn enable(&mut self, out: &mut Vec<OutputAction>) {
        info!("cursor tracking enabled");
        self.state = GestureState::Idle;
        out.push(OutputAction::SetEnabled(true));
    }

    // ── rings ─────────────────────────────────────────────────────────────

    /// A ring disconnected. Any gesture it was holding is cancelled and any
    /// mouse button it was holding is let go, since its release edge will
    /// never arrive.
    pub fn on_ring_lost(&mut self, ring_id: RingId, now_ms: u64) -> Vec<OutputAction> {
        let mut out = Vec::new();
        if self.scroll.map_or(false, |s| s.ring_id == ring_id) {
            self.disengage("ring lost");
        }
        let held: Vec<ButtonId> = self.held.iter()
            .filter(|h| h.ring_id == ring_id)
            .map(|h| h.button)
            .collect();
        for button in held {
            self.release_click(ring_id, button, now_ms, &mut out);
        }
        out
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
