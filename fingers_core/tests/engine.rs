//! End-to-end runs through `Engine::step` and the threaded event loop.

use fingers_core::gesture::GestureState;
use fingers_core::{
    Config, Engine, EngineHandle, HandFrame, HandSample, InputEvent, MouseSide, OutputAction,
    RecordingDriver, RingTelemetry, Side, Transition, Vec3,
};

const RING: u64 = 0xC0FFEE;

const CENTER: u8 = 0x01;
const UP:     u8 = 0x02;
const FWD:    u8 = 0x08;

fn ring(mask: u8) -> InputEvent {
    InputEvent::Ring(RingTelemetry { ring_id: RING, bytes: vec![0x10, 0, 0, 0, mask, 0] })
}

fn right_hand(x: f32, drag: f32) -> InputEvent {
    InputEvent::Frame(HandFrame {
        left:  HandSample::absent(Side::Left),
        right: HandSample::tracked(Side::Right, Vec3::new(x, -73.0, 90.0), drag),
    })
}

fn both(lx: f32, rx: f32, drag: f32) -> InputEvent {
    InputEvent::Frame(HandFrame {
        left:  HandSample::tracked(Side::Left,  Vec3::new(lx, -73.0, 90.0), drag),
        right: HandSample::tracked(Side::Right, Vec3::new(rx, -73.0, 90.0), drag),
    })
}

fn no_hands() -> InputEvent {
    InputEvent::Frame(HandFrame::empty())
}

fn pointer(out: &[OutputAction]) -> Vec<OutputAction> {
    out.iter().filter(|a| a.is_pointer()).cloned().collect()
}

fn ticks(out: &[OutputAction]) -> Vec<i32> {
    out.iter().filter_map(|a| match a {
        OutputAction::ScrollTick(n) => Some(*n),
        _ => None,
    }).collect()
}

fn engine() -> Engine {
    Engine::new(Config::default()).unwrap()
}

#[test]
fn no_hands_means_no_pointer_output() {
    let mut e = engine();
    for t in 0..10 {
        assert!(pointer(&e.step(no_hands(), t)).is_empty());
    }
}

#[test]
fn centered_hand_lands_on_screen_center() {
    let mut e = engine();
    // Generic mount puts the eye 73 mm above and 110 mm behind the sensor
    let out = e.step(right_hand(0.0, 0.0), 0);
    assert_eq!(pointer(&out), vec![OutputAction::MoveCursor { x: 960, y: 540 }]);
}

#[test]
fn drag_scroll_session() {
    let mut e = engine();
    e.step(ring(0), 0);
    e.step(right_hand(0.0, 0.0), 10);

    e.step(ring(CENTER), 20);
    assert_eq!(e.gesture_state(), GestureState::Scrolling);
    assert!(e.arbitration().is_dragging);

    let mut all = Vec::new();
    for i in 1..=25 {
        let out = e.step(right_hand(0.0, i as f32), 20 + i as u64);
        assert!(!out.iter().any(|a| matches!(a, OutputAction::MoveCursor { .. })));
        all.extend(ticks(&out));
    }
    assert_eq!(all, vec![100, 100]);

    // long hold with travel: no tap tick on release
    assert!(ticks(&e.step(ring(0), 1000)).is_empty());
    assert_eq!(e.gesture_state(), GestureState::Pointing);
    assert!(!e.arbitration().is_dragging);
}

#[test]
fn tap_on_center_scrolls_once() {
    let mut e = engine();
    e.step(right_hand(0.0, 0.0), 0);
    e.step(ring(CENTER), 100);
    let out = e.step(ring(0), 200);
    assert_eq!(ticks(&out), vec![100]);
}

#[test]
fn scroll_lock_keeps_far_hand_until_release() {
    let mut e = engine();
    // right hand alone, arms the scroll
    e.step(right_hand(60.0, 0.0), 0);
    e.step(ring(CENTER), 10);
    // left hand appears dead center; the lock keeps the right hand
    e.step(both(0.0, 60.0, 0.0), 20);
    assert_eq!(e.arbitration().current_hand, Some(Side::Right));
    // release: next frame picks the centered hand
    e.step(ring(0), 500);
    e.step(both(0.0, 60.0, 0.0), 510);
    assert_eq!(e.arbitration().current_hand, Some(Side::Left));
}

#[test]
fn losing_hand_mid_scroll_disengages_quietly() {
    let mut e = engine();
    e.step(right_hand(0.0, 0.0), 0);
    e.step(ring(CENTER), 10);
    e.step(right_hand(0.0, 5.0), 20);
    let out = e.step(no_hands(), 30);
    assert!(pointer(&out).is_empty());
    assert_eq!(e.gesture_state(), GestureState::Idle);
    assert!(!e.arbitration().is_dragging);
    assert!(ticks(&e.step(ring(0), 40)).is_empty());
}

#[test]
fn ring_loss_releases_held_click() {
    let mut e = engine();
    e.step(ring(FWD), 0);
    let out = e.step(InputEvent::RingLost(RING), 50);
    assert!(out.contains(&OutputAction::MouseButton { button: MouseSide::Right, transition: Transition::Up }));
    assert_eq!(e.rings().side_of(RING), None);
}

#[test]
fn toggle_round_trip() {
    let mut e = engine();
    e.step(right_hand(0.0, 0.0), 0);
    let out = e.step(ring(UP), 10);
    assert!(out.contains(&OutputAction::SetEnabled(false)));
    e.step(ring(0), 20);
    assert!(pointer(&e.step(right_hand(30.0, 0.0), 30)).is_empty());

    let out = e.step(ring(UP), 40);
    assert!(out.contains(&OutputAction::SetEnabled(true)));
    e.step(ring(0), 50);
    assert_eq!(pointer(&e.step(right_hand(0.0, 0.0), 60)).len(), 1);
}

#[test]
fn threaded_loop_delivers_to_driver() {
    let handle = EngineHandle::spawn(engine(), RecordingDriver::default());
    let tx = handle.sender();
    tx.send(right_hand(0.0, 0.0)).unwrap();
    tx.send(ring(FWD)).unwrap();
    tx.send(ring(0)).unwrap();

    let (engine, driver) = handle.shutdown().unwrap();
    assert_eq!(engine.rings().side_of(RING), Some(Side::Left));
    let clicks: Vec<_> = driver.actions.iter()
        .filter(|a| matches!(a, OutputAction::MouseButton { .. }))
        .collect();
    assert_eq!(clicks.len(), 2);
}
