//! Software-rendered status window using `minifb`.
//!
//! Layout:
//!
//! ```text
//! ┌──────────────────────────────────────┬───────────────────┐
//! │                                      │  TRACKING  ON     │
//! │   screen miniature                   │  HAND      RIGHT  │
//! │     + cursor                         │  PROFILE   PIMAX  │
//! │     x reset point                    │  RING L / RING R  │
//! │                                      │  MOUSE  [L] [R]   │
//! │                                      │  SCROLL  +300     │
//! ├──────────────────────────────────────┴───────────────────┤
//! │  last event                                              │
//! │  key legend                                              │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! The same window is the simulator: the mouse over it moves the simulated
//! hand and the number keys are the ring's buttons.

use std::sync::mpsc::Sender;

use anyhow::{anyhow, Result};
use minifb::{Key, KeyRepeat, MouseMode, Window, WindowOptions};

use fingers_core::{Side, WindowGeometry};

use crate::app::StatusBoard;
use crate::source::SimInput;

// ════════════════════════════════════════════════════════════════════════════
// Layout constants
// ════════════════════════════════════════════════════════════════════════════

pub const WIN_W:       usize = 960;
pub const WIN_H:       usize = 540;
const PANEL_W:         usize = 260;
const MAP_X:           usize = 20;
const MAP_Y:           usize = 20;
const MAP_W:           usize = WIN_W - PANEL_W - 2 * MAP_X;
const MAP_H:           usize = 400;
const STATUS_Y:        usize = WIN_H - 56;
const BG_COLOR:        u32   = 0xFF1A1A2E;
const PANEL_BG:        u32   = 0xFF16213E;
const MAP_BG:          u32   = 0xFF0F1B2D;
const TEXT_BG:         u32   = 0xFF0F3460;
const CURSOR_ON:       u32   = 0xFF7CFC00;
const CURSOR_OFF:      u32   = 0xFF666666;
const RESET_COLOR:     u32   = 0xFFFF6347;
const LIGHT_ON:        u32   = 0xFFFFD700;
const LIGHT_OFF:       u32   = 0xFF333344;

/// Simulation keys for the ring buttons, in bit order
/// (center, up, down, fwd, back).
const RING_KEYS: [Key; 5] = [Key::Key1, Key::Key2, Key::Key3, Key::Key4, Key::Key5];
/// Degrees of simulated hand turn per arrow-key repeat.
const DRAG_STEP: f32 = 2.0;
/// Battery levels the `B` key cycles through.
const BATTERY_STEPS: [u8; 4] = [100, 75, 40, 10];

// ════════════════════════════════════════════════════════════════════════════
// Visualizer
// ════════════════════════════════════════════════════════════════════════════

pub struct Visualizer {
    window:     Window,
    buf:        Vec<u32>,
    sim_tx:     Sender<SimInput>,
    profiles:   Vec<String>,
    profile_ix: usize,
    screen:     (u32, u32),
    ring_mask:  u8,
    battery_ix: usize,
    last_mouse: Option<(f32, f32)>,
}

impl Visualizer {
    pub fn new(sim_tx: Sender<SimInput>, profiles: Vec<String>, screen: (u32, u32)) -> Result<Self> {
        let mut window = Window::new(
            "Leap Fingers - cockpit pointer",
            WIN_W, WIN_H,
            WindowOptions {
                resize: false,
                ..WindowOptions::default()
            },
        ).map_err(|e| anyhow!("cannot open status window: {}", e))?;

        window.limit_update_rate(Some(std::time::Duration::from_millis(16))); // ~60fps

        Ok(Visualizer {
            window,
            buf: vec![BG_COLOR; WIN_W * WIN_H],
            sim_tx,
            profiles,
            profile_ix: 0,
            screen,
            ring_mask:  0,
            battery_ix: 0,
            last_mouse: None,
        })
    }

    /// Returns false when the window should close.
    pub fn is_open(&self) -> bool { self.window.is_open() }

    fn send(&self, input: SimInput) {
        let _ = self.sim_tx.send(input);
    }

    /// Poll mouse and keyboard and translate to [`SimInput`] events.
    pub fn poll_input(&mut self) -> bool {
        if !self.window.is_open() { return false; }

        let one_shot = |w: &Window, k: Key| w.is_key_pressed(k, KeyRepeat::No);

        if one_shot(&self.window, Key::Q) || one_shot(&self.window, Key::Escape) {
            self.send(SimInput::Quit);
            return false;
        }

        // ── Simulated hand ────────────────────────────────────────────────
        if let Some(pos) = self.window.get_mouse_pos(MouseMode::Clamp) {
            if self.last_mouse != Some(pos) {
                self.last_mouse = Some(pos);
                let (x, y) = pointer_from_mouse(pos);
                self.send(SimInput::Pointer { x, y });
            }
        }
        if let Some((_, dy)) = self.window.get_scroll_wheel() {
            if dy != 0.0 {
                self.send(SimInput::Drag(dy.signum() * DRAG_STEP));
            }
        }
        if self.window.is_key_pressed(Key::Up, KeyRepeat::Yes) {
            self.send(SimInput::Drag(DRAG_STEP));
        }
        if self.window.is_key_pressed(Key::Down, KeyRepeat::Yes) {
            self.send(SimInput::Drag(-DRAG_STEP));
        }
        if one_shot(&self.window, Key::Z)   { self.send(SimInput::ToggleHand(Side::Left));  }
        if one_shot(&self.window, Key::X)   { self.send(SimInput::ToggleHand(Side::Right)); }
        if one_shot(&self.window, Key::Tab) { self.send(SimInput::SwapMouseHand); }

        // ── Simulated ring ────────────────────────────────────────────────
        let mask = RING_KEYS.iter().enumerate()
            .filter(|(_, k)| self.window.is_key_down(**k))
            .fold(0u8, |m, (i, _)| m | (1 << i));
        if mask != self.ring_mask {
            self.ring_mask = mask;
            self.send(SimInput::RingButtons(mask));
        }
        if one_shot(&self.window, Key::B) {
            let p = BATTERY_STEPS[self.battery_ix % BATTERY_STEPS.len()];
            self.battery_ix += 1;
            self.send(SimInput::RingBattery(p));
        }
        if one_shot(&self.window, Key::Backspace) {
            self.ring_mask = 0;
            self.send(SimInput::RingLost);
        }
        if one_shot(&self.window, Key::R) { self.send(SimInput::SwapRings); }

        // ── Calibration ───────────────────────────────────────────────────
        if one_shot(&self.window, Key::P) && !self.profiles.is_empty() {
            self.profile_ix = (self.profile_ix + 1) % self.profiles.len();
            self.send(SimInput::SelectProfile(self.profiles[self.profile_ix].clone()));
        }
        if one_shot(&self.window, Key::W) {
            self.send(SimInput::Window(sim_game_window(self.screen)));
        }

        true
    }

    /// Render one frame.
    pub fn render(&mut self, board: &StatusBoard) {
        self.buf.fill(BG_COLOR);

        self.fill_rect(WIN_W - PANEL_W, 0, PANEL_W, STATUS_Y, PANEL_BG);
        self.draw_map(board);
        self.draw_panel(board);

        // ── Status bar ────────────────────────────────────────────────────
        self.fill_rect(0, STATUS_Y, WIN_W, WIN_H - STATUS_Y, TEXT_BG);
        self.draw_label(&board.last_event, 10, STATUS_Y + 10, 0xFFEEEEEE);

        // ── Key legend ────────────────────────────────────────────────────
        self.draw_label(
            "mouse=hand  wheel/up/down=turn  z/x=hands  tab=swap hand  1-5=ring  b=battery  r=swap rings",
            10, WIN_H - 28, 0xFF888888,
        );
        self.draw_label(
            "backspace=ring lost  p=profile  w=game window  q=quit",
            10, WIN_H - 16, 0xFF888888,
        );

        self.window.update_with_buffer(&self.buf, WIN_W, WIN_H).ok();
    }

    // ── Screen miniature ──────────────────────────────────────────────────

    fn draw_map(&mut self, board: &StatusBoard) {
        self.fill_rect(MAP_X, MAP_Y, MAP_W, MAP_H, MAP_BG);
        self.draw_border(MAP_X, MAP_Y, MAP_W, MAP_H, 0xFF445577);
        let label = format!("screen {}x{}", board.screen.0, board.screen.1);
        self.draw_label(&label, MAP_X + 6, MAP_Y + 6, 0xFF8899AA);

        let (rx, ry) = to_map(board.reset_point, board.screen);
        self.draw_cross(rx, ry, 4, RESET_COLOR);

        if let Some(c) = board.cursor {
            let (cx, cy) = to_map(c, board.screen);
            let color = if board.enabled { CURSOR_ON } else { CURSOR_OFF };
            self.draw_diamond(cx, cy, 5, color);
            self.fill_rect(cx.saturating_sub(1), cy.saturating_sub(1), 3, 3, color);
        }
    }

    // ── Side panel ────────────────────────────────────────────────────────

    fn draw_panel(&mut self, board: &StatusBoard) {
        const TEXT: u32 = 0xFFEEEEEE;
        let x = WIN_W - PANEL_W + 14;

        let mut lines: Vec<(String, u32)> = vec![
            ("STATUS".to_string(), LIGHT_ON),
            if board.enabled {
                ("tracking  on".to_string(), CURSOR_ON)
            } else {
                ("tracking  off".to_string(), CURSOR_OFF)
            },
            (format!("hand      {}", board.active_hand.map_or("none", Side::as_str)), TEXT),
            (format!("profile   {}", board.profile), TEXT),
        ];
        for side in [Side::Left, Side::Right] {
            let text = match board.ring_on(side) {
                Some(r) => match r.battery {
                    Some(p) => format!("ring {}    {:X}  {}%", side.as_str(), r.ring_id, p),
                    None    => format!("ring {}    {:X}", side.as_str(), r.ring_id),
                },
                None => format!("ring {}    -", side.as_str()),
            };
            lines.push((text, 0xFFAADDFF));
        }
        lines.push((format!("scroll    {:+}", board.scroll_total), TEXT));

        let mut y = 20;
        for (text, color) in &lines {
            self.draw_label(text, x, y, *color);
            y += 18;
        }

        // mouse button lights
        let ly = y + 6;
        self.draw_label("mouse", x, ly + 4, TEXT);
        for (i, down) in board.mouse_down.iter().enumerate() {
            let bx = x + 60 + i * 34;
            self.fill_rect(bx, ly, 26, 14, if *down { LIGHT_ON } else { LIGHT_OFF });
            self.draw_label(if i == 0 { "l" } else { "r" }, bx + 11, ly + 4, 0xFF000000);
        }
    }

    // ── Primitive drawing helpers ─────────────────────────────────────────

    fn fill_rect(&mut self, x: usize, y: usize, w: usize, h: usize, color: u32) {
        for row in y..(y+h).min(WIN_H) {
            for col in x..(x+w).min(WIN_W) {
                self.buf[row * WIN_W + col] = color;
            }
        }
    }

    fn draw_border(&mut self, x: usize, y: usize, w: usize, h: usize, color: u32) {
        if w == 0 || h == 0 { return; }
        for col in x..(x+w).min(WIN_W) {
            self.set_pixel(col, y, color);
            self.set_pixel(col, y + h - 1, color);
        }
        for row in y..(y+h).min(WIN_H) {
            self.set_pixel(x, row, color);
            self.set_pixel(x + w - 1, row, color);
        }
    }

    fn set_pixel(&mut self, x: usize, y: usize, color: u32) {
        if x < WIN_W && y < WIN_H {
            self.buf[y * WIN_W + x] = color;
        }
    }

    fn draw_cross(&mut self, cx: usize, cy: usize, r: usize, color: u32) {
        for d in 0..=r {
            self.set_pixel(cx + d, cy + d, color);
            self.set_pixel(cx + d, cy.wrapping_sub(d), color);
            self.set_pixel(cx.wrapping_sub(d), cy + d, color);
            self.set_pixel(cx.wrapping_sub(d), cy.wrapping_sub(d), color);
        }
    }

    fn draw_diamond(&mut self, cx: usize, cy: usize, r: usize, color: u32) {
        for dy in 0..=r as isize {
            let dx = r as isize - dy;
            for &(sx, sy) in &[
                (cx as isize + dx, cy as isize + dy),
                (cx as isize - dx, cy as isize + dy),
                (cx as isize + dx, cy as isize - dy),
                (cx as isize - dx, cy as isize - dy),
            ] {
                if sx >= 0 && sy >= 0 {
                    self.set_pixel(sx as usize, sy as usize, color);
                }
            }
        }
    }

    /// Minimal bitmap font: 3×5 characters.
    fn draw_label(&mut self, text: &str, x: usize, y: usize, color: u32) {
        let mut cx = x;
        for ch in text.chars() {
            let glyph = char_glyph(ch);
            for (row, &bits) in glyph.iter().enumerate() {
                for col in 0..3usize {
                    if bits & (1 << (2 - col)) != 0 {
                        self.set_pixel(cx + col, y + row, color);
                    }
                }
            }
            cx += 4; // 3 wide + 1 gap
            if cx + 4 > WIN_W { break; }
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Coordinate helpers
// ────────────────────────────────────────────────────────────────────────────

/// Window pixel → simulated pointer in `-1.0..=1.0` per axis.
pub fn pointer_from_mouse((mx, my): (f32, f32)) -> (f32, f32) {
    let x = mx / WIN_W as f32 * 2.0 - 1.0;
    let y = my / WIN_H as f32 * 2.0 - 1.0;
    (x.clamp(-1.0, 1.0), y.clamp(-1.0, 1.0))
}

/// Screen pixel → position inside the miniature.
pub fn to_map((x, y): (i32, i32), screen: (u32, u32)) -> (usize, usize) {
    let fx = (x.max(0) as f32 / screen.0.max(1) as f32).min(1.0);
    let fy = (y.max(0) as f32 / screen.1.max(1) as f32).min(1.0);
    (
        MAP_X + (fx * (MAP_W - 1) as f32) as usize,
        MAP_Y + (fy * (MAP_H - 1) as f32) as usize,
    )
}

/// A plausible simulator window: 80% of the screen, centered.
pub fn sim_game_window(screen: (u32, u32)) -> WindowGeometry {
    let width  = screen.0 * 4 / 5;
    let height = screen.1 * 4 / 5;
    WindowGeometry {
        x: ((screen.0 - width)  / 2) as i32,
        y: ((screen.1 - height) / 2) as i32,
        width,
        height,
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Minimal 3×5 bitmap font
// ────────────────────────────────────────────────────────────────────────────

fn char_glyph(c: char) -> [u8; 5] {
    match c {
        '0' => [0b111, 0b101, 0b101, 0b101, 0b111],
        '1' => [0b010, 0b110, 0b010, 0b010, 0b111],
        '2' => [0b111, 0b001, 0b111, 0b100, 0b111],
        '3' => [0b111, 0b001, 0b111, 0b001, 0b111],
        '4' => [0b101, 0b101, 0b111, 0b001, 0b001],
        '5' => [0b111, 0b100, 0b111, 0b001, 0b111],
        '6' => [0b111, 0b100, 0b111, 0b101, 0b111],
        '7' => [0b111, 0b001, 0b001, 0b001, 0b001],
        '8' => [0b111, 0b101, 0b111, 0b101, 0b111],
        '9' => [0b111, 0b101, 0b111, 0b001, 0b111],
        'a' | 'A' => [0b111, 0b101, 0b111, 0b101, 0b101],
        'b' | 'B' => [0b110, 0b101, 0b110, 0b101, 0b110],
        'c' | 'C' => [0b111, 0b100, 0b100, 0b100, 0b111],
        'd' | 'D' => [0b110, 0b101, 0b101, 0b101, 0b110],
        'e' | 'E' => [0b111, 0b100, 0b111, 0b100, 0b111],
        'f' | 'F' => [0b111, 0b100, 0b111, 0b100, 0b100],
        'g' | 'G' => [0b111, 0b100, 0b101, 0b101, 0b111],
        'h' | 'H' => [0b101, 0b101, 0b111, 0b101, 0b101],
        'i' | 'I' => [0b111, 0b010, 0b010, 0b010, 0b111],
        'j' | 'J' => [0b001, 0b001, 0b001, 0b101, 0b111],
        'k' | 'K' => [0b101, 0b101, 0b110, 0b101, 0b101],
        'l' | 'L' => [0b100, 0b100, 0b100, 0b100, 0b111],
        'm' | 'M' => [0b101, 0b111, 0b101, 0b101, 0b101],
        'n' | 'N' => [0b111, 0b101, 0b101, 0b101, 0b101],
        'o' | 'O' => [0b111, 0b101, 0b101, 0b101, 0b111],
        'p' | 'P' => [0b111, 0b101, 0b111, 0b100, 0b100],
        'q' | 'Q' => [0b111, 0b101, 0b101, 0b111, 0b001],
        'r' | 'R' => [0b110, 0b101, 0b110, 0b101, 0b101],
        's' | 'S' => [0b111, 0b100, 0b111, 0b001, 0b111],
        't' | 'T' => [0b111, 0b010, 0b010, 0b010, 0b010],
        'u' | 'U' => [0b101, 0b101, 0b101, 0b101, 0b111],
        'v' | 'V' => [0b101, 0b101, 0b101, 0b010, 0b010],
        'w' | 'W' => [0b101, 0b101, 0b101, 0b111, 0b101],
        'x' | 'X' => [0b101, 0b101, 0b010, 0b101, 0b101],
        'y' | 'Y' => [0b101, 0b101, 0b111, 0b010, 0b010],
        'z' | 'Z' => [0b111, 0b001, 0b010, 0b100, 0b111],
        '/' => [0b001, 0b001, 0b010, 0b100, 0b100],
        '-' => [0b000, 0b000, 0b111, 0b000, 0b000],
        '+' => [0b000, 0b010, 0b111, 0b010, 0b000],
        '=' => [0b000, 0b111, 0b000, 0b111, 0b000],
        '.' => [0b000, 0b000, 0b000, 0b000, 0b010],
        ',' => [0b000, 0b000, 0b000, 0b010, 0b100],
        ':' => [0b000, 0b010, 0b000, 0b010, 0b000],
        '%' => [0b101, 0b001, 0b010, 0b100, 0b101],
        '(' => [0b010, 0b100, 0b100, 0b100, 0b010],
        ')' => [0b010, 0b001, 0b001, 0b001, 0b010],
        ' ' => [0b000, 0b000, 0b000, 0b000, 0b000],
        _   => [0b000, 0b000, 0b010, 0b000, 0b000], // fallback dot
    }
}
