//! Configuration: mount profiles, screen, gesture timing, arbitration policy
//! and the ring button map.
//!
//! A [`Config`] is built once (from defaults or a TOML file), validated, and
//! then handed by reference to the components that need it. Nothing here is
//! mutated during frame processing; the only runtime-swappable piece is the
//! active [`MountProfile`], which the engine owns.
//!
//! ```toml
//! [screen]
//! width  = 2560
//! height = 1440
//!
//! [mount]
//! profile = "Pimax"
//!
//! [[mount.custom]]
//! name                = "Desk"
//! rotation_offset_deg = { x = 0.0, y = 0.0, z = 0.0 }
//! position_offset_mm  = { x = 0.0, y = 80.0, z = 120.0 }
//!
//! [gesture]
//! detent_degrees = 10.0
//! click_time_ms  = 250
//!
//! [arbitration]
//! strategy    = "hysteresis"
//! overlap_deg = 3.0
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::buttons::ButtonId;
use crate::types::{Side, Vec2, Vec3, WindowGeometry};

// ════════════════════════════════════════════════════════════════════════════
// Errors
// ════════════════════════════════════════════════════════════════════════════

/// Everything that can be wrong with a configuration. Raised at load time
/// only; frame processing never fails.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file {path}: {source}")]
    Io {
        path:   PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid value for `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },

    #[error("unknown mount profile `{0}`")]
    UnknownProfile(String),

    #[error("custom mount profile `{0}` is defined more than once")]
    DuplicateProfile(String),

    #[error("custom mount profile `{0}` has the same name as a built-in preset")]
    ShadowsPreset(String),

    #[error("{0} buttons are mapped to the scroll gesture; at most one is allowed")]
    MultipleScrollButtons(usize),
}

fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid { field, reason: reason.into() }
}

// ════════════════════════════════════════════════════════════════════════════
// Mount profiles
// ════════════════════════════════════════════════════════════════════════════

/// Horizontal angular field the simulator's cockpit view spans, whatever the
/// outer window size.
pub const WINDOW_FIELD_H_DEG: f32 = 100.0;
/// Aspect ratio of that field (16:10).
pub const WINDOW_FIELD_ASPECT: f32 = 16.0 / 10.0;
/// Windows this short or shorter are splash screens/launchers; ignored.
pub const MIN_WINDOW_HEIGHT: u32 = 600;

/// Calibration for one physical mounting of the sensor.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct MountProfile {
    /// Mount rotation (degrees), applied Z, then X, then Y.
    pub rotation_offset_deg:  Vec3,
    /// Eye position relative to the sensor (mm), in the rotated frame.
    pub position_offset_mm:   Vec3,
    /// Pixels per degree, per axis.
    pub angle_to_pixel_scale: Vec2,
}

/// Pixels per degree used until a window geometry event says otherwise.
pub const DEFAULT_SCALE: Vec2 = Vec2::new(16.0, 24.0);

/// Built-in mounting presets.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Preset {
    Pimax,
    Joculus,
    Generic,
}

impl Preset {
    pub const ALL: [Preset; 3] = [Preset::Pimax, Preset::Joculus, Preset::Generic];

    pub fn name(self) -> &'static str {
        match self {
            Preset::Pimax   => "Pimax",
            Preset::Joculus => "Joculus",
            Preset::Generic => "Generic",
        }
    }

    pub fn from_name(name: &str) -> Option<Preset> {
        Preset::ALL.into_iter().find(|p| p.name().eq_ignore_ascii_case(name))
    }

    pub fn profile(self) -> MountProfile {
        let (rotation, position) = match self {
            // Sensor on the headset faceplate, tilted down towards the hands.
            Preset::Pimax   => (Vec3::new(10.0, 0.0, 0.0), Vec3::new(0.0, 60.0, 95.0)),
            // Sensor clipped lower on the strap, tilted up slightly.
            Preset::Joculus => (Vec3::new(-5.0, 0.0, 0.0), Vec3::new(0.0, 90.0, 80.0)),
            // Level mount just above the eyes.
            Preset::Generic => (Vec3::ZERO, Vec3::new(0.0, 73.0, 110.0)),
        };
        MountProfile {
            rotation_offset_deg:  rotation,
            position_offset_mm:   position,
            angle_to_pixel_scale: DEFAULT_SCALE,
        }
    }
}

impl MountProfile {
    /// Recompute the angle-to-pixel scale so that the fixed cockpit field
    /// ([`WINDOW_FIELD_H_DEG`] wide, [`WINDOW_FIELD_ASPECT`]) fills `window`.
    pub fn rescaled_for_window(&self, window: &WindowGeometry) -> MountProfile {
        let field_v = WINDOW_FIELD_H_DEG / WINDOW_FIELD_ASPECT;
        MountProfile {
            angle_to_pixel_scale: Vec2::new(
                window.width  as f32 / WINDOW_FIELD_H_DEG,
                window.height as f32 / field_v,
            ),
            ..*self
        }
    }

    fn validate(&self, field: &'static str) -> Result<(), ConfigError> {
        if !self.rotation_offset_deg.is_finite() || !self.position_offset_mm.is_finite() {
            return Err(invalid(field, "offsets must be finite"));
        }
        let s = self.angle_to_pixel_scale;
        if !(s.x.is_finite() && s.y.is_finite() && s.x > 0.0 && s.y > 0.0) {
            return Err(invalid(field, format!("scale must be positive, got ({}, {})", s.x, s.y)));
        }
        Ok(())
    }
}

/// A user-defined mount profile, selectable by name like the presets.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NamedProfile {
    pub name:                 String,
    #[serde(default)]
    pub rotation_offset_deg:  Vec3,
    #[serde(default)]
    pub position_offset_mm:   Vec3,
    /// Falls back to [`DEFAULT_SCALE`].
    #[serde(default)]
    pub angle_to_pixel_scale: Option<Vec2>,
}

impl NamedProfile {
    pub fn profile(&self) -> MountProfile {
        MountProfile {
            rotation_offset_deg:  self.rotation_offset_deg,
            position_offset_mm:   self.position_offset_mm,
            angle_to_pixel_scale: self.angle_to_pixel_scale.unwrap_or(DEFAULT_SCALE),
        }
    }
}

/// Runtime request to switch mount calibration.
#[derive(Clone, Debug, PartialEq)]
pub enum ProfileSelect {
    /// A built-in preset or a custom profile from the config, by name.
    Named(String),
    /// An ad-hoc profile; keeps the current pixel scale.
    Custom {
        name:                String,
        rotation_offset_deg: Vec3,
        position_offset_mm:  Vec3,
    },
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MountConfig {
    /// Profile active at startup.
    pub profile: String,
    pub custom:  Vec<NamedProfile>,
}

impl Default for MountConfig {
    fn default() -> Self {
        MountConfig {
            profile: Preset::Generic.name().to_string(),
            custom:  Vec::new(),
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Screen
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScreenConfig {
    pub width:  u32,
    pub height: u32,
    /// Reset point is `(center.x, center.y * reset_y_factor)`.
    pub reset_y_factor:      f32,
    /// Park the cursor at the reset point when tracking is disabled.
    pub recenter_on_disable: bool,
}

impl Default for ScreenConfig {
    fn default() -> Self {
        ScreenConfig {
            width:  1920,
            height: 1080,
            reset_y_factor:      1.25,
            recenter_on_disable: true,
        }
    }
}

impl ScreenConfig {
    pub fn center(&self) -> Vec2 {
        Vec2::new(self.width as f32 / 2.0, self.height as f32 / 2.0)
    }

    pub fn reset_point(&self) -> Vec2 {
        let c = self.center();
        Vec2::new(c.x, c.y * self.reset_y_factor)
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Gesture timing
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScrollDirection {
    Up,
    Down,
}

impl ScrollDirection {
    pub fn sign(self) -> i32 {
        match self {
            ScrollDirection::Up   => 1,
            ScrollDirection::Down => -1,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GestureConfig {
    /// Drag distance per wheel tick.
    pub detent_degrees: f32,
    /// Wheel delta emitted per detent.
    pub detent_amount:  i32,
    /// A gesture-start press released within this window, without any
    /// detent crossed, becomes a single tick.
    pub click_time_ms:  u64,
    /// Cursor moves are suppressed this long after a click edge.
    pub debounce_ms:    u64,
    pub tap_direction:  ScrollDirection,
    /// While disabled, any button press re-enables tracking (and is consumed)
    /// instead of only the toggle button.
    pub any_button_wakes: bool,
}

impl Default for GestureConfig {
    fn default() -> Self {
        GestureConfig {
            detent_degrees:   10.0,
            detent_amount:    100,
            click_time_ms:    250,
            debounce_ms:      96,
            tap_direction:    ScrollDirection::Up,
            any_button_wakes: true,
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Arbitration
// ════════════════════════════════════════════════════════════════════════════

/// How the active hand is chosen when both are visible.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionStrategy {
    /// Closest to screen center, no bias.
    Nearest,
    /// Closest to screen center, with the tracked hand favoured by
    /// `overlap_deg`.
    Hysteresis,
    /// Always this hand when visible; the other one otherwise.
    Preferred(Side),
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArbitrationConfig {
    pub strategy:        SelectionStrategy,
    pub overlap_deg:     f32,
    /// Hold the selected hand for the duration of a scroll gesture.
    pub drag_continuity: bool,
}

impl Default for ArbitrationConfig {
    fn default() -> Self {
        ArbitrationConfig {
            strategy:        SelectionStrategy::Hysteresis,
            overlap_deg:     3.0,
            drag_continuity: true,
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Button map
// ════════════════════════════════════════════════════════════════════════════

/// What a ring button does.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ButtonRole {
    /// Hold to arm the drag-to-scroll gesture; tap for one tick.
    ScrollGesture,
    /// Enable/disable cursor tracking.
    Toggle,
    PrimaryClick,
    SecondaryClick,
    ScrollUp,
    ScrollDown,
    Ignore,
}

/// Button roles as seen on a ring worn on the right hand. A ring worn on the
/// left hand swaps the primary/secondary click roles when `mirror_left_hand`
/// is set, so the click under the thumb stays the primary one.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ButtonMap {
    pub center: ButtonRole,
    pub up:     ButtonRole,
    pub down:   ButtonRole,
    pub fwd:    ButtonRole,
    pub back:   ButtonRole,
    pub mirror_left_hand: bool,
}

impl Default for ButtonMap {
    fn default() -> Self {
        ButtonMap {
            center: ButtonRole::ScrollGesture,
            up:     ButtonRole::Toggle,
            down:   ButtonRole::ScrollDown,
            fwd:    ButtonRole::PrimaryClick,
            back:   ButtonRole::SecondaryClick,
            mirror_left_hand: true,
        }
    }
}

impl ButtonMap {
    pub fn role(&self, button: ButtonId, worn_on: Side) -> ButtonRole {
        let role = match button {
            ButtonId::Center => self.center,
            ButtonId::Up     => self.up,
            ButtonId::Down   => self.down,
            ButtonId::Fwd    => self.fwd,
            ButtonId::Back   => self.back,
        };
        if worn_on == Side::Left && self.mirror_left_hand {
            match role {
                ButtonRole::PrimaryClick   => ButtonRole::SecondaryClick,
                ButtonRole::SecondaryClick => ButtonRole::PrimaryClick,
                other => other,
            }
        } else {
            role
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let scroll = [self.center, self.up, self.down, self.fwd, self.back]
            .iter()
            .filter(|r| **r == ButtonRole::ScrollGesture)
            .count();
        if scroll > 1 {
            return Err(ConfigError::MultipleScrollButtons(scroll));
        }
        Ok(())
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Config
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub screen:      ScreenConfig,
    pub mount:       MountConfig,
    pub gesture:     GestureConfig,
    pub arbitration: ArbitrationConfig,
    pub buttons:     ButtonMap,
    /// Pointer smoothing, `(0, 1]`; 1.0 follows the hand exactly.
    pub smoothing:   Smoothing,
}

/// Exponential smoothing factor for pointer angles.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Smoothing(pub f32);

impl Default for Smoothing {
    fn default() -> Self { Smoothing(1.0) }
}

impl Config {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(s: &str) -> Result<Config, ConfigError> {
        let cfg: Config = toml::from_str(s)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Read, parse and validate a TOML file.
    pub fn load(path: &Path) -> Result<Config, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Config::from_toml_str(&text)
    }

    /// Check every value; contradictions fail here rather than per frame.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.screen.width == 0 || self.screen.height == 0 {
            return Err(invalid("screen", "width and height must be non-zero"));
        }
        if !(self.screen.reset_y_factor.is_finite() && self.screen.reset_y_factor >= 0.0) {
            return Err(invalid("screen.reset_y_factor", "must be a non-negative number"));
        }

        let g = &self.gesture;
        if !(g.detent_degrees.is_finite() && g.detent_degrees > 0.0) {
            return Err(invalid("gesture.detent_degrees", format!("must be positive, got {}", g.detent_degrees)));
        }
        if g.detent_amount == 0 {
            return Err(invalid("gesture.detent_amount", "must be non-zero"));
        }

        let a = &self.arbitration;
        if !(a.overlap_deg.is_finite() && a.overlap_deg >= 0.0) {
            return Err(invalid("arbitration.overlap_deg", format!("must be >= 0, got {}", a.overlap_deg)));
        }

        let k = self.smoothing.0;
        if !(k > 0.0 && k <= 1.0) {
            return Err(invalid("smoothing", format!("must be in (0, 1], got {}", k)));
        }

        self.buttons.validate()?;

        for (i, custom) in self.mount.custom.iter().enumerate() {
            if Preset::from_name(&custom.name).is_some() {
                return Err(ConfigError::ShadowsPreset(custom.name.clone()));
            }
            if self.mount.custom[..i].iter().any(|c| c.name.eq_ignore_ascii_case(&custom.name)) {
                return Err(ConfigError::DuplicateProfile(custom.name.clone()));
            }
            custom.profile().validate("mount.custom")?;
        }

        self.resolve_profile(&self.mount.profile)?;
        Ok(())
    }

    /// Look up a preset or custom profile by name (case-insensitive).
    pub fn resolve_profile(&self, name: &str) -> Result<MountProfile, ConfigError> {
        if let Some(p) = Preset::from_name(name) {
            return Ok(p.profile());
        }
        self.mount
            .custom
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(name))
            .map(NamedProfile::profile)
            .ok_or_else(|| ConfigError::UnknownProfile(name.to_string()))
    }

    /// Names of every selectable profile, presets first.
    pub fn profile_names(&self) -> Vec<String> {
        Preset::ALL
            .iter()
            .map(|p| p.name().to_string())
            .chain(self.mount.custom.iter().map(|c| c.name.clone()))
            .collect()
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        Config::default().validate().unwrap();
    }

    #[test]
    fn presets_resolve_by_name_case_insensitively() {
        let cfg = Config::default();
        assert_eq!(cfg.resolve_profile("pimax").unwrap(), Preset::Pimax.profile());
        assert_eq!(cfg.resolve_profile("JOCULUS").unwrap(), Preset::Joculus.profile());
        assert!(matches!(
            cfg.resolve_profile("Quest"),
            Err(ConfigError::UnknownProfile(n)) if n == "Quest"
        ));
    }

    #[test]
    fn parses_toml_with_custom_profile() {
        let cfg = Config::from_toml_str(r#"
            [screen]
            width  = 2560
            height = 1440

            [mount]
            profile = "Desk"

            [[mount.custom]]
            name = "Desk"
            position_offset_mm = { x = 0.0, y = 80.0, z = 120.0 }

            [arbitration]
            strategy = { preferred = "right" }
        "#).unwrap();

        assert_eq!(cfg.screen.width, 2560);
        assert_eq!(cfg.arbitration.strategy, SelectionStrategy::Preferred(Side::Right));
        let desk = cfg.resolve_profile("desk").unwrap();
        assert_eq!(desk.position_offset_mm, Vec3::new(0.0, 80.0, 120.0));
        assert_eq!(desk.angle_to_pixel_scale, DEFAULT_SCALE);
        // untouched sections keep their defaults
        assert_eq!(cfg.gesture, GestureConfig::default());
    }

    #[test]
    fn rejects_unknown_startup_profile() {
        let err = Config::from_toml_str("[mount]\nprofile = \"Nope\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::UnknownProfile(_)));
    }

    #[test]
    fn rejects_custom_profile_shadowing_preset() {
        let err = Config::from_toml_str(r#"
            [[mount.custom]]
            name = "Pimax"
        "#).unwrap_err();
        assert!(matches!(err, ConfigError::ShadowsPreset(_)));
    }

    #[test]
    fn rejects_duplicate_custom_profiles() {
        let err = Config::from_toml_str(r#"
            [[mount.custom]]
            name = "Desk"
            [[mount.custom]]
            name = "desk"
        "#).unwrap_err();
        assert!(matches!(err, ConfigError::DuplicateProfile(_)));
    }

    #[test]
    fn rejects_two_scroll_buttons() {
        let err = Config::from_toml_str("[buttons]\nup = \"scroll_gesture\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::MultipleScrollButtons(2)));
    }

    #[test]
    fn rejects_bad_numbers() {
        assert!(Config::from_toml_str("[gesture]\ndetent_degrees = 0.0\n").is_err());
        assert!(Config::from_toml_str("[arbitration]\noverlap_deg = -1.0\n").is_err());
        assert!(Config::from_toml_str("smoothing = 0.0\n").is_err());
        assert!(Config::from_toml_str("smoothing = 1.5\n").is_err());
        assert!(Config::from_toml_str("[screen]\nwidth = 0\n").is_err());
    }

    #[test]
    fn rejects_malformed_toml() {
        assert!(matches!(
            Config::from_toml_str("[screen\nwidth = 1"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn load_reads_file() {
        use std::io::Write;
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[gesture]\nclick_time_ms = 400").unwrap();
        let cfg = Config::load(file.path()).unwrap();
        assert_eq!(cfg.gesture.click_time_ms, 400);
    }

    #[test]
    fn load_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::load(&dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn window_rescale_fills_fixed_field() {
        let p = Preset::Generic.profile();
        let w = WindowGeometry { x: 0, y: 0, width: 2000, height: 1250 };
        let r = p.rescaled_for_window(&w);
        assert!((r.angle_to_pixel_scale.x - 20.0).abs() < 1e-4);
        assert!((r.angle_to_pixel_scale.y - 20.0).abs() < 1e-4);
        assert_eq!(r.position_offset_mm, p.position_offset_mm);
    }

    #[test]
    fn left_hand_ring_mirrors_clicks() {
        let map = ButtonMap::default();
        assert_eq!(map.role(ButtonId::Fwd,  Side::Right), ButtonRole::PrimaryClick);
        assert_eq!(map.role(ButtonId::Fwd,  Side::Left),  ButtonRole::SecondaryClick);
        assert_eq!(map.role(ButtonId::Back, Side::Left),  ButtonRole::PrimaryClick);
        assert_eq!(map.role(ButtonId::Center, Side::Left), ButtonRole::ScrollGesture);
    }
}
