//! Sensor-relative position → screen-space angle → pixel offset.
//!
//! Everything here is pure. The only state is [`AngleFilter`], which callers
//! own and reset themselves.

use crate::config::MountProfile;
use crate::types::{Vec2, Vec3};

/// Rotate `p` by the Euler triple `rot_deg`: Z first, then X, then Y.
///
/// Axes with a zero offset are skipped entirely so an unrotated mount passes
/// positions through bit-for-bit.
pub fn rotate(p: Vec3, rot_deg: Vec3) -> Vec3 {
    let mut r = p;

    if rot_deg.z != 0.0 {
        let (s, c) = rot_deg.z.to_radians().sin_cos();
        r = Vec3::new(r.x * c - r.y * s, r.y * c + r.x * s, r.z);
    }
    if rot_deg.x != 0.0 {
        let (s, c) = rot_deg.x.to_radians().sin_cos();
        r = Vec3::new(r.x, r.y * c - r.z * s, r.z * c + r.y * s);
    }
    if rot_deg.y != 0.0 {
        let (s, c) = rot_deg.y.to_radians().sin_cos();
        r = Vec3::new(r.x * c + r.z * s, r.y, r.z * c - r.x * s);
    }

    r
}

/// Sensor-frame position expressed relative to the eye.
pub fn eye_relative(position: Vec3, profile: &MountProfile) -> Vec3 {
    rotate(position, profile.rotation_offset_deg) + profile.position_offset_mm
}

/// Horizontal and vertical view angles (degrees) of `position`.
///
/// `atan2` keeps this total: a zero depth yields ±90° instead of a division
/// by zero.
pub fn project_angles(position: Vec3, profile: &MountProfile) -> Vec2 {
    let e = eye_relative(position, profile);
    Vec2::new(
        e.x.atan2(e.z).to_degrees(),
        -e.y.atan2(e.z).to_degrees(),
    )
}

pub fn angles_to_pixels(angles: Vec2, scale: Vec2) -> Vec2 {
    Vec2::new(angles.x * scale.x, angles.y * scale.y)
}

/// Pixel offset from the projection center for a sensor-frame position.
pub fn project(position: Vec3, profile: &MountProfile) -> Vec2 {
    angles_to_pixels(project_angles(position, profile), profile.angle_to_pixel_scale)
}

/// Absolute screen position for a pixel offset around `center`, clamped to a
/// `width` × `height` screen. `None` when the target is not a number.
pub fn place_on_screen(offset: Vec2, center: Vec2, width: u32, height: u32) -> Option<(i32, i32)> {
    let target = Vec2::new(center.x + offset.x, center.y + offset.y);
    if !target.is_finite() {
        return None;
    }
    let max_x = width.saturating_sub(1) as f32;
    let max_y = height.saturating_sub(1) as f32;
    Some((target.x.clamp(0.0, max_x) as i32, target.y.clamp(0.0, max_y) as i32))
}

/// Exponential smoothing over view angles.
///
/// `speed` is the weight of the newest sample: 1.0 disables smoothing,
/// values near 0 follow very slowly.
#[derive(Clone, Debug)]
pub struct AngleFilter {
    speed: f32,
    last:  Option<Vec2>,
}

impl AngleFilter {
    pub fn new(speed: f32) -> Self {
        AngleFilter { speed: speed.clamp(f32::EPSILON, 1.0), last: None }
    }

    pub fn apply(&mut self, angles: Vec2) -> Vec2 {
        let k = self.speed;
        let out = match self.last {
            Some(l) => Vec2::new(
                l.x * (1.0 - k) + angles.x * k,
                l.y * (1.0 - k) + angles.y * k,
            ),
            None => angles,
        };
        self.last = Some(out);
        out
    }

    /// Forget history; the next sample passes through unfiltered.
    pub fn reset(&mut self) {
        self.last = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Preset, DEFAULT_SCALE};

    fn close(a: f32, b: f32) -> bool { (a - b).abs() < 1e-3 }

    fn close3(a: Vec3, b: Vec3) -> bool {
        close(a.x, b.x) && close(a.y, b.y) && close(a.z, b.z)
    }

    fn flat() -> MountProfile {
        MountProfile {
            rotation_offset_deg:  Vec3::ZERO,
            position_offset_mm:   Vec3::ZERO,
            angle_to_pixel_scale: DEFAULT_SCALE,
        }
    }

    #[test]
    fn straight_ahead_is_center() {
        for d in [1.0, 50.0, 250.0, 1e4] {
            assert_eq!(project(Vec3::new(0.0, 0.0, d), &flat()), Vec2::new(0.0, 0.0));
        }
    }

    #[test]
    fn zero_rotation_is_identity() {
        let p = Vec3::new(12.5, -3.25, 99.0);
        assert_eq!(rotate(p, Vec3::ZERO), p);
    }

    #[test]
    fn single_axis_rotations() {
        let q = 90.0;
        assert!(close3(rotate(Vec3::new(1.0, 0.0, 0.0), Vec3::new(0.0, 0.0, q)), Vec3::new(0.0, 1.0, 0.0)));
        assert!(close3(rotate(Vec3::new(0.0, 1.0, 0.0), Vec3::new(q, 0.0, 0.0)), Vec3::new(0.0, 0.0, 1.0)));
        assert!(close3(rotate(Vec3::new(0.0, 0.0, 1.0), Vec3::new(0.0, q, 0.0)), Vec3::new(1.0, 0.0, 0.0)));
    }

    #[test]
    fn rotation_order_is_z_then_x() {
        // Z takes +x to +y, then X takes +y to +z. The reverse order would
        // leave the point at +y.
        let r = rotate(Vec3::new(1.0, 0.0, 0.0), Vec3::new(90.0, 0.0, 90.0));
        assert!(close3(r, Vec3::new(0.0, 0.0, 1.0)), "{:?}", r);
    }

    #[test]
    fn angles_and_scale() {
        let a = project_angles(Vec3::new(100.0, 100.0, 100.0), &flat());
        assert!(close(a.x, 45.0));
        // up in the sensor frame is negative on screen
        assert!(close(a.y, -45.0));
        let px = project(Vec3::new(100.0, 0.0, 100.0), &flat());
        assert!(close(px.x, 45.0 * DEFAULT_SCALE.x));
        assert!(close(px.y, 0.0));
    }

    #[test]
    fn zero_depth_is_finite() {
        let a = project_angles(Vec3::new(10.0, 0.0, 0.0), &flat());
        assert!(close(a.x, 90.0));
        assert!(a.y.is_finite());
    }

    #[test]
    fn eye_offset_translates_after_rotation() {
        let p = Preset::Generic.profile();
        let e = eye_relative(Vec3::new(0.0, -73.0, 50.0), &p);
        assert!(close3(e, Vec3::new(0.0, 0.0, 160.0)));
        assert!(close(project_angles(Vec3::new(0.0, -73.0, 50.0), &p).y, 0.0));
    }

    #[test]
    fn screen_placement_clamps() {
        let c = Vec2::new(960.0, 540.0);
        assert_eq!(place_on_screen(Vec2::new(10.0, -20.0), c, 1920, 1080), Some((970, 520)));
        assert_eq!(place_on_screen(Vec2::new(5000.0, 5000.0), c, 1920, 1080), Some((1919, 1079)));
        assert_eq!(place_on_screen(Vec2::new(-5000.0, -5000.0), c, 1920, 1080), Some((0, 0)));
    }

    #[test]
    fn screen_placement_rejects_nan() {
        let c = Vec2::new(960.0, 540.0);
        assert_eq!(place_on_screen(Vec2::new(f32::NAN, 0.0), c, 1920, 1080), None);
        assert_eq!(place_on_screen(Vec2::new(0.0, f32::INFINITY), c, 1920, 1080), None);
    }

    #[test]
    fn filter_passthrough_and_smoothing() {
        let mut f = AngleFilter::new(1.0);
        f.apply(Vec2::new(0.0, 0.0));
        assert_eq!(f.apply(Vec2::new(10.0, 4.0)), Vec2::new(10.0, 4.0));

        let mut f = AngleFilter::new(0.5);
        assert_eq!(f.apply(Vec2::new(10.0, 0.0)), Vec2::new(10.0, 0.0));
        assert_eq!(f.apply(Vec2::new(20.0, 0.0)), Vec2::new(15.0, 0.0));
        f.reset();
        assert_eq!(f.apply(Vec2::new(-8.0, 2.0)), Vec2::new(-8.0, 2.0));
    }
}
