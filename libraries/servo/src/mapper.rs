// Stick axis to servo angle range mapping

/// Minimum raw stick axis value reported by the remote controller.
pub const STICK_MIN: i16 = -660;
/// Maximum raw stick axis value reported by the remote controller.
pub const STICK_MAX: i16 = 660;
/// Upper bound of the servo travel in degrees.
pub const ANGLE_MAX: u8 = 180;

/// Target rotational position for the external servo, in degrees.
///
/// Always within `[0, 180]`; the constructor clamps so no out-of-range
/// value can be constructed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ServoAngle(u8);

impl ServoAngle {
    pub fn new(degrees: u8) -> Self {
        ServoAngle(degrees.min(ANGLE_MAX))
    }

    pub fn degrees(&self) -> u8 {
        self.0
    }

    /// Absolute distance to another angle, in degrees.
    pub fn distance(&self, other: ServoAngle) -> u8 {
        self.0.abs_diff(other.0)
    }
}

impl std::fmt::Display for ServoAngle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Map a raw stick axis value to a servo angle.
///
/// The input is clamped to `[STICK_MIN, STICK_MAX]` and linearly
/// interpolated to `[0, ANGLE_MAX]` with rounding. Total and
/// deterministic: every `i16` maps to a valid angle.
pub fn stick_to_angle(value: i16) -> ServoAngle {
    let clamped = value.clamp(STICK_MIN, STICK_MAX);
    let span = (STICK_MAX as i32 - STICK_MIN as i32) as f32;
    let offset = (clamped as i32 - STICK_MIN as i32) as f32;
    let degrees = (offset / span * ANGLE_MAX as f32).round() as i32;
    ServoAngle::new(degrees.clamp(0, ANGLE_MAX as i32) as u8)
}
