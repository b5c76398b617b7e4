//! Page rotation angles
//!
//! PDF stores page rotation in the `/Rotate` entry as a multiple of 90.
//! [`Rotation`] keeps the value normalized so the rest of the crate never
//! sees negative or out-of-range angles.

use std::fmt;

/// Clockwise page rotation, always one of 0, 90, 180 or 270 degrees
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Rotation(u16);

impl Rotation {
    pub const NONE: Rotation = Rotation(0);

    /// Normalize an arbitrary angle into `[0, 360)`.
    ///
    /// Angles that are not a multiple of 90 are invalid in PDF; they are
    /// snapped down to the quarter turn below instead of being rejected.
    pub fn from_degrees(angle: i64) -> Self {
        let normalized = angle.rem_euclid(360);
        Rotation((normalized - normalized % 90) as u16)
    }

    pub fn degrees(self) -> u16 {
        self.0
    }

    /// Rotate a further 90 degrees clockwise
    pub fn quarter_turn(self) -> Self {
        Rotation((self.0 + 90) % 360)
    }
}

impl From<i64> for Rotation {
    fn from(angle: i64) -> Self {
        Rotation::from_degrees(angle)
    }
}

impl From<Rotation> for u16 {
    fn from(rotation: Rotation) -> Self {
        rotation.0
    }
}

impl fmt::Display for Rotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}°", self.0)
    }
}
