//! Binary position model: short, flat or long one unit.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Position {
    Short,
    #[default]
    Flat,
    Long,
}

impl Position {
    /// Clamps an integral target into {-1, 0, 1}.
    pub fn from_target(target: i32) -> Self {
        match target.clamp(-1, 1) {
            -1 => Position::Short,
            0 => Position::Flat,
            _ => Position::Long,
        }
    }

    pub fn as_i8(self) -> i8 {
        match self {
            Position::Short => -1,
            Position::Flat => 0,
            Position::Long => 1,
        }
    }

    pub fn as_f64(self) -> f64 {
        f64::from(self.as_i8())
    }

    pub fn is_long(self) -> bool {
        self == Position::Long
    }

    pub fn is_short(self) -> bool {
        self == Position::Short
    }

    pub fn is_flat(self) -> bool {
        self == Position::Flat
    }

    /// Signed size of the move from `self` to `next`.
    pub fn delta_to(self, next: Position) -> i8 {
        next.as_i8() - self.as_i8()
    }
}

impl Serialize for Position {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i8(self.as_i8())
    }
}
