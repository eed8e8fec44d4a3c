use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Color value of one grid unit.
///
/// Alpha is conventionally always [`Cell::OPAQUE`]; the wire payload is the
/// four bytes `[r, g, b, a]`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Cell {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Cell {
    /// Length of the wire payload.
    pub const WIRE_LEN: usize = 4;

    pub const OPAQUE: u8 = 255;

    pub const BLACK: Cell = Cell::rgb(0, 0, 0);

    /// An opaque cell.
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: Self::OPAQUE }
    }

    /// Decode a wire payload. Anything other than exactly four bytes is rejected.
    pub fn from_bytes(data: &[u8]) -> Result<Self, TypeError> {
        match *data {
            [r, g, b, a] => Ok(Self { r, g, b, a }),
            _ => Err(TypeError::InvalidCellLength {
                expected: Self::WIRE_LEN,
                actual: data.len(),
            }),
        }
    }

    pub const fn to_bytes(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

impl From<[u8; 4]> for Cell {
    fn from([r, g, b, a]: [u8; 4]) -> Self {
        Self { r, g, b, a }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rgb_is_opaque() {
        let c = Cell::rgb(1, 2, 3);
        assert_eq!(c.a, 255);
        assert_eq!(c.to_bytes(), [1, 2, 3, 255]);
    }

    #[test]
    fn from_bytes_accepts_exactly_four() {
        let c = Cell::from_bytes(&[10, 20, 30, 40]).unwrap();
        assert_eq!(c, Cell { r: 10, g: 20, b: 30, a: 40 });
    }

    #[test]
    fn from_bytes_rejects_short_and_long_payloads() {
        assert_eq!(
            Cell::from_bytes(&[1, 2, 3]).unwrap_err(),
            TypeError::InvalidCellLength { expected: 4, actual: 3 }
        );
        assert_eq!(
            Cell::from_bytes(&[1, 2, 3, 4, 5]).unwrap_err(),
            TypeError::InvalidCellLength { expected: 4, actual: 5 }
        );
        assert!(Cell::from_bytes(&[]).is_err());
    }

    #[test]
    fn serde_roundtrip() {
        let c = Cell::rgb(200, 0, 150);
        let json = serde_json::to_string(&c).unwrap();
        let parsed: Cell = serde_json::from_str(&json).unwrap();
        assert_eq!(c, parsed);
    }
}
