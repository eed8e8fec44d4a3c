use crate::coordinate::Coordinate;
use crate::error::TypeError;

/// Encodes grid coordinates as wire property keys of the form `"<x>-<y>"`.
pub struct PropertyCodec;

impl PropertyCodec {
    pub const SEPARATOR: char = '-';

    /// Format a coordinate as its property key.
    pub fn encode(coord: Coordinate) -> String {
        format!("{}{}{}", coord.x, Self::SEPARATOR, coord.y)
    }

    /// Parse a property key back into a coordinate.
    ///
    /// The key must split on `-` into exactly two unsigned integers.
    pub fn decode(key: &str) -> Result<Coordinate, TypeError> {
        let malformed = || TypeError::MalformedKey(key.to_string());
        if key.is_empty() {
            return Err(malformed());
        }
        let mut parts = key.split(Self::SEPARATOR);
        let (Some(x), Some(y), None) = (parts.next(), parts.next(), parts.next()) else {
            return Err(malformed());
        };
        let x = x.parse::<u32>().map_err(|_| malformed())?;
        let y = y.parse::<u32>().map_err(|_| malformed())?;
        Ok(Coordinate::new(x, y))
    }
}
