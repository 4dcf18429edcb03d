//! Fixed-point value encoding
//!
//! A value travels as an integer part (0-63) and a single decimal digit.
//! On the SET path both bytes carry a two-bit tag so the board can tell them
//! apart. On the GET path the board answers with plain magnitudes, because the
//! host already knows which register it asked for. Do not "fix" this
//! asymmetry here; the board firmware depends on it.

/// Tag of a SET fraction byte (`10xxxxxx`)
pub const FRACTION_TAG: u8 = 0x80;

/// Tag of a SET integer byte (`11xxxxxx`)
pub const INTEGER_TAG: u8 = 0xC0;

/// Bits carrying the payload of a SET byte
pub const PAYLOAD_MASK: u8 = 0x3F;

/// Bits carrying the tag of a SET byte
pub const TAG_MASK: u8 = 0xC0;

/// Largest integer part the wire format can carry
pub const MAX_INTEGER_PART: u8 = 63;

/// The two bytes of a SET command, in transmission order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SetCommand {
    /// `10xxxxxx`, sent first
    pub fraction_byte: u8,
    /// `11xxxxxx`, sent second
    pub integer_byte: u8,
}

impl SetCommand {
    /// Bytes in the order they go on the wire
    pub fn bytes(&self) -> [u8; 2] {
        [self.fraction_byte, self.integer_byte]
    }
}

/// Split a value into its integer part and one decimal digit.
///
/// A fraction that rounds up to 10 carries into the integer part, so the
/// digit always stays in 0..=9.
fn split(value: f64) -> (i64, i64) {
    let mut integer = value.floor() as i64;
    let mut fraction = ((value - integer as f64) * 10.0).round() as i64;
    if fraction >= 10 {
        integer += 1;
        fraction -= 10;
    }
    (integer, fraction)
}

/// Encode a setpoint as a tagged SET command.
///
/// Integer parts above 63 wrap through the 6-bit mask. Callers validate the
/// domain before encoding.
pub fn encode_set(value: f64) -> SetCommand {
    let (integer, fraction) = split(value);
    SetCommand {
        fraction_byte: FRACTION_TAG | (fraction as u8 & PAYLOAD_MASK),
        integer_byte: INTEGER_TAG | (integer as u8 & PAYLOAD_MASK),
    }
}

/// Decode a GET reply pair into a value.
///
/// Both bytes are taken as plain magnitudes; tag bits are not stripped.
pub fn decode_get(integer_byte: u8, fraction_byte: u8) -> f64 {
    integer_byte as f64 + fraction_byte as f64 / 10.0
}

/// Encode a value the way a board answers a GET: untagged `(integer, fraction)`.
pub fn encode_raw_magnitude(value: f64) -> (u8, u8) {
    let (integer, fraction) = split(value);
    (integer as u8, fraction as u8)
}

/// Whether `byte` is a SET fraction byte
pub fn is_set_fraction(byte: u8) -> bool {
    byte & TAG_MASK == FRACTION_TAG
}

/// Whether `byte` is a SET integer byte
pub fn is_set_integer(byte: u8) -> bool {
    byte & TAG_MASK == INTEGER_TAG
}

/// Payload of a SET byte with the tag removed
pub fn payload(byte: u8) -> u8 {
    byte & PAYLOAD_MASK
}
