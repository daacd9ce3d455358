//! Pixel values and the canonical draw-request grammar
//!
//! Every entry point (HTTP body, WebSocket frame, CLI arguments) goes through
//! the same parser:
//!
//! - `x`, `y`: a JSON number, or a string of ASCII decimal digits
//! - `colour`: a string of 1 to 8 hex digits read as packed `RRGGBBAA`,
//!   optionally prefixed with `#` or `0x`; or a JSON number holding the
//!   packed value
//!
//! Field names are matched case-insensitively, and `color` is accepted for
//! `colour`. Change messages are emitted as `{"x":1,"y":2,"colour":"ff0000ff"}`.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};

/// A single write intent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "DrawRequest")]
pub struct Pixel {
    /// Column, 1-indexed
    pub x: u32,
    /// Row, 1-indexed
    pub y: u32,
    /// Packed `RRGGBBAA` colour
    #[serde(serialize_with = "serialize_colour")]
    pub colour: u32,
}

impl Pixel {
    /// Create a pixel from already-typed values
    #[must_use]
    pub fn new(x: u32, y: u32, colour: u32) -> Self {
        Self { x, y, colour }
    }

    /// Parse the textual form: decimal coordinates, hex colour
    ///
    /// # Errors
    ///
    /// Returns `Error::Parse` naming the first malformed field.
    pub fn parse(x: &str, y: &str, colour: &str) -> Result<Self> {
        Ok(Self {
            x: parse_decimal("x", x)?,
            y: parse_decimal("y", y)?,
            colour: parse_hex_colour(colour)?,
        })
    }

    /// Parse a JSON draw message
    ///
    /// # Errors
    ///
    /// Returns `Error::Parse` for malformed JSON or a malformed field.
    pub fn from_json(raw: &str) -> Result<Self> {
        let invalid = |e: serde_json::Error| Error::parse(format!("invalid draw message: {e}"));

        let value = match serde_json::from_str::<Value>(raw).map_err(invalid)? {
            Value::Object(fields) => Value::Object(fold_keys(fields)),
            other => other,
        };
        let request: DrawRequest = serde_json::from_value(value).map_err(invalid)?;
        request.into_pixel()
    }

    /// Colour as 8 lowercase hex digits
    #[must_use]
    pub fn colour_hex(&self) -> String {
        format!("{:08x}", self.colour)
    }
}

impl std::fmt::Display for Pixel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {}) #{:08x}", self.x, self.y, self.colour)
    }
}

/// Lower-case every top-level key; later duplicates win
fn fold_keys(fields: Map<String, Value>) -> Map<String, Value> {
    fields
        .into_iter()
        .map(|(key, value)| (key.to_ascii_lowercase(), value))
        .collect()
}

fn serialize_colour<S: Serializer>(colour: &u32, serializer: S) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_str(&format!("{colour:08x}"))
}

/// A JSON field that may arrive as a number or as text
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum NumericField {
    /// Plain JSON number
    Number(u64),
    /// JSON string, decimal or hex depending on the field
    Text(String),
}

impl NumericField {
    fn as_decimal(&self, field: &str) -> Result<u32> {
        match self {
            Self::Number(n) => narrow(field, *n),
            Self::Text(s) => parse_decimal(field, s),
        }
    }

    fn as_colour(&self) -> Result<u32> {
        match self {
            Self::Number(n) => narrow("colour", *n),
            Self::Text(s) => parse_hex_colour(s),
        }
    }
}

/// Untrusted draw request as it arrives on the wire
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DrawRequest {
    /// Column
    #[serde(alias = "X")]
    pub x: NumericField,
    /// Row
    #[serde(alias = "Y")]
    pub y: NumericField,
    /// Colour
    #[serde(alias = "Colour", alias = "color", alias = "Color")]
    pub colour: NumericField,
}

impl DrawRequest {
    /// Validate the numeric fields into a `Pixel`. Bounds are checked later,
    /// against the store's geometry.
    ///
    /// # Errors
    ///
    /// Returns `Error::Parse` naming the first malformed field.
    pub fn into_pixel(self) -> Result<Pixel> {
        Ok(Pixel {
            x: self.x.as_decimal("x")?,
            y: self.y.as_decimal("y")?,
            colour: self.colour.as_colour()?,
        })
    }
}

impl TryFrom<DrawRequest> for Pixel {
    type Error = Error;

    fn try_from(request: DrawRequest) -> Result<Self> {
        request.into_pixel()
    }
}

fn narrow(field: &str, value: u64) -> Result<u32> {
    u32::try_from(value).map_err(|_| Error::parse(format!("{field} {value} does not fit in 32 bits")))
}

fn parse_decimal(field: &str, raw: &str) -> Result<u32> {
    let digits = raw.trim();
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(Error::parse(format!("can't parse {field}: {raw:?} is not a decimal number")));
    }
    digits
        .parse::<u32>()
        .map_err(|e| Error::parse(format!("can't parse {field}: {e}")))
}

fn parse_hex_colour(raw: &str) -> Result<u32> {
    let trimmed = raw.trim();
    let digits = trimmed
        .strip_prefix('#')
        .or_else(|| trimmed.strip_prefix("0x"))
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);

    if digits.is_empty() || digits.len() > 8 || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(Error::parse(format!(
            "can't parse colour: {raw:?} is not 1 to 8 hex digits"
        )));
    }
    u32::from_str_radix(digits, 16).map_err(|e| Error::parse(format!("can't parse colour: {e}")))
}
