// SPDX-License-Identifier: Apache-2.0

//! Parsed JSON numbers.

/// A JSON number, split into the two representations the grammar can
/// produce. Text without a fraction or exponent parses as `Int`; anything
/// else, and integers too large for `i64`, parses as `Float`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum JsonNumber {
    Int(i64),
    Float(f64),
}

impl JsonNumber {
    /// Parse validated number text. `is_integer` is the tokenizer's
    /// knowledge of whether a `.` or exponent was seen.
    ///
    /// Returns `None` only if the text does not parse at all, which the
    /// tokenizer's grammar check is supposed to rule out.
    pub(crate) fn from_text(text: &str, is_integer: bool) -> Option<Self> {
        if is_integer {
            match text.parse::<i64>() {
                Ok(value) => Some(JsonNumber::Int(value)),
                // Out of i64 range; keep the magnitude as a float.
                Err(_) => text.parse::<f64>().ok().map(JsonNumber::Float),
            }
        } else {
            text.parse::<f64>().ok().map(JsonNumber::Float)
        }
    }

    /// The value as an `i64`, if it was an in-range integer.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            JsonNumber::Int(value) => Some(*value),
            JsonNumber::Float(_) => None,
        }
    }

    /// The value as an `f64`. Integers convert; large ones lose precision.
    pub fn as_f64(&self) -> f64 {
        match self {
            JsonNumber::Int(value) => *value as f64,
            JsonNumber::Float(value) => *value,
        }
    }

    /// Whether the source text was an integer (no fraction, no exponent)
    /// that fit in `i64`.
    pub fn is_integer(&self) -> bool {
        matches!(self, JsonNumber::Int(_))
    }
}

impl core::fmt::Display for JsonNumber {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            JsonNumber::Int(value) => write!(f, "{value}"),
            JsonNumber::Float(value) => write!(f, "{value}"),
        }
    }
}
