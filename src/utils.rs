//! # Formatting and Decoding Helpers
//!
//! Small, allocation-light helpers shared by the printer and the event
//! adapter.
//!
//! ## Key Functionality Categories
//!
//! - **Numbers**: compact float rendering with a fixed number of
//!   significant digits
//! - **Strings**: quoting for scalar string values and tree leaves
//! - **Decoding**: parsing a serialized event into an ordered tree where the
//!   first occurrence of a duplicated key wins
//!
//! ## Usage Examples
//!
//! ```rust
//! use liitu::utils::*;
//!
//! assert_eq!(format_float(3.14159267), "3.1415927");
//! assert_eq!(format_float(1e20), "1e+20");
//! assert_eq!(quote("say \"hi\""), r#""say \"hi\"""#);
//!
//! let tree = decode_first_wins(br#"{"a":1,"a":2,"n":1e3}"#).unwrap();
//! assert_eq!(tree["a"], 1);
//! assert_eq!(tree["n"].to_string(), "1e3");
//! ```

use serde::de::{self, Deserialize, Deserializer, MapAccess, SeqAccess, Visitor};
use serde_json::{Map, Number, Value};
use std::fmt;

/// Significant digits used when rendering floats.
pub const FLOAT_PRECISION: usize = 8;

/// Render a float with [`FLOAT_PRECISION`] significant digits
///
/// Uses the shortest of the fixed and exponent notations the way `%g`
/// does: exponent notation is chosen when the decimal exponent is below -4
/// or at least the precision. Trailing zeros in the fraction are dropped.
///
/// ## Special Values
///
/// - `NaN` renders as `NaN`
/// - infinities render as `+Inf` and `-Inf`
/// - zero keeps its sign (`0` or `-0`)
///
/// ## Examples
///
/// ```rust
/// # use liitu::utils::format_float;
/// assert_eq!(format_float(100.0), "100");
/// assert_eq!(format_float(0.00001), "1e-05");
/// assert_eq!(format_float(123456789.0), "1.2345679e+08");
/// ```
pub fn format_float(value: f64) -> String {
    if value.is_nan() {
        return "NaN".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "+Inf" } else { "-Inf" }.to_string();
    }
    if value == 0.0 {
        return if value.is_sign_negative() { "-0" } else { "0" }.to_string();
    }

    // Round once in exponent form to learn the post-rounding exponent.
    let scientific = format!("{:.*e}", FLOAT_PRECISION - 1, value);
    let (mantissa, exponent) = match scientific.split_once('e') {
        Some((m, e)) => (m, e.parse::<i32>().unwrap_or(0)),
        None => return scientific,
    };

    if exponent < -4 || exponent >= FLOAT_PRECISION as i32 {
        let sign = if exponent < 0 { '-' } else { '+' };
        format!(
            "{}e{}{:02}",
            trim_fraction(mantissa),
            sign,
            exponent.unsigned_abs()
        )
    } else {
        let decimals = (FLOAT_PRECISION as i32 - 1 - exponent).max(0) as usize;
        trim_fraction(&format!("{:.*}", decimals, value)).to_string()
    }
}

fn trim_fraction(digits: &str) -> &str {
    if digits.contains('.') {
        digits.trim_end_matches('0').trim_end_matches('.')
    } else {
        digits
    }
}

/// Quote a scalar string value with standard escaping
///
/// Quotes, backslashes and control characters are escaped. Printable
/// non-ASCII text is kept as is and markup characters such as `<`, `>` and
/// `&` are never escaped.
pub fn quote(value: &str) -> String {
    format!("{:?}", value)
}

/// Quote a string as a tree leaf (JSON string syntax)
pub fn quote_leaf(value: &str) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| quote(value))
}

/// Decode a serialized event into an ordered tree
///
/// Objects keep their members in input order. When a key appears more than
/// once in the same object, the first occurrence is kept and later ones are
/// ignored. Numbers keep their literal text (`1e3` stays `1e3`, integers of
/// any width keep every digit). Trailing whitespace, including the line
/// terminator, is accepted; any other trailing data is an error.
///
/// ## Errors
///
/// Returns the decoder error for malformed or truncated input.
pub fn decode_first_wins(bytes: &[u8]) -> Result<Value, serde_json::Error> {
    serde_json::from_slice::<FirstWins>(bytes).map(|tree| tree.0)
}

/// Key under which the decoder hands over a number literal it keeps as text.
const NUMBER_TOKEN: &str = "$serde_json::private::Number";

struct FirstWins(Value);

impl<'de> Deserialize<'de> for FirstWins {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(FirstWinsVisitor).map(FirstWins)
    }
}

struct FirstWinsVisitor;

impl<'de> Visitor<'de> for FirstWinsVisitor {
    type Value = Value;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("any valid JSON value")
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> Result<Value, E> {
        Ok(Value::Bool(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Value, E> {
        Ok(Value::from(v))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Value, E> {
        Ok(Value::from(v))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Value, E> {
        Ok(Number::from_f64(v).map_or(Value::Null, Value::Number))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Value, E> {
        Ok(Value::String(v.to_string()))
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<Value, E> {
        Ok(Value::String(v))
    }

    fn visit_unit<E: de::Error>(self) -> Result<Value, E> {
        Ok(Value::Null)
    }

    fn visit_none<E: de::Error>(self) -> Result<Value, E> {
        Ok(Value::Null)
    }

    fn visit_some<D: Deserializer<'de>>(self, deserializer: D) -> Result<Value, D::Error> {
        FirstWins::deserialize(deserializer).map(|tree| tree.0)
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Value, A::Error> {
        let mut items = Vec::with_capacity(seq.size_hint().unwrap_or(0));
        while let Some(FirstWins(item)) = seq.next_element()? {
            items.push(item);
        }
        Ok(Value::Array(items))
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Value, A::Error> {
        let mut object = Map::new();
        let Some(first) = map.next_key::<String>()? else {
            return Ok(Value::Object(object));
        };
        if first == NUMBER_TOKEN {
            let literal: String = map.next_value()?;
            return literal
                .parse::<Number>()
                .map(Value::Number)
                .map_err(de::Error::custom);
        }

        let FirstWins(value) = map.next_value()?;
        object.insert(first, value);
        while let Some(key) = map.next_key::<String>()? {
            let FirstWins(value) = map.next_value()?;
            if !object.contains_key(&key) {
                object.insert(key, value);
            }
        }
        Ok(Value::Object(object))
    }
}
