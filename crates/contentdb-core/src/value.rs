//! Dynamic SQL values.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Width of the big-endian payload read when a blob is coerced to a number.
const NUMERIC_BLOB_WIDTH: usize = 8;

/// Storage class of a [`Value`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataType {
    /// SQL NULL
    Null,
    /// 64-bit signed integer
    Integer,
    /// 64-bit floating point
    Real,
    /// UTF-8 text
    Text,
    /// Binary data
    Blob,
}

impl DataType {
    /// SQL name of this storage class.
    pub const fn name(self) -> &'static str {
        match self {
            DataType::Null => "NULL",
            DataType::Integer => "INTEGER",
            DataType::Real => "REAL",
            DataType::Text => "TEXT",
            DataType::Blob => "BLOB",
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A dynamically-typed SQL value.
///
/// Exactly one storage class is active per value. Values are immutable once
/// built; the coercing accessors below never fail and degrade to a zero or
/// empty result when no sensible conversion exists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// NULL value
    Null,

    /// 64-bit signed integer
    Integer(i64),

    /// 64-bit floating point
    Real(f64),

    /// Text string
    Text(String),

    /// Binary data
    Blob(Vec<u8>),
}

impl Value {
    /// Check if this value is NULL.
    pub const fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Get the storage class of this value.
    pub const fn data_type(&self) -> DataType {
        match self {
            Value::Null => DataType::Null,
            Value::Integer(_) => DataType::Integer,
            Value::Real(_) => DataType::Real,
            Value::Text(_) => DataType::Text,
            Value::Blob(_) => DataType::Blob,
        }
    }

    /// Coerce to an `i64`.
    ///
    /// Reals truncate toward zero (saturating, NaN becomes 0). Text yields its
    /// leading integer prefix. Blobs of at least eight bytes are read as a
    /// big-endian integer; shorter blobs yield 0.
    #[allow(clippy::cast_possible_truncation)]
    pub fn to_integer(&self) -> i64 {
        match self {
            Value::Null => 0,
            Value::Integer(v) => *v,
            Value::Real(v) => *v as i64,
            Value::Text(s) => parse_integer_prefix(s),
            Value::Blob(b) => match leading_word(b) {
                Some(word) => i64::from_be_bytes(word),
                None => {
                    tracing::debug!(len = b.len(), "blob too short for integer coercion");
                    0
                }
            },
        }
    }

    /// Coerce to an `f64`.
    ///
    /// Integers widen. Text yields its leading decimal prefix. Blobs of at
    /// least eight bytes are read as a big-endian IEEE double; shorter blobs
    /// yield 0.0.
    pub fn to_real(&self) -> f64 {
        match self {
            Value::Null => 0.0,
            Value::Integer(v) => *v as f64,
            Value::Real(v) => *v,
            Value::Text(s) => parse_real_prefix(s),
            Value::Blob(b) => match leading_word(b) {
                Some(word) => f64::from_be_bytes(word),
                None => {
                    tracing::debug!(len = b.len(), "blob too short for real coercion");
                    0.0
                }
            },
        }
    }

    /// Coerce to text.
    ///
    /// Numbers use their decimal form. Blob bytes are reinterpreted as UTF-8,
    /// with invalid sequences replaced by U+FFFD.
    pub fn to_text(&self) -> String {
        match self {
            Value::Null => String::new(),
            Value::Integer(v) => v.to_string(),
            Value::Real(v) => v.to_string(),
            Value::Text(s) => s.clone(),
            Value::Blob(b) => String::from_utf8_lossy(b).into_owned(),
        }
    }

    /// Coerce to the bytes of its text form. Blob bytes pass through as-is,
    /// so this is the exact counterpart of [`to_text`](Self::to_text).
    pub fn to_text_bytes(&self) -> Vec<u8> {
        match self {
            Value::Blob(b) => b.clone(),
            other => other.to_text().into_bytes(),
        }
    }

    /// Coerce to bytes. Only blobs carry bytes; everything else is empty.
    pub fn to_blob(&self) -> Vec<u8> {
        match self {
            Value::Blob(b) => b.clone(),
            _ => Vec::new(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("NULL"),
            Value::Integer(v) => write!(f, "{v}"),
            Value::Real(v) => write!(f, "{v}"),
            Value::Text(s) => write!(f, "'{s}'"),
            Value::Blob(b) => write!(f, "[BLOB: {} bytes]", b.len()),
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Integer(i64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Real(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Real(f64::from(v))
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Blob(v)
    }
}

impl From<&[u8]> for Value {
    fn from(v: &[u8]) -> Self {
        Value::Blob(v.to_vec())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

fn leading_word(bytes: &[u8]) -> Option<[u8; NUMERIC_BLOB_WIDTH]> {
    bytes
        .get(..NUMERIC_BLOB_WIDTH)
        .and_then(|head| head.try_into().ok())
}

/// Length of the run of ASCII digits at the start of `bytes`.
fn digit_run(bytes: &[u8]) -> usize {
    bytes.iter().take_while(|b| b.is_ascii_digit()).count()
}

/// Length of an optional leading `+`/`-`.
fn sign_len(bytes: &[u8]) -> usize {
    usize::from(matches!(bytes.first(), Some(b'+' | b'-')))
}

/// Parse the integer prefix of `text`, skipping leading whitespace.
///
/// Returns 0 when no digits are present or the prefix overflows `i64`.
fn parse_integer_prefix(text: &str) -> i64 {
    let trimmed = text.trim_start();
    let bytes = trimmed.as_bytes();
    let sign = sign_len(bytes);
    let digits = digit_run(&bytes[sign..]);
    if digits == 0 {
        tracing::debug!(text, "text has no integer prefix");
        return 0;
    }
    trimmed[..sign + digits].parse().unwrap_or_else(|_| {
        tracing::debug!(text, "integer prefix out of range");
        0
    })
}

/// Parse the decimal floating point prefix of `text`, skipping leading
/// whitespace. Accepts `[sign] digits [. digits] [e [sign] digits]`.
fn parse_real_prefix(text: &str) -> f64 {
    let trimmed = text.trim_start();
    let bytes = trimmed.as_bytes();
    let mut end = sign_len(bytes);

    let int_digits = digit_run(&bytes[end..]);
    end += int_digits;

    let mut frac_digits = 0;
    if bytes.get(end) == Some(&b'.') {
        frac_digits = digit_run(&bytes[end + 1..]);
        if int_digits > 0 || frac_digits > 0 {
            end += 1 + frac_digits;
        }
    }

    if int_digits == 0 && frac_digits == 0 {
        tracing::debug!(text, "text has no numeric prefix");
        return 0.0;
    }

    if matches!(bytes.get(end), Some(b'e' | b'E')) {
        let exp_sign = sign_len(&bytes[end + 1..]);
        let exp_digits = digit_run(&bytes[end + 1 + exp_sign..]);
        if exp_digits > 0 {
            end += 1 + exp_sign + exp_digits;
        }
    }

    trimmed[..end].parse().unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_type() {
        assert_eq!(Value::Null.data_type(), DataType::Null);
        assert_eq!(Value::Integer(1).data_type(), DataType::Integer);
        assert_eq!(Value::Real(1.0).data_type(), DataType::Real);
        assert_eq!(Value::from("x").data_type(), DataType::Text);
        assert_eq!(Value::from(vec![1u8]).data_type(), DataType::Blob);
        assert_eq!(DataType::Blob.to_string(), "BLOB");
    }

    #[test]
    fn test_integer_coercions() {
        assert_eq!(Value::Integer(i64::MIN).to_integer(), i64::MIN);
        assert_eq!(Value::Real(3.99).to_integer(), 3);
        assert_eq!(Value::Real(-3.99).to_integer(), -3);
        assert_eq!(Value::Real(f64::NAN).to_integer(), 0);
        assert_eq!(Value::from("61").to_integer(), 61);
        assert_eq!(Value::from("  -12abc").to_integer(), -12);
        assert_eq!(Value::from("3.7").to_integer(), 3);
        assert_eq!(Value::from("seven").to_integer(), 0);
        assert_eq!(Value::from("").to_integer(), 0);
        assert_eq!(Value::from("99999999999999999999").to_integer(), 0);
        assert_eq!(Value::Null.to_integer(), 0);
    }

    #[test]
    fn test_real_coercions() {
        assert_eq!(Value::Integer(42).to_real(), 42.0);
        assert_eq!(Value::from("2.5e3xyz").to_real(), 2500.0);
        assert_eq!(Value::from("-.5").to_real(), -0.5);
        assert_eq!(Value::from("7.").to_real(), 7.0);
        assert_eq!(Value::from("1e").to_real(), 1.0);
        assert_eq!(Value::from(".").to_real(), 0.0);
        assert_eq!(Value::from("nope").to_real(), 0.0);
    }

    #[test]
    fn test_blob_numeric_coercions() {
        let int_blob = Value::Blob(0x0102_0304_0506_0708_i64.to_be_bytes().to_vec());
        assert_eq!(int_blob.to_integer(), 0x0102_0304_0506_0708);

        let mut real_bytes = 1.5_f64.to_be_bytes().to_vec();
        real_bytes.extend_from_slice(b"trailing");
        assert_eq!(Value::Blob(real_bytes).to_real(), 1.5);

        let short = Value::Blob(b"blob".to_vec());
        assert_eq!(short.to_integer(), 0);
        assert_eq!(short.to_real(), 0.0);
        assert_eq!(Value::Blob(Vec::new()).to_integer(), 0);
    }

    #[test]
    fn test_text_and_blob_coercions() {
        assert_eq!(Value::Integer(-1970).to_text(), "-1970");
        assert_eq!(Value::Real(0.25).to_text(), "0.25");
        assert_eq!(Value::from("seven").to_text(), "seven");
        assert_eq!(Value::Blob(b"blob".to_vec()).to_text(), "blob");
        assert_eq!(Value::Blob(vec![0xff]).to_text(), "\u{fffd}");

        assert_eq!(Value::Blob(vec![1, 2, 3]).to_blob(), vec![1, 2, 3]);
        assert!(Value::from("data").to_blob().is_empty());
        assert!(Value::Integer(5).to_blob().is_empty());
    }

    #[test]
    fn test_option_conversion() {
        assert_eq!(Value::from(None::<i64>), Value::Null);
        assert_eq!(Value::from(Some("a")), Value::Text("a".to_string()));
    }
}
