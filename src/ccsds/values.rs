//! # Value Serializer and Extractor
//!
//! Converts scalar sensor readings to and from the big-endian payload bytes of a
//! packet.
//!
//! Two encodings exist side by side:
//! - [`serialize_text`] takes a comma-delimited string and infers each field's
//!   type from its lexical shape. Every numeric field is emitted as 4 bytes.
//! - [`encode_values`] takes typed [`Value`]s and emits each at its native width
//!   (1/2/4 bytes), which is what [`extract`] reads back given a
//!   [`FormatDescriptor`].
//!
//! No length markers are written into the payload. The reader must know the
//! layout in advance.

use std::fmt;
use std::str::FromStr;

use bytes::{Buf, BufMut, BytesMut};
use serde::Serialize;

use crate::error::{CcsdsError, Result};

/// Scalar type of a single payload field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueType {
    Float32,
    Uint8,
    Uint16,
    Uint32,
}

impl ValueType {
    /// Encoded size in bytes
    pub fn size(self) -> usize {
        match self {
            ValueType::Float32 => 4,
            ValueType::Uint8 => 1,
            ValueType::Uint16 => 2,
            ValueType::Uint32 => 4,
        }
    }

    /// Tag as written in a format descriptor
    pub fn tag(self) -> &'static str {
        match self {
            ValueType::Float32 => "float",
            ValueType::Uint8 => "uint8",
            ValueType::Uint16 => "uint16",
            ValueType::Uint32 => "uint32",
        }
    }

    /// Read one field, MSB first. Caller guarantees `buf` holds `self.size()` bytes.
    fn read(self, buf: &mut &[u8]) -> Value {
        match self {
            ValueType::Float32 => Value::Float(buf.get_f32()),
            ValueType::Uint8 => Value::U8(buf.get_u8()),
            ValueType::Uint16 => Value::U16(buf.get_u16()),
            ValueType::Uint32 => Value::U32(buf.get_u32()),
        }
    }
}

impl FromStr for ValueType {
    type Err = CcsdsError;

    fn from_str(tag: &str) -> Result<Self> {
        match tag {
            "float" => Ok(ValueType::Float32),
            "uint8" => Ok(ValueType::Uint8),
            "uint16" => Ok(ValueType::Uint16),
            "uint32" => Ok(ValueType::Uint32),
            other => Err(CcsdsError::UnknownFormatTag(other.to_string())),
        }
    }
}

/// A typed scalar read from or written to a payload
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Float(f32),
    U8(u8),
    U16(u16),
    U32(u32),
}

impl Value {
    pub fn value_type(&self) -> ValueType {
        match self {
            Value::Float(_) => ValueType::Float32,
            Value::U8(_) => ValueType::Uint8,
            Value::U16(_) => ValueType::Uint16,
            Value::U32(_) => ValueType::Uint32,
        }
    }

    pub fn as_f32(&self) -> Option<f32> {
        match *self {
            Value::Float(v) => Some(v),
            _ => None,
        }
    }

    /// Any unsigned field, widened to 32 bits
    pub fn as_u32(&self) -> Option<u32> {
        match *self {
            Value::U8(v) => Some(v as u32),
            Value::U16(v) => Some(v as u32),
            Value::U32(v) => Some(v),
            Value::Float(_) => None,
        }
    }

    fn write(&self, buf: &mut BytesMut) {
        match *self {
            Value::Float(v) => buf.put_f32(v),
            Value::U8(v) => buf.put_u8(v),
            Value::U16(v) => buf.put_u16(v),
            Value::U32(v) => buf.put_u32(v),
        }
    }
}

/// Ordered list of field types describing a payload layout
///
/// Parsed from a comma-delimited descriptor such as `"float,uint8,uint16,uint32"`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FormatDescriptor {
    types: Vec<ValueType>,
}

impl FormatDescriptor {
    pub fn new(types: Vec<ValueType>) -> Self {
        Self { types }
    }

    /// Parse a comma-delimited descriptor
    ///
    /// An empty string yields an empty descriptor and a single trailing comma is
    /// ignored.
    ///
    /// # Errors
    ///
    /// Returns [`CcsdsError::UnknownFormatTag`] for any tag outside
    /// `float`, `uint8`, `uint16`, `uint32`
    pub fn parse(descriptor: &str) -> Result<Self> {
        let types = split_fields(descriptor)
            .map(ValueType::from_str)
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { types })
    }

    pub fn types(&self) -> &[ValueType] {
        &self.types
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Total payload bytes this layout consumes
    pub fn byte_len(&self) -> usize {
        self.types.iter().map(|t| t.size()).sum()
    }
}

impl FromStr for FormatDescriptor {
    type Err = CcsdsError;

    fn from_str(descriptor: &str) -> Result<Self> {
        Self::parse(descriptor)
    }
}

impl fmt::Display for FormatDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, value_type) in self.types.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            f.write_str(value_type.tag())?;
        }
        Ok(())
    }
}

/// How a single text field is encoded
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TextField<'a> {
    /// Contains a `.`; emitted as a 4-byte IEEE-754 float
    Float(f32),
    /// Leading integer is nonzero, or the field is exactly `"0"`; emitted as 4 bytes
    Integer(i32),
    /// Anything else; emitted as raw bytes followed by `\n`
    Text(&'a str),
}

/// Classify a text field by its lexical shape
///
/// `"00"` and `"-0"` are text and `"12abc"` is the integer 12. Receivers expect
/// this exact byte layout, so keep the rule as is.
pub fn classify_field(field: &str) -> TextField<'_> {
    if field.contains('.') {
        return TextField::Float(parse_leading_float(field));
    }

    let integer = parse_leading_int(field);
    if integer != 0 || field == "0" {
        TextField::Integer(integer)
    } else {
        TextField::Text(field)
    }
}

/// Serialize comma-delimited text values into a big-endian payload
///
/// # Examples
///
/// ```
/// use ccsds_link::ccsds::values::serialize_text;
///
/// let payload = serialize_text("1,2.5,ok");
/// assert_eq!(&payload[..4], &[0, 0, 0, 1]);
/// assert_eq!(&payload[4..8], &2.5f32.to_be_bytes());
/// assert_eq!(&payload[8..], b"ok\n");
/// ```
pub fn serialize_text(values: &str) -> Vec<u8> {
    let mut buf = BytesMut::with_capacity(values.len() + 4);

    for field in split_fields(values) {
        match classify_field(field) {
            TextField::Float(v) => buf.put_f32(v),
            TextField::Integer(v) => buf.put_i32(v),
            TextField::Text(s) => {
                buf.put_slice(s.as_bytes());
                buf.put_u8(b'\n');
            }
        }
    }

    buf.to_vec()
}

/// Serialize typed values, each at its native width
pub fn encode_values(values: &[Value]) -> Vec<u8> {
    let capacity = values.iter().map(|v| v.value_type().size()).sum();
    let mut buf = BytesMut::with_capacity(capacity);

    for value in values {
        value.write(&mut buf);
    }

    buf.to_vec()
}

/// Read typed values from a payload according to `format`
///
/// Bytes beyond what the format describes are ignored. An empty payload or an
/// empty format yields no values.
///
/// # Errors
///
/// Returns [`CcsdsError::PayloadUnderrun`] if a non-empty payload is shorter than
/// `format.byte_len()`
///
/// # Examples
///
/// ```
/// use ccsds_link::ccsds::values::{extract, FormatDescriptor, Value};
///
/// let format = FormatDescriptor::parse("uint8,uint16").unwrap();
/// let values = extract(&[7, 0x01, 0x00], &format).unwrap();
/// assert_eq!(values, vec![Value::U8(7), Value::U16(256)]);
/// ```
pub fn extract(payload: &[u8], format: &FormatDescriptor) -> Result<Vec<Value>> {
    if payload.is_empty() || format.is_empty() {
        return Ok(Vec::new());
    }

    let needed = format.byte_len();
    if payload.len() < needed {
        return Err(CcsdsError::PayloadUnderrun {
            needed,
            available: payload.len(),
        });
    }

    let mut buf = payload;
    Ok(format.types().iter().map(|t| t.read(&mut buf)).collect())
}

/// Split on commas the way the wire convention does: an empty input has no
/// fields and one trailing comma does not start a new field.
fn split_fields(input: &str) -> impl Iterator<Item = &str> {
    let trimmed = input.strip_suffix(',').unwrap_or(input);
    let skip = input.is_empty();
    trimmed.split(',').filter(move |_| !skip)
}

fn is_c_space(c: char) -> bool {
    c.is_ascii_whitespace() || c == '\x0b'
}

/// Leading decimal integer, saturating at the `i32` range; 0 if none
fn parse_leading_int(field: &str) -> i32 {
    let s = field.trim_start_matches(is_c_space).as_bytes();
    let mut idx = 0;
    let mut negative = false;

    if let Some(&sign) = s.first() {
        if sign == b'+' || sign == b'-' {
            negative = sign == b'-';
            idx += 1;
        }
    }

    let limit = i32::MAX as i64 + 1;
    let mut value: i64 = 0;
    while let Some(&digit) = s.get(idx) {
        if !digit.is_ascii_digit() {
            break;
        }
        value = (value * 10 + (digit - b'0') as i64).min(limit);
        idx += 1;
    }

    let value = if negative { -value } else { value };
    value.clamp(i32::MIN as i64, i32::MAX as i64) as i32
}

/// Leading decimal float (sign, digits, fraction, exponent) or `inf`,
/// `infinity`, `nan` in any case; 0.0 if none
fn parse_leading_float(field: &str) -> f32 {
    let s = field.trim_start_matches(is_c_space);
    let bytes = s.as_bytes();
    let mut end = 0;

    if matches!(bytes.first(), Some(b'+') | Some(b'-')) {
        end += 1;
    }

    if let Some(special) = parse_special_float(&s[end..]) {
        return if bytes.first() == Some(&b'-') { -special } else { special };
    }

    let mut digits = 0;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
        digits += 1;
    }
    if end < bytes.len() && bytes[end] == b'.' {
        end += 1;
        while end < bytes.len() && bytes[end].is_ascii_digit() {
            end += 1;
            digits += 1;
        }
    }
    if digits == 0 {
        return 0.0;
    }

    if end < bytes.len() && (bytes[end] == b'e' || bytes[end] == b'E') {
        let mut exp_end = end + 1;
        if matches!(bytes.get(exp_end), Some(b'+') | Some(b'-')) {
            exp_end += 1;
        }
        let exp_digits_start = exp_end;
        while exp_end < bytes.len() && bytes[exp_end].is_ascii_digit() {
            exp_end += 1;
        }
        if exp_end > exp_digits_start {
            end = exp_end;
        }
    }

    s[..end].parse::<f64>().map(|v| v as f32).unwrap_or(0.0)
}

fn parse_special_float(s: &str) -> Option<f32> {
    let starts_with = |prefix: &str| {
        s.get(..prefix.len())
            .map(|head| head.eq_ignore_ascii_case(prefix))
            .unwrap_or(false)
    };

    if starts_with("inf") {
        Some(f32::INFINITY)
    } else if starts_with("nan") {
        Some(f32::NAN)
    } else {
        None
    }
}
