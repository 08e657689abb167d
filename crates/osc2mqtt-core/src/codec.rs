//! Payload codecs: raw MQTT payload bytes to value sequences and back.
//!
//! Which codec applies is selected by a rule's `type` field; the `format`
//! field is codec-specific: a binary layout string for `struct`, a single
//! element code for `array`, a text encoding name for `json`/`string`.

use crate::error::{DecodeError, EncodeError};
use crate::value::{self, Value};

/// Payload wire format selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadType {
    /// Fixed binary layout described by a struct format string.
    Struct,
    /// Homogeneous sequence of fixed-width elements.
    Array,
    /// JSON text.
    Json,
    /// Plain text.
    Text,
    /// Opaque bytes.
    Raw,
}

impl PayloadType {
    /// Parse the `type` field of a rule. Unknown names select `Raw`.
    pub fn parse(name: &str) -> Self {
        match name.trim() {
            "struct" => PayloadType::Struct,
            "array" => PayloadType::Array,
            "json" => PayloadType::Json,
            "string" => PayloadType::Text,
            _ => PayloadType::Raw,
        }
    }
}

/// Decode a payload into a value sequence.
pub fn decode(ptype: PayloadType, format: &str, payload: &[u8]) -> Result<Vec<Value>, DecodeError> {
    match ptype {
        PayloadType::Struct => decode_struct(format, payload),
        PayloadType::Array => decode_array(format, payload),
        PayloadType::Json => {
            let text = decode_text(payload, format)?;
            let json: serde_json::Value = serde_json::from_str(&text)?;
            // A top-level array is the value sequence itself; anything else
            // is a single value.
            Ok(match json {
                serde_json::Value::Array(items) => {
                    items.into_iter().map(Value::from_json).collect()
                }
                other => vec![Value::from_json(other)],
            })
        }
        PayloadType::Text => Ok(vec![Value::Str(decode_text(payload, format)?)]),
        PayloadType::Raw => Ok(vec![Value::Bytes(payload.to_vec())]),
    }
}

/// Encode a value sequence into payload bytes.
pub fn encode(ptype: PayloadType, format: &str, values: &[Value]) -> Result<Vec<u8>, EncodeError> {
    match ptype {
        PayloadType::Struct => encode_struct(format, values),
        PayloadType::Array => encode_array(format, values),
        PayloadType::Json => {
            let array = serde_json::Value::Array(values.iter().map(Value::to_json).collect());
            Ok(serde_json::to_vec(&array)?)
        }
        PayloadType::Text => {
            let joined: String = values.iter().map(Value::to_string).collect();
            Ok(joined.into_bytes())
        }
        PayloadType::Raw => Ok(match values {
            [single] => single.to_string().into_bytes(),
            many => value::render_sequence(many).into_bytes(),
        }),
    }
}

/// One item in a struct layout. For numeric codes `count` is a repeat
/// count; for `s` it is the byte length; for `x` the pad width.
#[derive(Debug, Clone, Copy)]
struct LayoutItem {
    code: char,
    count: usize,
}

/// A parsed struct format string.
#[derive(Debug, Clone)]
struct StructLayout {
    big_endian: bool,
    items: Vec<LayoutItem>,
    /// Total byte size of the layout.
    size: usize,
    /// Number of values the layout produces/consumes.
    slots: usize,
}

fn elem_size(code: char) -> Option<usize> {
    match code {
        'b' | 'B' | 'x' | 's' => Some(1),
        'h' | 'H' => Some(2),
        'i' | 'I' | 'l' | 'L' | 'f' => Some(4),
        'q' | 'Q' | 'd' => Some(8),
        _ => None,
    }
}

fn is_signed(code: char) -> bool {
    matches!(code, 'b' | 'h' | 'i' | 'l' | 'q')
}

/// Whether `v` is representable in `width` bytes with the given
/// signedness.
fn int_fits(v: i64, width: usize, signed: bool) -> bool {
    if width >= 8 {
        return signed || v >= 0;
    }
    let bits = width as u32 * 8;
    if signed {
        let half = 1i64 << (bits - 1);
        v >= -half && v < half
    } else {
        v >= 0 && v < (1i64 << bits)
    }
}

impl StructLayout {
    /// Parse a layout string: optional byte-order prefix, then
    /// repeat-counted item codes. Standard sizes throughout; `@`, `=` and
    /// no prefix mean little-endian (host order on the platforms this
    /// bridge runs on), `>` and `!` big-endian.
    fn parse(format: &str) -> Result<Self, char> {
        let mut chars = format.trim().chars().peekable();
        let big_endian = match chars.peek() {
            Some('>') | Some('!') => {
                chars.next();
                true
            }
            Some('<') | Some('=') | Some('@') => {
                chars.next();
                false
            }
            _ => false,
        };

        let mut items = Vec::new();
        let mut size = 0usize;
        let mut slots = 0usize;
        while let Some(&c) = chars.peek() {
            if c.is_whitespace() {
                chars.next();
                continue;
            }
            let mut count: Option<usize> = None;
            while let Some(d) = chars.peek().and_then(|c| c.to_digit(10)) {
                count = Some(
                    count
                        .unwrap_or(0)
                        .checked_mul(10)
                        .and_then(|n| n.checked_add(d as usize))
                        .ok_or(c)?,
                );
                chars.next();
            }
            let code = chars.next().ok_or(' ')?;
            let width = elem_size(code).ok_or(code)?;
            let count = count.unwrap_or(1);
            match code {
                'x' => size = size.checked_add(count).ok_or(code)?,
                's' => {
                    size = size.checked_add(count).ok_or(code)?;
                    slots += 1;
                }
                _ => {
                    size = width
                        .checked_mul(count)
                        .and_then(|n| size.checked_add(n))
                        .ok_or(code)?;
                    slots = slots.checked_add(count).ok_or(code)?;
                }
            }
            items.push(LayoutItem { code, count });
        }
        Ok(StructLayout {
            big_endian,
            items,
            size,
            slots,
        })
    }
}

fn read_int(buf: &[u8], big_endian: bool, signed: bool) -> i64 {
    let mut v: u64 = 0;
    if big_endian {
        for &b in buf {
            v = (v << 8) | b as u64;
        }
    } else {
        for &b in buf.iter().rev() {
            v = (v << 8) | b as u64;
        }
    }
    let bits = buf.len() * 8;
    if signed && bits < 64 && (v >> (bits - 1)) & 1 == 1 {
        v as i64 - (1i64 << bits)
    } else {
        v as i64
    }
}

fn write_int(out: &mut Vec<u8>, v: i64, width: usize, big_endian: bool) {
    let bytes = (v as u64).to_le_bytes();
    if big_endian {
        out.extend(bytes[..width].iter().rev());
    } else {
        out.extend(&bytes[..width]);
    }
}

fn read_f32(buf: &[u8], big_endian: bool) -> f64 {
    let mut a = [0u8; 4];
    a.copy_from_slice(buf);
    if big_endian {
        f32::from_be_bytes(a) as f64
    } else {
        f32::from_le_bytes(a) as f64
    }
}

fn read_f64(buf: &[u8], big_endian: bool) -> f64 {
    let mut a = [0u8; 8];
    a.copy_from_slice(buf);
    if big_endian {
        f64::from_be_bytes(a)
    } else {
        f64::from_le_bytes(a)
    }
}

/// Decode one fixed-width element at `buf`.
fn decode_elem(code: char, buf: &[u8], big_endian: bool) -> Value {
    match code {
        'f' => Value::Float(read_f32(buf, big_endian)),
        'd' => Value::Float(read_f64(buf, big_endian)),
        _ => Value::Int(read_int(buf, big_endian, is_signed(code))),
    }
}

/// Encode one fixed-width element, checking the value's variant against
/// the format code.
fn encode_elem(
    out: &mut Vec<u8>,
    code: char,
    width: usize,
    value: &Value,
    big_endian: bool,
) -> Result<(), EncodeError> {
    match code {
        'f' | 'd' => {
            let v = match value {
                Value::Float(f) => *f,
                Value::Int(i) => *i as f64,
                other => {
                    return Err(EncodeError::TypeMismatch {
                        code,
                        kind: other.kind(),
                    })
                }
            };
            if code == 'f' {
                if big_endian {
                    out.extend((v as f32).to_be_bytes());
                } else {
                    out.extend((v as f32).to_le_bytes());
                }
            } else if big_endian {
                out.extend(v.to_be_bytes());
            } else {
                out.extend(v.to_le_bytes());
            }
        }
        _ => {
            let v = match value {
                Value::Int(i) => *i,
                Value::Bool(b) => *b as i64,
                other => {
                    return Err(EncodeError::TypeMismatch {
                        code,
                        kind: other.kind(),
                    })
                }
            };
            if !int_fits(v, width, is_signed(code)) {
                return Err(EncodeError::OutOfRange { code, value: v });
            }
            write_int(out, v, width, big_endian);
        }
    }
    Ok(())
}

fn decode_struct(format: &str, payload: &[u8]) -> Result<Vec<Value>, DecodeError> {
    let layout = StructLayout::parse(format).map_err(DecodeError::BadFormatCode)?;
    if payload.len() != layout.size {
        return Err(DecodeError::LengthMismatch {
            layout: format.to_string(),
            need: layout.size,
            got: payload.len(),
        });
    }

    let mut values = Vec::with_capacity(layout.slots);
    let mut pos = 0usize;
    for item in &layout.items {
        match item.code {
            'x' => pos += item.count,
            's' => {
                values.push(Value::Bytes(payload[pos..pos + item.count].to_vec()));
                pos += item.count;
            }
            code => {
                let width = elem_size(code).unwrap_or(1);
                for _ in 0..item.count {
                    values.push(decode_elem(code, &payload[pos..pos + width], layout.big_endian));
                    pos += width;
                }
            }
        }
    }
    Ok(values)
}

fn encode_struct(format: &str, values: &[Value]) -> Result<Vec<u8>, EncodeError> {
    let layout = StructLayout::parse(format).map_err(EncodeError::BadFormatCode)?;
    if values.len() != layout.slots {
        return Err(EncodeError::CountMismatch {
            layout: format.to_string(),
            need: layout.slots,
            got: values.len(),
        });
    }

    let mut out = Vec::with_capacity(layout.size);
    let mut next = values.iter();
    for item in &layout.items {
        match item.code {
            'x' => out.extend(std::iter::repeat(0u8).take(item.count)),
            's' => {
                // Fixed-size byte string: pad with NUL, truncate if longer.
                let value = next.next().ok_or(EncodeError::CountMismatch {
                    layout: format.to_string(),
                    need: layout.slots,
                    got: values.len(),
                })?;
                let bytes = match value {
                    Value::Bytes(b) => b.clone(),
                    Value::Str(s) => s.clone().into_bytes(),
                    other => {
                        return Err(EncodeError::TypeMismatch {
                            code: 's',
                            kind: other.kind(),
                        })
                    }
                };
                let mut field = bytes;
                field.resize(item.count, 0);
                out.extend(field);
            }
            code => {
                let width = elem_size(code).unwrap_or(1);
                for _ in 0..item.count {
                    let value = next.next().ok_or(EncodeError::CountMismatch {
                        layout: format.to_string(),
                        need: layout.slots,
                        got: values.len(),
                    })?;
                    encode_elem(&mut out, code, width, value, layout.big_endian)?;
                }
            }
        }
    }
    Ok(out)
}

fn array_code(format: &str) -> Option<char> {
    let code = format.trim();
    let mut chars = code.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if elem_size(c).is_some() && c != 'x' && c != 's' => Some(c),
        _ => None,
    }
}

fn decode_array(format: &str, payload: &[u8]) -> Result<Vec<Value>, DecodeError> {
    let code = array_code(format)
        .ok_or_else(|| DecodeError::BadFormatCode(format.chars().next().unwrap_or(' ')))?;
    let width = elem_size(code).unwrap_or(1);
    if payload.len() % width != 0 {
        return Err(DecodeError::UnevenArray {
            code,
            elem: width,
            got: payload.len(),
        });
    }
    Ok(payload
        .chunks_exact(width)
        .map(|chunk| decode_elem(code, chunk, false))
        .collect())
}

fn encode_array(format: &str, values: &[Value]) -> Result<Vec<u8>, EncodeError> {
    let code = array_code(format)
        .ok_or_else(|| EncodeError::BadFormatCode(format.chars().next().unwrap_or(' ')))?;
    let width = elem_size(code).unwrap_or(1);
    let mut out = Vec::with_capacity(values.len() * width);
    for value in values {
        encode_elem(&mut out, code, width, value, false)?;
    }
    Ok(out)
}

/// Decode payload bytes as text in the named encoding (UTF-8 default).
fn decode_text(payload: &[u8], encoding: &str) -> Result<String, DecodeError> {
    let name = encoding.trim().to_ascii_lowercase();
    match name.as_str() {
        "" | "utf-8" | "utf8" => std::str::from_utf8(payload)
            .map(str::to_string)
            .map_err(|_| DecodeError::BadText {
                encoding: "utf-8".into(),
            }),
        "ascii" | "us-ascii" => {
            if payload.is_ascii() {
                Ok(String::from_utf8_lossy(payload).into_owned())
            } else {
                Err(DecodeError::BadText {
                    encoding: "ascii".into(),
                })
            }
        }
        "latin-1" | "latin1" | "iso-8859-1" => {
            Ok(payload.iter().map(|&b| b as char).collect())
        }
        other => Err(DecodeError::UnknownEncoding(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_struct_single_byte_roundtrip() {
        let values = decode(PayloadType::Struct, "B", &[42]).unwrap();
        assert_eq!(values, vec![Value::Int(42)]);
        let bytes = encode(PayloadType::Struct, "B", &values).unwrap();
        assert_eq!(bytes, vec![42]);
    }

    #[test]
    fn test_struct_signed_byte() {
        let values = decode(PayloadType::Struct, "b", &[0xFF]).unwrap();
        assert_eq!(values, vec![Value::Int(-1)]);
    }

    #[test]
    fn test_struct_multi_field_little_endian() {
        let values = decode(PayloadType::Struct, "<hH", &[0xFF, 0xFF, 0x01, 0x02]).unwrap();
        assert_eq!(values, vec![Value::Int(-1), Value::Int(0x0201)]);
    }

    #[test]
    fn test_struct_big_endian_int() {
        let values = decode(PayloadType::Struct, ">i", &[0, 0, 1, 0]).unwrap();
        assert_eq!(values, vec![Value::Int(256)]);
        let bytes = encode(PayloadType::Struct, ">i", &values).unwrap();
        assert_eq!(bytes, vec![0, 0, 1, 0]);
    }

    #[test]
    fn test_struct_repeat_count() {
        let values = decode(PayloadType::Struct, "3B", &[1, 2, 3]).unwrap();
        assert_eq!(
            values,
            vec![Value::Int(1), Value::Int(2), Value::Int(3)]
        );
    }

    #[test]
    fn test_struct_pad_and_string() {
        let values = decode(PayloadType::Struct, "Bx2s", &[7, 0, b'h', b'i']).unwrap();
        assert_eq!(values, vec![Value::Int(7), Value::Bytes(b"hi".to_vec())]);
        let bytes = encode(PayloadType::Struct, "Bx2s", &values).unwrap();
        assert_eq!(bytes, vec![7, 0, b'h', b'i']);
    }

    #[test]
    fn test_struct_float_roundtrip() {
        let bytes = encode(PayloadType::Struct, "<f", &[Value::Float(23.5)]).unwrap();
        let values = decode(PayloadType::Struct, "<f", &bytes).unwrap();
        assert_eq!(values, vec![Value::Float(23.5)]);
    }

    #[test]
    fn test_struct_length_mismatch() {
        let err = decode(PayloadType::Struct, "h", &[1]).unwrap_err();
        assert!(matches!(err, DecodeError::LengthMismatch { need: 2, got: 1, .. }));
    }

    #[test]
    fn test_struct_count_mismatch() {
        let err = encode(PayloadType::Struct, "BB", &[Value::Int(1)]).unwrap_err();
        assert!(matches!(err, EncodeError::CountMismatch { need: 2, got: 1, .. }));
    }

    #[test]
    fn test_struct_type_mismatch() {
        let err = encode(PayloadType::Struct, "B", &[Value::Str("x".into())]).unwrap_err();
        assert!(matches!(err, EncodeError::TypeMismatch { code: 'B', .. }));
    }

    #[test]
    fn test_struct_unsigned_out_of_range() {
        let err = encode(PayloadType::Struct, "B", &[Value::Int(300)]).unwrap_err();
        assert!(matches!(err, EncodeError::OutOfRange { code: 'B', value: 300 }));
        let err = encode(PayloadType::Struct, "H", &[Value::Int(-1)]).unwrap_err();
        assert!(matches!(err, EncodeError::OutOfRange { code: 'H', value: -1 }));
        assert_eq!(
            encode(PayloadType::Struct, "B", &[Value::Int(255)]).unwrap(),
            vec![255]
        );
    }

    #[test]
    fn test_struct_signed_out_of_range() {
        let err = encode(PayloadType::Struct, "b", &[Value::Int(200)]).unwrap_err();
        assert!(matches!(err, EncodeError::OutOfRange { code: 'b', value: 200 }));
        assert_eq!(
            encode(PayloadType::Struct, "b", &[Value::Int(-128)]).unwrap(),
            vec![0x80]
        );
    }

    #[test]
    fn test_struct_repeat_count_overflow() {
        let err = decode(PayloadType::Struct, "99999999999999999999B", &[]).unwrap_err();
        assert!(matches!(err, DecodeError::BadFormatCode(_)));
        let err = decode(PayloadType::Struct, "9999999999999999999q", &[]).unwrap_err();
        assert!(matches!(err, DecodeError::BadFormatCode('q')));
    }

    #[test]
    fn test_struct_bad_code() {
        let err = decode(PayloadType::Struct, "Z", &[]).unwrap_err();
        assert!(matches!(err, DecodeError::BadFormatCode('Z')));
    }

    #[test]
    fn test_array_bytes() {
        let values = decode(PayloadType::Array, "B", &[1, 2, 3]).unwrap();
        assert_eq!(
            values,
            vec![Value::Int(1), Value::Int(2), Value::Int(3)]
        );
        assert_eq!(encode(PayloadType::Array, "B", &values).unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn test_array_uneven() {
        let err = decode(PayloadType::Array, "h", &[1, 2, 3]).unwrap_err();
        assert!(matches!(err, DecodeError::UnevenArray { elem: 2, got: 3, .. }));
    }

    #[test]
    fn test_json_array_flattens() {
        let values = decode(PayloadType::Json, "utf-8", b"[1,2,3]").unwrap();
        assert_eq!(
            values,
            vec![Value::Int(1), Value::Int(2), Value::Int(3)]
        );
        assert_eq!(encode(PayloadType::Json, "", &values).unwrap(), b"[1,2,3]");
    }

    #[test]
    fn test_json_scalar_and_object() {
        assert_eq!(
            decode(PayloadType::Json, "", b"2.5").unwrap(),
            vec![Value::Float(2.5)]
        );
        let values = decode(PayloadType::Json, "", br#"{"a":1}"#).unwrap();
        assert_eq!(values.len(), 1);
        assert!(matches!(values[0], Value::Json(_)));
    }

    #[test]
    fn test_json_invalid() {
        assert!(matches!(
            decode(PayloadType::Json, "", b"{nope").unwrap_err(),
            DecodeError::Json(_)
        ));
    }

    #[test]
    fn test_text_codec() {
        let values = decode(PayloadType::Text, "", b"hello").unwrap();
        assert_eq!(values, vec![Value::Str("hello".into())]);
        let bytes = encode(
            PayloadType::Text,
            "",
            &[Value::Str("on:".into()), Value::Int(1)],
        )
        .unwrap();
        assert_eq!(bytes, b"on:1");
    }

    #[test]
    fn test_text_latin1() {
        let values = decode(PayloadType::Text, "latin-1", &[0xE9]).unwrap();
        assert_eq!(values, vec![Value::Str("\u{e9}".into())]);
    }

    #[test]
    fn test_text_unknown_encoding() {
        assert!(matches!(
            decode(PayloadType::Text, "ebcdic", b"x").unwrap_err(),
            DecodeError::UnknownEncoding(_)
        ));
    }

    #[test]
    fn test_raw_codec() {
        let values = decode(PayloadType::Raw, "", &[0, 1, 2]).unwrap();
        assert_eq!(values, vec![Value::Bytes(vec![0, 1, 2])]);
        assert_eq!(
            encode(PayloadType::Raw, "", &[Value::Int(5)]).unwrap(),
            b"5"
        );
        assert_eq!(
            encode(PayloadType::Raw, "", &[Value::Int(1), Value::Int(2)]).unwrap(),
            b"[1,2]"
        );
    }

    #[test]
    fn test_payload_type_parse() {
        assert_eq!(PayloadType::parse("struct"), PayloadType::Struct);
        assert_eq!(PayloadType::parse("string"), PayloadType::Text);
        assert_eq!(PayloadType::parse("something-else"), PayloadType::Raw);
    }
}
