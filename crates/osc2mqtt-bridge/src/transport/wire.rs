//! OSC 1.0 wire codec.
//!
//! Encodes and decodes OSC packets over UDP: NUL-terminated strings
//! padded to 4 bytes, a `,`-prefixed type tag string, then big-endian
//! arguments. Bundles are decoded by flattening their elements; the
//! bridge never sends bundles.

use osc2mqtt_core::Value;

#[derive(Debug, thiserror::Error)]
pub enum WireError {
    #[error("truncated OSC packet")]
    Truncated,

    #[error("OSC string is not valid UTF-8")]
    BadString,

    #[error("OSC address must start with '/', got '{0}'")]
    BadAddress(String),

    #[error("unsupported OSC type tag '{0}'")]
    BadTag(char),

    #[error("cannot encode {kind} value as OSC type '{tag}'")]
    BadArg { tag: char, kind: &'static str },
}

/// Encode a single OSC message.
///
/// `tags` forces the type tag per argument position (a rule's `osctags`
/// annotation); positions without a forced tag infer one from the value.
pub fn encode_message(
    address: &str,
    values: &[Value],
    tags: Option<&[String]>,
) -> Result<Vec<u8>, WireError> {
    if !address.starts_with('/') {
        return Err(WireError::BadAddress(address.to_string()));
    }

    let arg_tags: Vec<char> = values
        .iter()
        .enumerate()
        .map(|(i, value)| {
            tags.and_then(|t| t.get(i))
                .and_then(|t| t.chars().next())
                .unwrap_or_else(|| infer_tag(value))
        })
        .collect();

    let mut out = Vec::with_capacity(64);
    push_padded_str(&mut out, address);
    let tag_string: String = std::iter::once(',').chain(arg_tags.iter().copied()).collect();
    push_padded_str(&mut out, &tag_string);
    for (tag, value) in arg_tags.iter().zip(values) {
        encode_arg(&mut out, *tag, value)?;
    }
    Ok(out)
}

/// Decode a packet into its messages. A bundle yields its elements in
/// order, nested bundles included; a plain message yields one entry.
pub fn decode_packet(data: &[u8]) -> Result<Vec<(String, Vec<Value>)>, WireError> {
    if data.starts_with(b"#bundle\0") {
        // 8 bytes magic + 8 bytes time tag, then size-prefixed elements.
        let mut messages = Vec::new();
        let mut pos = 16usize;
        while pos < data.len() {
            let size = read_u32(data, &mut pos)? as usize;
            let end = pos.checked_add(size).filter(|&e| e <= data.len())
                .ok_or(WireError::Truncated)?;
            messages.extend(decode_packet(&data[pos..end])?);
            pos = end;
        }
        Ok(messages)
    } else {
        decode_message(data).map(|msg| vec![msg])
    }
}

fn decode_message(data: &[u8]) -> Result<(String, Vec<Value>), WireError> {
    let mut pos = 0usize;
    let address = read_padded_str(data, &mut pos)?;
    if !address.starts_with('/') {
        return Err(WireError::BadAddress(address));
    }

    // Messages without a type tag string carry no arguments.
    if pos >= data.len() || data[pos] != b',' {
        return Ok((address, Vec::new()));
    }
    let tag_string = read_padded_str(data, &mut pos)?;

    let mut values = Vec::new();
    for tag in tag_string.chars().skip(1) {
        values.push(match tag {
            'i' => Value::Int(read_u32(data, &mut pos)? as i32 as i64),
            'h' => Value::Int(read_u64(data, &mut pos)? as i64),
            'f' => Value::Float(f32::from_bits(read_u32(data, &mut pos)?) as f64),
            'd' => Value::Float(f64::from_bits(read_u64(data, &mut pos)?)),
            's' | 'S' => Value::Str(read_padded_str(data, &mut pos)?),
            'b' => {
                let len = read_u32(data, &mut pos)? as usize;
                let end = pos.checked_add(len).filter(|&e| e <= data.len())
                    .ok_or(WireError::Truncated)?;
                let blob = data[pos..end].to_vec();
                pos = align4(end);
                Value::Bytes(blob)
            }
            'T' => Value::Bool(true),
            'F' => Value::Bool(false),
            'N' => Value::Json(serde_json::Value::Null),
            other => return Err(WireError::BadTag(other)),
        });
    }
    Ok((address, values))
}

fn infer_tag(value: &Value) -> char {
    match value {
        Value::Bool(true) => 'T',
        Value::Bool(false) => 'F',
        Value::Int(i) => {
            if i32::try_from(*i).is_ok() {
                'i'
            } else {
                'h'
            }
        }
        Value::Float(_) => 'f',
        Value::Str(_) | Value::Json(_) => 's',
        Value::Bytes(_) => 'b',
    }
}

fn encode_arg(out: &mut Vec<u8>, tag: char, value: &Value) -> Result<(), WireError> {
    match tag {
        'i' => {
            let v = i32::try_from(arg_i64(tag, value)?).map_err(|_| WireError::BadArg {
                tag,
                kind: value.kind(),
            })?;
            out.extend(v.to_be_bytes());
        }
        'h' => out.extend(arg_i64(tag, value)?.to_be_bytes()),
        'f' => out.extend((arg_f64(tag, value)? as f32).to_be_bytes()),
        'd' => out.extend(arg_f64(tag, value)?.to_be_bytes()),
        's' | 'S' => push_padded_str(out, &value.to_string()),
        'b' => {
            let bytes = match value {
                Value::Bytes(b) => b.as_slice(),
                other => {
                    return Err(WireError::BadArg {
                        tag,
                        kind: other.kind(),
                    })
                }
            };
            out.extend((bytes.len() as u32).to_be_bytes());
            out.extend(bytes);
            while out.len() % 4 != 0 {
                out.push(0);
            }
        }
        'T' | 'F' | 'N' => {}
        other => return Err(WireError::BadTag(other)),
    }
    Ok(())
}

fn arg_i64(tag: char, value: &Value) -> Result<i64, WireError> {
    match value {
        Value::Int(i) => Ok(*i),
        Value::Float(f) => Ok(*f as i64),
        Value::Bool(b) => Ok(*b as i64),
        Value::Str(s) => s.trim().parse().map_err(|_| WireError::BadArg {
            tag,
            kind: value.kind(),
        }),
        other => Err(WireError::BadArg {
            tag,
            kind: other.kind(),
        }),
    }
}

fn arg_f64(tag: char, value: &Value) -> Result<f64, WireError> {
    match value {
        Value::Float(f) => Ok(*f),
        Value::Int(i) => Ok(*i as f64),
        Value::Bool(b) => Ok(*b as u8 as f64),
        Value::Str(s) => s.trim().parse().map_err(|_| WireError::BadArg {
            tag,
            kind: value.kind(),
        }),
        other => Err(WireError::BadArg {
            tag,
            kind: other.kind(),
        }),
    }
}

fn align4(pos: usize) -> usize {
    (pos + 3) & !3
}

fn push_padded_str(out: &mut Vec<u8>, s: &str) {
    out.extend(s.as_bytes());
    out.push(0);
    while out.len() % 4 != 0 {
        out.push(0);
    }
}

fn read_padded_str(data: &[u8], pos: &mut usize) -> Result<String, WireError> {
    let start = *pos;
    if start > data.len() {
        return Err(WireError::Truncated);
    }
    let end = data[start..]
        .iter()
        .position(|&b| b == 0)
        .map(|i| start + i)
        .ok_or(WireError::Truncated)?;
    let text = std::str::from_utf8(&data[start..end]).map_err(|_| WireError::BadString)?;
    *pos = align4(end + 1);
    Ok(text.to_string())
}

fn read_u32(data: &[u8], pos: &mut usize) -> Result<u32, WireError> {
    let end = pos.checked_add(4).filter(|&e| e <= data.len())
        .ok_or(WireError::Truncated)?;
    let mut buf = [0u8; 4];
    buf.copy_from_slice(&data[*pos..end]);
    *pos = end;
    Ok(u32::from_be_bytes(buf))
}

fn read_u64(data: &[u8], pos: &mut usize) -> Result<u64, WireError> {
    let end = pos.checked_add(8).filter(|&e| e <= data.len())
        .ok_or(WireError::Truncated)?;
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&data[*pos..end]);
    *pos = end;
    Ok(u64::from_be_bytes(buf))
}
