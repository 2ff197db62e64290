//! Source map v3 `mappings` codec (base64 VLQ deltas).
//!
//! Each generated line is a `;`-separated group of `,`-separated segments.
//! A segment holds up to five VLQ fields: generated column (relative to the
//! previous segment on the same line), source index, original line,
//! original column and name index (all relative to the previous segment
//! anywhere in the string). Lines are 1-based in memory and 0-based on the
//! wire.

use std::collections::HashMap;

use shade_model::{MappingEntry, SourcePosition};

use crate::error::{CodecError, MapError, Result, TablePhase};
use crate::table::PositionTable;

const BASE64: &[u8; 64] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";
const VLQ_SHIFT: u32 = 5;
const VLQ_MASK: i64 = 0b1_1111;
const VLQ_CONTINUATION: i64 = 0b10_0000;

/// The encoded form of a table: the `mappings` string plus the `names` it
/// indexes into.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EncodedMappings {
    pub mappings: String,
    pub names: Vec<String>,
}

/// Encodes a sealed table.
pub fn encode(table: &PositionTable) -> Result<EncodedMappings> {
    if !table.is_sealed() {
        return Err(MapError::InvalidState {
            operation: "encode",
            required: TablePhase::Sealed,
            actual: table.phase(),
        });
    }

    let mut names: Vec<String> = Vec::new();
    let mut name_index: HashMap<&str, i64> = HashMap::new();
    let mut out = String::new();

    let mut line = 1u32;
    let mut prev_column = 0i64;
    let mut prev_source = 0i64;
    let mut prev_orig_line = 0i64;
    let mut prev_orig_column = 0i64;
    let mut prev_name = 0i64;
    let mut first_on_line = true;

    for entry in table {
        if entry.generated.line == 0 || entry.original.line == 0 {
            return Err(CodecError::ZeroLine.into());
        }
        while line < entry.generated.line {
            out.push(';');
            line += 1;
            prev_column = 0;
            first_on_line = true;
        }
        if !first_on_line {
            out.push(',');
        }
        first_on_line = false;

        let column = i64::from(entry.generated.column);
        let source = i64::from(entry.original.file);
        let orig_line = i64::from(entry.original.line) - 1;
        let orig_column = i64::from(entry.original.column);

        encode_vlq(&mut out, column - prev_column);
        encode_vlq(&mut out, source - prev_source);
        encode_vlq(&mut out, orig_line - prev_orig_line);
        encode_vlq(&mut out, orig_column - prev_orig_column);
        prev_column = column;
        prev_source = source;
        prev_orig_line = orig_line;
        prev_orig_column = orig_column;

        if let Some(name) = entry.name.as_deref() {
            let index = match name_index.get(name) {
                Some(index) => *index,
                None => {
                    let index = names.len() as i64;
                    names.push(name.to_string());
                    name_index.insert(name, index);
                    index
                }
            };
            encode_vlq(&mut out, index - prev_name);
            prev_name = index;
        }
    }

    Ok(EncodedMappings {
        mappings: out,
        names,
    })
}

/// Decodes a `mappings` string into a sealed table.
///
/// One-field segments (generated column only, no origin) carry no mapping
/// and are skipped.
pub fn decode(mappings: &str, names: &[String]) -> Result<PositionTable> {
    let mut entries = Vec::new();

    let mut prev_source = 0i64;
    let mut prev_orig_line = 0i64;
    let mut prev_orig_column = 0i64;
    let mut prev_name = 0i64;
    let mut offset = 0usize;

    for (line_index, group) in mappings.split(';').enumerate() {
        let line = u32::try_from(line_index + 1).map_err(|_| CodecError::Overflow { offset })?;
        let mut prev_column = 0i64;

        for segment in group.split(',') {
            let start = offset;
            offset += segment.len() + 1;
            if segment.is_empty() {
                continue;
            }
            let fields = decode_segment(segment, start)?;

            match fields.len() {
                1 => {
                    prev_column += fields[0];
                    continue;
                }
                4 | 5 => {}
                count => {
                    return Err(CodecError::InvalidSegment {
                        line,
                        fields: count,
                    }
                    .into());
                }
            }

            prev_column += fields[0];
            prev_source += fields[1];
            prev_orig_line += fields[2];
            prev_orig_column += fields[3];

            let name = if let Some(delta) = fields.get(4) {
                prev_name += delta;
                let name = usize::try_from(prev_name)
                    .ok()
                    .and_then(|index| names.get(index))
                    .ok_or(CodecError::NameOutOfRange {
                        index: prev_name,
                        count: names.len(),
                    })?;
                Some(name.clone())
            } else {
                None
            };

            let generated =
                SourcePosition::generated(line, non_negative(prev_column, line, "generated column")?);
            let original = SourcePosition::new(
                non_negative(prev_source, line, "source index")?,
                non_negative(prev_orig_line, line, "original line")? + 1,
                non_negative(prev_orig_column, line, "original column")?,
            );
            entries.push(MappingEntry {
                generated,
                original,
                name,
            });
        }
    }

    Ok(PositionTable::from_entries(entries))
}

fn non_negative(value: i64, line: u32, field: &'static str) -> std::result::Result<u32, CodecError> {
    u32::try_from(value).map_err(|_| CodecError::NegativeValue { line, field })
}

fn decode_segment(segment: &str, start: usize) -> std::result::Result<Vec<i64>, CodecError> {
    let mut values = Vec::with_capacity(5);
    let mut accumulator = 0i64;
    let mut shift = 0u32;
    let mut pending = false;

    for (index, byte) in segment.bytes().enumerate() {
        let offset = start + index;
        let digit = base64_value(byte).ok_or(CodecError::InvalidDigit {
            digit: char::from(byte),
            offset,
        })?;
        if shift > 60 {
            return Err(CodecError::Overflow { offset });
        }
        accumulator |= (digit & VLQ_MASK) << shift;
        if digit & VLQ_CONTINUATION != 0 {
            shift += VLQ_SHIFT;
            pending = true;
        } else {
            let magnitude = accumulator >> 1;
            values.push(if accumulator & 1 == 1 {
                -magnitude
            } else {
                magnitude
            });
            accumulator = 0;
            shift = 0;
            pending = false;
        }
    }

    if pending {
        return Err(CodecError::UnterminatedValue {
            offset: start + segment.len(),
        });
    }
    Ok(values)
}

fn encode_vlq(out: &mut String, value: i64) {
    let mut vlq = if value < 0 {
        ((-value) << 1) | 1
    } else {
        value << 1
    };
    loop {
        let mut digit = vlq & VLQ_MASK;
        vlq >>= VLQ_SHIFT;
        if vlq > 0 {
            digit |= VLQ_CONTINUATION;
        }
        out.push(char::from(BASE64[digit as usize]));
        if vlq == 0 {
            break;
        }
    }
}

fn base64_value(byte: u8) -> Option<i64> {
    let value = match byte {
        b'A'..=b'Z' => byte - b'A',
        b'a'..=b'z' => byte - b'a' + 26,
        b'0'..=b'9' => byte - b'0' + 52,
        b'+' => 62,
        b'/' => 63,
        _ => return None,
    };
    Some(i64::from(value))
}
