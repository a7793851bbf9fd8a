/*
Copyright 2025 Connor Nolan

Licensed under the Apache License, Version 2.0 (the "License");
you may not use this file except in compliance with the License.
You may obtain a copy of the License at

    http://www.apache.org/licenses/LICENSE-2.0

Unless required by applicable law or agreed to in writing, software
distributed under the License is distributed on an "AS IS" BASIS,
WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
See the License for the specific language governing permissions and
limitations under the License.
*/

//! The directive expanders: strings, numeric sequences, and packed values
//! all end their lives as little blobs of bytes.

use crate::ast::{Imm, Item, Line, PackFormat, SequenceKind};
use crate::errors::{AssemblyError, EncodeError};
use crate::expr::parse_int_literal;

/// Encode string payloads as their UTF-8 bytes.
pub fn resolve_strings(items: Vec<Item>) -> Vec<Item> {
    items
        .into_iter()
        .map(|item| match item {
            Item::String { line, value } => Item::Blob { line, data: value.into_bytes() },
            other => other,
        })
        .collect()
}

/// Encode numeric literal sequences little-endian at the width implied by
/// the sequence kind. Negative values take the signed interpretation of
/// the same width.
pub fn resolve_sequences(items: Vec<Item>) -> Result<Vec<Item>, AssemblyError> {
    let mut new_items = Vec::with_capacity(items.len());
    for item in items {
        let Item::Sequence { line, kind, values } = item else {
            new_items.push(item);
            continue;
        };
        let mut data = Vec::with_capacity(values.len() * kind.width());
        for token in &values {
            data.extend(encode_sequence_value(kind, token, &line)?);
        }
        new_items.push(Item::Blob { line, data });
    }
    Ok(new_items)
}

fn encode_sequence_value(
    kind: SequenceKind,
    token: &str,
    line: &Line,
) -> Result<Vec<u8>, AssemblyError> {
    let value = parse_int_literal(token).ok_or_else(|| AssemblyError::Syntax {
        line: line.clone(),
        reason: format!("sequence values must be integer literals: {}", token),
    })?;
    let out_of_range = || AssemblyError::Range {
        line: line.clone(),
        reason: format!("sequence value out of range: {}", token),
    };
    let bytes = match kind {
        SequenceKind::Bytes => {
            if !(-0x80..=0xff).contains(&value) {
                return Err(out_of_range());
            }
            vec![value as u8]
        }
        SequenceKind::Shorts => {
            if !(-0x8000..=0xffff).contains(&value) {
                return Err(out_of_range());
            }
            (value as u16).to_le_bytes().to_vec()
        }
        SequenceKind::Ints | SequenceKind::Longs => {
            if !(-0x8000_0000..=0xffff_ffff).contains(&value) {
                return Err(out_of_range());
            }
            (value as u32).to_le_bytes().to_vec()
        }
        SequenceKind::LongLongs => {
            if !((i64::MIN as i128)..=(u64::MAX as i128)).contains(&value) {
                return Err(out_of_range());
            }
            (value as u64).to_le_bytes().to_vec()
        }
    };
    Ok(bytes)
}

/// Rewrite `db`/`dh`/`dw`/`dd` into explicit packs, picking the signed
/// type code when the resolved value is negative.
pub fn transform_shorthand_packs(items: Vec<Item>) -> Result<Vec<Item>, AssemblyError> {
    let mut new_items = Vec::with_capacity(items.len());
    for item in items {
        let Item::ShorthandPack { line, kind, imm } = item else {
            new_items.push(item);
            continue;
        };
        let Imm::Value(value) = imm else {
            return Err(AssemblyError::Internal {
                reason: "shorthand pack reached expansion unresolved".to_string(),
            });
        };
        let (unsigned, signed) = kind.codes();
        let fmt = PackFormat {
            big_endian: false,
            code: if value < 0 { signed } else { unsigned },
        };
        new_items.push(Item::Pack { line, fmt, imm: Imm::Value(value) });
    }
    Ok(new_items)
}

/// Encode every pack into its bytes.
pub fn resolve_packs(items: Vec<Item>) -> Result<Vec<Item>, AssemblyError> {
    let mut new_items = Vec::with_capacity(items.len());
    for item in items {
        let Item::Pack { line, fmt, imm } = item else {
            new_items.push(item);
            continue;
        };
        let Imm::Value(value) = imm else {
            return Err(AssemblyError::Internal {
                reason: "pack reached encoding unresolved".to_string(),
            });
        };
        let data = encode_pack(&fmt, value).map_err(|e| e.attach(&line))?;
        new_items.push(Item::Blob { line, data });
    }
    Ok(new_items)
}

pub fn encode_pack(fmt: &PackFormat, value: i128) -> Result<Vec<u8>, EncodeError> {
    let check = |lo: i128, hi: i128| {
        if (lo..=hi).contains(&value) {
            Ok(())
        } else {
            Err(EncodeError::OutOfRange(format!(
                "pack value out of range for format {}: {}",
                fmt, value
            )))
        }
    };
    let bytes: Vec<u8> = match fmt.code {
        'b' => {
            check(i8::MIN as i128, i8::MAX as i128)?;
            vec![value as u8]
        }
        'B' => {
            check(0, u8::MAX as i128)?;
            vec![value as u8]
        }
        'h' => {
            check(i16::MIN as i128, i16::MAX as i128)?;
            pick(fmt, (value as u16).to_le_bytes(), (value as u16).to_be_bytes())
        }
        'H' => {
            check(0, u16::MAX as i128)?;
            pick(fmt, (value as u16).to_le_bytes(), (value as u16).to_be_bytes())
        }
        'i' | 'l' => {
            check(i32::MIN as i128, i32::MAX as i128)?;
            pick(fmt, (value as u32).to_le_bytes(), (value as u32).to_be_bytes())
        }
        'I' | 'L' => {
            check(0, u32::MAX as i128)?;
            pick(fmt, (value as u32).to_le_bytes(), (value as u32).to_be_bytes())
        }
        'q' => {
            check(i64::MIN as i128, i64::MAX as i128)?;
            pick(fmt, (value as u64).to_le_bytes(), (value as u64).to_be_bytes())
        }
        'Q' => {
            check(0, u64::MAX as i128)?;
            pick(fmt, (value as u64).to_le_bytes(), (value as u64).to_be_bytes())
        }
        'f' => {
            let value = value as f32;
            pick(fmt, value.to_le_bytes(), value.to_be_bytes())
        }
        'd' => {
            let value = value as f64;
            pick(fmt, value.to_le_bytes(), value.to_be_bytes())
        }
        _ => {
            return Err(EncodeError::Internal(format!(
                "unhandled pack format: {}",
                fmt
            )));
        }
    };
    Ok(bytes)
}

fn pick<const N: usize>(fmt: &PackFormat, le: [u8; N], be: [u8; N]) -> Vec<u8> {
    if fmt.big_endian {
        be.to_vec()
    } else {
        le.to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_pack_widths() {
        let fmt = |code| PackFormat { big_endian: false, code };
        assert_eq!(encode_pack(&fmt('B'), 42).unwrap(), vec![0x2a]);
        assert_eq!(encode_pack(&fmt('b'), -1).unwrap(), vec![0xff]);
        assert_eq!(encode_pack(&fmt('H'), 0x1234).unwrap(), vec![0x34, 0x12]);
        assert_eq!(
            encode_pack(&fmt('I'), 0x2000_0000).unwrap(),
            vec![0x00, 0x00, 0x00, 0x20]
        );
        assert_eq!(
            encode_pack(&fmt('Q'), 0xffff_ffff_ffff_ffff).unwrap(),
            vec![0xff; 8]
        );
    }

    #[test]
    fn test_encode_pack_big_endian() {
        let fmt = PackFormat { big_endian: true, code: 'H' };
        assert_eq!(encode_pack(&fmt, 0x1234).unwrap(), vec![0x12, 0x34]);
    }

    #[test]
    fn test_encode_pack_range() {
        let fmt = PackFormat { big_endian: false, code: 'B' };
        assert!(matches!(encode_pack(&fmt, 256), Err(EncodeError::OutOfRange(_))));
        assert!(matches!(encode_pack(&fmt, -1), Err(EncodeError::OutOfRange(_))));
    }

    #[test]
    fn test_sequence_sign_wraps() {
        let line = Line::new("<string>", 1, "bytes -1 0xff");
        assert_eq!(
            encode_sequence_value(SequenceKind::Bytes, "-1", &line).unwrap(),
            encode_sequence_value(SequenceKind::Bytes, "0xff", &line).unwrap()
        );
        assert!(encode_sequence_value(SequenceKind::Bytes, "256", &line).is_err());
        assert!(encode_sequence_value(SequenceKind::Bytes, "-129", &line).is_err());
    }
}
