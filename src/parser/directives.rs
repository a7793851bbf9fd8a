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

use std::path::PathBuf;

use super::operands::{parse_immediate, parse_integer_token};
use crate::ast::{Imm, Item, Line, PackFormat, SequenceKind, ShorthandKind};
use crate::errors::AssemblyError;

pub fn build_align(tokens: &[String], line: &Line) -> Result<Item, AssemblyError> {
    if tokens.len() != 2 {
        return Err(AssemblyError::Syntax {
            line: line.clone(),
            reason: "align requires exactly 1 argument".to_string(),
        });
    }
    let alignment = parse_integer_token(&tokens[1], line, "alignment")?;
    if alignment < 1 {
        return Err(AssemblyError::Range {
            line: line.clone(),
            reason: format!("alignment must be a positive integer: {}", alignment),
        });
    }
    Ok(Item::Align { line: line.clone(), alignment })
}

pub fn build_pack(tokens: &[String], line: &Line) -> Result<Item, AssemblyError> {
    if tokens.len() < 3 {
        return Err(AssemblyError::Syntax {
            line: line.clone(),
            reason: "pack requires a format and a value".to_string(),
        });
    }
    let fmt = PackFormat::parse(&tokens[1]).ok_or_else(|| AssemblyError::Syntax {
        line: line.clone(),
        reason: format!("invalid pack format: {}", tokens[1]),
    })?;
    let imm = parse_immediate(&tokens[2..], line)?;
    Ok(Item::Pack { line: line.clone(), fmt, imm: Imm::Expr(imm) })
}

pub fn build_shorthand_pack(
    kind: ShorthandKind,
    tokens: &[String],
    line: &Line,
) -> Result<Item, AssemblyError> {
    if tokens.len() < 2 {
        return Err(AssemblyError::Syntax {
            line: line.clone(),
            reason: format!("{} requires a value", tokens[0]),
        });
    }
    let imm = parse_immediate(&tokens[1..], line)?;
    Ok(Item::ShorthandPack { line: line.clone(), kind, imm: Imm::Expr(imm) })
}

pub fn build_sequence(
    kind: SequenceKind,
    tokens: &[String],
    line: &Line,
) -> Result<Item, AssemblyError> {
    Ok(Item::Sequence {
        line: line.clone(),
        kind,
        values: tokens[1..].to_vec(),
    })
}

pub fn build_string(tokens: &[String], line: &Line) -> Result<Item, AssemblyError> {
    if tokens.len() != 2 {
        return Err(AssemblyError::Syntax {
            line: line.clone(),
            reason: "string requires a payload".to_string(),
        });
    }
    Ok(Item::String { line: line.clone(), value: tokens[1].clone() })
}

/// The reader has already resolved the path and stamped the byte size as
/// a trailing token.
pub fn build_include_bytes(tokens: &[String], line: &Line) -> Result<Item, AssemblyError> {
    if tokens.len() != 3 {
        return Err(AssemblyError::Include {
            line: line.clone(),
            reason: "include_bytes requires exactly one file path".to_string(),
        });
    }
    let size = parse_integer_token(&tokens[2], line, "include_bytes size")?;
    Ok(Item::IncludeBytes {
        line: line.clone(),
        path: PathBuf::from(&tokens[1]),
        size: size as usize,
    })
}
