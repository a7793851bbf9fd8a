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

use std::fmt;
use std::path::PathBuf;

/// A single source line, kept alongside every item for diagnostics.
#[derive(Debug, Clone, PartialEq)]
pub struct Line {
    pub file: String,
    pub number: usize,
    pub contents: String,
}

impl Line {
    pub fn new(file: &str, number: usize, contents: &str) -> Self {
        Line {
            file: file.to_string(),
            number,
            contents: contents.to_string(),
        }
    }
}

impl fmt::Display for Line {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}: {}", self.file, self.number, self.contents.trim())
    }
}

/// A register operand. The parser stores the raw source token; the alias
/// pass may substitute a constant's value; the encoder validates either
/// form against the register table.
#[derive(Debug, Clone, PartialEq)]
pub enum Reg {
    Name(String),
    Num(i128),
}

impl Reg {
    pub fn name(token: &str) -> Self {
        Reg::Name(token.to_string())
    }
}

impl From<&str> for Reg {
    fn from(token: &str) -> Self {
        Reg::name(token)
    }
}

impl fmt::Display for Reg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reg::Name(name) => write!(f, "{}", name),
            Reg::Num(num) => write!(f, "{}", num),
        }
    }
}

/// An immediate expression, evaluated lazily against `(position, env)`.
///
/// `Hi`/`Lo` may wrap any of the other three forms but not each other.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Arithmetic(String),
    Position(String, Box<Expr>),
    Offset(String),
    Hi(Box<Expr>),
    Lo(Box<Expr>),
}

/// An instruction or data immediate: an unevaluated expression until the
/// `resolve_immediates` pass replaces it with a concrete integer.
#[derive(Debug, Clone, PartialEq)]
pub enum Imm {
    Expr(Expr),
    Value(i128),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequenceKind {
    Bytes,
    Shorts,
    Ints,
    Longs,
    LongLongs,
}

impl SequenceKind {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "bytes" => Some(SequenceKind::Bytes),
            "shorts" => Some(SequenceKind::Shorts),
            "ints" => Some(SequenceKind::Ints),
            "longs" => Some(SequenceKind::Longs),
            "longlongs" => Some(SequenceKind::LongLongs),
            _ => None,
        }
    }

    /// Width in bytes of one element.
    pub fn width(&self) -> usize {
        match self {
            SequenceKind::Bytes => 1,
            SequenceKind::Shorts => 2,
            SequenceKind::Ints => 4,
            SequenceKind::Longs => 4,
            SequenceKind::LongLongs => 8,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShorthandKind {
    Db,
    Dh,
    Dw,
    Dd,
}

impl ShorthandKind {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "db" => Some(ShorthandKind::Db),
            "dh" => Some(ShorthandKind::Dh),
            "dw" => Some(ShorthandKind::Dw),
            "dd" => Some(ShorthandKind::Dd),
            _ => None,
        }
    }

    pub fn width(&self) -> usize {
        match self {
            ShorthandKind::Db => 1,
            ShorthandKind::Dh => 2,
            ShorthandKind::Dw => 4,
            ShorthandKind::Dd => 8,
        }
    }

    /// The pack type codes for this width: `(unsigned, signed)`.
    pub fn codes(&self) -> (char, char) {
        match self {
            ShorthandKind::Db => ('B', 'b'),
            ShorthandKind::Dh => ('H', 'h'),
            ShorthandKind::Dw => ('I', 'i'),
            ShorthandKind::Dd => ('Q', 'q'),
        }
    }
}

/// A struct-style pack format: one endianness marker and one type code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PackFormat {
    pub big_endian: bool,
    pub code: char,
}

impl PackFormat {
    pub fn parse(fmt: &str) -> Option<Self> {
        let mut chars = fmt.chars();
        let endian = chars.next()?;
        let code = chars.next()?;
        if chars.next().is_some() {
            return None;
        }
        let big_endian = match endian {
            '<' => false,
            '>' => true,
            _ => return None,
        };
        if !matches!(code, 'b' | 'B' | 'h' | 'H' | 'i' | 'I' | 'l' | 'L' | 'q' | 'Q' | 'f' | 'd') {
            return None;
        }
        Some(PackFormat { big_endian, code })
    }

    pub fn size(&self) -> usize {
        match self.code {
            'b' | 'B' => 1,
            'h' | 'H' => 2,
            'i' | 'I' | 'l' | 'L' | 'f' => 4,
            _ => 8,
        }
    }
}

impl fmt::Display for PackFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", if self.big_endian { '>' } else { '<' }, self.code)
    }
}

/// One assembly "thing": a label, a directive's payload, or an instruction
/// of some encoding family. Items are produced by the parser, rewritten by
/// the resolver passes, and all end their life as `Blob`s.
#[derive(Debug, Clone, PartialEq)]
pub enum Item {
    Label { line: Line, name: String },
    Constant { line: Line, name: String, imm: Expr },
    Align { line: Line, alignment: i128 },
    Blob { line: Line, data: Vec<u8> },
    String { line: Line, value: String },
    Sequence { line: Line, kind: SequenceKind, values: Vec<String> },
    Pack { line: Line, fmt: PackFormat, imm: Imm },
    ShorthandPack { line: Line, kind: ShorthandKind, imm: Imm },
    IncludeBytes { line: Line, path: PathBuf, size: usize },

    // base instruction families
    RType { line: Line, name: String, rd: Reg, rs1: Reg, rs2: Reg },
    IType { line: Line, name: String, rd: Reg, rs1: Reg, imm: Imm, auipc_paired: bool },
    IEType { line: Line, name: String },
    SType { line: Line, name: String, rs1: Reg, rs2: Reg, imm: Imm },
    BType { line: Line, name: String, rs1: Reg, rs2: Reg, imm: Imm },
    UType { line: Line, name: String, rd: Reg, imm: Imm },
    JType { line: Line, name: String, rd: Reg, imm: Imm },
    Fence { line: Line, name: String, succ: u32, pred: u32 },
    AType { line: Line, name: String, rd: Reg, rs1: Reg, rs2: Reg, aq: u32, rl: u32 },
    ALType { line: Line, name: String, rd: Reg, rs1: Reg, aq: u32, rl: u32 },

    // compressed instruction families
    CrType { line: Line, name: String, rd_rs1: Reg, rs2: Reg },
    CrjType { line: Line, name: String, rs1: Reg },
    CreType { line: Line, name: String },
    CiType { line: Line, name: String, rd_rs1: Reg, imm: Imm },
    CiaType { line: Line, name: String, imm: Imm },
    CinType { line: Line, name: String },
    CiuType { line: Line, name: String, rd_rs1: Reg, imm: Imm },
    CilType { line: Line, name: String, rd: Reg, imm: Imm },
    CssType { line: Line, name: String, rs2: Reg, imm: Imm },
    CiwType { line: Line, name: String, rd: Reg, imm: Imm },
    ClType { line: Line, name: String, rd: Reg, rs1: Reg, imm: Imm },
    CsType { line: Line, name: String, rs1: Reg, rs2: Reg, imm: Imm },
    CaType { line: Line, name: String, rd_rs1: Reg, rs2: Reg },
    CbType { line: Line, name: String, rs1: Reg, imm: Imm },
    CbiType { line: Line, name: String, rd_rs1: Reg, imm: Imm },
    CjType { line: Line, name: String, imm: Imm },

    Pseudo { line: Line, name: String, args: Vec<String> },
}

impl Item {
    pub fn line(&self) -> &Line {
        match self {
            Item::Label { line, .. }
            | Item::Constant { line, .. }
            | Item::Align { line, .. }
            | Item::Blob { line, .. }
            | Item::String { line, .. }
            | Item::Sequence { line, .. }
            | Item::Pack { line, .. }
            | Item::ShorthandPack { line, .. }
            | Item::IncludeBytes { line, .. }
            | Item::RType { line, .. }
            | Item::IType { line, .. }
            | Item::IEType { line, .. }
            | Item::SType { line, .. }
            | Item::BType { line, .. }
            | Item::UType { line, .. }
            | Item::JType { line, .. }
            | Item::Fence { line, .. }
            | Item::AType { line, .. }
            | Item::ALType { line, .. }
            | Item::CrType { line, .. }
            | Item::CrjType { line, .. }
            | Item::CreType { line, .. }
            | Item::CiType { line, .. }
            | Item::CiaType { line, .. }
            | Item::CinType { line, .. }
            | Item::CiuType { line, .. }
            | Item::CilType { line, .. }
            | Item::CssType { line, .. }
            | Item::CiwType { line, .. }
            | Item::ClType { line, .. }
            | Item::CsType { line, .. }
            | Item::CaType { line, .. }
            | Item::CbType { line, .. }
            | Item::CbiType { line, .. }
            | Item::CjType { line, .. }
            | Item::Pseudo { line, .. } => line,
        }
    }

    /// Byte footprint of this item during layout. Aligns report their
    /// worst case (the full alignment) and pseudo-instructions their
    /// worst-case expansion; both are shrunk by later passes.
    pub fn size(&self) -> i128 {
        match self {
            Item::Label { .. } | Item::Constant { .. } => 0,
            Item::Align { alignment, .. } => *alignment,
            Item::Blob { data, .. } => data.len() as i128,
            Item::String { value, .. } => value.len() as i128,
            Item::Sequence { kind, values, .. } => (kind.width() * values.len()) as i128,
            Item::Pack { fmt, .. } => fmt.size() as i128,
            Item::ShorthandPack { kind, .. } => kind.width() as i128,
            Item::IncludeBytes { size, .. } => *size as i128,
            Item::RType { .. }
            | Item::IType { .. }
            | Item::IEType { .. }
            | Item::SType { .. }
            | Item::BType { .. }
            | Item::UType { .. }
            | Item::JType { .. }
            | Item::Fence { .. }
            | Item::AType { .. }
            | Item::ALType { .. } => 4,
            Item::CrType { .. }
            | Item::CrjType { .. }
            | Item::CreType { .. }
            | Item::CiType { .. }
            | Item::CiaType { .. }
            | Item::CinType { .. }
            | Item::CiuType { .. }
            | Item::CilType { .. }
            | Item::CssType { .. }
            | Item::CiwType { .. }
            | Item::ClType { .. }
            | Item::CsType { .. }
            | Item::CaType { .. }
            | Item::CbType { .. }
            | Item::CbiType { .. }
            | Item::CjType { .. } => 2,
            // some pseudo-instructions expand into two regular ones
            Item::Pseudo { name, .. } => match name.as_str() {
                "li" | "call" | "tail" => 8,
                _ => 4,
            },
        }
    }
}
