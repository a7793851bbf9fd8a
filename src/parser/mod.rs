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

mod directives;
mod instructions;
mod operands;

pub use operands::{branch_target, is_int, parse_immediate};

use crate::ast::{Item, SequenceKind, ShorthandKind};
use crate::errors::AssemblyError;
use crate::lexer::LineTokens;

/// Map every tokenized line to a typed item. Lines whose lexing produced
/// no tokens (blank after comment stripping) are dropped.
pub fn parse_items(line_tokens: &[LineTokens]) -> Result<Vec<Item>, AssemblyError> {
    line_tokens
        .iter()
        .filter(|lt| !lt.tokens.is_empty())
        .map(parse_item)
        .collect()
}

/// Dispatch on the shape of the line: label, constant, directive, or
/// instruction mnemonic.
pub fn parse_item(line_tokens: &LineTokens) -> Result<Item, AssemblyError> {
    let line = &line_tokens.line;
    let tokens = &line_tokens.tokens;
    let head = tokens[0].to_lowercase();

    // labels
    if tokens.len() == 1 && tokens[0].ends_with(':') {
        let name = tokens[0].trim_end_matches(':');
        if name.is_empty() {
            return Err(AssemblyError::Syntax {
                line: line.clone(),
                reason: "empty label name".to_string(),
            });
        }
        return Ok(Item::Label { line: line.clone(), name: name.to_string() });
    }

    // constants
    if tokens.len() >= 3 && tokens[1] == "=" {
        let imm = operands::parse_immediate(&tokens[2..], line)?;
        return Ok(Item::Constant {
            line: line.clone(),
            name: tokens[0].clone(),
            imm,
        });
    }

    // deliberate assembly failure; raised right here at parse time
    if head == "error" {
        let reason = if tokens.len() > 1 {
            tokens[1].clone()
        } else {
            "error directive".to_string()
        };
        return Err(AssemblyError::Directive { line: line.clone(), reason });
    }

    if head == "include_bytes" {
        return directives::build_include_bytes(tokens, line);
    }
    if head == "string" {
        return directives::build_string(tokens, line);
    }
    if head == "align" {
        return directives::build_align(tokens, line);
    }
    if head == "pack" {
        return directives::build_pack(tokens, line);
    }
    if let Some(kind) = ShorthandKind::from_name(&head) {
        return directives::build_shorthand_pack(kind, tokens, line);
    }
    if let Some(kind) = SequenceKind::from_name(&head) {
        return directives::build_sequence(kind, tokens, line);
    }

    if let Some(item) = instructions::build_instruction(tokens, line)? {
        return Ok(item);
    }

    Err(AssemblyError::Syntax {
        line: line.clone(),
        reason: format!("unknown mnemonic or directive: {}", tokens[0]),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Expr, Imm, Line, Reg};
    use crate::lexer::lex_tokens;

    fn parse(contents: &str) -> Result<Item, AssemblyError> {
        let line = Line::new("<string>", 1, contents);
        parse_item(&lex_tokens(line).unwrap())
    }

    #[test]
    fn test_parse_label() {
        let item = parse("main:").unwrap();
        assert!(matches!(item, Item::Label { name, .. } if name == "main"));
    }

    #[test]
    fn test_parse_constant() {
        let item = parse("FOO = 40 + 2").unwrap();
        match item {
            Item::Constant { name, imm, .. } => {
                assert_eq!(name, "FOO");
                assert_eq!(imm, Expr::Arithmetic("40 + 2".to_string()));
            }
            other => panic!("expected constant, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_addi() {
        let item = parse("addi t0 zero 1").unwrap();
        match item {
            Item::IType { name, rd, rs1, imm, .. } => {
                assert_eq!(name, "addi");
                assert_eq!(rd, Reg::from("t0"));
                assert_eq!(rs1, Reg::from("zero"));
                assert_eq!(imm, Imm::Expr(Expr::Arithmetic("1".to_string())));
            }
            other => panic!("expected i-type, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_base_offset_syntax() {
        let direct = parse("lw x0, x1, 0").unwrap();
        let offset = parse("lw x0, 0(x1)").unwrap();
        assert_eq!(direct, offset);

        let direct = parse("sb x0, x1, 0").unwrap();
        let offset = parse("sb x1, 0(x0)").unwrap();
        assert_eq!(direct, offset);
    }

    #[test]
    fn test_parse_branch_wraps_labels_in_offset() {
        let item = parse("beq t0 zero main").unwrap();
        match item {
            Item::BType { imm, .. } => {
                assert_eq!(imm, Imm::Expr(Expr::Offset("main".to_string())));
            }
            other => panic!("expected b-type, got {:?}", other),
        }

        // integer targets stay arithmetic
        let item = parse("beq t0 zero 8").unwrap();
        match item {
            Item::BType { imm, .. } => {
                assert_eq!(imm, Imm::Expr(Expr::Arithmetic("8".to_string())));
            }
            other => panic!("expected b-type, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_jal_short_form_is_pseudo() {
        let item = parse("jal somewhere").unwrap();
        assert!(matches!(item, Item::Pseudo { name, .. } if name == "jal"));

        let item = parse("jal x1 somewhere").unwrap();
        assert!(matches!(item, Item::JType { .. }));
    }

    #[test]
    fn test_parse_atomic_ordering_bits() {
        let item = parse("amoswap.w a0 a1 a2 1 1").unwrap();
        match item {
            Item::AType { aq, rl, .. } => {
                assert_eq!(aq, 1);
                assert_eq!(rl, 1);
            }
            other => panic!("expected a-type, got {:?}", other),
        }

        let item = parse("lr.w a0 a1").unwrap();
        assert!(matches!(item, Item::ALType { .. }));
    }

    #[test]
    fn test_parse_error_directive_raises() {
        let err = parse("error not today").unwrap_err();
        match err {
            AssemblyError::Directive { reason, .. } => assert_eq!(reason, "not today"),
            other => panic!("expected directive error, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_unknown_mnemonic() {
        assert!(matches!(parse("frobnicate t0"), Err(AssemblyError::Syntax { .. })));
    }

    #[test]
    fn test_parse_compressed_forms() {
        assert!(matches!(parse("c.nop").unwrap(), Item::CinType { .. }));
        assert!(matches!(parse("c.ebreak").unwrap(), Item::CreType { .. }));
        assert!(matches!(parse("c.addi x1 1").unwrap(), Item::CiType { .. }));
        assert!(matches!(parse("c.addi16sp 16").unwrap(), Item::CiaType { .. }));
        assert!(matches!(parse("c.lwsp x1 0").unwrap(), Item::CilType { .. }));
        assert!(matches!(parse("c.jr x1").unwrap(), Item::CrjType { .. }));
        assert_eq!(parse("c.lw x8, x9, 0").unwrap(), parse("c.lw x8, 0(x9)").unwrap());
        assert_eq!(parse("c.sw x8, x9, 0").unwrap(), parse("c.sw x9, 0(x8)").unwrap());
    }
}
