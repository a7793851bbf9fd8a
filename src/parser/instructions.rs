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

use super::operands::{branch_target, parse_immediate, parse_integer_token};
use crate::assembler::encoder::base;
use crate::ast::{Imm, Item, Line, Reg};
use crate::errors::AssemblyError;

pub fn is_pseudo(name: &str) -> bool {
    matches!(
        name,
        "nop" | "li"
            | "mv"
            | "not"
            | "neg"
            | "seqz"
            | "snez"
            | "sltz"
            | "sgtz"
            | "beqz"
            | "bnez"
            | "blez"
            | "bgez"
            | "bltz"
            | "bgtz"
            | "bgt"
            | "ble"
            | "bgtu"
            | "bleu"
            | "j"
            | "jal"
            | "jr"
            | "jalr"
            | "ret"
            | "call"
            | "tail"
            | "fence"
    )
}

// alternate offset syntax applies to insts w/ base reg + offset imm
fn is_base_offset(name: &str) -> bool {
    matches!(
        name,
        "jalr" | "lb" | "lh" | "lw" | "lbu" | "lhu" | "sb" | "sh" | "sw"
    )
}

fn arity(line: &Line, reason: &str) -> AssemblyError {
    AssemblyError::Syntax {
        line: line.clone(),
        reason: reason.to_string(),
    }
}

fn ordering_bit(token: &str, line: &Line, what: &str) -> Result<u32, AssemblyError> {
    let value = parse_integer_token(token, line, what)?;
    if !(0..=1).contains(&value) {
        return Err(AssemblyError::Range {
            line: line.clone(),
            reason: format!("{} must be either 0 or 1: {}", what, value),
        });
    }
    Ok(value as u32)
}

fn fence_nibble(token: &str, line: &Line, what: &str) -> Result<u32, AssemblyError> {
    let value = parse_integer_token(token, line, what)?;
    if !(0..=0b1111).contains(&value) {
        return Err(AssemblyError::Range {
            line: line.clone(),
            reason: format!("{} must be a 4-bit value: {}", what, value),
        });
    }
    Ok(value as u32)
}

/// Build the typed item for any instruction mnemonic, or `None` when the
/// head token is not an instruction at all.
pub fn build_instruction(tokens: &[String], line: &Line) -> Result<Option<Item>, AssemblyError> {
    let head = tokens[0].to_lowercase();

    // r-type instructions (shift-immediates included; the shamt rides in
    // the rs2 field)
    if base::r_params(&head).is_some() {
        if tokens.len() != 4 {
            return Err(arity(line, "r-type instructions require exactly 3 args"));
        }
        return Ok(Some(Item::RType {
            line: line.clone(),
            name: head,
            rd: Reg::name(&tokens[1]),
            rs1: Reg::name(&tokens[2]),
            rs2: Reg::name(&tokens[3]),
        }));
    }

    // i-type instructions
    if base::i_params(&head).is_some() {
        // a lone register operand makes jalr its pseudo-instruction form
        if tokens.len() == 2 {
            return Ok(Some(Item::Pseudo {
                line: line.clone(),
                name: head,
                args: tokens[1..].to_vec(),
            }));
        }
        let (rd, rs1, imm) = if is_base_offset(&head)
            && tokens.len() == 6
            && tokens[3] == "("
            && tokens[5] == ")"
        {
            let imm = parse_immediate(&tokens[2..3], line)?;
            (Reg::name(&tokens[1]), Reg::name(&tokens[4]), imm)
        } else {
            if tokens.len() < 4 {
                return Err(arity(line, "i-type instructions require exactly 3 args"));
            }
            let imm = parse_immediate(&tokens[3..], line)?;
            (Reg::name(&tokens[1]), Reg::name(&tokens[2]), imm)
        };
        return Ok(Some(Item::IType {
            line: line.clone(),
            name: head,
            rd,
            rs1,
            imm: Imm::Expr(imm),
            auipc_paired: false,
        }));
    }

    // ecall / ebreak take no operands
    if base::ie_names(&head) {
        if tokens.len() != 1 {
            return Err(arity(line, "ecall/ebreak take no args"));
        }
        return Ok(Some(Item::IEType { line: line.clone(), name: head }));
    }

    // s-type instructions (all accept the base-offset syntax)
    if base::s_params(&head).is_some() {
        let (rs1, rs2, imm) = if tokens.len() == 6 && tokens[3] == "(" && tokens[5] == ")" {
            let imm = parse_immediate(&tokens[2..3], line)?;
            (Reg::name(&tokens[4]), Reg::name(&tokens[1]), imm)
        } else {
            if tokens.len() < 4 {
                return Err(arity(line, "s-type instructions require exactly 3 args"));
            }
            let imm = parse_immediate(&tokens[3..], line)?;
            (Reg::name(&tokens[1]), Reg::name(&tokens[2]), imm)
        };
        return Ok(Some(Item::SType {
            line: line.clone(),
            name: head,
            rs1,
            rs2,
            imm: Imm::Expr(imm),
        }));
    }

    // b-type instructions
    if base::b_params(&head).is_some() {
        if tokens.len() != 4 {
            return Err(arity(line, "b-type instructions require exactly 3 args"));
        }
        let imm = branch_target(&tokens[3]);
        return Ok(Some(Item::BType {
            line: line.clone(),
            name: head,
            rs1: Reg::name(&tokens[1]),
            rs2: Reg::name(&tokens[2]),
            imm: Imm::Expr(imm),
        }));
    }

    // u-type instructions
    if base::u_params(&head).is_some() {
        if tokens.len() < 3 {
            return Err(arity(line, "u-type instructions require exactly 2 args"));
        }
        let imm = parse_immediate(&tokens[2..], line)?;
        return Ok(Some(Item::UType {
            line: line.clone(),
            name: head,
            rd: Reg::name(&tokens[1]),
            imm: Imm::Expr(imm),
        }));
    }

    // j-type instructions
    if base::j_params(&head).is_some() {
        // a lone target makes jal its pseudo-instruction form
        if tokens.len() == 2 {
            return Ok(Some(Item::Pseudo {
                line: line.clone(),
                name: head,
                args: tokens[1..].to_vec(),
            }));
        }
        if tokens.len() != 3 {
            return Err(arity(line, "j-type instructions require 1 or 2 args"));
        }
        let imm = branch_target(&tokens[2]);
        return Ok(Some(Item::JType {
            line: line.clone(),
            name: head,
            rd: Reg::name(&tokens[1]),
            imm: Imm::Expr(imm),
        }));
    }

    // fence; with no args it is the pseudo form `fence 0b1111 0b1111`
    if head == "fence" {
        if tokens.len() == 1 {
            return Ok(Some(Item::Pseudo {
                line: line.clone(),
                name: head,
                args: Vec::new(),
            }));
        }
        if tokens.len() != 3 {
            return Err(arity(line, "fence instructions require 0 or 2 args"));
        }
        let succ = fence_nibble(&tokens[1], line, "fence successor")?;
        let pred = fence_nibble(&tokens[2], line, "fence predecessor")?;
        return Ok(Some(Item::Fence { line: line.clone(), name: head, succ, pred }));
    }

    // atomics; lr.w has an implicit rs2 and its own arity
    if base::a_params(&head).is_some() {
        if head == "lr.w" {
            let (aq, rl) = match tokens.len() {
                3 => (0, 0),
                5 => (
                    ordering_bit(&tokens[3], line, "aq")?,
                    ordering_bit(&tokens[4], line, "rl")?,
                ),
                _ => return Err(arity(line, "invalid syntax for atomic instruction")),
            };
            return Ok(Some(Item::ALType {
                line: line.clone(),
                name: head,
                rd: Reg::name(&tokens[1]),
                rs1: Reg::name(&tokens[2]),
                aq,
                rl,
            }));
        }
        let (aq, rl) = match tokens.len() {
            4 => (0, 0),
            6 => (
                ordering_bit(&tokens[4], line, "aq")?,
                ordering_bit(&tokens[5], line, "rl")?,
            ),
            _ => return Err(arity(line, "invalid syntax for atomic instruction")),
        };
        return Ok(Some(Item::AType {
            line: line.clone(),
            name: head,
            rd: Reg::name(&tokens[1]),
            rs1: Reg::name(&tokens[2]),
            rs2: Reg::name(&tokens[3]),
            aq,
            rl,
        }));
    }

    if let Some(item) = build_compressed(&head, tokens, line)? {
        return Ok(Some(item));
    }

    if is_pseudo(&head) {
        return Ok(Some(Item::Pseudo {
            line: line.clone(),
            name: head,
            args: tokens[1..].to_vec(),
        }));
    }

    Ok(None)
}

fn build_compressed(
    head: &str,
    tokens: &[String],
    line: &Line,
) -> Result<Option<Item>, AssemblyError> {
    let line_c = || line.clone();
    let item = match head {
        "c.nop" => {
            if tokens.len() != 1 {
                return Err(arity(line, "c.nop takes no args"));
            }
            Item::CinType { line: line_c(), name: head.to_string() }
        }
        "c.ebreak" => {
            if tokens.len() != 1 {
                return Err(arity(line, "c.ebreak takes no args"));
            }
            Item::CreType { line: line_c(), name: head.to_string() }
        }
        "c.addi" | "c.li" | "c.slli" => {
            if tokens.len() < 3 {
                return Err(arity(line, "ci-type instructions require exactly 2 args"));
            }
            let imm = parse_immediate(&tokens[2..], line)?;
            Item::CiType {
                line: line_c(),
                name: head.to_string(),
                rd_rs1: Reg::name(&tokens[1]),
                imm: Imm::Expr(imm),
            }
        }
        "c.lui" => {
            if tokens.len() < 3 {
                return Err(arity(line, "c.lui requires exactly 2 args"));
            }
            let imm = parse_immediate(&tokens[2..], line)?;
            Item::CiuType {
                line: line_c(),
                name: head.to_string(),
                rd_rs1: Reg::name(&tokens[1]),
                imm: Imm::Expr(imm),
            }
        }
        "c.addi16sp" => {
            if tokens.len() < 2 {
                return Err(arity(line, "c.addi16sp requires exactly 1 arg"));
            }
            let imm = parse_immediate(&tokens[1..], line)?;
            Item::CiaType { line: line_c(), name: head.to_string(), imm: Imm::Expr(imm) }
        }
        "c.addi4spn" => {
            if tokens.len() < 3 {
                return Err(arity(line, "c.addi4spn requires exactly 2 args"));
            }
            let imm = parse_immediate(&tokens[2..], line)?;
            Item::CiwType {
                line: line_c(),
                name: head.to_string(),
                rd: Reg::name(&tokens[1]),
                imm: Imm::Expr(imm),
            }
        }
        "c.lwsp" => {
            if tokens.len() < 3 {
                return Err(arity(line, "c.lwsp requires exactly 2 args"));
            }
            let imm = parse_immediate(&tokens[2..], line)?;
            Item::CilType {
                line: line_c(),
                name: head.to_string(),
                rd: Reg::name(&tokens[1]),
                imm: Imm::Expr(imm),
            }
        }
        "c.swsp" => {
            if tokens.len() < 3 {
                return Err(arity(line, "c.swsp requires exactly 2 args"));
            }
            let imm = parse_immediate(&tokens[2..], line)?;
            Item::CssType {
                line: line_c(),
                name: head.to_string(),
                rs2: Reg::name(&tokens[1]),
                imm: Imm::Expr(imm),
            }
        }
        "c.lw" => {
            let (rd, rs1, imm) = if tokens.len() == 6 && tokens[3] == "(" && tokens[5] == ")" {
                let imm = parse_immediate(&tokens[2..3], line)?;
                (Reg::name(&tokens[1]), Reg::name(&tokens[4]), imm)
            } else {
                if tokens.len() < 4 {
                    return Err(arity(line, "c.lw requires exactly 3 args"));
                }
                let imm = parse_immediate(&tokens[3..], line)?;
                (Reg::name(&tokens[1]), Reg::name(&tokens[2]), imm)
            };
            Item::ClType {
                line: line_c(),
                name: head.to_string(),
                rd,
                rs1,
                imm: Imm::Expr(imm),
            }
        }
        "c.sw" => {
            let (rs1, rs2, imm) = if tokens.len() == 6 && tokens[3] == "(" && tokens[5] == ")" {
                let imm = parse_immediate(&tokens[2..3], line)?;
                (Reg::name(&tokens[4]), Reg::name(&tokens[1]), imm)
            } else {
                if tokens.len() < 4 {
                    return Err(arity(line, "c.sw requires exactly 3 args"));
                }
                let imm = parse_immediate(&tokens[3..], line)?;
                (Reg::name(&tokens[1]), Reg::name(&tokens[2]), imm)
            };
            Item::CsType {
                line: line_c(),
                name: head.to_string(),
                rs1,
                rs2,
                imm: Imm::Expr(imm),
            }
        }
        "c.srli" | "c.srai" | "c.andi" => {
            if tokens.len() < 3 {
                return Err(arity(line, "cb-type instructions require exactly 2 args"));
            }
            let imm = parse_immediate(&tokens[2..], line)?;
            Item::CbiType {
                line: line_c(),
                name: head.to_string(),
                rd_rs1: Reg::name(&tokens[1]),
                imm: Imm::Expr(imm),
            }
        }
        "c.beqz" | "c.bnez" => {
            if tokens.len() != 3 {
                return Err(arity(line, "compressed branches require exactly 2 args"));
            }
            let imm = branch_target(&tokens[2]);
            Item::CbType {
                line: line_c(),
                name: head.to_string(),
                rs1: Reg::name(&tokens[1]),
                imm: Imm::Expr(imm),
            }
        }
        "c.j" | "c.jal" => {
            if tokens.len() != 2 {
                return Err(arity(line, "compressed jumps require exactly 1 arg"));
            }
            let imm = branch_target(&tokens[1]);
            Item::CjType { line: line_c(), name: head.to_string(), imm: Imm::Expr(imm) }
        }
        "c.jr" | "c.jalr" => {
            if tokens.len() != 2 {
                return Err(arity(line, "compressed register jumps require exactly 1 arg"));
            }
            Item::CrjType {
                line: line_c(),
                name: head.to_string(),
                rs1: Reg::name(&tokens[1]),
            }
        }
        "c.mv" | "c.add" => {
            if tokens.len() != 3 {
                return Err(arity(line, "cr-type instructions require exactly 2 args"));
            }
            Item::CrType {
                line: line_c(),
                name: head.to_string(),
                rd_rs1: Reg::name(&tokens[1]),
                rs2: Reg::name(&tokens[2]),
            }
        }
        "c.sub" | "c.xor" | "c.or" | "c.and" => {
            if tokens.len() != 3 {
                return Err(arity(line, "ca-type instructions require exactly 2 args"));
            }
            Item::CaType {
                line: line_c(),
                name: head.to_string(),
                rd_rs1: Reg::name(&tokens[1]),
                rs2: Reg::name(&tokens[2]),
            }
        }
        _ => return Ok(None),
    };
    Ok(Some(item))
}
