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

use super::environment::Environment;
use crate::ast::{Expr, Imm, Item, Line, Reg};
use crate::errors::AssemblyError;
use crate::expr::sign_extend;
use crate::parser::{branch_target, parse_immediate};

/// Expand every pseudo-instruction into its one- or two-instruction form.
/// `li`, `call`, and `tail` were laid out at their worst case (8 bytes);
/// when the short form is chosen, every label past this position moves
/// down by the 4 bytes saved.
pub fn transform_pseudo_instructions(
    items: Vec<Item>,
    env: &mut Environment,
) -> Result<Vec<Item>, AssemblyError> {
    let mut position: i128 = 0;
    let mut new_items = Vec::with_capacity(items.len());

    for item in items {
        let worst_case = item.size();
        let (line, name, args) = match item {
            Item::Pseudo { line, name, args } => (line, name, args),
            other => {
                position += worst_case;
                new_items.push(other);
                continue;
            }
        };

        let expansion = expand(&line, &name, &args, position, env)?;
        let actual: i128 = expansion.iter().map(Item::size).sum();
        if actual < worst_case {
            env.shrink_labels_after(position, worst_case - actual);
        }
        position += actual;
        new_items.extend(expansion);
    }

    Ok(new_items)
}

fn expand(
    line: &Line,
    name: &str,
    args: &[String],
    position: i128,
    env: &Environment,
) -> Result<Vec<Item>, AssemblyError> {
    let wrong_arity = |expected: &str| AssemblyError::Syntax {
        line: line.clone(),
        reason: format!("{} requires {}", name, expected),
    };

    let items = match name {
        "nop" => {
            if !args.is_empty() {
                return Err(wrong_arity("no args"));
            }
            vec![i_type(line, "addi", reg("x0"), reg("x0"), arith("0"))]
        }
        "li" => {
            if args.len() < 2 {
                return Err(wrong_arity("a register and a value"));
            }
            let imm = parse_immediate(&args[1..], line)?;
            let value = imm.eval(position, env, line)?;
            let wrapped = sign_extend(value & 0xffff_ffff, 32);
            let rd = || reg(&args[0]);
            if (-2048..=2047).contains(&wrapped) {
                vec![i_type(line, "addi", rd(), reg("x0"), Expr::Lo(Box::new(imm)))]
            } else if wrapped & 0xfff == 0 {
                vec![u_type(line, "lui", rd(), Expr::Hi(Box::new(imm)))]
            } else {
                vec![
                    u_type(line, "lui", rd(), Expr::Hi(Box::new(imm.clone()))),
                    i_type(line, "addi", rd(), rd(), Expr::Lo(Box::new(imm))),
                ]
            }
        }
        "mv" => {
            let [rd, rs] = two_regs(args, &wrong_arity)?;
            vec![i_type(line, "addi", rd, rs, arith("0"))]
        }
        "not" => {
            let [rd, rs] = two_regs(args, &wrong_arity)?;
            vec![i_type(line, "xori", rd, rs, arith("-1"))]
        }
        "neg" => {
            let [rd, rs] = two_regs(args, &wrong_arity)?;
            vec![r_type(line, "sub", rd, reg("x0"), rs)]
        }
        "seqz" => {
            let [rd, rs] = two_regs(args, &wrong_arity)?;
            vec![i_type(line, "sltiu", rd, rs, arith("1"))]
        }
        "snez" => {
            let [rd, rs] = two_regs(args, &wrong_arity)?;
            vec![r_type(line, "sltu", rd, reg("x0"), rs)]
        }
        "sltz" => {
            let [rd, rs] = two_regs(args, &wrong_arity)?;
            vec![r_type(line, "slt", rd, rs, reg("x0"))]
        }
        "sgtz" => {
            let [rd, rs] = two_regs(args, &wrong_arity)?;
            vec![r_type(line, "slt", rd, reg("x0"), rs)]
        }

        // branches against zero
        "beqz" | "bnez" | "blez" | "bgez" | "bltz" | "bgtz" => {
            if args.len() != 2 {
                return Err(wrong_arity("a register and a target"));
            }
            let rs = reg(&args[0]);
            let target = branch_target(&args[1]);
            let (base, rs1, rs2) = match name {
                "beqz" => ("beq", rs, reg("x0")),
                "bnez" => ("bne", rs, reg("x0")),
                "blez" => ("bge", reg("x0"), rs),
                "bgez" => ("bge", rs, reg("x0")),
                "bltz" => ("blt", rs, reg("x0")),
                _ => ("blt", reg("x0"), rs),
            };
            vec![b_type(line, base, rs1, rs2, target)]
        }

        // swapped-operand conditions
        "bgt" | "ble" | "bgtu" | "bleu" => {
            if args.len() != 3 {
                return Err(wrong_arity("two registers and a target"));
            }
            let rs = reg(&args[0]);
            let rt = reg(&args[1]);
            let target = branch_target(&args[2]);
            let base = match name {
                "bgt" => "blt",
                "ble" => "bge",
                "bgtu" => "bltu",
                _ => "bgeu",
            };
            vec![b_type(line, base, rt, rs, target)]
        }

        "j" | "jal" => {
            if args.len() != 1 {
                return Err(wrong_arity("a target"));
            }
            let link = if name == "j" { reg("x0") } else { reg("x1") };
            vec![j_type(line, "jal", link, branch_target(&args[0]))]
        }
        "jr" | "jalr" => {
            if args.len() != 1 {
                return Err(wrong_arity("a register"));
            }
            let link = if name == "jr" { reg("x0") } else { reg("x1") };
            vec![i_type(line, "jalr", link, reg(&args[0]), arith("0"))]
        }
        "ret" => {
            if !args.is_empty() {
                return Err(wrong_arity("no args"));
            }
            vec![i_type(line, "jalr", reg("x0"), reg("x1"), arith("0"))]
        }

        "call" | "tail" => {
            if args.len() != 1 {
                return Err(wrong_arity("a target"));
            }
            let target = branch_target(&args[0]);
            let displacement = target.eval(position, env, line)?;
            let (link, scratch) = if name == "call" {
                (reg("x1"), reg("x1"))
            } else {
                (reg("x0"), reg("x6"))
            };
            if (-0x100000..=0xfffff).contains(&displacement) {
                // the target is reachable with a single jump
                vec![j_type(line, "jal", link, target)]
            } else {
                vec![
                    u_type(line, "auipc", scratch.clone(), Expr::Hi(Box::new(target.clone()))),
                    paired_jalr(line, link, scratch, Expr::Lo(Box::new(target))),
                ]
            }
        }

        "fence" => {
            if !args.is_empty() {
                return Err(wrong_arity("no args"));
            }
            vec![Item::Fence {
                line: line.clone(),
                name: "fence".to_string(),
                succ: 0b1111,
                pred: 0b1111,
            }]
        }

        _ => {
            return Err(AssemblyError::Syntax {
                line: line.clone(),
                reason: format!("no translation for pseudo-instruction: {}", name),
            });
        }
    };
    Ok(items)
}

fn two_regs(
    args: &[String],
    wrong_arity: &dyn Fn(&str) -> AssemblyError,
) -> Result<[Reg; 2], AssemblyError> {
    if args.len() != 2 {
        return Err(wrong_arity("exactly 2 registers"));
    }
    Ok([reg(&args[0]), reg(&args[1])])
}

fn reg(token: &str) -> Reg {
    Reg::name(token)
}

fn arith(text: &str) -> Expr {
    Expr::Arithmetic(text.to_string())
}

fn r_type(line: &Line, name: &str, rd: Reg, rs1: Reg, rs2: Reg) -> Item {
    Item::RType { line: line.clone(), name: name.to_string(), rd, rs1, rs2 }
}

fn i_type(line: &Line, name: &str, rd: Reg, rs1: Reg, imm: Expr) -> Item {
    Item::IType {
        line: line.clone(),
        name: name.to_string(),
        rd,
        rs1,
        imm: Imm::Expr(imm),
        auipc_paired: false,
    }
}

// the jalr half of an auipc pair computes its displacement from the
// auipc's PC; the flag tells resolve_immediates to add that step back
fn paired_jalr(line: &Line, rd: Reg, rs1: Reg, imm: Expr) -> Item {
    Item::IType {
        line: line.clone(),
        name: "jalr".to_string(),
        rd,
        rs1,
        imm: Imm::Expr(imm),
        auipc_paired: true,
    }
}

fn b_type(line: &Line, name: &str, rs1: Reg, rs2: Reg, imm: Expr) -> Item {
    Item::BType {
        line: line.clone(),
        name: name.to_string(),
        rs1,
        rs2,
        imm: Imm::Expr(imm),
    }
}

fn u_type(line: &Line, name: &str, rd: Reg, imm: Expr) -> Item {
    Item::UType { line: line.clone(), name: name.to_string(), rd, imm: Imm::Expr(imm) }
}

fn j_type(line: &Line, name: &str, rd: Reg, imm: Expr) -> Item {
    Item::JType { line: line.clone(), name: name.to_string(), rd, imm: Imm::Expr(imm) }
}
