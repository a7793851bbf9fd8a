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

use super::environment::{Environment, reg_value};
use crate::ast::{Imm, Item, Line};

/// Rewrite eligible base instructions into their compressed forms. Each
/// substitution saves 2 bytes, so every label past the instruction moves
/// down by 2. Immediate predicates are tested against the current layout;
/// the kept expressions are re-evaluated at their final positions later,
/// and shrinking only ever moves displacements toward zero, so a rule
/// that fires here cannot become invalid.
pub fn transform_compressible(items: Vec<Item>, env: &mut Environment) -> Vec<Item> {
    let mut position: i128 = 0;
    let mut new_items = Vec::with_capacity(items.len());

    for item in items {
        match compress_item(&item, position, env) {
            Some(compressed) => {
                env.shrink_labels_after(position, item.size() - compressed.size());
                position += compressed.size();
                new_items.push(compressed);
            }
            None => {
                position += item.size();
                new_items.push(item);
            }
        }
    }

    new_items
}

fn eval_imm(imm: &Imm, position: i128, env: &Environment, line: &Line) -> Option<i128> {
    match imm {
        Imm::Value(value) => Some(*value),
        Imm::Expr(expr) => expr.eval(position, env, line).ok(),
    }
}

fn common(reg: Option<u32>) -> bool {
    matches!(reg, Some(8..=15))
}

fn compress_item(item: &Item, position: i128, env: &Environment) -> Option<Item> {
    match item {
        Item::IType { line, name, rd, rs1, imm, auipc_paired } => {
            // the second half of an auipc pair keeps its 4-byte form; its
            // displacement is not final while layout is still shrinking
            if *auipc_paired {
                return None;
            }
            let rd_n = reg_value(rd)?;
            let rs1_n = reg_value(rs1)?;
            match name.as_str() {
                "addi" => {
                    let value = eval_imm(imm, position, env, line)?;
                    // c.addi16sp first: it shares its match with c.addi
                    // but carries the stricter preconditions
                    if rd_n == 2 && rs1_n == 2 && value != 0 && value % 16 == 0
                        && (-512..=496).contains(&value)
                    {
                        return Some(Item::CiaType {
                            line: line.clone(),
                            name: "c.addi16sp".to_string(),
                            imm: imm.clone(),
                        });
                    }
                    if rs1_n == 2 && common(Some(rd_n)) && value != 0 && value % 4 == 0
                        && (0..=1020).contains(&value)
                    {
                        return Some(Item::CiwType {
                            line: line.clone(),
                            name: "c.addi4spn".to_string(),
                            rd: rd.clone(),
                            imm: imm.clone(),
                        });
                    }
                    if rd_n == 0 && rs1_n == 0 && value == 0 {
                        return Some(Item::CinType {
                            line: line.clone(),
                            name: "c.nop".to_string(),
                        });
                    }
                    if rd_n == rs1_n && rd_n != 0 && value != 0 && (-32..=31).contains(&value) {
                        return Some(Item::CiType {
                            line: line.clone(),
                            name: "c.addi".to_string(),
                            rd_rs1: rd.clone(),
                            imm: imm.clone(),
                        });
                    }
                    if rs1_n == 0 && rd_n != 0 && (-32..=31).contains(&value) {
                        return Some(Item::CiType {
                            line: line.clone(),
                            name: "c.li".to_string(),
                            rd_rs1: rd.clone(),
                            imm: imm.clone(),
                        });
                    }
                    None
                }
                "lw" => {
                    let value = eval_imm(imm, position, env, line)?;
                    if value % 4 != 0 {
                        return None;
                    }
                    // c.lwsp first: a common rd with an sp base prefers it
                    if rs1_n == 2 && rd_n != 0 && (0..=252).contains(&value) {
                        return Some(Item::CilType {
                            line: line.clone(),
                            name: "c.lwsp".to_string(),
                            rd: rd.clone(),
                            imm: imm.clone(),
                        });
                    }
                    if common(Some(rd_n)) && common(Some(rs1_n)) && (0..=124).contains(&value) {
                        return Some(Item::ClType {
                            line: line.clone(),
                            name: "c.lw".to_string(),
                            rd: rd.clone(),
                            rs1: rs1.clone(),
                            imm: imm.clone(),
                        });
                    }
                    None
                }
                "andi" => {
                    let value = eval_imm(imm, position, env, line)?;
                    if rd_n == rs1_n && common(Some(rd_n)) && (-32..=31).contains(&value) {
                        return Some(Item::CbiType {
                            line: line.clone(),
                            name: "c.andi".to_string(),
                            rd_rs1: rd.clone(),
                            imm: imm.clone(),
                        });
                    }
                    None
                }
                "jalr" => {
                    let value = eval_imm(imm, position, env, line)?;
                    if value != 0 || rs1_n == 0 {
                        return None;
                    }
                    let name = match rd_n {
                        0 => "c.jr",
                        1 => "c.jalr",
                        _ => return None,
                    };
                    Some(Item::CrjType {
                        line: line.clone(),
                        name: name.to_string(),
                        rs1: rs1.clone(),
                    })
                }
                _ => None,
            }
        }

        Item::RType { line, name, rd, rs1, rs2 } => {
            let rd_n = reg_value(rd)?;
            let rs1_n = reg_value(rs1)?;
            let rs2_n = reg_value(rs2)?;
            match name.as_str() {
                "slli" => {
                    // the shamt rides in the rs2 field
                    if rd_n == rs1_n && rd_n != 0 && (1..=31).contains(&rs2_n) {
                        return Some(Item::CiType {
                            line: line.clone(),
                            name: "c.slli".to_string(),
                            rd_rs1: rd.clone(),
                            imm: Imm::Value(rs2_n as i128),
                        });
                    }
                    None
                }
                "srli" | "srai" => {
                    if rd_n == rs1_n && common(Some(rd_n)) && (1..=31).contains(&rs2_n) {
                        return Some(Item::CbiType {
                            line: line.clone(),
                            name: format!("c.{}", name),
                            rd_rs1: rd.clone(),
                            imm: Imm::Value(rs2_n as i128),
                        });
                    }
                    None
                }
                "sub" | "xor" | "or" | "and" => {
                    if rd_n == rs1_n && common(Some(rd_n)) && common(Some(rs2_n)) {
                        return Some(Item::CaType {
                            line: line.clone(),
                            name: format!("c.{}", name),
                            rd_rs1: rd.clone(),
                            rs2: rs2.clone(),
                        });
                    }
                    None
                }
                "add" => {
                    if rs2_n == 0 || rd_n == 0 {
                        return None;
                    }
                    // c.mv first: a zero rs1 is a plain register copy
                    if rs1_n == 0 {
                        return Some(Item::CrType {
                            line: line.clone(),
                            name: "c.mv".to_string(),
                            rd_rs1: rd.clone(),
                            rs2: rs2.clone(),
                        });
                    }
                    if rd_n == rs1_n {
                        return Some(Item::CrType {
                            line: line.clone(),
                            name: "c.add".to_string(),
                            rd_rs1: rd.clone(),
                            rs2: rs2.clone(),
                        });
                    }
                    None
                }
                _ => None,
            }
        }

        Item::SType { line, name, rs1, rs2, imm } if name == "sw" => {
            let rs1_n = reg_value(rs1)?;
            let rs2_n = reg_value(rs2)?;
            let value = eval_imm(imm, position, env, line)?;
            if value % 4 != 0 {
                return None;
            }
            if rs1_n == 2 && (0..=252).contains(&value) {
                return Some(Item::CssType {
                    line: line.clone(),
                    name: "c.swsp".to_string(),
                    rs2: rs2.clone(),
                    imm: imm.clone(),
                });
            }
            if common(Some(rs1_n)) && common(Some(rs2_n)) && (0..=124).contains(&value) {
                return Some(Item::CsType {
                    line: line.clone(),
                    name: "c.sw".to_string(),
                    rs1: rs1.clone(),
                    rs2: rs2.clone(),
                    imm: imm.clone(),
                });
            }
            None
        }

        Item::UType { line, name, rd, imm } if name == "lui" => {
            let rd_n = reg_value(rd)?;
            if rd_n == 0 || rd_n == 2 {
                return None;
            }
            let value = eval_imm(imm, position, env, line)?;
            // fold the unsigned upper-half spellings into their negatives
            let value = if (0x80000..=0xfffff).contains(&value) {
                value - 0x100000
            } else {
                value
            };
            if value != 0 && (-32..=31).contains(&value) {
                return Some(Item::CiuType {
                    line: line.clone(),
                    name: "c.lui".to_string(),
                    rd_rs1: rd.clone(),
                    imm: imm.clone(),
                });
            }
            None
        }

        Item::JType { line, name, rd, imm } if name == "jal" => {
            let rd_n = reg_value(rd)?;
            let value = eval_imm(imm, position, env, line)?;
            if value % 2 != 0 || !(-2048..=2046).contains(&value) {
                return None;
            }
            let name = match rd_n {
                0 => "c.j",
                1 => "c.jal",
                _ => return None,
            };
            Some(Item::CjType {
                line: line.clone(),
                name: name.to_string(),
                imm: imm.clone(),
            })
        }

        Item::BType { line, name, rs1, rs2, imm } if name == "beq" || name == "bne" => {
            let rs1_n = reg_value(rs1)?;
            let rs2_n = reg_value(rs2)?;
            if rs2_n != 0 || !common(Some(rs1_n)) {
                return None;
            }
            let value = eval_imm(imm, position, env, line)?;
            if value % 2 != 0 || !(-256..=254).contains(&value) {
                return None;
            }
            let name = if name == "beq" { "c.beqz" } else { "c.bnez" };
            Some(Item::CbType {
                line: line.clone(),
                name: name.to_string(),
                rs1: rs1.clone(),
                imm: imm.clone(),
            })
        }

        Item::IEType { line, name } if name == "ebreak" => Some(Item::CreType {
            line: line.clone(),
            name: "c.ebreak".to_string(),
        }),

        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Reg;

    fn line() -> Line {
        Line::new("<string>", 1, "test")
    }

    fn addi(rd: &str, rs1: &str, imm: i128) -> Item {
        Item::IType {
            line: line(),
            name: "addi".to_string(),
            rd: Reg::name(rd),
            rs1: Reg::name(rs1),
            imm: Imm::Value(imm),
            auipc_paired: false,
        }
    }

    #[test]
    fn test_addi16sp_wins_over_addi() {
        let env = Environment::new();
        let item = compress_item(&addi("x2", "x2", 16), 0, &env).unwrap();
        assert!(matches!(item, Item::CiaType { name, .. } if name == "c.addi16sp"));
    }

    #[test]
    fn test_addi_rules() {
        let env = Environment::new();
        assert!(matches!(
            compress_item(&addi("x8", "sp", 4), 0, &env),
            Some(Item::CiwType { .. })
        ));
        assert!(matches!(
            compress_item(&addi("x0", "x0", 0), 0, &env),
            Some(Item::CinType { .. })
        ));
        assert!(matches!(
            compress_item(&addi("x1", "x1", 1), 0, &env),
            Some(Item::CiType { name, .. }) if name == "c.addi"
        ));
        assert!(matches!(
            compress_item(&addi("x1", "x0", 1), 0, &env),
            Some(Item::CiType { name, .. }) if name == "c.li"
        ));
        // a zero immediate disqualifies c.addi
        assert!(compress_item(&addi("x1", "x1", 0), 0, &env).is_none());
        // a large immediate disqualifies everything
        assert!(compress_item(&addi("x1", "x1", 64), 0, &env).is_none());
    }

    #[test]
    fn test_shrink_adjusts_downstream_labels() {
        let mut env = Environment::new();
        env.labels.insert("before".to_string(), 0);
        env.labels.insert("after".to_string(), 8);
        let items = vec![addi("x0", "x0", 0), addi("x5", "x5", 64)];
        let out = transform_compressible(items, &mut env);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].size(), 2);
        assert_eq!(out[1].size(), 4);
        assert_eq!(env.labels["before"], 0);
        assert_eq!(env.labels["after"], 6);
    }

    #[test]
    fn test_paired_jalr_is_left_alone() {
        let env = Environment::new();
        let item = Item::IType {
            line: line(),
            name: "jalr".to_string(),
            rd: Reg::name("x1"),
            rs1: Reg::name("x1"),
            imm: Imm::Value(0),
            auipc_paired: true,
        };
        assert!(compress_item(&item, 0, &env).is_none());
    }
}
