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

pub mod compression;
pub mod data;
pub mod encoder;
pub mod environment;
pub mod pseudo;

use std::collections::HashSet;

use crate::ast::{Expr, Imm, Item, Reg};
use crate::errors::AssemblyError;
use crate::expr::{eval_arithmetic, parse_int_literal, ExprError};
use crate::file_reader::FileReader;
use environment::{register_number, Environment};

/// Pass 1: evaluate every constant definition and bind it. Labels are not
/// known yet, and referencing one here is an error by design; constant
/// names may not shadow registers or look like numbers.
pub fn resolve_constants(
    items: Vec<Item>,
    env: &mut Environment,
) -> Result<Vec<Item>, AssemblyError> {
    let mut new_items = Vec::with_capacity(items.len());
    for item in items {
        let Item::Constant { line, name, imm } = item else {
            new_items.push(item);
            continue;
        };

        if register_number(&name).is_some() {
            return Err(AssemblyError::Semantic {
                line,
                reason: format!("constant name shadows register name: \"{}\"", name),
            });
        }
        if parse_int_literal(&name).is_some() {
            return Err(AssemblyError::Semantic {
                line,
                reason: format!("constant name cannot be a number: \"{}\"", name),
            });
        }
        let Expr::Arithmetic(text) = &imm else {
            return Err(AssemblyError::Semantic {
                line,
                reason: "constant definitions only allow arithmetic expressions".to_string(),
            });
        };

        let constants = &env.constants;
        let labels = &env.labels;
        let value = eval_arithmetic(text, &|n| {
            if labels.contains_key(n) {
                None
            } else {
                constants
                    .get(n)
                    .copied()
                    .or_else(|| register_number(n).map(i128::from))
            }
        })
        .map_err(|e| match &e {
            ExprError::UnknownName(n) if labels.contains_key(n.as_str()) => {
                AssemblyError::Semantic {
                    line: line.clone(),
                    reason: format!("constants may not reference labels: \"{}\"", n),
                }
            }
            _ => e.attach(&line),
        })?;

        env.constants.insert(name, value);
    }
    Ok(new_items)
}

/// Pass 2: walk the worst-case layout and bind every label to its byte
/// position. Later passes only ever shrink these positions.
pub fn resolve_labels(items: Vec<Item>, env: &mut Environment) -> Result<Vec<Item>, AssemblyError> {
    let mut position: i128 = 0;
    let mut defined: HashSet<String> = HashSet::new();
    let mut new_items = Vec::with_capacity(items.len());

    for item in items {
        let Item::Label { line, name } = item else {
            position += item.size();
            new_items.push(item);
            continue;
        };

        if defined.contains(&name) {
            return Err(AssemblyError::Semantic {
                line,
                reason: format!("label redefinition: \"{}\"", name),
            });
        }
        if env.constants.contains_key(&name) {
            return Err(AssemblyError::Semantic {
                line,
                reason: format!("label already defined as a constant: \"{}\"", name),
            });
        }
        if register_number(&name).is_some() {
            return Err(AssemblyError::Semantic {
                line,
                reason: format!("label name shadows register name: \"{}\"", name),
            });
        }

        defined.insert(name.clone());
        env.labels.insert(name, position);
    }
    Ok(new_items)
}

/// Pass 3 (and again after pseudo expansion): substitute register fields
/// whose token is bound in the constants map, so `W = s0` makes `W` usable
/// anywhere a register is expected.
pub fn resolve_register_aliases(items: Vec<Item>, env: &Environment) -> Vec<Item> {
    let sub = |reg: Reg| -> Reg {
        match reg {
            Reg::Name(name) => match env.constants.get(&name) {
                Some(value) => Reg::Num(*value),
                None => Reg::Name(name),
            },
            resolved => resolved,
        }
    };

    items
        .into_iter()
        .map(|item| match item {
            Item::RType { line, name, rd, rs1, rs2 } => Item::RType {
                line,
                name,
                rd: sub(rd),
                rs1: sub(rs1),
                rs2: sub(rs2),
            },
            Item::IType { line, name, rd, rs1, imm, auipc_paired } => Item::IType {
                line,
                name,
                rd: sub(rd),
                rs1: sub(rs1),
                imm,
                auipc_paired,
            },
            Item::SType { line, name, rs1, rs2, imm } => Item::SType {
                line,
                name,
                rs1: sub(rs1),
                rs2: sub(rs2),
                imm,
            },
            Item::BType { line, name, rs1, rs2, imm } => Item::BType {
                line,
                name,
                rs1: sub(rs1),
                rs2: sub(rs2),
                imm,
            },
            Item::UType { line, name, rd, imm } => Item::UType { line, name, rd: sub(rd), imm },
            Item::JType { line, name, rd, imm } => Item::JType { line, name, rd: sub(rd), imm },
            Item::AType { line, name, rd, rs1, rs2, aq, rl } => Item::AType {
                line,
                name,
                rd: sub(rd),
                rs1: sub(rs1),
                rs2: sub(rs2),
                aq,
                rl,
            },
            Item::ALType { line, name, rd, rs1, aq, rl } => Item::ALType {
                line,
                name,
                rd: sub(rd),
                rs1: sub(rs1),
                aq,
                rl,
            },
            Item::CrType { line, name, rd_rs1, rs2 } => Item::CrType {
                line,
                name,
                rd_rs1: sub(rd_rs1),
                rs2: sub(rs2),
            },
            Item::CrjType { line, name, rs1 } => Item::CrjType { line, name, rs1: sub(rs1) },
            Item::CiType { line, name, rd_rs1, imm } => Item::CiType {
                line,
                name,
                rd_rs1: sub(rd_rs1),
                imm,
            },
            Item::CiuType { line, name, rd_rs1, imm } => Item::CiuType {
                line,
                name,
                rd_rs1: sub(rd_rs1),
                imm,
            },
            Item::CilType { line, name, rd, imm } => Item::CilType { line, name, rd: sub(rd), imm },
            Item::CssType { line, name, rs2, imm } => Item::CssType {
                line,
                name,
                rs2: sub(rs2),
                imm,
            },
            Item::CiwType { line, name, rd, imm } => Item::CiwType { line, name, rd: sub(rd), imm },
            Item::ClType { line, name, rd, rs1, imm } => Item::ClType {
                line,
                name,
                rd: sub(rd),
                rs1: sub(rs1),
                imm,
            },
            Item::CsType { line, name, rs1, rs2, imm } => Item::CsType {
                line,
                name,
                rs1: sub(rs1),
                rs2: sub(rs2),
                imm,
            },
            Item::CaType { line, name, rd_rs1, rs2 } => Item::CaType {
                line,
                name,
                rd_rs1: sub(rd_rs1),
                rs2: sub(rs2),
            },
            Item::CbType { line, name, rs1, imm } => Item::CbType {
                line,
                name,
                rs1: sub(rs1),
                imm,
            },
            Item::CbiType { line, name, rd_rs1, imm } => Item::CbiType {
                line,
                name,
                rd_rs1: sub(rd_rs1),
                imm,
            },
            other => other,
        })
        .collect()
}

/// Pass 7: collapse every align into its actual padding blob and give the
/// over-reserved bytes back to the labels behind it.
pub fn resolve_aligns(items: Vec<Item>, env: &mut Environment) -> Vec<Item> {
    let mut position: i128 = 0;
    let mut new_items = Vec::with_capacity(items.len());

    for item in items {
        match item {
            Item::Align { line, alignment } => {
                let padding = (alignment - position.rem_euclid(alignment)) % alignment;
                env.shrink_labels_after(position, alignment - padding);
                position += padding;
                if padding > 0 {
                    new_items.push(Item::Blob {
                        line,
                        data: vec![0u8; padding as usize],
                    });
                }
            }
            other => {
                position += other.size();
                new_items.push(other);
            }
        }
    }
    new_items
}

/// Pass 8: every remaining expression gets its concrete value, evaluated
/// at the item's final position. The jalr of an auipc pair evaluates at
/// the preceding auipc's position so both halves share one base PC.
pub fn resolve_immediates(
    mut items: Vec<Item>,
    env: &Environment,
) -> Result<Vec<Item>, AssemblyError> {
    let mut position: i128 = 0;
    let mut prev_size: i128 = 0;

    for item in items.iter_mut() {
        let size = item.size();
        match item {
            Item::IType { line, imm, auipc_paired, .. } => {
                if let Imm::Expr(expr) = imm {
                    // the jalr of an auipc pair evaluates at the auipc's
                    // PC, so the step lands inside the %lo relocation
                    let eval_position = if *auipc_paired {
                        position - prev_size
                    } else {
                        position
                    };
                    *imm = Imm::Value(expr.eval(eval_position, env, line)?);
                }
            }
            Item::SType { line, imm, .. }
            | Item::BType { line, imm, .. }
            | Item::UType { line, imm, .. }
            | Item::JType { line, imm, .. }
            | Item::CiType { line, imm, .. }
            | Item::CiaType { line, imm, .. }
            | Item::CiuType { line, imm, .. }
            | Item::CilType { line, imm, .. }
            | Item::CssType { line, imm, .. }
            | Item::CiwType { line, imm, .. }
            | Item::ClType { line, imm, .. }
            | Item::CsType { line, imm, .. }
            | Item::CbType { line, imm, .. }
            | Item::CbiType { line, imm, .. }
            | Item::CjType { line, imm, .. }
            | Item::Pack { line, imm, .. }
            | Item::ShorthandPack { line, imm, .. } => {
                if let Imm::Expr(expr) = imm {
                    *imm = Imm::Value(expr.eval(position, env, line)?);
                }
            }
            _ => {}
        }
        prev_size = size;
        position += size;
    }
    Ok(items)
}

/// Pass 9: run every instruction through the encoder.
pub fn resolve_instructions(items: Vec<Item>) -> Result<Vec<Item>, AssemblyError> {
    let mut new_items = Vec::with_capacity(items.len());
    for item in items {
        match encoder::encode_instruction(&item) {
            Ok(Some(data)) => new_items.push(Item::Blob { line: item.line().clone(), data }),
            Ok(None) => new_items.push(item),
            Err(e) => return Err(e.attach(item.line())),
        }
    }
    Ok(new_items)
}

/// Pass 11: read every deferred binary include, checking that the file
/// still has the size the layout was computed with.
pub fn resolve_include_bytes<F: FileReader>(
    items: Vec<Item>,
    reader: &F,
) -> Result<Vec<Item>, AssemblyError> {
    let mut new_items = Vec::with_capacity(items.len());
    for item in items {
        let Item::IncludeBytes { line, path, size } = item else {
            new_items.push(item);
            continue;
        };
        let data = reader.read_binary(&path).map_err(|e| AssemblyError::Include {
            line: line.clone(),
            reason: format!("include_bytes read failed: {}", e),
        })?;
        if data.len() != size {
            return Err(AssemblyError::Include {
                line,
                reason: format!(
                    "include_bytes size changed between layout and read: expected {} bytes, found {}",
                    size,
                    data.len()
                ),
            });
        }
        new_items.push(Item::Blob { line, data });
    }
    Ok(new_items)
}

/// Pass 12: concatenate. Anything that is not a blob by now is a bug in
/// the pipeline, not in the user's source.
pub fn resolve_blobs(items: Vec<Item>) -> Result<Vec<u8>, AssemblyError> {
    let mut output = Vec::new();
    for item in items {
        match item {
            Item::Blob { data, .. } => output.extend(data),
            other => {
                return Err(AssemblyError::Internal {
                    reason: format!("expected only blobs at this point: {}", other.line()),
                });
            }
        }
    }
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Line;

    fn line() -> Line {
        Line::new("<string>", 1, "test")
    }

    #[test]
    fn test_constants_cannot_shadow_registers() {
        let items = vec![Item::Constant {
            line: line(),
            name: "sp".to_string(),
            imm: Expr::Arithmetic("100".to_string()),
        }];
        let mut env = Environment::new();
        assert!(matches!(
            resolve_constants(items, &mut env),
            Err(AssemblyError::Semantic { .. })
        ));
    }

    #[test]
    fn test_constants_cannot_be_numbers() {
        let items = vec![Item::Constant {
            line: line(),
            name: "0x10".to_string(),
            imm: Expr::Arithmetic("1".to_string()),
        }];
        let mut env = Environment::new();
        assert!(matches!(
            resolve_constants(items, &mut env),
            Err(AssemblyError::Semantic { .. })
        ));
    }

    #[test]
    fn test_constants_may_not_reference_labels() {
        let items = vec![Item::Constant {
            line: line(),
            name: "ADDR".to_string(),
            imm: Expr::Arithmetic("main + 4".to_string()),
        }];
        let mut env = Environment::new();
        env.labels.insert("main".to_string(), 0);
        let err = resolve_constants(items, &mut env).unwrap_err();
        match err {
            AssemblyError::Semantic { reason, .. } => {
                assert!(reason.contains("may not reference labels"), "{}", reason);
            }
            other => panic!("expected semantic error, got {:?}", other),
        }
    }

    #[test]
    fn test_constants_evaluate_in_order() {
        let items = vec![
            Item::Constant {
                line: line(),
                name: "FOO".to_string(),
                imm: Expr::Arithmetic("42".to_string()),
            },
            Item::Constant {
                line: line(),
                name: "BAR".to_string(),
                imm: Expr::Arithmetic("FOO * 2".to_string()),
            },
        ];
        let mut env = Environment::new();
        let rest = resolve_constants(items, &mut env).unwrap();
        assert!(rest.is_empty());
        assert_eq!(env.constants["FOO"], 42);
        assert_eq!(env.constants["BAR"], 84);
    }

    #[test]
    fn test_label_redefinition_fails() {
        let items = vec![
            Item::Label { line: line(), name: "main".to_string() },
            Item::Label { line: line(), name: "main".to_string() },
        ];
        let mut env = Environment::new();
        assert!(matches!(
            resolve_labels(items, &mut env),
            Err(AssemblyError::Semantic { .. })
        ));
    }

    #[test]
    fn test_align_collapse_gives_bytes_back() {
        // blob of 2, align 4 reserved as 4, label after it
        let items = vec![
            Item::Blob { line: line(), data: vec![0, 0] },
            Item::Align { line: line(), alignment: 4 },
        ];
        let mut env = Environment::new();
        env.labels.insert("after".to_string(), 6);
        let out = resolve_aligns(items, &mut env);
        assert_eq!(out.len(), 2);
        assert!(matches!(&out[1], Item::Blob { data, .. } if data.len() == 2));
        assert_eq!(env.labels["after"], 4);
    }

    #[test]
    fn test_align_vanishes_when_aligned() {
        let items = vec![
            Item::Blob { line: line(), data: vec![0, 0, 0, 0] },
            Item::Align { line: line(), alignment: 4 },
        ];
        let mut env = Environment::new();
        env.labels.insert("after".to_string(), 8);
        let out = resolve_aligns(items, &mut env);
        assert_eq!(out.len(), 1);
        assert_eq!(env.labels["after"], 4);
    }
}
