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

use std::collections::HashMap;

use crate::ast::Reg;
use crate::expr::parse_int_literal;

/// The symbol environment: constants (explicit `name = expr` bindings) and
/// labels (byte positions) live in disjoint namespaces, layered over the
/// fixed register table for expression lookups.
#[derive(Debug, Clone, Default)]
pub struct Environment {
    pub constants: HashMap<String, i128>,
    pub labels: HashMap<String, i128>,
}

impl Environment {
    pub fn new() -> Self {
        Environment::default()
    }

    /// Name lookup for expression evaluation: constants, then labels,
    /// then register names.
    pub fn lookup(&self, name: &str) -> Option<i128> {
        if let Some(value) = self.constants.get(name) {
            return Some(*value);
        }
        if let Some(value) = self.labels.get(name) {
            return Some(*value);
        }
        register_number(name).map(i128::from)
    }

    /// Move every label strictly past `position` down by `amount`. Used by
    /// the shrinking passes (compression, short pseudo-instruction
    /// expansions, align collapse).
    pub fn shrink_labels_after(&mut self, position: i128, amount: i128) {
        if amount == 0 {
            return;
        }
        for value in self.labels.values_mut() {
            if *value > position {
                *value -= amount;
            }
        }
    }
}

/// Resolve a register token: an architectural name (`x0`..`x31`), an ABI
/// alias, or an integer literal 0..=31.
pub fn register_number(token: &str) -> Option<u32> {
    let number = match token {
        "zero" => 0,
        "ra" => 1,
        "sp" => 2,
        "gp" => 3,
        "tp" => 4,
        "t0" => 5,
        "t1" => 6,
        "t2" => 7,
        "s0" | "fp" => 8,
        "s1" => 9,
        "a0" => 10,
        "a1" => 11,
        "a2" => 12,
        "a3" => 13,
        "a4" => 14,
        "a5" => 15,
        "a6" => 16,
        "a7" => 17,
        "s2" => 18,
        "s3" => 19,
        "s4" => 20,
        "s5" => 21,
        "s6" => 22,
        "s7" => 23,
        "s8" => 24,
        "s9" => 25,
        "s10" => 26,
        "s11" => 27,
        "t3" => 28,
        "t4" => 29,
        "t5" => 30,
        "t6" => 31,
        _ => {
            let value = match token.strip_prefix('x') {
                Some(digits) if !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit()) => {
                    digits.parse::<i128>().ok()?
                }
                _ => parse_int_literal(token)?,
            };
            if !(0..=31).contains(&value) {
                return None;
            }
            value as u32
        }
    };
    Some(number)
}

/// Numeric value of a register operand, if it resolves. Used by the
/// compression predicates, which must compare register fields before the
/// encoder runs.
pub fn reg_value(reg: &Reg) -> Option<u32> {
    match reg {
        Reg::Name(name) => register_number(name),
        Reg::Num(value) => {
            if (0..=31).contains(value) {
                Some(*value as u32)
            } else {
                None
            }
        }
    }
}
