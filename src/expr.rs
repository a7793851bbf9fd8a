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

use pest::Parser;
use pest::iterators::Pair;
use pest_derive::Parser;
use thiserror::Error;

use crate::assembler::environment::Environment;
use crate::ast::{Expr, Line};
use crate::errors::AssemblyError;

#[derive(Parser)]
#[grammar = "./expr.pest"]
struct ExprParser;

#[derive(Error, Debug, PartialEq)]
pub enum ExprError {
    #[error("invalid syntax in expr: \"{0}\"")]
    Syntax(String),

    #[error("unknown name in expr: \"{0}\"")]
    UnknownName(String),

    #[error("division by zero in expr: \"{0}\"")]
    DivideByZero(String),

    #[error("expr does not produce an integer: \"{0}\"")]
    NonInteger(String),

    #[error("arithmetic overflow in expr: \"{0}\"")]
    Overflow(String),

    #[error("invalid shift amount in expr: \"{0}\"")]
    BadShift(String),

    #[error("invalid character literal in expr: \"{0}\"")]
    BadChar(String),
}

impl ExprError {
    pub fn attach(self, line: &Line) -> AssemblyError {
        match self {
            ExprError::Syntax(_) => AssemblyError::Syntax {
                line: line.clone(),
                reason: self.to_string(),
            },
            _ => AssemblyError::Semantic {
                line: line.clone(),
                reason: self.to_string(),
            },
        }
    }
}

/// Two's-complement interpretation of the low `bits` bits of `value`.
pub fn sign_extend(value: i128, bits: u32) -> i128 {
    let sign_bit = 1i128 << (bits - 1);
    (value & (sign_bit - 1)) - (value & sign_bit)
}

/// Upper 20 bits of a 32-bit value with the `%hi` rounding correction:
/// if bit 11 is set, round up so that `(hi << 12) + lo` reconstructs the
/// original value under 32-bit signed arithmetic.
pub fn relocate_hi(imm: i128) -> i128 {
    let imm = if imm & 0x800 != 0 {
        imm.wrapping_add(1 << 12)
    } else {
        imm
    };
    sign_extend((imm >> 12) & 0x000f_ffff, 20)
}

/// Low 12 bits of a value, sign-extended (`%lo`).
pub fn relocate_lo(imm: i128) -> i128 {
    sign_extend(imm & 0xfff, 12)
}

/// Parse an integer literal the way the source language spells them:
/// optional sign, then decimal or a `0x`/`0b`/`0o` prefix.
pub fn parse_int_literal(token: &str) -> Option<i128> {
    let (negative, rest) = match token.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, token.strip_prefix('+').unwrap_or(token)),
    };
    let value = if let Some(hex) = rest.strip_prefix("0x") {
        i128::from_str_radix(hex, 16).ok()?
    } else if let Some(bin) = rest.strip_prefix("0b") {
        i128::from_str_radix(bin, 2).ok()?
    } else if let Some(oct) = rest.strip_prefix("0o") {
        i128::from_str_radix(oct, 8).ok()?
    } else {
        rest.parse::<i128>().ok()?
    };
    Some(if negative { -value } else { value })
}

/// Evaluate an arithmetic expression against a name resolver. All
/// arithmetic is exact over `i128`; division that would produce a
/// non-integer result is rejected rather than truncated.
pub fn eval_arithmetic(
    text: &str,
    resolve: &dyn Fn(&str) -> Option<i128>,
) -> Result<i128, ExprError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(ExprError::Syntax(text.to_string()));
    }
    let mut pairs = ExprParser::parse(Rule::expression, trimmed)
        .map_err(|_| ExprError::Syntax(trimmed.to_string()))?;
    let expression = pairs.next().unwrap();
    let root = expression.into_inner().next().unwrap();
    eval_pair(root, trimmed, resolve)
}

fn eval_pair(
    pair: Pair<Rule>,
    text: &str,
    resolve: &dyn Fn(&str) -> Option<i128>,
) -> Result<i128, ExprError> {
    match pair.as_rule() {
        Rule::bit_or | Rule::bit_xor | Rule::bit_and | Rule::shift | Rule::sum | Rule::term => {
            let mut inner = pair.into_inner();
            let mut acc = eval_pair(inner.next().unwrap(), text, resolve)?;
            while let Some(op) = inner.next() {
                let rhs = eval_pair(inner.next().unwrap(), text, resolve)?;
                acc = apply_binary(op.as_str(), acc, rhs, text)?;
            }
            Ok(acc)
        }
        Rule::unary => {
            let mut ops = Vec::new();
            let mut value = 0;
            for part in pair.into_inner() {
                match part.as_rule() {
                    Rule::unary_op => ops.push(part.as_str().to_string()),
                    _ => value = eval_pair(part, text, resolve)?,
                }
            }
            for op in ops.iter().rev() {
                value = match op.as_str() {
                    "-" => value
                        .checked_neg()
                        .ok_or_else(|| ExprError::Overflow(text.to_string()))?,
                    "~" => !value,
                    _ => value,
                };
            }
            Ok(value)
        }
        Rule::atom => eval_pair(pair.into_inner().next().unwrap(), text, resolve),
        Rule::literal => eval_pair(pair.into_inner().next().unwrap(), text, resolve),
        Rule::hex_lit => i128::from_str_radix(&pair.as_str()[2..], 16)
            .map_err(|_| ExprError::Overflow(text.to_string())),
        Rule::bin_lit => i128::from_str_radix(&pair.as_str()[2..], 2)
            .map_err(|_| ExprError::Overflow(text.to_string())),
        Rule::oct_lit => i128::from_str_radix(&pair.as_str()[2..], 8)
            .map_err(|_| ExprError::Overflow(text.to_string())),
        Rule::dec_lit => pair
            .as_str()
            .parse::<i128>()
            .map_err(|_| ExprError::Overflow(text.to_string())),
        Rule::char_lit => eval_char_literal(pair.as_str()),
        Rule::identifier => {
            let name = pair.as_str();
            resolve(name).ok_or_else(|| ExprError::UnknownName(name.to_string()))
        }
        _ => Err(ExprError::Syntax(text.to_string())),
    }
}

fn apply_binary(op: &str, lhs: i128, rhs: i128, text: &str) -> Result<i128, ExprError> {
    let overflow = || ExprError::Overflow(text.to_string());
    match op {
        "|" => Ok(lhs | rhs),
        "^" => Ok(lhs ^ rhs),
        "&" => Ok(lhs & rhs),
        "<<" => {
            if !(0..=63).contains(&rhs) {
                return Err(ExprError::BadShift(text.to_string()));
            }
            lhs.checked_mul(1i128 << rhs).ok_or_else(overflow)
        }
        ">>" => {
            if rhs < 0 {
                return Err(ExprError::BadShift(text.to_string()));
            }
            if rhs > 127 {
                Ok(if lhs < 0 { -1 } else { 0 })
            } else {
                Ok(lhs >> rhs)
            }
        }
        "+" => lhs.checked_add(rhs).ok_or_else(overflow),
        "-" => lhs.checked_sub(rhs).ok_or_else(overflow),
        "*" => lhs.checked_mul(rhs).ok_or_else(overflow),
        "/" => {
            if rhs == 0 {
                return Err(ExprError::DivideByZero(text.to_string()));
            }
            if lhs % rhs != 0 {
                return Err(ExprError::NonInteger(text.to_string()));
            }
            Ok(lhs / rhs)
        }
        "%" => {
            if rhs == 0 {
                return Err(ExprError::DivideByZero(text.to_string()));
            }
            // modulo takes the sign of the divisor
            Ok(((lhs % rhs) + rhs) % rhs)
        }
        _ => Err(ExprError::Syntax(text.to_string())),
    }
}

fn eval_char_literal(token: &str) -> Result<i128, ExprError> {
    let inner = &token[1..token.len() - 1];
    let ch = if let Some(escaped) = inner.strip_prefix('\\') {
        match escaped {
            "n" => '\n',
            "t" => '\t',
            "r" => '\r',
            "0" => '\0',
            "\\" => '\\',
            "'" => '\'',
            "\"" => '"',
            _ => return Err(ExprError::BadChar(token.to_string())),
        }
    } else {
        let mut chars = inner.chars();
        let ch = chars.next().ok_or_else(|| ExprError::BadChar(token.to_string()))?;
        if chars.next().is_some() {
            return Err(ExprError::BadChar(token.to_string()));
        }
        ch
    };
    if !ch.is_ascii() {
        return Err(ExprError::BadChar(token.to_string()));
    }
    Ok(ch as i128)
}

impl Expr {
    /// Evaluate this expression at a byte position against the current
    /// environment. `Offset` is PC-relative; `Position` is a base value
    /// plus a label; `Hi`/`Lo` apply the relocation split.
    pub fn eval(&self, position: i128, env: &Environment, line: &Line) -> Result<i128, AssemblyError> {
        match self {
            Expr::Arithmetic(text) => {
                eval_arithmetic(text, &|name| env.lookup(name)).map_err(|e| e.attach(line))
            }
            Expr::Position(reference, inner) => {
                let dest = lookup_reference(reference, env, line)?;
                let base = inner.eval(position, env, line)?;
                Ok(dest.wrapping_add(base))
            }
            Expr::Offset(reference) => {
                let dest = lookup_reference(reference, env, line)?;
                Ok(dest - position)
            }
            Expr::Hi(inner) => Ok(relocate_hi(inner.eval(position, env, line)?)),
            Expr::Lo(inner) => Ok(relocate_lo(inner.eval(position, env, line)?)),
        }
    }
}

fn lookup_reference(name: &str, env: &Environment, line: &Line) -> Result<i128, AssemblyError> {
    env.lookup(name).ok_or_else(|| AssemblyError::Semantic {
        line: line.clone(),
        reason: format!("unknown name in expr: \"{}\"", name),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_names(_: &str) -> Option<i128> {
        None
    }

    #[test]
    fn test_sign_extend() {
        let cases = [
            (0b00000000, 8, 0),
            (0b01111111, 8, 127),
            (0b11111111, 8, -1),
            (0b10000000, 8, -128),
            (0b00000110, 8, 6),
            (0b00000110, 4, 6),
            (0b00000110, 3, -2),
            (0x00000000, 32, 0),
            (0xffffffff, 32, -1),
            (0x00000fff, 12, -1),
        ];
        for (value, bits, expected) in cases {
            assert_eq!(sign_extend(value, bits), expected, "sign_extend({value:#x}, {bits})");
        }
    }

    #[test]
    fn test_relocate_hi() {
        let cases = [
            (0x00000000, 0),
            (0x00001000, 1),
            (0x7ffff000, 0x7ffff),
            (0xfffff000, -1),
            (0x80000000, -0x80000),
            // the MSB of the low half rounds the upper half up
            (0x00000800, 1),
            (0x00001800, 2),
            (0x7ffff800, -0x80000),
            (0xfffff800, 0),
            (0x80000800, -0x7ffff),
        ];
        for (value, expected) in cases {
            assert_eq!(relocate_hi(value), expected, "relocate_hi({value:#x})");
        }
    }

    #[test]
    fn test_relocate_lo() {
        let cases = [
            (0x00000000, 0),
            (0x00000001, 1),
            (0x000007ff, 2047),
            (0x00000fff, -1),
            (0x00000800, -2048),
            // the upper 20 bits have no effect
            (0xfffff000, 0),
            (0xfffff001, 1),
            (0xfffff7ff, 2047),
            (0xffffffff, -1),
            (0xfffff800, -2048),
        ];
        for (value, expected) in cases {
            assert_eq!(relocate_lo(value), expected, "relocate_lo({value:#x})");
        }
    }

    #[test]
    fn test_relocate_hi_lo_sum() {
        let values: [i128; 15] = [
            0x00000000, 0x00000001, 0x000007ff, 0x00000fff, 0x00000800, 0xfffff000, 0xfffff7ff,
            0xfffff800, 0xffffffff, 0x7fffffff, 0x02000000, 0x02000004, 0xdeadbeef, 0x12345678,
            0xcafec0fe,
        ];
        for value in values {
            let hi = relocate_hi(value);
            let lo = relocate_lo(value);
            let sum = sign_extend((hi << 12) + lo, 32);
            assert_eq!(sum, sign_extend(value, 32), "hi/lo round trip for {value:#x}");
        }
    }

    #[test]
    fn test_eval_literals() {
        assert_eq!(eval_arithmetic("42", &no_names), Ok(42));
        assert_eq!(eval_arithmetic("0x2a", &no_names), Ok(42));
        assert_eq!(eval_arithmetic("0b101010", &no_names), Ok(42));
        assert_eq!(eval_arithmetic("0o52", &no_names), Ok(42));
        assert_eq!(eval_arithmetic("'?'", &no_names), Ok(63));
        assert_eq!(eval_arithmetic("'\\n'", &no_names), Ok(10));
        assert_eq!(eval_arithmetic("-1", &no_names), Ok(-1));
        assert_eq!(eval_arithmetic("~0", &no_names), Ok(-1));
    }

    #[test]
    fn test_eval_precedence() {
        assert_eq!(eval_arithmetic("1 + 2 * 3", &no_names), Ok(7));
        assert_eq!(eval_arithmetic("( 1 + 2 ) * 3", &no_names), Ok(9));
        assert_eq!(eval_arithmetic("84 >> 1 & 0b11111", &no_names), Ok(10));
        assert_eq!(eval_arithmetic("1 | 2 ^ 3 & 2", &no_names), Ok(1));
        assert_eq!(eval_arithmetic("1 << 4 | 1", &no_names), Ok(17));
    }

    #[test]
    fn test_eval_names() {
        let resolve = |name: &str| if name == "FOO" { Some(42) } else { None };
        assert_eq!(eval_arithmetic("FOO * 2", &resolve), Ok(84));
        assert_eq!(
            eval_arithmetic("BAR", &resolve),
            Err(ExprError::UnknownName("BAR".to_string()))
        );
    }

    #[test]
    fn test_eval_division() {
        assert_eq!(eval_arithmetic("84 / 2", &no_names), Ok(42));
        assert_eq!(
            eval_arithmetic("7 / 2", &no_names),
            Err(ExprError::NonInteger("7 / 2".to_string()))
        );
        assert_eq!(
            eval_arithmetic("1 / 0", &no_names),
            Err(ExprError::DivideByZero("1 / 0".to_string()))
        );
    }

    #[test]
    fn test_eval_modulo_sign() {
        // modulo takes the sign of the divisor
        assert_eq!(eval_arithmetic("-7 % 4", &no_names), Ok(1));
        assert_eq!(eval_arithmetic("7 % -4", &no_names), Ok(-1));
    }

    #[test]
    fn test_eval_rejects_garbage() {
        assert!(matches!(eval_arithmetic("", &no_names), Err(ExprError::Syntax(_))));
        assert!(matches!(eval_arithmetic("1 +", &no_names), Err(ExprError::Syntax(_))));
        assert!(matches!(eval_arithmetic("foo:", &no_names), Err(ExprError::Syntax(_))));
    }

    #[test]
    fn test_parse_int_literal() {
        assert_eq!(parse_int_literal("-1"), Some(-1));
        assert_eq!(parse_int_literal("0x20"), Some(32));
        assert_eq!(parse_int_literal("0b100"), Some(4));
        assert_eq!(parse_int_literal("zero"), None);
        assert_eq!(parse_int_literal("foo:"), None);
        assert_eq!(parse_int_literal("x0"), None);
    }
}
