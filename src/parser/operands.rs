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

use crate::ast::{Expr, Line};
use crate::errors::AssemblyError;
use crate::expr::parse_int_literal;

pub fn is_int(token: &str) -> bool {
    parse_int_literal(token).is_some()
}

pub fn parse_integer_token(token: &str, line: &Line, what: &str) -> Result<i128, AssemblyError> {
    parse_int_literal(token).ok_or_else(|| AssemblyError::Syntax {
        line: line.clone(),
        reason: format!("{} must be an integer: {}", what, token),
    })
}

/// Branch and jump targets: integer literals pass through as arithmetic,
/// anything else is a label reference with PC-relative semantics.
pub fn branch_target(token: &str) -> Expr {
    if is_int(token) {
        Expr::Arithmetic(token.to_string())
    } else {
        Expr::Offset(token.to_string())
    }
}

/// Parse an immediate from its token slice. A leading `%position`,
/// `%offset`, `%hi`, or `%lo` modifier selects the expression form
/// (parens are optional for the single-argument modifiers); everything
/// else is handed to the arithmetic sub-language.
pub fn parse_immediate(tokens: &[String], line: &Line) -> Result<Expr, AssemblyError> {
    let syntax = |reason: String| AssemblyError::Syntax {
        line: line.clone(),
        reason,
    };

    if tokens.is_empty() {
        return Err(syntax("expected an immediate".to_string()));
    }

    let head = tokens[0].to_lowercase();
    match head.as_str() {
        "%position" => {
            let (reference, inner) = if tokens.len() >= 2 && tokens[1] == "(" {
                if tokens.len() < 5 || tokens[tokens.len() - 1] != ")" {
                    return Err(syntax("malformed %position modifier".to_string()));
                }
                (&tokens[2], &tokens[3..tokens.len() - 1])
            } else {
                if tokens.len() < 3 {
                    return Err(syntax("malformed %position modifier".to_string()));
                }
                (&tokens[1], &tokens[2..])
            };
            Ok(Expr::Position(
                reference.clone(),
                Box::new(Expr::Arithmetic(inner.join(" "))),
            ))
        }
        "%offset" => {
            let reference = if tokens.len() >= 2 && tokens[1] == "(" {
                if tokens.len() != 4 || tokens[3] != ")" {
                    return Err(syntax("malformed %offset modifier".to_string()));
                }
                &tokens[2]
            } else {
                if tokens.len() != 2 {
                    return Err(syntax("malformed %offset modifier".to_string()));
                }
                &tokens[1]
            };
            Ok(Expr::Offset(reference.clone()))
        }
        "%hi" | "%lo" => {
            let inner = if tokens.len() >= 2 && tokens[1] == "(" {
                if tokens.len() < 4 || tokens[tokens.len() - 1] != ")" {
                    return Err(syntax(format!("malformed {} modifier", head)));
                }
                &tokens[2..tokens.len() - 1]
            } else {
                &tokens[1..]
            };
            let inner = parse_immediate(inner, line)?;
            if matches!(inner, Expr::Hi(_) | Expr::Lo(_)) {
                return Err(syntax("%hi and %lo may not nest each other".to_string()));
            }
            if head == "%hi" {
                Ok(Expr::Hi(Box::new(inner)))
            } else {
                Ok(Expr::Lo(Box::new(inner)))
            }
        }
        _ => Ok(Expr::Arithmetic(tokens.join(" "))),
    }
}
