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

use crate::ast::Line;
use crate::errors::AssemblyError;

#[derive(Debug, Clone, PartialEq)]
pub struct LineTokens {
    pub line: Line,
    pub tokens: Vec<String>,
}

/// Split one line into tokens. `error` and `string` directives keep their
/// payload as a single verbatim token (with backslash escapes decoded for
/// strings); everything else gets comments stripped, parens padded, and a
/// whitespace/comma split.
pub fn lex_tokens(line: Line) -> Result<LineTokens, AssemblyError> {
    let trimmed = line.contents.trim_start();

    // user-triggered assembly failure; the message survives verbatim
    if let Some(message) = trimmed.strip_prefix("error ") {
        let tokens = vec!["error".to_string(), message.to_string()];
        return Ok(LineTokens { line, tokens });
    }

    // string literals need custom lexing: whitespace, commas, quotes, and
    // `#` all belong to the payload
    if let Some(payload) = trimmed.strip_prefix("string ") {
        let value = unescape(payload).map_err(|reason| AssemblyError::Lexical {
            line: line.clone(),
            reason,
        })?;
        let tokens = vec!["string".to_string(), value];
        return Ok(LineTokens { line, tokens });
    }

    // strip comments
    let contents = match line.contents.find('#') {
        Some(index) => &line.contents[..index],
        None => &line.contents,
    };
    // pad parens before splitting so they come out as their own tokens
    let contents = contents.replace('(', " ( ").replace(')', " ) ");

    let tokens: Vec<String> = contents
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|t| !t.is_empty())
        .map(|t| t.to_string())
        .collect();

    Ok(LineTokens { line, tokens })
}

/// Decode the backslash escapes a `string` payload may carry.
fn unescape(text: &str) -> Result<String, String> {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('0') => out.push('\0'),
            Some('\\') => out.push('\\'),
            Some('\'') => out.push('\''),
            Some('"') => out.push('"'),
            Some('x') => {
                let hi = chars.next();
                let lo = chars.next();
                let (Some(hi), Some(lo)) = (hi, lo) else {
                    return Err("truncated \\x escape in string".to_string());
                };
                let code = u8::from_str_radix(&format!("{}{}", hi, lo), 16)
                    .map_err(|_| format!("invalid \\x escape in string: \\x{}{}", hi, lo))?;
                out.push(code as char);
            }
            Some(other) => return Err(format!("invalid escape sequence in string: \\{}", other)),
            None => return Err("trailing backslash in string".to_string()),
        }
    }
    Ok(out)
}
