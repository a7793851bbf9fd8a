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

use std::path::{Path, PathBuf};

use crate::ast::Line;
use crate::errors::AssemblyError;
use crate::file_reader::FileReader;

/// Read a source file and flatten it into numbered lines, expanding
/// `include` directives recursively and stamping `include_bytes`
/// directives with the referenced file's resolved path and size.
pub fn read_source<F: FileReader>(
    path: &Path,
    include_dirs: &[PathBuf],
    reader: &F,
) -> Result<Vec<Line>, AssemblyError> {
    let label = path.display().to_string();
    let source = reader.read_to_string(path).map_err(|e| AssemblyError::Include {
        line: Line::new(&label, 0, ""),
        reason: format!("failed to read source file: {}", e),
    })?;
    let dir = path.parent().unwrap_or(Path::new(".")).to_path_buf();

    let mut lines = Vec::new();
    let mut include_stack = vec![path.to_path_buf()];
    read_lines_recursive(
        &source,
        &label,
        &dir,
        include_dirs,
        reader,
        &mut include_stack,
        &mut lines,
    )?;
    Ok(lines)
}

/// Same as `read_source` for an in-memory source string. Includes are
/// resolved against the include directories and the current directory.
pub fn read_string<F: FileReader>(
    source: &str,
    include_dirs: &[PathBuf],
    reader: &F,
) -> Result<Vec<Line>, AssemblyError> {
    let mut lines = Vec::new();
    let mut include_stack = Vec::new();
    read_lines_recursive(
        source,
        "<string>",
        Path::new(""),
        include_dirs,
        reader,
        &mut include_stack,
        &mut lines,
    )?;
    Ok(lines)
}

fn read_lines_recursive<F: FileReader>(
    source: &str,
    file_label: &str,
    current_dir: &Path,
    include_dirs: &[PathBuf],
    reader: &F,
    include_stack: &mut Vec<PathBuf>,
    out: &mut Vec<Line>,
) -> Result<(), AssemblyError> {
    for (number, raw) in source.lines().enumerate() {
        let line = Line::new(file_label, number + 1, raw);

        // empty lines are dropped at this level
        if raw.trim().is_empty() {
            continue;
        }

        // include directives may carry a trailing comment
        let code = match raw.find('#') {
            Some(index) => &raw[..index],
            None => raw,
        };
        let tokens: Vec<&str> = code.split_whitespace().collect();
        match tokens.first().copied().unwrap_or("") {
            "include" => {
                if tokens.len() != 2 {
                    return Err(AssemblyError::Include {
                        line,
                        reason: "include requires exactly one file path".to_string(),
                    });
                }
                let resolved = resolve_include(tokens[1], current_dir, include_dirs, reader)
                    .ok_or_else(|| AssemblyError::Include {
                        line: line.clone(),
                        reason: format!("include not found: {}", tokens[1]),
                    })?;
                if include_stack.contains(&resolved) {
                    return Err(AssemblyError::Include {
                        line,
                        reason: format!("include cycle detected: {}", resolved.display()),
                    });
                }

                let included =
                    reader
                        .read_to_string(&resolved)
                        .map_err(|e| AssemblyError::Include {
                            line: line.clone(),
                            reason: format!("include file read failed: {}", e),
                        })?;
                let label = resolved.display().to_string();
                let dir = resolved.parent().unwrap_or(Path::new(".")).to_path_buf();

                include_stack.push(resolved);
                read_lines_recursive(
                    &included,
                    &label,
                    &dir,
                    include_dirs,
                    reader,
                    include_stack,
                    out,
                )?;
                include_stack.pop();
            }
            "include_bytes" => {
                if tokens.len() != 2 {
                    return Err(AssemblyError::Include {
                        line,
                        reason: "include_bytes requires exactly one file path".to_string(),
                    });
                }
                let resolved = resolve_include(tokens[1], current_dir, include_dirs, reader)
                    .ok_or_else(|| AssemblyError::Include {
                        line: line.clone(),
                        reason: format!("include not found: {}", tokens[1]),
                    })?;
                let size = reader
                    .file_size(&resolved)
                    .map_err(|e| AssemblyError::Include {
                        line: line.clone(),
                        reason: format!("include_bytes size check failed: {}", e),
                    })?;

                // stamp the resolved path and size so later passes can
                // account for the byte footprint without reading the data
                let stamped = format!("include_bytes {} {}", resolved.display(), size);
                out.push(Line::new(file_label, number + 1, &stamped));
            }
            _ => out.push(line),
        }
    }
    Ok(())
}

/// Search the configured include directories in order, then the directory
/// of the referring source file.
fn resolve_include<F: FileReader>(
    path: &str,
    current_dir: &Path,
    include_dirs: &[PathBuf],
    reader: &F,
) -> Option<PathBuf> {
    include_dirs
        .iter()
        .map(|dir| dir.join(path))
        .chain(std::iter::once(current_dir.join(path)))
        .find(|candidate| reader.file_size(candidate).is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::file_reader::MockFileReader;

    #[test]
    fn test_read_source_numbers_lines() {
        let mut reader = MockFileReader::default();
        reader.add_file("main.asm", "addi t0 zero 1\n\naddi t1, zero, 2\n");

        let lines = read_source(Path::new("main.asm"), &[], &reader).unwrap();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].number, 1);
        assert_eq!(lines[1].number, 3);
        assert_eq!(lines[1].contents, "addi t1, zero, 2");
    }

    #[test]
    fn test_include_expands_in_place() {
        let mut reader = MockFileReader::default();
        reader.add_file("main.asm", "addi t0 zero 1\ninclude lib.asm\naddi t2 zero 3\n");
        reader.add_file("lib.asm", "addi t1 zero 2\n");

        let lines = read_source(Path::new("main.asm"), &[], &reader).unwrap();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[1].file, "lib.asm");
        assert_eq!(lines[1].contents, "addi t1 zero 2");
        assert_eq!(lines[2].contents, "addi t2 zero 3");
    }

    #[test]
    fn test_include_searches_dirs_in_order() {
        let mut reader = MockFileReader::default();
        reader.add_file("main.asm", "include util.asm\n");
        reader.add_file("first/util.asm", "addi t0 zero 1\n");
        reader.add_file("second/util.asm", "addi t0 zero 2\n");

        let dirs = vec![PathBuf::from("first"), PathBuf::from("second")];
        let lines = read_source(Path::new("main.asm"), &dirs, &reader).unwrap();
        assert_eq!(lines[0].file, "first/util.asm");
    }

    #[test]
    fn test_include_missing_fails() {
        let mut reader = MockFileReader::default();
        reader.add_file("main.asm", "include nope.asm\n");

        let err = read_source(Path::new("main.asm"), &[], &reader).unwrap_err();
        assert!(matches!(err, AssemblyError::Include { .. }));
    }

    #[test]
    fn test_include_cycle_fails() {
        let mut reader = MockFileReader::default();
        reader.add_file("a.asm", "include b.asm\n");
        reader.add_file("b.asm", "include a.asm\n");

        let err = read_source(Path::new("a.asm"), &[], &reader).unwrap_err();
        match err {
            AssemblyError::Include { reason, .. } => assert!(reason.contains("cycle")),
            other => panic!("expected include error, got {:?}", other),
        }
    }

    #[test]
    fn test_include_bytes_stamps_size() {
        let mut reader = MockFileReader::default();
        reader.add_file("main.asm", "include_bytes blob.bin\n");
        reader.add_binary_file("blob.bin", &[1, 2, 3, 4, 5]);

        let lines = read_source(Path::new("main.asm"), &[], &reader).unwrap();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].contents, "include_bytes blob.bin 5");
    }
}
