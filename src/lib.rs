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

//! An assembler core for the RV32IMAC instruction set: text in, flat
//! little-endian binary out. No object files, no relocations, no linker;
//! the output loads directly onto bare-metal RISC-V microcontrollers.

pub mod assembler;
pub mod ast;
pub mod errors;
pub mod expr;
pub mod file_reader;
pub mod lexer;
pub mod parser;
pub mod reader;

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use assembler::environment::Environment;
use assembler::{compression, data, pseudo};
use ast::Line;
use file_reader::FileReader;
use lexer::LineTokens;

#[derive(Debug, Clone, Default)]
pub struct AssembleOptions {
    /// Rewrite eligible instructions into their compressed forms.
    pub compress: bool,
    /// Directories searched (in order, before the referring file's own
    /// directory) when resolving `include` and `include_bytes`.
    pub include_dirs: Vec<PathBuf>,
    /// Constants made visible to the source before its own definitions.
    pub constants: HashMap<String, i128>,
    /// Labels made visible to the source before its own definitions.
    pub labels: HashMap<String, i128>,
}

/// The result of a successful assembly: the binary image plus the final
/// symbol environment for callers that want to introspect it.
#[derive(Debug, Clone)]
pub struct Assembly {
    pub binary: Vec<u8>,
    pub constants: HashMap<String, i128>,
    pub labels: HashMap<String, i128>,
}

/// Assemble a source file into a raw binary.
pub fn assemble<F: FileReader>(
    source_path: &Path,
    options: &AssembleOptions,
    reader: &F,
) -> Result<Assembly> {
    let lines = reader::read_source(source_path, &options.include_dirs, reader)
        .context("Failed during source reading stage")?;
    assemble_lines(lines, options, reader)
}

/// Assemble an in-memory source string into a raw binary.
pub fn assemble_str<F: FileReader>(
    source: &str,
    options: &AssembleOptions,
    reader: &F,
) -> Result<Assembly> {
    let lines = reader::read_string(source, &options.include_dirs, reader)
        .context("Failed during source reading stage")?;
    assemble_lines(lines, options, reader)
}

fn assemble_lines<F: FileReader>(
    lines: Vec<Line>,
    options: &AssembleOptions,
    reader: &F,
) -> Result<Assembly> {
    let tokens = lines
        .into_iter()
        .map(lexer::lex_tokens)
        .collect::<Result<Vec<LineTokens>, _>>()
        .context("Failed during lexing stage")?;
    let items = parser::parse_items(&tokens).context("Failed during parsing stage")?;

    let mut env = Environment::new();
    env.constants.extend(options.constants.clone());
    env.labels.extend(options.labels.clone());

    // the fixed resolver sequence; each pass consumes the item list and
    // may adjust the environment
    let items = assembler::resolve_constants(items, &mut env)
        .context("Failed while resolving constants")?;
    let items =
        assembler::resolve_labels(items, &mut env).context("Failed while resolving labels")?;
    let mut items = assembler::resolve_register_aliases(items, &env);
    if options.compress {
        items = compression::transform_compressible(items, &mut env);
    }
    let items = pseudo::transform_pseudo_instructions(items, &mut env)
        .context("Failed while expanding pseudo-instructions")?;
    let mut items = assembler::resolve_register_aliases(items, &env);
    if options.compress {
        items = compression::transform_compressible(items, &mut env);
    }
    let items = assembler::resolve_aligns(items, &mut env);
    let items = assembler::resolve_immediates(items, &env)
        .context("Failed while resolving immediates")?;
    let items =
        assembler::resolve_instructions(items).context("Failed while encoding instructions")?;
    let items = data::resolve_strings(items);
    let items = data::resolve_sequences(items).context("Failed while encoding sequences")?;
    let items =
        data::transform_shorthand_packs(items).context("Failed while expanding shorthand packs")?;
    let items = data::resolve_packs(items).context("Failed while encoding packs")?;
    let items = assembler::resolve_include_bytes(items, reader)
        .context("Failed while splicing binary includes")?;
    let binary = assembler::resolve_blobs(items).context("Failed during final concatenation")?;

    Ok(Assembly {
        binary,
        constants: env.constants,
        labels: env.labels,
    })
}
