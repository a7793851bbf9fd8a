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

use anyhow::{Context, Result};
use clap::Parser as clap_parser;
use rvasm::file_reader::AsmFileReader;
use rvasm::{AssembleOptions, assemble};
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(clap_parser)]
#[clap(version = "0.1.0", about = "Assemble RISC-V (RV32IMAC) source into a flat binary")]
struct Opts {
    /// input source file
    input: PathBuf,
    /// output binary file (defaults to the input with a .bin extension)
    #[clap(short, long)]
    output: Option<PathBuf>,
    /// identify and compress eligible instructions
    #[clap(long)]
    compress: bool,
    /// extra directories to search for include files
    #[clap(short = 'I', long = "include")]
    include_dirs: Vec<PathBuf>,
    /// print the resolved constants and labels
    #[clap(long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let opts = Opts::parse();
    match run(&opts) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            // the root cause carries the file:line: message diagnostic
            eprintln!("{}", e.root_cause());
            ExitCode::FAILURE
        }
    }
}

fn run(opts: &Opts) -> Result<()> {
    let options = AssembleOptions {
        compress: opts.compress,
        include_dirs: opts.include_dirs.clone(),
        ..AssembleOptions::default()
    };

    let reader = AsmFileReader;
    let assembly = assemble(&opts.input, &options, &reader)?;

    if opts.verbose {
        let mut constants: Vec<_> = assembly.constants.iter().collect();
        constants.sort();
        for (name, value) in constants {
            println!("{} = {} (0x{:08x})", name, value, value);
        }
        let mut labels: Vec<_> = assembly.labels.iter().collect();
        labels.sort_by_key(|(_, position)| **position);
        for (name, position) in labels {
            println!("{}: 0x{:08x}", name, position);
        }
    }

    let output = opts
        .output
        .clone()
        .unwrap_or_else(|| opts.input.with_extension("bin"));
    fs::write(&output, &assembly.binary)
        .with_context(|| format!("Failed to write output file: {}", output.display()))?;
    println!(
        "Successfully assembled {} to {}",
        opts.input.display(),
        output.display()
    );

    Ok(())
}
