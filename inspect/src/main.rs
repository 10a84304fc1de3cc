// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

// Inspection tool for STF containers
// Run with: stf-inspect <command> <file>

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about = "Inspect STF containers")]
struct Cli {
    /// Default log filter, overridden by RUST_LOG
    #[arg(long, default_value = "warn")]
    log: String,
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the container header and a resource overview
    Info { file: PathBuf },
    /// Pretty-print the JSON definition
    Dump {
        file: PathBuf,
        /// Write to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// List every resource and buffer a resource transitively pulls in
    Deps { file: PathBuf, id: String },
    /// Check that every reference in the definition resolves
    Validate { file: PathBuf },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    stf_telemetry::init_logging(&cli.log);

    match cli.cmd {
        Command::Info { file } => commands::info(&file),
        Command::Dump { file, output } => commands::dump(&file, output.as_deref()),
        Command::Deps { file, id } => commands::deps(&file, &id),
        Command::Validate { file } => commands::validate(&file),
    }
}
