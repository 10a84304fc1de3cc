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

use anyhow::{bail, Context, Result};
use std::collections::BTreeMap;
use std::fmt::{self, Write as _};
use std::path::Path;
use stf_core::definition::resource_type;
use stf_core::{StfDefinition, StfFile};
use stf_telemetry::ReportSummary;

fn load(path: &Path) -> Result<(StfFile, StfDefinition)> {
    let file = StfFile::read_from(path).with_context(|| format!("reading {}", path.display()))?;
    let definition = StfDefinition::from_slice(&file.definition)
        .with_context(|| format!("parsing the definition of {}", path.display()))?;
    log::debug!(
        "Loaded {} ({} resources)",
        path.display(),
        definition.resources.len()
    );
    Ok((file, definition))
}

/// Counts resources per type tag.
fn type_histogram(definition: &StfDefinition) -> BTreeMap<&str, usize> {
    let mut histogram = BTreeMap::new();
    for value in definition.resources.values() {
        let stf_type = value
            .as_object()
            .and_then(resource_type)
            .unwrap_or("<untyped>");
        *histogram.entry(stf_type).or_default() += 1;
    }
    histogram
}

fn render_info(file: &StfFile, definition: &StfDefinition) -> Result<String, fmt::Error> {
    let meta = &definition.stf;
    let mut out = String::new();
    writeln!(out, "container   {}.{}", file.version_major, file.version_minor)?;
    writeln!(out, "definition  {}.{}", meta.version_major, meta.version_minor)?;
    writeln!(out, "root        {}", meta.root)?;
    if !meta.generator.is_empty() {
        writeln!(out, "generator   {} {}", meta.generator, meta.generator_version)?;
    }
    if !meta.timestamp.is_empty() {
        writeln!(out, "timestamp   {}", meta.timestamp)?;
    }
    if !meta.profiles.is_empty() {
        writeln!(out, "profiles    {}", meta.profiles.join(", "))?;
    }
    writeln!(out, "json        {} bytes", file.definition.len())?;
    writeln!(out, "buffers     {}", file.buffers.len())?;
    for (index, buffer) in file.buffers.iter().enumerate() {
        writeln!(out, "  [{index}] {} bytes", buffer.len())?;
    }
    writeln!(out, "resources   {}", definition.resources.len())?;
    for (stf_type, count) in type_histogram(definition) {
        writeln!(out, "  {count:>4}  {stf_type}")?;
    }
    Ok(out)
}

fn render_deps(definition: &StfDefinition, id: &str) -> Result<String> {
    if !definition.resources.contains_key(id) {
        bail!("resource '{id}' is not defined");
    }
    let deps = definition.dependencies_of(id);
    let mut out = String::new();
    writeln!(
        out,
        "{id}: {} resources, {} buffers",
        deps.resources.len(),
        deps.buffers.len()
    )?;
    for resource_id in &deps.resources {
        let stf_type = definition
            .resource(resource_id)
            .and_then(resource_type)
            .unwrap_or("<missing>");
        writeln!(out, "  resource {resource_id} ({stf_type})")?;
    }
    for buffer_id in &deps.buffers {
        writeln!(out, "  buffer   {buffer_id}")?;
    }
    Ok(out)
}

/// `info <file>`
pub fn info(path: &Path) -> Result<()> {
    let (file, definition) = load(path)?;
    print!("{}", render_info(&file, &definition)?);
    Ok(())
}

/// `dump <file> [-o out.json]`
pub fn dump(path: &Path, output: Option<&Path>) -> Result<()> {
    let (_, definition) = load(path)?;
    let json = definition.to_pretty_json()?;
    match output {
        Some(output) => {
            std::fs::write(output, json)
                .with_context(|| format!("writing {}", output.display()))?;
            log::info!("Wrote definition to {}", output.display());
        }
        None => println!("{json}"),
    }
    Ok(())
}

/// `deps <file> <id>`
pub fn deps(path: &Path, id: &str) -> Result<()> {
    let (_, definition) = load(path)?;
    print!("{}", render_deps(&definition, id)?);
    Ok(())
}

/// `validate <file>`
pub fn validate(path: &Path) -> Result<()> {
    let (file, definition) = load(path)?;
    let problems = definition.validate_references(file.buffers.len());
    for problem in &problems {
        println!("{problem}");
    }
    let summary = ReportSummary::from_reports(&problems);
    if !problems.is_empty() {
        bail!("{}: {summary}", path.display());
    }
    println!("{}: ok", path.display());
    Ok(())
}
