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

//! Top-level entry points running a whole export or import.
//!
//! Both drivers own their run state, so the accumulated reports are handed
//! back to the caller whether the run succeeds or aborts.

use crate::{
    export::{ExportContext, ExportState},
    import::{ImportContext, ImportState},
    registry::StfRegistry,
    settings::{ExportSettings, ImportSettings},
};
use std::collections::HashMap;
use stf_core::{
    container::STF_VERSION_MAJOR, HostObject, Severity, StfDefinition, StfError, StfFile,
    StfReport, StfResult,
};

/// A failed run, with every report recorded up to the failure.
#[derive(Debug, thiserror::Error)]
#[error("{source}")]
pub struct RunError {
    /// What stopped the run.
    #[source]
    pub source: StfError,
    /// The reports recorded before and including the aborting one.
    pub reports: Vec<StfReport>,
}

/// The result of a successful export.
#[derive(Debug)]
pub struct ExportOutcome {
    /// The packed container.
    pub file: StfFile,
    /// The ID of the root resource.
    pub root_id: String,
    /// Every report below the abort threshold.
    pub reports: Vec<StfReport>,
}

impl ExportOutcome {
    /// Parses the definition back out of the packed container.
    pub fn definition(&self) -> StfResult<StfDefinition> {
        Ok(StfDefinition::from_slice(&self.file.definition)?)
    }
}

/// The result of a successful import.
#[derive(Debug)]
pub struct ImportOutcome {
    /// The reconstructed root object, `None` if its type is unknown.
    pub root: Option<HostObject>,
    /// The declared root ID.
    pub root_id: String,
    /// Every report below the abort threshold.
    pub reports: Vec<StfReport>,
    /// Every reconstructed object, by resource ID.
    pub imported: HashMap<String, HostObject>,
}

/// Exports the graph reachable from `root` into a container.
///
/// # Errors
/// Fails when a report crosses `settings.fail_on_severity`, when a module
/// fails with an error, or when no resource at all was produced.
pub fn export_scene(
    registry: &StfRegistry,
    root: &HostObject,
    settings: &ExportSettings,
) -> Result<ExportOutcome, RunError> {
    log::info!("Exporting {}", root.type_name());
    let mut state = ExportState::new(settings.clone());

    match walk_export(&mut state, registry, root) {
        Ok(file) => {
            let root_id = state.root_id().unwrap_or_default().to_string();
            Ok(ExportOutcome {
                file,
                root_id,
                reports: state.into_reports(),
            })
        }
        Err(source) => Err(RunError {
            source,
            reports: state.into_reports(),
        }),
    }
}

fn walk_export(
    state: &mut ExportState,
    registry: &StfRegistry,
    root: &HostObject,
) -> StfResult<StfFile> {
    let mut ctx = ExportContext::new(state, registry);
    ctx.serialize_resource(Some(root))?;
    ctx.run_tasks()?;
    state.take_file()
}

/// Imports a container, starting at its declared root.
///
/// # Errors
/// Fails when the definition is not valid JSON, when a report crosses
/// `settings.fail_on_severity`, or on any Fatal condition.
pub fn import_scene(
    registry: &StfRegistry,
    file: StfFile,
    settings: &ImportSettings,
) -> Result<ImportOutcome, RunError> {
    let definition = StfDefinition::from_slice(&file.definition).map_err(|err| RunError {
        source: err.into(),
        reports: Vec::new(),
    })?;
    log::info!(
        "Importing '{}' ({} resources, {} buffers)",
        definition.stf.root,
        definition.resources.len(),
        file.buffers.len()
    );

    let container_version = (file.version_major, file.version_minor);
    let mut state = ImportState::new(definition, file.buffers, settings.fail_on_severity);

    match walk_import(&mut state, registry, container_version) {
        Ok(root) => {
            let root_id = state.root_id().to_string();
            let (imported, reports) = state.into_parts();
            Ok(ImportOutcome {
                root,
                root_id,
                reports,
                imported,
            })
        }
        Err(source) => Err(RunError {
            source,
            reports: state.into_parts().1,
        }),
    }
}

fn walk_import(
    state: &mut ImportState,
    registry: &StfRegistry,
    (major, minor): (u32, u32),
) -> StfResult<Option<HostObject>> {
    if major > STF_VERSION_MAJOR {
        state.report(StfReport::new(
            Severity::Error,
            format!("container version {major}.{minor} is newer than the supported {STF_VERSION_MAJOR}.x"),
        ))?;
    }
    let meta = &state.definition().stf;
    if (meta.version_major, meta.version_minor) != (major, minor) {
        let message = format!(
            "definition declares version {}.{} but the container is {major}.{minor}",
            meta.version_major, meta.version_minor
        );
        state.report(StfReport::new(Severity::Warn, message))?;
    }

    let problems = state.definition().validate_references(state.buffer_count());
    for problem in problems {
        state.report(problem)?;
    }

    let root_id = state.root_id().to_string();
    let mut ctx = ImportContext::new(state, registry);
    let root = ctx.import_resource(&root_id)?;
    ctx.run_tasks()?;
    Ok(root)
}
