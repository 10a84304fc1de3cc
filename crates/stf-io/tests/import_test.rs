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

mod common;

use anyhow::Result;
use common::{registry, Node, Scene};
use serde_json::{json, Value};
use std::any::TypeId;
use stf_core::{HostObject, JsonResource, Severity, StfError, StfFile, StfKind, StfResult};
use stf_io::{
    import_scene, ExportContext, ExportOutput, HookOutput, ImportContext, ImportSettings,
    StfModule, StfRegistry,
};

fn container(resources: Value) -> Result<StfFile> {
    let definition = json!({
        "stf": { "version_major": 0, "version_minor": 0, "root": "scene" },
        "resources": resources,
        "buffers": {},
    });
    Ok(StfFile::new(serde_json::to_vec(&definition)?, Vec::new()))
}

fn root_names(scene: &HostObject) -> Vec<String> {
    let scene = scene.downcast_ref::<Scene>().unwrap();
    scene
        .roots
        .lock()
        .unwrap()
        .iter()
        .map(|node| node.name.clone())
        .collect()
}

#[test]
fn test_unknown_type_does_not_block_siblings() -> Result<()> {
    let file = container(json!({
        "scene": { "type": "stf.prefab", "name": "s", "root_nodes": ["a", "holo", "b"] },
        "a": { "type": "stf.node", "name": "a", "children": [] },
        "holo": { "type": "vendor.hologram", "intensity": 3 },
        "b": { "type": "stf.node", "name": "b", "children": [] },
    }))?;

    let outcome = import_scene(&registry(), file, &ImportSettings::default())?;

    assert_eq!(root_names(outcome.root.as_ref().unwrap()), ["a", "b"]);
    assert_eq!(outcome.reports.len(), 1);
    assert_eq!(outcome.reports[0].severity, Severity::Warn);
    assert_eq!(outcome.reports[0].stf_id.as_deref(), Some("holo"));
    assert!(!outcome.imported.contains_key("holo"));
    Ok(())
}

#[test]
fn test_missing_resource_is_fatal() -> Result<()> {
    let file = container(json!({
        "scene": { "type": "stf.prefab", "name": "s", "root_nodes": ["ghost"] },
    }))?;

    let settings = ImportSettings {
        fail_on_severity: Severity::Fatal,
    };
    let err = import_scene(&registry(), file, &settings).unwrap_err();

    assert!(matches!(&err.source, StfError::Aborted(report) if report.severity == Severity::Fatal));
    let last = err.reports.last().unwrap();
    assert_eq!(last.stf_id.as_deref(), Some("ghost"));
    Ok(())
}

#[test]
fn test_dangling_reference_is_reported_before_the_walk() -> Result<()> {
    let file = container(json!({
        "scene": { "type": "stf.prefab", "name": "s", "root_nodes": [], "components": ["gone"] },
    }))?;

    let err = import_scene(&registry(), file, &ImportSettings::default()).unwrap_err();

    let StfError::Aborted(report) = &err.source else {
        panic!("unexpected error: {}", err.source);
    };
    assert_eq!(report.severity, Severity::Error);
    assert!(report.message.contains("undefined resource 'gone'"));
    Ok(())
}

#[test]
fn test_newer_major_version_is_rejected() -> Result<()> {
    let mut file = container(json!({
        "scene": { "type": "stf.prefab", "name": "s", "root_nodes": [] },
    }))?;
    file.version_major = 1;

    let err = import_scene(&registry(), file, &ImportSettings::default()).unwrap_err();

    assert_eq!(err.reports.len(), 1);
    assert!(err.reports[0].message.contains("newer than the supported"));
    Ok(())
}

#[test]
fn test_import_hook_output_reaches_the_module() -> Result<()> {
    let file = container(json!({
        "scene": { "type": "stf.prefab", "name": "s", "root_nodes": ["a", "b"] },
        "a": { "type": "stf.node", "name": "a", "children": [], "highlight": true },
        "b": { "type": "stf.node", "name": "b", "children": [] },
    }))?;

    let outcome = import_scene(&registry(), file, &ImportSettings::default())?;

    let highlighted = |id: &str| {
        let node = outcome.imported[id].downcast_ref::<Node>().unwrap();
        let flag = *node.highlighted.lock().unwrap();
        flag
    };
    assert!(highlighted("a"));
    assert!(!highlighted("b"));
    assert!(outcome.imported.contains_key("a#highlight"));
    assert!(!outcome.imported.contains_key("b#highlight"));
    Ok(())
}

#[test]
fn test_shared_references_import_once() -> Result<()> {
    let file = container(json!({
        "scene": { "type": "stf.prefab", "name": "s", "root_nodes": ["a", "a"] },
        "a": { "type": "stf.node", "name": "a", "children": [] },
    }))?;

    let outcome = import_scene(&registry(), file, &ImportSettings::default())?;
    let scene = outcome.root.unwrap();
    let scene = scene.downcast_ref::<Scene>().unwrap();
    let roots = scene.roots.lock().unwrap();

    assert_eq!(roots.len(), 2);
    assert!(std::sync::Arc::ptr_eq(&roots[0], &roots[1]));
    Ok(())
}

struct FancyMesh;

struct AliasedMeshModule;

impl StfModule for AliasedMeshModule {
    fn stf_type(&self) -> &str {
        "x.mesh"
    }

    fn kind(&self) -> StfKind {
        StfKind::Data
    }

    fn like_types(&self) -> Vec<String> {
        vec!["mesh".to_string()]
    }

    fn understood_types(&self) -> Vec<TypeId> {
        vec![TypeId::of::<FancyMesh>()]
    }

    fn import(
        &self,
        _ctx: &mut ImportContext<'_>,
        _resource: &JsonResource,
        _id: &str,
        _parent: Option<&HostObject>,
        _hooks: &[HookOutput],
    ) -> StfResult<Option<HostObject>> {
        Ok(Some(HostObject::new(FancyMesh)))
    }

    fn export(
        &self,
        _ctx: &mut ExportContext<'_>,
        _object: &HostObject,
        _parent: Option<&HostObject>,
    ) -> StfResult<Option<ExportOutput>> {
        Ok(None)
    }
}

#[test]
fn test_like_alias_is_not_used_for_dispatch() -> Result<()> {
    let registry = StfRegistry::builder().with_module(AliasedMeshModule).build();
    let file = container(json!({
        "scene": { "type": "custom.fancy_mesh", "like_types": ["mesh"] },
    }))?;

    let outcome = import_scene(&registry, file, &ImportSettings::default())?;

    assert!(outcome.root.is_none());
    assert_eq!(outcome.reports.len(), 1);
    assert_eq!(outcome.reports[0].severity, Severity::Warn);
    assert_eq!(outcome.reports[0].stf_type.as_deref(), Some("custom.fancy_mesh"));

    // The alias is declared, and only exact tags resolve.
    assert_eq!(registry.modules_like("mesh").count(), 1);
    assert!(registry.import_module("x.mesh").is_some());
    assert!(registry.import_module("custom.fancy_mesh").is_none());
    Ok(())
}
