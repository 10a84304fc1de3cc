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

//! A small scene model with its modules and hooks, shared by the integration tests.

#![allow(dead_code)]

use serde_json::{json, Value};
use std::any::TypeId;
use std::sync::{Arc, Mutex, Weak};
use stf_core::definition::{id_list, new_resource, resource_type, COMPONENTS};
use stf_core::{new_id, HostObject, JsonResource, StfKind, StfResult};
use stf_io::{
    ExportContext, ExportHook, ExportOutput, HookMatch, HookOutput, ImportContext, ImportHook,
    Registration, StfModule, StfRegistry,
};

pub struct Scene {
    pub name: String,
    pub roots: Mutex<Vec<Arc<Node>>>,
}

pub struct Node {
    pub name: String,
    pub children: Mutex<Vec<Arc<Node>>>,
    pub parent: Mutex<Weak<Node>>,
    pub mesh: Mutex<Option<Arc<Mesh>>>,
    pub tags: Mutex<Vec<Arc<Tag>>>,
    pub highlighted: Mutex<bool>,
}

impl Node {
    pub fn new(name: &str) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            children: Mutex::new(Vec::new()),
            parent: Mutex::new(Weak::new()),
            mesh: Mutex::new(None),
            tags: Mutex::new(Vec::new()),
            highlighted: Mutex::new(false),
        })
    }

    pub fn add_child(self: &Arc<Self>, child: Arc<Node>) {
        *child.parent.lock().unwrap() = Arc::downgrade(self);
        self.children.lock().unwrap().push(child);
    }

    pub fn child_names(&self) -> Vec<String> {
        self.children
            .lock()
            .unwrap()
            .iter()
            .map(|child| child.name.clone())
            .collect()
    }
}

pub struct Mesh {
    pub name: String,
    pub positions: Vec<[f32; 3]>,
}

pub struct Tag {
    pub label: String,
}

/// Marker produced by [`HighlightHook`] on import.
pub struct Highlight;

/// Builds `scene -> root -> {arm, leg}` where both limbs share one mesh.
pub fn sample_scene() -> Arc<Scene> {
    let cube = Arc::new(Mesh {
        name: "cube".to_string(),
        positions: vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.5]],
    });

    let root = Node::new("root");
    root.tags.lock().unwrap().push(Arc::new(Tag {
        label: "player".to_string(),
    }));

    let arm = Node::new("arm");
    *arm.mesh.lock().unwrap() = Some(cube.clone());
    *arm.highlighted.lock().unwrap() = true;
    let leg = Node::new("leg");
    *leg.mesh.lock().unwrap() = Some(cube);

    root.add_child(arm);
    root.add_child(leg);

    Arc::new(Scene {
        name: "level".to_string(),
        roots: Mutex::new(vec![root]),
    })
}

pub fn registrations() -> Vec<Registration> {
    vec![
        Registration::module(SceneModule),
        Registration::module(NodeModule),
        Registration::module(MeshModule),
        Registration::module(TagModule),
        Registration::export_hook(MeshStatsHook),
        Registration::import_hook(HighlightHook),
    ]
}

pub fn registry() -> StfRegistry {
    StfRegistry::builder().register(registrations()).build()
}

fn str_field<'r>(resource: &'r JsonResource, key: &str) -> &'r str {
    resource.get(key).and_then(Value::as_str).unwrap_or_default()
}

fn push_id(resource: &mut JsonResource, key: &str, id: String) {
    if let Some(Value::Array(ids)) = resource.get_mut(key) {
        ids.push(Value::String(id));
    }
}

pub struct SceneModule;

impl StfModule for SceneModule {
    fn stf_type(&self) -> &str {
        "stf.prefab"
    }

    fn kind(&self) -> StfKind {
        StfKind::Data
    }

    fn understood_types(&self) -> Vec<TypeId> {
        vec![TypeId::of::<Scene>()]
    }

    fn import(
        &self,
        ctx: &mut ImportContext<'_>,
        resource: &JsonResource,
        _id: &str,
        _parent: Option<&HostObject>,
        _hooks: &[HookOutput],
    ) -> StfResult<Option<HostObject>> {
        let scene = Arc::new(Scene {
            name: str_field(resource, "name").to_string(),
            roots: Mutex::new(Vec::new()),
        });
        let object = HostObject::from_arc(scene.clone());

        for node_id in id_list(resource, "root_nodes") {
            let imported = ctx.with_parent(object.clone()).import_resource(node_id)?;
            if let Some(node) = imported.and_then(|node| node.downcast_arc::<Node>()) {
                scene.roots.lock().unwrap().push(node);
            }
        }
        Ok(Some(object))
    }

    fn export(
        &self,
        ctx: &mut ExportContext<'_>,
        object: &HostObject,
        _parent: Option<&HostObject>,
    ) -> StfResult<Option<ExportOutput>> {
        let Some(scene) = object.downcast_arc::<Scene>() else {
            return Ok(None);
        };
        let id = new_id();
        let mut resource = new_resource("stf.prefab");
        resource.insert("name".into(), json!(scene.name));
        resource.insert("root_nodes".into(), json!([]));

        // Registered first so the prefab is the root of the file.
        let prefab_id = id.clone();
        ctx.add_task(move |ctx| {
            let roots = scene.roots.lock().unwrap().clone();
            for node in roots {
                let node = HostObject::from_arc(node);
                if let Some(node_id) = ctx.serialize_resource(Some(&node))? {
                    if let Some(prefab) = ctx.resource_mut(&prefab_id) {
                        push_id(prefab, "root_nodes", node_id);
                    }
                }
            }
            Ok(())
        });

        Ok(Some(ExportOutput::new(id, resource)))
    }
}

pub struct NodeModule;

impl StfModule for NodeModule {
    fn stf_type(&self) -> &str {
        "stf.node"
    }

    fn kind(&self) -> StfKind {
        StfKind::Node
    }

    fn understood_types(&self) -> Vec<TypeId> {
        vec![TypeId::of::<Node>()]
    }

    fn import(
        &self,
        ctx: &mut ImportContext<'_>,
        resource: &JsonResource,
        _id: &str,
        _parent: Option<&HostObject>,
        hooks: &[HookOutput],
    ) -> StfResult<Option<HostObject>> {
        let node = Node::new(str_field(resource, "name"));
        let object = HostObject::from_arc(node.clone());
        *node.highlighted.lock().unwrap() = hooks.iter().any(|hook| hook.object.is::<Highlight>());

        for child_id in id_list(resource, "children") {
            let imported = ctx.with_parent(object.clone()).import_resource(child_id)?;
            if let Some(child) = imported.and_then(|child| child.downcast_arc::<Node>()) {
                node.children.lock().unwrap().push(child);
            }
        }

        if let Some(mesh_id) = resource.get("mesh").and_then(Value::as_str) {
            let mesh = ctx.import_resource(mesh_id)?;
            *node.mesh.lock().unwrap() = mesh.and_then(|mesh| mesh.downcast_arc::<Mesh>());
        }

        for component_id in id_list(resource, COMPONENTS) {
            let is_tag = ctx
                .get_json_resource(component_id)
                .and_then(resource_type)
                .is_some_and(|stf_type| stf_type == "demo.tag");
            if !is_tag {
                continue;
            }
            let imported = ctx.with_parent(object.clone()).import_resource(component_id)?;
            if let Some(tag) = imported.and_then(|tag| tag.downcast_arc::<Tag>()) {
                node.tags.lock().unwrap().push(tag);
            }
        }

        if let Some(parent_id) = resource.get("parent").and_then(Value::as_str) {
            let parent_id = parent_id.to_string();
            let child = node.clone();
            ctx.add_task(move |ctx| {
                let parent = ctx
                    .imported_object(&parent_id)
                    .and_then(|parent| parent.downcast_arc::<Node>());
                if let Some(parent) = parent {
                    *child.parent.lock().unwrap() = Arc::downgrade(&parent);
                }
                Ok(())
            });
        }

        Ok(Some(object))
    }

    fn export(
        &self,
        ctx: &mut ExportContext<'_>,
        object: &HostObject,
        _parent: Option<&HostObject>,
    ) -> StfResult<Option<ExportOutput>> {
        let Some(node) = object.downcast_arc::<Node>() else {
            return Ok(None);
        };
        let id = new_id();
        let mut nested = ctx.resource_context(object.clone());

        let mut children = Vec::new();
        let child_nodes = node.children.lock().unwrap().clone();
        for child in child_nodes {
            if let Some(child_id) = nested.serialize_resource(Some(&HostObject::from_arc(child)))? {
                children.push(child_id);
            }
        }

        let mut resource = new_resource("stf.node");
        resource.insert("name".into(), json!(node.name));
        resource.insert("children".into(), json!(children));

        let mesh = node.mesh.lock().unwrap().clone();
        if let Some(mesh) = mesh {
            if let Some(mesh_id) = nested.serialize_resource(Some(&HostObject::from_arc(mesh)))? {
                resource.insert("mesh".into(), json!(mesh_id));
            }
        }
        if *node.highlighted.lock().unwrap() {
            resource.insert("highlight".into(), json!(true));
        }

        // The parent is still being exported, its ID is only known after the walk.
        let parent = node.parent.lock().unwrap().upgrade();
        if let Some(parent) = parent {
            let parent = HostObject::from_arc(parent);
            let node_id = id.clone();
            nested.add_task(move |ctx| {
                let parent_id = ctx.get_resource_id(&parent);
                if let (Some(parent_id), Some(resource)) = (parent_id, ctx.resource_mut(&node_id)) {
                    resource.insert("parent".into(), json!(parent_id));
                }
                Ok(())
            });
        }

        Ok(Some(nested.finish(id, resource)))
    }

    fn components(&self, object: &HostObject) -> Vec<HostObject> {
        object
            .downcast_ref::<Node>()
            .map(|node| {
                node.tags
                    .lock()
                    .unwrap()
                    .iter()
                    .cloned()
                    .map(HostObject::from_arc)
                    .collect()
            })
            .unwrap_or_default()
    }
}

pub struct MeshModule;

impl StfModule for MeshModule {
    fn stf_type(&self) -> &str {
        "stf.mesh"
    }

    fn kind(&self) -> StfKind {
        StfKind::Data
    }

    fn understood_types(&self) -> Vec<TypeId> {
        vec![TypeId::of::<Mesh>()]
    }

    fn import(
        &self,
        ctx: &mut ImportContext<'_>,
        resource: &JsonResource,
        _id: &str,
        _parent: Option<&HostObject>,
        _hooks: &[HookOutput],
    ) -> StfResult<Option<HostObject>> {
        let buffer_id = str_field(resource, "positions").to_string();
        let Some(bytes) = ctx.import_buffer(&buffer_id)?.map(<[u8]>::to_vec) else {
            return Ok(None);
        };
        let positions = bytes
            .chunks_exact(std::mem::size_of::<[f32; 3]>())
            .map(bytemuck::pod_read_unaligned::<[f32; 3]>)
            .collect();

        Ok(Some(HostObject::new(Mesh {
            name: str_field(resource, "name").to_string(),
            positions,
        })))
    }

    fn export(
        &self,
        ctx: &mut ExportContext<'_>,
        object: &HostObject,
        _parent: Option<&HostObject>,
    ) -> StfResult<Option<ExportOutput>> {
        let Some(mesh) = object.downcast_ref::<Mesh>() else {
            return Ok(None);
        };
        let mut nested = ctx.resource_context(object.clone());
        let buffer_id = nested.serialize_buffer(bytemuck::cast_slice(&mesh.positions).to_vec());

        let mut resource = new_resource("stf.mesh");
        resource.insert("name".into(), json!(mesh.name));
        resource.insert("positions".into(), json!(buffer_id));
        resource.insert("vertex_count".into(), json!(mesh.positions.len()));

        Ok(Some(nested.finish(new_id(), resource)))
    }
}

pub struct TagModule;

impl StfModule for TagModule {
    fn stf_type(&self) -> &str {
        "demo.tag"
    }

    fn kind(&self) -> StfKind {
        StfKind::Component
    }

    fn understood_types(&self) -> Vec<TypeId> {
        vec![TypeId::of::<Tag>()]
    }

    fn import(
        &self,
        _ctx: &mut ImportContext<'_>,
        resource: &JsonResource,
        _id: &str,
        _parent: Option<&HostObject>,
        _hooks: &[HookOutput],
    ) -> StfResult<Option<HostObject>> {
        Ok(Some(HostObject::new(Tag {
            label: str_field(resource, "label").to_string(),
        })))
    }

    fn export(
        &self,
        _ctx: &mut ExportContext<'_>,
        object: &HostObject,
        _parent: Option<&HostObject>,
    ) -> StfResult<Option<ExportOutput>> {
        let Some(tag) = object.downcast_ref::<Tag>() else {
            return Ok(None);
        };
        let mut resource = new_resource("demo.tag");
        resource.insert("label".into(), json!(tag.label));
        Ok(Some(ExportOutput::new(new_id(), resource)))
    }
}

/// Attaches a vertex count summary to every exported mesh.
pub struct MeshStatsHook;

impl ExportHook for MeshStatsHook {
    fn stf_type(&self) -> &str {
        "demo.mesh_stats"
    }

    fn kind(&self) -> StfKind {
        StfKind::Component
    }

    fn target_types(&self) -> Vec<TypeId> {
        vec![TypeId::of::<Mesh>()]
    }

    fn can_handle(&self, object: &HostObject) -> Option<Vec<HostObject>> {
        object.is::<Mesh>().then(|| vec![object.clone()])
    }

    fn export(
        &self,
        _ctx: &mut ExportContext<'_>,
        object: &HostObject,
        _parent: Option<&HostObject>,
    ) -> StfResult<Option<ExportOutput>> {
        let Some(mesh) = object.downcast_ref::<Mesh>() else {
            return Ok(None);
        };
        let mut resource = new_resource("demo.mesh_stats");
        resource.insert("vertex_count".into(), json!(mesh.positions.len()));
        Ok(Some(ExportOutput::new(new_id(), resource)))
    }
}

/// Turns the `highlight` flag of node resources into a [`Highlight`] marker.
pub struct HighlightHook;

impl ImportHook for HighlightHook {
    fn stf_type(&self) -> &str {
        "demo.highlight"
    }

    fn target_stf_types(&self) -> Vec<String> {
        vec!["stf.node".to_string()]
    }

    fn can_handle(&self, resource: &JsonResource, id: &str) -> Option<HookMatch> {
        let highlighted = resource.get("highlight").and_then(Value::as_bool) == Some(true);
        highlighted.then(|| HookMatch {
            id: format!("{id}#highlight"),
            resource: resource.clone(),
        })
    }

    fn import(
        &self,
        _ctx: &mut ImportContext<'_>,
        _resource: &JsonResource,
        _id: &str,
        _parent: Option<&HostObject>,
    ) -> StfResult<Option<HostObject>> {
        Ok(Some(HostObject::new(Highlight)))
    }
}

/// Every resource of the given type in `definition`, as `(id, resource)`.
pub fn resources_of_type<'d>(
    definition: &'d stf_core::StfDefinition,
    stf_type: &'d str,
) -> impl Iterator<Item = (&'d str, &'d JsonResource)> + 'd {
    definition.resources.iter().filter_map(move |(id, value)| {
        let resource = value.as_object()?;
        (resource_type(resource) == Some(stf_type)).then_some((id.as_str(), resource))
    })
}
