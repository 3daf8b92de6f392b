// Copyright (c) Ken Kocienda and other contributors.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! Serialisable summary of a finished build.
//!
//! Records are sorted by full name so the same inputs always produce the
//! same bytes.

use serde::Serialize;

use tugdoc_core::diagnostics::Diagnostic;
use tugdoc_core::output::SCHEMA_VERSION;
use tugdoc_python::{
    Entity, EntityKind, EntityType, PostProcessSummary, ProcessingState, System,
};

/// Response of `tugdoc build`.
#[derive(Debug, Clone, Serialize)]
pub struct BuildReport {
    /// Status: "ok".
    pub status: String,
    pub schema_version: String,
    pub modules: Vec<ModuleRecord>,
    pub entities: Vec<EntityRecord>,
    pub post_process: PostProcessSummary,
    /// Diagnostics at or below the configured verbosity.
    pub diagnostics: Vec<Diagnostic>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ModuleRecord {
    pub name: String,
    pub state: ProcessingState,
    pub is_package: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub all: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub docformat: Option<String>,
}

/// One non-module entity.
#[derive(Debug, Clone, Serialize)]
pub struct EntityRecord {
    pub full_name: String,
    #[serde(rename = "type")]
    pub entity_type: EntityType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<EntityKind>,
    pub line: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub docstring: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub bases: Vec<String>,
    /// Parallel to `bases`; `None` where the base stayed unresolved.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub resolved_bases: Vec<Option<String>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub subclasses: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mro: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
    #[serde(skip_serializing_if = "is_zero")]
    pub overloads: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub annotation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub extra_info: Vec<String>,
}

fn is_zero(n: &usize) -> bool {
    *n == 0
}

impl BuildReport {
    /// Summarize a post-processed system.
    pub fn from_system(system: &System, post_process: PostProcessSummary) -> Self {
        let mut modules = Vec::new();
        let mut entities = Vec::new();
        for entity in system.entities() {
            match entity.as_module() {
                Some(data) => modules.push(ModuleRecord {
                    name: system.full_name(entity.id()),
                    state: data.state,
                    is_package: data.is_package,
                    all: data.all.clone(),
                    docformat: data.docformat.clone(),
                }),
                None => entities.push(EntityRecord::new(system, entity)),
            }
        }
        modules.sort_by(|a, b| a.name.cmp(&b.name));
        entities.sort_by(|a, b| a.full_name.cmp(&b.full_name));

        BuildReport {
            status: "ok".to_string(),
            schema_version: SCHEMA_VERSION.to_string(),
            modules,
            entities,
            post_process,
            diagnostics: system.diagnostics().visible().cloned().collect(),
        }
    }

    pub fn entity(&self, full_name: &str) -> Option<&EntityRecord> {
        self.entities.iter().find(|e| e.full_name == full_name)
    }

    pub fn module(&self, name: &str) -> Option<&ModuleRecord> {
        self.modules.iter().find(|m| m.name == name)
    }
}

impl EntityRecord {
    fn new(system: &System, entity: &Entity) -> Self {
        let names = |ids: &[tugdoc_python::EntityId]| -> Vec<String> {
            ids.iter().map(|id| system.full_name(*id)).collect()
        };
        let mut record = EntityRecord {
            full_name: system.full_name(entity.id()),
            entity_type: entity.entity_type(),
            kind: entity.kind,
            line: entity.linenumber,
            docstring: entity.docstring.as_ref().map(|d| d.text.clone()),
            bases: Vec::new(),
            resolved_bases: Vec::new(),
            subclasses: Vec::new(),
            mro: None,
            signature: None,
            overloads: 0,
            annotation: None,
            value: None,
            extra_info: entity.extra_info.clone(),
        };

        if let Some(class) = entity.as_class() {
            record.bases = class.base_names.clone();
            record.resolved_bases = class
                .base_objects
                .iter()
                .map(|slot| slot.resolved().map(|id| system.full_name(id)))
                .collect();
            record.subclasses = names(&class.subclasses);
            record.mro = class.mro.as_deref().map(names);
        } else if let Some(function) = entity.as_function() {
            record.signature = function.signature.as_ref().map(|s| s.to_string());
            record.overloads = function.overloads.len();
        } else if let Some(attribute) = entity.as_attribute() {
            record.annotation = attribute.annotation.as_ref().map(|e| e.to_string());
            record.value = attribute.value.as_ref().map(|e| e.to_string());
        }
        record
    }
}
