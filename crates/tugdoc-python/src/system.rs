// Copyright (c) Ken Kocienda and other contributors.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! The registry: owner of every entity in the graph.
//!
//! `System` stores entities in an arena and indexes them by fully-qualified
//! name. It is the join point the builder, the resolver and the
//! post-processor all read and write.
//!
//! # Registration
//!
//! Every entity is reachable two ways: through its parent's [`Contents`]
//! table and through the full-name index. The two are kept in lock step:
//! an entity is always bound in its parent's table under its own `name`, and
//! the index maps the name derived from that chain back to it.
//!
//! # Duplicates
//!
//! Registering a second entity under an occupied full name never fails. One
//! of the two (chosen by [`DuplicatePolicy`]) keeps the canonical name; the
//! other is renamed `"<name> <n>"` with the smallest free `n`, together with
//! its subtree, and a verbose-only diagnostic is reported.
//!
//! [`Contents`]: crate::model::Contents

use std::collections::HashMap;
use std::sync::Arc;

use thiserror::Error;
use tugdoc_core::diagnostics::{Diagnostic, DiagnosticCollector};

use crate::classify::TypeAliasExt;
use crate::exprs::clean_docstring;
use crate::extensions::VisitorExt;
use crate::model::{
    AttributeData, ClassData, Docstring, Entity, EntityData, EntityId, EntityKind, EntityType,
    FunctionData, ModuleData, ProcessingState,
};
use crate::options::{BuilderOptions, DuplicatePolicy};

// ============================================================================
// Errors
// ============================================================================

/// Misuse of the registry API.
///
/// Anomalies in analyzed source are never errors; they are reported as
/// diagnostics. These errors mean the caller drove the system incorrectly.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("module '{name}' is already registered")]
    DuplicateModule { name: String },

    #[error("parent package '{parent}' of module '{name}' is not registered")]
    MissingParentPackage { name: String, parent: String },

    #[error("'{parent}' is not a package, cannot hold module '{name}'")]
    NotAPackage { name: String, parent: String },

    #[error("{id} is not a module")]
    NotAModule { id: EntityId },

    #[error("module '{name}' was already built (state: {state})")]
    AlreadyBuilt {
        name: String,
        state: ProcessingState,
    },

    #[error("cannot post-process while modules are pending: {}", .pending.join(", "))]
    ModulesPending { pending: Vec<String> },

    #[error("cannot move '{name}': {reason}")]
    CannotReparent { name: String, reason: String },
}

pub type BuildResult<T> = Result<T, BuildError>;

// ============================================================================
// System
// ============================================================================

/// The object graph.
pub struct System {
    entities: Vec<Entity>,
    all_objects: HashMap<String, EntityId>,
    root_modules: Vec<EntityId>,
    options: BuilderOptions,
    diagnostics: DiagnosticCollector,
    extensions: Vec<Arc<dyn VisitorExt>>,
}

impl Default for System {
    fn default() -> Self {
        System::new(BuilderOptions::default())
    }
}

impl std::fmt::Debug for System {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("System")
            .field("entities", &self.entities.len())
            .field("root_modules", &self.root_modules)
            .field("diagnostics", &self.diagnostics.len())
            .finish()
    }
}

impl System {
    /// Create an empty system. The type-alias extension is registered by
    /// default.
    pub fn new(options: BuilderOptions) -> Self {
        let diagnostics = DiagnosticCollector::new(options.verbosity);
        System {
            entities: Vec::new(),
            all_objects: HashMap::new(),
            root_modules: Vec::new(),
            options,
            diagnostics,
            extensions: vec![Arc::new(TypeAliasExt)],
        }
    }

    pub fn options(&self) -> &BuilderOptions {
        &self.options
    }

    /// Register a visitor extension for subsequent module builds.
    pub fn register_extension(&mut self, ext: Arc<dyn VisitorExt>) {
        self.extensions.push(ext);
    }

    pub(crate) fn extensions(&self) -> Vec<Arc<dyn VisitorExt>> {
        self.extensions.clone()
    }

    // ------------------------------------------------------------------------
    // Read access
    // ------------------------------------------------------------------------

    /// The entity with the given id.
    ///
    /// # Panics
    ///
    /// Panics if `id` was not issued by this system.
    pub fn entity(&self, id: EntityId) -> &Entity {
        &self.entities[id.index()]
    }

    pub(crate) fn entity_mut(&mut self, id: EntityId) -> &mut Entity {
        &mut self.entities[id.index()]
    }

    /// O(1) lookup by fully-qualified name. Does not follow aliases; see
    /// [`System::resolve_full_name`] for that.
    pub fn lookup(&self, full_name: &str) -> Option<EntityId> {
        self.all_objects.get(full_name).copied()
    }

    /// Fully-qualified name, derived from the parent chain.
    pub fn full_name(&self, id: EntityId) -> String {
        let mut parts = vec![self.entity(id).name.as_str()];
        let mut cursor = self.entity(id).parent;
        while let Some(parent) = cursor {
            let entity = self.entity(parent);
            parts.push(entity.name.as_str());
            cursor = entity.parent;
        }
        parts.reverse();
        parts.join(".")
    }

    /// All entities in creation order.
    pub fn entities(&self) -> impl Iterator<Item = &Entity> + '_ {
        self.entities.iter()
    }

    /// Every registered entity of the given runtime type, in creation order.
    ///
    /// Calling it again restarts the sequence.
    pub fn objects_of_type(&self, ty: EntityType) -> impl Iterator<Item = EntityId> + '_ {
        self.entities
            .iter()
            .filter(move |e| e.entity_type() == ty)
            .map(|e| e.id)
    }

    /// Top-level modules and packages in registration order.
    pub fn root_modules(&self) -> &[EntityId] {
        &self.root_modules
    }

    pub fn module_state(&self, id: EntityId) -> Option<ProcessingState> {
        self.entity(id).as_module().map(|m| m.state)
    }

    /// Full names of modules not yet in a terminal state.
    pub fn pending_modules(&self) -> Vec<String> {
        self.objects_of_type(EntityType::Module)
            .filter(|id| !self.module_state(*id).is_some_and(ProcessingState::is_terminal))
            .map(|id| self.full_name(id))
            .collect()
    }

    /// Whether `ancestor` is `id` or one of its parents.
    pub fn is_ancestor(&self, ancestor: EntityId, id: EntityId) -> bool {
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            if current == ancestor {
                return true;
            }
            cursor = self.entity(current).parent;
        }
        false
    }

    // ------------------------------------------------------------------------
    // Diagnostics
    // ------------------------------------------------------------------------

    pub fn diagnostics(&self) -> &DiagnosticCollector {
        &self.diagnostics
    }

    pub fn diagnostics_mut(&mut self) -> &mut DiagnosticCollector {
        &mut self.diagnostics
    }

    /// Report an anomaly attached to `id`.
    ///
    /// The reported line is the entity's line plus `line_offset`.
    pub fn report(
        &mut self,
        id: EntityId,
        message: impl Into<String>,
        section: &str,
        line_offset: i64,
        thresh: i8,
    ) {
        let entity = self.entity(id);
        let line = (i64::from(entity.linenumber) + line_offset).max(0);
        let module = entity
            .module
            .map(|m| self.full_name(m))
            .unwrap_or_else(|| self.full_name(id));
        let diagnostic = Diagnostic::new(
            module,
            self.full_name(id),
            section,
            u32::try_from(line).unwrap_or(u32::MAX),
            message,
        )
        .with_thresh(thresh);
        self.diagnostics.report(diagnostic);
    }

    // ------------------------------------------------------------------------
    // Creation
    // ------------------------------------------------------------------------

    /// Register a module or package under `full_name`.
    ///
    /// Its parent package, if any, must already be registered.
    pub fn add_module(&mut self, full_name: &str, is_package: bool) -> BuildResult<EntityId> {
        if let Some(existing) = self.lookup(full_name) {
            if self.entity(existing).entity_type() == EntityType::Module {
                return Err(BuildError::DuplicateModule {
                    name: full_name.to_string(),
                });
            }
        }
        let (parent, name) = match full_name.rsplit_once('.') {
            Some((parent_name, name)) => {
                let parent = self.lookup(parent_name).ok_or_else(|| {
                    BuildError::MissingParentPackage {
                        name: full_name.to_string(),
                        parent: parent_name.to_string(),
                    }
                })?;
                if !self.entity(parent).as_module().is_some_and(|m| m.is_package) {
                    return Err(BuildError::NotAPackage {
                        name: full_name.to_string(),
                        parent: parent_name.to_string(),
                    });
                }
                (Some(parent), name)
            }
            None => (None, full_name),
        };

        let data = EntityData::Module(ModuleData {
            is_package,
            ..ModuleData::default()
        });
        let id = self.alloc(name, parent, data);
        let entity = self.entity_mut(id);
        entity.module = Some(id);
        entity.kind = Some(if is_package {
            EntityKind::Package
        } else {
            EntityKind::Module
        });

        match parent {
            Some(parent) => self.attach_child(parent, id),
            None => {
                self.root_modules.push(id);
                self.register_subtree(id);
            }
        }
        tracing::trace!(module = full_name, is_package, "registered module");
        Ok(id)
    }

    /// Create a class under `parent`.
    pub(crate) fn add_class(&mut self, parent: EntityId, name: &str, line: u32) -> EntityId {
        self.add_entity(
            parent,
            name,
            EntityData::Class(ClassData::default()),
            Some(EntityKind::Class),
            line,
        )
    }

    /// Create a function under `parent`; its kind follows from the parent.
    pub(crate) fn add_function(&mut self, parent: EntityId, name: &str, line: u32) -> EntityId {
        let kind = match self.entity(parent).entity_type() {
            EntityType::Class => EntityKind::Method,
            _ => EntityKind::Function,
        };
        self.add_entity(
            parent,
            name,
            EntityData::Function(FunctionData::default()),
            Some(kind),
            line,
        )
    }

    /// Create an attribute under `parent`; `kind` may be left unset for the
    /// classifier to decide.
    pub(crate) fn add_attribute(
        &mut self,
        parent: EntityId,
        name: &str,
        kind: Option<EntityKind>,
        line: u32,
    ) -> EntityId {
        self.add_entity(
            parent,
            name,
            EntityData::Attribute(AttributeData::default()),
            kind,
            line,
        )
    }

    fn add_entity(
        &mut self,
        parent: EntityId,
        name: &str,
        data: EntityData,
        kind: Option<EntityKind>,
        line: u32,
    ) -> EntityId {
        let id = self.alloc(name, Some(parent), data);
        let module = self.entity(parent).module;
        let entity = self.entity_mut(id);
        entity.kind = kind;
        entity.module = module;
        entity.set_line_number(line);
        self.attach_child(parent, id);
        id
    }

    fn alloc(&mut self, name: &str, parent: Option<EntityId>, data: EntityData) -> EntityId {
        let id = EntityId::new(self.entities.len() as u32);
        self.entities.push(Entity::new(id, name, parent, data));
        id
    }

    // ------------------------------------------------------------------------
    // Registration
    // ------------------------------------------------------------------------

    /// Bind `child` in `parent`'s table and register it, resolving a name
    /// collision per the duplicate policy.
    fn attach_child(&mut self, parent: EntityId, child: EntityId) {
        let name = self.entity(child).name.clone();
        let previous = self
            .entity(parent)
            .contents
            .get(&name)
            .filter(|prev| *prev != child);

        let Some(previous) = previous else {
            self.entity_mut(parent).contents.insert(&name, child);
            self.register_subtree(child);
            return;
        };

        let full_name = self.full_name(previous);
        let (winner, loser) = match self.options.duplicate_policy {
            DuplicatePolicy::LaterWins => (child, previous),
            DuplicatePolicy::FirstWins => (previous, child),
        };
        let mut n = 0;
        while self.all_objects.contains_key(&format!("{} {}", full_name, n)) {
            n += 1;
        }
        let described = self.describe(previous);
        self.report(child, format!("duplicate {}", described), "ast", 0, 1);
        tracing::debug!(name = %full_name, "duplicate declaration, demoting {}", self.entity(loser).id);

        self.unregister_subtree(loser);
        let demoted_name = format!("{} {}", name, n);
        self.entity_mut(loser).name = demoted_name.clone();
        let contents = &mut self.entity_mut(parent).contents;
        contents.insert(&name, winner);
        contents.insert(&demoted_name, loser);
        self.register_subtree(loser);
        self.register_subtree(winner);
    }

    /// `"<kind> <full name>"` for messages.
    pub(crate) fn describe(&self, id: EntityId) -> String {
        let entity = self.entity(id);
        let kind = match entity.kind {
            Some(kind) => kind.as_str(),
            None => match entity.entity_type() {
                EntityType::Module => "module",
                EntityType::Class => "class",
                EntityType::Function => "function",
                EntityType::Attribute => "attribute",
            },
        };
        format!("{} {}", kind, self.full_name(id))
    }

    fn register_subtree(&mut self, id: EntityId) {
        let full_name = self.full_name(id);
        self.all_objects.insert(full_name, id);
        let children: Vec<EntityId> = self.entity(id).contents.ids().collect();
        for child in children {
            self.register_subtree(child);
        }
    }

    fn unregister_subtree(&mut self, id: EntityId) {
        let full_name = self.full_name(id);
        if self.all_objects.get(&full_name) == Some(&id) {
            self.all_objects.remove(&full_name);
        }
        let children: Vec<EntityId> = self.entity(id).contents.ids().collect();
        for child in children {
            self.unregister_subtree(child);
        }
    }

    // ------------------------------------------------------------------------
    // Reparenting
    // ------------------------------------------------------------------------

    /// Move `id` under `new_parent` as `new_name`.
    ///
    /// The old parent keeps an alias from the old name to the new location.
    /// The move happens at most once per entity; repeating the same move is a
    /// no-op. The declaring module is unchanged.
    pub fn reparent(&mut self, id: EntityId, new_parent: EntityId, new_name: &str) -> BuildResult<()> {
        let entity = self.entity(id);
        if entity.parent == Some(new_parent) && entity.name == new_name {
            return Ok(());
        }
        let refuse = |system: &System, reason: &str| BuildError::CannotReparent {
            name: system.full_name(id),
            reason: reason.to_string(),
        };
        if entity.entity_type() == EntityType::Module {
            return Err(refuse(self, "modules cannot be moved"));
        }
        if entity.reparented {
            return Err(refuse(self, "already moved once"));
        }
        if self.is_ancestor(id, new_parent) {
            return Err(refuse(self, "target is inside the entity"));
        }
        let Some(old_parent) = entity.parent else {
            return Err(refuse(self, "entity has no parent"));
        };
        let old_name = entity.name.clone();
        let old_full_name = self.full_name(id);

        self.unregister_subtree(id);
        self.entity_mut(old_parent).contents.remove(&old_name);
        let entity = self.entity_mut(id);
        entity.parent = Some(new_parent);
        entity.name = new_name.to_string();
        entity.reparented = true;
        self.attach_child(new_parent, id);

        let new_full_name = self.full_name(id);
        tracing::debug!(from = %old_full_name, to = %new_full_name, "moved re-exported entity");
        self.entity_mut(old_parent)
            .local_aliases
            .insert(old_name, new_full_name);
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Mutation helpers
    // ------------------------------------------------------------------------

    /// Set a docstring, normalising indentation.
    pub(crate) fn set_docstring(&mut self, id: EntityId, text: &str, line: u32) {
        self.entity_mut(id).docstring = Some(Docstring {
            text: clean_docstring(text),
            line,
        });
    }

    pub(crate) fn set_module_state(&mut self, id: EntityId, state: ProcessingState) {
        if let Some(module) = self.entity_mut(id).as_module_mut() {
            module.state = state;
        }
    }

    /// Release every retained syntax tree.
    pub fn drop_syntax_trees(&mut self) {
        for entity in &mut self.entities {
            if let Some(module) = entity.as_module_mut() {
                module.tree = None;
            }
        }
    }
}
