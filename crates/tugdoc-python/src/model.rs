// Copyright (c) Ken Kocienda and other contributors.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! Entity model: the nodes of the semantic graph.
//!
//! Entities live in an arena owned by [`crate::system::System`] and are
//! addressed by [`EntityId`]. Ownership is strictly tree-shaped: an entity's
//! `parent` owns it through the parent's [`Contents`] table. Every other edge
//! (resolved bases, subclasses, an overload's primary, a decorator's target)
//! is a plain `EntityId` handle resolved through the registry.
//!
//! Fully-qualified names are never stored. They are derived from the parent
//! chain by [`crate::system::System::full_name`].

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::classify::DecoratorRole;
use crate::syntax::{self, Expr};

// ============================================================================
// Identifiers
// ============================================================================

/// Unique identifier for an entity within a [`crate::system::System`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
pub struct EntityId(pub u32);

impl EntityId {
    /// Create a new entity ID.
    pub fn new(id: u32) -> Self {
        EntityId(id)
    }

    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ent_{}", self.0)
    }
}

// ============================================================================
// Kinds
// ============================================================================

/// Runtime type of an entity: which payload it carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    Module,
    Class,
    Function,
    Attribute,
}

/// Documented kind of an entity.
///
/// Set during the build; may be unset while an attribute is still being
/// classified, and is non-null for every entity once its module is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Package,
    Module,
    Class,
    Exception,
    Function,
    Method,
    ClassMethod,
    StaticMethod,
    Property,
    Variable,
    ClassVariable,
    InstanceVariable,
    Constant,
    TypeAlias,
    TypeVariable,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Package => "package",
            EntityKind::Module => "module",
            EntityKind::Class => "class",
            EntityKind::Exception => "exception",
            EntityKind::Function => "function",
            EntityKind::Method => "method",
            EntityKind::ClassMethod => "class method",
            EntityKind::StaticMethod => "static method",
            EntityKind::Property => "property",
            EntityKind::Variable => "variable",
            EntityKind::ClassVariable => "class variable",
            EntityKind::InstanceVariable => "instance variable",
            EntityKind::Constant => "constant",
            EntityKind::TypeAlias => "type alias",
            EntityKind::TypeVariable => "type variable",
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-module processing state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingState {
    #[default]
    NotProcessed,
    Processing,
    Processed,
    Errored,
}

impl ProcessingState {
    /// `Processed` or `Errored`.
    pub fn is_terminal(self) -> bool {
        matches!(self, ProcessingState::Processed | ProcessingState::Errored)
    }
}

impl std::fmt::Display for ProcessingState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            ProcessingState::NotProcessed => "not processed",
            ProcessingState::Processing => "processing",
            ProcessingState::Processed => "processed",
            ProcessingState::Errored => "errored",
        };
        f.write_str(text)
    }
}

// ============================================================================
// Contents
// ============================================================================

/// Insertion-ordered table from local name to child entity.
///
/// Replacing the entity bound to an existing name keeps the name's original
/// position.
#[derive(Debug, Clone, Default)]
pub struct Contents {
    order: Vec<String>,
    index: HashMap<String, EntityId>,
}

impl Contents {
    pub fn get(&self, name: &str) -> Option<EntityId> {
        self.index.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Bind `name`, returning the entity previously bound to it.
    pub fn insert(&mut self, name: &str, id: EntityId) -> Option<EntityId> {
        let previous = self.index.insert(name.to_string(), id);
        if previous.is_none() {
            self.order.push(name.to_string());
        }
        previous
    }

    pub fn remove(&mut self, name: &str) -> Option<EntityId> {
        let removed = self.index.remove(name)?;
        self.order.retain(|n| n != name);
        Some(removed)
    }

    /// `(name, id)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, EntityId)> + '_ {
        self.order
            .iter()
            .filter_map(|name| self.index.get(name).map(|id| (name.as_str(), *id)))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.order.iter().map(String::as_str)
    }

    pub fn ids(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.iter().map(|(_, id)| id)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

// ============================================================================
// Payloads
// ============================================================================

/// A docstring and the line its literal starts on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Docstring {
    pub text: String,
    pub line: u32,
}

/// A decorator applied to a class or function.
#[derive(Debug, Clone, PartialEq)]
pub struct Decorator {
    /// Expanded full name of the decorator callable.
    pub name: String,
    /// Call arguments when the decorator is a call (`@d(1)`).
    pub args: Option<Vec<Expr>>,
    pub role: DecoratorRole,
    /// The decorator entity, when it resolves inside the graph.
    pub target: Option<EntityId>,
}

/// A base class expression as written.
#[derive(Debug, Clone, PartialEq)]
pub struct RawBase {
    /// Dotted name of the base (subscript stripped), or its rendered source.
    pub text: String,
    pub expr: Expr,
}

/// Resolution state of one base class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BaseSlot {
    Unknown,
    Resolved(EntityId),
}

impl BaseSlot {
    pub fn resolved(self) -> Option<EntityId> {
        match self {
            BaseSlot::Resolved(id) => Some(id),
            BaseSlot::Unknown => None,
        }
    }
}

/// How a parameter may be passed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamKind {
    PositionalOnly,
    PositionalOrKeyword,
    VarPositional,
    KeywordOnly,
    VarKeyword,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub name: String,
    pub kind: ParamKind,
    pub default: Option<Expr>,
    pub annotation: Option<Expr>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Signature {
    pub params: Vec<Parameter>,
    /// Return annotation; an explicit `None` return is stored as absent.
    pub returns: Option<Expr>,
}

impl std::fmt::Display for Signature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut parts = Vec::with_capacity(self.params.len() + 2);
        let mut saw_positional_only = false;
        let mut saw_star = false;
        for param in &self.params {
            if saw_positional_only && param.kind != ParamKind::PositionalOnly {
                parts.push("/".to_string());
                saw_positional_only = false;
            }
            if param.kind == ParamKind::KeywordOnly && !saw_star {
                parts.push("*".to_string());
                saw_star = true;
            }
            let prefix = match param.kind {
                ParamKind::VarPositional => {
                    saw_star = true;
                    "*"
                }
                ParamKind::VarKeyword => "**",
                ParamKind::PositionalOnly => {
                    saw_positional_only = true;
                    ""
                }
                _ => "",
            };
            let mut text = format!("{}{}", prefix, param.name);
            if let Some(ann) = &param.annotation {
                text.push_str(&format!(": {}", ann));
            }
            if let Some(default) = &param.default {
                let sep = if param.annotation.is_some() { " = " } else { "=" };
                text.push_str(&format!("{}{}", sep, default));
            }
            parts.push(text);
        }
        if saw_positional_only {
            parts.push("/".to_string());
        }
        write!(f, "({})", parts.join(", "))?;
        if let Some(ret) = &self.returns {
            write!(f, " -> {}", ret)?;
        }
        Ok(())
    }
}

/// One alternate signature of an overload group.
#[derive(Debug, Clone, PartialEq)]
pub struct Overload {
    /// `None` when the parameters were invalid.
    pub signature: Option<Signature>,
    pub decorators: Vec<Decorator>,
    /// The function this overload is attached to.
    pub primary: EntityId,
    pub line: u32,
}

/// An import whose origin module had not been built when it was seen.
/// Retried by the post-processor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PendingImport {
    /// `from origin import name as as_name` where `as_name` is exported.
    ReExport {
        /// Full name of the module the name is imported from.
        origin: String,
        name: String,
        as_name: String,
        line: u32,
    },
    /// `from origin import *` into `scope`.
    Star {
        origin: String,
        scope: EntityId,
        /// Names the override guard kept from being rebound.
        blocked: Vec<String>,
        line: u32,
    },
}

#[derive(Debug, Clone, Default)]
pub struct ModuleData {
    pub is_package: bool,
    /// Explicit export list (`__all__`).
    pub all: Option<Vec<String>>,
    /// Documentation format tag (`__docformat__`).
    pub docformat: Option<String>,
    pub state: ProcessingState,
    pub pending_imports: Vec<PendingImport>,
    /// Syntax tree, kept until [`crate::system::System::drop_syntax_trees`].
    pub tree: Option<syntax::Module>,
}

#[derive(Debug, Clone, Default)]
pub struct ClassData {
    pub raw_bases: Vec<RawBase>,
    /// Expanded full names, parallel to `raw_bases`.
    pub base_names: Vec<String>,
    /// Resolution slots, parallel to `raw_bases`.
    pub base_objects: Vec<BaseSlot>,
    pub subclasses: Vec<EntityId>,
    pub decorators: Vec<Decorator>,
    /// Method resolution order, starting with the class itself.
    pub mro: Option<Vec<EntityId>>,
}

#[derive(Debug, Clone, Default)]
pub struct FunctionData {
    pub is_async: bool,
    pub decorators: Vec<Decorator>,
    /// Primary signature; `None` until a non-overload definition is seen.
    pub signature: Option<Signature>,
    pub overloads: Vec<Overload>,
}

#[derive(Debug, Clone, Default)]
pub struct AttributeData {
    pub annotation: Option<Expr>,
    pub value: Option<Expr>,
    /// Kind was stated explicitly (a final marker) rather than inferred.
    pub explicit_kind: bool,
    pub decorators: Vec<Decorator>,
    /// Type text taken from a property docstring's `@rtype:` field.
    pub parsed_type: Option<String>,
}

#[derive(Debug, Clone)]
pub enum EntityData {
    Module(ModuleData),
    Class(ClassData),
    Function(FunctionData),
    Attribute(AttributeData),
}

impl EntityData {
    pub fn entity_type(&self) -> EntityType {
        match self {
            EntityData::Module(_) => EntityType::Module,
            EntityData::Class(_) => EntityType::Class,
            EntityData::Function(_) => EntityType::Function,
            EntityData::Attribute(_) => EntityType::Attribute,
        }
    }
}

// ============================================================================
// Entity
// ============================================================================

/// One declaration in the graph.
#[derive(Debug, Clone)]
pub struct Entity {
    pub(crate) id: EntityId,
    pub(crate) name: String,
    pub(crate) parent: Option<EntityId>,
    /// Declaring module; fixed once set.
    pub(crate) module: Option<EntityId>,
    pub(crate) reparented: bool,
    pub kind: Option<EntityKind>,
    pub linenumber: u32,
    pub docstring: Option<Docstring>,
    /// Annotations contributed by visitor extensions.
    pub extra_info: Vec<String>,
    pub contents: Contents,
    /// Local name to fully-qualified target, for names bound without an entity.
    pub local_aliases: BTreeMap<String, String>,
    pub data: EntityData,
}

impl Entity {
    pub(crate) fn new(id: EntityId, name: &str, parent: Option<EntityId>, data: EntityData) -> Self {
        Entity {
            id,
            name: name.to_string(),
            parent,
            module: None,
            reparented: false,
            kind: None,
            linenumber: 0,
            docstring: None,
            extra_info: Vec::new(),
            contents: Contents::default(),
            local_aliases: BTreeMap::new(),
            data,
        }
    }

    pub fn id(&self) -> EntityId {
        self.id
    }

    /// Unqualified name.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parent(&self) -> Option<EntityId> {
        self.parent
    }

    /// The module this entity was declared in (itself, for modules).
    pub fn module(&self) -> Option<EntityId> {
        self.module
    }

    pub fn entity_type(&self) -> EntityType {
        self.data.entity_type()
    }

    /// Modules and classes hold named children and import aliases.
    pub fn is_container(&self) -> bool {
        matches!(self.data, EntityData::Module(_) | EntityData::Class(_))
    }

    /// Record the declaration line; the first non-zero line wins.
    pub fn set_line_number(&mut self, line: u32) {
        if self.linenumber == 0 {
            self.linenumber = line;
        }
    }

    pub fn as_module(&self) -> Option<&ModuleData> {
        match &self.data {
            EntityData::Module(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_module_mut(&mut self) -> Option<&mut ModuleData> {
        match &mut self.data {
            EntityData::Module(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_class(&self) -> Option<&ClassData> {
        match &self.data {
            EntityData::Class(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_class_mut(&mut self) -> Option<&mut ClassData> {
        match &mut self.data {
            EntityData::Class(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_function(&self) -> Option<&FunctionData> {
        match &self.data {
            EntityData::Function(f) => Some(f),
            _ => None,
        }
    }

    pub fn as_function_mut(&mut self) -> Option<&mut FunctionData> {
        match &mut self.data {
            EntityData::Function(f) => Some(f),
            _ => None,
        }
    }

    pub fn as_attribute(&self) -> Option<&AttributeData> {
        match &self.data {
            EntityData::Attribute(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_attribute_mut(&mut self) -> Option<&mut AttributeData> {
        match &mut self.data {
            EntityData::Attribute(a) => Some(a),
            _ => None,
        }
    }
}
