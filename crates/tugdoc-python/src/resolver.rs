// Copyright (c) Ken Kocienda and other contributors.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! Name resolution over the graph.
//!
//! Two questions are answered here:
//!
//! 1. *Expansion*: what fully-qualified name does a dotted name written in
//!    some scope refer to? ([`System::expand_name`]). Expansion consults the
//!    scope's children, then its alias table, then (for classes) the
//!    enclosing scopes, one segment at a time.
//! 2. *Resolution*: which entity, if any, does a fully-qualified name denote?
//!    ([`System::resolve_full_name`]). Resolution follows alias tables across
//!    modules, so `c.Y -> b.Y -> a.X` collapses to the class `a.X`.
//!
//! Both are best-effort and never fail: an unknown name expands to a
//! plausible full name and resolves to `None`, which callers treat as
//! "not known yet".

use std::collections::HashSet;

use crate::model::{EntityId, EntityType};
use crate::system::System;

impl System {
    /// The nearest module or class enclosing (or equal to) `id`.
    pub fn scope_container(&self, id: EntityId) -> EntityId {
        let mut cursor = id;
        loop {
            let entity = self.entity(cursor);
            match (entity.is_container(), entity.parent()) {
                (false, Some(parent)) => cursor = parent,
                _ => return cursor,
            }
        }
    }

    /// Names bound locally in `ctx`: children first, then aliases.
    ///
    /// Demoted duplicates (`"name N"`) are not locally visible.
    pub fn local_names(&self, ctx: EntityId) -> Vec<String> {
        let entity = self.entity(ctx);
        let mut names: Vec<String> = entity
            .contents
            .names()
            .filter(|n| !n.contains(' '))
            .map(str::to_string)
            .collect();
        for alias in entity.local_aliases.keys() {
            if !entity.contents.contains(alias) {
                names.push(alias.clone());
            }
        }
        names
    }

    /// Full name a single local name refers to inside `ctx`.
    ///
    /// Modules look at their children and aliases and otherwise return the
    /// name unchanged. Classes fall back to their enclosing scope. Functions
    /// and attributes defer to their parent.
    pub fn local_name_to_full_name(&self, ctx: EntityId, name: &str) -> String {
        let entity = self.entity(ctx);
        match entity.entity_type() {
            EntityType::Module | EntityType::Class => {
                if let Some(child) = entity.contents.get(name) {
                    return self.full_name(child);
                }
                if let Some(target) = entity.local_aliases.get(name) {
                    return target.clone();
                }
                match (entity.entity_type(), entity.parent()) {
                    (EntityType::Class, Some(parent)) => self.local_name_to_full_name(parent, name),
                    _ => name.to_string(),
                }
            }
            EntityType::Function | EntityType::Attribute => match entity.parent() {
                Some(parent) => self.local_name_to_full_name(parent, name),
                None => name.to_string(),
            },
        }
    }

    /// Expand a dotted name written in `ctx` to a fully-qualified name.
    ///
    /// Each segment is looked up in the entity the previous segments
    /// resolved to. Inherited class members are found through the class's
    /// bases. Whatever cannot be resolved is appended unchanged, so
    /// `expand_name(m, "os.path")` in a module that did `import os` yields
    /// `"os.path"` even though `os` is not part of the graph.
    pub fn expand_name(&self, ctx: EntityId, dotted: &str) -> String {
        let parts: Vec<&str> = dotted.split('.').collect();
        let mut obj = ctx;
        let mut expanded = String::new();
        let mut consumed = 0;
        for (i, part) in parts.iter().enumerate() {
            let mut full = self.local_name_to_full_name(obj, part);
            if full == *part && i != 0 {
                // Not bound locally: look for an inherited member, then give up
                // and qualify with the container's name.
                if let Some(inherited) = self.find(obj, part) {
                    full = self.full_name(inherited);
                }
                if full == *part {
                    expanded = format!("{}.{}", self.full_name(obj), part);
                    consumed = i + 1;
                    break;
                }
            }
            consumed = i + 1;
            match self.resolve_full_name(&full) {
                Some(next) => {
                    expanded = self.full_name(next);
                    obj = next;
                }
                None => {
                    expanded = full;
                    break;
                }
            }
        }
        let mut result = expanded;
        for rest in &parts[consumed..] {
            result.push('.');
            result.push_str(rest);
        }
        result
    }

    /// Expand `dotted` in `ctx` and resolve the result.
    pub fn resolve_name(&self, ctx: EntityId, dotted: &str) -> Option<EntityId> {
        let full = self.expand_name(ctx, dotted);
        self.resolve_full_name(&full)
    }

    /// The entity a fully-qualified name denotes, following alias tables.
    ///
    /// Alias chains are followed up to the configured maximum depth; a cycle
    /// resolves to `None`.
    pub fn resolve_full_name(&self, full_name: &str) -> Option<EntityId> {
        self.resolve_full_name_at(full_name, 0)
    }

    fn resolve_full_name_at(&self, full_name: &str, depth: usize) -> Option<EntityId> {
        if depth > self.options().max_alias_depth {
            tracing::trace!(name = full_name, "alias chain too deep");
            return None;
        }
        if let Some(id) = self.lookup(full_name) {
            return Some(id);
        }
        let (prefix, last) = full_name.rsplit_once('.')?;
        let container = self.resolve_full_name_at(prefix, depth + 1)?;
        let entity = self.entity(container);
        if let Some(child) = entity.contents.get(last) {
            return Some(child);
        }
        let target = entity.local_aliases.get(last)?;
        if target == full_name {
            return None;
        }
        self.resolve_full_name_at(target, depth + 1)
    }

    /// Look `name` up in a class and its resolved bases.
    ///
    /// Uses the computed MRO when available, otherwise a depth-first walk of
    /// the bases resolved so far. Returns `None` for non-classes.
    pub fn find(&self, class: EntityId, name: &str) -> Option<EntityId> {
        let data = self.entity(class).as_class()?;
        let order = match &data.mro {
            Some(mro) => mro.clone(),
            None => self.depth_first_bases(class),
        };
        order
            .into_iter()
            .find_map(|base| self.entity(base).contents.get(name))
    }

    /// `class` followed by its resolved bases, depth first, each at most once.
    pub(crate) fn depth_first_bases(&self, class: EntityId) -> Vec<EntityId> {
        let mut order = Vec::new();
        let mut seen = HashSet::new();
        let mut stack = vec![class];
        while let Some(id) = stack.pop() {
            if !seen.insert(id) {
                continue;
            }
            order.push(id);
            if let Some(data) = self.entity(id).as_class() {
                for base in data.base_objects.iter().rev().filter_map(|slot| slot.resolved()) {
                    stack.push(base);
                }
            }
        }
        order
    }
}
