// Copyright (c) Ken Kocienda and other contributors.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! Whole-graph second pass.
//!
//! Runs once every module has reached a terminal state. In order:
//!
//! 1. finish imports deferred because their origin was not built yet;
//! 2. retry base classes still marked unknown and upgrade the ones that now
//!    resolve;
//! 3. link every resolved base back to its subclass;
//! 4. compute method resolution orders;
//! 5. tag classes deriving from builtin exceptions.
//!
//! Every step only adds information, so a second run changes nothing.

use serde::Serialize;

use crate::model::{BaseSlot, EntityId, EntityKind, EntityType, PendingImport};
use crate::system::{BuildError, BuildResult, System};

/// What one post-processing run changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PostProcessSummary {
    /// Re-exported entities moved by deferred imports.
    pub reexports: usize,
    /// Base slots upgraded from unknown to resolved.
    pub resolved_bases: usize,
    /// Subclass back-references added.
    pub subclass_links: usize,
    pub mros_computed: usize,
    /// Classes re-tagged as exceptions.
    pub exceptions: usize,
}

impl PostProcessSummary {
    /// Whether the run changed nothing.
    pub fn is_noop(&self) -> bool {
        *self == PostProcessSummary::default()
    }
}

impl System {
    /// Finish cross-module resolution.
    ///
    /// Fails without touching the graph if any module is still unbuilt or
    /// being built.
    pub fn post_process(&mut self) -> BuildResult<PostProcessSummary> {
        let pending = self.pending_modules();
        if !pending.is_empty() {
            return Err(BuildError::ModulesPending { pending });
        }

        let mut summary = PostProcessSummary {
            reexports: self.resolve_pending_imports(),
            ..PostProcessSummary::default()
        };

        let classes: Vec<EntityId> = self.objects_of_type(EntityType::Class).collect();
        let mut upgraded = Vec::new();
        for &class in &classes {
            let count = self.upgrade_bases(class);
            if count > 0 {
                summary.resolved_bases += count;
                upgraded.push(class);
            }
        }
        for &class in &classes {
            summary.subclass_links += self.link_subclasses(class);
        }

        // An upgrade anywhere can change the order of every class below it.
        let recompute_all = !upgraded.is_empty();
        for &class in &classes {
            let has_mro = self.entity(class).as_class().is_some_and(|c| c.mro.is_some());
            if (!has_mro || recompute_all) && self.update_mro(class) {
                summary.mros_computed += 1;
            }
        }

        for &class in &classes {
            if self.tag_exception(class) {
                summary.exceptions += 1;
            }
        }

        tracing::info!(
            classes = classes.len(),
            reexports = summary.reexports,
            resolved_bases = summary.resolved_bases,
            subclass_links = summary.subclass_links,
            mros = summary.mros_computed,
            exceptions = summary.exceptions,
            "post-processing complete"
        );
        Ok(summary)
    }

    /// Retry imports recorded while their origin module was unbuilt.
    fn resolve_pending_imports(&mut self) -> usize {
        let modules: Vec<EntityId> = self.objects_of_type(EntityType::Module).collect();
        let mut moved = 0;
        for module in modules {
            let pending = match self.entity_mut(module).as_module_mut() {
                Some(data) => std::mem::take(&mut data.pending_imports),
                None => continue,
            };
            let exports = self
                .entity(module)
                .as_module()
                .and_then(|m| m.all.clone())
                .unwrap_or_default();
            for import in pending {
                match import {
                    PendingImport::ReExport {
                        origin,
                        name,
                        as_name,
                        line,
                    } => {
                        let Some(origin_id) = self.lookup_module(&origin) else {
                            continue;
                        };
                        if self.handle_reexport(module, &exports, origin_id, &name, &as_name, line) {
                            let stale = format!("{}.{}", origin, name);
                            let aliases = &mut self.entity_mut(module).local_aliases;
                            if aliases.get(&as_name) == Some(&stale) {
                                aliases.remove(&as_name);
                            }
                            moved += 1;
                        }
                    }
                    PendingImport::Star {
                        origin,
                        scope,
                        blocked,
                        line,
                    } => {
                        let Some(origin_id) = self.lookup_module(&origin) else {
                            continue;
                        };
                        let scope_exports: &[String] = if scope == module { &exports } else { &[] };
                        moved += self.import_star(scope, origin_id, scope_exports, &blocked, line);
                    }
                }
            }
        }
        moved
    }

    /// Re-expand the unknown bases of `class`; returns how many resolved.
    fn upgrade_bases(&mut self, class: EntityId) -> usize {
        let Some(data) = self.entity(class).as_class() else {
            return 0;
        };
        let Some(parent) = self.entity(class).parent() else {
            return 0;
        };
        let unknown: Vec<(usize, String)> = data
            .base_objects
            .iter()
            .enumerate()
            .filter(|(_, slot)| **slot == BaseSlot::Unknown)
            .filter_map(|(i, _)| data.raw_bases.get(i).map(|raw| (i, raw.text.clone())))
            .collect();

        let mut upgrades = Vec::new();
        for (index, text) in unknown {
            let expanded = self.expand_name(parent, &text);
            let Some(base) = self.resolve_full_name(&expanded) else {
                continue;
            };
            if base != class && self.entity(base).entity_type() == EntityType::Class {
                let full_name = self.full_name(base);
                upgrades.push((index, base, full_name));
            }
        }

        let count = upgrades.len();
        if let Some(data) = self.entity_mut(class).as_class_mut() {
            for (index, base, full_name) in upgrades {
                data.base_objects[index] = BaseSlot::Resolved(base);
                data.base_names[index] = full_name;
            }
        }
        count
    }

    /// Add `class` to the subclass list of each resolved base.
    fn link_subclasses(&mut self, class: EntityId) -> usize {
        let bases: Vec<EntityId> = match self.entity(class).as_class() {
            Some(data) => data.base_objects.iter().filter_map(|slot| slot.resolved()).collect(),
            None => return 0,
        };
        let mut added = 0;
        for base in bases {
            if let Some(data) = self.entity_mut(base).as_class_mut() {
                if !data.subclasses.contains(&class) {
                    data.subclasses.push(class);
                    added += 1;
                }
            }
        }
        added
    }

    /// Store the MRO of `class`; returns whether it changed.
    fn update_mro(&mut self, class: EntityId) -> bool {
        let mro = match self.compute_mro(class) {
            Ok(mro) => mro,
            Err(err) => {
                let already_reported = self
                    .entity(class)
                    .as_class()
                    .is_some_and(|c| c.mro.is_some());
                if !already_reported {
                    tracing::debug!(error = %err, "falling back to depth-first MRO");
                    self.report(class, "cannot compute MRO", "mro", 0, -1);
                }
                self.depth_first_bases(class)
            }
        };
        match self.entity_mut(class).as_class_mut() {
            Some(data) if data.mro.as_ref() != Some(&mro) => {
                data.mro = Some(mro);
                true
            }
            _ => false,
        }
    }

    /// Re-tag `class` as an exception when its MRO reaches a builtin
    /// exception base name.
    fn tag_exception(&mut self, class: EntityId) -> bool {
        if self.entity(class).kind != Some(EntityKind::Class) {
            return false;
        }
        let order = self
            .entity(class)
            .as_class()
            .and_then(|c| c.mro.clone())
            .unwrap_or_else(|| vec![class]);
        let is_exception = order.iter().any(|id| {
            self.entity(*id).as_class().is_some_and(|data| {
                data.base_names
                    .iter()
                    .any(|name| self.options().is_builtin_exception(name))
            })
        });
        if is_exception {
            self.entity_mut(class).kind = Some(EntityKind::Exception);
        }
        is_exception
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::{ClassDef, Expr, Module, Stmt};

    fn build(system: &mut System, name: &str, body: Vec<Stmt>) -> EntityId {
        let module = system
            .lookup_module(name)
            .unwrap_or_else(|| system.add_module(name, false).unwrap());
        system.build_module(module, Ok(Module::new(body))).unwrap();
        module
    }

    fn class(name: &str, bases: &[&str], line: u32) -> Stmt {
        bases
            .iter()
            .fold(ClassDef::new(name, line), |def, base| def.with_base(Expr::dotted(base)))
            .into_stmt()
    }

    fn subclasses(system: &System, name: &str) -> Vec<String> {
        let id = system.lookup(name).unwrap();
        system
            .entity(id)
            .as_class()
            .unwrap()
            .subclasses
            .iter()
            .map(|c| system.full_name(*c))
            .collect()
    }

    #[test]
    fn refuses_to_run_with_unbuilt_modules() {
        let mut system = System::default();
        system.add_module("m", false).unwrap();
        let err = system.post_process().unwrap_err();
        assert!(matches!(err, BuildError::ModulesPending { pending } if pending == vec!["m"]));
    }

    #[test]
    fn forward_base_in_same_module_resolves() {
        let mut system = System::default();
        build(&mut system, "m", vec![class("B", &["A"], 1), class("A", &[], 3)]);
        let b = system.lookup("m.B").unwrap();
        let a = system.lookup("m.A").unwrap();
        assert_eq!(
            system.entity(b).as_class().unwrap().base_objects,
            vec![BaseSlot::Unknown]
        );

        let summary = system.post_process().unwrap();
        assert_eq!(summary.resolved_bases, 1);
        assert_eq!(summary.subclass_links, 1);
        let data = system.entity(b).as_class().unwrap();
        assert_eq!(data.base_objects, vec![BaseSlot::Resolved(a)]);
        assert_eq!(data.mro, Some(vec![b, a]));
        assert_eq!(subclasses(&system, "m.A"), vec!["m.B"]);
    }

    #[test]
    fn second_run_is_a_noop() {
        let mut system = System::default();
        build(&mut system, "m", vec![class("B", &["A"], 1), class("A", &[], 3)]);
        system.post_process().unwrap();
        let diagnostics = system.diagnostics().len();
        let again = system.post_process().unwrap();
        assert!(again.is_noop(), "{:?}", again);
        assert_eq!(subclasses(&system, "m.A"), vec!["m.B"]);
        assert_eq!(system.diagnostics().len(), diagnostics);
    }

    #[test]
    fn deferred_reexport_moves_entity() {
        let mut system = System::default();
        system.add_module("a", false).unwrap();
        let b = build(
            &mut system,
            "b",
            vec![
                Stmt::assign("__all__", Expr::list(vec![Expr::str("X")]), 1),
                Stmt::import_from(Some("a"), &[("X", None)], 0, 2),
            ],
        );
        build(&mut system, "a", vec![class("X", &[], 1)]);
        let x = system.lookup("a.X").unwrap();

        let summary = system.post_process().unwrap();
        assert_eq!(summary.reexports, 1);
        assert_eq!(system.lookup("b.X"), Some(x));
        assert!(!system.entity(b).local_aliases.contains_key("X"));
        assert!(system.entity(b).as_module().unwrap().pending_imports.is_empty());
    }

    #[test]
    fn deferred_star_import_binds_names() {
        let mut system = System::default();
        system.add_module("a", false).unwrap();
        let b = build(
            &mut system,
            "b",
            vec![
                Stmt::import_from(Some("a"), &[("*", None)], 0, 1),
                class("Local", &["Base"], 2),
            ],
        );
        build(&mut system, "a", vec![class("Base", &[], 1)]);
        system.post_process().unwrap();
        assert_eq!(
            system.entity(b).local_aliases.get("Base").map(String::as_str),
            Some("a.Base")
        );
        assert_eq!(subclasses(&system, "a.Base"), vec!["b.Local"]);
    }

    #[test]
    fn inconsistent_hierarchy_falls_back_once() {
        let mut system = System::default();
        build(
            &mut system,
            "m",
            vec![
                class("A", &[], 1),
                class("B", &["A"], 2),
                class("C", &["A", "B"], 3),
            ],
        );
        system.post_process().unwrap();
        let c = system.lookup("m.C").unwrap();
        let a = system.lookup("m.A").unwrap();
        let b = system.lookup("m.B").unwrap();
        assert_eq!(system.entity(c).as_class().unwrap().mro, Some(vec![c, a, b]));
        let mro_diags: Vec<_> = system.diagnostics().in_section("mro").collect();
        assert_eq!(mro_diags.len(), 1);
        assert_eq!(mro_diags[0].message, "cannot compute MRO");
        assert_eq!(mro_diags[0].entity, "m.C");

        system.post_process().unwrap();
        assert_eq!(system.diagnostics().in_section("mro").count(), 1);
    }

    #[test]
    fn exception_subclasses_are_tagged() {
        let mut system = System::default();
        build(
            &mut system,
            "m",
            vec![
                class("Error", &["Exception"], 1),
                class("NotFound", &["Error"], 3),
                class("Plain", &["object"], 5),
            ],
        );
        let summary = system.post_process().unwrap();
        assert_eq!(summary.exceptions, 2);
        let kind = |name: &str| system.entity(system.lookup(name).unwrap()).kind;
        assert_eq!(kind("m.Error"), Some(EntityKind::Exception));
        assert_eq!(kind("m.NotFound"), Some(EntityKind::Exception));
        assert_eq!(kind("m.Plain"), Some(EntityKind::Class));
    }

    #[test]
    fn errored_modules_count_as_finished() {
        let mut system = System::default();
        let m = system.add_module("m", false).unwrap();
        system
            .build_module(
                m,
                Err(tugdoc_core::error::SourceError::unparseable("m.py", "bad")),
            )
            .unwrap();
        assert!(system.post_process().unwrap().is_noop());
    }
}
