// Copyright (c) Ken Kocienda and other contributors.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! Import statements.
//!
//! Imports never create entities. They add entries to the importing scope's
//! alias table (`local name -> full name`), with one exception: a name
//! imported from another module and listed in the importing module's
//! `__all__` is a *re-export*, and the entity itself is moved into the
//! importing module (see [`System::handle_reexport`]).
//!
//! When the origin module has not been built yet, re-exports and `import *`
//! cannot be completed. They are recorded on the importing module as
//! [`PendingImport`]s and finished by the post-processor.

use crate::builder::ModuleBuilder;
use crate::model::{EntityId, EntityType, PendingImport, ProcessingState};
use crate::syntax::ImportAlias;
use crate::system::System;

impl ModuleBuilder<'_> {
    /// `import a.b.c` binds `a`; `import a.b.c as d` binds `d` to `a.b.c`.
    pub(crate) fn visit_import(&mut self, names: &[ImportAlias]) {
        let scope = self.current();
        if !self.system.entity(scope).is_container() {
            return;
        }
        for alias in names {
            let (local, target) = match &alias.asname {
                Some(asname) => (asname.clone(), alias.name.clone()),
                None => {
                    let first = alias.name.split('.').next().unwrap_or(&alias.name);
                    (first.to_string(), first.to_string())
                }
            };
            if self.is_guarded(scope, &local) {
                continue;
            }
            self.system
                .entity_mut(scope)
                .local_aliases
                .insert(local, target);
        }
    }

    pub(crate) fn visit_import_from(
        &mut self,
        module: Option<&str>,
        names: &[ImportAlias],
        level: u32,
        line: u32,
    ) {
        if !self.system.entity(self.current()).is_container() {
            return;
        }
        let Some(origin) = self.origin_module_name(module, level, line) else {
            return;
        };
        match names {
            [alias] if alias.name == "*" => self.import_all(&origin, line),
            _ => self.import_names(&origin, names, line),
        }
    }

    /// Full name of the module an import reads from, resolving relative
    /// levels against the module being built.
    fn origin_module_name(&mut self, module: Option<&str>, level: u32, line: u32) -> Option<String> {
        if level == 0 {
            return Some(module.unwrap_or_default().to_string());
        }
        let is_package = self
            .system
            .entity(self.module)
            .as_module()
            .is_some_and(|m| m.is_package);
        let steps = if is_package { level - 1 } else { level };
        let mut ctx = self.module;
        for _ in 0..steps {
            match self.system.entity(ctx).parent() {
                Some(parent) => ctx = parent,
                None => {
                    let message = format!("relative import level ({}) too high", level);
                    self.system
                        .report(self.module, message, "import", i64::from(line), -1);
                    return None;
                }
            }
        }
        let base = self.system.full_name(ctx);
        Some(match module {
            Some(name) => format!("{}.{}", base, name),
            None => base,
        })
    }

    /// Names the importing scope re-exports: the module's `__all__` when
    /// importing at module level, nothing otherwise.
    fn exports(&self) -> Vec<String> {
        if self.current() != self.module {
            return Vec::new();
        }
        self.system
            .entity(self.module)
            .as_module()
            .and_then(|m| m.all.clone())
            .unwrap_or_default()
    }

    fn import_all(&mut self, origin: &str, line: u32) {
        let scope = self.current();
        let offset = i64::from(line);
        let Some(origin_id) = self.system.lookup_module(origin) else {
            let message = format!("import * from unknown {}", origin);
            self.system.report(self.module, message, "import", offset, 1);
            return;
        };
        let message = format!("import * from {}", origin);
        self.system.report(self.module, message, "import", offset, 1);

        let blocked = self.guarded_names(scope);
        if self.system.module_state(origin_id) == Some(ProcessingState::NotProcessed) {
            tracing::debug!(origin, "deferring import * until post-processing");
            self.system.defer_import(
                self.module,
                PendingImport::Star {
                    origin: origin.to_string(),
                    scope,
                    blocked,
                    line,
                },
            );
            return;
        }
        let exports = self.exports();
        self.system
            .import_star(scope, origin_id, &exports, &blocked, line);
    }

    fn import_names(&mut self, origin: &str, names: &[ImportAlias], line: u32) {
        let scope = self.current();
        let exports = self.exports();
        let origin_id = self.system.lookup_module(origin);
        for alias in names {
            let as_name = alias.asname.clone().unwrap_or_else(|| alias.name.clone());
            if self.is_guarded(scope, &as_name) {
                continue;
            }
            if let Some(origin_id) = origin_id {
                let unbuilt = self.system.module_state(origin_id)
                    == Some(ProcessingState::NotProcessed)
                    && !self.system.entity(origin_id).contents.contains(&alias.name);
                if unbuilt && exports.contains(&as_name) {
                    self.system.defer_import(
                        self.module,
                        PendingImport::ReExport {
                            origin: origin.to_string(),
                            name: alias.name.clone(),
                            as_name: as_name.clone(),
                            line,
                        },
                    );
                } else if self.system.handle_reexport(
                    scope,
                    &exports,
                    origin_id,
                    &alias.name,
                    &as_name,
                    line,
                ) {
                    continue;
                }
            }
            self.system
                .entity_mut(scope)
                .local_aliases
                .insert(as_name, format!("{}.{}", origin, alias.name));
        }
    }
}

impl System {
    /// The module registered under `full_name`.
    pub fn lookup_module(&self, full_name: &str) -> Option<EntityId> {
        self.lookup(full_name)
            .filter(|id| self.entity(*id).entity_type() == EntityType::Module)
    }

    pub(crate) fn defer_import(&mut self, module: EntityId, import: PendingImport) {
        if let Some(data) = self.entity_mut(module).as_module_mut() {
            data.pending_imports.push(import);
        }
    }

    /// Move `origin.origin_name` into `current` as `as_name` when `as_name`
    /// is re-exported.
    ///
    /// Returns whether the entity was moved. Nothing moves when the origin
    /// module lists the name in its own `__all__`, or when the name denotes
    /// a module.
    pub fn handle_reexport(
        &mut self,
        current: EntityId,
        exports: &[String],
        origin: EntityId,
        origin_name: &str,
        as_name: &str,
        line: u32,
    ) -> bool {
        if !exports.iter().any(|e| e == as_name) {
            return false;
        }
        let module = self.entity(current).module().unwrap_or(current);
        let offset = i64::from(line);
        let found = self
            .entity(origin)
            .contents
            .get(origin_name)
            .or_else(|| self.resolve_name(origin, origin_name));
        let Some(found) = found else {
            let message = format!(
                "cannot resolve re-exported name :{}.{}",
                self.full_name(origin),
                origin_name
            );
            self.report(module, message, "import", offset, 1);
            return false;
        };
        if self.entity(found).entity_type() == EntityType::Module {
            return false;
        }
        let claimed = self
            .entity(origin)
            .as_module()
            .and_then(|m| m.all.as_ref())
            .is_some_and(|all| all.iter().any(|n| n == origin_name));
        if claimed {
            return false;
        }
        match self.reparent(found, current, as_name) {
            Ok(()) => true,
            Err(err) => {
                self.report(module, err.to_string(), "import", offset, 1);
                false
            }
        }
    }

    /// Bind the names `origin` exports in `scope`, skipping `blocked`.
    ///
    /// Returns the number of re-exported entities moved.
    pub(crate) fn import_star(
        &mut self,
        scope: EntityId,
        origin: EntityId,
        exports: &[String],
        blocked: &[String],
        line: u32,
    ) -> usize {
        let names: Vec<String> = match self.entity(origin).as_module().and_then(|m| m.all.clone()) {
            Some(all) => all,
            None => self
                .local_names(origin)
                .into_iter()
                .filter(|name| !name.starts_with('_'))
                .collect(),
        };
        let mut moved = 0;
        for name in names {
            if blocked.contains(&name) {
                continue;
            }
            if self.handle_reexport(scope, exports, origin, &name, &name, line) {
                moved += 1;
                continue;
            }
            let target = self.expand_name(origin, &name);
            self.entity_mut(scope).local_aliases.insert(name, target);
        }
        moved
    }
}
