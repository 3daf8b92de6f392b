// Copyright (c) Ken Kocienda and other contributors.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! Visitor extensions: hooks run by the module builder for each statement.
//!
//! An extension sees every statement the builder walks. `visit_stmt` runs
//! after the builder's own handling of the statement; `depart_stmt` runs
//! after a compound statement's children and before its scope (if any) is
//! left. Extensions get the registry, the current scope and the module being
//! built through [`ExtContext`].
//!
//! # Example
//!
//! ```ignore
//! struct CountCalls(AtomicUsize);
//!
//! impl VisitorExt for CountCalls {
//!     fn name(&self) -> &'static str { "count-calls" }
//!     fn visit_stmt(&self, cx: &mut ExtContext<'_>, stmt: &Stmt) {
//!         if let Stmt::Expr { value: Expr::Call { .. }, .. } = stmt {
//!             self.0.fetch_add(1, Ordering::Relaxed);
//!         }
//!     }
//! }
//!
//! system.register_extension(Arc::new(CountCalls(AtomicUsize::new(0))));
//! ```

use crate::model::EntityId;
use crate::syntax::Stmt;
use crate::system::System;

/// Build context handed to extension hooks.
pub struct ExtContext<'a> {
    system: &'a mut System,
    current: EntityId,
    module: EntityId,
}

impl<'a> ExtContext<'a> {
    pub(crate) fn new(system: &'a mut System, current: EntityId, module: EntityId) -> Self {
        ExtContext {
            system,
            current,
            module,
        }
    }

    pub fn system(&self) -> &System {
        self.system
    }

    pub fn system_mut(&mut self) -> &mut System {
        self.system
    }

    /// The innermost open scope.
    pub fn current(&self) -> EntityId {
        self.current
    }

    /// The module being built.
    pub fn module(&self) -> EntityId {
        self.module
    }

    /// Attach an informational note to an entity.
    pub fn add_extra_info(&mut self, id: EntityId, info: impl Into<String>) {
        self.system.entity_mut(id).extra_info.push(info.into());
    }
}

/// A statement-level hook into the module builder.
pub trait VisitorExt: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &'static str;

    fn visit_stmt(&self, _cx: &mut ExtContext<'_>, _stmt: &Stmt) {}

    fn depart_stmt(&self, _cx: &mut ExtContext<'_>, _stmt: &Stmt) {}
}
