// Copyright (c) Ken Kocienda and other contributors.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! Build driver: the first pass over one module's syntax tree.
//!
//! [`System::build_module`] walks a module top-down with a [`ModuleBuilder`],
//! which keeps an explicit stack of open scopes. Entering a class or function
//! pushes it; leaving a module or class finalizes the attributes it holds
//! (constant annotations, inferred annotations).
//!
//! # Override guard
//!
//! The `else` arm of an `if` and `except` handlers run conditionally. While
//! one of them is walked, names that were already bound in the enclosing
//! module or class when the arm was entered cannot be re-declared; names
//! first introduced inside the arm are recorded as usual.
//!
//! # Skipped statements
//!
//! Handlers that decide a statement creates nothing return `Err(Skip)` to
//! their direct caller, which moves on to the next statement.

use std::collections::HashSet;
use std::sync::Arc;

use tugdoc_core::error::SourceError;

use crate::classify::legacy_method_kind;
use crate::exprs::{dotted_name, dotted_string, is_literal, is_name_equals_main, unstring_annotation};
use crate::extensions::{ExtContext, VisitorExt};
use crate::model::{
    BaseSlot, ClassData, Decorator, EntityId, EntityKind, EntityType, ProcessingState, RawBase,
};
use crate::syntax::{self, BinOpKind, ClassDef, Constant, Expr, Stmt};
use crate::system::{BuildError, BuildResult, System};

/// Module-level names holding metadata rather than documented variables.
const META_VARIABLES: &[&str] = &["__all__", "__docformat__"];

/// Why a statement was not turned into (or attached to) an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Skip {
    /// Nothing was recorded.
    Ignored,
    /// Fully handled without an entity of its own (an alias, a property).
    Handled,
}

/// Names bound in `ctx` when a conditionally executed arm was entered.
#[derive(Debug, Clone)]
struct OverrideGuard {
    ctx: EntityId,
    names: HashSet<String>,
}

// ============================================================================
// Entry point
// ============================================================================

impl System {
    /// Run the first pass over one module.
    ///
    /// `source` is the parsed tree, or the reason it could not be produced;
    /// in that case the module is marked [`ProcessingState::Errored`] with a
    /// single diagnostic and stays registered as an empty shell.
    pub fn build_module(
        &mut self,
        id: EntityId,
        source: Result<syntax::Module, SourceError>,
    ) -> BuildResult<ProcessingState> {
        let state = self.module_state(id).ok_or(BuildError::NotAModule { id })?;
        let name = self.full_name(id);
        if state != ProcessingState::NotProcessed {
            return Err(BuildError::AlreadyBuilt { name, state });
        }

        let tree = match source {
            Ok(tree) => tree,
            Err(err) => {
                tracing::warn!(module = %name, error = %err, "module build aborted");
                self.report(id, err.to_string(), "parse", 0, -1);
                self.set_module_state(id, ProcessingState::Errored);
                return Ok(ProcessingState::Errored);
            }
        };

        tracing::debug!(module = %name, statements = tree.body.len(), "building module");
        self.set_module_state(id, ProcessingState::Processing);
        self.parse_module_metadata(id, &tree.body);
        ModuleBuilder::new(self, id).build(&tree.body);
        self.set_module_state(id, ProcessingState::Processed);
        if let Some(module) = self.entity_mut(id).as_module_mut() {
            module.tree = Some(tree);
        }
        tracing::debug!(module = %name, "module built");
        Ok(ProcessingState::Processed)
    }

    /// Pre-scan top-level `__all__` and `__docformat__` assignments.
    fn parse_module_metadata(&mut self, module: EntityId, body: &[Stmt]) {
        for stmt in body {
            let Stmt::Assign {
                targets,
                value,
                line,
                ..
            } = stmt
            else {
                continue;
            };
            match targets.as_slice() {
                [Expr::Name { id }] if id == "__all__" => self.parse_all(module, value, *line),
                [Expr::Name { id }] if id == "__docformat__" => {
                    self.parse_docformat(module, value, *line)
                }
                _ => {}
            }
        }
    }

    fn parse_all(&mut self, module: EntityId, value: &Expr, line: u32) {
        let offset = i64::from(line);
        let (Expr::List { elts } | Expr::Tuple { elts }) = value else {
            self.report(module, r#"Cannot parse value assigned to "__all__""#, "all", offset, -1);
            return;
        };
        let mut names = Vec::with_capacity(elts.len());
        for (index, item) in elts.iter().enumerate() {
            match item {
                Expr::Constant {
                    value: Constant::Str(name),
                } => names.push(name.clone()),
                item if is_literal(item) => {
                    let message = format!(
                        r#"Element {} of "__all__" has type "{}", expected "str""#,
                        index,
                        literal_type_name(item)
                    );
                    self.report(module, message, "all", offset, -1);
                }
                _ => {
                    let message = format!(r#"Cannot parse element {} of "__all__""#, index);
                    self.report(module, message, "all", offset, -1);
                }
            }
        }
        let previous = self
            .entity_mut(module)
            .as_module_mut()
            .and_then(|m| m.all.replace(names));
        if previous.is_some() {
            self.report(
                module,
                r#"Assignment to "__all__" overrides previous assignment"#,
                "all",
                offset,
                -1,
            );
        }
    }

    fn parse_docformat(&mut self, module: EntityId, value: &Expr, line: u32) {
        let offset = i64::from(line);
        let text = match value {
            Expr::Constant {
                value: Constant::Str(text),
            } => text,
            _ => {
                self.report(
                    module,
                    r#"Cannot parse value assigned to "__docformat__": not a string"#,
                    "docformat",
                    offset,
                    -1,
                );
                return;
            }
        };
        let Some(format) = text.split_whitespace().next() else {
            self.report(
                module,
                r#"Cannot parse value assigned to "__docformat__": empty value"#,
                "docformat",
                offset,
                -1,
            );
            return;
        };
        let previous = self
            .entity_mut(module)
            .as_module_mut()
            .and_then(|m| m.docformat.replace(format.to_lowercase()));
        if previous.is_some() {
            self.report(
                module,
                r#"Assignment to "__docformat__" overrides previous assignment"#,
                "docformat",
                offset,
                -1,
            );
        }
    }
}

/// Python type name of a literal, for messages.
fn literal_type_name(expr: &Expr) -> &'static str {
    match expr {
        Expr::Constant { value } => value.type_name(),
        Expr::List { .. } => "list",
        Expr::Tuple { .. } => "tuple",
        Expr::Set { .. } => "set",
        Expr::Dict { .. } => "dict",
        Expr::UnaryOp { operand, .. } => literal_type_name(operand),
        _ => "object",
    }
}

// ============================================================================
// ModuleBuilder
// ============================================================================

/// Walks one module, holding the open-scope stack.
pub(crate) struct ModuleBuilder<'a> {
    pub(crate) system: &'a mut System,
    pub(crate) module: EntityId,
    stack: Vec<EntityId>,
    guard: Option<OverrideGuard>,
    control_flow_depth: usize,
    extensions: Vec<Arc<dyn VisitorExt>>,
}

impl<'a> ModuleBuilder<'a> {
    pub(crate) fn new(system: &'a mut System, module: EntityId) -> Self {
        let extensions = system.extensions();
        ModuleBuilder {
            system,
            module,
            stack: Vec::new(),
            guard: None,
            control_flow_depth: 0,
            extensions,
        }
    }

    fn build(mut self, body: &[Stmt]) {
        self.enter(self.module);
        if let Some((text, line)) = leading_docstring(body) {
            self.system.set_docstring(self.module, text, line);
        }
        self.walk_body(body);
        self.leave(self.module);
    }

    // ------------------------------------------------------------------------
    // Scope stack
    // ------------------------------------------------------------------------

    /// The innermost open scope.
    pub(crate) fn current(&self) -> EntityId {
        self.stack.last().copied().unwrap_or(self.module)
    }

    pub(crate) fn enter(&mut self, id: EntityId) {
        debug_assert_eq!(self.system.entity(id).module(), Some(self.module));
        self.stack.push(id);
    }

    pub(crate) fn leave(&mut self, id: EntityId) {
        let popped = self.stack.pop();
        debug_assert_eq!(popped, Some(id));
        if self.system.entity(id).is_container() {
            self.system.finalize_scope(id);
        }
    }

    /// The class owning the method currently being walked.
    fn method_class(&self) -> Option<EntityId> {
        let current = self.system.entity(self.current());
        if current.entity_type() != EntityType::Function {
            return None;
        }
        current
            .parent()
            .filter(|p| self.system.entity(*p).entity_type() == EntityType::Class)
    }

    pub(crate) fn in_control_flow(&self) -> bool {
        self.control_flow_depth > 0
    }

    // ------------------------------------------------------------------------
    // Override guard
    // ------------------------------------------------------------------------

    fn guarded(&mut self, walk: impl FnOnce(&mut Self)) {
        let ctx = self.system.scope_container(self.current());
        let names = self.system.local_names(ctx).into_iter().collect();
        let saved = self.guard.replace(OverrideGuard { ctx, names });
        walk(self);
        self.guard = saved;
    }

    /// Whether the active guard blocks binding `name` in `scope`.
    pub(crate) fn is_guarded(&self, scope: EntityId, name: &str) -> bool {
        self.guard
            .as_ref()
            .is_some_and(|g| g.ctx == scope && g.names.contains(name))
    }

    /// Names the active guard blocks in `scope`.
    pub(crate) fn guarded_names(&self, scope: EntityId) -> Vec<String> {
        match &self.guard {
            Some(guard) if guard.ctx == scope => guard.names.iter().cloned().collect(),
            _ => Vec::new(),
        }
    }

    fn in_block(&mut self, body: &[Stmt]) {
        self.control_flow_depth += 1;
        self.walk_body(body);
        self.control_flow_depth -= 1;
    }

    // ------------------------------------------------------------------------
    // Walk
    // ------------------------------------------------------------------------

    fn walk_body(&mut self, body: &[Stmt]) {
        for (index, stmt) in body.iter().enumerate() {
            self.walk_stmt(stmt, body.get(index + 1));
        }
    }

    fn walk_stmt(&mut self, stmt: &Stmt, next: Option<&Stmt>) {
        match stmt {
            Stmt::ClassDef(def) => self.walk_class(stmt, def),
            Stmt::FunctionDef(def) => match self.visit_function(def) {
                Ok(func) => {
                    self.run_visit(stmt);
                    self.walk_body(&def.body);
                    self.run_depart(stmt);
                    self.leave(func);
                }
                Err(_) => {
                    self.run_visit(stmt);
                    self.run_depart(stmt);
                }
            },
            _ => {
                self.handle_stmt(stmt, next);
                self.run_visit(stmt);
                self.walk_children(stmt);
                self.run_depart(stmt);
            }
        }
    }

    fn walk_children(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::If {
                test, body, orelse, ..
            } => {
                if !is_name_equals_main(test) {
                    self.in_block(body);
                }
                if !orelse.is_empty() {
                    self.guarded(|b| b.in_block(orelse));
                }
            }
            // Loop `else` arms are not walked.
            Stmt::While { body, .. } | Stmt::For { body, .. } | Stmt::With { body, .. } => {
                self.in_block(body)
            }
            Stmt::Try {
                body,
                handlers,
                orelse,
                finalbody,
                ..
            } => {
                self.in_block(body);
                self.in_block(orelse);
                self.in_block(finalbody);
                if !handlers.is_empty() {
                    self.guarded(|b| {
                        for handler in handlers {
                            b.in_block(&handler.body);
                        }
                    });
                }
            }
            Stmt::Match { cases, .. } => {
                for case in cases {
                    self.in_block(&case.body);
                }
            }
            _ => {}
        }
    }

    fn run_visit(&mut self, stmt: &Stmt) {
        let extensions = self.extensions.clone();
        let current = self.current();
        let mut cx = ExtContext::new(self.system, current, self.module);
        for ext in &extensions {
            tracing::trace!(extension = ext.name(), line = stmt.line(), "visit");
            ext.visit_stmt(&mut cx, stmt);
        }
    }

    fn run_depart(&mut self, stmt: &Stmt) {
        let extensions = self.extensions.clone();
        let current = self.current();
        let mut cx = ExtContext::new(self.system, current, self.module);
        for ext in &extensions {
            ext.depart_stmt(&mut cx, stmt);
        }
    }

    fn handle_stmt(&mut self, stmt: &Stmt, next: Option<&Stmt>) {
        match stmt {
            Stmt::Assign {
                targets,
                value,
                type_comment,
                line,
            } => {
                let annotation = type_comment
                    .as_deref()
                    .map(|text| unstring_annotation(&Expr::str(text)));
                for target in targets {
                    self.visit_assign_target(target, annotation.as_ref(), value, *line, next);
                }
            }
            Stmt::AnnAssign {
                target,
                annotation,
                value,
                line,
            } => {
                let annotation = unstring_annotation(annotation);
                if self
                    .handle_assignment(target, Some(&annotation), value.as_ref(), *line, None)
                    .is_ok()
                {
                    self.inline_docstring(target, next);
                }
            }
            Stmt::AugAssign {
                target,
                op,
                value,
                line,
            } => {
                let _ = self.handle_assignment(target, None, Some(value), *line, Some(*op));
            }
            Stmt::Import { names, .. } => self.visit_import(names),
            Stmt::ImportFrom {
                module,
                names,
                level,
                line,
            } => self.visit_import_from(module.as_deref(), names, *level, *line),
            _ => {}
        }
    }

    // ------------------------------------------------------------------------
    // Classes
    // ------------------------------------------------------------------------

    fn walk_class(&mut self, stmt: &Stmt, def: &ClassDef) {
        let parent = self.current();
        if self.system.entity(parent).entity_type() == EntityType::Function
            || self.is_guarded(parent, &def.name)
        {
            self.run_visit(stmt);
            self.run_depart(stmt);
            return;
        }

        let mut data = ClassData::default();
        for base in &def.bases {
            let name_expr = match base {
                Expr::Subscript { value, .. } => value.as_ref(),
                other => other,
            };
            let text = dotted_string(name_expr).unwrap_or_else(|| base.to_string());
            let expanded = self.system.expand_name(parent, &text);
            let slot = match self.system.resolve_full_name(&expanded) {
                Some(id) if self.system.entity(id).entity_type() == EntityType::Class => {
                    BaseSlot::Resolved(id)
                }
                _ => BaseSlot::Unknown,
            };
            data.raw_bases.push(RawBase {
                text,
                expr: base.clone(),
            });
            data.base_names.push(expanded);
            data.base_objects.push(slot);
        }

        let class = self.system.add_class(parent, &def.name, def.line);
        for decorator in &def.decorators {
            let (callee, args) = match decorator {
                Expr::Call { func, args, .. } => (func.as_ref(), Some(args.clone())),
                other => (other, None),
            };
            match dotted_name(callee) {
                Some(parts) => {
                    let name = self.system.expand_name(parent, &parts.join("."));
                    let role = crate::classify::classify_decorator(
                        &parts,
                        &name,
                        false,
                        self.system.options(),
                    );
                    let target = self.system.resolve_full_name(&name);
                    data.decorators.push(Decorator {
                        name,
                        args,
                        role,
                        target,
                    });
                }
                None => self
                    .system
                    .report(class, "cannot make sense of class decorator", "ast", 0, -1),
            }
        }
        if let Some(slot) = self.system.entity_mut(class).as_class_mut() {
            *slot = data;
        }
        if let Some((text, line)) = leading_docstring(&def.body) {
            self.system.set_docstring(class, text, line);
        }

        self.enter(class);
        self.run_visit(stmt);
        self.walk_body(&def.body);
        self.run_depart(stmt);
        self.leave(class);
    }

    // ------------------------------------------------------------------------
    // Assignments
    // ------------------------------------------------------------------------

    fn visit_assign_target(
        &mut self,
        target: &Expr,
        annotation: Option<&Expr>,
        value: &Expr,
        line: u32,
        next: Option<&Stmt>,
    ) {
        if self
            .handle_assignment(target, annotation, Some(value), line, None)
            .is_ok()
        {
            self.inline_docstring(target, next);
        }
    }

    fn handle_assignment(
        &mut self,
        target: &Expr,
        annotation: Option<&Expr>,
        value: Option<&Expr>,
        line: u32,
        augassign: Option<BinOpKind>,
    ) -> Result<(), Skip> {
        match target {
            Expr::Name { id } => {
                let scope = self.current();
                if self.is_guarded(scope, id) {
                    return Err(Skip::Ignored);
                }
                match self.system.entity(scope).entity_type() {
                    EntityType::Module => {
                        self.assign_in_module(id, annotation, value, line, augassign)
                    }
                    EntityType::Class => {
                        if augassign.is_none() && self.retag_legacy_method(scope, id, value) {
                            return Ok(());
                        }
                        self.assign_in_class(id, annotation, value, line, augassign)
                    }
                    // Locals of a function.
                    _ => Ok(()),
                }
            }
            Expr::Attribute { value: base, attr } if augassign.is_none() => {
                if attr == "__doc__" {
                    self.update_docstring(base, value, line);
                    return Err(Skip::Ignored);
                }
                match base.as_ref() {
                    Expr::Name { id } if id == "self" => {
                        self.assign_instance_var(attr, annotation, value, line)
                    }
                    _ => Ok(()),
                }
            }
            Expr::Attribute { .. } => Err(Skip::Ignored),
            other => {
                let message = format!("ignoring assignment to {}: not a name", other);
                self.system
                    .report(self.module, message, "ast", i64::from(line), 2);
                Err(Skip::Ignored)
            }
        }
    }

    /// Record `target = <dotted name>` as an alias rather than an attribute.
    fn record_alias(&mut self, scope: EntityId, target: &str, value: Option<&Expr>) -> bool {
        if self.system.entity(scope).contents.contains(target) {
            return false;
        }
        let Some(dotted) = value.and_then(dotted_string) else {
            return false;
        };
        let full_name = self.system.expand_name(scope, &dotted);
        self.system
            .entity_mut(scope)
            .local_aliases
            .insert(target.to_string(), full_name);
        true
    }

    fn assign_in_module(
        &mut self,
        name: &str,
        annotation: Option<&Expr>,
        value: Option<&Expr>,
        line: u32,
        augassign: Option<BinOpKind>,
    ) -> Result<(), Skip> {
        if META_VARIABLES.contains(&name) {
            return Err(Skip::Ignored);
        }
        let scope = self.current();
        if augassign.is_none() && self.record_alias(scope, name, value) {
            return Err(Skip::Handled);
        }
        let attr = match self.system.entity(scope).contents.get(name) {
            Some(existing) => existing,
            None if augassign.is_some() => return Ok(()),
            None => self
                .system
                .add_attribute(scope, name, Some(EntityKind::Variable), line),
        };
        if self.system.entity(attr).entity_type() != EntityType::Attribute {
            return Err(Skip::Ignored);
        }
        self.record_attribute(attr, annotation, value, line, augassign, EntityKind::Variable);
        Ok(())
    }

    /// Whether `name` may be an attribute of `class`: unbound, or bound (here
    /// or in a base) to an attribute.
    fn may_be_attribute(&self, class: EntityId, name: &str) -> bool {
        match self.system.find(class, name) {
            Some(found) => self.system.entity(found).entity_type() == EntityType::Attribute,
            None => true,
        }
    }

    fn assign_in_class(
        &mut self,
        name: &str,
        annotation: Option<&Expr>,
        value: Option<&Expr>,
        line: u32,
        augassign: Option<BinOpKind>,
    ) -> Result<(), Skip> {
        let class = self.current();
        if augassign.is_none() && self.record_alias(class, name, value) {
            return Err(Skip::Handled);
        }
        if !self.may_be_attribute(class, name) {
            return Err(Skip::Ignored);
        }
        let attr = match self.system.entity(class).contents.get(name) {
            Some(existing) => existing,
            None if augassign.is_some() => return Ok(()),
            None => self.system.add_attribute(class, name, None, line),
        };
        let entity = self.system.entity_mut(attr);
        if entity.kind.is_none() {
            entity.kind = Some(EntityKind::ClassVariable);
        }
        self.record_attribute(
            attr,
            annotation,
            value,
            line,
            augassign,
            EntityKind::ClassVariable,
        );
        Ok(())
    }

    fn assign_instance_var(
        &mut self,
        name: &str,
        annotation: Option<&Expr>,
        value: Option<&Expr>,
        line: u32,
    ) -> Result<(), Skip> {
        let Some(class) = self.method_class() else {
            return Err(Skip::Ignored);
        };
        if !self.may_be_attribute(class, name) || self.is_guarded(class, name) {
            return Err(Skip::Ignored);
        }
        let attr = match self.system.entity(class).contents.get(name) {
            Some(existing) => existing,
            None => self.system.add_attribute(class, name, None, line),
        };
        let entity = self.system.entity_mut(attr);
        entity.set_line_number(line);
        entity.kind = Some(EntityKind::InstanceVariable);
        if let Some(data) = entity.as_attribute_mut() {
            if let Some(annotation) = annotation {
                data.annotation = Some(annotation.clone());
            }
            if let Some(value) = value {
                data.value = Some(value.clone());
            }
        }
        Ok(())
    }

    /// Store one assignment on an attribute: annotation, line, constant
    /// classification, then the value.
    fn record_attribute(
        &mut self,
        attr: EntityId,
        annotation: Option<&Expr>,
        value: Option<&Expr>,
        line: u32,
        augassign: Option<BinOpKind>,
        default_kind: EntityKind,
    ) {
        let entity = self.system.entity_mut(attr);
        entity.set_line_number(line);
        if let (Some(annotation), Some(data)) = (annotation, entity.as_attribute_mut()) {
            data.annotation = Some(annotation.clone());
        }
        let in_control_flow = self.in_control_flow();
        self.system
            .handle_constant(attr, annotation, value, in_control_flow, default_kind);

        let Some(value) = value else {
            return;
        };
        if let Some(data) = self.system.entity_mut(attr).as_attribute_mut() {
            match augassign {
                // The combined value keeps both operands.
                Some(op) => {
                    if let Some(old) = data.value.take() {
                        data.value = Some(Expr::bin_op(old, op, value.clone()));
                    }
                }
                None => data.value = Some(value.clone()),
            }
        }
    }

    /// `name = classmethod(name)` in a class body.
    fn retag_legacy_method(&mut self, class: EntityId, name: &str, value: Option<&Expr>) -> bool {
        let Some(kind) = legacy_method_kind(name, value) else {
            return false;
        };
        match self.system.entity(class).contents.get(name) {
            Some(func) if self.system.entity(func).entity_type() == EntityType::Function => {
                self.system.entity_mut(func).kind = Some(kind);
                true
            }
            _ => false,
        }
    }

    // ------------------------------------------------------------------------
    // Docstrings
    // ------------------------------------------------------------------------

    /// A string statement right after an assignment documents its target.
    fn inline_docstring(&mut self, target: &Expr, next: Option<&Stmt>) {
        let Some(next) = next else {
            return;
        };
        let Some(text) = next.as_docstring() else {
            return;
        };
        let (scope, name) = match target {
            Expr::Name { id } => (self.current(), id.as_str()),
            Expr::Attribute { value, attr } if matches!(value.as_ref(), Expr::Name { id } if id == "self") => {
                match self.method_class() {
                    Some(class) => (class, attr.as_str()),
                    None => return,
                }
            }
            _ => return,
        };
        if let Some(entity) = self.system.entity(scope).contents.get(name) {
            self.system.set_docstring(entity, text, next.line());
        }
    }

    /// `X.__doc__ = "text"`.
    fn update_docstring(&mut self, target: &Expr, value: Option<&Expr>, line: u32) {
        let scope = self.current();
        if self.system.entity(scope).entity_type() == EntityType::Function {
            return;
        }

        let target_entity = match dotted_string(target) {
            None => {
                self.warn_doc_assignment("Unable to figure out target for __doc__ assignment", line);
                None
            }
            Some(dotted) => {
                let full_name = self.system.expand_name(scope, &dotted);
                let found = self.system.lookup(&full_name);
                if found.is_none() {
                    let message = format!(
                        "Unable to figure out target for __doc__ assignment: \
                         computed full name not found: {}",
                        full_name
                    );
                    self.warn_doc_assignment(message, line);
                }
                found
            }
        };

        match value {
            Some(Expr::Constant {
                value: Constant::Str(text),
            }) => {
                if let Some(entity) = target_entity {
                    self.system.set_docstring(entity, text, line);
                }
            }
            Some(value) if is_literal(value) => {
                self.warn_doc_assignment("Ignoring value assigned to __doc__: not a string", line)
            }
            _ => self.warn_doc_assignment(
                "Unable to figure out value for __doc__ assignment, maybe too complex",
                line,
            ),
        }
    }

    fn warn_doc_assignment(&mut self, message: impl Into<String>, line: u32) {
        self.system
            .report(self.module, message, "ast", i64::from(line), -1);
    }
}

/// The docstring of a body: its leading string statement.
pub(crate) fn leading_docstring(body: &[Stmt]) -> Option<(&str, u32)> {
    let first = body.first()?;
    first.as_docstring().map(|text| (text, first.line()))
}
