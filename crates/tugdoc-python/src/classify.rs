// Copyright (c) Ken Kocienda and other contributors.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! Classification of ambiguous declarations.
//!
//! Assignments create attributes whose kind is only a first guess. The rules
//! here refine it:
//!
//! 1. A final-marker annotation (`Final`, `Final[int]`) makes a constant and
//!    is unwrapped to the inner type when the scope is left.
//! 2. An upper-case name assigned once, outside any control-flow block, is a
//!    constant.
//! 3. A heuristic constant that is reassigned falls back to the scope's
//!    default kind; an explicit final never does.
//! 4. A value that looks like a type expression, or a type-alias marker
//!    annotation, makes a type alias ([`TypeAliasExt`]).
//! 5. A call to a type-variable constructor makes a type variable
//!    ([`TypeAliasExt`]).
//! 6. Decorators are mapped to a closed set of roles by
//!    [`classify_decorator`]; property-like roles turn functions into
//!    property attributes.
//! 7. `name = classmethod(name)` re-tags the existing method.
//!
//! Missing annotations on attributes with a value are inferred from the
//! value's literal shape when the scope is left, so any explicit annotation
//! seen before then wins.

use serde::Serialize;

use crate::exprs::{dotted_string, infer_type, is_upper, unstring_annotation};
use crate::extensions::{ExtContext, VisitorExt};
use crate::model::{EntityId, EntityKind, EntityType};
use crate::options::BuilderOptions;
use crate::syntax::{Expr, Stmt};
use crate::system::System;

// ============================================================================
// Decorator roles
// ============================================================================

/// What a decorator means to the builder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DecoratorRole {
    Property,
    Setter,
    Deleter,
    ClassMethod,
    StaticMethod,
    Overload,
    /// Unrecognized; kept as opaque metadata.
    Other,
}

/// Map a decorator to its role.
///
/// `parts` is the decorator's dotted name as written (the callee, for
/// `@d(...)` decorators) and `expanded` its full name in the defining scope.
/// Property, method-kind and accessor roles are only recognized on class
/// members.
pub fn classify_decorator(
    parts: &[&str],
    expanded: &str,
    in_class: bool,
    options: &BuilderOptions,
) -> DecoratorRole {
    if in_class {
        if let Some(last) = parts.last() {
            if last.ends_with("property") || last.ends_with("Property") {
                return DecoratorRole::Property;
            }
        }
        match parts {
            ["classmethod"] => return DecoratorRole::ClassMethod,
            ["staticmethod"] => return DecoratorRole::StaticMethod,
            [.., _, "setter"] => return DecoratorRole::Setter,
            [.., _, "deleter"] => return DecoratorRole::Deleter,
            _ => {}
        }
    }
    if options.is_overload_marker(expanded) {
        return DecoratorRole::Overload;
    }
    DecoratorRole::Other
}

/// The kind a legacy `name = classmethod(name)` assignment gives `name`.
pub fn legacy_method_kind(target: &str, value: Option<&Expr>) -> Option<EntityKind> {
    let Some(Expr::Call { func, args, .. }) = value else {
        return None;
    };
    let Expr::Name { id: func_name } = func.as_ref() else {
        return None;
    };
    match args.as_slice() {
        [Expr::Name { id }] if id == target => match func_name.as_str() {
            "staticmethod" => Some(EntityKind::StaticMethod),
            "classmethod" => Some(EntityKind::ClassMethod),
            _ => None,
        },
        _ => None,
    }
}

// ============================================================================
// Attribute classification
// ============================================================================

impl System {
    /// Whether `expr` (or the value it subscripts) names one of `markers`
    /// when expanded in `ctx`.
    fn uses_annotation(&self, ctx: EntityId, expr: Option<&Expr>, markers: &[String]) -> bool {
        let expr = match expr {
            Some(Expr::Subscript { value, .. }) => value.as_ref(),
            Some(expr) => expr,
            None => return false,
        };
        match dotted_string(expr) {
            Some(name) => {
                let full = self.expand_name(ctx, &name);
                markers.iter().any(|m| *m == full)
            }
            None => false,
        }
    }

    /// `annotation` is a final marker, bare or subscripted.
    pub fn is_using_final(&self, ctx: EntityId, annotation: Option<&Expr>) -> bool {
        self.uses_annotation(ctx, annotation, &self.options().final_markers)
    }

    /// `expr` builds a type: a typing alias or PEP 585 class, bare or
    /// subscripted.
    pub fn is_typing_annotation(&self, ctx: EntityId, expr: &Expr) -> bool {
        let options = self.options();
        self.uses_annotation(ctx, Some(expr), &options.typing_aliases)
            || self.uses_annotation(ctx, Some(expr), &options.subscriptable_classes)
    }

    /// Whether an assignment of `value` with `annotation` to `attr` declares
    /// a constant.
    pub(crate) fn is_constant(
        &self,
        attr: EntityId,
        annotation: Option<&Expr>,
        value: Option<&Expr>,
        in_control_flow: bool,
    ) -> bool {
        if self.is_using_final(attr, annotation) {
            return true;
        }
        let entity = self.entity(attr);
        let overridden = entity
            .as_attribute()
            .is_some_and(|a| a.value.is_some() && value.is_some());
        !overridden && value.is_some() && !in_control_flow && is_upper(entity.name())
    }

    /// Apply constant rules 1 to 3 to `attr` for one assignment.
    ///
    /// Must run after the assignment's annotation is stored and before its
    /// value is.
    pub(crate) fn handle_constant(
        &mut self,
        attr: EntityId,
        annotation: Option<&Expr>,
        value: Option<&Expr>,
        in_control_flow: bool,
        default_kind: EntityKind,
    ) {
        if self.is_constant(attr, annotation, value, in_control_flow) {
            let explicit = self.is_using_final(attr, annotation);
            let entity = self.entity_mut(attr);
            entity.kind = Some(EntityKind::Constant);
            if let Some(data) = entity.as_attribute_mut() {
                data.explicit_kind |= explicit;
            }
        } else if self.entity(attr).kind == Some(EntityKind::Constant) {
            let entity = self.entity(attr);
            let explicit = entity.as_attribute().is_some_and(|a| a.explicit_kind);
            let annotation = entity.as_attribute().and_then(|a| a.annotation.clone());
            if !explicit && !self.is_using_final(attr, annotation.as_ref()) {
                self.entity_mut(attr).kind = Some(default_kind);
            }
        }
    }

    /// Replace a final marker annotation on a constant with the type it
    /// wraps (or with one inferred from the value).
    fn tweak_constant_annotation(&mut self, attr: EntityId) {
        let Some(data) = self.entity(attr).as_attribute() else {
            return;
        };
        let annotation = data.annotation.clone();
        let value = data.value.clone();
        if !self.is_using_final(attr, annotation.as_ref()) {
            return;
        }
        let inferred = value.as_ref().and_then(infer_type);
        let replacement = match annotation {
            Some(Expr::Subscript { slice, .. }) => match *slice {
                Expr::Slice { .. } | Expr::Tuple { .. } => {
                    self.report(
                        attr,
                        "Annotation is invalid, it should not contain slices.",
                        "ast",
                        0,
                        -1,
                    );
                    inferred
                }
                inner => Some(inner),
            },
            _ => inferred,
        };
        if let Some(data) = self.entity_mut(attr).as_attribute_mut() {
            data.annotation = replacement;
        }
    }

    /// Scope-exit pass over the attributes directly inside `scope`.
    pub(crate) fn finalize_scope(&mut self, scope: EntityId) {
        let attrs: Vec<EntityId> = self
            .entity(scope)
            .contents
            .ids()
            .filter(|id| self.entity(*id).entity_type() == EntityType::Attribute)
            .collect();
        for attr in &attrs {
            if self.entity(*attr).kind == Some(EntityKind::Constant) {
                self.tweak_constant_annotation(*attr);
            }
        }
        for attr in attrs {
            if let Some(data) = self.entity_mut(attr).as_attribute_mut() {
                if data.annotation.is_none() {
                    data.annotation = data.value.as_ref().and_then(infer_type);
                }
            }
        }
    }

    /// Rule 4: the attribute's value is a type expression, or it is
    /// annotated with a type-alias marker.
    pub fn is_type_alias(&self, attr: EntityId) -> bool {
        let entity = self.entity(attr);
        let Some(data) = entity.as_attribute() else {
            return false;
        };
        let Some(value) = &data.value else {
            return false;
        };
        if self.uses_annotation(attr, data.annotation.as_ref(), &self.options().type_alias_markers) {
            return true;
        }
        let scope = entity.parent().unwrap_or(attr);
        self.is_typing_annotation(scope, value)
    }

    /// Rule 5: the attribute's value calls a type-variable constructor.
    pub fn is_type_variable(&self, attr: EntityId) -> bool {
        let Some(Expr::Call { func, .. }) = self
            .entity(attr)
            .as_attribute()
            .and_then(|a| a.value.as_ref())
        else {
            return false;
        };
        dotted_string(func).is_some_and(|name| {
            let full = self.expand_name(attr, &name);
            self.options().is_type_variable_constructor(&full)
        })
    }
}

// ============================================================================
// Type alias extension
// ============================================================================

/// Detects type aliases and type variables after each assignment.
pub struct TypeAliasExt;

impl TypeAliasExt {
    fn classify(&self, cx: &mut ExtContext<'_>, target: &Expr) {
        let Expr::Name { id } = target else {
            return;
        };
        let current = cx.current();
        let system = cx.system_mut();
        let Some(attr) = system.entity(current).contents.get(id) else {
            return;
        };
        if system.entity(attr).entity_type() != EntityType::Attribute {
            return;
        }
        if system.is_type_alias(attr) {
            let entity = system.entity_mut(attr);
            entity.kind = Some(EntityKind::TypeAlias);
            if let Some(data) = entity.as_attribute_mut() {
                data.value = data.value.as_ref().map(unstring_annotation);
            }
        } else if system.is_type_variable(attr) {
            system.entity_mut(attr).kind = Some(EntityKind::TypeVariable);
        }
    }
}

impl VisitorExt for TypeAliasExt {
    fn name(&self) -> &'static str {
        "type-alias"
    }

    fn visit_stmt(&self, cx: &mut ExtContext<'_>, stmt: &Stmt) {
        match stmt {
            Stmt::Assign { targets, .. } => {
                for target in targets {
                    self.classify(cx, target);
                }
            }
            Stmt::AnnAssign { target, .. } => self.classify(cx, target),
            _ => {}
        }
    }
}
