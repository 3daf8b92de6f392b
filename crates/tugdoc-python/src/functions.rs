// Copyright (c) Ken Kocienda and other contributors.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! Function definitions: signatures, decorators, properties and overloads.
//!
//! A `def` becomes a Function (or a Method inside a class) unless a
//! property-like decorator turns it into a property Attribute. Definitions
//! decorated with an overload marker are merged into one Function: each
//! overload adds an [`Overload`] record and the last plain definition
//! supplies the primary signature. An overload that shows up after the
//! primary is reported and dropped.

use crate::builder::{leading_docstring, ModuleBuilder, Skip};
use crate::classify::{classify_decorator, DecoratorRole};
use crate::exprs::{dotted_name, is_none_literal, unstring_annotation};
use crate::model::{
    Decorator, EntityId, EntityKind, EntityType, Overload, ParamKind, Parameter, Signature,
};
use crate::syntax::{Arg, Arguments, Expr, FunctionDef};

/// What a definition does to an existing entry of the same name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FunctionSlot {
    /// Create a new Function.
    New,
    /// Extend an existing overload group.
    Reuse(EntityId),
    /// An overload after the primary.
    Discard(EntityId),
}

/// Decorator roles seen on one definition.
#[derive(Debug, Default)]
struct DecoratorSummary {
    decorators: Vec<Decorator>,
    is_property: bool,
    is_classmethod: bool,
    is_staticmethod: bool,
    is_overload: bool,
    /// `x.setter` / `x.deleter`: the name the definition is stored under.
    accessor_name: Option<String>,
}

impl ModuleBuilder<'_> {
    /// Create (or extend) the Function for `def` and open its scope.
    pub(crate) fn visit_function(&mut self, def: &FunctionDef) -> Result<EntityId, Skip> {
        let parent = self.current();
        let parent_type = self.system.entity(parent).entity_type();
        if parent_type == EntityType::Function {
            return Err(Skip::Ignored);
        }
        let summary = self.summarize_decorators(parent, &def.decorators, parent_type == EntityType::Class);
        let func_name = summary.accessor_name.clone().unwrap_or_else(|| def.name.clone());
        if self.is_guarded(parent, &func_name) {
            return Err(Skip::Ignored);
        }

        if summary.is_property {
            let attr = self.visit_property(parent, def, summary.decorators);
            let full_name = self.system.full_name(attr);
            if summary.is_classmethod {
                let message = format!("{} is both property and classmethod", full_name);
                self.system.report(attr, message, "ast", 0, -1);
            }
            if summary.is_staticmethod {
                let message = format!("{} is both property and staticmethod", full_name);
                self.system.report(attr, message, "ast", 0, -1);
            }
            return Err(Skip::Handled);
        }

        let func = match self.function_slot(parent, &func_name, summary.is_overload) {
            FunctionSlot::New => self.system.add_function(parent, &func_name, def.line),
            FunctionSlot::Reuse(existing) => existing,
            FunctionSlot::Discard(existing) => {
                let message = format!(
                    "{} overload appeared after primary function",
                    self.system.full_name(existing)
                );
                let offset =
                    i64::from(def.line) - i64::from(self.system.entity(existing).linenumber);
                self.system.report(existing, message, "ast", offset, -1);
                return Err(Skip::Ignored);
            }
        };
        let full_name = self.system.full_name(func);

        if let Some((text, line)) = leading_docstring(&def.body) {
            if summary.is_overload {
                let offset = i64::from(line) - i64::from(self.system.entity(func).linenumber);
                let message = format!("{} overload has docstring, unsupported", full_name);
                self.system.report(func, message, "ast", offset, -1);
            } else {
                self.system.set_docstring(func, text, line);
            }
        }

        if summary.is_classmethod && summary.is_staticmethod {
            let message = format!("{} is both classmethod and staticmethod", full_name);
            self.system.report(func, message, "ast", 0, -1);
        }
        // Conflicting decorators leave the default kind in place.
        let kind = match (summary.is_classmethod, summary.is_staticmethod) {
            (true, false) => Some(EntityKind::ClassMethod),
            (false, true) => Some(EntityKind::StaticMethod),
            _ => None,
        };

        let signature = match build_signature(&def.args, def.returns.as_ref()) {
            Ok(signature) => Some(signature),
            Err(reason) => {
                let message = format!("{} has invalid parameters: {}", full_name, reason);
                self.system.report(func, message, "ast", 0, -1);
                None
            }
        };

        let entity = self.system.entity_mut(func);
        if let Some(kind) = kind {
            entity.kind = Some(kind);
        }
        if let Some(data) = entity.as_function_mut() {
            data.is_async = def.is_async;
            data.decorators = summary.decorators.clone();
            if summary.is_overload {
                data.overloads.push(Overload {
                    signature,
                    decorators: summary.decorators,
                    primary: func,
                    line: def.line,
                });
            } else {
                data.signature = signature;
            }
        }

        self.enter(func);
        Ok(func)
    }

    fn summarize_decorators(
        &self,
        parent: EntityId,
        decorators: &[Expr],
        in_class: bool,
    ) -> DecoratorSummary {
        let mut summary = DecoratorSummary::default();
        for decorator in decorators {
            let (callee, args) = match decorator {
                Expr::Call { func, args, .. } => (func.as_ref(), Some(args.clone())),
                other => (other, None),
            };
            let Some(parts) = dotted_name(callee) else {
                summary.decorators.push(Decorator {
                    name: callee.to_string(),
                    args,
                    role: DecoratorRole::Other,
                    target: None,
                });
                continue;
            };
            let name = self.system.expand_name(parent, &parts.join("."));
            let role = classify_decorator(&parts, &name, in_class, self.system.options());
            match role {
                DecoratorRole::Property => summary.is_property = true,
                DecoratorRole::ClassMethod => summary.is_classmethod = true,
                DecoratorRole::StaticMethod => summary.is_staticmethod = true,
                DecoratorRole::Overload => summary.is_overload = true,
                DecoratorRole::Setter | DecoratorRole::Deleter => {
                    summary.accessor_name = Some(parts[parts.len() - 2..].join("."));
                }
                DecoratorRole::Other => {}
            }
            let target = self.system.resolve_full_name(&name);
            summary.decorators.push(Decorator {
                name,
                args,
                role,
                target,
            });
        }
        // An accessor is a plain method stored under its suffixed name.
        if summary.accessor_name.is_some() {
            summary.is_property = false;
        }
        summary
    }

    fn function_slot(&self, parent: EntityId, name: &str, is_overload: bool) -> FunctionSlot {
        let Some(existing) = self.system.entity(parent).contents.get(name) else {
            return FunctionSlot::New;
        };
        let entity = self.system.entity(existing);
        if entity.module() != Some(self.module) {
            return FunctionSlot::New;
        }
        match entity.as_function() {
            Some(data) if is_overload && data.signature.is_some() => {
                FunctionSlot::Discard(existing)
            }
            Some(data) if !data.overloads.is_empty() => FunctionSlot::Reuse(existing),
            _ => FunctionSlot::New,
        }
    }

    /// Record a property-decorated `def` as a property Attribute.
    fn visit_property(
        &mut self,
        parent: EntityId,
        def: &FunctionDef,
        decorators: Vec<Decorator>,
    ) -> EntityId {
        let attr = self
            .system
            .add_attribute(parent, &def.name, Some(EntityKind::Property), def.line);

        if let Some((text, line)) = leading_docstring(&def.body) {
            self.system.set_docstring(attr, text, line);
            let cleaned = self
                .system
                .entity(attr)
                .docstring
                .as_ref()
                .map(|doc| doc.text.clone())
                .unwrap_or_default();
            let fields = PropertyDoc::parse(&cleaned);
            if fields.body.is_empty() && fields.returns.is_some() {
                let message = format!(
                    "{} docstring has only a return field, using it as the description",
                    self.system.full_name(attr)
                );
                self.system.report(attr, message, "docstring", 0, 1);
            }
            let entity = self.system.entity_mut(attr);
            if let Some(doc) = entity.docstring.as_mut() {
                doc.text = fields.text();
            }
            if let Some(data) = entity.as_attribute_mut() {
                data.parsed_type = fields.rtype;
            }
        }

        if let Some(data) = self.system.entity_mut(attr).as_attribute_mut() {
            data.annotation = def.returns.as_ref().map(unstring_annotation);
            data.decorators = decorators;
        }
        attr
    }
}

// ============================================================================
// Signatures
// ============================================================================

/// Build the signature of a definition.
///
/// Defaults align with the end of the positional parameters. A literal
/// `None` return annotation is dropped.
pub(crate) fn build_signature(args: &Arguments, returns: Option<&Expr>) -> Result<Signature, String> {
    let positional_count = args.posonlyargs.len() + args.args.len();
    if args.defaults.len() > positional_count {
        return Err("more defaults than positional parameters".to_string());
    }
    let first_default = positional_count - args.defaults.len();

    let mut params = Vec::new();
    let positional = args
        .posonlyargs
        .iter()
        .map(|arg| (arg, ParamKind::PositionalOnly))
        .chain(args.args.iter().map(|arg| (arg, ParamKind::PositionalOrKeyword)));
    for (index, (arg, kind)) in positional.enumerate() {
        let default = index
            .checked_sub(first_default)
            .and_then(|i| args.defaults.get(i))
            .cloned();
        params.push(parameter(arg, kind, default));
    }
    if let Some(arg) = &args.vararg {
        params.push(parameter(arg, ParamKind::VarPositional, None));
    }
    for (index, arg) in args.kwonlyargs.iter().enumerate() {
        let default = args.kw_defaults.get(index).cloned().flatten();
        params.push(parameter(arg, ParamKind::KeywordOnly, default));
    }
    if let Some(arg) = &args.kwarg {
        params.push(parameter(arg, ParamKind::VarKeyword, None));
    }

    let mut seen = std::collections::HashSet::new();
    for param in &params {
        if !seen.insert(param.name.as_str()) {
            return Err(format!("duplicate parameter name: '{}'", param.name));
        }
    }

    let returns = returns
        .filter(|expr| !is_none_literal(expr))
        .map(unstring_annotation);
    Ok(Signature { params, returns })
}

fn parameter(arg: &Arg, kind: ParamKind, default: Option<Expr>) -> Parameter {
    Parameter {
        name: arg.name.clone(),
        kind,
        default,
        annotation: arg.annotation.as_ref().map(unstring_annotation),
    }
}

// ============================================================================
// Property docstrings
// ============================================================================

/// A property docstring split into its description and `@field:` blocks.
#[derive(Debug, Default, PartialEq)]
struct PropertyDoc {
    body: String,
    returns: Option<String>,
    rtype: Option<String>,
    /// Other fields, verbatim.
    others: Vec<String>,
}

impl PropertyDoc {
    fn parse(text: &str) -> Self {
        let mut doc = PropertyDoc::default();
        let mut body = Vec::new();
        let mut fields: Vec<Vec<&str>> = Vec::new();
        for line in text.lines() {
            if line.trim_start().starts_with('@') {
                fields.push(vec![line.trim_start()]);
            } else if let Some(field) = fields.last_mut() {
                field.push(line.trim());
            } else {
                body.push(line);
            }
        }
        doc.body = body.join("\n").trim().to_string();

        for field in fields {
            let joined = field.join("\n");
            let Some((tag, content)) = joined[1..].split_once(':') else {
                doc.others.push(joined);
                continue;
            };
            let content = content.trim().to_string();
            match tag.trim() {
                "return" | "returns" => doc.returns = Some(content),
                "rtype" | "returntype" => doc.rtype = Some(content),
                _ => doc.others.push(joined),
            }
        }
        doc
    }

    /// Description text with the return fields folded away.
    fn text(&self) -> String {
        let mut parts = Vec::new();
        if !self.body.is_empty() {
            parts.push(self.body.clone());
        } else if let Some(returns) = &self.returns {
            parts.push(returns.clone());
        }
        parts.extend(self.others.iter().cloned());
        parts.join("\n\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ProcessingState;
    use crate::syntax::{ClassDef, Module, Stmt};
    use crate::system::System;

    fn build(body: Vec<Stmt>) -> System {
        let mut system = System::default();
        let module = system.add_module("m", false).unwrap();
        let state = system.build_module(module, Ok(Module::new(body))).unwrap();
        assert_eq!(state, ProcessingState::Processed);
        system
    }

    fn signature(system: &System, name: &str) -> String {
        let id = system.lookup(name).unwrap();
        let data = system.entity(id).as_function().unwrap();
        data.signature.as_ref().unwrap().to_string()
    }

    fn import_overload() -> Stmt {
        Stmt::import_from(Some("typing"), &[("overload", None)], 0, 1)
    }

    fn overload_def(name: &str, param: &str, annotation: &str, line: u32) -> Stmt {
        FunctionDef::new(name, line)
            .with_decorator(Expr::name("overload"))
            .with_args(Arguments {
                args: vec![Arg::annotated(param, Expr::name(annotation))],
                ..Arguments::default()
            })
            .into_stmt()
    }

    mod signatures {
        use super::*;

        #[test]
        fn all_parameter_kinds_render_in_order() {
            let args = Arguments {
                posonlyargs: vec![Arg::new("a")],
                args: vec![Arg::new("b")],
                vararg: Some(Arg::new("args")),
                kwonlyargs: vec![Arg::new("c"), Arg::new("d")],
                kw_defaults: vec![None, Some(Expr::int(2))],
                kwarg: Some(Arg::new("kw")),
                defaults: vec![Expr::int(1)],
            };
            let sig = build_signature(&args, Some(&Expr::str("Foo"))).unwrap();
            assert_eq!(sig.to_string(), "(a, /, b=1, *args, c, d=2, **kw) -> Foo");
        }

        #[test]
        fn none_return_is_dropped() {
            let sig = build_signature(&Arguments::simple(&["x"]), Some(&Expr::none())).unwrap();
            assert_eq!(sig.returns, None);
            assert_eq!(sig.to_string(), "(x)");
        }

        #[test]
        fn duplicate_parameter_is_rejected() {
            let err = build_signature(&Arguments::simple(&["a", "a"]), None).unwrap_err();
            assert_eq!(err, "duplicate parameter name: 'a'");
        }

        #[test]
        fn invalid_parameters_leave_no_signature() {
            let system = build(vec![FunctionDef::new("f", 1)
                .with_args(Arguments::simple(&["a", "a"]))
                .into_stmt()]);
            let id = system.lookup("m.f").unwrap();
            assert_eq!(system.entity(id).as_function().unwrap().signature, None);
            let diags = system.diagnostics().all();
            assert_eq!(diags.len(), 1);
            assert_eq!(
                diags[0].message,
                "m.f has invalid parameters: duplicate parameter name: 'a'"
            );
        }

        #[test]
        fn decorated_function_keeps_def_line() {
            // The def line of a decorated function is its first decorator's line.
            let system = build(vec![FunctionDef::new("cached", 3)
                .with_decorator(Expr::dotted("functools.cache"))
                .into_stmt()]);
            let id = system.lookup("m.cached").unwrap();
            assert_eq!(system.entity(id).linenumber, 3);
        }

        #[test]
        fn async_flag_and_docstring() {
            let system = build(vec![FunctionDef::new("fetch", 1)
                .with_async(true)
                .with_body(vec![Stmt::docstring("Fetch it.", 2)])
                .into_stmt()]);
            let id = system.lookup("m.fetch").unwrap();
            assert!(system.entity(id).as_function().unwrap().is_async);
            assert_eq!(system.entity(id).docstring.as_ref().unwrap().text, "Fetch it.");
        }

        #[test]
        fn nested_functions_are_not_entities() {
            let system = build(vec![FunctionDef::new("outer", 1)
                .with_body(vec![FunctionDef::new("inner", 2).into_stmt()])
                .into_stmt()]);
            assert!(system.lookup("m.outer").is_some());
            assert!(system.lookup("m.outer.inner").is_none());
        }
    }

    mod overloads {
        use super::*;

        #[test]
        fn overloads_collect_on_primary() {
            let system = build(vec![
                import_overload(),
                overload_def("f", "x", "int", 3),
                overload_def("f", "x", "str", 6),
                FunctionDef::new("f", 9)
                    .with_args(Arguments::simple(&["x"]))
                    .into_stmt(),
            ]);
            let id = system.lookup("m.f").unwrap();
            let data = system.entity(id).as_function().unwrap();
            assert_eq!(data.overloads.len(), 2);
            let rendered: Vec<String> = data
                .overloads
                .iter()
                .map(|o| o.signature.as_ref().unwrap().to_string())
                .collect();
            assert_eq!(rendered, vec!["(x: int)", "(x: str)"]);
            assert!(data.overloads.iter().all(|o| o.primary == id));
            assert_eq!(data.overloads[0].decorators[0].name, "typing.overload");
            assert_eq!(signature(&system, "m.f"), "(x)");
            assert!(system.diagnostics().is_empty());
        }

        #[test]
        fn overload_after_primary_is_discarded() {
            let system = build(vec![
                import_overload(),
                FunctionDef::new("f", 3)
                    .with_args(Arguments::simple(&["x"]))
                    .into_stmt(),
                overload_def("f", "y", "int", 6),
            ]);
            assert_eq!(signature(&system, "m.f"), "(x)");
            let id = system.lookup("m.f").unwrap();
            assert!(system.entity(id).as_function().unwrap().overloads.is_empty());
            let diags = system.diagnostics().all();
            assert_eq!(diags.len(), 1);
            assert_eq!(diags[0].message, "m.f overload appeared after primary function");
            assert_eq!(diags[0].line, 6);
        }

        #[test]
        fn later_primary_keeps_overloads() {
            let system = build(vec![
                import_overload(),
                overload_def("f", "a", "int", 3),
                FunctionDef::new("f", 6)
                    .with_args(Arguments::simple(&["x"]))
                    .into_stmt(),
                FunctionDef::new("f", 9)
                    .with_args(Arguments::simple(&["y"]))
                    .into_stmt(),
            ]);
            let id = system.lookup("m.f").unwrap();
            let data = system.entity(id).as_function().unwrap();
            assert_eq!(data.overloads.len(), 1);
            assert_eq!(data.overloads[0].primary, id);
            assert_eq!(signature(&system, "m.f"), "(y)");
            assert!(system.diagnostics().is_empty());
            assert!(system.lookup("m.f 1").is_none());
        }

        #[test]
        fn invalid_primary_does_not_close_the_group() {
            let system = build(vec![
                import_overload(),
                overload_def("f", "a", "int", 3),
                FunctionDef::new("f", 6)
                    .with_args(Arguments::simple(&["x", "x"]))
                    .into_stmt(),
                overload_def("f", "b", "str", 9),
            ]);
            let id = system.lookup("m.f").unwrap();
            let data = system.entity(id).as_function().unwrap();
            assert_eq!(data.signature, None);
            assert_eq!(data.overloads.len(), 2);
            let messages: Vec<_> = system
                .diagnostics()
                .all()
                .iter()
                .map(|d| d.message.as_str())
                .collect();
            assert_eq!(
                messages,
                vec!["m.f has invalid parameters: duplicate parameter name: 'x'"]
            );
        }

        #[test]
        fn overload_docstring_is_reported_and_ignored() {
            let system = build(vec![
                import_overload(),
                FunctionDef::new("f", 3)
                    .with_decorator(Expr::name("overload"))
                    .with_body(vec![Stmt::docstring("Not shown.", 4)])
                    .into_stmt(),
                FunctionDef::new("f", 6).into_stmt(),
            ]);
            let id = system.lookup("m.f").unwrap();
            assert!(system.entity(id).docstring.is_none());
            let diags = system.diagnostics().all();
            assert_eq!(diags.len(), 1);
            assert_eq!(diags[0].message, "m.f overload has docstring, unsupported");
            assert_eq!(diags[0].line, 4);
        }
    }

    mod methods {
        use super::*;

        fn in_class(members: Vec<Stmt>) -> System {
            build(vec![ClassDef::new("C", 1).with_body(members).into_stmt()])
        }

        #[test]
        fn method_kinds_follow_decorators() {
            let system = in_class(vec![
                FunctionDef::new("plain", 2).into_stmt(),
                FunctionDef::new("make", 4)
                    .with_decorator(Expr::name("classmethod"))
                    .into_stmt(),
                FunctionDef::new("util", 6)
                    .with_decorator(Expr::name("staticmethod"))
                    .into_stmt(),
            ]);
            let kind = |name: &str| system.entity(system.lookup(name).unwrap()).kind;
            assert_eq!(kind("m.C.plain"), Some(EntityKind::Method));
            assert_eq!(kind("m.C.make"), Some(EntityKind::ClassMethod));
            assert_eq!(kind("m.C.util"), Some(EntityKind::StaticMethod));
        }

        #[test]
        fn both_classmethod_and_staticmethod_stays_method() {
            let system = in_class(vec![FunctionDef::new("odd", 2)
                .with_decorator(Expr::name("classmethod"))
                .with_decorator(Expr::name("staticmethod"))
                .into_stmt()]);
            let id = system.lookup("m.C.odd").unwrap();
            assert_eq!(system.entity(id).kind, Some(EntityKind::Method));
            assert_eq!(
                system.diagnostics().all()[0].message,
                "m.C.odd is both classmethod and staticmethod"
            );
        }

        #[test]
        fn property_becomes_attribute() {
            let system = in_class(vec![
                FunctionDef::new("size", 2)
                    .with_decorator(Expr::name("property"))
                    .with_returns(Expr::str("int"))
                    .with_body(vec![Stmt::docstring("The size.\n\n@rtype: int", 3)])
                    .into_stmt(),
                FunctionDef::new("size", 5)
                    .with_decorator(Expr::dotted("size.setter"))
                    .with_args(Arguments::simple(&["self", "value"]))
                    .into_stmt(),
            ]);
            let size = system.lookup("m.C.size").unwrap();
            let entity = system.entity(size);
            assert_eq!(entity.kind, Some(EntityKind::Property));
            assert_eq!(entity.docstring.as_ref().unwrap().text, "The size.");
            let data = entity.as_attribute().unwrap();
            assert_eq!(data.annotation, Some(Expr::name("int")));
            assert_eq!(data.parsed_type.as_deref(), Some("int"));
            assert_eq!(data.decorators[0].role, DecoratorRole::Property);

            let setter = system.lookup("m.C.size.setter").unwrap();
            assert_eq!(system.entity(setter).kind, Some(EntityKind::Method));
            assert!(system.diagnostics().is_empty());
        }

        #[test]
        fn property_return_field_becomes_description() {
            let system = in_class(vec![FunctionDef::new("name", 2)
                .with_decorator(Expr::name("property"))
                .with_body(vec![Stmt::docstring("@return: the display name", 3)])
                .into_stmt()]);
            let id = system.lookup("m.C.name").unwrap();
            assert_eq!(
                system.entity(id).docstring.as_ref().unwrap().text,
                "the display name"
            );
            let diags = system.diagnostics().all();
            assert_eq!(diags.len(), 1);
            assert_eq!(diags[0].thresh, 1);
        }

        #[test]
        fn property_decorator_outside_class_is_opaque() {
            let system = build(vec![FunctionDef::new("f", 1)
                .with_decorator(Expr::name("property"))
                .into_stmt()]);
            let id = system.lookup("m.f").unwrap();
            assert_eq!(system.entity(id).kind, Some(EntityKind::Function));
        }
    }

    #[test]
    fn property_doc_keeps_other_fields() {
        let doc = PropertyDoc::parse("Body.\n\n@return: value\n@note: careful\n  here");
        assert_eq!(doc.body, "Body.");
        assert_eq!(doc.returns.as_deref(), Some("value"));
        assert_eq!(doc.others, vec!["@note: careful\nhere".to_string()]);
        assert_eq!(doc.text(), "Body.\n\n@note: careful\nhere");
    }
}
