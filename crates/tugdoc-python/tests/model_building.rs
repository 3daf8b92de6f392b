// Copyright (c) Ken Kocienda and other contributors.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! Multi-module builds: first pass, post-processing and the graph
//! invariants that must hold afterwards.

use serde_json::json;
use tugdoc_core::error::SourceError;
use tugdoc_python::model::BaseSlot;
use tugdoc_python::syntax::{
    Arguments, ClassDef, Expr, FunctionDef, Module, Stmt,
};
use tugdoc_python::{EntityId, EntityKind, ProcessingState, System};

// ============================================================================
// Helpers
// ============================================================================

fn build(system: &mut System, name: &str, body: Vec<Stmt>) -> EntityId {
    let module = system
        .lookup_module(name)
        .unwrap_or_else(|| system.add_module(name, false).unwrap());
    let state = system.build_module(module, Ok(Module::new(body))).unwrap();
    assert_eq!(state, ProcessingState::Processed);
    module
}

fn class(name: &str, bases: &[&str], line: u32) -> Stmt {
    bases
        .iter()
        .fold(ClassDef::new(name, line), |def, base| {
            def.with_base(Expr::dotted(base))
        })
        .into_stmt()
}

fn resolved_bases(system: &System, class: &str) -> Vec<Option<String>> {
    let id = system.lookup(class).unwrap();
    system
        .entity(id)
        .as_class()
        .unwrap()
        .base_objects
        .iter()
        .map(|slot| slot.resolved().map(|b| system.full_name(b)))
        .collect()
}

fn subclasses(system: &System, class: &str) -> Vec<String> {
    let id = system.lookup(class).unwrap();
    system
        .entity(id)
        .as_class()
        .unwrap()
        .subclasses
        .iter()
        .map(|c| system.full_name(*c))
        .collect()
}

fn assert_full_names_consistent(system: &System) {
    for entity in system.entities() {
        let full_name = system.full_name(entity.id());
        match entity.parent() {
            Some(parent) => assert_eq!(
                full_name,
                format!("{}.{}", system.full_name(parent), entity.name())
            ),
            None => assert_eq!(full_name, entity.name()),
        }
    }
}

/// `a`: `class X`, `b`: `from a import X as Y`, `c`: `from b import Y;
/// class Z(Y)`.
fn alias_chain(order: &[&str]) -> System {
    let mut system = System::default();
    for name in ["a", "b", "c"] {
        system.add_module(name, false).unwrap();
    }
    for name in order {
        let body = match *name {
            "a" => vec![class("X", &[], 1)],
            "b" => vec![Stmt::import_from(Some("a"), &[("X", Some("Y"))], 0, 1)],
            _ => vec![
                Stmt::import_from(Some("b"), &[("Y", None)], 0, 1),
                class("Z", &["Y"], 2),
            ],
        };
        build(&mut system, name, body);
    }
    system.post_process().unwrap();
    system
}

// ============================================================================
// Graph invariants
// ============================================================================

#[test]
fn full_names_follow_ownership_after_reexport() {
    let mut system = System::default();
    system.add_module("pkg", true).unwrap();
    system.add_module("pkg._impl", false).unwrap();
    build(
        &mut system,
        "pkg",
        vec![
            Stmt::assign("__all__", Expr::list(vec![Expr::str("Widget")]), 1),
            Stmt::import_from(Some("_impl"), &[("Widget", None)], 1, 2),
        ],
    );
    build(
        &mut system,
        "pkg._impl",
        vec![ClassDef::new("Widget", 1)
            .with_body(vec![FunctionDef::new("draw", 2)
                .with_args(Arguments::simple(&["self"]))
                .into_stmt()])
            .into_stmt()],
    );
    let widget = system.lookup("pkg._impl.Widget").unwrap();

    let summary = system.post_process().unwrap();
    assert_eq!(summary.reexports, 1);
    assert_eq!(system.lookup("pkg.Widget"), Some(widget));
    assert!(system.lookup("pkg.Widget.draw").is_some());
    assert_eq!(system.lookup("pkg._impl.Widget"), None);
    assert_eq!(system.resolve_full_name("pkg._impl.Widget"), Some(widget));
    assert_eq!(
        system.entity(widget).module(),
        system.lookup_module("pkg._impl")
    );
    assert_full_names_consistent(&system);
}

#[test]
fn post_processing_twice_changes_nothing() {
    let mut system = System::default();
    build(
        &mut system,
        "shapes",
        vec![
            class("Square", &["Rect"], 1),
            class("Rect", &["Shape"], 3),
            class("Shape", &[], 5),
        ],
    );
    let first = system.post_process().unwrap();
    assert!(!first.is_noop());
    let bases = resolved_bases(&system, "shapes.Square");
    let subs = subclasses(&system, "shapes.Shape");

    let second = system.post_process().unwrap();
    assert!(second.is_noop(), "{:?}", second);
    assert_eq!(resolved_bases(&system, "shapes.Square"), bases);
    assert_eq!(subclasses(&system, "shapes.Shape"), subs);
}

#[test]
fn forward_base_resolves_after_post_processing() {
    let mut system = System::default();
    build(&mut system, "m", vec![class("B", &["A"], 1), class("A", &[], 4)]);
    assert_eq!(resolved_bases(&system, "m.B"), vec![None]);

    system.post_process().unwrap();
    assert_eq!(resolved_bases(&system, "m.B"), vec![Some("m.A".to_string())]);
    assert_eq!(subclasses(&system, "m.A"), vec!["m.B"]);
}

#[test]
fn alias_chains_collapse_in_any_build_order() {
    for order in [["a", "b", "c"], ["c", "b", "a"], ["b", "c", "a"]] {
        let system = alias_chain(&order);
        assert_eq!(
            resolved_bases(&system, "c.Z"),
            vec![Some("a.X".to_string())],
            "build order {:?}",
            order
        );
        assert_eq!(subclasses(&system, "a.X"), vec!["c.Z"]);
    }
}

#[test]
fn unresolvable_bases_keep_their_slot() {
    let mut system = System::default();
    build(
        &mut system,
        "m",
        vec![Stmt::import(&[("abc", None)], 1), class("C", &["abc.ABC", "Mixin"], 2)],
    );
    system.post_process().unwrap();
    let c = system.lookup("m.C").unwrap();
    let data = system.entity(c).as_class().unwrap();
    assert_eq!(data.raw_bases.len(), 2);
    assert_eq!(data.base_objects, vec![BaseSlot::Unknown, BaseSlot::Unknown]);
    assert_eq!(data.base_names, vec!["abc.ABC", "Mixin"]);
}

// ============================================================================
// Classification and scoping
// ============================================================================

#[test]
fn upper_case_name_is_constant_only_outside_blocks() {
    let mut system = System::default();
    build(
        &mut system,
        "m",
        vec![
            Stmt::assign("TIMEOUT", Expr::int(30), 1),
            Stmt::if_(
                Expr::name("DEBUG"),
                vec![Stmt::assign("LEVEL", Expr::int(10), 3)],
                vec![],
                2,
            ),
        ],
    );
    let kind = |name: &str| system.entity(system.lookup(name).unwrap()).kind;
    assert_eq!(kind("m.TIMEOUT"), Some(EntityKind::Constant));
    assert_eq!(kind("m.LEVEL"), Some(EntityKind::Variable));
}

#[test]
fn else_branch_cannot_override_existing_names() {
    let mut system = System::default();
    build(
        &mut system,
        "m",
        vec![
            Stmt::assign("X", Expr::int(0), 1),
            Stmt::if_(
                Expr::name("cond"),
                vec![Stmt::assign("X", Expr::int(1), 3)],
                vec![
                    Stmt::assign("X", Expr::int(2), 5),
                    Stmt::assign("Y", Expr::int(3), 6),
                    Stmt::assign("Y", Expr::int(4), 7),
                ],
                2,
            ),
        ],
    );
    let x = system.lookup("m.X").unwrap();
    let value = system.entity(x).as_attribute().unwrap().value.clone();
    assert_eq!(value, Some(Expr::int(1)));

    let y = system.lookup("m.Y").unwrap();
    let value = system.entity(y).as_attribute().unwrap().value.clone();
    assert_eq!(value, Some(Expr::int(4)));
}

#[test]
fn overload_after_primary_reports_once() {
    let mut system = System::default();
    build(
        &mut system,
        "m",
        vec![
            Stmt::import_from(Some("typing"), &[("overload", None)], 0, 1),
            FunctionDef::new("parse", 3)
                .with_args(Arguments::simple(&["text"]))
                .with_returns(Expr::name("int"))
                .into_stmt(),
            FunctionDef::new("parse", 6)
                .with_decorator(Expr::name("overload"))
                .with_args(Arguments::simple(&["data"]))
                .into_stmt(),
        ],
    );
    let parse = system.lookup("m.parse").unwrap();
    let data = system.entity(parse).as_function().unwrap();
    assert_eq!(data.signature.as_ref().unwrap().to_string(), "(text) -> int");
    assert!(data.overloads.is_empty());
    assert_eq!(system.diagnostics().len(), 1);
}

// ============================================================================
// Failures
// ============================================================================

#[test]
fn errored_module_stays_as_empty_shell() {
    let mut system = System::default();
    let broken = system.add_module("broken", false).unwrap();
    let state = system
        .build_module(broken, Err(SourceError::unparseable("broken.py", "invalid syntax")))
        .unwrap();
    assert_eq!(state, ProcessingState::Errored);
    build(
        &mut system,
        "user",
        vec![
            Stmt::import_from(Some("broken"), &[("Thing", None)], 0, 1),
            class("K", &["Thing"], 2),
        ],
    );

    system.post_process().unwrap();
    assert_eq!(system.lookup_module("broken"), Some(broken));
    assert!(system.entity(broken).contents.is_empty());
    assert_eq!(resolved_bases(&system, "user.K"), vec![None]);
    let diags = system.diagnostics().all();
    assert_eq!(diags.len(), 1);
    assert_eq!(diags[0].module, "broken");
    assert_eq!(diags[0].section, "parse");
}

// ============================================================================
// JSON input
// ============================================================================

#[test]
fn tree_deserialized_from_json_builds() {
    let tree: Module = serde_json::from_value(json!({
        "body": [
            {
                "type": "expr",
                "value": {"type": "constant", "value": {"kind": "str", "value": "Geometry."}},
                "line": 1
            },
            {
                "type": "class_def",
                "name": "Point",
                "line": 3,
                "body": [
                    {
                        "type": "ann_assign",
                        "target": {"type": "name", "id": "x"},
                        "annotation": {"type": "name", "id": "float"},
                        "line": 4
                    },
                    {
                        "type": "function_def",
                        "name": "norm",
                        "args": {"args": [{"name": "self"}]},
                        "returns": {"type": "constant", "value": {"kind": "str", "value": "float"}},
                        "line": 6
                    }
                ]
            }
        ]
    }))
    .unwrap();

    let mut system = System::default();
    let module = system.add_module("geometry", false).unwrap();
    system.build_module(module, Ok(tree)).unwrap();
    system.post_process().unwrap();

    assert_eq!(
        system.entity(module).docstring.as_ref().map(|d| d.text.as_str()),
        Some("Geometry.")
    );
    let x = system.lookup("geometry.Point.x").unwrap();
    assert_eq!(system.entity(x).kind, Some(EntityKind::ClassVariable));
    assert_eq!(
        system.entity(x).as_attribute().unwrap().annotation,
        Some(Expr::name("float"))
    );
    let norm = system.lookup("geometry.Point.norm").unwrap();
    assert_eq!(system.entity(norm).kind, Some(EntityKind::Method));
    let signature = system.entity(norm).as_function().unwrap().signature.clone();
    assert_eq!(signature.unwrap().to_string(), "(self) -> float");
}
