// Copyright (c) Ken Kocienda and other contributors.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! End-to-end batch builds from module tree files.

use std::fs;
use std::path::Path;

use serde_json::{json, Value};
use tugdoc::build_batch;
use tugdoc::error::TugdocError;
use tugdoc::input::{collect_input_files, ModuleInput};
use tugdoc_python::{BuilderOptions, EntityKind, ProcessingState};

fn write_tree(dir: &Path, file: &str, document: Value) {
    fs::write(dir.join(file), serde_json::to_string_pretty(&document).unwrap()).unwrap();
}

fn load_dir(dir: &Path) -> Vec<ModuleInput> {
    collect_input_files(&[dir.to_path_buf()])
        .unwrap()
        .iter()
        .map(|path| ModuleInput::load(path))
        .collect()
}

fn name(id: &str) -> Value {
    json!({"type": "name", "id": id})
}

fn str_const(value: &str) -> Value {
    json!({"type": "constant", "value": {"kind": "str", "value": value}})
}

/// `pkg/__init__` re-exports `Shape` from `pkg.shapes`; `pkg.shapes` is read
/// after its package because file names sort that way, and `Square` derives
/// from a base declared later in the file.
fn write_package(dir: &Path) {
    write_tree(
        dir,
        "pkg.json",
        json!({
            "name": "pkg",
            "is_package": true,
            "tree": {"body": [
                {"type": "expr", "value": str_const("Shapes package."), "line": 1},
                {
                    "type": "assign",
                    "targets": [name("__all__")],
                    "value": {"type": "list", "elts": [str_const("Shape")]},
                    "line": 3
                },
                {
                    "type": "import_from",
                    "module": "shapes",
                    "names": [{"name": "Shape"}],
                    "level": 1,
                    "line": 4
                }
            ]}
        }),
    );
    write_tree(
        dir,
        "pkg.shapes.json",
        json!({
            "name": "pkg.shapes",
            "tree": {"body": [
                {"type": "class_def", "name": "Square", "bases": [name("Shape")], "line": 1},
                {"type": "class_def", "name": "Shape", "line": 4, "body": [
                    {"type": "expr", "value": str_const("A shape."), "line": 5}
                ]}
            ]}
        }),
    );
}

#[test]
fn package_builds_and_reexports() {
    let dir = tempfile::tempdir().expect("failed to create temp dir");
    write_package(dir.path());

    let report = build_batch(load_dir(dir.path()), BuilderOptions::default()).unwrap();
    assert_eq!(report.status, "ok");

    let pkg = report.module("pkg").unwrap();
    assert_eq!(pkg.state, ProcessingState::Processed);
    assert!(pkg.is_package);
    assert_eq!(pkg.all, Some(vec!["Shape".to_string()]));
    assert_eq!(report.module("pkg.shapes").unwrap().state, ProcessingState::Processed);

    let shape = report.entity("pkg.Shape").unwrap();
    assert_eq!(shape.kind, Some(EntityKind::Class));
    assert_eq!(shape.docstring.as_deref(), Some("A shape."));
    assert_eq!(shape.subclasses, vec!["pkg.shapes.Square"]);
    assert!(report.entity("pkg.shapes.Shape").is_none());

    let square = report.entity("pkg.shapes.Square").unwrap();
    assert_eq!(square.resolved_bases, vec![Some("pkg.Shape".to_string())]);
    assert_eq!(
        square.mro,
        Some(vec!["pkg.shapes.Square".to_string(), "pkg.Shape".to_string()])
    );
    assert_eq!(report.post_process.reexports, 1);
}

#[test]
fn input_order_does_not_matter() {
    let dir = tempfile::tempdir().expect("failed to create temp dir");
    write_package(dir.path());

    let mut inputs = load_dir(dir.path());
    inputs.reverse();
    let reversed = build_batch(inputs, BuilderOptions::default()).unwrap();
    let sorted = build_batch(load_dir(dir.path()), BuilderOptions::default()).unwrap();
    assert_eq!(
        serde_json::to_value(&reversed).unwrap(),
        serde_json::to_value(&sorted).unwrap()
    );
}

#[test]
fn broken_file_becomes_errored_module() {
    let dir = tempfile::tempdir().expect("failed to create temp dir");
    fs::write(dir.path().join("legacy.json"), "{ truncated").unwrap();
    write_tree(
        dir.path(),
        "app.json",
        json!({"name": "app", "error": "unexpected indent"}),
    );

    let report = build_batch(load_dir(dir.path()), BuilderOptions::default()).unwrap();
    assert_eq!(report.module("legacy").unwrap().state, ProcessingState::Errored);
    assert_eq!(report.module("app").unwrap().state, ProcessingState::Errored);
    assert!(report.entities.is_empty());

    let parse_errors: Vec<_> = report
        .diagnostics
        .iter()
        .filter(|d| d.section == "parse")
        .map(|d| d.module.as_str())
        .collect();
    assert_eq!(parse_errors, vec!["app", "legacy"]);
}

#[test]
fn verbosity_hides_low_severity_diagnostics() {
    let dir = tempfile::tempdir().expect("failed to create temp dir");
    write_tree(
        dir.path(),
        "m.json",
        json!({
            "name": "m",
            "tree": {"body": [
                {
                    "type": "import_from",
                    "module": "os",
                    "names": [{"name": "*"}],
                    "line": 1
                }
            ]}
        }),
    );

    let quiet = build_batch(load_dir(dir.path()), BuilderOptions::default()).unwrap();
    assert!(quiet.diagnostics.is_empty());

    let chatty = build_batch(
        load_dir(dir.path()),
        BuilderOptions::default().with_verbosity(1),
    )
    .unwrap();
    assert_eq!(chatty.diagnostics.len(), 1);
    assert_eq!(chatty.diagnostics[0].message, "import * from unknown os");
}

#[test]
fn orphan_module_fails_registration() {
    let dir = tempfile::tempdir().expect("failed to create temp dir");
    write_tree(
        dir.path(),
        "pkg.mod.json",
        json!({"name": "pkg.mod", "tree": {"body": []}}),
    );

    let err = build_batch(load_dir(dir.path()), BuilderOptions::default()).unwrap_err();
    match err {
        TugdocError::ModuleRegistration { name, .. } => assert_eq!(name, "pkg.mod"),
        other => panic!("expected registration error, got {:?}", other),
    }
}

#[test]
fn report_serializes_with_schema_version() {
    let dir = tempfile::tempdir().expect("failed to create temp dir");
    write_package(dir.path());

    let report = build_batch(load_dir(dir.path()), BuilderOptions::default()).unwrap();
    let value = serde_json::to_value(&report).unwrap();
    assert_eq!(value["status"], "ok");
    assert_eq!(value["schema_version"], "1");
    let square = value["entities"]
        .as_array()
        .unwrap()
        .iter()
        .find(|e| e["full_name"] == "pkg.shapes.Square")
        .unwrap();
    assert_eq!(square["type"], "class");
    assert_eq!(square["kind"], "class");
    assert!(square.get("signature").is_none());
}
