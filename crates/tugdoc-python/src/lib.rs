// Copyright (c) Ken Kocienda and other contributors.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! Semantic model builder for Python code.
//!
//! This crate turns pre-parsed Python syntax trees into a cross-referenced
//! graph of packages, modules, classes, functions and attributes:
//! - `syntax` / `exprs`: the syntax-tree input boundary and expression helpers
//! - `model` / `system`: entities and the registry that owns them
//! - `resolver`: dotted-name expansion and alias resolution
//! - `builder`, `functions`, `imports`: the per-module first pass
//! - `classify`: kind heuristics (constants, type aliases, decorators)
//! - `postprocess` / `mro`: the whole-graph second pass
//!
//! # Example
//!
//! ```
//! use tugdoc_python::syntax::{ClassDef, Module};
//! use tugdoc_python::System;
//!
//! let mut system = System::default();
//! let module = system.add_module("shapes", false).unwrap();
//! let tree = Module::new(vec![ClassDef::new("Square", 1).into_stmt()]);
//! system.build_module(module, Ok(tree)).unwrap();
//! system.post_process().unwrap();
//! assert!(system.lookup("shapes.Square").is_some());
//! ```

mod builder;
pub mod classify;
pub mod exprs;
pub mod extensions;
mod functions;
mod imports;
pub mod model;
pub mod mro;
pub mod options;
pub mod postprocess;
pub mod resolver;
pub mod syntax;
pub mod system;

pub use classify::{DecoratorRole, TypeAliasExt};
pub use extensions::{ExtContext, VisitorExt};
pub use model::{BaseSlot, Entity, EntityId, EntityKind, EntityType, ProcessingState};
pub use mro::MroError;
pub use options::{BuilderOptions, DuplicatePolicy};
pub use postprocess::PostProcessSummary;
pub use system::{BuildError, BuildResult, System};
