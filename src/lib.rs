// Copyright (c) Ken Kocienda and other contributors.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! tugdoc: semantic model builder for Python API documentation.
//!
//! Takes pre-parsed module trees, builds the object graph of packages,
//! modules, classes, functions and attributes, resolves names across
//! modules, and reports the result as JSON.

// Core infrastructure - re-exported from tugdoc-core
pub use tugdoc_core::diagnostics;
pub use tugdoc_core::error;
pub use tugdoc_core::output;

pub mod input;
pub mod report;

use tracing::{debug, info, info_span};

use tugdoc_core::error::TugdocError;
use tugdoc_python::{BuilderOptions, System};

use crate::input::ModuleInput;
use crate::report::BuildReport;

/// Register, build and post-process `inputs` as one system.
///
/// Packages are registered before their children whatever the input order.
/// A module whose source failed to load is still registered and ends up
/// `ERRORED`; only a name that cannot be placed in the package hierarchy
/// fails the batch.
pub fn build_batch(
    mut inputs: Vec<ModuleInput>,
    options: BuilderOptions,
) -> Result<BuildReport, TugdocError> {
    let _span = info_span!("build_batch", modules = inputs.len()).entered();
    inputs.sort_by_key(ModuleInput::depth);

    let mut system = System::new(options);
    let mut registered = Vec::with_capacity(inputs.len());
    for input in inputs {
        let id = system
            .add_module(&input.name, input.is_package)
            .map_err(|e| TugdocError::module_registration(&input.name, e.to_string()))?;
        registered.push((id, input.source));
    }

    for (id, source) in registered {
        let state = system
            .build_module(id, source)
            .map_err(|e| TugdocError::internal(e.to_string()))?;
        debug!(module = %system.full_name(id), %state, "module built");
    }

    let summary = system
        .post_process()
        .map_err(|e| TugdocError::internal(e.to_string()))?;
    system.drop_syntax_trees();

    let report = BuildReport::from_system(&system, summary);
    info!(
        modules = report.modules.len(),
        entities = report.entities.len(),
        diagnostics = report.diagnostics.len(),
        "build finished"
    );
    Ok(report)
}
