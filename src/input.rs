// Copyright (c) Ken Kocienda and other contributors.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! Module input files.
//!
//! An input file is a JSON document describing one module:
//!
//! ```json
//! { "name": "pkg.mod", "is_package": false, "tree": { "body": [ ... ] } }
//! ```
//!
//! A parser that failed on the original source hands over
//! `{ "name": ..., "error": "message" }` instead of a tree.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::debug;
use walkdir::WalkDir;

use tugdoc_core::error::{SourceError, TugdocError};
use tugdoc_python::syntax::Module;

/// One module to register and build.
#[derive(Debug)]
pub struct ModuleInput {
    pub name: String,
    pub is_package: bool,
    /// The syntax tree, or why there is none.
    pub source: Result<Module, SourceError>,
}

#[derive(Deserialize)]
struct InputDocument {
    name: String,
    #[serde(default)]
    is_package: bool,
    #[serde(default)]
    tree: Option<Module>,
    #[serde(default)]
    error: Option<String>,
}

impl ModuleInput {
    pub fn new(name: impl Into<String>, is_package: bool, tree: Module) -> Self {
        ModuleInput {
            name: name.into(),
            is_package,
            source: Ok(tree),
        }
    }

    /// Load one input file.
    ///
    /// Never fails: a file that cannot be read or decoded becomes an input
    /// carrying a [`SourceError`], named after the file stem.
    pub fn load(path: &Path) -> Self {
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(source) => {
                return ModuleInput::failed(
                    path,
                    SourceError::Unreadable {
                        path: path.to_path_buf(),
                        source,
                    },
                )
            }
        };
        let document: InputDocument = match serde_json::from_str(&text) {
            Ok(document) => document,
            Err(err) => {
                let origin = path.display().to_string();
                return ModuleInput::failed(path, SourceError::unparseable(origin, err.to_string()));
            }
        };

        let source = match (document.tree, document.error) {
            (_, Some(message)) => Err(SourceError::unparseable(document.name.as_str(), message)),
            (Some(tree), None) => Ok(tree),
            (None, None) => Err(SourceError::unparseable(
                document.name.as_str(),
                "input has neither a tree nor an error",
            )),
        };
        ModuleInput {
            name: document.name,
            is_package: document.is_package,
            source,
        }
    }

    fn failed(path: &Path, err: SourceError) -> Self {
        let name = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        ModuleInput {
            name,
            is_package: false,
            source: Err(err),
        }
    }

    /// Number of dots in the module name.
    pub fn depth(&self) -> usize {
        self.name.matches('.').count()
    }
}

/// Expand `paths` into the sorted list of input files.
///
/// Files are taken as given; directories are walked recursively for
/// `*.json`.
pub fn collect_input_files(paths: &[PathBuf]) -> Result<Vec<PathBuf>, TugdocError> {
    let mut files = Vec::new();
    for path in paths {
        if path.is_file() {
            files.push(path.clone());
        } else if path.is_dir() {
            for entry in WalkDir::new(path).follow_links(true) {
                let entry = entry.map_err(|e| TugdocError::internal(e.to_string()))?;
                if entry.file_type().is_file()
                    && entry.path().extension().is_some_and(|ext| ext == "json")
                {
                    files.push(entry.into_path());
                }
            }
        } else {
            return Err(TugdocError::file_not_found(path.display().to_string()));
        }
    }
    files.sort();
    files.dedup();
    debug!(count = files.len(), "collected input files");
    Ok(files)
}
