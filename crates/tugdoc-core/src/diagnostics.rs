// Copyright (c) Ken Kocienda and other contributors.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! Diagnostics collected while building a semantic model.
//!
//! Every recoverable anomaly in analyzed source (a duplicate declaration, an
//! unparseable `__all__`, an overload out of order, ...) becomes one
//! [`Diagnostic`]. The builder never fails for these; it reports and moves on.
//!
//! ## Thresholds
//!
//! Each diagnostic carries a severity threshold. A diagnostic is *visible*
//! when the collector's verbosity is at least its threshold. The default
//! threshold is [`DEFAULT_THRESHOLD`] (-1) and the default verbosity is 0, so
//! ordinary diagnostics are visible and `thresh = 1` diagnostics only show up
//! with `--verbose 1` or higher.

use serde::{Deserialize, Serialize};

/// Threshold used when a caller does not pick one.
pub const DEFAULT_THRESHOLD: i8 = -1;

/// One reported anomaly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Full name of the module the anomaly was found in.
    pub module: String,
    /// Full name of the entity the report is attached to.
    pub entity: String,
    /// Section tag (e.g. "ast", "all", "overload", "post-process").
    pub section: String,
    /// Absolute source line (entity line plus offset).
    pub line: u32,
    /// Human-readable message.
    pub message: String,
    /// Severity threshold.
    pub thresh: i8,
}

impl Diagnostic {
    /// Create a diagnostic with the default threshold.
    pub fn new(
        module: impl Into<String>,
        entity: impl Into<String>,
        section: impl Into<String>,
        line: u32,
        message: impl Into<String>,
    ) -> Self {
        Diagnostic {
            module: module.into(),
            entity: entity.into(),
            section: section.into(),
            line,
            message: message.into(),
            thresh: DEFAULT_THRESHOLD,
        }
    }

    /// Set the severity threshold.
    pub fn with_thresh(mut self, thresh: i8) -> Self {
        self.thresh = thresh;
        self
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}: {}", self.module, self.line, self.message)
    }
}

/// Collects diagnostics and filters them by verbosity on read.
#[derive(Debug, Clone, Default)]
pub struct DiagnosticCollector {
    verbosity: i8,
    items: Vec<Diagnostic>,
}

impl DiagnosticCollector {
    /// Create an empty collector with the given verbosity.
    pub fn new(verbosity: i8) -> Self {
        DiagnosticCollector {
            verbosity,
            items: Vec::new(),
        }
    }

    /// Record a diagnostic.
    pub fn report(&mut self, diagnostic: Diagnostic) {
        if diagnostic.thresh <= self.verbosity {
            tracing::debug!(
                module = %diagnostic.module,
                section = %diagnostic.section,
                line = diagnostic.line,
                "{}",
                diagnostic.message
            );
        } else {
            tracing::trace!(module = %diagnostic.module, "suppressed: {}", diagnostic.message);
        }
        self.items.push(diagnostic);
    }

    pub fn verbosity(&self) -> i8 {
        self.verbosity
    }

    pub fn set_verbosity(&mut self, verbosity: i8) {
        self.verbosity = verbosity;
    }

    /// Every diagnostic recorded, regardless of threshold.
    pub fn all(&self) -> &[Diagnostic] {
        &self.items
    }

    /// Diagnostics whose threshold is within the current verbosity.
    pub fn visible(&self) -> impl Iterator<Item = &Diagnostic> {
        let verbosity = self.verbosity;
        self.items.iter().filter(move |d| d.thresh <= verbosity)
    }

    /// Diagnostics tagged with the given section.
    pub fn in_section<'a>(&'a self, section: &'a str) -> impl Iterator<Item = &'a Diagnostic> {
        self.items.iter().filter(move |d| d.section == section)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Remove and return everything collected so far.
    pub fn take(&mut self) -> Vec<Diagnostic> {
        std::mem::take(&mut self.items)
    }
}
