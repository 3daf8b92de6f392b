// Copyright (c) Ken Kocienda and other contributors.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! Core infrastructure for tugdoc.
//!
//! This crate provides language-agnostic infrastructure:
//! - Error types and error codes
//! - The diagnostics collector fed by the model builder
//! - JSON output types for CLI responses

pub mod diagnostics;
pub mod error;
pub mod output;
