// Copyright (c) Ken Kocienda and other contributors.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! Method Resolution Order (MRO) computation using C3 linearization.
//!
//! The linearization is computed over resolved base slots only: a base that
//! is still unknown contributes nothing. The algorithm guarantees that:
//!
//! - Children precede their parents
//! - Bases keep the order they were declared in
//! - The ordering is consistent across the hierarchy
//!
//! When no consistent order exists (or the bases form a cycle) the caller
//! falls back to [`System::depth_first_bases`].

use std::collections::HashSet;

use thiserror::Error;

use crate::model::EntityId;
use crate::system::System;

// ============================================================================
// Error Types
// ============================================================================

/// Errors that can occur during MRO computation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MroError {
    /// No valid C3 linearization exists.
    #[error("inconsistent hierarchy for class '{class_name}': cannot compute MRO")]
    InconsistentHierarchy { class_name: String },

    /// A class is (transitively) its own base.
    #[error("class '{class_name}' inherits from itself")]
    Cycle { class_name: String },
}

pub type MroResult<T> = Result<T, MroError>;

// ============================================================================
// C3 linearization
// ============================================================================

impl System {
    /// Compute the MRO of `class`, starting with `class` itself.
    pub fn compute_mro(&self, class: EntityId) -> MroResult<Vec<EntityId>> {
        let mut visiting = HashSet::new();
        self.compute_mro_internal(class, &mut visiting)
    }

    fn compute_mro_internal(
        &self,
        class: EntityId,
        visiting: &mut HashSet<EntityId>,
    ) -> MroResult<Vec<EntityId>> {
        if !visiting.insert(class) {
            return Err(MroError::Cycle {
                class_name: self.full_name(class),
            });
        }

        let bases: Vec<EntityId> = self
            .entity(class)
            .as_class()
            .map(|data| {
                data.base_objects
                    .iter()
                    .filter_map(|slot| slot.resolved())
                    .collect()
            })
            .unwrap_or_default();

        let mut seqs = Vec::with_capacity(bases.len() + 1);
        for base in &bases {
            seqs.push(self.compute_mro_internal(*base, visiting)?);
        }
        seqs.push(bases);

        visiting.remove(&class);
        let mut mro = vec![class];
        match merge(&mut seqs) {
            Some(merged) => mro.extend(merged),
            None => {
                return Err(MroError::InconsistentHierarchy {
                    class_name: self.full_name(class),
                })
            }
        }
        Ok(mro)
    }
}

/// C3 merge: repeatedly take the first head that appears in no sequence's
/// tail. `None` means the sequences admit no consistent order.
fn merge(seqs: &mut Vec<Vec<EntityId>>) -> Option<Vec<EntityId>> {
    let mut result = Vec::new();

    loop {
        seqs.retain(|seq| !seq.is_empty());
        if seqs.is_empty() {
            return Some(result);
        }

        let candidate = seqs.iter().map(|seq| seq[0]).find(|head| {
            !seqs
                .iter()
                .any(|s| s.len() > 1 && s[1..].contains(head))
        })?;

        result.push(candidate);
        for seq in seqs.iter_mut() {
            if seq.first() == Some(&candidate) {
                seq.remove(0);
            }
        }
    }
}
