/*
 * Copyright 2024 Google LLC
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 * You may obtain a copy of the License at
 *
 *     http://www.apache.org/licenses/LICENSE-2.0
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the License for the specific language governing permissions and
 * limitations under the License.
 */

use serde::{Deserialize, Serialize};

use crate::runtime::RuntimeKeyStore;

/// Relational operator of a comparison filter.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    schemars::JsonSchema,
    strum_macros::Display,
    strum_macros::EnumString,
)]
pub enum ComparisonOp {
    /// `observed == threshold`
    #[default]
    #[serde(rename = "EQ")]
    #[strum(serialize = "EQ")]
    Eq,
    /// `observed >= threshold`
    #[serde(rename = "GE")]
    #[strum(serialize = "GE")]
    Ge,
    /// `observed <= threshold`
    #[serde(rename = "LE")]
    #[strum(serialize = "LE")]
    Le,
}

impl ComparisonOp {
    #[inline]
    pub fn apply(self, observed: u32, threshold: u32) -> bool {
        match self {
            Self::Eq => observed == threshold,
            Self::Ge => observed >= threshold,
            Self::Le => observed <= threshold,
        }
    }
}

/// An integer comparison whose threshold may be overridden at runtime.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ComparisonSpec {
    pub op: ComparisonOp,
    pub threshold: u32,
    pub runtime_key: Option<String>,
}

impl ComparisonSpec {
    pub fn new(op: ComparisonOp, threshold: u32) -> Self {
        Self {
            op,
            threshold,
            runtime_key: None,
        }
    }

    pub fn with_runtime_key(mut self, key: impl Into<String>) -> Self {
        self.runtime_key = Some(key.into());
        self
    }

    /// The threshold to compare against for this evaluation. Never cached, a
    /// runtime override only applies to the lookup that observed it.
    pub fn effective_threshold(&self, runtime: &dyn RuntimeKeyStore) -> u32 {
        match &self.runtime_key {
            Some(key) => runtime.get_u32(key, self.threshold),
            None => self.threshold,
        }
    }

    /// Compares `observed` against the effective threshold.
    ///
    /// Returns `None` when there is no observation to compare, which callers
    /// treat as the predicate not matching.
    pub fn evaluate(&self, observed: Option<u32>, runtime: &dyn RuntimeKeyStore) -> Option<bool> {
        let observed = observed?;
        Some(self.op.apply(observed, self.effective_threshold(runtime)))
    }
}
