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

//! Live key-value overrides consulted while evaluating filters.

use std::{collections::HashMap, io, sync::Arc};

use arc_swap::ArcSwap;

/// An error from a [`RuntimeKeyStore`] lookup or layer load.
#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    #[error("runtime store unavailable: {0}")]
    Unavailable(String),
    #[error("runtime key `{key}` has a non-scalar value")]
    NonScalar { key: String },
    #[error("failed to read runtime layer: {0}")]
    Io(#[from] io::Error),
    #[error("failed to parse runtime layer: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// A live key-value store that can override statically configured values.
///
/// Implementations are read concurrently by every worker evaluating filters
/// while being updated by an independent refresh path, so lookups must be
/// safe under concurrent reads and writes. Two lookups made while evaluating a
/// single filter tree may observe different snapshots.
pub trait RuntimeKeyStore: Send + Sync {
    /// Returns the raw value for `key`, `Ok(None)` if there is no override.
    fn get(&self, key: &str) -> Result<Option<String>, RuntimeError>;

    /// Resolves `key` as an unsigned 32-bit integer, returning `default` when
    /// the key has no override, its value does not parse, or the store fails.
    fn get_u32(&self, key: &str, default: u32) -> u32 {
        match self.get(key) {
            Ok(Some(raw)) => match raw.trim().parse::<u32>() {
                Ok(value) => value,
                Err(error) => {
                    tracing::debug!(key, value = %raw, %error, "runtime value is not a valid u32, using default");
                    crate::metrics::runtime_lookup_failures("invalid").inc();
                    default
                }
            },
            Ok(None) => default,
            Err(error) => {
                tracing::debug!(key, %error, "runtime lookup failed, using default");
                crate::metrics::runtime_lookup_failures("unavailable").inc();
                default
            }
        }
    }
}

impl<R: RuntimeKeyStore + ?Sized> RuntimeKeyStore for Arc<R> {
    fn get(&self, key: &str) -> Result<Option<String>, RuntimeError> {
        (**self).get(key)
    }
}

/// An in-memory runtime layer.
///
/// Individual keys are last-write-wins. [`Runtime::replace`] swaps the whole
/// layer at once, so a reader sees either the old or the new layer.
#[derive(Debug, Default)]
pub struct Runtime {
    values: ArcSwap<HashMap<String, String>>,
}

impl Runtime {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads a layer from a YAML mapping of keys to scalar values.
    ///
    /// ```yaml
    /// access_log.sample_rate: 25
    /// access_log.min_status: "500"
    /// ```
    pub fn from_reader<R: io::Read>(input: R) -> Result<Self, RuntimeError> {
        let runtime = Self::new();
        runtime.replace(parse_layer(input)?);
        Ok(runtime)
    }

    /// Sets `key` to `value`, overriding any previous value.
    pub fn set(&self, key: impl Into<String>, value: impl ToString) {
        let key = key.into();
        let value = value.to_string();
        tracing::trace!(%key, %value, "runtime key updated");
        self.values.rcu(|values| {
            let mut values = HashMap::clone(values);
            values.insert(key.clone(), value.clone());
            values
        });
    }

    /// Removes the override for `key`, returning its previous value.
    pub fn remove(&self, key: &str) -> Option<String> {
        let previous = self.values.rcu(|values| {
            let mut values = HashMap::clone(values);
            values.remove(key);
            values
        });
        previous.get(key).cloned()
    }

    /// Replaces every key in the layer with `values`.
    pub fn replace(&self, values: impl IntoIterator<Item = (String, String)>) {
        let values: HashMap<_, _> = values.into_iter().collect();
        tracing::debug!(keys = values.len(), "runtime layer replaced");
        self.values.store(Arc::new(values));
    }

    /// The current layer, unaffected by later updates.
    pub fn snapshot(&self) -> Arc<HashMap<String, String>> {
        self.values.load_full()
    }

    /// Reloads the layer from a YAML reader, see [`Runtime::from_reader`].
    pub fn reload<R: io::Read>(&self, input: R) -> Result<(), RuntimeError> {
        self.replace(parse_layer(input)?);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.values.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.load().is_empty()
    }
}

impl RuntimeKeyStore for Runtime {
    fn get(&self, key: &str) -> Result<Option<String>, RuntimeError> {
        Ok(self.values.load().get(key).cloned())
    }
}

fn parse_layer<R: io::Read>(input: R) -> Result<Vec<(String, String)>, RuntimeError> {
    let layer: Option<std::collections::BTreeMap<String, serde_yaml::Value>> =
        serde_yaml::from_reader(input)?;

    layer
        .unwrap_or_default()
        .into_iter()
        .map(|(key, value)| {
            let value = match value {
                serde_yaml::Value::String(value) => value,
                serde_yaml::Value::Number(value) => value.to_string(),
                serde_yaml::Value::Bool(value) => value.to_string(),
                _ => return Err(RuntimeError::NonScalar { key }),
            };
            Ok((key, value))
        })
        .collect()
}
