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
use std::{collections::HashMap, sync::Arc};

use arc_swap::ArcSwap;
use once_cell::sync::Lazy;

use super::{DynSink, DynSinkFactory, FileAccessLog, SinkConfig, SinkFactory, StaticSink, Stdout};
use crate::filters::CreationError;

type SinkMap = HashMap<&'static str, Arc<dyn SinkFactory>>;

static REGISTRY: Lazy<ArcSwap<SinkMap>> = Lazy::new(|| {
    ArcSwap::from_pointee(
        [FileAccessLog::factory(), Stdout::factory()]
            .into_iter()
            .map(|factory| (factory.name(), Arc::from(factory)))
            .collect(),
    )
});

/// Registry of every access log sink that configuration can name.
///
/// The built-in sinks are always present; [`SinkRegistry::register`] adds to
/// them, replacing any sink with the same name.
#[derive(Debug)]
pub struct SinkRegistry;

impl SinkRegistry {
    pub fn register(factories: impl IntoIterator<Item = DynSinkFactory>) {
        let mut registry = SinkMap::clone(&REGISTRY.load());
        for factory in factories {
            tracing::debug!(name = factory.name(), "registering access log sink");
            registry.insert(factory.name(), Arc::from(factory));
        }

        REGISTRY.store(Arc::new(registry));
    }

    /// Creates a new sink named `key` from `config`. Errors if no sink with
    /// that name is registered, or if the configuration is invalid.
    pub fn get(key: &str, config: Option<SinkConfig>) -> Result<DynSink, CreationError> {
        match REGISTRY.load().get(key).map(|factory| factory.create_sink(config)) {
            None => Err(CreationError::NotFound(key.to_owned())),
            Some(sink) => sink,
        }
    }

    /// Checks `config` against the sink named `key` without creating it.
    pub fn validate(key: &str, config: Option<SinkConfig>) -> Result<(), CreationError> {
        match REGISTRY.load().get(key) {
            None => Err(CreationError::NotFound(key.to_owned())),
            Some(factory) => factory.validate_config(config),
        }
    }

    pub fn contains(key: &str) -> bool {
        REGISTRY.load().contains_key(key)
    }

    /// The configuration schema of every registered sink, sorted by name.
    pub fn schemas() -> Vec<(&'static str, schemars::schema::RootSchema)> {
        let mut schemas: Vec<_> = REGISTRY
            .load()
            .values()
            .map(|factory| (factory.name(), factory.config_schema()))
            .collect();
        schemas.sort_by_key(|(name, _)| *name);
        schemas
    }
}
