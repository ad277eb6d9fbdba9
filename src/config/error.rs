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
use crate::filters::CreationError;

/// Failure to load a [`Config`][crate::Config].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error(transparent)]
    Invalid(#[from] ValidationError),
}

/// An access log entry that cannot be activated.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
#[error("access_log[{index}] (`{name}`): {source}")]
pub struct ValidationError {
    /// Position of the entry in `access_log`.
    pub index: usize,
    pub name: String,
    #[source]
    pub source: CreationError,
}

impl ValidationError {
    pub fn new(index: usize, name: impl Into<String>, source: CreationError) -> Self {
        Self {
            index,
            name: name.into(),
            source,
        }
    }
}
