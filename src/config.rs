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
//! Access log configuration.
//!
//! ```yaml
//! access_log:
//!   - name: envoy.access_loggers.file
//!     filter:
//!       and_filter:
//!         filters:
//!           - status_code_filter:
//!               comparison: { op: GE, value: { default_value: 500 } }
//!           - not_health_check_filter: {}
//!     typed_config:
//!       path: /var/log/access.log
//! ```

mod error;

use std::io;

use schemars::JsonSchema;
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::{
    access_log::{AccessLog, SinkConfig, SinkRegistry},
    filters::{AccessLogFilter, CreationError, PredicateNode},
    generated::envoy::config::accesslog::v3 as proto,
};

pub use self::error::{ConfigError, ValidationError};

/// Reads `T` from YAML or JSON, with enums written as single key maps such
/// as `status_code_filter: {...}`.
pub fn from_reader<T: DeserializeOwned, R: io::Read>(input: R) -> Result<T, serde_yaml::Error> {
    serde_yaml::with::singleton_map_recursive::deserialize(serde_yaml::Deserializer::from_reader(input))
}

/// Same as [`from_reader`], for configuration already in memory.
pub fn from_str<T: DeserializeOwned>(input: &str) -> Result<T, serde_yaml::Error> {
    serde_yaml::with::singleton_map_recursive::deserialize(serde_yaml::Deserializer::from_str(input))
}

/// The top-level configuration, a list of access logs.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub access_log: Vec<AccessLogConfig>,
}

/// The configuration of a single access log.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct AccessLogConfig {
    /// The name of the sink records are written to.
    pub name: String,
    /// Records are written when they pass the filter, or always when there is
    /// no filter.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<AccessLogFilter>,
    /// Configuration of the sink, validated by the sink named by `name`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub typed_config: Option<serde_json::Value>,
}

impl Config {
    /// Reads a YAML or JSON configuration.
    pub fn from_reader<R: io::Read>(input: R) -> Result<Self, ConfigError> {
        Ok(from_reader(input)?)
    }

    /// Checks every access log filter and sink configuration without creating
    /// any sinks.
    pub fn validate(&self) -> Result<(), ValidationError> {
        for (index, access_log) in self.access_log.iter().enumerate() {
            let invalid = |source| ValidationError::new(index, &access_log.name, source);

            SinkRegistry::validate(
                &access_log.name,
                access_log.typed_config.clone().map(SinkConfig::Static),
            )
            .map_err(invalid)?;

            access_log
                .filter
                .clone()
                .map(PredicateNode::try_from)
                .transpose()
                .map_err(invalid)?;
        }

        Ok(())
    }

    /// Creates every access log. Fails on the first entry that cannot be
    /// activated, in which case none of them are.
    pub fn build(&self) -> Result<Vec<AccessLog>, ValidationError> {
        let access_logs = self
            .access_log
            .iter()
            .enumerate()
            .map(|(index, access_log)| {
                access_log
                    .build()
                    .map_err(|source| ValidationError::new(index, &access_log.name, source))
            })
            .collect::<Result<Vec<_>, _>>()?;

        tracing::info!(access_logs = access_logs.len(), "access log configuration loaded");
        Ok(access_logs)
    }

    /// Creates access logs from their protobuf form, whose `typed_config` is
    /// decoded by the sink it names.
    pub fn build_proto(
        access_logs: impl IntoIterator<Item = proto::AccessLog>,
    ) -> Result<Vec<AccessLog>, ValidationError> {
        access_logs
            .into_iter()
            .enumerate()
            .map(|(index, access_log)| {
                let name = access_log.name.clone();
                AccessLog::try_from(access_log)
                    .map_err(|source| ValidationError::new(index, name, source))
            })
            .collect()
    }
}

impl AccessLogConfig {
    pub fn build(&self) -> Result<AccessLog, CreationError> {
        let filter = self
            .filter
            .clone()
            .map(PredicateNode::try_from)
            .transpose()?;
        let sink = SinkRegistry::get(&self.name, self.typed_config.clone().map(SinkConfig::Static))?;

        Ok(AccessLog::new(&self.name, filter, sink))
    }
}

impl TryFrom<proto::AccessLog> for AccessLog {
    type Error = CreationError;

    fn try_from(value: proto::AccessLog) -> Result<Self, Self::Error> {
        let filter = value
            .filter
            .map(AccessLogFilter::try_from)
            .transpose()?
            .map(PredicateNode::try_from)
            .transpose()?;

        let config = value.config_type.map(|config| match config {
            proto::access_log::ConfigType::TypedConfig(any) => SinkConfig::Dynamic(any),
        });

        let sink = SinkRegistry::get(&value.name, config)?;
        Ok(Self::new(value.name, filter, sink))
    }
}
