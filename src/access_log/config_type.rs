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

use bytes::Bytes;

use crate::filters::CreationError;

/// The configuration of an access log sink from either a static or dynamic
/// source.
#[derive(Clone, Debug, PartialEq)]
pub enum SinkConfig {
    /// Static configuration from YAML or JSON.
    Static(serde_json::Value),
    /// Dynamic configuration from Protobuf.
    Dynamic(prost_types::Any),
}

impl SinkConfig {
    /// Deserializes the configuration into `Static`.
    ///
    /// Dynamic configuration is first decoded into `Dynamic`, then converted,
    /// so both sources go through the same validation afterwards.
    pub fn deserialize<Static, Dynamic>(self, sink_name: &str) -> Result<Static, CreationError>
    where
        Dynamic: prost::Message + Default,
        Static: serde::de::DeserializeOwned + TryFrom<Dynamic>,
        CreationError: From<<Static as TryFrom<Dynamic>>::Error>,
    {
        match self {
            Self::Static(config) => serde_json::from_value(config).map_err(|error| {
                CreationError::DeserializeFailed(format!(
                    "access log `{sink_name}`: failed to deserialize config: {error}"
                ))
            }),
            Self::Dynamic(config) => {
                let config = Dynamic::decode(Bytes::from(config.value)).map_err(|error| {
                    CreationError::DeserializeFailed(format!(
                        "access log `{sink_name}`: config decode error: {error}"
                    ))
                })?;

                Ok(Static::try_from(config)?)
            }
        }
    }
}
