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

//! The observed attributes of a completed exchange.

use std::{collections::BTreeMap, time::Duration};

use serde::{Deserialize, Serialize};

/// Read-only view over a completed exchange, as seen by access log filters.
///
/// [`ExchangeRecord`] is the owned implementation produced by the proxy
/// pipeline, other views can be evaluated as long as they can answer these
/// questions.
pub trait Exchange {
    /// The response status code, `None` if the exchange never produced one.
    fn status_code(&self) -> Option<u32>;
    /// Total time taken by the exchange, `None` if it was not recorded.
    fn duration(&self) -> Option<Duration>;
    fn is_health_check(&self) -> bool;
    fn is_traceable(&self) -> bool;
    /// The stable identifier of the request, used for consistent sampling.
    fn request_id(&self) -> Option<&str>;
    /// Looks up a request header by name, ignoring ASCII case.
    fn header(&self, name: &str) -> Option<&str>;
}

/// Which kind of exchange a record describes.
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
    strum_macros::Display,
    strum_macros::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Protocol {
    /// A single HTTP request/response.
    #[default]
    Http,
    /// A TCP connection, which has no status code or headers.
    Tcp,
}

/// One completed exchange. Produced once by the proxy, immutable for the
/// duration of filter evaluation.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExchangeRecord {
    #[serde(default)]
    pub protocol: Protocol,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u32>,
    #[serde(default, rename = "duration_ms", with = "duration_ms")]
    pub duration: Duration,
    #[serde(default)]
    pub is_health_check: bool,
    #[serde(default)]
    pub is_traceable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,
}

impl ExchangeRecord {
    /// A record for an HTTP exchange that completed with `status_code`.
    pub fn http(status_code: u32, duration: Duration) -> Self {
        Self {
            protocol: Protocol::Http,
            status_code: Some(status_code),
            duration,
            ..<_>::default()
        }
    }

    /// A record for a TCP connection that lasted `duration`.
    pub fn tcp(duration: Duration) -> Self {
        Self {
            protocol: Protocol::Tcp,
            duration,
            ..<_>::default()
        }
    }

    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn health_check(mut self, is_health_check: bool) -> Self {
        self.is_health_check = is_health_check;
        self
    }

    pub fn traceable(mut self, is_traceable: bool) -> Self {
        self.is_traceable = is_traceable;
        self
    }
}

impl Exchange for ExchangeRecord {
    fn status_code(&self) -> Option<u32> {
        self.status_code
    }

    fn duration(&self) -> Option<Duration> {
        Some(self.duration)
    }

    fn is_health_check(&self) -> bool {
        self.is_health_check
    }

    fn is_traceable(&self) -> bool {
        self.is_traceable
    }

    fn request_id(&self) -> Option<&str> {
        self.request_id.as_deref()
    }

    fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(name)
            .or_else(|| {
                self.headers
                    .iter()
                    .find(|(key, _)| key.eq_ignore_ascii_case(name))
                    .map(|(_, value)| value)
            })
            .map(String::as_str)
    }
}

impl<E: Exchange + ?Sized> Exchange for &E {
    fn status_code(&self) -> Option<u32> {
        (**self).status_code()
    }

    fn duration(&self) -> Option<Duration> {
        (**self).duration()
    }

    fn is_health_check(&self) -> bool {
        (**self).is_health_check()
    }

    fn is_traceable(&self) -> bool {
        (**self).is_traceable()
    }

    fn request_id(&self) -> Option<&str> {
        (**self).request_id()
    }

    fn header(&self, name: &str) -> Option<&str> {
        (**self).header(name)
    }
}

/// (De)serializes a [`Duration`] as a whole number of milliseconds.
mod duration_ms {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(u64::try_from(duration.as_millis()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
