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
use super::{Sink, SinkError, StaticSink};
use crate::{exchange::ExchangeRecord, filters::CreationError};

/// Emits every record as an `INFO` event, leaving formatting and destination
/// to the installed subscriber.
#[derive(Clone, Copy, Debug, Default)]
pub struct Stdout;

impl Sink for Stdout {
    fn log(&self, record: &ExchangeRecord) -> Result<(), SinkError> {
        tracing::info!(
            protocol = %record.protocol,
            status_code = record.status_code,
            duration_ms = u64::try_from(record.duration.as_millis()).unwrap_or(u64::MAX),
            request_id = record.request_id.as_deref(),
            is_health_check = record.is_health_check,
            is_traceable = record.is_traceable,
            "access"
        );
        Ok(())
    }
}

impl StaticSink for Stdout {
    const NAME: &'static str = "envoy.access_loggers.stdout";
    type Configuration = ();
    type BinaryConfiguration = ();

    fn try_from_config(_: Option<Self::Configuration>) -> Result<Self, CreationError> {
        Ok(Self)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    #[tracing_test::traced_test]
    fn emits_event() {
        Stdout
            .log(&ExchangeRecord::http(418, Duration::from_millis(3)).with_request_id("tea"))
            .unwrap();

        assert!(logs_contain("status_code=418"));
        assert!(logs_contain("request_id=\"tea\""));
    }

    #[test]
    #[tracing_test::traced_test]
    fn saturates_duration() {
        Stdout
            .log(&ExchangeRecord::http(200, Duration::MAX))
            .unwrap();

        assert!(logs_contain(&format!("duration_ms={}", u64::MAX)));
    }
}
