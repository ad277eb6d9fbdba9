/*
 * Copyright 2024 Google LLC All Rights Reserved.
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

use once_cell::sync::Lazy;
use prometheus::{core::Collector, Encoder, IntCounterVec, Opts, Registry, TextEncoder};

pub use prometheus::Result;

pub(crate) const ACCESS_LOG_LABEL: &str = "access_log";
pub(crate) const KIND_LABEL: &str = "kind";

static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    Registry::new_custom(Some("accesslog".into()), None)
        .expect("static registry prefix is valid")
});

/// The registry every metric in this crate is registered with.
pub fn registry() -> &'static Registry {
    &REGISTRY
}

/// Renders the current state of [`registry`] in the Prometheus text format.
pub fn gather_text() -> Result<String> {
    let mut buffer = Vec::new();
    TextEncoder::new().encode(&registry().gather(), &mut buffer)?;
    Ok(String::from_utf8_lossy(&buffer).into_owned())
}

pub fn opts(name: &str, subsystem: &str, description: &str) -> Opts {
    Opts::new(name, description).subsystem(subsystem)
}

pub trait CollectorExt: Collector + Clone + Sized + 'static {
    /// Registers the current metric collector with the crate registry if it
    /// has not already been registered.
    fn register_if_not_exists(self) -> Result<Self> {
        match registry().register(Box::new(self.clone())) {
            Ok(_) | Err(prometheus::Error::AlreadyReg) => Ok(self),
            Err(prometheus::Error::Msg(msg)) if msg.contains("already exists") => Ok(self),
            Err(err) => Err(err),
        }
    }
}

impl<C: Collector + Clone + 'static> CollectorExt for C {}

/// Number of runtime lookups that failed and fell back to a static default.
pub(crate) fn runtime_lookup_failures(kind: &str) -> prometheus::IntCounter {
    static RUNTIME_LOOKUP_FAILURES: Lazy<IntCounterVec> = Lazy::new(|| {
        IntCounterVec::new(
            opts(
                "lookup_failures_total",
                "runtime",
                "Total number of runtime lookups that fell back to the configured default",
            ),
            &[KIND_LABEL],
        )
        .and_then(CollectorExt::register_if_not_exists)
        .unwrap()
    });

    RUNTIME_LOOKUP_FAILURES.with_label_values(&[kind])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registers_once() {
        let counter = prometheus::IntCounter::with_opts(opts("twice_total", "test", "test"))
            .unwrap()
            .register_if_not_exists()
            .unwrap();
        counter.inc();

        // A second registration with an identical descriptor is not an error.
        prometheus::IntCounter::with_opts(opts("twice_total", "test", "test"))
            .unwrap()
            .register_if_not_exists()
            .unwrap();
    }

    #[test]
    fn runtime_failures_are_exported() {
        runtime_lookup_failures("unavailable").inc();
        let text = gather_text().unwrap();
        assert!(text.contains("accesslog_runtime_lookup_failures_total"));
    }
}
