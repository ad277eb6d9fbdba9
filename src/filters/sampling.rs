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

//! Random and consistent sampling of exchanges.
//!
//! Consistent sampling maps a request id onto a bucket in
//! `[0, denominator)` using [`seahash`] reduced modulo the denominator.
//! Seahash's output is fixed by the algorithm and does not depend on the
//! process, platform or build, so every proxy instance that sees the same
//! request id picks the same bucket and reaches the same decision.

use rand::Rng;

use crate::runtime::RuntimeKeyStore;

/// A source of uniformly distributed values for independent sampling draws.
pub trait RandomSource: Send + Sync {
    /// Returns a value uniformly distributed in `[0, upper)`. `upper` is
    /// never zero.
    fn random_below(&self, upper: u64) -> u64;
}

/// [`RandomSource`] backed by the thread-local generator of [`rand`].
#[derive(Clone, Copy, Debug, Default)]
pub struct ThreadRandom;

impl RandomSource for ThreadRandom {
    fn random_below(&self, upper: u64) -> u64 {
        rand::thread_rng().gen_range(0..upper)
    }
}

/// Maps `request_id` onto a bucket in `[0, denominator)`.
#[inline]
pub fn consistent_bucket(request_id: &str, denominator: u64) -> u64 {
    seahash::hash(request_id.as_bytes()) % denominator
}

/// Samples a fraction `numerator / denominator` of exchanges.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SamplingSpec {
    /// Key whose runtime value replaces [`Self::numerator`] when present.
    pub runtime_key: String,
    pub numerator: u32,
    pub denominator: u32,
    /// Draw independently on every evaluation instead of pivoting on the
    /// request id.
    pub use_independent_randomness: bool,
}

impl SamplingSpec {
    pub fn new(runtime_key: impl Into<String>, numerator: u32, denominator: u32) -> Self {
        Self {
            runtime_key: runtime_key.into(),
            numerator,
            denominator,
            use_independent_randomness: false,
        }
    }

    pub fn independent(mut self, use_independent_randomness: bool) -> Self {
        self.use_independent_randomness = use_independent_randomness;
        self
    }

    /// Decides whether an exchange identified by `request_id` is sampled.
    pub fn decide(
        &self,
        request_id: Option<&str>,
        runtime: &dyn RuntimeKeyStore,
        random: &dyn RandomSource,
    ) -> bool {
        let numerator = runtime.get_u32(&self.runtime_key, self.numerator);

        if numerator == 0 {
            return false;
        }

        if numerator >= self.denominator {
            return true;
        }

        let denominator = u64::from(self.denominator);
        let value = match request_id.filter(|id| !id.is_empty()) {
            Some(request_id) if !self.use_independent_randomness => {
                consistent_bucket(request_id, denominator)
            }
            _ => random.random_below(denominator),
        };

        value < u64::from(numerator)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        runtime::Runtime,
        test::{CountingRandom, FixedRandom},
    };

    #[test]
    fn deterministic_for_request_id() {
        let runtime = Runtime::new();
        let spec = SamplingSpec::new("sample", 50, 100);
        let first = spec.decide(Some("abc-123"), &runtime, &ThreadRandom);

        for _ in 0..1_000 {
            assert_eq!(first, spec.decide(Some("abc-123"), &runtime, &ThreadRandom));
        }

        // Independent deciders agree, as separate proxies would.
        let other = SamplingSpec::new("sample", 50, 100);
        assert_eq!(first, other.decide(Some("abc-123"), &runtime, &ThreadRandom));
        assert_eq!(
            first,
            consistent_bucket("abc-123", 100) < 50,
            "decision is the bucket compared against the numerator"
        );
    }

    #[test]
    fn consistent_buckets_are_stable() {
        // Fixed values: a change here reshuffles sampling across every
        // deployed instance.
        for (id, hundred, ten_thousand, million) in [
            ("abc-123", 85, 2_785, 582_785),
            ("", 5, 3_705, 963_705),
            ("0f8fad5b-d9cb-469f-a165-70867728950e", 72, 9_872, 689_872),
            ("request-1", 67, 9_767, 449_767),
        ] {
            assert_eq!(hundred, consistent_bucket(id, 100), "{id}");
            assert_eq!(ten_thousand, consistent_bucket(id, 10_000), "{id}");
            assert_eq!(million, consistent_bucket(id, 1_000_000), "{id}");
        }
    }

    #[test]
    fn consistent_branch_never_draws() {
        let runtime = Runtime::new();
        let random = CountingRandom::default();
        let spec = SamplingSpec::new("sample", 50, 100);

        spec.decide(Some("abc-123"), &runtime, &random);
        assert_eq!(0, random.draws());
    }

    #[test]
    fn missing_or_empty_request_id_draws() {
        let runtime = Runtime::new();
        let random = CountingRandom::default();
        let spec = SamplingSpec::new("sample", 50, 100);

        spec.decide(None, &runtime, &random);
        spec.decide(Some(""), &runtime, &random);
        assert_eq!(2, random.draws());
    }

    #[test]
    fn independent_randomness_converges() {
        const DRAWS: usize = 20_000;

        let runtime = Runtime::new();
        let spec = SamplingSpec::new("sample", 50, 100).independent(true);
        let sampled = (0..DRAWS)
            .filter(|_| spec.decide(Some("abc-123"), &runtime, &ThreadRandom))
            .count();

        let rate = sampled as f64 / DRAWS as f64;
        assert!((0.45..=0.55).contains(&rate), "sampled rate was {rate}");
    }

    #[test]
    fn independent_randomness_uses_random_value() {
        let runtime = Runtime::new();
        let spec = SamplingSpec::new("sample", 50, 100).independent(true);

        assert!(spec.decide(Some("abc-123"), &runtime, &FixedRandom(49)));
        assert!(!spec.decide(Some("abc-123"), &runtime, &FixedRandom(50)));
    }

    #[test]
    fn boundaries() {
        let runtime = Runtime::new();
        let random = CountingRandom::default();

        let never = SamplingSpec::new("sample", 0, 100);
        let always = SamplingSpec::new("sample", 100, 100);
        let over = SamplingSpec::new("sample", 250, 100);

        for id in [None, Some(""), Some("abc-123"), Some("def-456")] {
            assert!(!never.decide(id, &runtime, &random));
            assert!(!never.clone().independent(true).decide(id, &runtime, &random));
            assert!(always.decide(id, &runtime, &random));
            assert!(over.clone().independent(true).decide(id, &runtime, &random));
        }

        assert_eq!(0, random.draws(), "boundaries never need a draw");
    }

    #[test]
    fn runtime_overrides_numerator() {
        let runtime = Runtime::new();
        let spec = SamplingSpec::new("sample", 0, 100);
        assert!(!spec.decide(Some("abc-123"), &runtime, &ThreadRandom));

        runtime.set("sample", 100);
        assert!(spec.decide(Some("abc-123"), &runtime, &ThreadRandom));

        runtime.set("sample", 0);
        let spec = SamplingSpec::new("sample", 100, 100);
        assert!(!spec.decide(Some("abc-123"), &runtime, &ThreadRandom));
    }

    #[test]
    fn runtime_never_overrides_denominator() {
        let runtime = Runtime::new();
        runtime.set("sample", 5_000);
        let spec = SamplingSpec::new("sample", 1, 10_000);

        assert!(spec.decide(None, &runtime, &FixedRandom(4_999)));
        assert!(!spec.decide(None, &runtime, &FixedRandom(5_000)));
    }
}
