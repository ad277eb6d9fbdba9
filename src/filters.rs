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

//! Filters deciding whether an exchange is written to an access log.

mod config;
mod error;

pub mod comparison;
pub mod header;
pub mod sampling;

use std::{sync::Arc, time::Duration};

use crate::{exchange::Exchange, runtime::RuntimeKeyStore};

/// Prelude containing the types needed to build and evaluate filter trees.
pub mod prelude {
    pub use super::{
        ComparisonOp, ComparisonSpec, CreationError, FilterEvaluator, HeaderMatch,
        HeaderMatcher, PredicateNode, RandomSource, SamplingSpec,
    };
}

pub(crate) mod proto {
    pub(crate) use crate::generated::envoy::{
        config::{accesslog::v3 as accesslog, core::v3 as core, route::v3 as route},
        kind::v3 as kind,
    };
}

#[doc(inline)]
pub use self::{
    comparison::{ComparisonOp, ComparisonSpec},
    config::{
        AccessLogFilter, AndFilter, ComparisonFilter, DenominatorType, DurationFilter,
        FractionalPercent, HeaderFilter, NotHealthCheckFilter, OrFilter, RuntimeFilter,
        RuntimeUInt32, StatusCodeFilter, TraceableFilter,
    },
    error::{ConvertProtoConfigError, CreationError},
    header::{HeaderMatch, HeaderMatcher},
    sampling::{RandomSource, SamplingSpec, ThreadRandom},
};

/// A node of a filter tree.
///
/// Trees are built once from configuration and are immutable afterwards,
/// they are shared read-only between every thread evaluating exchanges.
#[derive(Clone, Debug, PartialEq)]
pub enum PredicateNode {
    /// Compares the response status code. Exchanges without one never match.
    StatusCode(ComparisonSpec),
    /// Compares the total duration of the exchange in milliseconds.
    Duration(ComparisonSpec),
    NotHealthCheck,
    Traceable,
    RuntimeSample(SamplingSpec),
    Header(HeaderMatcher),
    /// Matches when every child matches, see [`PredicateNode::and`].
    And(Vec<PredicateNode>),
    /// Matches when any child matches, see [`PredicateNode::or`].
    Or(Vec<PredicateNode>),
}

impl PredicateNode {
    /// Creates a conjunction, which needs at least two children.
    pub fn and(children: Vec<Self>) -> Result<Self, CreationError> {
        Self::ensure_enough_children("and_filter", &children)?;
        Ok(Self::And(children))
    }

    /// Creates a disjunction, which needs at least two children.
    pub fn or(children: Vec<Self>) -> Result<Self, CreationError> {
        Self::ensure_enough_children("or_filter", &children)?;
        Ok(Self::Or(children))
    }

    fn ensure_enough_children(kind: &'static str, children: &[Self]) -> Result<(), CreationError> {
        if children.len() < 2 {
            return Err(CreationError::NotEnoughFilters {
                kind,
                found: children.len(),
            });
        }

        Ok(())
    }
}

/// Walks filter trees against exchanges.
///
/// The runtime is the only external state an evaluation reads, and it is
/// read again on every lookup, so the same tree may give a different answer
/// for the same exchange after the runtime changes.
#[derive(Clone)]
pub struct FilterEvaluator {
    runtime: Arc<dyn RuntimeKeyStore>,
    random: Arc<dyn RandomSource>,
}

impl FilterEvaluator {
    pub fn new(runtime: Arc<dyn RuntimeKeyStore>) -> Self {
        Self {
            runtime,
            random: Arc::new(ThreadRandom),
        }
    }

    /// Replaces the source of independent sampling draws.
    pub fn with_random(mut self, random: Arc<dyn RandomSource>) -> Self {
        self.random = random;
        self
    }

    pub fn runtime(&self) -> &Arc<dyn RuntimeKeyStore> {
        &self.runtime
    }

    /// Returns whether `exchange` passes the filter tree rooted at `node`.
    ///
    /// Children of `And` and `Or` nodes are evaluated in declared order, and
    /// evaluation stops at the first child that decides the result.
    pub fn evaluate<E: Exchange + ?Sized>(&self, node: &PredicateNode, exchange: &E) -> bool {
        let runtime = &*self.runtime;

        match node {
            PredicateNode::StatusCode(spec) => spec
                .evaluate(exchange.status_code(), runtime)
                .unwrap_or(false),
            PredicateNode::Duration(spec) => spec
                .evaluate(exchange.duration().map(saturating_millis), runtime)
                .unwrap_or(false),
            PredicateNode::NotHealthCheck => !exchange.is_health_check(),
            PredicateNode::Traceable => exchange.is_traceable(),
            PredicateNode::RuntimeSample(spec) => {
                spec.decide(exchange.request_id(), runtime, &*self.random)
            }
            PredicateNode::Header(matcher) => matcher.matches(exchange),
            PredicateNode::And(children) => {
                children.iter().all(|child| self.evaluate(child, exchange))
            }
            PredicateNode::Or(children) => {
                children.iter().any(|child| self.evaluate(child, exchange))
            }
        }
    }
}

impl Default for FilterEvaluator {
    fn default() -> Self {
        Self::new(Arc::new(crate::runtime::Runtime::new()))
    }
}

impl std::fmt::Debug for FilterEvaluator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FilterEvaluator").finish_non_exhaustive()
    }
}

fn saturating_millis(duration: Duration) -> u32 {
    u32::try_from(duration.as_millis()).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        exchange::ExchangeRecord,
        runtime::Runtime,
        test::{CountingExchange, CountingRandom},
    };

    fn status(op: ComparisonOp, threshold: u32) -> PredicateNode {
        PredicateNode::StatusCode(ComparisonSpec::new(op, threshold))
    }

    #[test]
    fn combinators_need_two_children() {
        assert_eq!(
            Err(CreationError::NotEnoughFilters {
                kind: "and_filter",
                found: 1
            }),
            PredicateNode::and(vec![PredicateNode::Traceable])
        );
        assert_eq!(
            Err(CreationError::NotEnoughFilters {
                kind: "or_filter",
                found: 0
            }),
            PredicateNode::or(Vec::new())
        );
        assert!(PredicateNode::or(vec![PredicateNode::Traceable, PredicateNode::NotHealthCheck]).is_ok());
    }

    #[test]
    fn leaves() {
        let evaluator = FilterEvaluator::default();
        let record = ExchangeRecord::http(200, Duration::from_millis(30))
            .traceable(true)
            .with_header("x-debug", "1");

        assert!(evaluator.evaluate(&status(ComparisonOp::Eq, 200), &record));
        assert!(evaluator.evaluate(&PredicateNode::NotHealthCheck, &record));
        assert!(evaluator.evaluate(&PredicateNode::Traceable, &record));
        assert!(evaluator.evaluate(
            &PredicateNode::Header(HeaderMatcher::new("X-Debug", HeaderMatch::Exact("1".into()))),
            &record
        ));
        assert!(!evaluator.evaluate(&PredicateNode::NotHealthCheck, &record.clone().health_check(true)));
        assert!(!evaluator.evaluate(&PredicateNode::Traceable, &record.clone().traceable(false)));
    }

    #[test]
    fn tcp_never_matches_status() {
        let evaluator = FilterEvaluator::default();
        let record = ExchangeRecord::tcp(Duration::from_secs(1));

        for op in [ComparisonOp::Eq, ComparisonOp::Ge, ComparisonOp::Le] {
            assert!(!evaluator.evaluate(&status(op, 0), &record));
        }
    }

    #[test]
    fn duration_in_milliseconds() {
        let evaluator = FilterEvaluator::default();
        let slow = PredicateNode::Duration(ComparisonSpec::new(ComparisonOp::Ge, 1_000));

        assert!(!evaluator.evaluate(&slow, &ExchangeRecord::http(200, Duration::from_micros(999_999))));
        assert!(evaluator.evaluate(&slow, &ExchangeRecord::http(200, Duration::from_millis(1_000))));
        assert!(evaluator.evaluate(
            &PredicateNode::Duration(ComparisonSpec::new(ComparisonOp::Eq, u32::MAX)),
            &ExchangeRecord::tcp(Duration::from_secs(u64::MAX))
        ));
    }

    #[test]
    fn and_short_circuits() {
        let random = Arc::new(CountingRandom::default());
        let evaluator = FilterEvaluator::default().with_random(random.clone());
        let node = PredicateNode::and(vec![
            status(ComparisonOp::Ge, 500),
            PredicateNode::RuntimeSample(SamplingSpec::new("sample", 50, 100)),
        ])
        .unwrap();

        assert!(!evaluator.evaluate(&node, &ExchangeRecord::http(200, Duration::ZERO)));
        assert_eq!(0, random.draws());

        evaluator.evaluate(&node, &ExchangeRecord::http(503, Duration::ZERO));
        assert_eq!(1, random.draws());
    }

    #[test]
    fn or_short_circuits() {
        let random = Arc::new(CountingRandom::default());
        let evaluator = FilterEvaluator::default().with_random(random.clone());
        let node = PredicateNode::or(vec![
            status(ComparisonOp::Ge, 500),
            PredicateNode::RuntimeSample(SamplingSpec::new("sample", 50, 100)),
        ])
        .unwrap();

        assert!(evaluator.evaluate(&node, &ExchangeRecord::http(503, Duration::ZERO)));
        assert_eq!(0, random.draws());

        evaluator.evaluate(&node, &ExchangeRecord::http(200, Duration::ZERO));
        assert_eq!(1, random.draws());
    }

    #[test]
    fn declared_order() {
        let evaluator = FilterEvaluator::default();
        let record = CountingExchange::new(ExchangeRecord::http(200, Duration::ZERO));

        let node = PredicateNode::and(vec![
            status(ComparisonOp::Ge, 500),
            PredicateNode::NotHealthCheck,
        ])
        .unwrap();
        assert!(!evaluator.evaluate(&node, &record));
        assert_eq!(0, record.health_check_reads());

        let node = PredicateNode::and(vec![
            PredicateNode::NotHealthCheck,
            status(ComparisonOp::Ge, 500),
        ])
        .unwrap();
        assert!(!evaluator.evaluate(&node, &record));
        assert_eq!(1, record.health_check_reads());
    }

    #[test]
    fn nested() {
        let runtime = Arc::new(Runtime::new());
        let evaluator = FilterEvaluator::new(runtime.clone());
        let kill_switch = PredicateNode::RuntimeSample(
            SamplingSpec::new("access_log.enabled", 100, 100).independent(true),
        );
        let node = PredicateNode::and(vec![
            kill_switch,
            PredicateNode::or(vec![
                status(ComparisonOp::Ge, 500),
                PredicateNode::Traceable,
            ])
            .unwrap(),
        ])
        .unwrap();

        let error = ExchangeRecord::http(500, Duration::ZERO);
        let traced = ExchangeRecord::http(200, Duration::ZERO).traceable(true);
        let ok = ExchangeRecord::http(200, Duration::ZERO);

        assert!(evaluator.evaluate(&node, &error));
        assert!(evaluator.evaluate(&node, &traced));
        assert!(!evaluator.evaluate(&node, &ok));

        runtime.set("access_log.enabled", 0);
        assert!(!evaluator.evaluate(&node, &error));
        assert!(!evaluator.evaluate(&node, &traced));
    }

    #[test]
    fn thresholds_follow_runtime() {
        let runtime = Arc::new(Runtime::new());
        let evaluator = FilterEvaluator::new(runtime.clone());
        let node = PredicateNode::StatusCode(
            ComparisonSpec::new(ComparisonOp::Ge, 500).with_runtime_key("access_log.min_status"),
        );
        let record = ExchangeRecord::http(404, Duration::ZERO);

        assert!(!evaluator.evaluate(&node, &record));
        runtime.set("access_log.min_status", 400);
        assert!(evaluator.evaluate(&node, &record));
        runtime.set("access_log.min_status", "garbage");
        assert!(!evaluator.evaluate(&node, &record));
    }
}
