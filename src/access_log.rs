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
//! Access logs and the dispatcher deciding which of them a record is written
//! to.

mod config_type;
mod file;
mod metrics;
mod registry;
mod stdout;

use std::{
    panic::{catch_unwind, AssertUnwindSafe},
    sync::Arc,
};

use arc_swap::ArcSwap;

use crate::{
    exchange::{Exchange, ExchangeRecord},
    filters::{CreationError, FilterEvaluator, PredicateNode},
};

#[doc(inline)]
pub use self::{
    config_type::SinkConfig,
    file::{FileAccessLog, FileAccessLogConfig, Format},
    registry::SinkRegistry,
    stdout::Stdout,
};

/// An owned pointer to a dynamic [`Sink`] instance.
pub type DynSink = Box<dyn Sink>;
/// An owned pointer to a dynamic [`SinkFactory`] instance.
pub type DynSinkFactory = Box<dyn SinkFactory>;

/// An error from writing a record to a [`Sink`].
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("failed to write access log entry: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to encode access log entry: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("{0}")]
    Custom(String),
}

/// Destination of the records an access log lets through.
pub trait Sink: Send + Sync {
    fn log(&self, record: &ExchangeRecord) -> Result<(), SinkError>;
}

/// Statically typed sink that can be created from configuration. Implementing
/// it provides a [`SinkFactory`] through [`StaticSink::factory`].
pub trait StaticSink: Sink + Sized
where
    CreationError: From<<Self::Configuration as TryFrom<Self::BinaryConfiguration>>::Error>,
{
    /// The globally unique name of the sink, as used by `AccessLog.name`.
    const NAME: &'static str;
    /// The human-readable configuration of the sink.
    type Configuration: schemars::JsonSchema
        + serde::Serialize
        + serde::de::DeserializeOwned
        + TryFrom<Self::BinaryConfiguration>;
    /// The protobuf configuration carried in `typed_config`.
    type BinaryConfiguration: prost::Message + Default;

    /// Instantiates the sink from its configuration, if any.
    fn try_from_config(config: Option<Self::Configuration>) -> Result<Self, CreationError>;

    fn factory() -> DynSinkFactory
    where
        Self: 'static,
    {
        Box::from(std::marker::PhantomData::<fn() -> Self>)
    }

    /// Checks the configuration without acquiring any resources. Sinks with
    /// required fields override this, and [`StaticSink::try_from_config`]
    /// should call it before doing anything else.
    fn validate_config(_: Option<&Self::Configuration>) -> Result<(), CreationError> {
        Ok(())
    }

    fn ensure_config_exists(
        config: Option<Self::Configuration>,
    ) -> Result<Self::Configuration, CreationError> {
        config.ok_or(CreationError::MissingConfig(Self::NAME))
    }
}

/// Provides the name, schema and creation function of a [`Sink`].
pub trait SinkFactory: Send + Sync {
    fn name(&self) -> &'static str;
    fn config_schema(&self) -> schemars::schema::RootSchema;
    /// Checks `config` the way [`SinkFactory::create_sink`] would, without
    /// creating the sink.
    fn validate_config(&self, config: Option<SinkConfig>) -> Result<(), CreationError>;
    fn create_sink(&self, config: Option<SinkConfig>) -> Result<DynSink, CreationError>;
}

impl<S> SinkFactory for std::marker::PhantomData<fn() -> S>
where
    S: StaticSink + 'static,
    CreationError: From<<S::Configuration as TryFrom<S::BinaryConfiguration>>::Error>,
{
    fn name(&self) -> &'static str {
        S::NAME
    }

    fn config_schema(&self) -> schemars::schema::RootSchema {
        schemars::schema_for!(S::Configuration)
    }

    fn validate_config(&self, config: Option<SinkConfig>) -> Result<(), CreationError> {
        let config = config
            .map(|config| config.deserialize::<S::Configuration, S::BinaryConfiguration>(S::NAME))
            .transpose()?;

        S::validate_config(config.as_ref())
    }

    fn create_sink(&self, config: Option<SinkConfig>) -> Result<DynSink, CreationError> {
        let config = config
            .map(|config| config.deserialize::<S::Configuration, S::BinaryConfiguration>(S::NAME))
            .transpose()?;

        Ok(Box::new(S::try_from_config(config)?))
    }
}

/// A configured access log: a sink guarded by an optional filter.
pub struct AccessLog {
    name: String,
    filter: Option<PredicateNode>,
    sink: DynSink,
}

impl AccessLog {
    pub fn new(name: impl Into<String>, filter: Option<PredicateNode>, sink: DynSink) -> Self {
        Self {
            name: name.into(),
            filter,
            sink,
        }
    }

    /// The name of the sink this access log writes to.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn filter(&self) -> Option<&PredicateNode> {
        self.filter.as_ref()
    }

    /// Whether `exchange` passes this access log's filter. Access logs
    /// without a filter accept everything.
    pub fn accepts<E: Exchange + ?Sized>(&self, evaluator: &FilterEvaluator, exchange: &E) -> bool {
        self.filter
            .as_ref()
            .map_or(true, |filter| evaluator.evaluate(filter, exchange))
    }

    /// Writes `record` to the sink if it passes the filter, returning whether
    /// it was written.
    pub fn log(&self, evaluator: &FilterEvaluator, record: &ExchangeRecord) -> Result<bool, SinkError> {
        if !self.accepts(evaluator, record) {
            return Ok(false);
        }

        self.sink.log(record)?;
        Ok(true)
    }
}

impl std::fmt::Debug for AccessLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessLog")
            .field("name", &self.name)
            .field("filter", &self.filter)
            .finish_non_exhaustive()
    }
}

/// What a single access log did with a dispatched record.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    Logged,
    Filtered,
    Failed,
}

impl Outcome {
    /// Whether the filter let the record through, regardless of whether the
    /// sink then managed to write it.
    pub fn accepted(self) -> bool {
        self != Self::Filtered
    }
}

/// Outcome of dispatching one record, counted over every access log.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Dispatched {
    pub logged: usize,
    pub filtered: usize,
    pub failed: usize,
}

impl std::ops::AddAssign for Dispatched {
    fn add_assign(&mut self, rhs: Self) {
        self.logged += rhs.logged;
        self.filtered += rhs.filtered;
        self.failed += rhs.failed;
    }
}

impl FromIterator<Outcome> for Dispatched {
    fn from_iter<I: IntoIterator<Item = Outcome>>(outcomes: I) -> Self {
        let mut dispatched = Self::default();
        for outcome in outcomes {
            match outcome {
                Outcome::Logged => dispatched.logged += 1,
                Outcome::Filtered => dispatched.filtered += 1,
                Outcome::Failed => dispatched.failed += 1,
            }
        }
        dispatched
    }
}

/// Hands completed exchanges to every configured access log.
///
/// The set of access logs is swapped as a whole; a dispatch that is already
/// running keeps using the set it started with.
#[derive(Debug)]
pub struct AccessLogDispatcher {
    evaluator: FilterEvaluator,
    access_logs: ArcSwap<Vec<AccessLog>>,
}

impl AccessLogDispatcher {
    pub fn new(evaluator: FilterEvaluator) -> Self {
        Self::with_access_logs(evaluator, Vec::new())
    }

    pub fn with_access_logs(evaluator: FilterEvaluator, access_logs: Vec<AccessLog>) -> Self {
        Self {
            evaluator,
            access_logs: ArcSwap::from_pointee(access_logs),
        }
    }

    pub fn evaluator(&self) -> &FilterEvaluator {
        &self.evaluator
    }

    /// Replaces every access log.
    pub fn store(&self, access_logs: Vec<AccessLog>) {
        tracing::info!(access_logs = access_logs.len(), "access log configuration updated");
        self.access_logs.store(Arc::new(access_logs));
    }

    pub fn load(&self) -> Arc<Vec<AccessLog>> {
        self.access_logs.load_full()
    }

    /// Evaluates `record` against every access log, writing it to the sinks
    /// of those that accept it.
    ///
    /// A failing or panicking access log is logged and counted, and does not
    /// prevent the remaining access logs from running.
    pub fn dispatch(&self, record: &ExchangeRecord) -> Dispatched {
        self.dispatch_each(record).into_iter().collect()
    }

    /// Same as [`AccessLogDispatcher::dispatch`], returning the outcome of
    /// every access log in configured order.
    pub fn dispatch_each(&self, record: &ExchangeRecord) -> Vec<Outcome> {
        let access_logs = self.access_logs.load();

        access_logs
            .iter()
            .map(|access_log| {
                let result = catch_unwind(AssertUnwindSafe(|| access_log.log(&self.evaluator, record)));

                match result {
                    Ok(Ok(true)) => {
                        metrics::entries_logged(access_log.name()).inc();
                        Outcome::Logged
                    }
                    Ok(Ok(false)) => {
                        metrics::entries_filtered(access_log.name()).inc();
                        Outcome::Filtered
                    }
                    Ok(Err(error)) => {
                        tracing::warn!(access_log = access_log.name(), %error, "failed to write access log entry");
                        metrics::sink_errors(access_log.name()).inc();
                        Outcome::Failed
                    }
                    Err(panic) => {
                        tracing::warn!(
                            access_log = access_log.name(),
                            panic = panic_message(&*panic),
                            "access log panicked"
                        );
                        metrics::sink_errors(access_log.name()).inc();
                        Outcome::Failed
                    }
                }
            })
            .collect()
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::{
        filters::{ComparisonOp, ComparisonSpec},
        test::{FailingSink, PanickingSink, RecordingSink},
    };

    fn errors_only() -> PredicateNode {
        PredicateNode::StatusCode(ComparisonSpec::new(ComparisonOp::Ge, 500))
    }

    #[test]
    fn filters_per_access_log() {
        let errors = RecordingSink::default();
        let everything = RecordingSink::default();
        let dispatcher = AccessLogDispatcher::with_access_logs(
            FilterEvaluator::default(),
            vec![
                AccessLog::new("errors", Some(errors_only()), Box::new(errors.clone())),
                AccessLog::new("everything", None, Box::new(everything.clone())),
            ],
        );

        let ok = ExchangeRecord::http(200, Duration::ZERO);
        let error = ExchangeRecord::http(502, Duration::ZERO);

        assert_eq!(
            Dispatched {
                logged: 1,
                filtered: 1,
                failed: 0
            },
            dispatcher.dispatch(&ok)
        );
        assert_eq!(
            Dispatched {
                logged: 2,
                filtered: 0,
                failed: 0
            },
            dispatcher.dispatch(&error)
        );

        assert_eq!(vec![error.clone()], errors.records());
        assert_eq!(vec![ok, error], everything.records());
    }

    #[test]
    #[tracing_test::traced_test]
    fn failures_are_isolated() {
        let after = RecordingSink::default();
        let dispatcher = AccessLogDispatcher::with_access_logs(
            FilterEvaluator::default(),
            vec![
                AccessLog::new("failing", None, Box::new(FailingSink)),
                AccessLog::new("panicking", None, Box::new(PanickingSink)),
                AccessLog::new("after", None, Box::new(after.clone())),
            ],
        );

        let record = ExchangeRecord::http(200, Duration::ZERO);
        assert_eq!(
            Dispatched {
                logged: 1,
                filtered: 0,
                failed: 2
            },
            dispatcher.dispatch(&record)
        );
        assert_eq!(vec![record], after.records());
        assert!(logs_contain("failed to write access log entry"));
        assert!(logs_contain("access log panicked"));
    }

    #[test]
    fn outcomes_in_configured_order() {
        let dispatcher = AccessLogDispatcher::with_access_logs(
            FilterEvaluator::default(),
            vec![
                AccessLog::new("errors", Some(errors_only()), Box::new(RecordingSink::default())),
                AccessLog::new("failing", None, Box::new(FailingSink)),
                AccessLog::new("everything", None, Box::new(RecordingSink::default())),
            ],
        );

        let outcomes = dispatcher.dispatch_each(&ExchangeRecord::http(200, Duration::ZERO));
        assert_eq!(vec![Outcome::Filtered, Outcome::Failed, Outcome::Logged], outcomes);
        assert_eq!(
            vec![false, true, true],
            outcomes.iter().map(|outcome| outcome.accepted()).collect::<Vec<_>>()
        );
        assert_eq!(
            Dispatched {
                logged: 1,
                filtered: 1,
                failed: 1
            },
            outcomes.into_iter().collect()
        );
    }

    #[test]
    fn store_replaces_every_access_log() {
        let first = RecordingSink::default();
        let second = RecordingSink::default();
        let dispatcher = AccessLogDispatcher::with_access_logs(
            FilterEvaluator::default(),
            vec![AccessLog::new("first", None, Box::new(first.clone()))],
        );

        let previous = dispatcher.load();
        dispatcher.store(vec![AccessLog::new("second", None, Box::new(second.clone()))]);

        let record = ExchangeRecord::tcp(Duration::from_millis(1));
        dispatcher.dispatch(&record);

        assert_eq!(1, previous.len());
        assert_eq!("first", previous[0].name());
        assert!(first.records().is_empty());
        assert_eq!(vec![record], second.records());
    }

    #[test]
    fn metrics_per_access_log() {
        let dispatcher = AccessLogDispatcher::with_access_logs(
            FilterEvaluator::default(),
            vec![AccessLog::new(
                "metrics_per_access_log",
                Some(errors_only()),
                Box::new(RecordingSink::default()),
            )],
        );

        let logged = metrics::entries_logged("metrics_per_access_log");
        let filtered = metrics::entries_filtered("metrics_per_access_log");

        dispatcher.dispatch(&ExchangeRecord::http(500, Duration::ZERO));
        dispatcher.dispatch(&ExchangeRecord::http(200, Duration::ZERO));
        dispatcher.dispatch(&ExchangeRecord::http(200, Duration::ZERO));

        assert_eq!(1, logged.get());
        assert_eq!(2, filtered.get());
    }
}
