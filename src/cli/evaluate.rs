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
use std::{
    fs::File,
    io::{self, BufRead, BufReader, Write},
    path::{Path, PathBuf},
    sync::Arc,
};

use eyre::WrapErr;
use serde::Serialize;

use crate::{
    access_log::{AccessLogDispatcher, Dispatched, Outcome},
    exchange::ExchangeRecord,
    filters::{FilterEvaluator, PredicateNode},
    runtime::Runtime,
};

/// Evaluates the configured filters against records read as JSON lines,
/// printing one decision per record.
#[derive(Clone, Debug, clap::Args)]
pub struct Evaluate {
    /// A file with one JSON record per line, `-` to read from stdin.
    pub records: PathBuf,
    /// Also write passing records to the configured sinks.
    #[clap(long)]
    pub dispatch: bool,
}

#[derive(Debug, Serialize)]
struct Decision<'a> {
    line: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    request_id: Option<&'a str>,
    /// Whether each access log, in configured order, accepts the record.
    access_logs: Vec<bool>,
}

/// Totals over every evaluated record.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Summary {
    pub records: usize,
    pub dispatched: Dispatched,
}

impl Evaluate {
    pub fn evaluate(
        &self,
        config_path: &Path,
        runtime: Runtime,
        output: &mut dyn Write,
    ) -> crate::Result<Summary> {
        let config = super::Cli::read_config(config_path)?;
        config.validate()?;

        let evaluator = FilterEvaluator::new(Arc::new(runtime));
        let filters = config
            .access_log
            .iter()
            .map(|access_log| {
                access_log
                    .filter
                    .clone()
                    .map(PredicateNode::try_from)
                    .transpose()
            })
            .collect::<Result<Vec<_>, _>>()?;

        let dispatcher = self
            .dispatch
            .then(|| config.build())
            .transpose()?
            .map(|access_logs| AccessLogDispatcher::with_access_logs(evaluator.clone(), access_logs));

        let input: Box<dyn BufRead> = if self.records.as_os_str() == "-" {
            Box::new(BufReader::new(io::stdin()))
        } else {
            Box::new(BufReader::new(File::open(&self.records).wrap_err_with(|| {
                format!("failed to open records `{}`", self.records.display())
            })?))
        };

        let mut summary = Summary::default();
        for (index, line) in input.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }

            let record: ExchangeRecord = serde_json::from_str(&line)
                .wrap_err_with(|| format!("invalid record on line {}", index + 1))?;

            // A dispatched record is evaluated once, by the dispatcher, so the
            // printed decisions are the ones the sinks saw.
            let access_logs: Vec<bool> = match &dispatcher {
                Some(dispatcher) => {
                    let outcomes = dispatcher.dispatch_each(&record);
                    summary.dispatched += outcomes.iter().copied().collect::<Dispatched>();
                    outcomes.into_iter().map(Outcome::accepted).collect()
                }
                None => filters
                    .iter()
                    .map(|filter| {
                        filter
                            .as_ref()
                            .map_or(true, |filter| evaluator.evaluate(filter, &record))
                    })
                    .collect(),
            };

            let decision = Decision {
                line: index + 1,
                request_id: record.request_id.as_deref(),
                access_logs,
            };

            serde_json::to_writer(&mut *output, &decision)?;
            writeln!(output)?;

            summary.records += 1;
        }

        tracing::info!(records = summary.records, "evaluation finished");
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    const CONFIG: &str = "
access_log:
  - name: envoy.access_loggers.stdout
    filter:
      and_filter:
        filters:
          - status_code_filter:
              comparison: { op: GE, value: { default_value: 500, runtime_key: min_status } }
          - not_health_check_filter: {}
  - name: envoy.access_loggers.stdout
";

    const RECORDS: &str = r#"{"status_code": 503, "duration_ms": 10, "request_id": "a"}
{"status_code": 404, "duration_ms": 10}

{"status_code": 503, "duration_ms": 10, "is_health_check": true}
"#;

    fn write_inputs(dir: &tempfile::TempDir) -> (PathBuf, PathBuf) {
        let config = dir.path().join("config.yaml");
        let records = dir.path().join("records.jsonl");
        std::fs::write(&config, CONFIG).unwrap();
        std::fs::write(&records, RECORDS).unwrap();
        (config, records)
    }

    #[test]
    fn prints_decisions() {
        let dir = tempfile::tempdir().unwrap();
        let (config, records) = write_inputs(&dir);

        let mut output = Vec::new();
        let summary = Evaluate {
            records,
            dispatch: false,
        }
        .evaluate(&config, Runtime::new(), &mut output)
        .unwrap();

        assert_eq!(3, summary.records);
        assert_eq!(Dispatched::default(), summary.dispatched);
        assert_eq!(
            "{\"line\":1,\"request_id\":\"a\",\"access_logs\":[true,true]}\n\
             {\"line\":2,\"access_logs\":[false,true]}\n\
             {\"line\":4,\"access_logs\":[false,true]}\n",
            String::from_utf8(output).unwrap()
        );
    }

    #[test]
    fn runtime_overrides_apply() {
        let dir = tempfile::tempdir().unwrap();
        let (config, records) = write_inputs(&dir);

        let runtime = Runtime::new();
        runtime.set("min_status", 400);

        let mut output = Vec::new();
        let summary = Evaluate {
            records,
            dispatch: true,
        }
        .evaluate(&config, runtime, &mut output)
        .unwrap();

        assert!(String::from_utf8(output)
            .unwrap()
            .contains("{\"line\":2,\"access_logs\":[true,true]}"));
        assert_eq!(
            Dispatched {
                logged: 5,
                filtered: 1,
                failed: 0
            },
            summary.dispatched
        );
    }

    #[test]
    fn printed_decisions_match_dispatched_records() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("sampled.log");
        let config = dir.path().join("config.yaml");
        let records = dir.path().join("records.jsonl");

        std::fs::write(
            &config,
            format!(
                "
access_log:
  - name: envoy.access_loggers.file
    filter:
      runtime_filter:
        runtime_key: sample
        percent_sampled: {{ numerator: 50, denominator: HUNDRED }}
        use_independent_randomness: true
    typed_config:
      path: {}
",
                log.display()
            ),
        )
        .unwrap();
        std::fs::write(
            &records,
            "{\"status_code\": 200, \"duration_ms\": 1}\n".repeat(200),
        )
        .unwrap();

        let mut output = Vec::new();
        let summary = Evaluate {
            records,
            dispatch: true,
        }
        .evaluate(&config, Runtime::new(), &mut output)
        .unwrap();

        let printed = String::from_utf8(output)
            .unwrap()
            .lines()
            .filter(|line| line.ends_with("\"access_logs\":[true]}"))
            .count();
        let written = std::fs::read_to_string(&log).unwrap().lines().count();

        assert_eq!(200, summary.records);
        assert_eq!(printed, written);
        assert_eq!(printed, summary.dispatched.logged);
        assert_eq!(200 - printed, summary.dispatched.filtered);
    }

    #[test]
    fn invalid_record() {
        let dir = tempfile::tempdir().unwrap();
        let (config, records) = write_inputs(&dir);
        std::fs::write(&records, "{\"status\": 200}\n").unwrap();

        let error = Evaluate {
            records,
            dispatch: false,
        }
        .evaluate(&config, Runtime::new(), &mut Vec::new())
        .unwrap_err();

        assert!(error.to_string().contains("line 1"));
    }
}
