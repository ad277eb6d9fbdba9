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
mod check;
mod evaluate;
mod generate_config_schema;

use std::{
    fs::File,
    path::{Path, PathBuf},
};

use eyre::WrapErr;

use crate::{runtime::Runtime, Config};

pub use self::{check::Check, evaluate::Evaluate, generate_config_schema::GenerateConfigSchema};

/// The command-line interface for working with access log configuration.
#[derive(Debug, clap::Parser)]
#[command(version)]
#[non_exhaustive]
pub struct Cli {
    /// The path to the access log configuration, YAML or JSON.
    #[clap(short, long, env = "ACCESSLOG_CONFIG", default_value = "access_log.yaml")]
    pub config: PathBuf,
    /// A YAML file of runtime overrides, mapping keys to scalar values.
    #[clap(short, long, env = "ACCESSLOG_RUNTIME")]
    pub runtime: Option<PathBuf>,
    /// Whether to report anything to stderr.
    #[clap(short, long, env)]
    pub quiet: bool,
    /// The format of diagnostic logs.
    #[clap(long, env = "ACCESSLOG_LOG_FORMAT", value_enum, default_value_t)]
    pub log_format: LogFormat,
    #[clap(subcommand)]
    pub command: Commands,
}

/// The available commands.
#[derive(Clone, Debug, clap::Subcommand)]
pub enum Commands {
    Check(Check),
    Evaluate(Evaluate),
    GenerateConfigSchema(GenerateConfigSchema),
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl Cli {
    /// Runs the selected command.
    pub fn drive(self) -> crate::Result<()> {
        if !self.quiet {
            let env_filter = tracing_subscriber::EnvFilter::builder()
                .with_default_directive(tracing_subscriber::filter::LevelFilter::INFO.into())
                .from_env_lossy();
            let subscriber = tracing_subscriber::fmt()
                .with_writer(std::io::stderr)
                .with_env_filter(env_filter);

            let result = match self.log_format {
                LogFormat::Pretty => subscriber.try_init(),
                LogFormat::Json => subscriber.json().with_file(true).try_init(),
            };
            result.map_err(|error| eyre::eyre!(error))?;
        }

        tracing::debug!(version = env!("CARGO_PKG_VERSION"), "starting");

        match self.command {
            Commands::Check(check) => check.check(&self.config),
            Commands::Evaluate(evaluate) => {
                let runtime = Self::read_runtime(self.runtime.as_deref())?;
                evaluate
                    .evaluate(&self.config, runtime, &mut std::io::stdout().lock())
                    .map(drop)
            }
            Commands::GenerateConfigSchema(generator) => generator.generate_config_schema(),
        }
    }

    pub(crate) fn read_config(path: &Path) -> crate::Result<Config> {
        let file = File::open(path)
            .wrap_err_with(|| format!("failed to open configuration `{}`", path.display()))?;
        Config::from_reader(file)
            .wrap_err_with(|| format!("invalid configuration `{}`", path.display()))
    }

    pub(crate) fn read_runtime(path: Option<&Path>) -> crate::Result<Runtime> {
        let Some(path) = path else {
            return Ok(Runtime::new());
        };

        let file = File::open(path)
            .wrap_err_with(|| format!("failed to open runtime layer `{}`", path.display()))?;
        let runtime = Runtime::from_reader(file)
            .wrap_err_with(|| format!("invalid runtime layer `{}`", path.display()))?;

        tracing::info!(path = %path.display(), keys = runtime.len(), "runtime layer loaded");
        Ok(runtime)
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;

    #[test]
    fn parse_arguments() {
        let cli = Cli::try_parse_from([
            "accesslog-filter",
            "--config",
            "edge.yaml",
            "--runtime",
            "runtime.yaml",
            "--log-format",
            "json",
            "evaluate",
            "records.jsonl",
        ])
        .unwrap();

        assert_eq!(PathBuf::from("edge.yaml"), cli.config);
        assert_eq!(Some(PathBuf::from("runtime.yaml")), cli.runtime);
        assert_eq!(LogFormat::Json, cli.log_format);
        assert!(matches!(cli.command, Commands::Evaluate(_)));
    }

    #[test]
    fn read_runtime() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("runtime.yaml");
        std::fs::write(&path, "access_log.sample: 25\n").unwrap();

        let runtime = Cli::read_runtime(Some(&path)).unwrap();
        assert_eq!(1, runtime.len());
        assert!(Cli::read_runtime(None).unwrap().is_empty());
        assert!(Cli::read_runtime(Some(&dir.path().join("missing.yaml"))).is_err());
    }
}
