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
    fs::{File, OpenOptions},
    io::{LineWriter, Write},
    path::PathBuf,
};

use parking_lot::Mutex;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::{Sink, SinkError, StaticSink};
use crate::{
    exchange::ExchangeRecord,
    filters::{ConvertProtoConfigError, CreationError},
};

pub(crate) use crate::generated::envoy::extensions::access_loggers::file::v3 as proto;

/// Appends one line per record to a local file.
pub struct FileAccessLog {
    path: PathBuf,
    format: Format,
    writer: Mutex<LineWriter<File>>,
}

impl FileAccessLog {
    pub fn path(&self) -> &std::path::Path {
        &self.path
    }

    fn render(&self, record: &ExchangeRecord) -> Result<String, SinkError> {
        Ok(match self.format {
            Format::Json => serde_json::to_string(record)?,
            Format::Text => format!(
                "{} {} {} {} health_check={} traceable={}",
                record.protocol,
                record
                    .status_code
                    .map_or_else(|| String::from("-"), |status| status.to_string()),
                record.duration.as_millis(),
                record.request_id.as_deref().unwrap_or("-"),
                record.is_health_check,
                record.is_traceable,
            ),
        })
    }
}

impl Sink for FileAccessLog {
    fn log(&self, record: &ExchangeRecord) -> Result<(), SinkError> {
        let mut line = self.render(record)?;
        line.push('\n');
        self.writer.lock().write_all(line.as_bytes())?;
        Ok(())
    }
}

impl StaticSink for FileAccessLog {
    const NAME: &'static str = "envoy.access_loggers.file";
    type Configuration = FileAccessLogConfig;
    type BinaryConfiguration = proto::FileAccessLog;

    fn validate_config(config: Option<&Self::Configuration>) -> Result<(), CreationError> {
        let config = config.ok_or(CreationError::MissingConfig(Self::NAME))?;

        if config.path.as_os_str().is_empty() {
            return Err(CreationError::field_invalid("path", "path cannot be empty"));
        }

        Ok(())
    }

    fn try_from_config(config: Option<Self::Configuration>) -> Result<Self, CreationError> {
        Self::validate_config(config.as_ref())?;
        let config = Self::ensure_config_exists(config)?;

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&config.path)
            .map_err(|error| CreationError::field_invalid("path", error))?;

        tracing::debug!(path = %config.path.display(), format = %config.format, "opened access log file");

        Ok(Self {
            path: config.path,
            format: config.format,
            writer: Mutex::new(LineWriter::new(file)),
        })
    }
}

/// Configuration for [`FileAccessLog`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct FileAccessLogConfig {
    /// The file records are appended to, created if missing.
    pub path: PathBuf,
    #[serde(default)]
    pub format: Format,
}

/// Layout of each written line.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    JsonSchema,
    strum_macros::Display,
    strum_macros::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Format {
    /// The record as a JSON object.
    #[default]
    Json,
    /// `<protocol> <status> <duration_ms> <request_id> health_check=<bool> traceable=<bool>`,
    /// with `-` standing in for missing values.
    Text,
}

impl TryFrom<proto::FileAccessLog> for FileAccessLogConfig {
    type Error = ConvertProtoConfigError;

    fn try_from(value: proto::FileAccessLog) -> Result<Self, Self::Error> {
        let format = if value.format.is_empty() {
            Format::default()
        } else {
            value
                .format
                .parse()
                .map_err(|error| ConvertProtoConfigError::new(error, Some("format".into())))?
        };

        Ok(Self {
            path: value.path.into(),
            format,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use pretty_assertions::assert_eq;

    use super::*;

    fn open(dir: &tempfile::TempDir, format: Format) -> FileAccessLog {
        FileAccessLog::try_from_config(Some(FileAccessLogConfig {
            path: dir.path().join("access.log"),
            format,
        }))
        .unwrap()
    }

    #[test]
    fn writes_json_lines() {
        let dir = tempfile::tempdir().unwrap();
        let sink = open(&dir, Format::Json);

        sink.log(&ExchangeRecord::http(503, Duration::from_millis(12)).with_request_id("abc-123"))
            .unwrap();
        sink.log(&ExchangeRecord::tcp(Duration::from_secs(2))).unwrap();

        let contents = std::fs::read_to_string(sink.path()).unwrap();
        let records: Vec<ExchangeRecord> = contents
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();

        assert_eq!(
            vec![
                ExchangeRecord::http(503, Duration::from_millis(12)).with_request_id("abc-123"),
                ExchangeRecord::tcp(Duration::from_secs(2)),
            ],
            records
        );
    }

    #[test]
    fn writes_text_lines() {
        let dir = tempfile::tempdir().unwrap();
        let sink = open(&dir, Format::Text);

        sink.log(&ExchangeRecord::http(200, Duration::from_millis(7)).traceable(true))
            .unwrap();
        sink.log(&ExchangeRecord::tcp(Duration::from_millis(40)).with_request_id("r1"))
            .unwrap();

        assert_eq!(
            "http 200 7 - health_check=false traceable=true\n\
             tcp - 40 r1 health_check=false traceable=false\n",
            std::fs::read_to_string(sink.path()).unwrap()
        );
    }

    #[test]
    fn appends_to_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("access.log"), "existing\n").unwrap();

        let sink = open(&dir, Format::Text);
        sink.log(&ExchangeRecord::tcp(Duration::ZERO)).unwrap();

        let contents = std::fs::read_to_string(sink.path()).unwrap();
        assert!(contents.starts_with("existing\n"));
        assert_eq!(2, contents.lines().count());
    }

    #[test]
    fn invalid_config() {
        assert_eq!(
            Err(CreationError::MissingConfig(FileAccessLog::NAME)),
            FileAccessLog::try_from_config(None).map(|_| ())
        );
        assert!(matches!(
            FileAccessLog::try_from_config(Some(FileAccessLogConfig {
                path: PathBuf::new(),
                format: Format::Json,
            })),
            Err(CreationError::FieldInvalid { .. })
        ));

        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            FileAccessLog::try_from_config(Some(FileAccessLogConfig {
                path: dir.path().join("missing").join("access.log"),
                format: Format::Json,
            })),
            Err(CreationError::FieldInvalid { .. })
        ));
    }

    #[test]
    fn from_proto() {
        let config = FileAccessLogConfig::try_from(proto::FileAccessLog {
            path: "/var/log/access.log".into(),
            format: String::new(),
        })
        .unwrap();
        assert_eq!(Format::Json, config.format);

        assert!(FileAccessLogConfig::try_from(proto::FileAccessLog {
            path: "/var/log/access.log".into(),
            format: "xml".into(),
        })
        .is_err());
    }
}
