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
use crate::access_log::SinkRegistry;

/// Generates JSON schema files for the configuration and known sinks.
#[derive(Clone, Debug, clap::Args)]
pub struct GenerateConfigSchema {
    /// The directory to write schema files.
    #[clap(short, long, default_value = ".")]
    pub output_directory: std::path::PathBuf,
    /// A list of one or more sink names to generate or 'all' to generate all
    /// available sink schemas. The schema of the whole configuration is
    /// always written to `access_log.yaml`.
    #[clap(num_args = 1.., default_value = "all")]
    pub sink_ids: Vec<String>,
}

impl GenerateConfigSchema {
    pub fn generate_config_schema(&self) -> crate::Result<()> {
        let all = self.sink_ids.len() == 1 && self.sink_ids[0].eq_ignore_ascii_case("all");
        let mut schemas = vec![("access_log", schemars::schema_for!(crate::Config))];

        let available = SinkRegistry::schemas();
        if all {
            schemas.extend(available);
        } else {
            for id in &self.sink_ids {
                match available.iter().find(|(name, _)| *name == id.as_str()) {
                    Some(schema) => schemas.push(schema.clone()),
                    None => tracing::error!("{id} not found in sink registry."),
                }
            }
        }

        for (id, schema) in schemas {
            let path = self.output_directory.join(format!("{id}.yaml"));

            tracing::info!("Writing {id} schema to {}", path.display());

            std::fs::write(path, serde_yaml::to_string(&schema)?)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_schemas() {
        let dir = tempfile::tempdir().unwrap();

        GenerateConfigSchema {
            output_directory: dir.path().into(),
            sink_ids: vec!["envoy.access_loggers.file".into(), "unknown".into()],
        }
        .generate_config_schema()
        .unwrap();

        let config = std::fs::read_to_string(dir.path().join("access_log.yaml")).unwrap();
        assert!(config.contains("runtime_filter"));
        assert!(dir.path().join("envoy.access_loggers.file.yaml").exists());
        assert!(!dir.path().join("envoy.access_loggers.stdout.yaml").exists());
    }
}
