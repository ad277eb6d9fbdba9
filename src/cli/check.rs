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
use std::path::Path;

use eyre::WrapErr;

/// Validates an access log configuration.
#[derive(Clone, Debug, clap::Args)]
pub struct Check {
    /// Also create every sink, which opens the files of file access logs.
    #[clap(long)]
    pub build: bool,
}

impl Check {
    pub fn check(&self, config_path: &Path) -> crate::Result<()> {
        let config = super::Cli::read_config(config_path)?;

        let result = if self.build {
            config.build().map(drop)
        } else {
            config.validate()
        };
        result.wrap_err_with(|| format!("invalid configuration `{}`", config_path.display()))?;

        tracing::info!(
            path = %config_path.display(),
            access_logs = config.access_log.len(),
            "configuration is valid"
        );
        Ok(())
    }
}
