// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Settings for import and export runs.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use stf_core::Severity;

/// Settings controlling an export run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportSettings {
    /// Reports at or above this severity abort the run.
    pub fail_on_severity: Severity,
    /// Written to the definition header as the producing application.
    pub generator: String,
    /// Written to the definition header as the producing application's version.
    pub generator_version: String,
    /// Free-form asset information (name, author, license...).
    pub asset_info: Map<String, Value>,
    /// Profiles the exported file claims to conform to.
    pub profiles: Vec<String>,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            fail_on_severity: Severity::Error,
            generator: "stf-io".to_string(),
            generator_version: env!("CARGO_PKG_VERSION").to_string(),
            asset_info: Map::new(),
            profiles: Vec::new(),
        }
    }
}

/// Settings controlling an import run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportSettings {
    /// Reports at or above this severity abort the run.
    pub fail_on_severity: Severity,
}

impl Default for ImportSettings {
    fn default() -> Self {
        Self {
            fail_on_severity: Severity::Error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_settings_fall_back_to_defaults() {
        let settings: ExportSettings =
            serde_json::from_str(r#"{ "fail_on_severity": "Fatal", "profiles": ["stf.game"] }"#)
                .unwrap();

        assert_eq!(settings.fail_on_severity, Severity::Fatal);
        assert_eq!(settings.profiles, ["stf.game"]);
        assert_eq!(settings.generator, "stf-io");

        let import: ImportSettings = serde_json::from_str("{}").unwrap();
        assert_eq!(import.fail_on_severity, Severity::Error);
    }
}
