//! Per-invocation obfuscation settings.

use crate::language::SupportedLanguage;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Intensity {
    Light,
    #[default]
    Medium,
    Strong,
}

impl Intensity {
    /// Wording sent to the delegated service.
    pub fn description(self) -> &'static str {
        match self {
            Intensity::Light => "minimal changes, mainly whitespace and simple renaming",
            Intensity::Medium => {
                "standard obfuscation, renaming variables, string hiding, and basic logic shifting"
            }
            Intensity::Strong => {
                "heavy protection, logic flattening, dead code insertion, and complex encryption"
            }
        }
    }

    pub fn minifies(self) -> bool {
        self == Intensity::Strong
    }
}

impl fmt::Display for Intensity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Intensity::Light => write!(f, "light"),
            Intensity::Medium => write!(f, "medium"),
            Intensity::Strong => write!(f, "strong"),
        }
    }
}

impl FromStr for Intensity {
    type Err = SettingsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "light" => Ok(Intensity::Light),
            "medium" => Ok(Intensity::Medium),
            "strong" => Ok(Intensity::Strong),
            other => Err(SettingsError::UnknownIntensity(other.to_string())),
        }
    }
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("unknown intensity: {0}")]
    UnknownIntensity(String),
}

/// Which protections to apply. Field names follow the camelCase wire shape
/// so settings exported by other front ends load unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ObfuscationSettings {
    pub language: SupportedLanguage,
    pub intensity: Intensity,
    pub rename_variables: bool,
    pub string_encryption: bool,
    /// Forwarded to the delegated service only; the local pipeline has no
    /// flattening pass.
    pub control_flow_flattening: bool,
    pub dead_code_injection: bool,
    pub target_environment: String,
    /// Comma-separated identifiers that must keep their names.
    pub exclusions: String,
}

impl Default for ObfuscationSettings {
    fn default() -> Self {
        Self {
            language: SupportedLanguage::JavaScript,
            intensity: Intensity::Medium,
            rename_variables: true,
            string_encryption: true,
            control_flow_flattening: false,
            dead_code_injection: false,
            target_environment: "Browser (Universal)".to_string(),
            exclusions: String::new(),
        }
    }
}

impl ObfuscationSettings {
    /// Settings with every pass switched off.
    pub fn passthrough(language: SupportedLanguage) -> Self {
        Self {
            language,
            intensity: Intensity::Light,
            rename_variables: false,
            string_encryption: false,
            control_flow_flattening: false,
            dead_code_injection: false,
            ..Self::default()
        }
    }

    pub fn exclusion_list(&self) -> Vec<String> {
        self.exclusions
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    }

    /// Loads settings from a JSON file (`.json`) or YAML otherwise.
    pub fn from_file(path: &Path) -> Result<Self, SettingsError> {
        let content = fs::read_to_string(path)?;
        let is_json = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        if is_json {
            Ok(serde_json::from_str(&content)?)
        } else {
            Ok(serde_yaml::from_str(&content)?)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exclusions_are_split_and_trimmed() {
        let settings = ObfuscationSettings {
            exclusions: " total, ,price ,tax".into(),
            ..Default::default()
        };
        assert_eq!(settings.exclusion_list(), vec!["total", "price", "tax"]);
    }

    #[test]
    fn camel_case_json_shape() {
        let json = r#"{
            "language": "PHP",
            "intensity": "strong",
            "renameVariables": false,
            "stringEncryption": true,
            "controlFlowFlattening": true,
            "deadCodeInjection": true,
            "targetEnvironment": "Node.js",
            "exclusions": "main"
        }"#;
        let settings: ObfuscationSettings = serde_json::from_str(json).unwrap();
        assert_eq!(settings.language, SupportedLanguage::Php);
        assert_eq!(settings.intensity, Intensity::Strong);
        assert!(settings.control_flow_flattening);
        assert_eq!(settings.target_environment, "Node.js");
    }

    #[test]
    fn missing_fields_take_defaults() {
        let settings: ObfuscationSettings = serde_yaml::from_str("language: Python\n").unwrap();
        assert_eq!(settings.language, SupportedLanguage::Python);
        assert_eq!(settings.intensity, Intensity::Medium);
        assert!(settings.rename_variables);
    }

    #[test]
    fn intensity_parsing() {
        assert_eq!("STRONG".parse::<Intensity>().unwrap(), Intensity::Strong);
        assert!("extreme".parse::<Intensity>().is_err());
        assert!(Intensity::Strong.minifies());
        assert!(!Intensity::Medium.minifies());
    }
}
