//! App configuration for tedana-gear.
//!
//! This module provides configuration loading and validation using figment.
//! The platform writes all user-facing settings into the `config` table of
//! the invocation file; environment variables (prefixed with `TEDANA_GEAR_`)
//! override them, which is how the scheduler layers inject overrides in
//! HPC deployments.

use std::fmt;
use std::path::Path;

use figment::{
    providers::{Env, Format, Json, Serialized},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Where tedana derivatives are placed inside the analysis tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputLayout {
    /// `fmriprep/derivatives/tedana/sub-*/ses-*/func` (BIDS derivatives).
    #[default]
    Bids,
    /// `fmriprep/sub-*/ses-*/func` (results next to the preprocessed data).
    Legacy,
}

impl fmt::Display for OutputLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bids => write!(f, "bids"),
            Self::Legacy => write!(f, "legacy"),
        }
    }
}

/// User-facing gear settings.
///
/// Settings are loaded from (in order of precedence, highest first):
/// 1. Environment variables (prefixed with `TEDANA_GEAR_`)
/// 2. The `config` table of the platform invocation file
/// 3. Default values
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct AppConfig {
    /// Log debug-level messages.
    pub debug: bool,

    /// Log the tedana command lines without executing anything.
    pub gear_dry_run: bool,

    /// Echo times in milliseconds for manually supplied inputs, as a
    /// comma- or space-separated list. Ignored when running from a
    /// preprocessed archive (sidecars are authoritative there).
    pub echo_times: Option<String>,

    /// Placement of tedana derivatives inside the analysis tree.
    pub output_layout: OutputLayout,

    /// Pass the preprocessed brain mask to tedana instead of letting it
    /// compute its own.
    pub explicit_mask: bool,

    /// Extra arguments appended verbatim to the tedana command line.
    pub command_line_args: Option<String>,

    /// Subject label override (`sub-<label>`). Discovered from the
    /// unpacked archive when unset.
    pub subject_label: Option<String>,

    /// Session label override (`ses-<label>`). Discovered from the
    /// unpacked archive when unset.
    pub session_label: Option<String>,
}

impl AppConfig {
    /// Load settings from the invocation file and the environment.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or validation fails.
    pub fn load(config_path: &Path) -> Result<Self> {
        let figment = Figment::new()
            .merge(Serialized::defaults(AppConfig::default()))
            .merge(Figment::from(Json::file(config_path)).focus("config"))
            .merge(Env::prefixed("TEDANA_GEAR_").map(|key| {
                key.as_str()
                    .to_ascii_lowercase()
                    .replace('_', "-")
                    .into()
            }));

        let config: AppConfig = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<()> {
        self.parsed_echo_times()?;
        Ok(())
    }

    /// Parse the `echo-times` setting into milliseconds.
    ///
    /// # Errors
    ///
    /// Returns an error if any entry is not a positive number.
    pub fn parsed_echo_times(&self) -> Result<Option<Vec<f64>>> {
        let Some(raw) = &self.echo_times else {
            return Ok(None);
        };

        let mut times = Vec::new();
        for token in raw
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|t| !t.is_empty())
        {
            let value: f64 = token.parse().map_err(|_| {
                Error::validation(format!("echo-times entry '{token}' is not a number"))
            })?;
            if !value.is_finite() || value <= 0.0 {
                return Err(Error::validation(format!(
                    "echo-times entry '{token}' must be a positive number of milliseconds"
                )));
            }
            times.push(value);
        }

        if times.is_empty() {
            return Err(Error::validation(
                "echo-times was provided but contains no values",
            ));
        }

        Ok(Some(times))
    }

    /// Extra command-line arguments, whitespace-split.
    #[must_use]
    pub fn extra_args(&self) -> Vec<String> {
        self.command_line_args
            .as_deref()
            .map(|raw| raw.split_whitespace().map(String::from).collect())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();

        assert!(!config.debug);
        assert!(!config.gear_dry_run);
        assert!(config.echo_times.is_none());
        assert_eq!(config.output_layout, OutputLayout::Bids);
        assert!(!config.explicit_mask);
        assert!(config.command_line_args.is_none());
        assert!(config.subject_label.is_none());
        assert!(config.session_label.is_none());
    }

    #[test]
    fn test_output_layout_display() {
        assert_eq!(OutputLayout::Bids.to_string(), "bids");
        assert_eq!(OutputLayout::Legacy.to_string(), "legacy");
    }

    #[test]
    fn test_deserialize_kebab_case() {
        let json = r#"{
            "gear-dry-run": true,
            "output-layout": "legacy",
            "explicit-mask": true,
            "command-line-args": "--tedpca kundu"
        }"#;
        let config: AppConfig = serde_json::from_str(json).unwrap();

        assert!(config.gear_dry_run);
        assert_eq!(config.output_layout, OutputLayout::Legacy);
        assert!(config.explicit_mask);
        assert_eq!(
            config.command_line_args.as_deref(),
            Some("--tedpca kundu")
        );
    }

    #[test]
    fn test_parsed_echo_times_none() {
        let config = AppConfig::default();
        assert!(config.parsed_echo_times().unwrap().is_none());
    }

    #[test]
    fn test_parsed_echo_times_spaces() {
        let config = AppConfig {
            echo_times: Some("13.7 31.2 48.7".to_string()),
            ..Default::default()
        };
        let times = config.parsed_echo_times().unwrap().unwrap();
        assert_eq!(times, vec![13.7, 31.2, 48.7]);
    }

    #[test]
    fn test_parsed_echo_times_commas() {
        let config = AppConfig {
            echo_times: Some("13.7, 31.2, 48.7".to_string()),
            ..Default::default()
        };
        let times = config.parsed_echo_times().unwrap().unwrap();
        assert_eq!(times.len(), 3);
    }

    #[test]
    fn test_parsed_echo_times_rejects_garbage() {
        let config = AppConfig {
            echo_times: Some("13.7 fast 48.7".to_string()),
            ..Default::default()
        };
        let err = config.parsed_echo_times().unwrap_err();
        assert!(err.to_string().contains("fast"));
    }

    #[test]
    fn test_parsed_echo_times_rejects_negative() {
        let config = AppConfig {
            echo_times: Some("13.7 -31.2".to_string()),
            ..Default::default()
        };
        assert!(config.parsed_echo_times().is_err());
    }

    #[test]
    fn test_parsed_echo_times_rejects_empty() {
        let config = AppConfig {
            echo_times: Some("  ,  ".to_string()),
            ..Default::default()
        };
        assert!(config.parsed_echo_times().is_err());
    }

    #[test]
    fn test_validate_default_is_ok() {
        assert!(AppConfig::default().validate().is_ok());
    }

    #[test]
    fn test_extra_args_empty() {
        let config = AppConfig::default();
        assert!(config.extra_args().is_empty());
    }

    #[test]
    fn test_extra_args_split() {
        let config = AppConfig {
            command_line_args: Some("--tedpca kundu --verbose".to_string()),
            ..Default::default()
        };
        assert_eq!(
            config.extra_args(),
            vec!["--tedpca", "kundu", "--verbose"]
        );
    }

    #[test]
    fn test_load_from_invocation_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(
            &path,
            r#"{
                "config": {
                    "debug": true,
                    "gear-dry-run": true,
                    "echo-times": "12.0 28.0 44.0"
                },
                "inputs": {},
                "destination": {"id": "64c0ffee"}
            }"#,
        )
        .unwrap();

        let config = AppConfig::load(&path).unwrap();
        assert!(config.debug);
        assert!(config.gear_dry_run);
        assert_eq!(
            config.parsed_echo_times().unwrap().unwrap(),
            vec![12.0, 28.0, 44.0]
        );
        // Untouched settings keep their defaults.
        assert_eq!(config.output_layout, OutputLayout::Bids);
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig::load(&dir.path().join("nope.json")).unwrap();
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn test_load_rejects_bad_echo_times() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(
            &path,
            r#"{"config": {"echo-times": "not numbers"}}"#,
        )
        .unwrap();

        assert!(AppConfig::load(&path).is_err());
    }
}
