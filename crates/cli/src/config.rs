//! Layered configuration: built-in defaults, the TOML file, the
//! `AUDITAB_API_KEYS` environment variable, then command-line flags.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use audit::{ConfigurationError, ModelName, DEFAULT_TEMPERATURE};
use batch::BatchOptions;
use llm::{GeminiConfig, DEFAULT_ENDPOINT, DEFAULT_MODEL};
use serde::Deserialize;

use crate::args::Args;
use crate::export::WorkbookFormat;

/// Configuration file looked up when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "auditab.toml";

/// Comma-separated API keys; replaces `engine.api_keys` when set.
pub const API_KEYS_ENV: &str = "AUDITAB_API_KEYS";

// ---------------------------------------------------------------------------
// File representation
// ---------------------------------------------------------------------------

/// The TOML file as written. Every section and key is optional.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub engine: EngineSection,
    pub batch: BatchSection,
    pub output: OutputSection,
    pub telemetry: TelemetrySection,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineSection {
    pub endpoint: String,
    pub model: String,
    pub temperature: f32,
    pub request_timeout_secs: u64,
    pub api_keys: Vec<String>,
}

impl Default for EngineSection {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            model: DEFAULT_MODEL.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            request_timeout_secs: 600,
            api_keys: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BatchSection {
    pub concurrency: usize,
    /// Per-call deadline. Absent means no deadline beyond the HTTP timeout.
    pub deadline_secs: Option<u64>,
    pub max_attempts: u32,
    pub retry_backoff_ms: u64,
}

impl Default for BatchSection {
    fn default() -> Self {
        let options = BatchOptions::default();
        Self {
            concurrency: options.concurrency,
            deadline_secs: None,
            max_attempts: options.max_attempts,
            retry_backoff_ms: options.retry_backoff.as_millis() as u64,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputSection {
    pub directory: PathBuf,
    pub write_report: bool,
    pub format: WorkbookFormat,
}

impl Default for OutputSection {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("output"),
            write_report: true,
            format: WorkbookFormat::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TelemetrySection {
    pub json_logs: bool,
    pub otlp_endpoint: Option<String>,
    /// `EnvFilter` directives; `RUST_LOG` takes precedence when set.
    pub filter: String,
}

impl Default for TelemetrySection {
    fn default() -> Self {
        Self {
            json_logs: false,
            otlp_endpoint: None,
            filter: "info".to_string(),
        }
    }
}

impl FileConfig {
    pub fn from_toml(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    /// Reads `path`. A missing file is an error only when it was asked for
    /// explicitly.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let (path, explicit) = match path {
            Some(p) => (p, true),
            None => (Path::new(DEFAULT_CONFIG_FILE), false),
        };
        if !explicit && !path.exists() {
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        Self::from_toml(&text).with_context(|| format!("invalid config file {}", path.display()))
    }
}

// ---------------------------------------------------------------------------
// Resolved settings
// ---------------------------------------------------------------------------

/// Everything the run needs, validated.
#[derive(Debug, Clone)]
pub struct Settings {
    pub engine: GeminiConfig,
    pub temperature: f32,
    pub api_keys: Vec<String>,
    pub batch: BatchOptions,
    pub output_dir: PathBuf,
    pub write_report: bool,
    pub format: WorkbookFormat,
    pub telemetry: TelemetrySection,
    pub inputs: Vec<PathBuf>,
}

impl Settings {
    /// Merges the layers, highest precedence last, and validates the result.
    pub fn resolve(
        file: FileConfig,
        env_keys: Option<&str>,
        args: &Args,
    ) -> Result<Self, ConfigurationError> {
        let FileConfig {
            engine,
            batch,
            output,
            telemetry,
        } = file;

        // A blank variable counts as unset.
        let env_keys = env_keys.map(split_keys).filter(|keys| !keys.is_empty());
        let api_keys: Vec<String> = match env_keys {
            Some(keys) => keys,
            None => engine
                .api_keys
                .iter()
                .map(|k| k.trim().to_string())
                .filter(|k| !k.is_empty())
                .collect(),
        };
        if api_keys.is_empty() {
            return Err(ConfigurationError::new(format!(
                "no API keys configured; set engine.api_keys or {API_KEYS_ENV}"
            )));
        }

        if !(0.0..=2.0).contains(&engine.temperature) {
            return Err(ConfigurationError::new(format!(
                "engine temperature must be within 0.0..=2.0, got {}",
                engine.temperature
            )));
        }
        if engine.request_timeout_secs == 0 {
            return Err(ConfigurationError::new(
                "engine request_timeout_secs must be positive",
            ));
        }
        let model = ModelName::new(engine.model)
            .ok_or_else(|| ConfigurationError::new("engine model must not be blank"))?;
        if engine.endpoint.trim().is_empty() {
            return Err(ConfigurationError::new("engine endpoint must not be blank"));
        }

        let options = BatchOptions {
            concurrency: args.concurrency.unwrap_or(batch.concurrency),
            deadline: batch.deadline_secs.map(Duration::from_secs),
            max_attempts: batch.max_attempts,
            retry_backoff: Duration::from_millis(batch.retry_backoff_ms),
        };
        options.validate()?;

        Ok(Self {
            engine: GeminiConfig {
                endpoint: engine.endpoint,
                model,
                request_timeout: Duration::from_secs(engine.request_timeout_secs),
            },
            temperature: engine.temperature,
            api_keys,
            batch: options,
            output_dir: args.output.clone().unwrap_or(output.directory),
            write_report: output.write_report,
            format: output.format,
            telemetry,
            inputs: args.inputs.clone(),
        })
    }
}

fn split_keys(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn args(extra: &[&str]) -> Args {
        let mut argv = vec!["auditab"];
        argv.extend_from_slice(extra);
        argv.push("report.pdf");
        Args::try_parse_from(argv).unwrap()
    }

    const FULL: &str = r#"
        [engine]
        model = "gemini-2.5-flash"
        temperature = 0.2
        api_keys = ["k1", " k2 ", ""]

        [batch]
        concurrency = 3
        deadline_secs = 120
        max_attempts = 2
        retry_backoff_ms = 500

        [output]
        directory = "workbooks"
        write_report = false
        format = "json"

        [telemetry]
        json_logs = true
        otlp_endpoint = "http://localhost:4317"
    "#;

    #[test]
    fn empty_file_yields_defaults() {
        assert_eq!(FileConfig::from_toml("").unwrap(), FileConfig::default());
    }

    #[test]
    fn workbooks_default_to_xlsx() {
        let file = FileConfig::from_toml("[output]\ndirectory = \"out\"").unwrap();
        assert_eq!(file.output.format, WorkbookFormat::Xlsx);
        assert!(FileConfig::from_toml("[output]\nformat = \"csv\"").is_err());
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(FileConfig::from_toml("[engine]\nmodle = \"x\"").is_err());
    }

    #[test]
    fn file_values_are_applied() {
        let settings =
            Settings::resolve(FileConfig::from_toml(FULL).unwrap(), None, &args(&[])).unwrap();
        assert_eq!(settings.engine.model.as_str(), "gemini-2.5-flash");
        assert_eq!(settings.engine.endpoint, DEFAULT_ENDPOINT);
        assert_eq!(settings.api_keys, ["k1", "k2"]);
        assert_eq!(settings.batch.concurrency, 3);
        assert_eq!(settings.batch.deadline, Some(Duration::from_secs(120)));
        assert_eq!(settings.batch.max_attempts, 2);
        assert_eq!(settings.batch.retry_backoff, Duration::from_millis(500));
        assert_eq!(settings.output_dir, PathBuf::from("workbooks"));
        assert!(!settings.write_report);
        assert_eq!(settings.format, WorkbookFormat::Json);
        assert!(settings.telemetry.json_logs);
        assert_eq!(settings.telemetry.filter, "info");
    }

    #[test]
    fn environment_keys_replace_file_keys() {
        let settings = Settings::resolve(
            FileConfig::from_toml(FULL).unwrap(),
            Some("env-a, env-b,,"),
            &args(&[]),
        )
        .unwrap();
        assert_eq!(settings.api_keys, ["env-a", "env-b"]);
    }

    #[test]
    fn flags_override_the_file() {
        let settings = Settings::resolve(
            FileConfig::from_toml(FULL).unwrap(),
            None,
            &args(&["-j", "8", "-o", "elsewhere"]),
        )
        .unwrap();
        assert_eq!(settings.batch.concurrency, 8);
        assert_eq!(settings.output_dir, PathBuf::from("elsewhere"));
        assert_eq!(settings.inputs, [PathBuf::from("report.pdf")]);
    }

    #[test]
    fn blank_environment_keys_fall_back_to_the_file() {
        for blank in ["", "   ", " , ,"] {
            let settings =
                Settings::resolve(FileConfig::from_toml(FULL).unwrap(), Some(blank), &args(&[]))
                    .unwrap();
            assert_eq!(settings.api_keys, ["k1", "k2"]);
        }
    }

    #[test]
    fn missing_keys_are_a_configuration_error() {
        let err = Settings::resolve(FileConfig::default(), Some(" , "), &args(&[])).unwrap_err();
        assert!(err.to_string().contains(API_KEYS_ENV));
    }

    #[test]
    fn degenerate_values_are_rejected() {
        let with_keys = |toml: &str| {
            let mut file = FileConfig::from_toml(toml).unwrap();
            file.engine.api_keys = vec!["k".into()];
            Settings::resolve(file, None, &args(&[]))
        };
        assert!(with_keys("[batch]\nconcurrency = 0").is_err());
        assert!(with_keys("[batch]\nmax_attempts = 0").is_err());
        assert!(with_keys("[batch]\ndeadline_secs = 0").is_err());
        assert!(with_keys("[engine]\ntemperature = 3.5").is_err());
        assert!(with_keys("[engine]\nmodel = \" \"").is_err());
        assert!(with_keys("[engine]\nrequest_timeout_secs = 0").is_err());
        assert!(with_keys("").is_ok());
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("absent.toml");
        assert!(FileConfig::load(Some(&missing)).is_err());
    }

    #[test]
    fn file_is_loaded_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("auditab.toml");
        std::fs::write(&path, "[batch]\nconcurrency = 5\n").unwrap();
        assert_eq!(FileConfig::load(Some(&path)).unwrap().batch.concurrency, 5);
    }
}
