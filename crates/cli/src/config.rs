//! Configuration file loading for the `papermill` binary.
//!
//! The file is TOML with two tables: `[run]` maps straight onto
//! [`pipeline::RunConfig`] and `[providers]` names the models used for the
//! two provider roles. Every field has a default, so an absent file and an
//! empty file both yield a working configuration.

use std::path::Path;

use anyhow::Context;
use pipeline::RunConfig;
use serde::Deserialize;

/// Default configuration file name, looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "papermill.toml";

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    /// Orchestration settings handed to the scheduler.
    pub run: RunConfig,
    /// Provider model names.
    pub providers: ProvidersConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProvidersConfig {
    /// Model used for abstract screening and full-paper analysis.
    pub openai_model: String,
    /// Model used for hypothesis generation and experiment design.
    pub together_model: String,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            openai_model: "gpt-4o".into(),
            together_model: "meta-llama/Llama-3.3-70B-Instruct-Turbo-Free".into(),
        }
    }
}

impl CliConfig {
    /// Loads the configuration.
    ///
    /// An explicitly given path must exist; otherwise `papermill.toml` in the
    /// working directory is used when present, and built-in defaults when not.
    pub fn load(explicit: Option<&Path>) -> anyhow::Result<Self> {
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => {
                let default = Path::new(DEFAULT_CONFIG_FILE);
                if !default.exists() {
                    return Ok(Self::default());
                }
                default.to_path_buf()
            }
        };
        let raw = std::fs::read_to_string(&path)
            .with_context(|| format!("reading configuration file {}", path.display()))?;
        let config: Self = toml::from_str(&raw)
            .with_context(|| format!("parsing configuration file {}", path.display()))?;
        config.run.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_yields_defaults() {
        let config: CliConfig = toml::from_str("").expect("empty file parses");
        assert_eq!(config.run, RunConfig::default());
        assert_eq!(config.providers.openai_model, "gpt-4o");
    }

    #[test]
    fn run_table_overrides_defaults() {
        let config: CliConfig = toml::from_str(
            r#"
            [run]
            max_workers = 5
            default_max_results = 10

            [providers]
            openai_model = "gpt-4o-mini"
            "#,
        )
        .expect("parses");
        assert_eq!(config.run.max_workers, 5);
        assert_eq!(config.run.default_max_results, 10);
        assert_eq!(config.providers.openai_model, "gpt-4o-mini");
        // Untouched tables keep their defaults.
        assert_eq!(config.run.rate_limits, RunConfig::default().rate_limits);
    }

    #[test]
    fn rate_limit_rules_parse_from_toml() {
        let config: CliConfig = toml::from_str(
            r#"
            [[run.rate_limits]]
            service = "openai"
            max_calls = 10
            window_secs = 60
            policy = "reject"
            "#,
        )
        .expect("parses");
        assert_eq!(config.run.rate_limits.len(), 1);
        assert_eq!(
            config.run.rate_limits[0].policy,
            pipeline::LimitPolicy::Reject
        );
    }
}
