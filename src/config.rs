//! Configuration utilities.

use crate::location::AuthorizationStatus;
use anyhow::Context;
use clap::builder;
use clap::error::ErrorKind;
use serde::Deserialize;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::time::Duration;

/// Interval between two samples.
pub const TICK_INTERVAL: Duration = Duration::from_secs(1);

/// Status shown when no location was ever received.
pub const LOCATION_MISSING: &str = "Location Missing";

/// Status shown before the first tick.
pub const NO_LOCATION_YET: &str = "No Location Yet";

/// Behavior of the simulated location provider.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct SourceConfig {
    /// Authorization status reported at startup.
    pub authorization: AuthorizationStatus,
    /// Authorization status reported after the user is asked for permission.
    pub authorization_response: AuthorizationStatus,
    /// Whether location services are enabled at the platform level.
    pub services_enabled: bool,
    /// Delay between two batches of fixes, in milliseconds.
    pub fix_interval_ms: u64,
    /// Number of fixes delivered in each batch.
    pub batch_size: usize,
    /// Whether to start over once all the fixes were delivered.
    pub repeat: bool,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            authorization: AuthorizationStatus::NotDetermined,
            authorization_response: AuthorizationStatus::AuthorizedWhenInUse,
            services_enabled: true,
            fix_interval_ms: 1000,
            batch_size: 1,
            repeat: true,
        }
    }
}

impl SourceConfig {
    /// Reads a location source configuration from the given JSON file.
    fn read_from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).with_context(|| {
            format!(
                "Failed to read location source configuration from: {}",
                path.display()
            )
        })?;
        let reader = BufReader::new(file);
        let config: Self = serde_json::from_reader(reader).with_context(|| {
            format!(
                "Failed to parse location source configuration from: {}",
                path.display()
            )
        })?;

        Ok(config)
    }

    /// Delay between two batches of fixes.
    pub fn fix_interval(&self) -> Duration {
        Duration::from_millis(self.fix_interval_ms.max(1))
    }
}

/// Helper struct to parse a [`SourceConfig`] directly from a Clap argument.
#[derive(Clone)]
pub struct SourceConfigParser;

impl builder::TypedValueParser for SourceConfigParser {
    type Value = SourceConfig;

    fn parse_ref(
        &self,
        cmd: &clap::Command,
        arg: Option<&clap::Arg>,
        value: &std::ffi::OsStr,
    ) -> Result<Self::Value, clap::Error> {
        SourceConfig::read_from_file(value).map_err(|e| {
            let arg_str = arg.map(|a| a.to_string());
            let msg = format!(
                "Failed to parse location source configuration{}{}: {}\n",
                arg_str.map(|a| format!(" ({})", a)).unwrap_or_default(),
                value
                    .to_str()
                    .map(|f| format!(" from file `{}`", f))
                    .unwrap_or_default(),
                e
            );
            clap::Error::raw(ErrorKind::Io, msg).with_cmd(cmd)
        })
    }
}

impl builder::ValueParserFactory for SourceConfig {
    type Parser = SourceConfigParser;

    fn value_parser() -> Self::Parser {
        SourceConfigParser
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn partial_config_uses_defaults() {
        let config: SourceConfig =
            serde_json::from_str(r#"{"authorization": "denied", "batch_size": 3}"#).unwrap();
        assert_eq!(
            config,
            SourceConfig {
                authorization: AuthorizationStatus::Denied,
                batch_size: 3,
                ..SourceConfig::default()
            }
        );
    }

    #[test]
    fn unknown_fields_are_rejected() {
        assert!(serde_json::from_str::<SourceConfig>(r#"{"accuracy": 100}"#).is_err());
    }

    #[test]
    fn fix_interval_is_never_zero() {
        let config = SourceConfig {
            fix_interval_ms: 0,
            ..SourceConfig::default()
        };
        assert_eq!(config.fix_interval(), Duration::from_millis(1));
    }

    #[test]
    fn missing_file() {
        assert!(SourceConfig::read_from_file("/nonexistent/source.json").is_err());
    }
}
