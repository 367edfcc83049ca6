//! Layered configuration.
//!
//! Settings are resolved from, lowest precedence first:
//!
//! 1. built-in defaults
//! 2. an optional TOML file (`--config`)
//! 3. environment variables prefixed with `ELTWATCH_`, nested with `__`
//!    (e.g. `ELTWATCH_THRESHOLDS__STALE_AFTER=12h`)
//! 4. command-line flags
//!
//! # Example file
//!
//! ```toml
//! refresh = "30s"
//!
//! [store]
//! kind = "supabase"
//! url = "https://project.supabase.co"
//! key = "anon-key"
//!
//! [thresholds]
//! stale_after = "24h"
//! zombie_after = "10m"
//! buffer_capacity = 2000
//! buffer_warning = 1000
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use config::{Config, Environment, File};
use serde::Deserialize;

use crate::data::duration::{parse_duration, parse_window};
use crate::data::health::DEFAULT_BUFFER_CAPACITY;
use crate::data::Thresholds;
use crate::source::{FileStore, MockStore, StoreReader, SupabaseStore};

/// Environment variable prefix.
pub const ENV_PREFIX: &str = "ELTWATCH";

/// Which store backend to read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    Mock,
    File,
    Supabase,
}

impl StoreKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StoreKind::Mock => "mock",
            StoreKind::File => "file",
            StoreKind::Supabase => "supabase",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StoreSettings {
    pub kind: StoreKind,
    /// Supabase project URL.
    pub url: Option<String>,
    /// Supabase API key.
    pub key: Option<String>,
    /// JSON fixture path for the file store.
    pub file: Option<PathBuf>,
}

/// Threshold settings as written in config (durations are strings).
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ThresholdSettings {
    pub stale_after: String,
    pub zombie_after: String,
    pub buffer_capacity: u64,
    pub buffer_warning: u64,
}

/// Fully resolved settings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Settings {
    pub store: StoreSettings,
    pub thresholds: ThresholdSettings,
    /// Poll interval, e.g. "30s".
    pub refresh: String,
}

/// Values given on the command line. `None` leaves lower layers in effect.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub store_kind: Option<StoreKind>,
    pub url: Option<String>,
    pub key: Option<String>,
    pub file: Option<PathBuf>,
    pub refresh: Option<String>,
    pub stale_after: Option<String>,
    pub zombie_after: Option<String>,
    pub buffer_capacity: Option<u64>,
    pub buffer_warning: Option<u64>,
}

impl Settings {
    /// Resolve settings from every layer and validate them.
    pub fn load(config_path: Option<&Path>, overrides: &Overrides) -> Result<Self> {
        Self::load_with_env(config_path, overrides, environment())
    }

    fn load_with_env(
        config_path: Option<&Path>,
        overrides: &Overrides,
        env: Environment,
    ) -> Result<Self> {
        let mut builder = Config::builder()
            .set_default("refresh", "30s")?
            .set_default("store.kind", StoreKind::Mock.as_str())?
            .set_default("thresholds.stale_after", "24h")?
            .set_default("thresholds.zombie_after", "10m")?
            .set_default("thresholds.buffer_capacity", DEFAULT_BUFFER_CAPACITY)?
            .set_default("thresholds.buffer_warning", 1000u64)?;

        if let Some(path) = config_path {
            builder = builder.add_source(File::from(path));
        }

        let settings: Settings = builder
            .add_source(env)
            .set_override_option("store.kind", overrides.store_kind.map(|k| k.as_str()))?
            .set_override_option("store.url", overrides.url.clone())?
            .set_override_option("store.key", overrides.key.clone())?
            .set_override_option(
                "store.file",
                overrides
                    .file
                    .as_ref()
                    .map(|p| p.to_string_lossy().into_owned()),
            )?
            .set_override_option("refresh", overrides.refresh.clone())?
            .set_override_option("thresholds.stale_after", overrides.stale_after.clone())?
            .set_override_option("thresholds.zombie_after", overrides.zombie_after.clone())?
            .set_override_option("thresholds.buffer_capacity", overrides.buffer_capacity)?
            .set_override_option("thresholds.buffer_warning", overrides.buffer_warning)?
            .build()?
            .try_deserialize()
            .context("Invalid configuration")?;

        settings.validate()?;
        Ok(settings)
    }

    /// Check everything that can be checked without touching the store.
    pub fn validate(&self) -> Result<()> {
        self.thresholds()?;
        self.refresh_interval()?;

        match self.store.kind {
            StoreKind::Mock => {}
            StoreKind::File => {
                if self.store.file.is_none() {
                    bail!("store.kind = \"file\" requires store.file (or --file)");
                }
            }
            StoreKind::Supabase => {
                if self.store.url.as_deref().is_none_or(str::is_empty) {
                    bail!("store.kind = \"supabase\" requires store.url (or --supabase)");
                }
            }
        }

        Ok(())
    }

    /// Evaluator thresholds. Fails on unparseable windows or zero capacity.
    pub fn thresholds(&self) -> Result<Thresholds> {
        let t = &self.thresholds;
        let thresholds = Thresholds {
            stale_after: parse_window(&t.stale_after)
                .with_context(|| format!("Invalid thresholds.stale_after: {}", t.stale_after))?,
            zombie_after: parse_window(&t.zombie_after)
                .with_context(|| format!("Invalid thresholds.zombie_after: {}", t.zombie_after))?,
            buffer_capacity: t.buffer_capacity,
            buffer_warning: t.buffer_warning,
        };
        thresholds.validate()?;
        Ok(thresholds)
    }

    /// Interval between polls. Must be positive.
    pub fn refresh_interval(&self) -> Result<Duration> {
        let interval = parse_duration(&self.refresh)
            .with_context(|| format!("Invalid refresh: {}", self.refresh))?;
        if interval.is_zero() {
            bail!("refresh must be greater than zero");
        }
        Ok(interval)
    }

    /// Build the configured store reader.
    pub fn build_store(&self) -> Result<Arc<dyn StoreReader>> {
        let store: Arc<dyn StoreReader> = match self.store.kind {
            StoreKind::Mock => Arc::new(MockStore::new()),
            StoreKind::File => {
                let path = self
                    .store
                    .file
                    .as_ref()
                    .context("store.file is not set")?;
                Arc::new(FileStore::new(path))
            }
            StoreKind::Supabase => {
                let url = self.store.url.as_deref().context("store.url is not set")?;
                let store = SupabaseStore::builder()
                    .endpoint(url)
                    .api_key(self.store.key.clone().unwrap_or_default())
                    .build()?;
                Arc::new(store)
            }
        };

        tracing::info!(store = store.description(), "Store configured");
        Ok(store)
    }
}

fn environment() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn env(vars: &[(&str, &str)]) -> Environment {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        environment().source(Some(map))
    }

    #[test]
    fn test_defaults() {
        let settings = Settings::load_with_env(None, &Overrides::default(), env(&[])).unwrap();

        assert_eq!(settings.store.kind, StoreKind::Mock);
        assert_eq!(settings.refresh_interval().unwrap(), Duration::from_secs(30));
        assert_eq!(settings.thresholds().unwrap(), Thresholds::default());
    }

    #[test]
    fn test_file_layer() {
        let mut file = NamedTempFile::with_suffix(".toml").unwrap();
        writeln!(
            file,
            r#"
refresh = "5s"

[store]
kind = "supabase"
url = "https://placeholder-project.supabase.co"
key = "placeholder-key"

[thresholds]
stale_after = "12h"
buffer_capacity = 500
"#
        )
        .unwrap();

        let settings =
            Settings::load_with_env(Some(file.path()), &Overrides::default(), env(&[])).unwrap();

        assert_eq!(settings.store.kind, StoreKind::Supabase);
        assert_eq!(settings.store.key.as_deref(), Some("placeholder-key"));
        assert_eq!(settings.refresh_interval().unwrap(), Duration::from_secs(5));

        let thresholds = settings.thresholds().unwrap();
        assert_eq!(thresholds.stale_after, TimeDelta::hours(12));
        assert_eq!(thresholds.zombie_after, TimeDelta::minutes(10));
        assert_eq!(thresholds.buffer_capacity, 500);
    }

    #[test]
    fn test_env_overrides_file_and_cli_overrides_env() {
        let mut file = NamedTempFile::with_suffix(".toml").unwrap();
        writeln!(file, "[thresholds]\nzombie_after = \"5m\"").unwrap();

        let vars = env(&[
            ("ELTWATCH_THRESHOLDS__ZOMBIE_AFTER", "15m"),
            ("ELTWATCH_THRESHOLDS__BUFFER_WARNING", "1500"),
        ]);
        let settings = Settings::load_with_env(Some(file.path()), &Overrides::default(), vars).unwrap();
        let thresholds = settings.thresholds().unwrap();
        assert_eq!(thresholds.zombie_after, TimeDelta::minutes(15));
        assert_eq!(thresholds.buffer_warning, 1500);

        let overrides = Overrides {
            zombie_after: Some("20m".to_string()),
            ..Default::default()
        };
        let vars = env(&[("ELTWATCH_THRESHOLDS__ZOMBIE_AFTER", "15m")]);
        let settings = Settings::load_with_env(Some(file.path()), &overrides, vars).unwrap();
        assert_eq!(settings.thresholds().unwrap().zombie_after, TimeDelta::minutes(20));
    }

    #[test]
    fn test_zero_capacity_is_rejected() {
        let overrides = Overrides {
            buffer_capacity: Some(0),
            ..Default::default()
        };
        let err = Settings::load_with_env(None, &overrides, env(&[])).unwrap_err();
        assert!(err.to_string().contains("buffer capacity"));
    }

    #[test]
    fn test_invalid_window_is_rejected() {
        let overrides = Overrides {
            stale_after: Some("yesterday".to_string()),
            ..Default::default()
        };
        assert!(Settings::load_with_env(None, &overrides, env(&[])).is_err());
    }

    #[test]
    fn test_store_requirements() {
        let file_without_path = Overrides {
            store_kind: Some(StoreKind::File),
            ..Default::default()
        };
        assert!(Settings::load_with_env(None, &file_without_path, env(&[])).is_err());

        let supabase_without_url = Overrides {
            store_kind: Some(StoreKind::Supabase),
            ..Default::default()
        };
        assert!(Settings::load_with_env(None, &supabase_without_url, env(&[])).is_err());

        let file = Overrides {
            store_kind: Some(StoreKind::File),
            file: Some(PathBuf::from("/tmp/store.json")),
            ..Default::default()
        };
        let settings = Settings::load_with_env(None, &file, env(&[])).unwrap();
        let store = settings.build_store().unwrap();
        assert_eq!(store.description(), "file: /tmp/store.json");
    }

    #[test]
    fn test_zero_refresh_is_rejected() {
        let overrides = Overrides {
            refresh: Some("0s".to_string()),
            ..Default::default()
        };
        assert!(Settings::load_with_env(None, &overrides, env(&[])).is_err());
    }
}
