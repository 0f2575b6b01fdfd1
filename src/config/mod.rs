//! Configuration management for the mirror.
//!
//! Provides hierarchical configuration loading and validation with:
//! - Default values as code base
//! - Configuration file named by `CONFIG_PATH`
//! - Environment variable overrides (`MIRROR__` prefix)
//! - Component-wise validation
mod local;
mod subscribe;
pub use local::*;
pub use subscribe::*;


use std::env;
use std::fmt::Debug;

use config::Config;
use config::Environment;
use config::File;
use serde::Deserialize;
use serde::Serialize;

use crate::constants::CONFIG_PATH_ENV;
use crate::constants::ENV_PREFIX;
use crate::Error;
use crate::Result;

/// Main configuration container of the mirror
///
/// Combines local runtime settings with the declared subscriptions:
/// 1. Default values from code implementation
/// 2. Configuration file specified by `CONFIG_PATH`
/// 3. Environment variables (highest priority)
#[derive(Serialize, Deserialize, Clone, Default)]
pub struct MirrorConfig {
    /// Application identity and operating mode
    #[serde(default)]
    pub local: LocalConfig,
    /// Variables of interest, in declaration order
    #[serde(default)]
    pub subscribe: Vec<SubscriptionConfig>,
}

impl Debug for MirrorConfig {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("MirrorConfig")
            .field("local", &self.local)
            .field("subscriptions", &self.subscribe.len())
            .finish()
    }
}

impl MirrorConfig {
    /// Loads configuration from hierarchical sources without validation.
    ///
    /// Sources are merged in the following order (later sources override earlier):
    /// 1. Type defaults (lowest priority)
    /// 2. Configuration file from `CONFIG_PATH` environment variable (if set)
    /// 3. Environment variables with `MIRROR__` prefix (highest priority)
    ///
    /// # Note
    /// Validation is deferred so further overrides can be applied with
    /// `with_override_config()`. Callers MUST call `validate()` before use.
    ///
    /// # Examples
    /// ```ignore
    /// std::env::set_var("CONFIG_PATH", "config/mirror.toml");
    /// std::env::set_var("MIRROR__LOCAL__OFFLINE_MODE", "true");
    /// let cfg = MirrorConfig::new()?.validate()?;
    /// ```
    pub fn new() -> Result<Self> {
        let mut builder = Config::builder().add_source(Config::try_from(&Self::default())?);

        if let Ok(config_path) = env::var(CONFIG_PATH_ENV) {
            builder = builder.add_source(File::with_name(&config_path).required(true));
        }

        builder = builder.add_source(env_source());

        let config: Self = builder.build()?.try_deserialize()?;
        Ok(config)
    }

    /// Applies additional configuration overrides from file without validation.
    ///
    /// Merging order (later sources override earlier):
    /// 1. Current configuration values
    /// 2. New configuration file
    /// 3. Latest environment variables (highest priority)
    pub fn with_override_config(
        &self,
        path: &str,
    ) -> Result<Self> {
        let config: Self = Config::builder()
            .add_source(Config::try_from(self)?)
            .add_source(File::with_name(path))
            .add_source(env_source())
            .build()?
            .try_deserialize()?;
        Ok(config)
    }

    /// Validates configuration and returns validated instance.
    ///
    /// # Errors
    /// - Empty application name or zero page size / timeout
    /// - Empty subscription list
    /// - A subscription with an empty group, id or handler name
    pub fn validate(self) -> Result<Self> {
        self.local.validate()?;

        if self.subscribe.is_empty() {
            return Err(Error::InvalidConfig("Subscribe Vars is empty".into()));
        }
        for subscription in &self.subscribe {
            subscription.validate()?;
        }
        Ok(self)
    }

    /// Human readable one-line summary for startup logs
    pub fn describe(&self) -> String {
        format!(
            "app:{}; namespaceID:{}; mode:{}; subscriptions:{}",
            self.local.app_name,
            self.local.namespace_id,
            if self.local.offline_mode { "offline" } else { "online" },
            self.subscribe.len()
        )
    }
}

fn env_source() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .separator("__")
        .ignore_empty(true)
        .try_parsing(true)
}
