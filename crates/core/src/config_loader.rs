//! Layered configuration loading: defaults, TOML file, then environment.

use crate::config::EngineConfig;
use anyhow::Result;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use std::path::Path;

/// Default location of the engine configuration file.
pub const DEFAULT_CONFIG_PATH: &str = "config/Settlement.toml";

pub struct ConfigLoader;

impl ConfigLoader {
    /// Loads engine configuration by layering defaults, the TOML file and
    /// `SETTLE_`-prefixed environment variables (`SETTLE_TREND__WINNER_MARGIN=1.5`).
    ///
    /// A missing file is not an error; defaults apply.
    ///
    /// # Errors
    ///
    /// Returns an error if the file or an environment value cannot be parsed.
    pub fn load() -> Result<EngineConfig> {
        Self::load_from(DEFAULT_CONFIG_PATH)
    }

    /// Loads engine configuration from a specific TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file or an environment value cannot be parsed.
    pub fn load_from(path: impl AsRef<Path>) -> Result<EngineConfig> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::debug!(path = %path.display(), "No config file, using defaults");
        }

        let config: EngineConfig = Self::figment(path).extract()?;
        Ok(config)
    }

    fn figment(path: &Path) -> Figment {
        Figment::from(Serialized::defaults(EngineConfig::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed("SETTLE_").split("__"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    #[test]
    fn missing_file_yields_defaults() {
        Jail::expect_with(|_jail| {
            let config = ConfigLoader::load_from("config/missing.toml").unwrap();
            assert_eq!(config, EngineConfig::default());
            Ok(())
        });
    }

    #[test]
    fn toml_overrides_selected_fields() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "Settlement.toml",
                r#"
                [positioning]
                contract_multiplier = 10

                [scenario]
                max_scenarios = 4
                "#,
            )?;

            let config = ConfigLoader::load_from("Settlement.toml").unwrap();
            assert_eq!(config.positioning.contract_multiplier, 10);
            assert_eq!(config.positioning.top_n, 3);
            assert_eq!(config.scenario.max_scenarios, 4);
            assert!((config.trend.oi_flow_ratio - 1.3).abs() < f64::EPSILON);
            Ok(())
        });
    }

    #[test]
    fn env_overrides_file() {
        Jail::expect_with(|jail| {
            jail.create_file("Settlement.toml", "[risk]\nlarge_shift = 5000.0\n")?;
            jail.set_env("SETTLE_RISK__LARGE_SHIFT", "7500.0");

            let config = ConfigLoader::load_from("Settlement.toml").unwrap();
            assert!((config.risk.large_shift - 7500.0).abs() < f64::EPSILON);
            Ok(())
        });
    }
}
