//! Engine configuration.

pub mod thresholds;

use serde::{Deserialize, Serialize};

pub use thresholds::{AlertThresholds, EngineLimits};

/// Top-level configuration for the engine, loadable from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PulseConfig {
    pub thresholds: AlertThresholds,
    pub limits: EngineLimits,
}

impl PulseConfig {
    /// Parse a TOML document. Unknown keys are ignored; missing keys take
    /// their defaults.
    pub fn from_toml(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_yields_defaults() {
        let config = PulseConfig::from_toml("").unwrap();
        assert_eq!(config.thresholds.effective_conversion_drop_pp(), 0.10);
        assert_eq!(config.limits.effective_aggregation_fetch_rows(), 10_000);
    }

    #[test]
    fn overrides_are_honored() {
        let config = PulseConfig::from_toml(
            "[thresholds]\nconversion_drop_pp = 0.25\n\n[limits]\ntrust_sample_rows = 50\n",
        )
        .unwrap();
        assert_eq!(config.thresholds.effective_conversion_drop_pp(), 0.25);
        assert_eq!(config.limits.effective_trust_sample_rows(), 50);
    }
}
