//! Configuration for the tracker service.

use std::collections::BTreeMap;
use std::path::Path;

use civic_core::index::{pm25_epa, PM25};
use civic_core::lifecycle::DEFAULT_SUBMITTED_NOTE;
use civic_core::{BreakpointTable, ClusterRadius, IndexCalculator, ModerationPolicy};
use serde::{Deserialize, Serialize};

use crate::error::{Result, TrackerError};

/// Configuration for a report tracker instance.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Lifecycle configuration
    pub lifecycle: LifecycleConfig,
    /// Map clustering configuration
    pub clustering: ClusteringConfig,
    /// Submission screening configuration
    pub moderation: ModerationConfig,
    /// Store interaction configuration
    pub store: StoreConfig,
    /// Pollutant index tables
    pub index: IndexConfig,
    /// General settings
    pub general: GeneralConfig,
}

impl TrackerConfig {
    /// Load config from YAML.
    pub fn from_yaml(yaml: &str) -> std::result::Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(yaml)
    }

    /// Serialize to YAML.
    pub fn to_yaml(&self) -> std::result::Result<String, serde_yaml::Error> {
        serde_yaml::to_string(self)
    }

    /// Load and validate a YAML config file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path)
            .map_err(|e| TrackerError::Config(format!("{}: {}", path.display(), e)))?;
        let config = Self::from_yaml(&yaml)
            .map_err(|e| TrackerError::Config(format!("{}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.store.max_retries == 0 {
            return Err(TrackerError::Config(
                "store.max_retries must be at least 1".to_string(),
            ));
        }
        ClusterRadius::Meters(self.clustering.default_radius_m)
            .to_meters()
            .map_err(|e| TrackerError::Config(format!("clustering.default_radius_m: {e}")))?;
        if !self.clustering.default_pixel_radius.is_finite()
            || self.clustering.default_pixel_radius <= 0.0
        {
            return Err(TrackerError::Config(format!(
                "clustering.default_pixel_radius must be positive, got {}",
                self.clustering.default_pixel_radius
            )));
        }
        for (pollutant, table) in &self.index.tables {
            if pollutant.trim().is_empty() {
                return Err(TrackerError::Config("index.tables has an empty pollutant key".to_string()));
            }
            BreakpointTable::new(table.bands().to_vec(), table.precision())
                .map_err(|e| TrackerError::Config(format!("index.tables.{pollutant}: {e}")))?;
        }
        Ok(())
    }
}

/// Lifecycle configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LifecycleConfig {
    /// Note recorded with the submission entry
    pub submitted_note: String,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            submitted_note: DEFAULT_SUBMITTED_NOTE.to_string(),
        }
    }
}

/// Map clustering configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusteringConfig {
    /// Radius used when a caller gives none (metres)
    pub default_radius_m: f64,
    /// Screen radius for pixel-based clustering
    pub default_pixel_radius: f64,
}

impl Default for ClusteringConfig {
    fn default() -> Self {
        Self {
            default_radius_m: 500.0,
            default_pixel_radius: 80.0,
        }
    }
}

impl ClusteringConfig {
    pub fn default_radius(&self) -> ClusterRadius {
        ClusterRadius::Meters(self.default_radius_m)
    }
}

/// Submission screening configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModerationConfig {
    /// Reject gibberish submissions
    pub enabled: bool,
    /// Junk words on top of the built-in list
    pub extra_junk_words: Vec<String>,
}

impl Default for ModerationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            extra_junk_words: vec![],
        }
    }
}

impl ModerationConfig {
    /// The policy to apply, or `None` when screening is off.
    pub fn policy(&self) -> Option<ModerationPolicy> {
        self.enabled
            .then(|| ModerationPolicy::new().with_junk_words(self.extra_junk_words.iter().cloned()))
    }
}

/// Store interaction configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Attempts per transition when the store reports a concurrent change
    pub max_retries: u32,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self { max_retries: 3 }
    }
}

/// Pollutant index tables, keyed by pollutant.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    pub tables: BTreeMap<String, BreakpointTable>,
}

impl Default for IndexConfig {
    fn default() -> Self {
        let mut tables = BTreeMap::new();
        tables.insert(PM25.to_string(), pm25_epa().clone());
        Self { tables }
    }
}

impl IndexConfig {
    /// Calculator with the built-in tables overlaid by the configured ones.
    pub fn calculator(&self) -> IndexCalculator {
        self.tables
            .iter()
            .fold(IndexCalculator::standard(), |calc, (pollutant, table)| {
                calc.with_table(pollutant, table.clone())
            })
    }
}

/// General configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = TrackerConfig::default();
        assert_eq!(config.store.max_retries, 3);
        assert_eq!(config.clustering.default_radius_m, 500.0);
        assert!(config.moderation.enabled);
        assert!(config.index.tables.contains_key(PM25));
        config.validate().unwrap();
    }

    #[test]
    fn test_yaml_roundtrip() {
        let mut config = TrackerConfig::default();
        config.lifecycle.submitted_note = "Received".to_string();
        let yaml = config.to_yaml().unwrap();
        let parsed = TrackerConfig::from_yaml(&yaml).unwrap();
        assert_eq!(parsed.lifecycle.submitted_note, "Received");
        assert_eq!(parsed.index.tables[PM25], *pm25_epa());
    }

    #[test]
    fn test_partial_yaml_with_custom_table() {
        let yaml = r#"
store:
  max_retries: 5
index:
  tables:
    no2:
      bands:
        - { concentration_low: 0.0, concentration_high: 53.0, index_low: 0, index_high: 50 }
        - { concentration_low: 54.0, concentration_high: 100.0, index_low: 51, index_high: 100 }
"#;
        let config = TrackerConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.store.max_retries, 5);
        assert_eq!(config.clustering.default_pixel_radius, 80.0);

        let calc = config.index.calculator();
        assert_eq!(calc.compute("NO2", 53.0).unwrap(), 50);
        // built-in table survives a config that does not list it
        assert_eq!(calc.compute("pm2.5", 10.0).unwrap(), 42);
    }

    #[test]
    fn test_invalid_table_rejected_on_load() {
        let yaml = r#"
index:
  tables:
    o3:
      bands:
        - { concentration_low: 10.0, concentration_high: 5.0, index_low: 0, index_high: 50 }
"#;
        assert!(TrackerConfig::from_yaml(yaml).is_err());
    }

    #[test]
    fn test_validate() {
        let mut config = TrackerConfig::default();
        config.store.max_retries = 0;
        assert!(matches!(config.validate(), Err(TrackerError::Config(_))));

        let mut config = TrackerConfig::default();
        config.clustering.default_radius_m = -1.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_moderation_policy_toggle() {
        let mut config = TrackerConfig::default();
        assert!(config.moderation.policy().is_some());
        config.moderation.enabled = false;
        assert!(config.moderation.policy().is_none());
    }
}
