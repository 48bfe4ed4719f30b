pub mod connectivity_config;
pub mod query_config;
pub mod storage_config;
pub mod tenancy_config;
pub mod ttl_config;

use serde::{Deserialize, Serialize};

pub use connectivity_config::ConnectivityConfig;
pub use query_config::QueryConfig;
pub use storage_config::StorageConfig;
pub use tenancy_config::TenancyConfig;
pub use ttl_config::TtlConfig;

use crate::errors::{TopologyError, TopologyResult};

/// Top-level configuration aggregating all subsystem configs.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct TopologyConfig {
    pub storage: StorageConfig,
    pub ttl: TtlConfig,
    pub connectivity: ConnectivityConfig,
    pub query: QueryConfig,
    pub tenancy: TenancyConfig,
}

impl TopologyConfig {
    /// Load config from a TOML string, falling back to defaults for missing fields.
    pub fn from_toml(toml_str: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(toml_str)
    }

    /// Parse and validate in one step.
    pub fn load(toml_str: &str) -> TopologyResult<Self> {
        let config =
            Self::from_toml(toml_str).map_err(|e| TopologyError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> TopologyResult<()> {
        self.ttl.validate()?;
        self.connectivity.validate()?;
        self.query.validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::EntityType;

    #[test]
    fn empty_toml_yields_defaults() {
        let config = TopologyConfig::load("").unwrap();
        assert_eq!(config.connectivity.modulus, 3);
        assert_eq!(config.query.page_size, 256);
        assert!(config.storage.db_path.is_none());
    }

    #[test]
    fn partial_toml_overrides_sections() {
        let config = TopologyConfig::load(
            r#"
            [ttl]
            sweep_interval_secs = 30

            [ttl.ttl_seconds]
            device = 3600
            software = 86400

            [connectivity]
            modulus = 5
            internal_bridging_domains = ["software", "device"]
            cross_domain_pairs = [["device", "location"]]

            [tenancy]
            shared_reference_types = ["location"]
            "#,
        )
        .unwrap();
        assert_eq!(config.ttl.ttl_for(EntityType::Device), Some(3600));
        assert_eq!(config.ttl.ttl_for(EntityType::Location), None);
        assert_eq!(config.connectivity.modulus, 5);
        assert_eq!(
            config.connectivity.cross_domain_pairs,
            vec![(EntityType::Device, EntityType::Location)]
        );
        assert!(config.tenancy.is_shared(EntityType::Location));
    }

    #[test]
    fn zero_modulus_is_rejected() {
        let err = TopologyConfig::load("[connectivity]\nmodulus = 0\n").unwrap_err();
        assert!(matches!(err, TopologyError::Config(_)));
    }

    #[test]
    fn zero_ttl_and_unknown_type_are_rejected() {
        assert!(TopologyConfig::load("[ttl.ttl_seconds]\ndevice = 0\n").is_err());
        assert!(TopologyConfig::load("[ttl.ttl_seconds]\nprinter = 60\n").is_err());
    }
}
