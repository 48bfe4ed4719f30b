//! Tenant isolation configuration.

use serde::{Deserialize, Serialize};

use crate::models::EntityType;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TenancyConfig {
    /// Entity types living under the shared reference tenant. Edges from any
    /// tenant may target them.
    pub shared_reference_types: Vec<EntityType>,
}

impl TenancyConfig {
    pub fn is_shared(&self, entity_type: EntityType) -> bool {
        self.shared_reference_types.contains(&entity_type)
    }
}
