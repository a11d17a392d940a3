//! Persisted record types for the installation ledger.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{ComponentId, HostSide, ProductId};

/// Persisted fact that a component was installed.
///
/// Written once on successful execute; replaced wholesale on forced
/// reinstall, never mutated in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstalledRecord {
    /// Identity of the installed component.
    pub component_id: ComponentId,

    /// When the install completed.
    pub installed_at: DateTime<Utc>,

    /// Verbatim argument list the component was installed with.
    #[serde(default)]
    pub parameters: Vec<String>,

    /// Owning product, for product-scoped components.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product: Option<ProductId>,

    /// Deployment side, for product-level components.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub side: Option<HostSide>,
}

impl InstalledRecord {
    /// Create a record stamped with the current time.
    pub fn new(component_id: ComponentId, parameters: Vec<String>) -> Self {
        Self {
            component_id,
            installed_at: Utc::now(),
            parameters,
            product: None,
            side: None,
        }
    }

    pub fn with_product(mut self, product: ProductId, side: HostSide) -> Self {
        self.product = Some(product);
        self.side = Some(side);
        self
    }
}

/// Outcome of seeding a configuration record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSeedOutcome {
    /// A fresh configuration record was written.
    Seeded,
    /// A record already existed; possibly hand-edited, left untouched.
    AlreadyPresent,
}
