//! Persisted adapter registrations.
//!
//! The Installer records one registration per installed adapter action;
//! the router reads the whole set back at dispatch time. Registrations are
//! keyed by the `(product, tool, action)` triple, at most one
//! implementation per triple.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::types::{ActionId, ProductId, ToolId};

/// File under the state directory holding the registration set.
pub const REGISTRATIONS_FILE: &str = "Registrations.toml";

/// Slave-side fact that `(product, tool, action)` is backed by an installed
/// adapter, plus the product-level parameters prepended at invocation time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdapterRegistration {
    pub product: ProductId,
    pub tool: ToolId,
    pub action: ActionId,
    #[serde(default)]
    pub product_parameters: Vec<String>,
}

impl AdapterRegistration {
    pub fn new(product: ProductId, tool: ToolId, action: ActionId) -> Self {
        Self {
            product,
            tool,
            action,
            product_parameters: Vec::new(),
        }
    }

    pub fn with_product_parameters(mut self, parameters: Vec<String>) -> Self {
        self.product_parameters = parameters;
        self
    }

    fn same_triple(&self, other: &AdapterRegistration) -> bool {
        self.product == other.product && self.tool == other.tool && self.action == other.action
    }
}

/// The full registration set of one Slave host.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegistrationSet {
    #[serde(default, rename = "registration")]
    registrations: Vec<AdapterRegistration>,
}

/// `ToolId::All` matches every tool category, on either side of the lookup.
fn tool_matches(registered: ToolId, requested: ToolId) -> bool {
    registered == requested || registered == ToolId::All || requested == ToolId::All
}

impl RegistrationSet {
    /// Record a registration, replacing any prior one for the same triple.
    pub fn record(&mut self, registration: AdapterRegistration) {
        self.registrations.retain(|r| !r.same_triple(&registration));
        self.registrations.push(registration);
    }

    /// The registration backing `(product, tool, action)`, if installed.
    pub fn lookup(
        &self,
        product: &ProductId,
        tool: ToolId,
        action: &ActionId,
    ) -> Option<&AdapterRegistration> {
        self.registrations.iter().find(|r| {
            &r.product == product && tool_matches(r.tool, tool) && &r.action == action
        })
    }

    /// Products holding at least one registration for this tool category,
    /// in stable order.
    pub fn products_for(&self, tool: ToolId) -> Vec<&ProductId> {
        let products: BTreeSet<&ProductId> = self
            .registrations
            .iter()
            .filter(|r| tool_matches(r.tool, tool))
            .map(|r| &r.product)
            .collect();
        products.into_iter().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &AdapterRegistration> {
        self.registrations.iter()
    }

    pub fn len(&self) -> usize {
        self.registrations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registrations.is_empty()
    }
}

/// File-backed store for the registration set.
#[derive(Debug, Clone)]
pub struct RegistrationStore {
    path: PathBuf,
}

impl RegistrationStore {
    pub fn open(state_dir: &Path) -> Self {
        Self {
            path: state_dir.join(REGISTRATIONS_FILE),
        }
    }

    pub fn load(&self) -> anyhow::Result<RegistrationSet> {
        if !self.path.exists() {
            return Ok(RegistrationSet::default());
        }
        let text = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read registrations: {}", self.path.display()))?;
        toml::from_str(&text)
            .with_context(|| format!("Malformed registrations: {}", self.path.display()))
    }

    pub fn save(&self, set: &RegistrationSet) -> anyhow::Result<()> {
        let text = toml::to_string(set).context("Failed to serialize registrations")?;
        fs::write(&self.path, text)
            .with_context(|| format!("Failed to write registrations: {}", self.path.display()))
    }

    /// Load-modify-save one registration.
    pub fn record(&self, registration: AdapterRegistration) -> anyhow::Result<()> {
        let mut set = self.load()?;
        set.record(registration);
        self.save(&set)
    }
}
