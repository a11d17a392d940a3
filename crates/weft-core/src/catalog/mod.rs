//! Component catalog: discovery of installable units.
//!
//! Discovery is a lookup over one or more [`DiscoverySource`] collaborators
//! keyed by the hierarchical component naming convention
//! (`Slave/Adapters/<Product>/<Tool>/<Action>` for adapter actions,
//! `Master/Server` / `Slave/Client` for singletons). Descriptors are
//! rebuilt on every pass and never persisted.

pub mod flags;
pub mod hooks;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::types::ComponentId;

pub use flags::{FlagSpec, VariableOption, compile_command, parse_variables};
pub use hooks::{ComponentHooks, ExecEnv};

/// Declared metadata of one installable unit. Ephemeral: constructed fresh
/// on every discovery pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentDescriptor {
    pub id: ComponentId,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub author: String,
    /// Variables the check/execute phases require, in declaration order.
    #[serde(default)]
    pub variable_options: Vec<VariableOption>,
}

impl ComponentDescriptor {
    pub fn new(id: ComponentId) -> Self {
        Self {
            id,
            description: String::new(),
            author: String::new(),
            variable_options: Vec::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = author.into();
        self
    }

    pub fn with_variable(mut self, option: VariableOption) -> Self {
        self.variable_options.push(option);
        self
    }
}

/// One unit yielded by a discovery source: declared metadata plus its
/// callable capabilities. `hooks` is `None` when the source found a unit
/// with no executable body; installing such a unit is a fatal error, but
/// discovery itself tolerates it so listings stay complete.
#[derive(Debug, Clone)]
pub struct DiscoveredComponent {
    pub descriptor: ComponentDescriptor,
    pub hooks: Option<ComponentHooks>,
}

impl DiscoveredComponent {
    pub fn new(descriptor: ComponentDescriptor, hooks: ComponentHooks) -> Self {
        Self {
            descriptor,
            hooks: Some(hooks),
        }
    }

    /// A unit that declared metadata but no execute capability.
    pub fn without_execute(descriptor: ComponentDescriptor) -> Self {
        Self {
            descriptor,
            hooks: None,
        }
    }
}

/// External collaborator yielding installable units. The core depends only
/// on this shape, not on any particular storage mechanism.
pub trait DiscoverySource: Send + Sync {
    fn discover(&self) -> anyhow::Result<Vec<DiscoveredComponent>>;
}

/// In-memory discovery source; backs the built-in component set and tests.
#[derive(Debug, Default)]
pub struct StaticSource {
    components: Vec<DiscoveredComponent>,
}

impl StaticSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(mut self, component: DiscoveredComponent) -> Self {
        self.components.push(component);
        self
    }
}

impl DiscoverySource for StaticSource {
    fn discover(&self) -> anyhow::Result<Vec<DiscoveredComponent>> {
        Ok(self.components.clone())
    }
}

/// The discovered component set for one installation run.
#[derive(Debug, Default)]
pub struct Catalog {
    entries: BTreeMap<ComponentId, DiscoveredComponent>,
}

impl Catalog {
    /// Run a discovery pass over the given sources.
    ///
    /// A component id appearing twice (within or across sources) violates
    /// the uniqueness invariant and fails the whole pass.
    pub fn discover(sources: &[Box<dyn DiscoverySource>]) -> anyhow::Result<Self> {
        let mut entries = BTreeMap::new();
        for source in sources {
            for component in source.discover()? {
                let id = component.descriptor.id.clone();
                if entries.contains_key(&id) {
                    anyhow::bail!("duplicate component id discovered: {id}");
                }
                entries.insert(id, component);
            }
        }
        Ok(Self { entries })
    }

    pub fn get(&self, id: &ComponentId) -> Option<&DiscoveredComponent> {
        self.entries.get(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ComponentId, &DiscoveredComponent)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
