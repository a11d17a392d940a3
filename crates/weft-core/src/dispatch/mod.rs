//! Slave-side action dispatch: envelopes, adapter registrations and the
//! router that binds them together.

pub mod registry;
pub mod router;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::types::{ActionId, ProductId, ToolId};

pub use registry::{AdapterRegistration, RegistrationSet, RegistrationStore};
pub use router::{DispatchFailure, DispatchReport, Router, SkippedAction};

/// One unit of dispatchable work: a verb addressed to a tool category,
/// with position-significant opaque parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionEnvelope {
    pub tool: ToolId,
    pub action: ActionId,
    #[serde(default)]
    pub parameters: Vec<String>,
}

impl ActionEnvelope {
    pub fn new(tool: ToolId, action: ActionId, parameters: Vec<String>) -> Self {
        Self {
            tool,
            action,
            parameters,
        }
    }
}

/// An immutable batch of envelopes grouped by tool, built once per
/// Master-side invocation and handed to transport as-is.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActionBatch {
    by_tool: BTreeMap<ToolId, Vec<ActionEnvelope>>,
}

impl ActionBatch {
    pub(crate) fn from_groups(by_tool: BTreeMap<ToolId, Vec<ActionEnvelope>>) -> Self {
        Self { by_tool }
    }

    pub fn groups(&self) -> impl Iterator<Item = (&ToolId, &[ActionEnvelope])> {
        self.by_tool.iter().map(|(tool, envs)| (tool, envs.as_slice()))
    }

    pub fn envelopes_for(&self, tool: &ToolId) -> &[ActionEnvelope] {
        self.by_tool.get(tool).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Total number of envelopes across all tools.
    pub fn len(&self) -> usize {
        self.by_tool.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.by_tool.is_empty()
    }
}

/// Arguments handed to one adapter invocation. Ordering is load-bearing:
/// product-level parameters first, then the envelope's action parameters.
#[derive(Debug)]
pub struct AdapterInvocation<'a> {
    pub user_id: &'a str,
    pub arguments: &'a [String],
}

/// Concrete Slave-side implementation translating an action into
/// product-specific effects.
pub trait Adapter: Send + Sync {
    fn apply(&self, invocation: &AdapterInvocation<'_>) -> anyhow::Result<()>;
}

/// Maps a recorded registration to its loadable implementation.
pub trait AdapterResolver: Send + Sync {
    fn resolve(&self, registration: &AdapterRegistration) -> Option<&dyn Adapter>;
}

/// In-memory resolver keyed by the registration triple; backs the built-in
/// adapter set and tests.
#[derive(Default)]
pub struct StaticResolver {
    adapters: BTreeMap<(ProductId, ToolId, ActionId), Box<dyn Adapter>>,
}

impl StaticResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        mut self,
        product: ProductId,
        tool: ToolId,
        action: ActionId,
        adapter: Box<dyn Adapter>,
    ) -> Self {
        self.adapters.insert((product, tool, action), adapter);
        self
    }
}

impl AdapterResolver for StaticResolver {
    fn resolve(&self, registration: &AdapterRegistration) -> Option<&dyn Adapter> {
        self.adapters
            .get(&(
                registration.product.clone(),
                registration.tool,
                registration.action.clone(),
            ))
            .map(Box::as_ref)
    }
}
