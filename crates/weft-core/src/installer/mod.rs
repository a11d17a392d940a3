//! Install orchestration for one component.
//!
//! A single install invocation walks
//! `Discovered → Resolved → DependencyChecked → Checked → Executed →
//! Registered`, terminating early with a typed [`WeftError`]. A failed
//! install writes no record, so it is always safely re-attemptable.

use tracing::debug;

use crate::catalog::{Catalog, ExecEnv, parse_variables};
use crate::context::InstallContext;
use crate::dispatch::AdapterRegistration;
use crate::error::WeftError;
use crate::ledger::{ConfigSeedOutcome, InstalledRecord};
use crate::types::{ComponentId, ComponentKind};

/// Phases of one install invocation, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallPhase {
    Discovered,
    Resolved,
    DependencyChecked,
    Checked,
    Executed,
    Registered,
}

/// Options for one install invocation.
#[derive(Debug, Clone)]
pub struct InstallOptions {
    pub component: ComponentId,
    /// Re-enter installation even when a record already exists. The record
    /// is replaced wholesale; configuration is preserved.
    pub force: bool,
    /// Component-specific arguments (everything after `--`), parsed against
    /// the component's declared flag set.
    pub component_args: Vec<String>,
}

impl InstallOptions {
    pub fn new(component: ComponentId) -> Self {
        Self {
            component,
            force: false,
            component_args: Vec::new(),
        }
    }

    pub fn with_force(mut self) -> Self {
        self.force = true;
        self
    }

    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.component_args = args;
        self
    }
}

/// Outcome of a successful install.
#[derive(Debug, Clone)]
pub struct InstallReport {
    pub record: InstalledRecord,
    /// How configuration seeding went, when the component declares defaults.
    pub config: Option<ConfigSeedOutcome>,
    /// Whether an adapter registration was recorded.
    pub adapter_registered: bool,
}

/// Orchestrates check→execute→register for one component at a time.
#[derive(Debug)]
pub struct Installer<'a> {
    catalog: &'a Catalog,
    ctx: &'a InstallContext,
}

impl<'a> Installer<'a> {
    pub fn new(catalog: &'a Catalog, ctx: &'a InstallContext) -> Self {
        Self { catalog, ctx }
    }

    /// Run one install invocation to its terminal state.
    ///
    /// Typed failures ([`WeftError`]) are returned through `anyhow` with the
    /// underlying cause preserved; callers may downcast for the taxonomy.
    pub fn install(&self, options: &InstallOptions) -> anyhow::Result<InstallReport> {
        let id = &options.component;
        let ledger = self.ctx.ledger();
        debug!(component = %id, phase = ?InstallPhase::Discovered, "install requested");

        // Discovered → Resolved
        let entry = self
            .catalog
            .get(id)
            .ok_or_else(|| WeftError::UnknownComponent { id: id.to_string() })?;
        let kind = ComponentKind::classify(id)?;
        debug!(component = %id, phase = ?InstallPhase::Resolved, "component resolved");

        // Resolved → DependencyChecked
        for prerequisite in kind.prerequisites() {
            if ledger.get(&prerequisite)?.is_none() {
                return Err(WeftError::MissingPrerequisite {
                    id: id.to_string(),
                    missing: prerequisite.to_string(),
                }
                .into());
            }
        }
        debug!(component = %id, phase = ?InstallPhase::DependencyChecked, "prerequisites present");

        // DependencyChecked → Checked
        if !options.force {
            if let Some(prior) = ledger.get(id)? {
                return Err(WeftError::AlreadyInstalled {
                    id: id.to_string(),
                    record: Box::new(prior),
                }
                .into());
            }
        }

        let hooks = entry
            .hooks
            .as_ref()
            .ok_or_else(|| WeftError::MissingExecute { id: id.to_string() })?;

        let variables = parse_variables(
            &id.to_string(),
            &entry.descriptor.variable_options,
            &options.component_args,
        )?;
        let mut env = ExecEnv::new(variables, self.ctx.runner());
        self.bind_context_configs(&kind, &mut env)?;

        hooks.check(&env).map_err(|cause| WeftError::CheckFailed {
            id: id.to_string(),
            cause,
        })?;
        debug!(component = %id, phase = ?InstallPhase::Checked, "check passed");

        // Checked → Executed
        hooks
            .execute(&env)
            .map_err(|cause| WeftError::ExecFailed {
                id: id.to_string(),
                cause,
            })?;
        debug!(component = %id, phase = ?InstallPhase::Executed, "execute succeeded");

        // Executed → Registered
        let mut record = InstalledRecord::new(id.clone(), options.component_args.clone());
        if let ComponentKind::Product { side, product } = &kind {
            record = record.with_product(product.clone(), *side);
        }
        ledger.put(id, &record)?;

        let config = match hooks.default_config() {
            Some(default) => Some(ledger.put_config_if_absent(id, &default)?),
            None => None,
        };

        let adapter_registered = self.register_adapter(&kind)?;
        debug!(component = %id, phase = ?InstallPhase::Registered, "install registered");

        Ok(InstallReport {
            record,
            config,
            adapter_registered,
        })
    }

    /// Bind product/tool configuration already on the ledger into the hook
    /// environment.
    fn bind_context_configs(
        &self,
        kind: &ComponentKind,
        env: &mut ExecEnv<'_>,
    ) -> anyhow::Result<()> {
        let ledger = self.ctx.ledger();
        match kind {
            ComponentKind::AdapterTool { product, .. } => {
                let product_id = ComponentId::new("Slave/Products", product.as_str());
                env.product_config = ledger.get_config(&product_id)?;
            }
            ComponentKind::AdapterAction { product, tool, .. } => {
                let product_id = ComponentId::new("Slave/Products", product.as_str());
                env.product_config = ledger.get_config(&product_id)?;
                let tool_id =
                    ComponentId::new(format!("Slave/Adapters/{product}"), tool.to_string());
                env.tool_config = ledger.get_config(&tool_id)?;
            }
            _ => {}
        }
        Ok(())
    }

    /// For adapter actions, record the dispatchable `(product, tool, action)`
    /// triple with the owning product's install parameters prepended at
    /// invocation time.
    fn register_adapter(&self, kind: &ComponentKind) -> anyhow::Result<bool> {
        let ComponentKind::AdapterAction {
            product,
            tool,
            action,
        } = kind
        else {
            return Ok(false);
        };

        let product_component = ComponentId::new("Slave/Products", product.as_str());
        let product_parameters = self
            .ctx
            .ledger()
            .get(&product_component)?
            .map(|r| r.parameters)
            .unwrap_or_default();

        self.ctx.registrations().record(
            AdapterRegistration::new(product.clone(), *tool, action.clone())
                .with_product_parameters(product_parameters),
        )?;
        Ok(true)
    }
}
