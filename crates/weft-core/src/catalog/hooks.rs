//! Component capability hooks.
//!
//! Each installable unit exposes up to three capabilities: `check`,
//! `execute` and `default_config`. They are modelled as closures rather
//! than an inheritance contract; `execute` is required at construction, so
//! a hook set without one cannot exist. A missing `check` is always-pass
//! and a missing `default_config` means no configuration is seeded.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::exec::CommandRunner;

/// Environment bound onto a component before its check/execute phases run:
/// parsed variable values, the subprocess runner, and any product/tool
/// configuration already present on the ledger.
pub struct ExecEnv<'a> {
    pub variables: BTreeMap<String, String>,
    pub runner: &'a dyn CommandRunner,
    pub product_config: Option<String>,
    pub tool_config: Option<String>,
}

impl<'a> ExecEnv<'a> {
    pub fn new(variables: BTreeMap<String, String>, runner: &'a dyn CommandRunner) -> Self {
        Self {
            variables,
            runner,
            product_config: None,
            tool_config: None,
        }
    }

    /// A bound variable value, or an error naming the missing variable.
    pub fn variable(&self, name: &str) -> anyhow::Result<&str> {
        self.variables
            .get(name)
            .map(String::as_str)
            .ok_or_else(|| anyhow::anyhow!("variable {name} is not bound"))
    }
}

type HookFn = Arc<dyn Fn(&ExecEnv<'_>) -> anyhow::Result<()> + Send + Sync>;
type DefaultConfigFn = Arc<dyn Fn() -> String + Send + Sync>;

/// The callable capabilities of one installable unit.
#[derive(Clone)]
pub struct ComponentHooks {
    check: Option<HookFn>,
    execute: HookFn,
    default_config: Option<DefaultConfigFn>,
}

impl ComponentHooks {
    /// Build hooks around the required execute capability.
    pub fn new(
        execute: impl Fn(&ExecEnv<'_>) -> anyhow::Result<()> + Send + Sync + 'static,
    ) -> Self {
        Self {
            check: None,
            execute: Arc::new(execute),
            default_config: None,
        }
    }

    pub fn with_check(
        mut self,
        check: impl Fn(&ExecEnv<'_>) -> anyhow::Result<()> + Send + Sync + 'static,
    ) -> Self {
        self.check = Some(Arc::new(check));
        self
    }

    pub fn with_default_config(
        mut self,
        default_config: impl Fn() -> String + Send + Sync + 'static,
    ) -> Self {
        self.default_config = Some(Arc::new(default_config));
        self
    }

    /// Run the check phase; absent means always-pass.
    pub fn check(&self, env: &ExecEnv<'_>) -> anyhow::Result<()> {
        match &self.check {
            Some(check) => check(env),
            None => Ok(()),
        }
    }

    /// Run the execute phase.
    pub fn execute(&self, env: &ExecEnv<'_>) -> anyhow::Result<()> {
        (self.execute)(env)
    }

    /// Default configuration content to seed on first install, if any.
    pub fn default_config(&self) -> Option<String> {
        self.default_config.as_ref().map(|f| f())
    }
}

impl fmt::Debug for ComponentHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentHooks")
            .field("check", &self.check.is_some())
            .field("default_config", &self.default_config.is_some())
            .finish()
    }
}
