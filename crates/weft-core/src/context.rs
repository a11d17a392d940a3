//! Installation context for dependency injection.
//!
//! One value threaded through installer and router calls instead of
//! ambient globals: the ledger, the registration store, the subprocess
//! runner and the debug flag all live here.

use std::fmt;
use std::path::{Path, PathBuf};

use crate::dispatch::RegistrationStore;
use crate::exec::{CommandRunner, SystemRunner};
use crate::ledger::Ledger;

pub struct InstallContext {
    state_dir: PathBuf,
    ledger: Ledger,
    registrations: RegistrationStore,
    runner: Box<dyn CommandRunner>,
    debug: bool,
}

impl InstallContext {
    /// Open a context rooted at an explicit state directory.
    pub fn new(state_dir: PathBuf) -> anyhow::Result<Self> {
        Self::with_runner(state_dir, Box::new(SystemRunner))
    }

    /// Open a context with a custom command runner (for testing).
    pub fn with_runner(
        state_dir: PathBuf,
        runner: Box<dyn CommandRunner>,
    ) -> anyhow::Result<Self> {
        let ledger = Ledger::open(&state_dir)?;
        let registrations = RegistrationStore::open(&state_dir);
        Ok(Self {
            state_dir,
            ledger,
            registrations,
            runner,
            debug: false,
        })
    }

    /// Default state directory: platform data dir, falling back to the
    /// current directory for stripped-down hosts.
    pub fn default_state_dir() -> PathBuf {
        dirs::data_dir()
            .map(|p| p.join("weft"))
            .unwrap_or_else(|| PathBuf::from(".weft"))
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn state_dir(&self) -> &Path {
        &self.state_dir
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn registrations(&self) -> &RegistrationStore {
        &self.registrations
    }

    pub fn runner(&self) -> &dyn CommandRunner {
        self.runner.as_ref()
    }

    pub fn debug(&self) -> bool {
        self.debug
    }
}

impl fmt::Debug for InstallContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InstallContext")
            .field("state_dir", &self.state_dir)
            .field("debug", &self.debug)
            .finish()
    }
}
