//! Weft Core Library
//!
//! Domain logic for installing adapter components onto independently hosted
//! products and routing abstract lifecycle actions from a coordinating
//! Master host to the adapters installed on per-product Slave hosts.

pub mod catalog;
pub mod context;
pub mod dispatch;
pub mod error;
pub mod exec;
pub mod installer;
pub mod ledger;
pub mod patch;
pub mod transport;
pub mod types;

/// Re-exports of commonly used types
pub mod prelude {
    // Identifiers
    pub use crate::types::{ActionId, ComponentId, ComponentKind, HostSide, ProductId, ToolId};

    // Errors
    pub use crate::error::WeftError;

    // Catalog
    pub use crate::catalog::{
        Catalog, ComponentDescriptor, ComponentHooks, DiscoveredComponent, DiscoverySource,
        ExecEnv, FlagSpec, StaticSource, VariableOption,
    };

    // Ledger
    pub use crate::ledger::{ConfigSeedOutcome, InstalledRecord, Ledger};

    // Install
    pub use crate::context::InstallContext;
    pub use crate::installer::{InstallOptions, InstallReport, Installer};

    // Dispatch
    pub use crate::dispatch::{
        ActionBatch, ActionEnvelope, Adapter, AdapterInvocation, AdapterRegistration,
        AdapterResolver, DispatchReport, RegistrationSet, RegistrationStore, Router,
        StaticResolver,
    };
    pub use crate::transport::BatchBuilder;

    // Patch engine
    pub use crate::patch::{
        CheckItem, CheckSpec, MatchMode, PatchMode, PatchOptions, PatchOutcome, patch,
    };

    // Subprocess boundary
    pub use crate::exec::{CommandRunner, ExecOutput, SystemRunner};
}
