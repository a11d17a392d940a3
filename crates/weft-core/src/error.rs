//! Typed error taxonomy for install, patch and dispatch failures.
//!
//! Orchestration code keeps `anyhow` for wrapped causes; these variants are
//! the stable, matchable outcomes callers and the CLI branch on.

use std::path::PathBuf;

use thiserror::Error;

use crate::ledger::InstalledRecord;

#[derive(Debug, Error)]
pub enum WeftError {
    /// The requested component id is not present in the catalog (or is not a
    /// well-formed component path).
    #[error("unknown component: {id}")]
    UnknownComponent { id: String },

    /// A structural prerequisite (owning singleton or product) has no
    /// installed record yet.
    #[error("cannot install {id}: prerequisite {missing} is not installed")]
    MissingPrerequisite { id: String, missing: String },

    /// An installed record already exists and `force` was not given. Carries
    /// the prior record for diagnostics.
    #[error("component {id} is already installed (since {})", .record.installed_at)]
    AlreadyInstalled {
        id: String,
        record: Box<InstalledRecord>,
    },

    /// The component's `check` phase reported an error; `execute` never ran.
    #[error("check failed for {id}: {cause}")]
    CheckFailed { id: String, cause: anyhow::Error },

    /// The component's `execute` phase reported an error.
    #[error("execution failed for {id}: {cause}")]
    ExecFailed { id: String, cause: anyhow::Error },

    /// A discovered unit declared no executable body.
    #[error("component {id} declares no execute capability")]
    MissingExecute { id: String },

    /// Patch target file does not exist or cannot be read.
    #[error("file missing or unreadable: {path}")]
    MissingFile { path: PathBuf },

    /// A patch bound did not match any line; the target was left untouched.
    #[error("marker {marker} not found in {path}")]
    MarkerNotFound { path: PathBuf, marker: String },

    /// Committing patched content failed; the target was restored from its
    /// backup where possible.
    #[error("failed to write {path}: {cause}")]
    WriteFailed { path: PathBuf, cause: anyhow::Error },

    /// Bad or missing command-line flag or component variable.
    #[error("command line error: {message}")]
    CommandLine { message: String },
}
