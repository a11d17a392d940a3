//! Installation ledger: persisted install and configuration records.
//!
//! One TOML record file per installed component under
//! `InstalledComponents/`, one user-editable text file per configured
//! component under `Config/`, both named by a filesystem-safe transform of
//! the component id. Last-write-wins; no multi-key transactions, each
//! component's install is independent.

pub mod types;

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;

use crate::types::ComponentId;

pub use types::{ConfigSeedOutcome, InstalledRecord};

/// Directory holding one install record per component.
pub const RECORDS_DIR: &str = "InstalledComponents";
/// Directory holding one configuration record per component.
pub const CONFIG_DIR: &str = "Config";

#[derive(Debug, Clone)]
pub struct Ledger {
    records_dir: PathBuf,
    config_dir: PathBuf,
}

impl Ledger {
    /// Open (creating if needed) the ledger under a state directory.
    pub fn open(state_dir: &Path) -> anyhow::Result<Self> {
        let records_dir = state_dir.join(RECORDS_DIR);
        let config_dir = state_dir.join(CONFIG_DIR);
        for dir in [&records_dir, &config_dir] {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create ledger directory: {}", dir.display()))?;
        }
        Ok(Self {
            records_dir,
            config_dir,
        })
    }

    pub fn records_dir(&self) -> &Path {
        &self.records_dir
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    fn record_path(&self, id: &ComponentId) -> PathBuf {
        self.records_dir.join(format!("{}.toml", id.file_stem()))
    }

    fn config_path(&self, id: &ComponentId) -> PathBuf {
        self.config_dir.join(format!("{}.conf", id.file_stem()))
    }

    /// Fetch the install record for a component, if any.
    pub fn get(&self, id: &ComponentId) -> anyhow::Result<Option<InstalledRecord>> {
        let path = self.record_path(id);
        if !path.exists() {
            return Ok(None);
        }
        let text = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read install record: {}", path.display()))?;
        let record = toml::from_str(&text)
            .with_context(|| format!("Malformed install record: {}", path.display()))?;
        Ok(Some(record))
    }

    /// Write (or replace wholesale) the install record for a component.
    pub fn put(&self, id: &ComponentId, record: &InstalledRecord) -> anyhow::Result<()> {
        let path = self.record_path(id);
        let text = toml::to_string(record).context("Failed to serialize install record")?;
        fs::write(&path, text)
            .with_context(|| format!("Failed to write install record: {}", path.display()))
    }

    /// Remove the install record for a component. Returns the prior record.
    pub fn remove(&self, id: &ComponentId) -> anyhow::Result<Option<InstalledRecord>> {
        let prior = self.get(id)?;
        if prior.is_some() {
            let path = self.record_path(id);
            fs::remove_file(&path)
                .with_context(|| format!("Failed to remove install record: {}", path.display()))?;
        }
        Ok(prior)
    }

    /// All install records, ordered by component id.
    pub fn list(&self) -> anyhow::Result<Vec<InstalledRecord>> {
        let mut records = Vec::new();
        for entry in fs::read_dir(&self.records_dir)
            .with_context(|| format!("Failed to list ledger: {}", self.records_dir.display()))?
        {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("toml") {
                continue;
            }
            let text = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read install record: {}", path.display()))?;
            let record: InstalledRecord = toml::from_str(&text)
                .with_context(|| format!("Malformed install record: {}", path.display()))?;
            records.push(record);
        }
        records.sort_by(|a, b| a.component_id.cmp(&b.component_id));
        Ok(records)
    }

    /// Fetch the user-editable configuration record for a component.
    pub fn get_config(&self, id: &ComponentId) -> anyhow::Result<Option<String>> {
        let path = self.config_path(id);
        if !path.exists() {
            return Ok(None);
        }
        let text = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read configuration: {}", path.display()))?;
        Ok(Some(text))
    }

    /// Seed a configuration record unless one already exists.
    ///
    /// This is what protects hand-edited configuration: once a record is on
    /// disk, reinstalls (forced or not) never touch it.
    pub fn put_config_if_absent(
        &self,
        id: &ComponentId,
        default_content: &str,
    ) -> anyhow::Result<ConfigSeedOutcome> {
        let path = self.config_path(id);
        if path.exists() {
            return Ok(ConfigSeedOutcome::AlreadyPresent);
        }
        fs::write(&path, default_content)
            .with_context(|| format!("Failed to seed configuration: {}", path.display()))?;
        Ok(ConfigSeedOutcome::Seeded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn ledger() -> (TempDir, Ledger) {
        let dir = TempDir::new().unwrap();
        let ledger = Ledger::open(dir.path()).unwrap();
        (dir, ledger)
    }

    #[test]
    fn test_get_put_roundtrip() {
        let (_dir, ledger) = ledger();
        let id: ComponentId = "Slave/Client".parse().unwrap();

        assert!(ledger.get(&id).unwrap().is_none());

        let record = InstalledRecord::new(id.clone(), vec!["--dir".into(), "/tmp".into()]);
        ledger.put(&id, &record).unwrap();

        let fetched = ledger.get(&id).unwrap().unwrap();
        assert_eq!(fetched, record);
    }

    #[test]
    fn test_put_replaces_wholesale() {
        let (_dir, ledger) = ledger();
        let id: ComponentId = "Slave/Client".parse().unwrap();

        ledger
            .put(&id, &InstalledRecord::new(id.clone(), vec!["old".into()]))
            .unwrap();
        ledger
            .put(&id, &InstalledRecord::new(id.clone(), vec!["new".into()]))
            .unwrap();

        let fetched = ledger.get(&id).unwrap().unwrap();
        assert_eq!(fetched.parameters, vec!["new".to_string()]);
    }

    #[test]
    fn test_config_seed_protects_hand_edits() {
        let (_dir, ledger) = ledger();
        let id: ComponentId = "Slave/Products/Trac".parse().unwrap();

        let outcome = ledger.put_config_if_absent(&id, "key = default\n").unwrap();
        assert_eq!(outcome, ConfigSeedOutcome::Seeded);

        // Hand edit, then reseed: the edit must survive.
        let path = ledger.config_dir().join(format!("{}.conf", id.file_stem()));
        fs::write(&path, "key = edited\n").unwrap();

        let outcome = ledger.put_config_if_absent(&id, "key = default\n").unwrap();
        assert_eq!(outcome, ConfigSeedOutcome::AlreadyPresent);
        assert_eq!(ledger.get_config(&id).unwrap().unwrap(), "key = edited\n");
    }

    #[test]
    fn test_list_is_ordered_by_id() {
        let (_dir, ledger) = ledger();
        for id in ["Slave/Client", "Master/Server", "Slave/Products/Trac"] {
            let id: ComponentId = id.parse().unwrap();
            ledger
                .put(&id, &InstalledRecord::new(id.clone(), Vec::new()))
                .unwrap();
        }

        let listed: Vec<String> = ledger
            .list()
            .unwrap()
            .into_iter()
            .map(|r| r.component_id.to_string())
            .collect();
        assert_eq!(
            listed,
            vec!["Master/Server", "Slave/Client", "Slave/Products/Trac"]
        );
    }

    #[test]
    fn test_remove_returns_prior_record() {
        let (_dir, ledger) = ledger();
        let id: ComponentId = "Master/Server".parse().unwrap();
        ledger
            .put(&id, &InstalledRecord::new(id.clone(), Vec::new()))
            .unwrap();

        let removed = ledger.remove(&id).unwrap();
        assert!(removed.is_some());
        assert!(ledger.get(&id).unwrap().is_none());
        assert!(ledger.remove(&id).unwrap().is_none());
    }
}
