//! Per-tab durable storage for the pending launch nonce
//!
//! The nonce has to survive navigating away to the app and back, possibly
//! across a full page reload, so the engine only talks to a [`NonceStore`].

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::{Deserialize, Serialize};

use qrlaunch_core::prelude::*;

/// Default storage key for the pending nonce
pub const DEFAULT_NONCE_KEY: &str = "bankid_nonce";

const NONCE_LEN: usize = 22;

/// Generate a fresh random launch nonce.
pub fn generate_nonce() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(NONCE_LEN)
        .map(char::from)
        .collect()
}

/// String key/value storage scoped to one browsing tab
pub trait NonceStore: Send {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: &str) -> Result<()>;
    fn remove(&mut self, key: &str) -> Result<()>;
}

/// In-process store; lost when the process exits
#[derive(Debug, Default, Clone)]
pub struct MemoryNonceStore {
    entries: HashMap<String, String>,
}

impl MemoryNonceStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl NonceStore for MemoryNonceStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        self.entries.remove(key);
        Ok(())
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct TabEntries {
    #[serde(default)]
    entries: HashMap<String, String>,
}

/// JSON-file store, one file per tab id under `<dir>/tabs/`
///
/// Entries are re-read on every `get` so a second process working on the same
/// tab (a reload) sees the latest value.
#[derive(Debug, Clone)]
pub struct FileNonceStore {
    path: PathBuf,
}

impl FileNonceStore {
    pub fn new(dir: &Path, tab_id: &str) -> Result<Self> {
        if tab_id.is_empty()
            || !tab_id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(Error::storage(format!("invalid tab id '{tab_id}'")));
        }
        let tabs = dir.join("tabs");
        std::fs::create_dir_all(&tabs)?;
        Ok(Self {
            path: tabs.join(format!("{tab_id}.json")),
        })
    }

    /// `<data_local_dir>/qrlaunch/storage`, or `.qrlaunch/storage` when the
    /// platform has no data directory.
    pub fn default_dir() -> PathBuf {
        dirs::data_local_dir()
            .map(|d| d.join("qrlaunch").join("storage"))
            .unwrap_or_else(|| PathBuf::from(".qrlaunch").join("storage"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<TabEntries> {
        if !self.path.exists() {
            return Ok(TabEntries::default());
        }
        let content = std::fs::read_to_string(&self.path)?;
        serde_json::from_str(&content).map_err(|e| {
            Error::storage(format!("corrupt tab storage {}: {e}", self.path.display()))
        })
    }

    fn save(&self, tab: &TabEntries) -> Result<()> {
        let content = serde_json::to_string_pretty(tab)?;
        std::fs::write(&self.path, content)?;
        Ok(())
    }
}

impl NonceStore for FileNonceStore {
    fn get(&self, key: &str) -> Option<String> {
        match self.load() {
            Ok(mut tab) => tab.entries.remove(key),
            Err(e) => {
                warn!("Failed to read nonce storage: {}", e);
                None
            }
        }
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let mut tab = self.load().unwrap_or_default();
        tab.entries.insert(key.to_string(), value.to_string());
        self.save(&tab)
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        let mut tab = self.load().unwrap_or_default();
        if tab.entries.remove(key).is_some() {
            self.save(&tab)?;
        }
        Ok(())
    }
}
