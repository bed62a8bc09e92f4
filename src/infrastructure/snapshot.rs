//! Recorded workspace snapshot.
//!
//! A JSON capture of what a language server reported for a workspace:
//! per-file outlines plus call-hierarchy and implementation answers keyed by
//! the queried location. Loading validates every outline, so the graph
//! builder only ever sees well-formed trees.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::domain::language::Language;
use crate::domain::location::{CallHierarchyItem, SymbolLocation};
use crate::domain::symbol::{validate_outline, Position, Symbol};
use crate::ports::SymbolSource;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceSnapshot {
    pub root: String,
    #[serde(default)]
    pub language: Option<String>,
    pub files: Vec<FileSnapshot>,
    #[serde(default)]
    pub incoming_calls: Vec<CallsSnapshot>,
    #[serde(default)]
    pub outgoing_calls: Vec<CallsSnapshot>,
    #[serde(default)]
    pub implementations: Vec<ImplementationsSnapshot>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileSnapshot {
    pub path: String,
    #[serde(default)]
    pub symbols: Vec<Symbol>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallsSnapshot {
    pub path: String,
    pub position: Position,
    pub items: Vec<CallHierarchyItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImplementationsSnapshot {
    pub path: String,
    pub position: Position,
    pub locations: Vec<SymbolLocation>,
}

/// [`SymbolSource`] answering from a loaded snapshot.
#[derive(Debug, Default)]
pub struct SnapshotSource {
    root: String,
    language: Option<Language>,
    files: Vec<String>,
    symbols: HashMap<String, Vec<Symbol>>,
    incoming: HashMap<SymbolLocation, Vec<CallHierarchyItem>>,
    outgoing: HashMap<SymbolLocation, Vec<CallHierarchyItem>>,
    implementations: HashMap<SymbolLocation, Vec<SymbolLocation>>,
}

impl SnapshotSource {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read snapshot {}", path.display()))?;
        let snapshot: WorkspaceSnapshot = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse snapshot {}", path.display()))?;
        let source = Self::from_snapshot(snapshot)
            .with_context(|| format!("Invalid snapshot {}", path.display()))?;
        info!(
            path = %path.display(),
            files = source.files.len(),
            "loaded workspace snapshot"
        );
        Ok(source)
    }

    pub fn from_snapshot(snapshot: WorkspaceSnapshot) -> Result<Self> {
        let language = match snapshot.language.as_deref() {
            Some(name) => {
                let lang = Language::from_name(name);
                if lang.is_none() {
                    warn!(language = name, "unknown language in snapshot, using default policy");
                }
                lang
            }
            None => None,
        };

        let mut source = SnapshotSource {
            root: snapshot.root,
            language,
            ..Self::default()
        };

        for file in snapshot.files {
            validate_outline(&file.symbols)
                .with_context(|| format!("Malformed outline for {}", file.path))?;
            if source.symbols.contains_key(&file.path) {
                bail!("Duplicate file in snapshot: {}", file.path);
            }
            source.files.push(file.path.clone());
            source.symbols.insert(file.path, file.symbols);
        }

        for calls in snapshot.incoming_calls {
            source
                .incoming
                .insert(SymbolLocation::new(calls.path, calls.position), calls.items);
        }
        for calls in snapshot.outgoing_calls {
            source
                .outgoing
                .insert(SymbolLocation::new(calls.path, calls.position), calls.items);
        }
        for entry in snapshot.implementations {
            source
                .implementations
                .insert(SymbolLocation::new(entry.path, entry.position), entry.locations);
        }

        Ok(source)
    }

    pub fn root(&self) -> &str {
        &self.root
    }

    /// Language named by the snapshot, if it names a known one.
    pub fn language(&self) -> Option<Language> {
        self.language
    }
}

impl SymbolSource for SnapshotSource {
    fn files(&self) -> Vec<String> {
        self.files.clone()
    }

    fn list_symbols(&self, path: &str) -> Result<Vec<Symbol>> {
        match self.symbols.get(path) {
            Some(symbols) => Ok(symbols.clone()),
            None => bail!("File not in snapshot: {}", path),
        }
    }

    fn incoming_calls(&self, path: &str, position: Position) -> Result<Vec<CallHierarchyItem>> {
        let key = SymbolLocation::new(path, position);
        Ok(self.incoming.get(&key).cloned().unwrap_or_default())
    }

    fn outgoing_calls(&self, path: &str, position: Position) -> Result<Vec<CallHierarchyItem>> {
        let key = SymbolLocation::new(path, position);
        Ok(self.outgoing.get(&key).cloned().unwrap_or_default())
    }

    fn implementations(&self, path: &str, position: Position) -> Result<Vec<SymbolLocation>> {
        let key = SymbolLocation::new(path, position);
        Ok(self.implementations.get(&key).cloned().unwrap_or_default())
    }
}
