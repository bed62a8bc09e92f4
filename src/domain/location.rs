//! Relation keys and their resolution to renderable cells.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::domain::symbol::{Position, Range, SymbolKind};

/// Sequential, 1-based id of a registered file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileId(pub u32);

impl FileId {
    /// Position of the file in registration order.
    pub fn index(self) -> usize {
        (self.0 - 1) as usize
    }
}

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A source location as reported by the discovery side: `path` plus the
/// start of a symbol's selection range.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SymbolLocation {
    pub path: String,
    pub position: Position,
}

impl SymbolLocation {
    pub fn new(path: impl Into<String>, position: Position) -> Self {
        Self {
            path: path.into(),
            position,
        }
    }
}

impl fmt::Display for SymbolLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.path, self.position.line, self.position.character)
    }
}

/// Parses `path:line:column`. The path itself may contain colons.
impl FromStr for SymbolLocation {
    type Err = ParseIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || ParseIdError::Location(s.to_string());
        let mut parts = s.rsplitn(3, ':');
        let column = parts.next().and_then(|c| c.parse().ok()).ok_or_else(malformed)?;
        let line = parts.next().and_then(|l| l.parse().ok()).ok_or_else(malformed)?;
        let path = parts.next().filter(|p| !p.is_empty()).ok_or_else(malformed)?;
        Ok(SymbolLocation::new(path, Position::new(line, column)))
    }
}

/// Renderable node identity: `(file id, line, column)` of a selection start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CellId {
    pub file_id: FileId,
    pub line: u32,
    pub column: u32,
}

impl CellId {
    pub fn new(file_id: FileId, position: Position) -> Self {
        Self {
            file_id,
            line: position.line,
            column: position.character,
        }
    }

    pub fn position(&self) -> Position {
        Position::new(self.line, self.column)
    }

    /// Port name inside the file's table, `line_column`.
    pub fn port(&self) -> String {
        format!("{}_{}", self.line, self.column)
    }
}

/// `fileId:line_column`, the anchor used in rendered output and lookups.
impl fmt::Display for CellId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}_{}", self.file_id, self.line, self.column)
    }
}

impl FromStr for CellId {
    type Err = ParseIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || ParseIdError::CellId(s.to_string());
        let (file, port) = s.split_once(':').ok_or_else(malformed)?;
        let (line, column) = port.split_once('_').ok_or_else(malformed)?;
        let file_id = file.parse::<u32>().ok().filter(|&id| id > 0).ok_or_else(malformed)?;
        Ok(CellId {
            file_id: FileId(file_id),
            line: line.parse().map_err(|_| malformed())?,
            column: column.parse().map_err(|_| malformed())?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseIdError {
    #[error("malformed cell id `{0}`, expected fileId:line_column")]
    CellId(String),
    #[error("malformed location `{0}`, expected path:line:column")]
    Location(String),
}

/// The other endpoint of a call-hierarchy fact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallHierarchyItem {
    pub name: String,
    pub kind: SymbolKind,
    pub path: String,
    pub range: Range,
    pub selection_range: Range,
}

impl CallHierarchyItem {
    pub fn location(&self) -> SymbolLocation {
        SymbolLocation::new(self.path.clone(), self.selection_range.start)
    }
}

/// Path → file id registry. Ids are handed out in registration order.
#[derive(Debug, Clone, Default)]
pub struct LocationIndex {
    ids: HashMap<String, FileId>,
}

impl LocationIndex {
    /// Assign the next id, or `None` if the path is already known.
    pub fn register(&mut self, path: &str) -> Option<FileId> {
        if self.ids.contains_key(path) {
            return None;
        }
        let id = FileId(self.ids.len() as u32 + 1);
        self.ids.insert(path.to_string(), id);
        Some(id)
    }

    pub fn file_id(&self, path: &str) -> Option<FileId> {
        self.ids.get(path).copied()
    }

    pub fn resolve(&self, location: &SymbolLocation) -> Option<CellId> {
        self.file_id(&location.path)
            .map(|file_id| CellId::new(file_id, location.position))
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}
