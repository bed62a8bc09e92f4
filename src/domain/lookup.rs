//! Reverse navigation: rendered anchor → source location.

use serde::Serialize;
use std::collections::BTreeMap;

use crate::domain::location::CellId;
use crate::domain::symbol::{FileOutline, Range};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LookupEntry {
    pub path: String,
    pub name: String,
    pub selection_range: Range,
}

/// Keyed by the same `fileId:line_column` anchors the renderer emits.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct SymbolLookup {
    entries: BTreeMap<String, LookupEntry>,
}

impl SymbolLookup {
    /// Built from the same outlines the document was built from, so inserted
    /// symbols are navigable too.
    pub fn from_files(files: &[FileOutline]) -> Self {
        let mut entries = BTreeMap::new();
        for file in files {
            for (_, id) in file.symbols.walk() {
                let node = file.symbols.node(id);
                let anchor = CellId::new(file.id, node.selection_range.start);
                entries.entry(anchor.to_string()).or_insert_with(|| LookupEntry {
                    path: file.path.clone(),
                    name: node.name.clone(),
                    selection_range: node.selection_range,
                });
            }
        }
        Self { entries }
    }

    pub fn get(&self, anchor: &str) -> Option<&LookupEntry> {
        self.entries.get(anchor)
    }

    pub fn get_cell(&self, cell: &CellId) -> Option<&LookupEntry> {
        self.entries.get(&cell.to_string())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &LookupEntry)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::location::FileId;
    use crate::domain::symbol::{Position, Symbol, SymbolKind, SymbolTree};

    #[test]
    fn test_anchor_resolves_to_source() {
        let main = Symbol::new(
            "main",
            SymbolKind::Function,
            Range::from_coords(2, 0, 6, 1),
            Range::from_coords(2, 5, 2, 9),
        );
        let files = vec![FileOutline {
            id: FileId(7),
            path: "/ws/cmd/main.go".into(),
            symbols: SymbolTree::from_symbols(vec![main]),
        }];
        let lookup = SymbolLookup::from_files(&files);

        let entry = lookup.get("7:2_5").unwrap();
        assert_eq!(entry.path, "/ws/cmd/main.go");
        assert_eq!(entry.name, "main");
        assert_eq!(entry.selection_range.start, Position::new(2, 5));
        assert!(lookup.get("7:2_0").is_none());

        let json = serde_json::to_value(&lookup).unwrap();
        assert_eq!(json["7:2_5"]["selectionRange"]["start"]["character"], 5);
    }
}
