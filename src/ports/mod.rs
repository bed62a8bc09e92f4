use std::path::Path;

use anyhow::Result;

use crate::domain::graph::GraphDocument;
use crate::domain::location::{CallHierarchyItem, SymbolLocation};
use crate::domain::symbol::{Position, Symbol};

pub mod dot_exporter;

/// Where symbol outlines and call-hierarchy facts come from: a language
/// server, a recorded snapshot, a test fixture.
pub trait SymbolSource: Sync {
    /// Files in the workspace, in registration order.
    fn files(&self) -> Vec<String>;
    fn list_symbols(&self, path: &str) -> Result<Vec<Symbol>>;
    fn incoming_calls(&self, path: &str, position: Position) -> Result<Vec<CallHierarchyItem>>;
    fn outgoing_calls(&self, path: &str, position: Position) -> Result<Vec<CallHierarchyItem>>;
    fn implementations(&self, path: &str, position: Position) -> Result<Vec<SymbolLocation>>;
}

pub trait DocumentExporter {
    fn render(&self, doc: &GraphDocument) -> String;

    fn export(&self, doc: &GraphDocument, path: &Path) -> std::io::Result<()> {
        std::fs::write(path, self.render(doc))
    }
}
