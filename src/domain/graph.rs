// Render document: file tables, edges between cells, directory clusters.
// Everything here is plain data; the DOT exporter turns it into text.

use serde::Serialize;
use std::collections::{BTreeSet, HashSet};
use std::fmt;

use crate::domain::location::{CellId, FileId};
use crate::domain::symbol::Position;

/// Style tags attached to cells and edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CssClass {
    Module,
    Interface,
    Function,
    Method,
    Constructor,
    Property,
    Type,
    Impl,
    Clickable,
    Highlight,
    Cell,
}

impl CssClass {
    pub fn as_str(self) -> &'static str {
        match self {
            CssClass::Module => "module",
            CssClass::Interface => "interface",
            CssClass::Function => "function",
            CssClass::Method => "method",
            CssClass::Constructor => "constructor",
            CssClass::Property => "property",
            CssClass::Type => "type",
            CssClass::Impl => "impl",
            CssClass::Clickable => "clickable",
            CssClass::Highlight => "highlight",
            CssClass::Cell => "cell",
        }
    }
}

impl fmt::Display for CssClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Style {
    pub rounded: bool,
    pub border: Option<u8>,
    pub icon: Option<char>,
    pub classes: Vec<CssClass>,
}

impl Style {
    pub fn rounded(classes: &[CssClass]) -> Self {
        Self {
            rounded: true,
            classes: classes.to_vec(),
            ..Self::default()
        }
    }

    pub fn icon(icon: char, classes: &[CssClass]) -> Self {
        Self {
            icon: Some(icon),
            classes: classes.to_vec(),
            ..Self::default()
        }
    }

    pub fn add_class(&mut self, class: CssClass) {
        if !self.classes.contains(&class) {
            self.classes.push(class);
        }
    }
}

/// One visible symbol. `range_start` is the selection start and doubles as
/// the cell's identity inside its table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Cell {
    pub range_start: Position,
    pub range_end: Position,
    pub title: String,
    pub style: Style,
    pub children: Vec<Cell>,
}

impl Cell {
    pub fn highlight(&mut self, points: &BTreeSet<Position>) {
        if points.contains(&self.range_start) {
            self.style.add_class(CssClass::Highlight);
        }
        for child in &mut self.children {
            child.highlight(points);
        }
    }

    fn collect_ids(&self, file_id: FileId, out: &mut HashSet<CellId>) {
        out.insert(CellId::new(file_id, self.range_start));
        for child in &self.children {
            child.collect_ids(file_id, out);
        }
    }
}

/// A file rendered as a table of its visible symbols.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableNode {
    pub id: FileId,
    pub title: String,
    pub sections: Vec<Cell>,
}

impl TableNode {
    pub fn highlight_cells(&mut self, points: &BTreeSet<Position>) {
        for section in &mut self.sections {
            section.highlight(points);
        }
    }

    /// Every cell id drawn by this table, nested cells included.
    pub fn cell_ids(&self) -> HashSet<CellId> {
        let mut ids = HashSet::new();
        for section in &self.sections {
            section.collect_ids(self.id, &mut ids);
        }
        ids
    }

    /// Depth-first search for the cell at `start`.
    pub fn find_cell(&self, start: Position) -> Option<&Cell> {
        let mut stack: Vec<&Cell> = self.sections.iter().collect();
        while let Some(cell) = stack.pop() {
            if cell.range_start == start {
                return Some(cell);
            }
            stack.extend(cell.children.iter());
        }
        None
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Edge {
    #[serde(serialize_with = "serialize_cell_id")]
    pub from: CellId,
    #[serde(serialize_with = "serialize_cell_id")]
    pub to: CellId,
    pub classes: Vec<CssClass>,
}

impl Edge {
    pub fn new(from: CellId, to: CellId, classes: Vec<CssClass>) -> Self {
        Self { from, to, classes }
    }
}

fn serialize_cell_id<S: serde::Serializer>(cell: &CellId, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(cell)
}

/// Directory cluster. `title` is the path segment relative to the parent
/// cluster; `path` is the full directory relative to the workspace root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Subgraph {
    pub title: String,
    pub path: String,
    pub nodes: Vec<FileId>,
    pub subgraphs: Vec<Subgraph>,
}

/// Output of one graph-generation request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GraphDocument {
    pub tables: Vec<TableNode>,
    pub edges: Vec<Edge>,
    pub subgraphs: Vec<Subgraph>,
}

impl GraphDocument {
    pub fn table(&self, id: FileId) -> Option<&TableNode> {
        self.tables.iter().find(|t| t.id == id)
    }
}
