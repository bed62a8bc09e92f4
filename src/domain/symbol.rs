//! Symbol outlines.
//!
//! Outlines arrive as nested [`Symbol`] values (the shape a document-symbol
//! provider reports) and are stored per file as a [`SymbolTree`] arena, so
//! reconciliation can splice nodes by index instead of moving owned subtrees.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::domain::location::{CallHierarchyItem, FileId};

/// Zero-based line/character position. Ordered by line, then character.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub struct Position {
    pub line: u32,
    pub character: u32,
}

impl Position {
    pub fn new(line: u32, character: u32) -> Self {
        Self { line, character }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.character)
    }
}

/// Source range from `start` to `end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Range {
    pub start: Position,
    pub end: Position,
}

impl Range {
    pub fn new(start: Position, end: Position) -> Self {
        Self { start, end }
    }

    /// Shorthand for `(start_line, start_char) .. (end_line, end_char)`.
    pub fn from_coords(start_line: u32, start_char: u32, end_line: u32, end_char: u32) -> Self {
        Self {
            start: Position::new(start_line, start_char),
            end: Position::new(end_line, end_char),
        }
    }

    /// True if `other` lies entirely within `self` (bounds inclusive).
    pub fn contains(&self, other: &Range) -> bool {
        self.start <= other.start && other.end <= self.end
    }
}

/// Declaration kinds the graph distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SymbolKind {
    Module,
    Function,
    Method,
    Constructor,
    Interface,
    Enum,
    Struct,
    Class,
    TypeParameter,
    Field,
    Property,
    Constant,
    Variable,
    EnumMember,
    #[serde(other)]
    Other,
}

impl SymbolKind {
    /// Kinds reconciliation may descend into.
    pub fn is_function_like(self) -> bool {
        matches!(self, SymbolKind::Function | SymbolKind::Method)
    }

    /// Kinds whose call hierarchy is worth asking for.
    pub fn is_callable(self) -> bool {
        matches!(
            self,
            SymbolKind::Function | SymbolKind::Method | SymbolKind::Constructor
        )
    }

    pub fn name(self) -> &'static str {
        match self {
            SymbolKind::Module => "module",
            SymbolKind::Function => "function",
            SymbolKind::Method => "method",
            SymbolKind::Constructor => "constructor",
            SymbolKind::Interface => "interface",
            SymbolKind::Enum => "enum",
            SymbolKind::Struct => "struct",
            SymbolKind::Class => "class",
            SymbolKind::TypeParameter => "type-parameter",
            SymbolKind::Field => "field",
            SymbolKind::Property => "property",
            SymbolKind::Constant => "constant",
            SymbolKind::Variable => "variable",
            SymbolKind::EnumMember => "enum-member",
            SymbolKind::Other => "other",
        }
    }
}

impl fmt::Display for SymbolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A declaration as reported by the outline provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Symbol {
    pub name: String,
    pub kind: SymbolKind,
    pub range: Range,
    pub selection_range: Range,
    #[serde(default)]
    pub children: Vec<Symbol>,
}

impl Symbol {
    pub fn new(name: impl Into<String>, kind: SymbolKind, range: Range, selection_range: Range) -> Self {
        Self {
            name: name.into(),
            kind,
            range,
            selection_range,
            children: Vec::new(),
        }
    }

    pub fn with_children(mut self, children: Vec<Symbol>) -> Self {
        self.children = children;
        self
    }

    /// Check the structural preconditions the graph builder relies on.
    pub fn validate(&self) -> Result<(), SymbolError> {
        if !self.range.contains(&self.selection_range) {
            return Err(SymbolError::SelectionOutsideRange {
                name: self.name.clone(),
            });
        }
        let mut previous: Option<&Symbol> = None;
        for child in &self.children {
            if !self.range.contains(&child.range) {
                return Err(SymbolError::ChildOutsideParent {
                    parent: self.name.clone(),
                    child: child.name.clone(),
                });
            }
            if let Some(prev) = previous {
                if child.range.start < prev.range.start {
                    return Err(SymbolError::UnorderedChildren {
                        parent: self.name.clone(),
                        child: child.name.clone(),
                    });
                }
            }
            child.validate()?;
            previous = Some(child);
        }
        Ok(())
    }
}

/// Malformed outline input. Adapters reject these before registration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SymbolError {
    #[error("selection range of `{name}` lies outside its full range")]
    SelectionOutsideRange { name: String },
    #[error("child `{child}` lies outside its parent `{parent}`")]
    ChildOutsideParent { parent: String, child: String },
    #[error("child `{child}` of `{parent}` starts before its preceding sibling")]
    UnorderedChildren { parent: String, child: String },
}

/// Validate a whole top-level sequence, including sibling order.
pub fn validate_outline(symbols: &[Symbol]) -> Result<(), SymbolError> {
    for pair in symbols.windows(2) {
        if pair[1].range.start < pair[0].range.start {
            return Err(SymbolError::UnorderedChildren {
                parent: "<file>".to_string(),
                child: pair[1].name.clone(),
            });
        }
    }
    symbols.iter().try_for_each(Symbol::validate)
}

/// Stable index of a node inside one [`SymbolTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SymbolId(usize);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolNode {
    pub name: String,
    pub kind: SymbolKind,
    pub range: Range,
    pub selection_range: Range,
    pub(crate) children: Vec<SymbolId>,
}

impl SymbolNode {
    pub fn children(&self) -> &[SymbolId] {
        &self.children
    }
}

impl From<&CallHierarchyItem> for SymbolNode {
    fn from(item: &CallHierarchyItem) -> Self {
        Self {
            name: item.name.clone(),
            kind: item.kind,
            range: item.range,
            selection_range: item.selection_range,
            children: Vec::new(),
        }
    }
}

/// Arena-backed symbol tree of one file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SymbolTree {
    nodes: Vec<SymbolNode>,
    roots: Vec<SymbolId>,
}

impl SymbolTree {
    pub fn from_symbols(symbols: Vec<Symbol>) -> Self {
        let mut tree = SymbolTree::default();
        for symbol in symbols {
            let id = tree.push_symbol(symbol);
            tree.roots.push(id);
        }
        tree
    }

    fn push_symbol(&mut self, symbol: Symbol) -> SymbolId {
        let children = symbol
            .children
            .into_iter()
            .map(|child| self.push_symbol(child))
            .collect();
        self.alloc(SymbolNode {
            name: symbol.name,
            kind: symbol.kind,
            range: symbol.range,
            selection_range: symbol.selection_range,
            children,
        })
    }

    pub(crate) fn alloc(&mut self, node: SymbolNode) -> SymbolId {
        let id = SymbolId(self.nodes.len());
        self.nodes.push(node);
        id
    }

    pub fn roots(&self) -> &[SymbolId] {
        &self.roots
    }

    /// Panics if `id` was not handed out by this tree.
    pub fn node(&self, id: SymbolId) -> &SymbolNode {
        &self.nodes[id.0]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Children of `parent`, or the top-level sequence for `None`.
    pub(crate) fn siblings(&self, parent: Option<SymbolId>) -> &[SymbolId] {
        match parent {
            Some(id) => &self.nodes[id.0].children,
            None => &self.roots,
        }
    }

    pub(crate) fn siblings_mut(&mut self, parent: Option<SymbolId>) -> &mut Vec<SymbolId> {
        match parent {
            Some(id) => &mut self.nodes[id.0].children,
            None => &mut self.roots,
        }
    }

    /// Nodes in document order (pre-order), each with its parent.
    pub fn walk(&self) -> Vec<(Option<SymbolId>, SymbolId)> {
        let mut out = Vec::with_capacity(self.nodes.len());
        let mut stack: Vec<(Option<SymbolId>, SymbolId)> =
            self.roots.iter().rev().map(|&id| (None, id)).collect();
        while let Some((parent, id)) = stack.pop() {
            out.push((parent, id));
            stack.extend(self.node(id).children.iter().rev().map(|&c| (Some(id), c)));
        }
        out
    }

    pub fn find_by_selection_start(&self, start: Position) -> Option<SymbolId> {
        self.walk()
            .into_iter()
            .map(|(_, id)| id)
            .find(|&id| self.node(id).selection_range.start == start)
    }

    /// Rebuild the nested representation, including any inserted nodes.
    pub fn to_symbols(&self) -> Vec<Symbol> {
        self.roots.iter().map(|&id| self.to_symbol(id)).collect()
    }

    fn to_symbol(&self, id: SymbolId) -> Symbol {
        let node = self.node(id);
        Symbol {
            name: node.name.clone(),
            kind: node.kind,
            range: node.range,
            selection_range: node.selection_range,
            children: node.children.iter().map(|&c| self.to_symbol(c)).collect(),
        }
    }
}

/// A registered file and its (possibly reconciled) outline.
#[derive(Debug, Clone)]
pub struct FileOutline {
    pub id: FileId,
    pub path: String,
    pub symbols: SymbolTree,
}
