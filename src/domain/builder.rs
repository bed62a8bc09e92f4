//! Graph builder.
//!
//! One builder serves one graph-generation request. Callers register files,
//! record call-hierarchy and implementation facts keyed by source location,
//! request highlights, and finally ask for the document. Nothing is shared
//! between builders.

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use thiserror::Error;
use tracing::{debug, info};

use crate::domain::cluster;
use crate::domain::graph::{CssClass, Edge, GraphDocument, TableNode};
use crate::domain::language::{policy_for, LanguagePolicy};
use crate::domain::location::{CallHierarchyItem, CellId, FileId, LocationIndex, SymbolLocation};
use crate::domain::lookup::SymbolLookup;
use crate::domain::reconcile::{Insertion, Refusal};
use crate::domain::symbol::{FileOutline, Position, Symbol, SymbolNode, SymbolTree};

/// Why a relation produced no edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Discard {
    #[error("location is not in a registered file")]
    Unregistered,
    /// Also covers symbols present in the outline but filtered out of the table.
    #[error("location is not a visible cell")]
    InvisibleAnchor,
    #[error("reconciliation refused: {0}")]
    Refused(Refusal),
}

/// Outcome of resolving one relation fact.
pub type EdgeResolution = Result<Edge, Discard>;

/// Per-build counters, one per relation fact.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BuildStats {
    pub kept: usize,
    pub unregistered: usize,
    pub invisible_anchor: usize,
    pub refused: usize,
    pub inserted_symbols: usize,
    pub rebuilt_tables: usize,
}

impl BuildStats {
    fn record(&mut self, resolution: EdgeResolution) -> Option<Edge> {
        match resolution {
            Ok(edge) => {
                self.kept += 1;
                Some(edge)
            }
            Err(discard) => {
                self.discard(discard, 1);
                None
            }
        }
    }

    fn discard(&mut self, discard: Discard, count: usize) {
        match discard {
            Discard::Unregistered => self.unregistered += count,
            Discard::InvisibleAnchor => self.invisible_anchor += count,
            Discard::Refused(_) => self.refused += count,
        }
    }

    pub fn discarded(&self) -> usize {
        self.unregistered + self.invisible_anchor + self.refused
    }
}

pub struct GraphBuilder {
    root: String,
    policy: Box<dyn LanguagePolicy>,
    index: LocationIndex,
    files: Vec<FileOutline>,
    incoming_calls: BTreeMap<SymbolLocation, Vec<CallHierarchyItem>>,
    outgoing_calls: BTreeMap<SymbolLocation, Vec<CallHierarchyItem>>,
    implementations: BTreeMap<SymbolLocation, Vec<SymbolLocation>>,
    highlights: BTreeMap<FileId, BTreeSet<Position>>,
}

impl GraphBuilder {
    /// Builder for `language`; unknown names get the default policy.
    pub fn new(root: impl Into<String>, language: &str) -> Self {
        Self::with_policy(root, policy_for(language))
    }

    pub fn with_policy(root: impl Into<String>, policy: Box<dyn LanguagePolicy>) -> Self {
        Self {
            root: root.into(),
            policy,
            index: LocationIndex::default(),
            files: Vec::new(),
            incoming_calls: BTreeMap::new(),
            outgoing_calls: BTreeMap::new(),
            implementations: BTreeMap::new(),
            highlights: BTreeMap::new(),
        }
    }

    pub fn root(&self) -> &str {
        &self.root
    }

    pub fn should_filter_out_file(&self, path: &str) -> bool {
        self.policy.should_filter_out_file(path)
    }

    /// Returns false, changing nothing, for filtered or already known paths.
    pub fn register_file(&mut self, path: &str, symbols: Vec<Symbol>) -> bool {
        if self.policy.should_filter_out_file(path) {
            debug!(path, "file filtered out by language policy");
            return false;
        }
        let Some(id) = self.index.register(path) else {
            debug!(path, "file already registered");
            return false;
        };
        self.files.push(FileOutline {
            id,
            path: path.to_string(),
            symbols: SymbolTree::from_symbols(symbols),
        });
        true
    }

    pub fn is_registered(&self, path: &str) -> bool {
        self.index.file_id(path).is_some()
    }

    pub fn file(&self, path: &str) -> Option<&FileOutline> {
        self.index.file_id(path).map(|id| &self.files[id.index()])
    }

    /// Registered files in id order.
    pub fn files(&self) -> &[FileOutline] {
        &self.files
    }

    /// Callers of the symbol at `path:position`. Replaces earlier records.
    pub fn record_incoming_calls(&mut self, path: &str, position: Position, callers: Vec<CallHierarchyItem>) {
        self.incoming_calls
            .insert(SymbolLocation::new(path, position), callers);
    }

    /// Callees of the symbol at `path:position`. Replaces earlier records.
    pub fn record_outgoing_calls(&mut self, path: &str, position: Position, callees: Vec<CallHierarchyItem>) {
        self.outgoing_calls
            .insert(SymbolLocation::new(path, position), callees);
    }

    /// Implementors of the interface method at `path:position`.
    pub fn record_implementations(&mut self, path: &str, position: Position, implementors: Vec<SymbolLocation>) {
        self.implementations
            .insert(SymbolLocation::new(path, position), implementors);
    }

    pub fn request_highlight(&mut self, path: &str, position: Position) {
        if let Some(id) = self.index.file_id(path) {
            self.highlights.entry(id).or_default().insert(position);
        }
    }

    pub fn build_document(&mut self) -> GraphDocument {
        self.build_document_with_stats().0
    }

    pub fn build_document_with_stats(&mut self) -> (GraphDocument, BuildStats) {
        let mut tables: Vec<TableNode> = self.files.iter().map(|f| self.table_for(f)).collect();

        let visible: HashSet<CellId> = tables.iter().flat_map(TableNode::cell_ids).collect();

        let mut stats = BuildStats::default();
        let mut edges = Vec::new();
        let mut resolver = EdgeResolver {
            index: &self.index,
            policy: self.policy.as_ref(),
            files: &mut self.files,
            visible,
            inserted: HashSet::new(),
            dirty: BTreeSet::new(),
        };

        for (callee, callers) in &self.incoming_calls {
            let to = match resolver.anchor(callee) {
                Ok(cell) => cell,
                Err(discard) => {
                    debug!(%callee, %discard, "incoming calls dropped");
                    stats.discard(discard, callers.len());
                    continue;
                }
            };
            for caller in callers {
                let resolution = resolver.endpoint(caller).map(|from| Edge::new(from, to, Vec::new()));
                log_discard(&resolution, caller);
                edges.extend(stats.record(resolution));
            }
        }

        for (caller, callees) in &self.outgoing_calls {
            let from = match resolver.anchor(caller) {
                Ok(cell) => cell,
                Err(discard) => {
                    debug!(%caller, %discard, "outgoing calls dropped");
                    stats.discard(discard, callees.len());
                    continue;
                }
            };
            for callee in callees {
                let resolution = resolver.endpoint(callee).map(|to| Edge::new(from, to, Vec::new()));
                log_discard(&resolution, callee);
                edges.extend(stats.record(resolution));
            }
        }

        for (interface, implementors) in &self.implementations {
            let to = match resolver.anchor(interface) {
                Ok(cell) => cell,
                Err(discard) => {
                    debug!(%interface, %discard, "implementations dropped");
                    stats.discard(discard, implementors.len());
                    continue;
                }
            };
            for implementor in implementors {
                let resolution = resolver
                    .drawn(implementor)
                    .map(|from| Edge::new(from, to, vec![CssClass::Impl]));
                if let Err(discard) = &resolution {
                    debug!(%implementor, %discard, "implementation edge dropped");
                }
                edges.extend(stats.record(resolution));
            }
        }

        stats.inserted_symbols = resolver.inserted.len();
        let dirty = std::mem::take(&mut resolver.dirty);
        drop(resolver);

        for id in &dirty {
            let file = &self.files[id.index()];
            debug!(path = %file.path, "rebuilding table after symbol insertion");
            tables[id.index()] = self.table_for(file);
        }
        stats.rebuilt_tables = dirty.len();

        let subgraphs = cluster::subgraphs(&self.root, &self.files);

        info!(
            tables = tables.len(),
            edges = edges.len(),
            discarded = stats.discarded(),
            inserted = stats.inserted_symbols,
            "graph document built"
        );

        (
            GraphDocument {
                tables,
                edges,
                subgraphs,
            },
            stats,
        )
    }

    /// Anchor → source lookup over the current outlines. Call after
    /// [`GraphBuilder::build_document`] to include reconciled symbols.
    pub fn symbol_lookup(&self) -> SymbolLookup {
        SymbolLookup::from_files(&self.files)
    }

    fn table_for(&self, file: &FileOutline) -> TableNode {
        let mut table = self.policy.file_repr(file);
        if let Some(points) = self.highlights.get(&file.id) {
            table.highlight_cells(points);
        }
        table
    }
}

fn log_discard(resolution: &EdgeResolution, item: &CallHierarchyItem) {
    if let Err(discard) = resolution {
        debug!(name = %item.name, location = %item.location(), %discard, "call edge dropped");
    }
}

/// Edge-resolution state for one build: the visible cells of the base
/// tables plus whatever reconciliation inserted along the way.
struct EdgeResolver<'a> {
    index: &'a LocationIndex,
    policy: &'a dyn LanguagePolicy,
    files: &'a mut Vec<FileOutline>,
    visible: HashSet<CellId>,
    inserted: HashSet<CellId>,
    dirty: BTreeSet<FileId>,
}

impl EdgeResolver<'_> {
    /// A fixed endpoint: must be a cell of the base tables. Symbols inserted
    /// during this build never anchor an entry, so the outcome does not
    /// depend on the order entries are visited in.
    fn anchor(&self, location: &SymbolLocation) -> Result<CellId, Discard> {
        let cell = self.index.resolve(location).ok_or(Discard::Unregistered)?;
        if self.visible.contains(&cell) {
            Ok(cell)
        } else {
            Err(Discard::InvisibleAnchor)
        }
    }

    /// An implementor: drawn already, never synthesized.
    fn drawn(&self, location: &SymbolLocation) -> Result<CellId, Discard> {
        let cell = self.index.resolve(location).ok_or(Discard::Unregistered)?;
        if self.visible.contains(&cell) || self.inserted.contains(&cell) {
            Ok(cell)
        } else {
            Err(Discard::InvisibleAnchor)
        }
    }

    /// A variable endpoint of a call: drawn, or insertable into its file.
    fn endpoint(&mut self, item: &CallHierarchyItem) -> Result<CellId, Discard> {
        let cell = self
            .index
            .resolve(&item.location())
            .ok_or(Discard::Unregistered)?;
        if self.visible.contains(&cell) || self.inserted.contains(&cell) {
            return Ok(cell);
        }
        // An inserted node the policy would not draw would leave the edge
        // dangling.
        if !self.policy.filter_symbol(&SymbolNode::from(item)) {
            return Err(Discard::InvisibleAnchor);
        }

        let file = &mut self.files[cell.file_id.index()];
        match file.symbols.try_insert(item) {
            Ok(Insertion::Inserted(_)) => {
                debug!(name = %item.name, path = %file.path, "inserted symbol from call hierarchy");
                self.dirty.insert(cell.file_id);
                self.inserted.insert(cell);
                Ok(cell)
            }
            // Present in the outline but filtered out of the table.
            Ok(Insertion::AlreadyPresent(_)) => Err(Discard::InvisibleAnchor),
            Err(refusal) => Err(Discard::Refused(refusal)),
        }
    }
}
