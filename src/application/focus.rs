//! Focused call graph.
//!
//! Starting from the function enclosing a location, calls are followed
//! breadth-first in both directions. Files are registered as the walk
//! reaches them; anything outside the workspace root is left out.

use std::collections::HashSet;
use std::path::Path;

use anyhow::Context;
use rayon::prelude::*;
use tracing::{debug, info};

use crate::application::{policy_of, Cancellation, GenerateError, Generated};
use crate::domain::builder::GraphBuilder;
use crate::domain::language::Language;
use crate::domain::location::{CallHierarchyItem, SymbolLocation};
use crate::domain::symbol::{Position, Range, SymbolTree};
use crate::ports::SymbolSource;

pub struct FocusUsecase<'a> {
    pub source: &'a dyn SymbolSource,
    pub root: String,
    /// `None` uses the language of the anchor file.
    pub language: Option<Language>,
    /// Levels of calls to follow in each direction. `None` is unbounded.
    pub max_depth: Option<usize>,
    pub cancellation: Cancellation,
}

#[derive(Debug, Clone, Copy)]
enum Direction {
    Outgoing,
    Incoming,
}

impl<'a> FocusUsecase<'a> {
    pub fn new(source: &'a dyn SymbolSource, root: impl Into<String>) -> Self {
        Self {
            source,
            root: root.into(),
            language: None,
            max_depth: None,
            cancellation: Cancellation::default(),
        }
    }

    pub fn with_language(mut self, language: Option<Language>) -> Self {
        self.language = language;
        self
    }

    pub fn with_max_depth(mut self, max_depth: Option<usize>) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_cancellation(mut self, cancellation: Cancellation) -> Self {
        self.cancellation = cancellation;
        self
    }

    pub fn run(&self, anchor: &SymbolLocation) -> Result<Generated, GenerateError> {
        let language = self
            .language
            .or_else(|| Language::from_path(Path::new(&anchor.path)));
        let mut builder = GraphBuilder::with_policy(self.root.clone(), policy_of(language));

        let no_function = || GenerateError::NoFunctionAt(anchor.to_string());
        if !self.ensure_file(&mut builder, &anchor.path)? {
            return Err(no_function());
        }
        let start = builder
            .file(&anchor.path)
            .and_then(|file| enclosing_callable(&file.symbols, anchor.position))
            .ok_or_else(no_function)?;
        info!(anchor = %anchor, function_at = %start, "generating focused call graph");

        let start = SymbolLocation::new(anchor.path.clone(), start);
        self.walk(&mut builder, &start, Direction::Outgoing)?;
        self.walk(&mut builder, &start, Direction::Incoming)?;
        builder.request_highlight(&start.path, start.position);

        Ok(Generated::from_builder(builder))
    }

    fn walk(
        &self,
        builder: &mut GraphBuilder,
        start: &SymbolLocation,
        direction: Direction,
    ) -> Result<(), GenerateError> {
        let mut visited: HashSet<SymbolLocation> = HashSet::from([start.clone()]);
        let mut frontier = vec![start.clone()];
        let mut depth = 0;

        while !frontier.is_empty() {
            if self.max_depth.is_some_and(|max| depth >= max) {
                break;
            }
            self.cancellation.check()?;

            let results = frontier
                .par_iter()
                .map(|loc| -> Result<Vec<CallHierarchyItem>, GenerateError> {
                    self.cancellation.check()?;
                    Ok(self.calls(loc, direction)?)
                })
                .collect::<Result<Vec<_>, GenerateError>>()?;

            let mut next = Vec::new();
            for (loc, items) in frontier.iter().zip(results) {
                for item in &items {
                    let target = item.location();
                    if visited.contains(&target) || !self.ensure_file(builder, &item.path)? {
                        continue;
                    }
                    visited.insert(target.clone());
                    next.push(target);
                }
                match direction {
                    Direction::Outgoing => builder.record_outgoing_calls(&loc.path, loc.position, items),
                    Direction::Incoming => builder.record_incoming_calls(&loc.path, loc.position, items),
                }
            }

            debug!(?direction, depth, reached = next.len(), "focus level done");
            frontier = next;
            depth += 1;
        }
        Ok(())
    }

    fn calls(&self, loc: &SymbolLocation, direction: Direction) -> anyhow::Result<Vec<CallHierarchyItem>> {
        match direction {
            Direction::Outgoing => self
                .source
                .outgoing_calls(&loc.path, loc.position)
                .with_context(|| format!("Failed to get outgoing calls of {}", loc)),
            Direction::Incoming => self
                .source
                .incoming_calls(&loc.path, loc.position)
                .with_context(|| format!("Failed to get incoming calls of {}", loc)),
        }
    }

    /// Register `path` if needed. False if the file stays out of the graph.
    fn ensure_file(&self, builder: &mut GraphBuilder, path: &str) -> Result<bool, GenerateError> {
        if builder.is_registered(path) {
            return Ok(true);
        }
        if !self.root.is_empty() && !Path::new(path).starts_with(&self.root) {
            return Ok(false);
        }
        if builder.should_filter_out_file(path) {
            return Ok(false);
        }
        let symbols = self
            .source
            .list_symbols(path)
            .with_context(|| format!("Failed to list symbols of {}", path))?;
        Ok(builder.register_file(path, symbols))
    }
}

/// Selection start of the innermost callable whose range covers `position`.
fn enclosing_callable(tree: &SymbolTree, position: Position) -> Option<Position> {
    let point = Range::new(position, position);
    tree.walk()
        .into_iter()
        .map(|(_, id)| tree.node(id))
        .filter(|node| node.kind.is_callable() && node.range.contains(&point))
        .last()
        .map(|node| node.selection_range.start)
}
