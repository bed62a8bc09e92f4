//! Application Module
//!
//! Use cases that drive a GraphBuilder from a SymbolSource: whole-workspace
//! generation and the focused graph around one function.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;

use crate::domain::builder::{BuildStats, GraphBuilder};
use crate::domain::graph::GraphDocument;
use crate::domain::language::{DefaultPolicy, Language, LanguagePolicy};
use crate::domain::lookup::SymbolLookup;

pub mod focus;
pub mod generate;

pub use focus::FocusUsecase;
pub use generate::GenerateUsecase;

/// Result of one graph-generation request.
#[derive(Debug, Clone, Serialize)]
pub struct Generated {
    pub document: GraphDocument,
    pub lookup: SymbolLookup,
    pub stats: BuildStats,
}

impl Generated {
    fn from_builder(mut builder: GraphBuilder) -> Self {
        let (document, stats) = builder.build_document_with_stats();
        let lookup = builder.symbol_lookup();
        Self {
            document,
            lookup,
            stats,
        }
    }
}

#[derive(Debug, Error)]
pub enum GenerateError {
    #[error("generation cancelled")]
    Cancelled,
    #[error("no function or method encloses {0}")]
    NoFunctionAt(String),
    #[error(transparent)]
    Source(#[from] anyhow::Error),
}

/// Cooperative cancellation flag shared between a request and whoever may
/// abort it. Checked between units of discovery work.
#[derive(Debug, Clone, Default)]
pub struct Cancellation(Arc<AtomicBool>);

impl Cancellation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    pub fn check(&self) -> Result<(), GenerateError> {
        if self.is_cancelled() {
            Err(GenerateError::Cancelled)
        } else {
            Ok(())
        }
    }
}

fn policy_of(language: Option<Language>) -> Box<dyn LanguagePolicy> {
    match language {
        Some(lang) => lang.policy(),
        None => Box::new(DefaultPolicy),
    }
}

#[cfg(test)]
pub(crate) mod fixture {
    use std::collections::HashMap;

    use anyhow::{bail, Result};

    use crate::domain::location::{CallHierarchyItem, SymbolLocation};
    use crate::domain::symbol::{Position, Range, Symbol, SymbolKind};
    use crate::ports::SymbolSource;

    /// In-memory source for use-case tests.
    #[derive(Default)]
    pub struct MemorySource {
        pub files: Vec<String>,
        pub symbols: HashMap<String, Vec<Symbol>>,
        pub incoming: HashMap<SymbolLocation, Vec<CallHierarchyItem>>,
        pub outgoing: HashMap<SymbolLocation, Vec<CallHierarchyItem>>,
        pub implementations: HashMap<SymbolLocation, Vec<SymbolLocation>>,
    }

    pub fn func(name: &str, start_line: u32, end_line: u32) -> Symbol {
        Symbol::new(
            name,
            SymbolKind::Function,
            Range::from_coords(start_line, 0, end_line, 1),
            Range::from_coords(start_line, 5, start_line, 5 + name.len() as u32),
        )
    }

    pub fn item(symbol: &Symbol, path: &str) -> CallHierarchyItem {
        CallHierarchyItem {
            name: symbol.name.clone(),
            kind: symbol.kind,
            path: path.to_string(),
            range: symbol.range,
            selection_range: symbol.selection_range,
        }
    }

    impl MemorySource {
        pub fn add_file(&mut self, path: &str, symbols: Vec<Symbol>) {
            self.files.push(path.to_string());
            self.symbols.insert(path.to_string(), symbols);
        }

        /// `caller` in `caller_path` calls `callee` in `callee_path`, seen
        /// from both ends.
        pub fn add_call(&mut self, caller_path: &str, caller: &Symbol, callee_path: &str, callee: &Symbol) {
            self.incoming
                .entry(SymbolLocation::new(callee_path, callee.selection_range.start))
                .or_default()
                .push(item(caller, caller_path));
            self.outgoing
                .entry(SymbolLocation::new(caller_path, caller.selection_range.start))
                .or_default()
                .push(item(callee, callee_path));
        }
    }

    impl SymbolSource for MemorySource {
        fn files(&self) -> Vec<String> {
            self.files.clone()
        }

        fn list_symbols(&self, path: &str) -> Result<Vec<Symbol>> {
            match self.symbols.get(path) {
                Some(symbols) => Ok(symbols.clone()),
                None => bail!("no such file: {}", path),
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
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancellation_is_shared() {
        let token = Cancellation::new();
        let handle = token.clone();
        assert!(token.check().is_ok());
        handle.cancel();
        assert!(token.is_cancelled());
        assert!(matches!(token.check(), Err(GenerateError::Cancelled)));
    }
}
