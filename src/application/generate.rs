//! Whole-workspace generation.
//!
//! Outlines are fetched in parallel, registered in input order, and then
//! every callable symbol gets its callers and callees recorded and every
//! interface member its implementors.

use anyhow::Context;
use rayon::prelude::*;
use tracing::{debug, info};

use crate::application::{policy_of, Cancellation, GenerateError, Generated};
use crate::domain::builder::GraphBuilder;
use crate::domain::language::Language;
use crate::domain::location::{CallHierarchyItem, SymbolLocation};
use crate::domain::symbol::{Position, Symbol, SymbolKind};
use crate::ports::SymbolSource;

pub struct GenerateUsecase<'a> {
    pub source: &'a dyn SymbolSource,
    pub root: String,
    /// `None` infers the majority language of the input files.
    pub language: Option<Language>,
    pub cancellation: Cancellation,
}

enum Query {
    Incoming(String, Position),
    Outgoing(String, Position),
    Implementations(String, Position),
}

enum Fact {
    Incoming(String, Position, Vec<CallHierarchyItem>),
    Outgoing(String, Position, Vec<CallHierarchyItem>),
    Implementations(String, Position, Vec<SymbolLocation>),
}

impl<'a> GenerateUsecase<'a> {
    pub fn new(source: &'a dyn SymbolSource, root: impl Into<String>) -> Self {
        Self {
            source,
            root: root.into(),
            language: None,
            cancellation: Cancellation::default(),
        }
    }

    pub fn with_language(mut self, language: Option<Language>) -> Self {
        self.language = language;
        self
    }

    pub fn with_cancellation(mut self, cancellation: Cancellation) -> Self {
        self.cancellation = cancellation;
        self
    }

    /// Generate the graph for every file the source lists.
    pub fn run_all(&self) -> Result<Generated, GenerateError> {
        self.run(&self.source.files())
    }

    pub fn run(&self, files: &[String]) -> Result<Generated, GenerateError> {
        let language = self
            .language
            .or_else(|| Language::infer(files.iter().map(String::as_str)));
        info!(
            files = files.len(),
            language = language.map(|l| l.name()).unwrap_or("unknown"),
            "generating call graph"
        );
        let mut builder = GraphBuilder::with_policy(self.root.clone(), policy_of(language));

        let wanted: Vec<&String> = files
            .iter()
            .filter(|path| !builder.should_filter_out_file(path))
            .collect();

        let outlines = wanted
            .par_iter()
            .map(|path| -> Result<Vec<Symbol>, GenerateError> {
                self.cancellation.check()?;
                let symbols = self
                    .source
                    .list_symbols(path)
                    .with_context(|| format!("Failed to list symbols of {}", path))?;
                Ok(symbols)
            })
            .collect::<Result<Vec<_>, GenerateError>>()?;

        for (path, symbols) in wanted.iter().zip(outlines) {
            builder.register_file(path, symbols);
        }

        let queries = plan_queries(&builder);
        debug!(queries = queries.len(), "querying call hierarchy");

        let facts = queries
            .par_iter()
            .map(|query| -> Result<Fact, GenerateError> {
                self.cancellation.check()?;
                let fact = match query {
                    Query::Incoming(path, pos) => {
                        let callers = self
                            .source
                            .incoming_calls(path, *pos)
                            .with_context(|| format!("Failed to get incoming calls of {}:{}", path, pos))?;
                        Fact::Incoming(path.clone(), *pos, callers)
                    }
                    Query::Outgoing(path, pos) => {
                        let callees = self
                            .source
                            .outgoing_calls(path, *pos)
                            .with_context(|| format!("Failed to get outgoing calls of {}:{}", path, pos))?;
                        Fact::Outgoing(path.clone(), *pos, callees)
                    }
                    Query::Implementations(path, pos) => {
                        let implementors = self
                            .source
                            .implementations(path, *pos)
                            .with_context(|| format!("Failed to get implementations of {}:{}", path, pos))?;
                        Fact::Implementations(path.clone(), *pos, implementors)
                    }
                };
                Ok(fact)
            })
            .collect::<Result<Vec<_>, GenerateError>>()?;

        self.cancellation.check()?;
        for fact in facts {
            match fact {
                Fact::Incoming(path, pos, callers) => builder.record_incoming_calls(&path, pos, callers),
                Fact::Outgoing(path, pos, callees) => builder.record_outgoing_calls(&path, pos, callees),
                Fact::Implementations(path, pos, implementors) => {
                    builder.record_implementations(&path, pos, implementors)
                }
            }
        }

        Ok(Generated::from_builder(builder))
    }
}

fn plan_queries(builder: &GraphBuilder) -> Vec<Query> {
    let mut queries = Vec::new();
    for file in builder.files() {
        let tree = &file.symbols;
        for (_, id) in tree.walk() {
            let node = tree.node(id);
            if node.kind.is_callable() {
                let start = node.selection_range.start;
                queries.push(Query::Incoming(file.path.clone(), start));
                queries.push(Query::Outgoing(file.path.clone(), start));
            } else if node.kind == SymbolKind::Interface {
                for &child in node.children() {
                    let start = tree.node(child).selection_range.start;
                    queries.push(Query::Implementations(file.path.clone(), start));
                }
            }
        }
    }
    queries
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::fixture::{func, item, MemorySource};
    use crate::domain::graph::{CssClass, Edge};
    use crate::domain::location::{CellId, FileId};
    use crate::domain::symbol::Range;

    fn two_files() -> MemorySource {
        let caller = func("Caller", 2, 6);
        let callee = func("Callee", 2, 4);
        let mut source = MemorySource::default();
        source.add_file("/ws/caller.go", vec![caller.clone()]);
        source.add_file("/ws/pkg/callee.go", vec![callee.clone()]);
        source.add_file("/ws/caller_test.go", vec![func("TestCaller", 0, 3)]);
        source.add_call("/ws/caller.go", &caller, "/ws/pkg/callee.go", &callee);
        source
    }

    #[test]
    fn test_generates_call_edge_between_files() {
        let source = two_files();
        let generated = GenerateUsecase::new(&source, "/ws").run_all().unwrap();

        let doc = &generated.document;
        assert_eq!(doc.tables.len(), 2);
        // The call is reported from both ends and facts are not merged.
        let call = Edge::new(
            CellId::new(FileId(1), Position::new(2, 5)),
            CellId::new(FileId(2), Position::new(2, 5)),
            vec![],
        );
        assert_eq!(doc.edges, vec![call.clone(), call]);
        assert_eq!(generated.lookup.get("2:2_5").unwrap().name, "Callee");
        assert_eq!(generated.stats.kept, 2);
    }

    #[test]
    fn test_outgoing_only_facts_produce_edges() {
        let main = func("main", 2, 6);
        let helper = func("helper", 5, 8);
        let mut source = MemorySource::default();
        source.add_file("/ws/caller.go", vec![main.clone()]);
        source.add_file("/ws/callee.go", vec![helper.clone()]);
        source.outgoing.insert(
            SymbolLocation::new("/ws/caller.go", main.selection_range.start),
            vec![item(&helper, "/ws/callee.go")],
        );

        let generated = GenerateUsecase::new(&source, "/ws").run_all().unwrap();
        assert_eq!(
            generated.document.edges,
            vec![Edge::new(
                CellId::new(FileId(1), Position::new(2, 5)),
                CellId::new(FileId(2), Position::new(5, 5)),
                vec![],
            )]
        );
        assert_eq!(generated.stats.kept, 1);
    }

    #[test]
    fn test_interface_members_query_implementations() {
        let mut source = MemorySource::default();
        let shape = Symbol::new(
            "Shape",
            SymbolKind::Interface,
            Range::from_coords(0, 0, 3, 1),
            Range::from_coords(0, 5, 0, 10),
        )
        .with_children(vec![Symbol::new(
            "Area",
            SymbolKind::Method,
            Range::from_coords(1, 1, 1, 15),
            Range::from_coords(1, 1, 1, 5),
        )]);
        let area = Symbol::new(
            "Area",
            SymbolKind::Method,
            Range::from_coords(4, 0, 6, 1),
            Range::from_coords(4, 16, 4, 20),
        );
        source.add_file("/ws/shape.go", vec![shape]);
        source.add_file("/ws/square.go", vec![area]);
        source.implementations.insert(
            SymbolLocation::new("/ws/shape.go", Position::new(1, 1)),
            vec![SymbolLocation::new("/ws/square.go", Position::new(4, 16))],
        );

        let generated = GenerateUsecase::new(&source, "/ws")
            .with_language(Some(Language::Go))
            .run_all()
            .unwrap();
        let edges = &generated.document.edges;
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].from.file_id, FileId(2));
        assert_eq!(edges[0].classes, vec![CssClass::Impl]);
    }

    #[test]
    fn test_source_failure_carries_path() {
        let mut source = two_files();
        source.files.push("/ws/gone.go".to_string());
        let err = GenerateUsecase::new(&source, "/ws").run_all().unwrap_err();
        assert!(format!("{:#}", anyhow::Error::from(err)).contains("/ws/gone.go"));
    }

    #[test]
    fn test_cancelled_request_fails() {
        let source = two_files();
        let token = Cancellation::new();
        token.cancel();
        let result = GenerateUsecase::new(&source, "/ws")
            .with_cancellation(token)
            .run_all();
        assert!(matches!(result, Err(GenerateError::Cancelled)));
    }
}
