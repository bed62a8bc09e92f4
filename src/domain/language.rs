//! Language Domain Module
//!
//! Languages the graph knows by name, and the per-language policy deciding
//! which files and symbols are drawn and how.

use std::collections::BTreeMap;
use std::path::Path;

use crate::domain::graph::{Cell, CssClass, Style, TableNode};
use crate::domain::symbol::{FileOutline, SymbolId, SymbolKind, SymbolNode, SymbolTree};

/// Languages with a named policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Language {
    Go,
    Rust,
    Python,
    TypeScript,
}

impl Language {
    /// Parse language from string (CLI input or editor language id).
    pub fn from_name(s: &str) -> Option<Language> {
        match s.to_lowercase().as_str() {
            "go" | "golang" => Some(Language::Go),
            "rust" | "rs" => Some(Language::Rust),
            "python" | "py" => Some(Language::Python),
            "typescript" | "ts" | "typescriptreact" => Some(Language::TypeScript),
            _ => None,
        }
    }

    /// Infer language from file extension.
    pub fn from_extension(ext: &str) -> Option<Language> {
        match ext.to_lowercase().as_str() {
            "go" => Some(Language::Go),
            "rs" => Some(Language::Rust),
            "py" => Some(Language::Python),
            "ts" | "tsx" => Some(Language::TypeScript),
            _ => None,
        }
    }

    /// Infer language from a file path.
    pub fn from_path(path: &Path) -> Option<Language> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
    }

    /// Most common language among `paths`. Ties go to the earlier variant.
    pub fn infer<'a>(paths: impl IntoIterator<Item = &'a str>) -> Option<Language> {
        let mut counts: BTreeMap<Language, usize> = BTreeMap::new();
        for path in paths {
            if let Some(lang) = Self::from_path(Path::new(path)) {
                *counts.entry(lang).or_default() += 1;
            }
        }
        counts
            .into_iter()
            .rev()
            .max_by_key(|&(_, count)| count)
            .map(|(lang, _)| lang)
    }

    /// Get the display name of the language.
    pub fn name(&self) -> &'static str {
        match self {
            Language::Go => "Go",
            Language::Rust => "Rust",
            Language::Python => "Python",
            Language::TypeScript => "TypeScript",
        }
    }

    /// Get the file extensions for this language.
    pub fn extensions(&self) -> &'static [&'static str] {
        match self {
            Language::Go => &["go"],
            Language::Rust => &["rs"],
            Language::Python => &["py"],
            Language::TypeScript => &["ts", "tsx"],
        }
    }

    pub fn policy(&self) -> Box<dyn LanguagePolicy> {
        match self {
            Language::Go => Box::new(GoPolicy),
            Language::Rust | Language::Python | Language::TypeScript => Box::new(DefaultPolicy),
        }
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Policy for a language name; unknown names get [`DefaultPolicy`].
pub fn policy_for(name: &str) -> Box<dyn LanguagePolicy> {
    match Language::from_name(name) {
        Some(lang) => lang.policy(),
        None => Box::new(DefaultPolicy),
    }
}

/// Decides what a file looks like in the graph.
pub trait LanguagePolicy: Send + Sync {
    /// Reject a file before registration.
    fn should_filter_out_file(&self, _path: &str) -> bool {
        false
    }

    /// Keep a symbol in the drawn tree. Constants, variables, fields,
    /// properties and enum members carry no call edges and are dropped.
    fn filter_symbol(&self, symbol: &SymbolNode) -> bool {
        !matches!(
            symbol.kind,
            SymbolKind::Constant
                | SymbolKind::Variable
                | SymbolKind::Field
                | SymbolKind::Property
                | SymbolKind::EnumMember
        )
    }

    fn symbol_style(&self, symbol: &SymbolNode) -> Style {
        use CssClass as C;
        match symbol.kind {
            SymbolKind::Module => Style::rounded(&[C::Cell, C::Module]),
            SymbolKind::Function => Style::rounded(&[C::Cell, C::Function, C::Clickable]),
            SymbolKind::Method => Style::rounded(&[C::Cell, C::Method, C::Clickable]),
            SymbolKind::Constructor => Style::rounded(&[C::Cell, C::Constructor, C::Clickable]),
            SymbolKind::Interface => Style {
                border: Some(0),
                ..Style::rounded(&[C::Cell, C::Interface, C::Clickable])
            },
            SymbolKind::Enum => Style::icon('E', &[C::Cell, C::Type]),
            SymbolKind::Struct => Style::icon('S', &[C::Cell, C::Type]),
            SymbolKind::Class => Style::icon('C', &[C::Cell, C::Type]),
            SymbolKind::TypeParameter => Style::icon('T', &[C::Cell, C::Type]),
            SymbolKind::Field => Style::icon('f', &[C::Cell, C::Property]),
            SymbolKind::Property => Style::icon('p', &[C::Cell, C::Property]),
            _ => Style::rounded(&[C::Cell]),
        }
    }

    /// Compose the file's filtered, styled symbol tree into a table.
    fn file_repr(&self, file: &FileOutline) -> TableNode {
        let title = Path::new(&file.path)
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| file.path.clone());

        let mut sections = Vec::new();
        collect_cells(self, &file.symbols, file.symbols.roots(), false, &mut sections);

        TableNode {
            id: file.id,
            title,
            sections,
        }
    }
}

// A filtered-out symbol drops out of the table, but descendants that pass
// the filter take its place. Interface members are always kept.
fn collect_cells<P: LanguagePolicy + ?Sized>(
    policy: &P,
    tree: &SymbolTree,
    ids: &[SymbolId],
    keep_all: bool,
    out: &mut Vec<Cell>,
) {
    for &id in ids {
        let node = tree.node(id);
        if keep_all || policy.filter_symbol(node) {
            let mut children = Vec::new();
            collect_cells(
                policy,
                tree,
                node.children(),
                node.kind == SymbolKind::Interface,
                &mut children,
            );
            out.push(Cell {
                range_start: node.selection_range.start,
                range_end: node.selection_range.end,
                title: node.name.clone(),
                style: policy.symbol_style(node),
                children,
            });
        } else {
            collect_cells(policy, tree, node.children(), false, out);
        }
    }
}

/// Filters no files and uses the standard style table.
pub struct DefaultPolicy;

impl LanguagePolicy for DefaultPolicy {}

/// Go: test files stay out of the graph.
pub struct GoPolicy;

impl LanguagePolicy for GoPolicy {
    fn should_filter_out_file(&self, path: &str) -> bool {
        path.ends_with("_test.go")
    }
}
