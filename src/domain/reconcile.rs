//! Symbol reconciliation.
//!
//! Call-hierarchy providers report callables (closures, func literals, local
//! functions) that outline providers often leave out. When a relation points
//! at such a location, the builder tries to splice a node for it into the
//! file's tree so the edge has something to attach to.
//!
//! Rules, applied level by level starting at the top-level sequence:
//!
//! - a sibling with the same selection start means the symbol is already
//!   there;
//! - a preceding sibling whose full range contains the target is entered,
//!   but only if it is a function or method;
//! - the target is inserted before the first sibling that starts after it,
//!   adopting every following sibling its range fully contains;
//! - nothing is ever inserted at the top level, and a target that partially
//!   overlaps a sibling is refused rather than producing a malformed tree.

use thiserror::Error;

use crate::domain::location::CallHierarchyItem;
use crate::domain::symbol::{SymbolId, SymbolKind, SymbolNode, SymbolTree};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Insertion {
    Inserted(SymbolId),
    AlreadyPresent(SymbolId),
}

/// Why a target could not be placed in the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Refusal {
    #[error("no enclosing function or method")]
    NoEnclosingFunction,
    #[error("enclosed by a {0}, not a function or method")]
    NonFunctionContainer(SymbolKind),
    #[error("partially overlaps an existing symbol")]
    PartialOverlap,
}

impl SymbolTree {
    pub fn try_insert(&mut self, item: &CallHierarchyItem) -> Result<Insertion, Refusal> {
        let mut parent: Option<SymbolId> = None;

        let (parent, index, adopted) = loop {
            let siblings = self.siblings(parent);

            if let Some(&existing) = siblings
                .iter()
                .find(|&&id| self.node(id).selection_range.start == item.selection_range.start)
            {
                return Ok(Insertion::AlreadyPresent(existing));
            }

            let index = siblings
                .iter()
                .position(|&id| self.node(id).range.start > item.range.start)
                .unwrap_or(siblings.len());

            if index > 0 {
                let preceding = siblings[index - 1];
                let node = self.node(preceding);
                if node.range.contains(&item.range) {
                    if !node.kind.is_function_like() {
                        return Err(Refusal::NonFunctionContainer(node.kind));
                    }
                    parent = Some(preceding);
                    continue;
                }
                if node.range.end > item.range.start {
                    return Err(Refusal::PartialOverlap);
                }
            }

            let Some(parent) = parent else {
                return Err(Refusal::NoEnclosingFunction);
            };

            let adopted = siblings[index..]
                .iter()
                .take_while(|&&id| item.range.contains(&self.node(id).range))
                .count();
            if let Some(&next) = siblings.get(index + adopted) {
                if self.node(next).range.start < item.range.end {
                    return Err(Refusal::PartialOverlap);
                }
            }

            break (parent, index, adopted);
        };

        let children: Vec<SymbolId> = self
            .siblings_mut(Some(parent))
            .drain(index..index + adopted)
            .collect();
        let mut node = SymbolNode::from(item);
        node.children = children;
        let id = self.alloc(node);
        self.siblings_mut(Some(parent)).insert(index, id);

        Ok(Insertion::Inserted(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::symbol::{Position, Range, Symbol};

    fn sym(name: &str, kind: SymbolKind, range: Range) -> Symbol {
        Symbol::new(
            name,
            kind,
            range,
            Range::new(range.start, Position::new(range.start.line, range.start.character + 1)),
        )
    }

    fn item(name: &str, range: Range) -> CallHierarchyItem {
        CallHierarchyItem {
            name: name.to_string(),
            kind: SymbolKind::Function,
            path: "/ws/main.go".to_string(),
            range,
            selection_range: Range::new(
                range.start,
                Position::new(range.start.line, range.start.character + 4),
            ),
        }
    }

    fn names(tree: &SymbolTree, ids: &[SymbolId]) -> Vec<String> {
        ids.iter().map(|&id| tree.node(id).name.clone()).collect()
    }

    #[test]
    fn test_inserts_closure_inside_function() {
        let mut tree = SymbolTree::from_symbols(vec![
            sym("main", SymbolKind::Function, Range::from_coords(0, 0, 30, 1)),
            sym("helper", SymbolKind::Function, Range::from_coords(32, 0, 40, 1)),
        ]);
        let closure = item("func1", Range::from_coords(5, 8, 9, 2));

        let outcome = tree.try_insert(&closure).unwrap();
        let Insertion::Inserted(id) = outcome else {
            panic!("expected insertion, got {:?}", outcome);
        };
        let main = tree.roots()[0];
        assert_eq!(tree.node(main).children(), &[id]);
        assert_eq!(tree.node(id).name, "func1");
        assert_eq!(tree.find_by_selection_start(Position::new(5, 8)), Some(id));

        // A second attempt finds it in place.
        assert_eq!(tree.try_insert(&closure), Ok(Insertion::AlreadyPresent(id)));
    }

    #[test]
    fn test_contained_sibling_becomes_sole_child() {
        let mut tree = SymbolTree::from_symbols(vec![sym(
            "outer",
            SymbolKind::Function,
            Range::from_coords(0, 0, 50, 1),
        )
        .with_children(vec![
            sym("before", SymbolKind::Function, Range::from_coords(2, 0, 5, 0)),
            sym("nested", SymbolKind::Function, Range::from_coords(12, 0, 15, 0))
                .with_children(vec![sym("deep", SymbolKind::Function, Range::from_coords(13, 0, 14, 0))]),
            sym("after", SymbolKind::Function, Range::from_coords(30, 0, 35, 0)),
        ])]);

        let target = item("wrapper", Range::from_coords(10, 0, 20, 0));
        let Ok(Insertion::Inserted(id)) = tree.try_insert(&target) else {
            panic!("insertion refused");
        };

        let outer = tree.roots()[0];
        assert_eq!(names(&tree, tree.node(outer).children()), vec!["before", "wrapper", "after"]);
        assert_eq!(names(&tree, tree.node(id).children()), vec!["nested"]);
        let nested = tree.node(id).children()[0];
        assert!(tree.node(id).range.contains(&tree.node(nested).range));
        // What was nested one level deeper stays there.
        assert_eq!(names(&tree, tree.node(nested).children()), vec!["deep"]);
    }

    #[test]
    fn test_adopts_every_contained_sibling() {
        let mut tree = SymbolTree::from_symbols(vec![sym(
            "outer",
            SymbolKind::Method,
            Range::from_coords(0, 0, 50, 1),
        )
        .with_children(vec![
            sym("a", SymbolKind::Function, Range::from_coords(11, 0, 12, 0)),
            sym("b", SymbolKind::Function, Range::from_coords(14, 0, 16, 0)),
        ])]);
        let Ok(Insertion::Inserted(id)) = tree.try_insert(&item("wrap", Range::from_coords(10, 0, 20, 0))) else {
            panic!("insertion refused");
        };
        assert_eq!(names(&tree, tree.node(id).children()), vec!["a", "b"]);
        assert_eq!(tree.node(tree.roots()[0]).children(), &[id]);
    }

    #[test]
    fn test_refuses_inside_non_function_container() {
        // type T struct { ... } with nothing enclosing the target but T.
        let mut tree = SymbolTree::from_symbols(vec![sym(
            "T",
            SymbolKind::Struct,
            Range::from_coords(2, 0, 8, 1),
        )]);
        let before = tree.clone();
        assert_eq!(
            tree.try_insert(&item("anon", Range::from_coords(4, 2, 5, 0))),
            Err(Refusal::NonFunctionContainer(SymbolKind::Struct))
        );
        assert_eq!(tree, before);
    }

    #[test]
    fn test_refuses_at_top_level() {
        let mut tree = SymbolTree::from_symbols(vec![
            sym("a", SymbolKind::Function, Range::from_coords(0, 0, 3, 1)),
            sym("b", SymbolKind::Function, Range::from_coords(10, 0, 13, 1)),
        ]);
        assert_eq!(
            tree.try_insert(&item("missing", Range::from_coords(5, 0, 7, 1))),
            Err(Refusal::NoEnclosingFunction)
        );
        let mut empty = SymbolTree::default();
        assert_eq!(
            empty.try_insert(&item("x", Range::from_coords(0, 0, 1, 0))),
            Err(Refusal::NoEnclosingFunction)
        );
    }

    #[test]
    fn test_refuses_partial_overlap() {
        let outer = || {
            sym("outer", SymbolKind::Function, Range::from_coords(0, 0, 50, 1)).with_children(vec![sym(
                "straddle",
                SymbolKind::Function,
                Range::from_coords(15, 0, 25, 0),
            )])
        };

        // Target starts before `straddle` and ends inside it.
        let mut tree = SymbolTree::from_symbols(vec![outer()]);
        assert_eq!(
            tree.try_insert(&item("left", Range::from_coords(10, 0, 20, 0))),
            Err(Refusal::PartialOverlap)
        );

        // Target starts inside `straddle` and ends after it.
        let mut tree = SymbolTree::from_symbols(vec![outer()]);
        assert_eq!(
            tree.try_insert(&item("right", Range::from_coords(20, 0, 30, 0))),
            Err(Refusal::PartialOverlap)
        );
    }
}
