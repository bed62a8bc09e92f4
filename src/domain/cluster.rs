//! Directory clustering.
//!
//! Files are grouped by parent directory and the groups are nested into a
//! subgraph tree keyed by path relative to the workspace root.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::domain::graph::Subgraph;
use crate::domain::location::FileId;
use crate::domain::symbol::FileOutline;

pub fn subgraphs(root: &str, files: &[FileOutline]) -> Vec<Subgraph> {
    // PathBuf ordering is component-wise, so a directory always sorts before
    // its descendants and is in place by the time they are inserted.
    let mut dirs: BTreeMap<PathBuf, Vec<FileId>> = BTreeMap::new();
    for file in files {
        let parent = Path::new(&file.path)
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        dirs.entry(parent).or_default().push(file.id);
    }

    let mut subgraphs = Vec::new();
    for (dir, nodes) in dirs {
        let relative = relative_dir(root, &dir);
        insert_subgraph(&relative, &relative, nodes, &mut subgraphs);
    }
    subgraphs
}

fn relative_dir(root: &str, dir: &Path) -> PathBuf {
    match dir.strip_prefix(root) {
        Ok(rel) if !rel.as_os_str().is_empty() => rel.to_path_buf(),
        _ if !dir.as_os_str().is_empty() => dir.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

fn insert_subgraph(dir: &Path, full: &Path, nodes: Vec<FileId>, subgraphs: &mut Vec<Subgraph>) {
    let ancestor = subgraphs
        .iter_mut()
        .find(|g| dir.starts_with(&g.title));

    match ancestor {
        Some(ancestor) => {
            let rest = dir.strip_prefix(&ancestor.title).unwrap_or(dir);
            if rest.as_os_str().is_empty() {
                ancestor.nodes.extend(nodes);
            } else {
                insert_subgraph(rest, full, nodes, &mut ancestor.subgraphs);
            }
        }
        None => subgraphs.push(Subgraph {
            title: dir.to_string_lossy().into_owned(),
            path: full.to_string_lossy().into_owned(),
            nodes,
            subgraphs: Vec::new(),
        }),
    }
}
