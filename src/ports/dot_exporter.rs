//! Graphviz DOT Exporter
//!
//! Renders a GraphDocument as DOT with one HTML-like table per file.
//! Anchors (`fileId:line_column`) appear as element ids so a viewer can map
//! clicks back through the symbol lookup.

use serde::Deserialize;

use crate::domain::graph::{Cell, CssClass, Edge, GraphDocument, Style, Subgraph, TableNode};
use crate::ports::DocumentExporter;

/// Layout knobs read from the `[render]` table of the config file.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub rankdir: String,
    pub ranksep: f32,
    pub fontname: String,
    pub fontsize: u32,
    pub cell_width: u32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            rankdir: "LR".to_string(),
            ranksep: 2.0,
            fontname: "Arial".to_string(),
            fontsize: 16,
            cell_width: 230,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct DotExporter {
    config: RenderConfig,
}

impl DotExporter {
    pub fn new(config: RenderConfig) -> Self {
        Self { config }
    }

    /// Convert a GraphDocument to DOT string.
    pub fn to_dot(&self, doc: &GraphDocument) -> String {
        let cfg = &self.config;
        let mut lines = Vec::new();

        lines.push("digraph {".to_string());
        lines.push(format!(
            "    graph [rankdir=\"{}\", ranksep={:.1}, fontname=\"{}\"];",
            cfg.rankdir, cfg.ranksep, cfg.fontname
        ));
        lines.push(format!(
            "    node [fontsize=\"{}\", fontname=\"{}\", shape=\"plaintext\", style=\"rounded, filled\"];",
            cfg.fontsize, cfg.fontname
        ));
        lines.push("    edge [label=\" \"];".to_string());
        lines.push(String::new());

        for table in &doc.tables {
            self.push_table(table, &mut lines);
        }

        lines.push(String::new());
        for subgraph in &doc.subgraphs {
            push_cluster(subgraph, 1, &mut lines);
        }

        lines.push(String::new());
        for edge in &doc.edges {
            lines.push(format!("    {}", edge_line(edge)));
        }

        lines.push("}".to_string());
        lines.push(String::new());
        lines.join("\n")
    }

    fn push_table(&self, table: &TableNode, lines: &mut Vec<String>) {
        lines.push(format!("    \"{}\" [id=\"{}\", label=<", table.id, table.id));
        lines.push(
            "        <TABLE BORDER=\"0\" CELLBORDER=\"1\" CELLSPACING=\"8\" CELLPADDING=\"4\">".to_string(),
        );
        lines.push(format!(
            "        <TR><TD WIDTH=\"{}\" BORDER=\"0\" CELLPADDING=\"6\" HREF=\"remove_me_url.title\">{}</TD></TR>",
            self.config.cell_width,
            escape_html(&table.title)
        ));
        for cell in &table.sections {
            push_cell(table, cell, 2, lines);
        }
        lines.push(
            "        <TR><TD CELLSPACING=\"0\" HEIGHT=\"1\" WIDTH=\"1\" FIXEDSIZE=\"TRUE\" STYLE=\"invis\"></TD></TR>"
                .to_string(),
        );
        lines.push("        </TABLE>".to_string());
        lines.push("    >];".to_string());
    }
}

impl DocumentExporter for DotExporter {
    fn render(&self, doc: &GraphDocument) -> String {
        self.to_dot(doc)
    }
}

// A leaf is one row; a cell with children becomes a row holding a nested
// table whose first row is the cell's own port.
fn push_cell(table: &TableNode, cell: &Cell, depth: usize, lines: &mut Vec<String>) {
    let indent = "    ".repeat(depth);
    let port = format!("{}_{}", cell.range_start.line, cell.range_start.character);
    let id = format!("{}:{}", table.id, port);
    let title = cell_title(cell);

    if cell.children.is_empty() {
        lines.push(format!(
            "{}<TR><TD PORT=\"{}\" ID=\"{}\"{}{}>{}</TD></TR>",
            indent,
            port,
            id,
            style_attrs(&cell.style),
            href_attr(&cell.style.classes),
            title
        ));
        return;
    }

    lines.push(format!("{}<TR><TD BORDER=\"0\" CELLPADDING=\"0\">", indent));
    lines.push(format!(
        "{}<TABLE ID=\"{}\" CELLSPACING=\"8\" CELLPADDING=\"4\" CELLBORDER=\"1\"{} BGCOLOR=\"green\"{}>",
        indent,
        id,
        style_attrs(&cell.style),
        href_attr(&cell.style.classes)
    ));
    lines.push(format!(
        "{}<TR><TD PORT=\"{}\" BORDER=\"0\">{}</TD></TR>",
        indent, port, title
    ));
    for child in &cell.children {
        push_cell(table, child, depth + 1, lines);
    }
    lines.push(format!("{}</TABLE>", indent));
    lines.push(format!("{}</TD></TR>", indent));
}

fn cell_title(cell: &Cell) -> String {
    match cell.style.icon {
        Some(icon) => format!("<B>{}</B>  {}", escape_html(&icon.to_string()), escape_html(&cell.title)),
        None => escape_html(&cell.title),
    }
}

fn style_attrs(style: &Style) -> String {
    let mut attrs = String::new();
    if let Some(border) = style.border {
        attrs.push_str(&format!(" BORDER=\"{}\"", border));
    }
    if style.rounded {
        attrs.push_str(" STYLE=\"ROUNDED\"");
    }
    attrs
}

// Graphviz drops unknown attributes on HTML cells, so classes travel in the
// href and are stripped back out by the viewer.
fn href_attr(classes: &[CssClass]) -> String {
    if classes.is_empty() {
        return String::new();
    }
    let joined: Vec<&str> = classes.iter().map(|c| c.as_str()).collect();
    format!(" href=\"remove_me_url.{}\"", joined.join("."))
}

fn edge_line(edge: &Edge) -> String {
    let mut attrs = vec![format!("id=\"{} -> {}\"", edge.from, edge.to)];
    if !edge.classes.is_empty() {
        let joined: Vec<&str> = edge.classes.iter().map(|c| c.as_str()).collect();
        attrs.push(format!("class=\"{}\"", joined.join(" ")));
    }
    format!(
        "{}:\"{}\" -> {}:\"{}\" [{}];",
        edge.from.file_id,
        edge.from.port(),
        edge.to.file_id,
        edge.to.port(),
        attrs.join(", ")
    )
}

fn push_cluster(subgraph: &Subgraph, depth: usize, lines: &mut Vec<String>) {
    let indent = "    ".repeat(depth);
    lines.push(format!(
        "{}subgraph \"cluster_{}\" {{",
        indent,
        escape_label(&subgraph.path)
    ));
    lines.push(format!("{}    label = \"{}\";", indent, escape_label(&subgraph.title)));
    if !subgraph.nodes.is_empty() {
        let nodes: Vec<String> = subgraph.nodes.iter().map(|id| format!("\"{}\"", id)).collect();
        lines.push(format!("{}    {};", indent, nodes.join(" ")));
    }
    for nested in &subgraph.subgraphs {
        push_cluster(nested, depth + 1, lines);
    }
    lines.push(format!("{}}}", indent));
}

fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('"', "&quot;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn escape_label(label: &str) -> String {
    label.replace('\\', "\\\\").replace('"', "\\\"")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::location::{CellId, FileId};
    use crate::domain::symbol::Position;

    fn leaf(line: u32, col: u32, title: &str, style: Style) -> Cell {
        Cell {
            range_start: Position::new(line, col),
            range_end: Position::new(line, col + title.len() as u32),
            title: title.to_string(),
            style,
            children: vec![],
        }
    }

    fn sample() -> GraphDocument {
        let mut run = leaf(3, 5, "run", Style::rounded(&[CssClass::Cell, CssClass::Function]));
        run.children = vec![leaf(
            5,
            9,
            "run.func1",
            Style::rounded(&[CssClass::Cell, CssClass::Function]),
        )];
        GraphDocument {
            tables: vec![
                TableNode {
                    id: FileId(1),
                    title: "main.go".to_string(),
                    sections: vec![run],
                },
                TableNode {
                    id: FileId(2),
                    title: "types.go".to_string(),
                    sections: vec![leaf(
                        1,
                        5,
                        "Pair<K, V>",
                        Style::icon('S', &[CssClass::Cell, CssClass::Type]),
                    )],
                },
            ],
            edges: vec![Edge::new(
                CellId::new(FileId(1), Position::new(5, 9)),
                CellId::new(FileId(2), Position::new(1, 5)),
                vec![CssClass::Impl],
            )],
            subgraphs: vec![Subgraph {
                title: "cmd".to_string(),
                path: "cmd".to_string(),
                nodes: vec![FileId(1)],
                subgraphs: vec![Subgraph {
                    title: "types".to_string(),
                    path: "cmd/types".to_string(),
                    nodes: vec![FileId(2)],
                    subgraphs: vec![],
                }],
            }],
        }
    }

    #[test]
    fn test_to_dot() {
        let dot = DotExporter::default().to_dot(&sample());
        assert!(dot.starts_with("digraph {"));
        assert!(dot.contains("rankdir=\"LR\""));
        assert!(dot.contains("ranksep=2.0"));
        assert!(dot.contains("\"1\" [id=\"1\", label=<"));
        assert!(dot.contains("HREF=\"remove_me_url.title\">main.go</TD>"));
    }

    #[test]
    fn test_cells_carry_ports_and_ids() {
        let dot = DotExporter::default().to_dot(&sample());
        // Nested table for the parent, leaf row for the closure.
        assert!(dot.contains("<TABLE ID=\"1:3_5\""));
        assert!(dot.contains("<TR><TD PORT=\"3_5\" BORDER=\"0\">run</TD></TR>"));
        assert!(dot.contains(
            "<TR><TD PORT=\"5_9\" ID=\"1:5_9\" STYLE=\"ROUNDED\" href=\"remove_me_url.cell.function\">run.func1</TD></TR>"
        ));
        assert!(dot.contains("<B>S</B>  Pair&lt;K, V&gt;"));
    }

    #[test]
    fn test_edges_and_clusters() {
        let dot = DotExporter::default().to_dot(&sample());
        assert!(dot.contains("1:\"5_9\" -> 2:\"1_5\" [id=\"1:5_9 -> 2:1_5\", class=\"impl\"];"));
        assert!(dot.contains("subgraph \"cluster_cmd\" {"));
        assert!(dot.contains("subgraph \"cluster_cmd/types\" {"));
        assert!(dot.contains("label = \"types\";"));
        assert!(dot.contains("\"2\";"));
    }

    #[test]
    fn test_render_config_overrides() {
        let config = RenderConfig {
            rankdir: "TB".to_string(),
            fontsize: 12,
            ..RenderConfig::default()
        };
        let dot = DotExporter::new(config).render(&GraphDocument::default());
        assert!(dot.contains("rankdir=\"TB\""));
        assert!(dot.contains("fontsize=\"12\""));
        assert!(dot.contains("fontname=\"Arial\""));
    }

    #[test]
    fn test_export_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("graph.dot");
        let exporter = DotExporter::default();
        exporter.export(&sample(), &path).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), exporter.to_dot(&sample()));
    }
}
