use std::fs;

use serde_json::json;
use tempfile::tempdir;

use callviz::api::{self, dto::GenerateRequest};
use callviz::ports::dot_exporter::DotExporter;
use callviz::ports::DocumentExporter;

fn range(sl: u32, sc: u32, el: u32, ec: u32) -> serde_json::Value {
    json!({
        "start": {"line": sl, "character": sc},
        "end": {"line": el, "character": ec}
    })
}

fn snapshot() -> serde_json::Value {
    json!({
        "root": "/ws",
        "files": [
            {
                "path": "/ws/cmd/server.go",
                "symbols": [
                    {"name": "Serve", "kind": "function", "range": range(3, 0, 20, 1), "selectionRange": range(3, 5, 3, 10)}
                ]
            },
            {
                "path": "/ws/internal/db/conn.go",
                "symbols": [
                    {"name": "Open", "kind": "function", "range": range(1, 0, 9, 1), "selectionRange": range(1, 5, 1, 9)}
                ]
            },
            {
                "path": "/ws/internal/db/conn_test.go",
                "symbols": [
                    {"name": "TestOpen", "kind": "function", "range": range(1, 0, 4, 1), "selectionRange": range(1, 5, 1, 13)}
                ]
            }
        ],
        "incomingCalls": [
            {
                "path": "/ws/internal/db/conn.go",
                "position": {"line": 1, "character": 5},
                "items": [
                    {"name": "Serve.func1", "kind": "function", "path": "/ws/cmd/server.go", "range": range(6, 8, 10, 2), "selectionRange": range(6, 8, 6, 12)},
                    {"name": "TestOpen", "kind": "function", "path": "/ws/internal/db/conn_test.go", "range": range(1, 0, 4, 1), "selectionRange": range(1, 5, 1, 13)}
                ]
            }
        ]
    })
}

#[test]
fn test_snapshot_to_dot() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("ws.json");
    fs::write(&path, snapshot().to_string()).unwrap();

    let request = GenerateRequest {
        snapshot: path,
        ..GenerateRequest::default()
    };
    let generated = api::generate(&request).unwrap();

    // Test files are filtered by the inferred Go policy.
    assert_eq!(generated.document.tables.len(), 2);
    assert_eq!(generated.stats.kept, 1);
    assert_eq!(generated.stats.unregistered, 1);
    assert_eq!(generated.stats.inserted_symbols, 1);
    assert_eq!(generated.lookup.get("1:6_8").unwrap().name, "Serve.func1");

    let dot = DotExporter::default().render(&generated.document);
    assert!(dot.contains("1:\"6_8\" -> 2:\"1_5\""));
    assert!(dot.contains("subgraph \"cluster_cmd\""));
    assert!(dot.contains("subgraph \"cluster_internal/db\""));
}

#[test]
fn test_outgoing_only_snapshot() {
    let snapshot = json!({
        "root": "/ws",
        "files": [
            {
                "path": "/ws/caller.go",
                "symbols": [
                    {"name": "main", "kind": "function", "range": range(2, 0, 6, 1), "selectionRange": range(2, 5, 2, 9)}
                ]
            },
            {
                "path": "/ws/callee.go",
                "symbols": [
                    {"name": "helper", "kind": "function", "range": range(5, 0, 8, 1), "selectionRange": range(5, 1, 5, 7)}
                ]
            }
        ],
        "outgoingCalls": [
            {
                "path": "/ws/caller.go",
                "position": {"line": 2, "character": 5},
                "items": [
                    {"name": "helper", "kind": "function", "path": "/ws/callee.go", "range": range(5, 0, 8, 1), "selectionRange": range(5, 1, 5, 7)}
                ]
            }
        ]
    });
    let dir = tempdir().unwrap();
    let path = dir.path().join("ws.json");
    fs::write(&path, snapshot.to_string()).unwrap();

    let request = GenerateRequest {
        snapshot: path,
        ..GenerateRequest::default()
    };
    let generated = api::generate(&request).unwrap();
    assert_eq!(generated.document.tables.len(), 2);
    assert_eq!(generated.document.edges.len(), 1);
    assert_eq!(generated.stats.kept, 1);

    let dot = DotExporter::default().render(&generated.document);
    assert!(dot.contains("1:\"2_5\" -> 2:\"5_1\""));
}

#[test]
fn test_focus_request() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("ws.json");
    fs::write(&path, snapshot().to_string()).unwrap();

    let request = GenerateRequest {
        snapshot: path,
        focus: Some("/ws/internal/db/conn.go:4:2".to_string()),
        ..GenerateRequest::default()
    };
    let generated = api::generate(&request).unwrap();
    assert_eq!(generated.document.tables[0].title, "conn.go");
    assert_eq!(generated.document.edges.len(), 1);
}

#[test]
fn test_unknown_language_is_rejected() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("ws.json");
    fs::write(&path, snapshot().to_string()).unwrap();

    let request = GenerateRequest {
        snapshot: path,
        lang: Some("cobol".to_string()),
        ..GenerateRequest::default()
    };
    let err = api::generate(&request).unwrap_err();
    assert!(err.to_string().contains("cobol"));
}
