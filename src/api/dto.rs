use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::application::Generated;
use crate::domain::builder::BuildStats;
use crate::domain::lookup::SymbolLookup;
use crate::ports::DocumentExporter;

/// One graph-generation request, from the command line or a GENERATE call.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenerateRequest {
    pub snapshot: PathBuf,
    /// Overrides the snapshot's language; inferred from extensions if both
    /// are absent.
    #[serde(default)]
    pub lang: Option<String>,
    /// Overrides the snapshot's workspace root.
    #[serde(default)]
    pub root: Option<String>,
    /// `path:line:column` inside the function to center the graph on.
    #[serde(default)]
    pub focus: Option<String>,
    #[serde(default)]
    pub depth: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct GeneratedDto {
    pub dot: String,
    pub lookup: SymbolLookup,
    pub stats: BuildStats,
}

impl GeneratedDto {
    pub fn new(generated: Generated, exporter: &dyn DocumentExporter) -> Self {
        GeneratedDto {
            dot: exporter.render(&generated.document),
            lookup: generated.lookup,
            stats: generated.stats,
        }
    }
}
