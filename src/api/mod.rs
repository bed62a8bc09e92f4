//! Entry points shared by the command line and the daemon.

use anyhow::{anyhow, Context, Result};

use crate::application::{FocusUsecase, GenerateUsecase, Generated};
use crate::domain::language::Language;
use crate::domain::location::SymbolLocation;
use crate::infrastructure::snapshot::SnapshotSource;

pub mod dto;
pub mod server;

use dto::GenerateRequest;

/// Load the snapshot named by `request` and build its graph.
pub fn generate(request: &GenerateRequest) -> Result<Generated> {
    let source = SnapshotSource::load(&request.snapshot)?;

    let language = match request.lang.as_deref() {
        Some(name) => Some(Language::from_name(name).ok_or_else(|| anyhow!("Unknown language: {}", name))?),
        None => source.language(),
    };
    let root = request
        .root
        .clone()
        .unwrap_or_else(|| source.root().to_string());

    let generated = match request.focus.as_deref() {
        Some(focus) => {
            let anchor: SymbolLocation = focus.parse()?;
            FocusUsecase::new(&source, root)
                .with_language(language)
                .with_max_depth(request.depth)
                .run(&anchor)
                .with_context(|| format!("Failed to generate call graph around {}", focus))?
        }
        None => GenerateUsecase::new(&source, root)
            .with_language(language)
            .run_all()
            .context("Failed to generate call graph")?,
    };
    Ok(generated)
}
