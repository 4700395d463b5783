use std::path::Path;

use crate::config::ProjectConfig;
use crate::diagnostics::{Location, Position, Warning, WarningKind};

use super::builder::TreeBuilder;
use super::deferred::{DeferredAction, DeferredQueue};
use super::descriptor::Descriptor;

/// Identity of the module being transformed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceInfo {
    pub file_path: String,
    /// File name without extension, used in generated handler references.
    pub stem: String,
}

impl SourceInfo {
    pub fn new(file_path: &str) -> Self {
        let stem = Path::new(file_path)
            .file_stem()
            .and_then(|stem| stem.to_str())
            .unwrap_or(file_path)
            .to_string();
        Self {
            file_path: file_path.to_string(),
            stem,
        }
    }

    pub fn location(&self, position: Option<Position>) -> Location {
        Location {
            file_path: self.file_path.clone(),
            position,
        }
    }
}

/// Per-run state threaded through every handler and deferred action.
///
/// Created by the driver at run start and consumed when the run finishes, so
/// nothing leaks from one module into the next.
pub struct RunContext {
    pub source: SourceInfo,
    pub config: ProjectConfig,
    pub builder: Box<dyn TreeBuilder>,
    pub deferred: DeferredQueue,
    pub descriptor: Descriptor,
    pub warnings: Vec<Warning>,
}

impl RunContext {
    pub fn new(source: SourceInfo, config: ProjectConfig, builder: Box<dyn TreeBuilder>) -> Self {
        let descriptor = Descriptor::new(&config);
        Self {
            source,
            config,
            builder,
            deferred: DeferredQueue::default(),
            descriptor,
            warnings: Vec::new(),
        }
    }

    pub fn defer(&mut self, action: DeferredAction) {
        self.deferred.push(action);
    }

    pub fn warn(&mut self, kind: WarningKind, position: Option<Position>) {
        let location = self.source.location(position);
        self.warnings.push(Warning::at(kind, location));
    }

    /// Entry-point reference for a function exported from this module.
    pub fn handler_reference(&self, export_name: &str) -> String {
        format!("{}/{}.{}", self.config.out_dir, self.source.stem, export_name)
    }
}
