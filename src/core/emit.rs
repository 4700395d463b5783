//! JavaScript emission for a transformed module.

use std::sync::Arc;

use anyhow::{Context, Result};
use swc_common::SourceMap;
use swc_ecma_ast::Module;
use swc_ecma_codegen::{Config, Emitter, text_writer::JsWriter};

/// Print the module as source text.
///
/// `source_map` must be the map the module was parsed with, generated nodes
/// carry spans from templates registered in the same map.
pub fn render_module(module: &Module, source_map: &Arc<SourceMap>) -> Result<String> {
    let mut buffer = Vec::new();
    {
        let mut emitter = Emitter {
            cfg: Config::default(),
            cm: source_map.clone(),
            comments: None,
            wr: JsWriter::new(source_map.clone(), "\n", &mut buffer, None),
        };
        emitter
            .emit_module(module)
            .context("Failed to emit transformed module")?;
    }
    String::from_utf8(buffer).context("Emitted module is not valid UTF-8")
}
