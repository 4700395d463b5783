//! Fusion - annotation-driven serverless transformation
//!
//! Fusion reads comment annotations such as `// @cloudfunction` on the
//! functions of a JavaScript or TypeScript module, rewrites the annotated
//! functions into deployable handlers and synthesizes the deployment
//! descriptor (`serverless.yml`) that describes them.
//!
//! ## Module Structure
//!
//! - `aws`: AWS annotation kinds (`@cloudfunction`, `@warmup`, `@httpapi`, `@autotune`)
//! - `cli`: Command-line interface layer
//! - `config`: Project configuration loading
//! - `core`: Transformation engine (annotations, registry, dispatch, descriptor)
//! - `diagnostics`: Non-fatal warnings recorded during a run
//! - `pipeline`: Parse, transform and synthesize a single module
//! - `utils`: Shared utility functions

pub mod aws;
pub mod cli;
pub mod config;
pub mod core;
pub mod diagnostics;
pub mod pipeline;
pub mod utils;
