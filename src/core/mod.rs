//! Core transformation engine.
//!
//! A run over one module goes through these pieces:
//!
//! - `parsers`: parse the source and keep its comments
//! - `annotations`: read comment tags attached to declarations
//! - `registry`: annotation kinds and their handlers, in dispatch order
//! - `dispatch`: walk the tree and invoke matching handlers
//! - `deferred`: finalize-time actions, executed once per run
//! - `descriptor`: deployment descriptor accumulated by handlers
//! - `driver`: tie the above together for a single module
//! - `emit`: print the transformed module as JavaScript
//! - `sink`: persist the resulting descriptor and module

pub mod annotations;
pub mod builder;
pub mod context;
pub mod deferred;
pub mod descriptor;
pub mod dispatch;
pub mod driver;
pub mod emit;
pub mod parsers;
pub mod registry;
pub mod sink;

pub use annotations::{Annotation, extract_annotations, parse_annotations};
pub use context::RunContext;
pub use descriptor::{Descriptor, EventSpec, FunctionSpec};
pub use driver::{RunOutput, run_module};
pub use registry::{AnnotationKindDefinition, NodeKind, Registry};
