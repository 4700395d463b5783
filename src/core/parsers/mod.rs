//! Source file parsing.
//!
//! - `source`: JavaScript/TypeScript parser (uses swc for AST generation)

pub mod source;
