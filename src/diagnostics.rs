//! Non-fatal diagnostics recorded during a run.
//!
//! Failed preconditions never abort a run: the affected handler is skipped and
//! a [`Warning`] is recorded. The CLI reporter prints them; library users read
//! them from the run output.

use std::fmt;

/// 1-based line, 0-based column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

/// Source location of a diagnostic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    pub file_path: String,
    pub position: Option<Position>,
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.position {
            Some(Position { line, column }) => write!(f, "{}:{}:{}", self.file_path, line, column),
            None => write!(f, "{}", self.file_path),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WarningKind {
    /// A dependent annotation without its `depends_on` annotation on the same node.
    MissingDependency {
        annotation: String,
        depends_on: String,
    },
    /// A generic handler dropped because the node kind has annotation-specific handlers.
    GenericHandlerShadowed { node_kind: String },
    /// A handler returned an error; the node is left as the handler found it.
    HandlerFailed { annotation: String, message: String },
    /// A remote call outside any function that can be made async.
    RemoteCallNotAwaitable { callee: String },
    /// Provider name without a dedicated registry.
    UnknownProvider { name: String, fallback: String },
}

impl fmt::Display for WarningKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WarningKind::MissingDependency {
                annotation,
                depends_on,
            } => write!(
                f,
                "@{} depends on @{}, which is not defined. @{} will be skipped.",
                annotation, depends_on, annotation
            ),
            WarningKind::GenericHandlerShadowed { node_kind } => write!(
                f,
                "{} already has annotation-specific handlers. Generic handlers for it will be skipped.",
                node_kind
            ),
            WarningKind::HandlerFailed {
                annotation,
                message,
            } => write!(f, "@{} skipped: {}", annotation, message),
            WarningKind::RemoteCallNotAwaitable { callee } => write!(
                f,
                "call to {} is not inside a function that can be made async and was left unchanged",
                callee
            ),
            WarningKind::UnknownProvider { name, fallback } => write!(
                f,
                "unknown provider \"{}\", using the {} annotations",
                name, fallback
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Warning {
    pub kind: WarningKind,
    pub location: Option<Location>,
}

impl Warning {
    pub fn new(kind: WarningKind) -> Self {
        Self {
            kind,
            location: None,
        }
    }

    pub fn at(kind: WarningKind, location: Location) -> Self {
        Self {
            kind,
            location: Some(location),
        }
    }
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.location {
            Some(location) => write!(f, "({}) {}", location, self.kind),
            None => write!(f, "{}", self.kind),
        }
    }
}
