//! Annotation kind registry.
//!
//! A registry is an ordered list of [`AnnotationKindDefinition`]s compiled into
//! a dispatch table: node kind → ordered `(definition, handler)` entries. The
//! `depends_on` references form a dependency graph that is validated when the
//! registry is built, so an unknown target or a cycle fails before any tree is
//! visited.

use std::collections::{HashMap, HashSet};
use std::fmt;

use anyhow::{Result, bail};
use swc_ecma_ast::{Expr, Stmt};

use crate::diagnostics::{Position, Warning, WarningKind};

use super::annotations::Annotation;
use super::context::RunContext;

/// Node kinds handlers can bind to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    FunctionDeclaration,
    VariableDeclaration,
    CallExpression,
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeKind::FunctionDeclaration => write!(f, "FunctionDeclaration"),
            NodeKind::VariableDeclaration => write!(f, "VariableDeclaration"),
            NodeKind::CallExpression => write!(f, "CallExpression"),
        }
    }
}

/// The node a handler operates on. Handlers may replace it wholesale.
pub enum Node<'a> {
    Stmt(&'a mut Stmt),
    Expr(&'a mut Expr),
}

/// What a handler sees of the node being visited.
pub struct NodeContext<'a> {
    pub kind: NodeKind,
    pub node: Node<'a>,
    pub position: Option<Position>,
    /// `is_async` flag of the nearest enclosing function, when it can be async.
    enclosing_async: Option<&'a mut bool>,
}

impl<'a> NodeContext<'a> {
    pub fn new(
        kind: NodeKind,
        node: Node<'a>,
        position: Option<Position>,
        enclosing_async: Option<&'a mut bool>,
    ) -> Self {
        Self {
            kind,
            node,
            position,
            enclosing_async,
        }
    }

    pub fn can_await(&self) -> bool {
        self.enclosing_async.is_some()
    }

    /// Mark the nearest enclosing function async. Returns false at module level.
    pub fn mark_enclosing_async(&mut self) -> bool {
        match self.enclosing_async.as_deref_mut() {
            Some(flag) => {
                *flag = true;
                true
            }
            None => false,
        }
    }

    pub fn stmt_mut(&mut self) -> Option<&mut Stmt> {
        match &mut self.node {
            Node::Stmt(stmt) => Some(&mut **stmt),
            Node::Expr(_) => None,
        }
    }

    pub fn expr_mut(&mut self) -> Option<&mut Expr> {
        match &mut self.node {
            Node::Expr(expr) => Some(&mut **expr),
            Node::Stmt(_) => None,
        }
    }
}

/// Handler bound to an annotation kind and a node kind.
pub type NodeHandler = fn(&Annotation, &mut NodeContext<'_>, &mut RunContext) -> Result<()>;

/// Handler invoked on every node of a kind, annotated or not.
pub type GenericHandler = fn(&mut NodeContext<'_>, &mut RunContext) -> Result<()>;

pub struct AnnotationKindDefinition {
    pub name: &'static str,
    pub depends_on: Option<&'static str>,
    pub handlers: Vec<(NodeKind, NodeHandler)>,
    pub generic_handlers: Vec<(NodeKind, GenericHandler)>,
}

impl AnnotationKindDefinition {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            depends_on: None,
            handlers: Vec::new(),
            generic_handlers: Vec::new(),
        }
    }

    pub fn depends_on(mut self, name: &'static str) -> Self {
        self.depends_on = Some(name);
        self
    }

    pub fn handler(mut self, kind: NodeKind, handler: NodeHandler) -> Self {
        self.handlers.push((kind, handler));
        self
    }

    pub fn generic_handler(mut self, kind: NodeKind, handler: GenericHandler) -> Self {
        self.generic_handlers.push((kind, handler));
        self
    }
}

/// A dispatch entry: index of the owning definition and its handler.
#[derive(Clone, Copy)]
pub struct SpecificEntry {
    pub definition: usize,
    pub handler: NodeHandler,
}

#[derive(Clone, Copy)]
pub struct GenericEntry {
    pub definition: usize,
    pub handler: GenericHandler,
}

pub struct Registry {
    definitions: Vec<AnnotationKindDefinition>,
    specific: HashMap<NodeKind, Vec<SpecificEntry>>,
    generic: HashMap<NodeKind, Vec<GenericEntry>>,
    warnings: Vec<Warning>,
}

impl Registry {
    /// Validate definitions and build the dispatch table.
    ///
    /// Fails on duplicate names, unknown `depends_on` targets and dependency
    /// cycles. Generic handlers for a node kind that also has annotation-specific
    /// handlers are dropped with a warning.
    pub fn new(definitions: Vec<AnnotationKindDefinition>) -> Result<Self> {
        validate_graph(&definitions)?;

        let mut specific: HashMap<NodeKind, Vec<SpecificEntry>> = HashMap::new();
        for (index, definition) in definitions.iter().enumerate() {
            for (kind, handler) in &definition.handlers {
                specific.entry(*kind).or_default().push(SpecificEntry {
                    definition: index,
                    handler: *handler,
                });
            }
        }

        let mut generic: HashMap<NodeKind, Vec<GenericEntry>> = HashMap::new();
        let mut warnings = Vec::new();
        let mut shadowed: HashSet<NodeKind> = HashSet::new();
        for (index, definition) in definitions.iter().enumerate() {
            for (kind, handler) in &definition.generic_handlers {
                if specific.contains_key(kind) {
                    if shadowed.insert(*kind) {
                        warnings.push(Warning::new(WarningKind::GenericHandlerShadowed {
                            node_kind: kind.to_string(),
                        }));
                    }
                    continue;
                }
                generic.entry(*kind).or_default().push(GenericEntry {
                    definition: index,
                    handler: *handler,
                });
            }
        }

        Ok(Self {
            definitions,
            specific,
            generic,
            warnings,
        })
    }

    pub fn definition(&self, index: usize) -> &AnnotationKindDefinition {
        &self.definitions[index]
    }

    /// Annotation-specific entries for a node kind, in registry order.
    pub fn specific(&self, kind: NodeKind) -> &[SpecificEntry] {
        self.specific.get(&kind).map(Vec::as_slice).unwrap_or_default()
    }

    /// Generic entries for a node kind, in registry order.
    pub fn generic(&self, kind: NodeKind) -> &[GenericEntry] {
        self.generic.get(&kind).map(Vec::as_slice).unwrap_or_default()
    }

    /// Warnings produced while building the dispatch table.
    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }
}

fn validate_graph(definitions: &[AnnotationKindDefinition]) -> Result<()> {
    let mut by_name: HashMap<&str, &AnnotationKindDefinition> = HashMap::new();
    for definition in definitions {
        if by_name.insert(definition.name, definition).is_some() {
            bail!("annotation @{} is defined more than once", definition.name);
        }
    }

    for definition in definitions {
        let mut visited = HashSet::from([definition.name]);
        let mut current = definition;
        while let Some(target) = current.depends_on {
            let Some(next) = by_name.get(target) else {
                bail!(
                    "annotation @{} depends on unknown annotation @{}",
                    current.name,
                    target
                );
            };
            if !visited.insert(next.name) {
                bail!("annotation @{} has a cyclic dependency", definition.name);
            }
            current = next;
        }
    }

    Ok(())
}
