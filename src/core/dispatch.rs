//! Traversal dispatcher.
//!
//! Walks a module with `VisitMut` and hands nodes to the registry's handlers:
//!
//! - Declarations are dispatched on entry, before their children are visited,
//!   so the body of a rewritten declaration is still traversed.
//! - Call expressions are dispatched after their arguments are visited; a
//!   replacement produced by a handler is not visited again.
//!
//! The dispatcher keeps a stack of enclosing function scopes so handlers can
//! mark the nearest enclosing function async.

use swc_common::{BytePos, SourceMap, Spanned};
use swc_ecma_ast::{
    ArrowExpr, ClassMethod, ClassProp, Constructor, Decl, Expr, Function, GetterProp, MethodKind,
    PrivateProp, SetterProp, StaticBlock, Stmt,
};
use swc_ecma_visit::{VisitMut, VisitMutWith};

use crate::diagnostics::{Position, WarningKind};

use super::annotations::extract_annotations;
use super::context::RunContext;
use super::parsers::source::ExtractedComments;
use super::registry::{Node, NodeContext, NodeKind, Registry};

pub struct Dispatcher<'a> {
    registry: &'a Registry,
    cx: &'a mut RunContext,
    comments: &'a ExtractedComments,
    source_map: &'a SourceMap,
    /// Pending `is_async` flag per enclosing function, `None` where a body cannot be async.
    fn_scopes: Vec<Option<bool>>,
}

impl<'a> Dispatcher<'a> {
    pub fn new(
        registry: &'a Registry,
        cx: &'a mut RunContext,
        comments: &'a ExtractedComments,
        source_map: &'a SourceMap,
    ) -> Self {
        Self {
            registry,
            cx,
            comments,
            source_map,
            fn_scopes: Vec::new(),
        }
    }

    fn position(&self, pos: BytePos) -> Option<Position> {
        if pos.0 == 0 {
            return None;
        }
        let loc = self.source_map.lookup_char_pos(pos);
        Some(Position {
            line: loc.line,
            column: loc.col.0,
        })
    }

    fn dispatch(&mut self, kind: NodeKind, pos: BytePos, mut node: Node<'_>) {
        self.dispatch_annotated(kind, pos, &mut node);
        self.dispatch_generic(kind, pos, &mut node);
    }

    fn dispatch_annotated(&mut self, kind: NodeKind, pos: BytePos, node: &mut Node<'_>) {
        let registry = self.registry;
        let entries = registry.specific(kind);
        if entries.is_empty() {
            return;
        }
        let Some(comments) = self.comments.leading_at(pos) else {
            return;
        };
        let annotations = extract_annotations(comments);
        if annotations.is_empty() {
            return;
        }
        let position = self.position(pos);

        for entry in entries {
            let definition = registry.definition(entry.definition);
            let Some(annotation) = annotations.iter().find(|a| a.name == definition.name) else {
                continue;
            };

            if let Some(depends_on) = definition.depends_on
                && !annotations.iter().any(|a| a.name == depends_on)
            {
                self.cx.warn(
                    WarningKind::MissingDependency {
                        annotation: definition.name.to_string(),
                        depends_on: depends_on.to_string(),
                    },
                    position,
                );
                continue;
            }

            let mut context = NodeContext::new(
                kind,
                node.reborrow(),
                position,
                enclosing_async(&mut self.fn_scopes),
            );
            if let Err(err) = (entry.handler)(annotation, &mut context, self.cx) {
                self.cx.warn(
                    WarningKind::HandlerFailed {
                        annotation: definition.name.to_string(),
                        message: err.to_string(),
                    },
                    position,
                );
            }
        }
    }

    fn dispatch_generic(&mut self, kind: NodeKind, pos: BytePos, node: &mut Node<'_>) {
        let registry = self.registry;
        let entries = registry.generic(kind);
        if entries.is_empty() {
            return;
        }
        let position = self.position(pos);

        for entry in entries {
            let mut context = NodeContext::new(
                kind,
                node.reborrow(),
                position,
                enclosing_async(&mut self.fn_scopes),
            );
            if let Err(err) = (entry.handler)(&mut context, self.cx) {
                self.cx.warn(
                    WarningKind::HandlerFailed {
                        annotation: registry.definition(entry.definition).name.to_string(),
                        message: err.to_string(),
                    },
                    position,
                );
            }
        }
    }

    fn with_scope<F: FnOnce(&mut Self)>(&mut self, scope: Option<bool>, visit: F) -> Option<bool> {
        self.fn_scopes.push(scope);
        visit(self);
        self.fn_scopes.pop().flatten()
    }
}

fn enclosing_async(scopes: &mut [Option<bool>]) -> Option<&mut bool> {
    scopes.last_mut().and_then(Option::as_mut)
}

impl Node<'_> {
    fn reborrow(&mut self) -> Node<'_> {
        match self {
            Node::Stmt(stmt) => Node::Stmt(&mut **stmt),
            Node::Expr(expr) => Node::Expr(&mut **expr),
        }
    }
}

impl VisitMut for Dispatcher<'_> {
    fn visit_mut_stmt(&mut self, stmt: &mut Stmt) {
        let kind = match stmt {
            Stmt::Decl(Decl::Fn(_)) => Some(NodeKind::FunctionDeclaration),
            Stmt::Decl(Decl::Var(_)) => Some(NodeKind::VariableDeclaration),
            _ => None,
        };
        if let Some(kind) = kind {
            let pos = stmt.span_lo();
            self.dispatch(kind, pos, Node::Stmt(&mut *stmt));
        }
        stmt.visit_mut_children_with(self);
    }

    fn visit_mut_expr(&mut self, expr: &mut Expr) {
        expr.visit_mut_children_with(self);
        if matches!(expr, Expr::Call(_)) {
            let pos = expr.span_lo();
            self.dispatch(NodeKind::CallExpression, pos, Node::Expr(&mut *expr));
        }
    }

    // `await` is not allowed in parameter defaults, only the body opens an async scope.
    fn visit_mut_function(&mut self, function: &mut Function) {
        function.decorators.visit_mut_with(self);
        self.with_scope(None, |v| function.params.visit_mut_with(v));
        if self.with_scope(Some(false), |v| function.body.visit_mut_with(v)) == Some(true) {
            function.is_async = true;
        }
    }

    fn visit_mut_arrow_expr(&mut self, arrow: &mut ArrowExpr) {
        self.with_scope(None, |v| arrow.params.visit_mut_with(v));
        if self.with_scope(Some(false), |v| arrow.body.visit_mut_with(v)) == Some(true) {
            arrow.is_async = true;
        }
    }

    fn visit_mut_class_method(&mut self, method: &mut ClassMethod) {
        if method.kind == MethodKind::Method {
            method.visit_mut_children_with(self);
            return;
        }
        // Accessors cannot be async; visit their parts without opening an async scope.
        method.key.visit_mut_with(self);
        self.with_scope(None, |v| {
            method.function.params.visit_mut_with(v);
            method.function.body.visit_mut_with(v);
        });
    }

    fn visit_mut_constructor(&mut self, constructor: &mut Constructor) {
        self.with_scope(None, |v| constructor.visit_mut_children_with(v));
    }

    fn visit_mut_getter_prop(&mut self, prop: &mut GetterProp) {
        self.with_scope(None, |v| prop.visit_mut_children_with(v));
    }

    fn visit_mut_setter_prop(&mut self, prop: &mut SetterProp) {
        self.with_scope(None, |v| prop.visit_mut_children_with(v));
    }

    // Field initializers and static blocks run outside any enclosing function.
    fn visit_mut_class_prop(&mut self, prop: &mut ClassProp) {
        self.with_scope(None, |v| prop.visit_mut_children_with(v));
    }

    fn visit_mut_private_prop(&mut self, prop: &mut PrivateProp) {
        self.with_scope(None, |v| prop.visit_mut_children_with(v));
    }

    fn visit_mut_static_block(&mut self, block: &mut StaticBlock) {
        self.with_scope(None, |v| block.visit_mut_children_with(v));
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use anyhow::{Result, bail};
    use pretty_assertions::assert_eq;
    use swc_ecma_ast::{Module, ModuleItem};

    use super::*;
    use crate::config::ProjectConfig;
    use crate::core::annotations::Annotation;
    use crate::core::builder::SwcTreeBuilder;
    use crate::core::context::SourceInfo;
    use crate::core::descriptor::{EventSpec, FunctionSpec};
    use crate::core::parsers::source::parse_source;
    use crate::core::registry::AnnotationKindDefinition;

    // Every handler appends an `sns` event to the "calls" function so tests can
    // read back which handlers ran and in which order.
    fn record(cx: &mut RunContext, entry: String) {
        cx.descriptor.add_function_spec(
            "calls",
            FunctionSpec {
                events: vec![EventSpec::Sns(entry)],
                ..Default::default()
            },
        );
    }

    fn recorded(cx: &RunContext) -> Vec<String> {
        cx.descriptor
            .functions
            .get("calls")
            .map(|spec| {
                spec.events
                    .iter()
                    .map(|event| match event {
                        EventSpec::Sns(entry) => entry.clone(),
                        other => panic!("unexpected event {:?}", other),
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    fn base(annotation: &Annotation, node: &mut NodeContext<'_>, cx: &mut RunContext) -> Result<()> {
        record(cx, format!("{}:{}", annotation.name, node.kind));
        // Replace the declaration so later tests can observe tree mutation.
        if let Some(stmt) = node.stmt_mut() {
            *stmt = cx.builder.statements("exported = true;")?.remove(0);
        }
        Ok(())
    }

    fn child(annotation: &Annotation, node: &mut NodeContext<'_>, cx: &mut RunContext) -> Result<()> {
        let param = annotation.param("tag").unwrap_or("none").to_string();
        record(cx, format!("{}:{}:{}", annotation.name, node.kind, param));
        Ok(())
    }

    fn failing(_: &Annotation, _: &mut NodeContext<'_>, _: &mut RunContext) -> Result<()> {
        bail!("boom")
    }

    fn call_base(_: &Annotation, node: &mut NodeContext<'_>, cx: &mut RunContext) -> Result<()> {
        if let Some(stmt) = node.stmt_mut() {
            *stmt = cx.builder.statements("exported();")?.remove(0);
        }
        Ok(())
    }

    fn mark_async(node: &mut NodeContext<'_>, cx: &mut RunContext) -> Result<()> {
        let marked = node.mark_enclosing_async();
        record(cx, format!("call:{}", marked));
        Ok(())
    }

    fn registry() -> Registry {
        Registry::new(vec![
            AnnotationKindDefinition::new("child")
                .depends_on("base")
                .handler(NodeKind::FunctionDeclaration, child)
                .handler(NodeKind::VariableDeclaration, child),
            AnnotationKindDefinition::new("base")
                .handler(NodeKind::FunctionDeclaration, base)
                .handler(NodeKind::VariableDeclaration, base),
            AnnotationKindDefinition::new("broken").handler(NodeKind::FunctionDeclaration, failing),
            AnnotationKindDefinition::new("calls")
                .generic_handler(NodeKind::CallExpression, mark_async),
        ])
        .unwrap()
    }

    fn run(code: &str, registry: &Registry) -> (Module, RunContext) {
        let source_map = Arc::new(SourceMap::default());
        let parsed = parse_source(code.to_string(), "src/app.js", source_map.clone()).unwrap();
        let mut module = parsed.module;
        let mut cx = RunContext::new(
            SourceInfo::new("src/app.js"),
            ProjectConfig::default(),
            Box::new(SwcTreeBuilder::new(source_map.clone())),
        );
        {
            let mut dispatcher = Dispatcher::new(registry, &mut cx, &parsed.comments, &source_map);
            module.visit_mut_with(&mut dispatcher);
        }
        (module, cx)
    }

    fn is_fn_decl(item: &ModuleItem) -> bool {
        matches!(item, ModuleItem::Stmt(Stmt::Decl(Decl::Fn(_))))
    }

    #[test]
    fn test_handlers_run_in_registry_order() {
        let registry = registry();
        let (_, cx) = run("/** @base @child(tag=x) */\nfunction foo() {}", &registry);
        assert_eq!(
            recorded(&cx),
            vec!["child:FunctionDeclaration:x", "base:FunctionDeclaration"]
        );
        assert!(cx.warnings.is_empty());
    }

    #[test]
    fn test_unannotated_declarations_are_ignored() {
        let registry = registry();
        let (module, cx) = run("// plain comment\nfunction foo() {}\nconst x = 1;", &registry);
        assert!(recorded(&cx).is_empty());
        assert!(is_fn_decl(&module.body[0]));
    }

    #[test]
    fn test_missing_dependency_skips_and_warns() {
        let registry = registry();
        let (module, cx) = run("\n\n// @child(tag=y)\nfunction foo() {}", &registry);

        assert!(recorded(&cx).is_empty());
        assert!(is_fn_decl(&module.body[0]));
        assert_eq!(cx.warnings.len(), 1);
        let warning = &cx.warnings[0];
        assert_eq!(
            warning.kind,
            WarningKind::MissingDependency {
                annotation: "child".to_string(),
                depends_on: "base".to_string(),
            }
        );
        assert_eq!(
            warning.location.as_ref().unwrap().to_string(),
            "src/app.js:4:0"
        );
    }

    #[test]
    fn test_dependency_in_separate_declaration_does_not_count() {
        let registry = registry();
        let (_, cx) = run(
            "// @base\nfunction a() {}\n// @child\nfunction b() {}",
            &registry,
        );
        assert_eq!(recorded(&cx), vec!["base:FunctionDeclaration"]);
        assert_eq!(cx.warnings.len(), 1);
    }

    #[test]
    fn test_handler_failure_is_local() {
        let registry = registry();
        let (_, cx) = run(
            "// @broken\nfunction a() {}\n// @base\nfunction b() {}",
            &registry,
        );
        assert_eq!(recorded(&cx), vec!["base:FunctionDeclaration"]);
        assert!(matches!(
            &cx.warnings[0].kind,
            WarningKind::HandlerFailed { annotation, message } if annotation == "broken" && message == "boom"
        ));
    }

    #[test]
    fn test_variable_declarations_dispatch() {
        let registry = registry();
        let (module, cx) = run("// @base\nconst f = () => 1;", &registry);
        assert_eq!(recorded(&cx), vec!["base:VariableDeclaration"]);
        assert!(matches!(module.body[0], ModuleItem::Stmt(Stmt::Expr(_))));
    }

    #[test]
    fn test_nested_declarations_are_visited() {
        let registry = registry();
        let (_, cx) = run(
            "function outer() {\n  // @base\n  function inner() {}\n}",
            &registry,
        );
        assert_eq!(recorded(&cx), vec!["base:FunctionDeclaration"]);
    }

    #[test]
    fn test_generic_handler_marks_enclosing_function_async() {
        let registry = registry();
        let (module, cx) = run("function outer() { go(); }\ngo();", &registry);
        assert_eq!(recorded(&cx), vec!["call:true", "call:false"]);

        let ModuleItem::Stmt(Stmt::Decl(Decl::Fn(outer))) = &module.body[0] else {
            panic!("expected function declaration");
        };
        assert!(outer.function.is_async);
    }

    #[test]
    fn test_nearest_function_is_marked() {
        let registry = registry();
        let (module, _) = run("function outer() { const f = () => go(); }", &registry);
        let ModuleItem::Stmt(Stmt::Decl(Decl::Fn(outer))) = &module.body[0] else {
            panic!("expected function declaration");
        };
        assert!(!outer.function.is_async);
    }

    #[test]
    fn test_class_fields_are_not_awaitable() {
        let registry = registry();
        let (module, cx) = run(
            "function outer() {\n  class A {\n    x = go();\n    #y = go();\n    static { go(); }\n  }\n}",
            &registry,
        );
        assert_eq!(recorded(&cx), vec!["call:false", "call:false", "call:false"]);

        let ModuleItem::Stmt(Stmt::Decl(Decl::Fn(outer))) = &module.body[0] else {
            panic!("expected function declaration");
        };
        assert!(!outer.function.is_async);
    }

    #[test]
    fn test_parameter_defaults_are_not_awaitable() {
        let registry = registry();
        let (module, cx) = run(
            "function outer(x = go()) { return x; }\nconst inner = (y = go()) => y;",
            &registry,
        );
        assert_eq!(recorded(&cx), vec!["call:false", "call:false"]);

        let ModuleItem::Stmt(Stmt::Decl(Decl::Fn(outer))) = &module.body[0] else {
            panic!("expected function declaration");
        };
        assert!(!outer.function.is_async);
    }

    #[test]
    fn test_constructor_is_not_awaitable() {
        let registry = registry();
        let (_, cx) = run("class A { constructor() { go(); } }", &registry);
        assert_eq!(recorded(&cx), vec!["call:false"]);
    }

    #[test]
    fn test_replacement_is_traversed() {
        let registry = registry();
        let (_, cx) = run("// @base\nfunction foo() {}", &registry);
        assert_eq!(recorded(&cx), vec!["base:FunctionDeclaration"]);

        let registry = Registry::new(vec![
            AnnotationKindDefinition::new("base").handler(NodeKind::FunctionDeclaration, call_base),
            AnnotationKindDefinition::new("calls")
                .generic_handler(NodeKind::CallExpression, mark_async),
        ])
        .unwrap();
        let (_, cx) = run("// @base\nfunction foo() {}", &registry);
        assert_eq!(recorded(&cx), vec!["call:false"]);
    }
}
