//! Tree construction for handlers and deferred actions.
//!
//! [`TreeBuilder`] offers node factories for the shapes handlers assemble by
//! hand and a template parser for larger generated code. Templates are parsed
//! into the run's SourceMap, so generated spans never overlap positions of the
//! transformed file.

use std::sync::Arc;

use anyhow::{Result, anyhow, bail};
use swc_common::{DUMMY_SP, FileName, Globals, SourceMap};
use swc_ecma_ast::{
    ArrowExpr, AssignExpr, AssignOp, AssignTarget, AwaitExpr, BlockStmtOrExpr, CallExpr, Callee,
    Decl, Expr, ExprOrSpread, ExprStmt, Ident, IdentName, MemberExpr, MemberProp, ModuleItem, Pat,
    SimpleAssignTarget, Stmt,
};
use swc_ecma_parser::{EsSyntax, Parser, StringInput, Syntax};

pub trait TreeBuilder {
    fn ident(&self, name: &str) -> Expr;

    /// `object.property`
    fn member(&self, object: Expr, property: &str) -> MemberExpr;

    fn call(&self, callee: Expr, args: Vec<ExprOrSpread>) -> Expr;

    fn await_expr(&self, arg: Expr) -> Expr;

    /// `target = value`
    fn assign(&self, target: MemberExpr, value: Expr) -> Expr;

    fn arrow(&self, params: Vec<Pat>, body: BlockStmtOrExpr, is_async: bool) -> Expr;

    fn expr_stmt(&self, expr: Expr) -> Stmt;

    fn string(&self, value: &str) -> Result<Expr>;

    /// Parse a single expression.
    fn expression(&self, template: &str) -> Result<Expr>;

    /// Parse statements as they would appear inside a function body.
    fn statements(&self, template: &str) -> Result<Vec<Stmt>>;

    /// Parse top-level module items.
    fn module_items(&self, template: &str) -> Result<Vec<ModuleItem>>;
}

/// Wrap an expression as a call argument.
pub fn arg(expr: Expr) -> ExprOrSpread {
    ExprOrSpread {
        spread: None,
        expr: Box::new(expr),
    }
}

const TEMPLATE_FN: &str = "__fusion_template__";

pub struct SwcTreeBuilder {
    source_map: Arc<SourceMap>,
}

impl SwcTreeBuilder {
    pub fn new(source_map: Arc<SourceMap>) -> Self {
        Self { source_map }
    }

    fn parse_module_items(&self, code: String) -> Result<Vec<ModuleItem>> {
        use swc_common::GLOBALS;

        GLOBALS.set(&Globals::new(), || {
            let source_file = self
                .source_map
                .new_source_file(FileName::Custom("template".into()).into(), code);
            let mut parser = Parser::new(
                Syntax::Es(EsSyntax::default()),
                StringInput::from(&*source_file),
                None,
            );
            let module = parser
                .parse_module()
                .map_err(|e| anyhow!("Failed to parse template: {:?}", e))?;
            Ok(module.body)
        })
    }
}

impl TreeBuilder for SwcTreeBuilder {
    fn ident(&self, name: &str) -> Expr {
        Expr::Ident(Ident::new_no_ctxt(name.into(), DUMMY_SP))
    }

    fn member(&self, object: Expr, property: &str) -> MemberExpr {
        MemberExpr {
            span: DUMMY_SP,
            obj: Box::new(object),
            prop: MemberProp::Ident(IdentName::new(property.into(), DUMMY_SP)),
        }
    }

    fn call(&self, callee: Expr, args: Vec<ExprOrSpread>) -> Expr {
        Expr::Call(CallExpr {
            span: DUMMY_SP,
            callee: Callee::Expr(Box::new(callee)),
            args,
            ..Default::default()
        })
    }

    fn await_expr(&self, arg: Expr) -> Expr {
        Expr::Await(AwaitExpr {
            span: DUMMY_SP,
            arg: Box::new(arg),
        })
    }

    fn assign(&self, target: MemberExpr, value: Expr) -> Expr {
        Expr::Assign(AssignExpr {
            span: DUMMY_SP,
            op: AssignOp::Assign,
            left: AssignTarget::Simple(SimpleAssignTarget::Member(target)),
            right: Box::new(value),
        })
    }

    fn arrow(&self, params: Vec<Pat>, body: BlockStmtOrExpr, is_async: bool) -> Expr {
        Expr::Arrow(ArrowExpr {
            span: DUMMY_SP,
            params,
            body: Box::new(body),
            is_async,
            ..Default::default()
        })
    }

    fn expr_stmt(&self, expr: Expr) -> Stmt {
        Stmt::Expr(ExprStmt {
            span: DUMMY_SP,
            expr: Box::new(expr),
        })
    }

    fn string(&self, value: &str) -> Result<Expr> {
        // A JSON string literal is also a valid JavaScript string literal.
        self.expression(&serde_json::to_string(value)?)
    }

    fn expression(&self, template: &str) -> Result<Expr> {
        let mut stmts = self.statements(&format!("({});", template))?;
        match stmts.pop() {
            Some(Stmt::Expr(ExprStmt { expr, .. })) if stmts.is_empty() => match *expr {
                Expr::Paren(paren) => Ok(*paren.expr),
                other => Ok(other),
            },
            _ => bail!("template is not a single expression: {}", template),
        }
    }

    fn statements(&self, template: &str) -> Result<Vec<Stmt>> {
        // Parse inside a function so `return` and `await` are accepted.
        let code = format!("async function {}() {{\n{}\n}}", TEMPLATE_FN, template);
        let mut items = self.parse_module_items(code)?;
        match items.pop() {
            Some(ModuleItem::Stmt(Stmt::Decl(Decl::Fn(fn_decl)))) if items.is_empty() => fn_decl
                .function
                .body
                .map(|body| body.stmts)
                .ok_or_else(|| anyhow!("template has no body")),
            _ => bail!("template is not a statement list"),
        }
    }

    fn module_items(&self, template: &str) -> Result<Vec<ModuleItem>> {
        self.parse_module_items(template.to_string())
    }
}
