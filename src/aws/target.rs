//! Function targets of the AWS annotations.
//!
//! An annotation can sit on a function declaration or on a variable
//! declaration with a single declarator initialized by a function or arrow
//! expression:
//!
//! ```js
//! // @cloudfunction
//! function resize(image) { ... }
//!
//! // @cloudfunction
//! const resize = async (image) => { ... };
//! ```

use std::mem;

use anyhow::{Result, bail};
use swc_common::DUMMY_SP;
use swc_ecma_ast::{
    ArrowExpr, BindingIdent, BlockStmt, BlockStmtOrExpr, Decl, Expr, Function, Invalid, Param, Pat,
    ReturnStmt, Stmt,
};

enum FunctionRef<'a> {
    Function(&'a mut Function),
    Arrow(&'a mut ArrowExpr),
}

/// Mutable view of an annotated function and the name it is declared under.
pub struct FunctionTarget<'a> {
    pub name: String,
    function: FunctionRef<'a>,
}

impl<'a> FunctionTarget<'a> {
    pub fn from_stmt(stmt: &'a mut Stmt) -> Result<Self> {
        match stmt {
            Stmt::Decl(Decl::Fn(decl)) => Ok(Self {
                name: decl.ident.sym.to_string(),
                function: FunctionRef::Function(&mut decl.function),
            }),
            Stmt::Decl(Decl::Var(var)) => {
                let [declarator] = var.decls.as_mut_slice() else {
                    bail!("only variable declarations with a single declarator are supported");
                };
                let Pat::Ident(binding) = &declarator.name else {
                    bail!("destructuring declarations are not supported");
                };
                let name = binding.id.sym.to_string();
                let function = match declarator.init.as_deref_mut() {
                    Some(Expr::Fn(fn_expr)) => FunctionRef::Function(&mut fn_expr.function),
                    Some(Expr::Arrow(arrow)) => FunctionRef::Arrow(arrow),
                    _ => bail!("\"{}\" is not initialized with a function", name),
                };
                Ok(Self { name, function })
            }
            _ => bail!("annotated node is not a function declaration"),
        }
    }

    fn first_param(&self) -> Option<&Pat> {
        match &self.function {
            FunctionRef::Function(function) => function.params.first().map(|param| &param.pat),
            FunctionRef::Arrow(arrow) => arrow.params.first(),
        }
    }

    /// Identifier of the first parameter, looking through a default value.
    ///
    /// `Ok(None)` when the function takes no parameters; an error when the
    /// first parameter is a pattern that cannot be referenced by name.
    pub fn first_param_name(&self) -> Result<Option<String>> {
        let pat = match self.first_param() {
            None => return Ok(None),
            Some(Pat::Assign(assign)) => &*assign.left,
            Some(pat) => pat,
        };
        match pat {
            Pat::Ident(binding) => Ok(Some(binding.id.sym.to_string())),
            _ => bail!("the first parameter of \"{}\" is not an identifier", self.name),
        }
    }

    /// Add a parameter named `name`. Only used for functions without parameters.
    pub fn push_param(&mut self, name: &str) {
        let pat = Pat::Ident(BindingIdent::from(swc_ecma_ast::Ident::new_no_ctxt(
            name.into(),
            DUMMY_SP,
        )));
        match &mut self.function {
            FunctionRef::Function(function) => function.params.push(Param::from(pat)),
            FunctionRef::Arrow(arrow) => arrow.params.push(pat),
        }
    }

    /// Insert statements at the top of the body.
    ///
    /// An arrow with an expression body gets a block body returning that
    /// expression.
    pub fn prepend(&mut self, stmts: Vec<Stmt>) {
        match &mut self.function {
            FunctionRef::Function(function) => {
                function
                    .body
                    .get_or_insert_with(BlockStmt::default)
                    .stmts
                    .splice(0..0, stmts);
            }
            FunctionRef::Arrow(arrow) => match &mut *arrow.body {
                BlockStmtOrExpr::BlockStmt(block) => {
                    block.stmts.splice(0..0, stmts);
                }
                BlockStmtOrExpr::Expr(expr) => {
                    let value = mem::replace(expr, Box::new(Expr::Invalid(Invalid { span: DUMMY_SP })));
                    let mut body = stmts;
                    body.push(Stmt::Return(ReturnStmt {
                        span: DUMMY_SP,
                        arg: Some(value),
                    }));
                    *arrow.body = BlockStmtOrExpr::BlockStmt(BlockStmt {
                        stmts: body,
                        ..Default::default()
                    });
                }
            },
        }
    }

    /// Move the parameters and body out, leaving the function empty.
    pub fn take_parts(self) -> (Vec<Pat>, BlockStmtOrExpr) {
        match self.function {
            FunctionRef::Function(function) => {
                let params = mem::take(&mut function.params)
                    .into_iter()
                    .map(|param| param.pat)
                    .collect();
                let body = function.body.take().unwrap_or_default();
                (params, BlockStmtOrExpr::BlockStmt(body))
            }
            FunctionRef::Arrow(arrow) => {
                let params = mem::take(&mut arrow.params);
                let body = mem::replace(
                    &mut *arrow.body,
                    BlockStmtOrExpr::BlockStmt(BlockStmt::default()),
                );
                (params, body)
            }
        }
    }
}
