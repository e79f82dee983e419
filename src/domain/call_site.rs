//! Call site discovery.
//!
//! Walks a function body and produces the call sites the resolver consumes, in
//! source order: modifier invocations first, then statements, with an outer call
//! listed before the calls nested in its receiver and arguments.

use crate::domain::ast::{CallExpr, Expr, FunctionDef, Statement, VariableDecl};

/// How the call site was written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SiteKind {
    Call,
    Emit,
    Modifier,
}

/// The left-hand side of a qualified call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Receiver {
    /// A plain identifier: `this`, `super`, a contract name or a variable.
    Name(String),
    /// A one-argument conversion such as `IERC20(token)`.
    Cast(String),
    /// Anything else (`a.b`, `xs[i]`, `f()`).
    Expression,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallTarget {
    Bare(String),
    Qualified { receiver: Receiver, name: String },
    New(String),
    /// Function pointers, call options and other callee shapes.
    Dynamic,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallSite {
    pub target: CallTarget,
    pub arg_count: usize,
    pub text: String,
    pub kind: SiteKind,
}

impl CallSite {
    pub fn from_call(call: &CallExpr, kind: SiteKind) -> Self {
        CallSite {
            target: target_of(&call.callee),
            arg_count: call.args.len(),
            text: call.text.clone(),
            kind,
        }
    }

    /// The called name, if the target has one.
    pub fn name(&self) -> Option<&str> {
        match &self.target {
            CallTarget::Bare(name) | CallTarget::Qualified { name, .. } => Some(name),
            CallTarget::New(type_name) => Some(type_name),
            CallTarget::Dynamic => None,
        }
    }
}

fn target_of(callee: &Expr) -> CallTarget {
    match callee {
        Expr::Identifier(name) => CallTarget::Bare(name.clone()),
        Expr::Member { object, member } => CallTarget::Qualified {
            receiver: receiver_of(object),
            name: member.clone(),
        },
        Expr::New(type_name) => CallTarget::New(type_name.clone()),
        Expr::Call(_) | Expr::Other(_) => CallTarget::Dynamic,
    }
}

fn receiver_of(object: &Expr) -> Receiver {
    match object {
        Expr::Identifier(name) => Receiver::Name(name.clone()),
        Expr::Call(inner) if inner.args.len() == 1 => match inner.callee.as_ref() {
            Expr::Identifier(type_name) => Receiver::Cast(type_name.clone()),
            _ => Receiver::Expression,
        },
        _ => Receiver::Expression,
    }
}

/// Collect every call site of a definition. Declarations without a body only
/// contribute their modifier invocations.
pub fn collect_call_sites(function: &FunctionDef) -> Vec<CallSite> {
    let mut sites = Vec::new();
    for modifier in &function.modifiers {
        sites.push(CallSite::from_call(modifier, SiteKind::Modifier));
        for arg in &modifier.args {
            walk_expr(arg, &mut sites);
        }
    }
    if let Some(body) = &function.body {
        for statement in body {
            walk_statement(statement, &mut sites);
        }
    }
    sites
}

fn walk_statement(statement: &Statement, sites: &mut Vec<CallSite>) {
    match statement {
        Statement::Emit(call) => {
            sites.push(CallSite::from_call(call, SiteKind::Emit));
            for arg in &call.args {
                walk_expr(arg, sites);
            }
        }
        Statement::Local(_) => {}
        Statement::Expression(expr) => walk_expr(expr, sites),
        Statement::Block(children) => {
            for child in children {
                walk_statement(child, sites);
            }
        }
    }
}

fn walk_expr(expr: &Expr, sites: &mut Vec<CallSite>) {
    match expr {
        Expr::Call(call) => {
            sites.push(CallSite::from_call(call, SiteKind::Call));
            walk_expr(&call.callee, sites);
            for arg in &call.args {
                walk_expr(arg, sites);
            }
        }
        Expr::Member { object, .. } => walk_expr(object, sites),
        Expr::Other(children) => {
            for child in children {
                walk_expr(child, sites);
            }
        }
        Expr::Identifier(_) | Expr::New(_) => {}
    }
}

/// Local variables declared anywhere in a body, in source order.
pub fn collect_locals(function: &FunctionDef) -> Vec<&VariableDecl> {
    fn walk<'a>(statement: &'a Statement, out: &mut Vec<&'a VariableDecl>) {
        match statement {
            Statement::Local(decl) => out.push(decl),
            Statement::Block(children) => children.iter().for_each(|c| walk(c, out)),
            Statement::Emit(_) | Statement::Expression(_) => {}
        }
    }
    let mut out = Vec::new();
    if let Some(body) = &function.body {
        body.iter().for_each(|s| walk(s, &mut out));
    }
    out
}
