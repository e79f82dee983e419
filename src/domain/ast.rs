// AST data structures for solgraph.
// These types are the closed shape of a Solidity source unit that the call graph
// engine inspects. Everything the engine does not care about is lowered into the
// opaque `Other` / `Block` variants so nested calls are still reachable.

use serde::Serialize;

/// One parsed source file.
#[derive(Debug, Clone, Default)]
pub struct SourceUnit {
    pub path: String,
    pub imports: Vec<ImportDirective>,
    pub contracts: Vec<ContractDef>,
    /// Structs, enums, errors and user value types declared at file level.
    pub type_names: Vec<String>,
}

/// An `import` directive as written in the source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportDirective {
    pub path: String,
    /// Names brought in by `import {A, B as C} from "..."`. Empty for whole-file imports.
    pub symbols: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ContractKind {
    Contract,
    Abstract,
    Interface,
    Library,
}

/// A contract, interface or library definition.
#[derive(Debug, Clone)]
pub struct ContractDef {
    pub name: String,
    pub kind: ContractKind,
    /// Base names in declaration order (`contract C is A, B` gives `[A, B]`).
    pub bases: Vec<String>,
    pub functions: Vec<FunctionDef>,
    pub state_vars: Vec<VariableDecl>,
    pub using_for: Vec<UsingFor>,
    pub type_names: Vec<String>,
}

impl ContractDef {
    pub fn new(name: impl Into<String>, kind: ContractKind) -> Self {
        Self {
            name: name.into(),
            kind,
            bases: Vec::new(),
            functions: Vec::new(),
            state_vars: Vec::new(),
            using_for: Vec::new(),
            type_names: Vec::new(),
        }
    }
}

/// `using <library> for <target>;` where a `None` target is `*`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsingFor {
    pub library: String,
    pub target: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariableDecl {
    pub name: String,
    pub type_name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FunctionKind {
    Function,
    Constructor,
    Fallback,
    Receive,
    Modifier,
    Event,
}

impl FunctionKind {
    /// Kinds that can root a traversal.
    pub fn is_entry_candidate(self) -> bool {
        matches!(
            self,
            FunctionKind::Function
                | FunctionKind::Constructor
                | FunctionKind::Fallback
                | FunctionKind::Receive
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Public,
    External,
    Internal,
    Private,
    Default,
}

impl Visibility {
    pub fn from_keyword(keyword: &str) -> Self {
        match keyword.trim() {
            "public" => Visibility::Public,
            "external" => Visibility::External,
            "internal" => Visibility::Internal,
            "private" => Visibility::Private,
            _ => Visibility::Default,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parameter {
    pub name: Option<String>,
    pub type_name: String,
}

/// A function-like definition: functions, constructors, fallback/receive,
/// modifiers and events.
#[derive(Debug, Clone)]
pub struct FunctionDef {
    /// Reserved names are used for `constructor`, `fallback` and `receive`.
    pub name: String,
    pub kind: FunctionKind,
    pub params: Vec<Parameter>,
    pub visibility: Visibility,
    pub modifiers: Vec<CallExpr>,
    /// `None` for declarations without an implementation.
    pub body: Option<Vec<Statement>>,
}

impl FunctionDef {
    pub fn new(name: impl Into<String>, kind: FunctionKind) -> Self {
        Self {
            name: name.into(),
            kind,
            params: Vec::new(),
            visibility: Visibility::Default,
            modifiers: Vec::new(),
            body: None,
        }
    }

    pub fn param_count(&self) -> usize {
        self.params.len()
    }

    pub fn has_body(&self) -> bool {
        self.body.is_some()
    }

    pub fn param_types(&self) -> Vec<&str> {
        self.params.iter().map(|p| p.type_name.as_str()).collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Emit(CallExpr),
    Local(VariableDecl),
    Expression(Expr),
    /// Any compound statement; children kept in source order.
    Block(Vec<Statement>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Identifier(String),
    Member { object: Box<Expr>, member: String },
    Call(CallExpr),
    /// `new T` (the surrounding call supplies the arguments).
    New(String),
    Other(Vec<Expr>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct CallExpr {
    pub callee: Box<Expr>,
    pub args: Vec<Expr>,
    /// Source text with whitespace collapsed.
    pub text: String,
}

impl CallExpr {
    pub fn new(callee: Expr, args: Vec<Expr>, text: impl Into<String>) -> Self {
        Self {
            callee: Box::new(callee),
            args,
            text: text.into(),
        }
    }
}

impl Expr {
    pub fn ident(name: impl Into<String>) -> Self {
        Expr::Identifier(name.into())
    }

    pub fn member(object: Expr, member: impl Into<String>) -> Self {
        Expr::Member {
            object: Box::new(object),
            member: member.into(),
        }
    }
}
