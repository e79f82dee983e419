//! Tree-sitter backed Solidity parser.
//!
//! Lowers the concrete syntax tree into the closed [`SourceUnit`] shape. Only the
//! declarations and expressions the call graph needs are kept; inline assembly
//! is dropped.

use tree_sitter::{Node, Parser};

use crate::domain::ast::{
    CallExpr, ContractDef, ContractKind, Expr, FunctionDef, FunctionKind, ImportDirective,
    Parameter, SourceUnit, Statement, UsingFor, VariableDecl, Visibility,
};
use crate::error::{Result, SolgraphError};
use crate::ports::SourceParser;

pub struct TreeSitterSolidityParser;

impl SourceParser for TreeSitterSolidityParser {
    fn parse(&self, path: &str, source: &str) -> Result<SourceUnit> {
        let mut parser = Parser::new();
        parser.set_language(&tree_sitter_solidity::LANGUAGE.into())?;
        let tree = parser
            .parse(source, None)
            .ok_or_else(|| SolgraphError::ParseFailure {
                path: path.to_string(),
                line: 0,
                column: 0,
                message: "parser produced no tree".to_string(),
            })?;

        let root = tree.root_node();
        if root.has_error() {
            return Err(syntax_error(path, root, source));
        }

        let unit = Lowering { source }.source_unit(path, root);
        log::debug!(
            "parsed {}: {} contracts, {} imports",
            path,
            unit.contracts.len(),
            unit.imports.len()
        );
        Ok(unit)
    }
}

/// Report the first error or missing node in source order.
fn syntax_error(path: &str, root: Node, source: &str) -> SolgraphError {
    let mut stack = vec![root];
    let mut culprit = root;
    while let Some(node) = stack.pop() {
        if node.is_error() || node.is_missing() {
            culprit = node;
            break;
        }
        if !node.has_error() {
            continue;
        }
        let mut cursor = node.walk();
        let children: Vec<Node> = node.children(&mut cursor).collect();
        stack.extend(children.into_iter().rev());
    }

    let position = culprit.start_position();
    let message = if culprit.is_missing() {
        format!("missing `{}`", culprit.kind())
    } else {
        let snippet: String = culprit
            .utf8_text(source.as_bytes())
            .unwrap_or("")
            .chars()
            .take(40)
            .collect();
        format!("unexpected `{}`", collapse_whitespace(&snippet))
    };
    SolgraphError::ParseFailure {
        path: path.to_string(),
        line: position.row + 1,
        column: position.column + 1,
        message,
    }
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn named_children(node: Node) -> Vec<Node> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor).collect()
}

struct Lowering<'s> {
    source: &'s str,
}

impl<'s> Lowering<'s> {
    fn text(&self, node: Node) -> &'s str {
        node.utf8_text(self.source.as_bytes()).unwrap_or("")
    }

    fn field_text(&self, node: Node, field: &str) -> Option<String> {
        node.child_by_field_name(field)
            .map(|n| self.text(n).trim().to_string())
    }

    fn source_unit(&self, path: &str, root: Node) -> SourceUnit {
        let mut unit = SourceUnit {
            path: path.to_string(),
            ..Default::default()
        };
        for child in named_children(root) {
            match child.kind() {
                "import_directive" => unit.imports.push(self.import(child)),
                "contract_declaration" | "interface_declaration" | "library_declaration" => {
                    if let Some(contract) = self.contract(child) {
                        unit.contracts.push(contract);
                    }
                }
                // File-level names that are never call graph targets.
                "struct_declaration"
                | "enum_declaration"
                | "error_declaration"
                | "event_definition"
                | "user_defined_type_definition" => {
                    unit.type_names.extend(self.field_text(child, "name"));
                }
                _ => {}
            }
        }
        unit
    }

    fn import(&self, node: Node) -> ImportDirective {
        let path = node
            .child_by_field_name("source")
            .or_else(|| named_children(node).into_iter().find(|n| n.kind() == "string"))
            .map(|n| self.text(n).trim_matches(|c| c == '"' || c == '\'').to_string())
            .unwrap_or_default();

        // `import {A as B} from ...` makes `B` the local name.
        let mut symbols: Vec<String> = Vec::new();
        let mut previous: Option<&str> = None;
        let mut cursor = node.walk();
        if cursor.goto_first_child() {
            loop {
                let field = cursor.field_name();
                let text = self.text(cursor.node()).to_string();
                match field {
                    Some("import_name") => symbols.push(text),
                    Some("alias") => match (previous, symbols.last_mut()) {
                        (Some("import_name"), Some(last)) => *last = text,
                        _ => symbols.push(text),
                    },
                    _ => {}
                }
                if cursor.node().is_named() {
                    previous = field;
                }
                if !cursor.goto_next_sibling() {
                    break;
                }
            }
        }
        ImportDirective { path, symbols }
    }

    fn contract(&self, node: Node) -> Option<ContractDef> {
        let name = self.field_text(node, "name")?;
        let kind = match node.kind() {
            "interface_declaration" => ContractKind::Interface,
            "library_declaration" => ContractKind::Library,
            _ => {
                let mut cursor = node.walk();
                let is_abstract = node.children(&mut cursor).any(|c| c.kind() == "abstract");
                if is_abstract {
                    ContractKind::Abstract
                } else {
                    ContractKind::Contract
                }
            }
        };
        let mut contract = ContractDef::new(name, kind);

        for child in named_children(node) {
            if child.kind() == "inheritance_specifier" {
                let ancestor = child.child_by_field_name("ancestor").unwrap_or(child);
                contract.bases.push(self.text(ancestor).trim().to_string());
            }
        }

        if let Some(body) = node.child_by_field_name("body") {
            for member in named_children(body) {
                self.member(&mut contract, member);
            }
        }
        Some(contract)
    }

    fn member(&self, contract: &mut ContractDef, node: Node) {
        match node.kind() {
            "function_definition" => {
                if let Some(name) = self.field_text(node, "name") {
                    // Before 0.4.22 the constructor was named after its contract.
                    let def = if name == contract.name {
                        self.function(node, "constructor".to_string(), FunctionKind::Constructor)
                    } else {
                        self.function(node, name, FunctionKind::Function)
                    };
                    contract.functions.push(def);
                }
            }
            "constructor_definition" => {
                contract
                    .functions
                    .push(self.function(node, "constructor".to_string(), FunctionKind::Constructor));
            }
            "fallback_receive_definition" => {
                let mut cursor = node.walk();
                let is_receive = node.children(&mut cursor).any(|c| c.kind() == "receive");
                let (name, kind) = if is_receive {
                    ("receive", FunctionKind::Receive)
                } else {
                    ("fallback", FunctionKind::Fallback)
                };
                contract.functions.push(self.function(node, name.to_string(), kind));
            }
            "modifier_definition" => {
                if let Some(name) = self.field_text(node, "name") {
                    contract.functions.push(self.function(node, name, FunctionKind::Modifier));
                }
            }
            "event_definition" => {
                if let Some(name) = self.field_text(node, "name") {
                    let mut event = FunctionDef::new(name, FunctionKind::Event);
                    event.params = named_children(node)
                        .into_iter()
                        .filter(|c| c.kind() == "event_parameter")
                        .map(|p| self.parameter(p))
                        .collect();
                    contract.functions.push(event);
                }
            }
            "state_variable_declaration" => {
                if let (Some(name), Some(type_name)) =
                    (self.field_text(node, "name"), self.field_text(node, "type"))
                {
                    contract.state_vars.push(VariableDecl { name, type_name });
                }
            }
            "using_directive" => {
                if let Some(using) = parse_using(self.text(node)) {
                    contract.using_for.push(using);
                }
            }
            "struct_declaration"
            | "enum_declaration"
            | "error_declaration"
            | "user_defined_type_definition" => {
                contract.type_names.extend(self.field_text(node, "name"));
            }
            _ => {}
        }
    }

    fn function(&self, node: Node, name: String, kind: FunctionKind) -> FunctionDef {
        let mut def = FunctionDef::new(name, kind);
        for child in named_children(node) {
            match child.kind() {
                "parameter" => def.params.push(self.parameter(child)),
                "visibility" => def.visibility = Visibility::from_keyword(self.text(child)),
                "modifier_invocation" => def.modifiers.push(self.modifier_invocation(child)),
                _ => {}
            }
        }
        def.body = node
            .child_by_field_name("body")
            .map(|body| self.statements(body));
        def
    }

    fn parameter(&self, node: Node) -> Parameter {
        Parameter {
            name: self.field_text(node, "name"),
            type_name: self
                .field_text(node, "type")
                .map(|t| collapse_whitespace(&t))
                .unwrap_or_default(),
        }
    }

    fn modifier_invocation(&self, node: Node) -> CallExpr {
        let mut callee: Option<Expr> = None;
        let mut args = Vec::new();
        for child in named_children(node) {
            match child.kind() {
                "identifier" => {
                    let name = self.text(child).to_string();
                    callee = Some(match callee.take() {
                        Some(object) => Expr::member(object, name),
                        None => Expr::Identifier(name),
                    });
                }
                "call_argument" => self.call_argument(child, &mut args),
                _ => {}
            }
        }
        CallExpr::new(
            callee.unwrap_or_else(|| Expr::Other(Vec::new())),
            args,
            collapse_whitespace(self.text(node)),
        )
    }

    fn statements(&self, node: Node) -> Vec<Statement> {
        let mut out = Vec::new();
        for child in named_children(node) {
            self.statement(child, &mut out);
        }
        out
    }

    fn statement(&self, node: Node, out: &mut Vec<Statement>) {
        match node.kind() {
            "assembly_statement" | "comment" => {}
            "emit_statement" => {
                let callee = node
                    .child_by_field_name("name")
                    .map(|n| self.expression(n))
                    .unwrap_or_else(|| Expr::Other(Vec::new()));
                let mut args = Vec::new();
                for child in named_children(node) {
                    if child.kind() == "call_argument" {
                        self.call_argument(child, &mut args);
                    }
                }
                let text = collapse_whitespace(self.text(node).trim_end_matches(';'));
                let text = text.strip_prefix("emit ").unwrap_or(&text).to_string();
                out.push(Statement::Emit(CallExpr::new(callee, args, text)));
            }
            "variable_declaration" => {
                if let (Some(name), Some(type_name)) =
                    (self.field_text(node, "name"), self.field_text(node, "type"))
                {
                    out.push(Statement::Local(VariableDecl { name, type_name }));
                }
            }
            "block_statement" | "unchecked_block" => {
                out.push(Statement::Block(self.statements(node)));
            }
            kind if is_expression(kind) => out.push(Statement::Expression(self.expression(node))),
            // Compound statements: walk every child in source order.
            _ => {
                for child in named_children(node) {
                    self.statement(child, out);
                }
            }
        }
    }

    fn expression(&self, node: Node) -> Expr {
        match node.kind() {
            "identifier" => Expr::Identifier(self.text(node).to_string()),
            "expression" | "parenthesized_expression" => {
                let children = named_children(node);
                match children.as_slice() {
                    [single] => self.expression(*single),
                    many => Expr::Other(many.iter().map(|c| self.expression(*c)).collect()),
                }
            }
            "member_expression" => {
                let object = node
                    .child_by_field_name("object")
                    .map(|n| self.expression(n))
                    .unwrap_or_else(|| Expr::Other(Vec::new()));
                let member = self.field_text(node, "property").unwrap_or_default();
                Expr::member(object, member)
            }
            "call_expression" => Expr::Call(self.call(node)),
            "payable_conversion_expression" | "type_cast_expression" => {
                Expr::Call(self.conversion(node))
            }
            "primitive_type" => Expr::Identifier(collapse_whitespace(self.text(node))),
            "new_expression" => {
                let type_node = node
                    .child_by_field_name("name")
                    .or_else(|| node.child_by_field_name("type_name"))
                    .or_else(|| node.named_child(0));
                Expr::New(
                    type_node
                        .map(|n| collapse_whitespace(self.text(n)))
                        .unwrap_or_default(),
                )
            }
            _ => Expr::Other(
                named_children(node)
                    .into_iter()
                    .filter(|c| c.kind() != "comment")
                    .map(|c| self.expression(c))
                    .collect(),
            ),
        }
    }

    fn call(&self, node: Node) -> CallExpr {
        let callee = node
            .child_by_field_name("function")
            .map(|n| self.callee(n))
            .unwrap_or_else(|| Expr::Other(Vec::new()));
        let mut args = Vec::new();
        for child in named_children(node) {
            if child.kind() == "call_argument" {
                self.call_argument(child, &mut args);
            }
        }
        CallExpr::new(callee, args, collapse_whitespace(self.text(node)))
    }

    /// `payable(x)` and `address(x)` lowered as calls to the type name.
    fn conversion(&self, node: Node) -> CallExpr {
        let mut callee = "payable".to_string();
        let mut args = Vec::new();
        for child in named_children(node) {
            match child.kind() {
                "primitive_type" => callee = collapse_whitespace(self.text(child)),
                "call_argument" => self.call_argument(child, &mut args),
                "comment" => {}
                _ => args.push(self.expression(child)),
            }
        }
        CallExpr::new(Expr::Identifier(callee), args, collapse_whitespace(self.text(node)))
    }

    /// `x.call{value: v}(data)` calls `x.call`; the options are not part of the callee.
    fn callee(&self, node: Node) -> Expr {
        let inner = if node.kind() == "expression" {
            node.named_child(0).unwrap_or(node)
        } else {
            node
        };
        if self.text(inner).trim() == "payable" {
            return Expr::Identifier("payable".to_string());
        }
        if inner.kind() == "struct_expression" {
            if let Some(target) = inner.child_by_field_name("type") {
                return self.callee(target);
            }
        }
        self.expression(node)
    }

    /// Named arguments `f({a: 1, b: 2})` count once per field.
    fn call_argument(&self, node: Node, args: &mut Vec<Expr>) {
        let children = named_children(node);
        let fields: Vec<Node> = children
            .iter()
            .copied()
            .filter(|c| c.kind() == "struct_field_assignment")
            .collect();
        if fields.is_empty() {
            let exprs: Vec<Expr> = children.into_iter().map(|c| self.expression(c)).collect();
            args.push(match exprs.len() {
                1 => exprs.into_iter().next().unwrap_or(Expr::Other(Vec::new())),
                _ => Expr::Other(exprs),
            });
        } else {
            for field in fields {
                args.push(
                    field
                        .child_by_field_name("value")
                        .map(|v| self.expression(v))
                        .unwrap_or_else(|| Expr::Other(Vec::new())),
                );
            }
        }
    }
}

fn is_expression(kind: &str) -> bool {
    kind == "expression" || kind == "identifier" || kind.ends_with("_expression")
}

/// `using L for T;`, `using L for *;`, `using L for T global;`.
fn parse_using(text: &str) -> Option<UsingFor> {
    let rest = text.trim().trim_end_matches(';').trim().strip_prefix("using")?;
    let (library, target) = rest.split_once(" for ")?;
    let library = library.trim();
    if library.starts_with('{') || library.is_empty() {
        return None;
    }
    let target = target.trim();
    let target = target.strip_suffix("global").unwrap_or(target).trim();
    Some(UsingFor {
        library: library.to_string(),
        target: (target != "*").then(|| collapse_whitespace(target)),
    })
}
