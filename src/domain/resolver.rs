//! Call resolver: maps a call site to the definitions it may reach.
//!
//! Resolution walks the dispatch contract's linearization level by level and
//! stops at the first level with any match, returning every match at that level.
//! Targets that cannot be tied to a concrete contract come back as
//! `Unresolved` with a reason instead of being dropped.

use std::collections::HashMap;
use std::fmt;

use serde::Serialize;

use crate::domain::ast::{ContractKind, FunctionKind};
use crate::domain::builtins;
use crate::domain::call_site::{collect_locals, CallSite, CallTarget, Receiver, SiteKind};
use crate::domain::index::{AstIndex, FunctionRef};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum UnresolvedReason {
    NoBodyAvailable,
    ExternalInterfaceCall,
    UnknownIdentifier,
}

impl UnresolvedReason {
    pub fn tag(self) -> &'static str {
        match self {
            UnresolvedReason::NoBodyAvailable => "no-body-available",
            UnresolvedReason::ExternalInterfaceCall => "external-interface-call",
            UnresolvedReason::UnknownIdentifier => "unknown-identifier",
        }
    }
}

impl fmt::Display for UnresolvedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// A target in a contract that is referenced but whose source was not loaded.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MissingTarget {
    pub contract: String,
    pub name: String,
    pub params: usize,
}

#[derive(Debug, Clone)]
pub enum Resolution<'a> {
    Resolved(Vec<FunctionRef<'a>>),
    Unresolved(UnresolvedReason),
    Missing(MissingTarget),
    /// Not a call into user code.
    Builtin,
}

/// Lexical context of the body being walked.
#[derive(Debug, Clone)]
pub struct Scope<'a> {
    /// Contract whose linearization drives unqualified and `super` lookups.
    pub dispatch: &'a str,
    /// Contract that owns the function being walked.
    pub owner: &'a str,
    variables: HashMap<&'a str, &'a str>,
}

impl<'a> Scope<'a> {
    pub fn new(function: FunctionRef<'a>, dispatch: &'a str) -> Self {
        let mut variables = HashMap::new();
        for param in &function.def.params {
            if let Some(name) = &param.name {
                variables.insert(name.as_str(), param.type_name.as_str());
            }
        }
        for local in collect_locals(function.def) {
            variables.insert(local.name.as_str(), local.type_name.as_str());
        }
        Self {
            dispatch,
            owner: function.owner(),
            variables,
        }
    }

    pub fn variable_type(&self, name: &str) -> Option<&'a str> {
        self.variables.get(name).copied()
    }
}

pub struct CallResolver<'a> {
    index: &'a AstIndex<'a>,
}

impl<'a> CallResolver<'a> {
    pub fn new(index: &'a AstIndex<'a>) -> Self {
        Self { index }
    }

    pub fn resolve(&self, site: &CallSite, scope: &Scope<'a>) -> Resolution<'a> {
        let kind = match site.kind {
            SiteKind::Call => FunctionKind::Function,
            SiteKind::Emit => FunctionKind::Event,
            SiteKind::Modifier => FunctionKind::Modifier,
        };
        let resolution = match &site.target {
            CallTarget::Bare(name) => self.resolve_bare(name, site.arg_count, kind, scope),
            CallTarget::Qualified { receiver, name } => {
                self.resolve_qualified(receiver, name, site.arg_count, kind, scope)
            }
            CallTarget::New(type_name) => self.resolve_new(type_name, site.arg_count),
            CallTarget::Dynamic => Resolution::Builtin,
        };
        if log::log_enabled!(log::Level::Debug) {
            log::debug!("{} in {} -> {}", site.text, scope.owner, summary(&resolution));
        }
        resolution
    }

    fn resolve_bare(
        &self,
        name: &str,
        count: usize,
        kind: FunctionKind,
        scope: &Scope<'a>,
    ) -> Resolution<'a> {
        if kind == FunctionKind::Function
            && (builtins::is_builtin_function(name)
                || self.index.lookup_contract(name).is_some()
                || self.index.is_type_name(name)
                || self.index.is_missing(name))
        {
            return Resolution::Builtin;
        }

        let levels = self.index.linearization_of(scope.dispatch);
        if let Some(found) = self.search(&levels, name, count, kind) {
            return Resolution::Resolved(found);
        }

        match kind {
            // `constructor() Base(x)` invokes a base constructor, not a modifier.
            FunctionKind::Modifier if levels.iter().any(|l| l == name) => {
                self.resolve_new(name, count)
            }
            // File-level events.
            FunctionKind::Event if self.index.is_type_name(name) => Resolution::Builtin,
            // `IToken(x)` where `IToken` was never loaded is still a conversion.
            FunctionKind::Function if count == 1 && looks_like_type(name) => Resolution::Builtin,
            _ => self.not_found(&levels),
        }
    }

    fn resolve_qualified(
        &self,
        receiver: &Receiver,
        name: &str,
        count: usize,
        kind: FunctionKind,
        scope: &Scope<'a>,
    ) -> Resolution<'a> {
        match receiver {
            Receiver::Name(r) if r == "this" => {
                let levels = self.index.linearization_of(scope.dispatch);
                self.search(&levels, name, count, kind)
                    .map(Resolution::Resolved)
                    .unwrap_or_else(|| self.getter_or_not_found(&levels, name))
            }
            Receiver::Name(r) if r == "super" => {
                let levels = self.super_levels(scope);
                self.search(&levels, name, count, kind)
                    .map(Resolution::Resolved)
                    .unwrap_or_else(|| self.not_found(&levels))
            }
            Receiver::Name(r) => {
                if let Some(type_name) = self.variable_type(r, scope) {
                    return self.resolve_typed(type_name, name, count, scope);
                }
                if self.index.lookup_contract(r).is_some() || self.index.is_missing(r) {
                    return self.resolve_in_contract(r, name, count, kind);
                }
                if builtins::is_builtin_namespace(r) {
                    return Resolution::Builtin;
                }
                // Possibly a state variable of an unprovided base.
                self.not_found(&self.index.linearization_of(scope.dispatch))
            }
            Receiver::Cast(type_name) => {
                if builtins::is_elementary_type(type_name) {
                    Resolution::Builtin
                } else if self.index.lookup_contract(type_name).is_some()
                    || self.index.is_missing(type_name)
                {
                    self.resolve_in_contract(type_name, name, count, kind)
                } else {
                    Resolution::Unresolved(UnresolvedReason::ExternalInterfaceCall)
                }
            }
            Receiver::Expression => {
                if builtins::is_builtin_member(name) {
                    Resolution::Builtin
                } else {
                    Resolution::Unresolved(UnresolvedReason::ExternalInterfaceCall)
                }
            }
        }
    }

    /// Call through a receiver whose declared type is known.
    fn resolve_typed(
        &self,
        type_name: &str,
        name: &str,
        count: usize,
        scope: &Scope<'a>,
    ) -> Resolution<'a> {
        let type_name = type_name.trim();
        if self.index.lookup_contract(type_name).is_some() || self.index.is_missing(type_name) {
            return self.resolve_in_contract(type_name, name, count, FunctionKind::Function);
        }

        // `using L for T`: the receiver becomes the first argument.
        let normalized: String = type_name.split_whitespace().collect();
        for level in self.index.linearization_of(scope.dispatch) {
            let Some(contract) = self.index.lookup_contract(&level) else {
                continue;
            };
            for using in &contract.using_for {
                let applies = using.target.as_ref().map_or(true, |t| {
                    t.split_whitespace().collect::<String>() == normalized
                });
                if !applies {
                    continue;
                }
                if self.index.is_missing(&using.library) {
                    return Resolution::Missing(MissingTarget {
                        contract: using.library.clone(),
                        name: name.to_string(),
                        params: count + 1,
                    });
                }
                let levels = self.index.linearization_of(&using.library);
                if let Some(found) = self.search(&levels, name, count + 1, FunctionKind::Function) {
                    return Resolution::Resolved(found);
                }
            }
        }

        let base_type = type_name.rsplit('.').next().unwrap_or(type_name);
        if builtins::is_elementary_type(type_name) || self.index.is_type_name(base_type) {
            return Resolution::Builtin;
        }
        // A user type nothing defines: an unloaded contract or interface.
        match self.not_found(&self.index.linearization_of(scope.dispatch)) {
            Resolution::Unresolved(UnresolvedReason::UnknownIdentifier) => {
                Resolution::Unresolved(UnresolvedReason::ExternalInterfaceCall)
            }
            other => other,
        }
    }

    /// Static dispatch through a contract, interface or library name.
    fn resolve_in_contract(
        &self,
        contract: &str,
        name: &str,
        count: usize,
        kind: FunctionKind,
    ) -> Resolution<'a> {
        if self.index.is_missing(contract) {
            return Resolution::Missing(MissingTarget {
                contract: contract.to_string(),
                name: name.to_string(),
                params: count,
            });
        }
        if kind == FunctionKind::Function
            && self.index.contract_kind(contract) == Some(ContractKind::Interface)
        {
            return Resolution::Unresolved(UnresolvedReason::ExternalInterfaceCall);
        }
        let levels = self.index.linearization_of(contract);
        self.search(&levels, name, count, kind)
            .map(Resolution::Resolved)
            .unwrap_or_else(|| self.getter_or_not_found(&levels, name))
    }

    fn resolve_new(&self, contract: &str, count: usize) -> Resolution<'a> {
        if self.index.is_missing(contract) {
            return Resolution::Missing(MissingTarget {
                contract: contract.to_string(),
                name: "constructor".to_string(),
                params: count,
            });
        }
        let found = self
            .index
            .lookup_kind(contract, "constructor", Some(count), FunctionKind::Constructor);
        if found.is_empty() {
            // Implicit constructors and `new T[](n)` have nothing to walk.
            Resolution::Builtin
        } else {
            Resolution::Resolved(found)
        }
    }

    /// First level of `levels` that defines a match wins.
    fn search(
        &self,
        levels: &[String],
        name: &str,
        count: usize,
        kind: FunctionKind,
    ) -> Option<Vec<FunctionRef<'a>>> {
        levels
            .iter()
            .map(|level| self.index.lookup_kind(level, name, Some(count), kind))
            .find(|found| !found.is_empty())
    }

    /// Levels strictly after the owning contract in the dispatch linearization.
    fn super_levels(&self, scope: &Scope<'a>) -> Vec<String> {
        let levels = self.index.linearization_of(scope.dispatch);
        match levels.iter().position(|l| l == scope.owner) {
            Some(pos) => levels[pos + 1..].to_vec(),
            None => self.index.linearization_of(scope.owner).into_iter().skip(1).collect(),
        }
    }

    fn variable_type(&self, name: &str, scope: &Scope<'a>) -> Option<&'a str> {
        scope.variable_type(name).or_else(|| {
            self.index
                .linearization_of(scope.dispatch)
                .iter()
                .filter_map(|level| self.index.lookup_contract(level))
                .flat_map(|c| c.state_vars.iter())
                .find(|v| v.name == name)
                .map(|v| v.type_name.as_str())
        })
    }

    fn getter_or_not_found(&self, levels: &[String], name: &str) -> Resolution<'a> {
        let is_getter = levels
            .iter()
            .filter_map(|level| self.index.lookup_contract(level))
            .any(|c| c.state_vars.iter().any(|v| v.name == name));
        if is_getter {
            Resolution::Builtin
        } else {
            self.not_found(levels)
        }
    }

    fn not_found(&self, levels: &[String]) -> Resolution<'a> {
        if levels.iter().any(|l| self.index.is_missing(l)) {
            Resolution::Unresolved(UnresolvedReason::NoBodyAvailable)
        } else {
            Resolution::Unresolved(UnresolvedReason::UnknownIdentifier)
        }
    }
}

/// Contract, interface and struct names start with a capital by convention.
fn looks_like_type(name: &str) -> bool {
    name.chars().next().is_some_and(|c| c.is_ascii_uppercase())
}

fn summary(resolution: &Resolution<'_>) -> String {
    match resolution {
        Resolution::Resolved(found) => found
            .iter()
            .map(|f| f.id().to_string())
            .collect::<Vec<_>>()
            .join(", "),
        Resolution::Unresolved(reason) => format!("unresolved ({})", reason),
        Resolution::Missing(target) => format!("missing {}.{}", target.contract, target.name),
        Resolution::Builtin => "builtin".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ast::{
        CallExpr, ContractDef, Expr, FunctionDef, Parameter, SourceUnit, Statement, UsingFor,
        VariableDecl,
    };

    fn function(name: &str, params: usize) -> FunctionDef {
        let mut f = FunctionDef::new(name, FunctionKind::Function);
        f.params = (0..params)
            .map(|i| Parameter {
                name: Some(format!("p{}", i)),
                type_name: "uint256".to_string(),
            })
            .collect();
        f.body = Some(vec![]);
        f
    }

    fn site(target: CallTarget, arg_count: usize) -> CallSite {
        CallSite {
            target,
            arg_count,
            text: "call".to_string(),
            kind: SiteKind::Call,
        }
    }

    fn qualified(receiver: Receiver, name: &str) -> CallTarget {
        CallTarget::Qualified {
            receiver,
            name: name.to_string(),
        }
    }

    fn fixture() -> Vec<SourceUnit> {
        let mut base = ContractDef::new("Base", ContractKind::Contract);
        base.functions = vec![function("hook", 0), function("shared", 1)];

        let mut token_iface = ContractDef::new("IERC20", ContractKind::Interface);
        let mut transfer = function("transfer", 2);
        transfer.body = None;
        token_iface.functions = vec![transfer];

        let mut math = ContractDef::new("SafeMath", ContractKind::Library);
        math.functions = vec![function("add", 2)];

        let mut child = ContractDef::new("Child", ContractKind::Contract);
        child.bases = vec!["Base".to_string(), "Ownable".to_string()];
        let mut run = function("run", 0);
        run.params = vec![Parameter {
            name: Some("amount".to_string()),
            type_name: "uint256".to_string(),
        }];
        child.functions = vec![function("hook", 0), run];
        child.state_vars = vec![
            VariableDecl {
                name: "token".to_string(),
                type_name: "IERC20".to_string(),
            },
            VariableDecl {
                name: "base".to_string(),
                type_name: "Base".to_string(),
            },
        ];
        child.using_for = vec![UsingFor {
            library: "SafeMath".to_string(),
            target: Some("uint256".to_string()),
        }];

        vec![SourceUnit {
            path: "Child.sol".to_string(),
            contracts: vec![base, token_iface, math, child],
            ..Default::default()
        }]
    }

    fn run_scope<'a>(index: &'a AstIndex<'a>) -> Scope<'a> {
        let run = index.lookup_functions("Child", "run", Some(1))[0];
        Scope::new(run, "Child")
    }

    fn resolved_ids(resolution: Resolution<'_>) -> Vec<String> {
        match resolution {
            Resolution::Resolved(found) => found.iter().map(|f| f.id().to_string()).collect(),
            other => panic!("expected a resolution, got {:?}", other),
        }
    }

    #[test]
    fn test_nearest_level_shadows_base() {
        let units = fixture();
        let index = AstIndex::build(&units);
        let resolver = CallResolver::new(&index);
        let scope = run_scope(&index);

        let r = resolver.resolve(&site(CallTarget::Bare("hook".into()), 0), &scope);
        assert_eq!(resolved_ids(r), vec!["Child.hook(0)"]);
        let r = resolver.resolve(&site(CallTarget::Bare("shared".into()), 1), &scope);
        assert_eq!(resolved_ids(r), vec!["Base.shared(1)"]);
    }

    #[test]
    fn test_super_skips_owner() {
        let units = fixture();
        let index = AstIndex::build(&units);
        let resolver = CallResolver::new(&index);
        let scope = run_scope(&index);

        let r = resolver.resolve(&site(qualified(Receiver::Name("super".into()), "hook"), 0), &scope);
        assert_eq!(resolved_ids(r), vec!["Base.hook(0)"]);
    }

    #[test]
    fn test_interface_receivers_are_external() {
        let units = fixture();
        let index = AstIndex::build(&units);
        let resolver = CallResolver::new(&index);
        let scope = run_scope(&index);

        let through_var = site(qualified(Receiver::Name("token".into()), "transfer"), 2);
        let through_cast = site(qualified(Receiver::Cast("IERC20".into()), "transfer"), 2);
        for s in [through_var, through_cast] {
            assert!(matches!(
                resolver.resolve(&s, &scope),
                Resolution::Unresolved(UnresolvedReason::ExternalInterfaceCall)
            ));
        }
    }

    #[test]
    fn test_contract_typed_variable_resolves() {
        let units = fixture();
        let index = AstIndex::build(&units);
        let resolver = CallResolver::new(&index);
        let scope = run_scope(&index);

        let r = resolver.resolve(&site(qualified(Receiver::Name("base".into()), "shared"), 1), &scope);
        assert_eq!(resolved_ids(r), vec!["Base.shared(1)"]);
    }

    #[test]
    fn test_using_for_adds_receiver_argument() {
        let units = fixture();
        let index = AstIndex::build(&units);
        let resolver = CallResolver::new(&index);
        let scope = run_scope(&index);

        // run(uint256 amount): `amount.add(1)` is SafeMath.add(amount, 1).
        let r = resolver.resolve(&site(qualified(Receiver::Name("amount".into()), "add"), 1), &scope);
        assert_eq!(resolved_ids(r), vec!["SafeMath.add(2)"]);

        assert!(matches!(
            resolver.resolve(&site(qualified(Receiver::Name("abi".into()), "encode"), 2), &scope),
            Resolution::Builtin
        ));
    }

    #[test]
    fn test_unknown_bare_call_with_unprovided_base() {
        let units = fixture();
        let index = AstIndex::build(&units);
        let resolver = CallResolver::new(&index);
        let scope = run_scope(&index);

        // Ownable was never loaded, so `transferOwnership` might live there.
        assert!(matches!(
            resolver.resolve(&site(CallTarget::Bare("transferOwnership".into()), 1), &scope),
            Resolution::Unresolved(UnresolvedReason::NoBodyAvailable)
        ));
        assert!(matches!(
            resolver.resolve(&site(qualified(Receiver::Name("Ownable".into()), "owner"), 0), &scope),
            Resolution::Missing(_)
        ));
        assert!(matches!(
            resolver.resolve(&site(CallTarget::Bare("require".into()), 2), &scope),
            Resolution::Builtin
        ));
    }

    #[test]
    fn test_statement_locals_type_receivers() {
        let mut units = fixture();
        let child = &mut units[0].contracts[3];
        child.functions[1].body = Some(vec![
            Statement::Local(VariableDecl {
                name: "other".to_string(),
                type_name: "IERC20".to_string(),
            }),
            Statement::Expression(Expr::Call(CallExpr::new(
                Expr::member(Expr::ident("other"), "transfer"),
                vec![Expr::ident("a"), Expr::ident("b")],
                "other.transfer(a, b)",
            ))),
        ]);
        let index = AstIndex::build(&units);
        let resolver = CallResolver::new(&index);
        let scope = run_scope(&index);
        assert_eq!(scope.variable_type("other"), Some("IERC20"));
        assert!(matches!(
            resolver.resolve(&site(qualified(Receiver::Name("other".into()), "transfer"), 2), &scope),
            Resolution::Unresolved(UnresolvedReason::ExternalInterfaceCall)
        ));
    }

    #[test]
    fn test_unknown_receiver_name() {
        let units = fixture();
        let index = AstIndex::build(&units);
        let resolver = CallResolver::new(&index);

        // Child inherits from the unprovided Ownable, which may declare `mystery`.
        let scope = run_scope(&index);
        assert!(matches!(
            resolver.resolve(&site(qualified(Receiver::Name("mystery".into()), "go"), 0), &scope),
            Resolution::Unresolved(UnresolvedReason::NoBodyAvailable)
        ));

        let shared = index.lookup_functions("Base", "shared", Some(1))[0];
        let scope = Scope::new(shared, "Base");
        assert!(matches!(
            resolver.resolve(&site(qualified(Receiver::Name("mystery".into()), "go"), 0), &scope),
            Resolution::Unresolved(UnresolvedReason::UnknownIdentifier)
        ));
    }

    #[test]
    fn test_variable_of_undefined_type_is_surfaced() {
        let mut units = fixture();
        units[0].type_names = vec!["Position".to_string()];
        let base = &mut units[0].contracts[0];
        let mut pay = function("pay", 0);
        pay.params = vec![
            Parameter {
                name: Some("vault".to_string()),
                type_name: "IVault".to_string(),
            },
            Parameter {
                name: Some("pos".to_string()),
                type_name: "Position".to_string(),
            },
            Parameter {
                name: Some("to".to_string()),
                type_name: "address payable".to_string(),
            },
        ];
        base.functions.push(pay);

        let index = AstIndex::build(&units);
        let resolver = CallResolver::new(&index);
        let pay = index.lookup_functions("Base", "pay", Some(3))[0];
        let scope = Scope::new(pay, "Base");

        assert!(matches!(
            resolver.resolve(&site(qualified(Receiver::Name("vault".into()), "deposit"), 1), &scope),
            Resolution::Unresolved(UnresolvedReason::ExternalInterfaceCall)
        ));
        for receiver in ["pos", "to"] {
            assert!(matches!(
                resolver.resolve(&site(qualified(Receiver::Name(receiver.into()), "transfer"), 1), &scope),
                Resolution::Builtin
            ));
        }

        // Under Child an unprovided base might define the type.
        let scope = Scope::new(pay, "Child");
        assert!(matches!(
            resolver.resolve(&site(qualified(Receiver::Name("vault".into()), "deposit"), 1), &scope),
            Resolution::Unresolved(UnresolvedReason::NoBodyAvailable)
        ));
    }

    #[test]
    fn test_conversions_and_file_level_events() {
        let mut units = fixture();
        units[0].type_names = vec!["Paid".to_string()];
        let index = AstIndex::build(&units);
        let resolver = CallResolver::new(&index);
        let scope = run_scope(&index);

        for target in [
            CallTarget::Bare("IVault".into()),
            qualified(Receiver::Cast("payable".into()), "transfer"),
            qualified(Receiver::Cast("address".into()), "send"),
        ] {
            assert!(matches!(resolver.resolve(&site(target, 1), &scope), Resolution::Builtin));
        }

        let emit = CallSite {
            target: CallTarget::Bare("Paid".into()),
            arg_count: 1,
            text: "Paid(msg.sender)".to_string(),
            kind: SiteKind::Emit,
        };
        assert!(matches!(resolver.resolve(&emit, &scope), Resolution::Builtin));
    }
}
