//! Entry Point Selection Module
//!
//! Turns the user's (contract, function, optional parameter count) request into
//! the single definition that roots the traversal.

use std::fmt;

use crate::domain::index::{AstIndex, FunctionRef};
use crate::error::{Result, SolgraphError};

/// What the user asked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryRequest {
    pub contract: String,
    /// Reserved names select special functions; empty means `fallback`.
    pub function: String,
    pub params: Option<usize>,
}

impl EntryRequest {
    pub fn new(contract: impl Into<String>, function: impl Into<String>, params: Option<usize>) -> Self {
        Self {
            contract: contract.into(),
            function: function.into(),
            params,
        }
    }

    /// The name the definition is indexed under.
    pub fn indexed_name(&self) -> &str {
        indexed_name(&self.contract, &self.function)
    }
}

/// Map a user-written function name onto the name it is indexed under.
pub fn indexed_name<'a>(contract: &str, function: &'a str) -> &'a str {
    if function.is_empty() {
        "fallback"
    } else if function == contract {
        // Pre-0.4.22 constructors are named after their contract.
        "constructor"
    } else {
        function
    }
}

impl fmt::Display for EntryRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.contract, self.indexed_name())?;
        if let Some(n) = self.params {
            write!(f, " with {} parameters", n)?;
        }
        Ok(())
    }
}

/// A selected root: the definition plus the contract it is dispatched from.
#[derive(Debug, Clone, Copy)]
pub struct EntryPoint<'a> {
    pub function: FunctionRef<'a>,
    pub dispatch: &'a str,
}

/// Find the one definition matching `request`.
///
/// Inherited definitions are eligible; the nearest contract in the
/// linearization that defines a match is used. Constructors are never inherited.
pub fn select_entry<'a>(index: &'a AstIndex<'a>, request: &EntryRequest) -> Result<EntryPoint<'a>> {
    let contract = index
        .lookup_contract(&request.contract)
        .ok_or_else(|| SolgraphError::ContractNotFound(request.contract.clone()))?;
    let name = request.indexed_name();

    let levels = if name == "constructor" {
        vec![contract.name.clone()]
    } else {
        index.linearization_of(&contract.name)
    };

    for level in &levels {
        let candidates: Vec<FunctionRef<'a>> = index
            .lookup_functions(level, name, request.params)
            .into_iter()
            .filter(|f| f.def.kind.is_entry_candidate())
            .collect();
        match candidates.as_slice() {
            [] => continue,
            [only] => {
                log::info!("entry point {}", only.id());
                return Ok(EntryPoint {
                    function: *only,
                    dispatch: contract.name.as_str(),
                });
            }
            many => {
                let candidates: Vec<String> = many
                    .iter()
                    .map(|f| format!("{}({})", f.id(), f.def.param_types().join(",")))
                    .collect();
                log::warn!(
                    "found more than one matching function {}; same name and parameter count needs type information to tell apart",
                    name
                );
                return Err(SolgraphError::EntryAmbiguous {
                    key: request.to_string(),
                    candidates,
                });
            }
        }
    }

    Err(SolgraphError::EntryNotFound {
        key: request.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ast::{
        ContractDef, ContractKind, FunctionDef, FunctionKind, Parameter, SourceUnit,
    };

    fn function(name: &str, kind: FunctionKind, types: &[&str]) -> FunctionDef {
        let mut f = FunctionDef::new(name, kind);
        f.params = types
            .iter()
            .map(|t| Parameter {
                name: None,
                type_name: t.to_string(),
            })
            .collect();
        f.body = Some(vec![]);
        f
    }

    fn units() -> Vec<SourceUnit> {
        let mut base = ContractDef::new("Base", ContractKind::Contract);
        base.functions = vec![
            function("inherited", FunctionKind::Function, &[]),
            function("fallback", FunctionKind::Fallback, &[]),
            function("constructor", FunctionKind::Constructor, &[]),
        ];
        let mut c = ContractDef::new("C", ContractKind::Contract);
        c.bases = vec!["Base".to_string()];
        c.functions = vec![
            function("foo", FunctionKind::Function, &["uint256"]),
            function("foo", FunctionKind::Function, &["uint256", "address"]),
            function("onlyOwner", FunctionKind::Modifier, &[]),
        ];
        vec![SourceUnit {
            path: "C.sol".to_string(),
            contracts: vec![base, c],
            ..Default::default()
        }]
    }

    #[test]
    fn test_overloads_need_a_count() {
        let units = units();
        let index = AstIndex::build(&units);

        let err = select_entry(&index, &EntryRequest::new("C", "foo", None)).unwrap_err();
        match err {
            SolgraphError::EntryAmbiguous { candidates, .. } => assert_eq!(candidates.len(), 2),
            other => panic!("unexpected error {:?}", other),
        }

        let entry = select_entry(&index, &EntryRequest::new("C", "foo", Some(1))).unwrap();
        assert_eq!(entry.function.def.param_count(), 1);
        assert_eq!(entry.dispatch, "C");
    }

    #[test]
    fn test_inherited_and_default_entries() {
        let units = units();
        let index = AstIndex::build(&units);

        let entry = select_entry(&index, &EntryRequest::new("C", "inherited", None)).unwrap();
        assert_eq!(entry.function.owner(), "Base");
        assert_eq!(entry.dispatch, "C");

        let entry = select_entry(&index, &EntryRequest::new("C", "", None)).unwrap();
        assert_eq!(entry.function.def.kind, FunctionKind::Fallback);
    }

    #[test]
    fn test_not_found_cases() {
        let units = units();
        let index = AstIndex::build(&units);

        assert!(matches!(
            select_entry(&index, &EntryRequest::new("Nope", "foo", None)),
            Err(SolgraphError::ContractNotFound(_))
        ));
        assert!(matches!(
            select_entry(&index, &EntryRequest::new("C", "foo", Some(3))),
            Err(SolgraphError::EntryNotFound { .. })
        ));
        // Modifiers cannot root a graph and constructors are not inherited.
        assert!(select_entry(&index, &EntryRequest::new("C", "onlyOwner", None)).is_err());
        assert!(select_entry(&index, &EntryRequest::new("C", "C", None)).is_err());
        assert!(select_entry(&index, &EntryRequest::new("Base", "Base", None)).is_ok());
    }
}
