use std::collections::{HashMap, HashSet};
use std::fmt;

use serde::Serialize;

use crate::domain::ast::{ContractDef, ContractKind, FunctionDef, FunctionKind, SourceUnit};
use crate::domain::linearization::Linearizer;

/// Graph identity of a function-like definition.
///
/// Siblings sharing (contract, name, params) are told apart by `ordinal`, their
/// position among the siblings in declaration order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct FunctionId {
    pub contract: String,
    pub name: String,
    pub params: usize,
    pub ordinal: usize,
}

impl fmt::Display for FunctionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}({})", self.contract, self.name, self.params)?;
        if self.ordinal > 0 {
            write!(f, "#{}", self.ordinal)?;
        }
        Ok(())
    }
}

/// A borrowed view of one indexed definition together with its owner.
#[derive(Debug, Clone, Copy)]
pub struct FunctionRef<'a> {
    pub contract: &'a ContractDef,
    pub def: &'a FunctionDef,
    pub ordinal: usize,
}

impl<'a> FunctionRef<'a> {
    pub fn id(&self) -> FunctionId {
        FunctionId {
            contract: self.contract.name.clone(),
            name: self.def.name.clone(),
            params: self.def.param_count(),
            ordinal: self.ordinal,
        }
    }

    pub fn owner(&self) -> &'a str {
        &self.contract.name
    }
}

/// Read-only lookup tables over every loaded source unit.
pub struct AstIndex<'a> {
    contracts: HashMap<&'a str, &'a ContractDef>,
    contract_order: Vec<&'a str>,
    // Key: (contract, name) -> definitions in declaration order, all parameter counts
    functions: HashMap<(String, String), Vec<FunctionRef<'a>>>,
    bases: HashMap<String, Vec<String>>,
    linearizations: HashMap<String, Vec<String>>,
    missing: HashSet<String>,
    type_names: HashSet<String>,
}

impl<'a> AstIndex<'a> {
    /// Build the index. A contract defined twice keeps its last definition.
    pub fn build(units: &'a [SourceUnit]) -> Self {
        let mut contracts: HashMap<&'a str, &'a ContractDef> = HashMap::new();
        let mut contract_order = Vec::new();
        let mut type_names = HashSet::new();
        let mut imported = Vec::new();

        for unit in units {
            type_names.extend(unit.type_names.iter().cloned());
            for import in &unit.imports {
                imported.extend(import.symbols.iter().cloned());
            }
            for contract in &unit.contracts {
                if contracts.insert(contract.name.as_str(), contract).is_some() {
                    log::warn!(
                        "contract {} is defined more than once; keeping the definition in {}",
                        contract.name,
                        unit.path
                    );
                } else {
                    contract_order.push(contract.name.as_str());
                }
            }
        }

        let mut functions: HashMap<(String, String), Vec<FunctionRef<'a>>> = HashMap::new();
        let mut bases = HashMap::new();
        for name in &contract_order {
            let contract = contracts[name];
            type_names.extend(contract.type_names.iter().cloned());
            bases.insert(contract.name.clone(), contract.bases.clone());

            let mut ordinals: HashMap<(&str, usize), usize> = HashMap::new();
            for def in &contract.functions {
                let ordinal = ordinals.entry((def.name.as_str(), def.param_count())).or_insert(0);
                if *ordinal == 1 {
                    log::warn!(
                        "overloaded {}.{} with {} parameters: siblings are only told apart by parameter count",
                        contract.name,
                        def.name,
                        def.param_count()
                    );
                }
                functions
                    .entry((contract.name.clone(), def.name.clone()))
                    .or_default()
                    .push(FunctionRef {
                        contract,
                        def,
                        ordinal: *ordinal,
                    });
                *ordinal += 1;
            }
        }

        let mut missing: HashSet<String> = bases
            .values()
            .flatten()
            .filter(|b| !contracts.contains_key(b.as_str()))
            .cloned()
            .collect();
        missing.extend(
            imported
                .into_iter()
                .filter(|s| !contracts.contains_key(s.as_str()) && !type_names.contains(s)),
        );

        let mut linearizer = Linearizer::new(&bases);
        let linearizations = contract_order
            .iter()
            .map(|name| (name.to_string(), linearizer.linearize_or_fallback(name)))
            .collect();

        log::info!(
            "indexed {} contracts, {} unprovided names",
            contract_order.len(),
            missing.len()
        );

        Self {
            contracts,
            contract_order,
            functions,
            bases,
            linearizations,
            missing,
            type_names,
        }
    }

    pub fn lookup_contract(&self, name: &str) -> Option<&'a ContractDef> {
        self.contracts.get(name).copied()
    }

    pub fn contract_kind(&self, name: &str) -> Option<ContractKind> {
        self.lookup_contract(name).map(|c| c.kind)
    }

    /// Contract names in first-definition order.
    pub fn contract_names(&self) -> impl Iterator<Item = &'a str> + '_ {
        self.contract_order.iter().copied()
    }

    /// Definitions owned directly by `contract`. A `None` count is the union over all counts.
    pub fn lookup_functions(
        &self,
        contract: &str,
        name: &str,
        count: Option<usize>,
    ) -> Vec<FunctionRef<'a>> {
        self.functions
            .get(&(contract.to_string(), name.to_string()))
            .map(|defs| {
                defs.iter()
                    .filter(|f| count.map_or(true, |n| f.def.param_count() == n))
                    .copied()
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Same as `lookup_functions`, restricted to definitions of `kind`.
    pub fn lookup_kind(
        &self,
        contract: &str,
        name: &str,
        count: Option<usize>,
        kind: FunctionKind,
    ) -> Vec<FunctionRef<'a>> {
        let mut found = self.lookup_functions(contract, name, count);
        found.retain(|f| f.def.kind == kind);
        found
    }

    pub fn base_contracts_of(&self, contract: &str) -> &[String] {
        self.bases.get(contract).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Most-derived first, starting with `contract` itself.
    pub fn linearization_of(&self, contract: &str) -> Vec<String> {
        self.linearizations
            .get(contract)
            .cloned()
            .unwrap_or_else(|| vec![contract.to_string()])
    }

    /// Whether `name` is referenced (as a base or imported symbol) but never defined.
    pub fn is_missing(&self, name: &str) -> bool {
        self.missing.contains(name)
    }

    pub fn is_type_name(&self, name: &str) -> bool {
        self.type_names.contains(name)
    }

    /// Resolve a function by the `FunctionId` it was indexed under.
    pub fn function(&self, id: &FunctionId) -> Option<FunctionRef<'a>> {
        self.lookup_functions(&id.contract, &id.name, Some(id.params))
            .into_iter()
            .find(|f| f.ordinal == id.ordinal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ast::{ImportDirective, Parameter};

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

    fn unit(contracts: Vec<ContractDef>) -> SourceUnit {
        SourceUnit {
            path: "Test.sol".to_string(),
            contracts,
            ..Default::default()
        }
    }

    #[test]
    fn test_lookup_by_count_and_union() {
        let mut a = ContractDef::new("A", ContractKind::Contract);
        a.functions = vec![function("foo", 1), function("foo", 2), function("bar", 0)];
        let units = vec![unit(vec![a])];
        let index = AstIndex::build(&units);

        assert_eq!(index.lookup_functions("A", "foo", Some(1)).len(), 1);
        assert_eq!(index.lookup_functions("A", "foo", None).len(), 2);
        assert!(index.lookup_functions("A", "foo", Some(3)).is_empty());
        assert!(index.lookup_functions("B", "foo", None).is_empty());
    }

    #[test]
    fn test_siblings_accumulate_with_ordinals() {
        let mut a = ContractDef::new("A", ContractKind::Contract);
        a.functions = vec![function("foo", 1), function("foo", 1)];
        let units = vec![unit(vec![a])];
        let index = AstIndex::build(&units);

        let found = index.lookup_functions("A", "foo", Some(1));
        assert_eq!(found.len(), 2);
        assert_ne!(found[0].id(), found[1].id());
        assert_eq!(index.function(&found[1].id()).map(|f| f.ordinal), Some(1));
    }

    #[test]
    fn test_last_definition_wins() {
        let mut first = ContractDef::new("A", ContractKind::Contract);
        first.functions = vec![function("old", 0)];
        let mut second = ContractDef::new("A", ContractKind::Contract);
        second.functions = vec![function("new", 0)];
        let units = vec![unit(vec![first]), unit(vec![second])];
        let index = AstIndex::build(&units);

        assert!(index.lookup_functions("A", "old", None).is_empty());
        assert_eq!(index.lookup_functions("A", "new", None).len(), 1);
        assert_eq!(index.contract_names().count(), 1);
    }

    #[test]
    fn test_bases_and_missing_names() {
        let mut token = ContractDef::new("Token", ContractKind::Contract);
        token.bases = vec!["Ownable".to_string(), "ERC20".to_string()];
        let erc20 = ContractDef::new("ERC20", ContractKind::Contract);
        let mut u = unit(vec![token, erc20]);
        u.imports.push(ImportDirective {
            path: "./Pausable.sol".to_string(),
            symbols: vec!["Pausable".to_string()],
        });
        let units = vec![u];
        let index = AstIndex::build(&units);

        assert_eq!(index.base_contracts_of("Token"), ["Ownable", "ERC20"]);
        assert_eq!(index.linearization_of("Token"), vec!["Token", "ERC20", "Ownable"]);
        assert!(index.is_missing("Ownable"));
        assert!(index.is_missing("Pausable"));
        assert!(!index.is_missing("ERC20"));
    }
}
