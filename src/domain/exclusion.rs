//! Ignore rules.
//!
//! A rule stops the traversal from expanding matching functions. The matching
//! node and its incoming edges stay in the graph.

use std::fmt;
use std::str::FromStr;

use crate::domain::entry_point::indexed_name;
use crate::domain::index::FunctionId;
use crate::error::SolgraphError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IgnoreRule {
    pub contract: String,
    pub function: String,
    /// `None` matches any parameter count.
    pub params: Option<usize>,
}

impl IgnoreRule {
    pub fn new(contract: impl Into<String>, function: impl Into<String>, params: Option<usize>) -> Self {
        Self {
            contract: contract.into(),
            function: function.into(),
            params,
        }
    }

    /// `A:A` names the constructor of `A`, as entry requests do.
    pub fn matches(&self, id: &FunctionId) -> bool {
        self.contract == id.contract
            && indexed_name(&self.contract, &self.function) == id.name
            && self.params.map_or(true, |n| n == id.params)
    }
}

impl FromStr for IgnoreRule {
    type Err = SolgraphError;

    /// Parse `Contract:Function` or `Contract:Function:Count`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| SolgraphError::InvalidIgnoreRule {
            rule: s.to_string(),
            reason: reason.to_string(),
        };
        let parts: Vec<&str> = s.split(':').map(str::trim).collect();
        let (contract, function, params) = match parts.as_slice() {
            [contract, function] => (*contract, *function, None),
            [contract, function, count] => {
                let count = count
                    .parse::<usize>()
                    .map_err(|_| invalid("parameter count must be a non-negative integer"))?;
                (*contract, *function, Some(count))
            }
            _ => return Err(invalid("expected Contract:Function[:Count]")),
        };
        if contract.is_empty() || function.is_empty() {
            return Err(invalid("contract and function must not be empty"));
        }
        Ok(IgnoreRule::new(contract, function, params))
    }
}

impl fmt::Display for IgnoreRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.params {
            Some(n) => write!(f, "{}:{}:{}", self.contract, self.function, n),
            None => write!(f, "{}:{}", self.contract, self.function),
        }
    }
}

pub fn is_excluded(id: &FunctionId, rules: &[IgnoreRule]) -> bool {
    rules.iter().any(|rule| rule.matches(id))
}

/// Parse a list of textual rules, failing on the first malformed one.
pub fn parse_rules<S: AsRef<str>>(rules: &[S]) -> Result<Vec<IgnoreRule>, SolgraphError> {
    rules.iter().map(|r| r.as_ref().parse()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(contract: &str, name: &str, params: usize) -> FunctionId {
        FunctionId {
            contract: contract.to_string(),
            name: name.to_string(),
            params,
            ordinal: 0,
        }
    }

    #[test]
    fn test_parse_rules() {
        let rule: IgnoreRule = "Token:irrelevant:2".parse().unwrap();
        assert_eq!(rule, IgnoreRule::new("Token", "irrelevant", Some(2)));
        let rule: IgnoreRule = "Token:irrelevant".parse().unwrap();
        assert_eq!(rule.params, None);
        assert_eq!(rule.to_string(), "Token:irrelevant");
    }

    #[test]
    fn test_reject_malformed_rules() {
        assert!("Token".parse::<IgnoreRule>().is_err());
        assert!("Token:f:x".parse::<IgnoreRule>().is_err());
        assert!("Token:f:1:2".parse::<IgnoreRule>().is_err());
        assert!(":f:1".parse::<IgnoreRule>().is_err());
        assert!(parse_rules(&["A:b:0", "bad"]).is_err());
    }

    #[test]
    fn test_count_is_optional() {
        let rules = vec![IgnoreRule::new("A", "bar", None)];
        assert!(is_excluded(&id("A", "bar", 0), &rules));
        assert!(is_excluded(&id("A", "bar", 3), &rules));
        assert!(!is_excluded(&id("B", "bar", 0), &rules));

        let rules = vec![IgnoreRule::new("A", "bar", Some(0))];
        assert!(is_excluded(&id("A", "bar", 0), &rules));
        assert!(!is_excluded(&id("A", "bar", 1), &rules));
    }

    #[test]
    fn test_contract_name_matches_constructor() {
        let rules = parse_rules(&["A:A:0"]).unwrap();
        assert!(is_excluded(&id("A", "constructor", 0), &rules));
        assert!(!is_excluded(&id("A", "constructor", 1), &rules));
        assert!(!is_excluded(&id("B", "constructor", 0), &rules));

        let rules = vec![IgnoreRule::new("A", "constructor", None)];
        assert!(is_excluded(&id("A", "constructor", 2), &rules));
    }
}
