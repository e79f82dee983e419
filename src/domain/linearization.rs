//! Inheritance linearization.
//!
//! Solidity orders bases "most base-like" first, so `contract C is A, B` searches
//! `C, B, A`. The order is the C3 merge of the bases' own linearizations taken right
//! to left. Names that are not defined in the loaded sources linearize to themselves.

use std::collections::{HashMap, HashSet, VecDeque};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinearizationError {
    Cycle(String),
    Inconsistent(String),
}

impl std::fmt::Display for LinearizationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LinearizationError::Cycle(name) => write!(f, "inheritance cycle through {}", name),
            LinearizationError::Inconsistent(name) => {
                write!(f, "no consistent linearization for {}", name)
            }
        }
    }
}

/// Memoizing C3 linearizer over a base-name table.
pub struct Linearizer<'a> {
    bases: &'a HashMap<String, Vec<String>>,
    cache: HashMap<String, Vec<String>>,
}

impl<'a> Linearizer<'a> {
    pub fn new(bases: &'a HashMap<String, Vec<String>>) -> Self {
        Self {
            bases,
            cache: HashMap::new(),
        }
    }

    /// Linearize `name`, falling back to a breadth-first expansion when C3 fails.
    pub fn linearize_or_fallback(&mut self, name: &str) -> Vec<String> {
        match self.c3(name) {
            Ok(order) => order,
            Err(err) => {
                log::warn!("{}; using breadth-first base order", err);
                breadth_first(name, self.bases)
            }
        }
    }

    pub fn c3(&mut self, name: &str) -> Result<Vec<String>, LinearizationError> {
        let mut visiting = Vec::new();
        self.c3_inner(name, &mut visiting)
    }

    fn c3_inner(
        &mut self,
        name: &str,
        visiting: &mut Vec<String>,
    ) -> Result<Vec<String>, LinearizationError> {
        if let Some(done) = self.cache.get(name) {
            return Ok(done.clone());
        }
        if visiting.iter().any(|v| v == name) {
            return Err(LinearizationError::Cycle(name.to_string()));
        }
        let declared: Vec<String> = match self.bases.get(name) {
            Some(bases) if !bases.is_empty() => bases.iter().rev().cloned().collect(),
            _ => return Ok(vec![name.to_string()]),
        };

        visiting.push(name.to_string());
        let mut sequences = Vec::with_capacity(declared.len() + 1);
        for base in &declared {
            sequences.push(self.c3_inner(base, visiting)?);
        }
        visiting.pop();
        sequences.push(declared);

        let mut order = vec![name.to_string()];
        order.extend(merge(sequences).ok_or_else(|| LinearizationError::Inconsistent(name.to_string()))?);
        self.cache.insert(name.to_string(), order.clone());
        Ok(order)
    }
}

fn merge(mut sequences: Vec<Vec<String>>) -> Option<Vec<String>> {
    let mut out = Vec::new();
    loop {
        sequences.retain(|s| !s.is_empty());
        if sequences.is_empty() {
            return Some(out);
        }
        let candidate = sequences
            .iter()
            .map(|s| &s[0])
            .find(|head| sequences.iter().all(|s| !s[1..].contains(head)))?
            .clone();
        for seq in sequences.iter_mut() {
            if seq[0] == candidate {
                seq.remove(0);
            }
        }
        out.push(candidate);
    }
}

fn breadth_first(name: &str, bases: &HashMap<String, Vec<String>>) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut order = Vec::new();
    let mut queue = VecDeque::from([name.to_string()]);
    while let Some(current) = queue.pop_front() {
        if !seen.insert(current.clone()) {
            continue;
        }
        if let Some(direct) = bases.get(&current) {
            queue.extend(direct.iter().rev().cloned());
        }
        order.push(current);
    }
    order
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(entries: &[(&str, &[&str])]) -> HashMap<String, Vec<String>> {
        entries
            .iter()
            .map(|(name, bases)| {
                (name.to_string(), bases.iter().map(|b| b.to_string()).collect())
            })
            .collect()
    }

    #[test]
    fn test_diamond_follows_solidity_order() {
        // contract B is A; contract C is A; contract D is B, C;
        let bases = table(&[("A", &[]), ("B", &["A"]), ("C", &["A"]), ("D", &["B", "C"])]);
        let mut lin = Linearizer::new(&bases);
        assert_eq!(lin.c3("D").unwrap(), vec!["D", "C", "B", "A"]);
    }

    #[test]
    fn test_undefined_base_is_kept() {
        let bases = table(&[("Token", &["Ownable", "ERC20"]), ("ERC20", &[])]);
        let mut lin = Linearizer::new(&bases);
        assert_eq!(lin.c3("Token").unwrap(), vec!["Token", "ERC20", "Ownable"]);
    }

    #[test]
    fn test_cycle_falls_back_to_breadth_first() {
        let bases = table(&[("A", &["B"]), ("B", &["A"])]);
        let mut lin = Linearizer::new(&bases);
        assert!(matches!(lin.c3("A"), Err(LinearizationError::Cycle(_))));
        assert_eq!(lin.linearize_or_fallback("A"), vec!["A", "B"]);
    }

    #[test]
    fn test_inconsistent_order_is_reported() {
        // X is A, B; Y is B, A; Z is X, Y
        let bases = table(&[
            ("A", &[]),
            ("B", &[]),
            ("X", &["A", "B"]),
            ("Y", &["B", "A"]),
            ("Z", &["X", "Y"]),
        ]);
        let mut lin = Linearizer::new(&bases);
        assert!(matches!(lin.c3("Z"), Err(LinearizationError::Inconsistent(_))));
        assert_eq!(lin.linearize_or_fallback("Z")[0], "Z");
    }
}
