//! Project-wide definition table.

use std::collections::{HashMap, HashSet};

use crate::domain::model::{DefKey, Definition};

/// Every definition in the project keyed by `(unit, path)`.
///
/// Accumulated once during the definitions pass and only read afterwards, so
/// per-file passes may share it freely.
#[derive(Debug, Default, Clone)]
pub struct DefinitionTable {
    defs: HashMap<DefKey, Definition>,
}

impl DefinitionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record definitions; a later definition with the same key replaces the earlier one.
    pub fn extend<I>(&mut self, defs: I)
    where
        I: IntoIterator<Item = Definition>,
    {
        for def in defs {
            self.defs.insert(def.key.clone(), def);
        }
    }

    pub fn get(&self, key: &DefKey) -> Option<&Definition> {
        self.defs.get(key)
    }

    pub fn len(&self) -> usize {
        self.defs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.defs.is_empty()
    }

    /// Definitions declared in `file`, in key order.
    pub fn defined_in<'a>(&'a self, file: &'a str) -> impl Iterator<Item = &'a Definition> + 'a {
        let mut defs: Vec<&Definition> = self.defs.values().filter(|d| d.file == file).collect();
        defs.sort_by(|a, b| a.key.cmp(&b.key));
        defs.into_iter()
    }
}

impl FromIterator<Definition> for DefinitionTable {
    fn from_iter<I: IntoIterator<Item = Definition>>(iter: I) -> Self {
        let mut table = Self::new();
        table.extend(iter);
        table
    }
}

/// Prepare one file's definitions for its table of contents.
///
/// Exact duplicates are dropped, a leading `./` is removed from tree paths, and
/// the result is ordered by tree path.
pub fn toc_definitions(defs: &[Definition]) -> Vec<Definition> {
    let mut seen = HashSet::new();
    let mut filtered = Vec::with_capacity(defs.len());
    for def in defs {
        if !seen.insert(def) {
            continue;
        }
        let mut def = def.clone();
        while let Some(rest) = def.tree_path.strip_prefix("./") {
            def.tree_path = rest.to_owned();
        }
        filtered.push(def);
    }
    filtered.sort_by(|a, b| a.tree_path.cmp(&b.tree_path));
    filtered
}

#[cfg(test)]
mod tests {
    use super::*;

    fn def(unit: &str, path: &str, file: &str, tree: &str) -> Definition {
        Definition {
            key: DefKey::new(unit, path),
            name: path.rsplit('/').next().unwrap_or(path).to_owned(),
            file: file.to_owned(),
            def_start: 0,
            def_end: 0,
            tree_path: tree.to_owned(),
        }
    }

    #[test]
    fn later_definitions_replace_earlier_ones() {
        let table: DefinitionTable = vec![def("u", "p", "a.go", "p"), def("u", "p", "b.go", "p")]
            .into_iter()
            .collect();
        assert_eq!(table.len(), 1);
        assert_eq!(table.get(&DefKey::new("u", "p")).map(|d| d.file.as_str()), Some("b.go"));
    }

    #[test]
    fn defined_in_filters_by_file() {
        let table: DefinitionTable = vec![
            def("u", "b", "a.go", "b"),
            def("u", "a", "a.go", "a"),
            def("u", "c", "c.go", "c"),
        ]
        .into_iter()
        .collect();
        let names: Vec<_> = table.defined_in("a.go").map(|d| d.key.path.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn toc_definitions_dedups_trims_and_sorts() {
        let defs = vec![
            def("u", "z", "a.go", "./z"),
            def("u", "a", "a.go", "./T/a"),
            def("u", "z", "a.go", "./z"),
        ];
        let filtered = toc_definitions(&defs);
        let paths: Vec<_> = filtered.iter().map(|d| d.tree_path.as_str()).collect();
        assert_eq!(paths, vec!["T/a", "z"]);
    }
}
