//! Stable, human-facing ordering of matrix axes.
//!
//! The external solver numbers activities, products and biosphere flows in
//! whatever order it happened to visit them. Everything shown to a person is
//! sorted by `(display_name, key)` instead; [`LabelOrder`] holds that order and
//! the two translation tables between the solver's numbering ("computed")
//! and the sorted numbering ("canonical").

use std::collections::HashMap;

use thiserror::Error;

use crate::model::Key;

/// Placeholder for entities without a usable name. Sorts like any other name.
pub const UNKNOWN_LABEL: &str = "Unknown";

#[derive(Debug, Error, PartialEq)]
pub enum LabelError {
    /// Two keys were assigned the same computed index.
    #[error("computed index {index} assigned to both {first} and {second}")]
    DuplicateIndex { index: usize, first: Key, second: Key },
}

#[derive(Debug, Clone)]
pub struct LabelOrder {
    /// `(display_name, key)` in canonical order.
    entries: Vec<(String, Key)>,
    computed_to_canonical: HashMap<usize, usize>,
    /// Indexed by canonical position.
    canonical_to_computed: Vec<usize>,
}

impl LabelOrder {
    /// Sort `index` by resolved display name, key as tie-break, and pair each
    /// key's computed index with its sorted position.
    ///
    /// `resolve` returns `None` (or an empty string) when no name is known;
    /// such keys are labeled [`UNKNOWN_LABEL`].
    pub fn build<F>(index: &HashMap<Key, usize>, mut resolve: F) -> Result<Self, LabelError>
    where
        F: FnMut(&Key) -> Option<String>,
    {
        let mut entries: Vec<(String, Key)> = index
            .keys()
            .map(|key| {
                let name = resolve(key)
                    .filter(|n| !n.is_empty())
                    .unwrap_or_else(|| UNKNOWN_LABEL.to_string());
                (name, key.clone())
            })
            .collect();
        // Keys are unique, so (name, key) is a total order.
        entries.sort_unstable();

        let mut computed_to_canonical = HashMap::with_capacity(entries.len());
        let mut canonical_to_computed = Vec::with_capacity(entries.len());
        let mut owner: HashMap<usize, &Key> = HashMap::with_capacity(entries.len());

        for (position, (_, key)) in entries.iter().enumerate() {
            let computed = index[key];
            if let Some(first) = owner.insert(computed, key) {
                let (first, second) = if first < key { (first, key) } else { (key, first) };
                return Err(LabelError::DuplicateIndex {
                    index: computed,
                    first: first.clone(),
                    second: second.clone(),
                });
            }
            computed_to_canonical.insert(computed, position);
            canonical_to_computed.push(computed);
        }

        Ok(Self {
            entries,
            computed_to_canonical,
            canonical_to_computed,
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Keys in canonical order.
    pub fn sorted_keys(&self) -> impl Iterator<Item = &Key> + '_ {
        self.entries.iter().map(|(_, key)| key)
    }

    /// Resolved display names in canonical order.
    pub fn labels(&self) -> impl Iterator<Item = &str> + '_ {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    /// `(canonical_index, display_name, key)` triples.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &str, &Key)> + '_ {
        self.entries
            .iter()
            .enumerate()
            .map(|(i, (name, key))| (i, name.as_str(), key))
    }

    /// Canonical position for a computed index. `None` for indices that were
    /// not part of the key set (e.g. filtered out before ordering).
    pub fn to_canonical(&self, computed: usize) -> Option<usize> {
        self.computed_to_canonical.get(&computed).copied()
    }

    pub fn to_computed(&self, canonical: usize) -> Option<usize> {
        self.canonical_to_computed.get(canonical).copied()
    }

    pub fn position(&self, key: &Key) -> Option<usize> {
        self.entries.iter().position(|(_, k)| k == key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn key(id: &str) -> Key {
        Key::new("db", id)
    }

    #[test]
    fn sorts_by_display_name_and_translates_indices() {
        let index = HashMap::from([(key("A"), 0), (key("B"), 1)]);
        let names = HashMap::from([(key("A"), "Zeta"), (key("B"), "Alpha")]);
        let order = LabelOrder::build(&index, |k| names.get(k).map(|n| n.to_string())).unwrap();

        let sorted: Vec<_> = order.sorted_keys().cloned().collect();
        assert_eq!(sorted, vec![key("B"), key("A")]);
        assert_eq!(order.to_canonical(0), Some(1));
        assert_eq!(order.to_canonical(1), Some(0));
        assert_eq!(order.to_computed(0), Some(1));
        assert_eq!(order.labels().collect::<Vec<_>>(), vec!["Alpha", "Zeta"]);
    }

    #[test]
    fn name_ties_fall_back_to_key_order() {
        let index = HashMap::from([(key("c"), 0), (key("a"), 1), (key("b"), 2)]);
        let order = LabelOrder::build(&index, |_| Some("same".into())).unwrap();
        let sorted: Vec<_> = order.sorted_keys().map(|k| k.local_id.as_str()).collect();
        assert_eq!(sorted, vec!["a", "b", "c"]);
    }

    #[test]
    fn missing_names_become_unknown_and_sort_normally() {
        let index = HashMap::from([(key("x"), 0), (key("y"), 1), (key("z"), 2)]);
        let order = LabelOrder::build(&index, |k| match k.local_id.as_str() {
            "x" => Some("Zinc".into()),
            "y" => Some("Arsenic".into()),
            _ => None,
        })
        .unwrap();
        assert_eq!(order.labels().collect::<Vec<_>>(), vec!["Arsenic", UNKNOWN_LABEL, "Zinc"]);
    }

    #[test]
    fn empty_name_is_unknown() {
        let index = HashMap::from([(key("x"), 3)]);
        let order = LabelOrder::build(&index, |_| Some(String::new())).unwrap();
        assert_eq!(order.labels().next(), Some(UNKNOWN_LABEL));
        assert_eq!(order.to_canonical(3), Some(0));
    }

    #[test]
    fn duplicate_computed_index_is_rejected() {
        let index = HashMap::from([(key("a"), 4), (key("b"), 4)]);
        let err = LabelOrder::build(&index, |_| None).unwrap_err();
        assert_eq!(
            err,
            LabelError::DuplicateIndex { index: 4, first: key("a"), second: key("b") }
        );
    }

    #[test]
    fn unknown_computed_index_has_no_canonical_position() {
        let index = HashMap::from([(key("a"), 7)]);
        let order = LabelOrder::build(&index, |_| None).unwrap();
        assert_eq!(order.to_canonical(0), None);
        assert_eq!(order.to_computed(1), None);
        assert_eq!(order.position(&key("a")), Some(0));
    }

    proptest! {
        #[test]
        fn translation_is_a_bijection(
            names in proptest::collection::vec("[a-c]{0,2}", 0..40),
            offset in 0usize..1000,
        ) {
            // Computed indices are a shuffled-looking but unique assignment.
            let index: HashMap<Key, usize> = names
                .iter()
                .enumerate()
                .map(|(i, _)| (key(&format!("k{i}")), (i * 7919 + offset) % 100_003))
                .collect();
            let lookup: HashMap<Key, String> = names
                .iter()
                .enumerate()
                .map(|(i, n)| (key(&format!("k{i}")), n.clone()))
                .collect();

            let order = LabelOrder::build(&index, |k| lookup.get(k).cloned()).unwrap();
            prop_assert_eq!(order.len(), index.len());

            let mut seen = std::collections::HashSet::new();
            for &computed in index.values() {
                let canonical = order.to_canonical(computed).unwrap();
                prop_assert!(canonical < order.len());
                prop_assert!(seen.insert(canonical));
                prop_assert_eq!(order.to_computed(canonical), Some(computed));
            }

            let again = LabelOrder::build(&index, |k| lookup.get(k).cloned()).unwrap();
            let first: Vec<_> = order.sorted_keys().collect();
            let second: Vec<_> = again.sorted_keys().collect();
            prop_assert_eq!(first, second);
        }
    }
}
