//! Precomputed LCI matrices plus the index dicts that address them.
//!
//! ```json
//! {"activity_dict": [[["db", "a1"], 0]],
//!  "product_dict": [[["db", "p1"], 0]],
//!  "biosphere_dict": [[["biosphere3", "co2"], 0]],
//!  "technosphere_matrix": {"shape": [1, 1], "entries": [[0, 0, 1.0]]},
//!  "biosphere_matrix": {"shape": [1, 1], "entries": [[0, 0, 2.5]]}}
//! ```

use std::collections::{HashMap, HashSet};
use std::path::Path;

use lcigrid_core::{Key, SparseMatrix};
use serde::Deserialize;

use crate::error::LoadError;
use crate::store::read_json;

#[derive(Debug, Deserialize)]
struct RawBundle {
    activity_dict: Vec<(Key, usize)>,
    product_dict: Vec<(Key, usize)>,
    biosphere_dict: Vec<(Key, usize)>,
    technosphere_matrix: SparseMatrix,
    biosphere_matrix: SparseMatrix,
}

/// Computed index spaces and matrices of one solved inventory.
///
/// Technosphere rows are products and columns activities; biosphere rows are
/// biosphere flows and columns activities.
#[derive(Debug, Clone)]
pub struct LciBundle {
    pub activity_dict: HashMap<Key, usize>,
    pub product_dict: HashMap<Key, usize>,
    pub biosphere_dict: HashMap<Key, usize>,
    pub technosphere_matrix: SparseMatrix,
    pub biosphere_matrix: SparseMatrix,
}

impl LciBundle {
    pub fn from_json(json: &str) -> Result<Self, LoadError> {
        let raw: RawBundle = serde_json::from_str(json).map_err(|e| LoadError::Json {
            path: "<bundle>".to_string(),
            message: e.to_string(),
        })?;
        Self::from_raw(raw)
    }

    pub fn load(path: &Path) -> Result<Self, LoadError> {
        let bundle = Self::from_raw(read_json(path)?)?;
        tracing::info!(
            path = %path.display(),
            activities = bundle.activity_dict.len(),
            products = bundle.product_dict.len(),
            biosphere = bundle.biosphere_dict.len(),
            "loaded LCI bundle"
        );
        Ok(bundle)
    }

    fn from_raw(raw: RawBundle) -> Result<Self, LoadError> {
        let (tech_rows, tech_cols) = raw.technosphere_matrix.shape();
        let (bio_rows, bio_cols) = raw.biosphere_matrix.shape();

        check_range("activity_dict", &raw.activity_dict, tech_cols.min(bio_cols))?;
        check_range("product_dict", &raw.product_dict, tech_rows)?;
        check_range("biosphere_dict", &raw.biosphere_dict, bio_rows)?;
        check_unique_keys("activity_dict", &raw.activity_dict)?;
        check_unique_keys("product_dict", &raw.product_dict)?;
        check_unique_keys("biosphere_dict", &raw.biosphere_dict)?;

        Ok(Self {
            activity_dict: raw.activity_dict.into_iter().collect(),
            product_dict: raw.product_dict.into_iter().collect(),
            biosphere_dict: raw.biosphere_dict.into_iter().collect(),
            technosphere_matrix: raw.technosphere_matrix,
            biosphere_matrix: raw.biosphere_matrix,
        })
    }
}

fn check_range(dict: &'static str, entries: &[(Key, usize)], bound: usize) -> Result<(), LoadError> {
    match entries.iter().find(|(_, index)| *index >= bound) {
        Some((_, index)) => Err(LoadError::IndexOutOfRange {
            dict,
            index: *index,
            bound,
        }),
        None => Ok(()),
    }
}

/// A repeated key would collapse two computed indices into one map entry.
fn check_unique_keys(dict: &'static str, entries: &[(Key, usize)]) -> Result<(), LoadError> {
    let mut seen = HashSet::with_capacity(entries.len());
    match entries.iter().find(|(key, _)| !seen.insert(key)) {
        Some((key, _)) => Err(LoadError::DuplicateKey {
            dict,
            key: key.to_string(),
        }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BUNDLE: &str = r#"{
        "activity_dict": [[["db", "a1"], 0], [["db", "a2"], 1]],
        "product_dict": [[["db", "p1"], 0], [["db", "p2"], 1]],
        "biosphere_dict": [[["biosphere3", "co2"], 0]],
        "technosphere_matrix": {"shape": [2, 2], "entries": [[0, 0, 1.0], [1, 1, 1.0], [0, 1, -0.3]]},
        "biosphere_matrix": {"shape": [1, 2], "entries": [[0, 1, 4.0]]}
    }"#;

    #[test]
    fn parses_dicts_and_matrices() {
        let bundle = LciBundle::from_json(BUNDLE).unwrap();
        assert_eq!(bundle.activity_dict[&Key::new("db", "a2")], 1);
        assert_eq!(bundle.technosphere_matrix.nnz(), 3);
        assert_eq!(bundle.biosphere_matrix.shape(), (1, 2));
    }

    #[test]
    fn rejects_index_past_matrix() {
        let json = BUNDLE.replace(r#"[["db", "p2"], 1]"#, r#"[["db", "p2"], 7]"#);
        let err = LciBundle::from_json(&json).unwrap_err();
        assert!(matches!(err, LoadError::IndexOutOfRange { dict: "product_dict", index: 7, .. }));
    }

    #[test]
    fn rejects_repeated_dict_key() {
        let json = BUNDLE.replace(r#"[["db", "a2"], 1]"#, r#"[["db", "a1"], 1]"#);
        let err = LciBundle::from_json(&json).unwrap_err();
        match err {
            LoadError::DuplicateKey { dict, key } => {
                assert_eq!(dict, "activity_dict");
                assert_eq!(key, "(db, a1)");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn rejects_entry_outside_shape() {
        let json = BUNDLE.replace("[0, 1, 4.0]", "[3, 1, 4.0]");
        assert!(matches!(LciBundle::from_json(&json), Err(LoadError::Json { .. })));
    }
}
