use homeval_core::{Matrix, MlError, MlResult};

use std::collections::HashMap;

/// One-hot encode several categorical columns into indicator blocks.
///
/// Categories keep the order they were first seen during `fit`. A value that
/// was never seen encodes as an all-zero block instead of failing.
#[derive(Debug, Clone, Default)]
pub struct OneHotEncoder {
    pub categories: Vec<Vec<String>>,
    lookup: Vec<HashMap<String, usize>>,
}

impl OneHotEncoder {
    pub fn new() -> Self {
        OneHotEncoder::default()
    }

    pub fn fit(&mut self, columns: &[Vec<String>]) {
        self.categories.clear();
        self.lookup.clear();
        for column in columns {
            let mut seen: Vec<String> = Vec::new();
            let mut index: HashMap<String, usize> = HashMap::new();
            for value in column {
                if !index.contains_key(value) {
                    index.insert(value.clone(), seen.len());
                    seen.push(value.clone());
                }
            }
            self.categories.push(seen);
            self.lookup.push(index);
        }
    }

    /// Total number of indicator columns produced.
    pub fn n_outputs(&self) -> usize {
        self.categories.iter().map(Vec::len).sum()
    }

    pub fn transform(&self, columns: &[Vec<String>]) -> MlResult<Matrix> {
        if columns.len() != self.lookup.len() {
            return Err(MlError::DimensionMismatch(format!(
                "encoder fitted on {} columns, got {}",
                self.lookup.len(),
                columns.len()
            )));
        }
        let rows = columns.first().map_or(0, Vec::len);
        if columns.iter().any(|c| c.len() != rows) {
            return Err(MlError::DimensionMismatch(
                "categorical columns differ in length".into(),
            ));
        }

        let width = self.n_outputs();
        let mut out = Matrix::zeros(rows, width);
        let mut offset = 0;
        for (column, index) in columns.iter().zip(&self.lookup) {
            for (i, value) in column.iter().enumerate() {
                if let Some(&k) = index.get(value) {
                    out.set(i, offset + k, 1.0)?;
                }
            }
            offset += index.len();
        }
        Ok(out)
    }

    pub fn fit_transform(&mut self, columns: &[Vec<String>]) -> MlResult<Matrix> {
        self.fit(columns);
        self.transform(columns)
    }

    /// Output names as `"{column}_{category}"`.
    pub fn feature_names(&self, input_names: &[String]) -> Vec<String> {
        input_names
            .iter()
            .zip(&self.categories)
            .flat_map(|(name, cats)| cats.iter().map(move |c| format!("{name}_{c}")))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn col(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_one_hot_encounter_order() {
        let mut enc = OneHotEncoder::new();
        let out = enc
            .fit_transform(&[col(&["z", "a", "z"]), col(&["x", "x", "y"])])
            .unwrap();
        assert_eq!(enc.categories[0], col(&["z", "a"]));
        assert_eq!(out.shape(), (3, 4));
        assert_eq!(out.row(0), &[1.0, 0.0, 1.0, 0.0]);
        assert_eq!(out.row(1), &[0.0, 1.0, 1.0, 0.0]);
        assert_eq!(out.row(2), &[1.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_unknown_category_is_zero_block() {
        let mut enc = OneHotEncoder::new();
        enc.fit(&[col(&["a", "b"])]);
        let out = enc.transform(&[col(&["c", "b"])]).unwrap();
        assert_eq!(out.row(0), &[0.0, 0.0]);
        assert_eq!(out.row(1), &[0.0, 1.0]);
    }

    #[test]
    fn test_feature_names() {
        let mut enc = OneHotEncoder::new();
        enc.fit(&[col(&["RL", "RM"])]);
        assert_eq!(
            enc.feature_names(&["MSZoning".to_string()]),
            col(&["MSZoning_RL", "MSZoning_RM"])
        );
    }
}
