use homeval_core::{MlError, MlResult};

use std::collections::HashMap;

/// Fill value for a categorical column that had no observed value at fit time.
pub const MISSING_CATEGORY: &str = "missing";

/// Replace missing numeric values with the training mean.
#[derive(Debug, Clone, Default)]
pub struct MeanImputer {
    pub fill: Option<f64>,
}

impl MeanImputer {
    pub fn new() -> Self {
        MeanImputer { fill: None }
    }

    /// Learn the mean of the observed values. A column with none imputes 0.0.
    pub fn fit(&mut self, values: &[Option<f64>]) {
        let (sum, count) = values
            .iter()
            .flatten()
            .fold((0.0, 0usize), |(s, c), &v| (s + v, c + 1));
        self.fill = Some(if count == 0 { 0.0 } else { sum / count as f64 });
    }

    pub fn transform(&self, values: &[Option<f64>]) -> MlResult<Vec<f64>> {
        let fill = self.fill.ok_or(MlError::NotFitted("MeanImputer"))?;
        Ok(values.iter().map(|v| v.unwrap_or(fill)).collect())
    }

    pub fn fit_transform(&mut self, values: &[Option<f64>]) -> MlResult<Vec<f64>> {
        self.fit(values);
        self.transform(values)
    }
}

/// Replace missing categories with the most frequent training value.
///
/// Ties go to the value encountered first.
#[derive(Debug, Clone, Default)]
pub struct MostFrequentImputer {
    pub fill: Option<String>,
}

impl MostFrequentImputer {
    pub fn new() -> Self {
        MostFrequentImputer { fill: None }
    }

    pub fn fit(&mut self, values: &[Option<String>]) {
        // (count, first position) per category
        let mut counts: HashMap<&str, (usize, usize)> = HashMap::new();
        for (pos, value) in values.iter().enumerate() {
            if let Some(v) = value {
                counts.entry(v.as_str()).or_insert((0, pos)).0 += 1;
            }
        }
        let mode = counts
            .into_iter()
            .max_by(|(_, (ca, pa)), (_, (cb, pb))| ca.cmp(cb).then(pb.cmp(pa)))
            .map(|(v, _)| v.to_string());
        self.fill = Some(mode.unwrap_or_else(|| MISSING_CATEGORY.to_string()));
    }

    pub fn transform(&self, values: &[Option<String>]) -> MlResult<Vec<String>> {
        let fill = self
            .fill
            .as_ref()
            .ok_or(MlError::NotFitted("MostFrequentImputer"))?;
        Ok(values
            .iter()
            .map(|v| v.clone().unwrap_or_else(|| fill.clone()))
            .collect())
    }

    pub fn fit_transform(&mut self, values: &[Option<String>]) -> MlResult<Vec<String>> {
        self.fit(values);
        self.transform(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cats(values: &[Option<&str>]) -> Vec<Option<String>> {
        values.iter().map(|v| v.map(str::to_string)).collect()
    }

    #[test]
    fn test_mean_imputer() {
        let mut imp = MeanImputer::new();
        let out = imp.fit_transform(&[Some(1.0), None, Some(5.0)]).unwrap();
        assert_eq!(out, vec![1.0, 3.0, 5.0]);

        let mut empty = MeanImputer::new();
        assert_eq!(empty.fit_transform(&[None, None]).unwrap(), vec![0.0, 0.0]);
    }

    #[test]
    fn test_unfitted_imputer_errors() {
        assert_eq!(
            MeanImputer::new().transform(&[None]),
            Err(MlError::NotFitted("MeanImputer"))
        );
    }

    #[test]
    fn test_most_frequent_tie_goes_to_first_seen() {
        let mut imp = MostFrequentImputer::new();
        imp.fit(&cats(&[Some("b"), Some("a"), None, Some("a"), Some("b")]));
        assert_eq!(imp.fill.as_deref(), Some("b"));

        let out = imp.transform(&cats(&[None, Some("c")])).unwrap();
        assert_eq!(out, vec!["b".to_string(), "c".to_string()]);
    }

    #[test]
    fn test_most_frequent_all_missing() {
        let mut imp = MostFrequentImputer::new();
        imp.fit(&cats(&[None, None]));
        assert_eq!(imp.fill.as_deref(), Some(MISSING_CATEGORY));
    }
}
