use homeval_core::{Matrix, MlError, MlResult};

/// Standardize features by removing the mean and scaling to unit variance.
///
/// Uses the population standard deviation; a constant column keeps scale 1.
#[derive(Debug, Clone, Default)]
pub struct StandardScaler {
    pub mean: Option<Vec<f64>>,
    pub scale: Option<Vec<f64>>,
}

impl StandardScaler {
    pub fn new() -> Self {
        StandardScaler {
            mean: None,
            scale: None,
        }
    }

    /// Compute mean and std from training data (rows are samples).
    pub fn fit(&mut self, x: &Matrix) -> MlResult<()> {
        if x.rows() == 0 {
            return Err(MlError::EmptyInput("StandardScaler::fit on zero rows".into()));
        }
        self.mean = Some(x.column_means());
        self.scale = Some(
            x.column_stds()
                .into_iter()
                .map(|s| if s.abs() < f64::EPSILON { 1.0 } else { s })
                .collect(),
        );
        Ok(())
    }

    pub fn transform(&self, x: &Matrix) -> MlResult<Matrix> {
        let (Some(mean), Some(scale)) = (&self.mean, &self.scale) else {
            return Err(MlError::NotFitted("StandardScaler"));
        };
        if x.cols() != mean.len() {
            return Err(MlError::ShapeMismatch {
                expected: (x.rows(), mean.len()),
                got: x.shape(),
            });
        }
        let mut data = Vec::with_capacity(x.rows() * x.cols());
        for i in 0..x.rows() {
            data.extend(
                x.row(i)
                    .iter()
                    .zip(mean)
                    .zip(scale)
                    .map(|((&v, &m), &s)| (v - m) / s),
            );
        }
        Matrix::new(data, x.rows(), x.cols())
    }

    pub fn fit_transform(&mut self, x: &Matrix) -> MlResult<Matrix> {
        self.fit(x)?;
        self.transform(x)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_standard_scaler() {
        let x = Matrix::from_rows(&[vec![1.0, 2.0], vec![3.0, 2.0], vec![5.0, 2.0]]).unwrap();
        let mut scaler = StandardScaler::new();
        let out = scaler.fit_transform(&x).unwrap();

        let means = out.column_means();
        assert_abs_diff_eq!(means[0], 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(out.column_stds()[0], 1.0, epsilon = 1e-12);
        // Constant column is centered but not divided by zero.
        assert_eq!(out.column(1).unwrap(), vec![0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_transform_uses_training_statistics() {
        let train = Matrix::from_rows(&[vec![0.0], vec![2.0]]).unwrap();
        let mut scaler = StandardScaler::new();
        scaler.fit(&train).unwrap();
        let out = scaler.transform(&Matrix::from_rows(&[vec![4.0]]).unwrap()).unwrap();
        assert_abs_diff_eq!(out.data()[0], 3.0, epsilon = 1e-12);
    }

    #[test]
    fn test_unfitted_and_width_errors() {
        let x = Matrix::zeros(2, 2);
        assert_eq!(
            StandardScaler::new().transform(&x),
            Err(MlError::NotFitted("StandardScaler"))
        );
        let mut scaler = StandardScaler::new();
        scaler.fit(&Matrix::zeros(2, 3)).unwrap();
        assert!(scaler.transform(&x).is_err());
    }
}
