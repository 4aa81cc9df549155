/// Mean Squared Error.
pub fn mse(y_true: &[f64], y_pred: &[f64]) -> f64 {
    assert_eq!(y_true.len(), y_pred.len());
    let sum: f64 = y_true
        .iter()
        .zip(y_pred)
        .map(|(&t, &p)| (t - p) * (t - p))
        .sum();
    sum / y_true.len() as f64
}

/// Root Mean Squared Error.
pub fn rmse(y_true: &[f64], y_pred: &[f64]) -> f64 {
    mse(y_true, y_pred).sqrt()
}

/// Mean Absolute Error. The score every model comparison ranks by.
pub fn mae(y_true: &[f64], y_pred: &[f64]) -> f64 {
    assert_eq!(y_true.len(), y_pred.len());
    let sum: f64 = y_true.iter().zip(y_pred).map(|(&t, &p)| (t - p).abs()).sum();
    sum / y_true.len() as f64
}

/// R² (coefficient of determination). A constant target scores 0.
pub fn r2_score(y_true: &[f64], y_pred: &[f64]) -> f64 {
    assert_eq!(y_true.len(), y_pred.len());
    let mean_true = y_true.iter().sum::<f64>() / y_true.len() as f64;
    let ss_res: f64 = y_true
        .iter()
        .zip(y_pred)
        .map(|(&t, &p)| (t - p) * (t - p))
        .sum();
    let ss_tot: f64 = y_true.iter().map(|&t| (t - mean_true) * (t - mean_true)).sum();
    if ss_tot < 1e-15 {
        return 0.0;
    }
    1.0 - ss_res / ss_tot
}

/// Mean and population standard deviation, as reported for fold scores.
pub fn mean_std(values: &[f64]) -> (f64, f64) {
    if values.is_empty() {
        return (f64::NAN, f64::NAN);
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let var = values.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / n;
    (mean, var.sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_error_metrics() {
        let y = [3.0, -0.5, 2.0, 7.0];
        let p = [2.5, 0.0, 2.0, 8.0];
        assert_abs_diff_eq!(mae(&y, &p), 0.5, epsilon = 1e-12);
        assert_abs_diff_eq!(mse(&y, &p), 0.375, epsilon = 1e-12);
        assert_abs_diff_eq!(rmse(&y, &p), 0.375f64.sqrt(), epsilon = 1e-12);
    }

    #[test]
    fn test_r2() {
        let y = [3.0, -0.5, 2.0, 7.0];
        let p = [2.5, 0.0, 2.0, 8.0];
        assert_abs_diff_eq!(r2_score(&y, &p), 0.948_608_137, epsilon = 1e-8);
        assert_abs_diff_eq!(r2_score(&y, &y), 1.0, epsilon = 1e-12);
        assert_eq!(r2_score(&[1.0, 1.0], &[0.0, 2.0]), 0.0);
    }

    #[test]
    fn test_mean_std_is_population() {
        let (mean, std) = mean_std(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]);
        assert_abs_diff_eq!(mean, 5.0, epsilon = 1e-12);
        assert_abs_diff_eq!(std, 2.0, epsilon = 1e-12);
        assert!(mean_std(&[]).0.is_nan());
    }

    #[test]
    #[should_panic]
    fn test_length_mismatch_panics() {
        mae(&[1.0], &[1.0, 2.0]);
    }
}
