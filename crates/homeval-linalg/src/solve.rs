use homeval_core::{Matrix, MlError, MlResult};

use crate::decomposition::{lu, LuDecomposition};

/// Solve the linear system `A·x = b` using LU decomposition.
pub fn solve(a: &Matrix, b: &[f64]) -> MlResult<Vec<f64>> {
    if b.len() != a.rows() {
        return Err(MlError::DimensionMismatch(format!(
            "solve: b has {} elements but A is {}x{}",
            b.len(),
            a.rows(),
            a.cols()
        )));
    }
    let decomp = lu(a)?;
    Ok(substitute(&decomp, b))
}

/// Solve `(A + λI)·x = b`, growing `λ` tenfold from `initial_jitter` until the system
/// is numerically non-singular (at most `max_attempts` tries).
///
/// Least-squares normal equations built from one-hot blocks are rank deficient;
/// a vanishing ridge term recovers a solution close to the minimum-norm one.
pub fn solve_with_jitter(
    a: &Matrix,
    b: &[f64],
    initial_jitter: f64,
    max_attempts: usize,
) -> MlResult<Vec<f64>> {
    match solve(a, b) {
        Err(MlError::SingularMatrix) => {}
        other => return other,
    }

    let n = a.rows();
    let mean_diag = (0..n).map(|i| a.data()[i * n + i].abs()).sum::<f64>() / n.max(1) as f64;
    let mut lambda = initial_jitter * mean_diag.max(1.0);
    for _ in 0..max_attempts {
        let mut shifted = a.data().to_vec();
        for i in 0..n {
            shifted[i * n + i] += lambda;
        }
        let shifted = Matrix::new(shifted, n, n)?;
        match lu(&shifted) {
            Ok(decomp) => return Ok(substitute(&decomp, b)),
            Err(MlError::SingularMatrix) => lambda *= 10.0,
            Err(e) => return Err(e),
        }
    }
    Err(MlError::SingularMatrix)
}

fn substitute(decomp: &LuDecomposition, b: &[f64]) -> Vec<f64> {
    let n = decomp.n;
    let lu = &decomp.lu;

    // Forward substitution: L·y = P·b
    let mut y: Vec<f64> = decomp.pivot.iter().map(|&p| b[p]).collect();
    for i in 0..n {
        let mut sum = 0.0;
        for j in 0..i {
            sum += lu[i * n + j] * y[j];
        }
        y[i] -= sum;
    }

    // Back substitution: U·x = y
    let mut x = vec![0.0; n];
    for i in (0..n).rev() {
        let mut sum = 0.0;
        for j in (i + 1)..n {
            sum += lu[i * n + j] * x[j];
        }
        x[i] = (y[i] - sum) / lu[i * n + i];
    }
    x
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_solve() {
        // 2x + y = 5
        // x + 3y = 7
        let a = Matrix::new(vec![2.0, 1.0, 1.0, 3.0], 2, 2).unwrap();
        let x = solve(&a, &[5.0, 7.0]).unwrap();
        assert_abs_diff_eq!(x[0], 1.6, epsilon = 1e-10);
        assert_abs_diff_eq!(x[1], 1.8, epsilon = 1e-10);
    }

    #[test]
    fn test_solve_needs_pivoting() {
        let a = Matrix::from_rows(&[vec![0.0, 2.0], vec![3.0, 1.0]]).unwrap();
        let x = solve(&a, &[4.0, 5.0]).unwrap();
        assert_abs_diff_eq!(x[0], 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(x[1], 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_solve_with_jitter_handles_rank_deficiency() {
        // Duplicate column: normal equations of [x, x] are singular.
        let a = Matrix::from_rows(&[vec![2.0, 2.0], vec![2.0, 2.0]]).unwrap();
        assert!(matches!(solve(&a, &[4.0, 4.0]), Err(MlError::SingularMatrix)));

        let x = solve_with_jitter(&a, &[4.0, 4.0], 1e-10, 8).unwrap();
        // Minimum-norm solution splits the weight evenly.
        assert_abs_diff_eq!(x[0], 1.0, epsilon = 1e-4);
        assert_abs_diff_eq!(x[1], 1.0, epsilon = 1e-4);
    }
}
