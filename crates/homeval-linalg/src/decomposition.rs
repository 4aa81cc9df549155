use homeval_core::{Matrix, MlError, MlResult};

/// Pivots smaller than this fraction of the largest diagonal magnitude are
/// treated as zero.
pub const RELATIVE_PIVOT_TOLERANCE: f64 = 1e-12;

/// LU decomposition result: P·A = L·U, with L and U packed into one matrix.
///
/// The strict lower triangle holds L (unit diagonal implied), the upper
/// triangle holds U. `pivot[i]` is the original row now at position `i`.
pub struct LuDecomposition {
    pub lu: Vec<f64>,
    pub n: usize,
    pub pivot: Vec<usize>,
}

/// LU decomposition with partial pivoting.
///
/// Fails with [`MlError::SingularMatrix`] when a pivot vanishes relative to the
/// scale of the input.
pub fn lu(a: &Matrix) -> MlResult<LuDecomposition> {
    let (n, m) = a.shape();
    if n != m {
        return Err(MlError::DimensionMismatch(format!(
            "LU requires a square matrix, got {n}x{m}"
        )));
    }
    if n == 0 {
        return Err(MlError::EmptyInput("LU of an empty matrix".into()));
    }

    let mut lu = a.data().to_vec();
    let mut pivot: Vec<usize> = (0..n).collect();

    let scale = (0..n).map(|i| lu[i * n + i].abs()).fold(0.0_f64, f64::max);
    let tol = if scale > 0.0 {
        scale * RELATIVE_PIVOT_TOLERANCE
    } else {
        f64::EPSILON
    };

    for k in 0..n {
        let mut max_val = lu[k * n + k].abs();
        let mut max_row = k;
        for i in (k + 1)..n {
            let v = lu[i * n + k].abs();
            if v > max_val {
                max_val = v;
                max_row = i;
            }
        }

        if !max_val.is_finite() || max_val <= tol {
            return Err(MlError::SingularMatrix);
        }

        if max_row != k {
            pivot.swap(k, max_row);
            for j in 0..n {
                lu.swap(k * n + j, max_row * n + j);
            }
        }

        let diag = lu[k * n + k];
        for i in (k + 1)..n {
            let factor = lu[i * n + k] / diag;
            lu[i * n + k] = factor;
            if factor == 0.0 {
                continue;
            }
            for j in (k + 1)..n {
                lu[i * n + j] -= factor * lu[k * n + j];
            }
        }
    }

    Ok(LuDecomposition { lu, n, pivot })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lu_detects_singular() {
        let a = Matrix::from_rows(&[vec![1.0, 2.0], vec![2.0, 4.0]]).unwrap();
        assert!(matches!(lu(&a), Err(MlError::SingularMatrix)));
    }

    #[test]
    fn test_lu_rejects_non_square() {
        let a = Matrix::zeros(2, 3);
        assert!(lu(&a).is_err());
    }

    #[test]
    fn test_lu_pivots() {
        let a = Matrix::from_rows(&[vec![0.0, 1.0], vec![1.0, 0.0]]).unwrap();
        let decomp = lu(&a).unwrap();
        assert_eq!(decomp.pivot, vec![1, 0]);
    }
}
