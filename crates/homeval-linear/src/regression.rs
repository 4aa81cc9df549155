use homeval_core::{check_xy, Matrix, MlError, MlResult, Regressor};
use homeval_linalg::solve_with_jitter;

/// First diagonal shift tried on a rank-deficient system, relative to its scale.
const INITIAL_JITTER: f64 = 1e-10;
const JITTER_ATTEMPTS: usize = 8;

/// Least squares on centered data: solves `(XcᵀXc + αI)·w = Xcᵀyc` and
/// recovers the intercept from the means, so it is never penalized.
fn fit_centered(x: &Matrix, y: &[f64], alpha: f64) -> MlResult<(Vec<f64>, f64)> {
    check_xy(x, y)?;
    let (n, p) = x.shape();
    let means = x.column_means();
    let y_mean = y.iter().sum::<f64>() / n as f64;
    if p == 0 {
        return Ok((Vec::new(), y_mean));
    }

    let mut gram = vec![0.0; p * p];
    let mut xty = vec![0.0; p];
    let mut centered = vec![0.0; p];
    for (i, &yi) in y.iter().enumerate() {
        for ((c, &v), &m) in centered.iter_mut().zip(x.row(i)).zip(&means) {
            *c = v - m;
        }
        let yc = yi - y_mean;
        for a in 0..p {
            let ca = centered[a];
            if ca == 0.0 {
                continue;
            }
            xty[a] += ca * yc;
            let row = &mut gram[a * p..(a + 1) * p];
            for (g, &cb) in row[a..].iter_mut().zip(&centered[a..]) {
                *g += ca * cb;
            }
        }
    }
    // Mirror the upper triangle and apply the penalty.
    for a in 0..p {
        for b in 0..a {
            gram[a * p + b] = gram[b * p + a];
        }
        gram[a * p + a] += alpha;
    }

    let gram = Matrix::new(gram, p, p)?;
    let weights = solve_with_jitter(&gram, &xty, INITIAL_JITTER, JITTER_ATTEMPTS)?;
    let bias = y_mean - means.iter().zip(&weights).map(|(m, w)| m * w).sum::<f64>();
    Ok((weights, bias))
}

fn predict_linear(weights: &[f64], bias: f64, x: &Matrix) -> MlResult<Vec<f64>> {
    Ok(x.dot_vec(weights)?.into_iter().map(|v| v + bias).collect())
}

/// Ordinary Least Squares linear regression.
///
/// Fits `y = Xw + b` through the centered normal equations. Collinear inputs
/// (a full one-hot block next to the intercept) are solved with a vanishing
/// ridge term, which approaches the minimum-norm solution.
#[derive(Debug, Clone, Default)]
pub struct LinearRegression {
    pub weights: Option<Vec<f64>>,
    pub bias: Option<f64>,
}

impl LinearRegression {
    pub fn new() -> Self {
        LinearRegression {
            weights: None,
            bias: None,
        }
    }
}

impl Regressor for LinearRegression {
    fn name(&self) -> &'static str {
        "Linear Regression"
    }

    fn fit(&mut self, x: &Matrix, y: &[f64]) -> MlResult<()> {
        let (weights, bias) = fit_centered(x, y, 0.0)?;
        self.weights = Some(weights);
        self.bias = Some(bias);
        Ok(())
    }

    fn predict(&self, x: &Matrix) -> MlResult<Vec<f64>> {
        match (&self.weights, self.bias) {
            (Some(w), Some(b)) => predict_linear(w, b, x),
            _ => Err(MlError::NotFitted("LinearRegression")),
        }
    }

    fn clone_unfitted(&self) -> Box<dyn Regressor> {
        Box::new(LinearRegression::new())
    }
}

/// Ridge regression (L2-regularized).
///
/// Fits `w = (XcᵀXc + αI)⁻¹Xcᵀyc` on centered data; the intercept is not penalized.
#[derive(Debug, Clone)]
pub struct Ridge {
    pub alpha: f64,
    pub weights: Option<Vec<f64>>,
    pub bias: Option<f64>,
}

impl Ridge {
    pub fn new(alpha: f64) -> Self {
        Ridge {
            alpha,
            weights: None,
            bias: None,
        }
    }
}

impl Default for Ridge {
    fn default() -> Self {
        Ridge::new(1.0)
    }
}

impl Regressor for Ridge {
    fn name(&self) -> &'static str {
        "Ridge"
    }

    fn fit(&mut self, x: &Matrix, y: &[f64]) -> MlResult<()> {
        if !(self.alpha.is_finite() && self.alpha >= 0.0) {
            return Err(MlError::InvalidParameter(format!(
                "ridge alpha must be finite and non-negative, got {}",
                self.alpha
            )));
        }
        let (weights, bias) = fit_centered(x, y, self.alpha)?;
        self.weights = Some(weights);
        self.bias = Some(bias);
        Ok(())
    }

    fn predict(&self, x: &Matrix) -> MlResult<Vec<f64>> {
        match (&self.weights, self.bias) {
            (Some(w), Some(b)) => predict_linear(w, b, x),
            _ => Err(MlError::NotFitted("Ridge")),
        }
    }

    fn clone_unfitted(&self) -> Box<dyn Regressor> {
        Box::new(Ridge::new(self.alpha))
    }
}
