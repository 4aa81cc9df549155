use homeval_data::{Column, DataResult, Frame};

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

/// Standard deviation of the Gaussian noise added to `SalePrice`.
pub const HOUSING_NOISE_STD: f64 = 15_000.0;
/// Intercept of the price signal.
pub const HOUSING_BASE_PRICE: f64 = 20_000.0;
/// Price per square foot of `GrLivArea`, the only column the target depends on.
pub const HOUSING_PRICE_PER_SQFT: f64 = 100.0;

const ZONES: &[&str] = &["RL", "RM", "FV", "RH"];
const NEIGHBORHOODS: &[&str] = &["NAmes", "CollgCr", "OldTown", "Edwards", "Somerst", "Gilbert"];
const ALLEYS: &[&str] = &["Grvl", "Pave"];
const POOLS: &[&str] = &["Gd", "Ex", "Fa"];
const FENCES: &[&str] = &["MnPrv", "GdWo", "GdPrv"];
const MISC: &[&str] = &["Shed", "Gar2"];

/// Box-Muller draw from the standard normal.
fn standard_normal(rng: &mut StdRng) -> f64 {
    let u1: f64 = rng.gen::<f64>().max(1e-10);
    let u2: f64 = rng.gen();
    (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
}

fn maybe<T>(rng: &mut StdRng, missing_rate: f64, value: T) -> Option<T> {
    if rng.gen::<f64>() < missing_rate {
        None
    } else {
        Some(value)
    }
}

fn pick(rng: &mut StdRng, choices: &[&str]) -> String {
    choices.choose(rng).copied().unwrap_or_default().to_string()
}

/// Generate a house-prices-shaped table with a known linear signal.
///
/// Columns: `Id`, five numeric features, three categorical features, the four
/// sparse columns the default preparation drops, and `SalePrice`, which equals
/// `HOUSING_BASE_PRICE + HOUSING_PRICE_PER_SQFT * GrLivArea` plus Gaussian
/// noise with standard deviation [`HOUSING_NOISE_STD`]. `GrLivArea` and the
/// target are never missing; the other columns carry a few missing values.
pub fn make_housing(n_samples: usize, seed: u64) -> DataResult<Frame> {
    let mut rng = StdRng::seed_from_u64(seed);

    let mut id = Vec::with_capacity(n_samples);
    let mut lot_area = Vec::with_capacity(n_samples);
    let mut overall_qual = Vec::with_capacity(n_samples);
    let mut year_built = Vec::with_capacity(n_samples);
    let mut gr_liv_area = Vec::with_capacity(n_samples);
    let mut garage_cars = Vec::with_capacity(n_samples);
    let mut zoning = Vec::with_capacity(n_samples);
    let mut neighborhood = Vec::with_capacity(n_samples);
    let mut central_air = Vec::with_capacity(n_samples);
    let mut alley = Vec::with_capacity(n_samples);
    let mut pool = Vec::with_capacity(n_samples);
    let mut fence = Vec::with_capacity(n_samples);
    let mut misc = Vec::with_capacity(n_samples);
    let mut price = Vec::with_capacity(n_samples);

    for i in 0..n_samples {
        id.push(Some((i + 1) as f64));

        let lot = 4_000.0 + rng.gen::<f64>() * 16_000.0;
        lot_area.push(maybe(&mut rng, 0.05, lot.round()));
        let qual = rng.gen_range(1..=10) as f64;
        overall_qual.push(Some(qual));
        let year = rng.gen_range(1900..2011) as f64;
        year_built.push(maybe(&mut rng, 0.02, year));
        let area = (800.0 + rng.gen::<f64>() * 2_700.0).round();
        gr_liv_area.push(Some(area));
        let cars = rng.gen_range(0..=3) as f64;
        garage_cars.push(maybe(&mut rng, 0.03, cars));

        let zone = pick(&mut rng, ZONES);
        zoning.push(maybe(&mut rng, 0.03, zone));
        neighborhood.push(Some(pick(&mut rng, NEIGHBORHOODS)));
        let air = if rng.gen::<f64>() < 0.9 { "Y" } else { "N" };
        central_air.push(maybe(&mut rng, 0.02, air.to_string()));

        let a = pick(&mut rng, ALLEYS);
        alley.push(maybe(&mut rng, 0.94, a));
        let p = pick(&mut rng, POOLS);
        pool.push(maybe(&mut rng, 0.99, p));
        let f = pick(&mut rng, FENCES);
        fence.push(maybe(&mut rng, 0.8, f));
        let m = pick(&mut rng, MISC);
        misc.push(maybe(&mut rng, 0.96, m));

        let noise = standard_normal(&mut rng) * HOUSING_NOISE_STD;
        let y = HOUSING_BASE_PRICE + HOUSING_PRICE_PER_SQFT * area + noise;
        price.push(Some(y.max(1.0)));
    }

    let names = [
        "Id",
        "LotArea",
        "OverallQual",
        "YearBuilt",
        "GrLivArea",
        "GarageCars",
        "MSZoning",
        "Neighborhood",
        "CentralAir",
        "Alley",
        "PoolQC",
        "Fence",
        "MiscFeature",
        "SalePrice",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();
    let columns = vec![
        Column::Numeric(id),
        Column::Numeric(lot_area),
        Column::Numeric(overall_qual),
        Column::Numeric(year_built),
        Column::Numeric(gr_liv_area),
        Column::Numeric(garage_cars),
        Column::Categorical(zoning),
        Column::Categorical(neighborhood),
        Column::Categorical(central_air),
        Column::Categorical(alley),
        Column::Categorical(pool),
        Column::Categorical(fence),
        Column::Categorical(misc),
        Column::Numeric(price),
    ];
    Frame::new(names, columns)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_shape_and_types() {
        let frame = make_housing(200, 42).unwrap();
        assert_eq!(frame.n_rows(), 200);
        assert_eq!(frame.n_cols(), 14);
        assert!(frame.column("MSZoning").unwrap().as_categorical().is_some());
        assert!(frame.column("SalePrice").unwrap().as_numeric().is_some());
        assert_eq!(frame.column("SalePrice").unwrap().missing_count(), 0);
        assert_eq!(frame.column("GrLivArea").unwrap().missing_count(), 0);
        assert!(frame.column("Alley").unwrap().missing_count() > 150);
    }

    #[test]
    fn test_seeded() {
        assert_eq!(make_housing(50, 7).unwrap(), make_housing(50, 7).unwrap());
        assert_ne!(make_housing(50, 7).unwrap(), make_housing(50, 8).unwrap());
    }

    #[test]
    fn test_signal_is_recoverable() {
        let frame = make_housing(1000, 1).unwrap();
        let area: Vec<f64> = frame.column("GrLivArea").unwrap().as_numeric().unwrap()
            .iter()
            .flatten()
            .copied()
            .collect();
        let price: Vec<f64> = frame.column("SalePrice").unwrap().as_numeric().unwrap()
            .iter()
            .flatten()
            .copied()
            .collect();
        let residuals: Vec<f64> = area
            .iter()
            .zip(&price)
            .map(|(a, p)| p - HOUSING_BASE_PRICE - HOUSING_PRICE_PER_SQFT * a)
            .collect();
        let mean = residuals.iter().sum::<f64>() / residuals.len() as f64;
        let std = (residuals.iter().map(|r| (r - mean) * (r - mean)).sum::<f64>()
            / residuals.len() as f64)
            .sqrt();
        assert_abs_diff_eq!(mean, 0.0, epsilon = 2_000.0);
        assert_abs_diff_eq!(std, HOUSING_NOISE_STD, epsilon = 1_500.0);
    }
}
