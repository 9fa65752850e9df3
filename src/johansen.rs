//! Johansen cointegration procedure.
//!
//! Implements the eigenvalue form of the Johansen test for a VECM with a
//! constant deterministic term (handled by demeaning) and one lagged
//! difference:
//!
//! ```text
//! Δx_t = α β' x_{t-1} + Γ Δx_{t-1} + c + ε_t
//! ```
//!
//! Both `Δx_t` and `x_{t-1}` are regressed on `Δx_{t-1}`; with residuals
//! `R0` and `R1` and moment matrices `S_ij = R_i' R_j / T`, the cointegrating
//! vectors solve the generalized symmetric eigenproblem
//!
//! ```text
//! S10 S00⁻¹ S01 v = λ S11 v
//! ```
//!
//! which is reduced to an ordinary symmetric problem through the Cholesky
//! factor of `S11`. Eigenvectors come back normalized so that `V' S11 V = I`.

use crate::error::JohansenError;
use nalgebra::{Cholesky, DMatrix, SymmetricEigen};

/// Number of lagged differences in the VECM.
pub const K_AR_DIFF: usize = 1;

const MAX_EIGEN_ITERATIONS: usize = 1_000;

/// Output of [`johansen`].
#[derive(Debug, Clone)]
pub struct JohansenResult {
    /// Eigenvalues in descending order.
    pub eigenvalues: Vec<f64>,
    /// Eigenvectors as columns, ordered like `eigenvalues`.
    pub eigenvectors: DMatrix<f64>,
    /// Trace statistics `-T Σ_{j≥i} ln(1 - λ_j)` for each rank hypothesis.
    pub trace_stats: Vec<f64>,
    /// Maximum eigenvalue statistics `-T ln(1 - λ_i)`.
    pub max_eig_stats: Vec<f64>,
    /// Observations used after differencing and lagging.
    pub nobs: usize,
}

impl JohansenResult {
    /// Cointegrating vector with the largest eigenvalue.
    pub fn leading_vector(&self) -> Vec<f64> {
        self.eigenvectors.column(0).iter().copied().collect()
    }
}

/// Minimum number of complete rows for `k` instruments.
pub fn min_rows(k: usize) -> usize {
    2 * k + K_AR_DIFF + 2
}

/// Run the procedure on a `T × k` matrix of price levels (rows are time).
///
/// Each eigenvector's sign is fixed so that its first non-zero component is
/// positive, keeping successive estimates on a rolling window comparable.
pub fn johansen(levels: &DMatrix<f64>) -> Result<JohansenResult, JohansenError> {
    let (n, k) = levels.shape();
    if n < min_rows(k) || k == 0 {
        return Err(JohansenError::WindowTooShort {
            rows: n,
            required: min_rows(k),
        });
    }
    if levels.iter().any(|v| !v.is_finite()) {
        return Err(JohansenError::NonFinite);
    }

    let x = demean(levels);
    let dx = x.rows(1, n - 1).clone_owned() - x.rows(0, n - 1);

    let t = n - 1 - K_AR_DIFF;
    let z = demean(&dx.rows(0, t).clone_owned());
    let dy = demean(&dx.rows(K_AR_DIFF, t).clone_owned());
    let lx = demean(&x.rows(K_AR_DIFF, t).clone_owned());

    let r0 = residuals(&z, &dy)?;
    let r1 = residuals(&z, &lx)?;

    let scale = 1.0 / t as f64;
    let s11 = r1.tr_mul(&r1) * scale;
    let s10 = r1.tr_mul(&r0) * scale;
    let s00 = r0.tr_mul(&r0) * scale;

    let s00_inv = s00
        .try_inverse()
        .ok_or(JohansenError::SingularMatrix("S00"))?;
    let sig = &s10 * s00_inv * s10.transpose();

    let chol = Cholesky::new(s11).ok_or(JohansenError::SingularMatrix("S11"))?;
    let l_inv = chol
        .l()
        .solve_lower_triangular(&DMatrix::identity(k, k))
        .ok_or(JohansenError::SingularMatrix("S11"))?;

    let c = &l_inv * sig * l_inv.transpose();
    let c = (&c + c.transpose()) * 0.5;

    let eig = SymmetricEigen::try_new(c, f64::EPSILON, MAX_EIGEN_ITERATIONS)
        .ok_or(JohansenError::NoConvergence)?;
    let vectors = l_inv.transpose() * &eig.eigenvectors;

    let mut order: Vec<usize> = (0..k).collect();
    order.sort_by(|&a, &b| eig.eigenvalues[b].total_cmp(&eig.eigenvalues[a]));

    let eigenvalues: Vec<f64> = order.iter().map(|&i| eig.eigenvalues[i]).collect();
    let mut eigenvectors = DMatrix::zeros(k, k);
    for (dst, &src) in order.iter().enumerate() {
        let mut col = vectors.column(src).clone_owned();
        if col.iter().find(|v| **v != 0.0).is_some_and(|v| *v < 0.0) {
            col.neg_mut();
        }
        eigenvectors.set_column(dst, &col);
    }

    let log_terms: Vec<f64> = eigenvalues
        .iter()
        .map(|&lambda| -(t as f64) * (1.0 - lambda.clamp(0.0, 1.0)).ln())
        .collect();
    let trace_stats = (0..k).map(|i| log_terms[i..].iter().sum()).collect();

    Ok(JohansenResult {
        eigenvalues,
        eigenvectors,
        trace_stats,
        max_eig_stats: log_terms,
        nobs: t,
    })
}

fn demean(m: &DMatrix<f64>) -> DMatrix<f64> {
    let mut out = m.clone();
    for mut col in out.column_iter_mut() {
        let mean = col.mean();
        col.add_scalar_mut(-mean);
    }
    out
}

/// Residuals of the least-squares regression of `y` on `z`.
fn residuals(z: &DMatrix<f64>, y: &DMatrix<f64>) -> Result<DMatrix<f64>, JohansenError> {
    let svd = z.clone().svd(true, true);
    let tol = svd.singular_values.max() * f64::EPSILON * z.nrows().max(z.ncols()) as f64;
    let beta = svd.solve(y, tol).map_err(JohansenError::Regression)?;
    Ok(y - z * beta)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Deterministic pseudo-noise in [-1, 1).
    fn noise(i: usize, seed: u64) -> f64 {
        let mut x = (i as u64 + 1).wrapping_mul(6364136223846793005).wrapping_add(seed);
        x ^= x >> 33;
        x = x.wrapping_mul(0xff51afd7ed558ccd);
        x ^= x >> 33;
        (x % 20_000) as f64 / 10_000.0 - 1.0
    }

    fn cointegrated_pair(n: usize) -> DMatrix<f64> {
        let mut a = 100.0;
        let mut dev = 0.0;
        let mut rows = Vec::with_capacity(n);
        for i in 0..n {
            a += noise(i, 7);
            dev = 0.5 * dev + 0.3 * noise(i, 11);
            rows.push((a, 2.0 * a + dev));
        }
        DMatrix::from_fn(n, 2, |i, j| if j == 0 { rows[i].0 } else { rows[i].1 })
    }

    #[test]
    fn test_recovers_cointegrating_vector() {
        let levels = cointegrated_pair(250);
        let result = johansen(&levels).unwrap();

        assert_eq!(result.eigenvalues.len(), 2);
        assert!(result.eigenvalues[0] >= result.eigenvalues[1]);
        assert!(result.eigenvalues.iter().all(|l| (-1e-9..=1.0).contains(l)));

        let v = result.leading_vector();
        assert!(v[0] > 0.0);
        let ratio = v[1] / v[0];
        assert!((ratio + 0.5).abs() < 0.05, "ratio was {}", ratio);
        assert!(result.trace_stats[0] >= result.max_eig_stats[0]);
        assert_eq!(result.nobs, 248);
    }

    #[test]
    fn test_eigenvectors_are_s11_orthonormal_shape() {
        let levels = cointegrated_pair(120);
        let result = johansen(&levels).unwrap();
        assert_eq!(result.eigenvectors.shape(), (2, 2));
        assert!(result.eigenvectors.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_constant_series_is_singular() {
        let levels = DMatrix::from_fn(30, 2, |_, j| if j == 0 { 10.0 } else { 20.0 });
        assert!(matches!(
            johansen(&levels),
            Err(JohansenError::SingularMatrix(_))
        ));
    }

    #[test]
    fn test_too_few_rows() {
        let levels = cointegrated_pair(5);
        assert_eq!(
            johansen(&levels).unwrap_err(),
            JohansenError::WindowTooShort {
                rows: 5,
                required: 7
            }
        );
    }

    #[test]
    fn test_non_finite_rejected() {
        let mut levels = cointegrated_pair(30);
        levels[(3, 1)] = f64::INFINITY;
        assert_eq!(johansen(&levels).unwrap_err(), JohansenError::NonFinite);
    }
}
