use nalgebra::{DMatrix, DVector};
use stagewise_core::{InvalidArgument, Reason, check_matrix, check_vector};

use super::Config;

/// The full parameter set of a linear-quadratic stage.
///
/// Dynamics are `x' = A x + B u + f` and the cost is
/// `½ xᵀQx + ½ uᵀRu + xᵀNu + qᵀx + rᵀu`.
#[derive(Debug, Clone, PartialEq)]
pub struct LqrParams {
    /// State transition matrix (`nx x nx`).
    pub a: DMatrix<f64>,

    /// Control input matrix (`nx x nu`).
    pub b: DMatrix<f64>,

    /// State cost weight (`nx x nx`).
    pub q: DMatrix<f64>,

    /// Control cost weight (`nu x nu`).
    pub r: DMatrix<f64>,

    /// Cross cost weight (`nx x nu`).
    pub n: DMatrix<f64>,

    /// Drift term (`nx`).
    pub f: DVector<f64>,

    /// Linear state cost `q` (`nx`).
    pub q_vec: DVector<f64>,

    /// Linear control cost `r` (`nu`).
    pub r_vec: DVector<f64>,
}

impl LqrParams {
    /// Checks every shape against `(nx, nu)` and the cost block invariant.
    ///
    /// `H = [Q, N; Nᵀ, R]` must be symmetric within the configured tolerance
    /// and admit a Cholesky factorization.
    pub(super) fn validate(
        &self,
        nx: usize,
        nu: usize,
        config: &Config,
    ) -> Result<(), InvalidArgument> {
        check_matrix("A", &self.a, nx, nx)?;
        check_matrix("B", &self.b, nx, nu)?;
        check_matrix("Q", &self.q, nx, nx)?;
        check_matrix("R", &self.r, nu, nu)?;
        check_matrix("N", &self.n, nx, nu)?;
        check_vector("f", &self.f, nx)?;
        check_vector("q", &self.q_vec, nx)?;
        check_vector("r", &self.r_vec, nu)?;

        let h = self.cost_hessian();
        let asymmetry = (&h - h.transpose()).norm();
        if asymmetry > config.symmetry_rel_tol() * h.norm() {
            return Err(InvalidArgument::new(HESSIAN, Reason::NotSymmetric));
        }
        if h.cholesky().is_none() {
            return Err(InvalidArgument::new(HESSIAN, Reason::NotPositiveSemiDefinite));
        }

        Ok(())
    }

    /// Assembles `H = [Q, N; Nᵀ, R]`.
    ///
    /// Shapes must already be consistent.
    pub(super) fn cost_hessian(&self) -> DMatrix<f64> {
        let nx = self.q.nrows();
        let nu = self.r.nrows();
        let mut h = DMatrix::zeros(nx + nu, nx + nu);
        h.view_mut((0, 0), (nx, nx)).copy_from(&self.q);
        h.view_mut((0, nx), (nx, nu)).copy_from(&self.n);
        h.view_mut((nx, 0), (nu, nx)).tr_copy_from(&self.n);
        h.view_mut((nx, nx), (nu, nu)).copy_from(&self.r);
        h
    }
}

const HESSIAN: &str = "[Q, N; Nᵀ, R]";
