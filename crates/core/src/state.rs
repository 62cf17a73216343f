use nalgebra::{DMatrix, DVector};
use rand::Rng;

use crate::error::{InvalidArgument, check_matrix, check_vector};

/// A flat Euclidean state space of dimension `nx`.
///
/// The tangent space coincides with the state space (`ndx == nx`), so the
/// difference of two states is a plain subtraction and integrating a tangent
/// vector is a plain addition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateVector {
    nx: usize,
}

impl StateVector {
    /// Creates a state space with `nx` coordinates.
    #[must_use]
    pub fn new(nx: usize) -> Self {
        Self { nx }
    }

    /// Returns the dimension of a state.
    #[must_use]
    pub fn nx(&self) -> usize {
        self.nx
    }

    /// Returns the dimension of the tangent space.
    #[must_use]
    pub fn ndx(&self) -> usize {
        self.nx
    }

    /// Returns the origin of the state space.
    #[must_use]
    pub fn zero(&self) -> DVector<f64> {
        DVector::zeros(self.nx)
    }

    /// Returns a state drawn uniformly from `[-1, 1]^nx`.
    #[must_use]
    pub fn random(&self) -> DVector<f64> {
        self.random_with(&mut rand::thread_rng())
    }

    /// Returns a state drawn uniformly from `[-1, 1]^nx` using `rng`.
    pub fn random_with<R: Rng + ?Sized>(&self, rng: &mut R) -> DVector<f64> {
        DVector::from_fn(self.nx, |_, _| rng.gen_range(-1.0..=1.0))
    }

    /// Writes `dx = x1 - x0`.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidArgument`] if any vector does not have length `nx`.
    pub fn diff(
        &self,
        x0: &DVector<f64>,
        x1: &DVector<f64>,
        dx: &mut DVector<f64>,
    ) -> Result<(), InvalidArgument> {
        check_vector("x0", x0, self.nx)?;
        check_vector("x1", x1, self.nx)?;
        check_vector("dx", dx, self.nx)?;

        dx.copy_from(x1);
        *dx -= x0;
        Ok(())
    }

    /// Writes `x_next = x + dx`.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidArgument`] if any vector does not have length `nx`.
    pub fn integrate(
        &self,
        x: &DVector<f64>,
        dx: &DVector<f64>,
        x_next: &mut DVector<f64>,
    ) -> Result<(), InvalidArgument> {
        check_vector("x", x, self.nx)?;
        check_vector("dx", dx, self.nx)?;
        check_vector("x_next", x_next, self.nx)?;

        x_next.copy_from(x);
        *x_next += dx;
        Ok(())
    }

    /// Writes the Jacobians of [`diff`](Self::diff) with respect to `x0` and `x1`.
    ///
    /// These are `-I` and `I` regardless of the states.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidArgument`] if either output is not `nx x nx`.
    pub fn jdiff(
        &self,
        d_dx0: &mut DMatrix<f64>,
        d_dx1: &mut DMatrix<f64>,
    ) -> Result<(), InvalidArgument> {
        check_matrix("d_dx0", d_dx0, self.nx, self.nx)?;
        check_matrix("d_dx1", d_dx1, self.nx, self.nx)?;

        d_dx0.fill_with_identity();
        d_dx0.neg_mut();
        d_dx1.fill_with_identity();
        Ok(())
    }
}
