//! The control parametrization contract.
//!
//! A parametrization expands a reduced parameter vector `u` (length `nu`)
//! into the instantaneous control `w(t)` (length `nw`) at a normalized time
//! `t` within an integration interval. Sub-step integrators use it to query
//! the control at their collocation nodes instead of holding one constant
//! value over the whole interval.

use nalgebra::{DMatrix, DVector};
use tracing::trace;

use crate::{
    assign::AssignmentOp,
    error::{InvalidArgument, Reason, Shape, check_vector},
    stage::ModelTag,
};

/// Buffers written by a [`ControlParametrization`].
#[derive(Debug, Clone, PartialEq)]
pub struct ControlData {
    /// Instantaneous control at the last evaluated time.
    pub w: DVector<f64>,

    /// Jacobian of `w` with respect to the parameters (`nw x nu`).
    pub dw_du: DMatrix<f64>,

    /// Parameters produced by [`ControlParametrization::params`].
    pub u: DVector<f64>,

    /// Basis function values at the last evaluated time.
    pub basis: DVector<f64>,

    /// Square of the last evaluated time.
    pub t2: f64,

    tag: ModelTag,
}

impl ControlData {
    /// Creates zeroed buffers for a parametrization with `nbasis` basis functions.
    #[must_use]
    pub fn new(tag: ModelTag, nw: usize, nu: usize, nbasis: usize) -> Self {
        trace!(nw, nu, nbasis, "allocating control data");
        Self {
            w: DVector::zeros(nw),
            dw_du: DMatrix::zeros(nw, nu),
            u: DVector::zeros(nu),
            basis: DVector::zeros(nbasis),
            t2: 0.0,
            tag,
        }
    }

    /// Returns the tag of the parametrization type that created this data.
    #[must_use]
    pub fn tag(&self) -> ModelTag {
        self.tag
    }

    /// Returns the control dimension these buffers were sized for.
    #[must_use]
    pub fn nw(&self) -> usize {
        self.w.len()
    }

    /// Returns the parameter dimension these buffers were sized for.
    #[must_use]
    pub fn nu(&self) -> usize {
        self.u.len()
    }

    /// Returns the number of basis functions these buffers were sized for.
    #[must_use]
    pub fn nbasis(&self) -> usize {
        self.basis.len()
    }

    /// Returns whether every buffer is sized for the given dimensions.
    #[must_use]
    pub fn fits(&self, nw: usize, nu: usize, nbasis: usize) -> bool {
        self.w.len() == nw
            && self.dw_du.shape() == (nw, nu)
            && self.u.len() == nu
            && self.basis.len() == nbasis
    }
}

/// Maps reduced control parameters to an instantaneous control signal.
///
/// The Jacobian products read the basis values stored by the most recent
/// [`calc`](Self::calc) on the same `data`.
pub trait ControlParametrization {
    /// Returns the tag stamped on data created by this parametrization.
    fn tag(&self) -> ModelTag;

    /// Returns the dimension of the instantaneous control.
    fn nw(&self) -> usize;

    /// Returns the dimension of the parameter vector.
    fn nu(&self) -> usize;

    /// Returns the number of basis functions stored in [`ControlData::basis`].
    fn nbasis(&self) -> usize;

    /// Computes `w(t)` from the parameters `u`.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidArgument`] if `u` has the wrong length or `data` was
    /// not created by a compatible parametrization.
    fn calc(&self, data: &mut ControlData, t: f64, u: &DVector<f64>)
    -> Result<(), InvalidArgument>;

    /// Computes the Jacobian `∂w/∂u` at time `t`.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidArgument`] under the same conditions as [`calc`](Self::calc).
    fn calc_diff(
        &self,
        data: &mut ControlData,
        t: f64,
        u: &DVector<f64>,
    ) -> Result<(), InvalidArgument>;

    /// Creates a data instance bound to this parametrization.
    fn create_data(&self) -> ControlData {
        ControlData::new(self.tag(), self.nw(), self.nu(), self.nbasis())
    }

    /// Writes into `data.u` parameters that hold `w` over the interval.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidArgument`] if `w` has the wrong length or `data` was
    /// not created by a compatible parametrization.
    fn params(&self, data: &mut ControlData, t: f64, w: &DVector<f64>)
    -> Result<(), InvalidArgument>;

    /// Maps bounds on `w` to bounds on the parameters.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidArgument`] if `w_lb`, `w_ub` do not have length `nw`
    /// or `u_lb`, `u_ub` do not have length `nu`.
    fn convert_bounds(
        &self,
        w_lb: &DVector<f64>,
        w_ub: &DVector<f64>,
        u_lb: &mut DVector<f64>,
        u_ub: &mut DVector<f64>,
    ) -> Result<(), InvalidArgument>;

    /// Computes `out op= a * ∂w/∂u`.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidArgument`] unless `a` is `m x nw` and `out` is `m x nu`.
    fn multiply_by_jacobian(
        &self,
        data: &ControlData,
        a: &DMatrix<f64>,
        out: &mut DMatrix<f64>,
        op: AssignmentOp,
    ) -> Result<(), InvalidArgument>;

    /// Computes `out op= (∂w/∂u)ᵀ * a`.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidArgument`] unless `a` is `nw x m` and `out` is `nu x m`.
    fn multiply_jacobian_transpose_by(
        &self,
        data: &ControlData,
        a: &DMatrix<f64>,
        out: &mut DMatrix<f64>,
        op: AssignmentOp,
    ) -> Result<(), InvalidArgument>;

    /// Returns whether `data` was created by a parametrization of this type and size.
    ///
    /// Every buffer is checked, including the basis length.
    fn check_data(&self, data: &ControlData) -> bool {
        data.tag() == self.tag() && data.fits(self.nw(), self.nu(), self.nbasis())
    }

    /// Returns freshly allocated parameter bounds for the given control bounds.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidArgument`] if `w_lb` or `w_ub` does not have length `nw`.
    fn bounds(
        &self,
        w_lb: &DVector<f64>,
        w_ub: &DVector<f64>,
    ) -> Result<(DVector<f64>, DVector<f64>), InvalidArgument> {
        let mut u_lb = DVector::zeros(self.nu());
        let mut u_ub = DVector::zeros(self.nu());
        self.convert_bounds(w_lb, w_ub, &mut u_lb, &mut u_ub)?;
        Ok((u_lb, u_ub))
    }

    /// Returns `a * ∂w/∂u` as a new matrix.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidArgument`] unless `a` has `nw` columns.
    fn jacobian_product(
        &self,
        data: &ControlData,
        a: &DMatrix<f64>,
    ) -> Result<DMatrix<f64>, InvalidArgument> {
        let mut out = DMatrix::zeros(a.nrows(), self.nu());
        self.multiply_by_jacobian(data, a, &mut out, AssignmentOp::Overwrite)?;
        Ok(out)
    }

    /// Returns `(∂w/∂u)ᵀ * a` as a new matrix.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidArgument`] unless `a` has `nw` rows.
    fn jacobian_transpose_product(
        &self,
        data: &ControlData,
        a: &DMatrix<f64>,
    ) -> Result<DMatrix<f64>, InvalidArgument> {
        let mut out = DMatrix::zeros(self.nu(), a.ncols());
        self.multiply_jacobian_transpose_by(data, a, &mut out, AssignmentOp::Overwrite)?;
        Ok(out)
    }
}

/// Validates `data` and a vector argument of the given expected length.
///
/// # Errors
///
/// Returns [`InvalidArgument`] naming `argument` or `data`.
pub fn check_control_inputs<P: ControlParametrization + ?Sized>(
    model: &P,
    data: &ControlData,
    argument: &'static str,
    v: &DVector<f64>,
    expected: usize,
) -> Result<(), InvalidArgument> {
    check_vector(argument, v, expected)?;
    if model.check_data(data) {
        Ok(())
    } else {
        Err(InvalidArgument::new("data", Reason::IncompatibleData))
    }
}

/// Validates the shapes of `out = a * J` where `J` is `nw x nu`.
///
/// # Errors
///
/// Returns [`InvalidArgument`] unless `a` is `m x nw` and `out` is `m x nu`.
pub fn check_jacobian_product(
    nw: usize,
    nu: usize,
    a: &DMatrix<f64>,
    out: &DMatrix<f64>,
) -> Result<(), InvalidArgument> {
    if a.ncols() != nw {
        return Err(InvalidArgument::dimension(
            "A",
            Shape::of_matrix(a),
            Shape::Matrix(a.nrows(), nw),
        ));
    }
    if out.nrows() != a.nrows() || out.ncols() != nu {
        return Err(InvalidArgument::dimension(
            "out",
            Shape::of_matrix(out),
            Shape::Matrix(a.nrows(), nu),
        ));
    }
    Ok(())
}

/// Validates the shapes of `out = Jᵀ * a` where `J` is `nw x nu`.
///
/// # Errors
///
/// Returns [`InvalidArgument`] unless `a` is `nw x m` and `out` is `nu x m`.
pub fn check_jacobian_transpose_product(
    nw: usize,
    nu: usize,
    a: &DMatrix<f64>,
    out: &DMatrix<f64>,
) -> Result<(), InvalidArgument> {
    if a.nrows() != nw {
        return Err(InvalidArgument::dimension(
            "A",
            Shape::of_matrix(a),
            Shape::Matrix(nw, a.ncols()),
        ));
    }
    if out.nrows() != nu || out.ncols() != a.ncols() {
        return Err(InvalidArgument::dimension(
            "out",
            Shape::of_matrix(out),
            Shape::Matrix(nu, a.ncols()),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forward_product_shapes() {
        let a = DMatrix::zeros(4, 2);

        assert!(check_jacobian_product(2, 6, &a, &DMatrix::zeros(4, 6)).is_ok());

        let err = check_jacobian_product(3, 9, &a, &DMatrix::zeros(4, 9)).unwrap_err();
        assert_eq!(err.argument(), "A");
        assert_eq!(err.to_string(), "invalid argument `A`: has dimension 4x2 (expected 4x3)");

        let err = check_jacobian_product(2, 6, &a, &DMatrix::zeros(3, 6)).unwrap_err();
        assert_eq!(err.argument(), "out");
    }

    #[test]
    fn transpose_product_shapes() {
        let a = DMatrix::zeros(2, 5);

        assert!(check_jacobian_transpose_product(2, 6, &a, &DMatrix::zeros(6, 5)).is_ok());

        let err = check_jacobian_transpose_product(3, 9, &a, &DMatrix::zeros(9, 5)).unwrap_err();
        assert_eq!(err.argument(), "A");

        let err = check_jacobian_transpose_product(2, 6, &a, &DMatrix::zeros(6, 4)).unwrap_err();
        assert_eq!(
            err.reason(),
            &Reason::Dimension {
                actual: Shape::Matrix(6, 4),
                expected: Shape::Matrix(6, 5),
            }
        );
    }

    #[test]
    fn new_data_is_zeroed() {
        struct Tagged;
        let data = ControlData::new(ModelTag::of::<Tagged>(), 2, 6, 3);

        assert_eq!(data.nw(), 2);
        assert_eq!(data.nu(), 6);
        assert_eq!(data.dw_du, DMatrix::zeros(2, 6));
        assert_eq!(data.nbasis(), 3);
        assert_eq!(data.tag(), ModelTag::of::<Tagged>());
    }

    #[test]
    fn fits_checks_every_buffer() {
        struct Tagged;
        let mut data = ControlData::new(ModelTag::of::<Tagged>(), 2, 6, 3);

        assert!(data.fits(2, 6, 3));
        assert!(!data.fits(2, 6, 2));

        data.dw_du = DMatrix::zeros(2, 5);
        assert!(!data.fits(2, 6, 3));
    }
}
