//! Quadratic control parametrization for Runge-Kutta 4 sub-steps.
//!
//! The parameter vector stacks three control nodes `u = [p0; p1; p2]`, each
//! of length `nw`, pinned at the start (`t = 0`), midpoint (`t = ½`) and end
//! (`t = 1`) of the interval. These are exactly the times at which a
//! classical RK4 step samples the control. In between, the control follows
//! the quadratic Lagrange interpolant:
//!
//! ```text
//! c2 = 2t² - t
//! c1 = -2 c2 + 2t
//! c0 = c2 - 2t + 1
//! w(t) = c0 p0 + c1 p1 + c2 p2
//! ```
//!
//! The coefficients sum to one for every `t`, so equal nodes reproduce a
//! constant control.


use nalgebra::{DMatrix, DVector};
use stagewise_core::{
    AssignmentOp, ControlData, ControlParametrization, InvalidArgument, ModelTag, Reason,
    check_control_inputs, check_jacobian_product, check_jacobian_transpose_product, check_vector,
};

/// Number of control nodes.
const NODES: usize = 3;

/// Quadratic collocation parametrization with three nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PolyTwoRk4 {
    nw: usize,
}

impl PolyTwoRk4 {
    /// Creates a parametrization for a control of dimension `nw`.
    #[must_use]
    pub fn new(nw: usize) -> Self {
        Self { nw }
    }

    /// Returns the Lagrange basis `[c0, c1, c2]` at time `t`.
    #[must_use]
    pub fn basis(t: f64) -> [f64; NODES] {
        let c2 = 2.0 * t * t - t;
        let c1 = -2.0 * c2 + 2.0 * t;
        let c0 = c2 - 2.0 * t + 1.0;
        [c0, c1, c2]
    }

    fn store_basis(data: &mut ControlData, t: f64) -> [f64; NODES] {
        let c = Self::basis(t);
        data.t2 = t * t;
        data.basis.copy_from_slice(&c);
        c
    }

    fn ensure_data(&self, data: &ControlData) -> Result<(), InvalidArgument> {
        if self.check_data(data) {
            Ok(())
        } else {
            Err(InvalidArgument::new("data", Reason::IncompatibleData))
        }
    }
}

impl ControlParametrization for PolyTwoRk4 {
    fn tag(&self) -> ModelTag {
        ModelTag::of::<Self>()
    }

    fn nw(&self) -> usize {
        self.nw
    }

    fn nu(&self) -> usize {
        NODES * self.nw
    }

    fn nbasis(&self) -> usize {
        NODES
    }

    fn calc(
        &self,
        data: &mut ControlData,
        t: f64,
        u: &DVector<f64>,
    ) -> Result<(), InvalidArgument> {
        check_control_inputs(self, data, "u", u, self.nu())?;
        let nw = self.nw;
        let c = Self::store_basis(data, t);

        data.w.axpy(c[0], &u.rows(0, nw), 0.0);
        data.w.axpy(c[1], &u.rows(nw, nw), 1.0);
        data.w.axpy(c[2], &u.rows(2 * nw, nw), 1.0);
        Ok(())
    }

    fn calc_diff(
        &self,
        data: &mut ControlData,
        t: f64,
        u: &DVector<f64>,
    ) -> Result<(), InvalidArgument> {
        check_control_inputs(self, data, "u", u, self.nu())?;
        let nw = self.nw;
        let c = Self::store_basis(data, t);

        data.dw_du.fill(0.0);
        for (node, coefficient) in c.into_iter().enumerate() {
            data.dw_du
                .columns_mut(node * nw, nw)
                .fill_diagonal(coefficient);
        }
        Ok(())
    }

    fn params(
        &self,
        data: &mut ControlData,
        _t: f64,
        w: &DVector<f64>,
    ) -> Result<(), InvalidArgument> {
        check_control_inputs(self, data, "w", w, self.nw)?;
        for node in 0..NODES {
            data.u.rows_mut(node * self.nw, self.nw).copy_from(w);
        }
        Ok(())
    }

    fn convert_bounds(
        &self,
        w_lb: &DVector<f64>,
        w_ub: &DVector<f64>,
        u_lb: &mut DVector<f64>,
        u_ub: &mut DVector<f64>,
    ) -> Result<(), InvalidArgument> {
        check_vector("u_lb", u_lb, self.nu())?;
        check_vector("u_ub", u_ub, self.nu())?;
        check_vector("w_lb", w_lb, self.nw)?;
        check_vector("w_ub", w_ub, self.nw)?;

        for node in 0..NODES {
            u_lb.rows_mut(node * self.nw, self.nw).copy_from(w_lb);
            u_ub.rows_mut(node * self.nw, self.nw).copy_from(w_ub);
        }
        Ok(())
    }

    fn multiply_by_jacobian(
        &self,
        data: &ControlData,
        a: &DMatrix<f64>,
        out: &mut DMatrix<f64>,
        op: AssignmentOp,
    ) -> Result<(), InvalidArgument> {
        check_jacobian_product(self.nw, self.nu(), a, out)?;
        self.ensure_data(data)?;

        for (node, &coefficient) in data.basis.iter().enumerate() {
            op.apply(&mut out.columns_mut(node * self.nw, self.nw), a, coefficient);
        }
        Ok(())
    }

    fn multiply_jacobian_transpose_by(
        &self,
        data: &ControlData,
        a: &DMatrix<f64>,
        out: &mut DMatrix<f64>,
        op: AssignmentOp,
    ) -> Result<(), InvalidArgument> {
        check_jacobian_transpose_product(self.nw, self.nu(), a, out)?;
        self.ensure_data(data)?;

        for (node, &coefficient) in data.basis.iter().enumerate() {
            op.apply(&mut out.rows_mut(node * self.nw, self.nw), a, coefficient);
        }
        Ok(())
    }
}
