//! The differentiable stage model contract.
//!
//! A stage model evaluates one timestep of an optimal control problem: the
//! next state reached from `(x, u)`, the running cost, and the first and
//! second derivatives a shooting solver needs for its backward pass.
//!
//! Evaluation writes into a [`StageData`] created by the model itself. The
//! solver keeps one data instance per timestep and passes it by `&mut` on
//! every call, so buffers are reused across iterations without allocating.

use std::any::TypeId;

use nalgebra::{DMatrix, DVector};
use tracing::trace;

use crate::{
    error::{InvalidArgument, Reason, check_vector},
    state::StateVector,
};

/// Identifies the model type that created a data instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ModelTag(TypeId);

impl ModelTag {
    /// Returns the tag for model type `M`.
    #[must_use]
    pub fn of<M: ?Sized + 'static>() -> Self {
        Self(TypeId::of::<M>())
    }
}

/// Scratch space owned by a data instance.
///
/// Models use it to hold intermediate products such as `Q x` or `R u`.
/// Its contents are unspecified between calls.
#[derive(Debug, Clone, PartialEq)]
pub struct Scratch {
    /// State-sized workspace.
    pub x: DVector<f64>,

    /// Control-sized workspace.
    pub u: DVector<f64>,
}

/// Output buffers written by a [`StageModel`].
///
/// Derivative names follow the usual shooting-method convention: `f` is the
/// dynamics, `l` the cost, and subscripts denote partial derivatives.
#[derive(Debug, Clone, PartialEq)]
pub struct StageData {
    /// Next state.
    pub xnext: DVector<f64>,

    /// Stage cost.
    pub cost: f64,

    /// Jacobian of the dynamics with respect to the state (`nx x nx`).
    pub fx: DMatrix<f64>,

    /// Jacobian of the dynamics with respect to the control (`nx x nu`).
    pub fu: DMatrix<f64>,

    /// Gradient of the cost with respect to the state.
    pub lx: DVector<f64>,

    /// Gradient of the cost with respect to the control.
    pub lu: DVector<f64>,

    /// Hessian of the cost with respect to the state (`nx x nx`).
    pub lxx: DMatrix<f64>,

    /// Hessian of the cost with respect to the control (`nu x nu`).
    pub luu: DMatrix<f64>,

    /// Mixed Hessian of the cost (`nx x nu`).
    pub lxu: DMatrix<f64>,

    /// Model-private workspace.
    pub scratch: Scratch,

    tag: ModelTag,
}

impl StageData {
    /// Creates zeroed buffers for a model with the given tag and dimensions.
    #[must_use]
    pub fn new(tag: ModelTag, nx: usize, nu: usize) -> Self {
        trace!(nx, nu, "allocating stage data");
        Self {
            xnext: DVector::zeros(nx),
            cost: 0.0,
            fx: DMatrix::zeros(nx, nx),
            fu: DMatrix::zeros(nx, nu),
            lx: DVector::zeros(nx),
            lu: DVector::zeros(nu),
            lxx: DMatrix::zeros(nx, nx),
            luu: DMatrix::zeros(nu, nu),
            lxu: DMatrix::zeros(nx, nu),
            scratch: Scratch {
                x: DVector::zeros(nx),
                u: DVector::zeros(nu),
            },
            tag,
        }
    }

    /// Returns the tag of the model type that created this data.
    #[must_use]
    pub fn tag(&self) -> ModelTag {
        self.tag
    }

    /// Returns the state dimension these buffers were sized for.
    #[must_use]
    pub fn nx(&self) -> usize {
        self.xnext.len()
    }

    /// Returns the control dimension these buffers were sized for.
    #[must_use]
    pub fn nu(&self) -> usize {
        self.lu.len()
    }

    /// Returns whether every buffer is sized for a model with dimensions `(nx, nu)`.
    #[must_use]
    pub fn fits(&self, nx: usize, nu: usize) -> bool {
        self.xnext.len() == nx
            && self.fx.shape() == (nx, nx)
            && self.fu.shape() == (nx, nu)
            && self.lx.len() == nx
            && self.lu.len() == nu
            && self.lxx.shape() == (nx, nx)
            && self.luu.shape() == (nu, nu)
            && self.lxu.shape() == (nx, nu)
            && self.scratch.x.len() == nx
            && self.scratch.u.len() == nu
    }
}

/// A per-timestep dynamics and cost evaluator.
///
/// Every evaluation validates its inputs before writing anything, so an
/// `Err` leaves `data` untouched.
///
/// `calc_diff` does not recompute `xnext` or `cost`. Its results are only
/// meaningful when called with the same inputs as the most recent `calc` on
/// the same `data`.
pub trait StageModel {
    /// Returns the tag stamped on data created by this model.
    fn tag(&self) -> ModelTag;

    /// Returns the state space.
    fn state(&self) -> &StateVector;

    /// Returns the dimension of the control.
    fn nu(&self) -> usize;

    /// Returns the dimension of the state.
    fn nx(&self) -> usize {
        self.state().nx()
    }

    /// Computes the next state and the stage cost.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidArgument`] if `x` or `u` has the wrong length or
    /// `data` was not created by a compatible model.
    fn calc(
        &self,
        data: &mut StageData,
        x: &DVector<f64>,
        u: &DVector<f64>,
    ) -> Result<(), InvalidArgument>;

    /// Computes the terminal cost, leaving `xnext = x`.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidArgument`] if `x` has the wrong length or `data` was
    /// not created by a compatible model.
    fn calc_terminal(&self, data: &mut StageData, x: &DVector<f64>)
    -> Result<(), InvalidArgument>;

    /// Computes the dynamics Jacobians and the cost gradient and Hessian.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidArgument`] under the same conditions as [`calc`](Self::calc).
    fn calc_diff(
        &self,
        data: &mut StageData,
        x: &DVector<f64>,
        u: &DVector<f64>,
    ) -> Result<(), InvalidArgument>;

    /// Computes the terminal cost gradient and Hessian with respect to `x`.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidArgument`] under the same conditions as
    /// [`calc_terminal`](Self::calc_terminal).
    fn calc_diff_terminal(
        &self,
        data: &mut StageData,
        x: &DVector<f64>,
    ) -> Result<(), InvalidArgument>;

    /// Creates a data instance bound to this model.
    fn create_data(&self) -> StageData {
        StageData::new(self.tag(), self.nx(), self.nu())
    }

    /// Returns whether `data` was created by a model of this type and size.
    ///
    /// Every buffer is checked, so data whose public fields were resized
    /// after creation is rejected as well.
    fn check_data(&self, data: &StageData) -> bool {
        data.tag() == self.tag() && data.fits(self.nx(), self.nu())
    }

    /// Validates the arguments of an evaluation.
    ///
    /// Pass `u = None` for the terminal forms.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidArgument`] for the first argument that does not fit.
    fn check_inputs(
        &self,
        data: &StageData,
        x: &DVector<f64>,
        u: Option<&DVector<f64>>,
    ) -> Result<(), InvalidArgument> {
        check_vector("x", x, self.nx())?;
        if let Some(u) = u {
            check_vector("u", u, self.nu())?;
        }
        if !self.check_data(data) {
            return Err(InvalidArgument::new("data", Reason::IncompatibleData));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Single integrator: `x' = x + u`, cost `½|u|²`.
    struct SingleIntegrator {
        state: StateVector,
    }

    impl StageModel for SingleIntegrator {
        fn tag(&self) -> ModelTag {
            ModelTag::of::<Self>()
        }

        fn state(&self) -> &StateVector {
            &self.state
        }

        fn nu(&self) -> usize {
            self.state.nx()
        }

        fn calc(
            &self,
            data: &mut StageData,
            x: &DVector<f64>,
            u: &DVector<f64>,
        ) -> Result<(), InvalidArgument> {
            self.check_inputs(data, x, Some(u))?;
            data.xnext.copy_from(x);
            data.xnext += u;
            data.cost = 0.5 * u.norm_squared();
            Ok(())
        }

        fn calc_terminal(
            &self,
            data: &mut StageData,
            x: &DVector<f64>,
        ) -> Result<(), InvalidArgument> {
            self.check_inputs(data, x, None)?;
            data.xnext.copy_from(x);
            data.cost = 0.0;
            Ok(())
        }

        fn calc_diff(
            &self,
            data: &mut StageData,
            x: &DVector<f64>,
            u: &DVector<f64>,
        ) -> Result<(), InvalidArgument> {
            self.check_inputs(data, x, Some(u))?;
            data.fx.fill_with_identity();
            data.fu.fill_with_identity();
            data.lu.copy_from(u);
            data.luu.fill_with_identity();
            Ok(())
        }

        fn calc_diff_terminal(
            &self,
            data: &mut StageData,
            x: &DVector<f64>,
        ) -> Result<(), InvalidArgument> {
            self.check_inputs(data, x, None)
        }
    }

    struct Other;

    #[test]
    fn created_data_matches_model() {
        let model = SingleIntegrator {
            state: StateVector::new(2),
        };
        let data = model.create_data();

        assert!(model.check_data(&data));
        assert_eq!(data.nx(), 2);
        assert_eq!(data.nu(), 2);
        assert_eq!(data.fu.shape(), (2, 2));
        assert_eq!(data.scratch.x.len(), 2);
    }

    #[test]
    fn foreign_tag_fails_check() {
        let model = SingleIntegrator {
            state: StateVector::new(2),
        };
        let data = StageData::new(ModelTag::of::<Other>(), 2, 2);

        assert!(!model.check_data(&data));
    }

    #[test]
    fn data_of_other_size_fails_check() {
        let small = SingleIntegrator {
            state: StateVector::new(2),
        };
        let large = SingleIntegrator {
            state: StateVector::new(3),
        };

        assert!(!small.check_data(&large.create_data()));
    }

    #[test]
    fn resized_buffer_fails_check() {
        let model = SingleIntegrator {
            state: StateVector::new(2),
        };
        let x = DVector::from_vec(vec![1.0, 2.0]);
        let u = DVector::from_vec(vec![0.5, -0.5]);

        let resize: [fn(&mut StageData); 4] = [
            |data: &mut StageData| data.lxu = DMatrix::zeros(5, 5),
            |data: &mut StageData| data.luu = DMatrix::zeros(2, 3),
            |data: &mut StageData| data.lx = DVector::zeros(1),
            |data: &mut StageData| data.scratch.u = DVector::zeros(4),
        ];
        for resize in resize {
            let mut data = model.create_data();
            resize(&mut data);
            let before = data.clone();

            assert!(!model.check_data(&data));
            let err = model.calc_diff(&mut data, &x, &u).unwrap_err();
            assert_eq!(err.argument(), "data");
            assert_eq!(err.reason(), &Reason::IncompatibleData);
            assert_eq!(data, before);
        }
    }

    #[test]
    fn evaluation_checks_inputs_before_writing() {
        let model = SingleIntegrator {
            state: StateVector::new(2),
        };
        let mut data = model.create_data();
        let x = DVector::from_vec(vec![1.0, 2.0]);

        let err = model
            .calc(&mut data, &x, &DVector::zeros(3))
            .unwrap_err();
        assert_eq!(err.argument(), "u");
        assert_eq!(data.xnext, DVector::zeros(2));

        let mut foreign = StageData::new(ModelTag::of::<Other>(), 2, 2);
        let err = model.calc_terminal(&mut foreign, &x).unwrap_err();
        assert_eq!(err.reason(), &Reason::IncompatibleData);
        assert_eq!(foreign.xnext, DVector::zeros(2));
    }

    #[test]
    fn works_through_trait_objects() {
        let model: Box<dyn StageModel> = Box::new(SingleIntegrator {
            state: StateVector::new(1),
        });
        let mut data = model.create_data();
        let x = DVector::from_vec(vec![1.0]);
        let u = DVector::from_vec(vec![2.0]);

        model.calc(&mut data, &x, &u).unwrap();
        model.calc_diff(&mut data, &x, &u).unwrap();

        assert_eq!(data.xnext[0], 3.0);
        assert_eq!(data.cost, 2.0);
        assert_eq!(data.lu[0], 2.0);
    }
}
