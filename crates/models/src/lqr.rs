//! Time-invariant linear-quadratic stage model.
//!
//! # Model
//!
//! ```text
//! x' = A x + B u + f
//! l(x, u) = ½ xᵀQx + ½ uᵀRu + xᵀNu + qᵀx + rᵀu
//! ```
//!
//! All derivatives are exact: the dynamics Jacobians are `A` and `B`, the
//! cost Hessians are `Q`, `R` and `N`, and the gradients are
//! `q + Qx + Nu` and `r + Nᵀx + Ru`.
//!
//! # Invariants
//!
//! The stacked cost block `[Q, N; Nᵀ, R]` is symmetric and Cholesky
//! factorizable, so the cost is bounded below. Every constructor that takes
//! user matrices checks this, and [`LqrModel::set_lqr`] replaces all matrices
//! at once or not at all.

mod config;
mod params;


pub use config::{Config, ConfigError};
pub use params::LqrParams;

use nalgebra::{DMatrix, DVector};
use rand::Rng;
use stagewise_core::{InvalidArgument, ModelTag, StageData, StageModel, StateVector};
use tracing::debug;

/// A linear-quadratic stage model.
#[derive(Debug, Clone, PartialEq)]
pub struct LqrModel {
    state: StateVector,
    nu: usize,
    params: LqrParams,
    drift_free: bool,
    config: Config,
}

impl LqrModel {
    /// Creates a drift-free model with zero linear cost terms.
    ///
    /// Dimensions are taken from `a` (columns) and `b` (columns).
    ///
    /// # Errors
    ///
    /// Returns [`InvalidArgument`] if a shape is inconsistent or the cost
    /// block is not symmetric positive semi-definite.
    pub fn new(
        a: DMatrix<f64>,
        b: DMatrix<f64>,
        q: DMatrix<f64>,
        r: DMatrix<f64>,
        n: DMatrix<f64>,
    ) -> Result<Self, InvalidArgument> {
        let nx = a.ncols();
        let nu = b.ncols();
        let params = LqrParams {
            a,
            b,
            q,
            r,
            n,
            f: DVector::zeros(nx),
            q_vec: DVector::zeros(nx),
            r_vec: DVector::zeros(nu),
        };
        Self::validated(params, true, Config::default())
    }

    /// Creates a model with a drift term and linear cost terms.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidArgument`] if a shape is inconsistent or the cost
    /// block is not symmetric positive semi-definite.
    pub fn with_drift(params: LqrParams) -> Result<Self, InvalidArgument> {
        Self::validated(params, false, Config::default())
    }

    /// Creates a test model with `A = I`, `B = I`, `Q = I`, `R = I`, `N = 0`.
    ///
    /// The linear cost terms are all ones. The drift is zero when
    /// `drift_free` is set and all ones otherwise.
    #[must_use]
    pub fn identity(nx: usize, nu: usize, drift_free: bool) -> Self {
        let f = if drift_free {
            DVector::zeros(nx)
        } else {
            DVector::from_element(nx, 1.0)
        };
        let params = LqrParams {
            a: DMatrix::identity(nx, nx),
            b: DMatrix::identity(nx, nu),
            q: DMatrix::identity(nx, nx),
            r: DMatrix::identity(nu, nu),
            n: DMatrix::zeros(nx, nu),
            f,
            q_vec: DVector::from_element(nx, 1.0),
            r_vec: DVector::from_element(nu, 1.0),
        };
        Self::assemble(params, drift_free, Config::default())
    }

    /// Creates a model with random dynamics and a random positive definite cost.
    #[must_use]
    pub fn random(nx: usize, nu: usize) -> Self {
        Self::random_with(&mut rand::thread_rng(), nx, nu)
    }

    /// Creates a random model using `rng`.
    ///
    /// Entries of `A`, `B`, `f`, `q` and `r` are uniform on `[-1, 1]`. The
    /// cost block is `Hᵀ H` for a uniform random square `H`, split into `Q`,
    /// `N` and `R`, which makes it symmetric positive semi-definite by
    /// construction.
    pub fn random_with<R: Rng + ?Sized>(rng: &mut R, nx: usize, nu: usize) -> Self {
        let a = uniform_matrix(rng, nx, nx);
        let b = uniform_matrix(rng, nx, nu);
        let h_tmp = uniform_matrix(rng, nx + nu, nx + nu);
        let h = h_tmp.tr_mul(&h_tmp);
        let params = LqrParams {
            a,
            b,
            q: h.view((0, 0), (nx, nx)).into_owned(),
            r: h.view((nx, nx), (nu, nu)).into_owned(),
            n: h.view((0, nx), (nx, nu)).into_owned(),
            f: uniform_vector(rng, nx),
            q_vec: uniform_vector(rng, nx),
            r_vec: uniform_vector(rng, nu),
        };
        Self::assemble(params, false, Config::default())
    }

    /// Replaces the validation config, revalidating the current parameters.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidArgument`] if the current cost block fails the
    /// symmetry check under the new tolerance.
    pub fn with_config(mut self, config: Config) -> Result<Self, InvalidArgument> {
        self.params
            .validate(self.nx(), self.nu, &config)
            .inspect_err(|err| debug!(%err, "rejected LQR config"))?;
        self.config = config;
        Ok(self)
    }

    /// Replaces every matrix and vector of the model.
    ///
    /// All shapes and the cost block invariant are checked first. On error
    /// the model is left unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidArgument`] naming the first offending parameter.
    pub fn set_lqr(&mut self, params: LqrParams) -> Result<(), InvalidArgument> {
        let (nx, nu) = (self.nx(), self.nu);
        params
            .validate(nx, nu, &self.config)
            .inspect_err(|err| debug!(%err, nx, nu, "rejected LQR parameters"))?;
        self.params = params;
        Ok(())
    }

    /// Returns the state transition matrix `A`.
    #[must_use]
    pub fn a(&self) -> &DMatrix<f64> {
        &self.params.a
    }

    /// Returns the control input matrix `B`.
    #[must_use]
    pub fn b(&self) -> &DMatrix<f64> {
        &self.params.b
    }

    /// Returns the state cost weight `Q`.
    #[must_use]
    pub fn q(&self) -> &DMatrix<f64> {
        &self.params.q
    }

    /// Returns the control cost weight `R`.
    #[must_use]
    pub fn r(&self) -> &DMatrix<f64> {
        &self.params.r
    }

    /// Returns the cross cost weight `N`.
    #[must_use]
    pub fn n(&self) -> &DMatrix<f64> {
        &self.params.n
    }

    /// Returns the drift term `f`.
    #[must_use]
    pub fn f(&self) -> &DVector<f64> {
        &self.params.f
    }

    /// Returns the linear state cost `q`.
    #[must_use]
    pub fn q_vec(&self) -> &DVector<f64> {
        &self.params.q_vec
    }

    /// Returns the linear control cost `r`.
    #[must_use]
    pub fn r_vec(&self) -> &DVector<f64> {
        &self.params.r_vec
    }

    /// Returns all parameters at once.
    #[must_use]
    pub fn params(&self) -> &LqrParams {
        &self.params
    }

    /// Returns whether the model was built without drift or linear cost terms.
    #[must_use]
    pub fn drift_free(&self) -> bool {
        self.drift_free
    }

    /// Returns the validation config.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    fn validated(
        params: LqrParams,
        drift_free: bool,
        config: Config,
    ) -> Result<Self, InvalidArgument> {
        let nx = params.a.ncols();
        let nu = params.b.ncols();
        params
            .validate(nx, nu, &config)
            .inspect_err(|err| debug!(%err, nx, nu, "rejected LQR parameters"))?;
        Ok(Self::assemble(params, drift_free, config))
    }

    fn assemble(params: LqrParams, drift_free: bool, config: Config) -> Self {
        Self {
            state: StateVector::new(params.a.ncols()),
            nu: params.b.ncols(),
            params,
            drift_free,
            config,
        }
    }
}

impl StageModel for LqrModel {
    fn tag(&self) -> ModelTag {
        ModelTag::of::<Self>()
    }

    fn state(&self) -> &StateVector {
        &self.state
    }

    fn nu(&self) -> usize {
        self.nu
    }

    fn calc(
        &self,
        data: &mut StageData,
        x: &DVector<f64>,
        u: &DVector<f64>,
    ) -> Result<(), InvalidArgument> {
        self.check_inputs(data, x, Some(u))?;
        let p = &self.params;

        data.xnext.gemv(1.0, &p.a, x, 0.0);
        data.xnext.gemv(1.0, &p.b, u, 1.0);
        data.xnext += &p.f;

        data.scratch.x.gemv(1.0, &p.q, x, 0.0);
        data.cost = 0.5 * x.dot(&data.scratch.x);
        data.scratch.u.gemv(1.0, &p.r, u, 0.0);
        data.cost += 0.5 * u.dot(&data.scratch.u);
        data.scratch.x.gemv(1.0, &p.n, u, 0.0);
        data.cost += x.dot(&data.scratch.x);
        data.cost += p.q_vec.dot(x) + p.r_vec.dot(u);
        Ok(())
    }

    fn calc_terminal(
        &self,
        data: &mut StageData,
        x: &DVector<f64>,
    ) -> Result<(), InvalidArgument> {
        self.check_inputs(data, x, None)?;
        let p = &self.params;

        data.xnext.copy_from(x);
        data.scratch.x.gemv(1.0, &p.q, x, 0.0);
        data.cost = 0.5 * x.dot(&data.scratch.x) + p.q_vec.dot(x);
        Ok(())
    }

    fn calc_diff(
        &self,
        data: &mut StageData,
        x: &DVector<f64>,
        u: &DVector<f64>,
    ) -> Result<(), InvalidArgument> {
        self.check_inputs(data, x, Some(u))?;
        let p = &self.params;

        data.fx.copy_from(&p.a);
        data.fu.copy_from(&p.b);
        data.lxx.copy_from(&p.q);
        data.luu.copy_from(&p.r);
        data.lxu.copy_from(&p.n);

        // Lx = q + Qx + Nu
        data.lx.copy_from(&p.q_vec);
        data.lx.gemv(1.0, &p.q, x, 1.0);
        data.lx.gemv(1.0, &p.n, u, 1.0);

        // Lu = r + Nᵀx + Ru
        data.lu.copy_from(&p.r_vec);
        data.lu.gemv_tr(1.0, &p.n, x, 1.0);
        data.lu.gemv(1.0, &p.r, u, 1.0);
        Ok(())
    }

    fn calc_diff_terminal(
        &self,
        data: &mut StageData,
        x: &DVector<f64>,
    ) -> Result<(), InvalidArgument> {
        self.check_inputs(data, x, None)?;
        let p = &self.params;

        data.lxx.copy_from(&p.q);
        data.lx.copy_from(&p.q_vec);
        data.lx.gemv(1.0, &p.q, x, 1.0);
        Ok(())
    }
}

fn uniform_matrix<R: Rng + ?Sized>(rng: &mut R, rows: usize, cols: usize) -> DMatrix<f64> {
    DMatrix::from_fn(rows, cols, |_, _| rng.gen_range(-1.0..=1.0))
}

fn uniform_vector<R: Rng + ?Sized>(rng: &mut R, len: usize) -> DVector<f64> {
    DVector::from_fn(len, |_, _| rng.gen_range(-1.0..=1.0))
}
