//! Shared fixtures for the integration tests.

use nalgebra::{DMatrix, DVector};
use stagewise_core::{
    AssignmentOp, ControlData, ControlParametrization, InvalidArgument, StageData, StageModel,
};

/// Rolls `x0` forward through the stage models and returns the total cost
/// together with the final state.
///
/// Step `k` evaluates `models[k % models.len()]` into `data[k]`, so a single
/// time-invariant model can be shared by every step. The final state is
/// charged with the terminal cost of `terminal`.
///
/// # Errors
///
/// Returns the first [`InvalidArgument`] raised by a model.
///
/// # Panics
///
/// Panics if `models` is empty or `data` is shorter than `controls`.
pub fn rollout(
    models: &[Box<dyn StageModel>],
    data: &mut [StageData],
    terminal: (&dyn StageModel, &mut StageData),
    x0: &DVector<f64>,
    controls: &[DVector<f64>],
) -> Result<(f64, DVector<f64>), InvalidArgument> {
    let mut x = x0.clone();
    let mut total = 0.0;
    for (k, u) in controls.iter().enumerate() {
        let model = &models[k % models.len()];
        model.calc(&mut data[k], &x, u)?;
        total += data[k].cost;
        x.copy_from(&data[k].xnext);
    }

    let (model, terminal_data) = terminal;
    model.calc_terminal(terminal_data, &x)?;
    Ok((total + terminal_data.cost, x))
}

/// One RK4 step of `ẋ = A x + B w(t)` with `w` given by a parametrization.
///
/// Returns the next state and its Jacobian with respect to the parameters.
///
/// # Errors
///
/// Returns the first [`InvalidArgument`] raised by the parametrization.
pub fn rk4_step<P: ControlParametrization>(
    a: &DMatrix<f64>,
    b: &DMatrix<f64>,
    control: &P,
    data: &mut ControlData,
    x: &DVector<f64>,
    u: &DVector<f64>,
    dt: f64,
) -> Result<(DVector<f64>, DMatrix<f64>), InvalidArgument> {
    // (offset into the step, normalized control time, quadrature weight)
    let stages = [(0.0, 0.0, 1.0), (0.5, 0.5, 2.0), (0.5, 0.5, 2.0), (1.0, 1.0, 1.0)];

    let mut k = DVector::zeros(x.len());
    let mut dk = DMatrix::zeros(x.len(), control.nu());
    let mut x_next = x.clone();
    let mut dx_next = DMatrix::zeros(x.len(), control.nu());

    for (offset, t, weight) in stages {
        control.calc(data, t, u)?;
        let h = offset * dt;

        // k = A (x + h k_prev) + B w
        k = a * (x + &k * h) + b * &data.w;

        // dk = A h dk_prev + B ∂w/∂u
        dk = a * &dk * h;
        control.multiply_by_jacobian(data, b, &mut dk, AssignmentOp::Add)?;

        x_next += &k * (dt * weight / 6.0);
        dx_next += &dk * (dt * weight / 6.0);
    }

    Ok((x_next, dx_next))
}
