use std::{borrow::Cow, fmt};

use nalgebra::{DMatrix, DVector};
use thiserror::Error;

/// The shape of a vector or matrix argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    /// A column vector with the given length.
    Vector(usize),

    /// A matrix with the given number of rows and columns.
    Matrix(usize, usize),
}

impl Shape {
    /// Returns the shape of a dense vector.
    #[must_use]
    pub fn of_vector(v: &DVector<f64>) -> Self {
        Self::Vector(v.len())
    }

    /// Returns the shape of a dense matrix.
    #[must_use]
    pub fn of_matrix(m: &DMatrix<f64>) -> Self {
        Self::Matrix(m.nrows(), m.ncols())
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Vector(n) => write!(f, "{n}"),
            Self::Matrix(rows, cols) => write!(f, "{rows}x{cols}"),
        }
    }
}

/// Why an argument was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Reason {
    /// The argument has the wrong length or shape.
    #[error("has dimension {actual} (expected {expected})")]
    Dimension { actual: Shape, expected: Shape },

    /// A matrix that must be symmetric is not, within the configured tolerance.
    #[error("is not symmetric")]
    NotSymmetric,

    /// A cost block failed its Cholesky factorization.
    #[error("is not positive semi-definite")]
    NotPositiveSemiDefinite,

    /// A data instance was created by another model type, or its buffers
    /// were resized after creation.
    #[error("was not created by this model")]
    IncompatibleData,

    /// An accumulation mode name that is not recognized.
    #[error("`{0}` is not an accumulation mode")]
    UnknownAssignmentOp(String),
}

/// The only error raised by stage models and control parametrizations.
///
/// It is always returned before any model field or output buffer is written,
/// so a failed call leaves everything exactly as it was.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid argument `{argument}`: {reason}")]
pub struct InvalidArgument {
    argument: Cow<'static, str>,
    reason: Reason,
}

impl InvalidArgument {
    /// Creates an error for the named argument.
    pub fn new(argument: impl Into<Cow<'static, str>>, reason: Reason) -> Self {
        Self {
            argument: argument.into(),
            reason,
        }
    }

    /// Creates a dimension mismatch error for the named argument.
    pub fn dimension(argument: impl Into<Cow<'static, str>>, actual: Shape, expected: Shape) -> Self {
        Self::new(argument, Reason::Dimension { actual, expected })
    }

    /// Returns the name of the rejected argument.
    #[must_use]
    pub fn argument(&self) -> &str {
        &self.argument
    }

    /// Returns why the argument was rejected.
    #[must_use]
    pub fn reason(&self) -> &Reason {
        &self.reason
    }
}

/// Checks that `v` has length `expected`.
///
/// # Errors
///
/// Returns [`InvalidArgument`] naming `argument` if the length differs.
pub fn check_vector(
    argument: &'static str,
    v: &DVector<f64>,
    expected: usize,
) -> Result<(), InvalidArgument> {
    if v.len() == expected {
        Ok(())
    } else {
        Err(InvalidArgument::dimension(
            argument,
            Shape::of_vector(v),
            Shape::Vector(expected),
        ))
    }
}

/// Checks that `m` is a `rows x cols` matrix.
///
/// # Errors
///
/// Returns [`InvalidArgument`] naming `argument` if either dimension differs.
pub fn check_matrix(
    argument: &'static str,
    m: &DMatrix<f64>,
    rows: usize,
    cols: usize,
) -> Result<(), InvalidArgument> {
    if m.nrows() == rows && m.ncols() == cols {
        Ok(())
    } else {
        Err(InvalidArgument::dimension(
            argument,
            Shape::of_matrix(m),
            Shape::Matrix(rows, cols),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_names_argument_and_dimensions() {
        let x = DVector::zeros(3);
        let err = check_vector("x", &x, 2).unwrap_err();

        assert_eq!(err.argument(), "x");
        assert_eq!(
            err.to_string(),
            "invalid argument `x`: has dimension 3 (expected 2)"
        );
    }

    #[test]
    fn matrix_shape_is_rows_by_cols() {
        let a = DMatrix::zeros(2, 3);
        let err = check_matrix("A", &a, 2, 2).unwrap_err();

        assert_eq!(
            err.reason(),
            &Reason::Dimension {
                actual: Shape::Matrix(2, 3),
                expected: Shape::Matrix(2, 2),
            }
        );
        assert_eq!(
            err.to_string(),
            "invalid argument `A`: has dimension 2x3 (expected 2x2)"
        );
    }

    #[test]
    fn matching_shapes_pass() {
        assert!(check_vector("u", &DVector::zeros(4), 4).is_ok());
        assert!(check_matrix("B", &DMatrix::zeros(4, 1), 4, 1).is_ok());
        assert!(check_vector("empty", &DVector::zeros(0), 0).is_ok());
    }
}
