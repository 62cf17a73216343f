use std::{fmt, str::FromStr};

use nalgebra::{DMatrix, Dyn, Matrix, storage::StorageMut};

use crate::error::{InvalidArgument, Reason};

/// How a computed product is combined with an existing output buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignmentOp {
    /// `out = value`
    Overwrite,

    /// `out += value`
    Add,

    /// `out -= value`
    Subtract,
}

impl AssignmentOp {
    /// Combines `scale * a` into `out` according to this mode.
    ///
    /// `out` may be a view into a larger matrix, which is how block-structured
    /// Jacobian products write into a slice of their output.
    ///
    /// # Panics
    ///
    /// Panics if `out` and `a` have different shapes. Callers validate shapes
    /// first and return [`InvalidArgument`] instead.
    pub fn apply<S>(self, out: &mut Matrix<f64, Dyn, Dyn, S>, a: &DMatrix<f64>, scale: f64)
    where
        S: StorageMut<f64, Dyn, Dyn>,
    {
        match self {
            Self::Overwrite => out.zip_apply(a, |o, v| *o = scale * v),
            Self::Add => out.zip_apply(a, |o, v| *o += scale * v),
            Self::Subtract => out.zip_apply(a, |o, v| *o -= scale * v),
        }
    }
}

impl fmt::Display for AssignmentOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Overwrite => "overwrite",
            Self::Add => "add",
            Self::Subtract => "subtract",
        };
        f.write_str(name)
    }
}

impl FromStr for AssignmentOp {
    type Err = InvalidArgument;

    /// Parses a mode name, also accepting the `setto`/`addto`/`rmfrom` spellings.
    ///
    /// Unknown names are rejected rather than mapped to a default mode.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "overwrite" | "setto" => Ok(Self::Overwrite),
            "add" | "addto" => Ok(Self::Add),
            "subtract" | "rmfrom" => Ok(Self::Subtract),
            other => Err(InvalidArgument::new(
                "op",
                Reason::UnknownAssignmentOp(other.to_owned()),
            )),
        }
    }
}
