use thiserror::Error;

/// Validation settings for [`LqrModel`](super::LqrModel) parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Config {
    symmetry_rel_tol: f64,
}

/// Errors that can occur when validating an LQR config.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    #[error("symmetry_rel_tol must be finite and non-negative")]
    SymmetryRel,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            symmetry_rel_tol: 1e-12,
        }
    }
}

impl Config {
    /// Creates a new config with a validated tolerance.
    ///
    /// The cost block `H = [Q, N; Nᵀ, R]` is accepted as symmetric when
    /// `‖H - Hᵀ‖ <= symmetry_rel_tol * ‖H‖` in the Frobenius norm.
    ///
    /// # Errors
    ///
    /// Returns an error if the tolerance is negative or non-finite.
    pub fn new(symmetry_rel_tol: f64) -> Result<Self, ConfigError> {
        if !symmetry_rel_tol.is_finite() || symmetry_rel_tol < 0.0 {
            return Err(ConfigError::SymmetryRel);
        }

        Ok(Self { symmetry_rel_tol })
    }

    /// Returns the relative tolerance for the symmetry check.
    #[must_use]
    pub fn symmetry_rel_tol(&self) -> f64 {
        self.symmetry_rel_tol
    }
}
