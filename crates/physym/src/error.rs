//! Error taxonomy. Declarations either complete or fail synchronously; there
//! is no retry path, and a failed declaration leaves the registry untouched.

use crate::dimension::Dimension;
use thiserror::Error;

/// Raised by the dimensional checker when an expression cannot be assigned a
/// consistent dimension.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UnitsError {
    #[error("inconsistent units: `{term}` has dimension {found}, expected {expected}")]
    InconsistentUnits {
        term: String,
        found: Dimension,
        expected: Dimension,
    },
    #[error("cannot exponentiate a dimensioned quantity by a non-numeric power: `{base}` ** `{exponent}`")]
    NonNumericExponent { base: String, exponent: String },
    #[error("unknown symbol `{0}` (not registered)")]
    UnknownSymbol(String),
}

/// Raised by quantity/equation declaration and registry operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeclareError {
    #[error(transparent)]
    Units(#[from] UnitsError),
    #[error("malformed declaration for `{name}`: {reason}")]
    MalformedDeclaration { name: String, reason: String },
    #[error("invalid expression units for `{name}`: {lhs} == {rhs}")]
    EquationUnits {
        name: String,
        lhs: Dimension,
        rhs: Dimension,
    },
    #[error("unknown handle `{0}`")]
    UnknownHandle(String),
}

/// Raised by numeric evaluation of an expression against registered defaults.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvalError {
    #[error("symbol `{0}` has no value (no override, default, or definition)")]
    MissingValue(String),
    #[error("division by zero")]
    DivisionByZero,
    #[error("expression is not numerically evaluable: {0}")]
    NotEvaluable(String),
}

/// Non-fatal registry events. Emitted via `tracing::warn!` and buffered on the
/// registry so callers can assert on them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryWarning {
    Overridden {
        name: String,
        previous: String,
        current: String,
    },
    Removed {
        name: String,
    },
}

impl std::fmt::Display for RegistryWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RegistryWarning::Overridden {
                name,
                previous,
                current,
            } => write!(f, "`{name}` ({previous}) will be overridden by ({current})"),
            RegistryWarning::Removed { name } => write!(f, "`{name}` will be unregistered"),
        }
    }
}
