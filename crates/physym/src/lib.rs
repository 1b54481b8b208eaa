//! Dimensional analysis for symbolic physical equations.
//!
//! A [`registry::Registry`] owns every declared quantity and equation.
//! Quantities carry SI units ([`unit::Unit`] over [`dimension::Dimension`]);
//! equations are checked equalities between [`expr::Expr`] trees. Every
//! declaration runs through the recursive checker in [`checker`], so an
//! expression that mixes metres with seconds is rejected before it is
//! registered.
//!
//! ```
//! use physym::prelude::*;
//!
//! let mut reg = Registry::new();
//! let d = reg.declare(Quantity::new("d", "Distance fallen.").unit(meter()))?;
//! let t = reg.declare(Quantity::new("t", "Elapsed time.").unit(second()))?;
//! let g = reg.declare(
//!     Quantity::new("g", "Gravitational acceleration.")
//!         .unit(meter() / second().powi(2))
//!         .default(9.8),
//! )?;
//! let eq = reg.declare_equation(Equation::new(
//!     "eq_fall",
//!     "Distance fallen under constant gravity.",
//!     &d,
//!     &g * t.powi(2) / 2.0,
//! ))?;
//! assert!(reg.get_unit(&eq).is_some());
//! # Ok::<(), physym::error::DeclareError>(())
//! ```

pub mod checker;
pub mod dimension;
pub mod equation;
pub mod error;
pub mod expr;
pub mod quantity;
pub mod registry;
pub mod si;
pub mod unit;

/// The names most callers want in scope.
pub mod prelude {
    pub use crate::checker::{dimension_of, UnitScope};
    pub use crate::dimension::Dimension;
    pub use crate::equation::Equation;
    pub use crate::error::{DeclareError, EvalError, UnitsError};
    pub use crate::expr::{exp, log, sqrt, Cond, Expr, Symbol};
    pub use crate::quantity::Quantity;
    pub use crate::registry::Registry;
    pub use crate::si::{
        ampere, candela, joule, kelvin, kilogram, meter, mole, newton, pascal, second, watt,
        SiCatalog,
    };
    pub use crate::unit::Unit;
}
