//! Units: a scale factor paired with a dimension. A bare `1` is the
//! multiplicative identity with empty dimension.

use crate::dimension::{Dimension, Exponent};
use ordered_float::OrderedFloat;
use std::ops::{Div, Mul};

/// A scaled instance of a dimension (e.g. meter = 1 × length¹,
/// hour = 3600 × time¹). Named units additionally carry the symbol
/// factorization they were built from (`J kg⁻¹` rather than `m² s⁻²`), used
/// only for rendering: equality and hashing compare factor and dimension.
#[derive(Clone, Debug)]
pub struct Unit {
    factor: OrderedFloat<f64>,
    dimension: Dimension,
    display: Vec<(String, Exponent)>,
}

impl PartialEq for Unit {
    fn eq(&self, other: &Self) -> bool {
        self.factor == other.factor && self.dimension == other.dimension
    }
}

impl Eq for Unit {}

impl std::hash::Hash for Unit {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.factor.hash(state);
        self.dimension.hash(state);
    }
}

impl Unit {
    pub fn new(factor: f64, dimension: Dimension) -> Self {
        Self {
            factor: OrderedFloat::from(factor),
            dimension,
            display: Vec::new(),
        }
    }

    /// Dimensionless unity.
    pub fn one() -> Self {
        Self::new(1.0, Dimension::none())
    }

    /// Factor-1 unit of a single base dimension.
    pub fn base(dimension_name: &str) -> Self {
        Self::new(1.0, Dimension::base(dimension_name))
    }

    /// Factor-1 unit of an arbitrary dimension (used for derived quantities).
    pub fn of(dimension: Dimension) -> Self {
        Self::new(1.0, dimension)
    }

    /// Give the unit a display symbol of its own, replacing whatever
    /// factorization it was built from.
    pub fn named(mut self, symbol: impl Into<String>) -> Self {
        self.display = vec![(symbol.into(), Exponent::from_integer(1))];
        self
    }

    pub fn factor(&self) -> f64 {
        self.factor.0
    }

    pub fn dimension(&self) -> &Dimension {
        &self.dimension
    }

    /// Symbol factorization recorded at construction, in declaration order.
    /// Empty for units built without named parts.
    pub fn display_factors(&self) -> &[(String, Exponent)] {
        &self.display
    }

    pub fn is_one(&self) -> bool {
        self.factor.0 == 1.0 && self.dimension.is_none()
    }

    /// Raise to a rational power: factor via powf, dimension exactly.
    pub fn pow(&self, exp: Exponent) -> Self {
        let e = (*exp.numer() as f64) / (*exp.denom() as f64);
        let mut display: Vec<(String, Exponent)> = self
            .display
            .iter()
            .map(|(symbol, ex)| (symbol.clone(), ex * exp))
            .collect();
        display.retain(|(_, ex)| *ex != Exponent::from_integer(0));
        Self {
            factor: OrderedFloat::from(self.factor.0.powf(e)),
            dimension: self.dimension.pow(exp),
            display,
        }
    }

    /// Raise to an integer power.
    pub fn powi(&self, n: i64) -> Self {
        self.pow(Exponent::from_integer(n))
    }
}

// Factorizations combine only when both operands have one; an anonymous
// dimensioned operand makes the result fall back to base-symbol rendering.
fn merge_display(a: &Unit, b: &Unit, negate_b: bool) -> Vec<(String, Exponent)> {
    if (a.display.is_empty() && !a.dimension.is_none())
        || (b.display.is_empty() && !b.dimension.is_none())
    {
        return Vec::new();
    }
    let mut out = a.display.clone();
    for (symbol, exp) in &b.display {
        let exp = if negate_b { -*exp } else { *exp };
        if let Some(entry) = out.iter_mut().find(|(s, _)| s == symbol) {
            entry.1 += exp;
        } else {
            out.push((symbol.clone(), exp));
        }
    }
    out.retain(|(_, e)| *e != Exponent::from_integer(0));
    out
}

impl Mul for Unit {
    type Output = Unit;

    fn mul(self, rhs: Unit) -> Unit {
        let display = merge_display(&self, &rhs, false);
        Unit {
            factor: OrderedFloat::from(self.factor.0 * rhs.factor.0),
            dimension: self.dimension.mul(&rhs.dimension),
            display,
        }
    }
}

impl Div for Unit {
    type Output = Unit;

    fn div(self, rhs: Unit) -> Unit {
        let display = merge_display(&self, &rhs, true);
        Unit {
            factor: OrderedFloat::from(self.factor.0 / rhs.factor.0),
            dimension: self.dimension.div(&rhs.dimension),
            display,
        }
    }
}

impl Mul<Unit> for f64 {
    type Output = Unit;

    fn mul(self, rhs: Unit) -> Unit {
        Unit {
            factor: OrderedFloat::from(self * rhs.factor.0),
            dimension: rhs.dimension,
            display: rhs.display,
        }
    }
}

impl std::fmt::Display for Unit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.factor.0 == 1.0 {
            write!(f, "{}", self.dimension)
        } else {
            write!(f, "{}·{}", self.factor.0, self.dimension)
        }
    }
}
