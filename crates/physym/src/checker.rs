//! Dimensional checker: structural recursion assigning a dimension to every
//! supported expression node, failing loudly on any additive or exponent
//! inconsistency.
//!
//! The literal zero is dimension-polymorphic: `x + 0` and a `0` piecewise
//! branch join with any dimension. Every other bare number is strictly
//! dimensionless, so `length + 5` is an error.

use crate::dimension::{Dimension, Exponent};
use crate::error::UnitsError;
use crate::expr::{Expr, Symbol};
use crate::unit::Unit;
use num_rational::Ratio;

/// Resolution of symbols to their declared units / defining expressions.
/// Implemented by [`crate::registry::Registry`]; tests can supply a plain map.
pub trait UnitScope {
    fn unit_of(&self, symbol: &Symbol) -> Option<&Unit>;

    /// Defining expression fallback, consulted when no unit is recorded.
    fn expression_of(&self, symbol: &Symbol) -> Option<&Expr> {
        let _ = symbol;
        None
    }
}

impl UnitScope for std::collections::HashMap<Symbol, Unit> {
    fn unit_of(&self, symbol: &Symbol) -> Option<&Unit> {
        self.get(symbol)
    }
}

/// Compute the dimension of `expr`, or fail with the offending term, its
/// dimension, and the expected one.
pub fn dimension_of<S: UnitScope>(expr: &Expr, scope: &S) -> Result<Dimension, UnitsError> {
    match expr {
        Expr::Number(_) => Ok(Dimension::none()),
        Expr::Symbol(s) => {
            if let Some(unit) = scope.unit_of(s) {
                return Ok(unit.dimension().clone());
            }
            match scope.expression_of(s) {
                Some(definition) => dimension_of(definition, scope),
                None => Err(UnitsError::UnknownSymbol(s.as_str().to_string())),
            }
        }
        Expr::Add(terms) => join_additive(terms.iter(), scope),
        Expr::Mul(factors) => {
            let mut dim = Dimension::none();
            for factor in factors {
                dim = dim.mul(&dimension_of(factor, scope)?);
            }
            Ok(dim)
        }
        Expr::Pow(base, exponent) => {
            let exp_dim = dimension_of(exponent, scope)?;
            if !exp_dim.is_none() {
                return Err(UnitsError::InconsistentUnits {
                    term: exponent.to_string(),
                    found: exp_dim,
                    expected: Dimension::none(),
                });
            }
            let base_dim = dimension_of(base, scope)?;
            if base_dim.is_none() {
                return Ok(Dimension::none());
            }
            match exponent.constant_value() {
                Some(value) => {
                    let rational: Exponent = Ratio::approximate_float(value).ok_or_else(|| {
                        UnitsError::NonNumericExponent {
                            base: base.to_string(),
                            exponent: exponent.to_string(),
                        }
                    })?;
                    Ok(base_dim.pow(rational))
                }
                None => Err(UnitsError::NonNumericExponent {
                    base: base.to_string(),
                    exponent: exponent.to_string(),
                }),
            }
        }
        Expr::Derivative { expr, vars } => {
            let mut dim = dimension_of(expr, scope)?;
            for (var, order) in vars {
                let var_dim = dimension_of(&Expr::Symbol(var.clone()), scope)?;
                dim = dim.div(&var_dim.pow(Exponent::from_integer(*order as i64)));
            }
            Ok(dim)
        }
        Expr::Integral { expr, var, bounds } => {
            let var_dim = dimension_of(&Expr::Symbol(var.clone()), scope)?;
            if let Some((lower, upper)) = bounds {
                check_bound(lower, &var_dim, scope)?;
                check_bound(upper, &var_dim, scope)?;
            }
            Ok(dimension_of(expr, scope)?.mul(&var_dim))
        }
        Expr::Piecewise(branches) => {
            for (_, cond) in branches {
                if let Some((a, b)) = cond.operands() {
                    join_additive([a.clone(), b.clone()].iter(), scope)?;
                }
            }
            join_additive(branches.iter().map(|(value, _)| value), scope)
        }
        Expr::Func(name, args) => match name.as_str() {
            // Dimension-preserving builtins: all arguments join, result keeps
            // the joined dimension.
            "abs" | "min" | "max" => join_additive(args.iter(), scope),
            // Everything else requires dimensionless arguments; exp(length)
            // is rejected rather than passed through.
            _ => {
                for arg in args {
                    let dim = dimension_of(arg, scope)?;
                    if !dim.is_none() {
                        return Err(UnitsError::InconsistentUnits {
                            term: format!("{name}({arg})"),
                            found: dim,
                            expected: Dimension::none(),
                        });
                    }
                }
                Ok(Dimension::none())
            }
        },
        Expr::Equality(lhs, rhs) => {
            let lhs_dim = dimension_of(lhs, scope)?;
            let rhs_dim = dimension_of(rhs, scope)?;
            match (lhs.is_zero(), rhs.is_zero()) {
                (true, _) => Ok(rhs_dim),
                (_, true) => Ok(lhs_dim),
                _ if lhs_dim == rhs_dim => Ok(lhs_dim),
                _ => Err(UnitsError::InconsistentUnits {
                    term: rhs.to_string(),
                    found: rhs_dim,
                    expected: lhs_dim,
                }),
            }
        }
    }
}

/// Additive join: reference dimension is the first non-zero term's; every
/// other non-zero term must match it. All-zero (or empty) joins are
/// dimensionless.
fn join_additive<'a, S: UnitScope>(
    terms: impl Iterator<Item = &'a Expr>,
    scope: &S,
) -> Result<Dimension, UnitsError> {
    let mut reference: Option<Dimension> = None;
    for term in terms {
        if term.is_zero() {
            continue;
        }
        let dim = dimension_of(term, scope)?;
        match &reference {
            None => reference = Some(dim),
            Some(expected) if *expected == dim => {}
            Some(expected) => {
                return Err(UnitsError::InconsistentUnits {
                    term: term.to_string(),
                    found: dim,
                    expected: expected.clone(),
                })
            }
        }
    }
    Ok(reference.unwrap_or_default())
}

fn check_bound<S: UnitScope>(
    bound: &Expr,
    var_dim: &Dimension,
    scope: &S,
) -> Result<(), UnitsError> {
    if bound.is_zero() {
        return Ok(());
    }
    let dim = dimension_of(bound, scope)?;
    if dim == *var_dim {
        Ok(())
    } else {
        Err(UnitsError::InconsistentUnits {
            term: bound.to_string(),
            found: dim,
            expected: var_dim.clone(),
        })
    }
}
