//! Quantity declarations: a named physical variable with a unit, optional
//! default value, and optional defining expression over other quantities.

use crate::expr::Expr;
use crate::unit::Unit;
use std::collections::BTreeSet;

/// Immutable record produced by a successful declaration. Owned by the
/// registry; callers hold `Symbol` handles pointing at it.
#[derive(Clone, Debug)]
pub struct QuantityDefinition {
    pub name: String,
    pub latex_name: String,
    pub doc: String,
    /// Declared or derived unit. Mandatory: dimensionless quantities carry
    /// `Unit::one()`.
    pub unit: Unit,
    /// Algebraic assumptions passed through to the CAS, opaque here.
    pub assumptions: BTreeSet<String>,
    pub default: Option<f64>,
    /// Defining expression, present when the quantity was declared by formula.
    pub expr: Option<Expr>,
}

/// Builder for a quantity declaration. Exactly one of [`Quantity::unit`] and
/// [`Quantity::expr`] must ultimately determine the dimension; giving both
/// cross-checks them.
#[derive(Clone, Debug)]
pub struct Quantity {
    pub(crate) name: String,
    pub(crate) latex_name: Option<String>,
    pub(crate) doc: String,
    pub(crate) unit: Option<Unit>,
    pub(crate) assumptions: BTreeSet<String>,
    pub(crate) default: Option<f64>,
    pub(crate) expr: Option<Expr>,
}

impl Quantity {
    pub fn new(name: impl Into<String>, doc: impl Into<String>) -> Self {
        let mut assumptions = BTreeSet::new();
        assumptions.insert("real".to_string());
        Self {
            name: name.into(),
            latex_name: None,
            doc: doc.into(),
            unit: None,
            assumptions,
            default: None,
            expr: None,
        }
    }

    /// Declared unit. Omit when [`Quantity::expr`] should derive it.
    pub fn unit(mut self, unit: Unit) -> Self {
        self.unit = Some(unit);
        self
    }

    /// Display name for rendering; defaults to the declared name.
    pub fn latex(mut self, latex_name: impl Into<String>) -> Self {
        self.latex_name = Some(latex_name.into());
        self
    }

    /// Default numeric value, stored in the registry's defaults map.
    pub fn default(mut self, value: f64) -> Self {
        self.default = Some(value);
        self
    }

    /// Defining expression over previously declared quantities. The unit is
    /// derived from it unless a declared unit is given to cross-check.
    pub fn expr(mut self, expr: impl Into<Expr>) -> Self {
        self.expr = Some(expr.into());
        self
    }

    /// Add an algebraic assumption (e.g. "positive"). "real" is preset.
    pub fn assumption(mut self, name: impl Into<String>) -> Self {
        self.assumptions.insert(name.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Re-key the builder under a qualified name, used for equation-internal
    /// quantities (`equation_name.param_name`).
    pub(crate) fn qualified(mut self, owner: &str) -> Self {
        if self.latex_name.is_none() {
            self.latex_name = Some(self.name.clone());
        }
        self.name = format!("{owner}.{}", self.name);
        self
    }
}
