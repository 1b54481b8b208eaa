//! Equation declarations: a checked equality between two expressions, with
//! provenance (parent equations) and optional equation-scoped quantities.

use crate::expr::{Expr, Symbol};
use crate::quantity::Quantity;

/// Immutable record for a registered equation. The lhs/rhs are stored with
/// internal quantities already rewritten to their qualified names.
#[derive(Clone, Debug)]
pub struct EquationDefinition {
    pub name: String,
    pub doc: String,
    pub lhs: Expr,
    pub rhs: Expr,
    /// Equations this one was derived from, in derivation order.
    pub parents: Vec<Symbol>,
    /// Handles of the equation-scoped quantities (qualified names).
    pub internal: Vec<Symbol>,
}

impl EquationDefinition {
    /// The equality expression keying the equation-equivalent registry.
    pub fn expr(&self) -> Expr {
        Expr::equality(self.lhs.clone(), self.rhs.clone())
    }
}

/// Builder for an equation declaration. Internal quantities are regular
/// quantities whose names get qualified as `equation_name.param_name`; the
/// lhs/rhs may refer to them by their short names.
#[derive(Clone, Debug)]
pub struct Equation {
    pub(crate) name: String,
    pub(crate) doc: String,
    pub(crate) lhs: Expr,
    pub(crate) rhs: Expr,
    pub(crate) parents: Vec<Symbol>,
    pub(crate) internal: Vec<Quantity>,
}

impl Equation {
    pub fn new(
        name: impl Into<String>,
        doc: impl Into<String>,
        lhs: impl Into<Expr>,
        rhs: impl Into<Expr>,
    ) -> Self {
        Self {
            name: name.into(),
            doc: doc.into(),
            lhs: lhs.into(),
            rhs: rhs.into(),
            parents: Vec::new(),
            internal: Vec::new(),
        }
    }

    /// Record a parent equation for provenance.
    pub fn parent(mut self, parent: &Symbol) -> Self {
        self.parents.push(parent.clone());
        self
    }

    /// Declare a quantity scoped to this equation (e.g. an empirical fit
    /// coefficient meaningful only here).
    pub fn internal(mut self, quantity: Quantity) -> Self {
        self.internal.push(quantity);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::si::{meter, second};

    #[test]
    fn builder_carries_parents_and_internals() {
        let d = Symbol::new("d");
        let t = Symbol::new("t");
        let parent = Symbol::new("eq_parent");
        let eq = Equation::new("eq_fall", "Free fall.", &d, &t)
            .parent(&parent)
            .internal(Quantity::new("g0", "Local gravity.").unit(meter() / second().powi(2)));
        assert_eq!(eq.name(), "eq_fall");
        assert_eq!(eq.parents, vec![parent]);
        assert_eq!(eq.internal.len(), 1);
    }

    #[test]
    fn definition_expr_is_equality() {
        let def = EquationDefinition {
            name: "eq".to_string(),
            doc: String::new(),
            lhs: Expr::from(Symbol::new("a")),
            rhs: Expr::from(Symbol::new("b")),
            parents: Vec::new(),
            internal: Vec::new(),
        };
        assert_eq!(def.expr().to_string(), "a == b");
    }
}
