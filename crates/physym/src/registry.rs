//! Symbolic registry: the process-wide owner of every declared quantity and
//! equation. An explicit object rather than ambient global state; tests
//! construct a fresh one per case.
//!
//! Single-threaded by design: all mutators take `&mut self`, so a parallel
//! bulk-load must serialize declarations behind one lock. A failed
//! declaration leaves the registry exactly as it was.

use crate::checker::{dimension_of, UnitScope};
use crate::dimension::Dimension;
use crate::equation::{Equation, EquationDefinition};
use crate::error::{DeclareError, EvalError, RegistryWarning};
use crate::expr::{Cond, Expr, Symbol};
use crate::quantity::{Quantity, QuantityDefinition};
use crate::si::SiCatalog;
use crate::unit::Unit;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// What a handle resolves to.
#[derive(Clone, Debug)]
pub enum Definition {
    Quantity(Arc<QuantityDefinition>),
    Equation(Arc<EquationDefinition>),
}

impl Definition {
    pub fn doc(&self) -> &str {
        match self {
            Definition::Quantity(q) => &q.doc,
            Definition::Equation(e) => &e.doc,
        }
    }
}

/// One row of the human-facing metadata table (display boundary).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MetadataRow {
    pub symbol: String,
    pub name: String,
    pub doc: String,
    pub definition: String,
    pub default: String,
    pub units: String,
}

/// Associative stores keyed by symbolic handle. Every registered handle has
/// entries in `definitions` and `units`; `defaults` and `expressions` are
/// strict subsets.
#[derive(Default)]
pub struct Registry {
    definitions: HashMap<Symbol, Definition>,
    units: HashMap<Symbol, Unit>,
    defaults: HashMap<Symbol, f64>,
    expressions: HashMap<Symbol, Expr>,
    /// Equation-equivalent registry: equality expression → declaring handle.
    equations: HashMap<Expr, Symbol>,
    warnings: Vec<RegistryWarning>,
}

impl UnitScope for Registry {
    fn unit_of(&self, symbol: &Symbol) -> Option<&Unit> {
        self.units.get(symbol)
    }

    fn expression_of(&self, symbol: &Symbol) -> Option<&Expr> {
        self.expressions.get(symbol)
    }
}

/// Validation scope layering not-yet-registered units over the registry, so
/// equation internals can be checked before anything is inserted.
struct Overlay<'a> {
    base: &'a Registry,
    extra: HashMap<Symbol, Unit>,
}

impl UnitScope for Overlay<'_> {
    fn unit_of(&self, symbol: &Symbol) -> Option<&Unit> {
        self.extra.get(symbol).or_else(|| self.base.units.get(symbol))
    }

    fn expression_of(&self, symbol: &Symbol) -> Option<&Expr> {
        self.base.expressions.get(symbol)
    }
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a quantity. Exactly one of the builder's unit/expr must
    /// determine the dimension; both given means they are cross-checked.
    /// Returns the opaque handle; overriding an existing name warns.
    pub fn declare(&mut self, quantity: Quantity) -> Result<Symbol, DeclareError> {
        let handle = Symbol::new(quantity.name.clone());
        let unit = self.resolve_unit(&quantity)?;

        // All validation is done; mutation below cannot fail.
        self.warn_if_overriding(&handle, &quantity.doc);
        let latex_name = quantity.latex_name.unwrap_or_else(|| quantity.name.clone());
        let definition = QuantityDefinition {
            name: quantity.name,
            latex_name,
            doc: quantity.doc,
            unit: unit.clone(),
            assumptions: quantity.assumptions,
            default: quantity.default,
            expr: quantity.expr.clone(),
        };
        self.clear_stores(&handle);
        self.definitions
            .insert(handle.clone(), Definition::Quantity(Arc::new(definition)));
        self.units.insert(handle.clone(), unit);
        if let Some(value) = quantity.default {
            self.defaults.insert(handle.clone(), value);
        }
        if let Some(expr) = quantity.expr {
            self.expressions.insert(handle.clone(), expr);
        }
        Ok(handle)
    }

    fn resolve_unit(&self, quantity: &Quantity) -> Result<Unit, DeclareError> {
        match (&quantity.unit, &quantity.expr) {
            (None, None) => Err(DeclareError::MalformedDeclaration {
                name: quantity.name.clone(),
                reason: "neither unit nor defining expression given".to_string(),
            }),
            (Some(unit), None) => Ok(unit.clone()),
            (None, Some(expr)) => {
                let dim = dimension_of(expr, self)?;
                Ok(Unit::of(dim))
            }
            (Some(unit), Some(expr)) => {
                let derived = dimension_of(expr, self)?;
                if *unit.dimension() != derived {
                    return Err(DeclareError::MalformedDeclaration {
                        name: quantity.name.clone(),
                        reason: format!(
                            "declared unit has dimension {}, defining expression derives {}",
                            unit.dimension(),
                            derived
                        ),
                    });
                }
                Ok(unit.clone())
            }
        }
    }

    /// Declare an equation: internal quantities are registered under
    /// qualified names, then both sides must carry the same dimension or the
    /// declaration fails with nothing registered.
    pub fn declare_equation(&mut self, equation: Equation) -> Result<Symbol, DeclareError> {
        let handle = Symbol::new(equation.name.clone());

        // Qualify internals and build the rename map for lhs/rhs.
        let mut rename: HashMap<Symbol, Expr> = HashMap::new();
        let mut internals: Vec<Quantity> = Vec::new();
        for builder in equation.internal {
            let short = Symbol::new(builder.name.clone());
            let qualified = builder.qualified(&equation.name);
            rename.insert(short, Expr::from(Symbol::new(qualified.name.clone())));
            internals.push(qualified);
        }
        // Internals may refer to each other by short name too.
        for builder in &mut internals {
            if let Some(expr) = builder.expr.take() {
                builder.expr = Some(expr.substitute(&rename));
            }
        }
        let lhs = equation.lhs.substitute(&rename);
        let rhs = equation.rhs.substitute(&rename);

        // Validate everything against an overlay before touching the stores.
        let mut overlay = Overlay {
            base: self,
            extra: HashMap::new(),
        };
        for builder in &internals {
            let unit = overlay.resolve_internal(builder)?;
            overlay.extra.insert(Symbol::new(builder.name.clone()), unit);
        }
        let lhs_dim = dimension_of(&lhs, &overlay)?;
        let rhs_dim = dimension_of(&rhs, &overlay)?;
        let joined = join_sides(&lhs, lhs_dim, &rhs, rhs_dim).map_err(|(l, r)| {
            DeclareError::EquationUnits {
                name: equation.name.clone(),
                lhs: l,
                rhs: r,
            }
        })?;

        // Committed: register internals, then the equation itself.
        let mut internal_handles = Vec::with_capacity(internals.len());
        for builder in internals {
            internal_handles.push(self.declare(builder)?);
        }
        self.warn_if_overriding(&handle, &equation.doc);
        let definition = EquationDefinition {
            name: equation.name,
            doc: equation.doc,
            lhs,
            rhs,
            parents: equation.parents,
            internal: internal_handles,
        };
        let equality = definition.expr();
        self.clear_stores(&handle);
        self.definitions
            .insert(handle.clone(), Definition::Equation(Arc::new(definition)));
        self.units.insert(handle.clone(), Unit::of(joined));
        self.expressions.insert(handle.clone(), equality.clone());
        self.equations.insert(equality, handle.clone());
        Ok(handle)
    }

    /// Derive a new equation by adding two registered ones side by side:
    /// `lhs_a + lhs_b == rhs_a + rhs_b`, re-validated by the checker.
    pub fn combine(
        &mut self,
        name: impl Into<String>,
        doc: impl Into<String>,
        a: &Symbol,
        b: &Symbol,
    ) -> Result<Symbol, DeclareError> {
        let eq_a = self.equation(a)?;
        let eq_b = self.equation(b)?;
        let lhs = eq_a.lhs.clone() + eq_b.lhs.clone();
        let rhs = eq_a.rhs.clone() + eq_b.rhs.clone();
        self.declare_equation(Equation::new(name, doc, lhs, rhs).parent(a).parent(b))
    }

    /// Substitute quantities on both sides of a registered equation,
    /// returning the new equality expression. Substitution preserves
    /// dimension when replacements are same-dimensioned, but callers may
    /// re-check via [`dimension_of`].
    pub fn substitute_equation(
        &self,
        handle: &Symbol,
        map: &HashMap<Symbol, Expr>,
    ) -> Result<Expr, DeclareError> {
        let eq = self.equation(handle)?;
        Ok(Expr::equality(eq.lhs.substitute(map), eq.rhs.substitute(map)))
    }

    pub fn get_definition(&self, handle: &Symbol) -> Option<&Definition> {
        self.definitions.get(handle)
    }

    pub fn get_unit(&self, handle: &Symbol) -> Option<&Unit> {
        self.units.get(handle)
    }

    /// The registered default value, if any. Named to stay clear of the
    /// `Default` trait method on `Self`.
    pub fn default_of(&self, handle: &Symbol) -> Option<f64> {
        self.defaults.get(handle).copied()
    }

    pub fn expression(&self, handle: &Symbol) -> Option<&Expr> {
        self.expressions.get(handle)
    }

    /// The declaring equation for an equality expression, if registered.
    pub fn lookup_equation(&self, equality: &Expr) -> Option<&Symbol> {
        self.equations.get(equality)
    }

    /// The full definition of a registered equation. Quantity handles and
    /// unknown handles both error.
    pub fn equation(&self, handle: &Symbol) -> Result<Arc<EquationDefinition>, DeclareError> {
        match self.definitions.get(handle) {
            Some(Definition::Equation(eq)) => Ok(eq.clone()),
            _ => Err(DeclareError::UnknownHandle(handle.as_str().to_string())),
        }
    }

    /// Remove a handle from every store, warning on the way out. Removing an
    /// equation also removes its internal quantities. Absent handles error.
    pub fn remove(&mut self, handle: &Symbol) -> Result<(), DeclareError> {
        let definition = self
            .definitions
            .get(handle)
            .cloned()
            .ok_or_else(|| DeclareError::UnknownHandle(handle.as_str().to_string()))?;
        if let Definition::Equation(eq) = &definition {
            for internal in &eq.internal {
                // Internals may already have been overridden/removed.
                let _ = self.remove(internal);
            }
        }
        let warning = RegistryWarning::Removed {
            name: handle.as_str().to_string(),
        };
        tracing::warn!("{warning}");
        self.warnings.push(warning);
        self.clear_stores(handle);
        self.definitions.remove(handle);
        self.units.remove(handle);
        Ok(())
    }

    /// Drain buffered warnings (override/removal events).
    pub fn take_warnings(&mut self) -> Vec<RegistryWarning> {
        std::mem::take(&mut self.warnings)
    }

    /// Number of registered handles.
    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// Numerically evaluate an expression: overrides take precedence, then
    /// registered defaults, then defining expressions.
    pub fn eval(&self, expr: &Expr, overrides: &HashMap<Symbol, f64>) -> Result<f64, EvalError> {
        self.eval_expr(expr, overrides, &mut HashSet::new())
    }

    // `visiting` holds the symbols whose defining expressions are currently
    // being expanded; revisiting one means the definitions are cyclic.
    fn eval_expr(
        &self,
        expr: &Expr,
        overrides: &HashMap<Symbol, f64>,
        visiting: &mut HashSet<Symbol>,
    ) -> Result<f64, EvalError> {
        match expr {
            Expr::Number(x) => Ok(x.0),
            Expr::Symbol(s) => {
                if let Some(v) = overrides.get(s) {
                    return Ok(*v);
                }
                if let Some(v) = self.defaults.get(s) {
                    return Ok(*v);
                }
                match self.expressions.get(s) {
                    Some(definition) => {
                        if !visiting.insert(s.clone()) {
                            return Err(EvalError::NotEvaluable(format!(
                                "cyclic definition of `{s}`"
                            )));
                        }
                        let value = self.eval_expr(definition, overrides, visiting)?;
                        visiting.remove(s);
                        Ok(value)
                    }
                    None => Err(EvalError::MissingValue(s.as_str().to_string())),
                }
            }
            Expr::Add(terms) => {
                let mut sum = 0.0;
                for term in terms {
                    sum += self.eval_expr(term, overrides, visiting)?;
                }
                Ok(sum)
            }
            Expr::Mul(factors) => {
                let mut product = 1.0;
                for factor in factors {
                    product *= self.eval_expr(factor, overrides, visiting)?;
                }
                Ok(product)
            }
            Expr::Pow(base, exponent) => {
                let b = self.eval_expr(base, overrides, visiting)?;
                let e = self.eval_expr(exponent, overrides, visiting)?;
                if b == 0.0 && e < 0.0 {
                    return Err(EvalError::DivisionByZero);
                }
                Ok(b.powf(e))
            }
            Expr::Func(name, args) => self.eval_func(name, args, overrides, visiting),
            Expr::Piecewise(branches) => {
                for (value, cond) in branches {
                    if self.eval_cond(cond, overrides, visiting)? {
                        return self.eval_expr(value, overrides, visiting);
                    }
                }
                Err(EvalError::NotEvaluable(
                    "piecewise with no matching branch".to_string(),
                ))
            }
            Expr::Derivative { .. } => Err(EvalError::NotEvaluable("derivative".to_string())),
            Expr::Integral { .. } => Err(EvalError::NotEvaluable("integral".to_string())),
            Expr::Equality(..) => Err(EvalError::NotEvaluable("equality".to_string())),
        }
    }

    fn eval_func(
        &self,
        name: &str,
        args: &[Expr],
        overrides: &HashMap<Symbol, f64>,
        visiting: &mut HashSet<Symbol>,
    ) -> Result<f64, EvalError> {
        let values: Vec<f64> = args
            .iter()
            .map(|a| self.eval_expr(a, overrides, visiting))
            .collect::<Result<_, _>>()?;
        match (name, values.as_slice()) {
            ("exp", [x]) => Ok(x.exp()),
            ("log" | "ln", [x]) => Ok(x.ln()),
            ("sin", [x]) => Ok(x.sin()),
            ("cos", [x]) => Ok(x.cos()),
            ("tan", [x]) => Ok(x.tan()),
            ("abs", [x]) => Ok(x.abs()),
            ("min", [a, b]) => Ok(a.min(*b)),
            ("max", [a, b]) => Ok(a.max(*b)),
            _ => Err(EvalError::NotEvaluable(format!(
                "{name}/{}",
                values.len()
            ))),
        }
    }

    fn eval_cond(
        &self,
        cond: &Cond,
        overrides: &HashMap<Symbol, f64>,
        visiting: &mut HashSet<Symbol>,
    ) -> Result<bool, EvalError> {
        Ok(match cond {
            Cond::Otherwise => true,
            Cond::Lt(a, b) => {
                self.eval_expr(a, overrides, visiting)? < self.eval_expr(b, overrides, visiting)?
            }
            Cond::Le(a, b) => {
                self.eval_expr(a, overrides, visiting)? <= self.eval_expr(b, overrides, visiting)?
            }
            Cond::Gt(a, b) => {
                self.eval_expr(a, overrides, visiting)? > self.eval_expr(b, overrides, visiting)?
            }
            Cond::Ge(a, b) => {
                self.eval_expr(a, overrides, visiting)? >= self.eval_expr(b, overrides, visiting)?
            }
        })
    }

    /// Rows for the human-facing variable table: one per registered quantity,
    /// sorted by lower-cased latex name. Display boundary only.
    pub fn metadata_table(&self, catalog: &SiCatalog) -> Vec<MetadataRow> {
        let mut rows: Vec<MetadataRow> = self
            .definitions
            .iter()
            .filter_map(|(handle, definition)| match definition {
                Definition::Quantity(q) => Some(MetadataRow {
                    symbol: format!("${}$", q.latex_name),
                    name: q.name.clone(),
                    doc: q.doc.clone(),
                    definition: q.expr.as_ref().map(|e| e.to_string()).unwrap_or_default(),
                    default: self
                        .defaults
                        .get(handle)
                        .map(|v| v.to_string())
                        .unwrap_or_else(|| "-".to_string()),
                    units: catalog.markdown(&q.unit),
                }),
                Definition::Equation(_) => None,
            })
            .collect();
        rows.sort_by_key(|row| row.symbol.to_lowercase());
        rows
    }

    fn warn_if_overriding(&mut self, handle: &Symbol, current_doc: &str) {
        if let Some(previous) = self.definitions.get(handle) {
            let warning = RegistryWarning::Overridden {
                name: handle.as_str().to_string(),
                previous: previous.doc().to_string(),
                current: current_doc.to_string(),
            };
            tracing::warn!("{warning}");
            self.warnings.push(warning);
        }
    }

    /// Drop subset-store entries for a handle (used before overriding and on
    /// removal, so stale defaults/expressions never survive a supersede).
    fn clear_stores(&mut self, handle: &Symbol) {
        self.defaults.remove(handle);
        self.expressions.remove(handle);
        self.equations.retain(|_, v| v != handle);
    }
}

impl Overlay<'_> {
    /// Validate an internal quantity's unit without registering it. Internals
    /// may reference previously validated internals through `extra`.
    fn resolve_internal(&self, builder: &Quantity) -> Result<Unit, DeclareError> {
        match (&builder.unit, &builder.expr) {
            (None, None) => Err(DeclareError::MalformedDeclaration {
                name: builder.name.clone(),
                reason: "neither unit nor defining expression given".to_string(),
            }),
            (Some(unit), None) => Ok(unit.clone()),
            (None, Some(expr)) => Ok(Unit::of(dimension_of(expr, self)?)),
            (Some(unit), Some(expr)) => {
                let derived = dimension_of(expr, self)?;
                if *unit.dimension() != derived {
                    return Err(DeclareError::MalformedDeclaration {
                        name: builder.name.clone(),
                        reason: format!(
                            "declared unit has dimension {}, defining expression derives {}",
                            unit.dimension(),
                            derived
                        ),
                    });
                }
                Ok(unit.clone())
            }
        }
    }
}

/// Zero-exempt join of an equation's two sides. Errors with both dimensions
/// when they disagree.
fn join_sides(
    lhs: &Expr,
    lhs_dim: Dimension,
    rhs: &Expr,
    rhs_dim: Dimension,
) -> Result<Dimension, (Dimension, Dimension)> {
    if lhs.is_zero() {
        return Ok(rhs_dim);
    }
    if rhs.is_zero() {
        return Ok(lhs_dim);
    }
    if lhs_dim == rhs_dim {
        Ok(lhs_dim)
    } else {
        Err((lhs_dim, rhs_dim))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::si::{joule, kilogram, meter, second};

    fn sym(name: &str) -> Symbol {
        Symbol::new(name)
    }

    #[test]
    fn new_registry_starts_empty() {
        let reg = Registry::new();
        assert!(reg.is_empty());
        assert_eq!(reg.len(), 0);
    }

    #[test]
    fn declare_with_unit_registers_all_stores() {
        let mut reg = Registry::new();
        let h = reg
            .declare(Quantity::new("x_l", "Leaf length.").unit(meter()).default(0.05))
            .unwrap();
        assert_eq!(h, sym("x_l"));
        assert!(reg.get_definition(&h).is_some());
        assert_eq!(reg.get_unit(&h), Some(&meter()));
        assert_eq!(reg.default_of(&h), Some(0.05));
        assert!(reg.expression(&h).is_none());
        assert!(reg.take_warnings().is_empty());
    }

    #[test]
    fn declare_without_unit_or_expr_is_malformed() {
        let mut reg = Registry::new();
        let e = reg.declare(Quantity::new("ghost", "No dimension.")).unwrap_err();
        assert!(matches!(e, DeclareError::MalformedDeclaration { .. }));
        assert!(reg.is_empty());
    }

    #[test]
    fn declare_derives_unit_from_expression() {
        let mut reg = Registry::new();
        let m = reg.declare(Quantity::new("m", "Mass.").unit(kilogram())).unwrap();
        let v = reg
            .declare(Quantity::new("v", "Speed.").unit(meter() / second()))
            .unwrap();
        let h = reg
            .declare(Quantity::new("e_k", "Kinetic energy.").expr(0.5 * (&m * v.powi(2))))
            .unwrap();
        assert_eq!(reg.get_unit(&h).unwrap().dimension(), joule().dimension());
        assert!(reg.expression(&h).is_some());
    }

    #[test]
    fn declared_and_derived_units_cross_checked() {
        let mut reg = Registry::new();
        let m = reg.declare(Quantity::new("m", "Mass.").unit(kilogram())).unwrap();
        let ok = reg.declare(
            Quantity::new("m2", "Twice the mass.")
                .unit(kilogram())
                .expr(2.0 * &m),
        );
        assert!(ok.is_ok());
        // Declared joule against a newton-dimensioned definition must fail.
        let a = reg
            .declare(Quantity::new("a", "Acceleration.").unit(meter() / second().powi(2)))
            .unwrap();
        let err = reg
            .declare(
                Quantity::new("F", "Force, misdeclared as energy.")
                    .unit(joule())
                    .expr(&m * &a),
            )
            .unwrap_err();
        assert!(matches!(err, DeclareError::MalformedDeclaration { .. }));
        assert!(reg.get_definition(&sym("F")).is_none());
    }

    #[test]
    fn override_warns_and_last_writer_wins() {
        let mut reg = Registry::new();
        reg.declare(Quantity::new("x", "First.").unit(meter()).default(1.0))
            .unwrap();
        let h = reg
            .declare(Quantity::new("x", "Second.").unit(second()))
            .unwrap();
        let warnings = reg.take_warnings();
        assert_eq!(warnings.len(), 1);
        assert!(matches!(
            &warnings[0],
            RegistryWarning::Overridden { name, .. } if name == "x"
        ));
        assert_eq!(reg.get_definition(&h).unwrap().doc(), "Second.");
        assert_eq!(reg.get_unit(&h), Some(&second()));
        // Stale default from the first declaration must not survive.
        assert_eq!(reg.default_of(&h), None);
    }

    #[test]
    fn remove_succeeds_once_then_errors() {
        let mut reg = Registry::new();
        let h = reg.declare(Quantity::new("x", "Doomed.").unit(meter())).unwrap();
        reg.remove(&h).unwrap();
        let warnings = reg.take_warnings();
        assert!(matches!(&warnings[0], RegistryWarning::Removed { name } if name == "x"));
        assert!(reg.get_definition(&h).is_none());
        assert!(reg.get_unit(&h).is_none());
        let e = reg.remove(&h).unwrap_err();
        assert!(matches!(e, DeclareError::UnknownHandle(name) if name == "x"));
    }

    #[test]
    fn equation_requires_matching_sides() {
        let mut reg = Registry::new();
        let d = reg.declare(Quantity::new("d", "Distance.").unit(meter())).unwrap();
        let t = reg.declare(Quantity::new("t", "Time.").unit(second())).unwrap();
        let v = reg
            .declare(Quantity::new("v", "Speed.").unit(meter() / second()))
            .unwrap();
        let ok = reg.declare_equation(Equation::new(
            "eq_speed",
            "Definition of speed.",
            &v,
            &d / &t,
        ));
        assert!(ok.is_ok());
        let before = reg.len();
        let err = reg
            .declare_equation(Equation::new("eq_bad", "Wrong.", &v, &d * &t))
            .unwrap_err();
        assert!(matches!(err, DeclareError::EquationUnits { .. }));
        assert_eq!(reg.len(), before, "failed declaration must not register");
    }

    #[test]
    fn equation_registers_equality_expression() {
        let mut reg = Registry::new();
        let d = reg.declare(Quantity::new("d", "Distance.").unit(meter())).unwrap();
        let d1 = reg.declare(Quantity::new("d1", "Distance.").unit(meter())).unwrap();
        let h = reg
            .declare_equation(Equation::new("eq_d", "Equal lengths.", &d, &d1))
            .unwrap();
        let equality = Expr::equality(&d, &d1);
        assert_eq!(reg.lookup_equation(&equality), Some(&h));
        assert_eq!(reg.get_unit(&h).unwrap().dimension(), meter().dimension());
    }

    #[test]
    fn internal_quantities_get_qualified_names() {
        let mut reg = Registry::new();
        let d = reg.declare(Quantity::new("d", "Distance.").unit(meter())).unwrap();
        let g = reg
            .declare(
                Quantity::new("g", "Gravity.")
                    .unit(meter() / second().powi(2))
                    .default(9.8),
            )
            .unwrap();
        let t = sym("t");
        let h = reg
            .declare_equation(
                Equation::new("eq_fall", "Free fall.", &d, &g * t.powi(2) / 2.0)
                    .internal(Quantity::new("t", "Fall time.").unit(second())),
            )
            .unwrap();
        let qualified = sym("eq_fall.t");
        assert_eq!(reg.get_unit(&qualified), Some(&second()));
        // The stored rhs refers to the qualified symbol.
        match reg.get_definition(&h) {
            Some(Definition::Equation(eq)) => {
                assert!(eq.rhs.symbols().contains(&qualified));
                assert_eq!(eq.internal, vec![qualified.clone()]);
            }
            other => panic!("expected equation definition, got {other:?}"),
        }
        // Removing the equation removes its internals too.
        reg.remove(&h).unwrap();
        assert!(reg.get_unit(&qualified).is_none());
    }

    #[test]
    fn combine_adds_sides_and_tracks_parents() {
        let mut reg = Registry::new();
        let a = reg.declare(Quantity::new("a", "Len a.").unit(meter())).unwrap();
        let b = reg.declare(Quantity::new("b", "Len b.").unit(meter())).unwrap();
        let c = reg.declare(Quantity::new("c", "Len c.").unit(meter())).unwrap();
        let d = reg.declare(Quantity::new("d", "Len d.").unit(meter())).unwrap();
        let eq1 = reg
            .declare_equation(Equation::new("eq1", "a=b", &a, &b))
            .unwrap();
        let eq2 = reg
            .declare_equation(Equation::new("eq2", "c=d", &c, &d))
            .unwrap();
        let combined = reg.combine("eq3", "Sum of balances.", &eq1, &eq2).unwrap();
        match reg.get_definition(&combined) {
            Some(Definition::Equation(eq)) => {
                assert_eq!(eq.lhs, Expr::from(&a) + &c);
                assert_eq!(eq.rhs, Expr::from(&b) + &d);
                assert_eq!(eq.parents, vec![eq1, eq2]);
            }
            other => panic!("expected equation, got {other:?}"),
        }
    }

    #[test]
    fn combine_incompatible_dimensions_fails() {
        let mut reg = Registry::new();
        let a = reg.declare(Quantity::new("a", "Len.").unit(meter())).unwrap();
        let b = reg.declare(Quantity::new("b", "Len.").unit(meter())).unwrap();
        let t = reg.declare(Quantity::new("t", "Time.").unit(second())).unwrap();
        let t1 = reg.declare(Quantity::new("t1", "Time.").unit(second())).unwrap();
        let eq1 = reg
            .declare_equation(Equation::new("eq1", "a=b", &a, &b))
            .unwrap();
        let eq2 = reg
            .declare_equation(Equation::new("eq2", "t=t1", &t, &t1))
            .unwrap();
        assert!(reg.combine("eq3", "Mixed.", &eq1, &eq2).is_err());
    }

    #[test]
    fn eval_uses_overrides_then_defaults_then_definitions() {
        let mut reg = Registry::new();
        let g = reg
            .declare(
                Quantity::new("g", "Gravity.")
                    .unit(meter() / second().powi(2))
                    .default(9.8),
            )
            .unwrap();
        let t = reg.declare(Quantity::new("t", "Time.").unit(second())).unwrap();
        let twice_g = reg
            .declare(Quantity::new("g2", "Twice gravity.").expr(2.0 * &g))
            .unwrap();
        let expr = &g * t.powi(2) / 2.0;
        let mut overrides = HashMap::new();
        overrides.insert(t.clone(), 1.0);
        let value = reg.eval(&expr, &overrides).unwrap();
        assert!((value - 4.9).abs() < 1e-12);
        // Defining expression consulted when no default exists.
        let v2 = reg.eval(&Expr::from(&twice_g), &HashMap::new()).unwrap();
        assert!((v2 - 19.6).abs() < 1e-12);
        // Missing value surfaces the symbol name.
        let e = reg.eval(&Expr::from(&t), &HashMap::new()).unwrap_err();
        assert!(matches!(e, EvalError::MissingValue(name) if name == "t"));
    }

    #[test]
    fn eval_rejects_cyclic_definitions() {
        let mut reg = Registry::new();
        let a = reg.declare(Quantity::new("a", "Length a.").unit(meter())).unwrap();
        let b = reg
            .declare(Quantity::new("b", "Twice a.").expr(2.0 * &a))
            .unwrap();
        // Re-declaring `a` in terms of `b` closes the loop; each declaration
        // passes the dimension check on its own.
        reg.declare(
            Quantity::new("a", "Half of b.")
                .unit(meter())
                .expr(0.5 * &b),
        )
        .unwrap();
        let e = reg.eval(&Expr::from(&a), &HashMap::new()).unwrap_err();
        assert!(matches!(e, EvalError::NotEvaluable(reason) if reason.contains("cyclic")));
    }

    #[test]
    fn eval_piecewise_picks_first_true_branch() {
        let mut reg = Registry::new();
        let t = reg.declare(Quantity::new("t", "Time.").unit(second())).unwrap();
        let pw = Expr::piecewise(vec![
            (Expr::number(0.0), Cond::Le(Expr::from(&t), Expr::number(0.0))),
            (Expr::number(1.0), Cond::Otherwise),
        ]);
        let mut overrides = HashMap::new();
        overrides.insert(t.clone(), -2.0);
        assert_eq!(reg.eval(&pw, &overrides).unwrap(), 0.0);
        overrides.insert(t.clone(), 2.0);
        assert_eq!(reg.eval(&pw, &overrides).unwrap(), 1.0);
    }

    #[test]
    fn substitute_equation_rewrites_both_sides() {
        let mut reg = Registry::new();
        let a = reg.declare(Quantity::new("a", "Len.").unit(meter())).unwrap();
        let b = reg.declare(Quantity::new("b", "Len.").unit(meter())).unwrap();
        let c = reg.declare(Quantity::new("c", "Len.").unit(meter())).unwrap();
        let eq = reg
            .declare_equation(Equation::new("eq", "a=b", &a, &b))
            .unwrap();
        let mut map = HashMap::new();
        map.insert(b.clone(), Expr::from(&c));
        let out = reg.substitute_equation(&eq, &map).unwrap();
        assert_eq!(out, Expr::equality(&a, &c));
        // Substitution of same-dimensioned quantities stays consistent.
        assert!(dimension_of(&out, &reg).is_ok());
    }

    #[test]
    fn free_fall_end_to_end() {
        let mut reg = Registry::new();
        let d = reg
            .declare(Quantity::new("d", "Distance fallen.").unit(meter()))
            .unwrap();
        let g = reg
            .declare(
                Quantity::new("g", "Gravitational acceleration.")
                    .unit(meter() / second().powi(2))
                    .default(9.8),
            )
            .unwrap();
        let t = sym("t");
        let eq = reg
            .declare_equation(
                Equation::new("eq_fall", "Free fall from rest.", &d, &g * &t * &t / 2.0)
                    .internal(Quantity::new("t", "Elapsed time.").unit(second())),
            )
            .unwrap();
        let rhs = match reg.get_definition(&eq) {
            Some(Definition::Equation(e)) => e.rhs.clone(),
            other => panic!("expected equation, got {other:?}"),
        };
        let mut overrides = HashMap::new();
        overrides.insert(sym("eq_fall.t"), 1.0);
        let value = reg.eval(&rhs, &overrides).unwrap();
        assert!((value - 4.9).abs() < 1e-12);
    }

    #[test]
    fn metadata_table_rows_sorted_and_rendered() {
        let mut reg = Registry::new();
        reg.declare(
            Quantity::new("g", "Gravitational acceleration.")
                .unit(meter() / second().powi(2))
                .default(9.8),
        )
        .unwrap();
        reg.declare(Quantity::new("E_l", "Latent heat flux.").unit(joule() / (meter().powi(2) * second())))
            .unwrap();
        let catalog = SiCatalog::default_si();
        let rows = reg.metadata_table(&catalog);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].symbol, "$E_l$");
        assert_eq!(rows[0].default, "-");
        assert_eq!(rows[0].units, "J m$^{-2}$ s$^{-1}$");
        assert_eq!(rows[1].name, "g");
        assert_eq!(rows[1].default, "9.8");
        assert_eq!(rows[1].units, "m s$^{-2}$");
    }
}
