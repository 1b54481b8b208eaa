//! Symbolic expressions: a closed tree of the node kinds the dimensional
//! checker understands. Built via `std::ops` overloads plus named
//! constructors; supports substitution, free-symbol enumeration, and
//! constant folding of pure-number subtrees.

use ordered_float::OrderedFloat;
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::ops::{Add, Div, Mul, Neg, Sub};

/// Lightweight handle to a declared quantity or equation. Its string form is
/// the declared name; the registry owns the definition it points at.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
pub struct Symbol(String);

impl Symbol {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Branch guard of a piecewise expression. `Otherwise` is the unconditional
/// fallthrough branch.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub enum Cond {
    Otherwise,
    Lt(Expr, Expr),
    Le(Expr, Expr),
    Gt(Expr, Expr),
    Ge(Expr, Expr),
}

impl Cond {
    /// Both comparison operands, if any.
    pub fn operands(&self) -> Option<(&Expr, &Expr)> {
        match self {
            Cond::Otherwise => None,
            Cond::Lt(a, b) | Cond::Le(a, b) | Cond::Gt(a, b) | Cond::Ge(a, b) => Some((a, b)),
        }
    }
}

/// A symbolic expression node. Add and Mul are n-ary; subtraction and
/// division are encoded as `a + (-1)*b` and `a * b**-1` so the checker only
/// sees sums, products and powers.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub enum Expr {
    Number(OrderedFloat<f64>),
    Symbol(Symbol),
    Add(Vec<Expr>),
    Mul(Vec<Expr>),
    Pow(Box<Expr>, Box<Expr>),
    Derivative {
        expr: Box<Expr>,
        vars: Vec<(Symbol, u32)>,
    },
    Integral {
        expr: Box<Expr>,
        var: Symbol,
        bounds: Option<(Box<Expr>, Box<Expr>)>,
    },
    Piecewise(Vec<(Expr, Cond)>),
    Func(String, Vec<Expr>),
    Equality(Box<Expr>, Box<Expr>),
}

impl Expr {
    pub fn number(x: f64) -> Self {
        Expr::Number(OrderedFloat::from(x))
    }

    pub fn symbol(s: &Symbol) -> Self {
        Expr::Symbol(s.clone())
    }

    /// `self ** exponent`.
    pub fn pow(self, exponent: impl Into<Expr>) -> Self {
        Expr::Pow(Box::new(self), Box::new(exponent.into()))
    }

    /// `self ** n` for integer n.
    pub fn powi(self, n: i64) -> Self {
        self.pow(Expr::number(n as f64))
    }

    /// Derivative of `expr` with respect to each `(var, order)`.
    pub fn derivative(expr: impl Into<Expr>, vars: Vec<(Symbol, u32)>) -> Self {
        Expr::Derivative {
            expr: Box::new(expr.into()),
            vars,
        }
    }

    /// Indefinite integral `∫ expr d(var)`.
    pub fn integral(expr: impl Into<Expr>, var: Symbol) -> Self {
        Expr::Integral {
            expr: Box::new(expr.into()),
            var,
            bounds: None,
        }
    }

    /// Definite integral `∫ expr d(var)` over `[lower, upper]`.
    pub fn integral_over(
        expr: impl Into<Expr>,
        var: Symbol,
        lower: impl Into<Expr>,
        upper: impl Into<Expr>,
    ) -> Self {
        Expr::Integral {
            expr: Box::new(expr.into()),
            var,
            bounds: Some((Box::new(lower.into()), Box::new(upper.into()))),
        }
    }

    pub fn piecewise(branches: Vec<(Expr, Cond)>) -> Self {
        Expr::Piecewise(branches)
    }

    /// Opaque named function application.
    pub fn func(name: impl Into<String>, args: Vec<Expr>) -> Self {
        Expr::Func(name.into(), args)
    }

    /// Checked equality between two expressions (the top-level equation node).
    pub fn equality(lhs: impl Into<Expr>, rhs: impl Into<Expr>) -> Self {
        Expr::Equality(Box::new(lhs.into()), Box::new(rhs.into()))
    }

    /// Fold a pure-number subtree to its value. Returns None as soon as a
    /// symbol or non-arithmetic node is encountered.
    pub fn constant_value(&self) -> Option<f64> {
        match self {
            Expr::Number(x) => Some(x.0),
            Expr::Add(terms) => terms.iter().map(|t| t.constant_value()).sum(),
            Expr::Mul(factors) => factors.iter().map(|f| f.constant_value()).product(),
            Expr::Pow(base, exp) => {
                let b = base.constant_value()?;
                let e = exp.constant_value()?;
                Some(b.powf(e))
            }
            _ => None,
        }
    }

    /// True for expressions that fold to exactly zero. Zero is
    /// dimension-polymorphic in additive joins.
    pub fn is_zero(&self) -> bool {
        self.constant_value() == Some(0.0)
    }

    /// Free symbols, in sorted order. Includes differentiation and
    /// integration variables.
    pub fn symbols(&self) -> BTreeSet<Symbol> {
        let mut out = BTreeSet::new();
        self.collect_symbols(&mut out);
        out
    }

    fn collect_symbols(&self, out: &mut BTreeSet<Symbol>) {
        match self {
            Expr::Number(_) => {}
            Expr::Symbol(s) => {
                out.insert(s.clone());
            }
            Expr::Add(items) | Expr::Mul(items) | Expr::Func(_, items) => {
                for item in items {
                    item.collect_symbols(out);
                }
            }
            Expr::Pow(base, exp) => {
                base.collect_symbols(out);
                exp.collect_symbols(out);
            }
            Expr::Derivative { expr, vars } => {
                expr.collect_symbols(out);
                for (v, _) in vars {
                    out.insert(v.clone());
                }
            }
            Expr::Integral { expr, var, bounds } => {
                expr.collect_symbols(out);
                out.insert(var.clone());
                if let Some((lo, hi)) = bounds {
                    lo.collect_symbols(out);
                    hi.collect_symbols(out);
                }
            }
            Expr::Piecewise(branches) => {
                for (value, cond) in branches {
                    value.collect_symbols(out);
                    if let Some((a, b)) = cond.operands() {
                        a.collect_symbols(out);
                        b.collect_symbols(out);
                    }
                }
            }
            Expr::Equality(lhs, rhs) => {
                lhs.collect_symbols(out);
                rhs.collect_symbols(out);
            }
        }
    }

    /// Simultaneous structural substitution of symbols, returning a new
    /// expression. Differentiation/integration variables are renamed only
    /// when the replacement is itself a bare symbol.
    pub fn substitute(&self, map: &HashMap<Symbol, Expr>) -> Expr {
        match self {
            Expr::Number(_) => self.clone(),
            Expr::Symbol(s) => map.get(s).cloned().unwrap_or_else(|| self.clone()),
            Expr::Add(items) => Expr::Add(items.iter().map(|e| e.substitute(map)).collect()),
            Expr::Mul(items) => Expr::Mul(items.iter().map(|e| e.substitute(map)).collect()),
            Expr::Pow(base, exp) => Expr::Pow(
                Box::new(base.substitute(map)),
                Box::new(exp.substitute(map)),
            ),
            Expr::Derivative { expr, vars } => Expr::Derivative {
                expr: Box::new(expr.substitute(map)),
                vars: vars
                    .iter()
                    .map(|(v, order)| (substitute_var(v, map), *order))
                    .collect(),
            },
            Expr::Integral { expr, var, bounds } => Expr::Integral {
                expr: Box::new(expr.substitute(map)),
                var: substitute_var(var, map),
                bounds: bounds.as_ref().map(|(lo, hi)| {
                    (Box::new(lo.substitute(map)), Box::new(hi.substitute(map)))
                }),
            },
            Expr::Piecewise(branches) => Expr::Piecewise(
                branches
                    .iter()
                    .map(|(value, cond)| {
                        let cond = match cond {
                            Cond::Otherwise => Cond::Otherwise,
                            Cond::Lt(a, b) => Cond::Lt(a.substitute(map), b.substitute(map)),
                            Cond::Le(a, b) => Cond::Le(a.substitute(map), b.substitute(map)),
                            Cond::Gt(a, b) => Cond::Gt(a.substitute(map), b.substitute(map)),
                            Cond::Ge(a, b) => Cond::Ge(a.substitute(map), b.substitute(map)),
                        };
                        (value.substitute(map), cond)
                    })
                    .collect(),
            ),
            Expr::Func(name, args) => Expr::Func(
                name.clone(),
                args.iter().map(|a| a.substitute(map)).collect(),
            ),
            Expr::Equality(lhs, rhs) => Expr::Equality(
                Box::new(lhs.substitute(map)),
                Box::new(rhs.substitute(map)),
            ),
        }
    }
}

fn substitute_var(var: &Symbol, map: &HashMap<Symbol, Expr>) -> Symbol {
    match map.get(var) {
        Some(Expr::Symbol(s)) => s.clone(),
        _ => var.clone(),
    }
}

/// `exp(x)`.
pub fn exp(x: impl Into<Expr>) -> Expr {
    Expr::func("exp", vec![x.into()])
}

/// Natural logarithm.
pub fn log(x: impl Into<Expr>) -> Expr {
    Expr::func("log", vec![x.into()])
}

/// `x ** (1/2)`.
pub fn sqrt(x: impl Into<Expr>) -> Expr {
    x.into().pow(Expr::number(0.5))
}

impl From<f64> for Expr {
    fn from(x: f64) -> Self {
        Expr::number(x)
    }
}

impl From<Symbol> for Expr {
    fn from(s: Symbol) -> Self {
        Expr::Symbol(s)
    }
}

impl From<&Symbol> for Expr {
    fn from(s: &Symbol) -> Self {
        Expr::Symbol(s.clone())
    }
}

impl<T: Into<Expr>> Add<T> for Expr {
    type Output = Expr;

    fn add(self, rhs: T) -> Expr {
        let rhs = rhs.into();
        match (self, rhs) {
            (Expr::Add(mut a), Expr::Add(b)) => {
                a.extend(b);
                Expr::Add(a)
            }
            (Expr::Add(mut a), b) => {
                a.push(b);
                Expr::Add(a)
            }
            (a, b) => Expr::Add(vec![a, b]),
        }
    }
}

impl<T: Into<Expr>> Sub<T> for Expr {
    type Output = Expr;

    fn sub(self, rhs: T) -> Expr {
        self + Expr::Mul(vec![Expr::number(-1.0), rhs.into()])
    }
}

impl<T: Into<Expr>> Mul<T> for Expr {
    type Output = Expr;

    fn mul(self, rhs: T) -> Expr {
        let rhs = rhs.into();
        match (self, rhs) {
            (Expr::Mul(mut a), Expr::Mul(b)) => {
                a.extend(b);
                Expr::Mul(a)
            }
            (Expr::Mul(mut a), b) => {
                a.push(b);
                Expr::Mul(a)
            }
            (a, b) => Expr::Mul(vec![a, b]),
        }
    }
}

impl<T: Into<Expr>> Div<T> for Expr {
    type Output = Expr;

    fn div(self, rhs: T) -> Expr {
        self * rhs.into().powi(-1)
    }
}

impl Neg for Expr {
    type Output = Expr;

    fn neg(self) -> Expr {
        Expr::Mul(vec![Expr::number(-1.0), self])
    }
}

macro_rules! symbol_ops {
    ($($trait:ident :: $method:ident),*) => {
        $(
            impl<T: Into<Expr>> $trait<T> for Symbol {
                type Output = Expr;

                fn $method(self, rhs: T) -> Expr {
                    $trait::$method(Expr::Symbol(self), rhs)
                }
            }

            impl<T: Into<Expr>> $trait<T> for &Symbol {
                type Output = Expr;

                fn $method(self, rhs: T) -> Expr {
                    $trait::$method(Expr::Symbol(self.clone()), rhs)
                }
            }
        )*
    };
}

symbol_ops!(Add::add, Sub::sub, Mul::mul, Div::div);

impl Neg for Symbol {
    type Output = Expr;

    fn neg(self) -> Expr {
        -Expr::Symbol(self)
    }
}

macro_rules! f64_ops {
    ($($rhs:ty),*) => {
        $(
            impl Add<$rhs> for f64 {
                type Output = Expr;

                fn add(self, rhs: $rhs) -> Expr {
                    Expr::number(self) + Expr::from(rhs)
                }
            }

            impl Sub<$rhs> for f64 {
                type Output = Expr;

                fn sub(self, rhs: $rhs) -> Expr {
                    Expr::number(self) - Expr::from(rhs)
                }
            }

            impl Mul<$rhs> for f64 {
                type Output = Expr;

                fn mul(self, rhs: $rhs) -> Expr {
                    Expr::number(self) * Expr::from(rhs)
                }
            }

            impl Div<$rhs> for f64 {
                type Output = Expr;

                fn div(self, rhs: $rhs) -> Expr {
                    Expr::number(self) / Expr::from(rhs)
                }
            }
        )*
    };
}

f64_ops!(Expr, Symbol, &Symbol);

impl Symbol {
    /// `self ** n` for integer n, without going through `Expr::from` at the
    /// call site.
    pub fn powi(&self, n: i64) -> Expr {
        Expr::from(self).powi(n)
    }

    pub fn pow(&self, exponent: impl Into<Expr>) -> Expr {
        Expr::from(self).pow(exponent)
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Number(x) => write!(f, "{}", x.0),
            Expr::Symbol(s) => write!(f, "{s}"),
            Expr::Add(items) => {
                let parts: Vec<String> = items.iter().map(|e| e.to_string()).collect();
                write!(f, "{}", parts.join(" + "))
            }
            Expr::Mul(items) => {
                let parts: Vec<String> = items
                    .iter()
                    .map(|e| match e {
                        Expr::Add(_) => format!("({e})"),
                        _ => e.to_string(),
                    })
                    .collect();
                write!(f, "{}", parts.join("*"))
            }
            Expr::Pow(base, exp) => {
                let b = match base.as_ref() {
                    Expr::Add(_) | Expr::Mul(_) | Expr::Pow(..) => format!("({base})"),
                    _ => base.to_string(),
                };
                let e = match exp.as_ref() {
                    Expr::Add(_) | Expr::Mul(_) | Expr::Pow(..) => format!("({exp})"),
                    _ => exp.to_string(),
                };
                write!(f, "{b}**{e}")
            }
            Expr::Derivative { expr, vars } => {
                let by: Vec<String> = vars
                    .iter()
                    .map(|(v, order)| {
                        if *order == 1 {
                            format!("d{v}")
                        } else {
                            format!("d{v}^{order}")
                        }
                    })
                    .collect();
                write!(f, "d({expr})/{}", by.join(""))
            }
            Expr::Integral { expr, var, bounds } => match bounds {
                None => write!(f, "Integral({expr}, {var})"),
                Some((lo, hi)) => write!(f, "Integral({expr}, ({var}, {lo}, {hi}))"),
            },
            Expr::Piecewise(branches) => {
                let parts: Vec<String> = branches
                    .iter()
                    .map(|(value, cond)| match cond {
                        Cond::Otherwise => format!("({value}, otherwise)"),
                        Cond::Lt(a, b) => format!("({value}, {a} < {b})"),
                        Cond::Le(a, b) => format!("({value}, {a} <= {b})"),
                        Cond::Gt(a, b) => format!("({value}, {a} > {b})"),
                        Cond::Ge(a, b) => format!("({value}, {a} >= {b})"),
                    })
                    .collect();
                write!(f, "Piecewise({})", parts.join(", "))
            }
            Expr::Func(name, args) => {
                let parts: Vec<String> = args.iter().map(|a| a.to_string()).collect();
                write!(f, "{name}({})", parts.join(", "))
            }
            Expr::Equality(lhs, rhs) => write!(f, "{lhs} == {rhs}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sym(name: &str) -> Symbol {
        Symbol::new(name)
    }

    #[test]
    fn operators_build_flattened_trees() {
        let x = sym("x");
        let y = sym("y");
        let e = &x + &y + 1.0;
        match e {
            Expr::Add(items) => assert_eq!(items.len(), 3),
            other => panic!("expected Add, got {other:?}"),
        }
        let p = &x * &y * 2.0;
        match p {
            Expr::Mul(items) => assert_eq!(items.len(), 3),
            other => panic!("expected Mul, got {other:?}"),
        }
    }

    #[test]
    fn sub_and_div_are_sugar() {
        let x = sym("x");
        let e = Expr::from(&x) - 1.0;
        // x + (-1)*1
        match &e {
            Expr::Add(items) => {
                assert_eq!(items.len(), 2);
                assert!(matches!(items[1], Expr::Mul(_)));
            }
            other => panic!("expected Add, got {other:?}"),
        }
        let d = Expr::from(&x) / sym("y");
        match &d {
            Expr::Mul(items) => assert!(matches!(items[1], Expr::Pow(..))),
            other => panic!("expected Mul, got {other:?}"),
        }
    }

    #[test]
    fn constant_folding() {
        let e = Expr::number(2.0) * 3.0 + 1.0;
        assert_eq!(e.constant_value(), Some(7.0));
        assert!((Expr::number(2.0).powi(3)).constant_value() == Some(8.0));
        let with_symbol = Expr::number(2.0) + sym("x");
        assert_eq!(with_symbol.constant_value(), None);
    }

    #[test]
    fn zero_detection_through_products() {
        assert!(Expr::number(0.0).is_zero());
        assert!((Expr::number(0.0) * 5.0).is_zero());
        assert!(!(Expr::number(0.0) + 1.0).is_zero());
        assert!(!Expr::from(sym("x")).is_zero());
    }

    #[test]
    fn free_symbols_include_integration_vars() {
        let t = sym("t");
        let v = sym("v");
        let e = Expr::integral_over(&v, t.clone(), 0.0, sym("t1"));
        let syms = e.symbols();
        assert!(syms.contains(&t));
        assert!(syms.contains(&v));
        assert!(syms.contains(&sym("t1")));
    }

    #[test]
    fn substitute_replaces_symbols() {
        let x = sym("x");
        let y = sym("y");
        let e = &x + &y;
        let mut map = HashMap::new();
        map.insert(x.clone(), Expr::number(3.0));
        let out = e.substitute(&map);
        assert_eq!(out, Expr::number(3.0) + &y);
    }

    #[test]
    fn substitute_renames_derivative_var() {
        let x = sym("x");
        let t = sym("t");
        let d = Expr::derivative(&x, vec![(t.clone(), 1)]);
        let mut map = HashMap::new();
        map.insert(t.clone(), Expr::from(sym("tau")));
        match d.substitute(&map) {
            Expr::Derivative { vars, .. } => assert_eq!(vars[0].0, sym("tau")),
            other => panic!("expected Derivative, got {other:?}"),
        }
    }

    #[test]
    fn display_round_trip_readable() {
        let x = sym("x");
        let e = (Expr::from(&x) + 1.0) * sym("y");
        assert_eq!(e.to_string(), "(x + 1)*y");
        let p = Expr::from(&x).powi(2);
        assert_eq!(p.to_string(), "x**2");
        let eq = Expr::equality(&x, Expr::number(2.0));
        assert_eq!(eq.to_string(), "x == 2");
    }
}
