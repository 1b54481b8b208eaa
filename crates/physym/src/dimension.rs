//! Dimensions: products of base physical dimensions with rational exponents.
//! Equality of dimensions is what the checker compares; scale factors never
//! participate.

use num_rational::Ratio;
use std::collections::BTreeMap;

/// Rational exponent for dimensions and units.
pub type Exponent = Ratio<i64>;

/// Names of the SI base dimensions, in catalog order.
pub const BASE_DIMENSIONS: &[&str] = &[
    "length",
    "mass",
    "time",
    "temperature",
    "amount_of_substance",
    "luminous_intensity",
    "current",
];

/// A dimension is a product of base-dimension names with rational exponents.
/// Stored in canonical form: sorted by name, zero exponents removed.
#[derive(Clone, PartialEq, Eq, Hash, Debug, Default)]
pub struct Dimension(BTreeMap<String, Exponent>);

impl Dimension {
    /// Dimensionless.
    pub fn none() -> Self {
        Self(BTreeMap::new())
    }

    /// Single base dimension with exponent 1.
    pub fn base(name: &str) -> Self {
        let mut m = BTreeMap::new();
        m.insert(name.to_string(), Exponent::from_integer(1));
        Self(m)
    }

    /// From multiple factors; merges same names, drops zero exponents.
    pub fn from_factors(factors: impl IntoIterator<Item = (String, Exponent)>) -> Self {
        let mut m = BTreeMap::new();
        for (name, exp) in factors {
            if exp != Exponent::from_integer(0) {
                let e = m.entry(name).or_insert_with(|| Exponent::from_integer(0));
                *e += exp;
            }
        }
        m.retain(|_, e| *e != Exponent::from_integer(0));
        Self(m)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Exponent)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn is_none(&self) -> bool {
        self.0.is_empty()
    }

    /// Multiply two dimensions (add exponents for same base).
    #[allow(clippy::should_implement_trait)]
    pub fn mul(mut self, other: &Self) -> Self {
        for (name, exp) in &other.0 {
            let e = self
                .0
                .entry(name.clone())
                .or_insert_with(|| Exponent::from_integer(0));
            *e += *exp;
        }
        self.0.retain(|_, e| *e != Exponent::from_integer(0));
        self
    }

    /// Divide: self * other^(-1).
    #[allow(clippy::should_implement_trait)]
    pub fn div(mut self, other: &Self) -> Self {
        for (name, exp) in &other.0 {
            let e = self
                .0
                .entry(name.clone())
                .or_insert_with(|| Exponent::from_integer(0));
            *e -= *exp;
        }
        self.0.retain(|_, e| *e != Exponent::from_integer(0));
        self
    }

    /// Raise to a rational power.
    pub fn pow(&self, exp: Exponent) -> Self {
        let m = self
            .0
            .iter()
            .map(|(k, v)| (k.clone(), v * exp))
            .filter(|(_, e)| *e != Exponent::from_integer(0))
            .collect();
        Self(m)
    }

    /// Inverse: every exponent negated.
    pub fn recip(&self) -> Self {
        self.pow(Exponent::from_integer(-1))
    }
}

impl std::fmt::Display for Dimension {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.0.is_empty() {
            return f.write_str("1");
        }
        let parts: Vec<String> = self
            .0
            .iter()
            .map(|(name, e)| {
                if *e == Exponent::from_integer(1) {
                    name.clone()
                } else {
                    format!("{name}^{e}")
                }
            })
            .collect();
        write!(f, "{}", parts.join("·"))
    }
}
