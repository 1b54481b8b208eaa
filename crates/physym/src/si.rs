//! SI unit catalog: named base and derived units mapped to scale factor and
//! dimension, plus human-facing rendering of raw dimensions.

use crate::dimension::{Dimension, Exponent};
use crate::unit::Unit;

/// One catalog row: long name, display symbol, unit value.
#[derive(Clone, Debug)]
pub struct CatalogEntry {
    pub name: &'static str,
    pub symbol: &'static str,
    pub unit: Unit,
}

/// Fixed catalog of named units. Iteration order is declaration order; ties in
/// display derivation are broken by that order.
#[derive(Clone)]
pub struct SiCatalog {
    entries: Vec<CatalogEntry>,
}

impl SiCatalog {
    /// Full default catalog: the 7 SI base units, the named coherent derived
    /// units, and a few scaled units used by declaration data modules.
    pub fn default_si() -> Self {
        let mut entries = Vec::new();
        let mut push = |name: &'static str, symbol: &'static str, unit: Unit| {
            entries.push(CatalogEntry { name, symbol, unit });
        };

        push("meter", "m", meter());
        push("kilogram", "kg", kilogram());
        push("second", "s", second());
        push("kelvin", "K", kelvin());
        push("mole", "mol", mole());
        push("candela", "cd", candela());
        push("ampere", "A", ampere());

        push("hertz", "Hz", hertz());
        push("newton", "N", newton());
        push("pascal", "Pa", pascal());
        push("joule", "J", joule());
        push("watt", "W", watt());
        push("coulomb", "C", coulomb());
        push("volt", "V", volt());
        push("farad", "F", farad());
        push("ohm", "Ω", ohm());
        push("siemens", "S", siemens());
        push("weber", "Wb", weber());
        push("tesla", "T", tesla());
        push("henry", "H", henry());
        push("lux", "lx", lux());
        push("gray", "Gy", gray());
        push("katal", "kat", katal());

        push("gram", "g", gram());
        push("kilometer", "km", kilometer());
        push("hour", "h", hour());
        push("minute", "min", minute());
        push("bar", "bar", bar());
        push("kilojoule", "kJ", kilojoule());
        push("megajoule", "MJ", megajoule());

        Self { entries }
    }

    pub fn entries(&self) -> impl Iterator<Item = &CatalogEntry> {
        self.entries.iter()
    }

    pub fn get(&self, name: &str) -> Option<&CatalogEntry> {
        self.entries
            .iter()
            .find(|e| e.name == name || e.symbol == name)
    }

    /// First catalog entry whose dimension matches exactly (scale ignored).
    pub fn named(&self, dimension: &Dimension) -> Option<&CatalogEntry> {
        self.entries
            .iter()
            .find(|e| e.unit.dimension() == dimension)
    }

    /// Human-readable unit for a raw dimension. Prefers a single named unit;
    /// otherwise falls back to a product of base-unit symbols. Display only:
    /// the output is dimensionally correct but not unique.
    pub fn derive_display_unit(&self, dimension: &Dimension) -> String {
        if dimension.is_none() {
            return "1".to_string();
        }
        if let Some(entry) = self.named(dimension) {
            return entry.symbol.to_string();
        }
        let parts: Vec<String> = dimension
            .iter()
            .map(|(dim_name, e)| {
                let symbol = self.base_symbol(dim_name);
                if *e == Exponent::from_integer(1) {
                    symbol.to_string()
                } else {
                    format!("{symbol}^{e}")
                }
            })
            .collect();
        parts.join("·")
    }

    /// Markdown unit rendering for metadata tables. Renders the unit's
    /// recorded factorization when it has one, so a quantity declared in
    /// `joule() / kilogram()` shows `J kg$^{-1}$` rather than `m$^{2}$
    /// s$^{-2}$`; anonymous dimensions fall back to base-unit symbols.
    pub fn markdown(&self, unit: &Unit) -> String {
        if unit.dimension().is_none() {
            return "-".to_string();
        }
        let factors = unit.display_factors();
        if !factors.is_empty() {
            return factors
                .iter()
                .map(|(symbol, e)| markdown_term(symbol, e))
                .collect::<Vec<_>>()
                .join(" ");
        }
        let mut parts: Vec<(String, Exponent)> = unit
            .dimension()
            .iter()
            .map(|(dim_name, e)| (self.base_symbol(dim_name).to_string(), *e))
            .collect();
        // Positive exponents first, then alphabetical.
        parts.sort_by(|(s1, e1), (s2, e2)| e2.cmp(e1).then_with(|| s1.cmp(s2)));
        parts
            .iter()
            .map(|(symbol, e)| markdown_term(symbol, e))
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn base_symbol(&self, dimension_name: &str) -> &'static str {
        let base = Dimension::base(dimension_name);
        self.entries
            .iter()
            .find(|e| e.unit.factor() == 1.0 && *e.unit.dimension() == base)
            .map(|e| e.symbol)
            .unwrap_or("?")
    }
}

fn markdown_term(symbol: &str, e: &Exponent) -> String {
    if *e == Exponent::from_integer(1) {
        symbol.to_string()
    } else {
        format!("{symbol}$^{{{e}}}$")
    }
}

// Constructor functions for declaration sites: `Quantity::new(..).unit(meter())`.
// Each carries its own display symbol; arithmetic on them keeps the
// factorization (`joule() / kilogram()` renders as `J kg$^{-1}$`).

pub fn meter() -> Unit {
    Unit::base("length").named("m")
}

pub fn kilogram() -> Unit {
    Unit::base("mass").named("kg")
}

pub fn second() -> Unit {
    Unit::base("time").named("s")
}

pub fn kelvin() -> Unit {
    Unit::base("temperature").named("K")
}

pub fn mole() -> Unit {
    Unit::base("amount_of_substance").named("mol")
}

pub fn candela() -> Unit {
    Unit::base("luminous_intensity").named("cd")
}

pub fn ampere() -> Unit {
    Unit::base("current").named("A")
}

pub fn hertz() -> Unit {
    (Unit::one() / second()).named("Hz")
}

pub fn newton() -> Unit {
    (kilogram() * meter() / second().powi(2)).named("N")
}

pub fn pascal() -> Unit {
    (newton() / meter().powi(2)).named("Pa")
}

pub fn joule() -> Unit {
    (newton() * meter()).named("J")
}

pub fn watt() -> Unit {
    (joule() / second()).named("W")
}

pub fn coulomb() -> Unit {
    (ampere() * second()).named("C")
}

pub fn volt() -> Unit {
    (joule() / coulomb()).named("V")
}

pub fn farad() -> Unit {
    (coulomb() / volt()).named("F")
}

pub fn ohm() -> Unit {
    (volt() / ampere()).named("Ω")
}

pub fn siemens() -> Unit {
    (ampere() / volt()).named("S")
}

pub fn weber() -> Unit {
    (volt() * second()).named("Wb")
}

pub fn tesla() -> Unit {
    (weber() / meter().powi(2)).named("T")
}

pub fn henry() -> Unit {
    (weber() / ampere()).named("H")
}

pub fn lux() -> Unit {
    (candela() / meter().powi(2)).named("lx")
}

pub fn gray() -> Unit {
    (joule() / kilogram()).named("Gy")
}

pub fn katal() -> Unit {
    (mole() / second()).named("kat")
}

pub fn gram() -> Unit {
    (0.001 * kilogram()).named("g")
}

pub fn kilometer() -> Unit {
    (1000.0 * meter()).named("km")
}

pub fn hour() -> Unit {
    (3600.0 * second()).named("h")
}

pub fn minute() -> Unit {
    (60.0 * second()).named("min")
}

pub fn bar() -> Unit {
    (1.0e5 * pascal()).named("bar")
}

pub fn kilojoule() -> Unit {
    (1000.0 * joule()).named("kJ")
}

pub fn megajoule() -> Unit {
    (1.0e6 * joule()).named("MJ")
}
