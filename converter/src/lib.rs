//! Unit conversion for property values crossing engine boundaries.
//!
//! Three unit systems meet in the facade:
//!
//! | System          | T | P   | D      | H, U   | S, Cp, Cv  | η      | λ       |
//! |-----------------|---|-----|--------|--------|------------|--------|---------|
//! | REFPROP native  | K | kPa | mol/L  | J/mol  | J/(mol·K)  | µPa·s  | W/(m·K) |
//! | SI molar        | K | Pa  | mol/m³ | J/mol  | J/(mol·K)  | Pa·s   | W/(m·K) |
//! | SI mass         | K | Pa  | kg/m³  | J/kg   | J/(kg·K)   | Pa·s   | W/(m·K) |
//!
//! Engines work internally in SI molar units; callers of `PropsSI` see SI
//! mass units for the unqualified names (`D`, `H`, `S`, …).
//!
//! ```
//! use converter::{Converter, Quantity};
//!
//! let water = Converter::new(0.018015268);
//! // 1 kPa native → 1000 Pa
//! assert_eq!(water.si_from_refprop(Quantity::Pressure, 1.0), 1000.0);
//! // 55.5 mol/L → ~1000 kg/m³
//! let d = water.to_mass(Quantity::Density, water.si_from_refprop(Quantity::Density, 55.5));
//! assert!((d - 999.85).abs() < 0.1);
//! ```

/// Physical quantity a value belongs to; selects the conversion factor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quantity {
    Temperature,
    Pressure,
    /// Amount density (molar) or mass density.
    Density,
    /// Enthalpy, internal energy.
    Energy,
    /// Entropy, heat capacities, gas constant.
    Entropy,
    Viscosity,
    Conductivity,
    /// Molar mass: g/mol native, kg/mol SI.
    MolarMass,
    /// Quality, speed of sound, compressibility, ratios.
    Dimensionless,
}

/// Amount basis of an intensive property.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Basis {
    Molar,
    Mass,
}

/// Converts values between unit systems for one fluid or mixture.
///
/// Mass/molar conversions need the (mixture-averaged) molar mass, so a
/// `Converter` is built per fluid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Converter {
    /// Molar mass in kg/mol.
    pub molar_mass: f64,
}

impl Converter {
    /// `molar_mass` in kg/mol.
    pub fn new(molar_mass: f64) -> Self {
        Self { molar_mass }
    }

    /// Build from a molar mass in g/mol (REFPROP's `INFOdll` unit).
    pub fn from_g_per_mol(molar_mass: f64) -> Self {
        Self { molar_mass: molar_mass / 1000.0 }
    }

    // ── REFPROP native ↔ SI molar ──────────────────────────────────

    fn refprop_factor(q: Quantity) -> f64 {
        match q {
            Quantity::Pressure => 1000.0,
            Quantity::Density => 1000.0,
            Quantity::Viscosity => 1.0e-6,
            Quantity::MolarMass => 1.0e-3,
            Quantity::Temperature
            | Quantity::Energy
            | Quantity::Entropy
            | Quantity::Conductivity
            | Quantity::Dimensionless => 1.0,
        }
    }

    /// REFPROP native → SI molar.
    pub fn si_from_refprop(&self, q: Quantity, value: f64) -> f64 {
        value * Self::refprop_factor(q)
    }

    /// SI molar → REFPROP native.
    pub fn refprop_from_si(&self, q: Quantity, value: f64) -> f64 {
        value / Self::refprop_factor(q)
    }

    // ── SI molar ↔ SI mass ─────────────────────────────────────────

    /// SI molar → SI mass. Quantities without an amount basis pass through.
    pub fn to_mass(&self, q: Quantity, value: f64) -> f64 {
        match q {
            Quantity::Density => value * self.molar_mass,
            Quantity::Energy | Quantity::Entropy => value / self.molar_mass,
            _ => value,
        }
    }

    /// SI mass → SI molar.
    pub fn to_molar(&self, q: Quantity, value: f64) -> f64 {
        match q {
            Quantity::Density => value / self.molar_mass,
            Quantity::Energy | Quantity::Entropy => value * self.molar_mass,
            _ => value,
        }
    }

    /// Convert an SI value on `basis` into SI molar.
    pub fn molar_from(&self, q: Quantity, basis: Basis, value: f64) -> f64 {
        match basis {
            Basis::Molar => value,
            Basis::Mass => self.to_molar(q, value),
        }
    }

    /// Convert an SI molar value onto `basis`.
    pub fn molar_to(&self, q: Quantity, basis: Basis, value: f64) -> f64 {
        match basis {
            Basis::Molar => value,
            Basis::Mass => self.to_mass(q, value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn refprop_pressure_is_kilopascal() {
        let c = Converter::new(0.028);
        assert_eq!(c.si_from_refprop(Quantity::Pressure, 101.325), 101_325.0);
        assert_eq!(c.refprop_from_si(Quantity::Pressure, 101_325.0), 101.325);
    }

    #[test]
    fn temperature_never_scales() {
        let c = Converter::new(0.044);
        assert_eq!(c.to_mass(Quantity::Temperature, 300.0), 300.0);
        assert_eq!(c.si_from_refprop(Quantity::Temperature, 300.0), 300.0);
    }

    #[test]
    fn mass_and_molar_bases_invert() {
        let c = Converter::from_g_per_mol(18.015268);
        let h_molar = 40_650.0;
        let h_mass = c.to_mass(Quantity::Energy, h_molar);
        assert!((h_mass - 2_256_418.0).abs() < 100.0);
        let back = c.molar_from(Quantity::Energy, Basis::Mass, h_mass);
        assert!((back - h_molar).abs() < 1e-9);
    }
}
