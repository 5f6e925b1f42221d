//! Fluid data for the builtin engine.
//!
//! Critical and triple-point constants follow the reference equations of
//! state for each fluid; `rackett_z` is the Spencer–Danner Z_RA parameter;
//! `cp0` is the ideal-gas molar heat capacity at 298.15 K, held constant.

use crate::properties::FluidConstants;

/// Vapour-pressure correlation used for a species.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaturationCurve {
    /// IAPWS-IF97 region 4 (water only).
    Iapws97,
    /// Lee–Kesler corresponding-states correlation.
    LeeKesler,
}

#[derive(Debug)]
pub struct Species {
    pub name: &'static str,
    pub aliases: &'static [&'static str],
    pub constants: FluidConstants,
    pub rackett_z: f64,
    /// J/(mol·K)
    pub cp0: f64,
    pub curve: SaturationCurve,
}

/// Predefined mixture with fixed mole fractions.
#[derive(Debug)]
pub struct Blend {
    pub name: &'static str,
    pub parts: &'static [(&'static str, f64)],
}

const fn constants(
    molar_mass: f64,
    t_crit: f64,
    p_crit: f64,
    rhomolar_crit: f64,
    t_triple: f64,
    acentric: f64,
) -> FluidConstants {
    FluidConstants { molar_mass, t_crit, p_crit, rhomolar_crit, t_triple, acentric }
}

pub static SPECIES: &[Species] = &[
    Species {
        name: "Water",
        aliases: &["H2O"],
        constants: constants(0.018_015_268, 647.096, 22.064e6, 17_873.728, 273.16, 0.344_292),
        rackett_z: 0.2338,
        cp0: 33.58,
        curve: SaturationCurve::Iapws97,
    },
    Species {
        name: "Nitrogen",
        aliases: &["N2"],
        constants: constants(0.028_013_48, 126.192, 3.3958e6, 11_183.9, 63.151, 0.0372),
        rackett_z: 0.2900,
        cp0: 29.12,
        curve: SaturationCurve::LeeKesler,
    },
    Species {
        name: "Oxygen",
        aliases: &["O2"],
        constants: constants(0.031_998_8, 154.581, 5.043e6, 13_630.0, 54.361, 0.0222),
        rackett_z: 0.2907,
        cp0: 29.38,
        curve: SaturationCurve::LeeKesler,
    },
    Species {
        name: "Argon",
        aliases: &["Ar"],
        constants: constants(0.039_948, 150.687, 4.863e6, 13_407.4, 83.8058, -0.002_19),
        rackett_z: 0.2911,
        cp0: 20.786,
        curve: SaturationCurve::LeeKesler,
    },
    Species {
        name: "CarbonDioxide",
        aliases: &["CO2", "R744"],
        constants: constants(0.044_009_8, 304.1282, 7.3773e6, 10_624.906, 216.592, 0.223_94),
        rackett_z: 0.2722,
        cp0: 37.12,
        curve: SaturationCurve::LeeKesler,
    },
    Species {
        name: "Methane",
        aliases: &["CH4", "R50"],
        constants: constants(0.016_042_8, 190.564, 4.5992e6, 10_139.128, 90.6941, 0.011_42),
        rackett_z: 0.2892,
        cp0: 35.69,
        curve: SaturationCurve::LeeKesler,
    },
    Species {
        name: "Propane",
        aliases: &["C3H8", "R290"],
        constants: constants(0.044_095_62, 369.89, 4.2512e6, 5_000.0, 85.525, 0.1521),
        rackett_z: 0.2766,
        cp0: 73.6,
        curve: SaturationCurve::LeeKesler,
    },
    Species {
        name: "Hydrogen",
        aliases: &["H2"],
        constants: constants(0.002_015_88, 33.145, 1.2964e6, 15_508.0, 13.957, -0.219),
        rackett_z: 0.3218,
        cp0: 28.84,
        curve: SaturationCurve::LeeKesler,
    },
    Species {
        name: "Ethanol",
        aliases: &["C2H6O"],
        constants: constants(0.046_068_44, 514.71, 6.268e6, 5_930.0, 159.1, 0.646),
        rackett_z: 0.2502,
        cp0: 65.6,
        curve: SaturationCurve::LeeKesler,
    },
    Species {
        name: "R134a",
        aliases: &["HFC134a"],
        constants: constants(0.102_032, 374.21, 4.059_28e6, 5_017.053, 169.85, 0.326_84),
        rackett_z: 0.2583,
        cp0: 87.0,
        curve: SaturationCurve::LeeKesler,
    },
    Species {
        name: "R32",
        aliases: &["CH2F2"],
        constants: constants(0.052_024, 351.255, 5.782e6, 8_150.085, 136.34, 0.2769),
        rackett_z: 0.2424,
        cp0: 42.9,
        curve: SaturationCurve::LeeKesler,
    },
    Species {
        name: "R125",
        aliases: &["C2HF5"],
        constants: constants(0.120_022, 339.173, 3.6177e6, 4_779.0, 172.52, 0.3052),
        rackett_z: 0.2653,
        cp0: 95.5,
        curve: SaturationCurve::LeeKesler,
    },
];

pub static BLENDS: &[Blend] = &[
    Blend {
        name: "Air",
        parts: &[("Nitrogen", 0.7812), ("Oxygen", 0.2096), ("Argon", 0.0092)],
    },
    Blend {
        name: "R410A",
        parts: &[("R32", 0.697_614), ("R125", 0.302_386)],
    },
];

fn same_name(a: &str, b: &str) -> bool {
    a.trim().eq_ignore_ascii_case(b)
}

pub fn species(name: &str) -> Option<&'static Species> {
    SPECIES
        .iter()
        .find(|s| same_name(name, s.name) || s.aliases.iter().any(|a| same_name(name, a)))
}

pub fn blend(name: &str) -> Option<&'static Blend> {
    BLENDS.iter().find(|b| same_name(name, b.name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookups_accept_aliases_in_any_case() {
        assert_eq!(species("water").unwrap().name, "Water");
        assert_eq!(species("r744").unwrap().name, "CarbonDioxide");
        assert_eq!(species(" N2 ").unwrap().name, "Nitrogen");
        assert!(species("Unobtainium").is_none());
    }

    #[test]
    fn blends_are_normalized_and_resolvable() {
        for b in BLENDS {
            let sum: f64 = b.parts.iter().map(|(_, x)| x).sum();
            assert!((sum - 1.0).abs() < 1e-9, "{} sums to {sum}", b.name);
            for (part, _) in b.parts {
                assert!(species(part).is_some(), "{} references {part}", b.name);
            }
        }
    }

    #[test]
    fn critical_point_above_triple_point() {
        for s in SPECIES {
            assert!(s.constants.t_crit > s.constants.t_triple, "{}", s.name);
            assert!(s.rackett_z > 0.0 && s.rackett_z < 1.0, "{}", s.name);
        }
    }
}
