//! Property-name vocabulary shared by every entry point.
//!
//! Names are matched case-insensitively. Unqualified names (`D`, `H`, `S`,
//! `U`, `C`, `O`) are mass-based SI, matching `PropsSI` conventions.

use std::fmt;
use std::str::FromStr;

use converter::{Basis, Quantity};
use serde::{Deserialize, Serialize};

use crate::error::{FacadeError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Parameter {
    Temperature,
    Pressure,
    Dmass,
    Dmolar,
    Hmass,
    Hmolar,
    Smass,
    Smolar,
    Umass,
    Umolar,
    Cpmass,
    Cpmolar,
    Cvmass,
    Cvmolar,
    Quality,
    SpeedOfSound,
    Compressibility,
    IsentropicExpansion,
    Viscosity,
    Conductivity,
    // ── state-independent ──
    MolarMass,
    GasConstant,
    Tcrit,
    Pcrit,
    RhomassCrit,
    RhomolarCrit,
    Ttriple,
    Acentric,
}

/// One (name, value) half of a state point, already parsed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Input {
    pub param: Parameter,
    pub value: f64,
}

impl Input {
    pub fn new(param: Parameter, value: f64) -> Self {
        Self { param, value }
    }
}

/// Input families an engine dispatches on, with the basis they arrived in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    T,
    P,
    D(Basis),
    H(Basis),
    S(Basis),
    U(Basis),
    Q,
}

impl Parameter {
    /// Parse a property name (`"T"`, `"Hmass"`, `"Tcrit"`, …).
    pub fn parse(name: &str) -> Result<Self> {
        let key = name.trim().to_ascii_uppercase();
        let p = match key.as_str() {
            "T" => Self::Temperature,
            "P" => Self::Pressure,
            "D" | "DMASS" | "RHO" | "RHOMASS" => Self::Dmass,
            "DMOLAR" | "RHOMOLAR" => Self::Dmolar,
            "H" | "HMASS" => Self::Hmass,
            "HMOLAR" => Self::Hmolar,
            "S" | "SMASS" => Self::Smass,
            "SMOLAR" => Self::Smolar,
            "U" | "UMASS" => Self::Umass,
            "UMOLAR" => Self::Umolar,
            "C" | "CP" | "CPMASS" => Self::Cpmass,
            "CPMOLAR" => Self::Cpmolar,
            "O" | "CV" | "CVMASS" => Self::Cvmass,
            "CVMOLAR" => Self::Cvmolar,
            "Q" => Self::Quality,
            "A" | "W" | "SPEED_OF_SOUND" | "SPEED_SOUND" => Self::SpeedOfSound,
            "Z" => Self::Compressibility,
            "ISENTROPIC_EXPANSION_COEFFICIENT" => Self::IsentropicExpansion,
            "V" | "VISCOSITY" => Self::Viscosity,
            "L" | "CONDUCTIVITY" => Self::Conductivity,
            "M" | "MOLARMASS" | "MOLAR_MASS" | "MOLEMASS" => Self::MolarMass,
            "GAS_CONSTANT" => Self::GasConstant,
            "TCRIT" | "T_CRITICAL" => Self::Tcrit,
            "PCRIT" | "P_CRITICAL" => Self::Pcrit,
            "RHOCRIT" | "RHOMASS_CRITICAL" => Self::RhomassCrit,
            "RHOMOLAR_CRITICAL" => Self::RhomolarCrit,
            "TTRIPLE" | "T_TRIPLE" | "TMIN" => Self::Ttriple,
            "ACENTRIC" | "ACENTRIC_FACTOR" => Self::Acentric,
            _ => return Err(FacadeError::UnknownParameter(name.to_string())),
        };
        Ok(p)
    }

    /// Legacy single-character input code (`'T'`, `'P'`, `'D'`, …).
    ///
    /// The code is turned into a one-letter name and parsed by
    /// [`Parameter::parse`], so both entry points share one vocabulary.
    pub fn from_code(code: u8) -> Result<Self> {
        if !code.is_ascii_graphic() {
            return Err(FacadeError::UnknownParameter(format!("\\x{code:02x}")));
        }
        Self::parse(&char::from(code).to_string())
    }

    /// Fluid constants that do not depend on a state point.
    pub fn is_constant(self) -> bool {
        matches!(
            self,
            Self::MolarMass
                | Self::GasConstant
                | Self::Tcrit
                | Self::Pcrit
                | Self::RhomassCrit
                | Self::RhomolarCrit
                | Self::Ttriple
                | Self::Acentric
        )
    }

    /// Family this parameter belongs to when used as a state input.
    pub fn input_kind(self) -> Option<InputKind> {
        Some(match self {
            Self::Temperature => InputKind::T,
            Self::Pressure => InputKind::P,
            Self::Dmass => InputKind::D(Basis::Mass),
            Self::Dmolar => InputKind::D(Basis::Molar),
            Self::Hmass => InputKind::H(Basis::Mass),
            Self::Hmolar => InputKind::H(Basis::Molar),
            Self::Smass => InputKind::S(Basis::Mass),
            Self::Smolar => InputKind::S(Basis::Molar),
            Self::Umass => InputKind::U(Basis::Mass),
            Self::Umolar => InputKind::U(Basis::Molar),
            Self::Quality => InputKind::Q,
            _ => return None,
        })
    }

    /// Quantity and basis, for unit conversion.
    pub fn quantity(self) -> (Quantity, Basis) {
        use Basis::*;
        match self {
            Self::Temperature | Self::Tcrit | Self::Ttriple => (Quantity::Temperature, Molar),
            Self::Pressure | Self::Pcrit => (Quantity::Pressure, Molar),
            Self::Dmass | Self::RhomassCrit => (Quantity::Density, Mass),
            Self::Dmolar | Self::RhomolarCrit => (Quantity::Density, Molar),
            Self::Hmass | Self::Umass => (Quantity::Energy, Mass),
            Self::Hmolar | Self::Umolar => (Quantity::Energy, Molar),
            Self::Smass | Self::Cpmass | Self::Cvmass => (Quantity::Entropy, Mass),
            Self::Smolar | Self::Cpmolar | Self::Cvmolar | Self::GasConstant => {
                (Quantity::Entropy, Molar)
            }
            Self::Viscosity => (Quantity::Viscosity, Molar),
            Self::Conductivity => (Quantity::Conductivity, Molar),
            Self::MolarMass => (Quantity::MolarMass, Molar),
            Self::Quality
            | Self::SpeedOfSound
            | Self::Compressibility
            | Self::IsentropicExpansion
            | Self::Acentric => (Quantity::Dimensionless, Molar),
        }
    }

    /// Canonical name, as reported in errors and `FluidsList`-style output.
    pub fn name(self) -> &'static str {
        match self {
            Self::Temperature => "T",
            Self::Pressure => "P",
            Self::Dmass => "Dmass",
            Self::Dmolar => "Dmolar",
            Self::Hmass => "Hmass",
            Self::Hmolar => "Hmolar",
            Self::Smass => "Smass",
            Self::Smolar => "Smolar",
            Self::Umass => "Umass",
            Self::Umolar => "Umolar",
            Self::Cpmass => "Cpmass",
            Self::Cpmolar => "Cpmolar",
            Self::Cvmass => "Cvmass",
            Self::Cvmolar => "Cvmolar",
            Self::Quality => "Q",
            Self::SpeedOfSound => "speed_of_sound",
            Self::Compressibility => "Z",
            Self::IsentropicExpansion => "isentropic_expansion_coefficient",
            Self::Viscosity => "viscosity",
            Self::Conductivity => "conductivity",
            Self::MolarMass => "molar_mass",
            Self::GasConstant => "gas_constant",
            Self::Tcrit => "Tcrit",
            Self::Pcrit => "Pcrit",
            Self::RhomassCrit => "rhomass_critical",
            Self::RhomolarCrit => "rhomolar_critical",
            Self::Ttriple => "Ttriple",
            Self::Acentric => "acentric",
        }
    }
}

impl fmt::Display for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Parameter {
    type Err = FacadeError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// Split a batched output request (`"T&Dmass"` or `"T, Dmass"`).
pub fn parse_output_list(outputs: &str) -> Result<Vec<Parameter>> {
    if outputs.trim().is_empty() {
        return Err(FacadeError::EmptyInput("output list"));
    }
    outputs
        .split(['&', ','])
        .map(|token| {
            if token.trim().is_empty() {
                Err(FacadeError::EmptyInput("output token"))
            } else {
                Parameter::parse(token)
            }
        })
        .collect()
}
