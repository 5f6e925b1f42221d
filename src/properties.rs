use converter::{Converter, Quantity};
use serde::{Deserialize, Serialize};

use crate::error::{FacadeError, Result};
use crate::parameter::Parameter;

/// Molar gas constant, J/(mol·K) (CODATA 2018, exact).
pub const GAS_CONSTANT: f64 = 8.314_462_618;

// ── Phase ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    Liquid,
    Gas,
    TwoPhase,
    Supercritical,
}

// ── Thermodynamic state ─────────────────────────────────────────────

/// A solved state point, in **SI molar units**.
///
/// | Field            | Unit       |
/// |------------------|------------|
/// | temperature      | K          |
/// | pressure         | Pa         |
/// | molar_density    | mol/m³     |
/// | molar_mass       | kg/mol     |
/// | enthalpy         | J/mol      |
/// | entropy          | J/(mol·K)  |
/// | internal_energy  | J/mol      |
/// | cp, cv           | J/(mol·K)  |
/// | sound_speed      | m/s        |
/// | viscosity        | Pa·s       |
/// | conductivity     | W/(m·K)    |
/// | quality          | molar vapour fraction; -1 outside the dome |
///
/// Optional fields are `None` where the engine's model does not define
/// them (e.g. heat capacities inside the two-phase dome).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThermoState {
    pub temperature: f64,
    pub pressure: f64,
    pub molar_density: f64,
    pub molar_mass: f64,
    pub enthalpy: f64,
    pub entropy: f64,
    pub internal_energy: f64,
    pub cp: Option<f64>,
    pub cv: Option<f64>,
    pub sound_speed: Option<f64>,
    pub viscosity: Option<f64>,
    pub conductivity: Option<f64>,
    pub quality: f64,
    pub phase: Phase,
}

impl ThermoState {
    /// Read one output from the state, converted to its SI basis.
    ///
    /// Fluid constants are not part of a state; ask the engine instead.
    pub fn value(&self, param: Parameter) -> Result<f64> {
        let conv = Converter::new(self.molar_mass);
        let (quantity, basis) = param.quantity();
        let undefined = |what: &str| {
            FacadeError::NotSupported(format!("{what} is undefined for a {:?} state", self.phase))
        };
        let molar = match param {
            Parameter::Temperature => self.temperature,
            Parameter::Pressure => self.pressure,
            Parameter::Dmass | Parameter::Dmolar => self.molar_density,
            Parameter::Hmass | Parameter::Hmolar => self.enthalpy,
            Parameter::Smass | Parameter::Smolar => self.entropy,
            Parameter::Umass | Parameter::Umolar => self.internal_energy,
            Parameter::Cpmass | Parameter::Cpmolar => self.cp.ok_or_else(|| undefined("cp"))?,
            Parameter::Cvmass | Parameter::Cvmolar => self.cv.ok_or_else(|| undefined("cv"))?,
            Parameter::Quality => self.quality,
            Parameter::SpeedOfSound => self.sound_speed.ok_or_else(|| undefined("speed of sound"))?,
            Parameter::Compressibility => {
                self.pressure / (self.molar_density * GAS_CONSTANT * self.temperature)
            }
            Parameter::IsentropicExpansion => {
                let cp = self.cp.ok_or_else(|| undefined("cp"))?;
                let cv = self.cv.ok_or_else(|| undefined("cv"))?;
                cp / cv
            }
            Parameter::Viscosity => self.viscosity.ok_or_else(|| undefined("viscosity"))?,
            Parameter::Conductivity => {
                self.conductivity.ok_or_else(|| undefined("conductivity"))?
            }
            Parameter::MolarMass => self.molar_mass,
            Parameter::GasConstant => GAS_CONSTANT,
            other => {
                return Err(FacadeError::MisusedParameter {
                    name: other.name().to_string(),
                    role: "a state output",
                });
            }
        };
        Ok(conv.molar_to(quantity, basis, molar))
    }
}

// ── Fluid constants ─────────────────────────────────────────────────

/// State-independent data for one pure component, SI units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FluidConstants {
    /// Molar mass (kg/mol)
    pub molar_mass: f64,
    /// Critical temperature (K)
    pub t_crit: f64,
    /// Critical pressure (Pa)
    pub p_crit: f64,
    /// Critical molar density (mol/m³)
    pub rhomolar_crit: f64,
    /// Triple-point temperature (K)
    pub t_triple: f64,
    /// Acentric factor
    pub acentric: f64,
}

impl FluidConstants {
    pub fn value(&self, param: Parameter) -> Result<f64> {
        Ok(match param {
            Parameter::MolarMass => self.molar_mass,
            Parameter::GasConstant => GAS_CONSTANT,
            Parameter::Tcrit => self.t_crit,
            Parameter::Pcrit => self.p_crit,
            Parameter::RhomolarCrit => self.rhomolar_crit,
            Parameter::RhomassCrit => self.rhomolar_crit * self.molar_mass,
            Parameter::Ttriple => self.t_triple,
            Parameter::Acentric => self.acentric,
            other => {
                return Err(FacadeError::MisusedParameter {
                    name: other.name().to_string(),
                    role: "a fluid constant",
                });
            }
        })
    }
}

impl std::fmt::Display for FluidConstants {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "M     = {:.6} kg/mol", self.molar_mass)?;
        writeln!(f, "Tc    = {:.4} K ({:.2} °C)", self.t_crit, self.t_crit - 273.15)?;
        writeln!(f, "Pc    = {:.1} Pa", self.p_crit)?;
        writeln!(f, "Dc    = {:.3} mol/m³", self.rhomolar_crit)?;
        writeln!(f, "T_trp = {:.4} K", self.t_triple)?;
        write!(f, "omega = {:.5}", self.acentric)
    }
}
