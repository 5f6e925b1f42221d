//! Self-contained reference engine.
//!
//! Model summary, per state region:
//!
//! * vapour, supercritical and mixtures: ideal gas with constant `cp0`,
//!   ideal mixing;
//! * saturation: IAPWS-IF97 region 4 for water, Lee–Kesler otherwise;
//! * saturated and compressed liquid: incompressible Rackett volume,
//!   enthalpy of vaporisation from Clapeyron.
//!
//! Energies are referenced to the ideal gas at 298.15 K and 101 325 Pa.
//! Two-phase and liquid states are only available for pure fluids.

pub mod catalog;
mod saturation;

use converter::{Basis, Converter, Quantity};

use self::catalog::Species;
use self::saturation::bisect;
use super::PropertyEngine;
use crate::error::{FacadeError, Result};
use crate::fluid_ref::FluidRef;
use crate::parameter::{Input, InputKind, Parameter};
use crate::properties::{GAS_CONSTANT as R, Phase, ThermoState};

const T_REF: f64 = 298.15;
const P_REF: f64 = 101_325.0;

// ── Resolved composition ────────────────────────────────────────────

/// Species and mole fractions after expanding predefined blends.
struct Model {
    parts: Vec<(&'static Species, f64)>,
    molar_mass: f64,
    cp0: f64,
    /// -R Σ x ln x
    s_mix: f64,
}

impl Model {
    fn resolve(fluid: &FluidRef) -> Result<Self> {
        let mut parts: Vec<(&'static Species, f64)> = Vec::new();
        for c in &fluid.components {
            if let Some(s) = catalog::species(&c.name) {
                parts.push((s, c.fraction));
            } else if let Some(b) = catalog::blend(&c.name) {
                for (name, x) in b.parts {
                    let s = catalog::species(name)
                        .ok_or_else(|| FacadeError::UnknownFluid((*name).to_string()))?;
                    parts.push((s, x * c.fraction));
                }
            } else {
                return Err(FacadeError::UnknownFluid(c.name.clone()));
            }
        }
        // Repeated species collapse into one entry.
        let mut merged: Vec<(&'static Species, f64)> = Vec::with_capacity(parts.len());
        for (s, x) in parts {
            match merged.iter_mut().find(|(m, _)| std::ptr::eq(*m, s)) {
                Some(entry) => entry.1 += x,
                None => merged.push((s, x)),
            }
        }
        merged.retain(|(_, x)| *x > 0.0);

        let molar_mass = merged.iter().map(|(s, x)| x * s.constants.molar_mass).sum();
        let cp0 = merged.iter().map(|(s, x)| x * s.cp0).sum();
        let s_mix = -R * merged.iter().map(|(_, x)| x * x.ln()).sum::<f64>();
        Ok(Self { parts: merged, molar_mass, cp0, s_mix })
    }

    fn pure(&self) -> Option<&'static Species> {
        match self.parts.as_slice() {
            [(s, _)] => Some(*s),
            _ => None,
        }
    }

    fn require_pure(&self, what: &str) -> Result<&'static Species> {
        self.pure()
            .ok_or_else(|| FacadeError::NotSupported(format!("{what} for mixtures")))
    }

    fn h_ideal(&self, t: f64) -> f64 {
        self.cp0 * (t - T_REF)
    }

    fn s_ideal(&self, t: f64, p: f64) -> f64 {
        self.cp0 * (t / T_REF).ln() - R * (p / P_REF).ln() + self.s_mix
    }

    fn t_from_h_ideal(&self, h: f64) -> Result<f64> {
        positive_temperature(T_REF + h / self.cp0)
    }

    fn t_from_u_ideal(&self, u: f64) -> Result<f64> {
        positive_temperature((u + self.cp0 * T_REF) / (self.cp0 - R))
    }

    fn t_from_s_ideal(&self, p: f64, s: f64) -> Result<f64> {
        positive_temperature(T_REF * ((s - self.s_mix + R * (p / P_REF).ln()) / self.cp0).exp())
    }

    // ── Region builders ─────────────────────────────────────────────

    fn gas(&self, t: f64, p: f64) -> ThermoState {
        let cv = self.cp0 - R;
        let phase = match self.pure() {
            Some(s) if t >= s.constants.t_crit => Phase::Supercritical,
            _ => Phase::Gas,
        };
        ThermoState {
            temperature: t,
            pressure: p,
            molar_density: p / (R * t),
            molar_mass: self.molar_mass,
            enthalpy: self.h_ideal(t),
            entropy: self.s_ideal(t, p),
            internal_energy: self.h_ideal(t) - R * t,
            cp: Some(self.cp0),
            cv: Some(cv),
            sound_speed: Some((self.cp0 / cv * R * t / self.molar_mass).sqrt()),
            viscosity: None,
            conductivity: None,
            quality: -1.0,
            phase,
        }
    }

    fn saturation(&self, s: &Species, t: f64) -> Result<Saturation> {
        let p = s.p_sat(t)?;
        let v_l = s.v_liquid(t);
        let v_v = R * t / p;
        let h_fg = t * (v_v - v_l) * s.dp_sat_dt(t)?;
        let h_v = self.h_ideal(t);
        let s_v = self.s_ideal(t, p);
        Ok(Saturation {
            t,
            p,
            v_l,
            v_v,
            h_l: h_v - h_fg,
            h_v,
            s_l: s_v - h_fg / t,
            s_v,
        })
    }

    /// Liquid enthalpy at (t, p) on the incompressible model.
    fn h_liquid(&self, s: &Species, t: f64, p: f64) -> Result<f64> {
        let sat = self.saturation(s, t)?;
        Ok(sat.h_l + sat.v_l * (p - sat.p))
    }

    fn liquid(&self, s: &Species, t: f64, p: f64) -> Result<ThermoState> {
        const STEP: f64 = 0.25;
        let sat = self.saturation(s, t)?;
        let c = &s.constants;
        let lo = (t - STEP).max(c.t_triple);
        let hi = (t + STEP).min(c.t_crit);
        let cp = (self.saturation(s, hi)?.h_l - self.saturation(s, lo)?.h_l) / (hi - lo);
        let h = sat.h_l + sat.v_l * (p - sat.p);
        Ok(ThermoState {
            temperature: t,
            pressure: p,
            molar_density: 1.0 / sat.v_l,
            molar_mass: self.molar_mass,
            enthalpy: h,
            entropy: sat.s_l,
            internal_energy: h - p * sat.v_l,
            cp: Some(cp),
            cv: Some(cp),
            sound_speed: None,
            viscosity: None,
            conductivity: None,
            quality: -1.0,
            phase: Phase::Liquid,
        })
    }

    fn two_phase(&self, s: &Species, sat: &Saturation, q: f64) -> Result<ThermoState> {
        if q == 0.0 {
            let mut state = self.liquid(s, sat.t, sat.p)?;
            state.quality = 0.0;
            return Ok(state);
        }
        if q == 1.0 {
            let mut state = self.gas(sat.t, sat.p);
            state.quality = 1.0;
            return Ok(state);
        }
        let lerp = |a: f64, b: f64| a + q * (b - a);
        let v = lerp(sat.v_l, sat.v_v);
        let h = lerp(sat.h_l, sat.h_v);
        Ok(ThermoState {
            temperature: sat.t,
            pressure: sat.p,
            molar_density: 1.0 / v,
            molar_mass: self.molar_mass,
            enthalpy: h,
            entropy: lerp(sat.s_l, sat.s_v),
            internal_energy: h - sat.p * v,
            cp: None,
            cv: None,
            sound_speed: None,
            viscosity: None,
            conductivity: None,
            quality: q,
            phase: Phase::TwoPhase,
        })
    }

    // ── Flashes ─────────────────────────────────────────────────────

    fn flash_tp(&self, t: f64, p: f64) -> Result<ThermoState> {
        positive("temperature", t)?;
        positive("pressure", p)?;
        let Some(s) = self.pure() else {
            return Ok(self.gas(t, p));
        };
        let c = &s.constants;
        if t < c.t_triple {
            return Err(FacadeError::OutOfRange(format!(
                "T = {t} K is below the triple point of {} ({} K)",
                s.name, c.t_triple
            )));
        }
        if t < c.t_crit && p > s.p_sat(t)? {
            return self.liquid(s, t, p);
        }
        Ok(self.gas(t, p))
    }

    fn flash_tq(&self, t: f64, q: f64) -> Result<ThermoState> {
        let s = self.require_pure("saturation states")?;
        check_quality(q)?;
        let sat = self.saturation(s, t)?;
        self.two_phase(s, &sat, q)
    }

    fn flash_pq(&self, p: f64, q: f64) -> Result<ThermoState> {
        let s = self.require_pure("saturation states")?;
        check_quality(q)?;
        let t = s.t_sat(p)?;
        let mut sat = self.saturation(s, t)?;
        // Keep the caller's pressure exactly; the curve inversion is not bit-exact.
        sat.p = p;
        sat.v_v = R * t / p;
        self.two_phase(s, &sat, q)
    }

    fn flash_td(&self, t: f64, rho: f64) -> Result<ThermoState> {
        positive("temperature", t)?;
        positive("density", rho)?;
        let v = 1.0 / rho;
        if let Some(s) = self.pure() {
            let c = &s.constants;
            if t < c.t_crit {
                let sat = self.saturation(s, t)?;
                if v < sat.v_l {
                    return Err(FacadeError::NotSupported(
                        "compressed-liquid density on the incompressible liquid model".into(),
                    ));
                }
                if v < sat.v_v {
                    let q = (v - sat.v_l) / (sat.v_v - sat.v_l);
                    return self.two_phase(s, &sat, q);
                }
            }
        }
        Ok(self.gas(t, rho * R * t))
    }

    /// (D, U): the ideal gas when its temperature lies outside the dome at
    /// this volume, otherwise the saturation temperature whose lever-rule
    /// internal energy matches.
    fn flash_du(&self, rho: f64, u: f64) -> Result<ThermoState> {
        positive("density", rho)?;
        let t_gas = self.t_from_u_ideal(u);
        let Some(s) = self.pure() else {
            let t = t_gas?;
            return Ok(self.gas(t, rho * R * t));
        };
        let c = &s.constants;
        let v = 1.0 / rho;
        if let Ok(t) = t_gas {
            if t >= c.t_crit || (t >= c.t_triple && v >= self.saturation(s, t)?.v_v) {
                return Ok(self.gas(t, rho * R * t));
            }
        }

        // Quality clamped to [0, 1] keeps u(T) continuous across both
        // saturation lines; flash_td rejects a compressed-liquid result.
        let t = bisect(c.t_triple, c.t_crit, "temperature from (D, U)", |t| {
            let sat = self.saturation(s, t)?;
            let q = ((v - sat.v_l) / (sat.v_v - sat.v_l)).clamp(0.0, 1.0);
            let u_l = sat.h_l - sat.p * sat.v_l;
            let u_v = sat.h_v - sat.p * sat.v_v;
            Ok(u_l + q * (u_v - u_l) - u)
        })?;
        self.flash_td(t, rho)
    }

    /// Shared (P, H) / (P, S) logic. `prop` picks the caloric property
    /// from a saturation record; `gas_t` inverts the ideal-gas relation;
    /// `liquid_prop` evaluates the property of compressed liquid.
    fn flash_p_caloric(
        &self,
        p: f64,
        target: f64,
        what: &'static str,
        prop: impl Fn(&Saturation) -> (f64, f64),
        gas_t: impl Fn(f64) -> Result<f64>,
        liquid_prop: impl Fn(&Species, f64) -> Result<f64>,
    ) -> Result<ThermoState> {
        positive("pressure", p)?;
        let Some(s) = self.pure() else {
            return Ok(self.gas(gas_t(target)?, p));
        };
        let (p_min, p_max) = s.p_sat_range()?;
        if p < p_min {
            return Ok(self.gas(gas_t(target)?, p));
        }
        if p >= p_max {
            let t = gas_t(target)?;
            if t < s.constants.t_crit {
                return Err(FacadeError::NotSupported(format!(
                    "compressed liquid above the critical pressure of {}",
                    s.name
                )));
            }
            return Ok(self.gas(t, p));
        }

        let t_sat = s.t_sat(p)?;
        let mut sat = self.saturation(s, t_sat)?;
        sat.p = p;
        let (liq, vap) = prop(&sat);
        if target > vap {
            return Ok(self.gas(gas_t(target)?, p));
        }
        if target >= liq {
            let q = (target - liq) / (vap - liq);
            return self.two_phase(s, &sat, q);
        }
        let t = bisect(s.constants.t_triple, t_sat, what, |t| {
            Ok(liquid_prop(s, t)? - target)
        })?;
        self.liquid(s, t, p)
    }

    fn flash_ph(&self, p: f64, h: f64) -> Result<ThermoState> {
        self.flash_p_caloric(
            p,
            h,
            "liquid temperature from (P, H)",
            |sat| (sat.h_l, sat.h_v),
            |h| self.t_from_h_ideal(h),
            |s, t| self.h_liquid(s, t, p),
        )
    }

    fn flash_ps(&self, p: f64, entropy: f64) -> Result<ThermoState> {
        self.flash_p_caloric(
            p,
            entropy,
            "liquid temperature from (P, S)",
            |sat| (sat.s_l, sat.s_v),
            |s| self.t_from_s_ideal(p, s),
            |s, t| Ok(self.saturation(s, t)?.s_l),
        )
    }
}

struct Saturation {
    t: f64,
    p: f64,
    v_l: f64,
    v_v: f64,
    h_l: f64,
    h_v: f64,
    s_l: f64,
    s_v: f64,
}

fn positive(what: &str, value: f64) -> Result<()> {
    if !value.is_finite() || value <= 0.0 {
        return Err(FacadeError::OutOfRange(format!(
            "{what} must be a positive finite number, got {value}"
        )));
    }
    Ok(())
}

fn positive_temperature(t: f64) -> Result<f64> {
    positive("temperature", t)?;
    Ok(t)
}

fn check_quality(q: f64) -> Result<()> {
    if !(0.0..=1.0).contains(&q) {
        return Err(FacadeError::OutOfRange(format!("quality {q} outside [0, 1]")));
    }
    Ok(())
}

// ── Engine ──────────────────────────────────────────────────────────

/// Reference engine backed by [`catalog`] data. Stateless.
#[derive(Debug, Default)]
pub struct BuiltinEngine;

impl BuiltinEngine {
    pub fn new() -> Self {
        Self
    }
}

impl PropertyEngine for BuiltinEngine {
    fn name(&self) -> &'static str {
        "BUILTIN"
    }

    fn constant(&self, fluid: &FluidRef, param: Parameter) -> Result<f64> {
        let model = Model::resolve(fluid)?;
        match (model.pure(), param) {
            (_, Parameter::MolarMass) => Ok(model.molar_mass),
            (_, Parameter::GasConstant) => Ok(R),
            (Some(s), p) => s.constants.value(p),
            (None, p) => Err(FacadeError::NotSupported(format!("{p} for mixtures"))),
        }
    }

    fn state(&self, fluid: &FluidRef, first: Input, second: Input) -> Result<ThermoState> {
        let model = Model::resolve(fluid)?;
        let conv = Converter::new(model.molar_mass);
        let kind = |input: Input| {
            if !input.value.is_finite() {
                return Err(FacadeError::OutOfRange(format!(
                    "{} must be finite, got {}",
                    input.param, input.value
                )));
            }
            input.param.input_kind().ok_or_else(|| FacadeError::MisusedParameter {
                name: input.param.name().to_string(),
                role: "a state input",
            })
        };
        let molar = |input: Input, q: Quantity, basis: Basis| conv.molar_from(q, basis, input.value);

        use InputKind::*;
        let (a, b) = (first, second);
        match (kind(a)?, kind(b)?) {
            (T, P) => model.flash_tp(a.value, b.value),
            (P, T) => model.flash_tp(b.value, a.value),
            (T, Q) => model.flash_tq(a.value, b.value),
            (Q, T) => model.flash_tq(b.value, a.value),
            (P, Q) => model.flash_pq(a.value, b.value),
            (Q, P) => model.flash_pq(b.value, a.value),
            (T, D(basis)) => model.flash_td(a.value, molar(b, Quantity::Density, basis)),
            (D(basis), T) => model.flash_td(b.value, molar(a, Quantity::Density, basis)),
            (P, H(basis)) => model.flash_ph(a.value, molar(b, Quantity::Energy, basis)),
            (H(basis), P) => model.flash_ph(b.value, molar(a, Quantity::Energy, basis)),
            (P, S(basis)) => model.flash_ps(a.value, molar(b, Quantity::Entropy, basis)),
            (S(basis), P) => model.flash_ps(b.value, molar(a, Quantity::Entropy, basis)),
            (D(bd), U(bu)) => model.flash_du(
                molar(a, Quantity::Density, bd),
                molar(b, Quantity::Energy, bu),
            ),
            (U(bu), D(bd)) => model.flash_du(
                molar(b, Quantity::Density, bd),
                molar(a, Quantity::Energy, bu),
            ),
            _ => Err(FacadeError::UnsupportedInputPair(
                a.param.name().to_string(),
                b.param.name().to_string(),
            )),
        }
    }

    fn fluid_names(&self) -> Vec<String> {
        catalog::SPECIES
            .iter()
            .map(|s| s.name)
            .chain(catalog::BLENDS.iter().map(|b| b.name))
            .map(str::to_string)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn water() -> FluidRef {
        FluidRef::parse("Water").unwrap()
    }

    fn state(fluid: &FluidRef, a: (Parameter, f64), b: (Parameter, f64)) -> Result<ThermoState> {
        BuiltinEngine::new().state(fluid, Input::new(a.0, a.1), Input::new(b.0, b.1))
    }

    #[test]
    fn latent_heat_of_water_is_plausible() {
        let liq = state(&water(), (Parameter::Pressure, 101_325.0), (Parameter::Quality, 0.0)).unwrap();
        let vap = state(&water(), (Parameter::Pressure, 101_325.0), (Parameter::Quality, 1.0)).unwrap();
        let h_fg = (vap.value(Parameter::Hmass).unwrap() - liq.value(Parameter::Hmass).unwrap()) / 1e3;
        assert!((h_fg - 2257.0).abs() < 100.0, "h_fg = {h_fg} kJ/kg");
    }

    #[test]
    fn input_order_does_not_matter() {
        let a = state(&water(), (Parameter::Temperature, 350.0), (Parameter::Pressure, 1e5)).unwrap();
        let b = state(&water(), (Parameter::Pressure, 1e5), (Parameter::Temperature, 350.0)).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.phase, Phase::Liquid);
    }

    #[test]
    fn ph_flash_inverts_tp_in_every_region() {
        for (t, p) in [(300.0, 1e5), (450.0, 1e5), (700.0, 30e6)] {
            let tp = state(&water(), (Parameter::Temperature, t), (Parameter::Pressure, p)).unwrap();
            let ph = state(&water(), (Parameter::Pressure, p), (Parameter::Hmolar, tp.enthalpy)).unwrap();
            assert_relative_eq!(ph.temperature, t, max_relative = 1e-6);
        }
    }

    #[test]
    fn ps_flash_inverts_tp_for_gas() {
        let tp = state(&water(), (Parameter::Temperature, 500.0), (Parameter::Pressure, 1e5)).unwrap();
        let ps = state(&water(), (Parameter::Pressure, 1e5), (Parameter::Smolar, tp.entropy)).unwrap();
        assert_relative_eq!(ps.temperature, 500.0, max_relative = 1e-9);
    }

    #[test]
    fn du_flash_inverts_tp_for_gas() {
        let n2 = FluidRef::parse("Nitrogen").unwrap();
        let tp = state(&n2, (Parameter::Pressure, 5e5), (Parameter::Temperature, 300.0)).unwrap();
        let du = state(
            &n2,
            (Parameter::Dmolar, tp.molar_density),
            (Parameter::Umolar, tp.internal_energy),
        )
        .unwrap();
        assert_relative_eq!(du.temperature, 300.0, max_relative = 1e-9);
        assert_relative_eq!(du.pressure, 5e5, max_relative = 1e-9);
        assert_eq!(du.phase, tp.phase);
    }

    #[test]
    fn du_flash_finds_the_two_phase_state() {
        let sat = state(&water(), (Parameter::Temperature, 373.0), (Parameter::Quality, 0.3)).unwrap();
        let du = state(
            &water(),
            (Parameter::Umolar, sat.internal_energy),
            (Parameter::Dmolar, sat.molar_density),
        )
        .unwrap();
        assert_eq!(du.phase, Phase::TwoPhase);
        assert_relative_eq!(du.temperature, 373.0, max_relative = 1e-6);
        assert_relative_eq!(du.quality, 0.3, max_relative = 1e-4);
    }

    #[test]
    fn two_phase_density_splits_by_quality() {
        let sat = state(&water(), (Parameter::Temperature, 373.0), (Parameter::Quality, 0.5)).unwrap();
        let back = state(&water(), (Parameter::Temperature, 373.0), (Parameter::Dmolar, sat.molar_density)).unwrap();
        assert_relative_eq!(back.quality, 0.5, max_relative = 1e-9);
        assert!(sat.cp.is_none());
    }

    #[test]
    fn air_is_an_ideal_gas_mixture() {
        let air = FluidRef::parse("Air").unwrap();
        let s = state(&air, (Parameter::Temperature, 300.0), (Parameter::Pressure, 101_325.0)).unwrap();
        let d = s.value(Parameter::Dmass).unwrap();
        assert!((d - 1.1764).abs() < 1e-3, "rho = {d}");
        assert!(state(&air, (Parameter::Temperature, 80.0), (Parameter::Quality, 0.0)).is_err());
    }

    #[test]
    fn mixture_constants() {
        let air = FluidRef::parse("Air").unwrap();
        let engine = BuiltinEngine::new();
        let m = engine.constant(&air, Parameter::MolarMass).unwrap();
        assert!((m - 0.028_958).abs() < 1e-5);
        assert!(engine.constant(&air, Parameter::Tcrit).is_err());
    }

    #[test]
    fn unsupported_pairs_and_unknown_fluids() {
        let err = state(&water(), (Parameter::Hmass, 1e5), (Parameter::Smass, 1e3)).unwrap_err();
        assert!(matches!(err, FacadeError::UnsupportedInputPair(..)));
        let err = state(&FluidRef::parse("Kryptonite").unwrap(), (Parameter::Temperature, 300.0), (Parameter::Pressure, 1e5)).unwrap_err();
        assert_eq!(err, FacadeError::UnknownFluid("Kryptonite".into()));
        assert!(state(&water(), (Parameter::Tcrit, 1.0), (Parameter::Pressure, 1e5)).is_err());
    }
}
