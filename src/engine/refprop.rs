use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use converter::{Basis, Converter, Quantity};
use tracing::{debug, info, warn};

use super::PropertyEngine;
use crate::error::{FacadeError, Result};
use crate::fluid_ref::FluidRef;
use crate::parameter::{Input, InputKind, Parameter};
use crate::properties::{GAS_CONSTANT, Phase, ThermoState};
use crate::sys::{
    Composition, Flash, FlashPair, REFPROP_NC_MAX, RefpropLibrary, SaturationPoint, Status,
};

/// REFPROP keeps the active fluid in process-wide Fortran state, and every
/// engine loading the same library shares it. One lock, and one record of
/// what that state holds, serve all engines in the process.
static ACTIVE: Mutex<Option<Loaded>> = Mutex::new(None);

/// The fluid REFPROP currently has loaded.
struct Loaded {
    /// Installation the setup ran against.
    root: PathBuf,
    /// Canonical form of the reference that produced this setup.
    key: String,
    nc: usize,
    z: Composition,
    /// Mixture-averaged molar mass, g/mol.
    wmm: f64,
}

impl Loaded {
    fn converter(&self) -> Converter {
        Converter::from_g_per_mol(self.wmm)
    }
}

/// NIST REFPROP, loaded from an installation directory at runtime.
///
/// Every call takes the process-wide REFPROP lock and re-runs setup only
/// when the requested fluid (or installation) differs from the one loaded.
pub struct RefpropEngine {
    lib: RefpropLibrary,
    root: PathBuf,
}

impl RefpropEngine {
    /// Open the REFPROP installation at `root` (the directory holding the
    /// shared library and its `fluids/` and `mixtures/` folders).
    pub fn load(root: &Path) -> Result<Self> {
        if !root.exists() {
            return Err(FacadeError::LibraryNotFound(format!(
                "REFPROP directory {} does not exist",
                root.display()
            )));
        }
        let lib = RefpropLibrary::load_from_dir(root)?;
        info!(path = %root.display(), "REFPROP library loaded");
        Ok(Self { lib, root: root.to_path_buf() })
    }

    fn lock() -> Result<MutexGuard<'static, Option<Loaded>>> {
        ACTIVE.lock().map_err(|_| {
            FacadeError::Engine {
                backend: "REFPROP",
                code: -1,
                message: "engine lock is poisoned (a previous call panicked)".into(),
            }
        })
    }

    /// Map a REFPROP status to a result; warnings are logged and pass.
    fn check(status: Status) -> Result<()> {
        if status.code > 0 {
            return Err(FacadeError::Engine {
                backend: "REFPROP",
                code: status.code,
                message: status.message,
            });
        }
        if status.code < 0 {
            warn!(code = status.code, detail = %status.message, "REFPROP warning");
        }
        Ok(())
    }

    fn fluid_file(&self, upper: &str) -> Option<PathBuf> {
        let fld = format!("{upper}.FLD");
        ["fluids", "FLUIDS"]
            .iter()
            .map(|dir| self.root.join(dir).join(&fld))
            .find(|p| p.exists())
    }

    fn mix_file(&self, upper: &str) -> Option<PathBuf> {
        let mix = format!("{upper}.MIX");
        ["mixtures", "MIXTURES"]
            .iter()
            .map(|dir| self.root.join(dir).join(&mix))
            .find(|p| p.exists())
    }

    fn set_path(&self) {
        self.lib.set_path(&self.root.to_string_lossy());
    }

    /// Load `fluid` into REFPROP unless it is already the active fluid.
    fn ensure_setup<'a>(
        &self,
        current: &'a mut Option<Loaded>,
        fluid: &FluidRef,
    ) -> Result<&'a Loaded> {
        let key = FluidRef { backend: None, components: fluid.components.clone() }.to_string();
        ensure_loaded(current, &self.root, key, |key| self.setup(fluid, key))
    }

    fn setup(&self, fluid: &FluidRef, key: String) -> Result<Loaded> {
        if fluid.components.len() > REFPROP_NC_MAX {
            return Err(FacadeError::InvalidComposition(format!(
                "REFPROP supports at most {REFPROP_NC_MAX} components, got {}",
                fluid.components.len()
            )));
        }
        self.set_path();

        let mut z: Composition = [0.0; REFPROP_NC_MAX];
        let nc = if fluid.is_pure() {
            let name = &fluid.components[0].name;
            let upper = name.trim().to_uppercase();
            if let Some(mix) = self.mix_file(&upper) {
                let (nc, hfld, mix_z, status) = self.lib.set_mix(&mix.to_string_lossy());
                Self::check(status)?;
                z = mix_z;
                // SETMIX loads the mixture itself; SETUP again keeps the
                // path identical to the pure and custom-mixture cases.
                Self::check(self.lib.setup(nc, &hfld))?;
                nc
            } else if self.fluid_file(&upper).is_some() {
                z[0] = 1.0;
                Self::check(self.lib.setup(1, &format!("{upper}.FLD")))?;
                1
            } else {
                return Err(FacadeError::UnknownFluid(name.clone()));
            }
        } else {
            let mut files = Vec::with_capacity(fluid.components.len());
            for (i, c) in fluid.components.iter().enumerate() {
                let upper = c.name.trim().to_uppercase();
                if self.fluid_file(&upper).is_none() {
                    return Err(FacadeError::UnknownFluid(c.name.clone()));
                }
                files.push(format!("{upper}.FLD"));
                z[i] = c.fraction;
            }
            Self::check(self.lib.setup(files.len(), &files.join("|")))?;
            files.len()
        };

        let wmm: f64 = (0..nc).map(|i| z[i] * self.lib.info(i + 1).wmm).sum();
        debug!(fluid = %key, nc, wmm, "REFPROP setup");
        Ok(Loaded { root: self.root.clone(), key, nc, z, wmm })
    }

    // ── Flashes (caller holds the lock, fluid loaded) ───────────────

    fn flash(&self, loaded: &Loaded, pair: FlashPair, a: f64, b: f64) -> Result<ThermoState> {
        let (flash, status) = self.lib.flash(pair, a, b, &loaded.z);
        Self::check(status)?;
        self.state_from_flash(loaded, &flash)
    }

    fn state_from_flash(&self, loaded: &Loaded, f: &Flash) -> Result<ThermoState> {
        let quality = if (0.0..=1.0).contains(&f.q) { f.q } else { -1.0 };
        let two_phase = quality > 0.0 && quality < 1.0;
        let (eta, tcx) = if two_phase {
            (None, None)
        } else {
            let ((eta, tcx), status) = self.lib.transport(f.t, f.d, &loaded.z);
            match Self::check(status) {
                Ok(()) => (Some(eta), Some(tcx)),
                Err(e) => {
                    debug!(error = %e, "REFPROP transport unavailable");
                    (None, None)
                }
            }
        };
        let phase = if two_phase {
            Phase::TwoPhase
        } else if f.q <= 0.0 {
            Phase::Liquid
        } else {
            self.single_phase_above_dome(loaded, f.t)?
        };
        Ok(self.to_state(loaded, f, quality, phase, eta, tcx, !two_phase))
    }

    /// Vapour versus supercritical for a state at or above the dew line.
    fn single_phase_above_dome(&self, loaded: &Loaded, t: f64) -> Result<Phase> {
        let ((tc, _, _), status) = self.lib.critical_point(&loaded.z);
        Self::check(status)?;
        Ok(if t >= tc { Phase::Supercritical } else { Phase::Gas })
    }

    #[allow(clippy::too_many_arguments)]
    fn to_state(
        &self,
        loaded: &Loaded,
        f: &Flash,
        quality: f64,
        phase: Phase,
        eta: Option<f64>,
        tcx: Option<f64>,
        heat_capacities: bool,
    ) -> ThermoState {
        let conv = loaded.converter();
        let si = |q: Quantity, v: f64| conv.si_from_refprop(q, v);
        ThermoState {
            temperature: f.t,
            pressure: si(Quantity::Pressure, f.p),
            molar_density: si(Quantity::Density, f.d),
            molar_mass: conv.molar_mass,
            enthalpy: f.h,
            entropy: f.s,
            internal_energy: f.e,
            cp: heat_capacities.then_some(f.cp),
            cv: heat_capacities.then_some(f.cv),
            sound_speed: heat_capacities.then_some(f.w),
            viscosity: eta.map(|v| si(Quantity::Viscosity, v)),
            conductivity: tcx,
            quality,
            phase,
        }
    }

    /// Saturation followed by lever-rule interpolation between the
    /// saturated liquid and vapour.
    ///
    /// Zeotropic mixtures use the bubble curve below q = 0.5 and the dew
    /// curve above. The saturation pressure is kept as returned, since
    /// THERMdll may recompute a slightly different one for mixtures.
    fn flash_quality(
        &self,
        loaded: &Loaded,
        by_pressure: bool,
        value: f64,
        q: f64,
    ) -> Result<ThermoState> {
        if !(0.0..=1.0).contains(&q) {
            return Err(FacadeError::OutOfRange(format!("quality {q} outside [0, 1]")));
        }
        let kph = if q >= 0.5 { 2 } else { 1 };
        let (sat, status) = self.lib.saturation(by_pressure, value, &loaded.z, kph);
        Self::check(status)?;
        self.interpolate_quality(loaded, &sat, q)
    }

    fn interpolate_quality(
        &self,
        loaded: &Loaded,
        sat: &SaturationPoint,
        q: f64,
    ) -> Result<ThermoState> {
        let at = |d: f64| {
            let th = self.lib.therm(sat.t, d, &loaded.z);
            Flash {
                t: sat.t,
                p: sat.p,
                d,
                q,
                e: th.e,
                h: th.h,
                s: th.s,
                cv: th.cv,
                cp: th.cp,
                w: th.w,
                ..Flash::default()
            }
        };
        if q == 0.0 || q == 1.0 {
            let f = at(if q == 0.0 { sat.dl } else { sat.dv });
            let ((eta, tcx), status) = self.lib.transport(f.t, f.d, &loaded.z);
            let (eta, tcx) = match Self::check(status) {
                Ok(()) => (Some(eta), Some(tcx)),
                Err(_) => (None, None),
            };
            let phase = if q == 0.0 { Phase::Liquid } else { Phase::Gas };
            return Ok(self.to_state(loaded, &f, q, phase, eta, tcx, true));
        }
        let liq = at(sat.dl);
        let vap = at(sat.dv);
        let lerp = |a: f64, b: f64| a * (1.0 - q) + b * q;
        let mixed = Flash {
            t: sat.t,
            p: sat.p,
            d: 1.0 / ((1.0 - q) / sat.dl + q / sat.dv),
            q,
            e: lerp(liq.e, vap.e),
            h: lerp(liq.h, vap.h),
            s: lerp(liq.s, vap.s),
            ..Flash::default()
        };
        Ok(self.to_state(loaded, &mixed, q, Phase::TwoPhase, None, None, false))
    }
}

/// Reuse the record in `current` when it matches `root` and `key`,
/// otherwise run `setup`.
fn ensure_loaded<'a>(
    current: &'a mut Option<Loaded>,
    root: &Path,
    key: String,
    setup: impl FnOnce(String) -> Result<Loaded>,
) -> Result<&'a Loaded> {
    // Taken first: a failed setup leaves REFPROP in an unknown state.
    let loaded = match current.take() {
        Some(l) if l.key == key && l.root == root => l,
        _ => setup(key)?,
    };
    Ok(current.insert(loaded))
}

impl PropertyEngine for RefpropEngine {
    fn name(&self) -> &'static str {
        "REFPROP"
    }

    fn constant(&self, fluid: &FluidRef, param: Parameter) -> Result<f64> {
        let mut current = Self::lock()?;
        let loaded = self.ensure_setup(&mut current, fluid)?;
        let conv = loaded.converter();
        match param {
            Parameter::MolarMass => return Ok(conv.molar_mass),
            Parameter::GasConstant => return Ok(GAS_CONSTANT),
            _ => {}
        }
        if let Parameter::Tcrit | Parameter::Pcrit | Parameter::RhomolarCrit | Parameter::RhomassCrit =
            param
        {
            let ((tc, pc, dc), status) = self.lib.critical_point(&loaded.z);
            Self::check(status)?;
            let dc = conv.si_from_refprop(Quantity::Density, dc);
            return Ok(match param {
                Parameter::Tcrit => tc,
                Parameter::Pcrit => conv.si_from_refprop(Quantity::Pressure, pc),
                Parameter::RhomolarCrit => dc,
                _ => conv.to_mass(Quantity::Density, dc),
            });
        }
        if loaded.nc != 1 {
            return Err(FacadeError::NotSupported(format!("{param} for mixtures")));
        }
        let info = self.lib.info(1);
        match param {
            Parameter::Ttriple => Ok(info.ttrp),
            Parameter::Acentric => Ok(info.acf),
            other => Err(FacadeError::MisusedParameter {
                name: other.name().to_string(),
                role: "a fluid constant",
            }),
        }
    }

    fn state(&self, fluid: &FluidRef, first: Input, second: Input) -> Result<ThermoState> {
        for input in [first, second] {
            if !input.value.is_finite() {
                return Err(FacadeError::OutOfRange(format!(
                    "{} must be finite, got {}",
                    input.param, input.value
                )));
            }
        }
        let kind = |input: Input| {
            input.param.input_kind().ok_or_else(|| FacadeError::MisusedParameter {
                name: input.param.name().to_string(),
                role: "a state input",
            })
        };
        let (ka, kb) = (kind(first)?, kind(second)?);

        let mut current = Self::lock()?;
        let loaded = self.ensure_setup(&mut current, fluid)?;
        let conv = loaded.converter();
        // SI on any basis -> REFPROP native molar.
        let native = |input: Input, q: Quantity, basis: Basis| {
            conv.refprop_from_si(q, conv.molar_from(q, basis, input.value))
        };
        let kpa = |input: Input| native(input, Quantity::Pressure, Basis::Molar);

        use InputKind::*;
        let (a, b) = (first, second);
        match (ka, kb) {
            (T, P) => self.flash(loaded, FlashPair::Tp, a.value, kpa(b)),
            (P, T) => self.flash(loaded, FlashPair::Tp, b.value, kpa(a)),
            (T, D(basis)) => {
                self.flash(loaded, FlashPair::Td, a.value, native(b, Quantity::Density, basis))
            }
            (D(basis), T) => {
                self.flash(loaded, FlashPair::Td, b.value, native(a, Quantity::Density, basis))
            }
            (P, H(basis)) => {
                self.flash(loaded, FlashPair::Ph, kpa(a), native(b, Quantity::Energy, basis))
            }
            (H(basis), P) => {
                self.flash(loaded, FlashPair::Ph, kpa(b), native(a, Quantity::Energy, basis))
            }
            (P, S(basis)) => {
                self.flash(loaded, FlashPair::Ps, kpa(a), native(b, Quantity::Entropy, basis))
            }
            (S(basis), P) => {
                self.flash(loaded, FlashPair::Ps, kpa(b), native(a, Quantity::Entropy, basis))
            }
            (D(bd), U(bu)) => self.flash(
                loaded,
                FlashPair::De,
                native(a, Quantity::Density, bd),
                native(b, Quantity::Energy, bu),
            ),
            (U(bu), D(bd)) => self.flash(
                loaded,
                FlashPair::De,
                native(b, Quantity::Density, bd),
                native(a, Quantity::Energy, bu),
            ),
            (T, Q) => self.flash_quality(loaded, false, a.value, b.value),
            (Q, T) => self.flash_quality(loaded, false, b.value, a.value),
            (P, Q) => self.flash_quality(loaded, true, kpa(a), b.value),
            (Q, P) => self.flash_quality(loaded, true, kpa(b), a.value),
            _ => Err(FacadeError::UnsupportedInputPair(
                a.param.name().to_string(),
                b.param.name().to_string(),
            )),
        }
    }

    fn fluid_names(&self) -> Vec<String> {
        let mut names: Vec<String> = ["fluids", "FLUIDS"]
            .iter()
            .filter_map(|dir| std::fs::read_dir(self.root.join(dir)).ok())
            .flatten()
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| {
                let path = entry.path();
                let ext = path.extension()?.to_str()?;
                if !ext.eq_ignore_ascii_case("FLD") {
                    return None;
                }
                Some(path.file_stem()?.to_str()?.to_string())
            })
            .collect();
        names.sort();
        names.dedup();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // These need a REFPROP installation; point REFPROP_PATH at it and run
    // with `--ignored`.
    fn engine() -> RefpropEngine {
        let path = std::env::var("REFPROP_PATH").expect("REFPROP_PATH not set");
        RefpropEngine::load(Path::new(&path)).expect("REFPROP failed to load")
    }

    #[test]
    fn missing_directory_is_a_configuration_error() {
        let err = RefpropEngine::load(Path::new("/nonexistent/refprop")).err().unwrap();
        assert_eq!(err.kind(), crate::error::ErrorKind::Configuration);
    }

    fn record(root: &Path, key: String) -> Loaded {
        Loaded { root: root.to_path_buf(), key, nc: 1, z: [0.0; REFPROP_NC_MAX], wmm: 18.015 }
    }

    #[test]
    fn engines_share_one_loaded_fluid_record() {
        let root = Path::new("/opt/refprop");
        let setups = std::cell::Cell::new(0);
        let run = |current: &mut Option<Loaded>, root: &Path, key: &str| {
            ensure_loaded(current, root, key.to_string(), |k| {
                setups.set(setups.get() + 1);
                Ok(record(root, k))
            })
            .map(|l| l.key.clone())
        };

        let mut current = RefpropEngine::lock().unwrap();
        *current = None;
        // One engine loads Water, another then loads Nitrogen through the
        // same record; Water must be set up again afterwards.
        assert_eq!(run(&mut *current, root, "Water").unwrap(), "Water");
        assert_eq!(run(&mut *current, root, "Nitrogen").unwrap(), "Nitrogen");
        assert_eq!(run(&mut *current, root, "Water").unwrap(), "Water");
        assert_eq!(run(&mut *current, root, "Water").unwrap(), "Water");
        assert_eq!(setups.get(), 3);

        // A different installation never reuses the record.
        run(&mut *current, Path::new("/usr/local/lib/refprop"), "Water").unwrap();
        assert_eq!(setups.get(), 4);
        *current = None;
    }

    #[test]
    fn failed_setup_forgets_the_previous_fluid() {
        let root = Path::new("/opt/refprop");
        let mut current = RefpropEngine::lock().unwrap();
        *current = Some(record(root, "Water".into()));
        let err = ensure_loaded(&mut current, root, "Nope".into(), |k| {
            Err(FacadeError::UnknownFluid(k))
        })
        .err()
        .unwrap();
        assert_eq!(err, FacadeError::UnknownFluid("Nope".into()));
        assert!(current.is_none());
    }

    #[test]
    #[ignore]
    fn water_critical_temperature() {
        let water = FluidRef::parse("Water").unwrap();
        let tc = engine().constant(&water, Parameter::Tcrit).unwrap();
        assert!((tc - 647.096).abs() < 0.01);
    }

    #[test]
    #[ignore]
    fn switching_fluids_reloads_setup() {
        let e = engine();
        let water = FluidRef::parse("Water").unwrap();
        let n2 = FluidRef::parse("Nitrogen").unwrap();
        let a = e.constant(&water, Parameter::MolarMass).unwrap();
        let b = e.constant(&n2, Parameter::MolarMass).unwrap();
        let c = e.constant(&water, Parameter::MolarMass).unwrap();
        assert_eq!(a, c);
        assert!((b - 0.028_013_4).abs() < 1e-6);
    }
}
