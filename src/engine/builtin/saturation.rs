//! Saturation curves and saturated-liquid volume.

use super::catalog::{SaturationCurve, Species};
use crate::error::{FacadeError, Result};
use crate::properties::GAS_CONSTANT;

// IAPWS-IF97 region 4 coefficients n1..n10.
const N: [f64; 10] = [
    0.116_705_214_527_67e4,
    -0.724_213_167_032_06e6,
    -0.170_738_469_400_92e2,
    0.120_208_247_024_70e5,
    -0.323_255_503_223_33e7,
    0.149_151_086_135_30e2,
    -0.482_326_573_615_91e4,
    0.405_113_405_420_57e6,
    -0.238_555_575_678_49,
    0.650_175_348_447_98e3,
];

fn if97_p_sat(t: f64) -> f64 {
    let theta = t + N[8] / (t - N[9]);
    let a = theta * theta + N[0] * theta + N[1];
    let b = N[2] * theta * theta + N[3] * theta + N[4];
    let c = N[5] * theta * theta + N[6] * theta + N[7];
    let mpa = (2.0 * c / (-b + (b * b - 4.0 * a * c).sqrt())).powi(4);
    mpa * 1.0e6
}

fn if97_t_sat(p: f64) -> f64 {
    let beta = (p / 1.0e6).powf(0.25);
    let e = beta * beta + N[2] * beta + N[5];
    let f = N[0] * beta * beta + N[3] * beta + N[6];
    let g = N[1] * beta * beta + N[4] * beta + N[7];
    let d = 2.0 * g / (-f - (f * f - 4.0 * e * g).sqrt());
    (N[9] + d - ((N[9] + d).powi(2) - 4.0 * (N[8] + N[9] * d)).sqrt()) / 2.0
}

fn lee_kesler_p_sat(s: &Species, t: f64) -> f64 {
    let tr = t / s.constants.t_crit;
    let ln_tr = tr.ln();
    let tr6 = tr.powi(6);
    let f0 = 5.927_14 - 6.096_48 / tr - 1.288_62 * ln_tr + 0.169_347 * tr6;
    let f1 = 15.2518 - 15.6875 / tr - 13.4721 * ln_tr + 0.435_77 * tr6;
    s.constants.p_crit * (f0 + s.constants.acentric * f1).exp()
}

/// Find the root of a monotonic function on `[lo, hi]` by bisection.
pub(crate) fn bisect(
    mut lo: f64,
    mut hi: f64,
    what: &'static str,
    f: impl Fn(f64) -> Result<f64>,
) -> Result<f64> {
    const MAX_ITER: usize = 200;
    let f_lo = f(lo)?;
    let f_hi = f(hi)?;
    if f_lo == 0.0 {
        return Ok(lo);
    }
    if f_hi == 0.0 {
        return Ok(hi);
    }
    if !f_lo.is_finite() || !f_hi.is_finite() || f_lo.signum() == f_hi.signum() {
        return Err(FacadeError::OutOfRange(format!("{what}: target not bracketed")));
    }
    let rising = f_hi > 0.0;
    for _ in 0..MAX_ITER {
        let mid = 0.5 * (lo + hi);
        let f_mid = f(mid)?;
        if (f_mid > 0.0) == rising {
            hi = mid;
        } else {
            lo = mid;
        }
        if hi - lo <= 1e-10 * hi.abs().max(1.0) {
            return Ok(0.5 * (lo + hi));
        }
    }
    Err(FacadeError::ConvergenceFailed(what))
}

impl Species {
    fn check_saturation_temperature(&self, t: f64) -> Result<()> {
        let c = &self.constants;
        if !(c.t_triple..=c.t_crit).contains(&t) {
            return Err(FacadeError::OutOfRange(format!(
                "saturation temperature {t} K of {} outside [{}, {}] K",
                self.name, c.t_triple, c.t_crit
            )));
        }
        Ok(())
    }

    /// Vapour pressure (Pa).
    pub fn p_sat(&self, t: f64) -> Result<f64> {
        self.check_saturation_temperature(t)?;
        Ok(match self.curve {
            SaturationCurve::Iapws97 => if97_p_sat(t),
            SaturationCurve::LeeKesler => lee_kesler_p_sat(self, t),
        })
    }

    /// Saturation pressure range covered by the curve.
    pub fn p_sat_range(&self) -> Result<(f64, f64)> {
        Ok((
            self.p_sat(self.constants.t_triple)?,
            self.p_sat(self.constants.t_crit)?,
        ))
    }

    /// Saturation temperature (K).
    pub fn t_sat(&self, p: f64) -> Result<f64> {
        let (p_min, p_max) = self.p_sat_range()?;
        if !(p_min..=p_max).contains(&p) {
            return Err(FacadeError::OutOfRange(format!(
                "saturation pressure {p} Pa of {} outside [{p_min:.6e}, {p_max:.6e}] Pa",
                self.name
            )));
        }
        match self.curve {
            SaturationCurve::Iapws97 => Ok(if97_t_sat(p)),
            SaturationCurve::LeeKesler => {
                let target = p.ln();
                bisect(
                    self.constants.t_triple,
                    self.constants.t_crit,
                    "saturation temperature",
                    |t| Ok(self.p_sat(t)?.ln() - target),
                )
            }
        }
    }

    /// Slope of the vapour-pressure curve (Pa/K), central difference
    /// falling back to one-sided at the ends of the curve.
    pub fn dp_sat_dt(&self, t: f64) -> Result<f64> {
        const STEP: f64 = 1e-3;
        let c = &self.constants;
        let lo = (t - STEP).max(c.t_triple);
        let hi = (t + STEP).min(c.t_crit);
        Ok((self.p_sat(hi)? - self.p_sat(lo)?) / (hi - lo))
    }

    /// Saturated-liquid molar volume from the Rackett equation (m³/mol).
    pub fn v_liquid(&self, t: f64) -> f64 {
        let c = &self.constants;
        let tr = (t / c.t_crit).min(1.0);
        GAS_CONSTANT * c.t_crit / c.p_crit * self.rackett_z.powf(1.0 + (1.0 - tr).powf(2.0 / 7.0))
    }
}

#[cfg(test)]
mod tests {
    use super::super::catalog::species;
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn if97_matches_verification_table() {
        // IAPWS-IF97 table 35 and 36.
        assert_relative_eq!(if97_p_sat(300.0), 0.353_658_941e4, max_relative = 1e-8);
        assert_relative_eq!(if97_p_sat(500.0), 0.263_889_776e7, max_relative = 1e-8);
        assert_relative_eq!(if97_t_sat(0.1e6), 0.372_755_919e3, max_relative = 1e-8);
        assert_relative_eq!(if97_t_sat(10.0e6), 0.584_149_488e3, max_relative = 1e-8);
    }

    #[test]
    fn water_boils_near_100_c_at_one_atmosphere() {
        let water = species("Water").unwrap();
        let t = water.t_sat(101_325.0).unwrap();
        assert!((t - 373.124).abs() < 1e-3, "got {t}");
    }

    #[test]
    fn lee_kesler_reaches_the_critical_point() {
        let n2 = species("Nitrogen").unwrap();
        let pc = n2.p_sat(n2.constants.t_crit).unwrap();
        assert_relative_eq!(pc, n2.constants.p_crit, max_relative = 1e-3);
    }

    #[test]
    fn nitrogen_normal_boiling_point() {
        let n2 = species("Nitrogen").unwrap();
        let t = n2.t_sat(101_325.0).unwrap();
        assert!((t - 77.36).abs() < 0.5, "got {t}");
        assert_relative_eq!(n2.p_sat(t).unwrap(), 101_325.0, max_relative = 1e-8);
    }

    #[test]
    fn outside_the_dome_is_rejected() {
        let water = species("Water").unwrap();
        assert!(water.p_sat(700.0).is_err());
        assert!(water.t_sat(30.0e6).is_err());
        assert!(water.p_sat(200.0).is_err());
    }

    #[test]
    fn rackett_liquid_is_denser_than_critical() {
        let water = species("Water").unwrap();
        let rho_l = 1.0 / water.v_liquid(300.0);
        assert!(rho_l > water.constants.rhomolar_crit);
    }
}
