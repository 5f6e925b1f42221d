//! Runtime-loaded NIST REFPROP entry points.
//!
//! The shared library is opened with [`libloading`] and every symbol the
//! REFPROP engine needs is resolved once, up front. The wrappers below own
//! all output buffers, so callers only deal in plain values and a
//! [`Status`]. Values are in REFPROP's native molar units (see the
//! `converter` crate).
//!
//! Nothing here is thread-safe: REFPROP keeps the loaded fluid in global
//! Fortran state. Callers must serialise access.

use std::ffi::{c_char, c_double, c_int, c_long};
use std::path::Path;

use libloading::Library;

use crate::error::{FacadeError, Result};

pub const REFPROP_STRLEN: usize = 255;
pub const REFPROP_FILESTR: usize = 10000;
pub const REFPROP_NC_MAX: usize = 20;

/// Mole fractions in the fixed-size layout REFPROP expects.
pub type Composition = [f64; REFPROP_NC_MAX];

// ── Function pointer types ──────────────────────────────────────────

type FnSetpath = unsafe extern "C" fn(*const c_char, c_long);

/// SETUPdll(nc, hfld, hfmix, hrf, ierr, herr, lengths…)
type FnSetup = unsafe extern "C" fn(
    *const c_int,
    *const c_char,
    *const c_char,
    *const c_char,
    *mut c_int,
    *mut c_char,
    c_long,
    c_long,
    c_long,
    c_long,
);

/// SETMIXdll(hmxnme, hfmix, hrf, nc, hfld, z, ierr, herr, lengths…)
type FnSetmix = unsafe extern "C" fn(
    *const c_char,
    *const c_char,
    *const c_char,
    *mut c_int,
    *mut c_char,
    *mut c_double,
    *mut c_int,
    *mut c_char,
    c_long,
    c_long,
    c_long,
    c_long,
    c_long,
);

/// TPFLSHdll, TDFLSHdll, PHFLSHdll, PSFLSHdll and DEFLSHdll: two inputs, the
/// composition, twelve outputs (two of them composition arrays), error.
type FnFlash = unsafe extern "C" fn(
    *const c_double,
    *const c_double,
    *const c_double,
    *mut c_double,
    *mut c_double,
    *mut c_double,
    *mut c_double,
    *mut c_double,
    *mut c_double,
    *mut c_double,
    *mut c_double,
    *mut c_double,
    *mut c_double,
    *mut c_double,
    *mut c_double,
    *mut c_int,
    *mut c_char,
    c_long,
);

/// SATTdll / SATPdll(in, z, kph, out, dl, dv, x, y, ierr, herr, len)
type FnSat = unsafe extern "C" fn(
    *const c_double,
    *const c_double,
    *const c_int,
    *mut c_double,
    *mut c_double,
    *mut c_double,
    *mut c_double,
    *mut c_double,
    *mut c_int,
    *mut c_char,
    c_long,
);

/// CRITPdll(z, tc, pc, dc, ierr, herr, len)
type FnCritp = unsafe extern "C" fn(
    *const c_double,
    *mut c_double,
    *mut c_double,
    *mut c_double,
    *mut c_int,
    *mut c_char,
    c_long,
);

/// TRNPRPdll(t, d, z, eta, tcx, ierr, herr, len)
type FnTrnprp = unsafe extern "C" fn(
    *const c_double,
    *const c_double,
    *const c_double,
    *mut c_double,
    *mut c_double,
    *mut c_int,
    *mut c_char,
    c_long,
);

/// THERMdll(t, d, z, p, e, h, s, cv, cp, w, hjt)
type FnTherm = unsafe extern "C" fn(
    *const c_double,
    *const c_double,
    *const c_double,
    *mut c_double,
    *mut c_double,
    *mut c_double,
    *mut c_double,
    *mut c_double,
    *mut c_double,
    *mut c_double,
    *mut c_double,
);

/// INFOdll(icomp, wmm, ttrp, tnbpt, tc, pc, dc, zc, acf, dip, rgas)
type FnInfo = unsafe extern "C" fn(
    *const c_int,
    *mut c_double,
    *mut c_double,
    *mut c_double,
    *mut c_double,
    *mut c_double,
    *mut c_double,
    *mut c_double,
    *mut c_double,
    *mut c_double,
    *mut c_double,
);

// ── Plain results ───────────────────────────────────────────────────

/// REFPROP's `ierr`/`herr` pair. Positive codes are errors, negative codes
/// are warnings attached to a usable result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Status {
    pub code: i32,
    pub message: String,
}

impl Status {
    fn new(code: c_int, herr: &[c_char]) -> Self {
        let message = if code == 0 { String::new() } else { from_c_string(herr) };
        Self { code, message }
    }
}

/// Input pair of the flash routines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlashPair {
    Tp,
    Td,
    Ph,
    Ps,
    De,
}

impl FlashPair {
    fn symbol(self) -> &'static [u8] {
        match self {
            Self::Tp => b"TPFLSHdll\0",
            Self::Td => b"TDFLSHdll\0",
            Self::Ph => b"PHFLSHdll\0",
            Self::Ps => b"PSFLSHdll\0",
            Self::De => b"DEFLSHdll\0",
        }
    }
}

/// Flash output, native units. Inputs are echoed into their fields.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Flash {
    pub t: f64,
    pub p: f64,
    pub d: f64,
    pub dl: f64,
    pub dv: f64,
    pub q: f64,
    pub e: f64,
    pub h: f64,
    pub s: f64,
    pub cv: f64,
    pub cp: f64,
    pub w: f64,
}

/// Bubble (`kph = 1`) or dew (`kph = 2`) point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SaturationPoint {
    pub t: f64,
    pub p: f64,
    pub dl: f64,
    pub dv: f64,
}

/// THERMdll output at a given (T, D).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Therm {
    pub e: f64,
    pub h: f64,
    pub s: f64,
    pub cv: f64,
    pub cp: f64,
    pub w: f64,
}

/// The INFOdll outputs the engine reads for one component.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ComponentInfo {
    /// g/mol
    pub wmm: f64,
    pub ttrp: f64,
    pub acf: f64,
}

// ── Library ─────────────────────────────────────────────────────────

/// A loaded REFPROP library with every entry point resolved.
///
/// The [`Library`] handle is kept alongside the function pointers so they
/// stay valid for the lifetime of this value.
pub struct RefpropLibrary {
    _lib: Library,
    setpath: FnSetpath,
    setup: FnSetup,
    setmix: FnSetmix,
    flash: [FnFlash; 5],
    satt: FnSat,
    satp: FnSat,
    critp: FnCritp,
    trnprp: FnTrnprp,
    therm: FnTherm,
    info: FnInfo,
}

fn resolve<T: Copy>(lib: &Library, name: &[u8]) -> Result<T> {
    // SAFETY: every alias above matches the documented REFPROP signature.
    let sym: libloading::Symbol<T> = unsafe { lib.get(name) }.map_err(|_| {
        let display = String::from_utf8_lossy(&name[..name.len().saturating_sub(1)]).to_string();
        FacadeError::LibraryNotFound(format!("symbol {display} missing from REFPROP library"))
    })?;
    Ok(*sym)
}

impl RefpropLibrary {
    fn resolve_all(lib: Library) -> Result<Self> {
        let flash = |pair: FlashPair| resolve::<FnFlash>(&lib, pair.symbol());
        Ok(Self {
            setpath: resolve(&lib, b"SETPATHdll\0")?,
            setup: resolve(&lib, b"SETUPdll\0")?,
            setmix: resolve(&lib, b"SETMIXdll\0")?,
            flash: [
                flash(FlashPair::Tp)?,
                flash(FlashPair::Td)?,
                flash(FlashPair::Ph)?,
                flash(FlashPair::Ps)?,
                flash(FlashPair::De)?,
            ],
            satt: resolve(&lib, b"SATTdll\0")?,
            satp: resolve(&lib, b"SATPdll\0")?,
            critp: resolve(&lib, b"CRITPdll\0")?,
            trnprp: resolve(&lib, b"TRNPRPdll\0")?,
            therm: resolve(&lib, b"THERMdll\0")?,
            info: resolve(&lib, b"INFOdll\0")?,
            _lib: lib,
        })
    }

    /// Open the shared library inside a REFPROP installation directory.
    ///
    /// Platform-specific file names are tried in order; on 64-bit Windows
    /// `REFPRP64.DLL` comes first. If nothing in `dir` loads, the system
    /// search path is tried with the same names.
    pub fn load_from_dir(dir: &Path) -> Result<Self> {
        let candidates: &[&str] = if cfg!(target_os = "windows") {
            if cfg!(target_pointer_width = "64") {
                &["REFPRP64.DLL", "REFPROP.DLL", "refprop.dll"]
            } else {
                &["REFPROP.DLL", "refprop.dll"]
            }
        } else if cfg!(target_os = "macos") {
            &["librefprop.dylib", "libREFPROP.dylib"]
        } else {
            &["librefprop.so", "libREFPROP.so"]
        };

        let mut errors = Vec::new();
        for name in candidates {
            let full = dir.join(name);
            if full.exists() {
                // SAFETY: loading runs the library's initialisers; REFPROP has none
                // with observable side effects.
                match unsafe { Library::new(&full) } {
                    Ok(lib) => return Self::resolve_all(lib),
                    Err(e) => errors.push(format!("{}: {e}", full.display())),
                }
            }
        }
        for name in candidates {
            if let Ok(lib) = unsafe { Library::new(*name) } {
                return Self::resolve_all(lib);
            }
        }

        Err(FacadeError::LibraryNotFound(if errors.is_empty() {
            format!("no REFPROP library in {} (tried {candidates:?})", dir.display())
        } else {
            format!("REFPROP library could not be loaded: {}", errors.join("; "))
        }))
    }

    // ── Setup ───────────────────────────────────────────────────────

    pub fn set_path(&self, path: &str) {
        let hpath = to_c_string(path, REFPROP_STRLEN);
        let len = path.len().min(REFPROP_STRLEN - 1);
        unsafe { (self.setpath)(hpath.as_ptr(), len as c_long) };
    }

    /// Load `nc` components listed in `hfld` (`"A.FLD|B.FLD"`).
    pub fn setup(&self, nc: usize, hfld: &str) -> Status {
        let nc = nc as c_int;
        let hfld = to_c_string(hfld, REFPROP_FILESTR);
        let hfmix = to_c_string("HMX.BNC", REFPROP_STRLEN);
        let hrf = to_c_string("DEF", REFPROP_STRLEN);
        let mut ierr: c_int = 0;
        let mut herr = [0 as c_char; REFPROP_STRLEN];
        unsafe {
            (self.setup)(
                &nc,
                hfld.as_ptr(),
                hfmix.as_ptr(),
                hrf.as_ptr(),
                &mut ierr,
                herr.as_mut_ptr(),
                REFPROP_FILESTR as c_long,
                REFPROP_STRLEN as c_long,
                REFPROP_STRLEN as c_long,
                REFPROP_STRLEN as c_long,
            );
        }
        Status::new(ierr, &herr)
    }

    /// Read a predefined `.MIX` file and load it.
    ///
    /// Returns the component count, the `hfld` string REFPROP built for it,
    /// and the stored composition.
    pub fn set_mix(&self, mix_file: &str) -> (usize, String, Composition, Status) {
        let hmxnme = to_c_string(mix_file, REFPROP_STRLEN);
        let hfmix = to_c_string("HMX.BNC", REFPROP_STRLEN);
        let hrf = to_c_string("DEF", REFPROP_STRLEN);
        let mut nc: c_int = 0;
        let mut hfld = vec![0 as c_char; REFPROP_FILESTR];
        let mut z: Composition = [0.0; REFPROP_NC_MAX];
        let mut ierr: c_int = 0;
        let mut herr = [0 as c_char; REFPROP_STRLEN];
        unsafe {
            (self.setmix)(
                hmxnme.as_ptr(),
                hfmix.as_ptr(),
                hrf.as_ptr(),
                &mut nc,
                hfld.as_mut_ptr(),
                z.as_mut_ptr(),
                &mut ierr,
                herr.as_mut_ptr(),
                REFPROP_STRLEN as c_long,
                REFPROP_STRLEN as c_long,
                REFPROP_STRLEN as c_long,
                REFPROP_FILESTR as c_long,
                REFPROP_STRLEN as c_long,
            );
        }
        (nc.max(0) as usize, from_c_string(&hfld), z, Status::new(ierr, &herr))
    }

    // ── Property routines ───────────────────────────────────────────

    /// Run one of the flash routines.
    ///
    /// Every output slot gets a composition-sized buffer, so the slots that
    /// hold the liquid and vapour compositions (which sit at different
    /// positions per routine) never overrun.
    pub fn flash(&self, pair: FlashPair, a: f64, b: f64, z: &Composition) -> (Flash, Status) {
        let f = self.flash[pair as usize];
        let mut out = [[0.0f64; REFPROP_NC_MAX]; 12];
        let mut ierr: c_int = 0;
        let mut herr = [0 as c_char; REFPROP_STRLEN];
        {
            let [o0, o1, o2, o3, o4, o5, o6, o7, o8, o9, o10, o11] = &mut out;
            unsafe {
                f(
                    &a,
                    &b,
                    z.as_ptr(),
                    o0.as_mut_ptr(),
                    o1.as_mut_ptr(),
                    o2.as_mut_ptr(),
                    o3.as_mut_ptr(),
                    o4.as_mut_ptr(),
                    o5.as_mut_ptr(),
                    o6.as_mut_ptr(),
                    o7.as_mut_ptr(),
                    o8.as_mut_ptr(),
                    o9.as_mut_ptr(),
                    o10.as_mut_ptr(),
                    o11.as_mut_ptr(),
                    &mut ierr,
                    herr.as_mut_ptr(),
                    REFPROP_STRLEN as c_long,
                );
            }
        }
        let v = out.map(|slot| slot[0]);
        let flash = match pair {
            // D, Dl, Dv, x, y, q, e, h, s, cv, cp, w
            FlashPair::Tp => Flash {
                t: a,
                p: b,
                d: v[0],
                dl: v[1],
                dv: v[2],
                q: v[5],
                e: v[6],
                h: v[7],
                s: v[8],
                cv: v[9],
                cp: v[10],
                w: v[11],
            },
            // P, Dl, Dv, x, y, q, e, h, s, cv, cp, w
            FlashPair::Td => Flash {
                t: a,
                d: b,
                p: v[0],
                dl: v[1],
                dv: v[2],
                q: v[5],
                e: v[6],
                h: v[7],
                s: v[8],
                cv: v[9],
                cp: v[10],
                w: v[11],
            },
            // T, D, Dl, Dv, x, y, q, e, s, cv, cp, w
            FlashPair::Ph => Flash {
                p: a,
                h: b,
                t: v[0],
                d: v[1],
                dl: v[2],
                dv: v[3],
                q: v[6],
                e: v[7],
                s: v[8],
                cv: v[9],
                cp: v[10],
                w: v[11],
            },
            // T, D, Dl, Dv, x, y, q, e, h, cv, cp, w
            FlashPair::Ps => Flash {
                p: a,
                s: b,
                t: v[0],
                d: v[1],
                dl: v[2],
                dv: v[3],
                q: v[6],
                e: v[7],
                h: v[8],
                cv: v[9],
                cp: v[10],
                w: v[11],
            },
            // T, P, Dl, Dv, x, y, q, h, s, cv, cp, w
            FlashPair::De => Flash {
                d: a,
                e: b,
                t: v[0],
                p: v[1],
                dl: v[2],
                dv: v[3],
                q: v[6],
                h: v[7],
                s: v[8],
                cv: v[9],
                cp: v[10],
                w: v[11],
            },
        };
        (flash, Status::new(ierr, &herr))
    }

    /// Saturation at temperature (`by_pressure == false`) or pressure.
    pub fn saturation(
        &self,
        by_pressure: bool,
        value: f64,
        z: &Composition,
        kph: i32,
    ) -> (SaturationPoint, Status) {
        let f = if by_pressure { self.satp } else { self.satt };
        let kph = kph as c_int;
        let (mut other, mut dl, mut dv) = (0.0, 0.0, 0.0);
        let mut x: Composition = [0.0; REFPROP_NC_MAX];
        let mut y: Composition = [0.0; REFPROP_NC_MAX];
        let mut ierr: c_int = 0;
        let mut herr = [0 as c_char; REFPROP_STRLEN];
        unsafe {
            f(
                &value,
                z.as_ptr(),
                &kph,
                &mut other,
                &mut dl,
                &mut dv,
                x.as_mut_ptr(),
                y.as_mut_ptr(),
                &mut ierr,
                herr.as_mut_ptr(),
                REFPROP_STRLEN as c_long,
            );
        }
        let (t, p) = if by_pressure { (other, value) } else { (value, other) };
        (SaturationPoint { t, p, dl, dv }, Status::new(ierr, &herr))
    }

    /// Critical temperature, pressure and density of the loaded fluid.
    pub fn critical_point(&self, z: &Composition) -> ((f64, f64, f64), Status) {
        let (mut tc, mut pc, mut dc) = (0.0, 0.0, 0.0);
        let mut ierr: c_int = 0;
        let mut herr = [0 as c_char; REFPROP_STRLEN];
        unsafe {
            (self.critp)(
                z.as_ptr(),
                &mut tc,
                &mut pc,
                &mut dc,
                &mut ierr,
                herr.as_mut_ptr(),
                REFPROP_STRLEN as c_long,
            );
        }
        ((tc, pc, dc), Status::new(ierr, &herr))
    }

    /// Viscosity (µPa·s) and thermal conductivity (W/(m·K)).
    pub fn transport(&self, t: f64, d: f64, z: &Composition) -> ((f64, f64), Status) {
        let (mut eta, mut tcx) = (0.0, 0.0);
        let mut ierr: c_int = 0;
        let mut herr = [0 as c_char; REFPROP_STRLEN];
        unsafe {
            (self.trnprp)(
                &t,
                &d,
                z.as_ptr(),
                &mut eta,
                &mut tcx,
                &mut ierr,
                herr.as_mut_ptr(),
                REFPROP_STRLEN as c_long,
            );
        }
        ((eta, tcx), Status::new(ierr, &herr))
    }

    /// Properties at (T, D). THERMdll reports no errors.
    pub fn therm(&self, t: f64, d: f64, z: &Composition) -> Therm {
        let (mut p, mut e, mut h, mut s) = (0.0, 0.0, 0.0, 0.0);
        let (mut cv, mut cp, mut w, mut hjt) = (0.0, 0.0, 0.0, 0.0);
        unsafe {
            (self.therm)(
                &t, &d, z.as_ptr(), &mut p, &mut e, &mut h, &mut s, &mut cv, &mut cp, &mut w,
                &mut hjt,
            );
        }
        Therm { e, h, s, cv, cp, w }
    }

    /// Constants of component `icomp` (1-based).
    pub fn info(&self, icomp: usize) -> ComponentInfo {
        let icomp = icomp as c_int;
        let (mut wmm, mut ttrp, mut tnbpt) = (0.0, 0.0, 0.0);
        let (mut tc, mut pc, mut dc) = (0.0, 0.0, 0.0);
        let (mut zc, mut acf, mut dip, mut rgas) = (0.0, 0.0, 0.0, 0.0);
        unsafe {
            (self.info)(
                &icomp, &mut wmm, &mut ttrp, &mut tnbpt, &mut tc, &mut pc, &mut dc, &mut zc,
                &mut acf, &mut dip, &mut rgas,
            );
        }
        ComponentInfo { wmm, ttrp, acf }
    }
}

// ── String helpers ──────────────────────────────────────────────────

/// Zero-padded, NUL-terminated buffer of `max_len` characters.
pub fn to_c_string(s: &str, max_len: usize) -> Vec<c_char> {
    let mut buffer = vec![0 as c_char; max_len];
    for (dst, &src) in buffer.iter_mut().zip(s.as_bytes()).take(max_len.saturating_sub(1)) {
        *dst = src as c_char;
    }
    buffer
}

/// Read a Fortran character buffer up to the first NUL, trimmed.
pub fn from_c_string(buffer: &[c_char]) -> String {
    let bytes: Vec<u8> = buffer
        .iter()
        .take_while(|&&c| c != 0)
        .map(|&c| c as u8)
        .collect();
    String::from_utf8_lossy(&bytes).trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn c_strings_are_padded_and_truncated() {
        let buf = to_c_string("R134A.FLD", 16);
        assert_eq!(buf.len(), 16);
        assert_eq!(from_c_string(&buf), "R134A.FLD");

        let buf = to_c_string("ABCDEFGH", 4);
        assert_eq!(from_c_string(&buf), "ABC");
        assert_eq!(buf[3], 0);
    }

    #[test]
    fn fortran_padding_is_trimmed() {
        let raw: Vec<c_char> = b"[SETUP error 101]   \0junk"
            .iter()
            .map(|&b| b as c_char)
            .collect();
        assert_eq!(from_c_string(&raw), "[SETUP error 101]");
    }

    #[test]
    fn missing_directory_reports_library_not_found() {
        let err = RefpropLibrary::load_from_dir(Path::new("/nonexistent/refprop"))
            .err()
            .unwrap();
        assert!(matches!(err, FacadeError::LibraryNotFound(_)));
    }
}
