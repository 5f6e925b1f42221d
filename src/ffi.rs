//! Exported C functions.
//!
//! Every entry point clears the calling thread's last error, runs under
//! `catch_unwind`, and reports failure as [`SENTINEL`] (or `0` for
//! `get_global_param_string`) with the message left for
//! `get_global_param_string("errstring", …)`.
//!
//! # Safety
//!
//! String arguments must be NUL-terminated and valid for the duration of
//! the call. Array arguments must hold at least the declared number of
//! elements; `result` must hold `resdim1 * resdim2` elements. Buffers must
//! not alias each other.

#![allow(non_snake_case)]

use std::any::Any;
use std::ffi::{CStr, c_char, c_int, c_long};
use std::panic::{AssertUnwindSafe, catch_unwind};

use tracing::debug;

use crate::engine::Backend;
use crate::error::{FacadeError, Result};
use crate::last_error;
use crate::query::{BatchRequest, Facade, ResultGrid, SENTINEL};

// ── Marshalling helpers ─────────────────────────────────────────────

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "panic with a non-string payload".to_string()
    }
}

fn report(entry: &'static str, err: &FacadeError) {
    debug!(entry, kind = ?err.kind(), error = %err, "boundary call failed");
    last_error::set(err);
}

/// Run `f` as a boundary call: fresh last-error slot, no unwinding out,
/// `fallback` on failure.
fn guard<T>(entry: &'static str, fallback: T, f: impl FnOnce() -> Result<T>) -> T {
    last_error::clear();
    let outcome = catch_unwind(AssertUnwindSafe(f))
        .unwrap_or_else(|payload| Err(FacadeError::Panic(panic_message(payload))));
    match outcome {
        Ok(v) => v,
        Err(e) => {
            report(entry, &e);
            fallback
        }
    }
}

/// # Safety
/// `ptr` is null or a NUL-terminated string that outlives `'a`.
unsafe fn read_str<'a>(ptr: *const c_char, what: &'static str) -> Result<&'a str> {
    if ptr.is_null() {
        return Err(FacadeError::NullPointer(what));
    }
    unsafe { CStr::from_ptr(ptr) }
        .to_str()
        .map_err(|_| FacadeError::InvalidUtf8(what))
}

/// # Safety
/// `ptr` is null or points to `len` readable doubles that outlive `'a`.
unsafe fn read_slice<'a>(ptr: *const f64, len: c_long, what: &'static str) -> Result<&'a [f64]> {
    let n = usize::try_from(len).map_err(|_| FacadeError::InvalidLength { what, value: len as i64 })?;
    if n == 0 {
        return Ok(&[]);
    }
    if ptr.is_null() {
        return Err(FacadeError::NullPointer(what));
    }
    Ok(unsafe { std::slice::from_raw_parts(ptr, n) })
}

/// Copy `s` plus a NUL into `out[..n]`. Never truncates.
///
/// # Safety
/// `out` is null or writable for `n` bytes.
unsafe fn write_c_string(out: *mut c_char, n: c_int, s: &str) -> Result<()> {
    if out.is_null() {
        return Err(FacadeError::NullPointer("output buffer"));
    }
    let capacity = usize::try_from(n).map_err(|_| FacadeError::InvalidLength {
        what: "output buffer",
        value: n as i64,
    })?;
    let needed = s.len() + 1;
    if needed > capacity {
        return Err(FacadeError::StringTooLong { needed, capacity });
    }
    let buf = unsafe { std::slice::from_raw_parts_mut(out.cast::<u8>(), needed) };
    buf[..s.len()].copy_from_slice(s.as_bytes());
    buf[s.len()] = 0;
    Ok(())
}

// ── Scalar queries ──────────────────────────────────────────────────

export_fn! {
    /// Property `output` at the state fixed by (`name1`, `prop1`) and
    /// (`name2`, `prop2`), SI units. Returns `HUGE_VAL` on failure.
    pub unsafe fn PropsSI(
        output: *const c_char,
        name1: *const c_char,
        prop1: f64,
        name2: *const c_char,
        prop2: f64,
        fluid: *const c_char,
    ) -> f64 {
        guard("PropsSI", SENTINEL, || {
            Facade::global().props_si(
                unsafe { read_str(output, "output") }?,
                unsafe { read_str(name1, "name1") }?,
                prop1,
                unsafe { read_str(name2, "name2") }?,
                prop2,
                unsafe { read_str(fluid, "fluid") }?,
            )
        })
    }
}

export_fn! {
    /// Alias of `PropsSI`.
    pub unsafe fn PropsS(
        output: *const c_char,
        name1: *const c_char,
        prop1: f64,
        name2: *const c_char,
        prop2: f64,
        fluid: *const c_char,
    ) -> f64 {
        unsafe { PropsSI(output, name1, prop1, name2, prop2, fluid) }
    }
}

export_fn! {
    /// Legacy form of `PropsSI` with single-character input codes.
    pub unsafe fn Props(
        output: *const c_char,
        name1: c_char,
        prop1: f64,
        name2: c_char,
        prop2: f64,
        fluid: *const c_char,
    ) -> f64 {
        guard("Props", SENTINEL, || {
            Facade::global().props_legacy(
                unsafe { read_str(output, "output") }?,
                name1 as u8,
                prop1,
                name2 as u8,
                prop2,
                unsafe { read_str(fluid, "fluid") }?,
            )
        })
    }
}

export_fn! {
    /// State-independent constant `output` of `fluid`.
    pub unsafe fn Props1(fluid: *const c_char, output: *const c_char) -> f64 {
        guard("Props1", SENTINEL, || {
            Facade::global().props1(
                unsafe { read_str(fluid, "fluid") }?,
                unsafe { read_str(output, "output") }?,
            )
        })
    }
}

// ── Batched query ───────────────────────────────────────────────────

enum Multi {
    Filled(ResultGrid),
    TooSmall { rows: usize, cols: usize },
}

/// # Safety
/// Null pointers are skipped; others are writable.
unsafe fn set_dims(resdim1: *mut c_long, resdim2: *mut c_long, rows: usize, cols: usize) {
    if !resdim1.is_null() {
        unsafe { *resdim1 = rows as c_long };
    }
    if !resdim2.is_null() {
        unsafe { *resdim2 = cols as c_long };
    }
}

/// # Safety
/// Both pointers are null or readable.
unsafe fn read_capacity(resdim1: *const c_long, resdim2: *const c_long) -> Result<(usize, usize)> {
    if resdim1.is_null() {
        return Err(FacadeError::NullPointer("resdim1"));
    }
    if resdim2.is_null() {
        return Err(FacadeError::NullPointer("resdim2"));
    }
    let (r, c) = unsafe { (*resdim1, *resdim2) };
    let rows = usize::try_from(r)
        .map_err(|_| FacadeError::InvalidLength { what: "resdim1", value: r as i64 })?;
    let cols = usize::try_from(c)
        .map_err(|_| FacadeError::InvalidLength { what: "resdim2", value: c as i64 })?;
    Ok((rows, cols))
}

export_fn! {
    /// Every output in `outputs` at every state point.
    ///
    /// `resdim1`/`resdim2` carry the capacity of `result` in and the
    /// realised shape out. Results are row-major, one row per output.
    /// On a capacity shortfall `result` is untouched and the dimensions
    /// report the required shape; on any other failure the whole declared
    /// capacity is filled with `HUGE_VAL` and both dimensions are zero.
    pub unsafe fn PropsSImulti(
        outputs: *const c_char,
        name1: *const c_char,
        prop1: *const f64,
        size1: c_long,
        name2: *const c_char,
        prop2: *const f64,
        size2: c_long,
        backend: *const c_char,
        fluids: *const c_char,
        fractions: *const f64,
        length_fractions: c_long,
        result: *mut f64,
        resdim1: *mut c_long,
        resdim2: *mut c_long,
    ) {
        last_error::clear();
        let (max_rows, max_cols) = match unsafe { read_capacity(resdim1, resdim2) } {
            Ok(cap) => cap,
            Err(e) => {
                report("PropsSImulti", &e);
                unsafe { set_dims(resdim1, resdim2, 0, 0) };
                return;
            }
        };

        let outcome = catch_unwind(AssertUnwindSafe(|| -> Result<Multi> {
            let req = BatchRequest {
                outputs: unsafe { read_str(outputs, "outputs") }?,
                name1: unsafe { read_str(name1, "name1") }?,
                prop1: unsafe { read_slice(prop1, size1, "prop1") }?,
                name2: unsafe { read_str(name2, "name2") }?,
                prop2: unsafe { read_slice(prop2, size2, "prop2") }?,
                backend: unsafe { read_str(backend, "backend") }?,
                fluids: unsafe { read_str(fluids, "fluids") }?,
                fractions: unsafe { read_slice(fractions, length_fractions, "fractions") }?,
            };
            let plan = Facade::global().plan_multi(&req)?;
            if plan.rows() > max_rows || plan.cols() > max_cols {
                return Ok(Multi::TooSmall { rows: plan.rows(), cols: plan.cols() });
            }
            if result.is_null() {
                return Err(FacadeError::NullPointer("result"));
            }
            plan.run().map(Multi::Filled)
        }))
        .unwrap_or_else(|payload| Err(FacadeError::Panic(panic_message(payload))));

        match outcome {
            Ok(Multi::Filled(grid)) => {
                let out = unsafe { std::slice::from_raw_parts_mut(result, grid.values.len()) };
                out.copy_from_slice(&grid.values);
                unsafe { set_dims(resdim1, resdim2, grid.rows, grid.cols) };
            }
            Ok(Multi::TooSmall { rows, cols }) => {
                report(
                    "PropsSImulti",
                    &FacadeError::InsufficientCapacity { rows, cols, max_rows, max_cols },
                );
                unsafe { set_dims(resdim1, resdim2, rows, cols) };
            }
            Err(e) => {
                report("PropsSImulti", &e);
                if !result.is_null() {
                    if let Some(n) = max_rows.checked_mul(max_cols) {
                        unsafe { std::slice::from_raw_parts_mut(result, n) }.fill(SENTINEL);
                    }
                }
                unsafe { set_dims(resdim1, resdim2, 0, 0) };
            }
        }
    }
}

// ── Global parameters ───────────────────────────────────────────────

export_fn! {
    /// Write a global string into `out` (capacity `n`, including the NUL).
    ///
    /// Keys: `errstring` (last error of this thread, cleared once read),
    /// `version`, `FluidsList`, `backends`. Returns 1 on success, 0 on
    /// failure; a value that does not fit is a failure, never truncated.
    pub unsafe fn get_global_param_string(
        param: *const c_char,
        out: *mut c_char,
        n: c_int,
    ) -> c_long {
        // The pending message outlives this call unless `errstring` reads
        // it successfully; a failure of another key reports its own error.
        let pending = last_error::take();
        let mut reads_errstring = false;
        let status = guard("get_global_param_string", 0, || {
            let key = unsafe { read_str(param, "param") }?;
            let value = match key {
                "errstring" => {
                    reads_errstring = true;
                    pending.clone()
                }
                "version" => env!("CARGO_PKG_VERSION").to_string(),
                "FluidsList" => {
                    let facade = Facade::global();
                    facade.fluid_names(facade.config().default_backend)?.join(",")
                }
                "backends" => Backend::ALL.map(Backend::name).join(","),
                other => return Err(FacadeError::UnknownParameter(other.to_string())),
            };
            unsafe { write_c_string(out, n, &value) }?;
            Ok(1)
        });
        let keep = if reads_errstring { status == 0 } else { status == 1 };
        if keep {
            last_error::restore(pending);
        }
        status
    }
}
