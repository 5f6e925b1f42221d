use std::ffi::{CStr, CString, c_char};

use approx::assert_relative_eq;
use propsi::SENTINEL;
use propsi::ffi::{Props, Props1, PropsS, PropsSI, get_global_param_string};

fn c(s: &str) -> CString {
    CString::new(s).unwrap()
}

fn props_si(output: &str, n1: &str, v1: f64, n2: &str, v2: f64, fluid: &str) -> f64 {
    unsafe {
        PropsSI(
            c(output).as_ptr(),
            c(n1).as_ptr(),
            v1,
            c(n2).as_ptr(),
            v2,
            c(fluid).as_ptr(),
        )
    }
}

fn props1(fluid: &str, output: &str) -> f64 {
    unsafe { Props1(c(fluid).as_ptr(), c(output).as_ptr()) }
}

fn global(param: &str, capacity: usize) -> Option<String> {
    let mut buf = vec![0 as c_char; capacity];
    let status = unsafe { get_global_param_string(c(param).as_ptr(), buf.as_mut_ptr(), capacity as i32) };
    if status == 1 {
        Some(unsafe { CStr::from_ptr(buf.as_ptr()) }.to_string_lossy().into_owned())
    } else {
        None
    }
}

fn errstring() -> String {
    global("errstring", 1024).unwrap()
}

// ═══════════════════════════════════════════════════════════════════
//  PropsSI / PropsS / Props
// ═══════════════════════════════════════════════════════════════════

#[test]
fn water_boils_at_one_atmosphere() {
    let t = props_si("T", "P", 101_325.0, "Q", 0.0, "Water");
    assert!((t - 373.12).abs() < 0.01, "Tsat(1 atm) expected ≈ 373.12 K, got {t:.4}");
    assert_eq!(errstring(), "");
}

#[test]
fn air_density_at_ambient() {
    let d = props_si("Dmass", "T", 300.0, "P", 101_325.0, "Air");
    assert_relative_eq!(d, 1.1764, epsilon = 0.01);
}

#[test]
fn input_order_does_not_matter() {
    let a = props_si("Hmass", "T", 400.0, "P", 1e5, "Nitrogen");
    let b = props_si("Hmass", "P", 1e5, "T", 400.0, "Nitrogen");
    assert!(a.is_finite());
    assert_eq!(a.to_bits(), b.to_bits());
}

#[test]
fn props_s_is_an_alias() {
    let a = props_si("Smass", "T", 350.0, "P", 2e5, "Water");
    let b = unsafe {
        PropsS(
            c("Smass").as_ptr(),
            c("T").as_ptr(),
            350.0,
            c("P").as_ptr(),
            2e5,
            c("Water").as_ptr(),
        )
    };
    assert_eq!(a.to_bits(), b.to_bits());
}

#[test]
fn legacy_codes_match_names_bit_for_bit() {
    let named = props_si("D", "T", 320.0, "P", 5e5, "CarbonDioxide");
    let coded = unsafe {
        Props(
            c("D").as_ptr(),
            b'T' as c_char,
            320.0,
            b'P' as c_char,
            5e5,
            c("CarbonDioxide").as_ptr(),
        )
    };
    assert!(named.is_finite());
    assert_eq!(named.to_bits(), coded.to_bits());
}

#[test]
fn density_and_internal_energy_fix_the_state() {
    let d = props_si("Dmass", "P", 5e5, "T", 300.0, "Nitrogen");
    let u = props_si("Umass", "P", 5e5, "T", 300.0, "Nitrogen");
    let p = props_si("P", "D", d, "UMASS", u, "Nitrogen");
    let t = props_si("T", "UMASS", u, "D", d, "Nitrogen");
    assert_eq!(errstring(), "");
    assert_relative_eq!(p, 5e5, max_relative = 1e-9);
    assert_relative_eq!(t, 300.0, max_relative = 1e-9);
}

#[test]
fn inline_mixture_fractions() {
    let d = props_si("Dmass", "T", 300.0, "P", 101_325.0, "Nitrogen[0.79]&Oxygen[0.21]");
    assert_relative_eq!(d, 1.17, epsilon = 0.01);
}

// ═══════════════════════════════════════════════════════════════════
//  Props1
// ═══════════════════════════════════════════════════════════════════

#[test]
fn water_critical_temperature() {
    assert_eq!(props1("Water", "Tcrit"), 647.096);
    assert_eq!(props1("Water", "Pcrit"), 22.064e6);
}

#[test]
fn props1_rejects_state_dependent_outputs() {
    assert_eq!(props1("Water", "Hmass"), SENTINEL);
    assert!(errstring().contains("Hmass"));
}

// ═══════════════════════════════════════════════════════════════════
//  Failure protocol
// ═══════════════════════════════════════════════════════════════════

#[test]
fn unknown_fluid_returns_sentinel_and_message() {
    let v = props_si("T", "P", 1e5, "Q", 0.0, "Unobtainium");
    assert_eq!(v, SENTINEL);
    let message = errstring();
    assert!(message.contains("Unobtainium"), "got {message:?}");
    // Reading the message consumes it.
    assert_eq!(errstring(), "");
}

#[test]
fn a_successful_call_clears_the_previous_error() {
    assert_eq!(props_si("Nope", "T", 300.0, "P", 1e5, "Water"), SENTINEL);
    assert!(props_si("T", "T", 300.0, "P", 1e5, "Water").is_finite());
    assert_eq!(errstring(), "");
}

#[test]
fn null_arguments_are_reported() {
    let v = unsafe {
        PropsSI(
            std::ptr::null(),
            c("T").as_ptr(),
            300.0,
            c("P").as_ptr(),
            1e5,
            c("Water").as_ptr(),
        )
    };
    assert_eq!(v, SENTINEL);
    assert!(errstring().contains("output"));
}

#[test]
fn unsupported_pair_is_an_error() {
    assert_eq!(props_si("T", "Hmass", 1e5, "Smass", 300.0, "Water"), SENTINEL);
    assert!(errstring().contains("Unsupported input pair"));
}

// ═══════════════════════════════════════════════════════════════════
//  get_global_param_string
// ═══════════════════════════════════════════════════════════════════

#[test]
fn version_and_backends() {
    assert_eq!(global("version", 64).unwrap(), env!("CARGO_PKG_VERSION"));
    assert_eq!(global("backends", 64).unwrap(), "BUILTIN,REFPROP");
}

#[test]
fn fluids_list_names_the_default_backend_fluids() {
    let list = global("FluidsList", 4096).unwrap();
    let names: Vec<&str> = list.split(',').collect();
    assert!(names.contains(&"Water"));
    assert!(names.contains(&"Air"));
}

#[test]
fn short_buffer_fails_without_truncating() {
    assert_eq!(global("version", 2), None);
    assert!(errstring().contains("cannot hold"));
}

#[test]
fn error_message_survives_a_short_buffer() {
    assert_eq!(props1("Unobtainium", "Tcrit"), SENTINEL);
    assert_eq!(global("errstring", 4), None);
    assert!(errstring().contains("Unobtainium"));
}

#[test]
fn other_keys_leave_the_error_pending() {
    assert_eq!(props_si("T", "P", 1e5, "Q", 0.0, "Unobtainium"), SENTINEL);
    assert!(global("version", 64).is_some());
    assert!(global("backends", 64).is_some());
    assert!(global("FluidsList", 4096).is_some());
    assert!(errstring().contains("Unobtainium"));
}

#[test]
fn unknown_key_fails() {
    assert_eq!(global("colour", 64), None);
    assert!(errstring().contains("colour"));
}
