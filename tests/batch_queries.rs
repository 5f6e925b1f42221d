use std::ffi::{CString, c_long};

use approx::assert_relative_eq;
use propsi::SENTINEL;
use propsi::ffi::{PropsSI, PropsSImulti};

fn c(s: &str) -> CString {
    CString::new(s).unwrap()
}

struct Call<'a> {
    outputs: &'a str,
    name1: &'a str,
    prop1: &'a [f64],
    name2: &'a str,
    prop2: &'a [f64],
    backend: &'a str,
    fluids: &'a str,
    fractions: &'a [f64],
}

impl<'a> Call<'a> {
    fn tp(outputs: &'a str, t: &'a [f64], p: &'a [f64], fluids: &'a str) -> Self {
        Self {
            outputs,
            name1: "T",
            prop1: t,
            name2: "P",
            prop2: p,
            backend: "",
            fluids,
            fractions: &[],
        }
    }

    /// Run with a `rows x cols` buffer pre-filled with `-1.0`.
    fn run(&self, rows: c_long, cols: c_long) -> (Vec<f64>, c_long, c_long) {
        let mut result = vec![-1.0; (rows * cols) as usize];
        let (mut r, mut k) = (rows, cols);
        unsafe {
            PropsSImulti(
                c(self.outputs).as_ptr(),
                c(self.name1).as_ptr(),
                self.prop1.as_ptr(),
                self.prop1.len() as c_long,
                c(self.name2).as_ptr(),
                self.prop2.as_ptr(),
                self.prop2.len() as c_long,
                c(self.backend).as_ptr(),
                c(self.fluids).as_ptr(),
                self.fractions.as_ptr(),
                self.fractions.len() as c_long,
                result.as_mut_ptr(),
                &mut r,
                &mut k,
            );
        }
        (result, r, k)
    }
}

fn scalar(output: &str, t: f64, p: f64, fluid: &str) -> f64 {
    unsafe {
        PropsSI(
            c(output).as_ptr(),
            c("T").as_ptr(),
            t,
            c("P").as_ptr(),
            p,
            c(fluid).as_ptr(),
        )
    }
}

// ═══════════════════════════════════════════════════════════════════
//  Shape and agreement with scalar calls
// ═══════════════════════════════════════════════════════════════════

#[test]
fn batch_matches_scalar_calls() {
    let t = [300.0, 400.0, 500.0];
    let (result, rows, cols) = Call::tp("Dmass", &t, &[1e5], "Water").run(1, 3);
    assert_eq!((rows, cols), (1, 3));
    for (i, &ti) in t.iter().enumerate() {
        assert_eq!(result[i].to_bits(), scalar("Dmass", ti, 1e5, "Water").to_bits());
    }
}

#[test]
fn rows_are_outputs_columns_are_points() {
    let t = [300.0, 350.0];
    let p = [1e5, 2e5];
    let (result, rows, cols) = Call::tp("Hmass&Smass,Dmass", &t, &p, "Nitrogen").run(4, 4);
    assert_eq!((rows, cols), (3, 2));
    for (row, output) in ["Hmass", "Smass", "Dmass"].iter().enumerate() {
        for col in 0..2 {
            assert_eq!(result[row * 2 + col], scalar(output, t[col], p[col], "Nitrogen"));
        }
    }
    // Beyond the realised shape the buffer is untouched.
    assert!(result[6..].iter().all(|&v| v == -1.0));
}

#[test]
fn scalar_input_broadcasts() {
    let p = [1e5, 2e5, 5e5, 1e6];
    let (result, rows, cols) = Call::tp("P", &[300.0], &p, "Argon").run(1, 4);
    assert_eq!((rows, cols), (1, 4));
    assert_eq!(result, p);
}

#[test]
fn fraction_vector_with_component_names() {
    let call = Call {
        fractions: &[0.79, 0.21],
        ..Call::tp("Dmass", &[300.0], &[101_325.0], "Nitrogen&Oxygen")
    };
    let (result, rows, cols) = call.run(1, 1);
    assert_eq!((rows, cols), (1, 1));
    assert_relative_eq!(result[0], 1.17, epsilon = 0.01);
}

#[test]
fn explicit_backend_selector() {
    let call = Call { backend: "BUILTIN", ..Call::tp("Tcrit", &[300.0], &[1e5], "Water") };
    let (result, _, _) = call.run(1, 1);
    assert_eq!(result[0], 647.096);
}

// ═══════════════════════════════════════════════════════════════════
//  Failures
// ═══════════════════════════════════════════════════════════════════

#[test]
fn invalid_point_fails_its_column_only() {
    let t = [300.0, -10.0, 500.0];
    let (result, rows, cols) = Call::tp("T&Dmass", &t, &[1e5], "Water").run(2, 3);
    assert_eq!((rows, cols), (2, 3));
    assert_eq!(result[1], SENTINEL);
    assert_eq!(result[4], SENTINEL);
    assert_eq!(result[0], 300.0);
    assert_eq!(result[2], 500.0);
    assert!(result[3].is_finite() && result[5].is_finite());
}

#[test]
fn mismatched_lengths_fill_the_whole_buffer() {
    let (result, rows, cols) = Call::tp("T", &[300.0, 310.0, 320.0], &[1e5, 2e5], "Water").run(2, 3);
    assert_eq!((rows, cols), (0, 0));
    assert!(result.iter().all(|&v| v == SENTINEL));
}

#[test]
fn fraction_count_mismatch_is_an_error() {
    let call = Call {
        fractions: &[1.0],
        ..Call::tp("Dmass", &[300.0], &[1e5], "Nitrogen&Oxygen")
    };
    let (result, rows, cols) = call.run(1, 1);
    assert_eq!((rows, cols), (0, 0));
    assert_eq!(result[0], SENTINEL);
}

#[test]
fn unknown_output_fails_the_batch() {
    let (result, rows, cols) = Call::tp("T&Nope", &[300.0], &[1e5], "Water").run(2, 1);
    assert_eq!((rows, cols), (0, 0));
    assert_eq!(result, [SENTINEL, SENTINEL]);
}

#[test]
fn short_buffer_reports_required_shape() {
    let t = [300.0, 400.0, 500.0];
    let (result, rows, cols) = Call::tp("T&P", &t, &[1e5], "Water").run(2, 2);
    assert_eq!((rows, cols), (2, 3));
    assert!(result.iter().all(|&v| v == -1.0));
}

#[test]
fn negative_capacity_is_rejected() {
    let mut result = [0.0; 1];
    let (mut r, mut k): (c_long, c_long) = (-1, 1);
    let t = [300.0];
    let p = [1e5];
    unsafe {
        PropsSImulti(
            c("T").as_ptr(),
            c("T").as_ptr(),
            t.as_ptr(),
            1,
            c("P").as_ptr(),
            p.as_ptr(),
            1,
            c("").as_ptr(),
            c("Water").as_ptr(),
            std::ptr::null(),
            0,
            result.as_mut_ptr(),
            &mut r,
            &mut k,
        );
    }
    assert_eq!((r, k), (0, 0));
    assert_eq!(result[0], 0.0);
}
