//! The query surface in Rust terms.
//!
//! [`Facade`] owns the configuration and engines and answers the three
//! query shapes. The exported C functions in [`crate::ffi`] are thin
//! marshalling wrappers around it; everything here is usable directly.

use std::sync::OnceLock;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::{BatchPolicy, FacadeConfig};
use crate::engine::{Backend, Engines, PropertyEngine};
use crate::error::{FacadeError, Result};
use crate::fluid_ref::FluidRef;
use crate::parameter::{Input, Parameter, parse_output_list};

/// Value returned in place of a result whenever a query fails (`HUGE_VAL`).
pub const SENTINEL: f64 = f64::INFINITY;

/// Batched results, row-major: one row per output, one column per state
/// point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultGrid {
    pub rows: usize,
    pub cols: usize,
    pub values: Vec<f64>,
}

impl ResultGrid {
    pub fn get(&self, row: usize, col: usize) -> Option<f64> {
        if row >= self.rows || col >= self.cols {
            return None;
        }
        self.values.get(row * self.cols + col).copied()
    }

    pub fn row(&self, row: usize) -> &[f64] {
        let start = (row * self.cols).min(self.values.len());
        let end = (start + self.cols).min(self.values.len());
        &self.values[start..end]
    }
}

/// Arguments of a batched query, as they arrive at the boundary.
#[derive(Debug, Clone, Copy)]
pub struct BatchRequest<'a> {
    /// Output names separated by `&` or `,`.
    pub outputs: &'a str,
    pub name1: &'a str,
    pub prop1: &'a [f64],
    pub name2: &'a str,
    pub prop2: &'a [f64],
    /// `""`, `"?"` or `"DEFAULT"` for the configured default.
    pub backend: &'a str,
    /// `&`-separated component names, or a single fluid reference.
    pub fluids: &'a str,
    /// Mole fractions; empty when `fluids` carries the composition.
    pub fractions: &'a [f64],
}

/// A validated batch, ready to run. Its shape is known before any state
/// is solved.
pub struct BatchPlan<'f, 'a> {
    engine: &'f dyn PropertyEngine,
    policy: BatchPolicy,
    fluid: FluidRef,
    outputs: Vec<Parameter>,
    name1: Parameter,
    prop1: &'a [f64],
    name2: Parameter,
    prop2: &'a [f64],
    cols: usize,
}

impl BatchPlan<'_, '_> {
    pub fn rows(&self) -> usize {
        self.outputs.len()
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Solve every state point once and read all outputs from it.
    pub fn run(&self) -> Result<ResultGrid> {
        let (rows, cols) = (self.rows(), self.cols);
        let mut values = vec![SENTINEL; rows * cols];
        let needs_state = self.outputs.iter().any(|p| !p.is_constant());

        for col in 0..cols {
            let a = Input::new(self.name1, broadcast(self.prop1, col));
            let b = Input::new(self.name2, broadcast(self.prop2, col));

            let state = if needs_state {
                match self.engine.state(&self.fluid, a, b) {
                    Ok(state) => Some(state),
                    Err(e) => {
                        self.tolerate(e, col, None)?;
                        continue;
                    }
                }
            } else {
                None
            };

            for (row, &output) in self.outputs.iter().enumerate() {
                let value = match &state {
                    Some(state) if !output.is_constant() => state.value(output),
                    _ => self.engine.constant(&self.fluid, output),
                }
                .and_then(|v| finite(output, v));
                match value {
                    Ok(v) => values[row * cols + col] = v,
                    Err(e) => self.tolerate(e, col, Some(output))?,
                }
            }
        }
        Ok(ResultGrid { rows, cols, values })
    }

    /// Apply the batch policy to one failure.
    fn tolerate(&self, err: FacadeError, col: usize, output: Option<Parameter>) -> Result<()> {
        match self.policy {
            BatchPolicy::Abort => Err(err),
            BatchPolicy::FillSentinel => {
                debug!(col, output = ?output, error = %err, "batch cell failed");
                Ok(())
            }
        }
    }
}

fn broadcast(values: &[f64], col: usize) -> f64 {
    if values.len() == 1 { values[0] } else { values[col] }
}

fn finite(output: Parameter, value: f64) -> Result<f64> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(FacadeError::NonFinite(output.name().to_string()))
    }
}

fn state_input(name: &str) -> Result<Parameter> {
    let param = Parameter::parse(name)?;
    if param.input_kind().is_none() {
        return Err(FacadeError::MisusedParameter {
            name: name.trim().to_string(),
            role: "a state input",
        });
    }
    Ok(param)
}

/// Number of state points for two input vectors of the given lengths.
pub fn broadcast_len(len1: usize, len2: usize) -> Result<usize> {
    match (len1, len2) {
        (0, _) => Err(FacadeError::EmptyInput("prop1")),
        (_, 0) => Err(FacadeError::EmptyInput("prop2")),
        (a, b) if a == b => Ok(a),
        (1, b) => Ok(b),
        (a, 1) => Ok(a),
        (a, b) => Err(FacadeError::LengthMismatch { len1: a, len2: b }),
    }
}

// ── Facade ──────────────────────────────────────────────────────────

pub struct Facade {
    config: FacadeConfig,
    engines: Engines,
}

impl Facade {
    pub fn new(config: FacadeConfig) -> Self {
        let engines = Engines::new(config.refprop_path.clone());
        Self { config, engines }
    }

    /// The process-wide instance used by the exported functions,
    /// configured from the environment on first use.
    pub fn global() -> &'static Facade {
        static GLOBAL: OnceLock<Facade> = OnceLock::new();
        GLOBAL.get_or_init(|| {
            let config = FacadeConfig::from_env();
            info!(
                version = env!("CARGO_PKG_VERSION"),
                backend = config.default_backend.name(),
                policy = ?config.batch_policy,
                refprop = ?config.refprop_path,
                "property facade initialised"
            );
            Facade::new(config)
        })
    }

    pub fn config(&self) -> &FacadeConfig {
        &self.config
    }

    fn engine_for(&self, fluid: &FluidRef) -> Result<&dyn PropertyEngine> {
        self.engines.get(fluid.backend.unwrap_or(self.config.default_backend))
    }

    pub fn fluid_names(&self, backend: Backend) -> Result<Vec<String>> {
        Ok(self.engines.get(backend)?.fluid_names())
    }

    fn evaluate(&self, output: Parameter, a: Input, b: Input, fluid: &FluidRef) -> Result<f64> {
        let engine = self.engine_for(fluid)?;
        let value = engine.state(fluid, a, b)?.value(output)?;
        finite(output, value)
    }

    fn constant(&self, output: Parameter, fluid: &FluidRef) -> Result<f64> {
        let value = self.engine_for(fluid)?.constant(fluid, output)?;
        finite(output, value)
    }

    /// `PropsSI`: one output at the state fixed by two named inputs.
    ///
    /// A fluid constant (`Tcrit`, `M`, …) ignores the inputs.
    pub fn props_si(
        &self,
        output: &str,
        name1: &str,
        value1: f64,
        name2: &str,
        value2: f64,
        fluid: &str,
    ) -> Result<f64> {
        let output = Parameter::parse(output)?;
        let fluid = FluidRef::parse(fluid)?;
        if output.is_constant() {
            return self.constant(output, &fluid);
        }
        let a = Input::new(state_input(name1)?, value1);
        let b = Input::new(state_input(name2)?, value2);
        self.evaluate(output, a, b, &fluid)
    }

    /// `Props`: as [`Facade::props_si`] with single-character input codes.
    pub fn props_legacy(
        &self,
        output: &str,
        code1: u8,
        value1: f64,
        code2: u8,
        value2: f64,
        fluid: &str,
    ) -> Result<f64> {
        let output = Parameter::parse(output)?;
        let fluid = FluidRef::parse(fluid)?;
        if output.is_constant() {
            return self.constant(output, &fluid);
        }
        let a = Input::new(Parameter::from_code(code1)?, value1);
        let b = Input::new(Parameter::from_code(code2)?, value2);
        self.evaluate(output, a, b, &fluid)
    }

    /// `Props1`: a state-independent fluid constant.
    pub fn props1(&self, fluid: &str, output: &str) -> Result<f64> {
        let output = Parameter::parse(output)?;
        if !output.is_constant() {
            return Err(FacadeError::MisusedParameter {
                name: output.name().to_string(),
                role: "a state-independent output",
            });
        }
        self.constant(output, &FluidRef::parse(fluid)?)
    }

    /// Validate a batched query without solving anything.
    pub fn plan_multi<'a>(&self, req: &BatchRequest<'a>) -> Result<BatchPlan<'_, 'a>> {
        let outputs = parse_output_list(req.outputs)?;
        let name1 = state_input(req.name1)?;
        let name2 = state_input(req.name2)?;
        let cols = broadcast_len(req.prop1.len(), req.prop2.len())?;
        let fluid = FluidRef::from_parts(req.backend, req.fluids, req.fractions)?;
        let engine = self.engine_for(&fluid)?;
        Ok(BatchPlan {
            engine,
            policy: self.config.batch_policy,
            fluid,
            outputs,
            name1,
            prop1: req.prop1,
            name2,
            prop2: req.prop2,
            cols,
        })
    }

    /// `PropsSImulti`: every output at every state point.
    pub fn props_si_multi(&self, req: &BatchRequest<'_>) -> Result<ResultGrid> {
        self.plan_multi(req)?.run()
    }
}
