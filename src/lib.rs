//! # propsi
//!
//! A stable C ABI for thermophysical property queries, in the shape
//! foreign callers already know: `PropsSI`, `Props`, `Props1` and the
//! batched `PropsSImulti`.
//!
//! ## Highlights
//!
//! * **Scalar queries**: `PropsSI("D", "T", 300, "P", 101325, "Water")`
//! * **Fluid constants**: `Props1("Water", "Tcrit")`
//! * **Batches**: every output at every state point, with broadcasting and
//!   per-cell failure isolation
//! * **Mixtures**: `Nitrogen[0.79]&Oxygen[0.21]`, or names plus a fraction
//!   vector in the batched form
//! * **Two engines**: a built-in reference engine, and NIST REFPROP loaded
//!   at runtime (`REFPROP::R134A`)
//! * **Never unwinds**: failures return `HUGE_VAL` and leave a message for
//!   `get_global_param_string("errstring", …)`
//!
//! ## From Rust
//!
//! ```
//! use propsi::{Facade, FacadeConfig};
//!
//! let facade = Facade::new(FacadeConfig::default());
//! let t = facade.props_si("T", "P", 101_325.0, "Q", 0.0, "Water")?;
//! assert!((t - 373.12).abs() < 0.01);
//! # Ok::<(), propsi::FacadeError>(())
//! ```
//!
//! ## From C
//!
//! ```c
//! double rho = PropsSI("Dmass", "T", 300.0, "P", 101325.0, "Air");
//! if (rho == HUGE_VAL) {
//!     char msg[256];
//!     get_global_param_string("errstring", msg, sizeof msg);
//! }
//! ```
//!
//! Linkage and calling convention are chosen per target at compile time;
//! see [`export`].

#[macro_use]
pub mod export;

pub mod config;
pub mod engine;
pub mod error;
pub mod ffi;
pub mod fluid_ref;
pub mod last_error;
pub mod parameter;
pub mod properties;
pub mod query;
mod sys;

// ── Public re-exports ────────────────────────────────────────────────
pub use config::{BatchPolicy, FacadeConfig};
pub use engine::{Backend, PropertyEngine};
pub use error::{ErrorKind, FacadeError, Result};
pub use export::ExportProfile;
pub use fluid_ref::FluidRef;
pub use parameter::{Input, Parameter};
pub use properties::{FluidConstants, Phase, ThermoState};
pub use query::{BatchRequest, Facade, ResultGrid, SENTINEL};
