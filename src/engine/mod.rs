//! Property engines the facade delegates to.
//!
//! The facade only marshals; every thermodynamic answer comes from a
//! [`PropertyEngine`]. Two are provided:
//!
//! * [`builtin::BuiltinEngine`]: self-contained reference correlations;
//! * [`refprop::RefpropEngine`]: NIST REFPROP loaded at runtime.

pub mod builtin;
pub mod refprop;

use std::path::PathBuf;
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

use crate::error::{FacadeError, Result};
use crate::fluid_ref::FluidRef;
use crate::parameter::{Input, Parameter};
use crate::properties::ThermoState;

pub use builtin::BuiltinEngine;
pub use refprop::RefpropEngine;

/// Selectable property-model family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Backend {
    #[default]
    Builtin,
    Refprop,
}

impl Backend {
    pub const ALL: [Backend; 2] = [Backend::Builtin, Backend::Refprop];

    pub fn parse(name: &str) -> Result<Self> {
        match name.trim().to_ascii_uppercase().as_str() {
            "BUILTIN" => Ok(Self::Builtin),
            "REFPROP" => Ok(Self::Refprop),
            _ => Err(FacadeError::UnknownBackend(name.to_string())),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Builtin => "BUILTIN",
            Self::Refprop => "REFPROP",
        }
    }
}

/// The internal call surface: semantic types in, value or typed failure out.
///
/// Implementations must be safe to call from several threads at once; any
/// global state they wrap is theirs to serialise.
pub trait PropertyEngine: Send + Sync {
    fn name(&self) -> &'static str;

    /// A state-independent fluid constant (`Parameter::is_constant`).
    fn constant(&self, fluid: &FluidRef, param: Parameter) -> Result<f64>;

    /// Solve the state fixed by two inputs.
    fn state(&self, fluid: &FluidRef, first: Input, second: Input) -> Result<ThermoState>;

    /// Fluids this engine can resolve by name.
    fn fluid_names(&self) -> Vec<String>;
}

/// Engine instances owned by a facade.
///
/// The builtin engine is always present; REFPROP is loaded on first use and
/// the outcome (success or the load error) is kept.
pub struct Engines {
    builtin: BuiltinEngine,
    refprop_path: Option<PathBuf>,
    refprop: OnceLock<std::result::Result<RefpropEngine, FacadeError>>,
}

impl Engines {
    pub fn new(refprop_path: Option<PathBuf>) -> Self {
        Self {
            builtin: BuiltinEngine::new(),
            refprop_path,
            refprop: OnceLock::new(),
        }
    }

    pub fn get(&self, backend: Backend) -> Result<&dyn PropertyEngine> {
        match backend {
            Backend::Builtin => Ok(&self.builtin),
            Backend::Refprop => {
                let loaded = self.refprop.get_or_init(|| match &self.refprop_path {
                    Some(path) => RefpropEngine::load(path),
                    None => Err(FacadeError::LibraryNotFound(
                        "REFPROP_PATH is not set".into(),
                    )),
                });
                match loaded {
                    Ok(engine) => Ok(engine),
                    Err(e) => Err(e.clone()),
                }
            }
        }
    }
}
