use std::env;
use std::path::{Path, PathBuf};
use std::sync::Once;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::engine::Backend;
use crate::error::{FacadeError, Result};

/// What a batched query does when one cell or one state point fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BatchPolicy {
    /// Write the sentinel for the failed cell (or column) and carry on.
    #[default]
    FillSentinel,
    /// Fail the whole batch on the first error.
    Abort,
}

impl BatchPolicy {
    pub fn parse(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "fill" | "fill_sentinel" | "continue" => Ok(Self::FillSentinel),
            "abort" | "fail" => Ok(Self::Abort),
            _ => Err(FacadeError::InvalidConfig(format!(
                "PROPSI_BATCH_POLICY must be \"fill\" or \"abort\", got \"{value}\""
            ))),
        }
    }
}

/// Process-wide settings, read from the environment (and `.env`).
///
/// | Variable                 | Meaning                            | Default   |
/// |--------------------------|------------------------------------|-----------|
/// | `REFPROP_PATH`           | REFPROP installation directory     | searched  |
/// | `PROPSI_DEFAULT_BACKEND` | `BUILTIN` or `REFPROP`             | `BUILTIN` |
/// | `PROPSI_BATCH_POLICY`    | `fill` or `abort`                  | `fill`    |
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FacadeConfig {
    pub refprop_path: Option<PathBuf>,
    pub default_backend: Backend,
    pub batch_policy: BatchPolicy,
}

impl FacadeConfig {
    /// Read the configuration, loading `.env` first.
    ///
    /// Invalid values are logged and replaced by their defaults; a boundary
    /// library has nowhere to report a startup error.
    pub fn from_env() -> Self {
        load_dotenv();
        let default_backend = match env::var("PROPSI_DEFAULT_BACKEND") {
            Ok(v) => Backend::parse(&v).unwrap_or_else(|e| {
                warn!(error = %e, "ignoring PROPSI_DEFAULT_BACKEND");
                Backend::default()
            }),
            Err(_) => Backend::default(),
        };
        let batch_policy = match env::var("PROPSI_BATCH_POLICY") {
            Ok(v) => BatchPolicy::parse(&v).unwrap_or_else(|e| {
                warn!(error = %e, "ignoring PROPSI_BATCH_POLICY");
                BatchPolicy::default()
            }),
            Err(_) => BatchPolicy::default(),
        };
        Self {
            refprop_path: find_refprop_path(),
            default_backend,
            batch_policy,
        }
    }

    pub fn with_default_backend(mut self, backend: Backend) -> Self {
        self.default_backend = backend;
        self
    }

    pub fn with_batch_policy(mut self, policy: BatchPolicy) -> Self {
        self.batch_policy = policy;
        self
    }

    pub fn with_refprop_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.refprop_path = Some(path.into());
        self
    }
}

/// Load `.env` once: working directory, then the crate root, then the
/// directory of the running executable.
fn load_dotenv() {
    static DOTENV_INIT: Once = Once::new();
    DOTENV_INIT.call_once(|| {
        if dotenvy::dotenv().is_ok() {
            return;
        }
        if let Ok(dir) = env::var("CARGO_MANIFEST_DIR") {
            let p = PathBuf::from(dir).join(".env");
            if p.exists() {
                let _ = dotenvy::from_path(&p);
                return;
            }
        }
        if let Some(dir) = env::current_exe().ok().as_deref().and_then(Path::parent) {
            let p = dir.join(".env");
            if p.exists() {
                let _ = dotenvy::from_path(&p);
            }
        }
    });
}

/// `REFPROP_PATH` if it exists, else the first standard install location
/// present on this machine.
fn find_refprop_path() -> Option<PathBuf> {
    if let Ok(path) = env::var("REFPROP_PATH") {
        let path = PathBuf::from(path);
        if path.exists() {
            return Some(path);
        }
        warn!(path = %path.display(), "REFPROP_PATH does not exist");
    }

    #[cfg(target_os = "windows")]
    let standard: &[&str] = &[r"C:\Program Files (x86)\REFPROP", r"C:\Program Files\REFPROP"];
    #[cfg(target_os = "linux")]
    let standard: &[&str] = &["/opt/refprop", "/usr/local/lib/refprop"];
    #[cfg(target_os = "macos")]
    let standard: &[&str] = &["/Applications/REFPROP", "/opt/refprop"];
    #[cfg(not(any(target_os = "windows", target_os = "linux", target_os = "macos")))]
    let standard: &[&str] = &[];

    standard.iter().map(PathBuf::from).find(|p| p.exists())
}
