use thiserror::Error;

/// Coarse classification of failures, used for logging and by callers
/// that want to tell bad input from engine trouble.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Environment or build configuration (missing library, unknown backend).
    Configuration,
    /// Malformed or inconsistent caller input.
    Validation,
    /// The engine could not evaluate a well-formed request.
    Computation,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum FacadeError {
    /// A required pointer argument was null.
    #[error("Null pointer passed for {0}")]
    NullPointer(&'static str),

    /// A string argument was not valid UTF-8.
    #[error("Argument {0} is not valid UTF-8")]
    InvalidUtf8(&'static str),

    /// A negative length or capacity crossed the boundary.
    #[error("Invalid length for {what}: {value}")]
    InvalidLength { what: &'static str, value: i64 },

    /// Unrecognised property name.
    #[error("Unknown parameter \"{0}\"")]
    UnknownParameter(String),

    /// The parameter exists but cannot be used where it was given.
    #[error("Parameter {name} cannot be used as {role}")]
    MisusedParameter { name: String, role: &'static str },

    /// The two inputs do not fix a state for this engine.
    #[error("Unsupported input pair ({0}, {1})")]
    UnsupportedInputPair(String, String),

    #[error("Invalid fluid reference \"{reference}\": {reason}")]
    InvalidFluidReference { reference: String, reason: String },

    #[error("Unknown fluid \"{0}\"")]
    UnknownFluid(String),

    #[error("Unknown backend \"{0}\"")]
    UnknownBackend(String),

    /// Fraction vector length disagrees with the component count.
    #[error("{fractions} fractions given for {components} components")]
    FractionCountMismatch { components: usize, fractions: usize },

    #[error("Invalid composition: {0}")]
    InvalidComposition(String),

    /// Input vectors neither match nor broadcast.
    #[error("Input lengths {len1} and {len2} are neither equal nor broadcastable")]
    LengthMismatch { len1: usize, len2: usize },

    #[error("Empty input: {0}")]
    EmptyInput(&'static str),

    /// The caller's result buffer is too small for the realised shape.
    #[error(
        "Result buffer too small: need {rows}x{cols}, capacity is {max_rows}x{max_cols}"
    )]
    InsufficientCapacity {
        rows: usize,
        cols: usize,
        max_rows: usize,
        max_cols: usize,
    },

    /// Output buffer for a returned string is too short.
    #[error("Output buffer of {capacity} bytes cannot hold {needed} bytes")]
    StringTooLong { needed: usize, capacity: usize },

    #[error("Value out of range: {0}")]
    OutOfRange(String),

    #[error("Not supported: {0}")]
    NotSupported(String),

    #[error("Convergence failed for {0}")]
    ConvergenceFailed(&'static str),

    /// The engine produced NaN or ±∞; never reported as a valid result.
    #[error("Non-finite result for {0}")]
    NonFinite(String),

    /// Error raised by an external engine (e.g. REFPROP `ierr > 0`).
    #[error("{backend} error {code}: {message}")]
    Engine {
        backend: &'static str,
        code: i32,
        message: String,
    },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The engine's shared library could not be loaded.
    #[error("Engine library not found: {0}")]
    LibraryNotFound(String),

    /// A panic was caught at the boundary.
    #[error("Internal error: {0}")]
    Panic(String),
}

impl FacadeError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::LibraryNotFound(_) | Self::UnknownBackend(_) | Self::InvalidConfig(_) => {
                ErrorKind::Configuration
            }
            Self::NullPointer(_)
            | Self::InvalidUtf8(_)
            | Self::InvalidLength { .. }
            | Self::UnknownParameter(_)
            | Self::MisusedParameter { .. }
            | Self::UnsupportedInputPair(..)
            | Self::InvalidFluidReference { .. }
            | Self::UnknownFluid(_)
            | Self::FractionCountMismatch { .. }
            | Self::InvalidComposition(_)
            | Self::LengthMismatch { .. }
            | Self::EmptyInput(_)
            | Self::InsufficientCapacity { .. }
            | Self::StringTooLong { .. } => ErrorKind::Validation,
            Self::OutOfRange(_)
            | Self::NotSupported(_)
            | Self::ConvergenceFailed(_)
            | Self::NonFinite(_)
            | Self::Engine { .. }
            | Self::Panic(_) => ErrorKind::Computation,
        }
    }
}

pub type Result<T> = std::result::Result<T, FacadeError>;
