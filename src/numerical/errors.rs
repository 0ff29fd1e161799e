//! error type shared by the spectral solvers
use thiserror::Error;

/// Fatal conditions of the spectral BVP/PDE pipeline. Recoverable situations (Newton iteration cap,
/// corner mismatch of boundary data, ambiguous number of unknowns) are not errors: they are logged
/// and reported through the solve info instead.
#[derive(Debug, Error)]
pub enum SolveError {
    #[error("dimension mismatch in {what}: expected {expected:?}, found {found:?}")]
    DimensionMismatch {
        what: String,
        expected: (usize, usize),
        found: (usize, usize),
    },
    #[error("BCs are linearly dependent ({axis} direction)")]
    LinearlyDependentBCs { axis: String },
    #[error(
        "number of boundary conditions in {axis} direction is {found}, the differential order requires {expected}"
    )]
    BoundaryConditionCount {
        axis: String,
        expected: usize,
        found: usize,
    },
    #[error("unrecognized spectral discretization technology: {0}")]
    UnsupportedTechnology(String),
    #[error("operator has numerical rank 0: every coefficient is below tolerance")]
    DegenerateOperator,
    #[error("PDE operator is nonlinear in term {0}, only linear PDEs are supported")]
    NonlinearPde(String),
    #[error("singular linear system: {0}")]
    SingularSystem(String),
    #[error("cannot parse expression: {0}")]
    Parse(String),
    #[error("unknown symbol {0} in operator")]
    UnknownSymbol(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("invalid preferences: {0}")]
    Config(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Csv(#[from] csv::Error),
}

pub type SolveResult<T> = Result<T, SolveError>;
