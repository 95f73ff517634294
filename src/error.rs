//! The caller-visible error and diagnostic taxonomy for isotopic correction.
use std::fmt::{self, Display};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Everything that can keep [`crate::correct::correct`] from producing a result.
///
/// There is deliberately no `From<io::Error>` or similar conversion here;
/// file I/O lives entirely in [`crate::io`] and reports through
/// [`crate::io::IoError`].
#[derive(Debug, Clone)]
pub enum CorrectionError {
    /// The formula string could not be tokenized at all.
    MalformedFormula { formula: String },
    /// The formula referenced a symbol absent from the isotope table.
    UnknownElement { symbol: String },
    /// The tracer element does not appear (with count >= 1) in the metabolite formula.
    TracerAbsent { tracer: String },
    /// `v_measured` is shorter than `n * delta + 1` can support.
    MeasurementTooShort { required: usize, got: usize },
    /// `v_measured` is longer than the natural-abundance MDV plus tracer shifts can fill.
    FragmentTooSmall { max_supported: usize, got: usize },
    /// The purity vector's length does not match the tracer's isotope vector length.
    PurityShapeMismatch { expected: usize, got: usize },
    /// The purity vector does not sum to 1 within tolerance.
    PuritySumInvalid { sum: f64 },
    /// The isotope table is missing an element, or one of its vectors is malformed.
    IsotopeTableInvalid { reason: String },
    /// The solver hit its iteration cap before converging. Surfaced via
    /// [`crate::correct::CorrectionResult::error_kind`] alongside the
    /// best-effort distribution computed so far, not as an `Err` - the
    /// caller still gets a usable (if unconverged) result.
    SolverDidNotConverge { iterations: usize },
    /// A cooperative cancellation signal tripped mid-solve.
    Cancelled,
    /// A post-condition that should be mathematically guaranteed was violated;
    /// this indicates a bug in the core rather than a bad input.
    InternalInvariant { reason: String },
}

impl Display for CorrectionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MalformedFormula { formula } => {
                write!(f, "could not parse formula {formula:?}: trailing input")
            }
            Self::UnknownElement { symbol } => {
                write!(f, "unknown element symbol {symbol:?}")
            }
            Self::TracerAbsent { tracer } => {
                write!(f, "tracer element {tracer:?} is absent from the metabolite formula")
            }
            Self::MeasurementTooShort { required, got } => write!(
                f,
                "measurement vector has {got} entries, but at least {required} are required"
            ),
            Self::FragmentTooSmall { max_supported, got } => write!(
                f,
                "measurement vector has {got} entries, but the formula can only generate {max_supported}"
            ),
            Self::PurityShapeMismatch { expected, got } => write!(
                f,
                "purity vector has {got} entries, expected {expected} to match the tracer's isotope vector"
            ),
            Self::PuritySumInvalid { sum } => {
                write!(f, "purity vector sums to {sum}, expected 1.0 within tolerance")
            }
            Self::IsotopeTableInvalid { reason } => {
                write!(f, "isotope table is invalid: {reason}")
            }
            Self::SolverDidNotConverge { iterations } => {
                write!(f, "solver did not converge within {iterations} iterations")
            }
            Self::Cancelled => write!(f, "correction was cancelled"),
            Self::InternalInvariant { reason } => {
                write!(f, "internal invariant violated: {reason}")
            }
        }
    }
}

impl std::error::Error for CorrectionError {}

/// Non-fatal conditions surfaced alongside a successful [`crate::correct::CorrectionResult`].
///
/// Scoped to exactly these two conditions - solver non-convergence is not a
/// warning, it is reported through
/// [`crate::correct::CorrectionResult::error_kind`] as a
/// [`CorrectionError::SolverDidNotConverge`].
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Warning {
    /// One or more entries of `v_measured` were negative.
    NegativeMeasurement { index: usize, value: f64 },
    /// `v_measured` summed to zero; the solver was short-circuited.
    ZeroSignal,
}

impl Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NegativeMeasurement { index, value } => {
                write!(f, "v_measured[{index}] = {value} is negative")
            }
            Self::ZeroSignal => write!(f, "v_measured sums to zero; solver was not invoked"),
        }
    }
}
