//! Tracer configuration: which element is the tracer, its purity vector,
//! and whether to exclude its natural abundance from the metabolite MDV.
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::CorrectionError;
use crate::isotope_table::IsotopeTable;

/// Configuration for the tracer element of a correction.
///
/// Only the tracer element may ever be excluded from the natural-abundance
/// MDV - there is no field here for excluding an arbitrary element.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TracerConfig {
    pub element: String,
    pub purity: Vec<f64>,
    pub exclude_tracer_natab: bool,
}

impl TracerConfig {
    pub fn new(element: impl Into<String>, purity: Vec<f64>, exclude_tracer_natab: bool) -> Self {
        Self {
            element: element.into(),
            purity,
            exclude_tracer_natab,
        }
    }

    /// Check the purity vector's shape and sum against the tracer element's
    /// entry in `table`. Does not check that the metabolite formula actually
    /// contains the tracer - that's [`crate::correct::correct`]'s job, since
    /// it needs the parsed formula, which this type doesn't own.
    pub fn validate(&self, table: &IsotopeTable) -> Result<(), CorrectionError> {
        let expected_len =
            table
                .isotope_count(&self.element)
                .ok_or_else(|| CorrectionError::UnknownElement {
                    symbol: self.element.clone(),
                })?;
        if self.purity.len() != expected_len {
            return Err(CorrectionError::PurityShapeMismatch {
                expected: expected_len,
                got: self.purity.len(),
            });
        }
        let sum: f64 = self.purity.iter().sum();
        if (sum - 1.0).abs() > 1e-9 {
            return Err(CorrectionError::PuritySumInvalid { sum });
        }
        Ok(())
    }
}
