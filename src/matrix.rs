//! The correction matrix `A`: an `M x (n+1)` linear operator mapping a
//! candidate tracer-isotopologue distribution to the expected measured
//! intensity pattern.
use ndarray::Array2;

use crate::error::CorrectionError;
use crate::mdv::{convolve, truncate_or_pad};

/// Build the correction matrix.
///
/// - `natural_mdv`: the natural-abundance MDV of the non-tracer part of the
///   molecule.
/// - `tracer_natab`: the tracer element's own natural-abundance vector,
///   `T[e*]`.
/// - `purity`: the tracer-purity vector, length `k_tracer`.
/// - `n`: tracer atom count.
/// - `m`: the number of observed mass fractions (rows of `A`).
/// - `exclude_tracer_natab`: if true, column construction never mixes in
///   `tracer_natab` (the caller's `natural_mdv` is assumed to already
///   exclude the tracer element).
pub fn build_correction_matrix(
    natural_mdv: &[f64],
    tracer_natab: &[f64],
    purity: &[f64],
    n: usize,
    m: usize,
    exclude_tracer_natab: bool,
) -> Result<Array2<f64>, CorrectionError> {
    let delta = tracer_natab.len().saturating_sub(1);

    validate_purity(purity, tracer_natab.len())?;
    validate_dimensions(n, m, delta, natural_mdv.len())?;

    let base = truncate_or_pad(natural_mdv, m);
    let mut a = Array2::<f64>::zeros((m, n + 1));

    for j in 0..=n {
        let mut col = base.clone();
        for _ in 0..j {
            col = truncate_or_pad(&convolve(&col, purity), m);
        }
        if !exclude_tracer_natab {
            for _ in 0..(n - j) {
                col = truncate_or_pad(&convolve(&col, tracer_natab), m);
            }
        }
        for (row, &value) in col.iter().enumerate() {
            a[[row, j]] = value;
        }
    }

    Ok(a)
}

fn validate_purity(purity: &[f64], expected_len: usize) -> Result<(), CorrectionError> {
    if purity.len() != expected_len {
        return Err(CorrectionError::PurityShapeMismatch {
            expected: expected_len,
            got: purity.len(),
        });
    }
    let sum: f64 = purity.iter().sum();
    if (sum - 1.0).abs() > 1e-9 {
        return Err(CorrectionError::PuritySumInvalid { sum });
    }
    Ok(())
}

fn validate_dimensions(
    n: usize,
    m: usize,
    delta: usize,
    natural_mdv_len: usize,
) -> Result<(), CorrectionError> {
    let required = n * delta + 1;
    if m < required {
        return Err(CorrectionError::MeasurementTooShort {
            required,
            got: m,
        });
    }
    let max_supported = natural_mdv_len + n * delta;
    if m > max_supported {
        return Err(CorrectionError::FragmentTooSmall {
            max_supported,
            got: m,
        });
    }
    Ok(())
}
