//! Natural-abundance mass distribution vectors, built by repeated discrete
//! convolution of per-element isotope abundance vectors.
//!
//! Adapted from `(mass, abundance)` fine-structure pairs to bare probability
//! arrays indexed by nominal mass-shift step, since the correction core
//! never needs actual masses.
use crate::error::CorrectionError;
use crate::formula::ElementCounts;
use crate::isotope_table::IsotopeTable;

/// Full discrete convolution: `(u * v)_k = sum_{i+j=k} u_i * v_j`.
///
/// The result has length `u.len() + v.len() - 1`; nothing is truncated here,
/// truncation is the correction matrix builder's job.
pub fn convolve(u: &[f64], v: &[f64]) -> Vec<f64> {
    if u.is_empty() || v.is_empty() {
        return Vec::new();
    }
    let mut out = vec![0.0; u.len() + v.len() - 1];
    for (i, &ui) in u.iter().enumerate() {
        if ui == 0.0 {
            continue;
        }
        for (j, &vj) in v.iter().enumerate() {
            out[i + j] += ui * vj;
        }
    }
    out
}

/// Convolve `base` with `vector` a total of `times` times.
pub fn convolve_n(mut base: Vec<f64>, vector: &[f64], times: u32) -> Vec<f64> {
    for _ in 0..times {
        base = convolve(&base, vector);
    }
    base
}

/// Right-pad `vector` with zeros, or truncate it, so it has exactly `len` entries.
pub fn truncate_or_pad(vector: &[f64], len: usize) -> Vec<f64> {
    let mut out = vec![0.0; len];
    let copy_len = vector.len().min(len);
    out[..copy_len].copy_from_slice(&vector[..copy_len]);
    out
}

/// Build the natural-abundance MDV for a metabolite (optionally plus a
/// derivative moiety).
///
/// `exclude_tracer_natab` skips the tracer element's contribution when
/// convolving the metabolite's atoms; the derivative moiety, if present,
/// always contributes natural abundance for every one of its atoms
/// including the tracer element.
///
/// Element traversal order is unconstrained by the algorithm (convolution
/// is commutative and associative); see `mdv::test::order_independent`,
/// which folds the same steps in several explicit, caller-chosen orders
/// rather than relying on `ElementCounts`'s incidental hash order.
pub fn natural_abundance_mdv(
    table: &IsotopeTable,
    metabolite: &ElementCounts,
    derivative: &ElementCounts,
    tracer_element: &str,
    exclude_tracer_natab: bool,
) -> Result<Vec<f64>, CorrectionError> {
    let mut mdv = vec![1.0];

    for (symbol, count) in metabolite.iter() {
        if count == 0 {
            continue;
        }
        if symbol == tracer_element && exclude_tracer_natab {
            continue;
        }
        let abundances = table
            .get(symbol)
            .ok_or_else(|| CorrectionError::UnknownElement {
                symbol: symbol.to_string(),
            })?;
        mdv = convolve_n(mdv, abundances, count);
    }

    for (symbol, count) in derivative.iter() {
        if count == 0 {
            continue;
        }
        let abundances = table
            .get(symbol)
            .ok_or_else(|| CorrectionError::UnknownElement {
                symbol: symbol.to_string(),
            })?;
        mdv = convolve_n(mdv, abundances, count);
    }

    Ok(mdv)
}
