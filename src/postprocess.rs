//! Normalization, residuum scaling, and mean-enrichment computation.
use ndarray::Array1;

/// The result of post-processing a raw NNLS solution.
#[derive(Debug, Clone)]
pub struct PostProcessed {
    /// Normalized isotopologue distribution, length `n+1`, sums to 1 (or is
    /// all zero if the raw solution summed to zero).
    pub distribution: Vec<f64>,
    /// Residual, scaled to a fraction of the total measured signal.
    pub residuum: Vec<f64>,
    /// `Some` only when requested and the raw solution summed to > 0.
    pub mean_enrichment: Option<f64>,
}

/// Post-process a raw (clamped) NNLS solution `x` and its residual
/// `e = v - A x` into a reportable distribution, residuum, and optional mean
/// enrichment.
pub fn postprocess(
    x: &Array1<f64>,
    residual: &Array1<f64>,
    v_sum: f64,
    want_mean_enrichment: bool,
) -> PostProcessed {
    let clamped: Vec<f64> = x.iter().map(|&xi| xi.max(0.0)).collect();
    let x_sum: f64 = clamped.iter().sum();

    let distribution = if x_sum > 0.0 {
        clamped.iter().map(|&xi| xi / x_sum).collect()
    } else {
        vec![0.0; x.len()]
    };

    let residuum = if v_sum > 0.0 {
        residual.iter().map(|&ei| ei / v_sum).collect()
    } else {
        residual.to_vec()
    };

    let mean_enrichment = if want_mean_enrichment && x_sum > 0.0 {
        let n = distribution.len().saturating_sub(1);
        if n == 0 {
            Some(0.0)
        } else {
            let weighted: f64 = distribution
                .iter()
                .enumerate()
                .map(|(i, &di)| i as f64 * di)
                .sum();
            Some(weighted / n as f64)
        }
    } else {
        None
    };

    PostProcessed {
        distribution,
        residuum,
        mean_enrichment,
    }
}
