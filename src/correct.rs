//! The stateless facade tying the parser, MDV builder, matrix builder,
//! solver, and post-processor into a single pure function.
use ndarray::Array1;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{CorrectionError, Warning};
use crate::formula::parse_formula_with_table;
use crate::isotope_table::IsotopeTable;
use crate::matrix::build_correction_matrix;
use crate::mdv::natural_abundance_mdv;
use crate::nnls::{solve_nnls, NnlsConfig};
use crate::postprocess::postprocess;
use crate::tracer::TracerConfig;

/// The outcome of a single correction: a normalized isotopologue
/// distribution, a scaled residuum, an optional mean enrichment, any
/// non-fatal diagnostics collected along the way, and an optional error
/// kind for conditions (solver non-convergence) that still leave a
/// best-effort result worth returning.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CorrectionResult {
    pub distribution: Vec<f64>,
    pub residuum: Vec<f64>,
    pub mean_enrichment: Option<f64>,
    pub warnings: Vec<Warning>,
    /// `Some(CorrectionError::SolverDidNotConverge { .. })` when the solver
    /// hit its iteration cap; `None` otherwise. Distinct from the function's
    /// own `Err` return, which is reserved for conditions with no usable
    /// partial result (malformed input, cancellation).
    pub error_kind: Option<CorrectionError>,
}

/// Correct a measured mass-fraction vector for natural isotopic abundance
/// and tracer impurity.
///
/// Checks run in this order, short-circuiting on the first failure:
/// formula validity, tracer presence, measurement length, purity
/// shape/sum, then MDV construction, matrix construction, solve, and
/// post-processing. This is a pure function of its arguments - no caches,
/// no globals, nothing retained between calls.
#[allow(clippy::too_many_arguments)]
pub fn correct(
    table: &IsotopeTable,
    metabolite_formula: &str,
    derivative_formula: &str,
    v_measured: &[f64],
    tracer: &TracerConfig,
    want_mean_enrichment: bool,
) -> Result<CorrectionResult, CorrectionError> {
    correct_cancellable(
        table,
        metabolite_formula,
        derivative_formula,
        v_measured,
        tracer,
        want_mean_enrichment,
        || false,
    )
}

/// Like [`correct`], but checks `is_cancelled` between solver iterations and
/// returns [`CorrectionError::Cancelled`] if it ever trips.
#[allow(clippy::too_many_arguments)]
pub fn correct_cancellable(
    table: &IsotopeTable,
    metabolite_formula: &str,
    derivative_formula: &str,
    v_measured: &[f64],
    tracer: &TracerConfig,
    want_mean_enrichment: bool,
    mut is_cancelled: impl FnMut() -> bool,
) -> Result<CorrectionResult, CorrectionError> {
    let metabolite = parse_formula_with_table(metabolite_formula, table)?;
    let derivative = parse_formula_with_table(derivative_formula, table)?;

    let n = metabolite.get(&tracer.element);
    if n == 0 {
        return Err(CorrectionError::TracerAbsent {
            tracer: tracer.element.clone(),
        });
    }
    let n = n as usize;

    let tracer_natab = table
        .get(&tracer.element)
        .ok_or_else(|| CorrectionError::UnknownElement {
            symbol: tracer.element.clone(),
        })?;
    let delta = tracer_natab.len().saturating_sub(1);
    let m = v_measured.len();

    let required = n * delta + 1;
    if m < required {
        return Err(CorrectionError::MeasurementTooShort { required, got: m });
    }

    tracer.validate(table)?;

    let natural_mdv = natural_abundance_mdv(
        table,
        &metabolite,
        &derivative,
        &tracer.element,
        tracer.exclude_tracer_natab,
    )?;

    let a = build_correction_matrix(
        &natural_mdv,
        tracer_natab,
        &tracer.purity,
        n,
        m,
        tracer.exclude_tracer_natab,
    )?;

    let mut warnings = Vec::new();
    for (index, &value) in v_measured.iter().enumerate() {
        if value < 0.0 {
            warnings.push(Warning::NegativeMeasurement { index, value });
        }
    }

    let v = Array1::from_vec(v_measured.to_vec());
    let v_sum: f64 = v.iter().sum();

    if v_sum == 0.0 {
        warnings.push(Warning::ZeroSignal);
        return Ok(CorrectionResult {
            distribution: vec![0.0; n + 1],
            residuum: vec![0.0; m],
            mean_enrichment: None,
            warnings,
            error_kind: None,
        });
    }

    let solution = solve_nnls(&a, &v, NnlsConfig::default(), &mut is_cancelled);
    if solution.cancelled {
        return Err(CorrectionError::Cancelled);
    }
    let error_kind = if solution.converged {
        None
    } else {
        Some(CorrectionError::SolverDidNotConverge {
            iterations: solution.iterations,
        })
    };

    let residual = &v - &a.dot(&solution.x);
    let processed = postprocess(&solution.x, &residual, v_sum, want_mean_enrichment);

    // Post-condition: a genuinely normalized distribution must sum to 1
    // within 1e-6. This should never trip given a correct postprocess() -
    // it exists to catch a bug, not a bad input.
    let clamped_sum: f64 = solution.x.iter().map(|&xi| xi.max(0.0)).sum();
    if clamped_sum > 0.0 {
        let distribution_sum: f64 = processed.distribution.iter().sum();
        if (distribution_sum - 1.0).abs() > 1e-6 {
            return Err(CorrectionError::InternalInvariant {
                reason: format!(
                    "normalized distribution sums to {distribution_sum}, expected 1.0 within 1e-6"
                ),
            });
        }
    }

    Ok(CorrectionResult {
        distribution: processed.distribution,
        residuum: processed.residuum,
        mean_enrichment: processed.mean_enrichment,
        warnings,
        error_kind,
    })
}

#[cfg(test)]
mod test {
    use super::*;

    fn base_table() -> IsotopeTable {
        IsotopeTable::from_pairs(vec![
            ("C", vec![0.9893, 0.0107]),
            ("H", vec![1.0]),
            ("O", vec![1.0]),
        ])
        .unwrap()
    }

    #[test]
    fn trivial_no_tracer_natab_correction() {
        let table = base_table();
        let tracer = TracerConfig::new("C", vec![0.0, 1.0], true);
        let result = correct(&table, "C3H4O3", "", &[1.0, 0.0, 0.0, 0.0], &tracer, true).unwrap();
        assert_eq!(result.distribution, vec![1.0, 0.0, 0.0, 0.0]);
        assert_eq!(result.residuum, vec![0.0, 0.0, 0.0, 0.0]);
        assert_eq!(result.mean_enrichment, Some(0.0));
    }

    #[test]
    fn with_tracer_natural_abundance_correction() {
        let table = base_table();
        let tracer = TracerConfig::new("C", vec![0.0, 1.0], false);
        let result = correct(
            &table,
            "C2",
            "",
            &[0.9787, 0.0212, 0.0001],
            &tracer,
            true,
        )
        .unwrap();
        assert!((result.distribution[0] - 1.0).abs() < 1e-3);
        assert!(result.distribution[1] < 1e-3);
        assert!(result.distribution[2] < 1e-3);
    }

    #[test]
    fn derivative_moiety_produces_well_formed_result() {
        let table = IsotopeTable::from_pairs(vec![
            ("C", vec![0.9893, 0.0107]),
            ("H", vec![1.0]),
            ("O", vec![1.0]),
            ("N", vec![0.99636, 0.00364]),
            ("Si", vec![0.92223, 0.04685, 0.03092]),
        ])
        .unwrap();
        let tracer = TracerConfig::new("C", vec![0.0, 1.0], true);
        let result = correct(
            &table,
            "C3H5O2N",
            "Si2C8H21",
            &[0.5, 0.3, 0.15, 0.05],
            &tracer,
            false,
        )
        .unwrap();
        assert_eq!(result.distribution.len(), 4);
        let sum: f64 = result.distribution.iter().sum();
        assert!((sum - 1.0).abs() < 1e-9);
        for &d in &result.distribution {
            assert!(d >= 0.0);
        }
    }

    #[test]
    fn purity_less_than_one_recovers_highest_isotopologue() {
        use ndarray::array;
        let table = base_table();
        let tracer = TracerConfig::new("C", vec![0.01, 0.99], true);
        let natural_mdv = vec![1.0];
        let a = build_correction_matrix(&natural_mdv, &[0.9893, 0.0107], &tracer.purity, 3, 4, true)
            .unwrap();
        let d0 = array![0.0, 0.0, 0.0, 1.0];
        let v = a.dot(&d0);
        let result = correct(&table, "C3H4O3", "", v.as_slice().unwrap(), &tracer, false).unwrap();
        assert!((result.distribution[3] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn measurement_too_short_is_rejected() {
        let table = base_table();
        let tracer = TracerConfig::new("C", vec![0.0, 1.0], true);
        let err = correct(&table, "C3H4O3", "", &[1.0, 0.0, 0.0], &tracer, false).unwrap_err();
        assert!(matches!(err, CorrectionError::MeasurementTooShort { .. }));
    }

    #[test]
    fn zero_signal_short_circuits_without_solving() {
        let table = base_table();
        let tracer = TracerConfig::new("C", vec![0.0, 1.0], true);
        let result = correct(&table, "C3H4O3", "", &[0.0, 0.0, 0.0, 0.0], &tracer, true).unwrap();
        assert_eq!(result.distribution, vec![0.0; 4]);
        assert_eq!(result.residuum, vec![0.0; 4]);
        assert_eq!(result.mean_enrichment, None);
        assert!(result.warnings.contains(&Warning::ZeroSignal));
    }

    #[test]
    fn tracer_absent_from_formula_is_rejected() {
        let table = base_table();
        let tracer = TracerConfig::new("C", vec![0.0, 1.0], true);
        let err = correct(&table, "H4O3", "", &[1.0, 0.0], &tracer, false).unwrap_err();
        assert!(matches!(err, CorrectionError::TracerAbsent { .. }));
    }

    #[test]
    fn negative_entries_are_warned_not_rejected() {
        let table = base_table();
        let tracer = TracerConfig::new("C", vec![0.0, 1.0], true);
        let result = correct(&table, "C3H4O3", "", &[1.0, -0.01, 0.0, 0.0], &tracer, false).unwrap();
        assert!(result
            .warnings
            .iter()
            .any(|w| matches!(w, Warning::NegativeMeasurement { .. })));
    }

    #[test]
    fn idempotent_under_positive_rescaling() {
        let table = base_table();
        let tracer = TracerConfig::new("C", vec![0.0, 1.0], false);
        let v = [0.9787, 0.0212, 0.0001];
        let scaled: Vec<f64> = v.iter().map(|x| x * 5.0).collect();
        let a = correct(&table, "C2", "", &v, &tracer, true).unwrap();
        let b = correct(&table, "C2", "", &scaled, &tracer, true).unwrap();
        for (x, y) in a.distribution.iter().zip(b.distribution.iter()) {
            assert!((x - y).abs() < 1e-9);
        }
        assert_eq!(a.mean_enrichment, b.mean_enrichment);
        // residuum is r_i = e_i / sum(v), and rescaling v by alpha scales
        // both e and sum(v) by alpha together, so the returned (already
        // normalized) residuum is scale-invariant, not itself scaled by
        // alpha - it's the raw e = v - Ax that scales.
        for (x, y) in a.residuum.iter().zip(b.residuum.iter()) {
            assert!((x - y).abs() < 1e-9);
        }
    }
}
