//! Parallel fan-out of [`crate::correct::correct`] over many independent
//! measurement records. Each record is corrected in isolation against a
//! shared, read-only isotope table; there is no cross-record state.
use rayon::prelude::*;

use crate::correct::{correct, CorrectionResult};
use crate::error::CorrectionError;
use crate::io::MeasurementRecord;
use crate::isotope_table::IsotopeTable;
use crate::tracer::TracerConfig;

/// Below this many records, sequential iteration avoids the overhead of
/// spinning up rayon's thread pool for work that finishes before the pool
/// would anyway.
const PARALLEL_THRESHOLD: usize = 64;

/// Correct every record in `records` against `table`, in parallel once the
/// batch is large enough to make it worthwhile. Order of the returned
/// vector matches the order of `records`.
pub fn correct_batch(
    table: &IsotopeTable,
    records: &[MeasurementRecord],
) -> Vec<Result<CorrectionResult, CorrectionError>> {
    if records.len() > PARALLEL_THRESHOLD {
        records
            .par_iter()
            .map(|record| correct_record(table, record))
            .collect()
    } else {
        records
            .iter()
            .map(|record| correct_record(table, record))
            .collect()
    }
}

fn correct_record(
    table: &IsotopeTable,
    record: &MeasurementRecord,
) -> Result<CorrectionResult, CorrectionError> {
    let tracer = TracerConfig::new(
        record.tracer_element.clone(),
        record.purity.clone(),
        record.exclude_tracer_natab,
    );
    correct(
        table,
        &record.metabolite_formula,
        &record.derivative_formula,
        &record.v_measured,
        &tracer,
        record.want_mean_enrichment,
    )
}

#[cfg(test)]
mod test {
    use super::*;

    fn table() -> IsotopeTable {
        IsotopeTable::from_pairs(vec![
            ("C", vec![0.9893, 0.0107]),
            ("H", vec![1.0]),
            ("O", vec![1.0]),
        ])
        .unwrap()
    }

    fn record() -> MeasurementRecord {
        MeasurementRecord {
            metabolite_formula: "C3H4O3".to_string(),
            derivative_formula: String::new(),
            v_measured: vec![1.0, 0.0, 0.0, 0.0],
            tracer_element: "C".to_string(),
            purity: vec![0.0, 1.0],
            exclude_tracer_natab: true,
            want_mean_enrichment: true,
        }
    }

    #[test]
    fn sequential_path_preserves_order() {
        let t = table();
        let records = vec![record(), record(), record()];
        let results = correct_batch(&t, &records);
        assert_eq!(results.len(), 3);
        for result in results {
            assert_eq!(result.unwrap().distribution, vec![1.0, 0.0, 0.0, 0.0]);
        }
    }

    #[test]
    fn parallel_path_preserves_order_and_correctness() {
        let t = table();
        let mut records = Vec::new();
        for i in 0..(PARALLEL_THRESHOLD + 8) {
            let mut r = record();
            if i % 2 == 0 {
                r.v_measured = vec![0.0, 0.0, 1.0, 0.0];
            }
            records.push(r);
        }
        let results = correct_batch(&t, &records);
        assert_eq!(results.len(), records.len());
        for (i, result) in results.into_iter().enumerate() {
            let out = result.unwrap();
            if i % 2 == 0 {
                assert_eq!(out.distribution, vec![0.0, 0.0, 1.0, 0.0]);
            } else {
                assert_eq!(out.distribution, vec![1.0, 0.0, 0.0, 0.0]);
            }
        }
    }

    #[test]
    fn per_record_errors_do_not_abort_the_batch() {
        let t = table();
        let mut bad = record();
        bad.v_measured = vec![1.0, 0.0]; // too short
        let records = vec![record(), bad, record()];
        let results = correct_batch(&t, &records);
        assert!(results[0].is_ok());
        assert!(matches!(
            results[1],
            Err(CorrectionError::MeasurementTooShort { .. })
        ));
        assert!(results[2].is_ok());
    }
}
