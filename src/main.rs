//! Toy demonstration binary: correct one measurement vector from the
//! command line against the bundled default isotope table.
use std::env;
use std::process::ExitCode;

use isocor_core::{correct, TracerConfig, DEFAULT_ISOTOPE_TABLE};

fn usage() -> String {
    "usage: isocor-core <formula> <tracer_element> <purity,comma,separated> <v_measured,comma,separated>".to_string()
}

fn parse_csv(input: &str) -> Result<Vec<f64>, String> {
    input
        .split(',')
        .map(|token| {
            token
                .trim()
                .parse::<f64>()
                .map_err(|_| format!("could not parse {token:?} as a number"))
        })
        .collect()
}

fn main() -> ExitCode {
    let args: Vec<String> = env::args().collect();
    let [_, formula, tracer_element, purity_csv, v_csv] = args.as_slice() else {
        eprintln!("{}", usage());
        return ExitCode::FAILURE;
    };

    let purity = match parse_csv(purity_csv) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };
    let v_measured = match parse_csv(v_csv) {
        Ok(v) => v,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };

    let tracer = TracerConfig::new(tracer_element.clone(), purity, false);

    match correct(&DEFAULT_ISOTOPE_TABLE, formula, "", &v_measured, &tracer, true) {
        Ok(result) => {
            println!("distribution: {:?}", result.distribution);
            println!("residuum: {:?}", result.residuum);
            println!("mean enrichment: {:?}", result.mean_enrichment);
            for warning in &result.warnings {
                eprintln!("warning: {warning}");
            }
            if let Some(error_kind) = &result.error_kind {
                eprintln!("non-fatal: {error_kind}");
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("correction failed: {e}");
            ExitCode::FAILURE
        }
    }
}
