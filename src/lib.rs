//! Isotopic correction of mass-spectrometry isotopologue measurements for
//! tracer experiments.
//!
//! Given a measured intensity vector over a tracer element's n+1
//! isotopologues, [`correct::correct`] removes the contributions of natural
//! isotopic abundance (of every element in the molecule) and imperfect
//! tracer purity, returning a normalized isotopologue distribution, a fit
//! residuum, and optionally a mean isotopic enrichment.
//!
//! The pipeline, leaves first:
//!
//! 1. [`formula`] - elemental formula parsing.
//! 2. [`isotope_table`] - the natural-abundance table each correction reads from.
//! 3. [`mdv`] - discrete convolution and natural-abundance MDV construction.
//! 4. [`matrix`] - the rectangular correction matrix.
//! 5. [`nnls`] - the non-negative least-squares solver.
//! 6. [`postprocess`] - normalization, residuum scaling, mean enrichment.
//! 7. [`tracer`] - tracer configuration and its validation.
//! 8. [`correct`] - the facade tying all of the above together.
//! 9. [`batch`] - parallel fan-out of `correct` over many records.
//! 10. [`io`] - flat-file contracts for isotope tables, metabolite databases, and measurement records.
//!
//! Every call is a pure function of its inputs: no caches, no globals, no
//! process-wide state.
pub mod batch;
pub mod correct;
pub mod error;
pub mod formula;
pub mod io;
pub mod isotope_table;
pub mod matrix;
pub mod mdv;
pub mod nnls;
pub mod postprocess;
pub mod tracer;

pub use correct::{correct, correct_cancellable, CorrectionResult};
pub use error::{CorrectionError, Warning};
pub use formula::{parse_formula_with_table, ElementCounts};
pub use isotope_table::{IsotopeTable, DEFAULT_ISOTOPE_TABLE};
pub use tracer::TracerConfig;
